//! Agent-facing tools over the control plane.

use crate::application::ControlPlane;
use crate::domain::MediaItem;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    schema: fn() -> Value,
}

impl ToolSpec {
    pub fn describe(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": (self.schema)(),
        })
    }
}

fn no_arguments() -> Value {
    json!({ "type": "object", "properties": {} })
}

fn source_only() -> Value {
    json!({
        "type": "object",
        "properties": { "source": { "type": "string" } },
        "required": ["source"],
    })
}

fn source_and_position() -> Value {
    json!({
        "type": "object",
        "properties": {
            "source": { "type": "string" },
            "position": { "type": "string", "enum": ["front", "back"] },
        },
        "required": ["source"],
    })
}

fn source_and_reason() -> Value {
    json!({
        "type": "object",
        "properties": {
            "source": { "type": "string" },
            "reason": { "type": "string" },
        },
        "required": ["source"],
    })
}

fn reason_only() -> Value {
    json!({
        "type": "object",
        "properties": { "reason": { "type": "string" } },
        "required": [],
    })
}

pub const TOOLS: &[ToolSpec] = &[
    ToolSpec {
        name: "add_video_to_queue",
        description: "Add a video (YouTube URL or local file path) to the streaming queue",
        schema: source_and_position,
    },
    ToolSpec {
        name: "add_priority_video",
        description: "Add high-priority video that interrupts current stream immediately",
        schema: source_and_reason,
    },
    ToolSpec {
        name: "get_streaming_queue",
        description: "Get current streaming queue status and contents",
        schema: no_arguments,
    },
    ToolSpec {
        name: "clear_streaming_queue",
        description: "Clear the entire streaming queue",
        schema: no_arguments,
    },
    ToolSpec {
        name: "get_stream_status",
        description: "Get current streaming status and progress information",
        schema: no_arguments,
    },
    ToolSpec {
        name: "interrupt_current_stream",
        description: "Immediately interrupt the current stream",
        schema: reason_only,
    },
    ToolSpec {
        name: "get_video_duration",
        description: "Get duration of a video file or YouTube URL",
        schema: source_only,
    },
    ToolSpec {
        name: "validate_video_source",
        description: "Check if video source is accessible and valid",
        schema: source_only,
    },
];

pub fn catalogue() -> Vec<Value> {
    TOOLS.iter().map(ToolSpec::describe).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ToolResult {
    Success { result: Value },
    Error { message: String },
}

impl ToolResult {
    fn success(result: impl Into<Value>) -> Self {
        ToolResult::Success {
            result: result.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        ToolResult::Error {
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ToolResult::Error { .. })
    }
}

fn string_arg(arguments: &Value, key: &str) -> Option<String> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn required_source(arguments: &Value) -> Result<MediaItem, ToolResult> {
    string_arg(arguments, "source")
        .map(MediaItem::new)
        .ok_or_else(|| ToolResult::error("Missing required parameter: source"))
}

fn with_reason(message: String, reason: Option<String>) -> String {
    match reason {
        Some(reason) => format!("{message} (Reason: {reason})"),
        None => message,
    }
}

/// Run tool `name`. Returns `None` when no such tool exists.
pub async fn call(control: &ControlPlane, name: &str, arguments: &Value) -> Option<ToolResult> {
    info!(tool = name, "Tool call");
    let result = match name {
        "add_video_to_queue" => match required_source(arguments) {
            Ok(source) => {
                if string_arg(arguments, "position").as_deref() == Some("front") {
                    control.enqueue_front(source.clone());
                } else {
                    control.enqueue(source.clone());
                }
                ToolResult::success(format!("Video added to queue: {source}"))
            }
            Err(e) => e,
        },
        "add_priority_video" => match required_source(arguments) {
            Ok(source) => {
                control.enqueue_priority(source.clone()).await;
                ToolResult::success(with_reason(
                    format!("Priority video added and current stream interrupted: {source}"),
                    string_arg(arguments, "reason"),
                ))
            }
            Err(e) => e,
        },
        "get_streaming_queue" => {
            let queue = control.list_all();
            ToolResult::success(json!({
                "size": queue.len(),
                "queue": queue,
                "is_streaming": control.is_streaming(),
            }))
        }
        "clear_streaming_queue" => {
            control.clear();
            ToolResult::success("Queue cleared successfully")
        }
        "get_stream_status" => {
            let mut status = json!(control.status());
            status["server_status"] = json!("running");
            ToolResult::success(status)
        }
        "interrupt_current_stream" => {
            control.interrupt_current().await;
            ToolResult::success(with_reason(
                "Current stream interrupted".to_string(),
                string_arg(arguments, "reason"),
            ))
        }
        "get_video_duration" => match required_source(arguments) {
            Ok(source) => {
                let duration = control.resolve_duration(&source).await;
                ToolResult::success(json!({ "duration": duration, "source": source }))
            }
            Err(e) => e,
        },
        "validate_video_source" => match required_source(arguments) {
            Ok(source) => ToolResult::success(json!(control.validate_source(source).await)),
            Err(e) => e,
        },
        _ => return None,
    };
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue_lists_every_tool() {
        let names: Vec<String> = catalogue()
            .iter()
            .map(|tool| tool["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            [
                "add_video_to_queue",
                "add_priority_video",
                "get_streaming_queue",
                "clear_streaming_queue",
                "get_stream_status",
                "interrupt_current_stream",
                "get_video_duration",
                "validate_video_source",
            ]
        );
        assert!(catalogue().iter().all(|tool| tool["inputSchema"]["type"] == "object"));
    }

    #[test]
    fn test_tool_result_shape() {
        assert_eq!(
            serde_json::to_value(ToolResult::success("done")).unwrap(),
            json!({ "status": "success", "result": "done" })
        );
        assert_eq!(
            serde_json::to_value(ToolResult::error("nope")).unwrap(),
            json!({ "status": "error", "message": "nope" })
        );
    }

    #[test]
    fn test_string_arguments() {
        let arguments = json!({ "source": "a.mp4", "reason": "", "position": 3 });
        assert_eq!(string_arg(&arguments, "source").as_deref(), Some("a.mp4"));
        assert_eq!(string_arg(&arguments, "reason"), None);
        assert_eq!(string_arg(&arguments, "position"), None);
        assert_eq!(string_arg(&Value::Null, "source"), None);
    }
}
