use crate::domain::MediaItem;
use async_trait::async_trait;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DurationProvider: Send + Sync {
    /// Playback length of `item` in seconds.
    ///
    /// Implementations never fail: any lookup error is logged and reported as `0.0`.
    async fn resolve(&self, item: &MediaItem) -> f64;
}

#[async_trait]
impl<T: DurationProvider + ?Sized> DurationProvider for std::sync::Arc<T> {
    async fn resolve(&self, item: &MediaItem) -> f64 {
        (**self).resolve(item).await
    }
}
