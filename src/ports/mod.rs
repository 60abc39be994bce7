//! Ports - Trait definitions for everything the scheduler talks to outside the process.

pub mod command;
pub mod duration;
pub mod encoder;
pub mod process;
