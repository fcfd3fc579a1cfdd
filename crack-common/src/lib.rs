//! Common boundary types for the crackpoint modules
//!
//! This crate defines the data values that cross the engine boundary:
//! - `TargetInfo` - Handed opaquely from the caller to protocol checkers
//! - `StatusSnapshot` - Pushed from the scheduler to progress consumers
//!
//! Both are plain serializable structs so a CLI, GUI, or remote dashboard
//! can forward them over any IPC channel without depending on the engine.

mod status;
mod target;

pub use status::StatusSnapshot;
pub use target::TargetInfo;
