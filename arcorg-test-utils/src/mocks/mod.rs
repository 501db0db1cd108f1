//! Mock implementations for testing

mod clock;
mod directory;

pub use clock::ManualClock;
pub use directory::{DirectoryCall, MockDirectory, MockOperation, ScriptedPoll};
