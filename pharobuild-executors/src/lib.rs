//! Runs image builds: stages a copy of a start image, feeds a generated script
//! to a Squeak/Pharo VM, and commits the saved copy under a new name.
//!
//! The start image is never handed to the VM.  All mutation happens on a copy
//! inside a per-build staging directory, which is removed again however the build ends.

mod build;
mod errors;
mod events;
pub mod execute;
pub mod script;
mod staging;


pub use build::{BuildOptions, BuildOutput, Executor, ExitPolicy};
pub use errors::Error;
pub use errors::Result;
pub use events::{Event, EventBody, Outbox};
pub use staging::ImagePair;
