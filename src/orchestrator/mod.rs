//! Application-level orchestration.
//!
//! The dispatcher owns all network I/O and runs on the tokio runtime; UI and CLI layers
//! talk to it through command/event channels so their own state stays single-threaded.

mod dispatch;

pub(crate) use dispatch::run_dispatcher;
