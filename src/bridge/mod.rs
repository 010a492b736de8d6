//! Debugger process bridge
//!
//! Turns a debugger's stdio into `send` / `expect` primitives with an
//! ordered output queue fed by a background reader task.

pub mod process;
pub mod queue;

pub use process::{ProcessBridge, DEFAULT_CLOSE_GRACE};
pub use queue::{Next, OutputLineQueue};
