//! Tools the model can call during generation.
//!
//! - [`core`]: the [`Tool`] trait, [`ToolOutput`] and the name-dispatching
//!   [`ToolSet`].
//! - [`write_file`]: [`WriteFile`], which commits sandboxed paths into the
//!   run's [`FileSet`](crate::FileSet).

pub mod core;
pub mod write_file;

pub use core::{Tool, ToolFuture, ToolOutput, ToolSet, log_tool_call};
pub use write_file::{WRITE_FILE, WriteFile, WriteFileArgs};
