//! Process execution.
//!
//! This module runs one external program per call:
//! - Output streaming to a handler, with optional local echo
//! - Exit-code classification against a set of accepted codes
//! - Optional timeout
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use exec_runner::execution::{exec, CapturedOutput, ExecOptions};
//!
//! # async fn demo() -> exec_runner::Result<()> {
//! let capture = Arc::new(CapturedOutput::new());
//! let options = ExecOptions::new()
//!     .success_exit_codes([0, 123])
//!     .output_handler(capture.clone())
//!     .suppress_local_echo(true);
//!
//! let code = exec("git", &["status", "--short"], options).await?;
//! println!("exit {}: {}", code, capture.stdout());
//! # Ok(())
//! # }
//! ```

mod options;
mod result;
mod runner;
mod state;

pub use options::{ExecOptions, StdioConfig, StreamDisposition, SuccessCodes};
pub use result::{CapturedOutput, OutputChunk, OutputHandler, OutputSource};
pub use runner::{exec, exec_checked, ProcessRunner, NO_ARGS};
pub use state::{InvalidTransition, RunState};
