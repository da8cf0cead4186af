//! # exec-runner
//!
//! Run an external program to completion, streaming its output and
//! classifying how it finished.
//!
//! Each run spawns one child process, hands every chunk of its stdout and
//! stderr to an optional handler (echoing it locally unless suppressed), and
//! settles exactly once: with the exit code when it is one of the accepted
//! success codes, or with an [`ExecError`] carrying the failing code.
//!
//! ## Features
//!
//! - **Async**: one tokio task per run, no extra threads
//! - **Exit-code sets**: accept any set of codes as success
//! - **Output handlers**: receive stdout and stderr chunks as they arrive
//! - **Lightweight**: minimal dependencies, small binary size
//!
//! ## Quick Start
//!
//! ```no_run
//! use exec_runner::{exec, ExecOptions, ExecError};
//!
//! #[tokio::main]
//! async fn main() -> exec_runner::Result<()> {
//!     // Initialize logging
//!     exec_runner::logging::try_init().ok();
//!
//!     // Default options: success is exit code 0, output echoed
//!     let code = exec("echo", &["hello"], ExecOptions::default()).await?;
//!     assert_eq!(code, 0);
//!
//!     // Any other code is an error that still carries the code
//!     match exec("exit", &["5"], ExecOptions::default()).await {
//!         Err(e @ ExecError::UnexpectedExitCode { .. }) => println!("{} ({})", e, e.exit_code()),
//!         other => println!("{:?}", other),
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod execution;
pub mod logging;

// Re-export commonly used types
pub use error::{ExecError, Result};
pub use execution::{
    exec, exec_checked, CapturedOutput, ExecOptions, OutputChunk, OutputHandler, OutputSource,
    ProcessRunner, StdioConfig, StreamDisposition, SuccessCodes, NO_ARGS,
};
