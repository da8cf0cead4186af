//! Configuration management for exec-runner.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::Args;
use crate::execution::{ExecOptions, StdioConfig, StreamDisposition, SuccessCodes};

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Execution defaults.
    pub exec: ExecSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Execution configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecSection {
    /// Exit codes treated as success.
    pub success_exit_codes: Vec<i32>,
    /// Resolve the program through the host shell.
    pub use_shell: bool,
    /// Do not echo child output locally.
    pub suppress_local_echo: bool,
    /// Child stdin disposition.
    pub stdin: StreamDisposition,
    /// Child stdout disposition.
    pub stdout: StreamDisposition,
    /// Child stderr disposition.
    pub stderr: StreamDisposition,
    /// Kill the child after this many seconds.
    pub timeout_secs: Option<u64>,
    /// Working directory for the child.
    pub working_dir: Option<PathBuf>,
}

impl Default for ExecSection {
    fn default() -> Self {
        let stdio = StdioConfig::default();
        Self {
            success_exit_codes: vec![0],
            use_shell: true,
            suppress_local_echo: false,
            stdin: stdio.stdin,
            stdout: stdio.stdout,
            stderr: stdio.stderr,
            timeout_secs: None,
            working_dir: None,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace) or a full filter directive.
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup (for testing).
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(codes) = lookup("EXEC_RUNNER_SUCCESS_CODES") {
            let parsed = SuccessCodes::parse_list(&codes)
                .ok_or_else(|| ConfigError::InvalidValue("EXEC_RUNNER_SUCCESS_CODES", codes))?;
            self.exec.success_exit_codes = parsed.iter().collect();
        }

        if let Some(value) = lookup("EXEC_RUNNER_USE_SHELL") {
            self.exec.use_shell = parse_flag(&value)
                .ok_or(ConfigError::InvalidValue("EXEC_RUNNER_USE_SHELL", value))?;
        }

        if let Some(value) = lookup("EXEC_RUNNER_QUIET") {
            self.exec.suppress_local_echo =
                parse_flag(&value).ok_or(ConfigError::InvalidValue("EXEC_RUNNER_QUIET", value))?;
        }

        if let Some(level) = lookup("EXEC_RUNNER_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Some(level) = lookup("RUST_LOG") {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(ref codes) = args.success_codes {
            self.exec.success_exit_codes = codes.iter().collect();
        }

        if args.no_shell {
            self.exec.use_shell = false;
        }

        if args.quiet {
            self.exec.suppress_local_echo = true;
        }

        if let Some(stdin) = args.stdin {
            self.exec.stdin = stdin;
        }
        if let Some(stdout) = args.stdout {
            self.exec.stdout = stdout;
        }
        if let Some(stderr) = args.stderr {
            self.exec.stderr = stderr;
        }

        if let Some(secs) = args.timeout_secs {
            self.exec.timeout_secs = Some(secs);
        }

        if let Some(ref dir) = args.cwd {
            self.exec.working_dir = Some(dir.clone());
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = match args.config {
            Some(ref path) => Config::from_file(path)?,
            None => Config::default(),
        };

        config.apply_env()?;
        config.apply_args(args);

        Ok(config)
    }

    /// Convert to run options for the process runner.
    pub fn to_exec_options(&self) -> ExecOptions {
        let exec = &self.exec;
        let mut options = ExecOptions::new()
            .success_exit_codes(exec.success_exit_codes.clone())
            .use_shell(exec.use_shell)
            .suppress_local_echo(exec.suppress_local_echo)
            .stdio(StdioConfig {
                stdin: exec.stdin,
                stdout: exec.stdout,
                stderr: exec.stderr,
            });

        if let Some(secs) = exec.timeout_secs {
            options = options.timeout(Duration::from_secs(secs));
        }
        if let Some(ref dir) = exec.working_dir {
            options = options.working_dir(dir);
        }

        options
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("failed to read config file: {0}")]
    Io(std::io::Error),
    /// JSON parsing error.
    #[error("failed to parse config file: {0}")]
    Json(serde_json::Error),
    /// Invalid value in an environment variable.
    #[error("invalid value for {0}: '{1}'")]
    InvalidValue(&'static str, String),
}
