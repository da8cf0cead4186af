//! Command-line interface for exec-runner.
//!
//! Uses lexopt for minimal binary size overhead (~34KB).

use std::ffi::OsString;
use std::path::PathBuf;

use crate::execution::{StreamDisposition, SuccessCodes};

/// Command-line arguments.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Program to run.
    pub program: Option<String>,
    /// Arguments passed to the program, verbatim.
    pub args: Vec<String>,
    /// Accepted exit codes.
    pub success_codes: Option<SuccessCodes>,
    /// Run the program directly instead of through the shell.
    pub no_shell: bool,
    /// Do not echo child output.
    pub quiet: bool,
    /// Child stdin disposition.
    pub stdin: Option<StreamDisposition>,
    /// Child stdout disposition.
    pub stdout: Option<StreamDisposition>,
    /// Child stderr disposition.
    pub stderr: Option<StreamDisposition>,
    /// Timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Working directory for the child.
    pub cwd: Option<PathBuf>,
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
///
/// Options are only recognised before the program name; everything after it
/// belongs to the program.
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('s') | Long("success-codes") => {
                let value = utf8(parser.value()?)?;
                result.success_codes = Some(
                    SuccessCodes::parse_list(&value)
                        .ok_or(ArgsError::InvalidValue("success-codes", value))?,
                );
            }
            Long("no-shell") => {
                result.no_shell = true;
            }
            Short('q') | Long("quiet") => {
                result.quiet = true;
            }
            Long("stdin") => {
                result.stdin = Some(disposition(&mut parser, "stdin")?);
            }
            Long("stdout") => {
                result.stdout = Some(disposition(&mut parser, "stdout")?);
            }
            Long("stderr") => {
                result.stderr = Some(disposition(&mut parser, "stderr")?);
            }
            Short('t') | Long("timeout") => {
                let value = utf8(parser.value()?)?;
                result.timeout_secs = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("timeout", value))?,
                );
            }
            Short('C') | Long("cwd") => {
                result.cwd = Some(parser.value()?.parse()?);
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Value(program) => {
                result.program = Some(utf8(program)?);
                for raw in parser.raw_args()? {
                    result.args.push(utf8(raw)?);
                }
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(result)
}

fn disposition(
    parser: &mut lexopt::Parser,
    name: &'static str,
) -> Result<StreamDisposition, ArgsError> {
    let value = utf8(parser.value()?)?;
    StreamDisposition::parse(&value).ok_or(ArgsError::InvalidValue(name, value))
}

fn utf8(value: OsString) -> Result<String, ArgsError> {
    value
        .into_string()
        .map_err(|raw| ArgsError::NotUnicode(raw.to_string_lossy().into_owned()))
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"exec-runner {version}
Run a program to completion, streaming its output and checking its exit code

USAGE:
    exec-runner [OPTIONS] <PROGRAM> [ARGS]...

OPTIONS:
    -s, --success-codes <LIST>  Accepted exit codes, comma separated [default: 0]
        --no-shell              Run the program directly, not through the shell
    -q, --quiet                 Do not echo the program's output
        --stdin <MODE>          inherit, piped or ignored [default: inherit]
        --stdout <MODE>         inherit, piped or ignored [default: piped]
        --stderr <MODE>         inherit, piped or ignored [default: piped]
    -t, --timeout <SECS>        Kill the program after SECS seconds
    -C, --cwd <DIR>             Working directory for the program
    -c, --config <FILE>         Path to configuration file (JSON)
    -l, --log-level <LVL>       Log level (error, warn, info, debug, trace)
    -h, --help                  Print help
    -V, --version               Print version

Everything after <PROGRAM> is passed to the program unchanged.

ENVIRONMENT VARIABLES:
    EXEC_RUNNER_SUCCESS_CODES   Accepted exit codes (overrides config)
    EXEC_RUNNER_USE_SHELL       true/false (overrides config)
    EXEC_RUNNER_QUIET           true/false (overrides config)
    EXEC_RUNNER_LOG_LEVEL       Log level (overrides config)
    RUST_LOG                    Alternative log level setting

EXIT STATUS:
    The program's exit code when it is accepted, otherwise the failing
    code (127 not found, 126 not executable, 124 timeout, 1 other).
    2 on invalid usage.

EXAMPLES:
    # Accept 0 or 1 from grep
    exec-runner -s 0,1 grep -q needle haystack.txt

    # Run without a shell, discarding output
    exec-runner --no-shell -q cargo build --release
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("exec-runner {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Invalid argument value.
    InvalidValue(&'static str, String),
    /// Argument is not valid UTF-8.
    NotUnicode(String),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for --{}: '{}'", name, value)
            }
            Self::NotUnicode(arg) => {
                write!(f, "argument is not valid unicode: '{}'", arg)
            }
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(args: &[&str]) -> Vec<OsString> {
        std::iter::once("exec-runner")
            .chain(args.iter().copied())
            .map(OsString::from)
            .collect()
    }

    #[test]
    fn test_default_args() {
        let result = parse_args_from(args(&[])).unwrap();
        assert!(result.program.is_none());
        assert!(result.args.is_empty());
        assert!(result.success_codes.is_none());
        assert!(!result.no_shell);
        assert!(!result.quiet);
    }

    #[test]
    fn test_program_and_args() {
        let result = parse_args_from(args(&["ls", "-la", "/tmp"])).unwrap();
        assert_eq!(result.program.as_deref(), Some("ls"));
        assert_eq!(result.args, vec!["-la", "/tmp"]);
    }

    #[test]
    fn test_options_after_program_belong_to_program() {
        let result = parse_args_from(args(&["-q", "grep", "-q", "--help", "x"])).unwrap();
        assert!(result.quiet);
        assert!(!result.help);
        assert_eq!(result.program.as_deref(), Some("grep"));
        assert_eq!(result.args, vec!["-q", "--help", "x"]);
    }

    #[test]
    fn test_double_dash() {
        let result = parse_args_from(args(&["--", "-weird-name", "a"])).unwrap();
        assert_eq!(result.program.as_deref(), Some("-weird-name"));
        assert_eq!(result.args, vec!["a"]);
    }

    #[test]
    fn test_success_codes() {
        let result = parse_args_from(args(&["-s", "0,123", "true"])).unwrap();
        assert_eq!(result.success_codes, Some(SuccessCodes::from([0, 123])));

        let result = parse_args_from(args(&["--success-codes", "7", "true"])).unwrap();
        assert_eq!(result.success_codes, Some(SuccessCodes::from(7)));
    }

    #[test]
    fn test_invalid_success_codes() {
        assert!(parse_args_from(args(&["-s", "zero", "true"])).is_err());
    }

    #[test]
    fn test_flags() {
        let result = parse_args_from(args(&["--no-shell", "--quiet", "true"])).unwrap();
        assert!(result.no_shell);
        assert!(result.quiet);
    }

    #[test]
    fn test_dispositions() {
        let result = parse_args_from(args(&[
            "--stdin", "ignored", "--stdout", "inherit", "--stderr", "pipe", "true",
        ]))
        .unwrap();
        assert_eq!(result.stdin, Some(StreamDisposition::Ignored));
        assert_eq!(result.stdout, Some(StreamDisposition::Inherit));
        assert_eq!(result.stderr, Some(StreamDisposition::Piped));
    }

    #[test]
    fn test_invalid_disposition() {
        let err = parse_args_from(args(&["--stdout", "tty", "true"])).unwrap_err();
        assert!(err.to_string().contains("--stdout"));
    }

    #[test]
    fn test_timeout() {
        let result = parse_args_from(args(&["-t", "30", "sleep", "1"])).unwrap();
        assert_eq!(result.timeout_secs, Some(30));
        assert!(parse_args_from(args(&["-t", "soon", "true"])).is_err());
    }

    #[test]
    fn test_cwd_and_config() {
        let result =
            parse_args_from(args(&["-C", "/srv", "-c", "/etc/exec-runner.json", "pwd"])).unwrap();
        assert_eq!(result.cwd, Some(PathBuf::from("/srv")));
        assert_eq!(result.config, Some(PathBuf::from("/etc/exec-runner.json")));
    }

    #[test]
    fn test_help_flag() {
        let result = parse_args_from(args(&["-h"])).unwrap();
        assert!(result.help);

        let result = parse_args_from(args(&["--help"])).unwrap();
        assert!(result.help);
    }

    #[test]
    fn test_version_flag() {
        let result = parse_args_from(args(&["-V"])).unwrap();
        assert!(result.version);
    }

    #[test]
    fn test_log_level() {
        let result = parse_args_from(args(&["-l", "debug", "true"])).unwrap();
        assert_eq!(result.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_unknown_option() {
        assert!(parse_args_from(args(&["--bogus", "true"])).is_err());
    }
}
