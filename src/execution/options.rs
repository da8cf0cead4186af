//! Run options: accepted exit codes, stream dispositions, output handling.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::result::OutputHandler;

/// Set of exit codes that count as a successful run.
///
/// Keeps the order the codes were given in, without duplicates, so messages
/// list them the way the caller wrote them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuccessCodes(Vec<i32>);

impl SuccessCodes {
    /// Check whether `code` is accepted.
    pub fn contains(&self, code: i32) -> bool {
        self.0.contains(&code)
    }

    /// Iterate over the accepted codes in the order they were given.
    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.0.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse a comma-separated list such as `"0,123"`.
    pub fn parse_list(s: &str) -> Option<Self> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| part.parse::<i32>().ok())
            .collect::<Option<Vec<_>>>()
            .map(Self::from)
    }
}

impl Default for SuccessCodes {
    fn default() -> Self {
        Self::from(0)
    }
}

impl FromIterator<i32> for SuccessCodes {
    fn from_iter<I: IntoIterator<Item = i32>>(codes: I) -> Self {
        let mut unique = Vec::new();
        for code in codes {
            if !unique.contains(&code) {
                unique.push(code);
            }
        }
        Self(unique)
    }
}

impl From<i32> for SuccessCodes {
    fn from(code: i32) -> Self {
        Self(vec![code])
    }
}

impl From<Vec<i32>> for SuccessCodes {
    fn from(codes: Vec<i32>) -> Self {
        codes.into_iter().collect()
    }
}

impl From<&[i32]> for SuccessCodes {
    fn from(codes: &[i32]) -> Self {
        codes.iter().copied().collect()
    }
}

impl<const N: usize> From<[i32; N]> for SuccessCodes {
    fn from(codes: [i32; N]) -> Self {
        codes.into_iter().collect()
    }
}

impl fmt::Display for SuccessCodes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<String> = self.0.iter().map(i32::to_string).collect();
        f.write_str(&joined.join(","))
    }
}

/// What happens to one of the child's standard streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamDisposition {
    /// Share the parent's stream.
    #[default]
    Inherit,
    /// Connect a pipe that the runner reads (or, for stdin, leaves empty).
    Piped,
    /// Connect to the null device.
    Ignored,
}

impl StreamDisposition {
    pub(crate) fn to_stdio(self) -> Stdio {
        match self {
            Self::Inherit => Stdio::inherit(),
            Self::Piped => Stdio::piped(),
            Self::Ignored => Stdio::null(),
        }
    }

    /// Parse `inherit`, `piped` (or `pipe`), `ignored` (or `ignore`).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "inherit" => Some(Self::Inherit),
            "piped" | "pipe" => Some(Self::Piped),
            "ignored" | "ignore" => Some(Self::Ignored),
            _ => None,
        }
    }
}

/// Dispositions for stdin, stdout and stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdioConfig {
    pub stdin: StreamDisposition,
    pub stdout: StreamDisposition,
    pub stderr: StreamDisposition,
}

impl Default for StdioConfig {
    fn default() -> Self {
        Self {
            stdin: StreamDisposition::Inherit,
            stdout: StreamDisposition::Piped,
            stderr: StreamDisposition::Piped,
        }
    }
}

/// Options for a process run.
///
/// Every field has a default; setters consume and return `self` so options
/// read as a single expression.
#[derive(Clone)]
pub struct ExecOptions {
    /// Exit codes treated as success.
    pub success_exit_codes: SuccessCodes,
    /// Receives every output chunk as it arrives.
    pub output_handler: Option<Arc<dyn OutputHandler>>,
    /// Do not copy child output to this process's own stdout/stderr.
    pub suppress_local_echo: bool,
    /// Resolve the program through the host shell.
    pub use_shell: bool,
    /// Stream dispositions.
    pub stdio: StdioConfig,
    /// Working directory override.
    pub working_dir: Option<PathBuf>,
    /// Extra environment variables.
    pub env: HashMap<String, String>,
    /// Kill the child if it runs longer than this.
    ///
    /// On Unix a timed child leads its own process group, and the whole group
    /// is killed on expiry, including anything a shell started. Being outside
    /// the terminal's foreground group, it no longer receives Ctrl-C from it.
    pub timeout: Option<Duration>,
}

impl ExecOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the accepted exit codes.
    pub fn success_exit_codes(mut self, codes: impl Into<SuccessCodes>) -> Self {
        self.success_exit_codes = codes.into();
        self
    }

    /// Set the output handler.
    pub fn output_handler(mut self, handler: Arc<dyn OutputHandler>) -> Self {
        self.output_handler = Some(handler);
        self
    }

    /// Set whether output is echoed locally.
    pub fn suppress_local_echo(mut self, suppress: bool) -> Self {
        self.suppress_local_echo = suppress;
        self
    }

    /// Set whether the program goes through the shell.
    pub fn use_shell(mut self, use_shell: bool) -> Self {
        self.use_shell = use_shell;
        self
    }

    /// Set all three stream dispositions.
    pub fn stdio(mut self, stdio: StdioConfig) -> Self {
        self.stdio = stdio;
        self
    }

    /// Set the working directory.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Add an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Add multiple environment variables.
    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in vars {
            self.env.insert(k.into(), v.into());
        }
        self
    }

    /// Set the timeout.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            success_exit_codes: SuccessCodes::default(),
            output_handler: None,
            suppress_local_echo: false,
            use_shell: true,
            stdio: StdioConfig::default(),
            working_dir: None,
            env: HashMap::new(),
            timeout: None,
        }
    }
}

impl fmt::Debug for ExecOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecOptions")
            .field("success_exit_codes", &self.success_exit_codes)
            .field("output_handler", &self.output_handler.is_some())
            .field("suppress_local_echo", &self.suppress_local_echo)
            .field("use_shell", &self.use_shell)
            .field("stdio", &self.stdio)
            .field("working_dir", &self.working_dir)
            .field("env", &self.env)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::CapturedOutput;

    #[test]
    fn test_default_options() {
        let opts = ExecOptions::default();
        assert!(opts.success_exit_codes.contains(0));
        assert!(!opts.success_exit_codes.contains(1));
        assert!(opts.output_handler.is_none());
        assert!(!opts.suppress_local_echo);
        assert!(opts.use_shell);
        assert_eq!(opts.stdio.stdin, StreamDisposition::Inherit);
        assert_eq!(opts.stdio.stdout, StreamDisposition::Piped);
        assert_eq!(opts.stdio.stderr, StreamDisposition::Piped);
        assert!(opts.timeout.is_none());
    }

    #[test]
    fn test_bare_code_is_singleton() {
        let codes = SuccessCodes::from(123);
        assert!(codes.contains(123));
        assert!(!codes.contains(0));
        assert_eq!(codes.iter().count(), 1);
    }

    #[test]
    fn test_codes_keep_given_order_without_duplicates() {
        let codes = SuccessCodes::from(vec![123, 0, 123]);
        assert_eq!(codes.iter().collect::<Vec<_>>(), vec![123, 0]);
        assert_eq!(codes.to_string(), "123,0");
        assert_eq!(
            SuccessCodes::parse_list("5, 1,5,0"),
            Some(SuccessCodes::from([5, 1, 0]))
        );
    }

    #[test]
    fn test_empty_codes_stay_empty() {
        let codes = SuccessCodes::from(Vec::<i32>::new());
        assert!(codes.is_empty());
        assert!(!codes.contains(0));
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(
            SuccessCodes::parse_list("0, 123"),
            Some(SuccessCodes::from([0, 123]))
        );
        assert_eq!(SuccessCodes::parse_list("7"), Some(SuccessCodes::from(7)));
        assert!(SuccessCodes::parse_list("0,abc").is_none());
    }

    #[test]
    fn test_disposition_parse() {
        assert_eq!(StreamDisposition::parse("inherit"), Some(StreamDisposition::Inherit));
        assert_eq!(StreamDisposition::parse("PIPE"), Some(StreamDisposition::Piped));
        assert_eq!(StreamDisposition::parse("ignored"), Some(StreamDisposition::Ignored));
        assert!(StreamDisposition::parse("tty").is_none());
    }

    #[test]
    fn test_disposition_serde() {
        let json = serde_json::to_string(&StreamDisposition::Ignored).unwrap();
        assert_eq!(json, "\"ignored\"");
        let parsed: StdioConfig =
            serde_json::from_str(r#"{"stdin":"ignored","stdout":"inherit","stderr":"piped"}"#)
                .unwrap();
        assert_eq!(parsed.stdin, StreamDisposition::Ignored);
        assert_eq!(parsed.stdout, StreamDisposition::Inherit);
    }

    #[test]
    fn test_builder_chain() {
        let capture = Arc::new(CapturedOutput::new());
        let opts = ExecOptions::new()
            .success_exit_codes([0, 2])
            .output_handler(capture)
            .suppress_local_echo(true)
            .use_shell(false)
            .working_dir("/tmp")
            .env("KEY", "value")
            .envs([("A", "1"), ("B", "2")])
            .timeout(Duration::from_secs(5));

        assert!(opts.success_exit_codes.contains(2));
        assert!(opts.output_handler.is_some());
        assert!(opts.suppress_local_echo);
        assert!(!opts.use_shell);
        assert_eq!(opts.working_dir, Some(PathBuf::from("/tmp")));
        assert_eq!(opts.env.len(), 3);
        assert_eq!(opts.timeout, Some(Duration::from_secs(5)));
        assert!(format!("{:?}", opts).contains("output_handler: true"));
    }
}
