//! Process runner.

use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Instant;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, trace};

use super::options::ExecOptions;
use super::result::{OutputChunk, OutputHandler, OutputSource, Utf8Decoder};
use super::state::RunState;
use crate::error::{ExecError, GENERIC_FAILURE_CODE};
use crate::Result;

/// Buffer size for reading child output.
const READ_BUFFER_SIZE: usize = 8192;

/// Empty argument list, for programs run without arguments.
pub const NO_ARGS: &[&str] = &[];

/// Runs external programs to completion.
///
/// The runner only holds options; every call to [`ProcessRunner::run`] is an
/// independent invocation and nothing carries over between runs.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    options: ExecOptions,
}

impl ProcessRunner {
    /// Create a runner with the given options.
    pub fn new(options: ExecOptions) -> Self {
        Self { options }
    }

    /// Options applied to every run.
    pub fn options(&self) -> &ExecOptions {
        &self.options
    }

    /// Run `program` with `args` and wait for it to exit.
    ///
    /// Output on piped streams is handed to the output handler and, unless
    /// suppressed, echoed to this process's own stdout/stderr. Returns the
    /// exit code when it is one of the accepted success codes.
    ///
    /// # Errors
    ///
    /// - [`ExecError::MissingProgram`] if `program` is blank; nothing is spawned.
    /// - [`ExecError::Spawn`] if the OS cannot start the program.
    /// - [`ExecError::UnexpectedExitCode`] if the exit code is not accepted.
    /// - [`ExecError::TimedOut`] if a timeout is set and the child outlives it.
    pub async fn run<S: AsRef<str>>(&self, program: &str, args: &[S]) -> Result<i32> {
        if program.trim().is_empty() {
            return Err(ExecError::MissingProgram);
        }

        let opts = &self.options;
        let mut state = RunState::Created;
        let start = Instant::now();

        debug!(
            program = %program,
            args = ?args.iter().map(AsRef::as_ref).collect::<Vec<&str>>(),
            use_shell = opts.use_shell,
            "spawning process"
        );

        let mut child = build_command(program, args, opts)
            .spawn()
            .map_err(|source| ExecError::Spawn {
                program: program.to_string(),
                source,
            })?;
        advance(&mut state, RunState::Spawned);
        let pid = child.id();
        debug!(pid = ?pid, "process spawned");

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        if stdout.is_some() || stderr.is_some() {
            advance(&mut state, RunState::Streaming);
        }

        let handler = opts.output_handler.as_deref();
        let echo = !opts.suppress_local_echo;

        // The exit status only counts once both pipes have drained.
        let settle = async {
            let (_, _, status) = tokio::join!(
                pump(stdout, OutputSource::Stdout, handler, echo.then(tokio::io::stdout)),
                pump(stderr, OutputSource::Stderr, handler, echo.then(tokio::io::stderr)),
                child.wait(),
            );
            status
        };

        let status = match opts.timeout {
            None => settle.await,
            Some(limit) => {
                let outcome = tokio::time::timeout(limit, settle).await;
                match outcome {
                    Ok(status) => status,
                    Err(_) => {
                        debug!(timeout = ?limit, "timeout elapsed, killing process");
                        kill_process_group(pid);
                        if let Err(e) = child.kill().await {
                            debug!(error = %e, "failed to kill timed-out process");
                        }
                        advance(&mut state, RunState::Terminated);
                        return Err(ExecError::TimedOut { timeout: limit });
                    }
                }
            }
        }?;
        advance(&mut state, RunState::Terminated);

        let code = exit_code_of(status);
        debug!(
            exit_code = code,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "process exited"
        );

        if opts.success_exit_codes.contains(code) {
            Ok(code)
        } else {
            Err(ExecError::UnexpectedExitCode {
                expected: opts.success_exit_codes.clone(),
                actual: code,
            })
        }
    }
}

/// Run a program once with the given options.
///
/// Shorthand for `ProcessRunner::new(options).run(program, args)`.
pub async fn exec<S: AsRef<str>>(program: &str, args: &[S], options: ExecOptions) -> Result<i32> {
    ProcessRunner::new(options).run(program, args).await
}

/// Run a program that must exit with `0`.
///
/// Without a handler the child's output is swallowed; with one, output is
/// both echoed and handed to the handler.
pub async fn exec_checked<S: AsRef<str>>(
    program: &str,
    args: &[S],
    handler: Option<Arc<dyn OutputHandler>>,
    use_shell: bool,
) -> Result<()> {
    let mut options = ExecOptions::new()
        .use_shell(use_shell)
        .suppress_local_echo(handler.is_none());
    if let Some(handler) = handler {
        options = options.output_handler(handler);
    }

    exec(program, args, options).await.map(|_| ())
}

fn advance(state: &mut RunState, target: RunState) {
    match state.transition_to(target) {
        Ok(()) => trace!(state = ?target, "run state changed"),
        Err(e) => debug!(error = %e, "ignoring run state change"),
    }
}

fn build_command<S: AsRef<str>>(program: &str, args: &[S], opts: &ExecOptions) -> Command {
    let mut command = if opts.use_shell {
        shell_command(program, args)
    } else {
        let mut c = Command::new(program);
        c.args(args.iter().map(AsRef::as_ref));
        c
    };

    command
        .stdin(opts.stdio.stdin.to_stdio())
        .stdout(opts.stdio.stdout.to_stdio())
        .stderr(opts.stdio.stderr.to_stdio())
        .envs(&opts.env);

    if let Some(ref dir) = opts.working_dir {
        command.current_dir(dir);
    }

    // A timed run leads its own group so the whole tree can be killed.
    #[cfg(unix)]
    if opts.timeout.is_some() {
        command.process_group(0);
    }

    command
}

/// Kill every process in the group led by `pid`.
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = pid.and_then(|pid| i32::try_from(pid).ok()) else {
        return;
    };
    if let Err(e) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        debug!(pgid = pid, error = %e, "failed to kill process group");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

/// The single command line handed to the host shell.
///
/// Nothing is escaped: the shell sees exactly `program arg1 arg2 ...`.
fn shell_line<S: AsRef<str>>(program: &str, args: &[S]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(AsRef::as_ref))
        .collect::<Vec<&str>>()
        .join(" ")
}

#[cfg(windows)]
fn shell_command<S: AsRef<str>>(program: &str, args: &[S]) -> Command {
    let mut c = Command::new("cmd.exe");
    c.args(["/d", "/s", "/c"])
        .raw_arg(format!("\"{}\"", shell_line(program, args)));
    c
}

#[cfg(not(windows))]
fn shell_command<S: AsRef<str>>(program: &str, args: &[S]) -> Command {
    let mut c = Command::new("/bin/sh");
    c.arg("-c").arg(shell_line(program, args));
    c
}

/// Read one child stream to EOF, dispatching each chunk.
///
/// The echo gets the bytes exactly as read. Text is decoded across reads so
/// a character split between two reads reaches the handler intact.
async fn pump<R, W>(
    reader: Option<R>,
    source: OutputSource,
    handler: Option<&dyn OutputHandler>,
    mut echo: Option<W>,
) where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let Some(mut reader) = reader else {
        return;
    };
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    let mut decoder = Utf8Decoder::default();

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                debug!(stream = ?source, error = %e, "stopped reading child output");
                break;
            }
        };
        trace!(stream = ?source, bytes = n, "output chunk");

        let raw = buf[..n].to_vec();
        let text = decoder.decode(&raw);
        let chunk = OutputChunk::with_text(raw, text, source);
        if let Some(handler) = handler {
            handler.on_output(&chunk);
        }

        if let Some(ref mut out) = echo {
            let written = async {
                out.write_all(&chunk.raw).await?;
                out.flush().await
            };
            if let Err(e) = written.await {
                debug!(stream = ?source, error = %e, "local echo failed");
            }
        }
    }

    // Truncated sequence at EOF; its bytes were already delivered and echoed.
    if let (Some(tail), Some(handler)) = (decoder.finish(), handler) {
        handler.on_output(&OutputChunk::with_text(Vec::new(), tail, source));
    }
}

/// Integer exit code for a finished child.
///
/// On Unix a signal-terminated child reports `128 + signal`, as shells do.
fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    GENERIC_FAILURE_CODE
}
