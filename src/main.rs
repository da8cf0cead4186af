//! exec-runner binary entry point.

use exec_runner::cli::{self, Args};
use exec_runner::config::Config;
use exec_runner::{logging, ProcessRunner};
use tracing::debug;

/// Exit code for invalid usage.
const USAGE_ERROR: i32 = 2;

#[tokio::main]
async fn main() {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("Try 'exec-runner --help' for more information.");
            std::process::exit(USAGE_ERROR);
        }
    };

    if args.help {
        cli::print_help();
        return;
    }

    if args.version {
        cli::print_version();
        return;
    }

    std::process::exit(run(args).await);
}

async fn run(args: Args) -> i32 {
    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return USAGE_ERROR;
        }
    };

    // Logging must come after config so the configured level applies
    let _ = logging::try_init_with_filter(Some(config.log_filter()));

    let Some(program) = args.program.as_deref() else {
        eprintln!("error: missing <PROGRAM>");
        eprintln!("Try 'exec-runner --help' for more information.");
        return USAGE_ERROR;
    };

    debug!(?config, "configuration loaded");
    debug!(program = %program, "exec-runner v{}", env!("CARGO_PKG_VERSION"));

    let runner = ProcessRunner::new(config.to_exec_options());
    match runner.run(program, &args.args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("exec-runner: {}", e);
            e.exit_code()
        }
    }
}
