use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use s2ib::config::{self, PullPolicy};
use s2ib::definition::EnvVar;
use s2ib::engine::{CliEngine, resolve_runtime};
use s2ib::pipeline::{BuildOptions, BuildRequest, run_build, run_usage};

/// s2ib - build container images from source and a builder image
#[derive(Parser)]
#[command(name = "s2ib")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Container engine to drive (docker or podman); probed when unset
    #[arg(long, global = true, env = "S2IB_ENGINE")]
    engine: Option<String>,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an image from application source and a builder image
    Build {
        /// Git URL or local directory holding the application source
        source: String,

        /// Builder image providing the assemble and run scripts
        image: String,

        /// Tag for the resulting image
        tag: String,

        /// Set an environment variable for assemble and run (repeatable)
        #[arg(short = 'e', long = "env", value_name = "NAME=VALUE")]
        env: Vec<EnvVar>,

        /// When to pull the builder image: always, never or if-not-present
        #[arg(short = 'p', long)]
        pull_policy: Option<PullPolicy>,

        /// Reuse artifacts saved by the previous build of the tag
        #[arg(long)]
        incremental: bool,

        /// Volume to mount during the build, passed to the engine as-is
        #[arg(short = 'v', value_name = "MOUNT")]
        volume: Option<String>,
    },

    /// Print the usage text shipped with a builder image
    Usage {
        /// Builder image to query
        image: String,
    },
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => return argument_error(e),
    };

    init_logging(cli.quiet);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// `--help`/`--version` succeed; every other parse failure prints usage and
/// exits 1.
fn argument_error(e: clap::Error) -> ExitCode {
    if !e.use_stderr() {
        let _ = e.print();
        return ExitCode::SUCCESS;
    }
    let rendered = e.render().to_string();
    if e.kind() == ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand {
        eprintln!("ERROR: missing command\n");
        eprint!("{rendered}");
    } else {
        eprint!(
            "ERROR: {}",
            rendered.strip_prefix("error: ").unwrap_or(&rendered)
        );
    }
    ExitCode::FAILURE
}

fn init_logging(quiet: bool) {
    let default = if quiet { "s2ib=warn" } else { "s2ib=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let cwd = std::env::current_dir().context("failed to determine working directory")?;
    let mut cfg = config::load(&cwd)?;
    if cli.engine.is_some() {
        cfg.engine = cli.engine;
    }

    let program = resolve_runtime(cfg.engine.as_deref())?;
    let engine = CliEngine::new(
        program,
        Duration::from_secs(cfg.engine_timeout),
        Duration::from_secs(cfg.build_timeout),
    );

    match cli.command {
        Commands::Build {
            source,
            image,
            tag,
            env,
            pull_policy,
            incremental,
            volume,
        } => {
            let request = BuildRequest {
                source_location: source,
                base_image: image,
                destination_tag: tag,
                options: BuildOptions {
                    env,
                    pull_policy: pull_policy.unwrap_or(cfg.pull_policy),
                    incremental,
                    mount: volume,
                },
            };
            let outcome = run_build(&engine, &cfg, &request)?;
            println!("{}", outcome.tag);
        }
        Commands::Usage { image } => {
            print!("{}", run_usage(&engine, &cfg, &image)?);
        }
    }

    Ok(())
}
