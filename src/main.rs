//! gitpin CLI entry point

use std::path::PathBuf;

use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};

use gitpin::cli::context::RunContext;
use gitpin::util::Runner;

#[derive(Parser)]
#[command(name = "gp")]
#[command(author, version, about = "Keep vendored git modules at pinned commits", long_about = None)]
struct Cli {
    /// Directory holding the module records
    #[arg(short, long, global = true, default_value = ".")]
    directory: PathBuf,

    /// File listing the records to operate on, one path per line
    #[arg(long, global = true)]
    inis: Option<PathBuf>,

    /// Kill any git or p4 invocation after this many seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Show verbose output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Bring every module's working copy to its pinned commit
    Checkout {
        /// Mirror base: a URL prefix or a local directory
        #[arg(long, env = "GITPIN_MIRRORS")]
        mirrors: Option<String>,
        /// Where to write the tree-URL manifest
        #[arg(long, default_value = "manifest.txt")]
        manifest: PathBuf,
    },
    /// Show each module's working copy against its record
    Status {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Stage drifted records in p4 for review and submit
    Prepare {
        /// Skip pin verification
        #[arg(long)]
        no_verify: bool,
    },
    /// Verify every module's HEAD is published on a remote
    Verify,
    /// Convert a repository's git submodules into module records
    Convert {
        /// Repository holding the .gitmodules file
        repo: PathBuf,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let ctx = RunContext {
        directory: cli.directory.clone(),
        inis: cli.inis.clone(),
        runner: Runner::new(cli.timeout),
        p4_program: None,
        verbose: cli.verbose > 0,
    };

    match cli.command {
        Some(Commands::Checkout { mirrors, manifest }) => {
            gitpin::cli::commands::checkout::run_checkout(&ctx, mirrors.as_deref(), &manifest)?;
        }
        Some(Commands::Status { json }) => {
            gitpin::cli::commands::status::run_status(&ctx, json)?;
        }
        Some(Commands::Prepare { no_verify }) => {
            gitpin::cli::commands::prepare::run_prepare(&ctx, no_verify)?;
        }
        Some(Commands::Verify) => {
            gitpin::cli::commands::verify::run_verify(&ctx)?;
        }
        Some(Commands::Convert { repo }) => {
            gitpin::cli::commands::convert::run_convert(&ctx, &repo)?;
        }
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "gp", &mut std::io::stdout());
        }
        None => {
            println!("gitpin - keep vendored git modules at pinned commits");
            println!("Run 'gp --help' for usage");
        }
    }

    Ok(())
}

/// Logs go to stderr so `--json` output stays parseable.
fn init_tracing(verbose: u8) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(match verbose {
            0 => "gitpin=info",
            1 => "gitpin=debug",
            _ => "gitpin=trace",
        })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
