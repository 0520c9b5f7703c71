use clap::{Parser, Subcommand};
use qradle_cli::commands::{inspect, proof, run, timeline, verify};
use qradle_cli::telemetry;
use qradle_kernel::{CoreConfig, DigestAlgorithm};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "qradle")]
#[command(about = "Qradle Forensic CLI - inspect, verify and extend a deterministic execution log", long_about = None)]
struct Cli {
    /// Digest algorithm the log was written with (sha256 or blake3)
    #[arg(long, global = true, default_value = "sha256")]
    digest: DigestAlgorithm,

    /// Genesis tag the chain was seeded with
    #[arg(long, global = true)]
    genesis_tag: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show every record of a log file
    Inspect {
        log: PathBuf,
    },
    /// Verify hashes and links of a log file
    Verify {
        log: PathBuf,
    },
    /// Print the proof for one entry
    Proof {
        log: PathBuf,

        /// Position of the entry in the chain
        #[arg(long, short)]
        index: usize,

        /// Emit a Merkle inclusion proof instead of the linear chain proof
        #[arg(long)]
        merkle: bool,
    },
    /// List the execution lifecycle events
    Timeline {
        log: PathBuf,
    },
    /// Execute a JSON contract with the built-in `sum` operation
    Run {
        contract: PathBuf,

        /// Log file to append to (created if missing)
        #[arg(long)]
        log: PathBuf,

        /// Skip the pre-execution checkpoint
        #[arg(long)]
        no_checkpoint: bool,

        /// Print collected metrics after the run
        #[arg(long)]
        metrics: bool,
    },
}

fn main() -> anyhow::Result<()> {
    telemetry::init_telemetry();

    let cli = Cli::parse();

    let mut config = CoreConfig::default().with_digest(cli.digest);
    if let Some(tag) = cli.genesis_tag {
        config = config.with_genesis_tag(tag);
    }

    match cli.command {
        Commands::Inspect { log } => inspect::run(&log, &config),
        Commands::Verify { log } => verify::run(&log, &config),
        Commands::Proof { log, index, merkle } => proof::run(&log, &config, index, merkle),
        Commands::Timeline { log } => timeline::run(&log, &config),
        Commands::Run {
            contract,
            log,
            no_checkpoint,
            metrics,
        } => {
            let result = run::run(&contract, &log, &config, !no_checkpoint);
            if metrics {
                println!("\n{}", telemetry::get_metrics());
            }
            result
        }
    }
}
