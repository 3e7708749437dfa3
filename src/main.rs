//! packsync: builds the modpack manifest and keeps object storage in step
//! with it.
//!
//! Exit status: `0` when the manifest is unchanged, `1` when it was
//! rewritten, `2` on any failure.

mod error;

use crate::error::{ErrorKind, Result};
use clap::{Parser, Subcommand};
use exn::ResultExt;
use packsync_config::{AppConfig, StorageConfig};
use packsync_manifest::{Assembler, HashAlgorithm, Manifest, Scanner};
use packsync_storage::BackendHandle;
use packsync_storage::backend::{LocalBackend, S3Backend};
use packsync_sync::{Outcome, Publisher};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const CRATES: [&str; 5] = ["packsync", "packsync_config", "packsync_manifest", "packsync_storage", "packsync_sync"];
const EXIT_FAILURE: u8 = 2;

#[derive(Parser)]
#[command(name = "packsync", version, about = "Build the modpack manifest and sync object storage with it")]
struct Cli {
    /// Configuration file (default: packsync.{toml,yaml,yml,json} in the
    /// working directory, then the user configuration directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rebuild the local manifest without touching storage
    Build,
    /// Reconcile storage with the current tree, then persist and publish
    /// the manifest
    Sync {
        /// Log every storage mutation instead of performing it
        #[arg(long)]
        dry_run: bool,
    },
    /// Check every modpack configuration and file without writing anything
    Validate,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(err) => {
            tracing::error!("{err:?}");
            ExitCode::from(EXIT_FAILURE)
        },
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives: Vec<_> = CRATES.iter().map(|name| format!("{name}={level}")).collect();
        EnvFilter::new(format!("warn,{}", directives.join(",")))
    });
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).init();
}

async fn run(cli: Cli) -> Result<Outcome> {
    let config = AppConfig::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    let manifest_path = config.repository_root.join(&config.manifest_path);
    let new = assemble(&config)?;

    match cli.command {
        Command::Validate => {
            println!("{} modpack(s) valid", new.modpacks.len());
            Ok(Outcome::Unchanged)
        },
        Command::Build => {
            let old = Manifest::load_or_default(&manifest_path);
            if new == old {
                println!("Manifest unchanged");
                return Ok(Outcome::Unchanged);
            }
            new.save(&manifest_path).or_raise(|| ErrorKind::Manifest)?;
            println!("Manifest written to {}", manifest_path.display());
            Ok(Outcome::Changed { deleted: 0, uploaded: 0 })
        },
        Command::Sync { dry_run } => {
            let mut publisher =
                Publisher::new(backend(&config)?, &config.repository_root, &config.manifest_path, &config.manifest_key);
            if dry_run {
                publisher = publisher.dry_run();
            }
            // Diff against what storage holds, not the local file `build` keeps.
            let old = publisher.published().await.or_raise(|| ErrorKind::Sync)?;
            let outcome = publisher.publish(&new, &old).await.or_raise(|| ErrorKind::Sync)?;
            match outcome {
                Outcome::Unchanged => println!("No changes"),
                Outcome::Changed { deleted, uploaded } => {
                    println!("Changes applied: {deleted} deleted, {uploaded} uploaded");
                },
            }
            Ok(outcome)
        },
    }
}

fn assemble(config: &AppConfig) -> Result<Manifest> {
    let algorithm = config.hash_algorithm.parse::<HashAlgorithm>().or_raise(|| ErrorKind::Config)?;
    let scanner = Scanner::new(&config.repository_root, &config.base_url).with_algorithm(algorithm);
    Assembler::new(scanner).assemble(&config.modpacks_dir).or_raise(|| ErrorKind::Manifest)
}

fn backend(config: &AppConfig) -> Result<BackendHandle> {
    let storage = || ErrorKind::Storage;
    let backend: BackendHandle = match &config.storage {
        StorageConfig::Local { path } => {
            let root = std::path::absolute(config.repository_root.join(path)).or_raise(storage)?;
            Arc::new(LocalBackend::new("local", root).or_raise(storage)?)
        },
        StorageConfig::S3 { bucket, region, endpoint, prefix, key_id, key_secret } => Arc::new(
            S3Backend::new("s3", bucket, prefix.clone(), region, endpoint.as_deref(), key_id, key_secret)
                .or_raise(storage)?,
        ),
    };
    tracing::debug!(backend = backend.name(), "Storage backend ready");
    Ok(backend)
}
