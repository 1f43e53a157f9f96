//! vault-cleanup: deduplicate a password-manager export and merge in a
//! browser password export.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vault_cleanup::{
    clean_records, import_browser_csv, DecisionOracle, DeclineOracle, FileStore, MergeCache, TerminalOracle,
    VaultExport,
};

#[derive(Parser, Debug)]
#[command(name = "vault-cleanup")]
#[command(version, about = "Clean a password-manager JSON export and optionally merge browser passwords")]
struct Args {
    /// Path to the password-manager JSON export
    #[arg(value_name = "VAULT_JSON")]
    vault_json: PathBuf,

    /// Path to a browser passwords CSV export
    #[arg(short = 'c', long)]
    chrome_csv: Option<PathBuf>,

    /// Where to write the cleaned JSON
    #[arg(short, long)]
    output: PathBuf,

    /// Merge-decision cache file
    #[arg(long, env = "VAULT_CLEANUP_CACHE", default_value = "cache.json")]
    cache: PathBuf,

    /// Never prompt; only replay cached decisions
    #[arg(long, default_value_t = false)]
    no_prompt: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so they don't interleave with the prompt table
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let export = VaultExport::load(&args.vault_json)
        .with_context(|| format!("failed to read vault export {}", args.vault_json.display()))?;

    let secondary = match &args.chrome_csv {
        Some(path) => Some(
            import_browser_csv(path)
                .with_context(|| format!("failed to read browser export {}", path.display()))?,
        ),
        None => None,
    };

    let mut cache = MergeCache::open(FileStore::new(&args.cache));
    let mut oracle: Box<dyn DecisionOracle> = if args.no_prompt {
        Box::new(DeclineOracle)
    } else {
        Box::new(TerminalOracle::stdio())
    };

    let cleaned = clean_records(export.logins.clone(), secondary, &mut cache, oracle.as_mut())
        .context("cleanup failed")?;

    export
        .save(&args.output, &cleaned.records)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    Ok(())
}
