//! verify_cli - run one verification batch from the terminal
//!
//! Usage:
//!   cargo run --features cli --bin verify_cli -- \
//!     --keys keys.txt \
//!     --names names.txt \
//!     [--json] [--token <token>]
//!
//! `names.txt` holds one tab-separated line (given name, first surname,
//! second surname) per key line.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use async_trait::async_trait;
use clap::Parser;
use colored::Colorize;

use batch_verify::{
    parse_batch, BatchSummary, Credential, Dispatcher, HttpRegistry, Record, RecordStatus,
    ResultSink, SinkError, TokenStore, TokioSleeper, VerificationClient, VerifyConfig,
};

/// Verify a batch of identity records against the registry
#[derive(Parser, Debug)]
#[command(name = "verify_cli")]
#[command(about = "Verify a batch of identity records against the registry")]
struct Args {
    /// File with one lookup key per line
    #[arg(long, short = 'k')]
    keys: PathBuf,

    /// File with one tab-separated name line per key
    #[arg(long, short = 'n')]
    names: PathBuf,

    /// Print one JSON object per record instead of coloured text
    #[arg(long)]
    json: bool,

    /// Registry token (falls back to the token file)
    #[arg(long, env = "REGISTRY_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// File holding the stored registry token
    #[arg(long, env = "TOKEN_FILE", default_value = "token.txt")]
    token_file: PathBuf,

    /// Registry endpoint
    #[arg(long, env = "REGISTRY_URL")]
    registry_url: Option<String>,

    /// Maximum concurrent lookups
    #[arg(long, short = 'w', env = "MAX_WORKERS", default_value_t = 3)]
    max_workers: usize,

    /// Delay between task launches in milliseconds
    #[arg(long, env = "REQUEST_DELAY_MS", default_value_t = 200)]
    delay_ms: u64,

    /// Lookup attempts per record
    #[arg(long, env = "MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,
}

impl Args {
    fn config(&self) -> anyhow::Result<VerifyConfig> {
        let mut config = VerifyConfig::from_env().context("invalid configuration")?;
        if let Some(url) = &self.registry_url {
            config.registry_url = url.clone();
        }
        config.max_workers = self.max_workers;
        config.request_delay_ms = self.delay_ms;
        config.max_retries = self.max_retries;
        config.token_file = self.token_file.clone();
        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

/// Prints each record as it completes
struct TerminalSink {
    json: bool,
}

#[async_trait]
impl ResultSink for TerminalSink {
    async fn begin(&mut self, total: usize) -> Result<(), SinkError> {
        if !self.json {
            println!("{} {} records", "Verifying".bold(), total);
        }
        Ok(())
    }

    async fn emit(&mut self, record: &Record) -> Result<(), SinkError> {
        if self.json {
            let line = serde_json::to_string(&record.view())
                .map_err(|e| SinkError::Write(e.to_string()))?;
            println!("{line}");
            return Ok(());
        }

        match &record.status {
            RecordStatus::Resolved {
                authoritative,
                matches,
            } => {
                let mark = if matches.all() {
                    "MATCH".green().bold()
                } else {
                    "DIFF".yellow().bold()
                };
                let fields: Vec<String> = authoritative
                    .as_array()
                    .into_iter()
                    .zip(matches.as_array())
                    .map(|(name, ok)| {
                        if ok {
                            name.green().to_string()
                        } else {
                            name.red().to_string()
                        }
                    })
                    .collect();
                println!("[{:>4}] {} {:<12} {}", record.id, mark, record.key, fields.join(" "));
            }
            RecordStatus::Failed { error } => {
                println!(
                    "[{:>4}] {} {:<12} {}",
                    record.id,
                    "FAIL".red().bold(),
                    record.key,
                    error.tag().as_str().dimmed()
                );
            }
            RecordStatus::Pending => {}
        }
        Ok(())
    }

    async fn finish(&mut self, summary: &BatchSummary) -> Result<(), SinkError> {
        if self.json {
            let line =
                serde_json::to_string(summary).map_err(|e| SinkError::Write(e.to_string()))?;
            println!("{line}");
        } else {
            println!();
            println!(
                "{} {} resolved, {} failed of {} in {}ms",
                "Done:".bold(),
                summary.resolved.to_string().as_str().green(),
                summary.failed.to_string().as_str().red(),
                summary.total,
                summary.elapsed_ms
            );
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "batch_verify=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = args.config()?;

    let credential = match &args.token {
        Some(token) => Credential::new(token),
        None => TokenStore::new(config.token_file.clone())
            .load()
            .await
            .with_context(|| {
                format!(
                    "no registry token: pass --token or write one to {}",
                    config.token_file.display()
                )
            })?,
    };
    if credential.is_blank() {
        bail!("registry token must not be blank");
    }

    let keys = tokio::fs::read_to_string(&args.keys)
        .await
        .with_context(|| format!("failed to read {}", args.keys.display()))?;
    let names = tokio::fs::read_to_string(&args.names)
        .await
        .with_context(|| format!("failed to read {}", args.names.display()))?;
    let records = parse_batch(&keys, &names);

    let registry =
        HttpRegistry::new(config.registry()).context("failed to build registry client")?;
    let sleeper = Arc::new(TokioSleeper);
    let client = VerificationClient::new(
        Arc::new(registry),
        credential,
        config.retry(),
        sleeper.clone(),
    );
    let dispatcher = Dispatcher::new(config.dispatch(), sleeper)?;

    let mut sink = TerminalSink { json: args.json };
    let summary = dispatcher.run(records, client, &mut sink).await?;

    if summary.failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
