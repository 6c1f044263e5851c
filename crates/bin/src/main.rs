//! Folio CLI binary.
//!
//! Pages through the latest SEC filing of a company from the command line.
//! JSON goes to stdout; logs go to stderr.

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use folio::{FilingPager, FolioConfig, PageRequest, ToolOutput};
use folio_data::edgar::{EdgarEndpoints, FormType};
use std::process;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Folio: latest SEC filings in cursor-addressed chunks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch one chunk of a company's latest filing
    Page {
        /// Company ticker
        ticker: String,

        /// Form type, e.g. 10-K or "DEF 14A"
        #[arg(long, default_value = "10-K")]
        form: String,

        /// Zero-based chunk index
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        cursor: i64,

        /// Print every chunk instead of one
        #[arg(long)]
        all: bool,
    },

    /// List supported form types
    Forms,
}

#[derive(Args)]
struct Settings {
    /// Identifying user agent with a contact e-mail, as SEC requires
    #[arg(long, env = "FOLIO_USER_AGENT", global = true)]
    user_agent: Option<String>,

    /// Lifetime of a cached filing in seconds
    #[arg(long, env = "FOLIO_CACHE_TTL_SECS", global = true)]
    cache_ttl_secs: Option<u64>,

    /// Lifetime of the ticker catalog in seconds
    #[arg(long, env = "FOLIO_CATALOG_TTL_SECS", global = true)]
    catalog_ttl_secs: Option<u64>,

    /// Maximum characters per chunk
    #[arg(long, env = "FOLIO_CHUNK_CAPACITY", global = true)]
    chunk_capacity: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long, env = "FOLIO_TIMEOUT_SECS", global = true)]
    timeout_secs: Option<u64>,

    /// Attempts per request, including the first
    #[arg(long, env = "FOLIO_MAX_ATTEMPTS", global = true)]
    max_attempts: Option<u32>,

    /// Delay before the first retry in milliseconds
    #[arg(long, env = "FOLIO_RETRY_DELAY_MS", global = true)]
    retry_delay_ms: Option<u64>,

    /// Base URL for the catalog and archives
    #[arg(long, env = "FOLIO_SEC_WWW_URL", global = true)]
    www_url: Option<String>,

    /// Base URL for submissions
    #[arg(long, env = "FOLIO_SEC_DATA_URL", global = true)]
    data_url: Option<String>,
}

impl Settings {
    fn config(&self) -> anyhow::Result<FolioConfig> {
        let mut config = FolioConfig::default();

        if let Some(secs) = self.cache_ttl_secs {
            config = config.with_cache_ttl(Duration::from_secs(secs));
        }
        if let Some(secs) = self.catalog_ttl_secs {
            config = config.with_catalog_ttl(Duration::from_secs(secs));
        }
        if let Some(capacity) = self.chunk_capacity {
            if capacity == 0 {
                bail!("--chunk-capacity must be positive");
            }
            config = config.with_chunk_capacity(capacity);
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_request_timeout(Duration::from_secs(secs));
        }

        let mut retry = config.retry;
        if let Some(attempts) = self.max_attempts {
            retry.max_attempts = attempts.max(1);
        }
        if let Some(ms) = self.retry_delay_ms {
            retry.base_delay = Duration::from_millis(ms);
        }
        config = config.with_retry(retry);

        if self.www_url.is_some() || self.data_url.is_some() {
            let defaults = EdgarEndpoints::default();
            config = config.with_endpoints(EdgarEndpoints {
                www: self.www_url.clone().unwrap_or(defaults.www),
                data: self.data_url.clone().unwrap_or(defaults.data),
            });
        }

        Ok(config)
    }

    fn user_agent(&self) -> anyhow::Result<&str> {
        self.user_agent
            .as_deref()
            .context("a user agent is required; pass --user-agent or set FOLIO_USER_AGENT")
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = init_tracing() {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }

    match run().await {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

/// Logs to stderr, filtered by `RUST_LOG` (default `info`).
fn init_tracing() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    let fmt_layer = fmt::layer().with_writer(std::io::stderr).with_target(true);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))
}

/// Returns the process exit code.
async fn run() -> anyhow::Result<i32> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Forms => {
            for form in FormType::ALL {
                println!("{}", form);
            }
            Ok(0)
        }
        Commands::Page {
            ticker,
            form,
            cursor,
            all,
        } => {
            let config = cli.settings.config()?;
            let pager = FilingPager::new(&config).context("failed to build pager")?;
            let request = PageRequest::new(ticker, form, cursor, cli.settings.user_agent()?);

            if all {
                sweep(&pager, &request).await
            } else {
                let output = pager.invoke(request).await;
                print_json(&output)?;
                Ok(exit_code(&output))
            }
        }
    }
}

async fn sweep(pager: &FilingPager, request: &PageRequest) -> anyhow::Result<i32> {
    match pager.sweep(request).await {
        Ok(pages) => {
            tracing::info!(pages = pages.len(), "Swept filing");
            print_json(&pages)?;
            Ok(0)
        }
        Err(err) => {
            let output = ToolOutput::Error(err.to_payload());
            print_json(&output)?;
            Ok(exit_code(&output))
        }
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

const fn exit_code(output: &ToolOutput) -> i32 {
    if output.is_error() { 2 } else { 0 }
}
