//! CLI entry point for Cosmic Watch.
//!
//! Provides subcommands for ranking the near-earth-object feed, writing
//! advisories for the riskiest objects, and checking the advisory model.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use cosmic_watch::advisory::{
    AdvisoryGenerator, AdvisoryReport, AdvisoryRequest, GeminiClient, TextGenerator,
    UnconfiguredGenerator,
};
use cosmic_watch::config::Config;
use cosmic_watch::neo::{DateRange, FeedNormalizer, NeoWsClient, RiskAssessment, RiskLevel};
use cosmic_watch::output::{RankedFeed, append_records, print_pretty, write_json};
use serde::Serialize;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use tracing::Instrument;
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "cosmic_watch")]
#[command(about = "Rank near-earth objects by risk and write short advisories", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the NEO feed for a date window and print it ranked by risk
    Feed {
        /// First day of the window (YYYY-MM-DD), defaults to today
        #[arg(long)]
        start_date: Option<NaiveDate>,

        /// Last day of the window (YYYY-MM-DD), defaults to today
        #[arg(long)]
        end_date: Option<NaiveDate>,

        /// CSV file to append the ranked rows to
        #[arg(short, long)]
        output: Option<String>,

        /// Pretty-print the JSON
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },
    /// Write advisories for objects in the feed
    Advise {
        /// First day of the window (YYYY-MM-DD), defaults to today
        #[arg(long)]
        start_date: Option<NaiveDate>,

        /// Last day of the window (YYYY-MM-DD), defaults to today
        #[arg(long)]
        end_date: Option<NaiveDate>,

        /// Only advise on this object id
        #[arg(long)]
        id: Option<String>,

        /// Number of highest-risk objects to advise on when no id is given
        #[arg(short = 'n', long, default_value_t = 3)]
        top: usize,
    },
    /// Write one advisory from explicit object facts
    Summary {
        #[arg(long)]
        name: String,

        /// Estimated maximum diameter in km
        #[arg(long)]
        size: f64,

        /// Relative velocity in km/h
        #[arg(long)]
        speed: f64,

        /// Miss distance in km
        #[arg(long)]
        distance: f64,

        /// Low, Moderate, Critical or Extreme
        #[arg(long)]
        risk: RiskLevel,
    },
    /// List Gemini models usable for advisories
    ListModels,
}

#[derive(Serialize)]
struct AdvisoryOutput<'a> {
    id: Option<&'a str>,
    name: &'a str,
    #[serde(flatten)]
    report: &'a AdvisoryReport,
}

type DynGenerator = Box<dyn TextGenerator>;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/cosmic_watch.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("cosmic_watch.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    // Validate configuration before doing any work.
    let config = Config::from_env().context("invalid configuration")?;
    info!(
        feed_url = config.neo.as_ref().map(|n| n.url.as_str()),
        model = %config.gemini.model,
        advisories_live = config.gemini.api_key.is_some(),
        "Configuration loaded"
    );
    if config.neo.is_none() {
        warn!("NASA_API_KEY not set, feed and advise commands are unavailable");
    }
    if config.gemini.api_key.is_none() {
        warn!("GEMINI_API_KEY not set, advisories will be simulated");
    }

    until_interrupted(run(cli.command, config), tokio::signal::ctrl_c()).await
}

/// Runs `command` unless `interrupt` resolves first. Dropping the command
/// future aborts any in-flight request; an interrupted run is an error.
async fn until_interrupted<C, I>(command: C, interrupt: I) -> Result<()>
where
    C: Future<Output = Result<()>>,
    I: Future<Output = std::io::Result<()>>,
{
    tokio::select! {
        result = command => result,
        _ = interrupt => {
            warn!("Interrupted, abandoning in-flight requests");
            anyhow::bail!("interrupted before the command finished")
        }
    }
}

async fn run(command: Commands, config: Config) -> Result<()> {
    match command {
        Commands::Feed {
            start_date,
            end_date,
            output,
            pretty,
        } => {
            let range = resolve_range(start_date, end_date)?;
            let assessments = ranked_feed(&config, range).await?;

            print_pretty(&assessments);
            if let Some(path) = output {
                append_records(&path, &assessments)?;
                info!(path = %path, rows = assessments.len(), "Ranked rows appended");
            }

            let feed = RankedFeed::new(range.start(), range.end(), &assessments);
            write_json(std::io::stdout().lock(), &feed, pretty)?;
        }
        Commands::Advise {
            start_date,
            end_date,
            id,
            top,
        } => {
            let range = resolve_range(start_date, end_date)?;
            let assessments = ranked_feed(&config, range).await?;

            let selected: Vec<RiskAssessment> = match id {
                Some(id) => {
                    let found: Vec<_> = assessments.into_iter().filter(|a| a.id == id).collect();
                    if found.is_empty() {
                        anyhow::bail!("object {id} not found in feed for {range}");
                    }
                    found
                }
                None => assessments.into_iter().take(top).collect(),
            };

            let generator = Arc::new(advisory_generator(&config)?);
            advise_all(generator, selected).await?;
        }
        Commands::Summary {
            name,
            size,
            speed,
            distance,
            risk,
        } => {
            let generator = advisory_generator(&config)?;
            let request = AdvisoryRequest {
                id: None,
                name,
                diameter_km: size,
                velocity_kmh: speed,
                miss_distance_km: distance,
                risk_level: risk,
            };

            let report = generator.generate(&request).await;
            let out = AdvisoryOutput {
                id: None,
                name: &request.name,
                report: &report,
            };
            write_json(std::io::stdout().lock(), &out, false)?;
        }
        Commands::ListModels => {
            let api_key = config
                .gemini
                .api_key
                .as_ref()
                .context("GEMINI_API_KEY must be set to list models")?;
            let client = GeminiClient::from_config(&config.gemini, api_key)?;

            let models = client.list_models().await?;
            info!(total = models.len(), "Model list fetched");

            for model in &models {
                info!(model = %model.name, "Model");
            }
            if models.iter().all(|m| m.name != client.model()) {
                warn!(
                    configured = client.model(),
                    "Configured model is not in the generateContent list"
                );
            }

            write_json(std::io::stdout().lock(), &models, true)?;
        }
    }

    Ok(())
}

fn resolve_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<DateRange> {
    Ok(DateRange::resolve(start, end, Utc::now().date_naive())?)
}

/// Fetches and ranks the feed for `range`.
#[tracing::instrument(skip_all, fields(range = %range))]
async fn ranked_feed(config: &Config, range: DateRange) -> Result<Vec<RiskAssessment>> {
    let neo = config.neo()?;
    let client = NeoWsClient::from_config(neo)?;
    let normalizer = FeedNormalizer::new(client, neo.timeout, neo.record_policy);

    let assessments = normalizer
        .normalize(range.start(), range.end())
        .await
        .context("failed to fetch asteroid feed")?;

    info!(count = assessments.len(), "Feed ranked");
    Ok(assessments)
}

fn advisory_generator(config: &Config) -> Result<AdvisoryGenerator<DynGenerator>> {
    let generator: DynGenerator = match &config.gemini.api_key {
        Some(key) => Box::new(GeminiClient::from_config(&config.gemini, key)?),
        None => Box::new(UnconfiguredGenerator),
    };
    Ok(AdvisoryGenerator::new(generator, config.gemini.timeout))
}

/// Generates advisories concurrently, one task per object, and prints them in
/// risk order.
async fn advise_all(
    generator: Arc<AdvisoryGenerator<DynGenerator>>,
    selected: Vec<RiskAssessment>,
) -> Result<()> {
    let mut tasks = vec![];

    for assessment in selected {
        let generator = generator.clone();
        let span = tracing::info_span!(
            "advise",
            neo_id = %assessment.id,
            risk_level = %assessment.risk.level(),
        );

        let task = tokio::spawn(
            async move {
                let request = AdvisoryRequest::from(&assessment);
                let report = generator.generate(&request).await;
                (assessment, report)
            }
            .instrument(span),
        );
        tasks.push(task);
    }

    for task in tasks {
        match task.await {
            Ok((assessment, report)) => {
                let out = AdvisoryOutput {
                    id: Some(&assessment.id),
                    name: &assessment.name,
                    report: &report,
                };
                write_json(std::io::stdout().lock(), &out, false)?;
            }
            Err(e) => error!(error = %e, "Advisory task failed"),
        }
    }

    Ok(())
}
