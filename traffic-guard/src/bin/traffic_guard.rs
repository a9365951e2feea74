//! traffic-guard command line
//!
//! Loads one or more CSV traffic logs, runs the risk rules and the summary,
//! and writes a JSON or Markdown report.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::info;
use traffic_guard::blocklist::write_blocklist;
use traffic_guard::config::{BusinessHours, RiskConfig};
use traffic_guard::logging::setup::{init_logging, LoggingConfig};
use traffic_guard::logging::LogConfig;
use traffic_guard::pipeline::{Pipeline, PipelineConfig};
use traffic_guard::render::{JsonRenderer, MarkdownRenderer, ReportRenderer};
use traffic_guard::sources::{CsvOptions, CsvSource};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Markdown,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// CSV files or glob patterns to analyze
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Report format
    #[arg(long, value_enum, default_value = "markdown")]
    format: Format,

    /// Write the report here instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Requests per IP above which the IP is flagged
    #[arg(long)]
    threshold: Option<u64>,

    /// Percentile of request sizes used as the oversized cutoff, in (0, 1)
    #[arg(long)]
    percentile: Option<f64>,

    /// Business hours as START-END, both hours inclusive
    #[arg(long, value_name = "START-END")]
    business_hours: Option<BusinessHours>,

    /// Field delimiter of the input files
    #[arg(long, default_value_t = ',')]
    delimiter: char,

    /// Write flagged addresses to this CSV for a blocking step
    #[arg(long)]
    blocklist: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Log rule details and debug output
    #[arg(long, short)]
    verbose: bool,
}

impl Args {
    fn risk_config(&self) -> Result<RiskConfig> {
        let mut risk = RiskConfig::from_env().context("reading configuration from environment")?;
        if let Some(threshold) = self.threshold {
            risk.suspicious_ip_threshold = threshold;
        }
        if let Some(percentile) = self.percentile {
            risk.oversized_percentile = percentile;
        }
        if let Some(hours) = self.business_hours {
            risk.business_hours = hours;
        }
        Ok(risk)
    }

    fn csv_options(&self) -> Result<CsvOptions> {
        let delimiter = u8::try_from(self.delimiter)
            .map_err(|_| anyhow!("delimiter must be a single-byte character"))?;
        Ok(CsvOptions {
            delimiter,
            ..Default::default()
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let logging = if args.verbose {
        LoggingConfig::development()
    } else {
        LoggingConfig::default()
    };
    init_logging(logging.with_json_format(args.json_logs))
        .map_err(|e| anyhow!("failed to initialize logging: {e}"))?;

    let config = PipelineConfig::default()
        .with_risk(args.risk_config()?)
        .with_log(if args.verbose {
            LogConfig::verbose()
        } else {
            LogConfig::default()
        });
    let mut pipeline = Pipeline::new(config)?;

    let source = CsvSource::from_paths(args.inputs.clone())?.with_options(args.csv_options()?);
    let renderer: Box<dyn ReportRenderer> = match args.format {
        Format::Json => Box::new(JsonRenderer::new()),
        Format::Markdown => Box::new(MarkdownRenderer::default()),
    };

    let run = pipeline.run(&source, renderer.as_ref()).await?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, &run.document)
                .with_context(|| format!("writing report to {}", path.display()))?;
            info!(report.path = %path.display(), "Wrote report");
        }
        None => println!("{}", run.document),
    }

    if let Some(path) = &args.blocklist {
        let ips = run.output.risk.blocklist();
        write_blocklist(path, &ips)?;
    }

    Ok(())
}
