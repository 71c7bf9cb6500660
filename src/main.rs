mod api;
mod server;

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use trend_reporter::config::ReportConfig;
use trend_reporter::digest::digest_subject;
use trend_reporter::fetcher::{ApifySource, DumpSource};
use trend_reporter::pipeline::{run_report, RunOptions, RunSummary};
use trend_reporter::{format_float, format_percent, ReportError};

#[derive(Parser)]
#[command(name = "trend-reporter", about = "Instagram hashtag and viral content trend reporter")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Collect posts, analyse them and write the report.
    Run(RunArgs),
    /// Print the effective configuration.
    Check(CheckArgs),
    /// Serve the analysis over HTTP.
    Serve(ServeArgs),
}

#[derive(Args, Debug, Clone, Default)]
struct RunArgs {
    #[arg(long, short)]
    config: Option<PathBuf>,
    #[arg(long, short)]
    days: Option<u32>,
    /// Analyse a saved raw.json instead of calling the scraper.
    #[arg(long)]
    input: Option<PathBuf>,
    #[arg(long)]
    no_save: bool,
    #[arg(long)]
    top_hashtags: Option<usize>,
    #[arg(long)]
    top_viral: Option<usize>,
    #[arg(long = "exclude")]
    exclude: Vec<String>,
}

#[derive(Args, Debug, Clone)]
struct CheckArgs {
    #[arg(long, short)]
    config: Option<PathBuf>,
    /// Save the effective configuration as TOML.
    #[arg(long)]
    write: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, short)]
    config: Option<PathBuf>,
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    #[arg(long, default_value_t = 8787)]
    port: u16,
}

#[tokio::main]
async fn main() {
    load_dotenv();
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), ReportError> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Run(RunArgs::default()));

    match command {
        Command::Run(args) => run_command(args).await,
        Command::Check(args) => check_command(args),
        Command::Serve(args) => {
            let (config, _) = ReportConfig::load(args.config.clone())?;
            server::serve(args, config).await
        }
    }
}

async fn run_command(args: RunArgs) -> Result<(), ReportError> {
    let (mut config, path) = ReportConfig::load(args.config)?;
    if let Some(path) = path.as_ref().filter(|path| path.exists()) {
        tracing::info!(path = %path.display(), "loaded config");
    }

    if let Some(days) = args.days {
        config.analysis.days = days;
    }
    if let Some(value) = args.top_hashtags {
        config.analysis.top_hashtags = value;
    }
    if let Some(value) = args.top_viral {
        config.analysis.top_viral = value;
    }
    config.analysis.exclude_hashtags.extend(args.exclude);
    config.validate()?;

    let options = RunOptions { save: !args.no_save };
    let summary = match args.input {
        Some(input) => run_report(&DumpSource::new(input), &config, &options).await?,
        None => {
            let source = ApifySource::from_config(&config)?;
            run_report(&source, &config, &options).await?
        }
    };

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("Subject: {}\n", digest_subject(&summary.result));
    println!("{}", summary.digest);
    println!("Run {}", summary.run_id);
    println!("  posts analysed: {}", summary.total_posts());
    println!("  top hashtags: {}", summary.hashtag_count());
    println!("  top viral: {}", summary.viral_count());
    println!("  insights: {}", summary.insight_count());
    println!(
        "  captions {} | engagement {}",
        format_percent(summary.quality.caption_rate),
        format_percent(summary.quality.engagement_rate)
    );
    println!(
        "  elapsed: {}s",
        format_float(summary.duration.as_secs_f64(), 1)
    );
    if let Some(dir) = summary.run_dir.as_ref() {
        println!("  saved to {}", dir.display());
    }
}

fn check_command(args: CheckArgs) -> Result<(), ReportError> {
    let (config, path) = ReportConfig::load(args.config)?;
    let analysis = &config.analysis;

    println!("Configuration");
    println!("========================================");
    match path.as_ref().filter(|path| path.exists()) {
        Some(path) => println!("File: {}", path.display()),
        None => println!("File: (defaults)"),
    }
    println!("Scraper token: {}", mask_token(config.apify_token.as_deref()));
    match analysis.date_range()? {
        Some((start, end)) => println!("Period: {} ~ {}", start, end),
        None => println!("Period: last {} days", analysis.days),
    }
    println!("Content type: {}", analysis.content_type.label());
    println!("Top hashtags: {}", analysis.top_hashtags);
    println!("Top viral: {}", analysis.top_viral);
    println!("Excluded: {}", analysis.exclude_hashtags.join(", "));
    println!("Output: {}", config.output_dir.display());
    println!("\nAccounts ({}):", config.accounts.len());
    for account in &config.accounts {
        println!("  - @{} ({})", account.username, account.category);
    }
    if let Some(target) = args.write.as_ref() {
        config.write(target)?;
        println!("\nWrote {}", target.display());
    }
    println!("\nConfiguration OK");
    Ok(())
}

fn mask_token(token: Option<&str>) -> String {
    match token {
        Some(token) if token.chars().count() > 8 => {
            format!("{}...", token.chars().take(8).collect::<String>())
        }
        Some(_) => "***".to_string(),
        None => "(not set)".to_string(),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_dotenv() {
    let _ = dotenvy::dotenv();
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let manifest_path = Path::new(manifest_dir).join(".env");
    let _ = dotenvy::from_path(manifest_path);
}
