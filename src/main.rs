//! Flood Depth Analyzer - batch entry point
//!
//! Analyzes every photograph in a directory with a vision-language model:
//! 1. Loads analyzer.toml (optional) and resolves the OpenAI API key
//! 2. Lists the input images in processing order
//! 3. Estimates water depth and sedan passability for each image
//! 4. Writes one JSON report with a summary and per-image results
//!
//! Usage:
//!   cargo run --release
//!   cargo run --release -- --images-dir data/storm_0917 --output out/results.json
//!   cargo run --release -- --model gpt-4o --model gpt-4o-mini
//!   cargo run --release -- --dry-run        # list images + exemplars, no API calls
//!
//! Environment:
//!   OPENAI_API_KEY - API credential (falls back to backend/.env)
//!   RUST_LOG       - log filter (default: flodepth_service=info,warn)

use clap::Parser;
use flodepth_service::batch::{self, BatchOrchestrator};
use flodepth_service::client::OpenAiClient;
use flodepth_service::config::{self, AnalyzerConfig, DEFAULT_CONFIG_PATH};
use flodepth_service::exemplars::ExemplarStore;
use flodepth_service::ingest::image::SUPPORTED_EXTENSIONS;
use flodepth_service::invoker::ModelInvoker;
use flodepth_service::logging;
use flodepth_service::report;
use std::error::Error;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "flodepth", about = "Estimate standing-water depth from flood photographs")]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Directory of images to analyze
    #[arg(long)]
    images_dir: Option<PathBuf>,

    /// Directory holding the few-shot exemplar images
    #[arg(long)]
    fewshot_dir: Option<PathBuf>,

    /// Report output path
    #[arg(long)]
    output: Option<PathBuf>,

    /// Candidate model, highest preference first (repeatable)
    #[arg(long = "model")]
    models: Vec<String>,

    /// List images and exemplars without calling the model
    #[arg(long)]
    dry_run: bool,
}

fn apply_overrides(mut config: AnalyzerConfig, cli: &Cli) -> AnalyzerConfig {
    if let Some(dir) = &cli.images_dir {
        config.images_dir = dir.clone();
    }
    if let Some(dir) = &cli.fewshot_dir {
        config.fewshot_dir = dir.clone();
    }
    if let Some(path) = &cli.output {
        config.output_file = path.clone();
    }
    if !cli.models.is_empty() {
        config.models = cli.models.clone();
    }
    config
}

fn main() {
    dotenv::dotenv().ok();
    logging::init();

    println!("🌊 Flood Depth Analyzer");
    println!("=======================\n");

    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("\n❌ {}\n", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let config = apply_overrides(config::load_config(&cli.config)?, cli);
    config.validate()?;

    // Fails fast on a missing input directory
    let images = batch::list_images(&config.images_dir)?;
    let store = ExemplarStore::new(&config.fewshot_dir);

    if images.is_empty() {
        println!("❌ No supported images found in {}", config.images_dir.display());
        println!("   Supported formats: {}", SUPPORTED_EXTENSIONS.join(", "));
    } else {
        println!("🔍 Found {} images:", images.len());
        for path in &images {
            println!("   - {}", path.display());
        }
    }

    if cli.dry_run {
        let exemplars = store.load();
        println!(
            "\n📚 {}/{} few-shot exemplars available in {}",
            exemplars.len(),
            store.configured_count(),
            store.dir().display()
        );
        println!("   Models: {}", config.models.join(" → "));
        return Ok(());
    }

    let api_key = config::resolve_api_key(&config.env_file)?;
    let client = OpenAiClient::new(&api_key, &config.api_base, config.request_timeout())?;
    println!("✓ OpenAI client ready ({})", config.models.join(" → "));

    let invoker = ModelInvoker::new(&client, config.models.clone(), config.retry_policy())
        .with_max_completion_tokens(config.max_completion_tokens);
    let orchestrator = BatchOrchestrator::new(invoker, &store).with_pacing(config.pacing());

    println!("\n🚀 Starting batch analysis...");
    let outcome = orchestrator.run_files(&images);

    let report = report::build_report(outcome.records);
    report::write_report(&report, &config.output_file)?;

    let summary = &report.summary;
    println!("\n📈 Summary");
    println!("   Total images:  {}", summary.total_images);
    println!("   Successful:    {}", summary.successful_analyses);
    println!("   Failed:        {}", summary.failed_analyses);
    println!("   Success rate:  {}", summary.success_rate);

    if summary.successful_analyses > 0 {
        println!("\n💧 Depth estimates:");
        for record in report.results.iter().filter(|r| r.analysis_success) {
            if let Some(depth) = record.depth_cm_estimate {
                println!("   {}: {}cm ({})", record.filename, depth, record.passability);
            }
        }
    }

    println!("\n💾 Results saved to {}", config.output_file.display());
    Ok(())
}
