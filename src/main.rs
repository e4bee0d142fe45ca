// src/main.rs
use clap::Parser;
use statement_extractor::classifier::{
    DocumentConverter, FixtureClassifier, HeadingAnnotator, HttpClassifier, PassthroughConverter,
};
use statement_extractor::edgar::FilingIdentity;
use statement_extractor::extractors::Segmenter;
use statement_extractor::pipeline::Orchestrator;
use statement_extractor::storage::StorageManager;
use statement_extractor::utils::{self, AppError, PipelineConfig};
use std::path::PathBuf;
use std::sync::Arc;

/// Extracts and reconciles financial statements from an annotated filing
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Converted filing text (markdown with pipe tables)
    input: PathBuf,

    /// Insert statement markers before recognized headings first
    #[arg(long)]
    annotate: bool,

    /// Replay classifications from a JSON fixture file
    #[arg(long, conflicts_with = "classifier_url")]
    fixture: Option<PathBuf>,

    /// Base URL of the classification service
    #[arg(long)]
    classifier_url: Option<String>,

    /// Company name (defaults to the entity id)
    #[arg(long)]
    company: Option<String>,

    /// Entity identifier, e.g. CIK or ticker (defaults to the input file name)
    #[arg(short, long)]
    entity_id: Option<String>,

    /// Fiscal year of the filing; otherwise the latest year found
    #[arg(short = 'y', long)]
    fiscal_year: Option<i32>,

    /// Form type
    #[arg(long, default_value = "10-K")]
    form_type: String,

    /// Output directory for extracted statements
    #[arg(short, long, default_value = "./output")]
    output_dir: PathBuf,

    /// Debug mode - verbose logging and a highlighted HTML view of detected sections
    #[arg(short, long)]
    debug: bool,

    /// Minimum section size in bytes
    #[arg(long)]
    min_section_size: Option<usize>,

    /// Deadline for all classification calls of the filing, in seconds
    #[arg(long)]
    deadline_secs: Option<u64>,

    /// JSON file with pipeline settings
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn load_config(args: &Args) -> Result<PipelineConfig, AppError> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    }
    .apply_env()?;

    if let Some(size) = args.min_section_size {
        tracing::debug!("Setting minimum section size to {} from command-line argument", size);
        config.min_section_len = size;
    }
    if let Some(secs) = args.deadline_secs {
        config.deadline_secs = secs;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let args = Args::parse();
    utils::logging::setup_logging(if args.debug { "debug" } else { "info" });
    tracing::info!("Starting processing for args: {:?}", args);

    let config = load_config(&args)?;
    let raw = std::fs::read_to_string(&args.input)?;

    let converter: Box<dyn DocumentConverter> = if args.annotate {
        Box::new(HeadingAnnotator::default())
    } else {
        Box::new(PassthroughConverter)
    };
    let doc = converter.convert(&raw)?;

    let entity_id = args.entity_id.clone().unwrap_or_else(|| {
        args.input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "UNKNOWN".to_string())
    });
    let company = args.company.clone().unwrap_or_else(|| entity_id.clone());
    let identity = FilingIdentity::new(
        company,
        entity_id.clone(),
        args.fiscal_year,
        args.form_type.clone(),
        args.input.display().to_string(),
    );

    let orchestrator = match (&args.fixture, &args.classifier_url) {
        (Some(path), _) => {
            let replay = Arc::new(FixtureClassifier::from_file(path)?);
            Orchestrator::new(config.clone(), replay.clone())
                .with_navigator(replay.clone())
                .with_analyzer(replay)
        }
        (None, Some(url)) => {
            let service = Arc::new(HttpClassifier::new(url)?);
            Orchestrator::new(config.clone(), service.clone())
                .with_navigator(service.clone())
                .with_analyzer(service)
        }
        (None, None) => {
            return Err(AppError::Usage("one of --fixture or --classifier-url is required".to_string()));
        }
    };

    let storage = StorageManager::new(&args.output_dir)?;

    if args.debug {
        let debug_dir = args.output_dir.join(entity_id.to_uppercase()).join("debug");
        std::fs::create_dir_all(&debug_dir)?;
        let sections = Segmenter::new(&config).segment(&doc);
        let debug_html_path = debug_dir.join("filing_annotated.html");
        if let Err(e) = utils::html_debug::save_debug_html(&doc, sections.values(), &debug_html_path) {
            tracing::warn!("Failed to create debug HTML: {}", e);
        }
    }

    let result = orchestrator.run(identity, &doc).await?;

    match storage.save_result(&result) {
        Ok(path) => tracing::info!("Saved statements to: {}", path.display()),
        Err(e) => tracing::error!("Failed to save statements: {}", e),
    }
    storage.save_metadata(&result)?;

    let failed = result.failed_checks();
    tracing::info!(
        "Processing finished. Values: {}, sections failed: {}, checks failed: {}, reclassified: {}",
        result.stats.values_extracted,
        result.section_failures.len(),
        failed.len(),
        result.reclassifications.len()
    );
    if !failed.is_empty() {
        tracing::warn!("Failed checks: {}", failed.join(", "));
    }

    Ok(())
}
