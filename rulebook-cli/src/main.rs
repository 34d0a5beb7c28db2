use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

use rulebook_core::config::{ConfigSource, PipelineConfig};
use rulebook_core::extractors::build_extractor;
use rulebook_core::{ExtractionConfig, RulebookProcessor, RunSummary, StepProfiler, ValidationReport};

#[derive(Parser)]
#[command(name = "rulebook")]
#[command(about = "Extract structured JSON record sets from an HTML rulebook export")]
struct Args {
    /// Path to the HTML rulebook export
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Directory the record sets are written to (and read from)
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Path to custom config file (YAML format)
    #[arg(short, long)]
    config: Option<String>,

    /// Stage to run: all, an extractor name, normalize or validate
    #[arg(short, long, default_value = "all")]
    stage: String,

    /// Enable detailed profiling of all pipeline steps
    #[arg(long)]
    profile: bool,

    /// Print the effective config as YAML and exit
    #[arg(long)]
    show_config: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    println!("🦀 Rulebook Extractor");

    match run(&args) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("❌ Processing failed: {e:#}");
            std::process::exit(1);
        }
    }
}

/// Returns whether validation passed.
fn run(args: &Args) -> Result<bool> {
    let config = load_config(args.config.as_deref());

    if args.show_config {
        print!("{}", config.to_yaml()?);
        return Ok(true);
    }

    let processor = RulebookProcessor::new_cli(&args.data_dir)?;
    println!("📁 Data directory: {}", args.data_dir.display());

    match args.stage.as_str() {
        "normalize" => {
            let rewritten = processor.normalize_stored(&config.normalization)?;
            println!("✅ Normalized {} record sets", rewritten.len());
            Ok(true)
        }
        "validate" => {
            let report = processor.validate_stored(&config)?;
            print_report(&report);
            Ok(report.passed())
        }
        stage => {
            let pipeline = select_pipeline(stage, &config)?;
            let input = args
                .input
                .as_deref()
                .ok_or_else(|| anyhow!("--input is required for stage '{stage}'"))?;
            extract(&processor, input, &config, &pipeline, args.profile)
        }
    }
}

fn load_config(path: Option<&str>) -> ExtractionConfig {
    let (config, source) = ExtractionConfig::load_with_fallback(path);
    println!("{}", config_banner(&source));
    config
}

fn config_banner(source: &ConfigSource) -> String {
    match source {
        ConfigSource::File(path) => format!("📋 Loaded config from: {path}"),
        ConfigSource::Default => "📋 Using default config".to_string(),
        ConfigSource::Fallback { reason, .. } => {
            format!("⚠️  {reason}\n📋 Using default config")
        }
    }
}

fn select_pipeline(stage: &str, config: &ExtractionConfig) -> Result<PipelineConfig> {
    if stage == "all" {
        return Ok(config.pipeline.clone());
    }
    // Fail on an unknown name before touching the input.
    build_extractor(stage, config)?;
    log::info!("Running single stage: {stage}");
    Ok(PipelineConfig::only(stage))
}

fn extract(
    processor: &RulebookProcessor,
    input: &Path,
    config: &ExtractionConfig,
    pipeline: &PipelineConfig,
    profile: bool,
) -> Result<bool> {
    if !input.exists() {
        return Err(anyhow!("input not found at: {}", input.display()));
    }

    println!("📄 Processing: {}", input.display());
    println!("🕒 Started: {}", chrono::Local::now().to_rfc3339());

    let mut profiler = StepProfiler::new(profile);
    let summary = processor.run_with_profiler(input, config, pipeline, &mut profiler)?;

    print_summary(&summary);
    if profile {
        println!("\n⏱️  Step timings:");
        for line in profiler.summary_lines() {
            println!("   {line}");
        }
    }
    Ok(summary.passed())
}

fn print_summary(summary: &RunSummary) {
    println!("📊 Record sets:");
    for (name, count) in &summary.record_counts {
        println!("   - {name}: {count}");
    }
    print_status(summary.passed(), summary.critical_count, summary.warning_count);
}

fn print_report(report: &ValidationReport) {
    for issue in &report.issues {
        println!("   [{:?}] {}: {}", issue.severity, issue.check, issue.message);
    }
    print_status(
        report.passed(),
        report.summary.critical_count,
        report.summary.warning_count,
    );
}

fn print_status(passed: bool, critical: usize, warnings: usize) {
    if passed {
        println!("✅ Validation passed ({critical} critical, {warnings} warnings)");
    } else {
        println!("❌ Validation failed ({critical} critical, {warnings} warnings)");
    }
}
