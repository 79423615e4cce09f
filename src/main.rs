//! symptriage - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use std::collections::BTreeMap;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use symptriage::{
    cli::{Args, Commands, Verbosity},
    config::Config,
    display::Display,
    doctor::Doctor,
    ensemble::ModelBundle,
    normalizer::StructuredInput,
    schema::{ClassLabelSpace, FeatureSchema},
    telemetry::{TelemetryCollector, TelemetryDisplay},
    transcription::AudioSegment,
    PredictionBundle, TriageError, TriagePipeline, TriageReport,
};

/// Exit code for input the user can fix
const EXIT_RECOVERABLE: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::from(EXIT_RECOVERABLE);
    }

    let config = match Config::load(args.config.clone()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let default_verbosity =
        Verbosity::from_name(&config.telemetry.default_verbosity).unwrap_or(Verbosity::Normal);
    let verbosity = args.verbosity(default_verbosity);
    init_tracing(verbosity);

    let mut display = Display::new(verbosity, config.telemetry.color_output && !args.json);

    match run(&args, config, &mut display).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<TriageError>() {
            Some(triage) if triage.is_recoverable() => {
                if args.json {
                    print_recoverable_json(triage);
                } else {
                    display.show_warning(&triage.user_message());
                }
                ExitCode::from(EXIT_RECOVERABLE)
            }
            _ => {
                display.show_error(&format!("{:#}", e));
                ExitCode::FAILURE
            }
        },
    }
}

/// Install the tracing subscriber; RUST_LOG overrides the verbosity default
fn init_tracing(verbosity: Verbosity) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter()));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .try_init();
}

async fn run(args: &Args, mut config: Config, display: &mut Display) -> Result<()> {
    if let Some(bundle) = &args.bundle {
        config.models.bundle = Some(bundle.to_string_lossy().into_owned());
    }

    match &args.command {
        Commands::Symptoms => {
            let (schema, _) = load_tables(&config)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(schema.identifiers())?);
            } else {
                display.show_symptoms(&schema);
            }
            Ok(())
        }

        Commands::Diseases => {
            let (_, labels) = load_tables(&config)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(labels.labels())?);
            } else {
                display.show_diseases(&labels);
            }
            Ok(())
        }

        Commands::Doctor => {
            let doctor = Doctor::new(config, args.config.clone());
            let checks = doctor.run_diagnostics().await;
            Doctor::display_results(&checks);

            if Doctor::overall_status(&checks) {
                Ok(())
            } else {
                anyhow::bail!("one or more health checks failed")
            }
        }

        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }

        Commands::Predict {
            symptoms,
            symptoms_file,
        } => {
            let picks = match symptoms_file {
                Some(path) => read_picks(path)?,
                None => symptoms
                    .iter()
                    .map(|s| (s.trim().to_string(), 1u8))
                    .filter(|(s, _)| !s.is_empty())
                    .collect(),
            };

            let telemetry = TelemetryCollector::new();
            let pipeline = build_pipeline(args, &config, &telemetry, display)?;

            display.start_stage("Predicting");
            let report = pipeline.triage_structured(&picks).await;
            finish(args, display, &telemetry, report)
        }

        Commands::Describe { .. } => {
            let text = args.description().unwrap_or_default();

            let telemetry = TelemetryCollector::new();
            let pipeline = build_pipeline(args, &config, &telemetry, display)?;

            display.start_stage("Reading your description");
            let report = pipeline.triage_text(&text).await;
            finish(args, display, &telemetry, report)
        }

        Commands::Listen { segments } => {
            let mut audio = Vec::with_capacity(segments.len());
            for (index, path) in segments.iter().enumerate() {
                audio.push(AudioSegment::from_path(index, path).await?);
            }

            let telemetry = TelemetryCollector::new();
            let pipeline = build_pipeline(args, &config, &telemetry, display)?
                .with_configured_transcriber(&config)?;

            display.start_stage(&format!("Transcribing {} segment(s)", audio.len()));
            let report = pipeline.triage_voice(&audio).await;
            finish(args, display, &telemetry, report)
        }
    }
}

/// Schema and labels from the configured bundle, or the built-in tables
fn load_tables(config: &Config) -> Result<(Arc<FeatureSchema>, Arc<ClassLabelSpace>)> {
    match config.bundle_path() {
        Some(path) => {
            let bundle = ModelBundle::load(&path)?;
            Ok((bundle.schema, bundle.labels))
        }
        None => Ok((
            Arc::new(FeatureSchema::reference()),
            Arc::new(ClassLabelSpace::reference()),
        )),
    }
}

fn build_pipeline(
    args: &Args,
    config: &Config,
    telemetry: &TelemetryCollector,
    display: &mut Display,
) -> Result<TriagePipeline> {
    let path = config
        .bundle_path()
        .context("no model bundle configured; set [models] bundle in the config file or pass --bundle")?;

    display.start_stage("Loading models");
    let ensemble = ModelBundle::load(&path)?.into_ensemble()?;
    display.finish_stage();

    let pipeline = TriagePipeline::from_config(config, Arc::new(ensemble), telemetry.clone())?
        .with_advice(!args.no_advice);
    Ok(pipeline)
}

/// Structured picks from a JSON object of identifier → 0/1
fn read_picks(path: &Path) -> Result<StructuredInput> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let picks: BTreeMap<String, u8> = serde_json::from_str(&contents)
        .with_context(|| format!("{} must be a JSON object of symptom → 0/1", path.display()))?;
    Ok(picks)
}

fn finish(
    args: &Args,
    display: &mut Display,
    telemetry: &TelemetryCollector,
    report: symptriage::Result<TriageReport>,
) -> Result<()> {
    display.finish_stage();
    let report = report?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        display.show_report(&report);

        let summary = TelemetryDisplay::new(telemetry.clone(), display.verbosity());
        if summary.should_show_summary() {
            summary.display_summary();
            summary.display_events();
        }
    }
    Ok(())
}

fn print_recoverable_json(error: &TriageError) {
    let bundle = match error {
        TriageError::InsufficientEvidence { .. } => Some(PredictionBundle::insufficient()),
        _ => None,
    };
    let body = serde_json::json!({
        "error": error.user_message(),
        "bundle": bundle,
    });
    match serde_json::to_string_pretty(&body) {
        Ok(text) => println!("{}", text),
        Err(_) => println!("{{\"error\": {:?}}}", error.user_message()),
    }
}
