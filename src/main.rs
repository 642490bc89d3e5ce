mod config;

use anyhow::{Context, Result};
use clap::Parser;
use config::GcConfig;
use scenegc_engine::{Collector, ExternalReference, GcOptions, TaskMonitor};
use scenegc_scene::{AnimatedProperties, MemoryScene, TypeTag};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Remove nodes that can never be observed from a scene snapshot
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the scene snapshot (JSON).
    scene: PathBuf,

    /// Where to write the pruned scene. Nothing is written without it.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Collection flags, e.g. `--dry-run --report`. Overrides `gc_flags` from the config.
    #[arg(short, long, allow_hyphen_values = true)]
    flags: Option<String>,

    /// Path to the config file. Created with default values if missing.
    #[arg(short, long, default_value = "scenegc.toml")]
    config: PathBuf,

    /// Animated properties of the scene (JSON).
    #[arg(short, long)]
    animations: Option<PathBuf>,

    /// External references to rewrite after pruning (JSON). The rewritten references are written
    /// next to it with a `.pruned.json` extension.
    #[arg(short, long)]
    bindings: Option<PathBuf>,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("could not open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("could not read {}", path.display()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("could not create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .with_context(|| format!("could not write {}", path.display()))
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = GcConfig::load(&args.config)?;

    // Setup logging
    let logfile = tracing_appender::rolling::daily(&config.log_dir, "scenegc.log");
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var("SCENEGC_LOG")
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_writer(logfile.and(std::io::stdout))
        .with_env_filter(env_filter)
        .init();

    let options = GcOptions::parse(args.flags.as_deref().unwrap_or(&config.gc_flags));
    debug!("Running with {:?}", options);

    let mut scene: MemoryScene = read_json(&args.scene)?;
    let animations: AnimatedProperties = match &args.animations {
        Some(path) => read_json(path)?,
        None => AnimatedProperties::default(),
    };
    info!(
        "Loaded {} nodes and {} animated properties",
        scene.len(),
        animations.len()
    );

    let registry = scenegc_plugins::default_registry()?;
    for err in registry.validate() {
        warn!("Plugin configuration error: {}", err);
    }
    let mut entrypoints = scenegc_plugins::default_entrypoints();
    for ty in &config.entrypoint_types {
        entrypoints.add_type(TypeTag::new(ty.as_str()));
    }
    entrypoints.set_roots_are_entrypoints(config.keep_roots);

    let monitor = TaskMonitor::new();
    {
        let monitor = monitor.clone();
        ctrlc::set_handler(move || {
            let message = monitor.message();
            warn!(
                "Cancelling at step {}/{} ({})",
                monitor.progress(),
                monitor.max_progress(),
                message.as_deref().map_or("starting", String::as_str)
            );
            monitor.cancel();
        })?;
    }

    let collector = Collector::new(&registry, &entrypoints);
    let outcome = collector.collect(&mut scene, &animations, &options, monitor)?;

    if let Some(dot) = outcome.analysis.dot() {
        let path = args.scene.with_extension("dot");
        std::fs::write(&path, dot).with_context(|| format!("could not write {}", path.display()))?;
    }

    let mut report = options.report.then(|| outcome.analysis.report());

    match &outcome.mapping {
        Some(mapping) => {
            info!(
                "Removed {} of {} nodes",
                mapping.removed_count(),
                mapping.len()
            );
            if let Some(output) = &args.output {
                write_json(output, &scene)?;
            }
            if let Some(bindings) = &args.bindings {
                let references: Vec<ExternalReference> = read_json(bindings)?;
                let (rewritten, diagnostics) = mapping.rewrite_references(&references);
                write_json(&bindings.with_extension("pruned.json"), &rewritten)?;
                if let Some(report) = &mut report {
                    report.diagnostics.extend(diagnostics);
                }
            }
        }
        None => info!(
            "Dry run: {} of {} nodes would be removed",
            outcome.analysis.liveness().dead_nodes().count(),
            outcome.analysis.liveness().len()
        ),
    }

    if let Some(report) = report {
        write_json(Path::new(&config.report_path), &report)?;
        info!("Wrote report to {}", config.report_path);
    }

    Ok(())
}
