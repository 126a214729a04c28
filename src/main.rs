use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use mindboggle123_config::{DEFAULT_OUTPUT_ROOT, PipelineConfig};
use mindboggle123_engine::{Engine, EngineSettings, Plugin, PluginOptions, UnitStatus};
use mindboggle123_pipeline::{MINDBOGGLE_UNIT, TemplateBundle, pipeline};

/// Mindboggle123 - run recon-all, ANTs and mindboggle on a T1-weighted image
#[derive(Parser)]
#[command(name = "mindboggle123")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the T1-weighted input image
  image: PathBuf,

  /// Subject identifier used for per-subject output directories
  #[arg(long)]
  id: Option<String>,

  /// Root directory for all pipeline outputs
  #[arg(long, default_value = DEFAULT_OUTPUT_ROOT)]
  out: PathBuf,

  /// Scratch directory for engine state (default: <out>/working)
  #[arg(long)]
  working: Option<PathBuf>,

  /// Execution plugin: serial (alias: linear) or multiproc
  #[arg(long, default_value = "serial")]
  plugin: String,

  /// Plugin options as JSON, e.g. '{"n_procs": 2}'
  #[arg(long = "plugin_args")]
  plugin_args: Option<String>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let cli = Cli::parse();

  // Scheduling options are validated up front so a typo in --plugin_args
  // fails before any stage is launched.
  let plugin: Plugin = cli.plugin.parse()?;
  let options = match cli.plugin_args.as_deref() {
    Some(text) => PluginOptions::from_json(text)?,
    None => PluginOptions::default(),
  };
  let settings = EngineSettings { plugin, options };

  let mut builder = PipelineConfig::builder(&cli.image).output_root(&cli.out);
  if let Some(id) = &cli.id {
    builder = builder.subject_id(id);
  }
  if let Some(working) = &cli.working {
    builder = builder.working_root(working);
  }
  let config = builder.build();
  config
    .prepare()
    .context("failed to prepare output directories")?;

  let workflow = pipeline(&config, &TemplateBundle::default());
  let engine = Engine::new(settings, &config.working_root);

  let rt = tokio::runtime::Runtime::new()?;
  let report = rt.block_on(async {
    engine
      .execute(&workflow, CancellationToken::new())
      .await
      .context("pipeline execution failed")
  })?;

  let mut units: Vec<_> = report.units.iter().collect();
  units.sort_by(|a, b| a.0.cmp(b.0));
  for (unit, status) in units {
    match status {
      UnitStatus::Succeeded(result) if result.cached => {
        eprintln!("{unit}: up to date, skipped");
      }
      UnitStatus::Succeeded(result) => {
        eprintln!("{unit}: completed ({})", result.command);
      }
      UnitStatus::Failed { error, .. } => {
        eprintln!("{unit}: failed ({error})");
      }
      UnitStatus::Blocked { upstream } => {
        eprintln!("{unit}: not run, upstream unit '{upstream}' failed");
      }
    }
  }

  if let Some(result) = report.result(MINDBOGGLE_UNIT) {
    println!("{}", result.command);
  }

  if !report.is_success() {
    bail!("pipeline failed: {}", report.failed_units().join(", "));
  }

  Ok(())
}
