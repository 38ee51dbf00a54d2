use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use epochrank::{
    io::load_recording, logging, ranking::select_best, run_pipeline_with, PipelineConfig,
    ReferenceId,
};

#[derive(Parser)]
#[command(name = "rank-epochs", version, about = "Rank EEG epochs by quality and alpha content")]
struct Args {
    /// Recording in safetensors format (data, sfreq, ch_names)
    #[arg(long)]
    input: PathBuf,

    /// Reference scheme (linked-ears, centroid, bipolar-transverse,
    /// bipolar-longitudinal, temporal-central-parasagittal)
    #[arg(long, default_value = "linked-ears")]
    reference: String,

    /// Epoch duration in seconds, 3 to 30
    #[arg(long)]
    epoch_dur: Option<f32>,

    /// JSON file overriding any subset of the pipeline configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of rows to print (default: config top_n)
    #[arg(long)]
    top_n: Option<usize>,

    /// Print every ranked row, including artifact-dominated ones
    #[arg(long)]
    all: bool,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbose);

    let mut cfg = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str::<PipelineConfig>(&text)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => PipelineConfig::default(),
    };
    if let Some(d) = args.epoch_dur {
        cfg.epoch_dur = d;
    }
    if let Some(n) = args.top_n {
        cfg.top_n = n;
    }
    let reference: ReferenceId = args.reference.parse()?;

    let recording = load_recording(&args.input)?;
    let table = run_pipeline_with(&recording, reference, &cfg)
        .with_context(|| format!("ranking {}", args.input.display()))?;

    let json = if args.all {
        serde_json::to_string_pretty(&table)?
    } else {
        let best = select_best(&table, cfg.sync_artifact_limit, cfg.top_n);
        tracing::info!(shown = best.len(), total = table.len(), "selected epochs");
        serde_json::to_string_pretty(&best)?
    };
    println!("{json}");
    Ok(())
}
