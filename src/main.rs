use clap::Parser;
use std::path::PathBuf;

mod runner;

/// Count and classify bottle caps in a video
#[derive(Parser)]
#[command(name = "capscan")]
#[command(version)]
struct Cli {
    /// Input video
    video: PathBuf,

    /// Directory receiving the CSV, PNG and JSON results
    output_dir: PathBuf,

    /// JSON file overriding the analysis constants
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip writing the annotated ROI image
    #[arg(long)]
    no_image: bool,

    /// Also export the job report as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let options = runner::RunOptions {
        store_image: !cli.no_image,
        export_json: cli.json,
    };
    runner::run(&cli.video, &cli.output_dir, cli.config.as_deref(), &options)
}
