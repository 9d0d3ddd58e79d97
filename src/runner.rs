//! Single-video run wired from the command line

use anyhow::Context;
use capscan_cv::{AnalysisConfig, DetectionJob, Result};
use std::path::Path;

pub struct RunOptions {
    pub store_image: bool,
    pub export_json: bool,
}

/// Process one video and write its results. A failed job is logged, not
/// returned as an error; only setup and output problems are.
pub fn run(video: &Path, output_dir: &Path, config: Option<&Path>, options: &RunOptions) -> Result<()> {
    let config = match config {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", output_dir))?;

    let job = DetectionJob::new(video, output_dir, config);
    let result = job.process();

    result.write_csv()?;
    result.print_summary();

    if options.store_image {
        if let Some(path) = result.store_annotated_image()? {
            tracing::info!("Annotated image saved: {:?}", path);
        }
    }
    if options.export_json {
        let path = result.export_json()?;
        tracing::info!("Job report saved: {:?}", path);
    }

    Ok(())
}
