//! Basic example: count objects in an image from disk

use omnicount_vision::{CountingPipeline, PipelineConfig, ProgressObserver, Stage};
use std::sync::Arc;

struct StagePrinter;

impl ProgressObserver for StagePrinter {
    fn on_stage(&self, stage: Stage) {
        println!("  stage: {}", stage);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: count_demo <image> [category]");
        std::process::exit(1);
    }

    let image = image::open(&args[1])?.to_rgb8();

    // Downloads model artifacts on first use; see the download_models binary
    // for prefetching.
    let pipeline = CountingPipeline::initialize(PipelineConfig::default())
        .await?
        .with_observer(Arc::new(StagePrinter));

    match args.get(2) {
        Some(category) => {
            let result = pipeline.count_objects(&image, category, None)?;
            println!(
                "Found {} x {:?} ({} of {} segments kept, quality {:.2})",
                result.count,
                category,
                result.filtered_segments,
                result.total_segments,
                result.quality_assessment.quality_score
            );
            for recommendation in &result.quality_assessment.recommendations {
                println!("  note: {}", recommendation);
            }
        }
        None => {
            let result = pipeline.count_all_objects(&image, None)?;
            println!(
                "Found {} objects in {:.2}s:",
                result.total_objects, result.processing_time
            );
            for entry in &result.objects {
                println!("  {} x {}", entry.count, entry.category);
            }
        }
    }

    Ok(())
}
