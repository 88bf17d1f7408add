//! Binary for prefetching model artifacts from the command line

use omnicount_vision::config::PipelineConfig;
use omnicount_vision::error::VisionError;
use omnicount_vision::models::ModelManager;
use std::env;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), VisionError> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: download_models <artifact>");
        eprintln!("Available artifacts: segmenter, classifier, mapper, all");
        std::process::exit(1);
    }

    let artifact = args[1].to_lowercase();
    let config = PipelineConfig::default();
    let manager = ModelManager::new(Arc::new(config));

    match artifact.as_str() {
        "segmenter" => {
            println!("Downloading segmentation model...");
            let path = manager.get_segmenter_model().await?;
            println!("Segmentation model downloaded to: {:?}", path);
        }
        "classifier" => {
            println!("Downloading classifier model and labels...");
            let path = manager.get_classifier_model().await?;
            let labels = manager.get_classifier_labels().await?;
            println!("Classifier model downloaded to: {:?}", path);
            println!("Classifier labels downloaded to: {:?}", labels);
        }
        "mapper" => {
            println!("Downloading mapping model and tokenizer...");
            let path = manager.get_mapper_model().await?;
            let tokenizer = manager.get_mapper_tokenizer().await?;
            println!("Mapping model downloaded to: {:?}", path);
            println!("Mapper tokenizer downloaded to: {:?}", tokenizer);
        }
        "all" => {
            println!("Downloading all model artifacts...");
            manager.get_segmenter_model().await?;
            manager.get_classifier_model().await?;
            manager.get_classifier_labels().await?;
            manager.get_mapper_model().await?;
            manager.get_mapper_tokenizer().await?;
            println!("All artifacts ready");
        }
        _ => {
            eprintln!("Unknown artifact: {}", artifact);
            eprintln!("Available artifacts: segmenter, classifier, mapper, all");
            std::process::exit(1);
        }
    }

    Ok(())
}
