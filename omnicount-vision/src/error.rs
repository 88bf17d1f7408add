//! Error types for omnicount-vision

use omnicount_core::Error as CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Device error: {0}")]
    Device(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("ONNX Runtime error: {0}")]
    Ort(String),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),
}

impl From<VisionError> for CoreError {
    fn from(err: VisionError) -> Self {
        match err {
            VisionError::Config(msg) => CoreError::Configuration(msg),
            VisionError::Model(msg) => CoreError::Model(msg),
            VisionError::Ort(msg) => CoreError::Model(msg),
            VisionError::Io(e) => CoreError::Io(e),
            other => CoreError::Inference(format!("Vision error: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vision_error_display() {
        let err = VisionError::Model("Test error".to_string());
        assert!(err.to_string().contains("Model error"));
        assert!(err.to_string().contains("Test error"));
    }

    #[test]
    fn test_vision_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let vision_err: VisionError = io_err.into();
        match vision_err {
            VisionError::Io(_) => {}
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_config_error_maps_to_core_configuration() {
        let vision_err = VisionError::Config("bad threshold".to_string());
        let core_err: CoreError = vision_err.into();
        match core_err {
            CoreError::Configuration(msg) => assert!(msg.contains("bad threshold")),
            _ => panic!("Expected Configuration error"),
        }
    }

    #[test]
    fn test_processing_error_maps_to_core_inference() {
        let vision_err = VisionError::Processing("stage failed".to_string());
        let core_err: CoreError = vision_err.into();
        match core_err {
            CoreError::Inference(msg) => {
                assert!(msg.contains("Vision error"));
                assert!(msg.contains("stage failed"));
            }
            _ => panic!("Expected Inference error"),
        }
    }
}
