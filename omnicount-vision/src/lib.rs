//! omnicount-vision: object counting for still images
//!
//! Counts instances of a requested object category by chaining a promptless
//! instance-segmentation model, a general-purpose region classifier, and a
//! zero-shot label mapper, then reports a calibrated confidence summary and
//! a quality assessment alongside the count.
//!
//! The HTTP layer and persistence live elsewhere; they hand a decoded RGB
//! image to [`CountingPipeline`] and receive the result envelope defined in
//! `omnicount-core`.

pub mod config;
pub mod device;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod processing;
mod tensor;

pub use config::PipelineConfig;
pub use device::Device;
pub use error::VisionError;
pub use pipeline::{CountingPipeline, ProgressObserver, Stage};
