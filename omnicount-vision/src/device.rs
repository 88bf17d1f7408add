//! Inference device selection

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// Device the ONNX Runtime sessions execute on.
///
/// All sessions of one pipeline always share a single device; there is no
/// per-stage mixing within an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Device {
    Cuda,
    Cpu,
}

impl Device {
    /// Probe for an accelerator and pick the device to run on.
    pub fn select(prefer_cuda: bool) -> Device {
        if prefer_cuda && ort::ExecutionProvider::CUDA(Default::default()).is_available() {
            info!("CUDA execution provider available, running on GPU");
            Device::Cuda
        } else {
            info!("Running on CPU");
            Device::Cpu
        }
    }

    /// The execution provider every session on this device is built with.
    pub fn execution_provider(&self) -> ort::ExecutionProvider {
        match self {
            Device::Cuda => ort::ExecutionProvider::CUDA(Default::default()),
            Device::Cpu => ort::ExecutionProvider::CPU(Default::default()),
        }
    }

    /// The device to retry model setup on after a failure, if any.
    pub fn fallback(&self) -> Option<Device> {
        match self {
            Device::Cuda => Some(Device::Cpu),
            Device::Cpu => None,
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cuda => write!(f, "cuda"),
            Device::Cpu => write!(f, "cpu"),
        }
    }
}
