//! Tensor conversion helpers shared by the model wrappers

use crate::error::VisionError;
use image::{imageops::FilterType, RgbImage};

/// Resize an RGB image to the target size and lay it out as a CHW float
/// tensor with values scaled to `[0, 1]`.
pub fn image_to_chw_tensor(
    image: &RgbImage,
    target_width: u32,
    target_height: u32,
) -> Result<Vec<f32>, VisionError> {
    if target_width == 0 || target_height == 0 {
        return Err(VisionError::Processing(
            "Target dimensions cannot be zero".to_string(),
        ));
    }

    let total = (target_width as u64)
        .checked_mul(target_height as u64)
        .and_then(|p| p.checked_mul(3))
        .ok_or_else(|| {
            VisionError::Processing("Target dimensions too large, would overflow".to_string())
        })?;

    if total > 100_000_000 {
        return Err(VisionError::Processing(
            "Target dimensions too large (max 100M elements)".to_string(),
        ));
    }

    let resized = image::imageops::resize(image, target_width, target_height, FilterType::Triangle);

    let h = target_height as usize;
    let w = target_width as usize;
    let mut chw = vec![0.0f32; total as usize];
    for (y, row) in resized.rows().enumerate() {
        for (x, pixel) in row.enumerate() {
            for c in 0..3 {
                chw[c * h * w + y * w + x] = pixel.0[c] as f32 / 255.0;
            }
        }
    }

    Ok(chw)
}

/// Apply ImageNet per-channel normalization to a CHW tensor in place.
pub fn apply_imagenet_normalization(data: &mut [f32]) {
    // ImageNet normalization: mean=[0.485, 0.456, 0.406], std=[0.229, 0.224, 0.225]
    let mean = [0.485, 0.456, 0.406];
    let std = [0.229, 0.224, 0.225];

    const CHANNELS: usize = 3;

    if data.len() < CHANNELS {
        return;
    }

    let hw = data.len() / CHANNELS;
    if hw == 0 {
        return;
    }

    for c in 0..CHANNELS {
        for val in &mut data[c * hw..(c + 1) * hw] {
            if val.is_finite() {
                *val = (*val - mean[c]) / std[c];
            } else {
                *val = 0.0;
            }
        }
    }
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    if logits.is_empty() {
        return vec![];
    }

    let max = logits
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(f32::NEG_INFINITY, f32::max);

    if !max.is_finite() {
        // Every logit was NaN/Inf; fall back to a uniform distribution.
        return vec![1.0 / logits.len() as f32; logits.len()];
    }

    let exps: Vec<f32> = logits
        .iter()
        .map(|&v| if v.is_finite() { (v - max).exp() } else { 0.0 })
        .collect();
    let sum: f32 = exps.iter().sum();

    if sum > 0.0 && sum.is_finite() {
        exps.iter().map(|e| e / sum).collect()
    } else {
        vec![1.0 / logits.len() as f32; logits.len()]
    }
}
