//! Promptless instance segmentation on top of a SAM-style ONNX export

use crate::device::Device;
use crate::error::VisionError;
use crate::models::{InstanceMask, MaskGenerator};
use crate::tensor::image_to_chw_tensor;
use image::RgbImage;
use ort::{Session, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Mask-logit threshold for membership.
const MASK_THRESHOLD: f32 = 0.5;
/// Bounding-box overlap above which two masks count as duplicates.
const DUPLICATE_IOU_THRESH: f32 = 0.9;

/// Segmentation model wrapper.
///
/// The model itself is prompt-driven; promptless operation comes from
/// prompting it with a uniform grid of foreground points and keeping the
/// masks that score well, the same strategy the original automatic mask
/// generator uses.
pub struct SamModel {
    session: Arc<Session>,
    input_size: (u32, u32),
    points_per_side: u32,
    pred_iou_thresh: f32,
    min_mask_region_area: usize,
}

struct MaskCandidate {
    mask: InstanceMask,
    score: f32,
    // x_min, y_min, x_max, y_max
    bbox: (u32, u32, u32, u32),
}

impl SamModel {
    /// Load the segmentation model on the given device.
    pub fn new(
        model_path: &Path,
        device: Device,
        points_per_side: u32,
        pred_iou_thresh: f32,
        min_mask_region_area: usize,
    ) -> Result<Self, VisionError> {
        let session = Session::builder()
            .with_execution_providers([device.execution_provider()])
            .commit_from_file(model_path)
            .map_err(|e| VisionError::Ort(format!("Failed to load segmentation model: {}", e)))?;

        info!("Segmentation model loaded from {:?} ({})", model_path, device);

        Ok(Self {
            session: Arc::new(session),
            input_size: (1024, 1024), // SAM standard input size
            points_per_side,
            pred_iou_thresh,
            min_mask_region_area,
        })
    }

    /// Build the model inputs: the image tensor plus the point grid.
    fn preprocess(&self, image: &RgbImage) -> Result<Vec<Value>, VisionError> {
        let image_data = image_to_chw_tensor(image, self.input_size.0, self.input_size.1)?;

        let input_shape = vec![1i64, 3, self.input_size.1 as i64, self.input_size.0 as i64];
        let total_size = input_shape
            .iter()
            .try_fold(1i64, |acc, &dim| acc.checked_mul(dim))
            .ok_or_else(|| VisionError::Ort("Input shape would overflow".to_string()))?;

        if total_size > 100_000_000 {
            return Err(VisionError::Ort(
                "Input tensor too large (max 100M elements)".to_string(),
            ));
        }

        let mut batched_data = vec![0.0f32; total_size as usize];
        if image_data.len() == batched_data.len() {
            batched_data.copy_from_slice(&image_data);
        }

        let image_input = Value::from_array(
            ort::ndarray::Array::from_shape_vec(input_shape.as_slice(), batched_data)
                .map_err(|e| VisionError::Ort(format!("Failed to create image array: {}", e)))?,
        )
        .map_err(|e| VisionError::Ort(format!("Failed to create image value: {}", e)))?;

        // Uniform grid of foreground points at cell centers, normalized to [0, 1].
        let n = self.points_per_side;
        let num_points = (n * n) as usize;
        let mut point_data = Vec::with_capacity(num_points * 2);
        for row in 0..n {
            for col in 0..n {
                point_data.push((col as f32 + 0.5) / n as f32);
                point_data.push((row as f32 + 0.5) / n as f32);
            }
        }

        let point_shape = vec![1i64, num_points as i64, 2];
        let point_input = Value::from_array(
            ort::ndarray::Array::from_shape_vec(point_shape.as_slice(), point_data)
                .map_err(|e| VisionError::Ort(format!("Failed to create point array: {}", e)))?,
        )
        .map_err(|e| VisionError::Ort(format!("Failed to create point value: {}", e)))?;

        let label_shape = vec![1i64, num_points as i64];
        let label_data = vec![1.0f32; num_points];
        let label_input = Value::from_array(
            ort::ndarray::Array::from_shape_vec(label_shape.as_slice(), label_data)
                .map_err(|e| VisionError::Ort(format!("Failed to create label array: {}", e)))?,
        )
        .map_err(|e| VisionError::Ort(format!("Failed to create label value: {}", e)))?;

        Ok(vec![image_input, point_input, label_input])
    }

    /// Turn raw mask logits into full-resolution masks, filtered and deduplicated.
    fn postprocess(
        &self,
        outputs: &[Value],
        image: &RgbImage,
    ) -> Result<Vec<InstanceMask>, VisionError> {
        if outputs.is_empty() {
            return Ok(vec![]);
        }

        let mask_array = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| VisionError::Ort(format!("Failed to extract mask tensor: {}", e)))?;

        let shape = mask_array.shape();
        if shape.len() < 4 {
            return Err(VisionError::Processing(format!(
                "Unexpected mask output shape: {:?}",
                shape
            )));
        }

        let num_masks = shape[1];
        let mask_height = shape[2];
        let mask_width = shape[3];
        if mask_height == 0 || mask_width == 0 {
            return Err(VisionError::Processing("Invalid mask dimensions".to_string()));
        }
        if mask_height * mask_width > 10_000_000 {
            return Err(VisionError::Processing("Mask too large".to_string()));
        }

        // The second output, when present, carries the model's predicted IoU
        // per mask; without it every mask passes the score filter.
        let scores: Vec<f32> = if outputs.len() > 1 {
            let score_array = outputs[1]
                .try_extract_tensor::<f32>()
                .map_err(|e| VisionError::Ort(format!("Failed to extract score tensor: {}", e)))?;
            (0..num_masks)
                .map(|i| score_array.get([0, i]).copied().unwrap_or(0.0))
                .collect()
        } else {
            vec![1.0; num_masks]
        };

        let (img_w, img_h) = (image.width(), image.height());
        let mut candidates = Vec::new();

        for mask_idx in 0..num_masks {
            let score = scores[mask_idx];
            if !score.is_finite() || score < self.pred_iou_thresh {
                continue;
            }

            // Nearest-neighbor upscale of the thresholded logits to image
            // resolution, tracking area and bbox in the same pass.
            let mut data = vec![false; (img_w as usize) * (img_h as usize)];
            let mut area = 0usize;
            let (mut x_min, mut y_min, mut x_max, mut y_max) = (img_w, img_h, 0u32, 0u32);
            for y in 0..img_h {
                let src_y = (y as usize * mask_height) / img_h as usize;
                for x in 0..img_w {
                    let src_x = (x as usize * mask_width) / img_w as usize;
                    let val = mask_array
                        .get([0, mask_idx, src_y, src_x])
                        .copied()
                        .unwrap_or(f32::NEG_INFINITY);
                    if val.is_finite() && val > MASK_THRESHOLD {
                        data[(y * img_w + x) as usize] = true;
                        area += 1;
                        x_min = x_min.min(x);
                        y_min = y_min.min(y);
                        x_max = x_max.max(x);
                        y_max = y_max.max(y);
                    }
                }
            }

            if area < self.min_mask_region_area {
                continue;
            }

            candidates.push(MaskCandidate {
                mask: InstanceMask {
                    width: img_w,
                    height: img_h,
                    data,
                    area,
                },
                score,
                bbox: (x_min, y_min, x_max, y_max),
            });
        }

        Ok(suppress_duplicates(candidates))
    }
}

impl MaskGenerator for SamModel {
    fn generate_masks(&self, image: &RgbImage) -> Result<Vec<InstanceMask>, VisionError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(VisionError::Processing(
                "Cannot segment an empty image".to_string(),
            ));
        }

        debug!(
            "Running segmentation with a {}x{} point grid",
            self.points_per_side, self.points_per_side
        );

        let inputs = self.preprocess(image)?;
        let outputs = self
            .session
            .run(inputs)
            .map_err(|e| VisionError::Ort(format!("Segmentation inference failed: {}", e)))?;
        let masks = self.postprocess(&outputs, image)?;

        debug!("Segmentation produced {} masks", masks.len());
        Ok(masks)
    }
}

/// Greedy non-maximum suppression over bounding boxes: iterate candidates by
/// descending score and drop any whose box overlaps an already-kept mask too
/// strongly.
fn suppress_duplicates(mut candidates: Vec<MaskCandidate>) -> Vec<InstanceMask> {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept: Vec<MaskCandidate> = Vec::new();
    for candidate in candidates {
        let duplicate = kept
            .iter()
            .any(|k| bbox_iou(k.bbox, candidate.bbox) > DUPLICATE_IOU_THRESH);
        if !duplicate {
            kept.push(candidate);
        }
    }

    kept.into_iter().map(|c| c.mask).collect()
}

fn bbox_iou(a: (u32, u32, u32, u32), b: (u32, u32, u32, u32)) -> f32 {
    let ix_min = a.0.max(b.0);
    let iy_min = a.1.max(b.1);
    let ix_max = a.2.min(b.2);
    let iy_max = a.3.min(b.3);

    if ix_max < ix_min || iy_max < iy_min {
        return 0.0;
    }

    let inter = ((ix_max - ix_min + 1) as f32) * ((iy_max - iy_min + 1) as f32);
    let area_a = ((a.2 - a.0 + 1) as f32) * ((a.3 - a.1 + 1) as f32);
    let area_b = ((b.2 - b.0 + 1) as f32) * ((b.3 - b.1 + 1) as f32);
    let union = area_a + area_b - inter;

    if union > 0.0 {
        inter / union
    } else {
        0.0
    }
}
