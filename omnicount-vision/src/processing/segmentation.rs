//! Instance segmentation stage: masks to a label map and ranked region crops

use crate::error::VisionError;
use crate::models::{InstanceMask, MaskGenerator};
use image::{Rgb, RgbImage};
use std::sync::Arc;
use tracing::debug;

/// Gray value written over non-member pixels of a region crop.
const BACKGROUND_FILL: u8 = 188;

/// Integer matrix assigning each pixel to a region rank (1..=N) or to
/// background (0).
#[derive(Debug, Clone, PartialEq)]
pub struct LabelMap {
    width: u32,
    height: u32,
    labels: Vec<i32>,
}

impl LabelMap {
    fn zeros(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            labels: vec![0; (width as usize) * (height as usize)],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Label at pixel (x, y); out-of-bounds reads are background.
    pub fn label_at(&self, x: u32, y: u32) -> i32 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.labels[(y * self.width + x) as usize]
    }

    /// True if any pixel carries a non-zero label.
    pub fn has_regions(&self) -> bool {
        self.labels.iter().any(|&l| l != 0)
    }
}

/// One cropped, background-masked region, in rank order.
#[derive(Debug, Clone)]
pub struct Region {
    /// The rank label this region carries in the label map.
    pub label: i32,
    pub image: RgbImage,
}

/// Converts raw instance masks into a label map plus ranked region crops.
pub struct Segmenter {
    model: Arc<dyn MaskGenerator>,
    top_n: usize,
}

impl Segmenter {
    pub fn new(model: Arc<dyn MaskGenerator>, top_n: usize) -> Self {
        Self { model, top_n }
    }

    /// Segment one image.
    ///
    /// Masks are ranked by area descending and only the `top_n` largest are
    /// kept. Labels are written in ascending rank order, so where two kept
    /// masks overlap, the later (smaller) one's pixels win. That overwrite
    /// order is part of the contract: changing it changes segment boundaries
    /// and therefore the counts downstream.
    pub fn segment(&self, image: &RgbImage) -> Result<(LabelMap, Vec<Region>), VisionError> {
        let masks = self.model.generate_masks(image)?;
        debug!("Segmentation model produced {} masks", masks.len());

        if masks.is_empty() {
            // Degenerate input is not an error; downstream stages handle
            // zero regions and produce zeroed metrics.
            return Ok((LabelMap::zeros(image.width(), image.height()), vec![]));
        }

        for mask in &masks {
            if mask.width != image.width() || mask.height != image.height() {
                return Err(VisionError::Processing(format!(
                    "Mask size {}x{} does not match image size {}x{}",
                    mask.width,
                    mask.height,
                    image.width(),
                    image.height()
                )));
            }
        }

        let mut ranked: Vec<&InstanceMask> = masks.iter().collect();
        ranked.sort_by(|a, b| b.area.cmp(&a.area));
        ranked.truncate(self.top_n);

        let label_map = build_label_map(image.width(), image.height(), &ranked);

        let mut regions = Vec::new();
        for rank in 1..=ranked.len() as i32 {
            if let Some(region) = extract_region(image, &label_map, rank) {
                regions.push(region);
            }
        }

        debug!("Extracted {} regions", regions.len());
        Ok((label_map, regions))
    }
}

fn build_label_map(width: u32, height: u32, ranked: &[&InstanceMask]) -> LabelMap {
    let mut map = LabelMap::zeros(width, height);
    for (idx, mask) in ranked.iter().enumerate() {
        let label = idx as i32 + 1;
        for y in 0..height {
            for x in 0..width {
                if mask.contains(x, y) {
                    map.labels[(y * width + x) as usize] = label;
                }
            }
        }
    }
    map
}

/// Crop the image to the tight bounding box of `label` and paint every pixel
/// outside the label's mask with the gray background fill.
///
/// The bounding box comes from the first and last occupied index along each
/// axis. A label with no pixels left in the map (fully overwritten by a
/// later rank) yields no region.
fn extract_region(image: &RgbImage, map: &LabelMap, label: i32) -> Option<Region> {
    let (mut x_min, mut x_max): (Option<u32>, Option<u32>) = (None, None);
    let (mut y_min, mut y_max): (Option<u32>, Option<u32>) = (None, None);

    for y in 0..map.height() {
        for x in 0..map.width() {
            if map.label_at(x, y) == label {
                x_min = Some(x_min.map_or(x, |v: u32| v.min(x)));
                x_max = Some(x_max.map_or(x, |v: u32| v.max(x)));
                y_min = Some(y_min.map_or(y, |v: u32| v.min(y)));
                y_max = Some(y_max.map_or(y, |v: u32| v.max(y)));
            }
        }
    }

    let (x_min, x_max, y_min, y_max) = match (x_min, x_max, y_min, y_max) {
        (Some(a), Some(b), Some(c), Some(d)) => (a, b, c, d),
        _ => return None,
    };

    let crop_w = x_max - x_min + 1;
    let crop_h = y_max - y_min + 1;
    let mut crop = RgbImage::new(crop_w, crop_h);

    for y in 0..crop_h {
        for x in 0..crop_w {
            let src_x = x_min + x;
            let src_y = y_min + y;
            let pixel = if map.label_at(src_x, src_y) == label {
                *image.get_pixel(src_x, src_y)
            } else {
                Rgb([BACKGROUND_FILL, BACKGROUND_FILL, BACKGROUND_FILL])
            };
            crop.put_pixel(x, y, pixel);
        }
    }

    Some(Region { label, image: crop })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MockMaskGenerator;

    fn mask_from_rect(
        width: u32,
        height: u32,
        x0: u32,
        y0: u32,
        x1: u32,
        y1: u32,
    ) -> InstanceMask {
        let mut data = vec![false; (width * height) as usize];
        for y in y0..=y1 {
            for x in x0..=x1 {
                data[(y * width + x) as usize] = true;
            }
        }
        InstanceMask::new(width, height, data).unwrap()
    }

    fn checkerboard_image(width: u32, height: u32) -> RgbImage {
        let mut img = RgbImage::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let v = if (x + y) % 2 == 0 { 255 } else { 10 };
                img.put_pixel(x, y, Rgb([v, v, v]));
            }
        }
        img
    }

    fn segmenter_with_masks(masks: Vec<InstanceMask>, top_n: usize) -> Segmenter {
        let mut model = MockMaskGenerator::new();
        model.expect_generate_masks().return_once(move |_| Ok(masks));
        Segmenter::new(Arc::new(model), top_n)
    }

    #[test]
    fn test_segment_no_masks_yields_empty_map_and_regions() {
        let image = checkerboard_image(8, 8);
        let segmenter = segmenter_with_masks(vec![], 10);
        let (map, regions) = segmenter.segment(&image).unwrap();
        assert!(regions.is_empty());
        assert!(!map.has_regions());
        assert_eq!(map.width(), 8);
        assert_eq!(map.height(), 8);
    }

    #[test]
    fn test_segment_ranks_masks_by_area_descending() {
        let image = checkerboard_image(10, 10);
        let small = mask_from_rect(10, 10, 0, 0, 1, 1); // area 4
        let large = mask_from_rect(10, 10, 4, 4, 9, 9); // area 36
        let segmenter = segmenter_with_masks(vec![small, large], 10);

        let (map, regions) = segmenter.segment(&image).unwrap();
        // The larger mask gets rank 1.
        assert_eq!(map.label_at(5, 5), 1);
        assert_eq!(map.label_at(0, 0), 2);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].label, 1);
        assert_eq!(regions[0].image.dimensions(), (6, 6));
        assert_eq!(regions[1].image.dimensions(), (2, 2));
    }

    #[test]
    fn test_segment_keeps_only_top_n() {
        let image = checkerboard_image(12, 12);
        let masks = vec![
            mask_from_rect(12, 12, 0, 0, 5, 5),
            mask_from_rect(12, 12, 6, 0, 11, 4),
            mask_from_rect(12, 12, 0, 6, 3, 11),
        ];
        let segmenter = segmenter_with_masks(masks, 2);
        let (map, regions) = segmenter.segment(&image).unwrap();
        assert_eq!(regions.len(), 2);
        // Smallest mask was dropped entirely.
        assert_eq!(map.label_at(1, 8), 0);
    }

    #[test]
    fn test_segment_later_rank_overwrites_overlap() {
        let image = checkerboard_image(10, 10);
        let big = mask_from_rect(10, 10, 0, 0, 7, 7); // rank 1
        let small = mask_from_rect(10, 10, 6, 6, 9, 9); // rank 2, overlaps at (6..=7, 6..=7)
        let segmenter = segmenter_with_masks(vec![big, small], 10);

        let (map, regions) = segmenter.segment(&image).unwrap();
        // Overlapping pixels belong to the later-written rank 2.
        assert_eq!(map.label_at(6, 6), 2);
        assert_eq!(map.label_at(7, 7), 2);
        assert_eq!(map.label_at(5, 5), 1);
        assert_eq!(regions.len(), 2);
    }

    #[test]
    fn test_fully_overwritten_label_is_skipped() {
        let image = checkerboard_image(6, 6);
        // Same pixel set: the smaller-area tie loses the sort but overwrites
        // everything, leaving rank 1 with no pixels.
        let a = mask_from_rect(6, 6, 0, 0, 3, 3);
        let b = mask_from_rect(6, 6, 0, 0, 3, 3);
        let segmenter = segmenter_with_masks(vec![a, b], 10);

        let (map, regions) = segmenter.segment(&image).unwrap();
        assert_eq!(map.label_at(1, 1), 2);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].label, 2);
    }

    #[test]
    fn test_region_crop_masks_background_gray() {
        let mut image = RgbImage::new(6, 6);
        for y in 0..6 {
            for x in 0..6 {
                image.put_pixel(x, y, Rgb([200, 100, 50]));
            }
        }
        // L-shaped mask inside the 0..=2 box so part of the bbox is outside
        // the mask.
        let mut data = vec![false; 36];
        for y in 0..3u32 {
            data[(y * 6) as usize] = true; // column x=0
        }
        data[2 * 6 + 1] = true;
        data[2 * 6 + 2] = true;
        let mask = InstanceMask::new(6, 6, data).unwrap();
        let segmenter = segmenter_with_masks(vec![mask], 10);

        let (_, regions) = segmenter.segment(&image).unwrap();
        assert_eq!(regions.len(), 1);
        let crop = &regions[0].image;
        assert_eq!(crop.dimensions(), (3, 3));
        // Member pixel keeps the source color.
        assert_eq!(crop.get_pixel(0, 0).0, [200, 100, 50]);
        // Non-member pixel inside the bbox is gray-filled.
        assert_eq!(
            crop.get_pixel(2, 0).0,
            [BACKGROUND_FILL, BACKGROUND_FILL, BACKGROUND_FILL]
        );
    }

    #[test]
    fn test_segment_rejects_mismatched_mask_size() {
        let image = checkerboard_image(8, 8);
        let mask = mask_from_rect(4, 4, 0, 0, 1, 1);
        let segmenter = segmenter_with_masks(vec![mask], 10);
        assert!(segmenter.segment(&image).is_err());
    }

    #[test]
    fn test_model_error_propagates() {
        let mut model = MockMaskGenerator::new();
        model
            .expect_generate_masks()
            .return_once(|_| Err(VisionError::Ort("inference failed".to_string())));
        let segmenter = Segmenter::new(Arc::new(model), 10);
        let image = checkerboard_image(4, 4);
        assert!(segmenter.segment(&image).is_err());
    }
}
