// THEORY:
// The resize pipeline turns a decoded image into the final pixel grid, driven by
// the detector's verdict.
//
// - A native resolution means the image is pixel art: one nearest-neighbor resize
//   straight to that resolution recovers the original grid.
// - A fallback size means continuous tone: the image is first smoothed down to
//   twice the target (long side), then nearest-sampled to the target itself. The
//   second step sharpens cell boundaries without reintroducing aliasing.
//
// `cap_long_side` enforces the converter's `max_size` on whatever came out.

use crate::core_modules::pixel_art_detector::Detection;
use crate::core_modules::resample::resample::{fit_long_side, nearest, smooth};
use image::RgbImage;
use log::debug;

pub fn apply_detection(image: &RgbImage, detection: &Detection) -> RgbImage {
    match *detection {
        Detection::Native(resolution) => nearest(image, resolution.width, resolution.height),
        Detection::Fallback { size, .. } => {
            let (width, height) = image.dimensions();
            let (intermediate_width, intermediate_height) = fit_long_side(width, height, size * 2);
            let intermediate = smooth(image, intermediate_width, intermediate_height);

            let (final_width, final_height) = fit_long_side(width, height, size);
            debug!(
                "Two-stage resize {}x{} -> {}x{} -> {}x{}",
                width, height, intermediate_width, intermediate_height, final_width, final_height
            );
            nearest(&intermediate, final_width, final_height)
        }
    }
}

/// Shrinks `image` with nearest-neighbor so its long side is at most `max_size`.
pub fn cap_long_side(image: RgbImage, max_size: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    if max_size == 0 || width.max(height) <= max_size {
        return image;
    }

    let (capped_width, capped_height) = fit_long_side(width, height, max_size);
    debug!("Capping {}x{} to {}x{}", width, height, capped_width, capped_height);
    nearest(&image, capped_width, capped_height)
}
