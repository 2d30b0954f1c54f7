// THEORY:
// The `resample` module holds the handful of image operations the size detector
// and the resize pipeline are built from. Every operation is a thin wrapper over
// `image::imageops::resize` so that the two filters in play are named by their
// role instead of by their kernel:
//
// 1.  **nearest**: block replication. Pixel art survives a nearest round trip at
//     its native size without a single changed value.
// 2.  **smooth**: Lanczos3. Used wherever continuous-tone fidelity matters
//     (preprocessing large inputs, the quick check, fallback downscaling).
//
// `mean_absolute_difference` is the single similarity metric of the detector:
// the average absolute per-channel difference over every position, on the
// 0-255 scale.

pub mod resample {
    use image::imageops::{self, FilterType};
    use image::RgbImage;

    /// Nearest-neighbor resample. Never blends, so hard edges stay hard.
    pub fn nearest(image: &RgbImage, width: u32, height: u32) -> RgbImage {
        imageops::resize(image, width, height, FilterType::Nearest)
    }

    /// High-quality (Lanczos3) resample.
    pub fn smooth(image: &RgbImage, width: u32, height: u32) -> RgbImage {
        imageops::resize(image, width, height, FilterType::Lanczos3)
    }

    /// Resamples to `width`x`height` with `there`, then back to the original
    /// dimensions with `back`.
    pub fn round_trip(
        image: &RgbImage,
        width: u32,
        height: u32,
        there: FilterType,
        back: FilterType,
    ) -> RgbImage {
        let (original_width, original_height) = image.dimensions();
        let moved = imageops::resize(image, width, height, there);
        imageops::resize(&moved, original_width, original_height, back)
    }

    /// Average absolute difference over all channels of all positions.
    /// Both grids must have the same dimensions.
    pub fn mean_absolute_difference(a: &RgbImage, b: &RgbImage) -> f64 {
        debug_assert_eq!(a.dimensions(), b.dimensions());
        let samples = a.as_raw().len();
        if samples == 0 {
            return 0.0;
        }

        let total: u64 = a
            .as_raw()
            .iter()
            .zip(b.as_raw())
            .map(|(&left, &right)| u64::from(left.abs_diff(right)))
            .sum();

        total as f64 / samples as f64
    }

    /// Dimensions with the same aspect ratio as `width`x`height` whose long side
    /// is exactly `long_side`. The short side is truncated and never below 1.
    pub fn fit_long_side(width: u32, height: u32, long_side: u32) -> (u32, u32) {
        let aspect_ratio = width as f64 / height as f64;
        let (fitted_width, fitted_height) = if aspect_ratio > 1.0 {
            (long_side, (long_side as f64 / aspect_ratio) as u32)
        } else {
            ((long_side as f64 * aspect_ratio) as u32, long_side)
        };
        (fitted_width.max(1), fitted_height.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::resample::*;
    use image::imageops::FilterType;
    use image::{Rgb, RgbImage};

    #[test]
    fn identical_images_have_zero_difference() {
        let image = RgbImage::from_fn(7, 5, |x, y| Rgb([x as u8 * 30, y as u8 * 40, 9]));
        assert_eq!(mean_absolute_difference(&image, &image.clone()), 0.0);
    }

    #[test]
    fn difference_is_averaged_over_every_channel() {
        let black = RgbImage::from_pixel(2, 2, Rgb([0, 0, 0]));
        let mut one_red = black.clone();
        one_red.put_pixel(0, 0, Rgb([120, 0, 0]));

        // 120 spread over 2 * 2 * 3 samples.
        assert_eq!(mean_absolute_difference(&black, &one_red), 10.0);
        assert_eq!(mean_absolute_difference(&one_red, &black), 10.0);
    }

    #[test]
    fn nearest_round_trip_preserves_block_images() {
        let image = RgbImage::from_fn(12, 12, |x, y| Rgb([(x / 3) as u8 * 50, (y / 3) as u8 * 50, 0]));
        let restored = round_trip(&image, 4, 4, FilterType::Nearest, FilterType::Nearest);
        assert_eq!(restored, image);
    }

    #[test]
    fn nearest_upscale_replicates_pixels() {
        let image = RgbImage::from_fn(2, 1, |x, _| if x == 0 { Rgb([255, 0, 0]) } else { Rgb([0, 0, 255]) });
        let enlarged = nearest(&image, 6, 3);
        for (x, _, pixel) in enlarged.enumerate_pixels() {
            let expected = if x < 3 { Rgb([255, 0, 0]) } else { Rgb([0, 0, 255]) };
            assert_eq!(*pixel, expected);
        }
    }

    #[test]
    fn fit_long_side_keeps_aspect_ratio() {
        assert_eq!(fit_long_side(300, 150, 96), (96, 48));
        assert_eq!(fit_long_side(150, 300, 96), (48, 96));
        assert_eq!(fit_long_side(50, 50, 128), (128, 128));
    }

    #[test]
    fn fit_long_side_never_collapses_a_dimension() {
        assert_eq!(fit_long_side(5000, 10, 96), (96, 1));
        assert_eq!(fit_long_side(1, 4000, 96), (1, 96));
    }
}
