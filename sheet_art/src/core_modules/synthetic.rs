// THEORY:
// Generated images with a known answer. Block images are exact pixel art at a
// chosen native size, gradients are continuous tone, and noise has no structure
// at all. They drive the detector tests and the `sample` command of the CLI.

pub mod synthetic {
    use image::{Rgb, RgbImage};

    /// A gradient where pixel (i, j) has R = 255·i/width, G = 255·j/height and
    /// B = 255·(i+j)/(width+height), truncated.
    pub fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |i, j| {
            Rgb([
                (255 * i / width) as u8,
                (255 * j / height) as u8,
                (255 * (i + j) / (width + height)) as u8,
            ])
        })
    }

    /// A `native`x`native` grid of uniform `block_px`-wide blocks, colored by block coordinate.
    pub fn pixel_blocks(native: u32, block_px: u32, color: impl Fn(u32, u32) -> Rgb<u8>) -> RgbImage {
        let side = native * block_px;
        RgbImage::from_fn(side, side, |x, y| color(x / block_px, y / block_px))
    }

    /// Pixel art whose neighboring blocks differ by small, distinct steps.
    pub fn smooth_blocks(native: u32, block_px: u32) -> RgbImage {
        pixel_blocks(native, block_px, |bx, by| {
            Rgb([(bx * 8 % 256) as u8, (by * 8 % 256) as u8, ((bx + by) * 4 % 256) as u8])
        })
    }

    /// Deterministic per-pixel noise.
    pub fn noise(width: u32, height: u32, seed: u32) -> RgbImage {
        let mut state = seed.max(1);
        let mut next = move || {
            // xorshift32
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state
        };

        let mut image = RgbImage::new(width, height);
        for pixel in image.pixels_mut() {
            let value = next().to_le_bytes();
            *pixel = Rgb([value[0], value[1], value[2]]);
        }
        image
    }
}
