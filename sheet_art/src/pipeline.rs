// THEORY:
// The `pipeline` module is the top-level API of the converter. It wires the
// stages together into a single call: decode, detect the native grid, resize,
// cap, and paint the result into a spreadsheet.
//
// `ArtConverter` is a per-image value. It owns the resized grid between the
// resize step and the export step and is meant to be dropped after one image;
// a batch driver builds a fresh converter for every file.

use crate::core_modules::downscale::{apply_detection, cap_long_side};
use crate::core_modules::pixel_art_detector::{detect, Detection, DetectorConfig, Resolution};
use crate::core_modules::sheet_writer::{write_workbook, SheetConfig, SheetLayout};
use crate::error::{ArtError, Result};
use image::RgbImage;
use log::info;
use std::path::{Path, PathBuf};

// Re-export key data structures for the public API.
pub use crate::core_modules::pixel_art_detector::{DetectionReport, FallbackReason, MatchRecord, MatchVerdict};

/// Extensions the converter accepts, compared case-insensitively.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

/// Configuration of a conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertConfig {
    /// Upper bound on the long side of the final grid.
    pub max_size: u32,
    pub detector: DetectorConfig,
    pub sheet: SheetConfig,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            max_size: 150,
            detector: DetectorConfig::default(),
            sheet: SheetConfig::default(),
        }
    }
}

impl ConvertConfig {
    /// Default configuration with a custom detection tolerance.
    pub fn with_tolerance(tolerance: f64) -> Self {
        let mut config = Self::default();
        config.detector.tolerance = tolerance;
        config
    }
}

/// What a finished conversion produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionReport {
    pub output_path: PathBuf,
    pub detection: Detection,
    /// Dimensions of the painted pixel grid.
    pub grid: Resolution,
    pub layout: SheetLayout,
}

/// Converts one image. Create one per image.
pub struct ArtConverter {
    config: ConvertConfig,
    detection: Option<Detection>,
    pixels: Option<RgbImage>,
}

impl ArtConverter {
    pub fn new(config: ConvertConfig) -> Self {
        Self { config, detection: None, pixels: None }
    }

    /// Decodes `path` as RGB (first frame only) and resizes it to its final grid.
    pub fn load_and_resize(&mut self, path: &Path) -> Result<&RgbImage> {
        let image = image::open(path)?.to_rgb8();
        info!("Loaded {} ({}x{})", path.display(), image.width(), image.height());
        Ok(self.resize_image(image))
    }

    /// Runs detection and the resize pipeline on an already decoded image.
    pub fn resize_image(&mut self, image: RgbImage) -> &RgbImage {
        let report = detect(&image, &self.config.detector);
        let resized = apply_detection(&image, &report.detection);
        let grid = cap_long_side(resized, self.config.max_size);
        info!("Resized {}x{} to {}x{} ({})", image.width(), image.height(), grid.width(), grid.height(), report.detection);

        self.detection = Some(report.detection);
        self.pixels.insert(grid)
    }

    pub fn detection(&self) -> Option<&Detection> {
        self.detection.as_ref()
    }

    pub fn pixels(&self) -> Option<&RgbImage> {
        self.pixels.as_ref()
    }

    /// Paints the resized grid into a workbook at `path`.
    pub fn write_sheet(&self, path: &Path) -> Result<SheetLayout> {
        let pixels = self.pixels.as_ref().ok_or(ArtError::NotLoaded)?;
        write_workbook(pixels, path, &self.config.sheet)
    }
}

/// The workbook path next to `image_path`: same directory, same stem, `.xlsx`.
pub fn default_output_path(image_path: &Path) -> PathBuf {
    image_path.with_extension("xlsx")
}

pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| SUPPORTED_EXTENSIONS.iter().any(|supported| extension.eq_ignore_ascii_case(supported)))
}

/// Converts the image at `image_path` into spreadsheet art. Without an
/// `output_path`, the workbook lands next to the image.
pub fn convert(image_path: &Path, output_path: Option<&Path>, config: &ConvertConfig) -> Result<ConversionReport> {
    let output_path = output_path.map_or_else(|| default_output_path(image_path), Path::to_path_buf);

    let mut converter = ArtConverter::new(config.clone());
    converter.load_and_resize(image_path)?;
    let layout = converter.write_sheet(&output_path)?;

    let detection = *converter.detection().ok_or(ArtError::NotLoaded)?;
    let pixels = converter.pixels().ok_or(ArtError::NotLoaded)?;
    Ok(ConversionReport {
        output_path,
        detection,
        grid: Resolution { width: pixels.width(), height: pixels.height() },
        layout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::sheet_writer::{hex_color, paint_plan};
    use crate::core_modules::synthetic::synthetic;

    #[test]
    fn gradient_converts_end_to_end() {
        let dir = tempfile::tempdir().expect("temp dir");
        let image_path = dir.path().join("gradient.png");
        synthetic::gradient(50, 50).save(&image_path).expect("sample saved");

        let report = convert(&image_path, None, &ConvertConfig::default()).expect("conversion succeeds");

        assert_eq!(report.output_path, dir.path().join("gradient.xlsx"));
        assert!(report.output_path.exists());
        assert_eq!(report.detection, Detection::Native(Resolution { width: 50, height: 50 }));
        assert_eq!(report.grid, Resolution { width: 50, height: 50 });
        assert_eq!((report.layout.columns, report.layout.rows), (52, 52));
    }

    #[test]
    fn top_left_cell_carries_top_left_pixel() {
        let mut converter = ArtConverter::new(ConvertConfig::default());
        converter.resize_image(synthetic::gradient(50, 50));
        let pixels = converter.pixels().expect("resized");

        let first = paint_plan(pixels, &SheetConfig::default()).next().expect("non-empty grid");
        assert_eq!((first.row, first.column), (1, 1));
        assert_eq!(hex_color(first.color), hex_color(*pixels.get_pixel(0, 0)));
        assert_eq!(hex_color(first.color), "000000");
    }

    #[test]
    fn explicit_output_path_is_used() {
        let dir = tempfile::tempdir().expect("temp dir");
        let image_path = dir.path().join("blocks.png");
        synthetic::smooth_blocks(16, 8).save(&image_path).expect("sample saved");
        let output = dir.path().join("out").with_extension("xlsx");

        let report = convert(&image_path, Some(&output), &ConvertConfig::default()).expect("conversion succeeds");
        assert_eq!(report.output_path, output);
        assert_eq!(report.grid, Resolution::square(16));
        assert!(output.exists());
    }

    #[test]
    fn writing_before_loading_is_a_precondition_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let converter = ArtConverter::new(ConvertConfig::default());
        let result = converter.write_sheet(&dir.path().join("empty.xlsx"));
        assert!(matches!(result, Err(ArtError::NotLoaded)));
    }

    #[test]
    fn missing_input_is_a_decode_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let result = convert(&dir.path().join("missing.png"), None, &ConvertConfig::default());
        assert!(matches!(result, Err(ArtError::Decode(_))));
    }

    #[test]
    fn fallback_grids_respect_max_size() {
        let config = ConvertConfig { max_size: 50, ..ConvertConfig::with_tolerance(1.0) };
        let mut converter = ArtConverter::new(config);
        let grid = converter.resize_image(synthetic::gradient(200, 100));
        assert_eq!(grid.dimensions(), (50, 25));
        assert!(!converter.detection().expect("detected").is_native());
    }

    #[test]
    fn default_output_path_swaps_the_extension() {
        assert_eq!(default_output_path(Path::new("art/cat.png")), PathBuf::from("art/cat.xlsx"));
        assert_eq!(default_output_path(Path::new("sprite.JPEG")), PathBuf::from("sprite.xlsx"));
    }

    #[test]
    fn supported_extensions_ignore_case() {
        assert!(is_supported_image(Path::new("a.PNG")));
        assert!(is_supported_image(Path::new("dir/b.jpeg")));
        assert!(is_supported_image(Path::new("c.Gif")));
        assert!(!is_supported_image(Path::new("d.bmp")));
        assert!(!is_supported_image(Path::new("noext")));
    }
}
