// THEORY:
// This file is the entry point for the `sheet_art` library crate. It exposes the
// conversion pipeline (`pipeline::convert`, `pipeline::ArtConverter`) as the
// high-level interface, and the stages it is built from under `core_modules` for
// callers that only need one of them (the pixel-art size detector in particular).
//
// Stages:
// - `pixel_art_detector` + `selection`: infer the native grid of pixel art.
// - `downscale`: resize to that grid, or to a fallback size for continuous tone.
// - `sheet_writer`: paint the grid into a workbook, one filled cell per pixel.

pub mod core_modules;
pub mod error;
pub mod pipeline;

pub use core_modules::pixel_art_detector::{detect, Detection, DetectorConfig, Resolution};
pub use error::{ArtError, Result};
pub use pipeline::{convert, default_output_path, is_supported_image, ArtConverter, ConversionReport, ConvertConfig};
