pub mod downscale;
pub mod pixel_art_detector;
pub mod resample;
pub mod selection;
pub mod sheet_writer;
pub mod synthetic;
