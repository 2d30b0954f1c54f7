// THEORY:
// Every fallible step of a conversion reports through `ArtError`. Decoding and
// write failures are fatal and propagate untouched; nothing here retries.
// `NotLoaded` is the one error that signals misuse rather than a bad input: the
// caller asked for a spreadsheet before any image was loaded and resized.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtError {
    /// The input could not be opened or decoded.
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// The workbook writer rejected the grid or could not save it.
    #[error("failed to write workbook: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    /// Export was requested before an image was loaded and resized.
    #[error("no image loaded; call load_and_resize before writing a sheet")]
    NotLoaded,

    #[error("a {width}x{height} grid does not fit in a worksheet")]
    GridTooLarge { width: u32, height: u32 },
}

pub type Result<T> = std::result::Result<T, ArtError>;
