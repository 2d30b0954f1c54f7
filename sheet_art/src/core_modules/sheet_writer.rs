// THEORY:
// The sheet writer paints a pixel grid into a worksheet: one cell per pixel, the
// cell's solid background set to the pixel's color.
//
// Key architectural principles:
// 1.  **Plan, then write**: `SheetLayout` is plain data computed from the grid
//     (cell size tier, column width, row height, sheet extent) and `paint_plan`
//     lists every filled cell. `write_workbook` only replays them through
//     `rust_xlsxwriter`, so every layout decision can be checked without a file.
// 2.  **Size tiers**: big grids get small cells so the art stays on screen.
// 3.  **Margins**: the art starts one row and one column in, and the sheet always
//     spans at least `min_columns` columns.

use crate::error::{ArtError, Result};
use image::{Rgb, RgbImage};
use log::info;
use rust_xlsxwriter::{ColNum, Color, Format, FormatPattern, RowNum, Workbook};
use std::collections::HashMap;
use std::path::Path;

const MAX_SHEET_COLUMNS: u32 = 16_384;
const MAX_SHEET_ROWS: u32 = 1_048_576;

/// Export constants.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetConfig {
    /// Grids with more pixels than this use `small_cell_px`.
    pub large_grid_pixels: u32,
    /// Grids with more pixels than this (and not large) use `medium_cell_px`.
    pub medium_grid_pixels: u32,
    pub small_cell_px: u32,
    pub medium_cell_px: u32,
    pub large_cell_px: u32,
    /// Screen pixels per column-width unit.
    pub column_width_divisor: f64,
    /// Points per screen pixel for row heights.
    pub row_height_factor: f64,
    /// Empty rows/columns around the art.
    pub margin: u32,
    pub min_columns: u32,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            large_grid_pixels: 10_000,
            medium_grid_pixels: 5_000,
            small_cell_px: 12,
            medium_cell_px: 15,
            large_cell_px: 20,
            column_width_divisor: 8.0,
            row_height_factor: 0.75,
            margin: 1,
            min_columns: 26,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SheetLayout {
    /// On-screen size of one cell in pixels.
    pub cell_px: u32,
    /// Column width in character units.
    pub column_width: f64,
    /// Row height in points.
    pub row_height: f64,
    pub columns: u32,
    pub rows: u32,
}

impl SheetLayout {
    pub fn plan(width: u32, height: u32, config: &SheetConfig) -> Self {
        let pixels = u64::from(width) * u64::from(height);
        let cell_px = if pixels > u64::from(config.large_grid_pixels) {
            config.small_cell_px
        } else if pixels > u64::from(config.medium_grid_pixels) {
            config.medium_cell_px
        } else {
            config.large_cell_px
        };

        Self {
            cell_px,
            column_width: cell_px as f64 / config.column_width_divisor,
            row_height: cell_px as f64 * config.row_height_factor,
            columns: (width + 2 * config.margin).max(config.min_columns),
            rows: height + 2 * config.margin,
        }
    }
}

/// A cell to fill, 0-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellFill {
    pub row: u32,
    pub column: u32,
    pub color: Rgb<u8>,
}

/// Lowercase `rrggbb` code of a pixel.
pub fn hex_color(pixel: Rgb<u8>) -> String {
    let [red, green, blue] = pixel.0;
    format!("{:02x}{:02x}{:02x}", red, green, blue)
}

/// Every filled cell in row-major order, offset by the margin.
pub fn paint_plan<'a>(image: &'a RgbImage, config: &SheetConfig) -> impl Iterator<Item = CellFill> + 'a {
    let margin = config.margin;
    image.enumerate_pixels().map(move |(x, y, pixel)| CellFill {
        row: y + margin,
        column: x + margin,
        color: *pixel,
    })
}

fn fill_format(color: Rgb<u8>) -> Format {
    let [red, green, blue] = color.0;
    let rgb = (u32::from(red) << 16) | (u32::from(green) << 8) | u32::from(blue);
    Format::new()
        .set_pattern(FormatPattern::Solid)
        .set_background_color(Color::RGB(rgb))
}

/// Writes `image` as spreadsheet art to `path` and returns the layout used.
pub fn write_workbook(image: &RgbImage, path: &Path, config: &SheetConfig) -> Result<SheetLayout> {
    let (width, height) = image.dimensions();
    let layout = SheetLayout::plan(width, height, config);
    if layout.columns > MAX_SHEET_COLUMNS || layout.rows > MAX_SHEET_ROWS {
        return Err(ArtError::GridTooLarge { width, height });
    }

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for column in 0..layout.columns {
        worksheet.set_column_width(column as ColNum, layout.column_width)?;
    }
    for row in 0..layout.rows {
        worksheet.set_row_height(row as RowNum, layout.row_height)?;
    }

    let mut formats: HashMap<Rgb<u8>, Format> = HashMap::new();
    for cell in paint_plan(image, config) {
        let format = formats.entry(cell.color).or_insert_with(|| fill_format(cell.color));
        worksheet.write_blank(cell.row as RowNum, cell.column as ColNum, format)?;
    }

    workbook.save(path)?;
    info!(
        "Wrote {}x{} grid to {} ({} columns, {} rows, {} colors)",
        width,
        height,
        path.display(),
        layout.columns,
        layout.rows,
        formats.len()
    );
    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::synthetic::synthetic;
    use std::io::Read;

    fn read_part(path: &Path, part: &str) -> String {
        let file = std::fs::File::open(path).expect("workbook exists");
        let mut archive = zip::ZipArchive::new(file).expect("workbook is a zip archive");
        let mut contents = String::new();
        archive
            .by_name(part)
            .expect("part exists")
            .read_to_string(&mut contents)
            .expect("part is utf-8");
        contents
    }

    #[test]
    fn cell_size_follows_pixel_count() {
        let config = SheetConfig::default();
        assert_eq!(SheetLayout::plan(101, 100, &config).cell_px, 12);
        assert_eq!(SheetLayout::plan(100, 100, &config).cell_px, 15);
        assert_eq!(SheetLayout::plan(71, 71, &config).cell_px, 15);
        assert_eq!(SheetLayout::plan(50, 100, &config).cell_px, 20);
    }

    #[test]
    fn units_convert_linearly() {
        let layout = SheetLayout::plan(10, 10, &SheetConfig::default());
        assert_eq!(layout.column_width, 2.5);
        assert_eq!(layout.row_height, 15.0);
    }

    #[test]
    fn extent_includes_margins_and_column_floor() {
        let config = SheetConfig::default();
        let narrow = SheetLayout::plan(10, 7, &config);
        assert_eq!((narrow.columns, narrow.rows), (26, 9));

        let wide = SheetLayout::plan(96, 48, &config);
        assert_eq!((wide.columns, wide.rows), (98, 50));
    }

    #[test]
    fn hex_codes_are_six_lowercase_digits() {
        assert_eq!(hex_color(Rgb([0, 0, 0])), "000000");
        assert_eq!(hex_color(Rgb([255, 10, 171])), "ff0aab");
    }

    #[test]
    fn paint_plan_starts_inside_the_margin() {
        let image = synthetic::gradient(4, 3);
        let cells: Vec<CellFill> = paint_plan(&image, &SheetConfig::default()).collect();

        assert_eq!(cells.len(), 12);
        assert_eq!(cells[0], CellFill { row: 1, column: 1, color: *image.get_pixel(0, 0) });
        assert_eq!(cells[11], CellFill { row: 3, column: 4, color: *image.get_pixel(3, 2) });
    }

    #[test]
    fn workbook_contains_pixel_fills() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("art.xlsx");
        let image = synthetic::gradient(50, 50);

        let layout = write_workbook(&image, &path, &SheetConfig::default()).expect("workbook written");
        assert_eq!((layout.columns, layout.rows), (52, 52));

        let styles = read_part(&path, "xl/styles.xml");
        let probe = hex_color(*image.get_pixel(10, 20)).to_uppercase();
        assert_eq!(probe, "33664C");
        assert!(styles.contains(&format!("FF{}", probe)));

        let sheet = read_part(&path, "xl/worksheets/sheet1.xml");
        assert!(sheet.contains(r#"r="B2""#));
        assert!(!sheet.contains(r#"r="A1""#));
    }

    #[test]
    fn oversized_grids_are_rejected() {
        let dir = tempfile::tempdir().expect("temp dir");
        let image = RgbImage::new(MAX_SHEET_COLUMNS, 1);
        let result = write_workbook(&image, &dir.path().join("wide.xlsx"), &SheetConfig::default());
        assert!(matches!(result, Err(ArtError::GridTooLarge { .. })));
    }
}
