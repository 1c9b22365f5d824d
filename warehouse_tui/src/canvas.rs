use ratatui::style::Style;

use warehouse_core::Position;

/// A glyph drawn in one terminal cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    pub symbol: char,
    pub style: Style,
}

impl Default for Glyph {
    fn default() -> Self {
        Glyph {
            symbol: ' ',
            style: Style::default(),
        }
    }
}

/// A character raster covering the whole warehouse floor.
///
/// Cells are stored in row-major order. Warehouse coordinates are scaled so
/// the full floor fits the raster; later plots overwrite earlier ones.
#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    columns: usize,
    rows: usize,
    scale_x: f64,
    scale_y: f64,
    cells: Vec<Glyph>,
}

impl Canvas {
    pub fn new(columns: usize, rows: usize, floor_width: f64, floor_height: f64) -> Self {
        Canvas {
            columns,
            rows,
            scale_x: columns as f64 / floor_width,
            scale_y: rows as f64 / floor_height,
            cells: vec![Glyph::default(); columns * rows],
        }
    }

    /// Raster cell holding a warehouse position, or `None` for an empty canvas.
    pub fn cell_of(&self, position: Position) -> Option<(usize, usize)> {
        if self.columns == 0 || self.rows == 0 {
            return None;
        }
        let column = (position.x * self.scale_x).floor().max(0.0) as usize;
        let row = (position.y * self.scale_y).floor().max(0.0) as usize;
        Some((column.min(self.columns - 1), row.min(self.rows - 1)))
    }

    pub fn plot(&mut self, position: Position, glyph: Glyph) {
        if let Some((column, row)) = self.cell_of(position) {
            self.cells[row * self.columns + column] = glyph;
        }
    }

    /// Rows of glyphs from top to bottom.
    pub fn lines(&self) -> impl Iterator<Item = &[Glyph]> {
        self.cells.chunks(self.columns.max(1))
    }
}
