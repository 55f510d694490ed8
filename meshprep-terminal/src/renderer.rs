/// Depth-tested ASCII framebuffer
use crossterm::{
    cursor,
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use std::io::Write;

/// Character luminosity ramp for shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &['.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// A screen-space vertex: column, row, depth
pub type ScreenPoint = (f32, f32, f32);

pub struct AsciiRenderer {
    columns: usize,
    rows: usize,
    depth: Vec<f32>,
    cells: Vec<char>,
}

impl AsciiRenderer {
    pub fn new(columns: usize, rows: usize) -> Self {
        Self {
            columns,
            rows,
            depth: vec![f32::INFINITY; columns * rows],
            cells: vec![' '; columns * rows],
        }
    }

    pub fn resize(&mut self, columns: usize, rows: usize) {
        *self = Self::new(columns, rows);
    }

    pub fn size(&self) -> (usize, usize) {
        (self.columns, self.rows)
    }

    pub fn clear(&mut self) {
        self.depth.fill(f32::INFINITY);
        self.cells.fill(' ');
    }

    pub fn cell(&self, column: usize, row: usize) -> Option<char> {
        if column >= self.columns {
            return None;
        }
        self.cells.get(row * self.columns + column).copied()
    }

    /// Number of cells something was drawn into
    pub fn covered(&self) -> usize {
        self.cells.iter().filter(|&&c| c != ' ').count()
    }

    /// Fill every cell whose centre lies inside the triangle and passes the depth test
    ///
    /// `brightness` in `[0, 1]` picks the character; either winding is accepted.
    pub fn fill_triangle(&mut self, points: [ScreenPoint; 3], brightness: f32) {
        let [a, b, c] = points;
        let area = edge(a, b, (c.0, c.1));
        if area.abs() < 1e-6 {
            return;
        }
        let character = shade(brightness);

        let min_column = a.0.min(b.0).min(c.0).floor().max(0.0) as usize;
        let min_row = a.1.min(b.1).min(c.1).floor().max(0.0) as usize;
        let max_column = (a.0.max(b.0).max(c.0).ceil() as usize).min(self.columns);
        let max_row = (a.1.max(b.1).max(c.1).ceil() as usize).min(self.rows);

        for row in min_row..max_row {
            for column in min_column..max_column {
                let centre = (column as f32 + 0.5, row as f32 + 0.5);
                let wa = edge(b, c, centre) / area;
                let wb = edge(c, a, centre) / area;
                let wc = 1.0 - wa - wb;
                if wa < 0.0 || wb < 0.0 || wc < 0.0 {
                    continue;
                }
                let depth = wa * a.2 + wb * b.2 + wc * c.2;
                let index = row * self.columns + column;
                if depth < self.depth[index] {
                    self.depth[index] = depth;
                    self.cells[index] = character;
                }
            }
        }
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for (row, line) in self.cells.chunks(self.columns.max(1)).enumerate() {
            writer.queue(cursor::MoveTo(0, row as u16))?;
            for &c in line {
                let color = match c {
                    '.' | ':' => Color::DarkGrey,
                    '-' | '=' => Color::Grey,
                    '+' | '*' => Color::White,
                    _ => Color::Cyan,
                };
                writer.queue(SetForegroundColor(color))?;
                writer.queue(Print(c))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

/// Twice the signed area of `(a, b, p)`
fn edge(a: ScreenPoint, b: ScreenPoint, p: (f32, f32)) -> f32 {
    (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0)
}

fn shade(brightness: f32) -> char {
    let last = LUMINOSITY_RAMP.len() - 1;
    let index = (brightness.clamp(0.0, 1.0) * last as f32).round() as usize;
    LUMINOSITY_RAMP[index.min(last)]
}
