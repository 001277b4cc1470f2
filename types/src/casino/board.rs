use super::{LineKey, Symbol};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the eight scored lines of a 3x3 board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Line {
    TopRow,
    MiddleRow,
    BottomRow,
    LeftColumn,
    CenterColumn,
    RightColumn,
    Diagonal,
    AntiDiagonal,
}

impl Line {
    pub const ALL: [Line; 8] = [
        Line::TopRow,
        Line::MiddleRow,
        Line::BottomRow,
        Line::LeftColumn,
        Line::CenterColumn,
        Line::RightColumn,
        Line::Diagonal,
        Line::AntiDiagonal,
    ];

    /// `(row, column)` coordinates, in reading order.
    pub fn cells(self) -> [(usize, usize); 3] {
        match self {
            Line::TopRow => [(0, 0), (0, 1), (0, 2)],
            Line::MiddleRow => [(1, 0), (1, 1), (1, 2)],
            Line::BottomRow => [(2, 0), (2, 1), (2, 2)],
            Line::LeftColumn => [(0, 0), (1, 0), (2, 0)],
            Line::CenterColumn => [(0, 1), (1, 1), (2, 1)],
            Line::RightColumn => [(0, 2), (1, 2), (2, 2)],
            Line::Diagonal => [(0, 0), (1, 1), (2, 2)],
            Line::AntiDiagonal => [(0, 2), (1, 1), (2, 0)],
        }
    }
}

/// A 3x3 grid of symbols, indexed `[row][column]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Board(pub [[Symbol; 3]; 3]);

impl Board {
    /// Board shown before the reels stop.
    pub fn placeholder() -> Self {
        Board([[Symbol::Wild; 3]; 3])
    }

    pub fn cell(&self, row: usize, column: usize) -> Symbol {
        self.0[row][column]
    }

    /// Symbols read along `line`.
    pub fn key(&self, line: Line) -> LineKey {
        let [a, b, c] = line.cells();
        LineKey([
            self.cell(a.0, a.1),
            self.cell(b.0, b.1),
            self.cell(c.0, c.1),
        ])
    }

    pub fn rows(&self) -> &[[Symbol; 3]; 3] {
        &self.0
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{} | {} | {}", row[0], row[1], row[2])?;
        }
        Ok(())
    }
}
