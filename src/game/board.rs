//! 3x3 board, marks and line detection
//!
//! Positions are numbered row by row:
//!
//! ```text
//! 1 2 3
//! 4 5 6
//! 7 8 9
//! ```

use std::collections::BTreeMap;
use std::fmt;

/// Every three-in-a-row, in the order they are checked
pub const WIN_LINES: [[u8; 3]; 8] = [
    [1, 2, 3],
    [4, 5, 6],
    [7, 8, 9],
    [1, 4, 7],
    [2, 5, 8],
    [3, 6, 9],
    [1, 5, 9],
    [3, 5, 7],
];

/// Content of a single cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mark {
    Empty,
    Cross,
    Zero,
}

impl Mark {
    /// The mark that moves after this one
    pub fn opponent(self) -> Self {
        match self {
            Mark::Cross => Mark::Zero,
            Mark::Zero => Mark::Cross,
            Mark::Empty => Mark::Empty,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mark::Empty => "EMPTY",
            Mark::Cross => "CROSS",
            Mark::Zero => "ZERO",
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A board position, guaranteed to be in `1..=9`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position(u8);

impl Position {
    pub fn new(value: u8) -> Option<Self> {
        (1..=9).contains(&value).then_some(Self(value))
    }

    /// Parse the decimal form used in message payloads
    pub fn parse(raw: &str) -> Option<Self> {
        raw.trim().parse::<u8>().ok().and_then(Self::new)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    fn index(self) -> usize {
        usize::from(self.0 - 1)
    }
}

/// The nine cells of a game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Board {
    cells: [Mark; 9],
}

impl Board {
    pub fn new() -> Self {
        Self {
            cells: [Mark::Empty; 9],
        }
    }

    pub fn get(&self, position: Position) -> Mark {
        self.cells[position.index()]
    }

    pub fn is_empty_at(&self, position: Position) -> bool {
        self.get(position) == Mark::Empty
    }

    pub fn set(&mut self, position: Position, mark: Mark) {
        self.cells[position.index()] = mark;
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|mark| *mark != Mark::Empty)
    }

    /// Mark owning the first completed line, if any
    pub fn winner(&self) -> Option<Mark> {
        WIN_LINES.iter().find_map(|&line| {
            let [a, b, c] = line.map(|p| self.cells[usize::from(p - 1)]);
            (a != Mark::Empty && a == b && b == c).then_some(a)
        })
    }

    /// Payload form: `"1".."9"` to mark name
    pub fn to_payload(&self) -> BTreeMap<String, String> {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, mark)| ((i + 1).to_string(), mark.as_str().to_string()))
            .collect()
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}
