// Player ticket: a fixed 3x9 grid of optional numbers.

use thiserror::Error;

/// Rows on a housie ticket.
pub const ROWS: usize = 3;

/// Columns on a housie ticket.
pub const COLUMNS: usize = 9;

/// Highest number that can be called in a round.
pub const MAX_NUMBER: u8 = 90;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TicketError {
    #[error("ticket must have 3 rows, got {actual}")]
    RowCount { actual: usize },

    #[error("ticket row {row} must have 9 cells, got {actual}")]
    ColumnCount { row: usize, actual: usize },

    #[error("ticket number {number} at row {row}, column {column} is outside 1..=90")]
    OutOfRange { row: usize, column: usize, number: u8 },

    #[error("ticket number {number} appears more than once")]
    Duplicate { number: u8 },
}

/// How a single ticket cell should be displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellState {
    /// No number in this cell. Never marked.
    Blank,
    /// Number not yet called.
    Uncalled(u8),
    /// Number has been called and is marked.
    Marked(u8),
}

/// A player's ticket for one round. Immutable once assigned.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ticket {
    cells: [[Option<u8>; COLUMNS]; ROWS],
}

impl Ticket {
    /// Build a ticket from the row-major grid sent by the backend.
    ///
    /// The grid must be exactly 3x9 with numbers in 1..=90 and no repeats.
    pub fn from_rows(rows: Vec<Vec<Option<u8>>>) -> Result<Self, TicketError> {
        if rows.len() != ROWS {
            return Err(TicketError::RowCount { actual: rows.len() });
        }

        let mut cells = [[None; COLUMNS]; ROWS];
        let mut seen = [false; MAX_NUMBER as usize + 1];

        for (r, row) in rows.into_iter().enumerate() {
            if row.len() != COLUMNS {
                return Err(TicketError::ColumnCount {
                    row: r,
                    actual: row.len(),
                });
            }
            for (c, cell) in row.into_iter().enumerate() {
                if let Some(number) = cell {
                    if number == 0 || number > MAX_NUMBER {
                        return Err(TicketError::OutOfRange {
                            row: r,
                            column: c,
                            number,
                        });
                    }
                    if seen[number as usize] {
                        return Err(TicketError::Duplicate { number });
                    }
                    seen[number as usize] = true;
                }
                cells[r][c] = cell;
            }
        }

        Ok(Ticket { cells })
    }

    /// A ticket with no numbers (creators watching a round hold no ticket).
    pub fn blank() -> Self {
        Ticket::default()
    }

    pub fn is_blank(&self) -> bool {
        self.numbers().next().is_none()
    }

    pub fn rows(&self) -> &[[Option<u8>; COLUMNS]; ROWS] {
        &self.cells
    }

    /// All numbers on the ticket in row-major order.
    pub fn numbers(&self) -> impl Iterator<Item = u8> + '_ {
        self.cells.iter().flatten().filter_map(|c| *c)
    }

    pub fn total_numbers(&self) -> usize {
        self.numbers().count()
    }

    pub fn contains(&self, number: u8) -> bool {
        self.numbers().any(|n| n == number)
    }

    /// A number can be marked only if it is on the ticket and has been called.
    pub fn is_markable(&self, number: u8, called: &[u8]) -> bool {
        self.contains(number) && called.contains(&number)
    }

    pub fn cell_state(&self, row: usize, column: usize, called: &[u8]) -> CellState {
        match self.cells.get(row).and_then(|r| r.get(column)).copied().flatten() {
            None => CellState::Blank,
            Some(n) if called.contains(&n) => CellState::Marked(n),
            Some(n) => CellState::Uncalled(n),
        }
    }

    /// Display state for every cell, row-major.
    pub fn cell_states(&self, called: &[u8]) -> [[CellState; COLUMNS]; ROWS] {
        let mut states = [[CellState::Blank; COLUMNS]; ROWS];
        for (r, row) in states.iter_mut().enumerate() {
            for (c, state) in row.iter_mut().enumerate() {
                *state = self.cell_state(r, c, called);
            }
        }
        states
    }

    pub fn marked_count(&self, called: &[u8]) -> usize {
        self.numbers().filter(|n| called.contains(n)).count()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
