// Core types shared by the engine and the editor

pub mod address;

pub use address::{col_to_letters, column_index, CellAddress, CellRange, MAX_COLS, MAX_ROWS};
