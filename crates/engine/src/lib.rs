pub mod cell;
pub mod formula;
pub mod sheet;
pub mod workbook;

pub use cell::{parse_user_input, CellInput, CellValue};
pub use sheet::{Sheet, SheetId};
pub use workbook::Workbook;
