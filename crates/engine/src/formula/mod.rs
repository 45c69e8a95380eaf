// Formula parsing

pub mod parser;

pub use parser::{parse, Expr, Op, ParseError};
