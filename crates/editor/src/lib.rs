//! In-editor formula analysis and the cell editing state machine.
//!
//! Everything keystroke-driven here is total: malformed input degrades to
//! error tokens or missing analysis, never to a panic or an `Err`.

pub mod autocomplete;
pub mod editing;
pub mod formula_context;
pub mod formula_refs;
pub mod functions;
pub mod history;
pub mod keybindings;
pub mod ref_insert;
pub mod text_editing;
pub mod tokenizer;

pub use autocomplete::{accept_autocomplete, detect_context, filter_functions, AcceptRequest, AutocompleteContext};
pub use editing::{close_unmatched_parens, CellEditComposition, CellEditingState, EditAction, EditOrigin, EditorState, EntryMode};
pub use formula_context::{
    analyze, analyze_with, signature_help, AnalysisCache, EngineParser, FormulaAnalysis, FormulaParser, SignatureHelp,
};
pub use formula_refs::{extract_references, parse_reference, ParsedReference, ReferenceToken};
pub use functions::{BuiltinFunctions, FunctionDefinition, FunctionRegistry};
pub use history::History;
pub use keybindings::{action_for_key, Key, KeyAction, KeyInput};
pub use ref_insert::{build_reference_text, cycle_reference, is_insertion_point};
pub use text_editing::TextEdit;
pub use tokenizer::{tokenize, Token, TokenKind};
