//! Safe evaluation of substituted condition expressions.
//!
//! Conditions are authored as human-readable boolean text; after placeholder
//! substitution the result is tokenized and parsed into a literal-only AST,
//! so no general interpreter is ever invoked.

pub mod lexer;
pub mod parser;

pub use lexer::{LexError, Token, tokenize};
pub use parser::{Expr, ExprError, Value, evaluate_str, parse};
