//! A LISP 1.5 style interpreter.
//!
//! Source text is lexed into [`lexer::Token`]s, parsed into [`Sexpr`] trees by
//! the [`reader`] and evaluated by an [`Interpreter`]. Variables are bound
//! dynamically in per-call a-lists and functions live in a single d-list owned
//! by the interpreter.
//!
//! ```
//! use lisp15::Interpreter;
//!
//! let interp = Interpreter::new();
//! interp.eval_str("(defun double (x) (plus x x))").unwrap();
//! assert_eq!(interp.eval_str("(double 4)").unwrap().to_string(), "8");
//! ```
//!
//! An [`Interpreter`] is neither `Send` nor `Sync`. Each thread of a
//! multi-session host needs its own.

pub mod env;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod options;
pub mod primitives;
pub mod print;
pub mod reader;
pub mod repl;
pub mod sexpr;

pub use error::{Error, ErrorKind, LispError, Result};
pub use eval::Interpreter;
pub use reader::{parse, read, Expressions};
pub use sexpr::{cons, Atom, Sexpr};
