//! Error handling.
//!
//! Every fallible operation in the interpreter returns [`Error`]. Interpreter
//! errors share a single [`LispError`] kind carrying an [`ErrorKind`] tag and a
//! message. Stack exhaustion and `(QUIT)` are distinguished conditions because
//! they do not originate from interpreter logic.

use std::fmt;

/// Builds an [`Error::Lisp`] with a formatted message.
///
/// ```
/// use lisp15::{lisp_error, error::ErrorKind};
///
/// let err = lisp_error!(UnboundVariable, "unbound variable: {}", "FOO");
/// assert_eq!(err.kind(), Some(ErrorKind::UnboundVariable));
/// ```
#[macro_export]
macro_rules! lisp_error {
    ($kind:ident, $msg:literal $(,)? $($arg:expr),*) => {
        $crate::error::Error::Lisp($crate::error::LispError::new(
            $crate::error::ErrorKind::$kind,
            format!($msg, $($arg),*),
        ))
    };
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub enum ErrorKind {
    /// A character that is neither whitespace, punctuation nor part of an atom.
    Lex,
    /// Missing or extra tokens, mismatched parentheses, mixed notation.
    Parse,
    UnboundVariable,
    /// Non-atom where an atom is required, non-integer where an integer is
    /// required, non-list where a list is required.
    WrongType,
    Arity,
    /// An operator position holding a pair.
    InvalidExpression,
    NotAFunction,
    FunctionNotFound,
    InvalidName,
    /// DEFUN of a primitive or special-form name.
    Redefinition,
    NoClauseMatched,
    /// An a-list or d-list element that is not a `(atom . value)` pair.
    MalformedList,
    /// Integer overflow or division by zero.
    Arithmetic,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Lex => "lexical error",
            ErrorKind::Parse => "parse error",
            ErrorKind::UnboundVariable => "unbound variable",
            ErrorKind::WrongType => "wrong type",
            ErrorKind::Arity => "arity mismatch",
            ErrorKind::InvalidExpression => "invalid expression",
            ErrorKind::NotAFunction => "not a function",
            ErrorKind::FunctionNotFound => "function not found",
            ErrorKind::InvalidName => "invalid name",
            ErrorKind::Redefinition => "primitive redefinition",
            ErrorKind::NoClauseMatched => "no clause matched",
            ErrorKind::MalformedList => "malformed list",
            ErrorKind::Arithmetic => "arithmetic error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct LispError {
    kind: ErrorKind,
    message: String,
}

impl LispError {
    pub fn new(kind: ErrorKind, message: String) -> Self {
        Self { kind, message }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for LispError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for LispError {}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Error {
    Lisp(LispError),
    /// The nesting depth of the reader or evaluator reached `limit`.
    RecursionTooDeep { limit: usize },
    /// `(QUIT)` was evaluated. The host decides how to terminate.
    Quit,
}

impl Error {
    /// The taxonomy tag, or `None` for the conditions outside the taxonomy.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Lisp(err) => Some(err.kind()),
            _ => None,
        }
    }

    pub fn is_kind(&self, kind: ErrorKind) -> bool {
        self.kind() == Some(kind)
    }
}

impl From<LispError> for Error {
    fn from(err: LispError) -> Self {
        Error::Lisp(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Lisp(err) => write!(f, "{}", err),
            Error::RecursionTooDeep { limit } => {
                write!(f, "deep recursion not supported (depth limit {})", limit)
            }
            Error::Quit => f.write_str("quit"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Lisp(err) => Some(err),
            _ => None,
        }
    }
}
