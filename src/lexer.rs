//! Tokenizer.
//!
//! [`lex`] turns source text into the token queue consumed by
//! [`reader::parse`](crate::reader::parse). Atom tokens are validated and
//! upper-cased here so the reader never sees raw text.

use std::collections::VecDeque;
use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use crate::error::Result;
use crate::lisp_error;
use crate::sexpr::{is_symbol_char, Atom};

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Token {
    Atom(Atom),
    LParen,
    RParen,
    Dot,
    Quote,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Atom(atom) => write!(f, "{}", atom),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::Dot => f.write_str("."),
            Token::Quote => f.write_str("'"),
        }
    }
}

/// Lex `src` into a token queue.
///
/// Fails with a lexical error naming the first character that is neither
/// whitespace, punctuation nor a symbol character.
pub fn lex(src: &str) -> Result<VecDeque<Token>> {
    let mut cursor = Cursor::new(src);
    let mut tokens = VecDeque::new();
    while let Some(tok) = cursor.advance()? {
        tokens.push_back(tok);
    }
    Ok(tokens)
}

struct Cursor<'a> {
    chars: Peekable<Chars<'a>>,
    at: Position,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Cursor {
            chars: src.chars().peekable(),
            at: Position::default(),
        }
    }

    fn advance(&mut self) -> Result<Option<Token>> {
        self.bump_while(char::is_whitespace);

        let first = match self.peek() {
            Some(c) => c,
            None => return Ok(None),
        };

        let tok = match first {
            '(' => Token::LParen,
            ')' => Token::RParen,
            '.' => Token::Dot,
            '\'' => Token::Quote,
            ch if is_symbol_char(ch) => return self.atom().map(Some),
            ch => {
                return Err(lisp_error!(Lex, "bad token: {} at {}", ch, self.at));
            }
        };
        self.bump();
        Ok(Some(tok))
    }

    fn atom(&mut self) -> Result<Token> {
        let text = self.bump_while(is_symbol_char);
        Atom::new(&text).map(Token::Atom)
    }

    fn bump(&mut self) {
        if let Some(ch) = self.chars.next() {
            if ch == '\n' {
                self.at.next_line();
            } else {
                self.at.next_column();
            }
        }
    }

    fn bump_while<F>(&mut self, f: F) -> String
    where
        F: Fn(char) -> bool,
    {
        let mut buf = String::new();
        while let Some(ch) = self.peek() {
            if !f(ch) {
                break;
            }
            buf.push(ch);
            self.bump();
        }
        buf
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }
}

/// 1-based line and column of a character in the source.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Position {
    line: usize,
    column: usize,
}

impl Position {
    fn next_line(&mut self) {
        self.line += 1;
        self.column = 1;
    }

    fn next_column(&mut self) {
        self.column += 1;
    }
}

impl Default for Position {
    fn default() -> Self {
        Position { line: 1, column: 1 }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
