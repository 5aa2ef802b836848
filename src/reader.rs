//! S-expression reader.
//!
//! The parser is destructive: it pops tokens off the front of the queue for
//! exactly one expression and leaves the rest in place. Nesting descends
//! recursively, list tails are collected by a loop.

use std::collections::VecDeque;

use crate::error::{Error, Result};
use crate::eval::DEFAULT_MAX_DEPTH;
use crate::lexer::{lex, Token};
use crate::lisp_error;
use crate::sexpr::{Atom, Sexpr};

/// Parse one expression from the front of `tokens`.
pub fn parse(tokens: &mut VecDeque<Token>) -> Result<Sexpr> {
    parse_with_limit(tokens, DEFAULT_MAX_DEPTH)
}

/// Like [`parse`] but nesting deeper than `max_depth` fails with
/// [`Error::RecursionTooDeep`].
pub fn parse_with_limit(tokens: &mut VecDeque<Token>, max_depth: usize) -> Result<Sexpr> {
    Parser { tokens, max_depth }.expr(0)
}

struct Parser<'a> {
    tokens: &'a mut VecDeque<Token>,
    max_depth: usize,
}

impl Parser<'_> {
    fn next(&mut self) -> Result<Token> {
        self.tokens
            .pop_front()
            .ok_or_else(|| lisp_error!(Parse, "parse error: missing tokens"))
    }

    fn peek(&self) -> Result<&Token> {
        self.tokens
            .front()
            .ok_or_else(|| lisp_error!(Parse, "parse error: missing tokens"))
    }

    fn enter(&self, depth: usize) -> Result<usize> {
        if depth >= self.max_depth {
            return Err(Error::RecursionTooDeep {
                limit: self.max_depth,
            });
        }
        Ok(depth + 1)
    }

    fn expr(&mut self, depth: usize) -> Result<Sexpr> {
        match self.next()? {
            Token::Atom(atom) => Ok(Sexpr::Atom(atom)),
            Token::Quote => {
                let quoted = self.expr(self.enter(depth)?)?;
                Ok(Sexpr::make_list(&[
                    Sexpr::Atom(Atom::canonical("QUOTE")),
                    quoted,
                ]))
            }
            Token::LParen => {
                if self.tokens.front() == Some(&Token::RParen) {
                    self.tokens.pop_front();
                    return Ok(Sexpr::nil());
                }
                let depth = self.enter(depth)?;
                let first = self.expr(depth)?;
                if *self.peek()? == Token::Dot {
                    self.tokens.pop_front();
                    let second = self.expr(depth)?;
                    return match self.next()? {
                        Token::RParen => Ok(crate::sexpr::cons(first, second)),
                        _ => Err(lisp_error!(Parse, "missing close parentheses")),
                    };
                }
                self.list_tail(first, depth)
            }
            Token::RParen | Token::Dot => Err(lisp_error!(Parse, "missing open parentheses")),
        }
    }

    fn list_tail(&mut self, first: Sexpr, depth: usize) -> Result<Sexpr> {
        let mut items = vec![first];
        loop {
            match self.peek()? {
                Token::RParen => {
                    self.tokens.pop_front();
                    return Ok(Sexpr::make_list(&items));
                }
                Token::Dot => return Err(lisp_error!(Parse, "mixed notation not supported")),
                _ => items.push(self.expr(depth)?),
            }
        }
    }
}

/// Returns true if the parentheses in `tokens` balance.
///
/// Fails as soon as a `)` has no matching `(`.
pub fn balanced<'a>(tokens: impl IntoIterator<Item = &'a Token>) -> Result<bool> {
    let mut count = 0usize;
    for tok in tokens {
        match tok {
            Token::LParen => count += 1,
            Token::RParen => {
                count = count
                    .checked_sub(1)
                    .ok_or_else(|| lisp_error!(Parse, "imbalanced parens"))?;
            }
            _ => {}
        }
    }
    Ok(count == 0)
}

/// Lex `text` and parse exactly one expression from it.
pub fn read(text: &str) -> Result<Sexpr> {
    let mut tokens = lex(text)?;
    let expr = parse(&mut tokens)?;
    if !tokens.is_empty() {
        return Err(extra_tokens(&tokens));
    }
    Ok(expr)
}

pub(crate) fn extra_tokens(tokens: &VecDeque<Token>) -> Error {
    let rest: Vec<String> = tokens.iter().map(ToString::to_string).collect();
    lisp_error!(Parse, "extra tokens found: {}", rest.join(" "))
}

/// Every top-level expression of a token queue, in order.
///
/// A parse failure is yielded as an `Err` item and parsing resumes with the
/// tokens that follow it.
pub struct Expressions {
    tokens: VecDeque<Token>,
    max_depth: usize,
}

impl Expressions {
    pub fn new(tokens: VecDeque<Token>) -> Self {
        Self::with_limit(tokens, DEFAULT_MAX_DEPTH)
    }

    pub fn with_limit(tokens: VecDeque<Token>, max_depth: usize) -> Self {
        Self { tokens, max_depth }
    }

    pub fn from_source(src: &str) -> Result<Self> {
        lex(src).map(Self::new)
    }
}

impl Iterator for Expressions {
    type Item = Result<Sexpr>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.tokens.is_empty() {
            return None;
        }
        Some(parse_with_limit(&mut self.tokens, self.max_depth))
    }
}
