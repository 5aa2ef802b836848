//! Interactive and batch drivers.
//!
//! Both drivers only use the reader and [`Interpreter::eval_toplevel`]. An
//! error aborts the current top-level expression and the session goes on.
//! `(QUIT)` ends the session with [`Outcome::Quit`].

use std::io::{self, BufRead};

use termcolor::{Color, ColorSpec, WriteColor};

use crate::error::{Error, Result};
use crate::eval::Interpreter;
use crate::lexer::lex;
use crate::print::pretty_print;
use crate::reader::{balanced, extra_tokens, parse_with_limit, Expressions};
use crate::sexpr::Sexpr;

pub const PROMPT: &str = "LISP: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The input ran out.
    Finished,
    /// `(QUIT)` was evaluated.
    Quit,
}

enum Entry {
    Expr(Result<Sexpr>),
    Blank,
    Eof,
}

fn label(out: &mut dyn WriteColor, text: &str, color: Color) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    write!(out, "{}", text)?;
    out.reset()
}

pub fn banner(out: &mut dyn WriteColor) -> io::Result<()> {
    writeln!(out)?;
    label(out, "Welcome to LISP", Color::Green)?;
    writeln!(out)?;
    writeln!(out, "Call (help) to see available primitives")?;
    writeln!(out, "Call (quit) or end the input to quit")?;
    writeln!(out)
}

/// Reads one top-level expression, pulling continuation lines until the
/// parentheses balance.
fn read_entry(interp: &Interpreter, input: &mut impl BufRead) -> io::Result<Entry> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(Entry::Eof);
    }
    let mut tokens = match lex(&line) {
        Ok(tokens) => tokens,
        Err(err) => return Ok(Entry::Expr(Err(err))),
    };

    loop {
        match balanced(&tokens) {
            Ok(true) => break,
            Ok(false) => {}
            Err(err) => return Ok(Entry::Expr(Err(err))),
        }
        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Ok(Entry::Eof);
        }
        match lex(&line) {
            Ok(more) => tokens.extend(more),
            Err(err) => return Ok(Entry::Expr(Err(err))),
        }
    }

    if tokens.is_empty() {
        return Ok(Entry::Blank);
    }
    let expr = parse_with_limit(&mut tokens, interp.max_depth()).and_then(|expr| {
        if tokens.is_empty() {
            Ok(expr)
        } else {
            Err(extra_tokens(&tokens))
        }
    });
    Ok(Entry::Expr(expr))
}

/// Runs the interactive loop until the input ends or `(QUIT)` is evaluated.
pub fn run_repl(
    interp: &Interpreter,
    mut input: impl BufRead,
    out: &mut dyn WriteColor,
) -> io::Result<Outcome> {
    banner(out)?;

    loop {
        label(out, PROMPT, Color::Green)?;
        out.flush()?;

        let result = match read_entry(interp, &mut input)? {
            Entry::Eof => {
                writeln!(out)?;
                return Ok(Outcome::Finished);
            }
            Entry::Blank => continue,
            Entry::Expr(expr) => expr.and_then(|expr| interp.eval_toplevel(&expr)),
        };

        match result {
            Ok(value) => {
                label(out, " OUT: ", Color::Blue)?;
                pretty_print(&value, &mut *out)?;
                writeln!(out)?;
            }
            Err(Error::Quit) => return Ok(Outcome::Quit),
            Err(err) => {
                label(out, " ERR: ", Color::Red)?;
                writeln!(out, "{}", err)?;
            }
        }
        writeln!(out)?;
    }
}

/// Evaluates every expression of `src` in order, printing each value or
/// `error: ...`. A failing expression does not stop the ones after it.
pub fn run_batch(interp: &Interpreter, src: &str, out: &mut dyn WriteColor) -> io::Result<Outcome> {
    let tokens = match lex(src) {
        Ok(tokens) => tokens,
        Err(err) => {
            writeln!(out, "error: {}", err)?;
            return Ok(Outcome::Finished);
        }
    };

    for expr in Expressions::with_limit(tokens, interp.max_depth()) {
        match expr.and_then(|expr| interp.eval_toplevel(&expr)) {
            Ok(value) => {
                pretty_print(&value, &mut *out)?;
                writeln!(out)?;
            }
            Err(Error::Quit) => return Ok(Outcome::Quit),
            Err(err) => writeln!(out, "error: {}", err)?,
        }
    }
    Ok(Outcome::Finished)
}
