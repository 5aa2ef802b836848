//! Builtin functions.
//!
//! Every primitive declares its spellings and arity in one static table. The
//! evaluator checks arity against the table before any argument is evaluated,
//! so the functions here can index their argument slice directly.

use indexmap::IndexMap;
use num::Integer;
use once_cell::sync::Lazy;

use crate::error::{Error, Result};
use crate::eval::Interpreter;
use crate::lisp_error;
use crate::sexpr::{cons, Sexpr, NIL, T};

pub type PrimitiveFn = fn(&Interpreter, &[Sexpr]) -> Result<Sexpr>;

pub struct Primitive {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub arity: usize,
    pub func: PrimitiveFn,
    pub doc: &'static str,
}

impl Primitive {
    pub fn spellings(&self) -> impl Iterator<Item = &'static str> {
        std::iter::once(self.name).chain(self.aliases.iter().copied())
    }
}

/// Forms the evaluator handles itself. Their arguments are not evaluated.
pub const SPECIAL_FORMS: [&str; 3] = ["QUOTE", "COND", "DEFUN"];

static PRIMITIVES: &[Primitive] = &[
    Primitive {
        name: "CAR",
        aliases: &[],
        arity: 1,
        func: car,
        doc: "left child of a pair",
    },
    Primitive {
        name: "CDR",
        aliases: &[],
        arity: 1,
        func: cdr,
        doc: "right child of a pair",
    },
    Primitive {
        name: "CONS",
        aliases: &[],
        arity: 2,
        func: cons_,
        doc: "new pair of the two arguments",
    },
    Primitive {
        name: "ATOM",
        aliases: &[],
        arity: 1,
        func: atom,
        doc: "T if the argument is an atom",
    },
    Primitive {
        name: "EQ",
        aliases: &["="],
        arity: 2,
        func: eq,
        doc: "T if both arguments are the same atom",
    },
    Primitive {
        name: "NULL",
        aliases: &[],
        arity: 1,
        func: null,
        doc: "T if the argument is NIL",
    },
    Primitive {
        name: "INT",
        aliases: &[],
        arity: 1,
        func: int,
        doc: "T if the argument is an integer atom",
    },
    Primitive {
        name: "PLUS",
        aliases: &["+"],
        arity: 2,
        func: plus,
        doc: "integer addition",
    },
    Primitive {
        name: "MINUS",
        aliases: &["-"],
        arity: 2,
        func: minus,
        doc: "integer subtraction",
    },
    Primitive {
        name: "TIMES",
        aliases: &["*"],
        arity: 2,
        func: times,
        doc: "integer multiplication",
    },
    Primitive {
        name: "QUOTIENT",
        aliases: &["/"],
        arity: 2,
        func: quotient,
        doc: "integer division rounding toward negative infinity",
    },
    Primitive {
        name: "REMAINDER",
        aliases: &["%"],
        arity: 2,
        func: remainder,
        doc: "remainder of QUOTIENT, same sign as the divisor",
    },
    Primitive {
        name: "LESS",
        aliases: &["<"],
        arity: 2,
        func: less,
        doc: "T if the first integer is smaller",
    },
    Primitive {
        name: "GREATER",
        aliases: &[">"],
        arity: 2,
        func: greater,
        doc: "T if the first integer is larger",
    },
    Primitive {
        name: "HELP",
        aliases: &[],
        arity: 0,
        func: help,
        doc: "print this list",
    },
    Primitive {
        name: "QUIT",
        aliases: &[],
        arity: 0,
        func: quit,
        doc: "leave the interpreter",
    },
];

static REGISTRY: Lazy<IndexMap<&'static str, &'static Primitive>> = Lazy::new(|| {
    let mut map = IndexMap::new();
    for prim in PRIMITIVES {
        for spelling in prim.spellings() {
            map.insert(spelling, prim);
        }
    }
    map
});

/// The primitive spelled `name`, if any. `name` must be canonical.
pub fn lookup(name: &str) -> Option<&'static Primitive> {
    REGISTRY.get(name).copied()
}

/// Names DEFUN refuses to bind.
pub fn is_reserved(name: &str) -> bool {
    name == T || name == NIL || SPECIAL_FORMS.contains(&name) || REGISTRY.contains_key(name)
}

/// Text printed by `(HELP)`.
pub fn catalogue() -> String {
    let mut text = String::from("Available primitives:\n");
    text.push_str(&format!("  {:<16}{}\n", "T NIL", "truth and falsity, NIL is also the empty list"));
    text.push_str(&format!("  {:<16}{}\n", "QUOTE", "(QUOTE x) returns x unevaluated, also written 'x"));
    text.push_str(&format!("  {:<16}{}\n", "COND", "(COND (test result) ...) first result whose test is not NIL"));
    text.push_str(&format!("  {:<16}{}\n", "DEFUN", "(DEFUN name (params) body) defines a function"));
    for prim in PRIMITIVES {
        let spellings: Vec<&str> = prim.spellings().collect();
        text.push_str(&format!("  {:<16}{}\n", spellings.join(" "), prim.doc));
    }
    text
}

fn car(_: &Interpreter, args: &[Sexpr]) -> Result<Sexpr> {
    args[0].car().cloned()
}

fn cdr(_: &Interpreter, args: &[Sexpr]) -> Result<Sexpr> {
    args[0].cdr().cloned()
}

fn cons_(_: &Interpreter, args: &[Sexpr]) -> Result<Sexpr> {
    Ok(cons(args[0].clone(), args[1].clone()))
}

fn atom(_: &Interpreter, args: &[Sexpr]) -> Result<Sexpr> {
    Ok(args[0].is_atom().into())
}

fn eq(_: &Interpreter, args: &[Sexpr]) -> Result<Sexpr> {
    let same = match (&args[0], &args[1]) {
        (Sexpr::Atom(a), Sexpr::Atom(b)) => a == b,
        _ => false,
    };
    Ok(same.into())
}

fn null(_: &Interpreter, args: &[Sexpr]) -> Result<Sexpr> {
    Ok(args[0].is_nil().into())
}

fn int(_: &Interpreter, args: &[Sexpr]) -> Result<Sexpr> {
    Ok(args[0].is_int().into())
}

fn to_int(expr: &Sexpr) -> Result<i64> {
    match expr {
        Sexpr::Atom(atom) => atom.to_int(),
        Sexpr::Pair(_) => Err(lisp_error!(WrongType, "not an int: {}", expr)),
    }
}

fn operands(args: &[Sexpr]) -> Result<(i64, i64)> {
    Ok((to_int(&args[0])?, to_int(&args[1])?))
}

fn overflow(op: &str) -> Error {
    lisp_error!(Arithmetic, "integer overflow in {}", op)
}

fn plus(_: &Interpreter, args: &[Sexpr]) -> Result<Sexpr> {
    let (a, b) = operands(args)?;
    a.checked_add(b)
        .map(Sexpr::int)
        .ok_or_else(|| overflow("PLUS"))
}

fn minus(_: &Interpreter, args: &[Sexpr]) -> Result<Sexpr> {
    let (a, b) = operands(args)?;
    a.checked_sub(b)
        .map(Sexpr::int)
        .ok_or_else(|| overflow("MINUS"))
}

fn times(_: &Interpreter, args: &[Sexpr]) -> Result<Sexpr> {
    let (a, b) = operands(args)?;
    a.checked_mul(b)
        .map(Sexpr::int)
        .ok_or_else(|| overflow("TIMES"))
}

fn divisor(b: i64) -> Result<i64> {
    if b == 0 {
        return Err(lisp_error!(Arithmetic, "division by zero"));
    }
    Ok(b)
}

fn quotient(_: &Interpreter, args: &[Sexpr]) -> Result<Sexpr> {
    let (a, b) = operands(args)?;
    let b = divisor(b)?;
    if a.checked_div(b).is_none() {
        return Err(overflow("QUOTIENT"));
    }
    Ok(Sexpr::int(Integer::div_floor(&a, &b)))
}

fn remainder(_: &Interpreter, args: &[Sexpr]) -> Result<Sexpr> {
    let (a, b) = operands(args)?;
    let b = divisor(b)?;
    if b == -1 {
        return Ok(Sexpr::int(0));
    }
    Ok(Sexpr::int(Integer::mod_floor(&a, &b)))
}

fn less(_: &Interpreter, args: &[Sexpr]) -> Result<Sexpr> {
    let (a, b) = operands(args)?;
    Ok((a < b).into())
}

fn greater(_: &Interpreter, args: &[Sexpr]) -> Result<Sexpr> {
    let (a, b) = operands(args)?;
    Ok((a > b).into())
}

fn help(interp: &Interpreter, _: &[Sexpr]) -> Result<Sexpr> {
    if let Err(err) = interp.write_output(&catalogue()) {
        log::warn!("failed to write help: {}", err);
    }
    Ok(Sexpr::t())
}

fn quit(_: &Interpreter, _: &[Sexpr]) -> Result<Sexpr> {
    Err(Error::Quit)
}
