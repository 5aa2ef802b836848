//! S-expression definition.
//!
//! An S-expression is either an atom or a pair of two S-expressions. Pairs are
//! reference counted so list tails can be shared between constructions; nothing
//! mutates a pair once it is built.

use std::fmt;
use std::rc::Rc;

use once_cell::sync::Lazy;

use crate::error::Result;
use crate::lisp_error;

pub const NIL: &str = "NIL";
pub const T: &str = "T";

static SYMBOL_CHARS: Lazy<[bool; 128]> = Lazy::new(|| {
    let mut map = [false; 128];
    for (i, slot) in map.iter_mut().enumerate() {
        let c = i as u8 as char;
        *slot = c.is_ascii_alphanumeric() || "%*+-/=<>".contains(c);
    }
    map
});

/// Returns true if `c` may appear in an atom.
pub fn is_symbol_char(c: char) -> bool {
    (c as u32) < 128 && SYMBOL_CHARS[c as usize]
}

/// Returns true if `text` matches the signed-digit integer grammar.
pub fn is_integer_text(text: &str) -> bool {
    let digits = text
        .strip_prefix('-')
        .or_else(|| text.strip_prefix('+'))
        .unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Canonical (upper-cased) atom text.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Atom(Rc<str>);

impl Atom {
    /// Validates `text` against the atom grammar and upper-cases it.
    pub fn new(text: &str) -> Result<Self> {
        if text.is_empty() || !text.chars().all(is_symbol_char) {
            return Err(lisp_error!(
                WrongType,
                "not a valid atomic S-expression: {}",
                text
            ));
        }
        Ok(Self(Rc::from(text.to_ascii_uppercase())))
    }

    pub fn int(n: i64) -> Self {
        Self(Rc::from(n.to_string()))
    }

    pub(crate) fn canonical(text: &'static str) -> Self {
        debug_assert!(Atom::new(text).map(|a| &*a.0 == text).unwrap_or(false));
        Self(Rc::from(text))
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn is_nil(&self) -> bool {
        &*self.0 == NIL
    }

    pub fn is_t(&self) -> bool {
        &*self.0 == T
    }

    pub fn is_int(&self) -> bool {
        is_integer_text(&self.0)
    }

    /// The integer value of this atom.
    ///
    /// Fails with a wrong-type error if the atom is not an integer and with an
    /// arithmetic error if it does not fit in `i64`.
    pub fn to_int(&self) -> Result<i64> {
        if !self.is_int() {
            return Err(lisp_error!(WrongType, "not an int: {}", self));
        }
        self.0
            .parse::<i64>()
            .map_err(|_| lisp_error!(Arithmetic, "integer out of range: {}", self))
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

thread_local! {
    static NIL_ATOM: Atom = Atom::canonical(NIL);
}

#[derive(Clone)]
pub enum Sexpr {
    Atom(Atom),
    Pair(Rc<(Sexpr, Sexpr)>),
}

impl Sexpr {
    pub fn nil() -> Self {
        let atom = NIL_ATOM
            .try_with(Atom::clone)
            .unwrap_or_else(|_| Atom::canonical(NIL));
        Self::Atom(atom)
    }

    pub fn t() -> Self {
        Self::Atom(Atom::canonical(T))
    }

    /// Builds an atom from source text, validating and upper-casing it.
    pub fn atom(text: &str) -> Result<Self> {
        Atom::new(text).map(Self::Atom)
    }

    pub fn int(n: i64) -> Self {
        Self::Atom(Atom::int(n))
    }

    pub fn is_atom(&self) -> bool {
        matches!(self, Self::Atom(_))
    }

    pub fn is_pair(&self) -> bool {
        matches!(self, Self::Pair(_))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Atom(a) if a.is_nil())
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Self::Atom(a) if a.is_int())
    }

    /// A non-integer atom, the only thing that can name a function or variable.
    pub fn is_symbol(&self) -> bool {
        matches!(self, Self::Atom(a) if !a.is_int())
    }

    pub fn as_atom(&self) -> Option<&Atom> {
        match self {
            Self::Atom(a) => Some(a),
            Self::Pair(_) => None,
        }
    }

    pub fn pair(&self) -> Option<&(Sexpr, Sexpr)> {
        match self {
            Self::Pair(p) => Some(p),
            Self::Atom(_) => None,
        }
    }

    pub fn car(&self) -> Result<&Sexpr> {
        match self {
            Self::Pair(p) => Ok(&p.0),
            Self::Atom(_) => Err(lisp_error!(
                WrongType,
                "cannot call CAR on atomic s-expression: {}",
                self
            )),
        }
    }

    pub fn cdr(&self) -> Result<&Sexpr> {
        match self {
            Self::Pair(p) => Ok(&p.1),
            Self::Atom(_) => Err(lisp_error!(
                WrongType,
                "cannot call CDR on atomic s-expression: {}",
                self
            )),
        }
    }

    pub fn is_proper_list(&self) -> bool {
        self.list_length().is_some()
    }

    /// Number of elements of a proper list, `None` for anything else.
    pub fn list_length(&self) -> Option<usize> {
        let mut len = 0;
        let mut rest = self;
        while let Self::Pair(p) = rest {
            len += 1;
            rest = &p.1;
        }
        rest.is_nil().then_some(len)
    }

    /// Like [`Sexpr::list_length`] but fails with a wrong-type error.
    pub fn length(&self) -> Result<usize> {
        self.list_length()
            .ok_or_else(|| lisp_error!(WrongType, "calling length on non-list {}", self))
    }

    /// Iterates over the cars of the list spine. Stops at the first non-pair,
    /// which is available from [`Iter::rest`].
    pub fn iter(&self) -> Iter<'_> {
        Iter { rest: self }
    }

    pub fn make_list(exprs: &[Sexpr]) -> Self {
        Self::make_list_star(exprs, Self::nil())
    }

    pub fn make_list_star(exprs: &[Sexpr], rest: Sexpr) -> Self {
        let mut list = rest;
        for expr in exprs.iter().rev() {
            list = cons(expr.clone(), list);
        }
        list
    }
}

pub fn cons(car: Sexpr, cdr: Sexpr) -> Sexpr {
    Sexpr::Pair(Rc::new((car, cdr)))
}

impl From<bool> for Sexpr {
    fn from(value: bool) -> Self {
        if value {
            Sexpr::t()
        } else {
            Sexpr::nil()
        }
    }
}

impl From<Atom> for Sexpr {
    fn from(atom: Atom) -> Self {
        Sexpr::Atom(atom)
    }
}

pub struct Iter<'a> {
    rest: &'a Sexpr,
}

impl<'a> Iter<'a> {
    /// What is left of the spine. NIL once a proper list is exhausted.
    pub fn rest(&self) -> &'a Sexpr {
        self.rest
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Sexpr;

    fn next(&mut self) -> Option<Self::Item> {
        match self.rest {
            Sexpr::Pair(p) => {
                self.rest = &p.1;
                Some(&p.0)
            }
            Sexpr::Atom(_) => None,
        }
    }
}

/// Unlinks the spine one cell at a time. Cells still shared elsewhere stop the
/// walk, their owners drop them later.
impl Drop for Sexpr {
    fn drop(&mut self) {
        let mut rest = match self {
            Sexpr::Pair(p) => match Rc::get_mut(p) {
                Some(cell) if cell.1.is_pair() => std::mem::replace(&mut cell.1, Sexpr::nil()),
                _ => return,
            },
            Sexpr::Atom(_) => return,
        };
        while let Sexpr::Pair(p) = &mut rest {
            let next = match Rc::get_mut(p) {
                Some(cell) => std::mem::replace(&mut cell.1, Sexpr::nil()),
                None => break,
            };
            rest = next;
        }
    }
}

/// Structural equality, looping over the spine and recursing only into cars.
impl PartialEq for Sexpr {
    fn eq(&self, other: &Self) -> bool {
        let (mut a, mut b) = (self, other);
        loop {
            match (a, b) {
                (Sexpr::Atom(x), Sexpr::Atom(y)) => return x == y,
                (Sexpr::Pair(x), Sexpr::Pair(y)) => {
                    if Rc::ptr_eq(x, y) {
                        return true;
                    }
                    if x.0 != y.0 {
                        return false;
                    }
                    a = &x.1;
                    b = &y.1;
                }
                _ => return false,
            }
        }
    }
}

impl Eq for Sexpr {}

impl fmt::Display for Sexpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut vec = Vec::new();
        let mut out = termcolor::NoColor::new(&mut vec);
        match crate::print::pretty_print(self, &mut out) {
            Ok(_) => f.write_str(&String::from_utf8_lossy(&vec)),
            Err(_) => Err(fmt::Error),
        }
    }
}

impl fmt::Debug for Sexpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(s: &str) -> Sexpr {
        Sexpr::atom(s).unwrap()
    }

    #[test]
    fn atoms_are_canonicalized_at_construction() {
        assert_eq!(sym("foo"), sym("FOO"));
        assert_eq!(sym("car").as_atom().unwrap().name(), "CAR");
        assert!(sym("nil").is_nil());
        assert!(Sexpr::atom("").is_err());
        assert!(Sexpr::atom("a.b").is_err());
        assert!(Sexpr::atom("é").is_err());
    }

    #[test]
    fn integer_grammar() {
        for text in ["0", "42", "-7", "+7", "007"] {
            assert!(sym(text).is_int(), "{}", text);
        }
        for text in ["-", "+", "1-", "--1", "+-1", "A1", "1A"] {
            assert!(!sym(text).is_int(), "{}", text);
        }
        assert_eq!(sym("+7").as_atom().unwrap().to_int(), Ok(7));
        assert!(sym("99999999999999999999")
            .as_atom()
            .unwrap()
            .to_int()
            .unwrap_err()
            .is_kind(crate::error::ErrorKind::Arithmetic));
    }

    #[test]
    fn car_and_cdr_of_cons() {
        let a = sym("A");
        let b = Sexpr::make_list(&[sym("B"), sym("C")]);
        let p = cons(a.clone(), b.clone());
        assert_eq!(p.car(), Ok(&a));
        assert_eq!(p.cdr(), Ok(&b));
        assert!(a.car().is_err());
        assert!(a.cdr().is_err());
    }

    #[test]
    fn list_length_and_properness() {
        let list = Sexpr::make_list(&[sym("A"), sym("B"), sym("C")]);
        assert_eq!(list.list_length(), Some(3));
        assert_eq!(Sexpr::nil().list_length(), Some(0));
        let dotted = cons(sym("A"), sym("B"));
        assert!(!dotted.is_proper_list());
        assert!(sym("A").length().is_err());

        let mut iter = dotted.iter();
        assert_eq!(iter.next(), Some(&sym("A")));
        assert_eq!(iter.next(), None);
        assert_eq!(iter.rest(), &sym("B"));
    }

    #[test]
    fn long_flat_lists_do_not_recurse() {
        let items = vec![Sexpr::int(1); 300_000];
        let list = Sexpr::make_list(&items);
        assert_eq!(list.list_length(), Some(300_000));
        assert_eq!(list.iter().count(), 300_000);

        let copy = Sexpr::make_list(&items);
        assert_eq!(list, copy);
        let longer = cons(Sexpr::int(1), copy);
        assert_ne!(list, longer);
        drop(longer);
        drop(list);
    }

    #[test]
    fn shared_tails_survive_dropping_one_owner() {
        let tail = Sexpr::make_list(&vec![sym("X"); 300_000]);
        let first = cons(sym("A"), tail.clone());
        let second = cons(sym("B"), tail.clone());
        drop(first);
        assert_eq!(second.list_length(), Some(300_001));
        assert_eq!(second.cdr(), Ok(&tail));
        drop(tail);
        assert_eq!(second.iter().nth(300_000), Some(&sym("X")));
    }

    #[test]
    fn equality_is_structural() {
        let a = Sexpr::make_list_star(&[sym("A"), Sexpr::make_list(&[sym("B")])], sym("C"));
        let b = Sexpr::make_list_star(&[sym("A"), Sexpr::make_list(&[sym("B")])], sym("C"));
        assert_eq!(a, b);
        assert_ne!(a, Sexpr::make_list(&[sym("A"), Sexpr::make_list(&[sym("B")])]));
        assert_ne!(sym("A"), cons(sym("A"), Sexpr::nil()));
    }

    #[test]
    fn bool_conversion() {
        assert_eq!(Sexpr::from(true), Sexpr::t());
        assert_eq!(Sexpr::from(false), Sexpr::nil());
    }
}
