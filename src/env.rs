//! Binding environments.
//!
//! Variables live in a-lists, proper lists of `(name . value)` pairs built per
//! call. Functions live in the d-list, one `(name . (params . body))` list
//! owned by the interpreter. Both are searched front to back.

use std::cell::RefCell;

use crate::error::Result;
use crate::lisp_error;
use crate::primitives;
use crate::sexpr::{cons, Atom, Sexpr};

/// Finds the value bound to `key`, first match wins.
pub fn assoc<'a>(key: &Atom, list: &'a Sexpr) -> Result<Option<&'a Sexpr>> {
    let mut rest = list;
    while let Sexpr::Pair(p) = rest {
        match p.0.pair() {
            Some((Sexpr::Atom(name), value)) => {
                if name == key {
                    return Ok(Some(value));
                }
            }
            _ => return Err(malformed()),
        }
        rest = &p.1;
    }
    if !rest.is_nil() {
        return Err(malformed());
    }
    Ok(None)
}

fn malformed() -> crate::error::Error {
    lisp_error!(MalformedList, "a-list or d-list in wrong format")
}

/// Prepends `(param . arg)` pairs to `alist`, one pair at a time in parameter
/// order, so the last parameter ends up in front.
pub fn bind(params: &Sexpr, args: &Sexpr, alist: &Sexpr) -> Result<Sexpr> {
    let mut params = params.iter();
    let mut args = args.iter();
    let mut list = alist.clone();
    loop {
        match (params.next(), args.next()) {
            (Some(param), Some(arg)) => list = cons(cons(param.clone(), arg.clone()), list),
            (None, None) if params.rest().is_nil() && args.rest().is_nil() => return Ok(list),
            _ => return Err(lisp_error!(WrongType, "pairs cannot be atoms")),
        }
    }
}

/// A user function as stored in the d-list.
#[derive(Clone, Debug)]
pub struct Function {
    pub params: Sexpr,
    pub body: Sexpr,
}

impl Function {
    pub fn arity(&self) -> usize {
        self.params.list_length().unwrap_or(0)
    }
}

/// The d-list.
///
/// Definitions only ever go in front, so an older definition of the same name
/// is shadowed but kept.
pub struct FunctionTable {
    list: RefCell<Sexpr>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self {
            list: RefCell::new(Sexpr::nil()),
        }
    }

    /// The current d-list value.
    pub fn as_sexpr(&self) -> Sexpr {
        self.list.borrow().clone()
    }

    pub fn lookup(&self, name: &Atom) -> Result<Option<Function>> {
        let list = self.list.borrow();
        let entry = match assoc(name, &list)? {
            Some(entry) => entry,
            None => return Ok(None),
        };
        match entry.pair() {
            Some((params, body)) => Ok(Some(Function {
                params: params.clone(),
                body: body.clone(),
            })),
            None => Err(malformed()),
        }
    }

    /// Installs a definition in front of the current d-list. Returns the name.
    pub fn define(&self, name: &Sexpr, params: &Sexpr, body: &Sexpr) -> Result<Sexpr> {
        let atom = match name {
            Sexpr::Atom(atom) if !atom.is_int() => atom,
            _ => return Err(lisp_error!(InvalidName, "'{}' is not a valid function name", name)),
        };
        if primitives::is_reserved(atom.name()) {
            return Err(lisp_error!(Redefinition, "cannot redefine primitive '{}'", atom));
        }
        params.length()?;
        if let Some(param) = params.iter().find(|param| !param.is_symbol()) {
            return Err(lisp_error!(
                InvalidName,
                "'{}' is not a valid parameter name",
                param
            ));
        }

        let entry = cons(name.clone(), cons(params.clone(), body.clone()));
        let mut list = self.list.borrow_mut();
        let updated = cons(entry, list.clone());
        *list = updated;
        log::debug!("defined {} {}", atom, params);
        Ok(name.clone())
    }
}

impl Default for FunctionTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::reader::read;

    fn atom(s: &str) -> Atom {
        Atom::new(s).unwrap()
    }

    #[test]
    fn assoc_is_first_match_wins() {
        let alist = read("((x . 1) (y . 2) (x . 3))").unwrap();
        assert_eq!(assoc(&atom("x"), &alist).unwrap(), Some(&Sexpr::int(1)));
        assert_eq!(assoc(&atom("y"), &alist).unwrap(), Some(&Sexpr::int(2)));
        assert_eq!(assoc(&atom("z"), &alist).unwrap(), None);
        assert_eq!(assoc(&atom("z"), &Sexpr::nil()).unwrap(), None);
    }

    #[test]
    fn assoc_rejects_malformed_lists() {
        for src in ["(x)", "((1 . 2) . x)", "(((a) . 1))"] {
            let list = read(src).unwrap();
            let err = assoc(&atom("q"), &list).unwrap_err();
            assert!(err.is_kind(ErrorKind::MalformedList), "{}", src);
            assert_eq!(err.to_string(), "a-list or d-list in wrong format");
        }
    }

    #[test]
    fn bind_prepends_in_parameter_order() {
        let params = read("(a b)").unwrap();
        let args = read("(1 2)").unwrap();
        let outer = read("((c . 3))").unwrap();
        let alist = bind(&params, &args, &outer).unwrap();
        assert_eq!(alist.to_string(), "((B . 2) (A . 1) (C . 3))");
        assert!(bind(&params, &read("(1)").unwrap(), &outer).is_err());
    }

    #[test]
    fn later_definition_wins() {
        let table = FunctionTable::new();
        let f = Sexpr::atom("f").unwrap();
        table
            .define(&f, &read("(x)").unwrap(), &read("x").unwrap())
            .unwrap();
        table
            .define(&f, &read("(x y)").unwrap(), &read("y").unwrap())
            .unwrap();
        let func = table.lookup(&atom("f")).unwrap().unwrap();
        assert_eq!(func.arity(), 2);
        assert_eq!(func.body, Sexpr::atom("y").unwrap());
        assert_eq!(table.as_sexpr().list_length(), Some(2));
        assert!(table.lookup(&atom("g")).unwrap().is_none());
    }

    #[test]
    fn define_validates_name_and_params() {
        let table = FunctionTable::new();
        let body = Sexpr::nil();
        let err = |name: &str, params: &str| {
            table
                .define(&read(name).unwrap(), &read(params).unwrap(), &body)
                .unwrap_err()
        };
        assert_eq!(err("5", "()").to_string(), "'5' is not a valid function name");
        assert!(err("(a)", "()").is_kind(ErrorKind::InvalidName));
        assert_eq!(err("car", "(x)").to_string(), "cannot redefine primitive 'CAR'");
        assert!(err("+", "(x)").is_kind(ErrorKind::Redefinition));
        assert!(err("cond", "(x)").is_kind(ErrorKind::Redefinition));
        assert!(err("f", "(x . y)").is_kind(ErrorKind::WrongType));
        assert!(err("f", "(x 1)").is_kind(ErrorKind::InvalidName));
        assert!(table.as_sexpr().is_nil());
    }
}
