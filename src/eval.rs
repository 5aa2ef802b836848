//! The evaluator.
//!
//! [`Interpreter::eval`] dispatches on the shape of an expression: atoms are
//! looked up in the a-list, pairs headed by an atom are special forms or
//! calls. Calls resolve their callee and check arity before any argument is
//! evaluated.
//!
//! Every nested evaluation holds a depth guard. When the depth reaches the
//! configured limit the evaluation fails with [`Error::RecursionTooDeep`]
//! instead of overflowing the host stack.

use std::cell::{Cell, RefCell};
use std::io::Write;

use crate::env::{self, Function, FunctionTable};
use crate::error::{Error, Result};
use crate::lisp_error;
use crate::primitives::{self, Primitive};
use crate::reader::Expressions;
use crate::sexpr::{Atom, Sexpr};

/// Depth limit used when none is configured. Safe on a 2 MiB thread stack.
pub const DEFAULT_MAX_DEPTH: usize = 400;

/// Host stack reserved for each nesting level when deriving a limit from a
/// stack size.
pub const STACK_BYTES_PER_LEVEL: usize = 16 * 1024;

/// The largest depth limit that fits in `stack_bytes` of host stack.
pub fn depth_for_stack(stack_bytes: usize) -> usize {
    (stack_bytes / STACK_BYTES_PER_LEVEL).max(1)
}

/// An interpreter session: the d-list, the depth counter and the output that
/// `(HELP)` writes to.
///
/// The session shares values through `Rc` and mutates the d-list through a
/// `RefCell`, so it is neither `Send` nor `Sync`. Hosts running several
/// sessions give each one its own interpreter.
pub struct Interpreter {
    functions: FunctionTable,
    depth: Cell<usize>,
    max_depth: usize,
    out: RefCell<Box<dyn Write>>,
}

struct DepthGuard<'a> {
    depth: &'a Cell<usize>,
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get() - 1);
    }
}

enum Callee {
    Primitive(&'static Primitive),
    Function(Function),
}

impl Callee {
    fn arity(&self) -> usize {
        match self {
            Callee::Primitive(prim) => prim.arity,
            Callee::Function(func) => func.arity(),
        }
    }
}

fn arity_error(name: &Atom, expected: usize, got: usize) -> Error {
    lisp_error!(Arity, "{} expects {} argument; got {}", name, expected, got)
}

fn check_arity(name: &Atom, got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(arity_error(name, expected, got));
    }
    Ok(())
}

/// Splits a proper argument list into exactly `N` arguments.
fn arguments<'a, const N: usize>(name: &Atom, args: &'a Sexpr) -> Result<[&'a Sexpr; N]> {
    let items: Vec<&Sexpr> = args.iter().collect();
    let got = items.len();
    items.try_into().map_err(|_| arity_error(name, N, got))
}

impl Interpreter {
    pub fn new() -> Self {
        Self {
            functions: FunctionTable::new(),
            depth: Cell::new(0),
            max_depth: DEFAULT_MAX_DEPTH,
            out: RefCell::new(Box::new(std::io::stdout())),
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    pub fn with_output(mut self, out: impl Write + 'static) -> Self {
        self.out = RefCell::new(Box::new(out));
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    pub fn write_output(&self, text: &str) -> std::io::Result<()> {
        let mut out = self.out.borrow_mut();
        out.write_all(text.as_bytes())?;
        out.flush()
    }

    fn enter(&self) -> Result<DepthGuard<'_>> {
        let depth = self.depth.get();
        if depth >= self.max_depth {
            log::warn!("recursion limit of {} reached", self.max_depth);
            return Err(Error::RecursionTooDeep {
                limit: self.max_depth,
            });
        }
        self.depth.set(depth + 1);
        Ok(DepthGuard { depth: &self.depth })
    }

    /// Evaluates a top-level expression under an empty a-list.
    pub fn eval_toplevel(&self, expr: &Sexpr) -> Result<Sexpr> {
        self.eval(expr, &Sexpr::nil())
    }

    /// Evaluates every expression in `src` in order and returns the last
    /// value, NIL if there is none. Stops at the first error.
    pub fn eval_str(&self, src: &str) -> Result<Sexpr> {
        let tokens = crate::lexer::lex(src)?;
        let mut value = Sexpr::nil();
        for expr in Expressions::with_limit(tokens, self.max_depth) {
            value = self.eval_toplevel(&expr?)?;
        }
        Ok(value)
    }

    pub fn eval(&self, expr: &Sexpr, alist: &Sexpr) -> Result<Sexpr> {
        let _guard = self.enter()?;
        log::trace!(target: "lisp15::eval", "eval {}", expr);

        match expr {
            Sexpr::Atom(atom) => self.eval_atom(atom, alist),
            Sexpr::Pair(p) => match &p.0 {
                Sexpr::Atom(op) => self.eval_form(op, &p.1, alist),
                Sexpr::Pair(_) => Err(lisp_error!(
                    InvalidExpression,
                    "eval called with invalid expression: {}",
                    expr
                )),
            },
        }
    }

    fn eval_atom(&self, atom: &Atom, alist: &Sexpr) -> Result<Sexpr> {
        if atom.is_int() || atom.is_t() || atom.is_nil() {
            return Ok(Sexpr::Atom(atom.clone()));
        }
        match env::assoc(atom, alist)? {
            Some(value) => Ok(value.clone()),
            None => Err(lisp_error!(UnboundVariable, "unbound variable: {}", atom)),
        }
    }

    fn eval_form(&self, op: &Atom, args: &Sexpr, alist: &Sexpr) -> Result<Sexpr> {
        if op.is_int() {
            return Err(lisp_error!(
                InvalidName,
                "'{}' is not a valid function name or special form",
                op
            ));
        }
        let argc = args.length()?;

        match op.name() {
            "QUOTE" => {
                let [quoted] = arguments::<1>(op, args)?;
                Ok(quoted.clone())
            }
            "COND" => self.evcond(args, alist),
            "DEFUN" => {
                let [name, params, body] = arguments::<3>(op, args)?;
                self.defun(name, params, body)
            }
            _ => {
                let callee = self.resolve(op)?;
                check_arity(op, argc, callee.arity())?;
                let values = self.evlis(args, alist)?;
                self.apply_callee(op, &callee, &values, alist)
            }
        }
    }

    /// Installs a user function. Later lookups, including ones made by
    /// evaluations already in progress, see the new definition.
    pub fn defun(&self, name: &Sexpr, params: &Sexpr, body: &Sexpr) -> Result<Sexpr> {
        self.functions.define(name, params, body)
    }

    /// Evaluates the first clause result whose test is not NIL.
    pub fn evcond(&self, clauses: &Sexpr, alist: &Sexpr) -> Result<Sexpr> {
        clauses.length()?;
        for clause in clauses.iter() {
            let (test, result) = match clause.list_length() {
                Some(2) => (clause.car()?, clause.cdr()?.car()?),
                _ => {
                    return Err(lisp_error!(
                        WrongType,
                        "COND clause must be (test result); got {}",
                        clause
                    ))
                }
            };
            if !self.eval(test, alist)?.is_nil() {
                return self.eval(result, alist);
            }
        }
        Err(lisp_error!(NoClauseMatched, "no clause matched in COND"))
    }

    /// Evaluates each element of `args` left to right into a fresh list.
    pub fn evlis(&self, args: &Sexpr, alist: &Sexpr) -> Result<Sexpr> {
        args.length()?;
        let values = args
            .iter()
            .map(|arg| self.eval(arg, alist))
            .collect::<Result<Vec<_>>>()?;
        Ok(Sexpr::make_list(&values))
    }

    /// Applies `f` to already evaluated arguments.
    pub fn apply(&self, f: &Sexpr, args: &Sexpr, alist: &Sexpr) -> Result<Sexpr> {
        let name = match f {
            Sexpr::Atom(atom) => atom,
            Sexpr::Pair(_) => {
                return Err(lisp_error!(
                    NotAFunction,
                    "cannot call non-atom {} as a function",
                    f
                ))
            }
        };
        let callee = self.resolve(name)?;
        check_arity(name, args.length()?, callee.arity())?;
        self.apply_callee(name, &callee, args, alist)
    }

    fn resolve(&self, name: &Atom) -> Result<Callee> {
        if let Some(prim) = primitives::lookup(name.name()) {
            return Ok(Callee::Primitive(prim));
        }
        match self.functions.lookup(name)? {
            Some(func) => Ok(Callee::Function(func)),
            None => Err(lisp_error!(FunctionNotFound, "function {} not found", name)),
        }
    }

    fn apply_callee(&self, name: &Atom, callee: &Callee, args: &Sexpr, alist: &Sexpr) -> Result<Sexpr> {
        log::trace!(target: "lisp15::eval", "apply {} {}", name, args);

        match callee {
            Callee::Primitive(prim) => {
                let args: Vec<Sexpr> = args.iter().cloned().collect();
                (prim.func)(self, &args)
            }
            Callee::Function(func) => {
                let alist = env::bind(&func.params, args, alist)?;
                self.eval(&func.body, &alist)
            }
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::reader::read;
    use std::rc::Rc;

    fn eval(interp: &Interpreter, src: &str) -> Result<String> {
        interp.eval_str(src).map(|value| value.to_string())
    }

    fn kind(interp: &Interpreter, src: &str) -> Option<ErrorKind> {
        interp.eval_str(src).unwrap_err().kind()
    }

    #[derive(Clone, Default)]
    struct Shared(Rc<RefCell<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn self_evaluating_atoms() {
        let interp = Interpreter::new();
        assert_eq!(eval(&interp, "42").unwrap(), "42");
        assert_eq!(eval(&interp, "-7").unwrap(), "-7");
        assert_eq!(eval(&interp, "t").unwrap(), "T");
        assert_eq!(eval(&interp, "nil").unwrap(), "NIL");
        assert_eq!(eval(&interp, "()").unwrap(), "NIL");
    }

    #[test]
    fn very_long_quoted_lists() {
        let interp = Interpreter::new();
        let list = format!("'({})", "x ".repeat(300_000));
        assert_eq!(eval(&interp, &format!("(null {})", list)).unwrap(), "NIL");
        assert_eq!(eval(&interp, &format!("(car {})", list)).unwrap(), "X");
        let rest = eval(&interp, &format!("(cdr {})", list)).unwrap();
        assert_eq!(rest.len(), 2 * 299_999 + 1);
        assert_eq!(eval(&interp, "(plus 1 2)").unwrap(), "3");
    }

    #[test]
    fn unbound_variable_names_the_atom() {
        let interp = Interpreter::new();
        let err = interp.eval_str("foo").unwrap_err();
        assert!(err.is_kind(ErrorKind::UnboundVariable));
        assert_eq!(err.to_string(), "unbound variable: FOO");
    }

    #[test]
    fn variables_come_from_the_alist() {
        let interp = Interpreter::new();
        let alist = read("((x . 1) (x . 2))").unwrap();
        let value = interp.eval(&Sexpr::atom("x").unwrap(), &alist).unwrap();
        assert_eq!(value, Sexpr::int(1));
    }

    #[test]
    fn quote() {
        let interp = Interpreter::new();
        assert_eq!(eval(&interp, "(quote (a b c))").unwrap(), "(A B C)");
        assert_eq!(eval(&interp, "'(a . b)").unwrap(), "(A . B)");
        assert_eq!(eval(&interp, "(quote foo)").unwrap(), "FOO");
        assert_eq!(
            interp.eval_str("(quote a b)").unwrap_err().to_string(),
            "QUOTE expects 1 argument; got 2"
        );
        assert_eq!(kind(&interp, "(quote)"), Some(ErrorKind::Arity));
    }

    #[test]
    fn cond_picks_the_first_truthy_test() {
        let interp = Interpreter::new();
        assert_eq!(eval(&interp, "(cond (nil 1) (t 2) (t 3))").unwrap(), "2");
        assert_eq!(eval(&interp, "(cond ((eq 1 1) 'yes))").unwrap(), "YES");
        assert_eq!(eval(&interp, "(cond (5 'five))").unwrap(), "FIVE");
    }

    #[test]
    fn cond_stops_evaluating_tests_at_the_winner() {
        let interp = Interpreter::new();
        assert_eq!(eval(&interp, "(cond (t 1) (undefined 2))").unwrap(), "1");
        assert_eq!(kind(&interp, "(cond (nil 1) (undefined 2))"), Some(ErrorKind::UnboundVariable));
    }

    #[test]
    fn cond_without_a_match() {
        let interp = Interpreter::new();
        for src in ["(cond)", "(cond (nil 1) ((null t) 2))"] {
            let err = interp.eval_str(src).unwrap_err();
            assert_eq!(err.to_string(), "no clause matched in COND");
        }
        assert_eq!(kind(&interp, "(cond (t))"), Some(ErrorKind::WrongType));
        assert_eq!(kind(&interp, "(cond t)"), Some(ErrorKind::WrongType));
    }

    #[test]
    fn defun_and_call() {
        let interp = Interpreter::new();
        assert_eq!(eval(&interp, "(defun double (x) (plus x x))").unwrap(), "DOUBLE");
        assert_eq!(eval(&interp, "(double 4)").unwrap(), "8");
        assert_eq!(eval(&interp, "(double (double 3))").unwrap(), "12");
    }

    #[test]
    fn recursive_functions() {
        let interp = Interpreter::new();
        interp
            .eval_str(
                "(defun fact (n) (cond ((eq n 0) 1) (t (times n (fact (minus n 1))))))
                 (defun len (l) (cond ((null l) 0) (t (+ 1 (len (cdr l))))))",
            )
            .unwrap();
        assert_eq!(eval(&interp, "(fact 10)").unwrap(), "3628800");
        assert_eq!(eval(&interp, "(len '(a b c d))").unwrap(), "4");
    }

    #[test]
    fn second_definition_wins() {
        let interp = Interpreter::new();
        interp.eval_str("(defun f (x) x) (defun f (x) (plus x 1))").unwrap();
        assert_eq!(eval(&interp, "(f 5)").unwrap(), "6");
    }

    #[test]
    fn defun_of_a_primitive_fails() {
        let interp = Interpreter::new();
        let err = interp.eval_str("(defun car (x) x)").unwrap_err();
        assert!(err.is_kind(ErrorKind::Redefinition));
        assert_eq!(err.to_string(), "cannot redefine primitive 'CAR'");
        assert_eq!(kind(&interp, "(defun quote (x) x)"), Some(ErrorKind::Redefinition));
        assert_eq!(kind(&interp, "(defun 5 (x) x)"), Some(ErrorKind::InvalidName));
        assert_eq!(kind(&interp, "(defun f (x))"), Some(ErrorKind::Arity));
        assert!(interp.functions().as_sexpr().is_nil());
    }

    #[test]
    fn bindings_are_dynamic() {
        let interp = Interpreter::new();
        interp
            .eval_str("(defun get-y () y) (defun with-y (y) (get-y))")
            .unwrap();
        assert_eq!(eval(&interp, "(with-y 7)").unwrap(), "7");
        assert_eq!(kind(&interp, "(get-y)"), Some(ErrorKind::UnboundVariable));
    }

    #[test]
    fn parameters_shadow_outer_bindings() {
        let interp = Interpreter::new();
        interp
            .eval_str("(defun inner (x) x) (defun outer (x) (cons x (inner 2)))")
            .unwrap();
        assert_eq!(eval(&interp, "(outer 1)").unwrap(), "(1 . 2)");
    }

    #[test]
    fn arity_is_checked_before_arguments_are_evaluated() {
        let out = Shared::default();
        let interp = Interpreter::new().with_output(out.clone());
        let err = interp.eval_str("(car (help) (help))").unwrap_err();
        assert_eq!(err.to_string(), "CAR expects 1 argument; got 2");
        assert!(out.0.borrow().is_empty());

        interp.eval_str("(defun f (x) x)").unwrap();
        assert_eq!(kind(&interp, "(f (help) 2)"), Some(ErrorKind::Arity));
        assert_eq!(kind(&interp, "(nope (help))"), Some(ErrorKind::FunctionNotFound));
        assert!(out.0.borrow().is_empty());
    }

    #[test]
    fn call_errors() {
        let interp = Interpreter::new();
        assert_eq!(
            interp.eval_str("(nope 1)").unwrap_err().to_string(),
            "function NOPE not found"
        );
        assert_eq!(kind(&interp, "((a) 1)"), Some(ErrorKind::InvalidExpression));
        assert_eq!(kind(&interp, "(5 1)"), Some(ErrorKind::InvalidName));
        assert_eq!(kind(&interp, "(plus . 2)"), Some(ErrorKind::WrongType));
    }

    #[test]
    fn apply_requires_an_atom() {
        let interp = Interpreter::new();
        let args = read("(1 2)").unwrap();
        let err = interp
            .apply(&read("(plus)").unwrap(), &args, &Sexpr::nil())
            .unwrap_err();
        assert!(err.is_kind(ErrorKind::NotAFunction));
        assert_eq!(err.to_string(), "cannot call non-atom (PLUS) as a function");

        let sum = interp.apply(&Sexpr::atom("+").unwrap(), &args, &Sexpr::nil());
        assert_eq!(sum, Ok(Sexpr::int(3)));
    }

    #[test]
    fn help_writes_the_catalogue() {
        let out = Shared::default();
        let interp = Interpreter::new().with_output(out.clone());
        assert_eq!(eval(&interp, "(help)").unwrap(), "T");
        let text = String::from_utf8(out.0.borrow().clone()).unwrap();
        assert_eq!(text, primitives::catalogue());
    }

    #[test]
    fn quit_propagates() {
        let interp = Interpreter::new();
        interp.eval_str("(defun bye () (quit))").unwrap();
        assert_eq!(interp.eval_str("(cons 1 (bye))"), Err(Error::Quit));
    }

    #[test]
    fn depth_limit_is_enforced_and_restored() {
        let interp = Interpreter::new().with_max_depth(50);
        interp.eval_str("(defun loop (n) (loop (plus n 1)))").unwrap();
        assert_eq!(
            interp.eval_str("(loop 0)"),
            Err(Error::RecursionTooDeep { limit: 50 })
        );
        assert_eq!(interp.depth.get(), 0);
        assert_eq!(eval(&interp, "(plus 1 2)").unwrap(), "3");
    }

    #[test]
    fn stack_derived_depth() {
        assert_eq!(depth_for_stack(256 * 1024 * 1024), 16384);
        assert_eq!(depth_for_stack(0), 1);
    }
}
