//! S-expression printer.
//!
//! Proper lists use list notation `(A B C)`, anything else ending in a non-NIL
//! atom uses dotted notation `(A . B)`. The same document renders uncolored for
//! [`Display`](std::fmt::Display) and colored for the REPL.

use pretty::{BoxAllocator, DocAllocator, DocBuilder};
use termcolor::{Color, ColorSpec, WriteColor};

use crate::sexpr::Sexpr;

pub fn pretty_print(expr: &Sexpr, out: impl WriteColor) -> std::io::Result<()> {
    let allocator = BoxAllocator;

    pretty(expr, &allocator).1.render_colored(70, out)?;

    Ok(())
}

pub fn pretty<'a, D>(expr: &Sexpr, allocator: &'a D) -> DocBuilder<'a, D, ColorSpec>
where
    D: DocAllocator<'a, ColorSpec>,
    D::Doc: Clone,
{
    match expr {
        Sexpr::Atom(atom) => {
            let doc = allocator.text(atom.name().to_owned());
            if atom.is_int() {
                doc.annotate(ColorSpec::new().set_fg(Some(Color::Cyan)).clone())
            } else if atom.is_nil() || atom.is_t() {
                doc.annotate(ColorSpec::new().set_fg(Some(Color::Magenta)).clone())
            } else {
                doc
            }
        }

        Sexpr::Pair(p) => {
            let mut docs = Vec::new();
            let mut p = Some(&**p);

            while let Some((car, cdr)) = p {
                docs.push(pretty(car, allocator));
                match cdr {
                    Sexpr::Pair(cdr) => {
                        docs.push(allocator.text(" "));
                        p = Some(&**cdr);
                    }
                    _ if cdr.is_nil() => break,
                    _ => {
                        docs.push(allocator.text(" . "));
                        docs.push(pretty(cdr, allocator));
                        break;
                    }
                }
            }

            balanced(docs, allocator).parens().group().align()
        }
    }
}

/// Concatenates `docs` pairwise so the document tree is only log n deep, however
/// long the list.
fn balanced<'a, D>(
    mut docs: Vec<DocBuilder<'a, D, ColorSpec>>,
    allocator: &'a D,
) -> DocBuilder<'a, D, ColorSpec>
where
    D: DocAllocator<'a, ColorSpec>,
{
    while docs.len() > 1 {
        let mut merged = Vec::with_capacity((docs.len() + 1) / 2);
        let mut iter = docs.into_iter();
        while let Some(left) = iter.next() {
            merged.push(match iter.next() {
                Some(right) => left.append(right),
                None => left,
            });
        }
        docs = merged;
    }
    docs.pop().unwrap_or_else(|| allocator.nil())
}
