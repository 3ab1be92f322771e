//! Unparsing core terms back to surface-like text, for `[elaborate]` /
//! `[normalize]` reporting and for error messages.
//!
//! This only ever needs to produce readable diagnostic output, not syntax
//! that round-trips through the parser byte-for-byte, so it doesn't bother
//! with precedence-minimal parenthesization beyond what keeps output
//! unambiguous.

use crate::core::{Ix, Tm};
use crate::symbol::Symbol;
use crate::syntax::Icit;

struct Printer {
    names: Vec<Symbol>,
    out: String,
}

impl Printer {
    fn fresh(&mut self, hint: &Symbol) -> Symbol {
        if hint.as_str() == "_" {
            return hint.clone();
        }
        if !self.names.iter().any(|n| n == hint) {
            return hint.clone();
        }
        let mut i = 1;
        loop {
            let candidate = Symbol::intern(&format!("{}{}", hint.as_str(), i));
            if !self.names.iter().any(|n| n == &candidate) {
                return candidate;
            }
            i += 1;
        }
    }

    fn var_name(&self, ix: Ix) -> Symbol {
        self.names[self.names.len() - 1 - ix.0].clone()
    }

    fn go(&mut self, tm: &Tm, prec: u8) {
        match tm {
            Tm::Var(ix) => self.out.push_str(self.var_name(*ix).as_str()),
            Tm::TopLevel(name) => self.out.push_str(name.as_str()),
            Tm::Universe => self.out.push('U'),
            Tm::Meta(m) => self.out.push_str(&m.to_string()),
            Tm::InsertedMeta(m, _) => self.out.push_str(&m.to_string()),
            Tm::Lam(name, icit, body) => {
                let paren = prec > 0;
                if paren {
                    self.out.push('(');
                }
                self.out.push('\\');
                let fresh = self.fresh(name);
                match icit {
                    Icit::Expl => self.out.push_str(fresh.as_str()),
                    Icit::Impl => {
                        self.out.push('{');
                        self.out.push_str(fresh.as_str());
                        self.out.push('}');
                    }
                }
                self.names.push(fresh);
                self.out.push_str(". ");
                self.go(body, 0);
                self.names.pop();
                if paren {
                    self.out.push(')');
                }
            }
            Tm::App(f, a, icit) => {
                let paren = prec > 2;
                if paren {
                    self.out.push('(');
                }
                self.go(f, 2);
                self.out.push(' ');
                match icit {
                    Icit::Expl => self.go(a, 3),
                    Icit::Impl => {
                        self.out.push('{');
                        self.go(a, 0);
                        self.out.push('}');
                    }
                }
                if paren {
                    self.out.push(')');
                }
            }
            Tm::Pi(name, dom, icit, cod) => {
                let paren = prec > 1;
                if paren {
                    self.out.push('(');
                }
                let fresh = self.fresh(name);
                let dependent = fresh.as_str() != "_";
                if dependent {
                    match icit {
                        Icit::Expl => self.out.push('('),
                        Icit::Impl => self.out.push('{'),
                    }
                    self.out.push_str(fresh.as_str());
                    self.out.push_str(" : ");
                    self.go(dom, 0);
                    match icit {
                        Icit::Expl => self.out.push(')'),
                        Icit::Impl => self.out.push('}'),
                    }
                } else {
                    self.go(dom, 2);
                }
                self.out.push_str(" -> ");
                self.names.push(fresh);
                self.go(cod, 1);
                self.names.pop();
                if paren {
                    self.out.push(')');
                }
            }
            Tm::Let(name, ty, value, body) => {
                let paren = prec > 0;
                if paren {
                    self.out.push('(');
                }
                self.out.push_str("let ");
                let fresh = self.fresh(name);
                self.out.push_str(fresh.as_str());
                self.out.push_str(" : ");
                self.go(ty, 0);
                self.out.push_str(" = ");
                self.go(value, 0);
                self.out.push_str("; ");
                self.names.push(fresh);
                self.go(body, 0);
                self.names.pop();
                if paren {
                    self.out.push(')');
                }
            }
        }
    }
}

/// Render a closed core term as readable surface-like text.
pub fn print_tm(tm: &Tm) -> String {
    let mut p = Printer { names: Vec::new(), out: String::new() };
    p.go(tm, 0);
    p.out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn prints_identity_lambda() {
        let tm = Tm::Lam(Symbol::intern("x"), Icit::Expl, Rc::new(Tm::Var(Ix(0))));
        assert_eq!(print_tm(&tm), "\\x. x");
    }

    #[test]
    fn prints_non_dependent_pi_without_binder() {
        let tm = Tm::Pi(Symbol::intern("_"), Rc::new(Tm::Universe), Icit::Expl, Rc::new(Tm::Universe));
        assert_eq!(print_tm(&tm), "U -> U");
    }

    #[test]
    fn prints_application_inside_binders() {
        // \f x. f x
        let tm = Tm::Lam(
            Symbol::intern("f"),
            Icit::Expl,
            Rc::new(Tm::Lam(
                Symbol::intern("x"),
                Icit::Expl,
                Rc::new(Tm::App(Rc::new(Tm::Var(Ix(1))), Rc::new(Tm::Var(Ix(0))), Icit::Expl)),
            )),
        );
        assert_eq!(print_tm(&tm), "\\f. \\x. f x");
    }
}
