//! Recursive-descent parser from a token stream to `Raw`/`Program`.
//!
//! The lexer runs to completion up front (§4.5 of SPEC_FULL.md), so the
//! parser backtracks cheaply by saving and restoring a token index rather
//! than re-scanning characters — this is what lets binder-group detection
//! (`(x : A) -> B` vs. a plain parenthesized expression) commit without a
//! hand-written lookahead table.
//!
//! Top-level declarations are `;`-terminated. The distilled theory's own
//! grammar (vtaught by the `smalltt` lineage this spec distills) relies on
//! layout-sensitive parsing to know where one declaration ends and the next
//! begins; this implementation makes that boundary explicit with `;`
//! instead, trading a little surface syntax for a parser with no
//! backtracking at the top level (recorded as an implementation decision in
//! DESIGN.md, since the distilled spec is silent on concrete surface
//! grammar beyond the declaration forms in §6).

use super::{Decl, Icit, Lexer, LexError, Named, Program, Raw, RawArg, Span, Tag, Token};
use crate::symbol::Symbol;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    Lex(LexError),
    UnexpectedToken { found: Token, span: Span, expected: &'static str },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Lex(e) => write!(f, "{}", e),
            ParseError::UnexpectedToken { found, span, expected } => {
                write!(f, "{}: expected {}, found '{}'", span, expected, found)
            }
        }
    }
}

impl std::error::Error for ParseError {}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError::Lex(e)
    }
}

pub struct Parser {
    tokens: Vec<(Token, Span)>,
    pos: usize,
}

type PResult<T> = Result<T, ParseError>;

impl Parser {
    pub fn new(src: &str) -> PResult<Self> {
        let tokens = Lexer::new(src).tokenize()?;
        Ok(Parser { tokens, pos: 0 })
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos].0
    }

    fn peek_span(&self) -> Span {
        self.tokens[self.pos].1
    }

    fn bump(&mut self) -> Token {
        let tok = self.tokens[self.pos].0.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn checkpoint(&self) -> usize {
        self.pos
    }

    fn restore(&mut self, cp: usize) {
        self.pos = cp;
    }

    fn expect(&mut self, tok: &Token, expected: &'static str) -> PResult<Span> {
        let span = self.peek_span();
        if self.peek() == tok {
            self.bump();
            Ok(span)
        } else {
            Err(ParseError::UnexpectedToken { found: self.peek().clone(), span, expected })
        }
    }

    fn ident(&mut self) -> PResult<Symbol> {
        let span = self.peek_span();
        match self.peek().clone() {
            Token::Ident(s) => {
                self.bump();
                Ok(Symbol::intern(&s))
            }
            found => Err(ParseError::UnexpectedToken { found, span, expected: "an identifier" }),
        }
    }

    fn ident_or_underscore(&mut self) -> PResult<Symbol> {
        if *self.peek() == Token::Underscore {
            self.bump();
            Ok(Symbol::intern("_"))
        } else {
            self.ident()
        }
    }

    fn at_atom_start(&self) -> bool {
        matches!(
            self.peek(),
            Token::Ident(_) | Token::KwU | Token::Underscore | Token::LParen
        )
    }

    // ---- top level ----

    pub fn parse_program(&mut self) -> PResult<Program> {
        let mut decls = Vec::new();
        while *self.peek() != Token::Eof {
            decls.push(self.parse_decl()?);
        }
        Ok(Program { decls })
    }

    fn parse_decl(&mut self) -> PResult<Decl> {
        let span = self.peek_span();
        if *self.peek() == Token::KwAssume {
            self.bump();
            let name = self.ident()?;
            self.expect(&Token::Colon, "':' in assume declaration")?;
            let ty = Rc::new(self.parse_expr()?);
            self.expect(&Token::Semicolon, "';' terminating declaration")?;
            return Ok(Decl::Assume { span, name, ty });
        }

        let name = self.ident()?;
        let mut tags = Vec::new();
        while let Token::Tag(t) = self.peek().clone() {
            self.bump();
            tags.push(match t.as_str() {
                "elaborate" => Tag::Elaborate,
                "normalize" => Tag::Normalize,
                _ => {
                    return Err(ParseError::UnexpectedToken {
                        found: Token::Tag(t),
                        span,
                        expected: "'elaborate' or 'normalize'",
                    })
                }
            });
        }
        let ty = if *self.peek() == Token::Colon {
            self.bump();
            Some(Rc::new(self.parse_expr()?))
        } else {
            None
        };
        self.expect(&Token::Equals, "'=' in definition")?;
        let body = Rc::new(self.parse_expr()?);
        self.expect(&Token::Semicolon, "';' terminating declaration")?;
        Ok(Decl::Define { span, name, ty, body, tags })
    }

    // ---- expressions ----

    pub fn parse_expr(&mut self) -> PResult<Raw> {
        match self.peek() {
            Token::KwLet => self.parse_let(),
            Token::Lambda => self.parse_lambda(),
            _ => self.parse_pi(),
        }
    }

    fn parse_let(&mut self) -> PResult<Raw> {
        let span = self.peek_span();
        self.bump(); // let
        let name = self.ident_or_underscore()?;
        let ty = if *self.peek() == Token::Colon {
            self.bump();
            Some(Rc::new(self.parse_pi()?))
        } else {
            None
        };
        self.expect(&Token::Equals, "'=' in let binding")?;
        let value = Rc::new(self.parse_expr()?);
        self.expect(&Token::Semicolon, "';' separating let binding from body")?;
        let body = Rc::new(self.parse_expr()?);
        Ok(Raw::Let(span, name, ty, value, body))
    }

    fn parse_lambda(&mut self) -> PResult<Raw> {
        let span = self.peek_span();
        self.bump(); // \ or λ
        let mut binders = Vec::new();
        loop {
            match self.peek() {
                Token::LBrace => {
                    self.bump();
                    let name = self.ident_or_underscore()?;
                    let ty = if *self.peek() == Token::Colon {
                        self.bump();
                        Some(Rc::new(self.parse_expr()?))
                    } else {
                        None
                    };
                    self.expect(&Token::RBrace, "'}' closing implicit lambda binder")?;
                    binders.push((name, ty, Icit::Impl));
                }
                Token::LParen => {
                    self.bump();
                    let name = self.ident_or_underscore()?;
                    self.expect(&Token::Colon, "':' in annotated lambda binder")?;
                    let ty = Rc::new(self.parse_expr()?);
                    self.expect(&Token::RParen, "')' closing lambda binder")?;
                    binders.push((name, Some(ty), Icit::Expl));
                }
                Token::Ident(_) | Token::Underscore => {
                    let name = self.ident_or_underscore()?;
                    binders.push((name, None, Icit::Expl));
                }
                _ => break,
            }
        }
        self.expect(&Token::Dot, "'.' after lambda binders")?;
        let body = self.parse_expr()?;
        let folded = binders.into_iter().rev().fold(body, |acc, (name, ty, icit)| {
            Raw::Lam(span, name, ty, icit, Rc::new(acc))
        });
        Ok(folded)
    }

    /// One or more `(` name+ `:` ty `)` / `{` name+ `:` ty `}` binder groups
    /// immediately followed by `->`, or nothing if the leading tokens don't
    /// have that shape.
    fn try_parse_binder_groups(&mut self) -> PResult<Vec<(Symbol, Rc<Raw>, Icit)>> {
        let mut groups = Vec::new();
        loop {
            match self.peek() {
                Token::LParen => {
                    let cp = self.checkpoint();
                    self.bump();
                    let mut names = Vec::new();
                    while let Token::Ident(_) | Token::Underscore = self.peek() {
                        names.push(self.ident_or_underscore()?);
                    }
                    if names.is_empty() || *self.peek() != Token::Colon {
                        self.restore(cp);
                        break;
                    }
                    self.bump(); // :
                    let ty = Rc::new(self.parse_expr()?);
                    self.expect(&Token::RParen, "')' closing binder group")?;
                    for name in names {
                        groups.push((name, ty.clone(), Icit::Expl));
                    }
                }
                Token::LBrace => {
                    let cp = self.checkpoint();
                    self.bump();
                    let mut names = Vec::new();
                    while let Token::Ident(_) | Token::Underscore = self.peek() {
                        names.push(self.ident_or_underscore()?);
                    }
                    if names.is_empty() || *self.peek() != Token::Colon {
                        self.restore(cp);
                        break;
                    }
                    self.bump(); // :
                    let ty = Rc::new(self.parse_expr()?);
                    self.expect(&Token::RBrace, "'}' closing implicit binder group")?;
                    for name in names {
                        groups.push((name, ty.clone(), Icit::Impl));
                    }
                }
                _ => break,
            }
        }
        Ok(groups)
    }

    fn parse_pi(&mut self) -> PResult<Raw> {
        let span = self.peek_span();
        let cp = self.checkpoint();
        let groups = self.try_parse_binder_groups()?;
        if !groups.is_empty() && *self.peek() == Token::Arrow {
            self.bump();
            let codomain = self.parse_expr()?;
            let folded = groups.into_iter().rev().fold(codomain, |acc, (name, ty, icit)| {
                Raw::Pi(span, name, ty, icit, Rc::new(acc))
            });
            return Ok(folded);
        }
        // Not a binder-group Pi after all: rewind and parse a plain
        // application, optionally followed by a non-dependent arrow.
        self.restore(cp);
        let dom = self.parse_app()?;
        if *self.peek() == Token::Arrow {
            self.bump();
            let codomain = self.parse_expr()?;
            Ok(Raw::Pi(span, Symbol::intern("_"), Rc::new(dom), Icit::Expl, Rc::new(codomain)))
        } else {
            Ok(dom)
        }
    }

    fn parse_atom(&mut self) -> PResult<Raw> {
        let span = self.peek_span();
        match self.peek().clone() {
            Token::Ident(s) => {
                self.bump();
                Ok(Raw::Var(span, Symbol::intern(&s)))
            }
            Token::KwU => {
                self.bump();
                Ok(Raw::Universe(span))
            }
            Token::Underscore => {
                self.bump();
                Ok(Raw::Hole(span))
            }
            Token::LParen => {
                self.bump();
                let e = self.parse_expr()?;
                self.expect(&Token::RParen, "')' closing parenthesized expression")?;
                Ok(e)
            }
            found => Err(ParseError::UnexpectedToken { found, span, expected: "an expression" }),
        }
    }

    fn parse_app(&mut self) -> PResult<Raw> {
        let head_span = self.peek_span();
        let mut head = self.parse_atom()?;
        loop {
            if self.at_atom_start() {
                let arg = self.parse_atom()?;
                head = Raw::App(head_span, Rc::new(head), RawArg::Expl(Rc::new(arg)));
            } else if *self.peek() == Token::LBrace {
                let cp = self.checkpoint();
                self.bump();
                if let Token::Ident(name) = self.peek().clone() {
                    self.bump();
                    if *self.peek() == Token::Equals {
                        self.bump();
                        let val = Rc::new(self.parse_expr()?);
                        self.expect(&Token::RBrace, "'}' closing named implicit argument")?;
                        head = Raw::App(
                            head_span,
                            Rc::new(head),
                            RawArg::Named(Named { name: Symbol::intern(&name), arg: val }),
                        );
                        continue;
                    }
                    self.restore(cp);
                }
                self.bump(); // {
                let val = Rc::new(self.parse_expr()?);
                self.expect(&Token::RBrace, "'}' closing implicit argument")?;
                head = Raw::App(head_span, Rc::new(head), RawArg::Impl(val));
            } else if *self.peek() == Token::Bang {
                self.bump();
                head = Raw::Suppress(head_span, Rc::new(head));
            } else {
                break;
            }
        }
        Ok(head)
    }
}
