//! Hand-rolled lexer for `.stt` source text.
//!
//! One token at a time over a `Vec<char>` buffer, tracking `(line, col)` as
//! it goes so that every token — and every error raised while scanning one —
//! carries a source position.

use super::Span;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LParen,
    RParen,
    LBrace,
    RBrace,
    Colon,
    Equals,
    Semicolon,
    Bang,
    Dot,
    Underscore,
    Arrow,  // -> or →
    Lambda, // \ or λ
    KwLet,
    KwIn,
    KwU,
    KwAssume,
    Tag(String), // [elaborate] / [normalize], captured without the brackets
    Ident(String),
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::Colon => write!(f, ":"),
            Token::Equals => write!(f, "="),
            Token::Semicolon => write!(f, ";"),
            Token::Bang => write!(f, "!"),
            Token::Dot => write!(f, "."),
            Token::Underscore => write!(f, "_"),
            Token::Arrow => write!(f, "->"),
            Token::Lambda => write!(f, "\\"),
            Token::KwLet => write!(f, "let"),
            Token::KwIn => write!(f, "in"),
            Token::KwU => write!(f, "U"),
            Token::KwAssume => write!(f, "assume"),
            Token::Tag(t) => write!(f, "[{}]", t),
            Token::Ident(s) => write!(f, "{}", s),
            Token::Eof => write!(f, "<eof>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    UnexpectedChar(char, Span),
    UnterminatedTag(Span),
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::UnexpectedChar(c, span) => {
                write!(f, "{}: unexpected character '{}'", span, c)
            }
            LexError::UnterminatedTag(span) => write!(f, "{}: unterminated '[' tag", span),
        }
    }
}

impl std::error::Error for LexError {}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '\''
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '\'' || c == '-'
}

pub struct Lexer {
    input: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer { input: input.chars().collect(), pos: 0, line: 1, col: 1 }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn peek2(&self) -> Option<char> {
        self.input.get(self.pos + 1).copied()
    }

    fn span(&self) -> Span {
        Span { line: self.line, col: self.col, byte_offset: self.pos }
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('-') if self.peek2() == Some('-') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    pub fn next_token(&mut self) -> Result<(Token, Span), LexError> {
        self.skip_trivia();
        let span = self.span();
        let c = match self.peek() {
            None => return Ok((Token::Eof, span)),
            Some(c) => c,
        };

        match c {
            '(' => {
                self.advance();
                Ok((Token::LParen, span))
            }
            ')' => {
                self.advance();
                Ok((Token::RParen, span))
            }
            '{' => {
                self.advance();
                Ok((Token::LBrace, span))
            }
            '}' => {
                self.advance();
                Ok((Token::RBrace, span))
            }
            ':' => {
                self.advance();
                Ok((Token::Colon, span))
            }
            '=' => {
                self.advance();
                Ok((Token::Equals, span))
            }
            ';' => {
                self.advance();
                Ok((Token::Semicolon, span))
            }
            '.' => {
                self.advance();
                Ok((Token::Dot, span))
            }
            '!' => {
                self.advance();
                Ok((Token::Bang, span))
            }
            '\\' => {
                self.advance();
                Ok((Token::Lambda, span))
            }
            'λ' => {
                self.advance();
                Ok((Token::Lambda, span))
            }
            '→' => {
                self.advance();
                Ok((Token::Arrow, span))
            }
            '-' if self.peek2() == Some('>') => {
                self.advance();
                self.advance();
                Ok((Token::Arrow, span))
            }
            '_' if !self.peek2().map(is_ident_continue).unwrap_or(false) => {
                self.advance();
                Ok((Token::Underscore, span))
            }
            '[' => {
                self.advance();
                let mut name = String::new();
                loop {
                    match self.peek() {
                        Some(']') => {
                            self.advance();
                            break;
                        }
                        Some(c) => {
                            name.push(c);
                            self.advance();
                        }
                        None => return Err(LexError::UnterminatedTag(span)),
                    }
                }
                Ok((Token::Tag(name), span))
            }
            c if is_ident_start(c) || is_ident_continue(c) => {
                let mut s = String::new();
                while let Some(c) = self.peek() {
                    if is_ident_continue(c) {
                        s.push(c);
                        self.advance();
                    } else {
                        break;
                    }
                }
                Ok((keyword_or_ident(s), span))
            }
            other => Err(LexError::UnexpectedChar(other, span)),
        }
    }

    /// Tokenize the entire input, stopping at the first error.
    pub fn tokenize(mut self) -> Result<Vec<(Token, Span)>, LexError> {
        let mut out = Vec::new();
        loop {
            let (tok, span) = self.next_token()?;
            let done = tok == Token::Eof;
            out.push((tok, span));
            if done {
                break;
            }
        }
        Ok(out)
    }
}

fn keyword_or_ident(s: String) -> Token {
    match s.as_str() {
        "let" => Token::KwLet,
        "in" => Token::KwIn,
        "U" => Token::KwU,
        "assume" => Token::KwAssume,
        _ => Token::Ident(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(src: &str) -> Vec<Token> {
        Lexer::new(src).tokenize().unwrap().into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn lexes_application() {
        assert_eq!(
            toks("f x y"),
            vec![
                Token::Ident("f".into()),
                Token::Ident("x".into()),
                Token::Ident("y".into()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn ascii_and_unicode_arrows_agree() {
        assert_eq!(toks("->"), toks("→"));
    }

    #[test]
    fn ascii_and_unicode_lambda_agree() {
        assert_eq!(toks("\\"), toks("λ"));
    }

    #[test]
    fn hole_is_distinct_from_identifier_starting_with_underscore() {
        assert_eq!(toks("_"), vec![Token::Underscore, Token::Eof]);
        assert_eq!(toks("_foo"), vec![Token::Ident("_foo".into()), Token::Eof]);
    }

    #[test]
    fn line_comments_are_skipped() {
        assert_eq!(toks("x -- comment\ny"), toks("x\ny"));
    }

    #[test]
    fn tag_is_captured() {
        assert_eq!(toks("[elaborate]"), vec![Token::Tag("elaborate".into()), Token::Eof]);
    }

    #[test]
    fn keywords_are_recognized() {
        assert_eq!(
            toks("let in U assume"),
            vec![Token::KwLet, Token::KwIn, Token::KwU, Token::KwAssume, Token::Eof]
        );
    }

    #[test]
    fn unterminated_tag_is_an_error() {
        assert!(matches!(
            Lexer::new("[elaborate").tokenize(),
            Err(LexError::UnterminatedTag(_))
        ));
    }

    #[test]
    fn positions_track_lines_and_columns() {
        let toks = Lexer::new("x\ny").tokenize().unwrap();
        assert_eq!(toks[0].1, Span { line: 1, col: 1, byte_offset: 0 });
        assert_eq!(toks[1].1, Span { line: 2, col: 1, byte_offset: 2 });
    }
}
