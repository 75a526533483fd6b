//! Tokenizer for attribute code.

use crate::error::CompileError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Str(String),
    /// Identifiers and keywords; the parser tells them apart.
    Ident(String),
    Punct(&'static str),
    Eof,
}

/// Longest punctuators first so `===` wins over `==` and `=`.
const PUNCTUATORS: &[&str] = &[
    "===", "!==", "==", "!=", "<=", ">=", "=>", "&&", "||", "??", "?.", "++", "--", "+=", "-=",
    "*=", "/=", "%=", "(", ")", "{", "}", "[", "]", ",", ".", ";", ":", "?", "+", "-", "*", "/",
    "%", "!", "=", "<", ">",
];

pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    label: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str, label: &'a str) -> Self {
        Self { src, pos: 0, label }
    }

    /// Tokenize the whole input. Each token carries its byte offset.
    pub fn tokenize(mut self) -> Result<Vec<(Token, usize)>, CompileError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia()?;
            let start = self.pos;
            let Some(c) = self.peek() else {
                tokens.push((Token::Eof, start));
                return Ok(tokens);
            };

            let token = if c.is_ascii_digit()
                || (c == '.' && self.peek_at(1).is_some_and(|n| n.is_ascii_digit()))
            {
                self.number()?
            } else if c == '"' || c == '\'' {
                self.string(c)?
            } else if is_ident_start(c) {
                self.ident()
            } else {
                self.punct()?
            };
            tokens.push((token, start));
        }
    }

    fn error(&self, message: impl Into<String>, offset: usize) -> CompileError {
        CompileError::new(self.label, message, offset)
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_trivia(&mut self) -> Result<(), CompileError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    let start = self.pos;
                    self.pos += 2;
                    match self.rest().find("*/") {
                        Some(end) => self.pos += end + 2,
                        None => return Err(self.error("unterminated comment", start)),
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn number(&mut self) -> Result<Token, CompileError> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        if self.peek() == Some('.') {
            self.bump();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let save = self.pos;
            self.bump();
            if matches!(self.peek(), Some('+' | '-')) {
                self.bump();
            }
            if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.bump();
                }
            } else {
                self.pos = save;
            }
        }
        if self.peek().is_some_and(is_ident_start) {
            return Err(self.error("identifier directly after number", self.pos));
        }
        self.src[start..self.pos]
            .parse()
            .map(Token::Number)
            .map_err(|_| self.error("invalid number", start))
    }

    fn string(&mut self, quote: char) -> Result<Token, CompileError> {
        let start = self.pos;
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => return Err(self.error("unterminated string", start)),
                Some(c) if c == quote => return Ok(Token::Str(out)),
                Some('\\') => {
                    let escaped = self
                        .bump()
                        .ok_or_else(|| self.error("unterminated string", start))?;
                    out.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '0' => '\0',
                        other => other,
                    });
                }
                Some(c) => out.push(c),
            }
        }
    }

    fn ident(&mut self) -> Token {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_continue) {
            self.bump();
        }
        Token::Ident(self.src[start..self.pos].to_string())
    }

    fn punct(&mut self) -> Result<Token, CompileError> {
        let rest = self.rest();
        for &p in PUNCTUATORS {
            if rest.starts_with(p) {
                // `a ?.5 : b` is a conditional, not optional chaining.
                if p == "?." && rest[2..].starts_with(|c: char| c.is_ascii_digit()) {
                    continue;
                }
                self.pos += p.len();
                return Ok(Token::Punct(p));
            }
        }
        let c = self.peek().unwrap_or_default();
        Err(self.error(format!("unexpected character '{c}'"), self.pos))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Token> {
        Lexer::new(src, "test")
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|(t, _)| t)
            .collect()
    }

    #[test]
    fn longest_punctuator_wins() {
        assert_eq!(
            kinds("a === b"),
            vec![
                Token::Ident("a".into()),
                Token::Punct("==="),
                Token::Ident("b".into()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn numbers_and_strings() {
        assert_eq!(
            kinds("1.5e2 'it\\'s' \"x\""),
            vec![
                Token::Number(150.0),
                Token::Str("it's".into()),
                Token::Str("x".into()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(kinds("// c\n1 /* x */"), vec![Token::Number(1.0), Token::Eof]);
    }

    #[test]
    fn conditional_with_fraction_is_not_optional_chain() {
        assert_eq!(kinds("a?.5:1")[1], Token::Punct("?"));
        assert_eq!(kinds("a?.b")[1], Token::Punct("?."));
    }

    #[test]
    fn errors_carry_offsets() {
        let err = Lexer::new("1 + #", "h-text").tokenize().unwrap_err();
        assert_eq!(err.offset, 4);
        assert_eq!(err.label, "h-text");

        let err = Lexer::new("'open", "h-text").tokenize().unwrap_err();
        assert_eq!(err.message, "unterminated string");
    }
}
