//! Recursive-descent parser.
//!
//! Precedence, loosest first: assignment and arrows, `?:`, `??`, `||`, `&&`,
//! equality, relational, additive, multiplicative, unary, postfix, then
//! member access and calls.

use std::rc::Rc;

use super::ast::{BinaryOp, Body, Expr, FunctionDef, LogicalOp, Stmt, UnaryOp};
use super::lexer::{Lexer, Token};
use crate::error::CompileError;

const RESERVED: &[&str] = &[
    "if", "else", "return", "throw", "let", "const", "var", "function", "typeof", "true", "false",
    "null", "undefined",
];

/// Deepest nesting of expressions and statements the parser accepts.
const MAX_NESTING: usize = 64;

pub struct Parser<'a> {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    label: &'a str,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(src: &'a str, label: &'a str) -> Result<Self, CompileError> {
        Ok(Self {
            tokens: Lexer::new(src, label).tokenize()?,
            pos: 0,
            label,
            depth: 0,
        })
    }

    /// Parse a single expression filling the whole input.
    pub fn parse_expression_source(mut self) -> Result<Expr, CompileError> {
        if self.at_eof() {
            return Ok(Expr::Undefined);
        }
        let expr = self.expression()?;
        self.eat_punct(";");
        self.expect_eof()?;
        Ok(expr)
    }

    /// Parse a statement list filling the whole input.
    pub fn parse_statements_source(mut self) -> Result<Vec<Stmt>, CompileError> {
        let mut body = Vec::new();
        while !self.at_eof() {
            body.push(self.statement()?);
        }
        Ok(body)
    }

    // ------------------------------------------------------------------
    // Token helpers
    // ------------------------------------------------------------------

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].0
    }

    fn peek_at(&self, n: usize) -> &Token {
        &self.tokens[(self.pos + n).min(self.tokens.len() - 1)].0
    }

    fn offset(&self) -> usize {
        self.tokens[self.pos.min(self.tokens.len() - 1)].1
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek(), Token::Eof)
    }

    fn is_punct(&self, p: &str) -> bool {
        matches!(self.peek(), Token::Punct(q) if *q == p)
    }

    fn is_keyword(&self, k: &str) -> bool {
        matches!(self.peek(), Token::Ident(name) if name == k)
    }

    fn eat_punct(&mut self, p: &str) -> bool {
        if self.is_punct(p) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, k: &str) -> bool {
        if self.is_keyword(k) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&self, message: impl Into<String>) -> CompileError {
        CompileError::new(self.label, message, self.offset())
    }

    fn unexpected(&self) -> CompileError {
        let found = match self.peek() {
            Token::Number(n) => format!("number {n}"),
            Token::Str(s) => format!("string {s:?}"),
            Token::Ident(name) => format!("'{name}'"),
            Token::Punct(p) => format!("'{p}'"),
            Token::Eof => "end of input".to_string(),
        };
        self.error(format!("unexpected {found}"))
    }

    fn expect_punct(&mut self, p: &str) -> Result<(), CompileError> {
        if self.eat_punct(p) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{p}'")))
        }
    }

    fn expect_eof(&self) -> Result<(), CompileError> {
        if self.at_eof() {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    /// Run `parse` one nesting level deeper.
    fn nested<T>(
        &mut self,
        parse: fn(&mut Self) -> Result<T, CompileError>,
    ) -> Result<T, CompileError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error("nesting too deep"));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn binding_name(&mut self) -> Result<String, CompileError> {
        match self.peek().clone() {
            Token::Ident(name) if !RESERVED.contains(&name.as_str()) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.error("expected a name")),
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn statement(&mut self) -> Result<Stmt, CompileError> {
        self.nested(Self::statement_inner)
    }

    fn statement_inner(&mut self) -> Result<Stmt, CompileError> {
        if self.eat_punct(";") {
            return Ok(Stmt::Empty);
        }
        if self.is_punct("{") {
            return Ok(Stmt::Block(self.block()?));
        }
        if self.eat_keyword("let") || self.eat_keyword("const") || self.eat_keyword("var") {
            let name = self.binding_name()?;
            let init = if self.eat_punct("=") {
                Some(self.expression()?)
            } else {
                None
            };
            self.end_statement()?;
            return Ok(Stmt::Let(name, init));
        }
        if self.eat_keyword("if") {
            self.expect_punct("(")?;
            let test = self.expression()?;
            self.expect_punct(")")?;
            let then = Box::new(self.statement()?);
            let otherwise = if self.eat_keyword("else") {
                Some(Box::new(self.statement()?))
            } else {
                None
            };
            return Ok(Stmt::If {
                test,
                then,
                otherwise,
            });
        }
        if self.eat_keyword("return") {
            let value = if self.is_punct(";") || self.is_punct("}") || self.at_eof() {
                None
            } else {
                Some(self.expression()?)
            };
            self.end_statement()?;
            return Ok(Stmt::Return(value));
        }
        if self.eat_keyword("throw") {
            let value = self.expression()?;
            self.end_statement()?;
            return Ok(Stmt::Throw(value));
        }

        let expr = self.expression()?;
        self.end_statement()?;
        Ok(Stmt::Expr(expr))
    }

    /// A statement ends at `;`, before `}`, at end of input, or wherever the
    /// next token cannot continue the current one.
    fn end_statement(&mut self) -> Result<(), CompileError> {
        self.eat_punct(";");
        Ok(())
    }

    fn block(&mut self) -> Result<Vec<Stmt>, CompileError> {
        self.expect_punct("{")?;
        let mut body = Vec::new();
        while !self.is_punct("}") {
            if self.at_eof() {
                return Err(self.error("expected '}'"));
            }
            body.push(self.statement()?);
        }
        self.advance();
        Ok(body)
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    pub fn expression(&mut self) -> Result<Expr, CompileError> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr, CompileError> {
        self.nested(Self::assignment_inner)
    }

    fn assignment_inner(&mut self) -> Result<Expr, CompileError> {
        if let Some(arrow) = self.try_arrow()? {
            return Ok(arrow);
        }

        let target = self.conditional()?;

        let op = match self.peek() {
            Token::Punct("=") => None,
            Token::Punct("+=") => Some(BinaryOp::Add),
            Token::Punct("-=") => Some(BinaryOp::Sub),
            Token::Punct("*=") => Some(BinaryOp::Mul),
            Token::Punct("/=") => Some(BinaryOp::Div),
            Token::Punct("%=") => Some(BinaryOp::Rem),
            _ => return Ok(target),
        };
        if !target.is_assignable() {
            return Err(self.error("invalid assignment target"));
        }
        self.advance();
        let value = self.assignment()?;
        Ok(Expr::Assign {
            op,
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    /// `x => ...` or `(a, b) => ...`, detected by looking past the
    /// parameter list for `=>`.
    fn try_arrow(&mut self) -> Result<Option<Expr>, CompileError> {
        let params = match (self.peek(), self.peek_at(1)) {
            (Token::Ident(name), Token::Punct("=>")) if !RESERVED.contains(&name.as_str()) => {
                let name = name.clone();
                self.advance();
                vec![name]
            }
            (Token::Punct("("), _) if self.arrow_follows_parens() => self.param_list()?,
            _ => return Ok(None),
        };
        self.expect_punct("=>")?;
        let body = self.function_body()?;
        Ok(Some(Expr::Function(Rc::new(FunctionDef {
            name: None,
            params,
            body,
        }))))
    }

    fn arrow_follows_parens(&self) -> bool {
        let mut depth = 0usize;
        let mut i = self.pos;
        while let Some((token, _)) = self.tokens.get(i) {
            match token {
                Token::Punct("(") => depth += 1,
                Token::Punct(")") => {
                    depth -= 1;
                    if depth == 0 {
                        return matches!(self.tokens.get(i + 1), Some((Token::Punct("=>"), _)));
                    }
                }
                Token::Eof => return false,
                _ => {}
            }
            i += 1;
        }
        false
    }

    fn param_list(&mut self) -> Result<Vec<String>, CompileError> {
        self.expect_punct("(")?;
        let mut params = Vec::new();
        while !self.eat_punct(")") {
            params.push(self.binding_name()?);
            if !self.is_punct(")") {
                self.expect_punct(",")?;
            }
        }
        Ok(params)
    }

    fn function_body(&mut self) -> Result<Body, CompileError> {
        if self.is_punct("{") {
            Ok(Body::Block(self.block()?))
        } else {
            Ok(Body::Expr(self.assignment()?))
        }
    }

    fn conditional(&mut self) -> Result<Expr, CompileError> {
        let test = self.nullish()?;
        if !self.eat_punct("?") {
            return Ok(test);
        }
        let consequent = self.assignment()?;
        self.expect_punct(":")?;
        let alternate = self.assignment()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn nullish(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.or()?;
        while self.eat_punct("??") {
            let right = self.or()?;
            left = logical(LogicalOp::Nullish, left, right);
        }
        Ok(left)
    }

    fn or(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.and()?;
        while self.eat_punct("||") {
            let right = self.and()?;
            left = logical(LogicalOp::Or, left, right);
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.equality()?;
        while self.eat_punct("&&") {
            let right = self.equality()?;
            left = logical(LogicalOp::And, left, right);
        }
        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.relational()?;
        loop {
            let op = match self.peek() {
                Token::Punct("==") => BinaryOp::Eq,
                Token::Punct("!=") => BinaryOp::NotEq,
                Token::Punct("===") => BinaryOp::StrictEq,
                Token::Punct("!==") => BinaryOp::StrictNotEq,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.relational()?;
            left = binary(op, left, right);
        }
    }

    fn relational(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.additive()?;
        loop {
            let op = match self.peek() {
                Token::Punct("<") => BinaryOp::Lt,
                Token::Punct("<=") => BinaryOp::Le,
                Token::Punct(">") => BinaryOp::Gt,
                Token::Punct(">=") => BinaryOp::Ge,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.additive()?;
            left = binary(op, left, right);
        }
    }

    fn additive(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Punct("+") => BinaryOp::Add,
                Token::Punct("-") => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.multiplicative()?;
            left = binary(op, left, right);
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Token::Punct("*") => BinaryOp::Mul,
                Token::Punct("/") => BinaryOp::Div,
                Token::Punct("%") => BinaryOp::Rem,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.unary()?;
            left = binary(op, left, right);
        }
    }

    fn unary(&mut self) -> Result<Expr, CompileError> {
        let op = match self.peek() {
            Token::Punct("!") => UnaryOp::Not,
            Token::Punct("-") => UnaryOp::Neg,
            Token::Punct("+") => UnaryOp::Plus,
            Token::Ident(k) if k == "typeof" => UnaryOp::TypeOf,
            Token::Punct(p @ ("++" | "--")) => {
                let increment = *p == "++";
                self.advance();
                let target = self.nested(Self::unary)?;
                if !target.is_assignable() {
                    return Err(self.error("invalid update target"));
                }
                return Ok(Expr::Update {
                    increment,
                    prefix: true,
                    target: Box::new(target),
                });
            }
            _ => return self.postfix(),
        };
        self.advance();
        let operand = self.nested(Self::unary)?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn postfix(&mut self) -> Result<Expr, CompileError> {
        let expr = self.call_member()?;
        let increment = match self.peek() {
            Token::Punct("++") => true,
            Token::Punct("--") => false,
            _ => return Ok(expr),
        };
        if !expr.is_assignable() {
            return Err(self.error("invalid update target"));
        }
        self.advance();
        Ok(Expr::Update {
            increment,
            prefix: false,
            target: Box::new(expr),
        })
    }

    fn call_member(&mut self) -> Result<Expr, CompileError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat_punct(".") {
                let property = self.property_name()?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                    optional: false,
                };
            } else if self.eat_punct("?.") {
                expr = if self.is_punct("(") {
                    Expr::Call {
                        callee: Box::new(expr),
                        args: self.arguments()?,
                        optional: true,
                    }
                } else if self.eat_punct("[") {
                    let index = self.expression()?;
                    self.expect_punct("]")?;
                    Expr::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                        optional: true,
                    }
                } else {
                    Expr::Member {
                        object: Box::new(expr),
                        property: self.property_name()?,
                        optional: true,
                    }
                };
            } else if self.eat_punct("[") {
                let index = self.expression()?;
                self.expect_punct("]")?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                    optional: false,
                };
            } else if self.is_punct("(") {
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args: self.arguments()?,
                    optional: false,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn property_name(&mut self) -> Result<String, CompileError> {
        match self.advance() {
            Token::Ident(name) => Ok(name),
            _ => Err(self.error("expected a property name")),
        }
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, CompileError> {
        self.expect_punct("(")?;
        let mut args = Vec::new();
        while !self.eat_punct(")") {
            args.push(self.assignment()?);
            if !self.is_punct(")") {
                self.expect_punct(",")?;
            }
        }
        Ok(args)
    }

    fn primary(&mut self) -> Result<Expr, CompileError> {
        match self.peek().clone() {
            Token::Number(n) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            Token::Str(s) => {
                self.advance();
                Ok(Expr::Str(s.into()))
            }
            Token::Punct("(") => {
                self.advance();
                let expr = self.expression()?;
                self.expect_punct(")")?;
                Ok(expr)
            }
            Token::Punct("[") => self.array_literal(),
            Token::Punct("{") => self.object_literal(),
            Token::Ident(name) => {
                let expr = match name.as_str() {
                    "true" => Expr::Bool(true),
                    "false" => Expr::Bool(false),
                    "null" => Expr::Null,
                    "undefined" => Expr::Undefined,
                    "function" => {
                        self.advance();
                        return self.function_expression();
                    }
                    reserved if RESERVED.contains(&reserved) => return Err(self.unexpected()),
                    _ => Expr::Ident(name),
                };
                self.advance();
                Ok(expr)
            }
            _ => Err(self.unexpected()),
        }
    }

    fn function_expression(&mut self) -> Result<Expr, CompileError> {
        let name = match self.peek() {
            Token::Ident(_) => Some(self.binding_name()?),
            _ => None,
        };
        let params = self.param_list()?;
        let body = Body::Block(self.block()?);
        Ok(Expr::Function(Rc::new(FunctionDef { name, params, body })))
    }

    fn array_literal(&mut self) -> Result<Expr, CompileError> {
        self.expect_punct("[")?;
        let mut items = Vec::new();
        while !self.eat_punct("]") {
            items.push(self.assignment()?);
            if !self.is_punct("]") {
                self.expect_punct(",")?;
            }
        }
        Ok(Expr::Array(items))
    }

    fn object_literal(&mut self) -> Result<Expr, CompileError> {
        self.expect_punct("{")?;
        let mut entries = Vec::new();
        while !self.eat_punct("}") {
            let key = match self.advance() {
                Token::Ident(name) => name,
                Token::Str(s) => s,
                Token::Number(n) => crate::value::number_to_string(n),
                _ => return Err(self.error("expected a property key")),
            };

            let value = if self.eat_punct(":") {
                self.assignment()?
            } else if self.is_punct("(") {
                // Method shorthand: `name(a, b) { ... }`.
                let params = self.param_list()?;
                let body = Body::Block(self.block()?);
                Expr::Function(Rc::new(FunctionDef {
                    name: Some(key.clone()),
                    params,
                    body,
                }))
            } else if RESERVED.contains(&key.as_str()) {
                return Err(self.error("expected ':'"));
            } else {
                Expr::Ident(key.clone())
            };
            entries.push((key, value));

            if !self.is_punct("}") {
                self.expect_punct(",")?;
            }
        }
        Ok(Expr::Object(entries))
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn logical(op: LogicalOp, left: Expr, right: Expr) -> Expr {
    Expr::Logical {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(src: &str) -> Expr {
        Parser::new(src, "test")
            .and_then(Parser::parse_expression_source)
            .unwrap()
    }

    fn compile_error(src: &str) -> CompileError {
        Parser::new(src, "test")
            .and_then(Parser::parse_expression_source)
            .unwrap_err()
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        match expr("1 + 2 * 3") {
            Expr::Binary {
                op: BinaryOp::Add,
                right,
                ..
            } => assert!(matches!(*right, Expr::Binary { op: BinaryOp::Mul, .. })),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn object_literal_forms() {
        let Expr::Object(entries) = expr("{ count: 0, 'a b': 1, name, inc(n) { return n } }") else {
            panic!("expected object");
        };
        let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["count", "a b", "name", "inc"]);
        assert!(matches!(entries[2].1, Expr::Ident(ref n) if n == "name"));
        assert!(matches!(entries[3].1, Expr::Function(_)));
    }

    #[test]
    fn arrows_with_and_without_parens() {
        assert!(matches!(expr("x => x + 1"), Expr::Function(_)));
        assert!(matches!(expr("(a, b) => { return a }"), Expr::Function(_)));
        assert!(matches!(expr("(a + b)"), Expr::Binary { .. }));
    }

    #[test]
    fn conditional_is_right_associative() {
        let Expr::Conditional { alternate, .. } = expr("a ? 1 : b ? 2 : 3") else {
            panic!("expected conditional");
        };
        assert!(matches!(*alternate, Expr::Conditional { .. }));
    }

    #[test]
    fn statements_parse_with_and_without_semicolons() {
        let body = Parser::new("let x = 1; if (x) { x++ } else x--\nreturn x", "t")
            .and_then(Parser::parse_statements_source)
            .unwrap();
        assert_eq!(body.len(), 3);
        assert!(matches!(body[2], Stmt::Return(Some(_))));
    }

    #[test]
    fn syntax_errors_are_reported() {
        assert_eq!(compile_error("1 +").message, "unexpected end of input");
        assert_eq!(compile_error("(1").message, "expected ')'");
        assert_eq!(compile_error("1 = 2").message, "invalid assignment target");
        assert_eq!(compile_error("a b").message, "unexpected 'b'");
    }

    #[test]
    fn nesting_is_bounded() {
        let deep = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        assert_eq!(compile_error(&deep).message, "nesting too deep");
        assert_eq!(compile_error(&format!("{}x", "!".repeat(10_000))).message, "nesting too deep");
        assert_eq!(compile_error(&format!("{}1", "[".repeat(5_000))).message, "nesting too deep");

        let blocks = Parser::new(&"{".repeat(5_000), "t")
            .and_then(Parser::parse_statements_source)
            .unwrap_err();
        assert_eq!(blocks.message, "nesting too deep");

        // The counter unwinds, so wide input at a modest depth is fine.
        let nested = format!("{}1{}", "(".repeat(20), ")".repeat(20));
        let wide = vec![nested; 50].join(" + ");
        assert!(matches!(expr(&wide), Expr::Binary { .. }));
    }

    #[test]
    fn empty_expression_is_undefined() {
        assert!(matches!(expr("   "), Expr::Undefined));
    }
}
