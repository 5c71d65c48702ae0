// src/qasm/parse.rs

//! Recursive-descent statement parser with an operator-precedence (Pratt)
//! parser for classical expressions.

use std::rc::Rc;
use std::sync::Arc;

use super::ast::{BinaryOp, Expr, Operand, Param, ParamType, Stmt, StmtKind, Subroutine, UnaryOp};
use super::error::{QasmError, Span};
use super::lex::{tokenize, Token, TokenKind};

/// Binding power of a prefix operator. On the same scale as [binary_power].
const PREFIX_POWER: u8 = 21;

/// Left and right binding powers of an infix operator. Every level is
/// left-associative: the right power is one higher than the left.
fn binary_power(op: BinaryOp) -> (u8, u8) {
    match op {
        BinaryOp::LogicalOr => (1, 2),
        BinaryOp::LogicalAnd => (3, 4),
        BinaryOp::BitOr => (5, 6),
        BinaryOp::BitXor => (7, 8),
        BinaryOp::BitAnd => (9, 10),
        BinaryOp::Eq | BinaryOp::Ne => (11, 12),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => (13, 14),
        BinaryOp::Shl | BinaryOp::Shr => (15, 16),
        BinaryOp::Add | BinaryOp::Sub => (17, 18),
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => (19, 20),
    }
}

fn binary_op(kind: &TokenKind) -> Option<BinaryOp> {
    Some(match kind {
        TokenKind::PipePipe => BinaryOp::LogicalOr,
        TokenKind::AmpAmp => BinaryOp::LogicalAnd,
        TokenKind::Pipe => BinaryOp::BitOr,
        TokenKind::Caret => BinaryOp::BitXor,
        TokenKind::Ampersand => BinaryOp::BitAnd,
        TokenKind::EqEq => BinaryOp::Eq,
        TokenKind::NotEq => BinaryOp::Ne,
        TokenKind::Lt => BinaryOp::Lt,
        TokenKind::Le => BinaryOp::Le,
        TokenKind::Gt => BinaryOp::Gt,
        TokenKind::Ge => BinaryOp::Ge,
        TokenKind::Shl => BinaryOp::Shl,
        TokenKind::Shr => BinaryOp::Shr,
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Asterisk => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Percent => BinaryOp::Mod,
        _ => return None,
    })
}

/// Parses one source file into its top-level statements.
pub fn parse_source(source: &str, file: Arc<str>) -> Result<Vec<Stmt>, QasmError> {
    let tokens = tokenize(source, file.clone())?;
    let mut parser = Parser::new(tokens, file);
    parser.parse_program()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Reported for errors at end of input.
    eof: Span,
    /// Statements produced by desugaring, emitted right after the current one.
    pending: Vec<Stmt>,
}

impl Parser {
    fn new(tokens: Vec<Token>, file: Arc<str>) -> Self {
        let eof = tokens
            .last()
            .map(|t| t.span.clone())
            .unwrap_or_else(|| Span::new(file, 1, 1));
        Self {
            tokens,
            pos: 0,
            eof,
            pending: Vec::new(),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn next_token(&mut self, required: &str) -> Result<Token, QasmError> {
        match self.tokens.get(self.pos) {
            Some(token) => {
                self.pos += 1;
                Ok(token.clone())
            }
            None => Err(QasmError::syntax(
                &self.eof,
                format!("unexpected end-of-file when expecting to see {}", required),
            )),
        }
    }

    fn accept(&mut self, expected: &TokenKind) -> Option<Token> {
        match self.peek() {
            Some(token) if &token.kind == expected => {
                let token = token.clone();
                self.pos += 1;
                Some(token)
            }
            _ => None,
        }
    }

    fn expect(&mut self, expected: TokenKind, required: &str) -> Result<Token, QasmError> {
        let token = self.next_token(required)?;
        if token.kind == expected {
            Ok(token)
        } else {
            Err(QasmError::syntax(
                &token.span,
                format!("needed {}, but instead saw {}", required, token.kind.describe()),
            ))
        }
    }

    fn expect_id(&mut self, required: &str) -> Result<(String, Span), QasmError> {
        let token = self.next_token(required)?;
        match token.kind {
            TokenKind::Id(name) => Ok((name, token.span)),
            other => Err(QasmError::syntax(
                &token.span,
                format!("needed {}, but instead saw {}", required, other.describe()),
            )),
        }
    }

    fn parse_program(&mut self) -> Result<Vec<Stmt>, QasmError> {
        if let Some(version) = self.accept(&TokenKind::OpenQasm) {
            self.parse_version(&version)?;
        }
        let mut statements = Vec::new();
        while self.peek().is_some() {
            statements.push(self.parse_statement()?);
            statements.append(&mut self.pending);
        }
        Ok(statements)
    }

    fn parse_version(&mut self, cause: &Token) -> Result<(), QasmError> {
        let token = self.next_token("a version number")?;
        let text = match &token.kind {
            TokenKind::Real(text) => text.clone(),
            TokenKind::Integer(value) => value.to_string(),
            other => {
                return Err(QasmError::syntax(
                    &token.span,
                    format!("needed a version number, but instead saw {}", other.describe()),
                ));
            }
        };
        let major = text.split('.').next().unwrap_or_default();
        if major != "3" {
            return Err(QasmError::syntax(
                &cause.span,
                format!("only OpenQASM 3 is supported, but this file is version {}", text),
            ));
        }
        self.expect(TokenKind::Semicolon, "';'")?;
        Ok(())
    }

    fn parse_statement(&mut self) -> Result<Stmt, QasmError> {
        let token = self.next_token("a statement")?;
        let span = token.span.clone();
        let kind = match token.kind {
            TokenKind::OpenQasm => {
                return Err(QasmError::syntax(&span, "the version declaration must be the first statement"));
            }
            TokenKind::Include => {
                let file = self.next_token("a filename string")?;
                let path = match file.kind {
                    TokenKind::Str(path) => path,
                    other => {
                        return Err(QasmError::syntax(
                            &file.span,
                            format!("needed a filename string, but instead saw {}", other.describe()),
                        ));
                    }
                };
                self.expect(TokenKind::Semicolon, "';'")?;
                StmtKind::Include { path }
            }
            TokenKind::Qubit => {
                let size = self.parse_designator()?;
                let (name, _) = self.expect_id("a qubit register name")?;
                self.expect(TokenKind::Semicolon, "';'")?;
                StmtKind::QubitDecl { name, size }
            }
            TokenKind::Bit => {
                let size = self.parse_designator()?;
                let (name, name_span) = self.expect_id("a bit register name")?;
                if self.accept(&TokenKind::Assign).is_some() {
                    // `bit[n] b = measure q;` is a declaration followed by a measurement.
                    let (source, measure_span) = self.parse_measure_rhs()?;
                    self.pending.push(Stmt {
                        kind: StmtKind::Measure {
                            source,
                            target: Some(Operand { name: name.clone(), index: None, span: name_span }),
                        },
                        span: measure_span,
                    });
                }
                self.expect(TokenKind::Semicolon, "';'")?;
                StmtKind::BitDecl { name, size }
            }
            TokenKind::Const => {
                self.expect(TokenKind::Int, "'int'")?;
                self.parse_int_decl(true)?
            }
            TokenKind::Int => self.parse_int_decl(false)?,
            TokenKind::Def => StmtKind::Def(Rc::new(self.parse_def(&span)?)),
            TokenKind::For => self.parse_for()?,
            TokenKind::If => {
                self.expect(TokenKind::LParen, "'('")?;
                let condition = self.parse_expression()?;
                self.expect(TokenKind::RParen, "')'")?;
                let then_body = self.parse_body()?;
                let else_body = if self.accept(&TokenKind::Else).is_some() {
                    self.parse_body()?
                } else {
                    Vec::new()
                };
                StmtKind::If { condition, then_body, else_body }
            }
            TokenKind::Measure => {
                let source = self.parse_operand()?;
                let target = if self.accept(&TokenKind::Arrow).is_some() {
                    Some(self.parse_operand()?)
                } else {
                    None
                };
                self.expect(TokenKind::Semicolon, "';'")?;
                StmtKind::Measure { source, target }
            }
            TokenKind::Reset => {
                let target = self.parse_operand()?;
                self.expect(TokenKind::Semicolon, "';'")?;
                StmtKind::Reset { target }
            }
            TokenKind::Barrier => {
                let operands = if self.accept(&TokenKind::Semicolon).is_some() {
                    Vec::new()
                } else {
                    let operands = self.parse_operand_list()?;
                    self.expect(TokenKind::Semicolon, "';'")?;
                    operands
                };
                StmtKind::Barrier { operands }
            }
            TokenKind::Id(name) => self.parse_identifier_statement(name, &span)?,
            other => {
                return Err(QasmError::syntax(
                    &span,
                    format!("needed a statement, but instead saw {}", other.describe()),
                ));
            }
        };
        Ok(Stmt { kind, span })
    }

    fn parse_identifier_statement(&mut self, name: String, span: &Span) -> Result<StmtKind, QasmError> {
        match self.peek_kind() {
            Some(TokenKind::LParen) => {
                self.pos += 1;
                let mut args = Vec::new();
                if self.accept(&TokenKind::RParen).is_none() {
                    loop {
                        args.push(self.parse_expression()?);
                        if self.accept(&TokenKind::Comma).is_none() {
                            break;
                        }
                    }
                    self.expect(TokenKind::RParen, "')'")?;
                }
                self.expect(TokenKind::Semicolon, "';'")?;
                Ok(StmtKind::Call { name, args })
            }
            Some(TokenKind::Assign) | Some(TokenKind::LBracket) => {
                let index = if self.accept(&TokenKind::LBracket).is_some() {
                    let index = self.parse_expression()?;
                    self.expect(TokenKind::RBracket, "']'")?;
                    Some(index)
                } else {
                    None
                };
                self.expect(TokenKind::Assign, "'='")?;
                let (source, _) = self.parse_measure_rhs()?;
                self.expect(TokenKind::Semicolon, "';'")?;
                Ok(StmtKind::Measure {
                    source,
                    target: Some(Operand { name, index, span: span.clone() }),
                })
            }
            _ => {
                let operands = self.parse_operand_list()?;
                self.expect(TokenKind::Semicolon, "';'")?;
                Ok(StmtKind::Gate { name, operands })
            }
        }
    }

    fn parse_measure_rhs(&mut self) -> Result<(Operand, Span), QasmError> {
        let measure = self.expect(TokenKind::Measure, "'measure'")?;
        Ok((self.parse_operand()?, measure.span))
    }

    fn parse_int_decl(&mut self, constant: bool) -> Result<StmtKind, QasmError> {
        // The width only bounds the value in real OpenQASM; values here are unbounded.
        self.parse_designator()?;
        let (name, _) = self.expect_id("an integer name")?;
        self.expect(TokenKind::Assign, "'='")?;
        let value = self.parse_expression()?;
        self.expect(TokenKind::Semicolon, "';'")?;
        Ok(StmtKind::IntDecl { name, value, constant })
    }

    /// An optional `[expr]` after a type keyword.
    fn parse_designator(&mut self) -> Result<Option<Expr>, QasmError> {
        if self.accept(&TokenKind::LBracket).is_some() {
            let size = self.parse_expression()?;
            self.expect(TokenKind::RBracket, "']'")?;
            Ok(Some(size))
        } else {
            Ok(None)
        }
    }

    fn parse_def(&mut self, span: &Span) -> Result<Subroutine, QasmError> {
        let (name, _) = self.expect_id("a subroutine name")?;
        self.expect(TokenKind::LParen, "'('")?;
        let mut params = Vec::new();
        if self.accept(&TokenKind::RParen).is_none() {
            loop {
                let ty_token = self.next_token("a parameter type")?;
                let ty = match ty_token.kind {
                    TokenKind::Qubit => ParamType::Qubit { size: self.parse_designator()? },
                    TokenKind::Int => {
                        self.parse_designator()?;
                        ParamType::Int
                    }
                    other => {
                        return Err(QasmError::syntax(
                            &ty_token.span,
                            format!("needed 'qubit' or 'int', but instead saw {}", other.describe()),
                        ));
                    }
                };
                let (param_name, param_span) = self.expect_id("a parameter name")?;
                params.push(Param { name: param_name, ty, span: param_span });
                if self.accept(&TokenKind::Comma).is_none() {
                    break;
                }
            }
            self.expect(TokenKind::RParen, "')'")?;
        }
        let body = self.parse_block()?;
        Ok(Subroutine { name, params, body, span: span.clone() })
    }

    fn parse_for(&mut self) -> Result<StmtKind, QasmError> {
        if self.accept(&TokenKind::Int).is_some() {
            self.parse_designator()?;
        }
        let (var, _) = self.expect_id("a loop variable")?;
        self.expect(TokenKind::In, "'in'")?;
        self.expect(TokenKind::LBracket, "'['")?;
        let start = self.parse_expression()?;
        self.expect(TokenKind::Colon, "':'")?;
        let second = self.parse_expression()?;
        let (step, end) = if self.accept(&TokenKind::Colon).is_some() {
            (Some(second), self.parse_expression()?)
        } else {
            (None, second)
        };
        self.expect(TokenKind::RBracket, "']'")?;
        let body = self.parse_body()?;
        Ok(StmtKind::For { var, start, step, end, body })
    }

    /// A braced block, or a single statement.
    fn parse_body(&mut self) -> Result<Vec<Stmt>, QasmError> {
        if matches!(self.peek_kind(), Some(TokenKind::LBrace)) {
            self.parse_block()
        } else {
            let stmt = self.parse_statement()?;
            let mut body = vec![stmt];
            body.append(&mut self.pending);
            Ok(body)
        }
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, QasmError> {
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut body = Vec::new();
        loop {
            if self.accept(&TokenKind::RBrace).is_some() {
                return Ok(body);
            }
            if self.peek().is_none() {
                return Err(QasmError::syntax(&self.eof, "unexpected end-of-file when expecting to see '}'"));
            }
            body.push(self.parse_statement()?);
            body.append(&mut self.pending);
        }
    }

    fn parse_operand(&mut self) -> Result<Operand, QasmError> {
        let (name, span) = self.expect_id("a register name")?;
        let index = if self.accept(&TokenKind::LBracket).is_some() {
            let index = self.parse_expression()?;
            self.expect(TokenKind::RBracket, "']'")?;
            Some(index)
        } else {
            None
        };
        Ok(Operand { name, index, span })
    }

    fn parse_operand_list(&mut self) -> Result<Vec<Operand>, QasmError> {
        let mut operands = vec![self.parse_operand()?];
        while self.accept(&TokenKind::Comma).is_some() {
            operands.push(self.parse_operand()?);
        }
        Ok(operands)
    }

    fn parse_prefix(&mut self, op: UnaryOp, span: Span) -> Result<Expr, QasmError> {
        let operand = self.eval_expression(PREFIX_POWER)?;
        Ok(Expr::Unary { op, operand: Box::new(operand), span })
    }

    /// Parse a single expression completely.
    fn parse_expression(&mut self) -> Result<Expr, QasmError> {
        self.eval_expression(0)
    }

    /// Parses operands and infix operators binding at least as tightly as `power_min`.
    fn eval_expression(&mut self, power_min: u8) -> Result<Expr, QasmError> {
        let required = if power_min == 0 { "an expression" } else { "a missing operand" };
        let token = self.next_token(required)?;
        let span = token.span.clone();
        let mut lhs = match token.kind {
            TokenKind::Integer(value) => Expr::Int { value, span },
            TokenKind::Id(name) => {
                if self.accept(&TokenKind::LBracket).is_some() {
                    let index = self.eval_expression(0)?;
                    self.expect(TokenKind::RBracket, "']'")?;
                    Expr::Index { name, index: Box::new(index), span }
                } else {
                    Expr::Ident { name, span }
                }
            }
            TokenKind::LParen => {
                let inner = self.eval_expression(0)?;
                self.expect(TokenKind::RParen, "a closing parenthesis")?;
                inner
            }
            TokenKind::Minus => self.parse_prefix(UnaryOp::Neg, span)?,
            TokenKind::Plus => self.parse_prefix(UnaryOp::Plus, span)?,
            TokenKind::Tilde => self.parse_prefix(UnaryOp::BitNot, span)?,
            TokenKind::Bang => self.parse_prefix(UnaryOp::LogicalNot, span)?,
            other => {
                return Err(QasmError::syntax(
                    &span,
                    format!("needed {}, but instead saw {}", required, other.describe()),
                ));
            }
        };

        while let Some(op) = self.peek_kind().and_then(binary_op) {
            let (power_l, power_r) = binary_power(op);
            if power_l < power_min {
                break;
            }
            let op_token = self.next_token("an operator")?;
            let rhs = self.eval_expression(power_r)?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span: op_token.span,
            };
        }
        Ok(lhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Result<Vec<Stmt>, QasmError> {
        parse_source(source, Arc::from("test.qasm"))
    }

    fn int_value(expr: &Expr) -> String {
        match expr {
            Expr::Int { value, .. } => value.to_string(),
            other => panic!("expected an integer literal, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence_and_associativity() -> Result<(), QasmError> {
        let program = parse("OPENQASM 3.0; const int n = 1 + 2 * 3 - 4;")?;
        let StmtKind::IntDecl { value, constant, .. } = &program[0].kind else {
            panic!("expected an int declaration, got {:?}", program[0].kind);
        };
        assert!(constant);
        // ((1 + (2 * 3)) - 4)
        let Expr::Binary { op: BinaryOp::Sub, lhs, rhs, .. } = value else {
            panic!("expected subtraction at the root, got {:?}", value);
        };
        assert_eq!(int_value(rhs), "4");
        let Expr::Binary { op: BinaryOp::Add, rhs: product, .. } = lhs.as_ref() else {
            panic!("expected addition on the left, got {:?}", lhs);
        };
        assert!(matches!(product.as_ref(), Expr::Binary { op: BinaryOp::Mul, .. }));
        Ok(())
    }

    #[test]
    fn test_shift_binds_looser_than_addition() -> Result<(), QasmError> {
        let program = parse("int x = 1 << 2 + 1 & 3;")?;
        let StmtKind::IntDecl { value, .. } = &program[0].kind else {
            panic!("expected an int declaration");
        };
        // (1 << (2 + 1)) & 3
        let Expr::Binary { op: BinaryOp::BitAnd, lhs, .. } = value else {
            panic!("expected '&' at the root, got {:?}", value);
        };
        assert!(matches!(lhs.as_ref(), Expr::Binary { op: BinaryOp::Shl, .. }));
        Ok(())
    }

    #[test]
    fn test_measure_forms() -> Result<(), QasmError> {
        let program = parse("qubit[2] q; bit[2] c = measure q; c[0] = measure q[1]; measure q -> c;")?;
        let kinds: Vec<&StmtKind> = program.iter().map(|s| &s.kind).collect();
        assert_eq!(kinds.len(), 5);
        assert!(matches!(kinds[1], StmtKind::BitDecl { .. }));
        assert!(matches!(kinds[2], StmtKind::Measure { target: Some(Operand { index: None, .. }), .. }));
        assert!(matches!(kinds[3], StmtKind::Measure { target: Some(Operand { index: Some(_), .. }), .. }));
        assert!(matches!(kinds[4], StmtKind::Measure { target: Some(_), .. }));
        Ok(())
    }

    #[test]
    fn test_def_for_and_if() -> Result<(), QasmError> {
        let program = parse(
            "def f(qubit[3] q, qubit a, int k) {\n\
               for int i in [0:2:k] { if (i == 0) x q[i]; else { h q[i]; } }\n\
             }\n\
             f(q, a, 4);",
        )?;
        let StmtKind::Def(sub) = &program[0].kind else {
            panic!("expected a subroutine definition");
        };
        assert_eq!(sub.name, "f");
        assert_eq!(sub.params.len(), 3);
        assert!(matches!(sub.params[1].ty, ParamType::Qubit { size: None }));
        assert!(matches!(sub.params[2].ty, ParamType::Int));
        let StmtKind::For { step: Some(_), body, .. } = &sub.body[0].kind else {
            panic!("expected a stepped for loop");
        };
        let StmtKind::If { then_body, else_body, .. } = &body[0].kind else {
            panic!("expected an if statement");
        };
        assert_eq!((then_body.len(), else_body.len()), (1, 1));
        assert!(matches!(&program[1].kind, StmtKind::Call { args, .. } if args.len() == 3));
        Ok(())
    }

    #[test]
    fn test_rejects_other_versions_and_misplaced_header() {
        let err = parse("OPENQASM 2.0;").unwrap_err();
        assert!(err.to_string().contains("only OpenQASM 3"), "{}", err);

        let err = parse("qubit q;\nOPENQASM 3;").unwrap_err();
        assert!(err.to_string().starts_with("test.qasm:2,1"), "{}", err);
    }

    #[test]
    fn test_reports_missing_semicolon_at_end_of_file() {
        let err = parse("qubit q").unwrap_err();
        assert!(matches!(err, QasmError::Syntax { .. }));
        assert!(err.to_string().contains("end-of-file"), "{}", err);
    }
}
