// src/qasm/ast.rs

//! Syntax tree for the supported OpenQASM 3 subset.

use std::rc::Rc;

use num_bigint::BigInt;

use super::error::Span;

/// Prefix operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Neg,
    BitNot,
    LogicalNot,
}

/// Infix operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    LogicalOr,
    LogicalAnd,
    BitOr,
    BitXor,
    BitAnd,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Shl,
    Shr,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    pub fn text(&self) -> &'static str {
        match self {
            BinaryOp::LogicalOr => "||",
            BinaryOp::LogicalAnd => "&&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::BitAnd => "&",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
        }
    }
}

/// Classical integer expressions, plus indexed names used as call arguments.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Int {
        value: BigInt,
        span: Span,
    },
    Ident {
        name: String,
        span: Span,
    },
    Index {
        name: String,
        index: Box<Expr>,
        span: Span,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        span: Span,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> &Span {
        match self {
            Expr::Int { span, .. }
            | Expr::Ident { span, .. }
            | Expr::Index { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Binary { span, .. } => span,
        }
    }
}

/// A register name, optionally indexed: `q` or `q[i + 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Operand {
    pub name: String,
    pub index: Option<Expr>,
    pub span: Span,
}

/// Declared type of a subroutine parameter.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamType {
    /// `qubit` (size `None`) or `qubit[N]`
    Qubit { size: Option<Expr> },
    /// `int` or `int[W]`; the width is accepted and ignored
    Int,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: ParamType,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Subroutine {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    Include {
        path: String,
    },
    QubitDecl {
        name: String,
        size: Option<Expr>,
    },
    BitDecl {
        name: String,
        size: Option<Expr>,
    },
    IntDecl {
        name: String,
        value: Expr,
        constant: bool,
    },
    Def(Rc<Subroutine>),
    Call {
        name: String,
        args: Vec<Expr>,
    },
    Gate {
        name: String,
        operands: Vec<Operand>,
    },
    Measure {
        source: Operand,
        target: Option<Operand>,
    },
    Reset {
        target: Operand,
    },
    Barrier {
        operands: Vec<Operand>,
    },
    For {
        var: String,
        start: Expr,
        step: Option<Expr>,
        end: Expr,
        body: Vec<Stmt>,
    },
    If {
        condition: Expr,
        then_body: Vec<Stmt>,
        else_body: Vec<Stmt>,
    },
}
