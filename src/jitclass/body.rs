//! Method body expressions.
//!
//! Bodies are written against the declaration's type parameters. The binder
//! produces a copy with every type position made concrete, which the vm then
//! lowers and runs.

use std::fmt::{Display, Formatter};

use ecow::EcoString;

use crate::error::JitResult;
use crate::type_expr::TypeExpr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    /// `item in container`; the container is the right operand
    In,
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::FloorDiv => "//",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::In => "in",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(EcoString),
    Local(EcoString),
    /// Introduces a new local in the enclosing method
    Let(EcoString, Box<Expr>),
    Assign(EcoString, Box<Expr>),
    Field(Box<Expr>, EcoString),
    SetField(Box<Expr>, EcoString, Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Method { receiver: Box<Expr>, name: EcoString, args: Vec<Expr> },
    /// Invokes `__call__` on a record
    Call { callee: Box<Expr>, args: Vec<Expr> },
    New { class: TypeExpr, args: Vec<Expr> },
    NewList(TypeExpr),
    NewDict(TypeExpr, TypeExpr),
    Tuple(Vec<Expr>),
    Index(Box<Expr>, Box<Expr>),
    SetIndex(Box<Expr>, Box<Expr>, Box<Expr>),
    Len(Box<Expr>),
    /// Compile-time test of two types for equality, folded during lowering
    TypeIs(TypeExpr, TypeExpr),
    If(Box<Expr>, Box<Expr>, Box<Expr>),
    While(Box<Expr>, Box<Expr>),
    /// Evaluates to its last expression, or Unit when empty
    Block(Vec<Expr>),
    Raise(EcoString),
}

impl Expr {
    /// A deep copy with `f` applied to every type position
    pub fn try_map_types<F>(&self, f: &mut F) -> JitResult<Expr>
    where
        F: FnMut(&TypeExpr) -> JitResult<TypeExpr>,
    {
        let boxed = |e: &Expr, f: &mut F| -> JitResult<Box<Expr>> { Ok(Box::new(e.try_map_types(f)?)) };
        let all = |es: &[Expr], f: &mut F| -> JitResult<Vec<Expr>> {
            es.iter().map(|e| e.try_map_types(f)).collect()
        };
        let mapped = match self {
            Expr::Unit
            | Expr::Bool(_)
            | Expr::Int(_)
            | Expr::Float(_)
            | Expr::Str(_)
            | Expr::Local(_)
            | Expr::Raise(_) => self.clone(),
            Expr::Let(name, e) => Expr::Let(name.clone(), boxed(e, f)?),
            Expr::Assign(name, e) => Expr::Assign(name.clone(), boxed(e, f)?),
            Expr::Field(e, name) => Expr::Field(boxed(e, f)?, name.clone()),
            Expr::SetField(target, name, value) => {
                Expr::SetField(boxed(target, f)?, name.clone(), boxed(value, f)?)
            }
            Expr::Unary(op, e) => Expr::Unary(*op, boxed(e, f)?),
            Expr::Binary(op, lhs, rhs) => Expr::Binary(*op, boxed(lhs, f)?, boxed(rhs, f)?),
            Expr::Method { receiver, name, args } => Expr::Method {
                receiver: boxed(receiver, f)?,
                name: name.clone(),
                args: all(args, f)?,
            },
            Expr::Call { callee, args } => Expr::Call { callee: boxed(callee, f)?, args: all(args, f)? },
            Expr::New { class, args } => Expr::New { class: f(class)?, args: all(args, f)? },
            Expr::NewList(element) => Expr::NewList(f(element)?),
            Expr::NewDict(key, value) => Expr::NewDict(f(key)?, f(value)?),
            Expr::Tuple(elements) => Expr::Tuple(all(elements, f)?),
            Expr::Index(target, index) => Expr::Index(boxed(target, f)?, boxed(index, f)?),
            Expr::SetIndex(target, index, value) => {
                Expr::SetIndex(boxed(target, f)?, boxed(index, f)?, boxed(value, f)?)
            }
            Expr::Len(e) => Expr::Len(boxed(e, f)?),
            Expr::TypeIs(a, b) => Expr::TypeIs(f(a)?, f(b)?),
            Expr::If(cond, cons, alt) => Expr::If(boxed(cond, f)?, boxed(cons, f)?, boxed(alt, f)?),
            Expr::While(cond, body) => Expr::While(boxed(cond, f)?, boxed(body, f)?),
            Expr::Block(es) => Expr::Block(all(es, f)?),
        };
        Ok(mapped)
    }
}

// Builders, so that bodies read close to the source they stand in for

pub fn self_() -> Expr {
    Expr::Local("self".into())
}

pub fn local(name: &str) -> Expr {
    Expr::Local(name.into())
}

pub fn int(value: i64) -> Expr {
    Expr::Int(value)
}

pub fn float(value: f64) -> Expr {
    Expr::Float(value)
}

pub fn string(value: &str) -> Expr {
    Expr::Str(value.into())
}

pub fn let_(name: &str, value: Expr) -> Expr {
    Expr::Let(name.into(), Box::new(value))
}

pub fn assign(name: &str, value: Expr) -> Expr {
    Expr::Assign(name.into(), Box::new(value))
}

pub fn field(target: Expr, name: &str) -> Expr {
    Expr::Field(Box::new(target), name.into())
}

pub fn set_field(target: Expr, name: &str, value: Expr) -> Expr {
    Expr::SetField(Box::new(target), name.into(), Box::new(value))
}

pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary(op, Box::new(lhs), Box::new(rhs))
}

pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
    Expr::Unary(op, Box::new(operand))
}

pub fn method(receiver: Expr, name: &str, args: Vec<Expr>) -> Expr {
    Expr::Method { receiver: Box::new(receiver), name: name.into(), args }
}

pub fn call(callee: Expr, args: Vec<Expr>) -> Expr {
    Expr::Call { callee: Box::new(callee), args }
}

pub fn new(class: impl Into<TypeExpr>, args: Vec<Expr>) -> Expr {
    Expr::New { class: class.into(), args }
}

pub fn new_list(element: impl Into<TypeExpr>) -> Expr {
    Expr::NewList(element.into())
}

pub fn new_dict(key: impl Into<TypeExpr>, value: impl Into<TypeExpr>) -> Expr {
    Expr::NewDict(key.into(), value.into())
}

pub fn index(target: Expr, index: Expr) -> Expr {
    Expr::Index(Box::new(target), Box::new(index))
}

pub fn set_index(target: Expr, index: Expr, value: Expr) -> Expr {
    Expr::SetIndex(Box::new(target), Box::new(index), Box::new(value))
}

pub fn len(target: Expr) -> Expr {
    Expr::Len(Box::new(target))
}

pub fn type_is(a: impl Into<TypeExpr>, b: impl Into<TypeExpr>) -> Expr {
    Expr::TypeIs(a.into(), b.into())
}

pub fn if_(cond: Expr, cons: Expr, alt: Expr) -> Expr {
    Expr::If(Box::new(cond), Box::new(cons), Box::new(alt))
}

pub fn while_(cond: Expr, body: Expr) -> Expr {
    Expr::While(Box::new(cond), Box::new(body))
}

pub fn block(exprs: Vec<Expr>) -> Expr {
    Expr::Block(exprs)
}

pub fn raise(message: &str) -> Expr {
    Expr::Raise(message.into())
}
