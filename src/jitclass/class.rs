use std::rc::Rc;

use ecow::EcoString;

use crate::body::{BinaryOp, Expr};
use crate::idents::Ident;
use crate::type_expr::{TypeExpr, TypeParam};
use crate::{SV4, nz_u32_id};

nz_u32_id!(ClassId);

/// Per-method settings. Unset fields defer to the class, then the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MethodOptions {
    pub compile: Option<bool>,
}

impl MethodOptions {
    pub fn with_compile(compile: bool) -> MethodOptions {
        MethodOptions { compile: Some(compile) }
    }

    pub fn compile(&self) -> Option<bool> {
        self.compile
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassOptions {
    pub compile_methods: Option<bool>,
}

/// Special methods that are also reachable through operator dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperatorKind {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    TrueDiv,
    FloorDiv,
    Mod,
    Neg,
    Len,
    Call,
    GetItem,
    SetItem,
    Contains,
}

impl OperatorKind {
    pub const ALL: [OperatorKind; 18] = [
        OperatorKind::Eq,
        OperatorKind::Ne,
        OperatorKind::Lt,
        OperatorKind::Le,
        OperatorKind::Gt,
        OperatorKind::Ge,
        OperatorKind::Add,
        OperatorKind::Sub,
        OperatorKind::Mul,
        OperatorKind::TrueDiv,
        OperatorKind::FloorDiv,
        OperatorKind::Mod,
        OperatorKind::Neg,
        OperatorKind::Len,
        OperatorKind::Call,
        OperatorKind::GetItem,
        OperatorKind::SetItem,
        OperatorKind::Contains,
    ];

    pub fn method_name(&self) -> &'static str {
        match self {
            OperatorKind::Eq => "__eq__",
            OperatorKind::Ne => "__ne__",
            OperatorKind::Lt => "__lt__",
            OperatorKind::Le => "__le__",
            OperatorKind::Gt => "__gt__",
            OperatorKind::Ge => "__ge__",
            OperatorKind::Add => "__add__",
            OperatorKind::Sub => "__sub__",
            OperatorKind::Mul => "__mul__",
            OperatorKind::TrueDiv => "__truediv__",
            OperatorKind::FloorDiv => "__floordiv__",
            OperatorKind::Mod => "__mod__",
            OperatorKind::Neg => "__neg__",
            OperatorKind::Len => "__len__",
            OperatorKind::Call => "__call__",
            OperatorKind::GetItem => "__getitem__",
            OperatorKind::SetItem => "__setitem__",
            OperatorKind::Contains => "__contains__",
        }
    }

    pub fn from_method_name(name: &str) -> Option<OperatorKind> {
        OperatorKind::ALL.into_iter().find(|op| op.method_name() == name)
    }

    /// The operator a binary expression dispatches to when its operand is a record.
    /// For `In` the receiver is the right operand.
    pub fn from_binary(op: BinaryOp) -> Option<OperatorKind> {
        match op {
            BinaryOp::Add => Some(OperatorKind::Add),
            BinaryOp::Sub => Some(OperatorKind::Sub),
            BinaryOp::Mul => Some(OperatorKind::Mul),
            BinaryOp::Div => Some(OperatorKind::TrueDiv),
            BinaryOp::FloorDiv => Some(OperatorKind::FloorDiv),
            BinaryOp::Mod => Some(OperatorKind::Mod),
            BinaryOp::Eq => Some(OperatorKind::Eq),
            BinaryOp::Ne => Some(OperatorKind::Ne),
            BinaryOp::Lt => Some(OperatorKind::Lt),
            BinaryOp::Le => Some(OperatorKind::Le),
            BinaryOp::Gt => Some(OperatorKind::Gt),
            BinaryOp::Ge => Some(OperatorKind::Ge),
            BinaryOp::In => Some(OperatorKind::Contains),
            BinaryOp::And | BinaryOp::Or => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub name: Ident,
    /// Parameter names, not counting `self`
    pub params: SV4<EcoString>,
    pub body: Expr,
    pub options: MethodOptions,
}

#[derive(Debug, Clone)]
pub struct MemberDecl {
    pub name: Ident,
    pub ty: TypeExpr,
}

/// A registered class. Shared read-only by all of its specializations.
#[derive(Debug)]
pub struct ClassDeclaration {
    pub id: ClassId,
    pub name: Ident,
    pub params: SV4<TypeParam>,
    pub members: Vec<MemberDecl>,
    pub methods: Vec<Rc<MethodDecl>>,
    /// `__init__`, if the class defines one
    pub constructor: Option<Rc<MethodDecl>>,
    pub options: ClassOptions,
}

impl ClassDeclaration {
    pub fn is_generic(&self) -> bool {
        !self.params.is_empty()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct MethodSource {
    pub name: EcoString,
    pub params: SV4<EcoString>,
    pub body: Expr,
    pub options: MethodOptions,
}

/// Collects a class definition before it is registered with an engine.
///
/// ```ignore
/// let mut b = ClassBuilder::generic("Box", &["T"]);
/// let t = b.param("T");
/// b.member("value", t);
/// engine.register(b)?;
/// ```
#[derive(Debug, Clone)]
pub struct ClassBuilder {
    pub(crate) name: EcoString,
    pub(crate) params: SV4<TypeParam>,
    pub(crate) members: Vec<(EcoString, TypeExpr)>,
    pub(crate) methods: Vec<MethodSource>,
    pub(crate) constructor: Option<MethodSource>,
    pub(crate) options: ClassOptions,
}

impl ClassBuilder {
    pub fn new(name: &str) -> ClassBuilder {
        ClassBuilder::generic(name, &[])
    }

    pub fn generic(name: &str, params: &[&str]) -> ClassBuilder {
        ClassBuilder {
            name: name.into(),
            params: params.iter().map(|p| TypeParam::fresh(*p)).collect(),
            members: Vec::new(),
            methods: Vec::new(),
            constructor: None,
            options: ClassOptions::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// This declaration's parameter called `name`. An unknown name is kept as
    /// text and reported when it is resolved.
    pub fn param(&self, name: &str) -> TypeExpr {
        match self.params.iter().find(|p| p.name.as_str() == name) {
            Some(p) => TypeExpr::Param(p.clone()),
            None => TypeExpr::Unparsed(name.into()),
        }
    }

    pub fn params(&self) -> &[TypeParam] {
        &self.params
    }

    pub fn member(&mut self, name: &str, ty: impl Into<TypeExpr>) -> &mut Self {
        self.members.push((name.into(), ty.into()));
        self
    }

    pub fn method(&mut self, name: &str, params: &[&str], body: Expr) -> &mut Self {
        self.method_with(name, params, body, MethodOptions::default())
    }

    pub fn method_with(
        &mut self,
        name: &str,
        params: &[&str],
        body: Expr,
        options: MethodOptions,
    ) -> &mut Self {
        let source = MethodSource {
            name: name.into(),
            params: params.iter().map(|p| EcoString::from(*p)).collect(),
            body,
            options,
        };
        if name == "__init__" {
            self.constructor = Some(source);
        } else {
            self.methods.push(source);
        }
        self
    }

    pub fn constructor(&mut self, params: &[&str], body: Expr) -> &mut Self {
        self.method("__init__", params, body)
    }

    pub fn options(&mut self, options: ClassOptions) -> &mut Self {
        self.options = options;
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::body;

    #[test]
    fn operator_names_round_trip() {
        for op in OperatorKind::ALL {
            assert_eq!(OperatorKind::from_method_name(op.method_name()), Some(op));
        }
        assert_eq!(OperatorKind::from_method_name("get"), None);
        assert_eq!(OperatorKind::from_binary(BinaryOp::Div), Some(OperatorKind::TrueDiv));
        assert_eq!(OperatorKind::from_binary(BinaryOp::And), None);
    }

    #[test]
    fn builder_params_are_fresh() {
        let a = ClassBuilder::generic("A", &["T"]);
        let b = ClassBuilder::generic("B", &["T"]);
        assert_ne!(a.param("T"), b.param("T"));
        assert_eq!(a.param("T"), a.param("T"));
        assert_eq!(a.param("U"), TypeExpr::Unparsed("U".into()));
    }

    #[test]
    fn init_becomes_constructor() {
        let mut b = ClassBuilder::new("C");
        b.constructor(&["x"], body::block(vec![]));
        b.method("get", &[], body::self_());
        assert!(b.constructor.is_some());
        assert_eq!(b.methods.len(), 1);
    }
}
