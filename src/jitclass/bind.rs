use std::cell::RefCell;
use std::rc::Rc;

use ecow::EcoString;
use log::debug;

use crate::body::Expr;
use crate::class::{ClassDeclaration, ClassId, MethodDecl};
use crate::engine::JitEngine;
use crate::error::{ErrorKind, JitResult};
use crate::idents::Ident;
use crate::resolve::ParameterBinding;
use crate::type_expr::TypeExpr;
use crate::types::TypeId;
use crate::vm::Lowered;
use crate::{SV4, errf, failf};

#[cfg(test)]
mod bind_test;

/// A method body specialized for one parameter binding. Every type position
/// in `body` is closed: no parameters and no own-class references remain.
#[derive(Debug)]
pub struct BoundMethod {
    pub name: Ident,
    pub owner: ClassId,
    pub record_type: TypeId,
    pub params: SV4<EcoString>,
    pub body: Expr,
    pub compile: bool,
    pub is_constructor: bool,
    lowered: RefCell<Option<Rc<Lowered>>>,
}

impl BoundMethod {
    pub fn is_lowered(&self) -> bool {
        self.lowered.borrow().is_some()
    }

    pub(crate) fn cached_lowering(&self) -> Option<Rc<Lowered>> {
        self.lowered.borrow().clone()
    }

    pub(crate) fn cache_lowering(&self, lowered: Rc<Lowered>) {
        *self.lowered.borrow_mut() = Some(lowered);
    }
}

impl JitEngine {
    pub(crate) fn bind_method(
        &self,
        decl: &ClassDeclaration,
        method: &MethodDecl,
        binding: &ParameterBinding,
        record_type: TypeId,
        compile: bool,
        is_constructor: bool,
    ) -> JitResult<BoundMethod> {
        let body = method
            .body
            .try_map_types(&mut |ty: &TypeExpr| self.bind_type(decl, binding, ty))
            .map_err(|mut e| {
                e.message = format!(
                    "in {}.{}: {}",
                    self.idents.get_name(decl.name),
                    self.idents.get_name(method.name),
                    e.message
                );
                e
            })?;
        debug!(
            "Bound {}.{} for [{}] compile={compile}",
            self.idents.get_name(decl.name),
            self.idents.get_name(method.name),
            self.types.type_list_to_string(&binding.args(), &self.idents)
        );
        Ok(BoundMethod {
            name: method.name,
            owner: decl.id,
            record_type,
            params: method.params.clone(),
            body,
            compile,
            is_constructor,
            lowered: RefCell::new(None),
        })
    }

    /// Substitutes the binding into one type position of a method body
    fn bind_type(
        &self,
        decl: &ClassDeclaration,
        binding: &ParameterBinding,
        ty: &TypeExpr,
    ) -> JitResult<TypeExpr> {
        let bind_all = |args: &[TypeExpr]| -> JitResult<Vec<TypeExpr>> {
            args.iter().map(|a| self.bind_type(decl, binding, a)).collect()
        };
        match ty {
            TypeExpr::Param(param) => {
                if !decl.params.contains(param) {
                    return failf!(
                        ErrorKind::UnresolvedParameterReference,
                        "Type parameter {} does not belong to {}",
                        param.name,
                        self.idents.get_name(decl.name)
                    );
                }
                match binding.get(param) {
                    Some(type_id) => Ok(TypeExpr::Native(type_id)),
                    None => failf!(
                        ErrorKind::UnboundParameter,
                        "Type parameter {} is not bound",
                        param.name
                    ),
                }
            }
            TypeExpr::OwnClass { args } => Ok(TypeExpr::Class { class: decl.id, args: bind_all(args)? }),
            TypeExpr::Named { name, args } => Ok(TypeExpr::Named { name: *name, args: bind_all(args)? }),
            TypeExpr::Class { class, args } => {
                Ok(TypeExpr::Class { class: *class, args: bind_all(args)? })
            }
            TypeExpr::Native(_) | TypeExpr::Alias(_) => Ok(ty.clone()),
            TypeExpr::Unparsed(text) => {
                let parsed = self.parse_in(text, &decl.params, Some(decl.name)).map_err(|e| {
                    if e.is(ErrorKind::UnknownType) {
                        errf!(
                            ErrorKind::UnresolvedParameterReference,
                            "'{text}' refers to a name that is neither a type nor a parameter of {}: {}",
                            self.idents.get_name(decl.name),
                            e.message
                        )
                    } else {
                        e
                    }
                })?;
                self.bind_type(decl, binding, &parsed)
            }
        }
    }
}
