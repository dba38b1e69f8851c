// Copyright (c) 2025 knix
// All rights reserved.

use either::Either;
use log::trace;

use crate::class::{ClassDeclaration, ClassId};
use crate::engine::JitEngine;
use crate::error::{ErrorKind, JitResult};
use crate::idents::Identifiers;
use crate::key::CacheKey;
use crate::type_expr::{TypeExpr, TypeParam};
use crate::types::{TypeId, Types};
use crate::{SV4, failf};


/// The concrete type chosen for each parameter of one class
#[derive(Debug, Clone, Default)]
pub struct ParameterBinding {
    owner: Option<ClassId>,
    pairs: SV4<(TypeParam, TypeId)>,
}

impl ParameterBinding {
    pub fn empty() -> ParameterBinding {
        ParameterBinding::default()
    }

    pub fn for_class(
        decl: &ClassDeclaration,
        args: &[TypeId],
        types: &Types,
        idents: &Identifiers,
    ) -> JitResult<ParameterBinding> {
        if decl.params.len() != args.len() {
            return failf!(
                ErrorKind::ArityMismatch,
                "{} takes exactly {} type arguments. {} provided: [{}]",
                idents.get_name(decl.name),
                decl.params.len(),
                args.len(),
                types.type_list_to_string(args, idents)
            );
        }
        let pairs = decl.params.iter().cloned().zip(args.iter().copied()).collect();
        Ok(ParameterBinding { owner: Some(decl.id), pairs })
    }

    pub fn owner(&self) -> Option<ClassId> {
        self.owner
    }

    pub fn get(&self, param: &TypeParam) -> Option<TypeId> {
        self.pairs.iter().find(|(p, _)| p == param).map(|(_, t)| *t)
    }

    pub fn pairs(&self) -> &[(TypeParam, TypeId)] {
        &self.pairs
    }

    pub fn args(&self) -> SV4<TypeId> {
        self.pairs.iter().map(|(_, t)| *t).collect()
    }
}

impl JitEngine {
    /// Maps a type expression to the concrete native type it denotes under `binding`.
    ///
    /// Class applications are specialized on demand; a class that is still being
    /// specialized resolves to its reserved record type.
    pub fn resolve_type(
        &mut self,
        expr: &TypeExpr,
        binding: &ParameterBinding,
    ) -> JitResult<TypeId> {
        match expr {
            TypeExpr::Native(type_id) => Ok(*type_id),
            TypeExpr::Param(param) => match binding.get(param) {
                Some(type_id) => Ok(type_id),
                None => failf!(
                    ErrorKind::UnboundParameter,
                    "Type parameter {} is not bound{}",
                    param.name,
                    match binding.owner() {
                        Some(owner) => format!(" in {}", self.class_name(owner)),
                        None => String::new(),
                    }
                ),
            },
            TypeExpr::Named { name, args } => {
                let resolved = self.resolve_type_list(args, binding)?;
                self.typemap.construct(&mut self.types, &self.idents, *name, &resolved)
            }
            TypeExpr::Class { class, args } => {
                let resolved = self.resolve_type_list(args, binding)?;
                self.record_type_for(*class, &resolved)
            }
            TypeExpr::OwnClass { args } => {
                let Some(owner) = binding.owner() else {
                    return failf!(
                        ErrorKind::UnknownType,
                        "Reference to the enclosing class outside of any class"
                    );
                };
                let resolved = self.resolve_type_list(args, binding)?;
                self.record_type_for(owner, &resolved)
            }
            TypeExpr::Alias(alias_id) => {
                let alias = self.aliases.get(*alias_id);
                let origin = alias.origin;
                let Some(key) = alias.args.clone() else {
                    return failf!(
                        ErrorKind::IncompleteSpecialization,
                        "{} has unbound type parameters and cannot be used as a type",
                        self.class_name(origin)
                    );
                };
                self.record_type_for(origin, key.as_slice())
            }
            TypeExpr::Unparsed(text) => {
                let owner = binding.owner().map(|c| self.classes.get(c).decl.clone());
                let parsed = match &owner {
                    Some(decl) => self.parse_in(text, &decl.params, Some(decl.name))?,
                    None => self.parse_in(text, &[], None)?,
                };
                trace!("resolving parsed type {text}");
                self.resolve_type(&parsed, binding)
            }
        }
    }

    pub fn resolve_type_list(
        &mut self,
        exprs: &[TypeExpr],
        binding: &ParameterBinding,
    ) -> JitResult<SV4<TypeId>> {
        let mut resolved = SV4::with_capacity(exprs.len());
        for expr in exprs {
            resolved.push(self.resolve_type(expr, binding)?);
        }
        Ok(resolved)
    }

    /// The record type of `class` applied to `args`, specializing it if needed.
    /// While that specialization is being built this is its reserved placeholder.
    pub fn record_type_for(&mut self, class: ClassId, args: &[TypeId]) -> JitResult<TypeId> {
        let key = CacheKey::from_resolved(args);
        match self.lookup_or_build(class, key)? {
            Either::Left(placeholder) => Ok(placeholder),
            Either::Right(spec_id) => Ok(self.specializations.get(spec_id).record_type),
        }
    }
}
