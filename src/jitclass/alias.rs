// Copyright (c) 2025 knix
// All rights reserved.

use log::trace;

use crate::class::ClassId;
use crate::engine::JitEngine;
use crate::error::{ErrorKind, JitResult};
use crate::key::CacheKey;
use crate::specialize::SpecializationId;
use crate::type_expr::TypeExpr;
use crate::value::Value;
use crate::{failf, nz_u32_id, vm};

#[cfg(test)]
mod alias_test;

nz_u32_id!(AliasId);

/// A reference to a class, either bare (`Box`) or fully applied (`Box[int]`).
///
/// Aliases are interned per (origin, key), so alias equality is id equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericAlias {
    pub id: AliasId,
    pub origin: ClassId,
    /// None until every parameter is bound
    pub args: Option<CacheKey>,
}

impl GenericAlias {
    pub fn is_applied(&self) -> bool {
        self.args.is_some()
    }
}

impl JitEngine {
    pub fn class_alias(&self, class: ClassId) -> AliasId {
        self.classes.get(class).base_alias
    }

    pub fn alias(&self, alias: AliasId) -> &GenericAlias {
        self.aliases.get(alias)
    }

    /// `alias[params]`. Only a bare alias of a generic class can be indexed,
    /// and only with exactly as many arguments as the class declares.
    pub fn index(&mut self, alias: AliasId, params: &[TypeExpr]) -> JitResult<AliasId> {
        let origin = self.aliases.get(alias).origin;
        if self.aliases.get(alias).is_applied() {
            return failf!(
                ErrorKind::ArityMismatch,
                "{} is already fully applied; partial application is not supported",
                self.alias_to_string(alias)
            );
        }
        let expected = self.classes.get(origin).decl.params.len();
        if expected != params.len() {
            return failf!(
                ErrorKind::ArityMismatch,
                "{} takes exactly {} type arguments. {} provided: [{}]",
                self.class_name(origin),
                expected,
                params.len(),
                self.type_expr_list_to_string(params)
            );
        }
        let key = self.make_key(params)?;
        Ok(self.intern_alias(origin, key))
    }

    pub fn index_class(&mut self, class: ClassId, params: &[TypeExpr]) -> JitResult<AliasId> {
        let base = self.class_alias(class);
        self.index(base, params)
    }

    pub(crate) fn intern_alias(&mut self, origin: ClassId, key: CacheKey) -> AliasId {
        if let Some(existing) = self.alias_cache.get(&(origin, key.clone())) {
            return *existing;
        }
        let id = self.aliases.next_id();
        self.aliases.add(GenericAlias { id, origin, args: Some(key.clone()) });
        self.alias_cache.insert((origin, key), id);
        trace!("interned alias {}", self.alias_to_string(id));
        id
    }

    /// The alias written as `text`, e.g. `Box[List[int]]` or `Counter`
    pub fn alias_of(&mut self, text: &str) -> JitResult<AliasId> {
        match self.parse_type(text)? {
            TypeExpr::Class { class, args } => {
                if args.is_empty() {
                    Ok(self.class_alias(class))
                } else {
                    self.index_class(class, &args)
                }
            }
            TypeExpr::Alias(alias) => Ok(alias),
            _ => failf!(ErrorKind::TypeMismatch, "{text} does not name a class"),
        }
    }

    pub fn alias_specialization(&mut self, alias: AliasId) -> JitResult<SpecializationId> {
        let GenericAlias { origin, args, .. } = self.aliases.get(alias).clone();
        let Some(key) = args else {
            return failf!(
                ErrorKind::IncompleteSpecialization,
                "Cannot instantiate {}: its type parameters are unbound",
                self.alias_to_string(alias)
            );
        };
        self.specialize_key(origin, key)
    }

    /// Constructs an instance through a fully applied alias
    pub fn call(&mut self, alias: AliasId, args: Vec<Value>) -> JitResult<Value> {
        let spec = self.alias_specialization(alias)?;
        vm::construct(self, spec, args)
    }
}
