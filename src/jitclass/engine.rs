// Copyright (c) 2025 knix
// All rights reserved.

use std::collections::VecDeque;
use std::rc::Rc;

use ahash::HashMapExt;
use fxhash::FxHashMap;
use log::{debug, info, warn};

use crate::alias::{AliasId, GenericAlias};
use crate::boxing::BoxingTable;
use crate::class::{ClassBuilder, ClassDeclaration, ClassId, MemberDecl, MethodDecl, MethodSource};
use crate::config::EngineConfig;
use crate::error::{ErrorKind, JitResult};
use crate::failf;
use crate::idents::{BuiltinIdents, Ident, Identifiers};
use crate::key::CacheKey;
use crate::parse::{TypeScope, parse_type, parse_type_list};
use crate::pool::Pool;
use crate::specialize::{ClassDescriptor, Specialization, SpecializationId};
use crate::type_expr::{TypeExpr, TypeParam};
use crate::typemap::TypeMap;
use crate::types::Types;

/// Owns every registered class, its specializations and the caches that
/// make repeated requests return identical results.
pub struct JitEngine {
    pub config: EngineConfig,
    pub idents: Identifiers,
    pub builtins: BuiltinIdents,
    pub types: Types,
    pub typemap: TypeMap,
    pub(crate) classes: Pool<ClassDescriptor, ClassId>,
    pub(crate) class_names: FxHashMap<Ident, ClassId>,
    pub(crate) aliases: Pool<GenericAlias, AliasId>,
    pub(crate) alias_cache: FxHashMap<(ClassId, CacheKey), AliasId>,
    pub(crate) specializations: Pool<Specialization, SpecializationId>,
    pub(crate) boxing: BoxingTable,
    /// Specializations currently being built
    pub(crate) depth: u32,
    /// Published while an enclosing specialization was still being built.
    /// Rolled back if that enclosing attempt fails.
    pub(crate) nested_published: Vec<SpecializationId>,
    pub(crate) pending_compile: VecDeque<SpecializationId>,
    pub(crate) draining: bool,
    /// Method invocations currently on the vm stack
    pub(crate) call_depth: u32,
}

impl Default for JitEngine {
    fn default() -> Self {
        JitEngine::new(EngineConfig::default())
    }
}

impl JitEngine {
    pub fn new(config: EngineConfig) -> JitEngine {
        let mut idents = Identifiers::default();
        let builtins = idents.builtins();
        let typemap = TypeMap::with_builtins(&mut idents);
        JitEngine {
            config,
            idents,
            builtins,
            types: Types::new(),
            typemap,
            classes: Pool::with_capacity("classes", 16),
            class_names: FxHashMap::with_capacity(16),
            aliases: Pool::with_capacity("aliases", 32),
            alias_cache: FxHashMap::with_capacity(32),
            specializations: Pool::with_capacity("specializations", 32),
            boxing: BoxingTable::default(),
            depth: 0,
            nested_published: Vec::new(),
            pending_compile: VecDeque::new(),
            draining: false,
            call_depth: 0,
        }
    }

    /// Registers a class declaration. A class without type parameters is
    /// specialized right away; if that fails the class stays registered and
    /// the error is returned.
    pub fn register(&mut self, builder: ClassBuilder) -> JitResult<ClassId> {
        let name = self.idents.intern(&builder.name);
        if self.class_names.contains_key(&name) || self.typemap.contains(name) {
            return failf!(
                ErrorKind::DuplicateDefinition,
                "A type named {} already exists",
                builder.name
            );
        }
        if builder.methods.iter().any(|m| m.name.as_str() == "__new__") {
            return failf!(
                ErrorKind::UnsupportedOverride,
                "Custom __new__ is not supported; define __init__ on {} instead",
                builder.name
            );
        }

        let mut members: Vec<MemberDecl> = Vec::with_capacity(builder.members.len());
        for (member_name, ty) in &builder.members {
            let member_ident = self.idents.intern(member_name);
            if members.iter().any(|m| m.name == member_ident) {
                return failf!(
                    ErrorKind::DuplicateDefinition,
                    "Member {member_name} is declared twice in {}",
                    builder.name
                );
            }
            let ty = self.close_type(ty, &builder.params, Some(name)).map_err(|mut e| {
                e.message = format!("member {}.{member_name}: {}", builder.name, e.message);
                e
            })?;
            members.push(MemberDecl { name: member_ident, ty });
        }

        let mut methods: Vec<Rc<MethodDecl>> = Vec::with_capacity(builder.methods.len());
        for source in &builder.methods {
            let decl = self.method_decl(source);
            if methods.iter().any(|m| m.name == decl.name) {
                return failf!(
                    ErrorKind::DuplicateDefinition,
                    "Method {} is defined twice in {}",
                    source.name,
                    builder.name
                );
            }
            methods.push(Rc::new(decl));
        }
        let constructor = builder.constructor.as_ref().map(|c| Rc::new(self.method_decl(c)));

        let id = self.classes.next_id();
        let decl = Rc::new(ClassDeclaration {
            id,
            name,
            params: builder.params.clone(),
            members,
            methods,
            constructor,
            options: builder.options,
        });
        // A class without parameters is born fully applied
        let base_args = if decl.is_generic() { None } else { Some(CacheKey::empty()) };
        let base_alias = self.aliases.next_id();
        self.aliases.add(GenericAlias { id: base_alias, origin: id, args: base_args.clone() });
        if let Some(key) = base_args {
            self.alias_cache.insert((id, key), base_alias);
        }
        let is_generic = decl.is_generic();
        self.classes.add(ClassDescriptor::new(decl, base_alias));
        self.class_names.insert(name, id);
        info!("Registered class {} with {} type parameters", builder.name, builder.params.len());

        if !is_generic {
            if let Err(e) = self.specialize_key(id, CacheKey::empty()) {
                warn!("Eager specialization of {} failed: {e}", builder.name);
                return Err(e);
            }
        }
        Ok(id)
    }

    fn method_decl(&mut self, source: &MethodSource) -> MethodDecl {
        MethodDecl {
            name: self.idents.intern(&source.name),
            params: source.params.clone(),
            body: source.body.clone(),
            options: source.options,
        }
    }

    pub fn class_by_name(&self, name: &str) -> Option<ClassId> {
        let ident = self.idents.get(name)?;
        self.class_names.get(&ident).copied()
    }

    pub fn class_decl(&self, class: ClassId) -> &Rc<ClassDeclaration> {
        &self.classes.get(class).decl
    }

    pub fn class_name(&self, class: ClassId) -> &str {
        self.idents.get_name(self.classes.get(class).decl.name)
    }

    pub fn classes(&self) -> impl Iterator<Item = (ClassId, &ClassDeclaration)> {
        self.classes.iter_with_ids().map(|(id, descriptor)| (id, descriptor.decl.as_ref()))
    }

    /// Parses a type outside of any class, as a caller would write it
    pub fn parse_type(&self, text: &str) -> JitResult<TypeExpr> {
        self.parse_in(text, &[], None)
    }

    /// Parses arguments as written between the brackets of `Class[...]`
    pub fn parse_type_args(&self, text: &str) -> JitResult<Vec<TypeExpr>> {
        parse_type_list(text, &self.scope(&[], None))
    }

    /// Specializes a class looked up by name, with its arguments given as
    /// text such as `int, List[float]`
    pub fn specialize_named(&mut self, class_name: &str, args: &str) -> JitResult<SpecializationId> {
        let Some(class) = self.class_by_name(class_name) else {
            return failf!(ErrorKind::UnknownType, "No class named {class_name}");
        };
        let args = self.parse_type_args(args)?;
        self.specialize(class, &args)
    }

    pub(crate) fn parse_in(
        &self,
        text: &str,
        params: &[TypeParam],
        own_name: Option<Ident>,
    ) -> JitResult<TypeExpr> {
        parse_type(text, &self.scope(params, own_name))
    }

    fn scope<'a>(&'a self, params: &'a [TypeParam], own_name: Option<Ident>) -> TypeScope<'a> {
        TypeScope {
            idents: &self.idents,
            params,
            own_name,
            classes: &self.class_names,
            typemap: &self.typemap,
        }
    }

    /// Replaces every unparsed annotation inside `expr` with its parsed form
    pub(crate) fn close_type(
        &self,
        expr: &TypeExpr,
        params: &[TypeParam],
        own_name: Option<Ident>,
    ) -> JitResult<TypeExpr> {
        let close_all = |args: &[TypeExpr]| -> JitResult<Vec<TypeExpr>> {
            args.iter().map(|a| self.close_type(a, params, own_name)).collect()
        };
        match expr {
            TypeExpr::Unparsed(text) => self.parse_in(text, params, own_name),
            TypeExpr::Named { name, args } => {
                Ok(TypeExpr::Named { name: *name, args: close_all(args)? })
            }
            TypeExpr::Class { class, args } => {
                Ok(TypeExpr::Class { class: *class, args: close_all(args)? })
            }
            TypeExpr::OwnClass { args } => Ok(TypeExpr::OwnClass { args: close_all(args)? }),
            TypeExpr::Native(_) | TypeExpr::Param(_) | TypeExpr::Alias(_) => Ok(expr.clone()),
        }
    }

    pub fn specialization(&self, id: SpecializationId) -> &Specialization {
        self.specializations.get(id)
    }

    /// Specializations reachable through the class caches
    pub fn specialization_count(&self) -> usize {
        self.classes.iter_with_ids().map(|(_, d)| d.specializations.len()).sum()
    }

    pub fn log_state(&self) {
        for (name, len) in [
            (self.classes.name(), self.classes.len()),
            (self.aliases.name(), self.aliases.len()),
            (self.specializations.name(), self.specializations.len()),
        ] {
            debug!("engine: {len} {name}");
        }
        debug!("engine: {} types", self.types.len());
    }
}
