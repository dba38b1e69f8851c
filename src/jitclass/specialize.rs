// Copyright (c) 2025 knix
// All rights reserved.

use std::rc::Rc;

use ahash::HashMapExt;
use either::Either;
use fxhash::FxHashMap;
use log::{debug, info, trace};

use crate::alias::AliasId;
use crate::bind::BoundMethod;
use crate::body::Expr;
use crate::class::{ClassDeclaration, ClassId, MethodDecl, MethodOptions, OperatorKind};
use crate::engine::JitEngine;
use crate::error::{ErrorKind, JitResult};
use crate::idents::Ident;
use crate::key::CacheKey;
use crate::resolve::ParameterBinding;
use crate::type_expr::TypeExpr;
use crate::types::TypeId;
use crate::{SV4, failf, nz_u32_id, vm};

#[cfg(test)]
mod specialize_test;

nz_u32_id!(SpecializationId);

/// One concrete instantiation of a class. Immutable once published.
#[derive(Debug)]
pub struct Specialization {
    pub id: SpecializationId,
    pub class: ClassId,
    pub key: CacheKey,
    pub record_type: TypeId,
    pub binding: ParameterBinding,
    pub constructor: Rc<BoundMethod>,
    pub methods: FxHashMap<Ident, Rc<BoundMethod>>,
    /// Every method whose name is an operator, sharing the entry in `methods`
    pub operators: FxHashMap<OperatorKind, Rc<BoundMethod>>,
}

impl Specialization {
    pub fn method(&self, name: Ident) -> Option<&Rc<BoundMethod>> {
        self.methods.get(&name)
    }

    pub fn operator(&self, kind: OperatorKind) -> Option<&Rc<BoundMethod>> {
        self.operators.get(&kind)
    }

    pub fn all_methods(&self) -> impl Iterator<Item = &Rc<BoundMethod>> {
        std::iter::once(&self.constructor).chain(self.methods.values())
    }
}

pub struct ClassDescriptor {
    pub decl: Rc<ClassDeclaration>,
    pub base_alias: AliasId,
    pub specializations: FxHashMap<CacheKey, SpecializationId>,
    /// Reserved record types of specializations that are still being built
    pub in_progress: FxHashMap<CacheKey, TypeId>,
}

impl ClassDescriptor {
    pub fn new(decl: Rc<ClassDeclaration>, base_alias: AliasId) -> ClassDescriptor {
        ClassDescriptor {
            decl,
            base_alias,
            specializations: FxHashMap::with_capacity(4),
            in_progress: FxHashMap::new(),
        }
    }

    /// Left: the placeholder of an in-progress specialization. Right: a published one.
    pub fn lookup(&self, key: &CacheKey) -> Option<Either<TypeId, SpecializationId>> {
        if let Some(spec) = self.specializations.get(key) {
            return Some(Either::Right(*spec));
        }
        self.in_progress.get(key).map(|placeholder| Either::Left(*placeholder))
    }
}

struct BoundMethods {
    constructor: Rc<BoundMethod>,
    methods: FxHashMap<Ident, Rc<BoundMethod>>,
    operators: FxHashMap<OperatorKind, Rc<BoundMethod>>,
}

impl JitEngine {
    /// The specialization of `class` for `args`, building it on first request.
    /// Requests with equal arguments always return the same id.
    pub fn specialize(&mut self, class: ClassId, args: &[TypeExpr]) -> JitResult<SpecializationId> {
        let expected = self.classes.get(class).decl.params.len();
        if expected != args.len() {
            return failf!(
                ErrorKind::ArityMismatch,
                "{} takes exactly {} type arguments. {} provided: [{}]",
                self.class_name(class),
                expected,
                args.len(),
                self.type_expr_list_to_string(args)
            );
        }
        let key = self.make_key(args)?;
        self.specialize_key(class, key)
    }

    pub fn specialize_resolved(
        &mut self,
        class: ClassId,
        args: &[TypeId],
    ) -> JitResult<SpecializationId> {
        self.specialize_key(class, CacheKey::from_resolved(args))
    }

    pub fn specialize_key(&mut self, class: ClassId, key: CacheKey) -> JitResult<SpecializationId> {
        match self.lookup_or_build(class, key)? {
            Either::Right(spec) => Ok(spec),
            Either::Left(placeholder) => failf!(
                ErrorKind::IncompleteSpecialization,
                "{} is still being specialized and cannot be instantiated yet",
                self.types.type_to_string(placeholder, &self.idents)
            ),
        }
    }

    pub(crate) fn lookup_or_build(
        &mut self,
        class: ClassId,
        key: CacheKey,
    ) -> JitResult<Either<TypeId, SpecializationId>> {
        let descriptor = self.classes.get(class);
        let binding =
            ParameterBinding::for_class(&descriptor.decl, key.as_slice(), &self.types, &self.idents)?;
        if let Some(found) = descriptor.lookup(&key) {
            if let Either::Right(spec) = found {
                debug!(
                    "Using cached specialization {} for {} args [{}]",
                    spec,
                    self.class_name(class),
                    self.types.type_list_to_string(key.as_slice(), &self.idents)
                );
            } else {
                trace!("Observed in-progress placeholder for {}", self.class_name(class));
            }
            return Ok(found);
        }
        self.build_specialization(class, key, binding).map(Either::Right)
    }

    fn build_specialization(
        &mut self,
        class: ClassId,
        key: CacheKey,
        binding: ParameterBinding,
    ) -> JitResult<SpecializationId> {
        let decl = self.classes.get(class).decl.clone();
        if self.depth >= self.config.max_nesting_depth {
            return failf!(
                ErrorKind::RecursiveLayout,
                "Specializing {}[{}] exceeds the maximum nesting depth of {}",
                self.idents.get_name(decl.name),
                self.types.type_list_to_string(key.as_slice(), &self.idents),
                self.config.max_nesting_depth
            );
        }
        debug!(
            "Specializing {} for args [{}] at depth {}",
            self.idents.get_name(decl.name),
            self.types.type_list_to_string(key.as_slice(), &self.idents),
            self.depth
        );

        let record_type = self.types.reserve_record(decl.name, class, key.as_slice());
        self.classes.get_mut(class).in_progress.insert(key.clone(), record_type);
        let mark = self.nested_published.len();
        self.depth += 1;
        let filled = {
            let guard_key = key.clone();
            let mut self_ = scopeguard::guard(&mut *self, move |self_| {
                self_.depth -= 1;
                self_.classes.get_mut(class).in_progress.remove(&guard_key);
            });
            self_.fill_specialization(&decl, record_type, &binding)
        };
        let bound = match filled {
            Ok(bound) => bound,
            Err(e) => {
                // Anything published underneath may point at our abandoned placeholder
                self.roll_back_published(mark);
                return Err(e);
            }
        };

        let id = self.specializations.next_id();
        self.specializations.add(Specialization {
            id,
            class,
            key: key.clone(),
            record_type,
            binding,
            constructor: bound.constructor,
            methods: bound.methods,
            operators: bound.operators,
        });
        self.classes.get_mut(class).specializations.insert(key, id);
        self.boxing.register(record_type, id);
        info!("Published specialization {id}: {}", self.types.type_to_string(record_type, &self.idents));

        if self.config.eager_compile {
            self.pending_compile.push_back(id);
        }
        if self.depth == 0 {
            self.nested_published.clear();
            self.drain_pending_compile()?;
        } else {
            self.nested_published.push(id);
        }
        Ok(id)
    }

    /// Removes every specialization published since `mark` from the caches
    fn roll_back_published(&mut self, mark: usize) {
        let abandoned = self.nested_published.split_off(mark);
        for id in abandoned.iter().rev() {
            let spec = self.specializations.get(*id);
            let (class, key, record_type) = (spec.class, spec.key.clone(), spec.record_type);
            self.classes.get_mut(class).specializations.remove(&key);
            self.boxing.unregister(record_type);
            debug!(
                "Rolled back specialization {id}: {}",
                self.types.type_to_string(record_type, &self.idents)
            );
        }
        self.pending_compile.retain(|id| !abandoned.contains(id));
    }

    /// Resolves the members, completes the record layout and binds every method
    fn fill_specialization(
        &mut self,
        decl: &ClassDeclaration,
        record_type: TypeId,
        binding: &ParameterBinding,
    ) -> JitResult<BoundMethods> {
        let mut fields: Vec<(Ident, TypeId)> = Vec::with_capacity(decl.members.len());
        for member in &decl.members {
            let member_type = self.resolve_type(&member.ty, binding).map_err(|mut e| {
                e.message =
                    format!("member {}: {}", self.idents.get_name(member.name), e.message);
                e
            })?;
            fields.push((member.name, member_type));
        }
        let layout = self.types.complete_record(record_type, &fields, &self.idents)?;
        trace!("{} layout {:?}", self.types.type_to_string(record_type, &self.idents), layout);

        let class_compile = decl.options.compile_methods.unwrap_or(self.config.compile_methods);
        let default_constructor;
        let constructor_decl = match &decl.constructor {
            Some(c) => c,
            None => {
                default_constructor = Rc::new(MethodDecl {
                    name: self.builtins.init,
                    params: SV4::new(),
                    body: Expr::Unit,
                    options: MethodOptions::default(),
                });
                &default_constructor
            }
        };
        let constructor = Rc::new(self.bind_method(
            decl,
            constructor_decl,
            binding,
            record_type,
            constructor_decl.options.compile().unwrap_or(class_compile),
            true,
        )?);

        let mut methods = FxHashMap::with_capacity(decl.methods.len());
        let mut operators = FxHashMap::new();
        for method in &decl.methods {
            let compile = method.options.compile().unwrap_or(class_compile);
            let bound =
                Rc::new(self.bind_method(decl, method, binding, record_type, compile, false)?);
            if let Some(op) = OperatorKind::from_method_name(self.idents.get_name(method.name)) {
                operators.insert(op, bound.clone());
            }
            methods.insert(method.name, bound);
        }
        Ok(BoundMethods { constructor, methods, operators })
    }

    /// Lowers the compiled methods of every queued specialization
    pub(crate) fn drain_pending_compile(&mut self) -> JitResult<()> {
        if self.draining {
            return Ok(());
        }
        self.draining = true;
        let mut self_ = scopeguard::guard(&mut *self, |self_| self_.draining = false);
        while let Some(spec_id) = self_.pending_compile.pop_front() {
            let methods: Vec<Rc<BoundMethod>> = self_
                .specializations
                .get(spec_id)
                .all_methods()
                .filter(|m| m.compile)
                .cloned()
                .collect();
            debug!("Eagerly compiling {} methods of specialization {spec_id}", methods.len());
            for method in methods {
                vm::lower_method(&mut self_, &method)?;
            }
        }
        Ok(())
    }

    pub fn specializations_of(&self, class: ClassId) -> impl Iterator<Item = SpecializationId> {
        let mut ids: Vec<SpecializationId> =
            self.classes.get(class).specializations.values().copied().collect();
        ids.sort();
        ids.into_iter()
    }
}
