// Copyright (c) 2025 knix
// All rights reserved.

//! Boxing of native records into proxies that expose members as properties.

use std::rc::Rc;

use fxhash::FxHashMap;

use crate::alias::AliasId;
use crate::body::BinaryOp;
use crate::class::OperatorKind;
use crate::engine::JitEngine;
use crate::error::{ErrorKind, JitResult};
use crate::specialize::SpecializationId;
use crate::types::TypeId;
use crate::value::{RecordObj, Value};
use crate::{failf, vm};

#[cfg(test)]
mod boxing_test;

/// Which specialization owns each record type
#[derive(Debug, Default)]
pub struct BoxingTable {
    by_record: FxHashMap<TypeId, SpecializationId>,
}

impl BoxingTable {
    pub fn register(&mut self, record_type: TypeId, spec: SpecializationId) {
        self.by_record.insert(record_type, spec);
    }

    pub fn unregister(&mut self, record_type: TypeId) {
        self.by_record.remove(&record_type);
    }

    pub fn lookup(&self, record_type: TypeId) -> Option<SpecializationId> {
        self.by_record.get(&record_type).copied()
    }

    pub fn len(&self) -> usize {
        self.by_record.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_record.is_empty()
    }
}

/// A boxed record instance. Holds a handle, so changes made through the
/// proxy are visible to every other holder of the same record.
#[derive(Debug, Clone)]
pub struct Proxy {
    spec: SpecializationId,
    handle: Rc<RecordObj>,
}

impl Proxy {
    pub fn specialization(&self) -> SpecializationId {
        self.spec
    }

    pub fn record_type(&self) -> TypeId {
        self.handle.type_id
    }

    pub fn unbox(&self) -> Value {
        Value::Record(self.handle.clone())
    }

    pub fn same_instance(&self, other: &Proxy) -> bool {
        Rc::ptr_eq(&self.handle, &other.handle)
    }
}

impl JitEngine {
    pub fn box_value(&self, value: &Value) -> JitResult<Proxy> {
        let Value::Record(record) = value else {
            return failf!(
                ErrorKind::TypeMismatch,
                "Only records can be boxed, got a {} value",
                value.kind_name()
            );
        };
        let Some(spec) = self.boxing.lookup(record.type_id) else {
            return failf!(
                ErrorKind::TypeMismatch,
                "{} has no registered specialization",
                self.types.type_to_string(record.type_id, &self.idents)
            );
        };
        Ok(Proxy { spec, handle: record.clone() })
    }

    /// Whether `value` is a record of `alias`. A bare alias matches every
    /// specialization of its class, an applied one only its own.
    pub fn is_instance(&self, value: &Value, alias: AliasId) -> bool {
        let Value::Record(record) = value else {
            return false;
        };
        let Some(spec) = self.boxing.lookup(record.type_id) else {
            return false;
        };
        let spec = self.specialization(spec);
        let alias = self.aliases.get(alias);
        spec.class == alias.origin
            && match &alias.args {
                Some(key) => *key == spec.key,
                None => true,
            }
    }

    /// Constructs through `alias` and boxes the result
    pub fn instantiate(
        &mut self,
        alias: AliasId,
        args: Vec<Value>,
    ) -> JitResult<Proxy> {
        let value = self.call(alias, args)?;
        self.box_value(&value)
    }

    pub fn get_property(&self, proxy: &Proxy, name: &str) -> JitResult<Value> {
        let Some(ident) = self.idents.get(name) else {
            return self.no_member(proxy, name);
        };
        vm::load_field(self, &proxy.handle, ident)
    }

    pub fn set_property(&mut self, proxy: &Proxy, name: &str, value: Value) -> JitResult<()> {
        let Some(ident) = self.idents.get(name) else {
            return self.no_member(proxy, name);
        };
        vm::store_field(self, &proxy.handle, ident, value)
    }

    /// Every member with its current value, in declaration order
    pub fn properties(&self, proxy: &Proxy) -> Vec<(&str, Value)> {
        let Some(record) = self.types.record(proxy.handle.type_id) else {
            return Vec::new();
        };
        let fields = proxy.handle.fields.borrow();
        record
            .fields
            .iter()
            .zip(fields.iter())
            .map(|(field, value)| (self.idents.get_name(field.name), value.clone()))
            .collect()
    }

    pub fn method_names(&self, proxy: &Proxy) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .specialization(proxy.spec)
            .methods
            .keys()
            .map(|name| self.idents.get_name(*name))
            .collect();
        names.sort();
        names
    }

    pub fn call_method(&mut self, proxy: &Proxy, name: &str, args: Vec<Value>) -> JitResult<Value> {
        let Some(ident) = self.idents.get(name) else {
            return failf!(
                ErrorKind::UnknownName,
                "{} has no method {name}",
                self.types.type_to_string(proxy.record_type(), &self.idents)
            );
        };
        vm::call_method(self, proxy.unbox(), ident, args)
    }

    pub fn apply_operator(
        &mut self,
        proxy: &Proxy,
        op: OperatorKind,
        args: Vec<Value>,
    ) -> JitResult<Value> {
        // Equality falls back the same way `==` and `!=` do in a method body
        let comparison = match op {
            OperatorKind::Eq => Some(BinaryOp::Eq),
            OperatorKind::Ne => Some(BinaryOp::Ne),
            _ => None,
        };
        if let (Some(comparison), [other]) = (comparison, args.as_slice()) {
            return vm::eval_binary(self, comparison, proxy.unbox(), other.clone());
        }
        vm::dispatch_operator(self, op, proxy.unbox(), args)
    }

    fn no_member<A>(&self, proxy: &Proxy, name: &str) -> JitResult<A> {
        failf!(
            ErrorKind::UnknownName,
            "{} has no member {name}",
            self.types.type_to_string(proxy.record_type(), &self.idents)
        )
    }
}
