// Copyright (c) 2025 knix
// All rights reserved.

use std::cell::RefCell;
use std::rc::Rc;

use ecow::EcoString;
use fxhash::FxHashMap;

use crate::error::{ErrorKind, JitResult};
use crate::idents::Identifiers;
use crate::types::{NativeType, TypeId, Types};
use crate::{SV8, errf, failf};

#[derive(Debug)]
pub struct ListObj {
    pub element: TypeId,
    pub items: RefCell<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DictKey {
    Bool(bool),
    Int(i64),
    Str(EcoString),
}

impl DictKey {
    pub fn to_value(&self) -> Value {
        match self {
            DictKey::Bool(b) => Value::Bool(*b),
            DictKey::Int(i) => Value::Int(*i),
            DictKey::Str(s) => Value::Str(s.clone()),
        }
    }
}

#[derive(Debug)]
pub struct DictObj {
    pub key: TypeId,
    pub value: TypeId,
    pub entries: RefCell<FxHashMap<DictKey, Value>>,
}

/// Storage for one record instance, fields in declaration order
#[derive(Debug)]
pub struct RecordObj {
    pub type_id: TypeId,
    pub fields: RefCell<SV8<Value>>,
}

/// A runtime value. Lists, dicts and records are handles: cloning a Value
/// never copies their storage.
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(EcoString),
    List(Rc<ListObj>),
    Dict(Rc<DictObj>),
    Tuple(Rc<[Value]>),
    Record(Rc<RecordObj>),
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.into())
    }
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Tuple(_) => "tuple",
            Value::Record(_) => "record",
        }
    }

    pub fn new_list(element: TypeId, items: Vec<Value>) -> Value {
        Value::List(Rc::new(ListObj { element, items: RefCell::new(items) }))
    }

    pub fn new_dict(key: TypeId, value: TypeId) -> Value {
        Value::Dict(Rc::new(DictObj { key, value, entries: RefCell::new(FxHashMap::default()) }))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Rc<RecordObj>> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(l) => !l.items.borrow().is_empty(),
            Value::Dict(d) => !d.entries.borrow().is_empty(),
            Value::Tuple(t) => !t.is_empty(),
            Value::Record(_) => true,
        }
    }

    pub fn to_dict_key(&self) -> Option<DictKey> {
        match self {
            Value::Bool(b) => Some(DictKey::Bool(*b)),
            Value::Int(i) => Some(DictKey::Int(*i)),
            Value::Str(s) => Some(DictKey::Str(s.clone())),
            _ => None,
        }
    }

    /// Structural equality for everything but records, which compare by identity
    pub fn native_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                Rc::ptr_eq(a, b) || {
                    let (a, b) = (a.items.borrow(), b.items.borrow());
                    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.native_eq(y))
                }
            }
            (Value::Dict(a), Value::Dict(b)) => {
                Rc::ptr_eq(a, b) || {
                    let (a, b) = (a.entries.borrow(), b.entries.borrow());
                    a.len() == b.len()
                        && a.iter().all(|(k, v)| b.get(k).is_some_and(|w| v.native_eq(w)))
                }
            }
            (Value::Tuple(a), Value::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.native_eq(y))
            }
            (Value::Record(a), Value::Record(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// The value every slot of `type_id` starts out as in a default-constructed record
    pub fn zero(types: &Types, type_id: TypeId) -> Value {
        match types.get(type_id) {
            NativeType::None => Value::None,
            NativeType::Bool => Value::Bool(false),
            NativeType::Integer(_) => Value::Int(0),
            NativeType::Float(_) => Value::Float(0.0),
            NativeType::Unicode => Value::Str(EcoString::new()),
            NativeType::List(element) => Value::new_list(*element, Vec::new()),
            NativeType::Dict(key, value) => Value::new_dict(*key, *value),
            NativeType::Tuple(elements) => {
                Value::Tuple(elements.iter().map(|e| Value::zero(types, *e)).collect())
            }
            NativeType::Record(_) => {
                let fields = match types.record(type_id) {
                    Some(record) => {
                        record.fields.iter().map(|f| Value::zero(types, f.type_id)).collect()
                    }
                    None => SV8::new(),
                };
                Value::Record(Rc::new(RecordObj { type_id, fields: RefCell::new(fields) }))
            }
        }
    }

    /// A copy of this record's storage, including records stored inline in it
    pub fn copy_record(record: &RecordObj) -> Rc<RecordObj> {
        let fields = record.fields.borrow().iter().map(Value::copy_inline).collect();
        Rc::new(RecordObj { type_id: record.type_id, fields: RefCell::new(fields) })
    }

    /// Records are held inline, directly or as tuple elements. Containers are shared.
    fn copy_inline(&self) -> Value {
        match self {
            Value::Record(nested) => Value::Record(Value::copy_record(nested)),
            Value::Tuple(elements) => Value::Tuple(elements.iter().map(Value::copy_inline).collect()),
            other => other.clone(),
        }
    }

    /// Converts `self` for storage in a slot of type `expected`: ints widen to
    /// floats, integers are range checked and records are copied in.
    pub fn coerce(self, types: &Types, idents: &Identifiers, expected: TypeId) -> JitResult<Value> {
        let mismatch = |v: &Value| {
            errf!(
                ErrorKind::TypeMismatch,
                "Cannot store a {} value in a slot of type {}",
                v.kind_name(),
                types.type_to_string(expected, idents)
            )
        };
        match (types.get(expected), self) {
            (NativeType::None, Value::None) => Ok(Value::None),
            (NativeType::Bool, Value::Bool(b)) => Ok(Value::Bool(b)),
            (NativeType::Integer(int), Value::Int(i)) => {
                if int.fits(i) {
                    Ok(Value::Int(i))
                } else {
                    failf!(ErrorKind::TypeMismatch, "{i} does not fit in {int}")
                }
            }
            (NativeType::Float(_), Value::Float(f)) => Ok(Value::Float(f)),
            (NativeType::Float(_), Value::Int(i)) => Ok(Value::Float(i as f64)),
            (NativeType::Unicode, Value::Str(s)) => Ok(Value::Str(s)),
            (NativeType::List(element), Value::List(list)) if list.element == *element => {
                Ok(Value::List(list))
            }
            (NativeType::Dict(k, v), Value::Dict(dict)) if dict.key == *k && dict.value == *v => {
                Ok(Value::Dict(dict))
            }
            (NativeType::Tuple(elements), Value::Tuple(values)) if elements.len() == values.len() => {
                let coerced: JitResult<Vec<Value>> = elements
                    .iter()
                    .zip(values.iter())
                    .map(|(e, v)| v.clone().coerce(types, idents, *e))
                    .collect();
                Ok(Value::Tuple(coerced?.into()))
            }
            (NativeType::Record(_), Value::Record(record)) if record.type_id == expected => {
                Ok(Value::Record(Value::copy_record(&record)))
            }
            (_, other) => Err(mismatch(&other)),
        }
    }

    /// Like `coerce`, for containers that hold records by handle
    pub fn coerce_handle(
        self,
        types: &Types,
        idents: &Identifiers,
        expected: TypeId,
    ) -> JitResult<Value> {
        match self {
            Value::Record(record) if record.type_id == expected => Ok(Value::Record(record)),
            other => other.coerce(types, idents, expected),
        }
    }
}
