//! Lowers bound method bodies and runs them.
//!
//! Lowering turns locals into frame slots, resolves every closed type in the
//! body to a TypeId and folds type tests to constants. A compiled method keeps
//! its lowered form for the life of the engine; an uncompiled one is lowered
//! again on every call.

use std::cell::OnceCell;
use std::rc::Rc;

use ecow::EcoString;
use log::{debug, trace};

use crate::bind::BoundMethod;
use crate::body::{BinaryOp, Expr, UnaryOp};
use crate::class::OperatorKind;
use crate::engine::JitEngine;
use crate::error::{ErrorKind, JitResult};
use crate::idents::Ident;
use crate::resolve::ParameterBinding;
use crate::specialize::SpecializationId;
use crate::type_expr::TypeExpr;
use crate::types::TypeId;
use crate::value::{RecordObj, Value};
use crate::{errf, failf};


/// Largest string `str * int` may produce
pub const MAX_STRING_LEN: usize = 1 << 28;

#[derive(Debug)]
pub struct Lowered {
    pub slot_count: usize,
    pub body: LExpr,
}

#[derive(Debug)]
pub enum LExpr {
    Const(Value),
    Local(usize),
    SetLocal(usize, Box<LExpr>),
    Field(Box<LExpr>, Ident),
    SetField(Box<LExpr>, Ident, Box<LExpr>),
    Unary(UnaryOp, Box<LExpr>),
    Binary(BinaryOp, Box<LExpr>, Box<LExpr>),
    Method { receiver: Box<LExpr>, name: Ident, args: Vec<LExpr> },
    Call { callee: Box<LExpr>, args: Vec<LExpr> },
    /// The target is specialized on first execution, not during lowering, so
    /// that lowering never recurses into other classes' methods
    New { class: TypeExpr, target: OnceCell<SpecializationId>, args: Vec<LExpr> },
    NewList(TypeId),
    NewDict(TypeId, TypeId),
    Tuple(Vec<LExpr>),
    Index(Box<LExpr>, Box<LExpr>),
    SetIndex(Box<LExpr>, Box<LExpr>, Box<LExpr>),
    Len(Box<LExpr>),
    If(Box<LExpr>, Box<LExpr>, Box<LExpr>),
    While(Box<LExpr>, Box<LExpr>),
    Block(Vec<LExpr>),
    Raise(EcoString),
}

struct Lowerer<'e> {
    engine: &'e mut JitEngine,
    locals: Vec<(EcoString, usize)>,
    slot_count: usize,
}

impl Lowerer<'_> {
    fn bind_local(&mut self, name: &EcoString) -> usize {
        let slot = self.slot_count;
        self.slot_count += 1;
        self.locals.push((name.clone(), slot));
        slot
    }

    fn find_local(&self, name: &str) -> JitResult<usize> {
        match self.locals.iter().rev().find(|(n, _)| n.as_str() == name) {
            Some((_, slot)) => Ok(*slot),
            None => failf!(ErrorKind::UnknownName, "Unknown local {name}"),
        }
    }

    fn resolve(&mut self, ty: &TypeExpr) -> JitResult<TypeId> {
        self.engine.resolve_type(ty, &ParameterBinding::empty())
    }

    fn boxed(&mut self, e: &Expr) -> JitResult<Box<LExpr>> {
        Ok(Box::new(self.lower(e)?))
    }

    fn all(&mut self, es: &[Expr]) -> JitResult<Vec<LExpr>> {
        es.iter().map(|e| self.lower(e)).collect()
    }

    fn lower(&mut self, e: &Expr) -> JitResult<LExpr> {
        let lowered = match e {
            Expr::Unit => LExpr::Const(Value::None),
            Expr::Bool(b) => LExpr::Const(Value::Bool(*b)),
            Expr::Int(i) => LExpr::Const(Value::Int(*i)),
            Expr::Float(f) => LExpr::Const(Value::Float(*f)),
            Expr::Str(s) => LExpr::Const(Value::Str(s.clone())),
            Expr::Local(name) => LExpr::Local(self.find_local(name)?),
            Expr::Let(name, value) => {
                let value = self.boxed(value)?;
                LExpr::SetLocal(self.bind_local(name), value)
            }
            Expr::Assign(name, value) => {
                let slot = self.find_local(name).map_err(|_| {
                    errf!(ErrorKind::UnknownName, "Assignment to undeclared local {name}")
                })?;
                LExpr::SetLocal(slot, self.boxed(value)?)
            }
            Expr::Field(target, name) => {
                LExpr::Field(self.boxed(target)?, self.engine.idents.intern(name))
            }
            Expr::SetField(target, name, value) => {
                let target = self.boxed(target)?;
                LExpr::SetField(target, self.engine.idents.intern(name), self.boxed(value)?)
            }
            Expr::Unary(op, operand) => LExpr::Unary(*op, self.boxed(operand)?),
            Expr::Binary(op, lhs, rhs) => LExpr::Binary(*op, self.boxed(lhs)?, self.boxed(rhs)?),
            Expr::Method { receiver, name, args } => LExpr::Method {
                receiver: self.boxed(receiver)?,
                name: self.engine.idents.intern(name),
                args: self.all(args)?,
            },
            Expr::Call { callee, args } => {
                LExpr::Call { callee: self.boxed(callee)?, args: self.all(args)? }
            }
            Expr::New { class, args } => {
                if !matches!(class, TypeExpr::Class { .. } | TypeExpr::Alias(_)) {
                    return failf!(
                        ErrorKind::TypeMismatch,
                        "Cannot instantiate {}: not a class",
                        self.engine.type_expr_to_string(class)
                    );
                }
                LExpr::New { class: class.clone(), target: OnceCell::new(), args: self.all(args)? }
            }
            Expr::NewList(element) => {
                let element = self.resolve(element)?;
                let list = self.engine.builtins.List;
                self.engine.typemap.construct(
                    &mut self.engine.types,
                    &self.engine.idents,
                    list,
                    &[element],
                )?;
                LExpr::NewList(element)
            }
            Expr::NewDict(key, value) => {
                let key = self.resolve(key)?;
                let value = self.resolve(value)?;
                let dict = self.engine.builtins.Dict;
                self.engine.typemap.construct(
                    &mut self.engine.types,
                    &self.engine.idents,
                    dict,
                    &[key, value],
                )?;
                LExpr::NewDict(key, value)
            }
            Expr::Tuple(elements) => LExpr::Tuple(self.all(elements)?),
            Expr::Index(target, index) => LExpr::Index(self.boxed(target)?, self.boxed(index)?),
            Expr::SetIndex(target, index, value) => {
                LExpr::SetIndex(self.boxed(target)?, self.boxed(index)?, self.boxed(value)?)
            }
            Expr::Len(target) => LExpr::Len(self.boxed(target)?),
            Expr::TypeIs(a, b) => {
                let a = self.resolve(a)?;
                let b = self.resolve(b)?;
                LExpr::Const(Value::Bool(a == b))
            }
            Expr::If(cond, cons, alt) => {
                LExpr::If(self.boxed(cond)?, self.boxed(cons)?, self.boxed(alt)?)
            }
            Expr::While(cond, body) => LExpr::While(self.boxed(cond)?, self.boxed(body)?),
            Expr::Block(es) => LExpr::Block(self.all(es)?),
            Expr::Raise(message) => LExpr::Raise(message.clone()),
        };
        Ok(lowered)
    }
}

fn method_label(engine: &JitEngine, method: &BoundMethod) -> String {
    format!(
        "{}.{}",
        engine.types.type_to_string(method.record_type, &engine.idents),
        engine.idents.get_name(method.name)
    )
}

/// The lowered form of `method`, reusing the cached one if it is compiled
pub fn lower_method(engine: &mut JitEngine, method: &BoundMethod) -> JitResult<Rc<Lowered>> {
    if let Some(lowered) = method.cached_lowering() {
        return Ok(lowered);
    }
    let mut lowerer = Lowerer { engine: &mut *engine, locals: Vec::with_capacity(8), slot_count: 0 };
    lowerer.bind_local(&EcoString::from("self"));
    for param in &method.params {
        lowerer.bind_local(param);
    }
    let body = lowerer.lower(&method.body);
    let slot_count = lowerer.slot_count;
    let body = body.map_err(|mut e| {
        e.message = format!("lowering {}: {}", method_label(engine, method), e.message);
        e
    })?;
    let lowered = Rc::new(Lowered { slot_count, body });
    if method.compile {
        debug!("Compiled {}", method_label(engine, method));
        method.cache_lowering(lowered.clone());
    } else {
        trace!("Lowered uncompiled {} for a single call", method_label(engine, method));
    }
    Ok(lowered)
}

struct Frame {
    slots: Vec<Value>,
}

pub fn invoke(
    engine: &mut JitEngine,
    method: &BoundMethod,
    receiver: Value,
    args: Vec<Value>,
) -> JitResult<Value> {
    if args.len() != method.params.len() {
        return failf!(
            ErrorKind::ArityMismatch,
            "{} takes {} arguments. {} provided",
            method_label(engine, method),
            method.params.len(),
            args.len()
        );
    }
    let lowered = lower_method(engine, method)?;
    if engine.call_depth >= engine.config.max_call_depth {
        return failf!(
            ErrorKind::Runtime,
            "maximum recursion depth exceeded calling {}",
            method_label(engine, method)
        );
    }
    let mut frame = Frame { slots: vec![Value::None; lowered.slot_count] };
    frame.slots[0] = receiver;
    for (slot, arg) in frame.slots[1..].iter_mut().zip(args) {
        *slot = arg;
    }
    engine.call_depth += 1;
    let result = eval(engine, &mut frame, &lowered.body);
    engine.call_depth -= 1;
    result
}

/// Allocates a zeroed instance of `spec` and runs its constructor on it
pub fn construct(engine: &mut JitEngine, spec: SpecializationId, args: Vec<Value>) -> JitResult<Value> {
    let specialization = engine.specialization(spec);
    let record_type = specialization.record_type;
    let constructor = specialization.constructor.clone();
    let instance = Value::zero(&engine.types, record_type);
    invoke(engine, &constructor, instance.clone(), args)?;
    Ok(instance)
}

pub(crate) fn value_type_name(engine: &JitEngine, value: &Value) -> String {
    match value {
        Value::Record(record) => engine.types.type_to_string(record.type_id, &engine.idents),
        other => other.kind_name().to_string(),
    }
}

fn record_method(
    engine: &JitEngine,
    record: &RecordObj,
    name: Ident,
) -> JitResult<Option<Rc<BoundMethod>>> {
    let Some(spec) = engine.boxing.lookup(record.type_id) else {
        return failf!(
            ErrorKind::Runtime,
            "No specialization is registered for {}",
            engine.types.type_to_string(record.type_id, &engine.idents)
        );
    };
    Ok(engine.specialization(spec).method(name).cloned())
}

fn record_operator(
    engine: &JitEngine,
    record: &RecordObj,
    kind: OperatorKind,
) -> Option<Rc<BoundMethod>> {
    let spec = engine.boxing.lookup(record.type_id)?;
    engine.specialization(spec).operator(kind).cloned()
}

/// Applies `kind` to a record receiver through its operator table
pub fn dispatch_operator(
    engine: &mut JitEngine,
    kind: OperatorKind,
    receiver: Value,
    args: Vec<Value>,
) -> JitResult<Value> {
    let method = match &receiver {
        Value::Record(record) => record_operator(engine, record, kind),
        _ => None,
    };
    match method {
        Some(method) => invoke(engine, &method, receiver, args),
        None => failf!(
            ErrorKind::Runtime,
            "{} does not support {}",
            value_type_name(engine, &receiver),
            kind.method_name()
        ),
    }
}

pub fn call_method(
    engine: &mut JitEngine,
    receiver: Value,
    name: Ident,
    args: Vec<Value>,
) -> JitResult<Value> {
    match &receiver {
        Value::Record(record) => match record_method(engine, record, name)? {
            Some(method) => invoke(engine, &method, receiver, args),
            None => failf!(
                ErrorKind::UnknownName,
                "{} has no method {}",
                value_type_name(engine, &receiver),
                engine.idents.get_name(name)
            ),
        },
        Value::List(list) if name == engine.builtins.append => {
            let [item] = expect_args::<1>("append", args)?;
            let item = item.coerce_handle(&engine.types, &engine.idents, list.element)?;
            list.items.borrow_mut().push(item);
            Ok(Value::None)
        }
        Value::List(list) if name == engine.builtins.pop => {
            let [] = expect_args::<0>("pop", args)?;
            match list.items.borrow_mut().pop() {
                Some(item) => Ok(item),
                None => failf!(ErrorKind::Runtime, "pop from empty list"),
            }
        }
        Value::Dict(dict) if name == engine.builtins.get => {
            let [key] = expect_args::<1>("get", args)?;
            let key = key.coerce(&engine.types, &engine.idents, dict.key)?;
            let key = dict_key(&key)?;
            Ok(dict.entries.borrow().get(&key).cloned().unwrap_or(Value::None))
        }
        _ => failf!(
            ErrorKind::UnknownName,
            "{} has no method {}",
            value_type_name(engine, &receiver),
            engine.idents.get_name(name)
        ),
    }
}

fn expect_args<const N: usize>(
    name: &str,
    args: Vec<Value>,
) -> JitResult<[Value; N]> {
    let count = args.len();
    args.try_into().map_err(|_| {
        errf!(ErrorKind::ArityMismatch, "{name} takes {N} arguments. {count} provided")
    })
}

fn dict_key(value: &Value) -> JitResult<crate::value::DictKey> {
    value.to_dict_key().ok_or_else(|| {
        errf!(ErrorKind::TypeMismatch, "unhashable type: '{}'", value.kind_name())
    })
}

fn list_index(len: usize, index: &Value) -> JitResult<usize> {
    let Some(i) = index.as_int() else {
        return failf!(
            ErrorKind::TypeMismatch,
            "indices must be integers, not {}",
            index.kind_name()
        );
    };
    let adjusted = if i < 0 { i + len as i64 } else { i };
    if adjusted < 0 || adjusted >= len as i64 {
        return failf!(ErrorKind::Runtime, "index {i} out of range");
    }
    Ok(adjusted as usize)
}

pub(crate) fn load_field(engine: &JitEngine, record: &RecordObj, name: Ident) -> JitResult<Value> {
    let Some((index, _)) = engine.types.record(record.type_id).and_then(|r| r.find_field(name))
    else {
        return failf!(
            ErrorKind::UnknownName,
            "{} has no member {}",
            engine.types.type_to_string(record.type_id, &engine.idents),
            engine.idents.get_name(name)
        );
    };
    Ok(record.fields.borrow()[index].clone())
}

pub(crate) fn store_field(
    engine: &JitEngine,
    record: &RecordObj,
    name: Ident,
    value: Value,
) -> JitResult<()> {
    let Some((index, field)) = engine.types.record(record.type_id).and_then(|r| r.find_field(name))
    else {
        return failf!(
            ErrorKind::UnknownName,
            "{} has no member {}",
            engine.types.type_to_string(record.type_id, &engine.idents),
            engine.idents.get_name(name)
        );
    };
    let value = value.coerce(&engine.types, &engine.idents, field.type_id).map_err(|mut e| {
        e.message = format!(
            "{}.{}: {}",
            engine.types.type_to_string(record.type_id, &engine.idents),
            engine.idents.get_name(name),
            e.message
        );
        e
    })?;
    record.fields.borrow_mut()[index] = value;
    Ok(())
}

fn eval_all(engine: &mut JitEngine, frame: &mut Frame, es: &[LExpr]) -> JitResult<Vec<Value>> {
    es.iter().map(|e| eval(engine, frame, e)).collect()
}

fn eval(engine: &mut JitEngine, frame: &mut Frame, e: &LExpr) -> JitResult<Value> {
    match e {
        LExpr::Const(value) => Ok(value.clone()),
        LExpr::Local(slot) => Ok(frame.slots[*slot].clone()),
        LExpr::SetLocal(slot, value) => {
            let value = eval(engine, frame, value)?;
            frame.slots[*slot] = value;
            Ok(Value::None)
        }
        LExpr::Field(target, name) => match eval(engine, frame, target)? {
            Value::Record(record) => load_field(engine, &record, *name),
            other => failf!(
                ErrorKind::Runtime,
                "'{}' object has no attribute {}",
                other.kind_name(),
                engine.idents.get_name(*name)
            ),
        },
        LExpr::SetField(target, name, value) => {
            let target = eval(engine, frame, target)?;
            let value = eval(engine, frame, value)?;
            match target {
                Value::Record(record) => store_field(engine, &record, *name, value).map(|_| Value::None),
                other => failf!(
                    ErrorKind::Runtime,
                    "'{}' object has no attribute {}",
                    other.kind_name(),
                    engine.idents.get_name(*name)
                ),
            }
        }
        LExpr::Unary(op, operand) => {
            let operand = eval(engine, frame, operand)?;
            eval_unary(engine, *op, operand)
        }
        LExpr::Binary(BinaryOp::And, lhs, rhs) => {
            let lhs = eval(engine, frame, lhs)?;
            if !lhs.truthy() { Ok(lhs) } else { eval(engine, frame, rhs) }
        }
        LExpr::Binary(BinaryOp::Or, lhs, rhs) => {
            let lhs = eval(engine, frame, lhs)?;
            if lhs.truthy() { Ok(lhs) } else { eval(engine, frame, rhs) }
        }
        LExpr::Binary(op, lhs, rhs) => {
            let lhs = eval(engine, frame, lhs)?;
            let rhs = eval(engine, frame, rhs)?;
            eval_binary(engine, *op, lhs, rhs)
        }
        LExpr::Method { receiver, name, args } => {
            let receiver = eval(engine, frame, receiver)?;
            let args = eval_all(engine, frame, args)?;
            call_method(engine, receiver, *name, args)
        }
        LExpr::Call { callee, args } => {
            let callee = eval(engine, frame, callee)?;
            let args = eval_all(engine, frame, args)?;
            if !matches!(callee, Value::Record(_)) {
                return failf!(ErrorKind::Runtime, "'{}' object is not callable", callee.kind_name());
            }
            dispatch_operator(engine, OperatorKind::Call, callee, args)
        }
        LExpr::New { class, target, args } => {
            let spec = match target.get() {
                Some(spec) => *spec,
                None => {
                    let spec = new_target(engine, class)?;
                    let _ = target.set(spec);
                    spec
                }
            };
            let args = eval_all(engine, frame, args)?;
            construct(engine, spec, args)
        }
        LExpr::NewList(element) => Ok(Value::new_list(*element, Vec::new())),
        LExpr::NewDict(key, value) => Ok(Value::new_dict(*key, *value)),
        LExpr::Tuple(elements) => {
            let values = eval_all(engine, frame, elements)?;
            Ok(Value::Tuple(values.into()))
        }
        LExpr::Index(target, index) => {
            let target = eval(engine, frame, target)?;
            let index = eval(engine, frame, index)?;
            eval_index(engine, target, index)
        }
        LExpr::SetIndex(target, index, value) => {
            let target = eval(engine, frame, target)?;
            let index = eval(engine, frame, index)?;
            let value = eval(engine, frame, value)?;
            eval_set_index(engine, target, index, value)
        }
        LExpr::Len(target) => {
            let target = eval(engine, frame, target)?;
            eval_len(engine, target)
        }
        LExpr::If(cond, cons, alt) => {
            if eval(engine, frame, cond)?.truthy() {
                eval(engine, frame, cons)
            } else {
                eval(engine, frame, alt)
            }
        }
        LExpr::While(cond, body) => {
            while eval(engine, frame, cond)?.truthy() {
                eval(engine, frame, body)?;
            }
            Ok(Value::None)
        }
        LExpr::Block(es) => {
            let mut last = Value::None;
            for e in es {
                last = eval(engine, frame, e)?;
            }
            Ok(last)
        }
        LExpr::Raise(message) => failf!(ErrorKind::Runtime, "{message}"),
    }
}

fn new_target(engine: &mut JitEngine, class: &TypeExpr) -> JitResult<SpecializationId> {
    match class {
        TypeExpr::Class { class, args } => {
            let args = engine.resolve_type_list(args, &ParameterBinding::empty())?;
            engine.specialize_resolved(*class, &args)
        }
        TypeExpr::Alias(alias) => engine.alias_specialization(*alias),
        other => failf!(
            ErrorKind::TypeMismatch,
            "Cannot instantiate {}: not a class",
            engine.type_expr_to_string(other)
        ),
    }
}

fn eval_unary(engine: &mut JitEngine, op: UnaryOp, operand: Value) -> JitResult<Value> {
    match (op, operand) {
        (UnaryOp::Not, v) => Ok(Value::Bool(!v.truthy())),
        (UnaryOp::Neg, Value::Int(i)) => match i.checked_neg() {
            Some(n) => Ok(Value::Int(n)),
            None => failf!(ErrorKind::Runtime, "integer overflow negating {i}"),
        },
        (UnaryOp::Neg, Value::Bool(b)) => Ok(Value::Int(-(b as i64))),
        (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::Neg, v @ Value::Record(_)) => dispatch_operator(engine, OperatorKind::Neg, v, vec![]),
        (UnaryOp::Neg, v) => failf!(ErrorKind::Runtime, "bad operand type for unary -: '{}'", v.kind_name()),
    }
}

fn eval_len(engine: &mut JitEngine, target: Value) -> JitResult<Value> {
    let len = match &target {
        Value::Str(s) => s.chars().count(),
        Value::List(list) => list.items.borrow().len(),
        Value::Dict(dict) => dict.entries.borrow().len(),
        Value::Tuple(t) => t.len(),
        Value::Record(_) => return dispatch_operator(engine, OperatorKind::Len, target, vec![]),
        other => {
            return failf!(ErrorKind::Runtime, "object of type '{}' has no len()", other.kind_name());
        }
    };
    Ok(Value::Int(len as i64))
}

fn eval_index(engine: &mut JitEngine, target: Value, index: Value) -> JitResult<Value> {
    match &target {
        Value::List(list) => {
            let items = list.items.borrow();
            Ok(items[list_index(items.len(), &index)?].clone())
        }
        Value::Tuple(t) => Ok(t[list_index(t.len(), &index)?].clone()),
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let c = chars[list_index(chars.len(), &index)?];
            Ok(Value::Str(c.to_string().into()))
        }
        Value::Dict(dict) => {
            let key = dict_key(&index)?;
            match dict.entries.borrow().get(&key) {
                Some(value) => Ok(value.clone()),
                None => failf!(ErrorKind::Runtime, "KeyError: {:?}", key),
            }
        }
        Value::Record(_) => dispatch_operator(engine, OperatorKind::GetItem, target, vec![index]),
        other => failf!(ErrorKind::Runtime, "'{}' object is not subscriptable", other.kind_name()),
    }
}

fn eval_set_index(
    engine: &mut JitEngine,
    target: Value,
    index: Value,
    value: Value,
) -> JitResult<Value> {
    match &target {
        Value::List(list) => {
            let value = value.coerce_handle(&engine.types, &engine.idents, list.element)?;
            let mut items = list.items.borrow_mut();
            let i = list_index(items.len(), &index)?;
            items[i] = value;
            Ok(Value::None)
        }
        Value::Dict(dict) => {
            let key = index.coerce(&engine.types, &engine.idents, dict.key)?;
            let key = dict_key(&key)?;
            let value = value.coerce_handle(&engine.types, &engine.idents, dict.value)?;
            dict.entries.borrow_mut().insert(key, value);
            Ok(Value::None)
        }
        Value::Record(_) => {
            dispatch_operator(engine, OperatorKind::SetItem, target, vec![index, value])
        }
        other => failf!(
            ErrorKind::Runtime,
            "'{}' object does not support item assignment",
            other.kind_name()
        ),
    }
}

#[derive(Debug, Clone, Copy)]
enum Num {
    I(i64),
    F(f64),
}

impl Num {
    fn of(value: &Value) -> Option<Num> {
        match value {
            Value::Int(i) => Some(Num::I(*i)),
            Value::Bool(b) => Some(Num::I(*b as i64)),
            Value::Float(f) => Some(Num::F(*f)),
            _ => None,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::I(i) => i as f64,
            Num::F(f) => f,
        }
    }
}

fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    if (a % b != 0) && ((a < 0) != (b < 0)) { q.checked_sub(1) } else { Some(q) }
}

fn floor_mod(a: i64, b: i64) -> Option<i64> {
    let r = a.checked_rem(b)?;
    if r != 0 && ((r < 0) != (b < 0)) { Some(r + b) } else { Some(r) }
}

fn float_mod(a: f64, b: f64) -> f64 {
    let r = a % b;
    if r != 0.0 && ((r < 0.0) != (b < 0.0)) { r + b } else { r }
}

fn arithmetic(op: BinaryOp, a: Num, b: Num) -> JitResult<Value> {
    let is_zero = match b {
        Num::I(i) => i == 0,
        Num::F(f) => f == 0.0,
    };
    if is_zero && matches!(op, BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Mod) {
        return failf!(ErrorKind::Runtime, "division by zero");
    }
    if let (Num::I(x), Num::I(y)) = (a, b) {
        let result = match op {
            BinaryOp::Add => x.checked_add(y),
            BinaryOp::Sub => x.checked_sub(y),
            BinaryOp::Mul => x.checked_mul(y),
            BinaryOp::FloorDiv => floor_div(x, y),
            BinaryOp::Mod => floor_mod(x, y),
            BinaryOp::Div => return Ok(Value::Float(x as f64 / y as f64)),
            _ => None,
        };
        return match result {
            Some(v) => Ok(Value::Int(v)),
            None => failf!(ErrorKind::Runtime, "integer overflow in {x} {op} {y}"),
        };
    }
    let (x, y) = (a.as_f64(), b.as_f64());
    let result = match op {
        BinaryOp::Add => x + y,
        BinaryOp::Sub => x - y,
        BinaryOp::Mul => x * y,
        BinaryOp::Div => x / y,
        BinaryOp::FloorDiv => (x / y).floor(),
        BinaryOp::Mod => float_mod(x, y),
        _ => return failf!(ErrorKind::Runtime, "unsupported numeric operator {op}"),
    };
    Ok(Value::Float(result))
}

fn repeat_str(s: &str, n: i64) -> JitResult<Value> {
    let count = usize::try_from(n.max(0)).unwrap_or(usize::MAX);
    if s.is_empty() || count == 0 {
        return Ok(Value::Str(EcoString::new()));
    }
    match s.len().checked_mul(count) {
        Some(len) if len <= MAX_STRING_LEN => Ok(Value::Str(s.repeat(count).into())),
        _ => failf!(ErrorKind::Runtime, "repeated string would exceed {MAX_STRING_LEN} bytes"),
    }
}

fn compare(op: BinaryOp, ordering: std::cmp::Ordering) -> Value {
    use std::cmp::Ordering as O;
    Value::Bool(match op {
        BinaryOp::Lt => ordering == O::Less,
        BinaryOp::Le => ordering != O::Greater,
        BinaryOp::Gt => ordering == O::Greater,
        BinaryOp::Ge => ordering != O::Less,
        _ => false,
    })
}

fn eval_contains(engine: &mut JitEngine, item: Value, container: Value) -> JitResult<Value> {
    let found = match &container {
        Value::Record(_) => {
            return dispatch_operator(engine, OperatorKind::Contains, container, vec![item]);
        }
        Value::List(list) => list.items.borrow().iter().any(|v| v.native_eq(&item)),
        Value::Tuple(t) => t.iter().any(|v| v.native_eq(&item)),
        Value::Dict(dict) => match item.to_dict_key() {
            Some(key) => dict.entries.borrow().contains_key(&key),
            None => false,
        },
        Value::Str(s) => match item.as_str() {
            Some(needle) => s.contains(needle),
            None => {
                return failf!(
                    ErrorKind::Runtime,
                    "'in <string>' requires string as left operand, not {}",
                    item.kind_name()
                );
            }
        },
        other => {
            return failf!(ErrorKind::Runtime, "argument of type '{}' is not iterable", other.kind_name());
        }
    };
    Ok(Value::Bool(found))
}

pub(crate) fn eval_binary(engine: &mut JitEngine, op: BinaryOp, lhs: Value, rhs: Value) -> JitResult<Value> {
    if op == BinaryOp::In {
        return eval_contains(engine, lhs, rhs);
    }
    if let Value::Record(record) = &lhs {
        let kind = OperatorKind::from_binary(op);
        if let Some(method) = kind.and_then(|k| record_operator(engine, record, k)) {
            return invoke(engine, &method, lhs, vec![rhs]);
        }
        match op {
            BinaryOp::Eq => return Ok(Value::Bool(lhs.native_eq(&rhs))),
            BinaryOp::Ne => {
                return match record_operator(engine, record, OperatorKind::Eq) {
                    Some(eq) => Ok(Value::Bool(!invoke(engine, &eq, lhs, vec![rhs])?.truthy())),
                    None => Ok(Value::Bool(!lhs.native_eq(&rhs))),
                };
            }
            _ => {}
        }
    }
    match op {
        BinaryOp::Eq => return Ok(Value::Bool(lhs.native_eq(&rhs))),
        BinaryOp::Ne => return Ok(Value::Bool(!lhs.native_eq(&rhs))),
        _ => {}
    }
    match (&lhs, &rhs) {
        (Value::Str(a), Value::Str(b)) => match op {
            BinaryOp::Add => {
                let mut s = a.clone();
                s.push_str(b);
                return Ok(Value::Str(s));
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                return Ok(compare(op, a.as_str().cmp(b.as_str())));
            }
            _ => {}
        },
        (Value::Str(s), Value::Int(n)) if op == BinaryOp::Mul => return repeat_str(s, *n),
        _ => {}
    }
    if let (Some(a), Some(b)) = (Num::of(&lhs), Num::of(&rhs)) {
        return match op {
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let ordering = match (a, b) {
                    (Num::I(x), Num::I(y)) => x.cmp(&y),
                    _ => match a.as_f64().partial_cmp(&b.as_f64()) {
                        Some(ordering) => ordering,
                        // NaN compares false against everything
                        None => return Ok(Value::Bool(false)),
                    },
                };
                Ok(compare(op, ordering))
            }
            _ => arithmetic(op, a, b),
        };
    }
    failf!(
        ErrorKind::Runtime,
        "unsupported operand type(s) for {op}: '{}' and '{}'",
        value_type_name(engine, &lhs),
        value_type_name(engine, &rhs)
    )
}
