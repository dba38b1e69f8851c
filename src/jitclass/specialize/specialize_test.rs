// Copyright (c) 2025 knix
// All rights reserved.

use crate::body::*;
use crate::class::{ClassBuilder, OperatorKind};
use crate::config::EngineConfig;
use crate::error::ErrorKind;
use crate::testing::*;
use crate::type_expr::TypeExpr;
use crate::types::*;
use crate::value::Value;

#[test]
fn same_args_same_specialization() {
    let mut engine = engine();
    let class = engine.register(box_class()).unwrap();
    let a = engine.specialize(class, &["int".into()]).unwrap();
    let count = engine.specialization_count();
    let b = engine.specialize(class, &["int64".into()]).unwrap();
    let c = engine.specialize(class, &[TypeExpr::Native(I64_TYPE_ID)]).unwrap();
    assert_eq!(a, b);
    assert_eq!(a, c);
    assert_eq!(engine.specialization_count(), count);

    let d = engine.specialize(class, &["str".into()]).unwrap();
    assert_ne!(a, d);
    assert_ne!(engine.specialization(a).record_type, engine.specialization(d).record_type);
}

#[test]
fn arity_mismatch_leaves_cache_untouched() {
    let mut engine = engine();
    let class = engine.register(pair_class()).unwrap();
    let err = engine.specialize(class, &["int".into()]).unwrap_err();
    assert!(err.is(ErrorKind::ArityMismatch));
    assert_eq!(err.message, "Pair takes exactly 2 type arguments. 1 provided: [int]");
    assert_eq!(engine.specializations_of(class).count(), 0);

    let err = engine.specialize(class, &["int".into(), "int".into(), "int".into()]).unwrap_err();
    assert!(err.is(ErrorKind::ArityMismatch));

    // The failed attempts do not poison a correct retry
    let spec = engine.specialize(class, &["int".into(), "str".into()]).unwrap();
    assert_eq!(engine.specializations_of(class).collect::<Vec<_>>(), vec![spec]);
}

#[test]
fn failed_specialization_is_retryable() {
    let mut engine = engine();
    let class = engine.register(box_class()).unwrap();
    let err = engine.specialize(class, &["Dict[float, int]".into()]).unwrap_err();
    assert!(err.is(ErrorKind::UnsupportedTypeArgument));
    assert_eq!(engine.specializations_of(class).count(), 0);
    assert!(engine.specialize(class, &["Dict[str, int]".into()]).is_ok());
}

#[test]
fn list_member_round_trip() {
    let mut engine = engine();
    let class = engine.register(stack_class()).unwrap();
    let spec = engine.specialize(class, &["int".into()]).unwrap();
    let record_type = engine.specialization(spec).record_type;
    let record = engine.types.record(record_type).unwrap();
    assert_eq!(record.fields.len(), 1);
    let items_type = record.fields[0].type_id;
    assert_eq!(engine.types.get(items_type), &NativeType::List(I64_TYPE_ID));
    assert_eq!(engine.types.type_to_string(record_type, &engine.idents), "Stack[int64]");
}

#[test]
fn nested_specializations_are_shared() {
    let mut engine = engine();
    let box_id = engine.register(box_class()).unwrap();
    let mut holder = ClassBuilder::generic("Holder", &["T"]);
    holder.member("inner", "Box[T]");
    holder.member("many", "List[Box[T]]");
    let holder_id = engine.register(holder).unwrap();

    let direct = engine.specialize(box_id, &["float".into()]).unwrap();
    let h = engine.specialize(holder_id, &["float".into()]).unwrap();
    let holder_record = engine.types.record(engine.specialization(h).record_type).unwrap();
    let inner_type = holder_record.fields[0].type_id;
    let many_type = holder_record.fields[1].type_id;
    assert_eq!(inner_type, engine.specialization(direct).record_type);
    assert_eq!(engine.types.get(many_type), &NativeType::List(inner_type));
    assert_eq!(engine.specializations_of(box_id).count(), 1);
}

#[test]
fn nested_request_before_direct_one() {
    let mut engine = engine();
    let box_id = engine.register(box_class()).unwrap();
    let mut holder = ClassBuilder::generic("Holder", &["T"]);
    holder.member("inner", "Box[List[T]]");
    let holder_id = engine.register(holder).unwrap();
    engine.specialize(holder_id, &["int".into()]).unwrap();
    let before = engine.specializations_of(box_id).collect::<Vec<_>>();
    let direct = engine.specialize(box_id, &["List[int]".into()]).unwrap();
    assert_eq!(before, vec![direct]);
}

#[test]
fn failed_outer_rolls_back_nested_specializations() {
    let mut engine = engine();
    let mut back = ClassBuilder::generic("Back", &["X"]);
    back.member("items", "List[X]");
    let back = engine.register(back).unwrap();
    let mut outer = ClassBuilder::generic("Outer", &["T", "K"]);
    outer.member("inner", "Back[Outer[T, K]]");
    outer.member("lookup", "Dict[K, int]");
    let outer = engine.register(outer).unwrap();
    let boxed = engine.boxing.len();

    // Back[Outer[int64, float64]] is published before the Dict member fails
    let err = engine.specialize(outer, &["int".into(), "float".into()]).unwrap_err();
    assert!(err.is(ErrorKind::UnsupportedTypeArgument), "{err}");
    assert_eq!(engine.specializations_of(back).count(), 0);
    assert_eq!(engine.specialization_count(), 0);
    assert_eq!(engine.boxing.len(), boxed);
    assert!(engine.nested_published.is_empty());

    let spec = engine.specialize(outer, &["int".into(), "str".into()]).unwrap();
    let outer_record = engine.specialization(spec).record_type;
    let backs: Vec<_> = engine.specializations_of(back).collect();
    assert_eq!(backs.len(), 1);
    let back_record = engine.types.record(engine.specialization(backs[0]).record_type).unwrap();
    assert_eq!(engine.types.get(back_record.fields[0].type_id), &NativeType::List(outer_record));
    assert!(engine.nested_published.is_empty());
}

#[test]
fn specialize_by_name() {
    let mut engine = engine();
    let pair = engine.register(pair_class()).unwrap();
    let counter = engine.register(counter_class()).unwrap();
    let spec = engine.specialize_named("Pair", "int, List[float]").unwrap();
    assert_eq!(engine.specialization(spec).class, pair);
    assert_eq!(
        engine.types.type_to_string(engine.specialization(spec).record_type, &engine.idents),
        "Pair[int64, List[float64]]"
    );
    let spec = engine.specialize_named("Counter", "").unwrap();
    assert_eq!(engine.specialization(spec).class, counter);

    let err = engine.specialize_named("Nope", "int").unwrap_err();
    assert!(err.is(ErrorKind::UnknownType));
    assert_eq!(err.message, "No class named Nope");
    let err = engine.specialize_named("Pair", "int").unwrap_err();
    assert!(err.is(ErrorKind::ArityMismatch));
}

#[test]
fn self_reference_by_value_is_rejected() {
    let mut engine = engine();
    let mut b = ClassBuilder::generic("Loop", &["T"]);
    b.member("value", b.param("T"));
    b.member("next", "Loop[T]");
    let class = engine.register(b).unwrap();
    let err = engine.specialize(class, &["int".into()]).unwrap_err();
    assert!(err.is(ErrorKind::RecursiveLayout), "{err}");
    assert_eq!(engine.specializations_of(class).count(), 0);
    // Placeholder is cleared, so a second attempt fails the same way instead of hitting it
    let err = engine.specialize(class, &["int".into()]).unwrap_err();
    assert!(err.is(ErrorKind::RecursiveLayout));
}

#[test]
fn self_reference_in_tuple_is_rejected() {
    let mut engine = engine();
    let mut b = ClassBuilder::new("Knot");
    b.member("pair", "Tuple[int, Knot]");
    let err = engine.register(b).unwrap_err();
    assert!(err.is(ErrorKind::RecursiveLayout));
    // Registered even though its eager specialization failed
    assert!(engine.class_by_name("Knot").is_some());
}

#[test]
fn self_reference_through_list() {
    let mut engine = engine();
    let class = engine.register(node_class()).unwrap();
    let spec = engine.specialize(class, &["str".into()]).unwrap();
    let record_type = engine.specialization(spec).record_type;
    let record = engine.types.record(record_type).unwrap();
    assert_eq!(engine.types.get(record.fields[1].type_id), &NativeType::List(record_type));
}

#[test]
fn unbounded_nesting_hits_depth_limit() {
    let mut engine = engine_with(EngineConfig { max_nesting_depth: 8, ..EngineConfig::default() });
    let mut b = ClassBuilder::generic("Grow", &["T"]);
    b.member("value", b.param("T"));
    b.member("next", "Grow[List[T]]");
    let class = engine.register(b).unwrap();
    let err = engine.specialize(class, &["int".into()]).unwrap_err();
    assert!(err.is(ErrorKind::RecursiveLayout));
    assert!(err.message.contains("maximum nesting depth of 8"), "{err}");
    assert_eq!(engine.specialization_count(), 0);
    assert_eq!(engine.depth, 0);
}

#[test]
fn mutual_reference_through_list() {
    let mut engine = engine();
    let mut parent = ClassBuilder::generic("Parent", &["T"]);
    parent.member("value", parent.param("T"));
    let parent_id = engine.register(parent).unwrap();
    // Child refers to Parent, which is already registered; Parent cannot name Child
    let mut child = ClassBuilder::generic("Child", &["T"]);
    child.member("parent", "Parent[T]");
    child.member("siblings", "List[Child[T]]");
    let child_id = engine.register(child).unwrap();
    let c = engine.specialize(child_id, &["bool".into()]).unwrap();
    let p = engine.specialize(parent_id, &["bool".into()]).unwrap();
    let child_record = engine.types.record(engine.specialization(c).record_type).unwrap();
    assert_eq!(child_record.fields[0].type_id, engine.specialization(p).record_type);
}

#[test]
fn foreign_parameter_in_member_is_unbound() {
    let mut engine = engine();
    let other = ClassBuilder::generic("Other", &["U"]);
    let mut b = ClassBuilder::generic("Strange", &["T"]);
    b.member("value", other.param("U"));
    let class = engine.register(b).unwrap();
    let err = engine.specialize(class, &["int".into()]).unwrap_err();
    assert!(err.is(ErrorKind::UnboundParameter));
    assert_eq!(err.message, "member value: Type parameter U is not bound in Strange");
}

#[test]
fn unknown_member_type() {
    let mut engine = engine();
    let mut b = ClassBuilder::generic("Bad", &["T"]);
    b.member("value", "List[U]");
    let err = engine.register(b).unwrap_err();
    assert!(err.is(ErrorKind::UnknownType));
    assert!(engine.class_by_name("Bad").is_none());
}

#[test]
fn custom_new_is_rejected() {
    let mut engine = engine();
    let mut b = ClassBuilder::new("Weird");
    b.method("__new__", &[], Expr::Unit);
    let err = engine.register(b).unwrap_err();
    assert!(err.is(ErrorKind::UnsupportedOverride));
}

#[test]
fn duplicate_names() {
    let mut engine = engine();
    engine.register(box_class()).unwrap();
    assert!(engine.register(box_class()).unwrap_err().is(ErrorKind::DuplicateDefinition));
    assert!(engine.register(ClassBuilder::new("int")).unwrap_err().is(ErrorKind::DuplicateDefinition));
    let mut b = ClassBuilder::new("Twice");
    b.member("x", "int");
    b.member("x", "str");
    assert!(engine.register(b).unwrap_err().is(ErrorKind::DuplicateDefinition));
}

#[test]
fn operator_methods_share_one_binding() {
    let mut engine = engine();
    let class = engine.register(pair_class()).unwrap();
    let spec = engine.specialize(class, &["int".into(), "str".into()]).unwrap();
    let spec = engine.specialization(spec);
    for (kind, name) in [
        (OperatorKind::Eq, "__eq__"),
        (OperatorKind::GetItem, "__getitem__"),
        (OperatorKind::Len, "__len__"),
    ] {
        let by_name = spec.method(engine.idents.get(name).unwrap()).unwrap();
        let by_operator = spec.operator(kind).unwrap();
        assert!(std::rc::Rc::ptr_eq(by_name, by_operator), "{name}");
    }
    assert!(spec.operator(OperatorKind::Add).is_none());
}

#[test]
fn zero_parameter_class_is_specialized_on_register() {
    let mut engine = engine();
    let class = engine.register(counter_class()).unwrap();
    assert_eq!(engine.specializations_of(class).count(), 1);
    let spec = engine.specialize(class, &[]).unwrap();
    assert_eq!(engine.specializations_of(class).collect::<Vec<_>>(), vec![spec]);
}

#[test]
fn eager_compile_lowers_on_publish() {
    let mut engine = engine_with(EngineConfig { eager_compile: true, ..EngineConfig::default() });
    let class = engine.register(box_class()).unwrap();
    let spec = engine.specialize(class, &["int".into()]).unwrap();
    assert!(engine.specialization(spec).all_methods().all(|m| m.is_lowered()));
    assert!(engine.pending_compile.is_empty());

    let mut lazy = engine_with(EngineConfig::default());
    let class = lazy.register(box_class()).unwrap();
    let spec = lazy.specialize(class, &["int".into()]).unwrap();
    assert!(lazy.specialization(spec).all_methods().all(|m| !m.is_lowered()));
}

#[test]
fn compile_flag_precedence() {
    let mut engine = engine_with(EngineConfig { compile_methods: false, ..EngineConfig::default() });
    let mut b = ClassBuilder::new("Flags");
    b.options(crate::class::ClassOptions { compile_methods: Some(true) });
    b.method("a", &[], Expr::Unit);
    b.method_with("b", &[], Expr::Unit, crate::class::MethodOptions::with_compile(false));
    let class = engine.register(b).unwrap();
    let spec = engine.specialize(class, &[]).unwrap();
    let spec = engine.specialization(spec);
    assert!(spec.method(engine.idents.get("a").unwrap()).unwrap().compile);
    assert!(!spec.method(engine.idents.get("b").unwrap()).unwrap().compile);
    assert!(spec.constructor.compile);
}

#[test]
fn uncompiled_methods_are_lowered_per_call() {
    let mut engine = engine_with(EngineConfig { compile_methods: false, ..EngineConfig::default() });
    let class = engine.register(box_class()).unwrap();
    let alias = engine.index_class(class, &["int".into()]).unwrap();
    let value = engine.call(alias, vec![Value::Int(3)]).unwrap();
    let proxy = engine.box_value(&value).unwrap();
    assert_eq!(engine.call_method(&proxy, "get", vec![]).unwrap().as_int(), Some(3));
    let spec = engine.specialization(proxy.specialization());
    assert!(spec.all_methods().all(|m| !m.is_lowered()));
}

#[test]
fn incomplete_specialization_cannot_construct_itself() {
    let mut engine = engine();
    let mut b = ClassBuilder::generic("Eager", &["T"]);
    b.member("value", b.param("T"));
    let class = engine.register(b).unwrap();
    let key = engine.make_key(&["int".into()]).unwrap();
    // Simulate a request that arrives while the same key is being built
    let name = engine.class_decl(class).name;
    let placeholder = engine.types.reserve_record(name, class, key.as_slice());
    engine.classes.get_mut(class).in_progress.insert(key.clone(), placeholder);
    let err = engine.specialize_key(class, key.clone()).unwrap_err();
    assert!(err.is(ErrorKind::IncompleteSpecialization));
    assert_eq!(engine.record_type_for(class, key.as_slice()).unwrap(), placeholder);
}
