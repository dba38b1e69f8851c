use crate::class::OperatorKind;
use crate::error::ErrorKind;
use crate::testing::*;
use crate::value::Value;

#[test]
fn properties_follow_declaration_order() {
    let mut engine = engine();
    engine.register(pair_class()).unwrap();
    let alias = engine.alias_of("Pair[str, float]").unwrap();
    let pair = engine.instantiate(alias, vec!["a".into(), Value::Int(2)]).unwrap();
    let props = engine.properties(&pair);
    let names: Vec<&str> = props.iter().map(|(name, _)| *name).collect();
    assert_eq!(names, vec!["first", "second"]);
    // The int argument was widened on store
    assert_eq!(props[1].1.as_float(), Some(2.0));
}

#[test]
fn set_property_coerces_and_checks() {
    let mut engine = engine();
    engine.register(box_class()).unwrap();
    let alias = engine.alias_of("Box[int8]").unwrap();
    let b = engine.instantiate(alias, vec![Value::Int(1)]).unwrap();
    engine.set_property(&b, "value", Value::Int(100)).unwrap();
    assert_eq!(engine.get_property(&b, "value").unwrap().as_int(), Some(100));

    let err = engine.set_property(&b, "value", Value::Int(1000)).unwrap_err();
    assert!(err.is(ErrorKind::TypeMismatch));
    let err = engine.set_property(&b, "value", "x".into()).unwrap_err();
    assert!(err.is(ErrorKind::TypeMismatch));
    assert_eq!(engine.get_property(&b, "value").unwrap().as_int(), Some(100));

    let err = engine.get_property(&b, "never_interned_name").unwrap_err();
    assert!(err.is(ErrorKind::UnknownName));
    assert_eq!(err.message, "Box[int8] has no member never_interned_name");
}

#[test]
fn proxies_share_the_record() {
    let mut engine = engine();
    engine.register(box_class()).unwrap();
    let alias = engine.alias_of("Box[str]").unwrap();
    let a = engine.instantiate(alias, vec!["one".into()]).unwrap();
    let b = engine.box_value(&a.unbox()).unwrap();
    assert!(a.same_instance(&b));
    engine.call_method(&b, "set", vec!["two".into()]).unwrap();
    assert_eq!(engine.get_property(&a, "value").unwrap().as_str(), Some("two"));
    assert_eq!(a.record_type(), engine.specialization(a.specialization()).record_type);
}

#[test]
fn only_registered_records_box() {
    let mut engine = engine();
    let err = engine.box_value(&Value::Int(3)).unwrap_err();
    assert!(err.is(ErrorKind::TypeMismatch));
    assert_eq!(err.message, "Only records can be boxed, got a int value");

    engine.register(box_class()).unwrap();
    let alias = engine.alias_of("Box[int]").unwrap();
    engine.call(alias, vec![Value::Int(1)]).unwrap();
    assert_eq!(engine.boxing.len(), 1);
}

#[test]
fn instance_checks() {
    let mut engine = engine();
    let box_id = engine.register(box_class()).unwrap();
    engine.register(pair_class()).unwrap();
    let int_box = engine.alias_of("Box[int]").unwrap();
    let int64_box = engine.alias_of("Box[int64]").unwrap();
    let str_box = engine.alias_of("Box[str]").unwrap();
    let pair = engine.alias_of("Pair[int, int]").unwrap();
    let value = engine.call(int_box, vec![Value::Int(1)]).unwrap();

    assert!(engine.is_instance(&value, engine.class_alias(box_id)));
    assert!(engine.is_instance(&value, int_box));
    assert!(engine.is_instance(&value, int64_box));
    assert!(!engine.is_instance(&value, str_box));
    assert!(!engine.is_instance(&value, pair));
    assert!(!engine.is_instance(&Value::Int(1), engine.class_alias(box_id)));
}

#[test]
fn inequality_falls_back_to_eq() {
    let mut engine = engine();
    engine.register(box_class()).unwrap();
    engine.register(stack_class()).unwrap();
    let alias = engine.alias_of("Box[int]").unwrap();
    let a = engine.instantiate(alias, vec![Value::Int(1)]).unwrap();
    let b = engine.instantiate(alias, vec![Value::Int(1)]).unwrap();
    let c = engine.instantiate(alias, vec![Value::Int(2)]).unwrap();
    // Box defines __eq__ only
    let ne = engine.apply_operator(&a, OperatorKind::Ne, vec![b.unbox()]).unwrap();
    assert_eq!(ne.as_bool(), Some(false));
    let ne = engine.apply_operator(&a, OperatorKind::Ne, vec![c.unbox()]).unwrap();
    assert_eq!(ne.as_bool(), Some(true));
    let eq = engine.apply_operator(&a, OperatorKind::Eq, vec![b.unbox()]).unwrap();
    assert_eq!(eq.as_bool(), Some(true));

    // No __eq__ at all: identity
    let stack_alias = engine.alias_of("Stack[int]").unwrap();
    let s = engine.instantiate(stack_alias, vec![]).unwrap();
    let t = engine.instantiate(stack_alias, vec![]).unwrap();
    let eq = engine.apply_operator(&s, OperatorKind::Eq, vec![s.unbox()]).unwrap();
    assert_eq!(eq.as_bool(), Some(true));
    let ne = engine.apply_operator(&s, OperatorKind::Ne, vec![t.unbox()]).unwrap();
    assert_eq!(ne.as_bool(), Some(true));
}

#[test]
fn method_listing_and_dispatch() {
    let mut engine = engine();
    engine.register(stack_class()).unwrap();
    let alias = engine.alias_of("Stack[str]").unwrap();
    let stack = engine.instantiate(alias, vec![]).unwrap();
    assert_eq!(
        engine.method_names(&stack),
        vec!["__contains__", "__len__", "peek", "pop", "push"]
    );
    engine.call_method(&stack, "push", vec!["x".into()]).unwrap();
    let len = engine.apply_operator(&stack, OperatorKind::Len, vec![]).unwrap();
    assert_eq!(len.as_int(), Some(1));

    let err = engine.call_method(&stack, "missing_method", vec![]).unwrap_err();
    assert!(err.is(ErrorKind::UnknownName));
    let err = engine.apply_operator(&stack, OperatorKind::Neg, vec![]).unwrap_err();
    assert!(err.is(ErrorKind::Runtime));
    let err = engine.call_method(&stack, "push", vec![]).unwrap_err();
    assert!(err.is(ErrorKind::ArityMismatch));
}
