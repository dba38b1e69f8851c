use crate::error::ErrorKind;
use crate::testing::*;
use crate::type_expr::TypeExpr;
use crate::types::*;
use crate::value::Value;

#[test]
fn indexing_is_interned() {
    let mut engine = engine();
    let class = engine.register(box_class()).unwrap();
    let base = engine.class_alias(class);
    let a = engine.index(base, &["int".into()]).unwrap();
    let b = engine.index(base, &[TypeExpr::Native(I64_TYPE_ID)]).unwrap();
    let c = engine.alias_of("Box[int64]").unwrap();
    assert_eq!(a, b);
    assert_eq!(a, c);
    assert_ne!(a, base);
    assert_eq!(engine.alias_to_string(a), "Box[int64]");
    assert_eq!(engine.alias_to_string(base), "Box");
}

#[test]
fn indexing_does_not_specialize() {
    let mut engine = engine();
    let class = engine.register(box_class()).unwrap();
    let alias = engine.index_class(class, &["float".into()]).unwrap();
    assert_eq!(engine.specialization_count(), 0);
    let spec = engine.alias_specialization(alias).unwrap();
    assert_eq!(engine.specialize(class, &["float".into()]).unwrap(), spec);
}

#[test]
fn wrong_number_of_arguments() {
    let mut engine = engine();
    let class = engine.register(pair_class()).unwrap();
    let err = engine.index_class(class, &["int".into()]).unwrap_err();
    assert!(err.is(ErrorKind::ArityMismatch));
    let err = engine.alias_of("Pair[int, int, int]").unwrap_err();
    assert!(err.is(ErrorKind::ArityMismatch));
}

#[test]
fn applied_alias_cannot_be_indexed_again() {
    let mut engine = engine();
    let class = engine.register(box_class()).unwrap();
    let applied = engine.index_class(class, &["int".into()]).unwrap();
    let err = engine.index(applied, &["str".into()]).unwrap_err();
    assert!(err.is(ErrorKind::ArityMismatch));
    assert!(err.message.contains("partial application is not supported"), "{err}");
}

#[test]
fn unapplied_alias_cannot_construct() {
    let mut engine = engine();
    let class = engine.register(box_class()).unwrap();
    let base = engine.class_alias(class);
    assert!(!engine.alias(base).is_applied());
    let err = engine.call(base, vec![Value::Int(1)]).unwrap_err();
    assert!(err.is(ErrorKind::IncompleteSpecialization));
    assert_eq!(engine.specialization_count(), 0);
}

#[test]
fn unapplied_alias_is_not_a_type() {
    let mut engine = engine();
    let class = engine.register(box_class()).unwrap();
    let base = engine.class_alias(class);
    let err = engine.make_key(&[TypeExpr::Alias(base)]).unwrap_err();
    assert!(err.is(ErrorKind::IncompleteSpecialization));

    let applied = engine.index_class(class, &["int".into()]).unwrap();
    let key = engine.make_key(&[TypeExpr::Alias(applied)]).unwrap();
    let spec = engine.alias_specialization(applied).unwrap();
    assert_eq!(key.as_slice(), &[engine.specialization(spec).record_type]);
}

#[test]
fn alias_as_argument_of_another_alias() {
    let mut engine = engine();
    let class = engine.register(box_class()).unwrap();
    let inner = engine.index_class(class, &["int".into()]).unwrap();
    let outer = engine.index_class(class, &[inner.into()]).unwrap();
    assert_eq!(outer, engine.alias_of("Box[Box[int]]").unwrap());
    assert_eq!(engine.alias_to_string(outer), "Box[Box[int64]]");
}

#[test]
fn class_without_parameters_is_already_applied() {
    let mut engine = engine();
    let class = engine.register(counter_class()).unwrap();
    let base = engine.class_alias(class);
    assert!(engine.alias(base).is_applied());
    assert_eq!(engine.alias_of("Counter").unwrap(), base);
    let counter = engine.call(base, vec![]).unwrap();
    assert_eq!(engine.value_to_string(&counter), "Counter(count=0)");
}

#[test]
fn alias_of_a_non_class() {
    let mut engine = engine();
    let err = engine.alias_of("List[int]").unwrap_err();
    assert!(err.is(ErrorKind::TypeMismatch));
    let err = engine.alias_of("Missing[int]").unwrap_err();
    assert!(err.is(ErrorKind::UnknownType));
}
