use crate::body::*;
use crate::class::ClassBuilder;
use crate::error::ErrorKind;
use crate::testing::*;
use crate::type_expr::TypeExpr;
use crate::types::*;

fn kind_body(engine: &crate::engine::JitEngine, spec: crate::specialize::SpecializationId) -> Expr {
    let kind = engine.idents.get("kind").unwrap();
    engine.specialization(spec).method(kind).unwrap().body.clone()
}

#[test]
fn binding_substitutes_parameters() {
    let mut engine = engine();
    let class = engine.register(box_class()).unwrap();
    let spec = engine.specialize(class, &["int".into()]).unwrap();
    let Expr::If(cond, _, _) = kind_body(&engine, spec) else { panic!("expected an if") };
    let Expr::TypeIs(lhs, _) = *cond else { panic!("expected a type test") };
    assert_eq!(lhs, TypeExpr::Native(I64_TYPE_ID));
}

#[test]
fn binding_leaves_declaration_untouched() {
    let mut engine = engine();
    let class = engine.register(box_class()).unwrap();
    let int_spec = engine.specialize(class, &["int".into()]).unwrap();
    let str_spec = engine.specialize(class, &["str".into()]).unwrap();
    assert_ne!(kind_body(&engine, int_spec), kind_body(&engine, str_spec));

    let kind = engine.idents.get("kind").unwrap();
    let decl = engine.class_decl(class).clone();
    let declared = decl.methods.iter().find(|m| m.name == kind).unwrap();
    let mut params = Vec::new();
    declared
        .body
        .try_map_types(&mut |ty: &TypeExpr| {
            if let TypeExpr::Param(p) = ty {
                params.push(p.clone());
            }
            Ok(ty.clone())
        })
        .unwrap();
    assert_eq!(params.len(), 2);
    assert!(params.iter().all(|p| p.name.as_str() == "T"));
}

#[test]
fn own_class_becomes_concrete_class() {
    let mut engine = engine();
    let class = engine.register(pair_class()).unwrap();
    let spec = engine.specialize(class, &["int".into(), "str".into()]).unwrap();
    let swap = engine.idents.get("swap").unwrap();
    let Expr::New { class: target, .. } = &engine.specialization(spec).method(swap).unwrap().body
    else {
        panic!("expected a construction")
    };
    assert_eq!(
        target,
        &TypeExpr::Class {
            class,
            args: [TypeExpr::Native(UNICODE_TYPE_ID), TypeExpr::Native(I64_TYPE_ID)].into_iter().collect()
        }
    );
}

#[test]
fn foreign_parameter_in_body() {
    let mut engine = engine();
    let other = ClassBuilder::generic("Other", &["U"]);
    let mut b = ClassBuilder::generic("Leaky", &["T"]);
    b.member("value", b.param("T"));
    b.method("make", &[], new_list(other.param("U")));
    let class = engine.register(b).unwrap();
    let err = engine.specialize(class, &["int".into()]).unwrap_err();
    assert!(err.is(ErrorKind::UnresolvedParameterReference));
    assert_eq!(err.message, "in Leaky.make: Type parameter U does not belong to Leaky");
    assert_eq!(engine.specializations_of(class).count(), 0);
}

#[test]
fn unknown_name_in_body() {
    let mut engine = engine();
    let mut b = ClassBuilder::generic("Typo", &["T"]);
    b.member("items", "List[T]");
    b.constructor(&[], set_field(self_(), "items", new_list("Q")));
    let class = engine.register(b).unwrap();
    let err = engine.specialize(class, &["int".into()]).unwrap_err();
    assert!(err.is(ErrorKind::UnresolvedParameterReference), "{err}");
    assert!(err.message.starts_with("in Typo.__init__: 'Q' refers to a name"), "{err}");
}

#[test]
fn compiled_flag_is_carried() {
    let mut engine = engine();
    let class = engine.register(box_class()).unwrap();
    let spec = engine.specialize(class, &["float".into()]).unwrap();
    let spec = engine.specialization(spec);
    assert!(spec.all_methods().all(|m| m.compile && m.owner == class));
    assert!(spec.constructor.is_constructor);
    assert_eq!(spec.constructor.record_type, spec.record_type);
}
