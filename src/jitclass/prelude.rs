//! Sample classes, used by the command line tool and by tests

use log::debug;

use crate::body::BinaryOp::*;
use crate::body::*;
use crate::class::{ClassBuilder, ClassId};
use crate::engine::JitEngine;
use crate::error::JitResult;
use crate::type_expr::TypeExpr;

/// `Box[T]`: a single value
pub fn box_class() -> ClassBuilder {
    let mut b = ClassBuilder::generic("Box", &["T"]);
    let t = b.param("T");
    b.member("value", t.clone());
    b.constructor(&["value"], set_field(self_(), "value", local("value")));
    b.method("get", &[], field(self_(), "value"));
    b.method("set", &["value"], set_field(self_(), "value", local("value")));
    b.method(
        "kind",
        &[],
        if_(
            type_is(t.clone(), "int"),
            string("int"),
            if_(type_is(t, "str"), string("str"), string("other")),
        ),
    );
    b.method(
        "__eq__",
        &["other"],
        binary(Eq, field(self_(), "value"), field(local("other"), "value")),
    );
    b
}

/// `Pair[A, B]`
pub fn pair_class() -> ClassBuilder {
    let mut b = ClassBuilder::generic("Pair", &["A", "B"]);
    let (a, bb) = (b.param("A"), b.param("B"));
    b.member("first", a.clone());
    b.member("second", bb.clone());
    b.constructor(
        &["first", "second"],
        block(vec![
            set_field(self_(), "first", local("first")),
            set_field(self_(), "second", local("second")),
        ]),
    );
    b.method(
        "swap",
        &[],
        new(
            TypeExpr::own_class([bb, a]),
            vec![field(self_(), "second"), field(self_(), "first")],
        ),
    );
    b.method(
        "__eq__",
        &["other"],
        binary(
            And,
            binary(Eq, field(self_(), "first"), field(local("other"), "first")),
            binary(Eq, field(self_(), "second"), field(local("other"), "second")),
        ),
    );
    b.method(
        "__getitem__",
        &["i"],
        if_(
            binary(Eq, local("i"), int(0)),
            field(self_(), "first"),
            if_(
                binary(Eq, local("i"), int(1)),
                field(self_(), "second"),
                raise("Pair index out of range"),
            ),
        ),
    );
    b.method("__len__", &[], int(2));
    b
}

/// `Stack[T]`, backed by a list
pub fn stack_class() -> ClassBuilder {
    let mut b = ClassBuilder::generic("Stack", &["T"]);
    let t = b.param("T");
    b.member("items", "List[T]");
    b.constructor(&[], set_field(self_(), "items", new_list(t)));
    b.method("push", &["item"], method(field(self_(), "items"), "append", vec![local("item")]));
    b.method(
        "pop",
        &[],
        if_(
            binary(Eq, len(field(self_(), "items")), int(0)),
            raise("pop from empty stack"),
            method(field(self_(), "items"), "pop", vec![]),
        ),
    );
    b.method("peek", &[], index(field(self_(), "items"), int(-1)));
    b.method("__len__", &[], len(field(self_(), "items")));
    b.method("__contains__", &["item"], binary(In, local("item"), field(self_(), "items")));
    b
}

/// `Node[T]`: a tree whose children refer back to the class being declared
pub fn node_class() -> ClassBuilder {
    let mut b = ClassBuilder::generic("Node", &["T"]);
    let t = b.param("T");
    b.member("value", t.clone());
    b.member("children", "List[Node[T]]");
    b.constructor(
        &["value"],
        block(vec![
            set_field(self_(), "value", local("value")),
            set_field(self_(), "children", new_list(TypeExpr::own_class([t]))),
        ]),
    );
    b.method("add", &["child"], method(field(self_(), "children"), "append", vec![local("child")]));
    b.method(
        "size",
        &[],
        block(vec![
            let_("total", int(1)),
            let_("i", int(0)),
            while_(
                binary(Lt, local("i"), len(field(self_(), "children"))),
                block(vec![
                    assign(
                        "total",
                        binary(
                            Add,
                            local("total"),
                            method(index(field(self_(), "children"), local("i")), "size", vec![]),
                        ),
                    ),
                    assign("i", binary(Add, local("i"), int(1))),
                ]),
            ),
            local("total"),
        ]),
    );
    b
}

/// `Counter`: not generic, so it is specialized as soon as it is registered
pub fn counter_class() -> ClassBuilder {
    let mut b = ClassBuilder::new("Counter");
    b.member("count", "int");
    b.method(
        "increment",
        &["by"],
        block(vec![
            set_field(self_(), "count", binary(Add, field(self_(), "count"), local("by"))),
            field(self_(), "count"),
        ]),
    );
    b.method("__call__", &[], method(self_(), "increment", vec![int(1)]));
    b.method(
        "__add__",
        &["other"],
        block(vec![
            let_("sum", new(TypeExpr::OwnClass { args: Default::default() }, vec![])),
            set_field(
                local("sum"),
                "count",
                binary(Add, field(self_(), "count"), field(local("other"), "count")),
            ),
            local("sum"),
        ]),
    );
    b
}

pub fn register_prelude(engine: &mut JitEngine) -> JitResult<Vec<ClassId>> {
    let mut ids = Vec::with_capacity(5);
    for builder in [box_class(), pair_class(), stack_class(), node_class(), counter_class()] {
        ids.push(engine.register(builder)?);
    }
    debug!("Registered {} prelude classes", ids.len());
    Ok(ids)
}
