use std::num::NonZeroU32;

use crate::class::ClassId;
use crate::error::ErrorKind;
use crate::idents::Identifiers;
use crate::types::*;

fn class_id() -> ClassId {
    ClassId::from(NonZeroU32::MIN)
}

#[test]
fn record_layout_1() {
    let mut l = Layout::ZERO;
    l.append_to_aggregate(Layout::from_scalar_bytes(8));
    assert_eq!(l.size, 8);
    assert_eq!(l.align, 8);
    assert_eq!(l.stride, 8);
    l.append_to_aggregate(Layout::from_scalar_bytes(1));
    assert_eq!(l.size, 9);
    assert_eq!(l.align, 8);
    assert_eq!(l.stride, 16);
    l.append_to_aggregate(Layout::from_scalar_bytes(4));
    assert_eq!(l.size, 16);
    assert_eq!(l.align, 8);
    assert_eq!(l.stride, 16);
}

#[test]
fn add_zero_no_change() {
    let mut l = Layout::ZERO;
    let o1 = l.append_to_aggregate(Layout::from_scalar_bytes(8));
    assert_eq!(o1, 0);
    let o2 = l.append_to_aggregate(Layout::from_scalar_bytes(1));
    assert_eq!(o2, 8);
    let o3 = l.append_to_aggregate(Layout::ZERO);
    assert_eq!(o3, 9);
    assert_eq!(l.size, 9);
    assert_eq!(l.align, 8);
    assert_eq!(l.stride, 16);
}

#[test]
fn containers_are_interned_structurally() {
    let mut types = Types::new();
    let a = types.list_of(I64_TYPE_ID);
    let b = types.list_of(I64_TYPE_ID);
    let c = types.list_of(F64_TYPE_ID);
    assert_eq!(a, b);
    assert_ne!(a, c);
    let d1 = types.dict_of(UNICODE_TYPE_ID, a);
    let d2 = types.dict_of(UNICODE_TYPE_ID, b);
    assert_eq!(d1, d2);
    let t1 = types.tuple_of(&[I8_TYPE_ID, BOOL_TYPE_ID]);
    let t2 = types.tuple_of(&[BOOL_TYPE_ID, I8_TYPE_ID]);
    assert_ne!(t1, t2);
}

#[test]
fn tuple_layout_is_an_aggregate() {
    let mut types = Types::new();
    let t = types.tuple_of(&[I8_TYPE_ID, I64_TYPE_ID, BOOL_TYPE_ID]);
    let layout = types.layout_of(t).unwrap();
    assert_eq!(layout.size, 17);
    assert_eq!(layout.align, 8);
    assert_eq!(layout.stride, 24);
}

#[test]
fn record_fields_get_offsets() {
    let mut idents = Identifiers::default();
    let mut types = Types::new();
    let name = idents.intern("Pair");
    let record_type = types.reserve_record(name, class_id(), &[I8_TYPE_ID, F64_TYPE_ID]);
    assert!(types.is_pending_record(record_type));

    let first = idents.intern("first");
    let second = idents.intern("second");
    let layout = types
        .complete_record(record_type, &[(first, I8_TYPE_ID), (second, F64_TYPE_ID)], &idents)
        .unwrap();
    assert_eq!(layout, Layout { size: 16, align: 8, stride: 16 });
    assert!(!types.is_pending_record(record_type));

    let record = types.record(record_type).unwrap();
    let (index, field) = record.find_field(second).unwrap();
    assert_eq!(index, 1);
    assert_eq!(field.offset, 8);
    assert_eq!(types.type_to_string(record_type, &idents), "Pair[int8, float64]");
}

#[test]
fn records_are_nominal() {
    let mut idents = Identifiers::default();
    let mut types = Types::new();
    let name = idents.intern("Box");
    let a = types.reserve_record(name, class_id(), &[I64_TYPE_ID]);
    let b = types.reserve_record(name, class_id(), &[I64_TYPE_ID]);
    assert_ne!(a, b);
}

#[test]
fn pending_record_cannot_be_stored_by_value() {
    let mut idents = Identifiers::default();
    let mut types = Types::new();
    let name = idents.intern("Node");
    let node = types.reserve_record(name, class_id(), &[]);
    let next = idents.intern("next");

    let err = types.complete_record(node, &[(next, node)], &idents).unwrap_err();
    assert!(err.is(ErrorKind::RecursiveLayout));
    assert!(err.message.contains("field 'next' of Node"));

    // Still pending, but a list of itself is only a handle
    let list_of_node = types.list_of(node);
    let children = idents.intern("children");
    let layout = types.complete_record(node, &[(children, list_of_node)], &idents).unwrap();
    assert_eq!(layout, Layout::HANDLE);
}

#[test]
fn display_nested_containers() {
    let idents = Identifiers::default();
    let mut types = Types::new();
    let list = types.list_of(F32_TYPE_ID);
    let dict = types.dict_of(UNICODE_TYPE_ID, list);
    let tuple = types.tuple_of(&[dict, I16_TYPE_ID]);
    assert_eq!(
        types.type_to_string(tuple, &idents),
        "Tuple[Dict[unicode, List[float32]], int16]"
    );
}

#[test]
fn only_scalars_are_hashable() {
    let mut types = Types::new();
    assert!(types.is_hashable(UNICODE_TYPE_ID));
    assert!(types.is_hashable(I32_TYPE_ID));
    assert!(!types.is_hashable(F64_TYPE_ID));
    let list = types.list_of(I64_TYPE_ID);
    assert!(!types.is_hashable(list));
}
