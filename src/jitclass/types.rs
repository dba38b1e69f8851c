use std::fmt::{Display, Formatter, Write};

use ahash::HashMapExt;
use fxhash::FxHashMap;
use log::trace;

use crate::class::ClassId;
use crate::error::{ErrorKind, JitResult};
use crate::idents::{Ident, Identifiers};
use crate::pool::Pool;
use crate::{SV4, failf, nz_u32_id};

#[cfg(test)]
mod types_test;

#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Copy, Clone, Hash)]
pub struct TypeId(u32);

impl TypeId {
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl Display for TypeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.to_string())
    }
}

pub const NONE_TYPE_ID: TypeId = TypeId(0);
pub const BOOL_TYPE_ID: TypeId = TypeId(1);
pub const I8_TYPE_ID: TypeId = TypeId(2);
pub const I16_TYPE_ID: TypeId = TypeId(3);
pub const I32_TYPE_ID: TypeId = TypeId(4);
pub const I64_TYPE_ID: TypeId = TypeId(5);
pub const F32_TYPE_ID: TypeId = TypeId(6);
pub const F64_TYPE_ID: TypeId = TypeId(7);
pub const UNICODE_TYPE_ID: TypeId = TypeId(8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntegerType {
    I8,
    I16,
    I32,
    I64,
}

impl Display for IntegerType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            IntegerType::I8 => write!(f, "int8"),
            IntegerType::I16 => write!(f, "int16"),
            IntegerType::I32 => write!(f, "int32"),
            IntegerType::I64 => write!(f, "int64"),
        }
    }
}

impl IntegerType {
    pub fn type_id(&self) -> TypeId {
        match self {
            IntegerType::I8 => I8_TYPE_ID,
            IntegerType::I16 => I16_TYPE_ID,
            IntegerType::I32 => I32_TYPE_ID,
            IntegerType::I64 => I64_TYPE_ID,
        }
    }

    pub fn byte_width(&self) -> u32 {
        match self {
            IntegerType::I8 => 1,
            IntegerType::I16 => 2,
            IntegerType::I32 => 4,
            IntegerType::I64 => 8,
        }
    }

    pub fn fits(&self, value: i64) -> bool {
        match self {
            IntegerType::I8 => i8::try_from(value).is_ok(),
            IntegerType::I16 => i16::try_from(value).is_ok(),
            IntegerType::I32 => i32::try_from(value).is_ok(),
            IntegerType::I64 => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatType {
    F32,
    F64,
}

impl FloatType {
    pub fn byte_width(&self) -> u32 {
        match self {
            FloatType::F32 => 4,
            FloatType::F64 => 8,
        }
    }
}

nz_u32_id!(RecordId);

/// Physical size, alignment and stride of a native type, in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub size: u32,
    pub align: u32,
    pub stride: u32,
}

impl Layout {
    pub const ZERO: Layout = Layout { size: 0, align: 1, stride: 0 };
    /// Lists and dicts are stored as a handle to their heap storage
    pub const HANDLE: Layout = Layout::from_scalar_bytes(8);

    pub const fn from_scalar_bytes(bytes: u32) -> Layout {
        Layout { size: bytes, align: bytes, stride: bytes }
    }

    /// Appends `field` to this aggregate, returning the offset the field was placed at
    pub fn append_to_aggregate(&mut self, field: Layout) -> u32 {
        let offset = align_up(self.size, field.align);
        self.size = offset + field.size;
        self.align = self.align.max(field.align);
        self.stride = align_up(self.size, self.align);
        offset
    }
}

fn align_up(value: u32, align: u32) -> u32 {
    if align <= 1 { value } else { value.div_ceil(align) * align }
}

#[derive(Debug, Clone)]
pub struct RecordField {
    pub name: Ident,
    pub type_id: TypeId,
    pub offset: u32,
}

/// The native layout registered for one specialization of a class
#[derive(Debug, Clone)]
pub struct RecordType {
    pub name: Ident,
    pub class: ClassId,
    pub args: SV4<TypeId>,
    pub fields: Vec<RecordField>,
    /// None while the owning specialization is still being built
    pub layout: Option<Layout>,
}

impl RecordType {
    pub fn is_pending(&self) -> bool {
        self.layout.is_none()
    }

    pub fn find_field(&self, field_name: Ident) -> Option<(usize, &RecordField)> {
        self.fields.iter().enumerate().find(|(_, field)| field.name == field_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NativeType {
    None,
    Bool,
    Integer(IntegerType),
    Float(FloatType),
    Unicode,
    List(TypeId),
    Dict(TypeId, TypeId),
    Tuple(SV4<TypeId>),
    Record(RecordId),
}

impl NativeType {
    pub fn kind_name(&self) -> &'static str {
        match self {
            NativeType::None => "none",
            NativeType::Bool => "bool",
            NativeType::Integer(_) => "integer",
            NativeType::Float(_) => "float",
            NativeType::Unicode => "unicode",
            NativeType::List(_) => "list",
            NativeType::Dict(_, _) => "dict",
            NativeType::Tuple(_) => "tuple",
            NativeType::Record(_) => "record",
        }
    }
}

/// Interner for every concrete native type the engine has seen.
///
/// Scalars and containers are deduplicated structurally, so two independently
/// built `List[int64]` types share a TypeId. Records are nominal: each
/// specialization reserves its own.
pub struct Types {
    types: Vec<NativeType>,
    dedup: FxHashMap<NativeType, TypeId>,
    records: Pool<RecordType, RecordId>,
}

impl Default for Types {
    fn default() -> Self {
        Types::new()
    }
}

impl Types {
    pub fn new() -> Types {
        let mut types = Types {
            types: Vec::with_capacity(64),
            dedup: FxHashMap::with_capacity(64),
            records: Pool::new("records"),
        };
        types.add(NativeType::None);
        types.add(NativeType::Bool);
        types.add(NativeType::Integer(IntegerType::I8));
        types.add(NativeType::Integer(IntegerType::I16));
        types.add(NativeType::Integer(IntegerType::I32));
        types.add(NativeType::Integer(IntegerType::I64));
        types.add(NativeType::Float(FloatType::F32));
        types.add(NativeType::Float(FloatType::F64));
        types.add(NativeType::Unicode);
        debug_assert_eq!(types.get(UNICODE_TYPE_ID), &NativeType::Unicode);
        types
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn add(&mut self, typ: NativeType) -> TypeId {
        if let Some(existing) = self.dedup.get(&typ) {
            return *existing;
        }
        let type_id = TypeId(self.types.len() as u32);
        self.types.push(typ.clone());
        self.dedup.insert(typ, type_id);
        type_id
    }

    pub fn get(&self, type_id: TypeId) -> &NativeType {
        &self.types[type_id.0 as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &NativeType)> {
        self.types.iter().enumerate().map(|(i, t)| (TypeId(i as u32), t))
    }

    pub fn list_of(&mut self, element: TypeId) -> TypeId {
        self.add(NativeType::List(element))
    }

    pub fn dict_of(&mut self, key: TypeId, value: TypeId) -> TypeId {
        self.add(NativeType::Dict(key, value))
    }

    pub fn tuple_of(&mut self, elements: &[TypeId]) -> TypeId {
        self.add(NativeType::Tuple(elements.iter().copied().collect()))
    }

    /// Registers a record type with no fields yet. It can be referenced right away, but
    /// has no layout until `complete_record` runs.
    pub fn reserve_record(&mut self, name: Ident, class: ClassId, args: &[TypeId]) -> TypeId {
        let record_id = self.records.add(RecordType {
            name,
            class,
            args: args.iter().copied().collect(),
            fields: Vec::new(),
            layout: None,
        });
        let type_id = self.add(NativeType::Record(record_id));
        trace!("reserved record {record_id} as type {type_id}");
        type_id
    }

    pub fn complete_record(
        &mut self,
        type_id: TypeId,
        fields: &[(Ident, TypeId)],
        idents: &Identifiers,
    ) -> JitResult<Layout> {
        let NativeType::Record(record_id) = *self.get(type_id) else {
            return failf!(
                ErrorKind::TypeMismatch,
                "{} is not a record type",
                self.type_to_string(type_id, idents)
            );
        };
        let mut layout = Layout::ZERO;
        let mut record_fields = Vec::with_capacity(fields.len());
        for (name, field_type) in fields {
            let field_layout = self.layout_of(*field_type).map_err(|mut e| {
                e.message = format!(
                    "field '{}' of {}: {}",
                    idents.get_name(*name),
                    self.type_to_string(type_id, idents),
                    e.message
                );
                e
            })?;
            let offset = layout.append_to_aggregate(field_layout);
            record_fields.push(RecordField { name: *name, type_id: *field_type, offset });
        }
        let record = self.records.get_mut(record_id);
        record.fields = record_fields;
        record.layout = Some(layout);
        Ok(layout)
    }

    pub fn record(&self, type_id: TypeId) -> Option<&RecordType> {
        match self.get(type_id) {
            NativeType::Record(record_id) => Some(self.records.get(*record_id)),
            _ => None,
        }
    }

    pub fn is_pending_record(&self, type_id: TypeId) -> bool {
        self.record(type_id).is_some_and(|r| r.is_pending())
    }

    pub fn layout_of(&self, type_id: TypeId) -> JitResult<Layout> {
        match self.get(type_id) {
            NativeType::None => Ok(Layout::ZERO),
            NativeType::Bool => Ok(Layout::from_scalar_bytes(1)),
            NativeType::Integer(int) => Ok(Layout::from_scalar_bytes(int.byte_width())),
            NativeType::Float(float) => Ok(Layout::from_scalar_bytes(float.byte_width())),
            // data pointer + length
            NativeType::Unicode => {
                let mut layout = Layout::ZERO;
                layout.append_to_aggregate(Layout::HANDLE);
                layout.append_to_aggregate(Layout::HANDLE);
                Ok(layout)
            }
            NativeType::List(_) | NativeType::Dict(_, _) => Ok(Layout::HANDLE),
            NativeType::Tuple(elements) => {
                let mut layout = Layout::ZERO;
                for element in elements {
                    layout.append_to_aggregate(self.layout_of(*element)?);
                }
                Ok(layout)
            }
            NativeType::Record(record_id) => match self.records.get(*record_id).layout {
                Some(layout) => Ok(layout),
                None => failf!(
                    ErrorKind::RecursiveLayout,
                    "record type {} is still being specialized and cannot be stored by value",
                    type_id
                ),
            },
        }
    }

    pub fn is_hashable(&self, type_id: TypeId) -> bool {
        matches!(self.get(type_id), NativeType::Bool | NativeType::Integer(_) | NativeType::Unicode)
    }

    pub fn is_valid_argument(&self, type_id: TypeId) -> bool {
        type_id != NONE_TYPE_ID
    }

    pub fn display_type(
        &self,
        type_id: TypeId,
        idents: &Identifiers,
        w: &mut impl Write,
    ) -> std::fmt::Result {
        match self.get(type_id) {
            NativeType::None => w.write_str("none"),
            NativeType::Bool => w.write_str("bool"),
            NativeType::Integer(int) => write!(w, "{int}"),
            NativeType::Float(FloatType::F32) => w.write_str("float32"),
            NativeType::Float(FloatType::F64) => w.write_str("float64"),
            NativeType::Unicode => w.write_str("unicode"),
            NativeType::List(element) => {
                w.write_str("List[")?;
                self.display_type(*element, idents, w)?;
                w.write_str("]")
            }
            NativeType::Dict(key, value) => {
                w.write_str("Dict[")?;
                self.display_type(*key, idents, w)?;
                w.write_str(", ")?;
                self.display_type(*value, idents, w)?;
                w.write_str("]")
            }
            NativeType::Tuple(elements) => {
                w.write_str("Tuple[")?;
                self.display_type_list(elements, idents, w)?;
                w.write_str("]")
            }
            NativeType::Record(record_id) => {
                let record = self.records.get(*record_id);
                w.write_str(idents.get_name(record.name))?;
                if !record.args.is_empty() {
                    w.write_str("[")?;
                    self.display_type_list(&record.args, idents, w)?;
                    w.write_str("]")?;
                }
                Ok(())
            }
        }
    }

    pub fn display_type_list(
        &self,
        type_ids: &[TypeId],
        idents: &Identifiers,
        w: &mut impl Write,
    ) -> std::fmt::Result {
        for (i, type_id) in type_ids.iter().enumerate() {
            if i > 0 {
                w.write_str(", ")?;
            }
            self.display_type(*type_id, idents, w)?;
        }
        Ok(())
    }

    pub fn type_to_string(&self, type_id: TypeId, idents: &Identifiers) -> String {
        let mut s = String::new();
        let _ = self.display_type(type_id, idents, &mut s);
        s
    }

    pub fn type_list_to_string(&self, type_ids: &[TypeId], idents: &Identifiers) -> String {
        let mut s = String::new();
        let _ = self.display_type_list(type_ids, idents, &mut s);
        s
    }
}
