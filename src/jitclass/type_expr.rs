use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, Ordering};

use ecow::EcoString;

use crate::alias::AliasId;
use crate::class::ClassId;
use crate::idents::Ident;
use crate::types::TypeId;

static NEXT_TYPE_PARAM: AtomicU32 = AtomicU32::new(1);

/// A generic slot of one class declaration.
///
/// Compared by identity only: two declarations that both call their parameter
/// `T` get two distinct, unequal parameters.
#[derive(Debug, Clone)]
pub struct TypeParam {
    id: u32,
    pub name: EcoString,
}

impl TypeParam {
    pub fn fresh(name: impl Into<EcoString>) -> TypeParam {
        let id = NEXT_TYPE_PARAM.fetch_add(1, Ordering::Relaxed);
        TypeParam { id, name: name.into() }
    }

    pub fn id(&self) -> u32 {
        self.id
    }
}

impl PartialEq for TypeParam {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeParam {}

impl Hash for TypeParam {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    /// Already a concrete native type
    Native(TypeId),
    Param(TypeParam),
    /// A surface type from the type map, applied to `args` (scalars take none)
    Named { name: Ident, args: Vec<TypeExpr> },
    Class { class: ClassId, args: Vec<TypeExpr> },
    /// The class being declared, applied to `args`
    OwnClass { args: Vec<TypeExpr> },
    Alias(AliasId),
    /// Source text such as `Dict[str, List[T]]`, parsed in the scope of the
    /// declaration it appears in
    Unparsed(EcoString),
}

impl From<&str> for TypeExpr {
    fn from(value: &str) -> Self {
        TypeExpr::Unparsed(value.into())
    }
}

impl From<TypeId> for TypeExpr {
    fn from(value: TypeId) -> Self {
        TypeExpr::Native(value)
    }
}

impl From<TypeParam> for TypeExpr {
    fn from(value: TypeParam) -> Self {
        TypeExpr::Param(value)
    }
}

impl From<AliasId> for TypeExpr {
    fn from(value: AliasId) -> Self {
        TypeExpr::Alias(value)
    }
}

impl TypeExpr {
    pub fn class(class: ClassId, args: impl IntoIterator<Item = TypeExpr>) -> TypeExpr {
        TypeExpr::Class { class, args: args.into_iter().collect() }
    }

    pub fn own_class(args: impl IntoIterator<Item = TypeExpr>) -> TypeExpr {
        TypeExpr::OwnClass { args: args.into_iter().collect() }
    }

    pub fn args(&self) -> &[TypeExpr] {
        match self {
            TypeExpr::Named { args, .. }
            | TypeExpr::Class { args, .. }
            | TypeExpr::OwnClass { args } => args.as_slice(),
            _ => &[],
        }
    }
}
