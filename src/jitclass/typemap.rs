use std::fmt::{Display, Formatter};

use ahash::HashMapExt;
use fxhash::FxHashMap;
use itertools::Itertools;

use crate::error::{ErrorKind, JitResult};
use crate::failf;
use crate::idents::{Ident, Identifiers};
use crate::types::*;


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match self {
            Arity::Exactly(n) => count == *n,
            Arity::AtLeast(n) => count >= *n,
        }
    }
}

impl Display for Arity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Arity::Exactly(n) => write!(f, "exactly {n}"),
            Arity::AtLeast(n) => write!(f, "at least {n}"),
        }
    }
}

pub type BuildFn = fn(&mut Types, &[TypeId]) -> JitResult<TypeId>;

/// Builds the native equivalent of a surface type from its resolved arguments
#[derive(Clone, Copy)]
pub struct TypeConstructor {
    pub arity: Arity,
    pub build: BuildFn,
}

impl TypeConstructor {
    pub const fn scalar(build: BuildFn) -> TypeConstructor {
        TypeConstructor { arity: Arity::Exactly(0), build }
    }
}

macro_rules! scalar_builder {
    ($fn_name:ident, $type_id:expr) => {
        fn $fn_name(_types: &mut Types, _args: &[TypeId]) -> JitResult<TypeId> {
            Ok($type_id)
        }
    };
}

scalar_builder!(build_none, NONE_TYPE_ID);
scalar_builder!(build_bool, BOOL_TYPE_ID);
scalar_builder!(build_i8, I8_TYPE_ID);
scalar_builder!(build_i16, I16_TYPE_ID);
scalar_builder!(build_i32, I32_TYPE_ID);
scalar_builder!(build_i64, I64_TYPE_ID);
scalar_builder!(build_f32, F32_TYPE_ID);
scalar_builder!(build_f64, F64_TYPE_ID);
scalar_builder!(build_unicode, UNICODE_TYPE_ID);

fn build_list(types: &mut Types, args: &[TypeId]) -> JitResult<TypeId> {
    Ok(types.list_of(args[0]))
}

fn build_dict(types: &mut Types, args: &[TypeId]) -> JitResult<TypeId> {
    if !types.is_hashable(args[0]) {
        return failf!(
            ErrorKind::UnsupportedTypeArgument,
            "Dict keys must be bool, integer or unicode; got a {} key",
            types.get(args[0]).kind_name()
        );
    }
    Ok(types.dict_of(args[0], args[1]))
}

fn build_tuple(types: &mut Types, args: &[TypeId]) -> JitResult<TypeId> {
    Ok(types.tuple_of(args))
}

/// Maps surface type names (`int`, `List`, ...) to native type constructors
pub struct TypeMap {
    constructors: FxHashMap<Ident, TypeConstructor>,
}

impl TypeMap {
    pub fn empty() -> TypeMap {
        TypeMap { constructors: FxHashMap::with_capacity(32) }
    }

    pub fn with_builtins(idents: &mut Identifiers) -> TypeMap {
        let mut map = TypeMap::empty();
        let scalars: [(&str, BuildFn); 14] = [
            ("none", build_none),
            ("bool", build_bool),
            ("int", build_i64),
            ("int8", build_i8),
            ("int16", build_i16),
            ("int32", build_i32),
            ("int64", build_i64),
            ("float", build_f64),
            ("float32", build_f32),
            ("float64", build_f64),
            ("str", build_unicode),
            ("unicode", build_unicode),
            ("i64", build_i64),
            ("f64", build_f64),
        ];
        for (name, build) in scalars {
            map.constructors.insert(idents.intern(name), TypeConstructor::scalar(build));
        }
        let list = TypeConstructor { arity: Arity::Exactly(1), build: build_list };
        let dict = TypeConstructor { arity: Arity::Exactly(2), build: build_dict };
        let tuple = TypeConstructor { arity: Arity::AtLeast(1), build: build_tuple };
        for (name, ctor) in [
            ("List", list),
            ("list", list),
            ("Dict", dict),
            ("dict", dict),
            ("Tuple", tuple),
            ("tuple", tuple),
        ] {
            map.constructors.insert(idents.intern(name), ctor);
        }
        map
    }

    pub fn add(
        &mut self,
        name: Ident,
        constructor: TypeConstructor,
        idents: &Identifiers,
    ) -> JitResult<()> {
        if self.constructors.contains_key(&name) {
            return failf!(
                ErrorKind::DuplicateDefinition,
                "Can't add new constructor for type {}. Constructor already exists",
                idents.get_name(name)
            );
        }
        self.constructors.insert(name, constructor);
        Ok(())
    }

    pub fn contains(&self, name: Ident) -> bool {
        self.constructors.contains_key(&name)
    }

    pub fn get(&self, name: Ident) -> Option<&TypeConstructor> {
        self.constructors.get(&name)
    }

    pub fn construct(
        &self,
        types: &mut Types,
        idents: &Identifiers,
        name: Ident,
        args: &[TypeId],
    ) -> JitResult<TypeId> {
        let Some(constructor) = self.constructors.get(&name) else {
            return failf!(
                ErrorKind::UnknownType,
                "Can't construct native equivalent for type {}. No known constructors",
                idents.get_name(name)
            );
        };
        if !constructor.arity.accepts(args.len()) {
            return failf!(
                ErrorKind::ArityMismatch,
                "{} takes {} arguments. {} provided: [{}]",
                idents.get_name(name),
                constructor.arity,
                args.len(),
                args.iter().map(|a| types.type_to_string(*a, idents)).join(", ")
            );
        }
        if let Some(bad) = args.iter().find(|a| !types.is_valid_argument(**a)) {
            return failf!(
                ErrorKind::UnsupportedTypeArgument,
                "Can't construct native type {} with non-native type parameter {}",
                idents.get_name(name),
                types.type_to_string(*bad, idents)
            );
        }
        (constructor.build)(types, args)
    }
}
