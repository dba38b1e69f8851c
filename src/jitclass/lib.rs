// Copyright (c) 2025 knix
// All rights reserved.

use smallvec::SmallVec;

pub mod alias;
pub mod bind;
pub mod body;
pub mod boxing;
pub mod class;
pub mod config;
pub mod dump;
pub mod engine;
pub mod error;
pub mod idents;
pub mod key;
pub mod parse;
mod pool;
pub mod prelude;
pub mod resolve;
pub mod specialize;
pub mod type_expr;
pub mod typemap;
pub mod types;
pub mod value;
pub mod vm;

#[cfg(test)]
mod testing;

pub use engine::JitEngine;
pub use error::{ErrorKind, JitError, JitResult};

pub type SV8<T> = SmallVec<[T; 8]>;
pub type SV4<T> = SmallVec<[T; 4]>;

#[macro_export]
macro_rules! nz_u32_id {
    ($name: ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(std::num::NonZeroU32);
        impl From<std::num::NonZeroU32> for $name {
            fn from(value: std::num::NonZeroU32) -> Self {
                $name(value)
            }
        }
        impl From<$name> for std::num::NonZeroU32 {
            fn from(val: $name) -> Self {
                val.0
            }
        }
        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl $name {
            pub const fn as_u32(self) -> u32 {
                self.0.get()
            }
        }
    };
}
