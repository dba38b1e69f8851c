use std::fmt::{Display, Formatter};

use string_interner::backend::StringBackend;
use string_interner::Symbol;

/// An interned member, method, class or parameter name
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Ident(string_interner::symbol::SymbolU32);

impl From<Ident> for usize {
    fn from(value: Ident) -> Self {
        value.0.to_usize()
    }
}

impl Display for Ident {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_usize())
    }
}

#[allow(non_snake_case)]
pub struct BuiltinIdents {
    pub init: Ident,
    pub append: Ident,
    pub pop: Ident,
    pub get: Ident,
    pub List: Ident,
    pub Dict: Ident,
}

// We use the default StringInterner, which uses a contiguous string as its backend
// and u32 symbols
#[derive(Debug, Clone)]
pub struct Identifiers {
    intern_pool: string_interner::StringInterner<StringBackend>,
}

impl Identifiers {
    pub fn intern(&mut self, s: impl AsRef<str>) -> Ident {
        Ident(self.intern_pool.get_or_intern(s.as_ref()))
    }

    pub fn get(&self, s: impl AsRef<str>) -> Option<Ident> {
        self.intern_pool.get(s.as_ref()).map(Ident)
    }

    pub fn get_name(&self, id: Ident) -> &str {
        // Idents are only ever minted by this pool
        self.intern_pool.resolve(id.0).unwrap_or("<unknown>")
    }

    pub fn builtins(&mut self) -> BuiltinIdents {
        BuiltinIdents {
            init: self.intern("__init__"),
            append: self.intern("append"),
            pop: self.intern("pop"),
            get: self.intern("get"),
            List: self.intern("List"),
            Dict: self.intern("Dict"),
        }
    }
}

impl Default for Identifiers {
    fn default() -> Self {
        Identifiers { intern_pool: string_interner::StringInterner::default() }
    }
}
