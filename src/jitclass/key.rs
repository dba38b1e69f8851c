use crate::SV4;
use crate::engine::JitEngine;
use crate::error::JitResult;
use crate::resolve::ParameterBinding;
use crate::type_expr::TypeExpr;
use crate::types::TypeId;

/// Canonical form of an ordered tuple of concrete type arguments.
///
/// Every element is an interned TypeId, so structurally equal arguments
/// always give equal keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct CacheKey(SV4<TypeId>);

impl CacheKey {
    pub fn empty() -> CacheKey {
        CacheKey(SV4::new())
    }

    pub fn from_resolved(args: &[TypeId]) -> CacheKey {
        CacheKey(args.iter().copied().collect())
    }

    pub fn as_slice(&self) -> &[TypeId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl JitEngine {
    /// Resolves each argument outside of any class scope
    pub fn make_key(&mut self, args: &[TypeExpr]) -> JitResult<CacheKey> {
        let binding = ParameterBinding::empty();
        let mut resolved = SV4::with_capacity(args.len());
        for arg in args {
            resolved.push(self.resolve_type(arg, &binding)?);
        }
        Ok(CacheKey(resolved))
    }
}

#[cfg(test)]
mod test {
    use crate::testing::engine;
    use crate::type_expr::TypeExpr;
    use crate::types::*;

    #[test]
    fn equal_arguments_give_equal_keys() {
        let mut engine = engine();
        let a = engine.make_key(&["List[int]".into(), "str".into()]).unwrap();
        let list = engine.types.list_of(I64_TYPE_ID);
        let b = engine
            .make_key(&[TypeExpr::Native(list), TypeExpr::Native(UNICODE_TYPE_ID)])
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_slice(), &[list, UNICODE_TYPE_ID]);

        let c = engine.make_key(&["List[float]".into(), "str".into()]).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn order_matters() {
        let mut engine = engine();
        let a = engine.make_key(&["int".into(), "str".into()]).unwrap();
        let b = engine.make_key(&["str".into(), "int".into()]).unwrap();
        assert_ne!(a, b);
    }
}
