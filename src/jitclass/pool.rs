use std::num::NonZeroU32;

/// Append-only storage addressed by a typed, non-zero handle.
///
/// Handles are never invalidated: nothing is ever removed, which is what lets
/// the engine hand out `ClassId`s and `SpecializationId`s as stable identities.
pub struct Pool<T, Index: Into<NonZeroU32> + From<NonZeroU32>> {
    vec: Vec<T>,
    name: &'static str,
    _index: std::marker::PhantomData<Index>,
}

impl<T, Index: Into<NonZeroU32> + From<NonZeroU32> + Copy> Pool<T, Index> {
    pub fn new(name: &'static str) -> Pool<T, Index> {
        Pool { name, vec: Vec::new(), _index: std::marker::PhantomData }
    }

    pub fn with_capacity(name: &'static str, capacity: usize) -> Pool<T, Index> {
        Pool { name, vec: Vec::with_capacity(capacity), _index: std::marker::PhantomData }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The handle the next `add` will return
    pub fn next_id(&self) -> Index {
        let raw = u32::try_from(self.vec.len() + 1).unwrap_or(u32::MAX);
        // len + 1 is never zero
        Index::from(NonZeroU32::new(raw).unwrap_or(NonZeroU32::MAX))
    }

    pub fn len(&self) -> usize {
        self.vec.len()
    }

    pub fn add(&mut self, t: T) -> Index {
        let id = self.next_id();
        self.vec.push(t);
        id
    }

    fn slot(index: Index) -> usize {
        let nz: NonZeroU32 = index.into();
        nz.get() as usize - 1
    }

    pub fn get(&self, index: Index) -> &T {
        &self.vec[Self::slot(index)]
    }

    pub fn get_mut(&mut self, index: Index) -> &mut T {
        &mut self.vec[Self::slot(index)]
    }

    pub fn iter_with_ids(&self) -> impl Iterator<Item = (Index, &T)> {
        self.vec.iter().enumerate().map(|(i, t)| {
            let raw = NonZeroU32::new(i as u32 + 1).unwrap_or(NonZeroU32::MAX);
            (Index::from(raw), t)
        })
    }
}
