//! Runtime views: joins over pools named by runtime component ids
//!
//! The component list is a slice of [`ComponentId`]s instead of a type
//! tuple, so the set of joined pools can come from data. The view works on
//! the type-erased pool surface and therefore yields entities only;
//! callers recover components through the registry with the ids they
//! already hold.
//!
//! [`ComponentId`]: crate::registry::comp::ComponentId

use atomic_refcell::AtomicRef;

use crate::registry::{comp::ErasedComponentPool, ent::Entity};

/// Join view over pools named at runtime
///
/// Degenerate cases are empty views, not errors: an id whose pool did not
/// exist when the view was built, or an empty id range. The pool-existence
/// check happens once at construction; a pool created afterwards is not
/// picked up by an already-built view.
pub struct RuntimeView<'r> {
    /// `None` when a requested pool was missing at construction
    pools: Option<Vec<AtomicRef<'r, dyn ErasedComponentPool>>>,
}

impl<'r> RuntimeView<'r> {
    pub(crate) fn new(pools: Vec<AtomicRef<'r, dyn ErasedComponentPool>>) -> Self {
        Self { pools: Some(pools) }
    }

    pub(crate) fn missing_pool() -> Self {
        Self { pools: None }
    }

    fn driving(&self) -> &[Entity] {
        let pools = match self.pools.as_deref() {
            Some(pools) if !pools.is_empty() => pools,
            _ => return &[],
        };

        let mut min = &pools[0];
        for pool in &pools[1..] {
            if pool.len() < min.len() {
                min = pool;
            }
        }
        min.entities()
    }

    /// Upper bound: the driving pool's size. Zero for degenerate views.
    pub fn len(&self) -> usize {
        self.driving().len()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn contains(&self, ent: Entity) -> bool {
        match self.pools.as_deref() {
            Some(pools) if !pools.is_empty() => {
                pools.iter().all(|pool| pool.contains_entity(ent))
            }
            _ => false,
        }
    }

    /// Matching entities in the driving pool's view order
    pub fn iter(&self) -> RuntimeIter<'_, 'r> {
        RuntimeIter {
            ents: self.driving(),
            pools: self.pools.as_deref().unwrap_or(&[]),
        }
    }

    /// Visits every matching entity. Component access is up to the caller.
    pub fn each(&self, mut f: impl FnMut(Entity)) {
        for ent in self.iter() {
            f(ent);
        }
    }
}

/// Iterator of entities matching a runtime join
pub struct RuntimeIter<'v, 'r> {
    ents: &'v [Entity],
    pools: &'v [AtomicRef<'r, dyn ErasedComponentPool>],
}

impl<'v, 'r> Iterator for RuntimeIter<'v, 'r> {
    type Item = Entity;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (last, rest) = self.ents.split_last()?;
            self.ents = rest;
            if self.pools.iter().all(|pool| pool.contains_entity(*last)) {
                return Some(*last);
            }
        }
    }
}
