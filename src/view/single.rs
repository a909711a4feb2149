//! Single-component views: the entities of a single pool

use std::ops;

use crate::{
    registry::{
        comp::{Comp, Component},
        ent::Entity,
    },
    view::EntityIter,
};

/// View over the entities of one pool
///
/// Iterates entities instead of components; component lookup goes through
/// [`get`](Self::get). Same backing pool and order as
/// [`RawView`](crate::view::raw::RawView).
pub struct View<'r, T: Component> {
    pool: Comp<'r, T>,
}

impl<'r, T: Component> View<'r, T> {
    pub(crate) fn new(pool: Comp<'r, T>) -> Self {
        Self { pool }
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    pub fn contains(&self, ent: Entity) -> bool {
        self.pool.contains(ent)
    }

    pub fn get(&self, ent: Entity) -> Option<&T> {
        self.pool.get(ent)
    }

    /// Entities in view order (reverse insertion order)
    pub fn iter(&self) -> EntityIter {
        EntityIter::new(self.pool.entities())
    }

    /// Returns an iterator positioned at `ent`, or an exhausted one if the
    /// pool does not contain it
    ///
    /// Advancing the returned iterator sweeps the entities that follow
    /// `ent` in view order, then ends.
    pub fn find(&self, ent: Entity) -> EntityIter {
        match self.pool.dense_index_of(ent) {
            Some(slot) => EntityIter::new(&self.pool.entities()[..=slot]),
            None => EntityIter::empty(),
        }
    }
}

impl<'r, T: Component> ops::Index<usize> for View<'r, T> {
    type Output = Entity;

    /// `view[0]` is the most recently added entity
    fn index(&self, index: usize) -> &Self::Output {
        let ents = self.pool.entities();
        &ents[ents.len() - 1 - index]
    }
}

impl<'v, 'r, T: Component> IntoIterator for &'v View<'r, T> {
    type Item = Entity;
    type IntoIter = EntityIter<'v>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
