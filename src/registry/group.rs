/*!
Persistent groups: precomputed entity sets behind persistent views

A group pairs an (include, exclude) component signature with a dense
[`EntitySet`] holding exactly the entities that have every include type and
no exclude type. The registry forwards every pool mutation here, so a
persistent view iterates its set with no per-element filtering.
*/

use std::any::TypeId;

use crate::registry::{
    comp::ComponentPoolMap,
    ent::Entity,
    sparse::SparseSet,
};

/// Dense set of entities backed by a payload-less sparse set
#[derive(Debug, Default)]
pub(crate) struct EntitySet {
    set: SparseSet<()>,
}

impl EntitySet {
    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn contains(&self, ent: Entity) -> bool {
        self.set.contains(ent.0)
    }

    pub fn entities(&self) -> &[Entity] {
        Entity::cast_slice(self.set.indices())
    }

    pub fn dense_index_of(&self, ent: Entity) -> Option<usize> {
        self.set.dense_index_of(ent.0)
    }

    /// Idempotent
    pub fn insert(&mut self, ent: Entity) {
        if !self.contains(ent) {
            self.set.insert(ent.0, ());
        }
    }

    /// No-op when absent
    pub fn remove(&mut self, ent: Entity) {
        self.set.swap_remove(ent.0);
    }

    /// Reorders the set to follow `order`, skipping entities not in the set
    ///
    /// Precondition: `order` contains every entity of the set.
    pub fn sort_to_match(&mut self, order: &[Entity]) {
        let mut sorted = SparseSet::default();
        for ent in order.iter().filter(|ent| self.contains(**ent)) {
            sorted.insert(ent.0, ());
        }
        debug_assert_eq!(sorted.len(), self.set.len(), "sort order missed entities");
        self.set = sorted;
    }
}

/// Signature and index of one persistent view
#[derive(Debug)]
pub(crate) struct Group {
    /// Sorted
    include: Box<[TypeId]>,
    /// Sorted
    exclude: Box<[TypeId]>,
    pub set: EntitySet,
}

impl Group {
    fn matches(&self, ent: Entity, comp: &ComponentPoolMap) -> bool {
        self.include.iter().all(|ty| comp.contains_raw(*ty, ent))
            && !self.exclude.iter().any(|ty| comp.contains_raw(*ty, ent))
    }
}

/// Registry-owned list of persistent groups
///
/// Pools hold no back-pointers; the registry routes every mutation through
/// [`on_assigned`](Self::on_assigned) / [`on_removed`](Self::on_removed) /
/// [`on_destroyed`](Self::on_destroyed) after touching the pool.
#[derive(Debug, Default)]
pub(crate) struct GroupStorage {
    groups: Vec<Group>,
}

impl GroupStorage {
    pub fn get_mut(&mut self, index: usize) -> &mut Group {
        &mut self.groups[index]
    }

    /// Returns the index of the group with this exact signature, creating
    /// and filling it on first request
    pub fn ensure(
        &mut self,
        include: Box<[TypeId]>,
        exclude: Box<[TypeId]>,
        comp: &ComponentPoolMap,
    ) -> usize {
        let mut include = include;
        let mut exclude = exclude;
        include.sort_unstable();
        exclude.sort_unstable();

        if let Some(index) = self
            .groups
            .iter()
            .position(|g| g.include == include && g.exclude == exclude)
        {
            return index;
        }

        log::trace!(
            "creating persistent group over {} include / {} exclude types",
            include.len(),
            exclude.len(),
        );

        let mut group = Group {
            include,
            exclude,
            set: EntitySet::default(),
        };

        // initial fill, driven by the smallest include pool
        let driver = group
            .include
            .iter()
            .copied()
            .min_by_key(|ty| comp.len_raw(*ty).unwrap_or(0));
        if let Some(pool) = driver.and_then(|ty| comp.borrow_erased(ty)) {
            for &ent in pool.entities() {
                if group.matches(ent, comp) {
                    group.set.insert(ent);
                }
            }
        }

        self.groups.push(group);
        self.groups.len() - 1
    }

    /// Routed after a component of type `ty` was added to `ent`
    pub fn on_assigned(&mut self, ty: TypeId, ent: Entity, comp: &ComponentPoolMap) {
        for group in &mut self.groups {
            if group.include.contains(&ty) {
                if group.matches(ent, comp) {
                    group.set.insert(ent);
                }
            } else if group.exclude.contains(&ty) {
                group.set.remove(ent);
            }
        }
    }

    /// Routed after a component of type `ty` was removed from `ent`
    pub fn on_removed(&mut self, ty: TypeId, ent: Entity, comp: &ComponentPoolMap) {
        for group in &mut self.groups {
            if group.include.contains(&ty) {
                group.set.remove(ent);
            } else if group.exclude.contains(&ty) && group.matches(ent, comp) {
                group.set.insert(ent);
            }
        }
    }

    /// Routed after `ent` was erased from every pool
    pub fn on_destroyed(&mut self, ent: Entity) {
        for group in &mut self.groups {
            group.set.remove(ent);
        }
    }
}
