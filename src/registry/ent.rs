/*!
Entity: ID associated with a set of components
*/

use std::{fmt, slice};

use crate::registry::sparse::*;

/// Identifier that represents an object made of components
///
/// An entity is a sparse index plus a recycling generation. Components of
/// entities are stored in sparse set backed pools, all keyed by the same
/// index.
///
/// # Non-zero type use
///
/// ```
/// # use std::mem::size_of;
/// # use sparsecs::registry::ent::Entity;
/// assert_eq!(size_of::<Entity>(), size_of::<Option<Entity>>());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Entity(pub(crate) SparseIndex);

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        <Self as fmt::Display>::fmt(self, f)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Entity({}, {})",
            self.0.raw().to_usize(),
            self.0.generation().to_usize()
        )
    }
}

impl Entity {
    fn initial(slot: RawSparseIndex) -> Self {
        Self(SparseIndex::initial(slot))
    }

    /// The dense index portion, usable as a key into sparse arrays
    pub fn index(&self) -> usize {
        self.0.to_usize()
    }

    pub fn generation(&self) -> Generation {
        self.0.generation()
    }

    /// `&[SparseIndex]` and `&[Entity]` have the same layout
    pub(crate) fn cast_slice(sparse: &[SparseIndex]) -> &[Entity] {
        // SAFE: `Entity` is a transparent wrapper of `SparseIndex`
        unsafe { slice::from_raw_parts(sparse.as_ptr() as *const Entity, sparse.len()) }
    }
}

/// Recycling allocator of entities
///
/// # Implementation
///
/// Differs from an ordinary sparse set in two points:
///
/// 1. It takes a sparse index and returns a sparse index, so the payload of
/// the dense array is the entity itself.
/// 2. Freed sparse slots form an intrusive free list and are handed out
/// again with an incremented generation, so stale handles always miss.
#[derive(Debug, Default)]
pub struct EntityPool {
    sparse: Vec<Entry>,
    dense: Vec<Entity>,
    first_free: Option<RawSparseIndex>,
    /// Tracks the number of free entries
    n_free: usize,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum Entry {
    ToDense(DenseIndex),
    Empty {
        gen: Generation,
        next_free: Option<RawSparseIndex>,
    },
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ToDense(dense) => write!(
                f,
                "ToDense({}, {})",
                dense.raw().to_usize(),
                dense.generation().to_usize()
            ),
            Self::Empty { gen, next_free } => {
                write!(f, "Empty({}, {:?})", gen.to_usize(), next_free)
            }
        }
    }
}

impl EntityPool {
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    pub fn slice(&self) -> &[Entity] {
        &self.dense
    }

    pub fn contains(&self, ent: Entity) -> bool {
        match self.sparse.get(ent.index()) {
            Some(Entry::ToDense(dense)) => dense.generation() == ent.generation(),
            _ => false,
        }
    }

    pub fn iter(&self) -> slice::Iter<Entity> {
        self.dense.iter()
    }

    pub fn alloc(&mut self) -> Entity {
        if let Some(free) = self.first_free {
            let (old_gen, second_free) = match self.sparse[free.to_usize()] {
                Entry::Empty { gen, next_free } => (gen, next_free),
                _ => unreachable!("free slot bug"),
            };

            let gen = old_gen.increment();
            let entity = Entity(SparseIndex::new(free, gen));
            let dense = DenseIndex::new(RawDenseIndex::from_usize(self.dense.len()), gen);

            self.first_free = second_free;
            self.n_free -= 1;
            self.dense.push(entity);
            self.sparse[free.to_usize()] = Entry::ToDense(dense);

            entity
        } else {
            debug_assert_eq!(self.dense.len(), self.sparse.len(), "free slot bug");

            let index = self.dense.len();
            let entity = Entity::initial(RawSparseIndex::from_usize(index));

            self.dense.push(entity);
            self.sparse.push(Entry::ToDense(DenseIndex::initial(
                RawDenseIndex::from_usize(index),
            )));

            entity
        }
    }

    /// Returns false on stale or never-allocated handles
    pub fn dealloc(&mut self, ent: Entity) -> bool {
        let slot = ent.index();
        if slot >= self.sparse.len() {
            return false;
        }

        let dense = match self.sparse[slot] {
            Entry::ToDense(dense) => dense,
            Entry::Empty { .. } => return false,
        };

        if dense.generation() != ent.generation() {
            return false;
        }

        self.sparse[slot] = Entry::Empty {
            gen: ent.generation(),
            next_free: self.first_free,
        };

        // swap-and-pop the dense array, re-pointing the swapped entity
        self.dense.swap_remove(dense.to_usize());
        if let Some(swapped) = self.dense.get(dense.to_usize()) {
            self.sparse[swapped.index()] = Entry::ToDense(DenseIndex::new(
                dense.raw(),
                swapped.generation(),
            ));
        }

        self.first_free = Some(RawSparseIndex::from_usize(slot));
        self.n_free += 1;

        true
    }
}
