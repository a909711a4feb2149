/*!
Internal [`SparseSet`] storage

A sparse set keeps an O(1) membership map from sparse indices to slots of a
dense, packed array:

```text
sparse:  [ 0  -  2  1  -  - ]
           |     |  |
           |  +-----+
           |  |  |
dense:   [ i0 i3 i2 ]
data:    [ a  b  c  ]
```

Lookups go through the sparse array; iteration walks the dense arrays
directly. Erasure swaps the last dense element into the vacated slot, so
the dense arrays stay packed and the observable order is append followed by
swap-and-pop. See `EntityPool` for the sparse index allocator.
*/

use std::{cmp::Ordering, mem, num::NonZeroU32, slice};

macro_rules! newtype_index {
    ($(#[$meta:meta])* $vis:vis $ty:ident($internal:ty);) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        $(#[$meta])*
        $vis struct $ty(pub(crate) $internal);

        #[allow(unused)]
        impl $ty {
            pub(crate) fn from_usize(x: usize) -> Self {
                Self(x as $internal)
            }

            pub fn to_usize(&self) -> usize {
                self.0 as usize
            }
        }
    };
}

newtype_index! {
    /// Raw slot in a sparse array
    pub(crate) RawSparseIndex(u32);
}

newtype_index! {
    /// Raw slot in a dense array
    pub(crate) RawDenseIndex(u32);
}

/// Distinguishes new/old items stored at the same sparse slot
///
/// The generation of a slot is incremented every time the slot is recycled
/// by the index allocator. A lookup with a stale generation misses.
///
/// ```
/// # use std::mem::size_of;
/// # use sparsecs::registry::sparse::Generation;
/// assert_eq!(size_of::<Generation>(), size_of::<Option<Generation>>());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Generation {
    raw: NonZeroU32,
}

impl Generation {
    pub const INITIAL: Generation = Self {
        raw: NonZeroU32::MIN,
    };

    pub(crate) fn increment(self) -> Self {
        Self {
            raw: self.raw.checked_add(1).expect("generation overflow"),
        }
    }

    pub fn to_usize(&self) -> usize {
        self.raw.get() as usize
    }
}

macro_rules! generational_index {
    ($(#[$meta:meta])* $vis:vis $ty:ident($index:ty);) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $(#[$meta])*
        $vis struct $ty {
            raw: $index,
            gen: Generation,
        }

        #[allow(unused)]
        impl $ty {
            pub(crate) fn new(raw: $index, gen: Generation) -> Self {
                Self { raw, gen }
            }

            pub(crate) fn initial(raw: $index) -> Self {
                Self {
                    raw,
                    gen: Generation::INITIAL,
                }
            }

            pub(crate) fn increment_generation(self) -> Self {
                Self {
                    raw: self.raw,
                    gen: self.gen.increment(),
                }
            }

            pub fn generation(&self) -> Generation {
                self.gen
            }

            pub(crate) fn raw(&self) -> $index {
                self.raw
            }

            pub fn to_usize(&self) -> usize {
                self.raw.to_usize()
            }
        }
    };
}

generational_index!(
    /// Sparse index with generation
    ///
    /// Not generic over the target type because one sparse index is used to
    /// key multiple sparse sets.
    pub SparseIndex(RawSparseIndex);
);

generational_index!(
    /// Dense index with generation
    pub DenseIndex(RawDenseIndex);
);

/// Dense array of `T` keyed by [`SparseIndex`]
///
/// `dense` and `data` are co-indexed: `data[i]` belongs to the sparse index
/// stored at `dense[i]`. Both arrays always have the same length. The
/// sparse array holds one entry per sparse slot ever touched, tagged with
/// the generation the item was stored under.
#[derive(Debug, Clone)]
pub struct SparseSet<T> {
    /// `sparse[i]` is the dense slot of sparse index `i`
    sparse: Vec<Option<DenseIndex>>,
    /// Maps dense slots back to their `SparseIndex`
    dense: Vec<SparseIndex>,
    /// Dense, packed array of target data
    data: Vec<T>,
}

impl<T> Default for SparseSet<T> {
    fn default() -> Self {
        Self {
            sparse: Default::default(),
            dense: Default::default(),
            data: Default::default(),
        }
    }
}

impl<T> SparseSet<T> {
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn indices(&self) -> &[SparseIndex] {
        &self.dense
    }

    pub fn as_slice_with_indices(&self) -> (&[SparseIndex], &[T]) {
        (&self.dense, &self.data)
    }

    pub fn as_mut_slice_with_indices(&mut self) -> (&[SparseIndex], &mut [T]) {
        (&self.dense, &mut self.data)
    }

    pub fn iter(&self) -> slice::Iter<T> {
        self.data.iter()
    }

    /// Dense slot of `index`, if the set holds an item stored under the
    /// same generation. Every lookup funnels through here.
    fn slot_of(&self, index: SparseIndex) -> Option<usize> {
        match self.sparse.get(index.to_usize()).copied().flatten() {
            Some(dense) if dense.gen == index.gen => Some(dense.to_usize()),
            _ => None,
        }
    }

    pub fn contains(&self, index: SparseIndex) -> bool {
        self.slot_of(index).is_some()
    }

    /// Returns the dense slot the sparse index currently maps to
    pub fn dense_index_of(&self, index: SparseIndex) -> Option<usize> {
        self.slot_of(index)
    }

    pub fn get(&self, index: SparseIndex) -> Option<&T> {
        let slot = self.slot_of(index)?;
        Some(&self.data[slot])
    }

    pub fn get_mut(&mut self, index: SparseIndex) -> Option<&mut T> {
        let slot = self.slot_of(index)?;
        Some(&mut self.data[slot])
    }

    pub fn reserve(&mut self, additional: usize) {
        self.dense.reserve(additional);
        self.data.reserve(additional);
    }

    /// Returns the old item if the slot was already occupied
    ///
    /// An occupied slot may hold an item stored under an older generation;
    /// it is overwritten and retagged with the new generation.
    pub fn insert(&mut self, index: SparseIndex, mut data: T) -> Option<T> {
        let at = index.to_usize();
        if at >= self.sparse.len() {
            self.sparse.resize(at + 1, None);
        }

        match self.sparse[at] {
            Some(dense) => {
                debug_assert!(index.gen >= dense.gen, "generation went backwards");
                let slot = dense.to_usize();
                self.sparse[at] = Some(DenseIndex::new(dense.raw(), index.gen));
                self.dense[slot] = index;
                mem::swap(&mut self.data[slot], &mut data);
                Some(data)
            }
            None => {
                let end = RawDenseIndex::from_usize(self.data.len());
                self.sparse[at] = Some(DenseIndex::new(end, index.gen));
                self.dense.push(index);
                self.data.push(data);
                None
            }
        }
    }

    /// O(1) removal: the last dense element is swapped into the vacated
    /// slot. A removal under a stale generation leaves the set untouched.
    pub fn swap_remove(&mut self, index: SparseIndex) -> Option<T> {
        let slot = self.slot_of(index)?;
        self.sparse[index.to_usize()] = None;

        let last = self.data.len() - 1;
        self.dense.swap(slot, last);
        self.data.swap(slot, last);
        self.dense.pop();
        let removed = self.data.pop();

        // re-point the element that now fills the vacated slot
        if slot < self.data.len() {
            let moved = self.dense[slot];
            self.sparse[moved.to_usize()] =
                Some(DenseIndex::new(RawDenseIndex::from_usize(slot), moved.gen));
        }

        removed
    }

    /// Reorders the dense arrays by a comparator over the data
    ///
    /// Stable. The sparse map is repaired afterwards, so membership and
    /// lookups are unaffected.
    pub fn sort_by(&mut self, mut cmp: impl FnMut(&T, &T) -> Ordering) {
        let dense = mem::take(&mut self.dense);
        let data = mem::take(&mut self.data);

        let mut pairs: Vec<(SparseIndex, T)> = dense.into_iter().zip(data).collect();
        pairs.sort_by(|a, b| cmp(&a.1, &b.1));

        self.restore_sorted(pairs);
    }

    /// [`sort_by`](Self::sort_by) with a comparator over the sparse indices
    pub fn sort_by_index(&mut self, mut cmp: impl FnMut(&SparseIndex, &SparseIndex) -> Ordering) {
        let dense = mem::take(&mut self.dense);
        let data = mem::take(&mut self.data);

        let mut pairs: Vec<(SparseIndex, T)> = dense.into_iter().zip(data).collect();
        pairs.sort_by(|a, b| cmp(&a.0, &b.0));

        self.restore_sorted(pairs);
    }

    fn restore_sorted(&mut self, pairs: Vec<(SparseIndex, T)>) {
        for (slot, (index, _)) in pairs.iter().enumerate() {
            self.sparse[index.to_usize()] =
                Some(DenseIndex::new(RawDenseIndex::from_usize(slot), index.gen));
        }

        let (dense, data) = pairs.into_iter().unzip();
        self.dense = dense;
        self.data = data;
    }
}
