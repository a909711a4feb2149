//! Multi-component views: on-the-fly joins over N pools
//!
//! Iteration is driven by the smallest of the joined pools and filters the
//! others by membership; nothing is materialised. Among equally small
//! pools the leftmost type in the tuple drives, so a given registry state
//! always iterates the same way.

use std::any::TypeId;

use crate::registry::{
    comp::{BorrowError, Comp, CompMut, Component, ComponentPoolMap},
    ent::Entity,
    ComponentSet,
};

/// Tuple of borrowed pools that can be joined
///
/// Implemented for tuples of [`Comp`] and of [`CompMut`] up to arity 16.
pub trait JoinPools {
    /// Dense entity array of the driving (smallest) pool
    fn driving(&self) -> &[Entity];
    /// Slot of `ent` in the driving pool's dense array
    fn driving_position(&self, ent: Entity) -> Option<usize>;
    /// Is `ent` in every pool?
    fn contains_all(&self, ent: Entity) -> bool;
    /// Dense entity array of the pool storing `ty`, if part of the join
    fn entities_of(&self, ty: TypeId) -> Option<&[Entity]>;
}

/// Component tuple whose pools can be borrowed for a shared join view
pub trait PoolSet<'r>: ComponentSet {
    type Pools: JoinPools;
    fn borrow(map: &'r ComponentPoolMap) -> Result<Self::Pools, BorrowError>;
}

/// Component tuple whose pools can be borrowed for an exclusive join view
pub trait PoolSetMut<'r>: ComponentSet {
    type Pools: JoinPools;
    fn borrow_mut(map: &'r ComponentPoolMap) -> Result<Self::Pools, BorrowError>;
}

/// Join view over the pools of the component tuple `S`
///
/// `len` is an upper bound (the driving pool's size); `is_empty` is
/// accurate. Typed component access is provided per tuple arity via `get`
/// and `each`.
pub struct MultiView<'r, S: PoolSet<'r>> {
    pools: S::Pools,
}

impl<'r, S: PoolSet<'r>> MultiView<'r, S> {
    pub(crate) fn new(pools: S::Pools) -> Self {
        Self { pools }
    }

    /// Upper bound: the driving pool's size
    pub fn len(&self) -> usize {
        self.pools.driving().len()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn contains(&self, ent: Entity) -> bool {
        self.pools.contains_all(ent)
    }

    /// Matching entities in the driving pool's view order
    pub fn iter(&self) -> MultiIter<'_, S::Pools> {
        MultiIter {
            ents: self.pools.driving(),
            pools: &self.pools,
        }
    }

    /// Returns an iterator positioned at `ent`, or an exhausted one if the
    /// view does not contain it
    ///
    /// Advancing the returned iterator sweeps the remaining dense slots of
    /// the driving pool in view order, still honouring the filter.
    pub fn find(&self, ent: Entity) -> MultiIter<'_, S::Pools> {
        if self.pools.contains_all(ent) {
            if let Some(slot) = self.pools.driving_position(ent) {
                return MultiIter {
                    ents: &self.pools.driving()[..=slot],
                    pools: &self.pools,
                };
            }
        }

        MultiIter {
            ents: &[],
            pools: &self.pools,
        }
    }
}

/// [`MultiView`] with mutable access to the components
pub struct MultiViewMut<'r, S: PoolSetMut<'r>> {
    pools: S::Pools,
}

impl<'r, S: PoolSetMut<'r>> MultiViewMut<'r, S> {
    pub(crate) fn new(pools: S::Pools) -> Self {
        Self { pools }
    }

    pub fn len(&self) -> usize {
        self.pools.driving().len()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn contains(&self, ent: Entity) -> bool {
        self.pools.contains_all(ent)
    }

    pub fn iter(&self) -> MultiIter<'_, S::Pools> {
        MultiIter {
            ents: self.pools.driving(),
            pools: &self.pools,
        }
    }

    pub fn find(&self, ent: Entity) -> MultiIter<'_, S::Pools> {
        if self.pools.contains_all(ent) {
            if let Some(slot) = self.pools.driving_position(ent) {
                return MultiIter {
                    ents: &self.pools.driving()[..=slot],
                    pools: &self.pools,
                };
            }
        }

        MultiIter {
            ents: &[],
            pools: &self.pools,
        }
    }
}

/// Iterator of entities matching a join, in the driving pool's view order
pub struct MultiIter<'v, P: JoinPools> {
    ents: &'v [Entity],
    pools: &'v P,
}

impl<'v, P: JoinPools> Iterator for MultiIter<'v, P> {
    type Item = Entity;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (last, rest) = self.ents.split_last()?;
            self.ents = rest;
            if self.pools.contains_all(*last) {
                return Some(*last);
            }
        }
    }
}

macro_rules! impl_join_pools {
    ($guard:ident; $(($i:tt, $xs:ident)),+ $(,)?) => {
        impl<'r, $($xs: Component),+> JoinPools for ($($guard<'r, $xs>,)+) {
            fn driving(&self) -> &[Entity] {
                let mut min: &[Entity] = self.0.entities();
                $(
                    if self.$i.len() < min.len() {
                        min = self.$i.entities();
                    }
                )+
                min
            }

            fn driving_position(&self, ent: Entity) -> Option<usize> {
                let min_len = self.driving().len();
                $(
                    if self.$i.len() == min_len {
                        return self.$i.dense_index_of(ent);
                    }
                )+
                unreachable!()
            }

            fn contains_all(&self, ent: Entity) -> bool {
                $(
                    self.$i.contains(ent)
                )&&+
            }

            fn entities_of(&self, ty: TypeId) -> Option<&[Entity]> {
                $(
                    if TypeId::of::<$xs>() == ty {
                        return Some(self.$i.entities());
                    }
                )+
                None
            }
        }
    };
}

macro_rules! impl_view_tuple {
    ($(($i:tt, $xs:ident)),+ $(,)?) => {
        impl_join_pools!(Comp; $(($i, $xs)),+);
        impl_join_pools!(CompMut; $(($i, $xs)),+);

        impl<'r, $($xs: Component),+> PoolSet<'r> for ($($xs,)+) {
            type Pools = ($(Comp<'r, $xs>,)+);

            fn borrow(map: &'r ComponentPoolMap) -> Result<Self::Pools, BorrowError> {
                Ok(($(map.try_borrow::<$xs>()?,)+))
            }
        }

        impl<'r, $($xs: Component),+> PoolSetMut<'r> for ($($xs,)+) {
            type Pools = ($(CompMut<'r, $xs>,)+);

            fn borrow_mut(map: &'r ComponentPoolMap) -> Result<Self::Pools, BorrowError> {
                Ok(($(map.try_borrow_mut::<$xs>()?,)+))
            }
        }

        impl<'r, $($xs: Component),+> MultiView<'r, ($($xs,)+)> {
            /// Component references of `ent`, if the view contains it
            pub fn get(&self, ent: Entity) -> Option<($(&$xs,)+)> {
                Some(($(self.pools.$i.get(ent)?,)+))
            }

            /// Visits every matching entity with its component references
            pub fn each(&self, mut f: impl FnMut(Entity, $(&$xs),+)) {
                let ents = self.pools.driving();
                for slot in (0..ents.len()).rev() {
                    let ent = ents[slot];
                    if self.pools.contains_all(ent) {
                        f(
                            ent,
                            $(self.pools.$i.get(ent).unwrap_or_else(|| unreachable!())),+
                        );
                    }
                }
            }
        }

        impl<'r, $($xs: Component),+> MultiViewMut<'r, ($($xs,)+)> {
            pub fn get(&self, ent: Entity) -> Option<($(&$xs,)+)> {
                Some(($(self.pools.$i.get(ent)?,)+))
            }

            pub fn get_mut(&mut self, ent: Entity) -> Option<($(&mut $xs,)+)> {
                Some(($(self.pools.$i.get_mut(ent)?,)+))
            }

            /// Visits every matching entity with mutable component references
            pub fn each_mut(&mut self, mut f: impl FnMut(Entity, $(&mut $xs),+)) {
                // only component values can change under us, so the driving
                // pool's dense array is stable across the walk
                let len = self.pools.driving().len();
                for slot in (0..len).rev() {
                    let ent = self.pools.driving()[slot];
                    if self.pools.contains_all(ent) {
                        let pools = &mut self.pools;
                        f(
                            ent,
                            $(pools.$i.get_mut(ent).unwrap_or_else(|| unreachable!())),+
                        );
                    }
                }
            }
        }
    };
}

impl_view_tuple!((0, C0));
impl_view_tuple!((0, C0), (1, C1));
impl_view_tuple!((0, C0), (1, C1), (2, C2));
impl_view_tuple!((0, C0), (1, C1), (2, C2), (3, C3));
impl_view_tuple!((0, C0), (1, C1), (2, C2), (3, C3), (4, C4));
impl_view_tuple!((0, C0), (1, C1), (2, C2), (3, C3), (4, C4), (5, C5));
impl_view_tuple!((0, C0), (1, C1), (2, C2), (3, C3), (4, C4), (5, C5), (6, C6));
impl_view_tuple!((0, C0), (1, C1), (2, C2), (3, C3), (4, C4), (5, C5), (6, C6), (7, C7));
impl_view_tuple!(
    (0, C0), (1, C1), (2, C2), (3, C3), (4, C4), (5, C5), (6, C6), (7, C7),
    (8, C8)
);
impl_view_tuple!(
    (0, C0), (1, C1), (2, C2), (3, C3), (4, C4), (5, C5), (6, C6), (7, C7),
    (8, C8), (9, C9)
);
impl_view_tuple!(
    (0, C0), (1, C1), (2, C2), (3, C3), (4, C4), (5, C5), (6, C6), (7, C7),
    (8, C8), (9, C9), (10, C10)
);
impl_view_tuple!(
    (0, C0), (1, C1), (2, C2), (3, C3), (4, C4), (5, C5), (6, C6), (7, C7),
    (8, C8), (9, C9), (10, C10), (11, C11)
);
impl_view_tuple!(
    (0, C0), (1, C1), (2, C2), (3, C3), (4, C4), (5, C5), (6, C6), (7, C7),
    (8, C8), (9, C9), (10, C10), (11, C11), (12, C12)
);
impl_view_tuple!(
    (0, C0), (1, C1), (2, C2), (3, C3), (4, C4), (5, C5), (6, C6), (7, C7),
    (8, C8), (9, C9), (10, C10), (11, C11), (12, C12), (13, C13)
);
impl_view_tuple!(
    (0, C0), (1, C1), (2, C2), (3, C3), (4, C4), (5, C5), (6, C6), (7, C7),
    (8, C8), (9, C9), (10, C10), (11, C11), (12, C12), (13, C13), (14, C14)
);
impl_view_tuple!(
    (0, C0), (1, C1), (2, C2), (3, C3), (4, C4), (5, C5), (6, C6), (7, C7),
    (8, C8), (9, C9), (10, C10), (11, C11), (12, C12), (13, C13), (14, C14),
    (15, C15)
);
