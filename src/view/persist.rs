//! Persistent views: joins backed by an incrementally maintained index
//!
//! Where a [`MultiView`](crate::view::multi::MultiView) filters on the fly,
//! a persistent view walks a dense entity set the registry keeps up to date
//! on every assign/remove/destroy, so iteration is O(set size) with no
//! per-element membership checks.

use std::any::{self, TypeId};

use crate::{
    registry::{
        comp::Component,
        ent::Entity,
        group::EntitySet,
    },
    view::{
        multi::{JoinPools, PoolSet, PoolSetMut},
        EntityIter,
    },
};

/// Indexed join view over the pools of the component tuple `S`
///
/// `len` is exact. The set's order is not meaningful to callers but is
/// deterministic, and can be aligned with one member pool's order via
/// [`sort`](Self::sort).
pub struct PersistentView<'r, S: PoolSet<'r>> {
    set: &'r mut EntitySet,
    pools: S::Pools,
}

impl<'r, S: PoolSet<'r>> PersistentView<'r, S> {
    pub(crate) fn new(set: &'r mut EntitySet, pools: S::Pools) -> Self {
        Self { set, pools }
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn contains(&self, ent: Entity) -> bool {
        self.set.contains(ent)
    }

    /// The matching entities, in the set's dense order
    pub fn data(&self) -> &[Entity] {
        self.set.entities()
    }

    /// Matching entities in view order (reverse of [`data`](Self::data))
    pub fn iter(&self) -> EntityIter {
        EntityIter::new(self.set.entities())
    }

    /// Reorders the set to follow the current order of `U`'s pool
    ///
    /// `U` must be part of the view's include list, which guarantees every
    /// entity of the set is present in `U`'s pool. After the call,
    /// iterating the view visits entities in the same order as iterating a
    /// view over `U` alone.
    pub fn sort<U: Component>(&mut self) {
        let order = self
            .pools
            .entities_of(TypeId::of::<U>())
            .unwrap_or_else(|| self::sort_panic::<U>());
        self.set.sort_to_match(order);
    }
}

/// [`PersistentView`] with mutable access to the components
pub struct PersistentViewMut<'r, S: PoolSetMut<'r>> {
    set: &'r mut EntitySet,
    pools: S::Pools,
}

impl<'r, S: PoolSetMut<'r>> PersistentViewMut<'r, S> {
    pub(crate) fn new(set: &'r mut EntitySet, pools: S::Pools) -> Self {
        Self { set, pools }
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn contains(&self, ent: Entity) -> bool {
        self.set.contains(ent)
    }

    pub fn data(&self) -> &[Entity] {
        self.set.entities()
    }

    pub fn iter(&self) -> EntityIter {
        EntityIter::new(self.set.entities())
    }

    pub fn sort<U: Component>(&mut self) {
        let order = self
            .pools
            .entities_of(TypeId::of::<U>())
            .unwrap_or_else(|| self::sort_panic::<U>());
        self.set.sort_to_match(order);
    }
}

fn sort_panic<U>() -> ! {
    panic!(
        "component type `{}` is not part of this persistent view",
        any::type_name::<U>()
    )
}

macro_rules! impl_persistent_view {
    ($(($i:tt, $xs:ident)),+ $(,)?) => {
        impl<'r, $($xs: Component),+> PersistentView<'r, ($($xs,)+)> {
            /// Component references of `ent`
            pub fn get(&self, ent: Entity) -> Option<($(&$xs,)+)> {
                Some(($(self.pools.$i.get(ent)?,)+))
            }

            /// Visits every entity of the set exactly once, in view order
            pub fn each(&self, mut f: impl FnMut(Entity, $(&$xs),+)) {
                let ents = self.set.entities();
                for slot in (0..ents.len()).rev() {
                    let ent = ents[slot];
                    f(
                        ent,
                        $(self.pools.$i.get(ent).unwrap_or_else(|| unreachable!())),+
                    );
                }
            }
        }

        impl<'r, $($xs: Component),+> PersistentViewMut<'r, ($($xs,)+)> {
            pub fn get(&self, ent: Entity) -> Option<($(&$xs,)+)> {
                Some(($(self.pools.$i.get(ent)?,)+))
            }

            pub fn get_mut(&mut self, ent: Entity) -> Option<($(&mut $xs,)+)> {
                Some(($(self.pools.$i.get_mut(ent)?,)+))
            }

            /// Visits every entity of the set with mutable component references
            pub fn each_mut(&mut self, mut f: impl FnMut(Entity, $(&mut $xs),+)) {
                let len = self.set.len();
                for slot in (0..len).rev() {
                    let ent = self.set.entities()[slot];
                    let pools = &mut self.pools;
                    f(
                        ent,
                        $(pools.$i.get_mut(ent).unwrap_or_else(|| unreachable!())),+
                    );
                }
            }
        }
    };
}

impl_persistent_view!((0, C0));
impl_persistent_view!((0, C0), (1, C1));
impl_persistent_view!((0, C0), (1, C1), (2, C2));
impl_persistent_view!((0, C0), (1, C1), (2, C2), (3, C3));
impl_persistent_view!((0, C0), (1, C1), (2, C2), (3, C3), (4, C4));
impl_persistent_view!((0, C0), (1, C1), (2, C2), (3, C3), (4, C4), (5, C5));
impl_persistent_view!((0, C0), (1, C1), (2, C2), (3, C3), (4, C4), (5, C5), (6, C6));
impl_persistent_view!((0, C0), (1, C1), (2, C2), (3, C3), (4, C4), (5, C5), (6, C6), (7, C7));
impl_persistent_view!(
    (0, C0), (1, C1), (2, C2), (3, C3), (4, C4), (5, C5), (6, C6), (7, C7),
    (8, C8)
);
impl_persistent_view!(
    (0, C0), (1, C1), (2, C2), (3, C3), (4, C4), (5, C5), (6, C6), (7, C7),
    (8, C8), (9, C9)
);
impl_persistent_view!(
    (0, C0), (1, C1), (2, C2), (3, C3), (4, C4), (5, C5), (6, C6), (7, C7),
    (8, C8), (9, C9), (10, C10)
);
impl_persistent_view!(
    (0, C0), (1, C1), (2, C2), (3, C3), (4, C4), (5, C5), (6, C6), (7, C7),
    (8, C8), (9, C9), (10, C10), (11, C11)
);
impl_persistent_view!(
    (0, C0), (1, C1), (2, C2), (3, C3), (4, C4), (5, C5), (6, C6), (7, C7),
    (8, C8), (9, C9), (10, C10), (11, C11), (12, C12)
);
impl_persistent_view!(
    (0, C0), (1, C1), (2, C2), (3, C3), (4, C4), (5, C5), (6, C6), (7, C7),
    (8, C8), (9, C9), (10, C10), (11, C11), (12, C12), (13, C13)
);
impl_persistent_view!(
    (0, C0), (1, C1), (2, C2), (3, C3), (4, C4), (5, C5), (6, C6), (7, C7),
    (8, C8), (9, C9), (10, C10), (11, C11), (12, C12), (13, C13), (14, C14)
);
impl_persistent_view!(
    (0, C0), (1, C1), (2, C2), (3, C3), (4, C4), (5, C5), (6, C6), (7, C7),
    (8, C8), (9, C9), (10, C10), (11, C11), (12, C12), (13, C13), (14, C14),
    (15, C15)
);
