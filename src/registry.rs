//! Registry: container of entities, component pools and persistent groups
//!
//! The registry mediates every mutation. Component insertion and removal
//! route through it so that persistent group indices stay coherent, and
//! all four view kinds are vended from it as transient borrows.


pub mod comp;
pub mod ent;
pub mod group;
pub mod sparse;

use std::{any, any::TypeId, cmp::Ordering};

use crate::{
    registry::{
        comp::{Comp, CompMut, Component, ComponentId, ComponentPoolMap, ComponentPoolMapDisplay},
        ent::{Entity, EntityPool},
        group::GroupStorage,
    },
    view::{
        multi::{MultiView, MultiViewMut, PoolSet, PoolSetMut},
        persist::{PersistentView, PersistentViewMut},
        raw::{RawView, RawViewMut},
        runtime::RuntimeView,
        single::View,
    },
};

/// One or more component types, or a set of component sets
///
/// Implemented for any [`Component`] and for tuples, so that entities can be
/// created with a bundle of components in one call and persistent view
/// signatures can be spelled as type tuples.
pub trait ComponentSet: Send + Sync + 'static {
    /// Registers the set of component pools to the registry
    fn register(map: &mut ComponentPoolMap);
    /// Assigns the set of components to an entity
    fn assign(self, ent: Entity, reg: &mut Registry);
    /// Removes the set of components from an entity
    fn remove(ent: Entity, reg: &mut Registry);
    /// Enumerates the component types in this set
    fn type_ids() -> Box<[TypeId]>;
}

impl<T: Component> ComponentSet for T {
    fn register(map: &mut ComponentPoolMap) {
        map.register::<Self>();
    }

    fn assign(self, ent: Entity, reg: &mut Registry) {
        reg.assign(ent, self);
    }

    fn remove(ent: Entity, reg: &mut Registry) {
        reg.remove::<Self>(ent);
    }

    fn type_ids() -> Box<[TypeId]> {
        Box::new([TypeId::of::<T>()])
    }
}

// NOTE: `(T)` is `T` while `(T,)` is a tuple
macro_rules! impl_component_set {
    ($(($i:tt, $xs:ident)),+ $(,)?) => {
        impl<$($xs),+> ComponentSet for ($($xs,)+)
        where
            $($xs: ComponentSet,)+
        {
            fn register(map: &mut ComponentPoolMap) {
                $(
                    $xs::register(map);
                )+
            }

            fn assign(self, ent: Entity, reg: &mut Registry) {
                $(
                    $xs::assign(self.$i, ent, reg);
                )+
            }

            fn remove(ent: Entity, reg: &mut Registry) {
                $(
                    $xs::remove(ent, reg);
                )+
            }

            fn type_ids() -> Box<[TypeId]> {
                let mut ids = Vec::new();
                $(
                    ids.extend($xs::type_ids().iter().copied());
                )+
                ids.into_boxed_slice()
            }
        }
    };
}

impl_component_set!((0, C0));
impl_component_set!((0, C0), (1, C1));
impl_component_set!((0, C0), (1, C1), (2, C2));
impl_component_set!((0, C0), (1, C1), (2, C2), (3, C3));
impl_component_set!((0, C0), (1, C1), (2, C2), (3, C3), (4, C4));
impl_component_set!((0, C0), (1, C1), (2, C2), (3, C3), (4, C4), (5, C5));
impl_component_set!((0, C0), (1, C1), (2, C2), (3, C3), (4, C4), (5, C5), (6, C6));
impl_component_set!((0, C0), (1, C1), (2, C2), (3, C3), (4, C4), (5, C5), (6, C6), (7, C7));
impl_component_set!(
    (0, C0), (1, C1), (2, C2), (3, C3), (4, C4), (5, C5), (6, C6), (7, C7),
    (8, C8)
);
impl_component_set!(
    (0, C0), (1, C1), (2, C2), (3, C3), (4, C4), (5, C5), (6, C6), (7, C7),
    (8, C8), (9, C9)
);
impl_component_set!(
    (0, C0), (1, C1), (2, C2), (3, C3), (4, C4), (5, C5), (6, C6), (7, C7),
    (8, C8), (9, C9), (10, C10)
);
impl_component_set!(
    (0, C0), (1, C1), (2, C2), (3, C3), (4, C4), (5, C5), (6, C6), (7, C7),
    (8, C8), (9, C9), (10, C10), (11, C11)
);
impl_component_set!(
    (0, C0), (1, C1), (2, C2), (3, C3), (4, C4), (5, C5), (6, C6), (7, C7),
    (8, C8), (9, C9), (10, C10), (11, C11), (12, C12)
);
impl_component_set!(
    (0, C0), (1, C1), (2, C2), (3, C3), (4, C4), (5, C5), (6, C6), (7, C7),
    (8, C8), (9, C9), (10, C10), (11, C11), (12, C12), (13, C13)
);
impl_component_set!(
    (0, C0), (1, C1), (2, C2), (3, C3), (4, C4), (5, C5), (6, C6), (7, C7),
    (8, C8), (9, C9), (10, C10), (11, C11), (12, C12), (13, C13), (14, C14)
);
impl_component_set!(
    (0, C0), (1, C1), (2, C2), (3, C3), (4, C4), (5, C5), (6, C6), (7, C7),
    (8, C8), (9, C9), (10, C10), (11, C11), (12, C12), (13, C13), (14, C14),
    (15, C15)
);

/// In-memory database of entities and their components
///
/// # Views
///
/// Queries go through views, which are transient borrows of the pools:
///
/// - [`raw_view`](Self::raw_view): dense component slice of one pool
/// - [`view`](Self::view): entities of one pool
/// - [`multi_view`](Self::multi_view): on-the-fly join over N pools
/// - [`persistent_view`](Self::persistent_view): precomputed join index
/// - [`runtime_view`](Self::runtime_view): join over runtime component ids
///
/// All views iterate in reverse insertion order (the most recently added
/// entity comes first). Registry mutations require `&mut self`, so views
/// can never observe a pool mid-mutation.
#[derive(Debug, Default)]
pub struct Registry {
    ents: EntityPool,
    comp: ComponentPoolMap,
    groups: GroupStorage,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The entity allocator
    pub fn entities(&self) -> &EntityPool {
        &self.ents
    }

    /// Is the entity alive?
    pub fn contains(&self, ent: Entity) -> bool {
        self.ents.contains(ent)
    }

    /// Creates an empty entity
    pub fn create(&mut self) -> Entity {
        self.ents.alloc()
    }

    /// Creates an entity with a bundle of components
    pub fn create_with<S: ComponentSet>(&mut self, set: S) -> Entity {
        let ent = self.ents.alloc();
        set.assign(ent, self);
        ent
    }

    /// Destroys an entity, erasing it from every pool and every persistent
    /// group. Returns false on stale handles.
    pub fn destroy(&mut self, ent: Entity) -> bool {
        if !self.ents.dealloc(ent) {
            return false;
        }

        log::debug!("destroying {}", ent);
        for pool in self.comp.iter_mut() {
            pool.erased_remove(ent);
        }
        self.groups.on_destroyed(ent);

        true
    }

    /// Ensures the pool for `T` exists. Returns true if it already did.
    pub fn register<T: Component>(&mut self) -> bool {
        self.comp.register::<T>()
    }

    pub fn register_set<S: ComponentSet>(&mut self) {
        S::register(&mut self.comp);
    }

    /// Ensures the pool for `T` exists and can hold `additional` more
    /// components without reallocating
    pub fn reserve<T: Component>(&mut self, additional: usize) {
        self.comp.register::<T>();
        self.comp
            .get_mut::<T>()
            .unwrap_or_else(|| unreachable!())
            .reserve(additional);
    }

    /// Stable identifier of a component type, assigned on first use
    ///
    /// Assigning an id does not create a pool; a runtime view built from an
    /// id whose pool does not exist yet is empty.
    pub fn component_id<T: Component>(&mut self) -> ComponentId {
        self.comp.component_id::<T>()
    }

    /// Assigns a component to an entity, creating the pool on first use.
    /// Returns the replaced component if the entity already had one.
    ///
    /// Assigning to a destroyed entity is ignored.
    pub fn assign<T: Component>(&mut self, ent: Entity, comp: T) -> Option<T> {
        if !self.ents.contains(ent) {
            log::trace!(
                "ignoring assign of `{}` to destroyed entity {}",
                any::type_name::<T>(),
                ent
            );
            return None;
        }

        self.comp.register::<T>();
        let old = self
            .comp
            .get_mut::<T>()
            .unwrap_or_else(|| unreachable!())
            .insert(ent, comp);

        if old.is_none() {
            self.groups.on_assigned(TypeId::of::<T>(), ent, &self.comp);
        }

        old
    }

    /// [`assign`](Self::assign) for a bundle of components
    pub fn assign_set<S: ComponentSet>(&mut self, ent: Entity, set: S) {
        set.assign(ent, self);
    }

    /// Removes a component from an entity, returning it
    pub fn remove<T: Component>(&mut self, ent: Entity) -> Option<T> {
        let removed = self.comp.get_mut::<T>()?.swap_remove(ent);

        if removed.is_some() {
            self.groups.on_removed(TypeId::of::<T>(), ent, &self.comp);
        }

        removed
    }

    /// [`remove`](Self::remove) for a bundle of components
    pub fn remove_set<S: ComponentSet>(&mut self, ent: Entity) {
        S::remove(ent, self);
    }

    pub fn has<T: Component>(&self, ent: Entity) -> bool {
        self.comp.contains_raw(TypeId::of::<T>(), ent)
    }

    /// Does the entity have every component in the set?
    pub fn has_all<S: ComponentSet>(&self, ent: Entity) -> bool {
        S::type_ids()
            .iter()
            .all(|ty| self.comp.contains_raw(*ty, ent))
    }

    pub fn get<T: Component>(&mut self, ent: Entity) -> Option<&T> {
        self.comp.get_mut::<T>()?.get(ent)
    }

    pub fn get_mut<T: Component>(&mut self, ent: Entity) -> Option<&mut T> {
        self.comp.get_mut::<T>()?.get_mut(ent)
    }

    /// Borrows the component pool of type `T`
    ///
    /// # Panics
    /// Panics when the pool is not registered or exclusively borrowed.
    pub fn comp<T: Component>(&self) -> Comp<T> {
        self.comp
            .try_borrow::<T>()
            .unwrap_or_else(|err| panic!("{}", err))
    }

    /// Mutably borrows the component pool of type `T`
    ///
    /// # Panics
    /// Panics when the pool is not registered or already borrowed.
    pub fn comp_mut<T: Component>(&self) -> CompMut<T> {
        self.comp
            .try_borrow_mut::<T>()
            .unwrap_or_else(|err| panic!("{}", err))
    }

    /// The component pool map, for fallible borrows
    pub fn pools(&self) -> &ComponentPoolMap {
        &self.comp
    }

    /// View over the dense component array of one pool
    pub fn raw_view<T: Component>(&self) -> RawView<T> {
        RawView::new(self.comp())
    }

    /// [`raw_view`](Self::raw_view) with mutable component access
    pub fn raw_view_mut<T: Component>(&self) -> RawViewMut<T> {
        RawViewMut::new(self.comp_mut())
    }

    /// View over the entities of one pool
    pub fn view<T: Component>(&self) -> View<T> {
        View::new(self.comp())
    }

    /// On-the-fly join view over the pools of a component tuple
    ///
    /// Iteration is driven by the smallest pool; among equally small pools
    /// the leftmost type in the tuple wins.
    pub fn multi_view<'r, S: PoolSet<'r>>(&'r self) -> MultiView<'r, S> {
        match S::borrow(&self.comp) {
            Ok(pools) => MultiView::new(pools),
            Err(err) => panic!("{}", err),
        }
    }

    /// [`multi_view`](Self::multi_view) with mutable component access
    pub fn multi_view_mut<'r, S: PoolSetMut<'r>>(&'r self) -> MultiViewMut<'r, S> {
        match S::borrow_mut(&self.comp) {
            Ok(pools) => MultiViewMut::new(pools),
            Err(err) => panic!("{}", err),
        }
    }

    /// Indexed join view over the pools of a component tuple
    ///
    /// The backing entity set is created and filled on the first request of
    /// this signature and maintained incrementally afterwards, so requesting
    /// the same view again is cheap.
    pub fn persistent_view<'r, S: PoolSet<'r>>(&'r mut self) -> PersistentView<'r, S> {
        S::register(&mut self.comp);
        let index = self.groups.ensure(S::type_ids(), Box::new([]), &self.comp);

        let group = self.groups.get_mut(index);
        match S::borrow(&self.comp) {
            Ok(pools) => PersistentView::new(&mut group.set, pools),
            Err(err) => panic!("{}", err),
        }
    }

    /// [`persistent_view`](Self::persistent_view) excluding entities that
    /// have any component named by `X`
    pub fn persistent_view_excluding<'r, S: PoolSet<'r>, X: ComponentSet>(
        &'r mut self,
    ) -> PersistentView<'r, S> {
        S::register(&mut self.comp);
        X::register(&mut self.comp);
        let index = self
            .groups
            .ensure(S::type_ids(), X::type_ids(), &self.comp);

        let group = self.groups.get_mut(index);
        match S::borrow(&self.comp) {
            Ok(pools) => PersistentView::new(&mut group.set, pools),
            Err(err) => panic!("{}", err),
        }
    }

    /// [`persistent_view`](Self::persistent_view) with mutable component access
    pub fn persistent_view_mut<'r, S: PoolSetMut<'r>>(&'r mut self) -> PersistentViewMut<'r, S> {
        S::register(&mut self.comp);
        let index = self.groups.ensure(S::type_ids(), Box::new([]), &self.comp);

        let group = self.groups.get_mut(index);
        match S::borrow_mut(&self.comp) {
            Ok(pools) => PersistentViewMut::new(&mut group.set, pools),
            Err(err) => panic!("{}", err),
        }
    }

    /// Join view over pools named by runtime component ids
    ///
    /// A pool that does not exist when the view is built makes the view
    /// permanently empty, even if the pool is created afterwards. An empty
    /// id range also yields an empty view.
    pub fn runtime_view(&self, ids: &[ComponentId]) -> RuntimeView {
        let mut pools = Vec::with_capacity(ids.len());

        for id in ids {
            let pool = self
                .comp
                .type_of(*id)
                .and_then(|ty| self.comp.borrow_erased(ty));
            match pool {
                Some(pool) => pools.push(pool),
                None => return RuntimeView::missing_pool(),
            }
        }

        RuntimeView::new(pools)
    }

    /// Reorders the pool of `T` so that iterating a view over `T` yields
    /// components in the order induced by `cmp`
    ///
    /// Invalidates nothing that is alive (views cannot be held across it),
    /// but persistent views keep their own order until their
    /// [`sort`](crate::view::persist::PersistentView::sort) is called.
    ///
    /// # Panics
    /// Panics when the pool is not registered.
    pub fn sort_by<T: Component>(&mut self, mut cmp: impl FnMut(&T, &T) -> Ordering) {
        match self.comp.get_mut::<T>() {
            // dense order is the reverse of iteration order
            Some(pool) => pool.sort_by(move |a, b| cmp(b, a)),
            None => self::sort_panic::<T>(),
        }
    }

    /// [`sort_by`](Self::sort_by) with a comparator over entities
    pub fn sort_by_entity<T: Component>(&mut self, mut cmp: impl FnMut(&Entity, &Entity) -> Ordering) {
        match self.comp.get_mut::<T>() {
            Some(pool) => pool.sort_by_entity(move |a, b| cmp(b, a)),
            None => self::sort_panic::<T>(),
        }
    }

    /// Returns a debug display of the component pools. This is safe because
    /// it has exclusive access.
    pub fn display(&mut self) -> ComponentPoolMapDisplay {
        self.comp.display()
    }
}

fn sort_panic<T>() -> ! {
    panic!(
        "tried to sort unregistered component pool of `{}`",
        any::type_name::<T>()
    )
}
