/*!
Components: data attached to entities

Each component type is stored in a [`ComponentPool`] backed by a
[`SparseSet`]. Pools live in type-erased cells keyed by [`TypeId`], and a
small dense [`ComponentId`] is assigned per type on first use so that
runtime views can name component types without compile-time knowledge.
*/

pub use sparsecs_derive::Component;

use std::{
    any::{self, TypeId},
    cell::RefCell,
    cmp::Ordering,
    fmt, ops,
};

use atomic_refcell::{AtomicRef, AtomicRefCell, AtomicRefMut};
use downcast_rs::{impl_downcast, Downcast};
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::registry::{ent::Entity, sparse::SparseSet};

/// Type boundary for component types
pub trait Component: 'static + fmt::Debug + Send + Sync {}

/// Failure to borrow a component pool
#[derive(Error, Debug)]
pub enum BorrowError {
    #[error("component pool of `{0}` does not exist")]
    MissingPool(&'static str),
    #[error("component pool of `{0}` is borrowed incompatibly")]
    Conflict(&'static str),
}

/// Stable, dense identifier of a component type
///
/// Assigned per type on first use, in registration order. Unlike
/// [`TypeId`] it is small and usable as an array index, which is what
/// runtime views are built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(u32);

impl ComponentId {
    pub fn to_usize(&self) -> usize {
        self.0 as usize
    }
}

/// Metadata for types stored in the pool map
#[derive(Debug, Clone)]
pub(crate) struct TypeInfo {
    pub ty: TypeId,
    /// Type name string for debug print
    #[allow(unused)]
    pub name: &'static str,
}

impl TypeInfo {
    pub fn of<T: 'static>() -> Self {
        Self {
            ty: TypeId::of::<T>(),
            name: any::type_name::<T>(),
        }
    }
}

/// Assigns a dense [`ComponentId`] per component type on first use
#[derive(Debug, Default)]
struct TypeIdTable {
    to_id: FxHashMap<TypeId, ComponentId>,
    infos: Vec<TypeInfo>,
}

impl TypeIdTable {
    fn get_or_insert<T: Component>(&mut self) -> ComponentId {
        let info = TypeInfo::of::<T>();
        match self.to_id.get(&info.ty) {
            Some(id) => *id,
            None => {
                let id = ComponentId(self.infos.len() as u32);
                self.to_id.insert(info.ty, id);
                self.infos.push(info);
                id
            }
        }
    }

    fn type_of(&self, id: ComponentId) -> Option<TypeId> {
        Some(self.infos.get(id.to_usize())?.ty)
    }
}

/// SoA storage of components backed by sparse sets
#[derive(Debug, Default)]
pub struct ComponentPoolMap {
    cells: FxHashMap<TypeId, AtomicRefCell<ErasedPool>>,
    ids: TypeIdTable,
}

#[derive(Debug)]
struct ErasedPool {
    /// Type name string for debug print
    #[allow(unused)]
    of_type: &'static str,
    erased: Box<dyn ErasedComponentPool>,
}

impl ErasedPool {
    fn typed<T: Component>(&self) -> &ComponentPool<T> {
        self.erased
            .downcast_ref()
            .unwrap_or_else(|| unreachable!())
    }

    fn typed_mut<T: Component>(&mut self) -> &mut ComponentPool<T> {
        self.erased
            .downcast_mut()
            .unwrap_or_else(|| unreachable!())
    }
}

/// Upcast of `ComponentPool<T>`s
///
/// The erased surface is what entity destruction and runtime views operate
/// on; typed access goes through downcasting.
pub(crate) trait ErasedComponentPool: Downcast + fmt::Debug {
    fn erased_remove(&mut self, entity: Entity);
    fn len(&self) -> usize;
    fn entities(&self) -> &[Entity];
    fn contains_entity(&self, entity: Entity) -> bool;
}

impl_downcast!(ErasedComponentPool);

impl ComponentPoolMap {
    pub fn is_registered<T: Component>(&self) -> bool {
        self.is_registered_raw(TypeId::of::<T>())
    }

    /// [`is_registered`] by `TypeId`
    ///
    /// [`is_registered`]: Self::is_registered
    pub fn is_registered_raw(&self, ty: TypeId) -> bool {
        self.cells.contains_key(&ty)
    }

    /// Registers a component pool for type `T`. Returns true if it was already registered.
    pub fn register<T: Component>(&mut self) -> bool {
        let ty = TypeId::of::<T>();
        self.ids.get_or_insert::<T>();

        if self.cells.contains_key(&ty) {
            return true;
        }

        log::trace!("registering component pool of `{}`", any::type_name::<T>());

        let pool = ErasedPool {
            erased: Box::new(ComponentPool::<T>::default()),
            of_type: any::type_name::<T>(),
        };

        self.cells.insert(ty, AtomicRefCell::new(pool));
        false
    }

    /// Assigns a [`ComponentId`] without creating a pool
    pub fn component_id<T: Component>(&mut self) -> ComponentId {
        self.ids.get_or_insert::<T>()
    }

    /// The `TypeId` a [`ComponentId`] was assigned for
    pub(crate) fn type_of(&self, id: ComponentId) -> Option<TypeId> {
        self.ids.type_of(id)
    }

    /// The cell for type `T`, or the error every borrow path reports
    fn cell<T: Component>(&self) -> Result<&AtomicRefCell<ErasedPool>, BorrowError> {
        self.cells
            .get(&TypeId::of::<T>())
            .ok_or(BorrowError::MissingPool(any::type_name::<T>()))
    }

    /// Tries to get an immutable access to a component pool
    pub fn try_borrow<T: Component>(&self) -> Result<Comp<T>, BorrowError> {
        let pool = self
            .cell::<T>()?
            .try_borrow()
            .map_err(|_| BorrowError::Conflict(any::type_name::<T>()))?;

        Ok(PoolRef {
            borrow: AtomicRef::map(pool, ErasedPool::typed::<T>),
        })
    }

    /// Tries to get a mutable access to a component pool
    pub fn try_borrow_mut<T: Component>(&self) -> Result<CompMut<T>, BorrowError> {
        let pool = self
            .cell::<T>()?
            .try_borrow_mut()
            .map_err(|_| BorrowError::Conflict(any::type_name::<T>()))?;

        Ok(PoolRef {
            borrow: AtomicRefMut::map(pool, ErasedPool::typed_mut::<T>),
        })
    }

    pub fn get_mut<T: Component>(&mut self) -> Option<&mut ComponentPool<T>> {
        let pool = self.cells.get_mut(&TypeId::of::<T>())?.get_mut();
        pool.erased.downcast_mut()
    }

    /// Erased, shared access to a pool by `TypeId`
    ///
    /// # Panics
    /// Panics when the pool is exclusively borrowed.
    pub(crate) fn borrow_erased(&self, ty: TypeId) -> Option<AtomicRef<dyn ErasedComponentPool>> {
        let cell = self.cells.get(&ty)?;
        Some(AtomicRef::map(cell.borrow(), |pool| &*pool.erased))
    }

    /// O(1) membership check through the erased surface
    pub(crate) fn contains_raw(&self, ty: TypeId, ent: Entity) -> bool {
        match self.borrow_erased(ty) {
            Some(pool) => pool.contains_entity(ent),
            None => false,
        }
    }

    pub(crate) fn len_raw(&self, ty: TypeId) -> Option<usize> {
        Some(self.borrow_erased(ty)?.len())
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut dyn ErasedComponentPool> {
        self.cells
            .values_mut()
            .map(|cell| &mut *cell.get_mut().erased)
    }

    /// Returns a debug display. This is safe because it has exclusive access.
    pub fn display(&mut self) -> ComponentPoolMapDisplay {
        ComponentPoolMapDisplay {
            map: RefCell::new(self),
        }
    }
}

/// See [`ComponentPoolMap::display`]
///
/// Holds the map exclusively, so pool contents can be read without going
/// through the cells.
pub struct ComponentPoolMapDisplay<'r> {
    map: RefCell<&'r mut ComponentPoolMap>,
}

impl<'r> fmt::Debug for ComponentPoolMapDisplay<'r> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = self.map.borrow_mut();
        let mut entries = f.debug_map();

        for cell in map.cells.values_mut() {
            let pool = cell.get_mut();
            entries.entry(&pool.of_type, &pool.erased);
        }

        entries.finish()
    }
}

/// Sparse set of components of type `T`
///
/// The dense entity array and the dense component array are co-indexed.
/// Iteration through views visits dense slots from the back, so the
/// observable order is reverse insertion order.
pub struct ComponentPool<T> {
    set: SparseSet<T>,
}

impl<T: Component> ErasedComponentPool for ComponentPool<T> {
    fn erased_remove(&mut self, entity: Entity) {
        self.swap_remove(entity);
    }

    fn len(&self) -> usize {
        self.set.len()
    }

    fn entities(&self) -> &[Entity] {
        Entity::cast_slice(self.set.indices())
    }

    fn contains_entity(&self, entity: Entity) -> bool {
        self.set.contains(entity.0)
    }
}

impl<T: Component> fmt::Debug for ComponentPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.set.as_slice()).finish()
    }
}

impl<T> Default for ComponentPool<T> {
    fn default() -> Self {
        Self {
            set: Default::default(),
        }
    }
}

impl<T> ComponentPool<T> {
    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn contains(&self, ent: Entity) -> bool {
        self.set.contains(ent.0)
    }

    pub fn get(&self, ent: Entity) -> Option<&T> {
        self.set.get(ent.0)
    }

    pub fn get_mut(&mut self, ent: Entity) -> Option<&mut T> {
        self.set.get_mut(ent.0)
    }

    pub fn get2_mut(&mut self, a: Entity, b: Entity) -> Option<(&mut T, &mut T)> {
        debug_assert!(a != b);
        let a = self.set.get_mut(a.0)? as *mut _;
        let b = self.set.get_mut(b.0)? as *mut _;
        unsafe { Some((&mut *a, &mut *b)) }
    }

    /// The slot of `ent` in the dense arrays
    pub fn dense_index_of(&self, ent: Entity) -> Option<usize> {
        self.set.dense_index_of(ent.0)
    }

    pub fn as_slice(&self) -> &[T] {
        self.set.as_slice()
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.set.as_mut_slice()
    }

    pub fn entities(&self) -> &[Entity] {
        Entity::cast_slice(self.set.indices())
    }

    pub fn as_slice_with_entities(&self) -> (&[Entity], &[T]) {
        let (sparse, comps) = self.set.as_slice_with_indices();
        (Entity::cast_slice(sparse), comps)
    }

    pub fn as_mut_slice_with_entities(&mut self) -> (&[Entity], &mut [T]) {
        let (sparse, comps) = self.set.as_mut_slice_with_indices();
        (Entity::cast_slice(sparse), comps)
    }

    pub(crate) fn reserve(&mut self, additional: usize) {
        self.set.reserve(additional);
    }

    pub(crate) fn insert(&mut self, ent: Entity, comp: T) -> Option<T> {
        self.set.insert(ent.0, comp)
    }

    pub(crate) fn swap_remove(&mut self, ent: Entity) -> Option<T> {
        self.set.swap_remove(ent.0)
    }

    pub(crate) fn sort_by(&mut self, cmp: impl FnMut(&T, &T) -> Ordering) {
        self.set.sort_by(cmp);
    }

    pub(crate) fn sort_by_entity(&mut self, mut cmp: impl FnMut(&Entity, &Entity) -> Ordering) {
        self.set
            .sort_by_index(|a, b| cmp(&Entity(*a), &Entity(*b)));
    }
}

impl<T> ops::Index<Entity> for ComponentPool<T> {
    type Output = T;
    fn index(&self, index: Entity) -> &Self::Output {
        self.get(index)
            .unwrap_or_else(|| self::get_panic::<T>(index))
    }
}

impl<T> ops::IndexMut<Entity> for ComponentPool<T> {
    fn index_mut(&mut self, index: Entity) -> &mut Self::Output {
        self.get_mut(index)
            .unwrap_or_else(|| self::get_panic::<T>(index))
    }
}

fn get_panic<T>(index: Entity) -> ! {
    panic!(
        "Unable to retrieve component of type {} from entity {}",
        any::type_name::<T>(),
        index
    );
}

/// Borrow guard over a component pool
///
/// One wrapper serves both access modes: [`Comp`] carries a shared cell
/// borrow and [`CompMut`] an exclusive one. Pool methods are reached
/// through deref, and mutable ones only exist when the inner borrow is
/// itself mutable.
#[derive(Debug)]
pub struct PoolRef<B> {
    borrow: B,
}

/// Immutable access to a component pool of type `T`
pub type Comp<'r, T> = PoolRef<AtomicRef<'r, ComponentPool<T>>>;

/// Mutable access to a component pool of type `T`
pub type CompMut<'r, T> = PoolRef<AtomicRefMut<'r, ComponentPool<T>>>;

impl<B: ops::Deref> ops::Deref for PoolRef<B> {
    type Target = B::Target;
    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.borrow
    }
}

impl<B: ops::DerefMut> ops::DerefMut for PoolRef<B> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.borrow
    }
}

impl<B: ops::Deref> AsRef<B::Target> for PoolRef<B> {
    #[inline]
    fn as_ref(&self) -> &B::Target {
        &self.borrow
    }
}

impl<B: ops::DerefMut> AsMut<B::Target> for PoolRef<B> {
    #[inline]
    fn as_mut(&mut self) -> &mut B::Target {
        &mut self.borrow
    }
}
