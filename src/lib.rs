/*!
Entity-component registry based on sparse sets

Components live by value in dense, per-type pools; a central [`Registry`]
mediates every mutation and vends four view flavors for iterating entities
that match a conjunction of component types.

[`Registry`]: crate::registry::Registry
*/

pub mod registry;
pub mod view;

pub use crate::registry::Registry;

pub mod prelude {
    pub use crate::{
        registry::{
            comp::{Comp, CompMut, Component, ComponentId},
            ent::Entity,
            ComponentSet, Registry,
        },
        view::{
            multi::{MultiView, MultiViewMut},
            persist::{PersistentView, PersistentViewMut},
            raw::{RawView, RawViewMut},
            runtime::RuntimeView,
            single::View,
        },
    };
}
