//! Authoritative keyed collections of live entities.
//!
//! Registries are driven by `protocol::apply_delta` and are the only place entity state is
//! mutated. Collaborators read through `EntityRegistry` and mirror changes by subscribing a
//! `RegistryObserver`.

pub mod signals;
pub mod vehicles;

pub use signals::*;
pub use vehicles::*;

/// Change notifications for one registry. Every hook defaults to doing nothing.
pub trait RegistryObserver<S> {
    fn on_created(&mut self, _id: &str, _state: &S) {}
    fn on_updated(&mut self, _id: &str, _state: &S) {}
    /// Called while the entity is still present, so references to it can be released.
    fn on_removed(&mut self, _id: &str, _state: &S) {}
}

/// Read-only query surface shared by every registry.
pub trait EntityRegistry {
    type State;

    fn get(&self, id: &str) -> Option<&Self::State>;
    fn for_each_live(&self, f: &mut dyn FnMut(&str, &Self::State));
    fn len(&self) -> usize;

    fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
