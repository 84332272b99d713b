//! Non-root nodes of an aggregate tree.
//!
//! An entity is owned by exactly one parent (the root or another entity) and
//! owns its own children. It knows its full [`EntityIdPath`], so it can
//! address events to itself and report duplicate or missing children with
//! complete diagnostics, but it holds no reference to its parent: the path's
//! first element is the only link back to the root.
//!
//! Adding a child is two-phase:
//!
//! 1. The business operation checks [`FindChild`](crate::dispatch::FindChild)
//!    for an existing child and fails with
//!    [`AggregateError::DuplicateEntity`] if one exists
//!    ([`Entity::ensure_absent`] does this).
//! 2. It builds an event addressed to the parent; the parent's applier pushes
//!    the new child.

use crate::dispatch::{self, EventSourced, FindChild};
use crate::entity_id::{AnyEntityId, EntityId};
use crate::error::AggregateError;
use crate::event::DomainEvent;
use crate::path::EntityIdPath;
use std::fmt;
use std::sync::Arc;

/// State every entity carries: its address and the last event it applied.
#[derive(Clone)]
pub struct EntityBase {
    path: EntityIdPath,
    last_applied: Option<Arc<dyn DomainEvent>>,
}

impl EntityBase {
    /// State for an entity addressed by `path`.
    #[must_use]
    pub const fn new(path: EntityIdPath) -> Self {
        Self {
            path,
            last_applied: None,
        }
    }

    /// State for a child with identifier `id` under `parent`.
    #[must_use]
    pub fn child_of(parent: &EntityIdPath, id: impl Into<AnyEntityId>) -> Self {
        Self::new(parent.child(id))
    }

    /// Path from the aggregate root to this entity.
    #[must_use]
    pub const fn path(&self) -> &EntityIdPath {
        &self.path
    }

    /// This entity's identifier.
    #[must_use]
    pub fn id(&self) -> &AnyEntityId {
        self.path.last()
    }

    /// The identifier of the aggregate root owning this entity.
    #[must_use]
    pub fn root_id(&self) -> &AnyEntityId {
        self.path.first()
    }

    /// The last event this entity applied itself.
    #[must_use]
    pub const fn last_applied(&self) -> Option<&Arc<dyn DomainEvent>> {
        self.last_applied.as_ref()
    }

    pub(crate) fn record_applied(&mut self, event: &Arc<dyn DomainEvent>) {
        self.last_applied = Some(Arc::clone(event));
    }
}

impl fmt::Debug for EntityBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityBase")
            .field("path", &self.path)
            .field(
                "last_applied",
                &self.last_applied.as_ref().map(|event| event.event_type()),
            )
            .finish()
    }
}

/// A non-root node of an aggregate tree.
///
/// An entity holds no link to its root beyond the root identifier at the
/// front of its path. Version and uncommitted changes live only on the
/// [`AggregateRoot`](crate::aggregate::AggregateRoot); read them there, since
/// every change to an entity is applied through the root.
pub trait Entity: EventSourced {
    /// The shared entity state.
    fn base(&self) -> &EntityBase;

    /// The shared entity state, mutably.
    fn base_mut(&mut self) -> &mut EntityBase;

    /// Path from the aggregate root to this entity.
    fn path(&self) -> &EntityIdPath {
        self.base().path()
    }

    /// Find the child identified by `id` or fail with
    /// [`AggregateError::EntityNotFound`] naming this entity's path.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::EntityNotFound`] if no such child exists.
    fn require_child<I>(
        &self,
        id: &I,
    ) -> Result<&<Self as FindChild<I>>::Child, AggregateError>
    where
        I: EntityId + Clone,
        Self: FindChild<I>,
    {
        self.find_child(id)
            .ok_or_else(|| AggregateError::entity_not_found(self.path(), id.clone()))
    }

    /// Fail with [`AggregateError::DuplicateEntity`] if a child identified by
    /// `id` already exists.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::DuplicateEntity`] naming this entity's path and
    /// the candidate identifier.
    fn ensure_absent<I>(&self, id: &I) -> Result<(), AggregateError>
    where
        I: EntityId + Clone,
        Self: FindChild<I>,
    {
        match self.find_child(id) {
            Some(_) => Err(AggregateError::duplicate_entity(self.path(), id.clone())),
            None => Ok(()),
        }
    }
}

/// Object-safe view of any entity, used to walk the tree during dispatch.
pub trait EntityNode: Send + Sync + 'static {
    /// Path from the aggregate root to this entity.
    fn entity_id_path(&self) -> &EntityIdPath;

    /// The last event this entity applied itself.
    fn last_applied(&self) -> Option<&Arc<dyn DomainEvent>>;

    /// Apply an event addressed to this entity and record it as last applied.
    ///
    /// # Errors
    ///
    /// Returns any dispatch or applier error.
    fn apply_event(&mut self, event: &Arc<dyn DomainEvent>) -> Result<(), AggregateError>;

    /// Look up a direct child.
    ///
    /// # Errors
    ///
    /// Returns a dispatch error if this entity declares no locator for the
    /// identifier's type.
    fn child_node(
        &mut self,
        id: &AnyEntityId,
    ) -> Result<Option<&mut dyn EntityNode>, AggregateError>;
}

impl<T: Entity> EntityNode for T {
    fn entity_id_path(&self) -> &EntityIdPath {
        self.base().path()
    }

    fn last_applied(&self) -> Option<&Arc<dyn DomainEvent>> {
        self.base().last_applied()
    }

    fn apply_event(&mut self, event: &Arc<dyn DomainEvent>) -> Result<(), AggregateError> {
        dispatch::apply_event(self, &**event)?;
        self.base_mut().record_applied(event);
        Ok(())
    }

    fn child_node(
        &mut self,
        id: &AnyEntityId,
    ) -> Result<Option<&mut dyn EntityNode>, AggregateError> {
        dispatch::locate_child(self, id)
    }
}
