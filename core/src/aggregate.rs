//! Aggregate roots: the entry point and consistency boundary of an entity tree.
//!
//! A root changes state only by applying domain events. Each event is routed
//! along its [`EntityIdPath`] to the node responsible for it (the root itself
//! for single-element paths, otherwise a descendant found by successive child
//! lookups) and that node's applier mutates it.
//!
//! # Version bookkeeping
//!
//! | Operation                      | `version`          | uncommitted changes |
//! |--------------------------------|--------------------|---------------------|
//! | `apply(e)`                     | unchanged          | `e` appended        |
//! | `load_from_history(events)`    | `+ events.len()`   | unchanged (empty)   |
//! | `mark_changes_as_committed()`  | `= next_version()` | cleared             |
//!
//! `next_version()` is always `version + uncommitted.len()`. A root built by a
//! domain constructor that applies its creation event therefore starts at
//! version `-1` with one uncommitted change and next version `0`.
//!
//! # Concurrency
//!
//! Aggregates are plain single-threaded values. Loading, locking (optimistic,
//! via the expected version) and persisting them one at a time is the job of
//! whatever repository embeds this crate.

use crate::dispatch::{self, EventSourced, FindChild};
use crate::entity::EntityNode;
use crate::entity_id::{AnyEntityId, EntityId};
use crate::error::AggregateError;
use crate::event::DomainEvent;
use crate::path::EntityIdPath;
use crate::version::Version;
use std::fmt;
use std::sync::Arc;

/// Version and change tracking embedded in every aggregate root.
#[derive(Clone, Default)]
pub struct AggregateState {
    version: Version,
    uncommitted: Vec<Arc<dyn DomainEvent>>,
    last_applied: Option<Arc<dyn DomainEvent>>,
}

impl AggregateState {
    /// Fresh state: version [`Version::NONE`], no changes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The last committed version.
    #[must_use]
    pub const fn version(&self) -> Version {
        self.version
    }

    /// The version the aggregate will have once pending changes are committed.
    #[must_use]
    pub fn next_version(&self) -> Version {
        self.version + self.uncommitted.len()
    }

    /// Events applied since the last commit, in application order.
    #[must_use]
    pub fn uncommitted_changes(&self) -> &[Arc<dyn DomainEvent>] {
        &self.uncommitted
    }

    /// The last event the root applied itself.
    #[must_use]
    pub const fn last_applied(&self) -> Option<&Arc<dyn DomainEvent>> {
        self.last_applied.as_ref()
    }
}

impl fmt::Debug for AggregateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregateState")
            .field("version", &self.version)
            .field(
                "uncommitted",
                &self
                    .uncommitted
                    .iter()
                    .map(|event| event.event_type())
                    .collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

/// The root of an aggregate's entity tree.
///
/// Implementors embed an [`AggregateState`] and declare their appliers and
/// child locators through [`EventSourced`]. All event application goes
/// through the provided methods.
///
/// # Example
///
/// ```ignore
/// #[derive(Default)]
/// struct Vendor {
///     state: AggregateState,
///     id: Option<VendorId>,
///     contacts: Vec<Contact>,
/// }
///
/// impl Vendor {
///     fn create(id: VendorId) -> Result<Self, AggregateError> {
///         let mut vendor = Self::default();
///         vendor.apply(VendorCreated::new(id))?;
///         Ok(vendor)
///     }
/// }
/// ```
pub trait AggregateRoot: EventSourced {
    /// The embedded version and change tracking.
    fn aggregate_state(&self) -> &AggregateState;

    /// The embedded version and change tracking, mutably.
    fn aggregate_state_mut(&mut self) -> &mut AggregateState;

    /// The root's identifier, or `None` before its creation event is applied.
    fn root_id(&self) -> Option<AnyEntityId>;

    /// The last committed version (`-1` if never committed).
    fn version(&self) -> Version {
        self.aggregate_state().version()
    }

    /// `version() + uncommitted_changes().len()`.
    fn next_version(&self) -> Version {
        self.aggregate_state().next_version()
    }

    /// Events applied since the last commit.
    fn uncommitted_changes(&self) -> &[Arc<dyn DomainEvent>] {
        self.aggregate_state().uncommitted_changes()
    }

    /// The last event the root applied itself.
    fn last_applied(&self) -> Option<&Arc<dyn DomainEvent>> {
        self.aggregate_state().last_applied()
    }

    /// Path addressing the root itself.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::Rejected`] if the root has not been created.
    fn root_path(&self) -> Result<EntityIdPath, AggregateError> {
        self.root_id()
            .map(EntityIdPath::single)
            .ok_or_else(|| AggregateError::rejected("Aggregate has not been created"))
    }

    /// Apply a new event: route it to its target, then record it as an
    /// uncommitted change.
    ///
    /// The event is recorded only if its applier succeeds.
    ///
    /// # Errors
    ///
    /// - [`AggregateError::EntityNotFound`] if a path segment names a missing child.
    /// - Dispatch errors for missing appliers or locators.
    /// - Any error returned by the applier, unchanged.
    fn apply<E: DomainEvent>(&mut self, event: E) -> Result<(), AggregateError> {
        self.apply_shared(Arc::new(event))
    }

    /// [`apply`](Self::apply) for an already shared event.
    ///
    /// # Errors
    ///
    /// See [`apply`](Self::apply).
    fn apply_shared(&mut self, event: Arc<dyn DomainEvent>) -> Result<(), AggregateError> {
        route(self, &event)?;

        let event_type = event.event_type();
        let target_path = event.entity_id_path().clone();
        let state = self.aggregate_state_mut();
        state.uncommitted.push(event);
        tracing::debug!(
            event_type,
            target_path = %target_path,
            version = %state.version,
            next_version = %state.next_version(),
            "Applied event"
        );
        Ok(())
    }

    /// Rebuild state by replaying persisted events in commit order.
    ///
    /// Each event advances `version` by one; nothing is recorded as uncommitted.
    /// If an event fails, replay stops and `version` counts the events replayed
    /// before it.
    ///
    /// # Errors
    ///
    /// - [`AggregateError::UncommittedChanges`] if changes are pending.
    /// - Any routing, dispatch or applier error.
    fn load_from_history<I>(&mut self, events: I) -> Result<(), AggregateError>
    where
        I: IntoIterator<Item = Arc<dyn DomainEvent>>,
    {
        let pending = self.uncommitted_changes().len();
        if pending > 0 {
            return Err(AggregateError::UncommittedChanges { pending });
        }

        for event in events {
            route(self, &event)?;
            let state = self.aggregate_state_mut();
            state.version = state.version.next();
            tracing::debug!(
                event_type = event.event_type(),
                target_path = %event.entity_id_path(),
                version = %state.version,
                "Replayed event"
            );
        }

        tracing::debug!(version = %self.version(), "Loaded aggregate from history");
        Ok(())
    }

    /// Accept every pending change as committed: `version` becomes
    /// `next_version()` and the uncommitted list is cleared.
    fn mark_changes_as_committed(&mut self) {
        let state = self.aggregate_state_mut();
        state.version = state.next_version();
        state.uncommitted.clear();
        tracing::debug!(version = %state.version, "Marked changes as committed");
    }

    /// Find a direct child or fail with [`AggregateError::EntityNotFound`].
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::EntityNotFound`] naming the root path, or
    /// [`AggregateError::Rejected`] if the root has not been created.
    fn require_child<I>(
        &self,
        id: &I,
    ) -> Result<&<Self as FindChild<I>>::Child, AggregateError>
    where
        I: EntityId + Clone,
        Self: FindChild<I>,
    {
        match self.find_child(id) {
            Some(child) => Ok(child),
            None => Err(AggregateError::entity_not_found(&self.root_path()?, id.clone())),
        }
    }

    /// Fail with [`AggregateError::DuplicateEntity`] if a direct child
    /// identified by `id` already exists.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::DuplicateEntity`] naming the root path and the
    /// candidate identifier.
    fn ensure_absent<I>(&self, id: &I) -> Result<(), AggregateError>
    where
        I: EntityId + Clone,
        Self: FindChild<I>,
    {
        match self.find_child(id) {
            Some(_) => Err(AggregateError::duplicate_entity(&self.root_path()?, id.clone())),
            None => Ok(()),
        }
    }
}

/// Deliver `event` to the node its path addresses.
fn route<R: AggregateRoot>(
    root: &mut R,
    event: &Arc<dyn DomainEvent>,
) -> Result<(), AggregateError> {
    let path = event.entity_id_path();
    let mut segments = path.iter().enumerate().skip(1);

    let Some((depth, first_child)) = segments.next() else {
        dispatch::apply_event(root, &**event)?;
        root.aggregate_state_mut().last_applied = Some(Arc::clone(event));
        return Ok(());
    };

    let mut node: &mut dyn EntityNode = dispatch::locate_child(root, first_child)?
        .ok_or_else(|| not_found(path, depth, first_child))?;

    for (depth, id) in segments {
        node = node
            .child_node(id)?
            .ok_or_else(|| not_found(path, depth, id))?;
    }

    tracing::trace!(target_path = %path, "Routed event to entity");
    node.apply_event(event)
}

fn not_found(path: &EntityIdPath, depth: usize, id: &AnyEntityId) -> AggregateError {
    let parent = path.prefix(depth).unwrap_or_else(|| path.clone());
    AggregateError::EntityNotFound {
        parent,
        entity_id: id.clone(),
    }
}
