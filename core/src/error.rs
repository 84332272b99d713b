//! Error types surfaced by aggregate operations.
//!
//! Two layers exist:
//!
//! - [`DispatchError`]: defects in an aggregate's own type definitions (a missing
//!   or ambiguous event applier, a missing or ambiguous child locator). These are
//!   programmer errors and should fail fast.
//! - [`AggregateError`]: everything an operation on an aggregate can return,
//!   including business-rule violations such as duplicate or missing entities.

use crate::entity_id::AnyEntityId;
use crate::path::EntityIdPath;
use thiserror::Error;

/// Errors raised while building or querying dispatch tables.
///
/// These indicate a defect in how an aggregate or entity declared its event
/// appliers or child locators. They are `Clone` so that a validated table can
/// be cached once and its build failure reported on every access.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// No event applier is declared for this event type on the target or any
    /// inherited table.
    #[error("No event applier for {event_type} declared on {target}")]
    HandlerNotFound {
        /// Type name of the dispatch target.
        target: &'static str,
        /// Event type tag of the event being dispatched.
        event_type: String,
    },

    /// More than one event applier is declared for the same event type.
    #[error("Event applier for {event_type} declared more than once on {target}")]
    DuplicateHandler {
        /// Type name of the dispatch target.
        target: &'static str,
        /// Type name of the event with conflicting appliers.
        event_type: &'static str,
    },

    /// No child locator is declared for this identifier type.
    #[error("No child locator for entity type {entity_type} declared on {target}")]
    LocatorNotFound {
        /// Type name of the entity whose children were searched.
        target: &'static str,
        /// Entity type tag of the child identifier.
        entity_type: String,
    },

    /// More than one child locator is declared for the same identifier type.
    #[error("Child locator for entity type {entity_type} declared more than once on {target}")]
    DuplicateLocator {
        /// Type name of the entity with conflicting locators.
        target: &'static str,
        /// Entity type tag of the child identifier.
        entity_type: String,
    },

    /// Two identifier types were registered under the same entity type tag.
    #[error("Entity type {entity_type} registered more than once")]
    DuplicateEntityType {
        /// The conflicting entity type tag.
        entity_type: String,
    },
}

/// Errors returned by aggregate, entity and path operations.
#[derive(Error, Debug)]
pub enum AggregateError {
    /// Malformed input: empty paths, unparseable path strings, unknown
    /// entity types.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A child with this identifier already exists under the parent.
    #[error("Entity {entity_id} already exists in {parent}")]
    DuplicateEntity {
        /// Path of the parent that already owns the child.
        parent: EntityIdPath,
        /// Identifier of the rejected child.
        entity_id: AnyEntityId,
    },

    /// No child with this identifier exists under the parent.
    #[error("Entity {entity_id} not found in {parent}")]
    EntityNotFound {
        /// Path of the parent that was searched.
        parent: EntityIdPath,
        /// Identifier of the missing child.
        entity_id: AnyEntityId,
    },

    /// History cannot be replayed while applied changes are still pending.
    #[error("Cannot load history with {pending} uncommitted changes pending")]
    UncommittedChanges {
        /// Number of pending changes.
        pending: usize,
    },

    /// A business rule rejected the operation.
    #[error("Rejected: {0}")]
    Rejected(String),

    /// Dispatch table defect.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl AggregateError {
    /// Shorthand for [`AggregateError::InvalidArgument`].
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Shorthand for [`AggregateError::Rejected`].
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }

    /// Shorthand for [`AggregateError::DuplicateEntity`].
    #[must_use]
    pub fn duplicate_entity(parent: &EntityIdPath, entity_id: impl Into<AnyEntityId>) -> Self {
        Self::DuplicateEntity {
            parent: parent.clone(),
            entity_id: entity_id.into(),
        }
    }

    /// Shorthand for [`AggregateError::EntityNotFound`].
    #[must_use]
    pub fn entity_not_found(parent: &EntityIdPath, entity_id: impl Into<AnyEntityId>) -> Self {
        Self::EntityNotFound {
            parent: parent.clone(),
            entity_id: entity_id.into(),
        }
    }

    /// Returns true if this error indicates a defect in type definitions rather
    /// than a problem with the input.
    #[must_use]
    pub const fn is_programmer_error(&self) -> bool {
        matches!(self, Self::Dispatch(_))
    }
}
