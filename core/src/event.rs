//! Event traits and event metadata.
//!
//! Events represent facts about things that have happened in the past and are
//! immutable. A [`DomainEvent`] additionally names the entity it applies to via
//! an [`EntityIdPath`], which the aggregate root uses to route it.
//!
//! # Example
//!
//! ```
//! use composable_aggregate_core::event::{DomainEvent, Event, EventMeta};
//! use composable_aggregate_core::path::EntityIdPath;
//!
//! #[derive(Debug)]
//! struct OrderShipped {
//!     meta: EventMeta,
//!     path: EntityIdPath,
//!     tracking: String,
//! }
//!
//! impl Event for OrderShipped {
//!     fn event_type(&self) -> &'static str {
//!         "OrderShipped.v1"
//!     }
//!
//!     fn meta(&self) -> &EventMeta {
//!         &self.meta
//!     }
//! }
//!
//! impl DomainEvent for OrderShipped {
//!     fn entity_id_path(&self) -> &EntityIdPath {
//!         &self.path
//!     }
//! }
//! ```
//!
//! `#[derive(DomainEvent)]` generates both implementations.

use crate::entity_id::AsAny;
use crate::environment::{Clock, SystemClock};
use crate::path::EntityIdPath;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier of a single event.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random `EventId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an `EventId` from a UUID
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity and provenance shared by every event.
///
/// - `correlation_id` groups all events caused by one originating request.
/// - `causation_id` names the event that directly triggered this one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMeta {
    event_id: EventId,
    timestamp: DateTime<Utc>,
    correlation_id: Option<Uuid>,
    causation_id: Option<EventId>,
}

impl EventMeta {
    /// Fresh metadata stamped with the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::at(&SystemClock)
    }

    /// Fresh metadata stamped with the given clock.
    #[must_use]
    pub fn at(clock: &dyn Clock) -> Self {
        Self {
            event_id: EventId::new(),
            timestamp: clock.now(),
            correlation_id: None,
            causation_id: None,
        }
    }

    /// Metadata for an event emitted in response to `cause`.
    ///
    /// The correlation id is inherited from `cause` (or is `cause`'s event id if
    /// it had none) and the causation id is `cause`'s event id.
    #[must_use]
    pub fn responding_to(cause: &Self) -> Self {
        Self::responding_to_at(cause, &SystemClock)
    }

    /// Like [`responding_to`](Self::responding_to), stamped with the given clock.
    #[must_use]
    pub fn responding_to_at(cause: &Self, clock: &dyn Clock) -> Self {
        Self {
            correlation_id: Some(
                cause
                    .correlation_id
                    .unwrap_or_else(|| *cause.event_id.as_uuid()),
            ),
            causation_id: Some(cause.event_id),
            ..Self::at(clock)
        }
    }

    /// Set the correlation id.
    #[must_use]
    pub const fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Set the causation id.
    #[must_use]
    pub const fn with_causation_id(mut self, causation_id: EventId) -> Self {
        self.causation_id = Some(causation_id);
        self
    }

    /// The event's unique id.
    #[must_use]
    pub const fn event_id(&self) -> EventId {
        self.event_id
    }

    /// When the event was created.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// The originating request's correlation id, if any.
    #[must_use]
    pub const fn correlation_id(&self) -> Option<Uuid> {
        self.correlation_id
    }

    /// The event that caused this one, if any.
    #[must_use]
    pub const fn causation_id(&self) -> Option<EventId> {
        self.causation_id
    }
}

impl Default for EventMeta {
    fn default() -> Self {
        Self::new()
    }
}

/// An immutable fact about something that happened.
///
/// # Event Naming Convention
///
/// `event_type()` should return a stable identifier that includes a version
/// number so that schemas can evolve: `"OrderPlaced.v1"`, `"OrderShipped.v2"`.
///
/// # Thread Safety
///
/// Events must be `Send + Sync + 'static` so that applied events can be shared
/// with whatever persists them.
pub trait Event: AsAny + fmt::Debug + Send + Sync + 'static {
    /// Returns the event type identifier for this event.
    fn event_type(&self) -> &'static str;

    /// Returns the event's identity and provenance.
    fn meta(&self) -> &EventMeta;

    /// Shorthand for `self.meta().event_id()`.
    fn event_id(&self) -> EventId {
        self.meta().event_id()
    }

    /// Shorthand for `self.meta().timestamp()`.
    fn timestamp(&self) -> DateTime<Utc> {
        self.meta().timestamp()
    }
}

/// An event bound to the entity it applies to.
pub trait DomainEvent: Event {
    /// Path from the aggregate root to the entity this event applies to.
    fn entity_id_path(&self) -> &EntityIdPath;
}
