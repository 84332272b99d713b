//! # Composable Aggregate Core
//!
//! In-process event-sourcing core for aggregates with nested entities.
//!
//! An aggregate root and the entities it owns change state only by applying
//! immutable domain events. Applied events are kept as uncommitted changes
//! until the caller persists them; persisted events are replayed to rebuild
//! state. Every event names the node it applies to with an
//! [`EntityIdPath`](path::EntityIdPath), and the root routes it down the tree
//! to that node's applier.
//!
//! ## Core Concepts
//!
//! - **Entity identifier**: typed id with an entity type tag ([`entity_id`])
//! - **Entity identifier path**: root-first address of a node ([`path`])
//! - **Domain event**: immutable fact bound to a path ([`event`])
//! - **Dispatch tables**: per-type appliers and child locators ([`dispatch`])
//! - **Entity**: non-root node owning its own children ([`entity`])
//! - **Aggregate root**: entry point, version and change tracking ([`aggregate`])
//!
//! ## Example
//!
//! ```ignore
//! use composable_aggregate_core::prelude::*;
//!
//! #[derive(EntityId, Clone, Debug, PartialEq)]
//! #[entity_type = "Vendor"]
//! struct VendorId(Uuid);
//!
//! #[derive(DomainEvent, Debug)]
//! struct VendorCreated {
//!     meta: EventMeta,
//!     entity_id_path: EntityIdPath,
//! }
//!
//! let mut vendor = Vendor::create(VendorId(Uuid::new_v4()))?;
//! assert_eq!(vendor.version(), Version::NONE);
//! assert_eq!(vendor.uncommitted_changes().len(), 1);
//! assert_eq!(vendor.next_version(), Version::new(0));
//! ```

// Lets the derive macros refer to `::composable_aggregate_core` from inside this crate.
extern crate self as composable_aggregate_core;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use composable_aggregate_macros::{DomainEvent, EntityId};
pub use uuid::Uuid;

pub mod aggregate;
pub mod dispatch;
pub mod entity;
pub mod entity_id;
pub mod error;
pub mod event;
pub mod path;
pub mod version;

mod table_macros;

/// Environment module - Dependency injection traits
///
/// External dependencies of event construction are abstracted behind traits so
/// that tests can make them deterministic.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use composable_aggregate_core::environment::{Clock, SystemClock};
    ///
    /// let before = chrono::Utc::now();
    /// assert!(SystemClock.now() >= before);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

/// Everything needed to declare aggregates, entities, identifiers and events.
pub mod prelude {
    pub use crate::aggregate::{AggregateRoot, AggregateState};
    pub use crate::dispatch::{
        EventSourced, FindChild, HandlerTable, LocatorTable, apply_event, locate_child,
    };
    pub use crate::entity::{Entity, EntityBase, EntityNode};
    pub use crate::entity_id::{
        AnyEntityId, EntityId, EntityIdFactory, EntityIdRegistry, EntityType, TypedEntityId,
    };
    pub use crate::environment::{Clock, SystemClock};
    pub use crate::error::{AggregateError, DispatchError};
    pub use crate::event::{DomainEvent, Event, EventId, EventMeta};
    pub use crate::path::EntityIdPath;
    pub use crate::version::Version;
    // Derive macros share their names with the traits they implement.
    pub use crate::{DomainEvent, EntityId, event_sourced, static_table};
}
