//! Event applier and child locator dispatch.
//!
//! Every node type in an aggregate tree declares, once, which events it applies
//! and which child identifier types it can look up. The declarations are
//! collected into a [`HandlerTable`] and a [`LocatorTable`], validated when
//! built, and cached for the life of the process with [`static_table!`](crate::static_table).
//!
//! # Matching rules
//!
//! - Appliers match the event's exact concrete type. An applier for a
//!   different event type never runs, even if the two share a trait.
//! - A table may inherit a base type's table through a projection to the
//!   embedded base value. Inherited appliers are searched together with the
//!   type's own appliers.
//! - Declaring two appliers (own or inherited) for the same event type fails
//!   the build with [`DispatchError::DuplicateHandler`]; the engine never
//!   picks one arbitrarily.
//! - Dispatching an event nothing applies fails with
//!   [`DispatchError::HandlerNotFound`].
//!
//! Failures returned by an applier body propagate unchanged.
//!
//! # Example
//!
//! ```ignore
//! impl EventSourced for Order {
//!     fn handlers() -> Result<&'static HandlerTable<Self>, DispatchError> {
//!         static_table!(HandlerTable<Order> => HandlerTable::builder()
//!             .on(Order::on_created)
//!             .on(Order::on_line_added)
//!             .inherit(Audited::handlers(), |order| &mut order.audit)
//!             .build())
//!     }
//!
//!     fn locators() -> Result<Option<&'static LocatorTable<Self>>, DispatchError> {
//!         static_table!(LocatorTable<Order> => LocatorTable::builder()
//!             .child::<LineId>()
//!             .build())
//!         .map(Some)
//!     }
//! }
//! ```

use crate::entity::EntityNode;
use crate::entity_id::{AnyEntityId, AsAny, EntityId, TypedEntityId};
use crate::error::{AggregateError, DispatchError};
use crate::event::DomainEvent;
use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::marker::PhantomData;

/// A type whose state changes only by applying events.
///
/// Implemented by aggregate roots and every entity in their trees.
pub trait EventSourced: Sized + Send + Sync + 'static {
    /// The event appliers declared for this type.
    ///
    /// # Errors
    ///
    /// Returns the [`DispatchError`] raised when the table was built, such as
    /// [`DispatchError::DuplicateHandler`].
    fn handlers() -> Result<&'static HandlerTable<Self>, DispatchError>;

    /// The child locators declared for this type, or `None` for leaf types.
    ///
    /// # Errors
    ///
    /// Returns the [`DispatchError`] raised when the table was built, such as
    /// [`DispatchError::DuplicateLocator`].
    fn locators() -> Result<Option<&'static LocatorTable<Self>>, DispatchError> {
        Ok(None)
    }
}

/// Typed child lookup, implemented once per child identifier type.
///
/// Returning `None` is the "not found" sentinel; callers decide whether that is
/// an error and build an [`AggregateError::EntityNotFound`] with the full path.
pub trait FindChild<I: EntityId> {
    /// The entity type identified by `I`.
    type Child: EntityNode;

    /// Find a child by identifier.
    fn find_child(&self, id: &I) -> Option<&Self::Child>;

    /// Find a child by identifier, mutably.
    fn find_child_mut(&mut self, id: &I) -> Option<&mut Self::Child>;
}

/// Apply `event` to `target` through `T`'s handler table.
///
/// # Errors
///
/// - [`DispatchError::HandlerNotFound`] if `T` declares no applier for the
///   event's concrete type.
/// - Any table build error.
/// - Any error returned by the applier itself, unchanged.
pub fn apply_event<T: EventSourced>(
    target: &mut T,
    event: &dyn DomainEvent,
) -> Result<(), AggregateError> {
    T::handlers()?.apply(target, event)
}

/// Look up a direct child of `target` through `T`'s locator table.
///
/// # Errors
///
/// Returns [`DispatchError::LocatorNotFound`] if `T` declares no locator for
/// the identifier's concrete type, or any table build error.
pub fn locate_child<'a, T: EventSourced>(
    target: &'a mut T,
    id: &AnyEntityId,
) -> Result<Option<&'a mut dyn EntityNode>, AggregateError> {
    match T::locators()? {
        Some(table) => Ok(table.locate(target, id)?),
        None => Err(DispatchError::LocatorNotFound {
            target: type_name::<T>(),
            entity_type: id.entity_type().to_string(),
        }
        .into()),
    }
}

trait ErasedApplier<T>: Send + Sync {
    fn apply(&self, target: &mut T, event: &dyn DomainEvent) -> Result<(), AggregateError>;
}

enum ApplyFn<T, E> {
    Infallible(fn(&mut T, &E)),
    Fallible(fn(&mut T, &E) -> Result<(), AggregateError>),
}

struct TypedApplier<T, E> {
    apply: ApplyFn<T, E>,
}

impl<T: 'static, E: DomainEvent> ErasedApplier<T> for TypedApplier<T, E> {
    fn apply(&self, target: &mut T, event: &dyn DomainEvent) -> Result<(), AggregateError> {
        let Some(typed) = <dyn DomainEvent as AsAny>::as_any(event).downcast_ref::<E>() else {
            return Err(DispatchError::HandlerNotFound {
                target: type_name::<T>(),
                event_type: event.event_type().to_string(),
            }
            .into());
        };

        match &self.apply {
            ApplyFn::Infallible(apply) => {
                apply(target, typed);
                Ok(())
            },
            ApplyFn::Fallible(apply) => apply(target, typed),
        }
    }
}

struct InheritedApplier<T, B: 'static> {
    base: &'static dyn ErasedApplier<B>,
    project: fn(&mut T) -> &mut B,
}

impl<T: 'static, B: 'static> ErasedApplier<T> for InheritedApplier<T, B> {
    fn apply(&self, target: &mut T, event: &dyn DomainEvent) -> Result<(), AggregateError> {
        self.base.apply((self.project)(target), event)
    }
}

struct ApplierEntry<T> {
    event_type: &'static str,
    applier: Box<dyn ErasedApplier<T>>,
}

/// Event appliers for one target type, keyed by exact event type.
pub struct HandlerTable<T> {
    appliers: HashMap<TypeId, ApplierEntry<T>>,
}

impl<T: 'static> HandlerTable<T> {
    /// Start declaring appliers for `T`.
    #[must_use]
    pub fn builder() -> HandlerTableBuilder<T> {
        HandlerTableBuilder {
            appliers: HashMap::new(),
            error: None,
        }
    }

    /// Apply `event` to `target` with the applier declared for its concrete type.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::HandlerNotFound`] if no applier matches, or the
    /// applier's own error unchanged.
    pub fn apply(&self, target: &mut T, event: &dyn DomainEvent) -> Result<(), AggregateError> {
        let type_id = Any::type_id(<dyn DomainEvent as AsAny>::as_any(event));
        let Some(entry) = self.appliers.get(&type_id) else {
            return Err(DispatchError::HandlerNotFound {
                target: type_name::<T>(),
                event_type: event.event_type().to_string(),
            }
            .into());
        };

        tracing::trace!(
            target_type = type_name::<T>(),
            event_type = entry.event_type,
            "Resolved event applier"
        );
        entry.applier.apply(target, event)
    }

    /// Returns true if an applier for `E` is declared (directly or inherited).
    #[must_use]
    pub fn handles<E: DomainEvent>(&self) -> bool {
        self.appliers.contains_key(&TypeId::of::<E>())
    }

    /// Number of event types this table applies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.appliers.len()
    }

    /// Returns true if the table declares no appliers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.appliers.is_empty()
    }

    /// Type names of the applied events, in no particular order.
    pub fn event_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.appliers.values().map(|entry| entry.event_type)
    }
}

impl<T> std::fmt::Debug for HandlerTable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerTable")
            .field("target", &type_name::<T>())
            .field(
                "event_types",
                &self.appliers.values().map(|e| e.event_type).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Builder for [`HandlerTable`].
///
/// Declaration errors are remembered and reported by [`build`](Self::build).
pub struct HandlerTableBuilder<T> {
    appliers: HashMap<TypeId, ApplierEntry<T>>,
    error: Option<DispatchError>,
}

impl<T: 'static> HandlerTableBuilder<T> {
    /// Declare an applier for event type `E`.
    #[must_use]
    pub fn on<E: DomainEvent>(self, apply: fn(&mut T, &E)) -> Self {
        self.insert(
            TypeId::of::<E>(),
            type_name::<E>(),
            Box::new(TypedApplier {
                apply: ApplyFn::Infallible(apply),
            }),
        )
    }

    /// Declare an applier for event type `E` that can fail.
    #[must_use]
    pub fn try_on<E: DomainEvent>(
        self,
        apply: fn(&mut T, &E) -> Result<(), AggregateError>,
    ) -> Self {
        self.insert(
            TypeId::of::<E>(),
            type_name::<E>(),
            Box::new(TypedApplier {
                apply: ApplyFn::Fallible(apply),
            }),
        )
    }

    /// Inherit every applier of a base type embedded in `T`.
    ///
    /// `project` borrows the embedded base value the inherited appliers mutate.
    #[must_use]
    pub fn inherit<B: 'static>(
        mut self,
        base: Result<&'static HandlerTable<B>, DispatchError>,
        project: fn(&mut T) -> &mut B,
    ) -> Self {
        let base = match base {
            Ok(base) => base,
            Err(error) => {
                self.error.get_or_insert(error);
                return self;
            },
        };

        for (type_id, entry) in &base.appliers {
            self = self.insert(
                *type_id,
                entry.event_type,
                Box::new(InheritedApplier {
                    base: entry.applier.as_ref(),
                    project,
                }),
            );
        }
        self
    }

    fn insert(
        mut self,
        type_id: TypeId,
        event_type: &'static str,
        applier: Box<dyn ErasedApplier<T>>,
    ) -> Self {
        match self.appliers.entry(type_id) {
            Entry::Occupied(_) => {
                self.error.get_or_insert(DispatchError::DuplicateHandler {
                    target: type_name::<T>(),
                    event_type,
                });
            },
            Entry::Vacant(slot) => {
                slot.insert(ApplierEntry {
                    event_type,
                    applier,
                });
            },
        }
        self
    }

    /// Validate and freeze the table.
    ///
    /// # Errors
    ///
    /// Returns the first declaration error, such as
    /// [`DispatchError::DuplicateHandler`].
    pub fn build(self) -> Result<HandlerTable<T>, DispatchError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(HandlerTable {
                appliers: self.appliers,
            }),
        }
    }
}

trait ErasedLocator<T>: Send + Sync {
    fn locate<'a>(&self, target: &'a mut T, id: &AnyEntityId) -> Option<&'a mut dyn EntityNode>;
}

struct TypedLocator<I>(PhantomData<fn() -> I>);

impl<T, I> ErasedLocator<T> for TypedLocator<I>
where
    T: FindChild<I> + 'static,
    I: EntityId,
{
    fn locate<'a>(&self, target: &'a mut T, id: &AnyEntityId) -> Option<&'a mut dyn EntityNode> {
        let id = id.downcast_ref::<I>()?;
        target
            .find_child_mut(id)
            .map(|child| child as &mut dyn EntityNode)
    }
}

struct InheritedLocator<T, B: 'static> {
    base: &'static dyn ErasedLocator<B>,
    project: fn(&mut T) -> &mut B,
}

impl<T: 'static, B: 'static> ErasedLocator<T> for InheritedLocator<T, B> {
    fn locate<'a>(&self, target: &'a mut T, id: &AnyEntityId) -> Option<&'a mut dyn EntityNode> {
        self.base.locate((self.project)(target), id)
    }
}

struct LocatorEntry<T> {
    entity_type: String,
    locator: Box<dyn ErasedLocator<T>>,
}

/// Child locators for one parent type, keyed by exact child identifier type.
pub struct LocatorTable<T> {
    locators: HashMap<TypeId, LocatorEntry<T>>,
}

impl<T: 'static> LocatorTable<T> {
    /// Start declaring locators for `T`.
    #[must_use]
    pub fn builder() -> LocatorTableBuilder<T> {
        LocatorTableBuilder {
            locators: HashMap::new(),
            error: None,
        }
    }

    /// Find the child of `target` identified by `id`.
    ///
    /// `Ok(None)` means the locator ran and no such child exists.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::LocatorNotFound`] if no locator is declared for
    /// the identifier's concrete type.
    pub fn locate<'a>(
        &self,
        target: &'a mut T,
        id: &AnyEntityId,
    ) -> Result<Option<&'a mut dyn EntityNode>, DispatchError> {
        let Some(entry) = self.locators.get(&id.concrete_type_id()) else {
            return Err(DispatchError::LocatorNotFound {
                target: type_name::<T>(),
                entity_type: id.entity_type().to_string(),
            });
        };

        tracing::trace!(
            target_type = type_name::<T>(),
            entity_type = %entry.entity_type,
            "Resolved child locator"
        );
        Ok(entry.locator.locate(target, id))
    }

    /// Number of child identifier types this table can locate.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locators.len()
    }

    /// Returns true if the table declares no locators.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locators.is_empty()
    }
}

impl<T> std::fmt::Debug for LocatorTable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocatorTable")
            .field("target", &type_name::<T>())
            .field(
                "entity_types",
                &self
                    .locators
                    .values()
                    .map(|e| e.entity_type.as_str())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Builder for [`LocatorTable`].
pub struct LocatorTableBuilder<T> {
    locators: HashMap<TypeId, LocatorEntry<T>>,
    error: Option<DispatchError>,
}

impl<T: 'static> LocatorTableBuilder<T> {
    /// Declare the [`FindChild`] implementation for identifier type `I`.
    #[must_use]
    pub fn child<I>(self) -> Self
    where
        I: TypedEntityId,
        T: FindChild<I>,
    {
        self.insert(
            TypeId::of::<I>(),
            I::ENTITY_TYPE.to_string(),
            Box::new(TypedLocator::<I>(PhantomData)),
        )
    }

    /// Inherit every locator of a base type embedded in `T`.
    #[must_use]
    pub fn inherit<B: 'static>(
        mut self,
        base: Result<Option<&'static LocatorTable<B>>, DispatchError>,
        project: fn(&mut T) -> &mut B,
    ) -> Self {
        let base = match base {
            Ok(Some(base)) => base,
            Ok(None) => return self,
            Err(error) => {
                self.error.get_or_insert(error);
                return self;
            },
        };

        for (type_id, entry) in &base.locators {
            self = self.insert(
                *type_id,
                entry.entity_type.clone(),
                Box::new(InheritedLocator {
                    base: entry.locator.as_ref(),
                    project,
                }),
            );
        }
        self
    }

    fn insert(
        mut self,
        type_id: TypeId,
        entity_type: String,
        locator: Box<dyn ErasedLocator<T>>,
    ) -> Self {
        match self.locators.entry(type_id) {
            Entry::Occupied(_) => {
                self.error.get_or_insert(DispatchError::DuplicateLocator {
                    target: type_name::<T>(),
                    entity_type,
                });
            },
            Entry::Vacant(slot) => {
                slot.insert(LocatorEntry {
                    entity_type,
                    locator,
                });
            },
        }
        self
    }

    /// Validate and freeze the table.
    ///
    /// # Errors
    ///
    /// Returns the first declaration error, such as
    /// [`DispatchError::DuplicateLocator`].
    pub fn build(self) -> Result<LocatorTable<T>, DispatchError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(LocatorTable {
                locators: self.locators,
            }),
        }
    }
}
