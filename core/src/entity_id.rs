//! Typed entity identifiers.
//!
//! Every entity in an aggregate tree is identified by a value implementing
//! [`EntityId`]. Identifiers carry an [`EntityType`] tag so that identifiers of
//! different types can live side by side in an [`EntityIdPath`](crate::path::EntityIdPath)
//! and still render to (and parse from) the `"<Type> <id>"` text form.
//!
//! # Example
//!
//! ```
//! use composable_aggregate_core::entity_id::{AnyEntityId, EntityId, EntityType};
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct VendorId(u32);
//!
//! impl EntityId for VendorId {
//!     fn entity_type(&self) -> EntityType {
//!         EntityType::new("Vendor")
//!     }
//!
//!     fn raw_id(&self) -> String {
//!         self.0.to_string()
//!     }
//! }
//!
//! let id = AnyEntityId::new(VendorId(7));
//! assert_eq!(id.to_string(), "Vendor 7");
//! assert_eq!(id.downcast_ref::<VendorId>(), Some(&VendorId(7)));
//! ```
//!
//! Most identifiers are newtypes and should use `#[derive(EntityId)]` instead of
//! a hand-written implementation.

use crate::error::{AggregateError, DispatchError};
use serde::{Serialize, Serializer};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Stable tag naming a kind of entity (`"Vendor"`, `"Order"`, ...).
///
/// The tag is the first half of every rendered identifier and must not contain
/// spaces or slashes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EntityType(&'static str);

impl EntityType {
    /// Create an entity type tag.
    #[must_use]
    pub const fn new(tag: &'static str) -> Self {
        Self(tag)
    }

    /// Get the tag as a string slice.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Upcast helper so trait objects can be downcast to their concrete type.
pub trait AsAny {
    /// Borrow `self` as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// An identifier of one entity within its entity type.
///
/// Two identifiers are equal when they have the same entity type and the same
/// raw value.
pub trait EntityId: AsAny + fmt::Debug + Send + Sync + 'static {
    /// The entity type this identifier belongs to.
    fn entity_type(&self) -> EntityType;

    /// The identifier value without its type tag.
    fn raw_id(&self) -> String;

    /// Render as `"<Type> <id>"`.
    fn as_string(&self) -> String {
        format!("{} {}", self.entity_type(), self.raw_id())
    }
}

/// An identifier type with a statically known entity type that can be parsed
/// back from its raw value.
///
/// Required for registration in an [`EntityIdRegistry`].
pub trait TypedEntityId: EntityId + Clone + Sized {
    /// The entity type shared by all values of this type.
    const ENTITY_TYPE: EntityType;

    /// Parse a raw identifier value, returning `None` when it is malformed.
    fn from_raw(raw: &str) -> Option<Self>;
}

/// A type-erased, cheaply clonable entity identifier.
///
/// Path segments and error payloads use this so that identifiers of different
/// concrete types can be mixed.
#[derive(Clone)]
pub struct AnyEntityId(Arc<dyn EntityId>);

impl AnyEntityId {
    /// Erase a concrete identifier.
    #[must_use]
    pub fn new<I: EntityId>(id: I) -> Self {
        Self(Arc::new(id))
    }

    /// The entity type of the wrapped identifier.
    #[must_use]
    pub fn entity_type(&self) -> EntityType {
        self.0.entity_type()
    }

    /// The raw value of the wrapped identifier.
    #[must_use]
    pub fn raw_id(&self) -> String {
        self.0.raw_id()
    }

    /// Render as `"<Type> <id>"`.
    #[must_use]
    pub fn as_string(&self) -> String {
        self.0.as_string()
    }

    /// Borrow the wrapped identifier as its concrete type.
    #[must_use]
    pub fn downcast_ref<I: EntityId>(&self) -> Option<&I> {
        self.as_any().downcast_ref::<I>()
    }

    /// Returns true if the wrapped identifier has concrete type `I`.
    #[must_use]
    pub fn is<I: EntityId>(&self) -> bool {
        self.as_any().is::<I>()
    }

    /// The [`TypeId`] of the wrapped identifier's concrete type.
    #[must_use]
    pub fn concrete_type_id(&self) -> TypeId {
        Any::type_id(self.as_any())
    }

    fn as_any(&self) -> &dyn Any {
        <dyn EntityId as AsAny>::as_any(&*self.0)
    }
}

impl<I: EntityId> From<I> for AnyEntityId {
    fn from(id: I) -> Self {
        Self::new(id)
    }
}

impl PartialEq for AnyEntityId {
    fn eq(&self, other: &Self) -> bool {
        self.entity_type() == other.entity_type() && self.raw_id() == other.raw_id()
    }
}

impl Eq for AnyEntityId {}

impl Hash for AnyEntityId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entity_type().hash(state);
        self.raw_id().hash(state);
    }
}

impl fmt::Display for AnyEntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.entity_type(), self.raw_id())
    }
}

impl fmt::Debug for AnyEntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AnyEntityId").field(&self.as_string()).finish()
    }
}

impl Serialize for AnyEntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_string())
    }
}

/// Builds identifiers from `(type, raw id)` pairs.
///
/// Supplied by the embedding application; used by path parsing.
pub trait EntityIdFactory {
    /// Construct an identifier.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::InvalidArgument`] if the type is unknown or the
    /// raw id is malformed for that type.
    fn create_entity_id(&self, entity_type: &str, raw_id: &str)
    -> Result<AnyEntityId, AggregateError>;

    /// Returns true if this factory knows the entity type.
    fn contains_type(&self, entity_type: &str) -> bool;

    /// Returns true if `raw_id` is a well-formed identifier of `entity_type`.
    fn is_valid(&self, entity_type: &str, raw_id: &str) -> bool {
        self.create_entity_id(entity_type, raw_id).is_ok()
    }
}

type ParseFn = fn(&str) -> Option<AnyEntityId>;

fn parse_any<I: TypedEntityId>(raw: &str) -> Option<AnyEntityId> {
    I::from_raw(raw).map(AnyEntityId::new)
}

/// An immutable [`EntityIdFactory`] built from registered [`TypedEntityId`] types.
///
/// Build it once at startup and share it read-only.
///
/// # Example
///
/// ```
/// use composable_aggregate_core::entity_id::{EntityIdFactory, EntityIdRegistry};
/// # use composable_aggregate_core::entity_id::{EntityId, EntityType, TypedEntityId};
/// # #[derive(Clone, Debug)]
/// # struct VendorId(u32);
/// # impl EntityId for VendorId {
/// #     fn entity_type(&self) -> EntityType { Self::ENTITY_TYPE }
/// #     fn raw_id(&self) -> String { self.0.to_string() }
/// # }
/// # impl TypedEntityId for VendorId {
/// #     const ENTITY_TYPE: EntityType = EntityType::new("Vendor");
/// #     fn from_raw(raw: &str) -> Option<Self> { raw.parse().ok().map(Self) }
/// # }
///
/// let registry = EntityIdRegistry::builder()
///     .register::<VendorId>()
///     .build()
///     .unwrap();
///
/// assert!(registry.contains_type("Vendor"));
/// assert!(registry.is_valid("Vendor", "12"));
/// assert!(!registry.is_valid("Vendor", "twelve"));
/// ```
#[derive(Clone, Debug)]
pub struct EntityIdRegistry {
    parsers: HashMap<&'static str, ParseFn>,
}

impl EntityIdRegistry {
    /// Start building a registry.
    #[must_use]
    pub fn builder() -> EntityIdRegistryBuilder {
        EntityIdRegistryBuilder {
            parsers: HashMap::new(),
            error: None,
        }
    }

    /// Registered entity types, in no particular order.
    pub fn entity_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.parsers.keys().copied()
    }
}

impl EntityIdFactory for EntityIdRegistry {
    fn create_entity_id(
        &self,
        entity_type: &str,
        raw_id: &str,
    ) -> Result<AnyEntityId, AggregateError> {
        let parse = self.parsers.get(entity_type).ok_or_else(|| {
            AggregateError::invalid_argument(format!("Unknown entity type: {entity_type}"))
        })?;

        parse(raw_id).ok_or_else(|| {
            AggregateError::invalid_argument(format!(
                "Malformed {entity_type} identifier: {raw_id:?}"
            ))
        })
    }

    fn contains_type(&self, entity_type: &str) -> bool {
        self.parsers.contains_key(entity_type)
    }
}

/// Builder for [`EntityIdRegistry`].
#[derive(Debug)]
pub struct EntityIdRegistryBuilder {
    parsers: HashMap<&'static str, ParseFn>,
    error: Option<DispatchError>,
}

impl EntityIdRegistryBuilder {
    /// Register an identifier type under its entity type tag.
    #[must_use]
    pub fn register<I: TypedEntityId>(mut self) -> Self {
        let tag = I::ENTITY_TYPE.as_str();
        if self.parsers.insert(tag, parse_any::<I>).is_some() && self.error.is_none() {
            self.error = Some(DispatchError::DuplicateEntityType {
                entity_type: tag.to_string(),
            });
        }
        self
    }

    /// Freeze the registry.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::DuplicateEntityType`] if two identifier types
    /// share a tag.
    pub fn build(self) -> Result<EntityIdRegistry, DispatchError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(EntityIdRegistry {
                parsers: self.parsers,
            }),
        }
    }
}
