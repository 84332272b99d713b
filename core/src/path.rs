//! Entity identifier paths.
//!
//! An [`EntityIdPath`] addresses one node of an aggregate tree: the root
//! identifier first, then one identifier per level down to the target entity.
//! Domain events carry a path so the aggregate root can route them.
//!
//! The text form `"<Type> <id>/<Type> <id>/..."` is persisted alongside events
//! and must round-trip exactly through [`EntityIdPath::value_of`].
//!
//! ```text
//! Vendor 4dcf4c2c-10e1-4db9-ba9e-d1e644e9d119
//! A 1/B 2/C 3
//! ```

use crate::entity_id::{AnyEntityId, EntityIdFactory};
use crate::error::AggregateError;
use serde::{Serialize, Serializer};
use smallvec::SmallVec;
use std::fmt;

/// Separator between path segments.
pub const SEGMENT_SEPARATOR: char = '/';

/// Separator between the entity type and raw id inside a segment.
pub const TYPE_SEPARATOR: char = ' ';

/// An ordered, non-empty, immutable sequence of entity identifiers, root first.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct EntityIdPath(SmallVec<[AnyEntityId; 4]>);

impl EntityIdPath {
    /// Build a path from identifiers in root-first order.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::InvalidArgument`] if `ids` is empty.
    pub fn new<I>(ids: I) -> Result<Self, AggregateError>
    where
        I: IntoIterator,
        I::Item: Into<AnyEntityId>,
    {
        let ids: SmallVec<[AnyEntityId; 4]> = ids.into_iter().map(Into::into).collect();
        if ids.is_empty() {
            return Err(AggregateError::invalid_argument(
                "An entity id path requires at least one identifier",
            ));
        }
        Ok(Self(ids))
    }

    /// A path with a single identifier, typically an aggregate root.
    #[must_use]
    pub fn single(id: impl Into<AnyEntityId>) -> Self {
        let mut ids = SmallVec::new();
        ids.push(id.into());
        Self(ids)
    }

    /// A new path with `id` appended below the last element.
    #[must_use]
    pub fn child(&self, id: impl Into<AnyEntityId>) -> Self {
        let mut ids = self.0.clone();
        ids.push(id.into());
        Self(ids)
    }

    /// The root identifier.
    #[must_use]
    pub fn first(&self) -> &AnyEntityId {
        // non-empty by construction
        &self.0[0]
    }

    /// The identifier of the addressed entity.
    #[must_use]
    pub fn last(&self) -> &AnyEntityId {
        &self.0[self.0.len() - 1]
    }

    /// Number of identifiers in the path.
    #[must_use]
    pub fn size(&self) -> usize {
        self.0.len()
    }

    /// The path without its first element, or `None` for a single-element path.
    #[must_use]
    pub fn rest(&self) -> Option<Self> {
        (self.0.len() > 1).then(|| Self(self.0[1..].iter().cloned().collect()))
    }

    /// The path without its last element, or `None` for a single-element path.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        (self.0.len() > 1).then(|| self.prefix_unchecked(self.0.len() - 1))
    }

    /// The first `len` elements, or `None` when `len` is zero or exceeds the size.
    #[must_use]
    pub fn prefix(&self, len: usize) -> Option<Self> {
        (len > 0 && len <= self.0.len()).then(|| self.prefix_unchecked(len))
    }

    fn prefix_unchecked(&self, len: usize) -> Self {
        Self(self.0[..len].iter().cloned().collect())
    }

    /// Returns true if `id` is one of the path's elements.
    #[must_use]
    pub fn contains(&self, id: &AnyEntityId) -> bool {
        self.0.contains(id)
    }

    /// Iterate identifiers root first.
    pub fn iter(&self) -> std::slice::Iter<'_, AnyEntityId> {
        self.0.iter()
    }

    /// Render as `"<Type> <id>/<Type> <id>/..."`.
    #[must_use]
    pub fn as_string(&self) -> String {
        self.to_string()
    }

    /// Parse the text form, constructing each identifier through `factory`.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::InvalidArgument`] naming the raw input if the
    /// string is empty, a segment lacks a type, a type is unknown to the factory,
    /// or a raw id is malformed for its type.
    pub fn value_of<F>(factory: &F, path: &str) -> Result<Self, AggregateError>
    where
        F: EntityIdFactory + ?Sized,
    {
        if path.is_empty() {
            return Err(AggregateError::invalid_argument(
                "Entity id path string is empty",
            ));
        }

        let ids = path
            .split(SEGMENT_SEPARATOR)
            .map(|segment| parse_segment(factory, path, segment))
            .collect::<Result<SmallVec<[AnyEntityId; 4]>, _>>()?;

        Ok(Self(ids))
    }

    /// Returns true if [`value_of`](Self::value_of) would succeed.
    #[must_use]
    pub fn is_valid<F>(factory: &F, path: &str) -> bool
    where
        F: EntityIdFactory + ?Sized,
    {
        !path.is_empty()
            && path.split(SEGMENT_SEPARATOR).all(|segment| {
                segment
                    .split_once(TYPE_SEPARATOR)
                    .is_some_and(|(entity_type, raw_id)| {
                        factory.contains_type(entity_type) && factory.is_valid(entity_type, raw_id)
                    })
            })
    }
}

fn parse_segment<F>(factory: &F, path: &str, segment: &str) -> Result<AnyEntityId, AggregateError>
where
    F: EntityIdFactory + ?Sized,
{
    let (entity_type, raw_id) = segment.split_once(TYPE_SEPARATOR).ok_or_else(|| {
        AggregateError::invalid_argument(format!(
            "Segment {segment:?} of entity id path {path:?} is not \"<Type> <id>\""
        ))
    })?;

    if !factory.contains_type(entity_type) {
        return Err(AggregateError::invalid_argument(format!(
            "Unknown entity type {entity_type:?} in entity id path {path:?}"
        )));
    }

    factory.create_entity_id(entity_type, raw_id).map_err(|error| {
        AggregateError::invalid_argument(format!("Invalid entity id path {path:?}: {error}"))
    })
}

impl From<AnyEntityId> for EntityIdPath {
    fn from(id: AnyEntityId) -> Self {
        Self::single(id)
    }
}

impl<'a> IntoIterator for &'a EntityIdPath {
    type Item = &'a AnyEntityId;
    type IntoIter = std::slice::Iter<'a, AnyEntityId>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for EntityIdPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, id) in self.0.iter().enumerate() {
            if index > 0 {
                write!(f, "{SEGMENT_SEPARATOR}")?;
            }
            write!(f, "{id}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for EntityIdPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntityIdPath").field(&self.to_string()).finish()
    }
}

impl Serialize for EntityIdPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
