//! A three-level aggregate used by the integration tests.
//!
//! ```text
//! AggregateA (A)
//! ├── notes            inherited appliers (Notes)
//! └── EntityB (B) *
//!     └── EntityC (C) *
//! ```

#![allow(dead_code)] // Not every test file uses every helper

use composable_aggregate_core::prelude::*;
use std::sync::Arc;

#[derive(EntityId, Clone, Debug, PartialEq)]
#[entity_type = "A"]
pub struct AId(pub u32);

#[derive(EntityId, Clone, Debug, PartialEq)]
#[entity_type = "B"]
pub struct BId(pub u32);

#[derive(EntityId, Clone, Debug, PartialEq)]
#[entity_type = "C"]
pub struct CId(pub u32);

#[derive(DomainEvent, Debug)]
pub struct ACreated {
    pub meta: EventMeta,
    pub entity_id_path: EntityIdPath,
}

#[derive(DomainEvent, Debug)]
pub struct BAdded {
    pub meta: EventMeta,
    pub entity_id_path: EntityIdPath,
    pub b_id: BId,
}

#[derive(DomainEvent, Debug)]
pub struct BTouched {
    pub meta: EventMeta,
    pub entity_id_path: EntityIdPath,
    pub note: String,
}

#[derive(DomainEvent, Debug)]
pub struct CAdded {
    pub meta: EventMeta,
    pub entity_id_path: EntityIdPath,
    pub c_id: CId,
}

#[derive(DomainEvent, Debug)]
pub struct CTouched {
    pub meta: EventMeta,
    pub entity_id_path: EntityIdPath,
    pub note: String,
}

#[derive(DomainEvent, Debug)]
pub struct NoteAdded {
    pub meta: EventMeta,
    pub entity_id_path: EntityIdPath,
    pub text: String,
}

#[derive(DomainEvent, Debug)]
pub struct NobodyListens {
    pub meta: EventMeta,
    pub entity_id_path: EntityIdPath,
}

/// Appliers shared by several aggregates, embedded rather than subclassed.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Notes {
    pub texts: Vec<String>,
}

impl Notes {
    fn on_note_added(&mut self, event: &NoteAdded) {
        self.texts.push(event.text.clone());
    }
}

event_sourced! {
    Notes {
        appliers: [Notes::on_note_added],
    }
}

#[derive(Default, Debug)]
pub struct AggregateA {
    state: AggregateState,
    pub id: Option<AId>,
    pub notes: Notes,
    pub bs: Vec<EntityB>,
}

impl AggregateA {
    pub fn create(id: AId) -> Result<Self, AggregateError> {
        let mut aggregate = Self::default();
        aggregate.apply(ACreated {
            meta: EventMeta::new(),
            entity_id_path: EntityIdPath::single(id),
        })?;
        Ok(aggregate)
    }

    pub fn add_b(&mut self, b_id: BId) -> Result<(), AggregateError> {
        self.ensure_absent(&b_id)?;
        let entity_id_path = self.root_path()?;
        self.apply(BAdded {
            meta: EventMeta::new(),
            entity_id_path,
            b_id,
        })
    }

    pub fn add_c(&mut self, b_id: &BId, c_id: CId) -> Result<(), AggregateError> {
        let event = self.require_child(b_id)?.prepare_add_c(c_id)?;
        self.apply(event)
    }

    pub fn touch_b(&mut self, b_id: &BId, note: &str) -> Result<(), AggregateError> {
        let event = self.require_child(b_id)?.prepare_touch(note);
        self.apply(event)
    }

    pub fn touch_c(&mut self, b_id: &BId, c_id: &CId, note: &str) -> Result<(), AggregateError> {
        let event = self
            .require_child(b_id)?
            .require_child(c_id)?
            .prepare_touch(note);
        self.apply(event)
    }

    pub fn add_note(&mut self, text: &str) -> Result<(), AggregateError> {
        let entity_id_path = self.root_path()?;
        self.apply(NoteAdded {
            meta: EventMeta::new(),
            entity_id_path,
            text: text.to_string(),
        })
    }

    /// Everything observable about the tree, for equality checks.
    pub fn snapshot(&self) -> Vec<String> {
        let mut lines = vec![format!("A {:?} notes={:?}", self.id, self.notes.texts)];
        for b in &self.bs {
            lines.push(format!("{} touched={:?}", b.path(), b.touched));
            for c in &b.cs {
                lines.push(format!("{} touched={:?}", c.path(), c.touched));
            }
        }
        lines
    }

    fn on_created(&mut self, event: &ACreated) {
        self.id = event.entity_id_path.first().downcast_ref::<AId>().cloned();
    }

    fn on_b_added(&mut self, event: &BAdded) {
        self.bs
            .push(EntityB::new(&event.entity_id_path, event.b_id.clone()));
    }
}

event_sourced! {
    AggregateA {
        appliers: [AggregateA::on_created, AggregateA::on_b_added],
        inherit: [Notes => |aggregate| &mut aggregate.notes],
        children: [BId],
    }
}

impl AggregateRoot for AggregateA {
    fn aggregate_state(&self) -> &AggregateState {
        &self.state
    }

    fn aggregate_state_mut(&mut self) -> &mut AggregateState {
        &mut self.state
    }

    fn root_id(&self) -> Option<AnyEntityId> {
        self.id.clone().map(AnyEntityId::new)
    }
}

impl FindChild<BId> for AggregateA {
    type Child = EntityB;

    fn find_child(&self, id: &BId) -> Option<&EntityB> {
        self.bs.iter().find(|b| &b.id == id)
    }

    fn find_child_mut(&mut self, id: &BId) -> Option<&mut EntityB> {
        self.bs.iter_mut().find(|b| &b.id == id)
    }
}

#[derive(Debug)]
pub struct EntityB {
    base: EntityBase,
    pub id: BId,
    pub cs: Vec<EntityC>,
    pub touched: Vec<String>,
}

impl EntityB {
    pub fn new(parent: &EntityIdPath, id: BId) -> Self {
        Self {
            base: EntityBase::child_of(parent, id.clone()),
            id,
            cs: Vec::new(),
            touched: Vec::new(),
        }
    }

    fn prepare_add_c(&self, c_id: CId) -> Result<CAdded, AggregateError> {
        self.ensure_absent(&c_id)?;
        Ok(CAdded {
            meta: EventMeta::new(),
            entity_id_path: self.path().clone(),
            c_id,
        })
    }

    fn prepare_touch(&self, note: &str) -> BTouched {
        BTouched {
            meta: EventMeta::new(),
            entity_id_path: self.path().clone(),
            note: note.to_string(),
        }
    }

    fn on_c_added(&mut self, event: &CAdded) {
        let c = EntityC::new(self.path(), event.c_id.clone());
        self.cs.push(c);
    }

    fn on_touched(&mut self, event: &BTouched) {
        self.touched.push(event.note.clone());
    }
}

event_sourced! {
    EntityB {
        appliers: [EntityB::on_c_added, EntityB::on_touched],
        children: [CId],
    }
}

impl Entity for EntityB {
    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        &mut self.base
    }
}

impl FindChild<CId> for EntityB {
    type Child = EntityC;

    fn find_child(&self, id: &CId) -> Option<&EntityC> {
        self.cs.iter().find(|c| &c.id == id)
    }

    fn find_child_mut(&mut self, id: &CId) -> Option<&mut EntityC> {
        self.cs.iter_mut().find(|c| &c.id == id)
    }
}

#[derive(Debug)]
pub struct EntityC {
    base: EntityBase,
    pub id: CId,
    pub touched: Vec<String>,
}

impl EntityC {
    fn new(parent: &EntityIdPath, id: CId) -> Self {
        Self {
            base: EntityBase::child_of(parent, id.clone()),
            id,
            touched: Vec::new(),
        }
    }

    fn prepare_touch(&self, note: &str) -> CTouched {
        CTouched {
            meta: EventMeta::new(),
            entity_id_path: self.path().clone(),
            note: note.to_string(),
        }
    }

    fn on_touched(&mut self, event: &CTouched) {
        self.touched.push(event.note.clone());
    }
}

event_sourced! {
    EntityC {
        appliers: [EntityC::on_touched],
    }
}

impl Entity for EntityC {
    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        &mut self.base
    }
}

/// Path `A a/B b/C c`.
pub fn path_abc(a: u32, b: u32, c: u32) -> EntityIdPath {
    EntityIdPath::single(AId(a)).child(BId(b)).child(CId(c))
}

/// Root `A 1` with child `B 2`, which has child `C 3`.
#[allow(clippy::expect_used)] // Panics: Fixture construction must succeed
pub fn a1_b2_c3() -> AggregateA {
    let mut aggregate = AggregateA::create(AId(1)).expect("create");
    aggregate.add_b(BId(2)).expect("add B 2");
    aggregate.add_c(&BId(2), CId(3)).expect("add C 3");
    aggregate
}

/// Registry able to parse every identifier of the fixture tree.
#[allow(clippy::expect_used)] // Panics: Fixture construction must succeed
pub fn registry() -> EntityIdRegistry {
    EntityIdRegistry::builder()
        .register::<AId>()
        .register::<BId>()
        .register::<CId>()
        .build()
        .expect("registry")
}

/// Shared copies of every uncommitted change, in order.
pub fn history(aggregate: &AggregateA) -> Vec<Arc<dyn DomainEvent>> {
    aggregate.uncommitted_changes().to_vec()
}
