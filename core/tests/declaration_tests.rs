//! Defective applier declarations are reported on every use.

mod common;

use common::{AId, Notes, NoteAdded};
use composable_aggregate_core::prelude::*;

/// Declares its own `NoteAdded` applier and also inherits one from `Notes`.
#[derive(Default)]
struct Ambiguous {
    state: AggregateState,
    notes: Notes,
    own: Vec<String>,
}

impl Ambiguous {
    fn on_note_added(&mut self, event: &NoteAdded) {
        self.own.push(event.text.clone());
    }
}

event_sourced! {
    Ambiguous {
        appliers: [Ambiguous::on_note_added],
        inherit: [Notes => |ambiguous| &mut ambiguous.notes],
    }
}

impl AggregateRoot for Ambiguous {
    fn aggregate_state(&self) -> &AggregateState {
        &self.state
    }

    fn aggregate_state_mut(&mut self) -> &mut AggregateState {
        &mut self.state
    }

    fn root_id(&self) -> Option<AnyEntityId> {
        Some(AnyEntityId::new(AId(7)))
    }
}

fn note() -> NoteAdded {
    NoteAdded {
        meta: EventMeta::new(),
        entity_id_path: EntityIdPath::single(AId(7)),
        text: "either".to_string(),
    }
}

#[test]
fn overlapping_appliers_fail_on_every_apply() {
    let mut aggregate = Ambiguous::default();

    for _ in 0..2 {
        let result = aggregate.apply(note());
        assert!(matches!(
            result,
            Err(AggregateError::Dispatch(DispatchError::DuplicateHandler { .. }))
        ));
    }

    assert!(aggregate.uncommitted_changes().is_empty());
    assert!(aggregate.own.is_empty());
    assert!(aggregate.notes.texts.is_empty());
}

#[test]
fn table_error_names_the_target() {
    let err = Ambiguous::handlers().err();

    assert!(err.is_some_and(|err| err.to_string().contains("Ambiguous")));
}

#[test]
fn dispatch_errors_are_programmer_errors() {
    let mut aggregate = Ambiguous::default();

    let err = aggregate.apply(note()).err();

    assert!(err.is_some_and(|err| err.is_programmer_error()));
}
