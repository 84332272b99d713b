//! Debug logs name the entity every applied or replayed event addresses.

use composable_aggregate_core::prelude::*;
use std::io;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

#[derive(EntityId, Clone, Debug, PartialEq)]
struct LedgerId(u32);

#[derive(DomainEvent, Debug)]
struct Posted {
    meta: EventMeta,
    entity_id_path: EntityIdPath,
}

#[derive(Default)]
struct Ledger {
    state: AggregateState,
    postings: usize,
}

impl Ledger {
    fn on_posted(&mut self, _event: &Posted) {
        self.postings += 1;
    }
}

event_sourced! {
    Ledger {
        appliers: [Ledger::on_posted],
    }
}

impl AggregateRoot for Ledger {
    fn aggregate_state(&self) -> &AggregateState {
        &self.state
    }

    fn aggregate_state_mut(&mut self) -> &mut AggregateState {
        &mut self.state
    }

    fn root_id(&self) -> Option<AnyEntityId> {
        Some(AnyEntityId::new(LedgerId(7)))
    }
}

fn posted() -> Posted {
    Posted {
        meta: EventMeta::new(),
        entity_id_path: EntityIdPath::single(LedgerId(7)),
    }
}

/// Collects formatted log output in memory.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    #[allow(clippy::expect_used)] // Panics: Test will fail if a writer panicked
    fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().expect("log buffer").clone();
        String::from_utf8_lossy(&bytes).lines().map(str::to_string).collect()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| io::Error::other("log buffer poisoned"))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn capture(run: impl FnOnce()) -> Vec<String> {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(logs.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, run);
    logs.lines()
}

#[test]
#[allow(clippy::expect_used)] // Panics: Test will fail if replay fails
fn replay_logs_each_event_with_its_target() {
    let lines = capture(|| {
        let history: Vec<Arc<dyn DomainEvent>> = vec![Arc::new(posted()), Arc::new(posted())];
        let mut ledger = Ledger::default();
        ledger.load_from_history(history).expect("replay");
        assert_eq!(ledger.postings, 2);
    });

    let replayed: Vec<_> = lines
        .iter()
        .filter(|line| line.contains("Replayed event"))
        .collect();
    assert_eq!(replayed.len(), 2, "{lines:#?}");
    assert!(replayed.iter().all(|line| line.contains("target_path=Ledger 7")));
}

#[test]
#[allow(clippy::expect_used)] // Panics: Test will fail if the apply fails
fn apply_logs_the_target_path() {
    let lines = capture(|| {
        let mut ledger = Ledger::default();
        ledger.apply(posted()).expect("apply");
    });

    assert!(
        lines
            .iter()
            .any(|line| line.contains("Applied event") && line.contains("target_path=Ledger 7")),
        "{lines:#?}"
    );
}
