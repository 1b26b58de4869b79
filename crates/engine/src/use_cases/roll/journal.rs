//! Ordered background persistence and broadcast of roll activity.
//!
//! Use cases submit entries to a channel; a single worker task drains it,
//! saving the history record before publishing the entry's events. One
//! worker for every roll keeps writes in submission order, so a settled
//! escalation always lands after the base roll it continues, and
//! `EscalationSettled` never overtakes `Resolved` on the session channel.
//!
//! A failed save or publish is logged and never fails the roll.

use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use vttdice_domain::{RollHistoryRecord, SessionId};

use crate::infrastructure::ports::{RollBroadcastPort, RollEvent, RollHistoryRepo};

/// One unit of background work.
#[derive(Debug)]
struct JournalEntry {
    session_id: SessionId,
    record: Option<RollHistoryRecord>,
    events: Vec<RollEvent>,
}

/// Submission handle for the journal worker.
#[derive(Clone)]
pub struct RollJournal {
    tx: UnboundedSender<JournalEntry>,
    shutdown: CancellationToken,
}

impl RollJournal {
    /// Start the worker on `tasks`. Must be called inside a tokio runtime.
    pub fn spawn(
        history: Arc<dyn RollHistoryRepo>,
        broadcast: Arc<dyn RollBroadcastPort>,
        tasks: &TaskTracker,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let worker = JournalWorker { history, broadcast };
        tasks.spawn(worker.run(rx, shutdown.clone()));
        Self { tx, shutdown }
    }

    /// Queue a record and its events behind everything submitted before.
    pub fn submit(
        &self,
        session_id: SessionId,
        record: Option<RollHistoryRecord>,
        events: Vec<RollEvent>,
    ) {
        let entry = JournalEntry {
            session_id,
            record,
            events,
        };
        if let Err(e) = self.tx.send(entry) {
            tracing::warn!(
                session_id = %session_id,
                "Roll journal is closed, dropping {} event(s)",
                e.0.events.len()
            );
        }
    }

    /// Stop accepting entries. The worker drains what is queued, then exits.
    pub fn close(&self) {
        self.shutdown.cancel();
    }
}

struct JournalWorker {
    history: Arc<dyn RollHistoryRepo>,
    broadcast: Arc<dyn RollBroadcastPort>,
}

impl JournalWorker {
    async fn run(self, mut rx: UnboundedReceiver<JournalEntry>, shutdown: CancellationToken) {
        tracing::debug!("Roll journal started");

        loop {
            tokio::select! {
                biased;
                entry = rx.recv() => match entry {
                    Some(entry) => self.write(entry).await,
                    None => break,
                },
                _ = shutdown.cancelled() => break,
            }
        }

        rx.close();
        while let Some(entry) = rx.recv().await {
            self.write(entry).await;
        }

        tracing::debug!("Roll journal stopped");
    }

    async fn write(&self, entry: JournalEntry) {
        let JournalEntry {
            session_id,
            record,
            events,
        } = entry;

        if let Some(record) = record {
            if let Err(e) = self.history.save(&record).await {
                tracing::warn!(
                    error = %e,
                    roll_id = %record.roll_id,
                    "Failed to persist roll history"
                );
            }
        }

        for event in events {
            let roll_id = event.roll_id();
            if let Err(e) = self.broadcast.publish(session_id, event).await {
                tracing::warn!(
                    error = %e,
                    session_id = %session_id,
                    roll_id = %roll_id,
                    "Failed to broadcast roll event"
                );
            }
        }
    }
}
