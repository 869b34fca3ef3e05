//! Append-only event journal.

use chrono::{DateTime, Utc};
use sealbid_types::{EpochId, EventRecord, MarketEvent, Trade};

/// Every event the market emitted, in order.
#[derive(Debug, Default)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event and return its sequence number.
    pub fn append(
        &mut self,
        epoch_id: EpochId,
        recorded_at: DateTime<Utc>,
        event: MarketEvent,
    ) -> u64 {
        let sequence = self.last_sequence() + 1;
        tracing::trace!(sequence, kind = event.kind(), "Event recorded");
        self.records.push(EventRecord {
            sequence,
            epoch_id,
            recorded_at,
            event,
        });
        sequence
    }

    #[must_use]
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Records with a sequence number greater than `sequence`.
    #[must_use]
    pub fn since(&self, sequence: u64) -> &[EventRecord] {
        let start = usize::try_from(sequence).unwrap_or(usize::MAX);
        self.records.get(start..).unwrap_or_default()
    }

    /// Zero before the first event.
    #[must_use]
    pub fn last_sequence(&self) -> u64 {
        self.records.last().map_or(0, |r| r.sequence)
    }

    /// Trades in the order they settled.
    pub fn trades(&self) -> impl Iterator<Item = &Trade> {
        self.records.iter().filter_map(|r| match &r.event {
            MarketEvent::Trade(trade) => Some(trade),
            _ => None,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
