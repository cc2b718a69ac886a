//! Master ticket to slave ticket correlation.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::models::MasterTicket;

/// In-memory map from master order identifiers to slave order tickets.
///
/// Entries are never removed and do not survive a restart. Recording the
/// same master ticket twice keeps the newer slave ticket.
#[derive(Debug, Default)]
pub struct TicketMap {
    entries: RwLock<HashMap<MasterTicket, u64>>,
}

impl TicketMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert a mapping. Returns the slave ticket it displaced, if any.
    pub async fn record(&self, master: MasterTicket, slave: u64) -> Option<u64> {
        self.entries.write().await.insert(master, slave)
    }

    pub async fn lookup(&self, master: &MasterTicket) -> Option<u64> {
        self.entries.read().await.get(master).copied()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
