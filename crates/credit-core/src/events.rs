//! Per-wallet view over normalized events

use std::collections::BTreeMap;

use crate::models::Event;
use crate::normalizer::NormalizationStats;

/// Normalized events grouped by lowercased wallet, each group in arrival
/// order.
///
/// Wallets are kept sorted so that every downstream iteration is
/// deterministic regardless of input order.
#[derive(Debug, Clone, Default)]
pub struct EventTable {
    wallets: BTreeMap<String, Vec<Event>>,
    event_count: usize,
    stats: NormalizationStats,
}

impl EventTable {
    pub fn from_events(events: impl IntoIterator<Item = Event>, stats: NormalizationStats) -> Self {
        let mut wallets: BTreeMap<String, Vec<Event>> = BTreeMap::new();
        let mut event_count = 0;

        for mut event in events {
            event_count += 1;
            if event.wallet.chars().any(char::is_uppercase) {
                event.wallet = event.wallet.to_lowercase();
            }
            wallets.entry(event.wallet.clone()).or_default().push(event);
        }

        Self {
            wallets,
            event_count,
            stats,
        }
    }

    /// Events of one wallet. Lookups use the lowercased identifier.
    pub fn events_for(&self, wallet: &str) -> Option<&[Event]> {
        self.wallets
            .get(&wallet.to_lowercase())
            .map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Event])> {
        self.wallets
            .iter()
            .map(|(wallet, events)| (wallet.as_str(), events.as_slice()))
    }

    pub fn wallets(&self) -> impl Iterator<Item = &str> {
        self.wallets.keys().map(String::as_str)
    }

    pub fn wallet_count(&self) -> usize {
        self.wallets.len()
    }

    pub fn event_count(&self) -> usize {
        self.event_count
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }

    pub fn stats(&self) -> &NormalizationStats {
        &self.stats
    }
}
