//! Feature engineering
//!
//! Reduces each wallet's event slice to a [`WalletFeatures`] vector. The
//! computation for one wallet reads only that wallet's events, so the table
//! is processed in parallel.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{DateTime, NaiveDate};
use rayon::prelude::*;

use crate::events::EventTable;
use crate::models::{ActionKind, Event, WalletFeatures};

/// Compute the features of a single wallet from its events.
pub fn compute_features(events: &[Event]) -> WalletFeatures {
    let mut features = WalletFeatures::default();

    let mut kinds: HashSet<ActionKind> = HashSet::new();
    let mut assets: HashSet<&str> = HashSet::new();
    let mut days: BTreeSet<NaiveDate> = BTreeSet::new();

    for event in events {
        features.total_transactions += 1;
        features.total_volume = features.total_volume.saturating_add(event.amount);
        kinds.insert(event.action);
        assets.insert(event.asset.as_str());

        match event.action {
            ActionKind::Deposit => {
                features.deposit_count += 1;
                features.deposit_volume = features.deposit_volume.saturating_add(event.amount);
            }
            ActionKind::Borrow => {
                features.borrow_count += 1;
                features.borrow_volume = features.borrow_volume.saturating_add(event.amount);
            }
            ActionKind::Repay => {
                features.repay_count += 1;
                features.repay_volume = features.repay_volume.saturating_add(event.amount);
            }
            ActionKind::Liquidation => features.liquidation_count += 1,
            ActionKind::Other => features.other_count += 1,
        }

        if let Some(ts) = event.timestamp {
            features.first_seen = Some(features.first_seen.map_or(ts, |first| first.min(ts)));
            features.last_seen = Some(features.last_seen.map_or(ts, |last| last.max(ts)));
            if let Some(day) = utc_day(ts) {
                days.insert(day);
            }
        }
    }

    features.unique_actions = kinds.len() as u32;
    features.distinct_assets = assets.len() as u32;
    features.repay_ratio = repay_ratio(features.repay_count, features.borrow_count);

    let total = features.total_transactions.max(1) as f64;
    features.liquidation_rate = features.liquidation_count as f64 / total;
    features.borrow_ratio = features.borrow_count as f64 / total;

    features.active_days = days.len() as u32;
    features.span_days = match (days.first(), days.last()) {
        (Some(first), Some(last)) => ((*last - *first).num_days() + 1) as u32,
        _ => 0,
    };
    features.consistency = if features.span_days > 0 {
        features.active_days as f64 / features.span_days as f64
    } else {
        // Without timestamps there is no evidence of consistency.
        0.0
    };
    features.velocity = features.total_transactions as f64 / features.span_days.max(1) as f64;

    features
}

/// Repays per borrow. A wallet that never borrowed is not penalized unless it
/// shows repayments with no matching borrow.
pub fn repay_ratio(repay_count: u64, borrow_count: u64) -> f64 {
    match (borrow_count, repay_count) {
        (0, 0) => 1.0,
        (0, _) => 0.0,
        (borrows, repays) => repays as f64 / borrows as f64,
    }
}

fn utc_day(timestamp: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(timestamp, 0).map(|dt| dt.date_naive())
}

/// Features for every wallet in the table.
pub fn engineer_features(table: &EventTable) -> BTreeMap<String, WalletFeatures> {
    let features: BTreeMap<String, WalletFeatures> = table
        .iter()
        .par_bridge()
        .map(|(wallet, events)| (wallet.to_string(), compute_features(events)))
        .collect();

    tracing::debug!(wallets = features.len(), "Engineered wallet features");
    features
}
