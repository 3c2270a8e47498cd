//! Credit scoring engine
//!
//! Maps a wallet's [`WalletFeatures`] to an integer score in `[0, 1000]`.
//! The score is a sum of five clamped components plus a responsibility
//! bonus, halved for wallets transacting at bot-like velocity.
//!
//! A wallet's score depends on nothing but its own features and the
//! weights, so scores are reproducible and can be computed incrementally.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde_json::Value;

use crate::config::{ScoreWeights, ScoringConfig};
use crate::error::CreditResult;
use crate::events::EventTable;
use crate::features::engineer_features;
use crate::models::{ScoreBreakdown, WalletFeatures, WalletScore};
use crate::normalizer;

/// Score a single feature vector.
pub fn score_features(features: &WalletFeatures, weights: &ScoreWeights) -> ScoreBreakdown {
    // Transaction volume (0-250 points)
    let volume = band(
        features.total_transactions as f64 * weights.volume_per_transaction,
        weights.volume_cap,
    );

    // Repayment behavior (0-300 points)
    let repayment = band(features.repay_ratio * weights.repayment, weights.repayment);

    // Liquidations (0-200 points); a single liquidation wipes the component
    // out with the default penalty
    let risk = band(
        weights.risk - features.liquidation_count as f64 * weights.liquidation_penalty,
        weights.risk,
    );

    // Activity consistency (0-150 points)
    let consistency = band(features.consistency * weights.consistency, weights.consistency);

    // Portfolio diversity (0-100 points)
    let diversity = band(
        features.distinct_assets as f64 * weights.diversity_per_asset,
        weights.diversity_cap,
    );

    // Responsible behavior bonus, never for a wallet with no activity
    let bonus = if features.total_transactions > 0
        && features.repay_ratio >= 1.0
        && features.liquidation_count == 0
    {
        weights.responsibility_bonus
    } else {
        0.0
    };

    let raw = volume + repayment + risk + consistency + diversity + bonus;

    let bot_penalty = features.velocity > weights.bot_velocity_threshold;
    let adjusted = if bot_penalty {
        raw * weights.bot_penalty_multiplier
    } else {
        raw
    };

    let score = band(adjusted.round(), weights.max_score as f64) as u16;

    ScoreBreakdown {
        volume,
        repayment,
        risk,
        consistency,
        diversity,
        bonus,
        raw,
        bot_penalty,
        score,
    }
}

fn band(value: f64, ceiling: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.min(ceiling).max(0.0)
}

/// Features and score breakdown for every wallet in the table.
pub fn score_detailed(table: &EventTable, weights: &ScoreWeights) -> BTreeMap<String, WalletScore> {
    let scored: BTreeMap<String, WalletScore> = engineer_features(table)
        .into_par_iter()
        .map(|(wallet, features)| {
            let breakdown = score_features(&features, weights);

            if breakdown.bot_penalty {
                tracing::debug!(
                    wallet = %wallet,
                    velocity = features.velocity,
                    "Bot-like velocity, applying penalty"
                );
            }

            let scored = WalletScore {
                wallet: wallet.clone(),
                features,
                breakdown,
            };
            (wallet, scored)
        })
        .collect();

    tracing::debug!(wallets = scored.len(), "Scored wallets");
    scored
}

/// Wallet to score mapping for every wallet in the table.
pub fn score(table: &EventTable, weights: &ScoreWeights) -> BTreeMap<String, u16> {
    score_detailed(table, weights)
        .into_iter()
        .map(|(wallet, scored)| (wallet, scored.score()))
        .collect()
}

// =============================================================================
// Pipeline
// =============================================================================

/// Output of one pipeline run.
#[derive(Debug, Clone)]
pub struct ScoredBatch {
    pub table: EventTable,
    pub wallets: BTreeMap<String, WalletScore>,
}

impl ScoredBatch {
    pub fn scores(&self) -> BTreeMap<String, u16> {
        self.wallets
            .iter()
            .map(|(wallet, scored)| (wallet.clone(), scored.score()))
            .collect()
    }

    pub fn features(&self) -> BTreeMap<String, WalletFeatures> {
        self.wallets
            .iter()
            .map(|(wallet, scored)| (wallet.clone(), scored.features.clone()))
            .collect()
    }
}

/// Normalizer and scorer bound to one validated configuration.
#[derive(Debug, Clone, Default)]
pub struct CreditScorer {
    config: ScoringConfig,
}

impl CreditScorer {
    pub fn new(config: ScoringConfig) -> CreditResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn normalize(&self, raw: &Value) -> CreditResult<EventTable> {
        normalizer::normalize(raw, &self.config.fields)
    }

    pub fn score(&self, table: &EventTable) -> BTreeMap<String, u16> {
        score(table, &self.config.weights)
    }

    pub fn score_detailed(&self, table: &EventTable) -> BTreeMap<String, WalletScore> {
        score_detailed(table, &self.config.weights)
    }

    /// Normalize a decoded document and score every recoverable wallet.
    pub fn run(&self, raw: &Value) -> CreditResult<ScoredBatch> {
        let table = self.normalize(raw)?;
        let wallets = self.score_detailed(&table);

        tracing::info!(
            events = table.event_count(),
            wallets = wallets.len(),
            "Scoring run complete"
        );

        Ok(ScoredBatch { table, wallets })
    }
}
