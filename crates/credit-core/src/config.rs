//! Scoring configuration
//!
//! Every constant the pipeline depends on (candidate field names, component
//! weights, thresholds) lives here. A [`ScoringConfig`] is built once and
//! passed by reference into the normalizer and the scorer.

use serde::{Deserialize, Serialize};

use crate::error::{CreditError, CreditResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub fields: FieldConfig,
    pub weights: ScoreWeights,
}

impl ScoringConfig {
    pub fn validate(&self) -> CreditResult<()> {
        self.fields.validate()?;
        self.weights.validate()
    }
}

// =============================================================================
// Field Resolution
// =============================================================================

/// Candidate source keys for each semantic field, in priority order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    pub wallet: Vec<String>,
    pub action: Vec<String>,
    pub amount: Vec<String>,
    pub asset: Vec<String>,
    pub timestamp: Vec<String>,

    /// Record keys holding a nested object that is searched after the
    /// record's own top-level keys (e.g. Aave's `actionData`)
    pub nested: Vec<String>,

    /// Preferred list-valued keys when a top-level object holds more than
    /// one list
    pub containers: Vec<String>,

    /// Asset identifier used when no asset field is present
    pub unknown_asset: String,
}

fn keys(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            wallet: keys(&["user", "wallet", "address", "from", "account", "userWallet"]),
            action: keys(&["action", "type", "event"]),
            amount: keys(&["amount", "value"]),
            asset: keys(&["reserve", "asset", "token", "assetSymbol"]),
            timestamp: keys(&["timestamp", "blockTimestamp"]),
            nested: keys(&["actionData"]),
            containers: keys(&["transactions", "data", "records", "events"]),
            unknown_asset: "unknown".to_string(),
        }
    }
}

impl FieldConfig {
    pub fn validate(&self) -> CreditResult<()> {
        if self.wallet.is_empty() {
            return Err(CreditError::Config(
                "at least one wallet field candidate is required".to_string(),
            ));
        }
        if self.action.is_empty() {
            return Err(CreditError::Config(
                "at least one action field candidate is required".to_string(),
            ));
        }
        if self.unknown_asset.is_empty() {
            return Err(CreditError::Config(
                "unknown asset sentinel must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Score Weights
// =============================================================================

/// Component weights and bands of the credit formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    /// Points per transaction, capped at `volume_cap`
    pub volume_per_transaction: f64,
    pub volume_cap: f64,

    /// Points at a repay ratio of 1.0
    pub repayment: f64,

    /// Risk points with zero liquidations; each liquidation removes
    /// `liquidation_penalty`
    pub risk: f64,
    pub liquidation_penalty: f64,

    /// Points at a consistency ratio of 1.0
    pub consistency: f64,

    /// Points per distinct asset, capped at `diversity_cap`
    pub diversity_per_asset: f64,
    pub diversity_cap: f64,

    pub responsibility_bonus: f64,

    /// Transactions per day above which the bot penalty applies
    pub bot_velocity_threshold: f64,
    pub bot_penalty_multiplier: f64,

    pub max_score: u16,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            volume_per_transaction: 5.0,
            volume_cap: 250.0,
            repayment: 300.0,
            risk: 200.0,
            liquidation_penalty: 200.0,
            consistency: 150.0,
            diversity_per_asset: 20.0,
            diversity_cap: 100.0,
            responsibility_bonus: 50.0,
            bot_velocity_threshold: 100.0,
            bot_penalty_multiplier: 0.5,
            max_score: 1000,
        }
    }
}

impl ScoreWeights {
    /// Highest raw sum the components can reach
    pub fn ceiling(&self) -> f64 {
        self.volume_cap
            + self.repayment
            + self.risk
            + self.consistency
            + self.diversity_cap
            + self.responsibility_bonus
    }

    pub fn validate(&self) -> CreditResult<()> {
        let named = [
            ("volume_per_transaction", self.volume_per_transaction),
            ("volume_cap", self.volume_cap),
            ("repayment", self.repayment),
            ("risk", self.risk),
            ("liquidation_penalty", self.liquidation_penalty),
            ("consistency", self.consistency),
            ("diversity_per_asset", self.diversity_per_asset),
            ("diversity_cap", self.diversity_cap),
            ("responsibility_bonus", self.responsibility_bonus),
            ("bot_velocity_threshold", self.bot_velocity_threshold),
        ];

        for (name, value) in named {
            if !value.is_finite() || value < 0.0 {
                return Err(CreditError::Config(format!(
                    "weight {} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        if !(0.0..=1.0).contains(&self.bot_penalty_multiplier) {
            return Err(CreditError::Config(format!(
                "bot_penalty_multiplier must lie in [0, 1], got {}",
                self.bot_penalty_multiplier
            )));
        }

        if self.max_score == 0 {
            return Err(CreditError::Config("max_score must be positive".to_string()));
        }

        Ok(())
    }
}
