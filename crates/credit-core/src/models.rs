//! Data models for the scoring pipeline
//!
//! These are the structures that flow between stages: normalized [`Event`]s
//! from the ledger, the per-wallet [`WalletFeatures`] aggregate and the
//! [`ScoreBreakdown`] the scorer produces from it.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Ledger Events
// =============================================================================

/// Canonical kind of a lending protocol action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Deposit,
    Borrow,
    Repay,
    Liquidation,
    Other,
}

impl ActionKind {
    /// Map a free-form action token (e.g. `"liquidationcall"`,
    /// `"RepayWithATokens"`) onto a canonical kind.
    ///
    /// Matching is case-insensitive. Liquidation is checked first so that
    /// tokens such as `"liquidationRepay"` are never counted as repayments.
    pub fn classify(token: &str) -> Self {
        let token = token.trim().to_lowercase();

        if token.contains("liquidat") {
            ActionKind::Liquidation
        } else if token.contains("repay") {
            ActionKind::Repay
        } else if token.contains("borrow") {
            ActionKind::Borrow
        } else if token.contains("deposit") || token == "supply" {
            ActionKind::Deposit
        } else {
            ActionKind::Other
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Deposit => write!(f, "deposit"),
            ActionKind::Borrow => write!(f, "borrow"),
            ActionKind::Repay => write!(f, "repay"),
            ActionKind::Liquidation => write!(f, "liquidation"),
            ActionKind::Other => write!(f, "other"),
        }
    }
}

/// One normalized protocol action attributed to a wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Lowercased wallet identifier
    pub wallet: String,

    pub action: ActionKind,

    /// Non-negative magnitude, zero when absent or unparseable
    pub amount: Decimal,

    /// Asset identifier, or the configured unknown-asset sentinel
    pub asset: String,

    /// Epoch seconds
    pub timestamp: Option<i64>,
}

// =============================================================================
// Wallet Features
// =============================================================================

/// Behavioral aggregate of a single wallet's events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WalletFeatures {
    pub total_transactions: u64,
    pub deposit_count: u64,
    pub borrow_count: u64,
    pub repay_count: u64,
    pub liquidation_count: u64,
    pub other_count: u64,

    /// Number of distinct canonical action kinds seen
    pub unique_actions: u32,

    /// Repays per borrow. Not capped at 1.0; a wallet with no borrows gets
    /// 1.0 when it also never repaid and 0.0 otherwise.
    pub repay_ratio: f64,

    /// Liquidations over total transactions
    pub liquidation_rate: f64,

    /// Borrows over total transactions
    pub borrow_ratio: f64,

    /// Distinct asset identifiers, the unknown-asset sentinel included
    pub distinct_assets: u32,

    /// Distinct UTC calendar days with at least one event
    pub active_days: u32,

    /// Inclusive day span between the first and last timestamped event,
    /// zero when no event carries a timestamp
    pub span_days: u32,

    /// `active_days / span_days`, zero without timestamps
    pub consistency: f64,

    /// Transactions per day over the span (at least one day)
    pub velocity: f64,

    pub first_seen: Option<i64>,
    pub last_seen: Option<i64>,

    pub deposit_volume: Decimal,
    pub borrow_volume: Decimal,
    pub repay_volume: Decimal,
    pub total_volume: Decimal,
}

// =============================================================================
// Scores
// =============================================================================

/// Per-component contributions behind a wallet's score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub volume: f64,
    pub repayment: f64,
    pub risk: f64,
    pub consistency: f64,
    pub diversity: f64,
    pub bonus: f64,

    /// Sum of the clamped components, before any penalty
    pub raw: f64,

    /// Whether the bot-velocity multiplier was applied
    pub bot_penalty: bool,

    pub score: u16,
}

/// Features and breakdown for one wallet, for diagnostics output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletScore {
    pub wallet: String,
    pub features: WalletFeatures,
    pub breakdown: ScoreBreakdown,
}

impl WalletScore {
    pub fn score(&self) -> u16 {
        self.breakdown.score
    }
}

/// Coarse risk classification of a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    Critical,
    High,
    Moderate,
    Low,
    Minimal,
}

impl RiskBand {
    pub const ALL: [RiskBand; 5] = [
        RiskBand::Critical,
        RiskBand::High,
        RiskBand::Moderate,
        RiskBand::Low,
        RiskBand::Minimal,
    ];

    pub fn from_score(score: u16) -> Self {
        match score {
            0..=199 => RiskBand::Critical,
            200..=399 => RiskBand::High,
            400..=599 => RiskBand::Moderate,
            600..=799 => RiskBand::Low,
            _ => RiskBand::Minimal,
        }
    }

    /// Inclusive score bounds of the band
    pub fn bounds(&self) -> (u16, u16) {
        match self {
            RiskBand::Critical => (0, 199),
            RiskBand::High => (200, 399),
            RiskBand::Moderate => (400, 599),
            RiskBand::Low => (600, 799),
            RiskBand::Minimal => (800, 1000),
        }
    }
}

impl fmt::Display for RiskBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskBand::Critical => write!(f, "critical"),
            RiskBand::High => write!(f, "high"),
            RiskBand::Moderate => write!(f, "moderate"),
            RiskBand::Low => write!(f, "low"),
            RiskBand::Minimal => write!(f, "minimal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_action_tokens() {
        assert_eq!(ActionKind::classify("deposit"), ActionKind::Deposit);
        assert_eq!(ActionKind::classify("Supply"), ActionKind::Deposit);
        assert_eq!(ActionKind::classify("BORROW"), ActionKind::Borrow);
        assert_eq!(ActionKind::classify("repayWithATokens"), ActionKind::Repay);
        assert_eq!(ActionKind::classify("liquidationcall"), ActionKind::Liquidation);
        assert_eq!(ActionKind::classify("LiquidationRepay"), ActionKind::Liquidation);
        assert_eq!(ActionKind::classify("redeemunderlying"), ActionKind::Other);
        assert_eq!(ActionKind::classify(""), ActionKind::Other);
    }

    #[test]
    fn test_risk_band_edges() {
        assert_eq!(RiskBand::from_score(0), RiskBand::Critical);
        assert_eq!(RiskBand::from_score(199), RiskBand::Critical);
        assert_eq!(RiskBand::from_score(200), RiskBand::High);
        assert_eq!(RiskBand::from_score(599), RiskBand::Moderate);
        assert_eq!(RiskBand::from_score(800), RiskBand::Minimal);
        assert_eq!(RiskBand::from_score(1000), RiskBand::Minimal);

        for band in RiskBand::ALL {
            let (lo, hi) = band.bounds();
            assert_eq!(RiskBand::from_score(lo), band);
            assert_eq!(RiskBand::from_score(hi), band);
        }
    }
}
