//! Result assembly
//!
//! Packages a wallet→score mapping with summary statistics and the field
//! mappings the normalizer settled on, ready to be serialized.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::RiskBand;
use crate::normalizer::{NormalizationStats, SemanticField};

pub const MODEL_VERSION: &str = "1.0";

/// Scores below this are reported as high risk
pub const HIGH_RISK_BELOW: u16 = 300;

/// Scores above this are reported as excellent
pub const EXCELLENT_ABOVE: u16 = 800;

/// Width of a distribution bucket
const RANGE_WIDTH: u16 = 100;
const RANGE_COUNT: usize = 10;

/// Label of the 100-point range holding `score`. The first range includes
/// zero; every other range is open below and closed above.
pub fn score_range(score: u16) -> &'static str {
    const LABELS: [&str; RANGE_COUNT] = [
        "0-100", "100-200", "200-300", "300-400", "400-500", "500-600", "600-700", "700-800",
        "800-900", "900-1000",
    ];
    LABELS[range_index(score)]
}

/// Lowest score of the range holding `score`.
pub fn range_floor(score: u16) -> u16 {
    range_index(score) as u16 * RANGE_WIDTH
}

fn range_index(score: u16) -> usize {
    if score == 0 {
        return 0;
    }
    (((score - 1) / RANGE_WIDTH) as usize).min(RANGE_COUNT - 1)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeCount {
    pub range: String,
    pub count: usize,
}

/// Summary statistics of a batch of scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub average_score: f64,
    pub median_score: f64,
    pub min_score: Option<u16>,
    pub max_score: Option<u16>,
    pub high_risk_wallets: usize,
    pub excellent_wallets: usize,
    pub score_distribution: Vec<RangeCount>,
    pub risk_bands: BTreeMap<RiskBand, usize>,
}

impl ScoreSummary {
    pub fn from_scores<'a>(scores: impl IntoIterator<Item = &'a u16>) -> Self {
        let mut sorted: Vec<u16> = scores.into_iter().copied().collect();
        sorted.sort_unstable();

        let mut buckets = [0usize; RANGE_COUNT];
        let mut risk_bands: BTreeMap<RiskBand, usize> =
            RiskBand::ALL.iter().map(|band| (*band, 0)).collect();

        for &score in &sorted {
            buckets[range_index(score)] += 1;
            *risk_bands.entry(RiskBand::from_score(score)).or_default() += 1;
        }

        let average_score = if sorted.is_empty() {
            0.0
        } else {
            sorted.iter().map(|&s| s as f64).sum::<f64>() / sorted.len() as f64
        };

        Self {
            average_score,
            median_score: median(&sorted),
            min_score: sorted.first().copied(),
            max_score: sorted.last().copied(),
            high_risk_wallets: sorted.iter().filter(|&&s| s < HIGH_RISK_BELOW).count(),
            excellent_wallets: sorted.iter().filter(|&&s| s > EXCELLENT_ABOVE).count(),
            score_distribution: buckets
                .iter()
                .enumerate()
                .map(|(index, &count)| RangeCount {
                    range: score_range(index as u16 * RANGE_WIDTH + 1).to_string(),
                    count,
                })
                .collect(),
            risk_bands,
        }
    }
}

fn median(sorted: &[u16]) -> f64 {
    let n = sorted.len();
    match n {
        0 => 0.0,
        _ if n % 2 == 1 => sorted[n / 2] as f64,
        _ => (sorted[n / 2 - 1] as f64 + sorted[n / 2] as f64) / 2.0,
    }
}

/// The serialized result of one scoring run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringReport {
    pub generated_at: DateTime<Utc>,
    pub model_version: String,
    pub total_wallets_scored: usize,
    pub records_seen: u64,
    pub records_dropped: u64,

    /// Source key that supplied each semantic field most often
    pub field_mappings: BTreeMap<SemanticField, Option<String>>,

    pub analysis: ScoreSummary,
    pub wallet_scores: BTreeMap<String, u16>,
}

impl ScoringReport {
    pub fn assemble(
        scores: BTreeMap<String, u16>,
        stats: &NormalizationStats,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let field_mappings = SemanticField::ALL
            .iter()
            .map(|field| (*field, stats.dominant_key(*field).map(str::to_string)))
            .collect();

        Self {
            generated_at,
            model_version: MODEL_VERSION.to_string(),
            total_wallets_scored: scores.len(),
            records_seen: stats.records_seen,
            records_dropped: stats.records_dropped,
            field_mappings,
            analysis: ScoreSummary::from_scores(scores.values()),
            wallet_scores: scores,
        }
    }
}
