//! Markdown analysis of a scored batch
//!
//! Buckets wallets into 100-point score ranges and describes the behavior
//! typical of each range. Output is plain markdown; no charts are rendered.

use std::collections::BTreeMap;

use crate::config::ScoreWeights;
use crate::models::{RiskBand, WalletScore};
use crate::report::{range_floor, score_range, ScoringReport, EXCELLENT_ABOVE, HIGH_RISK_BELOW};

/// Aggregate behavior of the wallets falling into one score range.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeBehavior {
    pub range: &'static str,
    /// Lowest score of the range
    pub floor: u16,
    pub wallet_count: usize,
    pub avg_transactions: f64,
    pub avg_unique_assets: f64,
    pub avg_repay_ratio: f64,
    pub liquidated_wallets: usize,
    pub bot_flagged_wallets: usize,
}

impl RangeBehavior {
    fn common_behaviors(&self) -> Vec<String> {
        let mut behaviors = Vec::new();

        if self.avg_transactions < 5.0 {
            behaviors.push("Low activity users (< 5 transactions)".to_string());
        } else if self.avg_transactions > 50.0 {
            behaviors.push("High activity users (> 50 transactions)".to_string());
        } else {
            behaviors.push(format!(
                "Moderate activity users (~{:.1} transactions)",
                self.avg_transactions
            ));
        }

        if self.avg_unique_assets < 2.0 {
            behaviors.push("Single-asset focused".to_string());
        } else if self.avg_unique_assets > 5.0 {
            behaviors.push("Highly diversified portfolios".to_string());
        } else {
            behaviors.push(format!(
                "Moderate diversification (~{:.1} assets)",
                self.avg_unique_assets
            ));
        }

        if self.liquidated_wallets > 0 {
            behaviors.push(format!(
                "{} wallet(s) with at least one liquidation",
                self.liquidated_wallets
            ));
        }
        if self.bot_flagged_wallets > 0 {
            behaviors.push(format!(
                "{} wallet(s) flagged for bot-like velocity",
                self.bot_flagged_wallets
            ));
        }

        behaviors
    }
}

/// Group scored wallets by score range, lowest range first. Empty ranges are
/// omitted.
pub fn behavior_by_range(wallets: &BTreeMap<String, WalletScore>) -> Vec<RangeBehavior> {
    let mut groups: BTreeMap<u16, Vec<&WalletScore>> = BTreeMap::new();
    for scored in wallets.values() {
        groups.entry(range_floor(scored.score())).or_default().push(scored);
    }

    groups
        .into_iter()
        .map(|(floor, members)| {
            let n = members.len() as f64;
            RangeBehavior {
                range: score_range(floor + 1),
                floor,
                wallet_count: members.len(),
                avg_transactions: members
                    .iter()
                    .map(|s| s.features.total_transactions as f64)
                    .sum::<f64>()
                    / n,
                avg_unique_assets: members
                    .iter()
                    .map(|s| s.features.distinct_assets as f64)
                    .sum::<f64>()
                    / n,
                avg_repay_ratio: members.iter().map(|s| s.features.repay_ratio).sum::<f64>() / n,
                liquidated_wallets: members
                    .iter()
                    .filter(|s| s.features.liquidation_count > 0)
                    .count(),
                bot_flagged_wallets: members.iter().filter(|s| s.breakdown.bot_penalty).count(),
            }
        })
        .collect()
}

fn risk_level(range: &str) -> &'static str {
    match range {
        "0-100" => "Critical",
        "100-200" => "Very High",
        "200-300" | "300-400" => "High",
        "400-500" | "500-600" => "Moderate",
        "600-700" | "700-800" => "Low",
        "800-900" => "Very Low",
        "900-1000" => "Minimal",
        _ => "Unknown",
    }
}

fn risk_patterns(band: RiskBand) -> &'static [&'static str] {
    match band {
        RiskBand::Critical => &[
            "High liquidation risk",
            "Poor repayment history",
            "Potential bot activity",
        ],
        RiskBand::High => &[
            "Moderate risk indicators",
            "Inconsistent repayment patterns",
            "Some liquidation events",
        ],
        RiskBand::Moderate => &[
            "Generally stable behavior",
            "Minor risk indicators",
            "Room for improvement in consistency",
        ],
        RiskBand::Low => &[
            "Good financial discipline",
            "Consistent repayment behavior",
            "Low risk profile",
        ],
        RiskBand::Minimal => &[
            "Excellent credit behavior",
            "Full repayment history",
            "No liquidation events",
        ],
    }
}

fn share(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// Render the markdown analysis of a scored batch.
pub fn render_analysis(
    report: &ScoringReport,
    wallets: &BTreeMap<String, WalletScore>,
    weights: &ScoreWeights,
) -> String {
    let summary = &report.analysis;
    let total = report.total_wallets_scored;

    let mut md = String::from("# DeFi Credit Scoring Analysis\n\n");
    md.push_str(&format!(
        "*Generated on {}*\n\n",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    md.push_str("## Executive Summary\n\n");
    md.push_str(&format!(
        "This analysis covers {} wallets scored from {} ledger records ({} dropped as malformed). \
         Scores range from 0 to {}; higher scores indicate more reliable lending behavior.\n\n",
        total, report.records_seen, report.records_dropped, weights.max_score
    ));

    md.push_str("### Key Findings\n\n");
    md.push_str(&format!("- **Average Score**: {:.2}\n", summary.average_score));
    md.push_str(&format!("- **Median Score**: {:.2}\n", summary.median_score));
    md.push_str(&format!(
        "- **High-Risk Wallets** (< {}): {} ({:.1}%)\n",
        HIGH_RISK_BELOW,
        summary.high_risk_wallets,
        share(summary.high_risk_wallets, total)
    ));
    md.push_str(&format!(
        "- **Excellent Wallets** (> {}): {} ({:.1}%)\n\n",
        EXCELLENT_ABOVE,
        summary.excellent_wallets,
        share(summary.excellent_wallets, total)
    ));

    md.push_str("## Score Distribution\n\n");
    md.push_str("| Score Range | Wallet Count | Percentage | Risk Level |\n");
    md.push_str("|-------------|--------------|------------|------------|\n");
    for bucket in &summary.score_distribution {
        md.push_str(&format!(
            "| {} | {} | {:.1}% | {} |\n",
            bucket.range,
            bucket.count,
            share(bucket.count, total),
            risk_level(&bucket.range)
        ));
    }

    md.push_str("\n### Risk Bands\n\n");
    md.push_str("| Band | Scores | Wallet Count |\n");
    md.push_str("|------|--------|--------------|\n");
    for (band, count) in &summary.risk_bands {
        let (lo, hi) = band.bounds();
        md.push_str(&format!("| {} | {}-{} | {} |\n", band, lo, hi, count));
    }

    md.push_str("\n## Behavioral Analysis by Score Range\n\n");
    let behaviors = behavior_by_range(wallets);
    if behaviors.is_empty() {
        md.push_str("No wallets were scored.\n\n");
    }
    for behavior in &behaviors {
        md.push_str(&format!("### Score Range: {}\n\n", behavior.range));
        md.push_str(&format!("**Wallet Count**: {}  \n", behavior.wallet_count));
        md.push_str(&format!(
            "**Average Transactions**: {:.1}  \n",
            behavior.avg_transactions
        ));
        md.push_str(&format!(
            "**Average Unique Assets**: {:.1}  \n",
            behavior.avg_unique_assets
        ));
        md.push_str(&format!(
            "**Average Repay Ratio**: {:.2}  \n\n",
            behavior.avg_repay_ratio
        ));

        md.push_str("**Common Behaviors**:\n");
        for line in behavior.common_behaviors() {
            md.push_str(&format!("- {}\n", line));
        }

        md.push_str("\n**Risk Patterns**:\n");
        for pattern in risk_patterns(RiskBand::from_score(behavior.floor)) {
            md.push_str(&format!("- {}\n", pattern));
        }
        md.push('\n');
    }

    md.push_str("## Scoring Model\n\n");
    md.push_str("| Component | Points |\n");
    md.push_str("|-----------|--------|\n");
    md.push_str(&format!(
        "| Volume | {} per transaction, up to {} |\n",
        weights.volume_per_transaction, weights.volume_cap
    ));
    md.push_str(&format!("| Repayment | repay ratio x {} |\n", weights.repayment));
    md.push_str(&format!(
        "| Risk | {} minus {} per liquidation |\n",
        weights.risk, weights.liquidation_penalty
    ));
    md.push_str(&format!(
        "| Consistency | active-day ratio x {} |\n",
        weights.consistency
    ));
    md.push_str(&format!(
        "| Diversity | {} per asset, up to {} |\n",
        weights.diversity_per_asset, weights.diversity_cap
    ));
    md.push_str(&format!(
        "| Responsibility bonus | {} with full repayment and no liquidations |\n\n",
        weights.responsibility_bonus
    ));
    md.push_str(&format!(
        "Wallets averaging more than {} transactions per day have their score multiplied by {}.\n",
        weights.bot_velocity_threshold, weights.bot_penalty_multiplier
    ));

    md
}
