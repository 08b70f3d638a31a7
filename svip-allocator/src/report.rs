//! Allocation Report Generator.
//!
//! Wraps an [`Allocation`] with its pool breakdown and renders it as
//! Markdown.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::allocation::{AllocatedSecurity, Allocation, Phase, Pool, ValuationTier};

/// Complete allocation report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationReport {
    pub generated_at: DateTime<Utc>,
    pub market: String,
    /// Core pool, highest target weight first
    pub core_pool: Vec<AllocatedSecurity>,
    /// Watch pool, highest target weight first
    pub watch_pool: Vec<AllocatedSecurity>,
    pub allocation: Allocation,
}

/// Build a report from a finished allocation.
pub fn generate_report(allocation: Allocation) -> AllocationReport {
    let pool = |pool: Pool| {
        let mut securities: Vec<_> = allocation.pool(pool).cloned().collect();
        securities.sort_by(|a, b| b.target_weight.total_cmp(&a.target_weight));
        securities
    };

    AllocationReport {
        generated_at: Utc::now(),
        market: allocation.market.clone(),
        core_pool: pool(Pool::Core),
        watch_pool: pool(Pool::Watch),
        allocation,
    }
}

fn tier_label(tier: Option<ValuationTier>) -> String {
    match tier {
        Some(ValuationTier::A) => "🟢 A".to_string(),
        Some(ValuationTier::B) => "🟡 B".to_string(),
        Some(ValuationTier::C) => "🔴 C".to_string(),
        None => "-".to_string(),
    }
}

fn phase_label(phase: Option<Phase>) -> &'static str {
    match phase {
        Some(Phase::Accelerating) => "🚀 accelerating",
        Some(Phase::Steady) => "➡️ steady",
        Some(Phase::Decaying) => "📉 decaying",
        None => "-",
    }
}

fn pct(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

fn format_pool_table(title: &str, securities: &[AllocatedSecurity]) -> String {
    let mut md = format!("### {}\n\n", title);

    if securities.is_empty() {
        md.push_str("*(empty)*\n\n");
        return md;
    }

    md.push_str("| Symbol | Name | Quality | Valuation | Phase | Target | Action |\n");
    md.push_str("|--------|------|---------|-----------|-------|--------|--------|\n");
    for s in securities {
        let quality = s
            .quality_score
            .map(|q| format!("{:.0}", q))
            .unwrap_or_else(|| "-".to_string());
        let weight = if s.target_weight > 0.0 {
            pct(s.target_weight)
        } else {
            "-".to_string()
        };
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} |\n",
            s.symbol,
            s.name,
            quality,
            tier_label(s.valuation_tier),
            phase_label(s.phase),
            weight,
            s.action
        ));
    }
    md.push('\n');
    md
}

/// Render a report as Markdown.
pub fn render_markdown(report: &AllocationReport) -> String {
    let allocation = &report.allocation;
    let mut md = String::new();

    md.push_str("# Portfolio Allocation Report\n\n");
    md.push_str(&format!(
        "**Generated**: {} | **Market**: {}\n\n",
        report.generated_at.format("%Y-%m-%d %H:%M UTC"),
        report.market
    ));

    // Summary
    md.push_str("## Summary\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("|--------|-------|\n");
    md.push_str(&format!("| Total equity | {} |\n", pct(allocation.total_equity)));
    md.push_str(&format!("| Cash | {} |\n", pct(allocation.cash_weight)));
    md.push_str(&format!(
        "| Cash rule | {} ({}) |\n",
        allocation.cash_rule,
        pct(allocation.cash_level)
    ));
    md.push_str(&format!("| Core pool | {} |\n", pct(allocation.core_pool_weight)));
    md.push_str(&format!("| Watch pool | {} |\n", pct(allocation.watch_pool_weight)));
    md.push_str(&format!(
        "| Equity ceiling | {} |\n",
        pct(allocation.final_equity_ceiling)
    ));
    md.push_str(&format!(
        "| Macro risk factor | {:.2} |\n",
        allocation.macro_risk_factor
    ));
    md.push_str(&format!(
        "| Tail risk factor | {:.2} |\n\n",
        allocation.tail_risk_factor
    ));

    // Pools
    md.push_str("## Pools\n\n");
    md.push_str(&format_pool_table("Core Pool", &report.core_pool));
    md.push_str(&format_pool_table("Watch Pool", &report.watch_pool));

    // Theme exposure
    if !allocation.theme_exposure.is_empty() {
        let mut themes: Vec<_> = allocation.theme_exposure.iter().collect();
        themes.sort_by(|a, b| b.1.total_cmp(a.1));

        md.push_str("## Theme Exposure\n\n");
        md.push_str("| Theme | Weight |\n");
        md.push_str("|-------|--------|\n");
        for (theme, weight) in themes {
            md.push_str(&format!("| {} | {} |\n", theme, pct(*weight)));
        }
        md.push('\n');
    }

    // Rotation
    if !allocation.rotation_signals.is_empty() {
        md.push_str("## Theme Rotation\n\n");
        md.push_str("| Theme | Mean Acceleration | Z | Adjustment |\n");
        md.push_str("|-------|-------------------|---|------------|\n");
        for signal in &allocation.rotation_signals {
            let adjustment = if signal.weight_adjustment == 0.0 {
                "unchanged".to_string()
            } else {
                format!("{:+.0}%", signal.weight_adjustment * 100.0)
            };
            md.push_str(&format!(
                "| {} | {:.1} | {:.2} | {} |\n",
                signal.theme, signal.avg_acceleration, signal.z_score, adjustment
            ));
        }
        md.push('\n');
    }

    // Violations
    if !allocation.violations.is_empty() {
        md.push_str("## ⚠️ Violations\n\n");
        for violation in &allocation.violations {
            md.push_str(&format!("- {}\n", violation));
        }
        md.push('\n');
    }

    md
}
