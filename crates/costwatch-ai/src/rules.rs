//! Deterministic text used whenever no model is available.

use costwatch_common::types::{format_money, OrgSummary, TeamAnalysis};

pub fn basic_analysis(analysis: &TeamAnalysis) -> String {
    let change = analysis.percentage_change;
    let direction = if change > 0.0 { "increased" } else { "decreased" };

    let mut changes: Vec<(&str, f64, f64)> = analysis
        .service_breakdown
        .iter()
        .filter_map(|(service, &cost)| {
            let prev = analysis
                .previous_service_breakdown
                .get(service)
                .copied()
                .unwrap_or(0.0);
            (prev > 0.0).then(|| (service.as_str(), (cost - prev) / prev * 100.0, cost - prev))
        })
        .collect();
    changes.sort_by(|a, b| b.2.abs().total_cmp(&a.2.abs()));

    let mut text = format!(
        "Cost {direction} by {:.1}%.\n\nTop cost changes:\n",
        change.abs()
    );
    for (service, pct, diff) in changes.into_iter().take(3) {
        let arrow = if diff > 0.0 { "↑" } else { "↓" };
        text.push_str(&format!(
            "• {service}: {arrow} ${} ({pct:+.1}%)\n",
            format_money(diff.abs())
        ));
    }
    text
}

/// Plain average of every month in `history`.
pub fn basic_prediction(history: &[(String, f64)]) -> String {
    if history.is_empty() {
        return "Insufficient data".to_string();
    }
    let avg = history.iter().map(|(_, cost)| cost).sum::<f64>() / history.len() as f64;
    format!(
        "Estimated next month: ${} (based on {} months average)",
        format_money(avg),
        history.len()
    )
}

pub fn basic_executive_summary(org: &OrgSummary) -> String {
    let direction = if org.percentage_change > 0.0 { "up" } else { "down" };
    format!(
        "AWS spend across {} accounts: ${} this month, {direction} {:.1}% from last month (${}). {} accounts showed unusual patterns.",
        org.accounts,
        format_money(org.total_current),
        org.percentage_change.abs(),
        format_money(org.total_previous),
        org.anomalies_count,
    )
}

pub fn basic_recommendations(org: &OrgSummary) -> String {
    let mut text = format!(
        "Organization review: {} accounts, ${} this month ({:+.1}% month over month).\n",
        org.accounts,
        format_money(org.total_current),
        org.percentage_change
    );

    if org.top_anomalies.is_empty() {
        text.push_str("\nNo teams exceeded the anomaly threshold.\n");
    } else {
        text.push_str("\nTeams needing immediate attention:\n");
        for team in &org.top_anomalies {
            text.push_str(&format!(
                "• {}: {:+.1}% to ${}\n",
                team.team_name,
                team.percentage_change,
                format_money(team.current_month_cost)
            ));
        }
    }

    if !org.top_spenders.is_empty() {
        text.push_str("\nLargest spenders (review for Savings Plans and rightsizing):\n");
        for team in &org.top_spenders {
            text.push_str(&format!(
                "• {}: ${}\n",
                team.team_name,
                format_money(team.current_month_cost)
            ));
        }
    }
    text
}
