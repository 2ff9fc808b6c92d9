use costwatch_common::types::{format_money, OrgSummary, ServiceBreakdown, TeamAnalysis};
use serde::Serialize;

pub const ANALYSIS_SYSTEM: &str = "You are an AWS cost optimization expert. Analyze the provided cost data and:
1. Explain WHY costs changed (be specific about services)
2. Identify patterns or anomalies
3. Provide actionable recommendations
Keep responses concise and actionable. Use bullet points.";

pub const FORECAST_SYSTEM: &str = "You are an AWS cost forecasting expert. Based on historical cost data, predict next month's costs.
Provide a specific dollar amount prediction with confidence level and reasoning.";

pub const RECOMMENDATIONS_SYSTEM: &str = "You are an AWS cost optimization consultant for a large organization.
Analyze cost data across multiple accounts and provide strategic recommendations.
Focus on high-impact, actionable items.";

pub const SUMMARY_SYSTEM: &str = "You are a CFO's assistant writing cost reports.
Write concise, executive-friendly summaries with clear action items.
Use professional language suitable for C-level executives.";

/// Months of history fed to the forecast prompt.
pub const FORECAST_WINDOW: usize = 6;

#[derive(Serialize)]
struct TeamLine<'a> {
    team: &'a str,
    cost: f64,
    change: f64,
}

fn team_lines(teams: &[TeamAnalysis]) -> String {
    let lines: Vec<TeamLine<'_>> = teams
        .iter()
        .map(|t| TeamLine {
            team: &t.team_name,
            cost: t.current_month_cost,
            change: t.percentage_change,
        })
        .collect();
    serde_json::to_string_pretty(&lines).unwrap_or_else(|_| "[]".to_string())
}

fn breakdown_json(breakdown: &ServiceBreakdown) -> String {
    serde_json::to_string_pretty(breakdown).unwrap_or_else(|_| "{}".to_string())
}

pub fn build_analysis_prompt(analysis: &TeamAnalysis) -> String {
    format!(
        "Analyze this AWS cost data for {team}:

Current Month: ${current}
Previous Month: ${previous}
Change: {change:.1}%

Service Breakdown (Current):
{current_breakdown}

Service Breakdown (Previous):
{previous_breakdown}

Provide:
1. Root cause analysis (why did costs change?)
2. Top 3 cost drivers
3. Specific optimization recommendations",
        team = analysis.team_name,
        current = format_money(analysis.current_month_cost),
        previous = format_money(analysis.previous_month_cost),
        change = analysis.percentage_change,
        current_breakdown = breakdown_json(&analysis.service_breakdown),
        previous_breakdown = breakdown_json(&analysis.previous_service_breakdown),
    )
}

/// `history` must already be sorted by month; only the last
/// [`FORECAST_WINDOW`] entries are used.
pub fn build_forecast_prompt(history: &[(String, f64)], team_name: &str) -> String {
    let skip = history.len().saturating_sub(FORECAST_WINDOW);
    let summary: Vec<String> = history
        .iter()
        .skip(skip)
        .map(|(month, cost)| format!("- {month}: ${}", format_money(*cost)))
        .collect();
    format!(
        "Based on this cost history for {team_name}, predict next month's AWS cost:

Historical Costs:
{history}

Provide:
1. Predicted cost (specific dollar amount)
2. Confidence level (low/medium/high)
3. Key factors affecting the prediction
4. Potential risks that could increase costs",
        history = summary.join("\n"),
    )
}

pub fn build_recommendations_prompt(org: &OrgSummary) -> String {
    format!(
        "Analyze this AWS Organization cost summary ({accounts} accounts):

Total Current Month: ${current}
Total Previous Month: ${previous}
Overall Change: {change:.1}%

Top 10 Spending Teams:
{spenders}

Top Anomalies (cost spikes):
{anomalies}

Provide:
1. Top 5 organization-wide cost optimization opportunities
2. Teams that need immediate attention
3. Reserved Instance / Savings Plan recommendations
4. Quick wins (actions that can save money this week)",
        accounts = org.accounts,
        current = format_money(org.total_current),
        previous = format_money(org.total_previous),
        change = org.percentage_change,
        spenders = team_lines(&org.top_spenders),
        anomalies = team_lines(&org.top_anomalies),
    )
}

pub fn build_summary_prompt(org: &OrgSummary) -> String {
    format!(
        "Write a brief executive summary for this AWS cost report:

Organization: {accounts} AWS accounts
Current Month Spend: ${current}
Previous Month Spend: ${previous}
Month-over-Month Change: {change:.1}%
Cost Anomalies Detected: {count}

Top anomalies:
{anomalies}

Write a 3-4 sentence executive summary highlighting:
1. Overall cost trend
2. Key concerns
3. Recommended immediate actions",
        accounts = org.accounts,
        current = format_money(org.total_current),
        previous = format_money(org.total_previous),
        change = org.percentage_change,
        count = org.anomalies_count,
        anomalies = team_lines(&org.top_anomalies),
    )
}
