use crate::policy::percentage_change;
use costwatch_common::types::{round2, OrgSummary, TeamAnalysis};

pub const TOP_SPENDERS: usize = 10;
pub const TOP_ANOMALIES: usize = 5;

/// Highest current-month spend first.
pub fn top_spenders(teams: &[TeamAnalysis], n: usize) -> Vec<TeamAnalysis> {
    let mut ranked = teams.to_vec();
    ranked.sort_by(|a, b| b.current_month_cost.total_cmp(&a.current_month_cost));
    ranked.truncate(n);
    ranked
}

/// Anomalous teams, largest absolute change first.
pub fn top_anomalies(teams: &[TeamAnalysis], n: usize) -> Vec<TeamAnalysis> {
    let mut ranked: Vec<TeamAnalysis> = teams.iter().filter(|t| t.is_anomaly).cloned().collect();
    ranked.sort_by(|a, b| {
        b.percentage_change
            .abs()
            .total_cmp(&a.percentage_change.abs())
    });
    ranked.truncate(n);
    ranked
}

/// Sums successfully analyzed teams into an org-wide view.
pub fn summarize(teams: &[TeamAnalysis]) -> OrgSummary {
    let total_current: f64 = teams.iter().map(|t| t.current_month_cost).sum();
    let total_previous: f64 = teams.iter().map(|t| t.previous_month_cost).sum();
    OrgSummary {
        accounts: teams.len(),
        total_current: round2(total_current),
        total_previous: round2(total_previous),
        percentage_change: round2(percentage_change(total_current, total_previous)),
        anomalies_count: teams.iter().filter(|t| t.is_anomaly).count(),
        top_spenders: top_spenders(teams, TOP_SPENDERS),
        top_anomalies: top_anomalies(teams, TOP_ANOMALIES),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use costwatch_common::types::ServiceBreakdown;

    fn team(name: &str, current: f64, previous: f64, pct: f64, anomaly: bool) -> TeamAnalysis {
        TeamAnalysis {
            team_name: name.to_string(),
            aws_account_id: format!("acct-{name}"),
            team_email: format!("{name}@example.com"),
            current_month: "2024-03".to_string(),
            current_month_cost: current,
            previous_month: "2024-02".to_string(),
            previous_month_cost: previous,
            percentage_change: pct,
            is_anomaly: anomaly,
            service_breakdown: ServiceBreakdown::new(),
            previous_service_breakdown: ServiceBreakdown::new(),
            synthetic: false,
        }
    }

    #[test]
    fn summary_totals_and_rankings() {
        let teams = vec![
            team("a", 13000.0, 10000.0, 30.0, true),
            team("b", 2000.0, 1000.0, 100.0, true),
            team("c", 50000.0, 50000.0, 0.0, false),
        ];
        let org = summarize(&teams);
        assert_eq!(org.accounts, 3);
        assert_eq!(org.total_current, 65000.0);
        assert_eq!(org.total_previous, 61000.0);
        assert_eq!(org.percentage_change, 6.56);
        assert_eq!(org.anomalies_count, 2);

        let spenders: Vec<&str> = org.top_spenders.iter().map(|t| t.team_name.as_str()).collect();
        assert_eq!(spenders, vec!["c", "a", "b"]);
        let anomalies: Vec<&str> = org.top_anomalies.iter().map(|t| t.team_name.as_str()).collect();
        assert_eq!(anomalies, vec!["b", "a"]);
    }

    #[test]
    fn empty_org_has_zero_change() {
        let org = summarize(&[]);
        assert_eq!(org.accounts, 0);
        assert_eq!(org.percentage_change, 0.0);
        assert!(org.top_spenders.is_empty());
    }

    #[test]
    fn rankings_are_capped() {
        let teams: Vec<TeamAnalysis> = (0..15)
            .map(|i| team(&format!("t{i}"), i as f64 * 100.0, 100.0, 50.0 + i as f64, true))
            .collect();
        assert_eq!(top_spenders(&teams, TOP_SPENDERS).len(), 10);
        let top = top_anomalies(&teams, TOP_ANOMALIES);
        assert_eq!(top.len(), 5);
        assert_eq!(top[0].team_name, "t14");
    }
}
