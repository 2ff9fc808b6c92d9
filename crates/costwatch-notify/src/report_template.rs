use chrono::{DateTime, Utc};
use costwatch_common::types::{format_money, OrgSummary, TeamAnalysis};

const RED: &str = "#ffcccc";
const GREEN: &str = "#ccffcc";
const WHITE: &str = "#ffffff";

/// Inputs for the weekly admin report.
pub struct AdminReportParams<'a> {
    pub org: &'a OrgSummary,
    /// Markdown. `None` renders a placeholder.
    pub executive_summary: Option<&'a str>,
    /// Markdown. `None` omits the section.
    pub recommendations: Option<&'a str>,
    pub generated_at: DateTime<Utc>,
}

/// HTML e-mail renderer for team and admin reports.
pub struct ReportRenderer;

impl ReportRenderer {
    pub fn markdown_to_html(markdown: &str) -> String {
        use pulldown_cmark::{html, Event, Options, Parser};

        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);

        // Single newlines in model output are meant as line breaks.
        let markdown = markdown.replace('\n', "  \n");
        // Raw HTML in model output or service names is shown as text.
        let parser = Parser::new_ext(&markdown, options).map(|event| match event {
            Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
            other => other,
        });
        let mut html_output = String::new();
        html::push_html(&mut html_output, parser);
        html_output
    }

    pub fn team_subject(team_name: &str) -> String {
        format!("🚨 AWS Cost Anomaly Detected - {team_name}")
    }

    pub fn admin_subject(generated_at: DateTime<Utc>) -> String {
        format!("AWS Cost Weekly Report - {}", generated_at.format("%Y-%m-%d"))
    }

    pub fn render_team_report(
        analysis: &TeamAnalysis,
        explanation: &str,
        generated_at: DateTime<Utc>,
    ) -> String {
        let template = include_str!("templates/team_report.html");

        let mut services: Vec<(&String, &f64)> = analysis.service_breakdown.iter().collect();
        services.sort_by(|a, b| b.1.total_cmp(a.1));
        let breakdown_rows: String = services
            .into_iter()
            .map(|(service, cost)| {
                format!(
                    "    <tr><td>{}</td><td>${}</td></tr>\n",
                    escape_html(service),
                    format_money(*cost)
                )
            })
            .collect();

        let change_color = if analysis.percentage_change > 0.0 {
            RED
        } else {
            GREEN
        };
        let synthetic_notice = if analysis.synthetic {
            "<p style=\"color: #b26a00;\"><em>Cost figures are synthetic demo data; the metrics source was unavailable.</em></p>\n"
        } else {
            ""
        };

        let current_cost = format_money(analysis.current_month_cost);
        let previous_cost = format_money(analysis.previous_month_cost);
        let change = format!("{:+.1}", analysis.percentage_change);
        let analysis_html = Self::markdown_to_html(explanation);
        let footer = footer(generated_at);
        fill_template(
            template,
            &[
                ("team_name", escape_html(&analysis.team_name).as_str()),
                ("account_id", escape_html(&analysis.aws_account_id).as_str()),
                ("synthetic_notice", synthetic_notice),
                ("current_month", escape_html(&analysis.current_month).as_str()),
                ("current_cost", current_cost.as_str()),
                ("previous_month", escape_html(&analysis.previous_month).as_str()),
                ("previous_cost", previous_cost.as_str()),
                ("change_color", change_color),
                ("change", change.as_str()),
                ("breakdown_rows", breakdown_rows.as_str()),
                ("analysis_html", analysis_html.as_str()),
                ("footer", footer.as_str()),
            ],
        )
    }

    pub fn render_admin_report(params: &AdminReportParams<'_>) -> String {
        let template = include_str!("templates/admin_report.html");
        let org = params.org;

        let summary_html = match params.executive_summary {
            Some(text) if !text.trim().is_empty() => Self::markdown_to_html(text),
            _ => "<p>AI analysis not available</p>\n".to_string(),
        };

        let top_team_rows: String = org
            .top_spenders
            .iter()
            .map(|team| {
                let color = if team.percentage_change > 20.0 {
                    RED
                } else if team.percentage_change < -10.0 {
                    GREEN
                } else {
                    WHITE
                };
                format!(
                    "    <tr style=\"background-color: {color}\">\n        <td>{}</td>\n        <td>${}</td>\n        <td>${}</td>\n        <td>{:+.1}%</td>\n    </tr>\n",
                    escape_html(&team.team_name),
                    format_money(team.current_month_cost),
                    format_money(team.previous_month_cost),
                    team.percentage_change,
                )
            })
            .collect();

        let anomalies_section = if org.top_anomalies.is_empty() {
            String::new()
        } else {
            let rows: String = org
                .top_anomalies
                .iter()
                .map(|team| {
                    format!(
                        "    <tr style=\"background-color: {RED};\">\n        <td>{}</td>\n        <td>${}</td>\n        <td style=\"font-weight: bold;\">{:+.1}%</td>\n    </tr>\n",
                        escape_html(&team.team_name),
                        format_money(team.current_month_cost),
                        team.percentage_change,
                    )
                })
                .collect();
            format!(
                "\n<h3>⚠️ Cost Anomalies ({} detected)</h3>\n<table border=\"1\" cellpadding=\"5\" cellspacing=\"0\" style=\"width: 100%;\">\n    <tr>\n        <th>Team</th>\n        <th>Current Cost</th>\n        <th>Change %</th>\n    </tr>\n{rows}</table>\n",
                org.anomalies_count
            )
        };

        let recommendations_section = match params.recommendations {
            Some(text) if !text.trim().is_empty() => format!(
                "\n<h3>💡 Recommendations</h3>\n<div style=\"background-color: #f0f0f0; padding: 10px; border-radius: 5px;\">\n{}</div>\n",
                Self::markdown_to_html(text)
            ),
            _ => String::new(),
        };

        let change_color = if org.percentage_change > 0.0 {
            RED
        } else {
            GREEN
        };

        let report_date = params.generated_at.format("%Y-%m-%d").to_string();
        let accounts = org.accounts.to_string();
        let total_current = format_money(org.total_current);
        let total_previous = format_money(org.total_previous);
        let change = format!("{:+.1}", org.percentage_change);
        let anomalies_count = org.anomalies_count.to_string();
        let footer = footer(params.generated_at);
        fill_template(
            template,
            &[
                ("report_date", report_date.as_str()),
                ("summary_html", summary_html.as_str()),
                ("accounts", accounts.as_str()),
                ("total_current", total_current.as_str()),
                ("total_previous", total_previous.as_str()),
                ("change_color", change_color),
                ("change", change.as_str()),
                ("anomalies_count", anomalies_count.as_str()),
                ("top_team_rows", top_team_rows.as_str()),
                ("anomalies_section", anomalies_section.as_str()),
                ("recommendations_section", recommendations_section.as_str()),
                ("footer", footer.as_str()),
            ],
        )
    }
}

/// Substitutes `{{name}}` placeholders in one pass over `template`.
///
/// Inserted values are never scanned again, so a value that itself contains
/// `{{...}}` is emitted verbatim. Unknown placeholders are kept as-is.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len() * 2);
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = &after[..end];
        match values.iter().find(|(key, _)| *key == name) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

fn footer(generated_at: DateTime<Utc>) -> String {
    format!(
        "Generated by costwatch v{} on {}",
        env!("CARGO_PKG_VERSION"),
        generated_at.format("%Y-%m-%d %H:%M UTC")
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
