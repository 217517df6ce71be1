//! Prompt construction for disclosure drafting and chart commentary.

use std::fmt::Write as _;

use crate::catalog::Disclosure;
use crate::charts::GraphicsRecommendations;
use crate::metrics::{Metric, value_has_content};
use crate::summarizer;
use crate::synthesis::{CompanyProfile, DisclosureRequest};

const ROLE: &str = "You are a sustainability reporting specialist drafting disclosures for a small or medium-sized enterprise under the Voluntary SME Standard (VSME) Basic Module.";

const WRITING_RULES: &[&str] = &[
    "Write in the third person about the undertaking, in formal report prose without headings or bullet points.",
    "Use only the data provided above. Do not invent figures, names or commitments.",
    "Quote figures with their units exactly as reported.",
    "Where a required data point has no response, state briefly that it is not reported.",
    "Keep the response concise: two to four paragraphs.",
];

fn push_profile(out: &mut String, profile: &CompanyProfile) {
    out.push_str("\nCompany profile:\n");
    let fields = [
        ("Name", Some(profile.name.as_str())),
        ("Legal form", profile.legal_form.as_deref()),
        ("Sector", profile.sector.as_deref()),
        ("Country", profile.country.as_deref()),
        ("Employees", profile.employees.as_deref()),
        ("Turnover", profile.turnover.as_deref()),
        ("Reporting period", profile.reporting_period.as_deref()),
    ];
    for (label, value) in fields {
        if let Some(v) = value.map(str::trim).filter(|v| !v.is_empty()) {
            let _ = writeln!(out, "- {}: {}", label, v);
        }
    }
    if !profile.sites.is_empty() {
        let _ = writeln!(out, "- Sites: {}", profile.sites.join("; "));
    }
}

fn push_metric(out: &mut String, metric: &Metric) {
    let _ = writeln!(out, "\n### {} ({})", metric.display_label(), metric.reference);
    if let Some(text) = metric.response_text() {
        match metric.unit.as_deref() {
            Some(unit) if !text.ends_with(unit) => {
                let _ = writeln!(out, "Response: {} {}", text, unit);
            }
            _ => {
                let _ = writeln!(out, "Response: {}", text);
            }
        }
    }
    if let Some(data) = metric.response_data.as_ref().filter(|v| value_has_content(v)) {
        let raw = serde_json::to_string(data).unwrap_or_default();
        let _ = writeln!(out, "Data: {}", raw);
        let _ = writeln!(
            out,
            "Summary: {}",
            summarizer::summarize_as(data, metric.data_kind)
        );
    }
}

/// Full drafting prompt for one disclosure.
///
/// `metrics` must already be filtered to the disclosure and to metrics with data.
pub fn build_disclosure_prompt(
    request: &DisclosureRequest,
    disclosure: Option<&Disclosure>,
    metrics: &[&Metric],
) -> String {
    let id = request.disclosure_id.trim().to_ascii_uppercase();
    let title = non_empty(&request.disclosure_title)
        .or(disclosure.map(|d| d.title))
        .unwrap_or(id.as_str());
    let description = non_empty(&request.disclosure_description).or(disclosure.map(|d| d.description));

    let mut out = String::with_capacity(2048);
    out.push_str(ROLE);
    out.push_str("\n\n");
    let _ = writeln!(out, "## Disclosure {}: {}", id, title);
    if let Some(description) = description {
        let _ = writeln!(out, "{}", description);
    }

    if disclosure.is_some_and(|d| d.uses_company_profile)
        && let Some(profile) = request.company_profile.as_ref()
    {
        push_profile(&mut out, profile);
    }

    if metrics.is_empty() {
        out.push_str("\nNo metric responses have been recorded for this disclosure.\n");
    } else {
        out.push_str("\n## Reported data\n");
        for metric in metrics {
            push_metric(&mut out, metric);
        }
    }

    if let Some(d) = disclosure
        && !d.guidance.is_empty()
    {
        let _ = writeln!(out, "\n## Guidance for {}", d.id);
        for line in d.guidance {
            let _ = writeln!(out, "- {}", line);
        }
    }

    out.push_str("\n## Writing rules\n");
    for rule in WRITING_RULES {
        let _ = writeln!(out, "- {}", rule);
    }
    out.push_str("\nReturn only the disclosure text.");
    out
}

/// Short commentary prompt over the chart insights of a disclosure.
pub fn build_chart_analysis_prompt(
    disclosure_id: &str,
    disclosure_title: &str,
    recommendations: &GraphicsRecommendations,
) -> String {
    let mut out = String::new();
    out.push_str(ROLE);
    let _ = writeln!(
        out,
        "\n\nThe following charts were prepared for disclosure {}{}.",
        disclosure_id.trim().to_ascii_uppercase(),
        non_empty(disclosure_title)
            .map(|t| format!(" ({})", t))
            .unwrap_or_default()
    );
    for chart in recommendations.charts() {
        let _ = writeln!(out, "\n### {} [{:?}]", chart.title, chart.chart_type);
        let _ = writeln!(out, "{}", chart.description);
        let data = serde_json::to_string(&chart.data).unwrap_or_default();
        let _ = writeln!(out, "Data: {}", data);
        for insight in &chart.insights {
            let _ = writeln!(out, "- {}", insight);
        }
    }
    out.push_str(
        "\nWrite one short paragraph (at most four sentences) interpreting these charts for a sustainability report reader. Use only the figures shown. Return only the paragraph.",
    );
    out
}

fn non_empty(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}
