//! Rule-based report sectioning.
//!
//! Routes sentences into report sections by keyword matching. This is a
//! replaceable rule set, not part of the alignment core.

use serde::Serialize;
use std::fmt::Write as FmtWrite;

const SUMMARY_KEYWORDS: &[&str] = &["in summary", "to conclude", "overall"];
const ACTION_KEYWORDS: &[&str] = &["we should", "need to", "must", "action required", "to do"];
const DECISION_KEYWORDS: &[&str] = &["decided to", "decision is", "agreed on", "the plan is"];

/// Sentences routed into report sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportSections {
    pub summary: Vec<String>,
    pub action_items: Vec<String>,
    pub key_decisions: Vec<String>,
}

fn matches_any(sentence: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| sentence.contains(k))
}

/// Classify sentences into sections.
///
/// Sentences matching no action or decision keyword land in the summary
/// bucket by default.
pub fn classify_sentences(text: &str) -> ReportSections {
    let mut sections = ReportSections::default();

    for sentence in text.split(". ") {
        let sentence = sentence.trim().trim_end_matches('.');
        if sentence.is_empty() {
            continue;
        }

        let lowered = sentence.to_lowercase();
        let bucket = if matches_any(&lowered, SUMMARY_KEYWORDS) {
            &mut sections.summary
        } else if matches_any(&lowered, ACTION_KEYWORDS) {
            &mut sections.action_items
        } else if matches_any(&lowered, DECISION_KEYWORDS) {
            &mut sections.key_decisions
        } else {
            &mut sections.summary
        };

        bucket.push(sentence.to_string());
    }

    sections
}

fn render_section(output: &mut String, heading: &str, sentences: &[String]) {
    if sentences.is_empty() {
        return;
    }

    let _ = writeln!(output, "--- {} ---", heading);
    for sentence in sentences {
        let _ = writeln!(output, "- {}", sentence);
    }
    let _ = writeln!(output);
}

/// Render a plain-text report from classified sections.
pub fn render_report(sections: &ReportSections) -> String {
    let mut output = String::new();

    render_section(&mut output, "Summary", &sections.summary);
    render_section(&mut output, "Action Items", &sections.action_items);
    render_section(&mut output, "Key Decisions", &sections.key_decisions);

    output
}
