// Prompt construction
// One fixed template for every upload, whatever the log looks like.

use std::fmt;

use crate::ingest::LogSample;

/// Sections the model is asked to produce, in order.
pub const REPORT_SECTIONS: [&str; 5] = [
    "Traffic Summary",
    "Domain Risk Scoring",
    "Behavioral Patterns",
    "Anomaly Hints",
    "Monitoring Recommendations",
];

const SECTION_GUIDANCE: [&str; 5] = [
    "overall request volume, top destinations, status code and method distribution, busiest clients and time ranges",
    "rate each notable domain LOW / MEDIUM / HIGH risk with a one-line reason (unusual TLDs, raw IPs, known ad/tracker or file-sharing hosts, repeated denials)",
    "recurring client behaviour such as periodic beaconing, bursts, off-hours activity, large transfers or user-agent oddities",
    "entries that look out of place and deserve a second look, quoting the relevant log lines",
    "concrete follow-up checks, alerting rules or blocklist candidates",
];

/// Fully rendered prompt for one analysis request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptText(String);

impl PromptText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for PromptText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn build_prompt(sample: &LogSample<'_>) -> PromptText {
    let sections = REPORT_SECTIONS
        .iter()
        .zip(SECTION_GUIDANCE.iter())
        .enumerate()
        .map(|(i, (title, guidance))| format!("{}. **{}**: {}", i + 1, title, guidance))
        .collect::<Vec<_>>()
        .join("\n");

    PromptText(format!(
        r#"You are a cybersecurity analyst reviewing network proxy logs.

Analyze the following proxy log excerpt and produce a report with these sections:

{sections}

## GUIDELINES
- Base every statement on the log lines provided; quote lines as evidence.
- Do NOT make definitive attribution claims (no naming of threat actors, malware families or individuals). Describe observations and likelihoods instead.
- If the excerpt is insufficient for a section, say so briefly.
- Use markdown headings for the sections and bullet points inside them.

At most the first {budget} characters of the file are included below.

## LOGS
```
{logs}
```"#,
        sections = sections,
        budget = sample.budget,
        logs = sample.text,
    ))
}
