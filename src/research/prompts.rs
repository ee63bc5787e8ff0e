//! Prompt templates for every synthesis call the pipeline makes.

use crate::types::EvidenceItem;

/// Snippets longer than this are shortened inside prompts.
const PROMPT_SNIPPET_CHARS: usize = 300;

/// Findings longer than this are shortened inside the summary prompt.
const SUMMARY_FINDINGS_CHARS: usize = 1500;

/// Ask the backend to decompose `query` into distinct research angles.
pub fn planning_prompt(query: &str, max_tasks: usize) -> String {
    let low = 3.min(max_tasks);
    format!(
        r#"Given this research query: "{query}"

Break it down into {low}-{max_tasks} specific research tasks that together answer the query comprehensively.
Each task must cover a distinct angle that does not overlap with the others, and must be phrased as a focused, searchable query.

Format your response as a simple list, one task per line:
Task 1: [specific search query]
Task 2: [specific search query]
Task 3: [specific search query]

Output only the list."#
    )
}

/// Ask for findings grounded in numbered evidence items.
pub fn evidence_prompt(query: &str, description: &str, evidence: &[EvidenceItem]) -> String {
    let mut sources = String::new();
    for (i, item) in evidence.iter().enumerate() {
        sources.push_str(&format!(
            "[{}] {}\nURL: {}\n{}\n\n",
            i + 1,
            item.title,
            item.url,
            shorten(&item.snippet, PROMPT_SNIPPET_CHARS)
        ));
    }

    format!(
        r#"You are writing one section of a research brief on: "{query}"

Research task: {description}

Sources:
{sources}Using only the sources above, write a concise findings paragraph (at most 200 words) for this task.
Cite sources inline by their number, e.g. [1] or [2][3]. Do not invent sources or URLs.
If the sources disagree or are thin, say so."#
    )
}

/// Ask for findings from prior knowledge only; the result carries no citations.
pub fn llm_only_prompt(query: &str, description: &str) -> String {
    format!(
        r#"You are writing one section of a research brief on: "{query}"

Research task: {description}

No external sources are available for this task. Answer from your prior knowledge only in a concise findings paragraph (at most 200 words).
Do not include citations, reference numbers or URLs.
Begin the paragraph with "Based on general knowledge," and note any uncertainty."#
    )
}

/// Ask for an executive summary over `(description, findings)` pairs.
pub fn summary_prompt(query: &str, findings: &[(&str, &str)]) -> String {
    let mut body = String::new();
    for (description, text) in findings {
        body.push_str(&format!(
            "\nTask: {}\n{}\n",
            description,
            shorten(text, SUMMARY_FINDINGS_CHARS)
        ));
    }

    format!(
        r#"Based on the following research findings for the query "{query}", write an executive summary.

Research Tasks and Findings:
{body}
Provide:
1. A clear summary of the key findings
2. Important insights or conclusions
3. Any limitations or areas needing further research

Keep it under 250 words and well structured."#
    )
}

/// Truncate on a char boundary, appending an ellipsis when shortened.
pub(crate) fn shorten(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}
