//! Structured outcome of one agent run.
//!
//! The agent is instructed to finish with a JSON object; models routinely
//! wrap it in prose or fences, so [`extract_outcome`] scans the text for the
//! first balanced object that carries a `decision` field and ignores the
//! rest.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How the workflow should proceed after the agent run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Proceed,
    NeedsInfo,
    Stop,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Outcome {
    pub decision: Option<Decision>,
    #[serde(default)]
    pub needs_info_comment: String,
    #[serde(default)]
    pub commit_message: String,
    #[serde(default)]
    pub pr_title: String,
    #[serde(default)]
    pub pr_body: String,
    /// Relative path → complete new file content. Preferred over `patch`.
    #[serde(default)]
    pub files: BTreeMap<String, String>,
    /// Unified diff fallback, applied only when `files` is empty.
    #[serde(default)]
    pub patch: String,
    #[serde(default)]
    pub summary: String,
}

impl Outcome {
    pub fn decision(&self) -> Decision {
        self.decision.unwrap_or(Decision::Proceed)
    }
}

/// Find the end (exclusive) of the balanced JSON object starting at `start`,
/// honoring string literals and escapes. Returns None when unbalanced.
fn balanced_object_end(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Extract the agent outcome from free-form model output.
///
/// Candidate objects without a `decision` field are skipped so that JSON
/// fragments in surrounding prose don't shadow the real answer.
pub fn extract_outcome(text: &str) -> Result<Outcome> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::Agent("LLM output is empty".into()));
    }

    let mut last_err: Option<Error> = None;
    let mut search_from = 0usize;
    while let Some(rel) = trimmed[search_from..].find('{') {
        let start = search_from + rel;
        let Some(end) = balanced_object_end(trimmed, start) else {
            break;
        };
        let candidate = &trimmed[start..end];
        match serde_json::from_str::<Outcome>(candidate) {
            Ok(outcome) if outcome.decision.is_some() => return Ok(outcome),
            Ok(_) => last_err = Some(Error::Agent("missing decision".into())),
            Err(e) => last_err = Some(Error::Json(e)),
        }
        // Skip past this candidate and keep scanning.
        search_from = start + 1;
    }

    Err(last_err.unwrap_or_else(|| Error::Agent("LLM output missing JSON object".into())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_object() {
        let outcome = extract_outcome(r#"{"decision": "proceed", "summary": "done"}"#).unwrap();
        assert_eq!(outcome.decision(), Decision::Proceed);
        assert_eq!(outcome.summary, "done");
    }

    #[test]
    fn tolerates_leading_and_trailing_prose() {
        let text = "Here is my result:\n{\"decision\": \"needs_info\", \"needs_info_comment\": \"Which file?\"}\nThanks!";
        let outcome = extract_outcome(text).unwrap();
        assert_eq!(outcome.decision(), Decision::NeedsInfo);
        assert_eq!(outcome.needs_info_comment, "Which file?");
    }

    #[test]
    fn skips_decisionless_candidates() {
        let text = r#"{"note": "not it"} and then {"decision": "stop", "summary": "s"}"#;
        let outcome = extract_outcome(text).unwrap();
        assert_eq!(outcome.decision(), Decision::Stop);
    }

    #[test]
    fn prose_noise_does_not_change_result() {
        let object = r##"{"decision": "proceed", "files": {"README.md": "# new"}}"##;
        let plain = extract_outcome(object).unwrap();
        let noisy =
            extract_outcome(&format!("I'll proceed now. {object} Let me know if more.")).unwrap();
        assert_eq!(plain.files, noisy.files);
        assert_eq!(plain.decision(), noisy.decision());
    }

    #[test]
    fn braces_inside_strings_do_not_break_scanning() {
        let text = r#"{"decision": "proceed", "summary": "kept the {braces} literal \" quote"}"#;
        let outcome = extract_outcome(text).unwrap();
        assert!(outcome.summary.contains("{braces}"));
    }

    #[test]
    fn missing_decision_is_an_error() {
        let err = extract_outcome(r#"{"summary": "no decision here"}"#).unwrap_err();
        assert!(err.to_string().contains("missing decision"));
    }

    #[test]
    fn empty_output_is_an_error() {
        assert!(extract_outcome("   ").is_err());
    }
}
