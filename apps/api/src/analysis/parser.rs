//! Output Parser — pulls the match score and missing-skills list out of a model reply.
//!
//! The reply format is a request, not a guarantee. Every function here is total:
//! anything that does not match yields an absent score or an empty list.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::analysis::models::ParsedResult;
use crate::analysis::prompts::{
    IMPROVEMENT_SUGGESTIONS_LABEL, MATCH_SCORE_LABEL, MISSING_SKILLS_LABEL, STRONG_MATCHES_LABEL,
};

// ASCII digits only: a Unicode `\d` run like "٨٧" would match but not parse as `u32`.
static SCORE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"{}\s*([0-9]+)", regex::escape(MATCH_SCORE_LABEL)))
        .expect("score pattern is valid")
});

// Lazy `.*?` so the nearest terminator ends the section.
static MISSING_SKILLS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?s){}(.*?)({}|{})",
        regex::escape(MISSING_SKILLS_LABEL),
        regex::escape(STRONG_MATCHES_LABEL),
        regex::escape(IMPROVEMENT_SUGGESTIONS_LABEL),
    ))
    .expect("missing-skills pattern is valid")
});

/// Every line boundary a model reply may use, not just `\n` and `\r\n`.
const LINE_BREAKS: &[char] = &[
    '\n', '\r', '\u{0b}', '\u{0c}', '\u{1c}', '\u{1d}', '\u{1e}', '\u{85}', '\u{2028}',
    '\u{2029}',
];

/// Parses the complete response text. Call once, after streaming has finished.
pub fn parse_llm_output(text: &str) -> ParsedResult {
    ParsedResult {
        score: extract_score(text),
        missing_skills: extract_missing_skills(text),
    }
}

/// First `MATCH_SCORE:` followed by ASCII digits. No range check; a digit run that does
/// not fit in `u32` counts as absent.
pub fn extract_score(text: &str) -> Option<u32> {
    SCORE_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|digits| digits.as_str().parse::<u32>().ok())
}

/// Hyphen-prefixed lines between `MISSING_SKILLS:` and the next `STRONG_MATCHES:` or
/// `IMPROVEMENT_SUGGESTIONS:`, with every hyphen removed.
pub fn extract_missing_skills(text: &str) -> Vec<String> {
    let Some(section) = MISSING_SKILLS_RE.captures(text).and_then(|caps| caps.get(1)) else {
        return Vec::new();
    };

    section
        .as_str()
        .split(LINE_BREAKS)
        .filter(|line| line.trim().starts_with('-'))
        .map(|line| line.replace('-', "").trim().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_REPLY: &str = "MATCH_SCORE: 78

MISSING_SKILLS:
- Kubernetes
- Terraform
- CI/CD pipelines

STRONG_MATCHES:
- Rust
- PostgreSQL

IMPROVEMENT_SUGGESTIONS:
- Quantify the latency work
- Mention on-call experience

INTERVIEW_ROUNDS:
- Round 1: Recruiter screen
- Round 2: Technical interview
- Round 3: System design
Total Rounds: 3
";

    #[test]
    fn test_full_reply() {
        let parsed = parse_llm_output(FULL_REPLY);
        assert_eq!(parsed.score, Some(78));
        assert_eq!(
            parsed.missing_skills,
            vec!["Kubernetes", "Terraform", "CI/CD pipelines"]
        );
    }

    #[test]
    fn test_score_87_anywhere_in_text() {
        let text = "Here is my assessment.\nMATCH_SCORE: 87\nmore text";
        assert_eq!(extract_score(text), Some(87));
    }

    #[test]
    fn test_no_score_label_is_absent() {
        assert_eq!(extract_score("The candidate is a good fit, around 80."), None);
    }

    #[test]
    fn test_label_without_digits_is_absent() {
        assert_eq!(extract_score("MATCH_SCORE: N/A"), None);
    }

    #[test]
    fn test_score_without_space_and_first_occurrence_wins() {
        assert_eq!(extract_score("MATCH_SCORE:91\nMATCH_SCORE: 12"), Some(91));
    }

    #[test]
    fn test_out_of_range_score_is_returned_verbatim() {
        assert_eq!(extract_score("MATCH_SCORE: 150"), Some(150));
    }

    #[test]
    fn test_overflowing_score_is_absent() {
        assert_eq!(extract_score("MATCH_SCORE: 99999999999999999999"), None);
    }

    #[test]
    fn test_non_ascii_digits_are_not_a_score() {
        assert_eq!(extract_score("MATCH_SCORE: \u{668}\u{667}"), None);
        assert_eq!(extract_score("MATCH_SCORE: \u{668}\u{667}\nMATCH_SCORE: 87"), Some(87));
    }

    #[test]
    fn test_score_trailing_text_is_ignored() {
        assert_eq!(extract_score("MATCH_SCORE: 65/100"), Some(65));
    }

    #[test]
    fn test_missing_skills_python_docker() {
        let text = "MISSING_SKILLS:\n- Python\n- Docker\nSTRONG_MATCHES:\n- Go\n";
        assert_eq!(extract_missing_skills(text), vec!["Python", "Docker"]);
    }

    #[test]
    fn test_missing_skills_without_hyphen_lines_is_empty() {
        let text = "MISSING_SKILLS:\nNone, the resume covers everything.\nSTRONG_MATCHES:\n- Go\n";
        assert!(extract_missing_skills(text).is_empty());
    }

    #[test]
    fn test_missing_skills_label_absent_is_empty() {
        assert!(extract_missing_skills("STRONG_MATCHES:\n- Go\n").is_empty());
    }

    #[test]
    fn test_missing_skills_without_terminator_is_empty() {
        let text = "MATCH_SCORE: 40\n\nMISSING_SKILLS:\n- Kafka\n- Flink\n";
        assert!(extract_missing_skills(text).is_empty());
    }

    #[test]
    fn test_improvement_suggestions_terminates_when_strong_matches_missing() {
        let text = "MISSING_SKILLS:\n- GraphQL\nIMPROVEMENT_SUGGESTIONS:\n- Add metrics\n";
        assert_eq!(extract_missing_skills(text), vec!["GraphQL"]);
    }

    #[test]
    fn test_nearest_terminator_wins() {
        let text = "MISSING_SKILLS:\n- AWS\nIMPROVEMENT_SUGGESTIONS:\n- Reword summary\nSTRONG_MATCHES:\n- Rust\n";
        assert_eq!(extract_missing_skills(text), vec!["AWS"]);
    }

    #[test]
    fn test_every_hyphen_is_removed() {
        let text = "MISSING_SKILLS:\n  - Event-driven design\n-- gRPC\nSTRONG_MATCHES:\n";
        assert_eq!(
            extract_missing_skills(text),
            vec!["Eventdriven design", "gRPC"]
        );
    }

    #[test]
    fn test_non_bullet_lines_inside_section_are_skipped() {
        let text = "MISSING_SKILLS:\nThe following are missing:\n- Scala\n* Spark\n- Airflow\n\nSTRONG_MATCHES:\n";
        assert_eq!(extract_missing_skills(text), vec!["Scala", "Airflow"]);
    }

    #[test]
    fn test_bare_carriage_return_separates_bullets() {
        let text = "MISSING_SKILLS:\r- Go\r- Rust\rSTRONG_MATCHES:\r";
        assert_eq!(extract_missing_skills(text), vec!["Go", "Rust"]);
    }

    #[test]
    fn test_unicode_line_separators_split_bullets() {
        let text = "MISSING_SKILLS:\u{2028}- Go\u{2029}- Rust\u{85}- Helm\r\n- Nix\nSTRONG_MATCHES:";
        assert_eq!(extract_missing_skills(text), vec!["Go", "Rust", "Helm", "Nix"]);
    }

    #[test]
    fn test_bare_hyphen_yields_empty_entry() {
        let text = "MISSING_SKILLS:\n-\n- Java\nSTRONG_MATCHES:\n";
        assert_eq!(extract_missing_skills(text), vec!["", "Java"]);
    }

    #[test]
    fn test_scenario_72_kubernetes() {
        let parsed =
            parse_llm_output("MATCH_SCORE: 72\n\nMISSING_SKILLS:\n- Kubernetes\n\nSTRONG_MATCHES:\n- Python\n");
        assert_eq!(
            parsed,
            ParsedResult {
                score: Some(72),
                missing_skills: vec!["Kubernetes".to_string()],
            }
        );
    }

    #[test]
    fn test_empty_and_garbage_input_never_fail() {
        assert_eq!(parse_llm_output(""), ParsedResult::default());
        assert_eq!(
            parse_llm_output("MISSING_SKILLS: MATCH_SCORE: \u{0} ---"),
            ParsedResult::default()
        );
    }

    #[test]
    fn test_truncated_reply_keeps_what_is_present() {
        let parsed = parse_llm_output("MATCH_SCORE: 55\n\nMISSING_SKILLS:\n- Ter");
        assert_eq!(parsed.score, Some(55));
        assert!(parsed.missing_skills.is_empty());
    }
}
