// Prompt template for resume analysis.
// The labels in OUTPUT FORMAT are what analysis::parser matches on; keep them in sync.

pub const MATCH_SCORE_LABEL: &str = "MATCH_SCORE:";
pub const MISSING_SKILLS_LABEL: &str = "MISSING_SKILLS:";
pub const STRONG_MATCHES_LABEL: &str = "STRONG_MATCHES:";
pub const IMPROVEMENT_SUGGESTIONS_LABEL: &str = "IMPROVEMENT_SUGGESTIONS:";

/// Builds the single user message sent to the model.
///
/// Literal substitution in one pass: inputs are not escaped and placeholder-like text
/// inside them is left alone.
pub fn build_prompt(resume_text: &str, job_description: &str) -> String {
    format!(
        r#"
You are an experienced technical recruiter.

Analyze the resume against the job description and hiring process.

RESUME:
{resume_text}

JOB DESCRIPTION:
{job_description}

INSTRUCTIONS (FOLLOW STRICTLY):
1. Give a MATCH SCORE from 0 to 100 (integer only).
2. List MISSING SKILLS as bullet points.
3. List STRONG MATCHES.
4. Suggest 3–5 RESUME IMPROVEMENTS.
5. Based on the role and company mentioned in the job description,
   ESTIMATE the typical INTERVIEW ROUNDS.

OUTPUT FORMAT (STRICT):
MATCH_SCORE: <number>

MISSING_SKILLS:
- skill 1
- skill 2

STRONG_MATCHES:
- skill 1
- skill 2

IMPROVEMENT_SUGGESTIONS:
- suggestion 1
- suggestion 2

INTERVIEW_ROUNDS:
- Round 1: <name>
- Round 2: <name>
- Round 3: <name>
Total Rounds: <number>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_is_deterministic() {
        let a = build_prompt("Rust, Go", "Backend engineer");
        let b = build_prompt("Rust, Go", "Backend engineer");
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_prompt_places_inputs_under_headers() {
        let prompt = build_prompt("Jane Doe\nRust", "Platform role");
        assert!(prompt.starts_with("\nYou are an experienced technical recruiter.\n"));
        assert!(prompt.contains("RESUME:\nJane Doe\nRust\n\nJOB DESCRIPTION:\nPlatform role\n\n"));
        assert!(prompt.ends_with("Total Rounds: <number>\n"));
    }

    #[test]
    fn test_prompt_lists_every_output_label_in_order() {
        let prompt = build_prompt("r", "j");
        let format = &prompt[prompt.find("OUTPUT FORMAT (STRICT):").unwrap()..];
        let positions: Vec<usize> = [
            MATCH_SCORE_LABEL,
            MISSING_SKILLS_LABEL,
            STRONG_MATCHES_LABEL,
            IMPROVEMENT_SUGGESTIONS_LABEL,
            "INTERVIEW_ROUNDS:",
        ]
        .iter()
        .map(|label| format.find(label).unwrap())
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_placeholder_text_in_inputs_is_not_substituted() {
        let prompt = build_prompt("{job_description}", "{resume_text} & <b>");
        assert!(prompt.contains("RESUME:\n{job_description}\n"));
        assert!(prompt.contains("JOB DESCRIPTION:\n{resume_text} & <b>\n"));
    }
}
