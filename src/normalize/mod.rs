//! Secondary text-normalization pass.
//!
//! Normalization failures are non-fatal: the pipeline records a placeholder
//! and continues, so the outcome is an explicit [`Normalized`] value rather
//! than an error that aborts the request.

/// Outcome of the normalization pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    /// Cleaned text, ready for classification
    Clean(String),
    /// Normalization failed; `placeholder` stands in for the cleaned text
    Degraded { placeholder: String, cause: String },
}

impl Normalized {
    /// The text to carry forward, cleaned or placeholder.
    pub fn into_text(self) -> String {
        match self {
            Normalized::Clean(text) => text,
            Normalized::Degraded { placeholder, .. } => placeholder,
        }
    }
}

/// Black-box text-normalization collaborator.
pub trait TextNormalizer {
    fn normalize(&self, text: &str) -> Normalized;
}

/// Rule-based normalizer: collapses whitespace and strips filler tokens.
#[derive(Debug, Clone)]
pub struct RuleNormalizer {
    fillers: Vec<&'static str>,
}

impl Default for RuleNormalizer {
    fn default() -> Self {
        Self {
            fillers: vec!["um", "uh", "erm", "hmm", "mhm"],
        }
    }
}

impl RuleNormalizer {
    fn is_filler(&self, word: &str) -> bool {
        let bare = word
            .trim_matches(|c: char| c.is_ascii_punctuation())
            .to_lowercase();
        self.fillers.iter().any(|f| *f == bare)
    }
}

impl TextNormalizer for RuleNormalizer {
    fn normalize(&self, text: &str) -> Normalized {
        let cleaned: Vec<&str> = text
            .split_whitespace()
            .filter(|word| !self.is_filler(word))
            .collect();

        Normalized::Clean(cleaned.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_whitespace() {
        let normalizer = RuleNormalizer::default();

        assert_eq!(
            normalizer.normalize("hello   world\n\ttoday"),
            Normalized::Clean("hello world today".to_string())
        );
    }

    #[test]
    fn test_strips_fillers() {
        let normalizer = RuleNormalizer::default();

        assert_eq!(
            normalizer.normalize("so, um, we should, uh, ship it. Hmm, right."),
            Normalized::Clean("so, we should, ship it. right.".to_string())
        );
    }

    #[test]
    fn test_degraded_into_text_uses_placeholder() {
        let degraded = Normalized::Degraded {
            placeholder: "[normalization unavailable]".to_string(),
            cause: "model missing".to_string(),
        };

        assert_eq!(degraded.into_text(), "[normalization unavailable]");
    }
}
