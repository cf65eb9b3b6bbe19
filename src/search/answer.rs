//! Extractive answer assembly
//!
//! A policy object, not a generator: it either extracts the opening of
//! the top-ranked chunk verbatim or abstains. It never fabricates,
//! rewrites, or emits an empty-string answer.

use serde::{Deserialize, Serialize};

use crate::search::engine::ContextChunk;

/// Default confidence floor for abstention.
pub const DEFAULT_ABSTAIN_THRESHOLD: f32 = 0.15;

/// How many ". "-separated segments the extractive answer keeps.
const ANSWER_SEGMENTS: usize = 2;

/// An extractive answer with its citation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    /// Source URL of the top-ranked chunk, or empty if unavailable.
    pub citation: String,
}

/// Decides between answering and abstaining.
#[derive(Debug, Clone, Copy)]
pub struct AnswerPolicy {
    abstain_threshold: f32,
}

impl Default for AnswerPolicy {
    fn default() -> Self {
        Self {
            abstain_threshold: DEFAULT_ABSTAIN_THRESHOLD,
        }
    }
}

impl AnswerPolicy {
    pub fn new(abstain_threshold: f32) -> Self {
        Self { abstain_threshold }
    }

    /// Assemble an answer from the ranked contexts, or abstain.
    ///
    /// Confidence is the top context's fused score when present, else its
    /// vector score. The threshold is inclusive: confidence exactly at
    /// the threshold still answers. A top context without text abstains
    /// regardless of confidence; an empty answer is never emitted.
    pub fn assemble(&self, ranked: &[ContextChunk]) -> Option<Answer> {
        let top = ranked.first()?;
        if top.text.trim().is_empty() {
            return None;
        }
        let confidence = top.confidence();
        if confidence < self.abstain_threshold {
            return None;
        }

        Some(Answer {
            text: leading_segments(&top.text, ANSWER_SEGMENTS),
            citation: top.url.clone(),
        })
    }
}

/// First `n` sentence-like segments of `text`, split on the literal
/// ". " separator and rejoined with it. A heuristic truncation, not true
/// sentence segmentation.
fn leading_segments(text: &str, n: usize) -> String {
    text.split(". ").take(n).collect::<Vec<_>>().join(". ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(text: &str, vector: Option<f32>, fused: Option<f32>) -> ContextChunk {
        ContextChunk {
            chunk_id: 1,
            text: text.to_string(),
            title: "Doc".to_string(),
            page: 1,
            url: "https://example.com/doc".to_string(),
            vector_score: vector,
            bm25_score: None,
            final_score: fused,
        }
    }

    #[test]
    fn test_answers_above_threshold() {
        let policy = AnswerPolicy::default();
        let ranked = vec![context(
            "First sentence. Second sentence. Third sentence.",
            Some(0.9),
            Some(0.8),
        )];

        let answer = policy.assemble(&ranked).unwrap();
        assert_eq!(answer.text, "First sentence. Second sentence");
        assert_eq!(answer.citation, "https://example.com/doc");
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let policy = AnswerPolicy::new(0.15);
        let ranked = vec![context("Some text here.", None, Some(0.15))];
        assert!(policy.assemble(&ranked).is_some());
    }

    #[test]
    fn test_abstains_strictly_below_threshold() {
        let policy = AnswerPolicy::new(0.15);
        let ranked = vec![context("Some text here.", None, Some(0.1499))];
        assert!(policy.assemble(&ranked).is_none());
    }

    #[test]
    fn test_abstains_on_empty_ranking() {
        let policy = AnswerPolicy::default();
        assert!(policy.assemble(&[]).is_none());
    }

    #[test]
    fn test_abstains_on_textless_top_context() {
        // A confident but textless context must not produce an
        // empty-string answer.
        let policy = AnswerPolicy::new(0.0);
        let empty = vec![context("", Some(0.99), Some(0.99))];
        let blank = vec![context("   \n", Some(0.99), Some(0.99))];
        assert!(policy.assemble(&empty).is_none());
        assert!(policy.assemble(&blank).is_none());
    }

    #[test]
    fn test_falls_back_to_vector_score() {
        // Baseline mode: no fused score, vector similarity decides.
        let policy = AnswerPolicy::new(0.5);
        let confident = vec![context("Answer text.", Some(0.6), None)];
        let unsure = vec![context("Answer text.", Some(0.4), None)];

        assert!(policy.assemble(&confident).is_some());
        assert!(policy.assemble(&unsure).is_none());
    }

    #[test]
    fn test_short_text_kept_whole() {
        let policy = AnswerPolicy::new(0.0);
        let ranked = vec![context("Just one segment without separator", Some(1.0), None)];
        let answer = policy.assemble(&ranked).unwrap();
        assert_eq!(answer.text, "Just one segment without separator");
    }

    #[test]
    fn test_missing_url_yields_empty_citation() {
        let policy = AnswerPolicy::new(0.0);
        let mut ctx = context("Text. More text.", Some(1.0), None);
        ctx.url = String::new();
        let answer = policy.assemble(&[ctx]).unwrap();
        assert_eq!(answer.citation, "");
    }

    #[test]
    fn test_leading_segments() {
        assert_eq!(leading_segments("a. b. c. d", 2), "a. b");
        assert_eq!(leading_segments("a", 2), "a");
        assert_eq!(leading_segments("", 2), "");
    }
}
