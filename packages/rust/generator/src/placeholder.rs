//! Deterministic stand-in generator.
//!
//! Produces structurally valid output derived from the lesson's topic title
//! without any network calls. Used for dry runs without an API key and for
//! exercising the write path end to end.

use async_trait::async_trait;
use prepnest_shared::{
    CurriculumAlignment, Difficulty, IpRiskLevel, KeyTerm, LessonDocument, LessonRewrite, Result,
    WorkedExample, text_block,
};
use tracing::debug;

use crate::ContentGenerator;

/// Model identifier recorded for placeholder output.
pub const PLACEHOLDER_MODEL: &str = "placeholder";

#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderGenerator;

impl PlaceholderGenerator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ContentGenerator for PlaceholderGenerator {
    async fn align_document(&self, lesson: &LessonDocument) -> Result<CurriculumAlignment> {
        let topic = lesson.topic_title();
        debug!(lesson = %lesson.id, "placeholder alignment");

        Ok(CurriculumAlignment {
            curriculum_objectives: vec![
                format!("Understand key concepts in {topic}"),
                "Apply knowledge to solve problems".into(),
            ],
            curriculum_competencies: vec![
                "Knowledge recall".into(),
                "Comprehension".into(),
                "Application".into(),
            ],
            curriculum_currency_rules:
                "Use Ghana Cedis (GHS) for monetary examples. Use SI units for measurements."
                    .into(),
            canonical_terms: Vec::new(),
        })
    }

    async fn rewrite_document(&self, lesson: &LessonDocument) -> Result<LessonRewrite> {
        let topic = lesson.topic_title();
        debug!(lesson = %lesson.id, "placeholder rewrite");

        Ok(LessonRewrite {
            learning_objectives: vec![
                format!("Understand the fundamentals of {topic}"),
                "Apply concepts to solve WAEC-style problems".into(),
                "Identify key terms and definitions".into(),
            ],
            core_content: vec![text_block(format!(
                "Placeholder content for {topic}. Connect an AI provider to generate the full lesson."
            ))],
            worked_examples: vec![WorkedExample {
                title: "Example 1".into(),
                context: "A practical scenario".into(),
                problem: "Sample problem statement".into(),
                steps: vec![text_block("Step 1: Identify the given information")],
                final_answer: "Sample answer".into(),
                difficulty: Difficulty::Medium,
            }],
            summary: vec![text_block(format!("Summary of key points about {topic}."))],
            exam_tips: vec![
                "Read questions carefully".into(),
                "Show all working".into(),
                "Check your answers".into(),
            ],
            key_terms: vec![KeyTerm {
                term: "Key Term".into(),
                definition: "Definition of the key term".into(),
            }],
            change_log: "Placeholder output: no AI provider was called.".into(),
            ip_risk_level: IpRiskLevel::Low,
            similarity_warning: None,
        })
    }

    fn model_id(&self) -> &str {
        PLACEHOLDER_MODEL
    }
}

#[cfg(test)]
mod tests {
    use prepnest_shared::TopicRef;

    use super::*;

    fn lesson(topic: Option<&str>) -> LessonDocument {
        LessonDocument {
            id: "lesson-1".into(),
            raw_content: Some("text".into()),
            topic: topic.map(|t| TopicRef {
                title: Some(t.into()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn output_mentions_topic() {
        let generator = PlaceholderGenerator::new();
        let alignment = generator.align_document(&lesson(Some("Photosynthesis"))).await.unwrap();
        assert_eq!(
            alignment.curriculum_objectives[0],
            "Understand key concepts in Photosynthesis"
        );

        let rewrite = generator.rewrite_document(&lesson(Some("Photosynthesis"))).await.unwrap();
        assert_eq!(
            rewrite.learning_objectives[0],
            "Understand the fundamentals of Photosynthesis"
        );
    }

    #[tokio::test]
    async fn missing_topic_falls_back() {
        let rewrite = PlaceholderGenerator
            .rewrite_document(&lesson(None))
            .await
            .unwrap();
        assert!(rewrite.learning_objectives[0].ends_with("Unknown Topic"));
    }

    #[tokio::test]
    async fn output_passes_validation() {
        let rewrite = PlaceholderGenerator
            .rewrite_document(&lesson(Some("Cells")))
            .await
            .unwrap();
        rewrite.validate().unwrap();
        assert_eq!(rewrite.ip_risk_level, IpRiskLevel::Low);
        assert!(rewrite.similarity_warning.is_none());
        assert_eq!(PlaceholderGenerator.model_id(), "placeholder");
    }
}
