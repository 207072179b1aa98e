//! Field sets written back to lesson documents.

use chrono::{DateTime, SecondsFormat, Utc};
use prepnest_shared::{
    CurriculumAlignment, LessonRewrite, ProcessingStatus, ReviewStatus, WorkedExample,
};
use serde_json::{Map, Value, json};

/// A set of named fields applied to one document in a single mutation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LessonPatch {
    set: Map<String, Value>,
}

impl LessonPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `field` to `value`, replacing any earlier value.
    pub fn set(mut self, field: &str, value: Value) -> Self {
        self.set.insert(field.to_string(), value);
        self
    }

    /// Claim a lesson for processing.
    pub fn claim() -> Self {
        Self::new().set(
            "aiProcessingStatus",
            json!(ProcessingStatus::Processing.as_str()),
        )
    }

    /// Record a processing failure. The message lands in the change log.
    pub fn failure(message: &str) -> Self {
        Self::new()
            .set("aiProcessingStatus", json!(ProcessingStatus::Failed.as_str()))
            .set("changeLog", json!(format!("Error: {message}")))
    }

    /// All generated fields plus governance metadata for a finished lesson.
    pub fn completion(
        rewrite: &LessonRewrite,
        alignment: &CurriculumAlignment,
        model: &str,
        processed_at: DateTime<Utc>,
    ) -> Self {
        let worked_examples: Vec<Value> = rewrite
            .worked_examples
            .iter()
            .enumerate()
            .map(|(i, ex)| worked_example(i, ex))
            .collect();

        let key_terms: Vec<Value> = rewrite
            .key_terms
            .iter()
            .enumerate()
            .map(|(i, kt)| {
                json!({
                    "_key": format!("term-{i}"),
                    "term": kt.term,
                    "definition": kt.definition,
                })
            })
            .collect();

        Self::new()
            // Structured content
            .set("learningObjectives", json!(rewrite.learning_objectives))
            .set("coreContent", Value::Array(keyed_blocks(&rewrite.core_content, "block")))
            .set("workedExamples", Value::Array(worked_examples))
            .set("summary", Value::Array(keyed_blocks(&rewrite.summary, "summary")))
            .set("examTips", json!(rewrite.exam_tips))
            .set("keyTerms", Value::Array(key_terms))
            // Curriculum alignment
            .set("curriculumObjectives", json!(alignment.curriculum_objectives))
            .set("curriculumCompetencies", json!(alignment.curriculum_competencies))
            .set("curriculumCurrencyRules", json!(alignment.curriculum_currency_rules))
            .set("canonicalTerms", json!(alignment.canonical_terms))
            // Governance
            .set("aiProcessingStatus", json!(ProcessingStatus::Completed.as_str()))
            .set("reviewStatus", json!(ReviewStatus::AiDraft.as_str()))
            .set("ipRiskLevel", json!(rewrite.ip_risk_level))
            .set("similarityWarning", json!(rewrite.similarity_warning))
            .set("changeLog", json!(rewrite.change_log))
            .set(
                "lastRewriteDate",
                json!(processed_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
            )
            .set("aiModel", json!(model))
    }

    /// The fields to set, keyed by field name.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.set
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.set.get(field)
    }

    /// The `aiProcessingStatus` this patch moves the document to, if any.
    pub fn status(&self) -> Option<ProcessingStatus> {
        self.set
            .get("aiProcessingStatus")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

fn worked_example(index: usize, example: &WorkedExample) -> Value {
    let steps: Vec<Value> = example
        .steps
        .iter()
        .enumerate()
        .map(|(j, step)| with_key(step.clone(), format!("step-{j}"), true))
        .collect();

    json!({
        "_key": format!("example-{index}"),
        "_type": "workedExample",
        "title": example.title,
        "context": example.context,
        "problem": example.problem,
        "steps": steps,
        "finalAnswer": example.final_answer,
        "difficulty": example.difficulty,
    })
}

/// Array items need a `_key`; keep one the model already supplied.
fn keyed_blocks(blocks: &[Value], prefix: &str) -> Vec<Value> {
    blocks
        .iter()
        .enumerate()
        .map(|(i, block)| with_key(block.clone(), format!("{prefix}-{i}"), false))
        .collect()
}

fn with_key(mut value: Value, key: String, replace: bool) -> Value {
    if let Value::Object(map) = &mut value {
        if replace || !map.contains_key("_key") {
            map.insert("_key".into(), Value::String(key));
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use prepnest_shared::{Difficulty, IpRiskLevel, KeyTerm, text_block};

    use super::*;

    fn rewrite() -> LessonRewrite {
        let mut keyed = text_block("Second paragraph");
        keyed["_key"] = json!("model-key");
        LessonRewrite {
            learning_objectives: vec!["State Ohm's law".into()],
            core_content: vec![text_block("First paragraph"), keyed],
            worked_examples: vec![WorkedExample {
                title: "Torch bulb".into(),
                context: "A torch bought at Makola market".into(),
                problem: "Find the current.".into(),
                steps: vec![text_block("V = IR"), text_block("I = 3/6")],
                final_answer: "0.5 A".into(),
                difficulty: Difficulty::Medium,
            }],
            summary: vec![text_block("Current is proportional to voltage.")],
            exam_tips: vec!["Quote units".into()],
            key_terms: vec![KeyTerm {
                term: "Resistance".into(),
                definition: "Opposition to current".into(),
            }],
            change_log: "Localised examples".into(),
            ip_risk_level: IpRiskLevel::Low,
            similarity_warning: None,
        }
    }

    fn alignment() -> CurriculumAlignment {
        CurriculumAlignment {
            curriculum_objectives: vec!["3.1 Electricity".into()],
            curriculum_competencies: vec!["Application".into()],
            curriculum_currency_rules: "Use GHS".into(),
            canonical_terms: vec!["Ohm's law".into()],
        }
    }

    #[test]
    fn claim_sets_processing() {
        let patch = LessonPatch::claim();
        assert_eq!(patch.fields().len(), 1);
        assert_eq!(patch.status(), Some(ProcessingStatus::Processing));
    }

    #[test]
    fn failure_records_message_in_change_log() {
        let patch = LessonPatch::failure("rate limited");
        assert_eq!(patch.status(), Some(ProcessingStatus::Failed));
        assert_eq!(patch.get("changeLog"), Some(&json!("Error: rate limited")));
    }

    #[test]
    fn completion_sets_governance_fields() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
        let patch = LessonPatch::completion(&rewrite(), &alignment(), "claude-test", at);

        assert_eq!(patch.status(), Some(ProcessingStatus::Completed));
        assert_eq!(patch.get("reviewStatus"), Some(&json!("ai_draft")));
        assert_eq!(patch.get("aiModel"), Some(&json!("claude-test")));
        assert_eq!(patch.get("ipRiskLevel"), Some(&json!("low")));
        assert_eq!(patch.get("similarityWarning"), Some(&Value::Null));
        assert_eq!(
            patch.get("lastRewriteDate"),
            Some(&json!("2026-03-01T09:30:00.000Z"))
        );
        assert_eq!(patch.get("canonicalTerms"), Some(&json!(["Ohm's law"])));
        assert_eq!(patch.get("curriculumCurrencyRules"), Some(&json!("Use GHS")));
    }

    #[test]
    fn completion_keys_array_items() {
        let patch = LessonPatch::completion(&rewrite(), &alignment(), "m", Utc::now());

        let examples = patch.get("workedExamples").unwrap();
        assert_eq!(examples[0]["_key"], "example-0");
        assert_eq!(examples[0]["_type"], "workedExample");
        assert_eq!(examples[0]["finalAnswer"], "0.5 A");
        assert_eq!(examples[0]["difficulty"], "medium");
        assert_eq!(examples[0]["steps"][1]["_key"], "step-1");

        let terms = patch.get("keyTerms").unwrap();
        assert_eq!(terms[0]["_key"], "term-0");
        assert_eq!(terms[0]["term"], "Resistance");

        let blocks = patch.get("coreContent").unwrap();
        assert_eq!(blocks[0]["_key"], "block-0");
        assert_eq!(blocks[1]["_key"], "model-key");
        assert_eq!(patch.get("summary").unwrap()[0]["_key"], "summary-0");
    }
}
