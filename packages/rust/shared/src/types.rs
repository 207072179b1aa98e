//! Core domain types for Prepnest lessons and AI generation outputs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PrepnestError, Result};

/// Maximum learning objectives accepted on a lesson.
pub const MAX_LEARNING_OBJECTIVES: usize = 6;

/// Maximum exam tips accepted on a lesson.
pub const MAX_EXAM_TIPS: usize = 5;

/// Maximum key terms accepted on a lesson.
pub const MAX_KEY_TERMS: usize = 10;

/// Portable Text content: an array of opaque block objects.
pub type PortableText = Vec<Value>;

// ---------------------------------------------------------------------------
// Status enums
// ---------------------------------------------------------------------------

/// `aiProcessingStatus` on a lesson document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Skipped,
}

impl ProcessingStatus {
    /// Value as stored in the CMS.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    /// Marker shown next to the lesson in listings.
    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Pending => "⏳",
            Self::Processing => "🔄",
            Self::Completed => "✅",
            Self::Failed => "❌",
            Self::Skipped => "⏭️",
        }
    }

    /// Whether a document in this state (or with no state) may be claimed.
    pub fn is_claimable(status: Option<Self>) -> bool {
        matches!(status, None | Some(Self::Pending))
    }
}

impl std::fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `reviewStatus` on a lesson document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    AiDraft,
    EducatorReviewed,
    Approved,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AiDraft => "ai_draft",
            Self::EducatorReviewed => "educator_reviewed",
            Self::Approved => "approved",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::AiDraft => "🤖",
            Self::EducatorReviewed => "👀",
            Self::Approved => "✅",
        }
    }
}

/// Similarity to the source material, as assessed by the rewrite model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IpRiskLevel {
    Low,
    Medium,
    High,
}

/// Worked example difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// Target examination for a lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamLevel {
    Bece,
    Wassce,
}

impl ExamLevel {
    /// Derive the exam level from a topic's `educationLevel`.
    ///
    /// Only `WASSCE` (any case) selects WASSCE; everything else, including a
    /// missing value, is treated as BECE.
    pub fn from_education_level(level: Option<&str>) -> Self {
        match level {
            Some(l) if l.trim().eq_ignore_ascii_case("wassce") => Self::Wassce,
            _ => Self::Bece,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bece => "BECE",
            Self::Wassce => "WASSCE",
        }
    }

    /// Full examination name.
    pub fn full_name(&self) -> &'static str {
        match self {
            Self::Bece => "Basic Education Certificate Examination",
            Self::Wassce => "West African Senior School Certificate Examination",
        }
    }
}

// ---------------------------------------------------------------------------
// LessonDocument
// ---------------------------------------------------------------------------

/// Subject referenced by a topic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubjectRef {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Topic referenced by a lesson, dereferenced at fetch time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicRef {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub education_level: Option<String>,
    #[serde(default)]
    pub subject: Option<SubjectRef>,
}

/// A lesson as returned by the pending-lessons query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonDocument {
    /// Opaque document ID.
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Ignored when not a whole number in `u32` range.
    #[serde(default, deserialize_with = "lenient_lesson_number")]
    pub lesson_number: Option<u32>,
    /// OCR-extracted source text.
    #[serde(default)]
    pub raw_content: Option<String>,
    #[serde(default)]
    pub ai_processing_status: Option<ProcessingStatus>,
    #[serde(default)]
    pub review_status: Option<ReviewStatus>,
    #[serde(default)]
    pub topic: Option<TopicRef>,
}

impl LessonDocument {
    /// Pending (or unset) status with non-empty raw content.
    pub fn is_eligible(&self) -> bool {
        ProcessingStatus::is_claimable(self.ai_processing_status) && self.has_raw_content()
    }

    /// Same test as the pending query: defined and not `""`.
    pub fn has_raw_content(&self) -> bool {
        self.raw_content.as_deref().is_some_and(|c| !c.is_empty())
    }

    /// Raw content present but only whitespace.
    pub fn has_blank_raw_content(&self) -> bool {
        self.has_raw_content() && self.raw_content().trim().is_empty()
    }

    /// Raw content, or an empty string.
    pub fn raw_content(&self) -> &str {
        self.raw_content.as_deref().unwrap_or_default()
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("Untitled")
    }

    pub fn topic_title(&self) -> &str {
        self.topic
            .as_ref()
            .and_then(|t| t.title.as_deref())
            .unwrap_or("Unknown Topic")
    }

    pub fn subject_name(&self) -> &str {
        self.topic
            .as_ref()
            .and_then(|t| t.subject.as_ref())
            .and_then(|s| s.name.as_deref())
            .unwrap_or("Unknown Subject")
    }

    pub fn exam_level(&self) -> ExamLevel {
        ExamLevel::from_education_level(
            self.topic
                .as_ref()
                .and_then(|t| t.education_level.as_deref()),
        )
    }

    /// Listing title: `<lessonNumber>. <title>`.
    pub fn preview_title(&self) -> String {
        match self.lesson_number {
            Some(n) => format!("{n}. {}", self.display_title()),
            None => self.display_title().to_string(),
        }
    }

    /// Listing subtitle: topic title followed by status markers.
    pub fn preview_subtitle(&self) -> String {
        let topic = self
            .topic
            .as_ref()
            .and_then(|t| t.title.as_deref())
            .unwrap_or("No topic");
        let status = self.ai_processing_status.map(|s| s.emoji()).unwrap_or("");
        let review = self.review_status.map(|s| s.emoji()).unwrap_or("");
        format!("{topic} {status} {review}").trim_end().to_string()
    }
}

fn lenient_lesson_number<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let number = match value {
        Some(Value::Number(n)) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                .map(|f| f as u64)
        }),
        _ => None,
    };
    Ok(number.and_then(|n| u32::try_from(n).ok()))
}

// ---------------------------------------------------------------------------
// Generation outputs
// ---------------------------------------------------------------------------

/// Stage A output: mapping of a lesson onto the WAEC syllabus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurriculumAlignment {
    pub curriculum_objectives: Vec<String>,
    pub curriculum_competencies: Vec<String>,
    pub curriculum_currency_rules: String,
    #[serde(default)]
    pub canonical_terms: Vec<String>,
}

/// A fully worked problem inside a lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkedExample {
    pub title: String,
    #[serde(default)]
    pub context: String,
    pub problem: String,
    #[serde(default)]
    pub steps: PortableText,
    #[serde(default)]
    pub final_answer: String,
    pub difficulty: Difficulty,
}

/// Glossary entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyTerm {
    pub term: String,
    pub definition: String,
}

/// Stage B output: the restructured lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonRewrite {
    pub learning_objectives: Vec<String>,
    pub core_content: PortableText,
    #[serde(default)]
    pub worked_examples: Vec<WorkedExample>,
    #[serde(default)]
    pub summary: PortableText,
    #[serde(default)]
    pub exam_tips: Vec<String>,
    #[serde(default)]
    pub key_terms: Vec<KeyTerm>,
    pub change_log: String,
    pub ip_risk_level: IpRiskLevel,
    #[serde(default)]
    pub similarity_warning: Option<String>,
}

impl LessonRewrite {
    /// Check the output against the lesson field rules.
    pub fn validate(&self) -> Result<()> {
        check_max(
            "learning objectives",
            self.learning_objectives.len(),
            MAX_LEARNING_OBJECTIVES,
        )?;
        check_max("exam tips", self.exam_tips.len(), MAX_EXAM_TIPS)?;
        check_max("key terms", self.key_terms.len(), MAX_KEY_TERMS)?;

        for (i, example) in self.worked_examples.iter().enumerate() {
            if example.title.trim().is_empty() {
                return Err(PrepnestError::validation(format!(
                    "worked example {i} has no title"
                )));
            }
            if example.problem.trim().is_empty() {
                return Err(PrepnestError::validation(format!(
                    "worked example {i} has no problem statement"
                )));
            }
        }
        Ok(())
    }
}

fn check_max(field: &str, count: usize, max: usize) -> Result<()> {
    if count > max {
        return Err(PrepnestError::validation(format!(
            "{count} {field} (max {max})"
        )));
    }
    Ok(())
}

/// Build a single normal-style Portable Text block holding `text`.
pub fn text_block(text: impl Into<String>) -> Value {
    serde_json::json!({
        "_type": "block",
        "style": "normal",
        "children": [{ "_type": "span", "text": text.into() }],
    })
}
