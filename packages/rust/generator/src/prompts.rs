//! Prompt templates for the two generation stages.
//!
//! Each builder appends a per-lesson context section and the fenced source
//! text to a fixed instruction block.

use prepnest_shared::ExamLevel;

/// Instructions for the lesson rewrite stage.
pub const REWRITE_INSTRUCTIONS: &str = r#"You are an expert educational content writer for Prepnest, a learning platform for Ghanaian students preparing for the WASSCE and BECE examinations.

## Task
Turn raw OCR-extracted textbook content into a structured, engaging lesson for West African secondary school students.

## Output Format
Reply with one JSON object of this shape:

```json
{
  "learningObjectives": ["string"],
  "coreContent": [],
  "workedExamples": [
    {
      "title": "string",
      "context": "string",
      "problem": "string",
      "steps": [],
      "finalAnswer": "string",
      "difficulty": "easy | medium | hard"
    }
  ],
  "summary": [],
  "examTips": ["string"],
  "keyTerms": [{ "term": "string", "definition": "string" }],
  "changeLog": "string",
  "ipRiskLevel": "low | medium | high",
  "similarityWarning": "string or null"
}
```

`coreContent`, `summary` and each example's `steps` are Portable Text block arrays.

## Writing Guidelines
- British English spelling (colour, behaviour, analyse).
- Audience: students aged 14 to 18 in Ghana. Keep academic rigour, stay accessible and encouraging.
- Money in Ghana Cedis (GHS). Ghanaian names, places and everyday contexts in examples (Kwame, Ama, tro-tro, harmattan).
- Follow WAEC exam patterns and command words (state, explain, describe, compare).
- Mathematics in LaTeX: \(inline\) or \[display\]. Show every step of a calculation.
- Define technical terms the first time they appear.

## Constraints
- At most 6 learning objectives, 5 exam tips and 10 key terms.
- A lesson takes 15 to 30 minutes to complete.
- Never copy source text verbatim; always rewrite.

## IP Risk
- low: fully rewritten with original examples and structure.
- medium: some phrasing or closely adapted examples retained.
- high: significant overlap with the source; flag for review in similarityWarning.

## Change Log
Record the canonical terms preserved (formulas, laws, dates), what was restructured or expanded, which errors were corrected and which examples were localised."#;

/// Instructions for the curriculum alignment stage.
pub const CURRICULUM_INSTRUCTIONS: &str = r#"You are a curriculum alignment specialist for the West African Examinations Council (WAEC).

## Task
Extract curriculum alignment metadata from the lesson content and map it to official WAEC syllabus objectives.

## Output Format
Reply with one JSON object:

```json
{
  "curriculumObjectives": ["string"],
  "curriculumCompetencies": ["string"],
  "curriculumCurrencyRules": "string",
  "canonicalTerms": ["string"]
}
```

## Guidelines
- curriculumObjectives: exact syllabus wording, with objective codes (e.g. "1.2.3") where available.
- curriculumCompetencies: cognitive skills (recall, comprehension, application, analysis), practical skills and cross-curricular links.
- curriculumCurrencyRules: local conventions. Ghana Cedi (GHS), SI units for sciences, DD/MM/YYYY dates.
- canonicalTerms: laws, formulas, dates, institutional names (WAEC, GES) and terminology that must not be altered."#;

/// Build the stage B prompt for one lesson.
pub fn build_rewrite_prompt(
    subject: &str,
    topic: &str,
    level: ExamLevel,
    raw_content: &str,
) -> String {
    format!(
        "{REWRITE_INSTRUCTIONS}

## Context for This Lesson
- Subject: {subject}
- Topic: {topic}
- Education Level: {level}
- Target Exam: {exam}

## Raw Content to Transform
```
{raw_content}
```

Now transform this content following all guidelines above. Return only valid JSON.",
        level = level.as_str(),
        exam = level.full_name(),
    )
}

/// Build the stage A prompt for one lesson.
///
/// `syllabus` is the official syllabus excerpt for the topic; it may be empty.
pub fn build_curriculum_prompt(
    subject: &str,
    topic: &str,
    syllabus: &str,
    lesson_content: &str,
) -> String {
    format!(
        "{CURRICULUM_INSTRUCTIONS}

## Context
- Subject: {subject}
- Topic: {topic}

## Official Syllabus Reference
```
{syllabus}
```

## Lesson Content to Align
```
{lesson_content}
```

Extract curriculum alignment metadata. Return only valid JSON."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrite_prompt_carries_context() {
        let prompt = build_rewrite_prompt(
            "Core Mathematics",
            "Simple Interest",
            ExamLevel::Wassce,
            "Interest is money paid for the use of money.",
        );
        assert!(prompt.starts_with(REWRITE_INSTRUCTIONS));
        assert!(prompt.contains("- Subject: Core Mathematics"));
        assert!(prompt.contains("- Education Level: WASSCE"));
        assert!(prompt.contains("West African Senior School Certificate Examination"));
        assert!(prompt.contains("```\nInterest is money paid for the use of money.\n```"));
        assert!(prompt.ends_with("Return only valid JSON."));
    }

    #[test]
    fn bece_lessons_target_bece() {
        let prompt = build_rewrite_prompt("Science", "Cells", ExamLevel::Bece, "x");
        assert!(prompt.contains("Basic Education Certificate Examination"));
    }

    #[test]
    fn curriculum_prompt_includes_empty_syllabus_block() {
        let prompt = build_curriculum_prompt("Physics", "Electricity", "", "Ohm's law...");
        assert!(prompt.starts_with(CURRICULUM_INSTRUCTIONS));
        assert!(prompt.contains("## Official Syllabus Reference\n```\n\n```"));
        assert!(prompt.contains("Ohm's law..."));
    }
}
