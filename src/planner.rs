//! Deterministic study planner and resource summaries.
//!
//! Both produce canned guidance from the catalog; nothing here calls out to a
//! model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{FieldErrors, HubError, Result};
use crate::models::Resource;
use crate::stats::ResourceStats;

const PICK_LIMIT: usize = 4;
const DAILY_PLAN_MAX_DAYS: i64 = 10;
const REVISION_DAYS: i64 = 2;

/// Planner form data
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest {
    pub subject: String,
    #[serde(default)]
    pub exam_date: Option<NaiveDate>,
}

/// A resource suggested for one block of the plan
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanPick {
    pub id: String,
    pub title: String,
    pub average_rating: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlanBlock {
    pub label: String,
    pub focus: String,
    pub resources: Vec<PlanPick>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudyPlan {
    pub subject: String,
    pub exam_date: NaiveDate,
    pub days_remaining: i64,
    pub breakdown: Vec<PlanBlock>,
    pub strategy: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ResourceSummary {
    pub overview: String,
    pub concepts: Vec<String>,
    pub tips: Vec<String>,
    pub important: Vec<String>,
}

fn topic_bank(subject: &str) -> [String; 6] {
    [
        format!("{} fundamentals", subject),
        "Core definitions and terminology".to_string(),
        "Important derivations and conceptual diagrams".to_string(),
        "PYQ pattern analysis".to_string(),
        "Problem-solving drills".to_string(),
        "Common viva/interview questions".to_string(),
    ]
}

/// Build a day-by-day (up to ten days out) or week-by-week study plan
///
/// The best rated resources of the subject are spread over the blocks and
/// the last stretch is always kept for revision.
///
/// # Errors
/// * `Validation` if the subject or date is missing, or the exam is not in
///   the future
pub fn generate_plan(
    subject: &str,
    exam_date: Option<NaiveDate>,
    today: NaiveDate,
    resources: &[ResourceStats],
) -> Result<StudyPlan> {
    let subject = subject.trim();
    let mut errors = FieldErrors::new();
    if subject.is_empty() {
        errors.add("subject", "Please choose subject and exam date.");
    }
    let Some(exam_date) = exam_date else {
        errors.add("examDate", "Please choose subject and exam date.");
        return Err(HubError::Validation(errors));
    };
    let days_remaining = (exam_date - today).num_days();
    if days_remaining < 1 {
        errors.add("examDate", "Choose a valid upcoming exam date.");
    }
    errors.into_result()?;

    let mut candidates: Vec<&ResourceStats> = resources
        .iter()
        .filter(|r| r.resource.subject == subject)
        .collect();
    candidates.sort_by(|a, b| b.average_rating.total_cmp(&a.average_rating));
    let picks: Vec<PlanPick> = candidates
        .into_iter()
        .take(PICK_LIMIT)
        .map(|r| PlanPick {
            id: r.resource.id.clone(),
            title: r.resource.title.clone(),
            average_rating: r.average_rating,
        })
        .collect();

    let topics = topic_bank(subject);
    let take = |n: usize| picks.iter().take(n).cloned().collect::<Vec<_>>();

    let breakdown: Vec<PlanBlock> = if days_remaining <= DAILY_PLAN_MAX_DAYS {
        (0..days_remaining)
            .map(|index| {
                let is_revision = index >= days_remaining - REVISION_DAYS;
                PlanBlock {
                    label: format!("Day {}", index + 1),
                    focus: if is_revision {
                        "Final revision buffer + quick recall tests".to_string()
                    } else {
                        topics[index as usize % topics.len()].clone()
                    },
                    resources: take(if is_revision { 2 } else { 1 }),
                }
            })
            .collect()
    } else {
        let weeks = (days_remaining as usize).div_ceil(7).max(2);
        (0..weeks)
            .map(|index| {
                let is_final_week = index == weeks - 1;
                PlanBlock {
                    label: format!("Week {}", index + 1),
                    focus: if is_final_week {
                        "Final revision buffer, mock tests, and weak-topic patching".to_string()
                    } else {
                        format!("{} + active recall", topics[index % topics.len()])
                    },
                    resources: take((index + 1).min(3)),
                }
            })
            .collect()
    };

    Ok(StudyPlan {
        subject: subject.to_string(),
        exam_date,
        days_remaining,
        breakdown,
        strategy: vec![
            "Start with concept-first review before solving.".to_string(),
            "Include one timed practice block every alternate day.".to_string(),
            "Keep final 2 days for revision buffer and memory consolidation.".to_string(),
        ],
    })
}

/// Study guidance derived from a resource's metadata
pub fn resource_summary(resource: &Resource) -> ResourceSummary {
    let primary_tags = resource
        .tags
        .iter()
        .take(3)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    let topics = if primary_tags.is_empty() {
        "fundamental principles".to_string()
    } else {
        primary_tags
    };

    ResourceSummary {
        overview: format!(
            "This {} resource for Semester {} in {} is designed to support focused revision and concept clarity.",
            resource.resource_type.as_str().to_lowercase(),
            resource.semester,
            resource.subject
        ),
        concepts: vec![
            format!("Core topics: {}", topics),
            format!(
                "Resource type strategy: how to use {} for active recall",
                resource.resource_type
            ),
            "Bridge to exam context with past-pattern alignment".to_string(),
        ],
        tips: vec![
            "Review once for structure, then solve/annotate without looking at the source.".to_string(),
            "Convert each section into 2-3 short recall prompts before exam week.".to_string(),
            "Prioritize repeated keywords and mark weak areas for quick final revision.".to_string(),
        ],
        important: vec![
            format!("Practice at least one timed run for {}.", resource.subject),
            "Keep a one-page summary sheet for last-day revision.".to_string(),
            "Discuss difficult points with peers for faster retention.".to_string(),
        ],
    }
}
