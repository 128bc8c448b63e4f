//! Grade / Academic-Record Aggregator
//!
//! Grade writes are idempotent upserts keyed on (student, course, semester,
//! academic year). GPA is the credit-weighted mean over records that carry
//! both a grade and points; a student with no graded work has GPA 0.00 by
//! definition, never an undefined value.

use std::collections::HashMap;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::engine::AcademicEngine;
use crate::error::{EngineError, EngineResult};
use crate::models::{AcademicRecord, Notification, Term};
use crate::store::{GradeOutcome, GradeUpsert};

#[derive(Debug, Clone, Serialize)]
pub struct GpaSummary {
    pub gpa: f64,
    pub total_credits: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct TermGpa {
    pub term: Term,
    pub gpa: f64,
    pub credits: i32,
}

/// Semester-by-semester GPA table plus the cumulative row.
#[derive(Debug, Clone, Serialize)]
pub struct GpaBreakdown {
    pub terms: Vec<TermGpa>,
    pub cumulative: GpaSummary,
}

impl AcademicEngine {
    /// Record (or re-record) a grade. Re-submitting the same grade for the
    /// same student/course/term overwrites in place, never a duplicate
    /// row. The first successful write also moves an ACTIVE enrollment to
    /// COMPLETED, inside the same atomic unit.
    pub async fn record_grade(&self, upsert: GradeUpsert) -> EngineResult<GradeOutcome> {
        self.store()
            .student(upsert.student_id)
            .await?
            .ok_or(EngineError::RecordNotFound { entity: "student" })?;
        self.store()
            .course(upsert.course_id)
            .await?
            .ok_or(EngineError::RecordNotFound { entity: "course" })?;

        let term = upsert.term();
        let grade = upsert.grade.clone();
        let outcome = self.store().upsert_academic_record(upsert).await?;

        info!(
            "Recorded grade {} for student {} in course {} ({}), enrollment completed: {}",
            grade,
            outcome.record.student_id,
            outcome.record.course_id,
            term,
            outcome.enrollment_completed
        );
        self.emit(Notification::new(
            outcome.record.student_id,
            "Grade Published",
            format!(
                "A grade of {} has been recorded for one of your {} courses",
                grade, term
            ),
        ))
        .await;

        Ok(outcome)
    }

    /// Cumulative credit-weighted GPA over every contributing record.
    pub async fn compute_gpa(&self, student_id: Uuid) -> EngineResult<GpaSummary> {
        let records = self.store().academic_records(student_id).await?;
        self.weighted_summary(&records).await
    }

    /// Per-term GPA applying the identical formula restricted to each
    /// term's contributing records.
    pub async fn gpa_breakdown(&self, student_id: Uuid) -> EngineResult<GpaBreakdown> {
        let records = self.store().academic_records(student_id).await?;

        let mut by_term: HashMap<Term, Vec<AcademicRecord>> = HashMap::new();
        for record in &records {
            by_term.entry(record.term()).or_default().push(record.clone());
        }

        let mut terms = Vec::with_capacity(by_term.len());
        for (term, term_records) in by_term {
            let summary = self.weighted_summary(&term_records).await?;
            terms.push(TermGpa {
                term,
                gpa: summary.gpa,
                credits: summary.total_credits,
            });
        }
        terms.sort_by(|a, b| {
            (&a.term.academic_year, &a.term.semester)
                .cmp(&(&b.term.academic_year, &b.term.semester))
        });

        let cumulative = self.weighted_summary(&records).await?;
        Ok(GpaBreakdown { terms, cumulative })
    }

    async fn weighted_summary(&self, records: &[AcademicRecord]) -> EngineResult<GpaSummary> {
        let mut quality_points = 0.0;
        let mut total_credits = 0;

        for record in records.iter().filter(|r| r.contributes_to_gpa()) {
            let Some(points) = record.points else {
                continue;
            };
            let course = self
                .store()
                .course(record.course_id)
                .await?
                .ok_or(EngineError::RecordNotFound { entity: "course" })?;

            quality_points += points * course.credits as f64;
            total_credits += course.credits;
        }

        let gpa = if total_credits == 0 {
            0.0
        } else {
            quality_points / total_credits as f64
        };
        Ok(GpaSummary { gpa, total_credits })
    }
}
