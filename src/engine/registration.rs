//! Registration Eligibility Gate and course registration
//!
//! The gate's decision order is deliberate: an existing active registration
//! always short-circuits; a closed window blocks regardless of fee status;
//! fee sufficiency is judged on tuition first, with the admission-fee
//! fallback applying only to students who have no tuition line items yet
//! (immediately post-admission). The fallback thresholds are business
//! policy, kept visible as constants.

use std::collections::HashSet;

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::engine::AcademicEngine;
use crate::error::{EngineError, EngineResult, StoreError};
use crate::models::{Course, Enrollment, EnrollmentStatus, FeeComponent, Notification, Term};
use crate::store::{NewAcademicRecord, NewEnrollment};

/// Full-time load band, inclusive. Fixed policy, not per-student.
pub const MIN_TERM_CREDITS: i32 = 12;
pub const MAX_TERM_CREDITS: i32 = 18;

/// Minimum share of billed tuition that must be paid before registering.
pub const TUITION_CLEARANCE_RATIO: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EligibilityStatus {
    /// Registration window open and fees sufficient.
    Open,
    /// No active registration period covers now for this student and term.
    Closed,
    /// The student already holds an active registration.
    Completed,
    /// Tuition below the clearance ratio, or admission fees not settled.
    FeesOutstanding,
}

/// Answer to `can_register`, shaped for the read endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct EligibilityDecision {
    pub allowed: bool,
    pub reason: EligibilityStatus,
    pub outstanding: Decimal,
}

impl EligibilityDecision {
    fn blocked(reason: EligibilityStatus, outstanding: Decimal) -> Self {
        Self {
            allowed: false,
            reason,
            outstanding,
        }
    }
}

impl AcademicEngine {
    /// Decide whether the student may register this term. First matching
    /// rule wins; see the module docs for why the order matters.
    pub async fn can_register(
        &self,
        student_id: Uuid,
        term: &Term,
    ) -> EngineResult<EligibilityDecision> {
        let student = self
            .store()
            .student(student_id)
            .await?
            .ok_or(EngineError::RecordNotFound { entity: "student" })?;

        // 1. An active registration always short-circuits.
        if !self.store().active_enrollments(student_id).await?.is_empty() {
            return Ok(EligibilityDecision::blocked(
                EligibilityStatus::Completed,
                Decimal::ZERO,
            ));
        }

        // 2. A closed window blocks regardless of fee status.
        let period = self
            .store()
            .matching_period(term, &student.level, &student.department, Utc::now())
            .await?;
        if period.is_none() {
            return Ok(EligibilityDecision::blocked(
                EligibilityStatus::Closed,
                Decimal::ZERO,
            ));
        }

        // 3. Tuition clearance when tuition has been billed.
        let (tuition_paid, tuition_total) = self
            .component_totals(student_id, Some(FeeComponent::Tuition))
            .await?;
        if !tuition_total.is_zero() {
            let ratio = (tuition_paid / tuition_total).to_f64().unwrap_or(0.0);
            if ratio < TUITION_CLEARANCE_RATIO {
                return Ok(EligibilityDecision::blocked(
                    EligibilityStatus::FeesOutstanding,
                    (tuition_total - tuition_paid).max(Decimal::ZERO),
                ));
            }
        } else {
            // 4. No tuition billed yet: admission fees must be settled in
            //    full (the immediately-post-admission case).
            let (admission_paid, admission_total) = self
                .component_totals(student_id, Some(FeeComponent::Admission))
                .await?;
            if admission_paid < admission_total || admission_total.is_zero() {
                return Ok(EligibilityDecision::blocked(
                    EligibilityStatus::FeesOutstanding,
                    (admission_total - admission_paid).max(Decimal::ZERO),
                ));
            }
        }

        // 5. Open.
        Ok(EligibilityDecision {
            allowed: true,
            reason: EligibilityStatus::Open,
            outstanding: Decimal::ZERO,
        })
    }

    /// Register the student on the selected courses for the term. All
    /// derived writes (enrollments, ungraded academic records) commit
    /// atomically; the notification goes out only after the commit.
    pub async fn register(
        &self,
        student_id: Uuid,
        course_ids: &[Uuid],
        term: &Term,
    ) -> EngineResult<Vec<Enrollment>> {
        // 1. Gate.
        let decision = self.can_register(student_id, term).await?;
        match decision.reason {
            EligibilityStatus::Open => {}
            EligibilityStatus::Completed => {
                return Err(EngineError::AlreadyRegistered { student_id });
            }
            EligibilityStatus::Closed => {
                return Err(EngineError::RegistrationClosed {
                    academic_year: term.academic_year.clone(),
                    semester: term.semester.clone(),
                });
            }
            EligibilityStatus::FeesOutstanding => {
                return Err(EngineError::FeesOutstanding {
                    outstanding: decision.outstanding,
                });
            }
        }

        // 2. Every course must exist and be active. Duplicate selections
        //    collapse so a doubled id cannot inflate the credit sum.
        let mut seen: HashSet<Uuid> = HashSet::new();
        let mut courses: Vec<Course> = Vec::new();
        for &course_id in course_ids {
            if !seen.insert(course_id) {
                continue;
            }
            let course = self
                .store()
                .course(course_id)
                .await?
                .filter(|c| c.is_active)
                .ok_or(EngineError::InvalidCourse { course_id })?;
            courses.push(course);
        }

        // 3. Full-time load bound.
        let credits: i32 = courses.iter().map(|c| c.credits).sum();
        if !(MIN_TERM_CREDITS..=MAX_TERM_CREDITS).contains(&credits) {
            return Err(EngineError::CreditBoundsViolation {
                credits,
                min: MIN_TERM_CREDITS,
                max: MAX_TERM_CREDITS,
            });
        }

        // 4. Atomic insert; the active-set backstop turns a race loser into
        //    AlreadyRegistered.
        let enrollments: Vec<NewEnrollment> = courses
            .iter()
            .map(|c| NewEnrollment {
                student_id,
                course_id: c.id,
            })
            .collect();
        let records: Vec<NewAcademicRecord> = courses
            .iter()
            .map(|c| NewAcademicRecord {
                student_id,
                course_id: c.id,
                semester: term.semester.clone(),
                academic_year: term.academic_year.clone(),
            })
            .collect();

        let created = match self
            .store()
            .insert_registration(student_id, enrollments, records)
            .await
        {
            Ok(created) => created,
            Err(StoreError::Conflict(_)) => {
                return Err(EngineError::AlreadyRegistered { student_id });
            }
            Err(err) => return Err(err.into()),
        };

        info!(
            "Registered student {} on {} courses ({} credits) for {}",
            student_id,
            created.len(),
            credits,
            term
        );

        // 5. Post-commit notification.
        self.emit(Notification::new(
            student_id,
            "Course Registration",
            format!(
                "You are registered for {} courses ({} credits) in {}",
                created.len(),
                credits,
                term
            ),
        ))
        .await;

        Ok(created)
    }

    /// Withdraw from a course: the ACTIVE enrollment transitions to DROPPED
    /// and leaves the active-set. The academic record keeps its history.
    pub async fn drop_course(
        &self,
        student_id: Uuid,
        course_id: Uuid,
    ) -> EngineResult<Enrollment> {
        let enrollment = self
            .store()
            .enrollment(student_id, course_id)
            .await?
            .filter(|e| e.status == EnrollmentStatus::Active)
            .ok_or(EngineError::RecordNotFound {
                entity: "active enrollment",
            })?;

        self.store()
            .set_enrollment_status(enrollment.id, EnrollmentStatus::Dropped)
            .await?;

        info!(
            "Student {} dropped course {} (enrollment {})",
            student_id, course_id, enrollment.id
        );
        self.emit(Notification::new(
            student_id,
            "Course Dropped",
            format!("Your enrollment in course {course_id} has been dropped"),
        ))
        .await;

        Ok(Enrollment {
            status: EnrollmentStatus::Dropped,
            ..enrollment
        })
    }
}
