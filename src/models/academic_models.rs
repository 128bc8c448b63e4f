//! Domain models for the academic operations engine
//!
//! These structures mirror the persisted schema: reference data (programmes,
//! students, courses), the fee ledger, enrollments, academic records and
//! timetable entries.

use chrono::{DateTime, NaiveTime, Utc, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One registration cycle. Threaded explicitly through every call that is
/// term-scoped; business logic never defaults the current term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Term {
    pub academic_year: String,
    pub semester: String,
}

impl Term {
    pub fn new(academic_year: impl Into<String>, semester: impl Into<String>) -> Self {
        Self {
            academic_year: academic_year.into(),
            semester: semester.into(),
        }
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.academic_year, self.semester)
    }
}

/// Degree programme reference data. Immutable at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
pub struct Programme {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub department: String,
    pub min_admission_grade: String,
}

/// Student reference data as far as the engine is concerned; created by the
/// admissions collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
pub struct Student {
    pub id: Uuid,
    pub reg_no: String,
    pub full_name: String,
    pub programme_name: String,
    pub level: String,
    pub department: String,
}

/// Course reference data; `credits` feeds both the full-time load bound and
/// GPA weighting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
pub struct Course {
    pub id: Uuid,
    pub code: String,
    pub title: String,
    pub credits: i32,
    pub department: String,
    pub is_active: bool,
}

/// The billable fee components, in due-date order (admission earliest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeeComponent {
    Admission,
    Tuition,
    Accommodation,
    Library,
    Laboratory,
    Examination,
}

impl FeeComponent {
    /// Ledger description for line items of this component.
    pub fn description(&self) -> &'static str {
        match self {
            FeeComponent::Admission => "Admission Fee",
            FeeComponent::Tuition => "Tuition Fee",
            FeeComponent::Accommodation => "Accommodation Fee",
            FeeComponent::Library => "Library Fee",
            FeeComponent::Laboratory => "Laboratory Fee",
            FeeComponent::Examination => "Examination Fee",
        }
    }

    /// Days between schedule creation and the component's due date.
    pub fn due_offset_days(&self) -> i64 {
        match self {
            FeeComponent::Admission => 14,
            FeeComponent::Tuition => 30,
            FeeComponent::Accommodation => 45,
            FeeComponent::Library => 45,
            FeeComponent::Laboratory => 45,
            FeeComponent::Examination => 90,
        }
    }
}

/// One billable component owed by a student. Created at admission approval
/// or first registration attempt; never auto-deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
pub struct FeeLineItem {
    pub id: Uuid,
    pub student_id: Uuid,
    pub amount: Decimal,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub is_paid: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "database", derive(sqlx::Type))]
#[cfg_attr(
    feature = "database",
    sqlx(type_name = "payment_status", rename_all = "UPPERCASE")
)]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

/// Append-only payment row. Only COMPLETED payments count toward paid totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
pub struct Payment {
    pub id: Uuid,
    pub student_id: Uuid,
    pub fee_line_item_id: Uuid,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "database", derive(sqlx::Type))]
#[cfg_attr(
    feature = "database",
    sqlx(type_name = "enrollment_status", rename_all = "UPPERCASE")
)]
pub enum EnrollmentStatus {
    Active,
    Completed,
    Dropped,
    Failed,
}

/// A student's seat in a course. The ACTIVE set is unique on
/// (student_id, course_id) and is what the registration gate inspects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
pub struct Enrollment {
    pub id: Uuid,
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub status: EnrollmentStatus,
    pub enrollment_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "database", derive(sqlx::Type))]
#[cfg_attr(
    feature = "database",
    sqlx(type_name = "record_status", rename_all = "UPPERCASE")
)]
pub enum AcademicRecordStatus {
    InProgress,
    Completed,
    Dropped,
}

/// Per-course, per-term grade entry. Unique on
/// (student_id, course_id, semester, academic_year), the idempotency key
/// for grade upserts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
pub struct AcademicRecord {
    pub id: Uuid,
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub semester: String,
    pub academic_year: String,
    pub grade: Option<String>,
    pub points: Option<f64>,
    pub status: AcademicRecordStatus,
}

impl AcademicRecord {
    pub fn term(&self) -> Term {
        Term::new(self.academic_year.clone(), self.semester.clone())
    }

    /// A record contributes to GPA only once it carries both a non-empty
    /// grade and grade points.
    pub fn contributes_to_gpa(&self) -> bool {
        self.grade.as_deref().is_some_and(|g| !g.is_empty()) && self.points.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "database", derive(sqlx::Type))]
#[cfg_attr(
    feature = "database",
    sqlx(type_name = "class_type", rename_all = "UPPERCASE")
)]
pub enum ClassType {
    Lecture,
    Tutorial,
    Practical,
}

/// A placed class. Invariant: no two entries on the same (day, room) have
/// overlapping [start_time, end_time) windows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimetableEntry {
    pub id: Uuid,
    pub course_id: Uuid,
    pub day_of_week: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub room: String,
    pub class_type: ClassType,
}

impl TimetableEntry {
    /// Half-open interval overlap on the same (day, room). Back-to-back
    /// classes (one ending exactly when the next starts) do not conflict.
    pub fn conflicts_with(
        &self,
        day: Weekday,
        room: &str,
        start: NaiveTime,
        end: NaiveTime,
    ) -> bool {
        self.day_of_week == day && self.room == room && self.start_time < end && self.end_time > start
    }
}

/// Registration window. A period applies to a student when it is active,
/// covers "now", matches the term, and its optional level/department match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
pub struct RegistrationPeriod {
    pub id: Uuid,
    pub academic_year: String,
    pub semester: String,
    pub level: Option<String>,
    pub department: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
}

impl RegistrationPeriod {
    pub fn covers(&self, term: &Term, level: &str, department: &str, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.academic_year == term.academic_year
            && self.semester == term.semester
            && self.start_date <= now
            && now <= self.end_date
            && self.level.as_deref().is_none_or(|l| l == level)
            && self.department.as_deref().is_none_or(|d| d == department)
    }
}

/// Event handed to the notification sink after a mutation commits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub student_id: Uuid,
    pub title: String,
    pub body: String,
}

impl Notification {
    pub fn new(student_id: Uuid, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            student_id,
            title: title.into(),
            body: body.into(),
        }
    }
}
