//! Data-store interface for the engine
//!
//! The engine consumes [`AcademicStore`] and never talks to persistence
//! directly. Fine-grained reads are free-form; every check-then-act sequence
//! that must be race-free under concurrent requests is a composite write
//! with an atomicity contract on the adapter:
//!
//! - `create_fee_schedule` refuses when the student already has line items;
//! - `insert_registration` enforces the enrollment active-set uniqueness;
//! - `upsert_academic_record` is read-then-insert-or-update by composite key
//!   plus the ACTIVE→COMPLETED enrollment transition, in one unit;
//! - `insert_timetable_entry` / `replace_timetable_entry` enforce the
//!   overlap-free invariant per (day, room).
//!
//! A uniqueness backstop firing inside one of these surfaces as
//! [`StoreError::Conflict`], which the engine maps onto the racing
//! operation's business error.

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc, Weekday};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    AcademicRecord, ClassType, Course, Enrollment, EnrollmentStatus, FeeLineItem, Payment,
    PaymentStatus, Programme, RegistrationPeriod, Student, Term, TimetableEntry,
};

pub mod memory;
#[cfg(feature = "database")]
pub mod postgres;

pub use memory::MemoryStore;
#[cfg(feature = "database")]
pub use postgres::{DatabaseConfig, PostgresStore};

/// Draft of one fee line item, before the store assigns its id.
#[derive(Debug, Clone)]
pub struct NewFeeLineItem {
    pub student_id: Uuid,
    pub amount: Decimal,
    pub description: String,
    pub due_date: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub student_id: Uuid,
    pub fee_line_item_id: Uuid,
    pub amount: Decimal,
    pub status: PaymentStatus,
}

#[derive(Debug, Clone)]
pub struct NewEnrollment {
    pub student_id: Uuid,
    pub course_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct NewAcademicRecord {
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub semester: String,
    pub academic_year: String,
}

#[derive(Debug, Clone)]
pub struct TimetableEntryDraft {
    pub course_id: Uuid,
    pub day_of_week: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub room: String,
    pub class_type: ClassType,
}

/// Grade write keyed on (student, course, semester, academic year).
#[derive(Debug, Clone)]
pub struct GradeUpsert {
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub semester: String,
    pub academic_year: String,
    pub grade: String,
    pub points: Option<f64>,
}

impl GradeUpsert {
    pub fn term(&self) -> Term {
        Term::new(self.academic_year.clone(), self.semester.clone())
    }
}

/// Result of an atomic grade upsert.
#[derive(Debug, Clone)]
pub struct GradeOutcome {
    pub record: AcademicRecord,
    /// False when an existing record was overwritten (idempotent re-submit).
    pub created: bool,
    /// True only on the call that transitioned the enrollment
    /// ACTIVE→COMPLETED.
    pub enrollment_completed: bool,
}

/// The persistence seam the engine is written against.
#[async_trait]
pub trait AcademicStore: Send + Sync {
    // ------------------------------------------------------------------
    // Reference data
    // ------------------------------------------------------------------
    async fn insert_programme(&self, programme: Programme) -> Result<(), StoreError>;
    async fn programme_by_name(&self, name: &str) -> Result<Option<Programme>, StoreError>;

    async fn insert_student(&self, student: Student) -> Result<(), StoreError>;
    async fn student(&self, id: Uuid) -> Result<Option<Student>, StoreError>;

    async fn insert_course(&self, course: Course) -> Result<(), StoreError>;
    async fn course(&self, id: Uuid) -> Result<Option<Course>, StoreError>;

    async fn insert_registration_period(
        &self,
        period: RegistrationPeriod,
    ) -> Result<(), StoreError>;

    /// First active period covering `now` for the term and the student's
    /// level/department.
    async fn matching_period(
        &self,
        term: &Term,
        level: &str,
        department: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RegistrationPeriod>, StoreError>;

    // ------------------------------------------------------------------
    // Fee ledger
    // ------------------------------------------------------------------
    async fn fee_line_items(&self, student_id: Uuid) -> Result<Vec<FeeLineItem>, StoreError>;
    async fn fee_line_item(&self, id: Uuid) -> Result<Option<FeeLineItem>, StoreError>;

    /// Atomic: fails with `Conflict("fee_line_items")` when the student
    /// already has any line items.
    async fn create_fee_schedule(
        &self,
        student_id: Uuid,
        items: Vec<NewFeeLineItem>,
    ) -> Result<Vec<FeeLineItem>, StoreError>;

    /// Atomic: appends the payment and, for a COMPLETED payment that covers
    /// its line item, flips the item's `is_paid` flag in the same unit.
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, StoreError>;

    async fn payments_for_student(&self, student_id: Uuid) -> Result<Vec<Payment>, StoreError>;

    // ------------------------------------------------------------------
    // Enrollment
    // ------------------------------------------------------------------
    async fn active_enrollments(&self, student_id: Uuid) -> Result<Vec<Enrollment>, StoreError>;

    async fn enrollment(
        &self,
        student_id: Uuid,
        course_id: Uuid,
    ) -> Result<Option<Enrollment>, StoreError>;

    /// Atomic: inserts every enrollment (ACTIVE) and every missing academic
    /// record; fails with `Conflict("enrollments_active")` when the student
    /// already has any ACTIVE enrollment. Records that already exist for the
    /// key are left untouched.
    async fn insert_registration(
        &self,
        student_id: Uuid,
        enrollments: Vec<NewEnrollment>,
        records: Vec<NewAcademicRecord>,
    ) -> Result<Vec<Enrollment>, StoreError>;

    async fn set_enrollment_status(
        &self,
        enrollment_id: Uuid,
        status: EnrollmentStatus,
    ) -> Result<(), StoreError>;

    // ------------------------------------------------------------------
    // Academic records
    // ------------------------------------------------------------------
    async fn academic_records(&self, student_id: Uuid) -> Result<Vec<AcademicRecord>, StoreError>;

    /// Atomic: read by composite key, insert or overwrite grade/points with
    /// status COMPLETED, and transition an ACTIVE enrollment for the pair to
    /// COMPLETED, all in one unit.
    async fn upsert_academic_record(&self, upsert: GradeUpsert)
        -> Result<GradeOutcome, StoreError>;

    // ------------------------------------------------------------------
    // Timetable
    // ------------------------------------------------------------------
    async fn timetable_for(&self, day: Weekday, room: &str)
        -> Result<Vec<TimetableEntry>, StoreError>;

    async fn timetable_entry(&self, id: Uuid) -> Result<Option<TimetableEntry>, StoreError>;

    /// Atomic: fails with `Conflict("timetable_overlap")` when the draft
    /// overlaps an existing entry on the same (day, room).
    async fn insert_timetable_entry(
        &self,
        draft: TimetableEntryDraft,
    ) -> Result<TimetableEntry, StoreError>;

    /// Atomic: same check as insert but excluding the entry's own id.
    async fn replace_timetable_entry(
        &self,
        id: Uuid,
        draft: TimetableEntryDraft,
    ) -> Result<TimetableEntry, StoreError>;
}
