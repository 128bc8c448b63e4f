//! Postgres store adapter
//!
//! Every composite write from the [`AcademicStore`] contract runs inside one
//! sqlx transaction; uniqueness violations from the schema's indexes fold
//! into [`StoreError::Conflict`] so a race loser receives a business error,
//! never a fault. Schema lives in `migrations/0001_init.sql`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc, Weekday};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    AcademicRecord, ClassType, Course, Enrollment, EnrollmentStatus, FeeLineItem, Payment,
    PaymentStatus, Programme, RegistrationPeriod, Student, Term, TimetableEntry,
};
use crate::store::{
    AcademicStore, GradeOutcome, GradeUpsert, NewAcademicRecord, NewEnrollment, NewFeeLineItem,
    NewPayment, TimetableEntryDraft,
};

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub connection_timeout: Duration,
    pub idle_timeout: Option<Duration>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost:5432/acadops".to_string()),
            max_connections: std::env::var("DATABASE_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            connection_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)), // 10 minutes
        }
    }
}

/// Postgres-backed [`AcademicStore`].
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a pool from configuration and wrap it.
    pub async fn connect(config: DatabaseConfig) -> Result<Self, StoreError> {
        let mut pool_options = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connection_timeout);

        if let Some(idle_timeout) = config.idle_timeout {
            pool_options = pool_options.idle_timeout(idle_timeout);
        }

        let pool = pool_options
            .connect(&config.database_url)
            .await
            .map_err(|e| {
                warn!("Failed to connect to database: {}", e);
                StoreError::from(e)
            })?;

        info!("Database connection pool created successfully");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn weekday_to_db(day: Weekday) -> i16 {
    day.number_from_monday() as i16
}

fn weekday_from_db(day: i16) -> Weekday {
    match day {
        1 => Weekday::Mon,
        2 => Weekday::Tue,
        3 => Weekday::Wed,
        4 => Weekday::Thu,
        5 => Weekday::Fri,
        6 => Weekday::Sat,
        _ => Weekday::Sun,
    }
}

#[derive(sqlx::FromRow)]
struct TimetableRow {
    id: Uuid,
    course_id: Uuid,
    day_of_week: i16,
    start_time: NaiveTime,
    end_time: NaiveTime,
    room: String,
    class_type: ClassType,
}

impl From<TimetableRow> for TimetableEntry {
    fn from(row: TimetableRow) -> Self {
        TimetableEntry {
            id: row.id,
            course_id: row.course_id,
            day_of_week: weekday_from_db(row.day_of_week),
            start_time: row.start_time,
            end_time: row.end_time,
            room: row.room,
            class_type: row.class_type,
        }
    }
}

async fn overlapping_entry(
    tx: &mut Transaction<'_, Postgres>,
    draft: &TimetableEntryDraft,
    exclude: Option<Uuid>,
) -> Result<Option<TimetableEntry>, StoreError> {
    let row = sqlx::query_as::<_, TimetableRow>(
        "SELECT id, course_id, day_of_week, start_time, end_time, room, class_type \
         FROM timetable_entries \
         WHERE day_of_week = $1 AND room = $2 AND start_time < $3 AND end_time > $4 \
           AND ($5::uuid IS NULL OR id <> $5) \
         LIMIT 1",
    )
    .bind(weekday_to_db(draft.day_of_week))
    .bind(&draft.room)
    .bind(draft.end_time)
    .bind(draft.start_time)
    .bind(exclude)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row.map(TimetableEntry::from))
}

#[async_trait]
impl AcademicStore for PostgresStore {
    async fn insert_programme(&self, programme: Programme) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO programmes (id, code, name, department, min_admission_grade) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(programme.id)
        .bind(&programme.code)
        .bind(&programme.name)
        .bind(&programme.department)
        .bind(&programme.min_admission_grade)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn programme_by_name(&self, name: &str) -> Result<Option<Programme>, StoreError> {
        let row = sqlx::query_as::<_, Programme>(
            "SELECT id, code, name, department, min_admission_grade FROM programmes WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_student(&self, student: Student) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO students (id, reg_no, full_name, programme_name, level, department) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(student.id)
        .bind(&student.reg_no)
        .bind(&student.full_name)
        .bind(&student.programme_name)
        .bind(&student.level)
        .bind(&student.department)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn student(&self, id: Uuid) -> Result<Option<Student>, StoreError> {
        let row = sqlx::query_as::<_, Student>(
            "SELECT id, reg_no, full_name, programme_name, level, department FROM students WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_course(&self, course: Course) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO courses (id, code, title, credits, department, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(course.id)
        .bind(&course.code)
        .bind(&course.title)
        .bind(course.credits)
        .bind(&course.department)
        .bind(course.is_active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn course(&self, id: Uuid) -> Result<Option<Course>, StoreError> {
        let row = sqlx::query_as::<_, Course>(
            "SELECT id, code, title, credits, department, is_active FROM courses WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_registration_period(
        &self,
        period: RegistrationPeriod,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO registration_periods \
             (id, academic_year, semester, level, department, start_date, end_date, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(period.id)
        .bind(&period.academic_year)
        .bind(&period.semester)
        .bind(&period.level)
        .bind(&period.department)
        .bind(period.start_date)
        .bind(period.end_date)
        .bind(period.is_active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn matching_period(
        &self,
        term: &Term,
        level: &str,
        department: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RegistrationPeriod>, StoreError> {
        let row = sqlx::query_as::<_, RegistrationPeriod>(
            "SELECT id, academic_year, semester, level, department, start_date, end_date, is_active \
             FROM registration_periods \
             WHERE is_active = TRUE AND academic_year = $1 AND semester = $2 \
               AND start_date <= $3 AND end_date >= $3 \
               AND (level IS NULL OR level = $4) \
               AND (department IS NULL OR department = $5) \
             ORDER BY start_date \
             LIMIT 1",
        )
        .bind(&term.academic_year)
        .bind(&term.semester)
        .bind(now)
        .bind(level)
        .bind(department)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn fee_line_items(&self, student_id: Uuid) -> Result<Vec<FeeLineItem>, StoreError> {
        let rows = sqlx::query_as::<_, FeeLineItem>(
            "SELECT id, student_id, amount, description, due_date, is_paid \
             FROM fee_line_items WHERE student_id = $1 ORDER BY due_date",
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn fee_line_item(&self, id: Uuid) -> Result<Option<FeeLineItem>, StoreError> {
        let row = sqlx::query_as::<_, FeeLineItem>(
            "SELECT id, student_id, amount, description, due_date, is_paid \
             FROM fee_line_items WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn create_fee_schedule(
        &self,
        student_id: Uuid,
        items: Vec<NewFeeLineItem>,
    ) -> Result<Vec<FeeLineItem>, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Serialize schedule creation per student; the existence check and
        // the inserts must see a stable ledger.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1::text))")
            .bind(student_id.to_string())
            .execute(&mut *tx)
            .await?;

        let existing: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM fee_line_items WHERE student_id = $1 LIMIT 1")
                .bind(student_id)
                .fetch_optional(&mut *tx)
                .await?;
        if existing.is_some() {
            return Err(StoreError::Conflict("fee_line_items"));
        }

        let mut created = Vec::with_capacity(items.len());
        for draft in items {
            let row = sqlx::query_as::<_, FeeLineItem>(
                "INSERT INTO fee_line_items (id, student_id, amount, description, due_date, is_paid) \
                 VALUES ($1, $2, $3, $4, $5, FALSE) \
                 RETURNING id, student_id, amount, description, due_date, is_paid",
            )
            .bind(Uuid::new_v4())
            .bind(draft.student_id)
            .bind(draft.amount)
            .bind(&draft.description)
            .bind(draft.due_date)
            .fetch_one(&mut *tx)
            .await?;
            created.push(row);
        }

        tx.commit().await?;
        info!(
            "Created {} fee line items for student {}",
            created.len(),
            student_id
        );
        Ok(created)
    }

    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, Payment>(
            "INSERT INTO payments (id, student_id, fee_line_item_id, amount, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, NOW()) \
             RETURNING id, student_id, fee_line_item_id, amount, status, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(payment.student_id)
        .bind(payment.fee_line_item_id)
        .bind(payment.amount)
        .bind(payment.status)
        .fetch_one(&mut *tx)
        .await?;

        if row.status == PaymentStatus::Completed {
            let item_amount: Option<Decimal> = sqlx::query_scalar(
                "SELECT amount FROM fee_line_items WHERE id = $1 FOR UPDATE",
            )
            .bind(row.fee_line_item_id)
            .fetch_optional(&mut *tx)
            .await?;

            if let Some(item_amount) = item_amount {
                let paid: Option<Decimal> = sqlx::query_scalar(
                    "SELECT SUM(amount) FROM payments \
                     WHERE fee_line_item_id = $1 AND status = 'COMPLETED'",
                )
                .bind(row.fee_line_item_id)
                .fetch_one(&mut *tx)
                .await?;

                if paid.unwrap_or_default() >= item_amount {
                    sqlx::query("UPDATE fee_line_items SET is_paid = TRUE WHERE id = $1")
                        .bind(row.fee_line_item_id)
                        .execute(&mut *tx)
                        .await?;
                }
            }
        }

        tx.commit().await?;
        Ok(row)
    }

    async fn payments_for_student(&self, student_id: Uuid) -> Result<Vec<Payment>, StoreError> {
        let rows = sqlx::query_as::<_, Payment>(
            "SELECT id, student_id, fee_line_item_id, amount, status, created_at \
             FROM payments WHERE student_id = $1 ORDER BY created_at",
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn active_enrollments(&self, student_id: Uuid) -> Result<Vec<Enrollment>, StoreError> {
        let rows = sqlx::query_as::<_, Enrollment>(
            "SELECT id, student_id, course_id, status, enrollment_date \
             FROM enrollments WHERE student_id = $1 AND status = 'ACTIVE'",
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn enrollment(
        &self,
        student_id: Uuid,
        course_id: Uuid,
    ) -> Result<Option<Enrollment>, StoreError> {
        let row = sqlx::query_as::<_, Enrollment>(
            "SELECT id, student_id, course_id, status, enrollment_date \
             FROM enrollments WHERE student_id = $1 AND course_id = $2 \
             ORDER BY enrollment_date DESC LIMIT 1",
        )
        .bind(student_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_registration(
        &self,
        student_id: Uuid,
        enrollments: Vec<NewEnrollment>,
        records: Vec<NewAcademicRecord>,
    ) -> Result<Vec<Enrollment>, StoreError> {
        let mut tx = self.pool.begin().await?;

        // 1. Lock the student row so concurrent registrations serialize.
        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM students WHERE id = $1 FOR UPDATE")
                .bind(student_id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(StoreError::Backend(format!(
                "student {student_id} does not exist"
            )));
        }

        // 2. Active-set check; the partial unique index is the backstop.
        let active: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM enrollments WHERE student_id = $1 AND status = 'ACTIVE' LIMIT 1",
        )
        .bind(student_id)
        .fetch_optional(&mut *tx)
        .await?;
        if active.is_some() {
            return Err(StoreError::Conflict("enrollments_active"));
        }

        // 3. Insert enrollments.
        let mut created = Vec::with_capacity(enrollments.len());
        for draft in enrollments {
            let row = sqlx::query_as::<_, Enrollment>(
                "INSERT INTO enrollments (id, student_id, course_id, status, enrollment_date) \
                 VALUES ($1, $2, $3, 'ACTIVE', NOW()) \
                 RETURNING id, student_id, course_id, status, enrollment_date",
            )
            .bind(Uuid::new_v4())
            .bind(draft.student_id)
            .bind(draft.course_id)
            .fetch_one(&mut *tx)
            .await?;
            created.push(row);
        }

        // 4. Insert academic records that do not exist for the key yet.
        for draft in records {
            let exists: Option<Uuid> = sqlx::query_scalar(
                "SELECT id FROM academic_records \
                 WHERE student_id = $1 AND course_id = $2 AND semester = $3 AND academic_year = $4",
            )
            .bind(draft.student_id)
            .bind(draft.course_id)
            .bind(&draft.semester)
            .bind(&draft.academic_year)
            .fetch_optional(&mut *tx)
            .await?;

            if exists.is_none() {
                sqlx::query(
                    "INSERT INTO academic_records \
                     (id, student_id, course_id, semester, academic_year, grade, points, status) \
                     VALUES ($1, $2, $3, $4, $5, NULL, NULL, 'INPROGRESS')",
                )
                .bind(Uuid::new_v4())
                .bind(draft.student_id)
                .bind(draft.course_id)
                .bind(&draft.semester)
                .bind(&draft.academic_year)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        info!(
            "Registered student {} on {} courses",
            student_id,
            created.len()
        );
        Ok(created)
    }

    async fn set_enrollment_status(
        &self,
        enrollment_id: Uuid,
        status: EnrollmentStatus,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE enrollments SET status = $1 WHERE id = $2")
            .bind(status)
            .bind(enrollment_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Backend(format!(
                "enrollment {enrollment_id} does not exist"
            )));
        }
        Ok(())
    }

    async fn academic_records(&self, student_id: Uuid) -> Result<Vec<AcademicRecord>, StoreError> {
        let rows = sqlx::query_as::<_, AcademicRecord>(
            "SELECT id, student_id, course_id, semester, academic_year, grade, points, status \
             FROM academic_records WHERE student_id = $1",
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn upsert_academic_record(
        &self,
        upsert: GradeUpsert,
    ) -> Result<GradeOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        // 1. Read the current record by composite key, locking it if present.
        let existing: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM academic_records \
             WHERE student_id = $1 AND course_id = $2 AND semester = $3 AND academic_year = $4 \
             FOR UPDATE",
        )
        .bind(upsert.student_id)
        .bind(upsert.course_id)
        .bind(&upsert.semester)
        .bind(&upsert.academic_year)
        .fetch_optional(&mut *tx)
        .await?;

        // 2. Overwrite or insert; the unique key makes a re-submit an
        //    overwrite, never a duplicate row.
        let (record, created) = match existing {
            Some(id) => {
                let record = sqlx::query_as::<_, AcademicRecord>(
                    "UPDATE academic_records \
                     SET grade = $1, points = $2, status = 'COMPLETED' \
                     WHERE id = $3 \
                     RETURNING id, student_id, course_id, semester, academic_year, grade, points, status",
                )
                .bind(&upsert.grade)
                .bind(upsert.points)
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
                (record, false)
            }
            None => {
                let record = sqlx::query_as::<_, AcademicRecord>(
                    "INSERT INTO academic_records \
                     (id, student_id, course_id, semester, academic_year, grade, points, status) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, 'COMPLETED') \
                     RETURNING id, student_id, course_id, semester, academic_year, grade, points, status",
                )
                .bind(Uuid::new_v4())
                .bind(upsert.student_id)
                .bind(upsert.course_id)
                .bind(&upsert.semester)
                .bind(&upsert.academic_year)
                .bind(&upsert.grade)
                .bind(upsert.points)
                .fetch_one(&mut *tx)
                .await?;
                (record, true)
            }
        };

        // 3. Transition an ACTIVE enrollment for the pair, if any.
        let transitioned = sqlx::query(
            "UPDATE enrollments SET status = 'COMPLETED' \
             WHERE student_id = $1 AND course_id = $2 AND status = 'ACTIVE'",
        )
        .bind(upsert.student_id)
        .bind(upsert.course_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(GradeOutcome {
            record,
            created,
            enrollment_completed: transitioned.rows_affected() > 0,
        })
    }

    async fn timetable_for(
        &self,
        day: Weekday,
        room: &str,
    ) -> Result<Vec<TimetableEntry>, StoreError> {
        let rows = sqlx::query_as::<_, TimetableRow>(
            "SELECT id, course_id, day_of_week, start_time, end_time, room, class_type \
             FROM timetable_entries WHERE day_of_week = $1 AND room = $2 ORDER BY start_time",
        )
        .bind(weekday_to_db(day))
        .bind(room)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(TimetableEntry::from).collect())
    }

    async fn timetable_entry(&self, id: Uuid) -> Result<Option<TimetableEntry>, StoreError> {
        let row = sqlx::query_as::<_, TimetableRow>(
            "SELECT id, course_id, day_of_week, start_time, end_time, room, class_type \
             FROM timetable_entries WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(TimetableEntry::from))
    }

    async fn insert_timetable_entry(
        &self,
        draft: TimetableEntryDraft,
    ) -> Result<TimetableEntry, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Serialize placements per (day, room) so the overlap scan and the
        // insert are one unit.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(format!("{}:{}", draft.room, weekday_to_db(draft.day_of_week)))
            .execute(&mut *tx)
            .await?;

        if overlapping_entry(&mut tx, &draft, None).await?.is_some() {
            return Err(StoreError::Conflict("timetable_overlap"));
        }

        let row = sqlx::query_as::<_, TimetableRow>(
            "INSERT INTO timetable_entries \
             (id, course_id, day_of_week, start_time, end_time, room, class_type) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id, course_id, day_of_week, start_time, end_time, room, class_type",
        )
        .bind(Uuid::new_v4())
        .bind(draft.course_id)
        .bind(weekday_to_db(draft.day_of_week))
        .bind(draft.start_time)
        .bind(draft.end_time)
        .bind(&draft.room)
        .bind(draft.class_type)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(TimetableEntry::from(row))
    }

    async fn replace_timetable_entry(
        &self,
        id: Uuid,
        draft: TimetableEntryDraft,
    ) -> Result<TimetableEntry, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(format!("{}:{}", draft.room, weekday_to_db(draft.day_of_week)))
            .execute(&mut *tx)
            .await?;

        if overlapping_entry(&mut tx, &draft, Some(id)).await?.is_some() {
            return Err(StoreError::Conflict("timetable_overlap"));
        }

        let row = sqlx::query_as::<_, TimetableRow>(
            "UPDATE timetable_entries \
             SET course_id = $1, day_of_week = $2, start_time = $3, end_time = $4, room = $5, class_type = $6 \
             WHERE id = $7 \
             RETURNING id, course_id, day_of_week, start_time, end_time, room, class_type",
        )
        .bind(draft.course_id)
        .bind(weekday_to_db(draft.day_of_week))
        .bind(draft.start_time)
        .bind(draft.end_time)
        .bind(&draft.room)
        .bind(draft.class_type)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::Backend(format!("timetable entry {id} does not exist")))?;

        tx.commit().await?;
        Ok(TimetableEntry::from(row))
    }
}
