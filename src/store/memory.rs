//! In-memory store adapter
//!
//! Backs the test suites and the harness binary. A single async mutex over
//! the whole dataset makes every trait method (composite writes included)
//! trivially atomic, which is exactly the adapter contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc, Weekday};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    AcademicRecord, AcademicRecordStatus, Course, Enrollment, EnrollmentStatus, FeeLineItem,
    Payment, PaymentStatus, Programme, RegistrationPeriod, Student, Term, TimetableEntry,
};
use crate::store::{
    AcademicStore, GradeOutcome, GradeUpsert, NewAcademicRecord, NewEnrollment, NewFeeLineItem,
    NewPayment, TimetableEntryDraft,
};

#[derive(Debug, Default)]
struct Dataset {
    programmes: Vec<Programme>,
    students: Vec<Student>,
    courses: Vec<Course>,
    periods: Vec<RegistrationPeriod>,
    fee_line_items: Vec<FeeLineItem>,
    payments: Vec<Payment>,
    enrollments: Vec<Enrollment>,
    academic_records: Vec<AcademicRecord>,
    timetable: Vec<TimetableEntry>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<Dataset>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AcademicStore for MemoryStore {
    async fn insert_programme(&self, programme: Programme) -> Result<(), StoreError> {
        self.data.lock().await.programmes.push(programme);
        Ok(())
    }

    async fn programme_by_name(&self, name: &str) -> Result<Option<Programme>, StoreError> {
        let data = self.data.lock().await;
        Ok(data.programmes.iter().find(|p| p.name == name).cloned())
    }

    async fn insert_student(&self, student: Student) -> Result<(), StoreError> {
        self.data.lock().await.students.push(student);
        Ok(())
    }

    async fn student(&self, id: Uuid) -> Result<Option<Student>, StoreError> {
        let data = self.data.lock().await;
        Ok(data.students.iter().find(|s| s.id == id).cloned())
    }

    async fn insert_course(&self, course: Course) -> Result<(), StoreError> {
        self.data.lock().await.courses.push(course);
        Ok(())
    }

    async fn course(&self, id: Uuid) -> Result<Option<Course>, StoreError> {
        let data = self.data.lock().await;
        Ok(data.courses.iter().find(|c| c.id == id).cloned())
    }

    async fn insert_registration_period(
        &self,
        period: RegistrationPeriod,
    ) -> Result<(), StoreError> {
        self.data.lock().await.periods.push(period);
        Ok(())
    }

    async fn matching_period(
        &self,
        term: &Term,
        level: &str,
        department: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RegistrationPeriod>, StoreError> {
        let data = self.data.lock().await;
        Ok(data
            .periods
            .iter()
            .find(|p| p.covers(term, level, department, now))
            .cloned())
    }

    async fn fee_line_items(&self, student_id: Uuid) -> Result<Vec<FeeLineItem>, StoreError> {
        let data = self.data.lock().await;
        Ok(data
            .fee_line_items
            .iter()
            .filter(|item| item.student_id == student_id)
            .cloned()
            .collect())
    }

    async fn fee_line_item(&self, id: Uuid) -> Result<Option<FeeLineItem>, StoreError> {
        let data = self.data.lock().await;
        Ok(data.fee_line_items.iter().find(|i| i.id == id).cloned())
    }

    async fn create_fee_schedule(
        &self,
        student_id: Uuid,
        items: Vec<NewFeeLineItem>,
    ) -> Result<Vec<FeeLineItem>, StoreError> {
        let mut data = self.data.lock().await;
        if data
            .fee_line_items
            .iter()
            .any(|item| item.student_id == student_id)
        {
            return Err(StoreError::Conflict("fee_line_items"));
        }

        let mut created = Vec::with_capacity(items.len());
        for draft in items {
            let item = FeeLineItem {
                id: Uuid::new_v4(),
                student_id: draft.student_id,
                amount: draft.amount,
                description: draft.description,
                due_date: draft.due_date,
                is_paid: false,
            };
            data.fee_line_items.push(item.clone());
            created.push(item);
        }
        Ok(created)
    }

    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, StoreError> {
        let mut data = self.data.lock().await;
        let row = Payment {
            id: Uuid::new_v4(),
            student_id: payment.student_id,
            fee_line_item_id: payment.fee_line_item_id,
            amount: payment.amount,
            status: payment.status,
            created_at: Utc::now(),
        };
        data.payments.push(row.clone());

        if row.status == PaymentStatus::Completed {
            let paid: rust_decimal::Decimal = data
                .payments
                .iter()
                .filter(|p| {
                    p.fee_line_item_id == row.fee_line_item_id
                        && p.status == PaymentStatus::Completed
                })
                .map(|p| p.amount)
                .sum();
            if let Some(item) = data
                .fee_line_items
                .iter_mut()
                .find(|i| i.id == row.fee_line_item_id)
            {
                if paid >= item.amount {
                    item.is_paid = true;
                }
            }
        }
        Ok(row)
    }

    async fn payments_for_student(&self, student_id: Uuid) -> Result<Vec<Payment>, StoreError> {
        let data = self.data.lock().await;
        Ok(data
            .payments
            .iter()
            .filter(|p| p.student_id == student_id)
            .cloned()
            .collect())
    }

    async fn active_enrollments(&self, student_id: Uuid) -> Result<Vec<Enrollment>, StoreError> {
        let data = self.data.lock().await;
        Ok(data
            .enrollments
            .iter()
            .filter(|e| e.student_id == student_id && e.status == EnrollmentStatus::Active)
            .cloned()
            .collect())
    }

    async fn enrollment(
        &self,
        student_id: Uuid,
        course_id: Uuid,
    ) -> Result<Option<Enrollment>, StoreError> {
        let data = self.data.lock().await;
        Ok(data
            .enrollments
            .iter()
            .filter(|e| e.student_id == student_id && e.course_id == course_id)
            .max_by_key(|e| e.enrollment_date)
            .cloned())
    }

    async fn insert_registration(
        &self,
        student_id: Uuid,
        enrollments: Vec<NewEnrollment>,
        records: Vec<NewAcademicRecord>,
    ) -> Result<Vec<Enrollment>, StoreError> {
        let mut data = self.data.lock().await;
        if data
            .enrollments
            .iter()
            .any(|e| e.student_id == student_id && e.status == EnrollmentStatus::Active)
        {
            return Err(StoreError::Conflict("enrollments_active"));
        }

        let now = Utc::now();
        let mut created = Vec::with_capacity(enrollments.len());
        for draft in enrollments {
            let row = Enrollment {
                id: Uuid::new_v4(),
                student_id: draft.student_id,
                course_id: draft.course_id,
                status: EnrollmentStatus::Active,
                enrollment_date: now,
            };
            data.enrollments.push(row.clone());
            created.push(row);
        }

        for draft in records {
            let exists = data.academic_records.iter().any(|r| {
                r.student_id == draft.student_id
                    && r.course_id == draft.course_id
                    && r.semester == draft.semester
                    && r.academic_year == draft.academic_year
            });
            if !exists {
                data.academic_records.push(AcademicRecord {
                    id: Uuid::new_v4(),
                    student_id: draft.student_id,
                    course_id: draft.course_id,
                    semester: draft.semester,
                    academic_year: draft.academic_year,
                    grade: None,
                    points: None,
                    status: AcademicRecordStatus::InProgress,
                });
            }
        }
        Ok(created)
    }

    async fn set_enrollment_status(
        &self,
        enrollment_id: Uuid,
        status: EnrollmentStatus,
    ) -> Result<(), StoreError> {
        let mut data = self.data.lock().await;
        match data.enrollments.iter_mut().find(|e| e.id == enrollment_id) {
            Some(enrollment) => {
                enrollment.status = status;
                Ok(())
            }
            None => Err(StoreError::Backend(format!(
                "enrollment {enrollment_id} does not exist"
            ))),
        }
    }

    async fn academic_records(&self, student_id: Uuid) -> Result<Vec<AcademicRecord>, StoreError> {
        let data = self.data.lock().await;
        Ok(data
            .academic_records
            .iter()
            .filter(|r| r.student_id == student_id)
            .cloned()
            .collect())
    }

    async fn upsert_academic_record(
        &self,
        upsert: GradeUpsert,
    ) -> Result<GradeOutcome, StoreError> {
        let mut data = self.data.lock().await;

        let existing = data.academic_records.iter_mut().find(|r| {
            r.student_id == upsert.student_id
                && r.course_id == upsert.course_id
                && r.semester == upsert.semester
                && r.academic_year == upsert.academic_year
        });

        let (record, created) = match existing {
            Some(record) => {
                record.grade = Some(upsert.grade.clone());
                record.points = upsert.points;
                record.status = AcademicRecordStatus::Completed;
                (record.clone(), false)
            }
            None => {
                let record = AcademicRecord {
                    id: Uuid::new_v4(),
                    student_id: upsert.student_id,
                    course_id: upsert.course_id,
                    semester: upsert.semester.clone(),
                    academic_year: upsert.academic_year.clone(),
                    grade: Some(upsert.grade.clone()),
                    points: upsert.points,
                    status: AcademicRecordStatus::Completed,
                };
                data.academic_records.push(record.clone());
                (record, true)
            }
        };

        let mut enrollment_completed = false;
        if let Some(enrollment) = data.enrollments.iter_mut().find(|e| {
            e.student_id == upsert.student_id
                && e.course_id == upsert.course_id
                && e.status == EnrollmentStatus::Active
        }) {
            enrollment.status = EnrollmentStatus::Completed;
            enrollment_completed = true;
        }

        Ok(GradeOutcome {
            record,
            created,
            enrollment_completed,
        })
    }

    async fn timetable_for(
        &self,
        day: Weekday,
        room: &str,
    ) -> Result<Vec<TimetableEntry>, StoreError> {
        let data = self.data.lock().await;
        Ok(data
            .timetable
            .iter()
            .filter(|e| e.day_of_week == day && e.room == room)
            .cloned()
            .collect())
    }

    async fn timetable_entry(&self, id: Uuid) -> Result<Option<TimetableEntry>, StoreError> {
        let data = self.data.lock().await;
        Ok(data.timetable.iter().find(|e| e.id == id).cloned())
    }

    async fn insert_timetable_entry(
        &self,
        draft: TimetableEntryDraft,
    ) -> Result<TimetableEntry, StoreError> {
        let mut data = self.data.lock().await;
        if overlap_exists(&data.timetable, &draft, None) {
            return Err(StoreError::Conflict("timetable_overlap"));
        }

        let entry = TimetableEntry {
            id: Uuid::new_v4(),
            course_id: draft.course_id,
            day_of_week: draft.day_of_week,
            start_time: draft.start_time,
            end_time: draft.end_time,
            room: draft.room,
            class_type: draft.class_type,
        };
        data.timetable.push(entry.clone());
        Ok(entry)
    }

    async fn replace_timetable_entry(
        &self,
        id: Uuid,
        draft: TimetableEntryDraft,
    ) -> Result<TimetableEntry, StoreError> {
        let mut data = self.data.lock().await;
        if overlap_exists(&data.timetable, &draft, Some(id)) {
            return Err(StoreError::Conflict("timetable_overlap"));
        }

        match data.timetable.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.course_id = draft.course_id;
                entry.day_of_week = draft.day_of_week;
                entry.start_time = draft.start_time;
                entry.end_time = draft.end_time;
                entry.room = draft.room;
                entry.class_type = draft.class_type;
                Ok(entry.clone())
            }
            None => Err(StoreError::Backend(format!(
                "timetable entry {id} does not exist"
            ))),
        }
    }
}

fn overlap_exists(
    timetable: &[TimetableEntry],
    draft: &TimetableEntryDraft,
    exclude: Option<Uuid>,
) -> bool {
    timetable
        .iter()
        .filter(|e| exclude != Some(e.id))
        .any(|e| e.conflicts_with(draft.day_of_week, &draft.room, draft.start_time, draft.end_time))
}
