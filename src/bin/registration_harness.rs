//! End-to-end smoke harness for the academic engine
//!
//! Seeds an in-memory store with one IT student, a registration window and
//! a course catalogue, then walks the full admission-to-grades path:
//! fee schedule, tuition payment, eligibility, registration, timetabling,
//! grading and GPA.

use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, NaiveTime, Utc, Weekday};
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use acadops::engine::AcademicEngine;
use acadops::models::{
    ClassType, Course, FeeComponent, PaymentStatus, Programme, RegistrationPeriod, Student, Term,
};
use acadops::store::{AcademicStore, MemoryStore, TimetableEntryDraft};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let store = Arc::new(MemoryStore::new());
    let engine = AcademicEngine::with_defaults(store.clone());
    let term = Term::new("2025/2026", "SEMESTER 1");

    // Seed reference data.
    store
        .insert_programme(Programme {
            id: Uuid::new_v4(),
            code: "BIT".into(),
            name: "BACHELOR OF SCIENCE (INFORMATION TECHNOLOGY)".into(),
            department: "Computing".into(),
            min_admission_grade: "C+".into(),
        })
        .await?;

    let student = Student {
        id: Uuid::new_v4(),
        reg_no: "IT/2025/0412".into(),
        full_name: "Amina Okafor".into(),
        programme_name: "BACHELOR OF SCIENCE (INFORMATION TECHNOLOGY)".into(),
        level: "100".into(),
        department: "Computing".into(),
    };
    store.insert_student(student.clone()).await?;

    if let Some(programme) = store.programme_by_name(&student.programme_name).await? {
        info!(
            "Admitted {} into {} (minimum grade {})",
            student.full_name, programme.name, programme.min_admission_grade
        );
    }

    let now = Utc::now();
    store
        .insert_registration_period(RegistrationPeriod {
            id: Uuid::new_v4(),
            academic_year: term.academic_year.clone(),
            semester: term.semester.clone(),
            level: None,
            department: None,
            start_date: now - Duration::days(3),
            end_date: now + Duration::days(14),
            is_active: true,
        })
        .await?;

    let mut course_ids = Vec::new();
    for (code, title, credits) in [
        ("IT101", "Introduction to Programming", 4),
        ("IT102", "Discrete Structures", 3),
        ("IT103", "Computer Organization", 3),
        ("IT104", "Communication Skills", 2),
        ("IT105", "Calculus I", 3),
    ] {
        let course = Course {
            id: Uuid::new_v4(),
            code: code.into(),
            title: title.into(),
            credits,
            department: "Computing".into(),
            is_active: true,
        };
        course_ids.push(course.id);
        store.insert_course(course).await?;
    }

    // 1. Fee schedule from the programme template.
    let items = engine
        .create_schedule_fees(student.id, &student.programme_name)
        .await?;
    let billed: Decimal = items.iter().map(|i| i.amount).sum();
    info!("Billed {} across {} line items", billed, items.len());

    // 2. Pay half the tuition; the gate's clearance threshold.
    let tuition = items
        .iter()
        .find(|i| i.description == FeeComponent::Tuition.description())
        .expect("tuition line item");
    engine
        .record_payment(
            student.id,
            tuition.id,
            Decimal::new(9000, 0),
            PaymentStatus::Completed,
        )
        .await?;

    let decision = engine.can_register(student.id, &term).await?;
    info!(
        "Eligibility: allowed={} reason={:?} outstanding={}",
        decision.allowed, decision.reason, decision.outstanding
    );

    // 3. Register the full first-year load.
    let enrollments = engine.register(student.id, &course_ids, &term).await?;
    info!("Created {} enrollments", enrollments.len());

    // 4. Place two classes; the second attempt demonstrates the detector.
    let draft = TimetableEntryDraft {
        course_id: course_ids[0],
        day_of_week: Weekday::Mon,
        start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        room: "LT-1".into(),
        class_type: ClassType::Lecture,
    };
    engine.place(draft.clone()).await?;
    let clash = engine
        .place(TimetableEntryDraft {
            course_id: course_ids[1],
            start_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
            ..draft
        })
        .await;
    info!("Overlapping placement rejected: {}", clash.unwrap_err());

    // 5. Grade two courses and report GPA.
    for (course_id, grade, points) in [(course_ids[0], "A", 4.0), (course_ids[1], "B", 3.0)] {
        engine
            .record_grade(acadops::store::GradeUpsert {
                student_id: student.id,
                course_id,
                semester: term.semester.clone(),
                academic_year: term.academic_year.clone(),
                grade: grade.into(),
                points: Some(points),
            })
            .await?;
    }
    let summary = engine.compute_gpa(student.id).await?;
    info!(
        "GPA {:.2} over {} credits",
        summary.gpa, summary.total_credits
    );

    Ok(())
}
