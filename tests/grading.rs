//! Grade aggregation scenarios: idempotent upserts, enrollment transitions,
//! GPA arithmetic and the per-term breakdown.

mod helpers;

use helpers::{context_with_open_period, seed_course, TestContext, IT_PROGRAMME};

use acadops::error::EngineError;
use acadops::models::{EnrollmentStatus, FeeComponent, PaymentStatus, Term};
use acadops::store::{AcademicStore, GradeUpsert};
use rust_decimal::Decimal;

fn upsert(ctx: &TestContext, course_id: uuid::Uuid, grade: &str, points: f64) -> GradeUpsert {
    GradeUpsert {
        student_id: ctx.student.id,
        course_id,
        semester: ctx.term.semester.clone(),
        academic_year: ctx.term.academic_year.clone(),
        grade: grade.into(),
        points: Some(points),
    }
}

/// Fund the student and register them on the given courses.
async fn register_on(ctx: &TestContext, course_ids: &[uuid::Uuid]) {
    let items = ctx
        .engine
        .create_schedule_fees(ctx.student.id, IT_PROGRAMME)
        .await
        .expect("fee schedule");
    let tuition = items
        .iter()
        .find(|i| i.description == FeeComponent::Tuition.description())
        .unwrap();
    ctx.engine
        .record_payment(
            ctx.student.id,
            tuition.id,
            Decimal::new(9000, 0),
            PaymentStatus::Completed,
        )
        .await
        .expect("payment");
    ctx.engine
        .register(ctx.student.id, course_ids, &ctx.term)
        .await
        .expect("registration");
}

#[tokio::test]
async fn grade_upsert_is_idempotent_and_transitions_once() {
    let ctx = context_with_open_period().await;
    let a = seed_course(&ctx.store, "CS101", 4).await;
    let b = seed_course(&ctx.store, "CS102", 4).await;
    let c = seed_course(&ctx.store, "CS103", 4).await;
    register_on(&ctx, &[a.id, b.id, c.id]).await;

    let first = ctx
        .engine
        .record_grade(upsert(&ctx, a.id, "A", 4.0))
        .await
        .expect("first grade write");
    assert!(!first.created, "registration already created the record");
    assert!(first.enrollment_completed, "first write completes the seat");

    let second = ctx
        .engine
        .record_grade(upsert(&ctx, a.id, "A", 4.0))
        .await
        .expect("identical re-submit");
    assert!(!second.created);
    assert!(
        !second.enrollment_completed,
        "the transition happens exactly once"
    );
    assert_eq!(second.record.id, first.record.id, "no duplicate row");

    // Exactly one record for the course, graded.
    let records = ctx.store.academic_records(ctx.student.id).await.unwrap();
    let for_course: Vec<_> = records.iter().filter(|r| r.course_id == a.id).collect();
    assert_eq!(for_course.len(), 1);
    assert_eq!(for_course[0].grade.as_deref(), Some("A"));

    let enrollment = ctx.store.enrollment(ctx.student.id, a.id).await.unwrap().unwrap();
    assert_eq!(enrollment.status, EnrollmentStatus::Completed);
}

#[tokio::test]
async fn grading_without_an_enrollment_still_upserts_the_record() {
    let ctx = context_with_open_period().await;
    let course = seed_course(&ctx.store, "CS201", 3).await;

    let outcome = ctx
        .engine
        .record_grade(upsert(&ctx, course.id, "B+", 3.5))
        .await
        .expect("standalone grade record");
    assert!(outcome.created);
    assert!(!outcome.enrollment_completed);
}

#[tokio::test]
async fn grading_rejects_unknown_students_and_courses() {
    let ctx = context_with_open_period().await;
    let course = seed_course(&ctx.store, "CS202", 3).await;

    let mut bad_student = upsert(&ctx, course.id, "A", 4.0);
    bad_student.student_id = uuid::Uuid::new_v4();
    let err = ctx.engine.record_grade(bad_student).await.unwrap_err();
    assert!(matches!(err, EngineError::RecordNotFound { .. }));

    let bad_course = upsert(&ctx, uuid::Uuid::new_v4(), "A", 4.0);
    let err = ctx.engine.record_grade(bad_course).await.unwrap_err();
    assert!(matches!(err, EngineError::RecordNotFound { .. }));
}

#[tokio::test]
async fn gpa_defaults_to_zero_for_an_ungraded_student() {
    let ctx = context_with_open_period().await;
    let summary = ctx.engine.compute_gpa(ctx.student.id).await.unwrap();
    assert_eq!(summary.gpa, 0.0);
    assert_eq!(summary.total_credits, 0);
}

#[tokio::test]
async fn gpa_is_the_credit_weighted_mean() {
    let ctx = context_with_open_period().await;
    let four = seed_course(&ctx.store, "CS301", 4).await;
    let three = seed_course(&ctx.store, "CS302", 3).await;

    ctx.engine
        .record_grade(upsert(&ctx, four.id, "A", 4.0))
        .await
        .unwrap();
    ctx.engine
        .record_grade(upsert(&ctx, three.id, "B", 3.0))
        .await
        .unwrap();

    let summary = ctx.engine.compute_gpa(ctx.student.id).await.unwrap();
    assert_eq!(summary.total_credits, 7);
    // (4*4 + 3*3) / 7
    assert!((summary.gpa - 25.0 / 7.0).abs() < 1e-9);
}

#[tokio::test]
async fn ungraded_records_do_not_contribute() {
    let ctx = context_with_open_period().await;
    let a = seed_course(&ctx.store, "CS401", 4).await;
    let b = seed_course(&ctx.store, "CS402", 4).await;
    let c = seed_course(&ctx.store, "CS403", 4).await;
    register_on(&ctx, &[a.id, b.id, c.id]).await;

    // Only one of the three registered courses is graded.
    ctx.engine
        .record_grade(upsert(&ctx, a.id, "A", 4.0))
        .await
        .unwrap();

    let summary = ctx.engine.compute_gpa(ctx.student.id).await.unwrap();
    assert_eq!(summary.total_credits, 4);
    assert!((summary.gpa - 4.0).abs() < 1e-9);
}

#[tokio::test]
async fn breakdown_groups_by_term_with_the_same_formula() {
    let ctx = context_with_open_period().await;
    let a = seed_course(&ctx.store, "CS501", 4).await;
    let b = seed_course(&ctx.store, "CS502", 3).await;

    // One course in each of two terms.
    ctx.engine
        .record_grade(upsert(&ctx, a.id, "A", 4.0))
        .await
        .unwrap();
    let mut later = upsert(&ctx, b.id, "B", 3.0);
    later.semester = "SEMESTER 2".into();
    ctx.engine.record_grade(later).await.unwrap();

    let breakdown = ctx.engine.gpa_breakdown(ctx.student.id).await.unwrap();
    assert_eq!(breakdown.terms.len(), 2);

    let first = &breakdown.terms[0];
    assert_eq!(first.term, Term::new("2025/2026", "SEMESTER 1"));
    assert_eq!(first.credits, 4);
    assert!((first.gpa - 4.0).abs() < 1e-9);

    let second = &breakdown.terms[1];
    assert_eq!(second.term, Term::new("2025/2026", "SEMESTER 2"));
    assert_eq!(second.credits, 3);
    assert!((second.gpa - 3.0).abs() < 1e-9);

    assert_eq!(breakdown.cumulative.total_credits, 7);
    assert!((breakdown.cumulative.gpa - 25.0 / 7.0).abs() < 1e-9);
}

#[tokio::test]
async fn grade_writes_notify_the_student() {
    let ctx = context_with_open_period().await;
    let course = seed_course(&ctx.store, "CS601", 3).await;

    ctx.engine
        .record_grade(upsert(&ctx, course.id, "A", 4.0))
        .await
        .unwrap();

    let delivered = ctx.notifier.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].student_id, ctx.student.id);
    assert_eq!(delivered[0].title, "Grade Published");
}
