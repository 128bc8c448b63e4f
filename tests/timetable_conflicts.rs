//! Timetable placement scenarios: half-open overlap semantics, room/day
//! scoping, and update self-exclusion.

mod helpers;

use helpers::{context_with_open_period, seed_course};

use acadops::error::EngineError;
use acadops::models::ClassType;
use acadops::store::TimetableEntryDraft;
use chrono::{NaiveTime, Weekday};

fn at(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn draft(
    course_id: uuid::Uuid,
    day: Weekday,
    start: NaiveTime,
    end: NaiveTime,
    room: &str,
) -> TimetableEntryDraft {
    TimetableEntryDraft {
        course_id,
        day_of_week: day,
        start_time: start,
        end_time: end,
        room: room.into(),
        class_type: ClassType::Lecture,
    }
}

#[tokio::test]
async fn back_to_back_placements_share_a_room() {
    let ctx = context_with_open_period().await;
    let course = seed_course(&ctx.store, "CS110", 3).await;

    ctx.engine
        .place(draft(course.id, Weekday::Mon, at(9, 0), at(10, 0), "LT-1"))
        .await
        .expect("first placement");
    ctx.engine
        .place(draft(course.id, Weekday::Mon, at(10, 0), at(11, 0), "LT-1"))
        .await
        .expect("back-to-back placement does not overlap");
}

#[tokio::test]
async fn overlapping_placement_names_the_colliding_entry() {
    let ctx = context_with_open_period().await;
    let course = seed_course(&ctx.store, "CS111", 3).await;

    let first = ctx
        .engine
        .place(draft(course.id, Weekday::Mon, at(9, 0), at(10, 0), "LT-1"))
        .await
        .unwrap();

    let err = ctx
        .engine
        .place(draft(course.id, Weekday::Mon, at(9, 30), at(10, 30), "LT-1"))
        .await
        .expect_err("overlap in the same room and day");
    match err {
        EngineError::ScheduleConflict {
            existing_id, room, ..
        } => {
            assert_eq!(existing_id, first.id);
            assert_eq!(room, "LT-1");
        }
        other => panic!("expected ScheduleConflict, got {other:?}"),
    }
}

#[tokio::test]
async fn different_rooms_and_days_never_conflict() {
    let ctx = context_with_open_period().await;
    let course = seed_course(&ctx.store, "CS112", 3).await;

    ctx.engine
        .place(draft(course.id, Weekday::Mon, at(9, 0), at(10, 0), "LT-1"))
        .await
        .unwrap();
    ctx.engine
        .place(draft(course.id, Weekday::Mon, at(9, 0), at(10, 0), "LT-2"))
        .await
        .expect("same window, different room");
    ctx.engine
        .place(draft(course.id, Weekday::Tue, at(9, 0), at(10, 0), "LT-1"))
        .await
        .expect("same window, different day");
}

#[tokio::test]
async fn inverted_and_empty_windows_are_rejected() {
    let ctx = context_with_open_period().await;
    let course = seed_course(&ctx.store, "CS113", 3).await;

    let err = ctx
        .engine
        .place(draft(course.id, Weekday::Mon, at(10, 0), at(9, 0), "LT-1"))
        .await
        .expect_err("inverted window");
    assert!(matches!(err, EngineError::InvalidTimeWindow));

    let err = ctx
        .engine
        .place(draft(course.id, Weekday::Mon, at(9, 0), at(9, 0), "LT-1"))
        .await
        .expect_err("empty window");
    assert!(matches!(err, EngineError::InvalidTimeWindow));
}

#[tokio::test]
async fn placement_requires_an_active_course() {
    let ctx = context_with_open_period().await;

    let err = ctx
        .engine
        .place(draft(
            uuid::Uuid::new_v4(),
            Weekday::Mon,
            at(9, 0),
            at(10, 0),
            "LT-1",
        ))
        .await
        .expect_err("unknown course");
    assert!(matches!(err, EngineError::InvalidCourse { .. }));
}

#[tokio::test]
async fn updates_exclude_the_entrys_own_slot() {
    let ctx = context_with_open_period().await;
    let course = seed_course(&ctx.store, "CS114", 3).await;

    let entry = ctx
        .engine
        .place(draft(course.id, Weekday::Mon, at(9, 0), at(10, 0), "LT-1"))
        .await
        .unwrap();
    let other = ctx
        .engine
        .place(draft(course.id, Weekday::Mon, at(11, 0), at(12, 0), "LT-1"))
        .await
        .unwrap();

    // Stretching inside its own old window is not a self-conflict.
    let updated = ctx
        .engine
        .update_placement(
            entry.id,
            draft(course.id, Weekday::Mon, at(9, 30), at(10, 30), "LT-1"),
        )
        .await
        .expect("update overlapping only itself");
    assert_eq!(updated.id, entry.id);
    assert_eq!(updated.start_time, at(9, 30));

    // Moving onto the other entry's window conflicts.
    let err = ctx
        .engine
        .update_placement(
            entry.id,
            draft(course.id, Weekday::Mon, at(11, 30), at(12, 30), "LT-1"),
        )
        .await
        .expect_err("collides with the other entry");
    match err {
        EngineError::ScheduleConflict { existing_id, .. } => assert_eq!(existing_id, other.id),
        other => panic!("expected ScheduleConflict, got {other:?}"),
    }
}

#[tokio::test]
async fn updating_a_missing_entry_is_not_found() {
    let ctx = context_with_open_period().await;
    let course = seed_course(&ctx.store, "CS115", 3).await;

    let err = ctx
        .engine
        .update_placement(
            uuid::Uuid::new_v4(),
            draft(course.id, Weekday::Mon, at(9, 0), at(10, 0), "LT-1"),
        )
        .await
        .expect_err("no such entry");
    assert!(matches!(err, EngineError::RecordNotFound { .. }));
}
