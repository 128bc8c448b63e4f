//! Shared seeding helpers for the engine scenario tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use acadops::config::FeeScheduleBook;
use acadops::engine::AcademicEngine;
use acadops::models::{Course, Notification, RegistrationPeriod, Student, Term};
use acadops::notify::NotificationSink;
use acadops::store::{AcademicStore, MemoryStore};

pub const IT_PROGRAMME: &str = "BACHELOR OF SCIENCE (INFORMATION TECHNOLOGY)";

/// Sink that records deliveries for assertions.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    delivered: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn delivered(&self) -> Vec<Notification> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    async fn deliver(&self, notification: Notification) -> anyhow::Result<()> {
        self.delivered.lock().unwrap().push(notification);
        Ok(())
    }
}

pub struct TestContext {
    pub engine: AcademicEngine,
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub term: Term,
    pub student: Student,
}

/// Engine over a fresh memory store with one seeded IT student. No
/// registration period is open yet.
pub async fn context() -> TestContext {
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = AcademicEngine::new(
        store.clone(),
        FeeScheduleBook::builtin(),
        notifier.clone(),
    );

    let student = Student {
        id: Uuid::new_v4(),
        reg_no: "IT/2025/0001".into(),
        full_name: "Test Student".into(),
        programme_name: IT_PROGRAMME.into(),
        level: "100".into(),
        department: "Computing".into(),
    };
    store
        .insert_student(student.clone())
        .await
        .expect("seed student");

    TestContext {
        engine,
        store,
        notifier,
        term: Term::new("2025/2026", "SEMESTER 1"),
        student,
    }
}

/// Like [`context`], with an unrestricted open period covering now.
pub async fn context_with_open_period() -> TestContext {
    let ctx = context().await;
    open_period(&ctx.store, &ctx.term).await;
    ctx
}

pub async fn open_period(store: &MemoryStore, term: &Term) {
    let now = Utc::now();
    store
        .insert_registration_period(RegistrationPeriod {
            id: Uuid::new_v4(),
            academic_year: term.academic_year.clone(),
            semester: term.semester.clone(),
            level: None,
            department: None,
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(14),
            is_active: true,
        })
        .await
        .expect("seed period");
}

pub async fn seed_course(store: &MemoryStore, code: &str, credits: i32) -> Course {
    let course = Course {
        id: Uuid::new_v4(),
        code: code.into(),
        title: format!("Course {code}"),
        credits,
        department: "Computing".into(),
        is_active: true,
    };
    store
        .insert_course(course.clone())
        .await
        .expect("seed course");
    course
}

/// Seed one active course per credit value; returns their ids in order.
pub async fn seed_courses(store: &MemoryStore, credits: &[i32]) -> Vec<Uuid> {
    let mut ids = Vec::with_capacity(credits.len());
    for (i, &c) in credits.iter().enumerate() {
        ids.push(seed_course(store, &format!("C{i:03}"), c).await.id);
    }
    ids
}
