//! Timetable Conflict Detector
//!
//! Two entries conflict iff they share day and room and their half-open
//! [start, end) windows overlap. Back-to-back classes never conflict.
//! The engine pre-scans so the caller gets a conflict error naming the
//! colliding entry; the store's atomic insert is the race backstop.

use tracing::info;
use uuid::Uuid;

use crate::engine::AcademicEngine;
use crate::error::{EngineError, EngineResult, StoreError};
use crate::models::TimetableEntry;
use crate::store::TimetableEntryDraft;

fn schedule_conflict(existing: TimetableEntry) -> EngineError {
    EngineError::ScheduleConflict {
        existing_id: existing.id,
        room: existing.room,
        start: existing.start_time,
        end: existing.end_time,
    }
}

impl AcademicEngine {
    /// Place a class into the timetable.
    pub async fn place(&self, draft: TimetableEntryDraft) -> EngineResult<TimetableEntry> {
        self.validate_draft(&draft).await?;

        if let Some(existing) = self.find_conflict(&draft, None).await? {
            return Err(schedule_conflict(existing));
        }

        match self.store().insert_timetable_entry(draft.clone()).await {
            Ok(entry) => {
                info!(
                    "Placed {:?} class in {} on {:?} {}-{}",
                    entry.class_type, entry.room, entry.day_of_week, entry.start_time, entry.end_time
                );
                Ok(entry)
            }
            // Race loser: the winner committed between our scan and the
            // insert. Re-scan once to name it.
            Err(StoreError::Conflict(_)) => match self.find_conflict(&draft, None).await? {
                Some(existing) => Err(schedule_conflict(existing)),
                None => Err(StoreError::Backend(
                    "timetable conflict backstop fired but no overlapping entry is visible".into(),
                )
                .into()),
            },
            Err(err) => Err(err.into()),
        }
    }

    /// Move or reshape an existing entry. Runs the same conflict check,
    /// excluding the entry's own id.
    pub async fn update_placement(
        &self,
        entry_id: Uuid,
        draft: TimetableEntryDraft,
    ) -> EngineResult<TimetableEntry> {
        self.store()
            .timetable_entry(entry_id)
            .await?
            .ok_or(EngineError::RecordNotFound {
                entity: "timetable entry",
            })?;
        self.validate_draft(&draft).await?;

        if let Some(existing) = self.find_conflict(&draft, Some(entry_id)).await? {
            return Err(schedule_conflict(existing));
        }

        match self
            .store()
            .replace_timetable_entry(entry_id, draft.clone())
            .await
        {
            Ok(entry) => Ok(entry),
            Err(StoreError::Conflict(_)) => {
                match self.find_conflict(&draft, Some(entry_id)).await? {
                    Some(existing) => Err(schedule_conflict(existing)),
                    None => Err(StoreError::Backend(
                        "timetable conflict backstop fired but no overlapping entry is visible"
                            .into(),
                    )
                    .into()),
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn validate_draft(&self, draft: &TimetableEntryDraft) -> EngineResult<()> {
        if draft.start_time >= draft.end_time {
            return Err(EngineError::InvalidTimeWindow);
        }
        self.store()
            .course(draft.course_id)
            .await?
            .filter(|c| c.is_active)
            .ok_or(EngineError::InvalidCourse {
                course_id: draft.course_id,
            })?;
        Ok(())
    }

    async fn find_conflict(
        &self,
        draft: &TimetableEntryDraft,
        exclude: Option<Uuid>,
    ) -> EngineResult<Option<TimetableEntry>> {
        let entries = self
            .store()
            .timetable_for(draft.day_of_week, &draft.room)
            .await?;
        Ok(entries
            .into_iter()
            .filter(|e| exclude != Some(e.id))
            .find(|e| {
                e.conflicts_with(draft.day_of_week, &draft.room, draft.start_time, draft.end_time)
            }))
    }
}
