//! Offering Allocator: creates and removes scheduled sessions while
//! enforcing the no-double-booking invariants.
//!
//! Every precondition is re-validated inside the same transaction as the
//! write. Candidate lists from the catalog are advisory only; a stale list
//! surfaces here as a `Conflict`, never as a double-booking.

use crate::db::{session_details_from_row, Store, SESSION_DETAILS_SELECT};
use crate::error::{constraint_to_conflict, RegistrarError, Result};
use crate::types::{ScheduledSession, SessionDetails};
use rusqlite::{params, OptionalExtension, ToSql, Transaction};
use std::sync::Arc;
use tracing::info;

pub struct Allocator {
    store: Arc<Store>,
}

impl Allocator {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Creates one scheduled session binding a course to a faculty member,
    /// timeslot, and room.
    ///
    /// Fails with `NotFound` if any referenced entity no longer exists, and
    /// with `Conflict` if the course is already scheduled or the faculty
    /// member or room is already bound at this timeslot. Two timeslot rows
    /// that overlap in wall-clock time are deliberately treated as
    /// non-conflicting; only the timeslot id is compared.
    pub fn allocate(
        &self,
        course_code: &str,
        faculty_id: i64,
        timeslot_id: i64,
        room_id: &str,
    ) -> Result<ScheduledSession> {
        let session = self.store.with_tx(|tx| {
            require_row(
                tx,
                "SELECT 1 FROM courses WHERE course_code = ?1",
                params![course_code],
                "course",
                course_code,
            )?;
            require_row(
                tx,
                "SELECT 1 FROM faculty WHERE faculty_id = ?1",
                params![faculty_id],
                "faculty member",
                &faculty_id.to_string(),
            )?;
            require_row(
                tx,
                "SELECT 1 FROM timeslots WHERE timeslot_id = ?1",
                params![timeslot_id],
                "timeslot",
                &timeslot_id.to_string(),
            )?;
            require_row(
                tx,
                "SELECT 1 FROM classrooms WHERE room_id = ?1",
                params![room_id],
                "classroom",
                room_id,
            )?;

            if row_exists(
                tx,
                "SELECT 1 FROM course_schedule WHERE course_code = ?1",
                params![course_code],
            )? {
                return Err(RegistrarError::conflict(format!(
                    "course {course_code} is already scheduled"
                )));
            }
            if row_exists(
                tx,
                "SELECT 1 FROM course_schedule WHERE faculty_id = ?1 AND timeslot_id = ?2",
                params![faculty_id, timeslot_id],
            )? {
                return Err(RegistrarError::conflict(format!(
                    "faculty member {faculty_id} is already booked at timeslot {timeslot_id}"
                )));
            }
            if row_exists(
                tx,
                "SELECT 1 FROM course_schedule WHERE room_id = ?1 AND timeslot_id = ?2",
                params![room_id, timeslot_id],
            )? {
                return Err(RegistrarError::conflict(format!(
                    "room {room_id} is already booked at timeslot {timeslot_id}"
                )));
            }

            tx.execute(
                "INSERT INTO course_schedule (course_code, faculty_id, timeslot_id, room_id) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![course_code, faculty_id, timeslot_id, room_id],
            )
            .map_err(|e| constraint_to_conflict(e, "session conflicts with a concurrent allocation"))?;

            Ok(ScheduledSession {
                schedule_id: tx.last_insert_rowid(),
                course_code: course_code.to_string(),
                faculty_id,
                timeslot_id,
                room_id: room_id.to_string(),
            })
        })?;

        info!(
            schedule_id = session.schedule_id,
            course_code, faculty_id, timeslot_id, room_id, "allocated session"
        );
        Ok(session)
    }

    /// Removes a session and all enrollments referencing it, atomically.
    ///
    /// A second call for the same id reports `NotFound`.
    pub fn deallocate(&self, schedule_id: i64) -> Result<()> {
        let dropped = self.store.with_tx(|tx| {
            require_row(
                tx,
                "SELECT 1 FROM course_schedule WHERE schedule_id = ?1",
                params![schedule_id],
                "session",
                &schedule_id.to_string(),
            )?;

            // Enrollments first: the FK would block deleting the parent row,
            // and no reader may observe enrollments without their session.
            let dropped = tx.execute(
                "DELETE FROM enrollments WHERE schedule_id = ?1",
                params![schedule_id],
            )?;
            tx.execute(
                "DELETE FROM course_schedule WHERE schedule_id = ?1",
                params![schedule_id],
            )?;
            Ok(dropped)
        })?;

        info!(schedule_id, dropped_enrollments = dropped, "deallocated session");
        Ok(())
    }

    /// Joined view of one session.
    pub fn session(&self, schedule_id: i64) -> Result<SessionDetails> {
        self.store.with_conn(|conn| {
            let sql = format!("{SESSION_DETAILS_SELECT} WHERE cs.schedule_id = ?1");
            conn.query_row(&sql, [schedule_id], session_details_from_row)
                .map_err(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => {
                        RegistrarError::not_found("session", schedule_id.to_string())
                    }
                    other => RegistrarError::Storage(other),
                })
        })
    }

    /// All current sessions, for the administrative schedule listing.
    pub fn all_sessions(&self) -> Result<Vec<SessionDetails>> {
        self.store.with_conn(|conn| {
            let sql = format!("{SESSION_DETAILS_SELECT} ORDER BY cs.schedule_id");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], session_details_from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
        })
    }

    /// Sessions taught by one faculty member.
    pub fn faculty_timetable(&self, faculty_id: i64) -> Result<Vec<SessionDetails>> {
        self.store.with_conn(|conn| {
            let sql = format!(
                "{SESSION_DETAILS_SELECT} WHERE cs.faculty_id = ?1 ORDER BY cs.timeslot_id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([faculty_id], session_details_from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
        })
    }
}

fn row_exists(tx: &Transaction<'_>, sql: &str, params: &[&dyn ToSql]) -> Result<bool> {
    let found = tx
        .query_row(sql, params, |_| Ok(()))
        .optional()?
        .is_some();
    Ok(found)
}

fn require_row(
    tx: &Transaction<'_>,
    sql: &str,
    params: &[&dyn ToSql],
    entity: &'static str,
    key: &str,
) -> Result<()> {
    if row_exists(tx, sql, params)? {
        Ok(())
    } else {
        Err(RegistrarError::not_found(entity, key))
    }
}
