//! Enrollment Manager: adds and drops a student's enrollment in a scheduled
//! session, enforcing the capacity and per-student conflict invariants.
//!
//! The capacity check is the hot contention point: the seat count is re-read
//! inside the same transaction as the insert, so concurrent enrollments can
//! never overshoot a course's seat limit.

use crate::db::{session_details_from_row, student_from_row, Store, SESSION_DETAILS_SELECT};
use crate::error::{is_constraint_violation, RegistrarError, Result};
use crate::types::{SessionDetails, Student};
use rusqlite::{params, OptionalExtension};
use std::sync::Arc;
use tracing::info;

pub struct Enrollments {
    store: Arc<Store>,
}

impl Enrollments {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Enrolls a student in a scheduled session.
    ///
    /// Checks, in order, against state read inside this operation's own
    /// transaction: the session and student exist (`NotFound`), the pair is
    /// not already enrolled (`Duplicate`), the student holds no other
    /// enrollment at the same timeslot (`Clash`), and a seat is still free
    /// (`Capacity`).
    pub fn enroll(&self, student_id: &str, schedule_id: i64) -> Result<()> {
        self.store.with_tx(|tx| {
            let session: Option<(String, i64)> = tx
                .query_row(
                    "SELECT course_code, timeslot_id FROM course_schedule WHERE schedule_id = ?1",
                    [schedule_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            let (course_code, timeslot_id) = session.ok_or_else(|| {
                RegistrarError::not_found("session", schedule_id.to_string())
            })?;

            let student_known: Option<()> = tx
                .query_row(
                    "SELECT 1 FROM students WHERE student_id = ?1",
                    [student_id],
                    |_| Ok(()),
                )
                .optional()?;
            if student_known.is_none() {
                return Err(RegistrarError::not_found("student", student_id));
            }

            let already: Option<()> = tx
                .query_row(
                    "SELECT 1 FROM enrollments WHERE student_id = ?1 AND schedule_id = ?2",
                    params![student_id, schedule_id],
                    |_| Ok(()),
                )
                .optional()?;
            if already.is_some() {
                return Err(RegistrarError::duplicate(
                    "enrollment",
                    format!("{student_id} in session {schedule_id}"),
                ));
            }

            let clash: Option<()> = tx
                .query_row(
                    "SELECT 1 FROM enrollments e \
                     JOIN course_schedule cs ON e.schedule_id = cs.schedule_id \
                     WHERE e.student_id = ?1 AND cs.timeslot_id = ?2",
                    params![student_id, timeslot_id],
                    |_| Ok(()),
                )
                .optional()?;
            if clash.is_some() {
                return Err(RegistrarError::Clash {
                    student_id: student_id.to_string(),
                    timeslot_id,
                });
            }

            let enrolled: u32 = tx.query_row(
                "SELECT COUNT(*) FROM enrollments WHERE schedule_id = ?1",
                [schedule_id],
                |row| row.get(0),
            )?;
            let max_students: u32 = tx.query_row(
                "SELECT max_students FROM courses WHERE course_code = ?1",
                [&course_code],
                |row| row.get(0),
            )?;
            if enrolled >= max_students {
                return Err(RegistrarError::Capacity {
                    course_code: course_code.clone(),
                    max_students,
                });
            }

            tx.execute(
                "INSERT INTO enrollments (student_id, schedule_id) VALUES (?1, ?2)",
                params![student_id, schedule_id],
            )
            .map_err(|e| {
                if is_constraint_violation(&e) {
                    RegistrarError::duplicate(
                        "enrollment",
                        format!("{student_id} in session {schedule_id}"),
                    )
                } else {
                    RegistrarError::Storage(e)
                }
            })?;

            info!(student_id, schedule_id, course_code = %course_code, "enrolled");
            Ok(())
        })
    }

    /// Drops an enrollment. Fails with `NotFound` if no such enrollment
    /// exists; marks are untouched.
    pub fn drop(&self, student_id: &str, schedule_id: i64) -> Result<()> {
        self.store.with_conn(|conn| {
            let affected = conn.execute(
                "DELETE FROM enrollments WHERE student_id = ?1 AND schedule_id = ?2",
                params![student_id, schedule_id],
            )?;
            if affected == 0 {
                return Err(RegistrarError::not_found(
                    "enrollment",
                    format!("{student_id} in session {schedule_id}"),
                ));
            }
            info!(student_id, schedule_id, "dropped enrollment");
            Ok(())
        })
    }

    /// Sessions whose course matches the student's own degree and semester.
    /// Advisory candidate set only; `enroll` re-validates independently.
    pub fn eligible_offerings(&self, student_id: &str) -> Result<Vec<SessionDetails>> {
        self.store.with_conn(|conn| {
            let (degree, semester): (String, u32) = conn
                .query_row(
                    "SELECT degree, semester FROM students WHERE student_id = ?1",
                    [student_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?
                .ok_or_else(|| RegistrarError::not_found("student", student_id))?;

            let sql = format!(
                "{SESSION_DETAILS_SELECT} WHERE c.department = ?1 AND c.semester = ?2 \
                 ORDER BY cs.course_code"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![degree, semester], session_details_from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
        })
    }

    /// The student's current enrollments, joined with session details.
    /// Doubles as the student timetable.
    pub fn enrolled_courses(&self, student_id: &str) -> Result<Vec<SessionDetails>> {
        self.store.with_conn(|conn| {
            let sql = format!(
                "{SESSION_DETAILS_SELECT} \
                 JOIN enrollments e ON e.schedule_id = cs.schedule_id \
                 WHERE e.student_id = ?1 ORDER BY cs.timeslot_id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([student_id], session_details_from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
        })
    }

    /// Distinct students enrolled in any session of the given course.
    pub fn enrolled_students(&self, course_code: &str) -> Result<Vec<Student>> {
        self.store.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT s.student_id, s.first_name, s.last_name, s.email, \
                        s.degree, s.semester \
                 FROM enrollments e \
                 JOIN students s ON e.student_id = s.student_id \
                 JOIN course_schedule cs ON e.schedule_id = cs.schedule_id \
                 WHERE cs.course_code = ?1 \
                 ORDER BY s.student_id",
            )?;
            let rows = stmt.query_map([course_code], student_from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
        })
    }

    /// Count of distinct students enrolled across a course's sessions.
    pub fn total_enrolled(&self, course_code: &str) -> Result<u32> {
        self.store.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(DISTINCT e.student_id) \
                 FROM enrollments e \
                 JOIN course_schedule cs ON e.schedule_id = cs.schedule_id \
                 WHERE cs.course_code = ?1",
                [course_code],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// Current enrollment count for one session.
    pub fn enrollment_count(&self, schedule_id: i64) -> Result<u32> {
        self.store.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM enrollments WHERE schedule_id = ?1",
                [schedule_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }
}
