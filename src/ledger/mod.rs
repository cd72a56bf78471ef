//! Assessment Ledger: marks per (course, student, assignment).
//!
//! The ledger does not re-verify enrollment; callers are expected to restrict
//! the student list to currently-enrolled students. Marks are keyed by course
//! rather than session and survive session removal.

use crate::db::Store;
use crate::error::{RegistrarError, Result};
use crate::types::{AssignmentMark, Mark};
use rusqlite::{params, OptionalExtension};
use std::sync::Arc;
use tracing::info;

pub struct Ledger {
    store: Arc<Store>,
}

impl Ledger {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Records a mark, overwriting any existing row with the same
    /// (course, student, assignment) key.
    ///
    /// Fails with `Validation` unless `0 <= obtained_marks <= total_marks`.
    pub fn record_mark(
        &self,
        course_code: &str,
        student_id: &str,
        assignment_name: &str,
        total_marks: u32,
        obtained_marks: u32,
    ) -> Result<()> {
        if obtained_marks > total_marks {
            return Err(RegistrarError::validation(format!(
                "obtained marks {obtained_marks} exceed total {total_marks}"
            )));
        }

        self.store.with_conn(|conn| {
            conn.execute(
                "INSERT INTO marks (course_code, student_id, assignment_name, \
                                    total_marks, obtained_marks) \
                 VALUES (?1, ?2, ?3, ?4, ?5) \
                 ON CONFLICT (course_code, student_id, assignment_name) \
                 DO UPDATE SET total_marks = excluded.total_marks, \
                               obtained_marks = excluded.obtained_marks",
                params![course_code, student_id, assignment_name, total_marks, obtained_marks],
            )?;
            info!(course_code, student_id, assignment_name, "recorded mark");
            Ok(())
        })
    }

    /// Overwrites the obtained marks of an existing row, leaving the total
    /// untouched.
    ///
    /// Fails with `NotFound` if no mark exists for the key, and with
    /// `Validation` if `obtained_marks` is outside `[0, total_marks]` of the
    /// existing row. Read and write happen in one transaction.
    pub fn update_mark(
        &self,
        course_code: &str,
        student_id: &str,
        assignment_name: &str,
        obtained_marks: u32,
    ) -> Result<()> {
        self.store.with_tx(|tx| {
            let total: Option<u32> = tx
                .query_row(
                    "SELECT total_marks FROM marks \
                     WHERE course_code = ?1 AND student_id = ?2 AND assignment_name = ?3",
                    params![course_code, student_id, assignment_name],
                    |row| row.get(0),
                )
                .optional()?;
            let total = total.ok_or_else(|| {
                RegistrarError::not_found(
                    "mark",
                    format!("{course_code}/{student_id}/{assignment_name}"),
                )
            })?;

            if obtained_marks > total {
                return Err(RegistrarError::validation(format!(
                    "obtained marks {obtained_marks} exceed total {total}"
                )));
            }

            tx.execute(
                "UPDATE marks SET obtained_marks = ?1 \
                 WHERE course_code = ?2 AND student_id = ?3 AND assignment_name = ?4",
                params![obtained_marks, course_code, student_id, assignment_name],
            )?;
            info!(course_code, student_id, assignment_name, "updated mark");
            Ok(())
        })
    }

    /// A student's marks, optionally restricted to one course, ordered by
    /// assignment name ascending.
    pub fn marks_for(&self, student_id: &str, course_code: Option<&str>) -> Result<Vec<Mark>> {
        self.store.with_conn(|conn| {
            let base = "SELECT m.course_code, c.course_name, m.student_id, \
                               m.assignment_name, m.total_marks, m.obtained_marks \
                        FROM marks m \
                        JOIN courses c ON m.course_code = c.course_code \
                        WHERE m.student_id = ?1";

            let collect = |mut stmt: rusqlite::Statement<'_>,
                           params: &[&dyn rusqlite::ToSql]|
             -> Result<Vec<Mark>> {
                let rows = stmt.query_map(params, |row| {
                    Ok(Mark {
                        course_code: row.get(0)?,
                        course_name: row.get(1)?,
                        student_id: row.get(2)?,
                        assignment_name: row.get(3)?,
                        total_marks: row.get(4)?,
                        obtained_marks: row.get(5)?,
                    })
                })?;
                rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
            };

            match course_code {
                Some(code) => {
                    let sql =
                        format!("{base} AND m.course_code = ?2 ORDER BY m.assignment_name ASC");
                    collect(conn.prepare(&sql)?, params![student_id, code])
                }
                None => {
                    let sql = format!("{base} ORDER BY m.assignment_name ASC");
                    collect(conn.prepare(&sql)?, params![student_id])
                }
            }
        })
    }

    /// Distinct assignment names recorded for a course.
    pub fn assignments(&self, course_code: &str) -> Result<Vec<String>> {
        self.store.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT assignment_name FROM marks \
                 WHERE course_code = ?1 ORDER BY assignment_name",
            )?;
            let rows = stmt.query_map([course_code], |row| row.get(0))?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
        })
    }

    /// Per-student marks for one assignment of a course.
    pub fn assignment_marks(
        &self,
        course_code: &str,
        assignment_name: &str,
    ) -> Result<Vec<AssignmentMark>> {
        self.store.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT student_id, total_marks, obtained_marks FROM marks \
                 WHERE course_code = ?1 AND assignment_name = ?2 ORDER BY student_id",
            )?;
            let rows = stmt.query_map(params![course_code, assignment_name], |row| {
                Ok(AssignmentMark {
                    student_id: row.get(0)?,
                    total_marks: row.get(1)?,
                    obtained_marks: row.get(2)?,
                })
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::seeded_registrar;
    use crate::RegistrarError;

    #[test]
    fn test_record_then_reread() {
        let reg = seeded_registrar();
        reg.ledger
            .record_mark("CS101", "S1", "Midterm", 50, 42)
            .unwrap();

        let marks = reg.ledger.marks_for("S1", None).unwrap();
        assert_eq!(marks.len(), 1);
        assert_eq!(marks[0].assignment_name, "Midterm");
        assert_eq!(marks[0].obtained_marks, 42);
        assert_eq!(marks[0].course_name, "Intro to Computing");
    }

    #[test]
    fn test_record_twice_upserts() {
        let reg = seeded_registrar();
        reg.ledger
            .record_mark("CS101", "S1", "Midterm", 50, 30)
            .unwrap();
        reg.ledger
            .record_mark("CS101", "S1", "Midterm", 60, 55)
            .unwrap();

        let marks = reg.ledger.marks_for("S1", Some("CS101")).unwrap();
        assert_eq!(marks.len(), 1);
        assert_eq!(marks[0].total_marks, 60);
        assert_eq!(marks[0].obtained_marks, 55);
    }

    #[test]
    fn test_record_rejects_out_of_range() {
        let reg = seeded_registrar();
        let err = reg
            .ledger
            .record_mark("CS101", "S1", "Midterm", 50, 51)
            .unwrap_err();
        assert!(matches!(err, RegistrarError::Validation { .. }));
        assert!(reg.ledger.marks_for("S1", None).unwrap().is_empty());
    }

    #[test]
    fn test_update_respects_existing_total() {
        let reg = seeded_registrar();
        reg.ledger
            .record_mark("CS101", "S1", "Midterm", 50, 30)
            .unwrap();

        let err = reg
            .ledger
            .update_mark("CS101", "S1", "Midterm", 51)
            .unwrap_err();
        assert!(matches!(err, RegistrarError::Validation { .. }));

        reg.ledger.update_mark("CS101", "S1", "Midterm", 50).unwrap();
        let marks = reg.ledger.marks_for("S1", Some("CS101")).unwrap();
        assert_eq!(marks[0].obtained_marks, 50);
        assert_eq!(marks[0].total_marks, 50);
    }

    #[test]
    fn test_update_missing_mark_is_not_found() {
        let reg = seeded_registrar();
        let err = reg
            .ledger
            .update_mark("CS101", "S1", "Midterm", 10)
            .unwrap_err();
        assert!(matches!(err, RegistrarError::NotFound { entity: "mark", .. }));
    }

    #[test]
    fn test_marks_ordered_by_assignment_name() {
        let reg = seeded_registrar();
        reg.ledger
            .record_mark("CS101", "S1", "Quiz2", 10, 8)
            .unwrap();
        reg.ledger
            .record_mark("CS101", "S1", "Final", 100, 77)
            .unwrap();
        reg.ledger
            .record_mark("CS101", "S1", "Quiz1", 10, 9)
            .unwrap();

        let names: Vec<_> = reg
            .ledger
            .marks_for("S1", None)
            .unwrap()
            .into_iter()
            .map(|m| m.assignment_name)
            .collect();
        assert_eq!(names, ["Final", "Quiz1", "Quiz2"]);

        assert_eq!(
            reg.ledger.assignments("CS101").unwrap(),
            ["Final", "Quiz1", "Quiz2"]
        );
    }

    #[test]
    fn test_assignment_roster() {
        let reg = seeded_registrar();
        reg.ledger
            .record_mark("CS101", "S2", "Midterm", 50, 41)
            .unwrap();
        reg.ledger
            .record_mark("CS101", "S1", "Midterm", 50, 44)
            .unwrap();

        let roster = reg.ledger.assignment_marks("CS101", "Midterm").unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].student_id, "S1");
        assert_eq!(roster[1].student_id, "S2");
    }

    #[test]
    fn test_marks_survive_session_removal() {
        let reg = seeded_registrar();
        let session = reg.allocator.allocate("CS101", 5, 1, "R1").unwrap();
        reg.enrollments.enroll("S1", session.schedule_id).unwrap();
        reg.ledger
            .record_mark("CS101", "S1", "Midterm", 50, 42)
            .unwrap();

        reg.allocator.deallocate(session.schedule_id).unwrap();
        assert_eq!(reg.ledger.marks_for("S1", Some("CS101")).unwrap().len(), 1);
    }
}
