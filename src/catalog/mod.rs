//! Resource Catalog: read views over courses, classrooms, timeslots, and
//! people, plus the administrative roster lifecycle.
//!
//! The availability queries are pure projections of current state. They feed
//! candidate lists to the allocator and enrollment manager, which re-validate
//! everything at commit time, so nothing here is cached.

use crate::db::{session_details_from_row, student_from_row, Store, SESSION_DETAILS_SELECT};
use crate::error::{constraint_to_conflict, is_constraint_violation, RegistrarError, Result};
use crate::types::{Classroom, Course, FacultyMember, SessionDetails, Student, Timeslot};
use chrono::NaiveTime;
use rusqlite::{params, Row};
use std::sync::Arc;
use tracing::info;

pub struct Catalog {
    store: Arc<Store>,
}

impl Catalog {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    // ---- availability views ----

    /// Courses with no scheduled session; the candidate set for allocation.
    pub fn unscheduled_courses(&self) -> Result<Vec<Course>> {
        self.store.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT course_code, course_name, credits, semester, department, \
                        max_students, prerequisites \
                 FROM courses \
                 WHERE course_code NOT IN (SELECT course_code FROM course_schedule) \
                 ORDER BY course_code",
            )?;
            let courses = stmt.query_map([], course_from_row)?;
            courses.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
        })
    }

    pub fn all_timeslots(&self) -> Result<Vec<Timeslot>> {
        self.store.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT timeslot_id, day_of_week, start_time, end_time \
                 FROM timeslots ORDER BY timeslot_id",
            )?;
            let slots = stmt.query_map([], timeslot_from_row)?;
            slots.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
        })
    }

    /// Faculty not bound to any session at the given timeslot.
    pub fn available_faculty(&self, timeslot_id: i64) -> Result<Vec<FacultyMember>> {
        self.store.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT faculty_id, first_name, last_name, email, qualification, designation \
                 FROM faculty \
                 WHERE faculty_id NOT IN \
                       (SELECT faculty_id FROM course_schedule WHERE timeslot_id = ?1) \
                 ORDER BY faculty_id",
            )?;
            let rows = stmt.query_map([timeslot_id], faculty_from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
        })
    }

    /// Rooms not bound to any session at the given timeslot.
    pub fn available_rooms(&self, timeslot_id: i64) -> Result<Vec<Classroom>> {
        self.store.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT room_id, building, room_number, capacity, room_type \
                 FROM classrooms \
                 WHERE room_id NOT IN \
                       (SELECT room_id FROM course_schedule WHERE timeslot_id = ?1) \
                 ORDER BY room_id",
            )?;
            let rows = stmt.query_map([timeslot_id], classroom_from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
        })
    }

    /// Sessions whose course matches a student's degree and semester.
    pub fn scheduled_sessions_for(&self, degree: &str, semester: u32) -> Result<Vec<SessionDetails>> {
        self.store.with_conn(|conn| {
            let sql = format!(
                "{SESSION_DETAILS_SELECT} WHERE c.department = ?1 AND c.semester = ?2 \
                 ORDER BY cs.course_code"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![degree, semester], session_details_from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
        })
    }

    // ---- key lookups ----

    pub fn course(&self, course_code: &str) -> Result<Course> {
        self.store.with_conn(|conn| {
            conn.query_row(
                "SELECT course_code, course_name, credits, semester, department, \
                        max_students, prerequisites \
                 FROM courses WHERE course_code = ?1",
                [course_code],
                course_from_row,
            )
            .map_err(|e| lookup_err(e, "course", course_code))
        })
    }

    pub fn student(&self, student_id: &str) -> Result<Student> {
        self.store.with_conn(|conn| {
            conn.query_row(
                "SELECT student_id, first_name, last_name, email, degree, semester \
                 FROM students WHERE student_id = ?1",
                [student_id],
                student_from_row,
            )
            .map_err(|e| lookup_err(e, "student", student_id))
        })
    }

    pub fn faculty_member(&self, faculty_id: i64) -> Result<FacultyMember> {
        self.store.with_conn(|conn| {
            conn.query_row(
                "SELECT faculty_id, first_name, last_name, email, qualification, designation \
                 FROM faculty WHERE faculty_id = ?1",
                [faculty_id],
                faculty_from_row,
            )
            .map_err(|e| lookup_err(e, "faculty member", faculty_id.to_string()))
        })
    }

    pub fn classroom(&self, room_id: &str) -> Result<Classroom> {
        self.store.with_conn(|conn| {
            conn.query_row(
                "SELECT room_id, building, room_number, capacity, room_type \
                 FROM classrooms WHERE room_id = ?1",
                [room_id],
                classroom_from_row,
            )
            .map_err(|e| lookup_err(e, "classroom", room_id))
        })
    }

    pub fn timeslot(&self, timeslot_id: i64) -> Result<Timeslot> {
        self.store.with_conn(|conn| {
            conn.query_row(
                "SELECT timeslot_id, day_of_week, start_time, end_time \
                 FROM timeslots WHERE timeslot_id = ?1",
                [timeslot_id],
                timeslot_from_row,
            )
            .map_err(|e| lookup_err(e, "timeslot", timeslot_id.to_string()))
        })
    }

    // ---- roster lifecycle (administrative) ----

    pub fn add_student(&self, student: &Student) -> Result<()> {
        self.store.with_conn(|conn| {
            conn.execute(
                "INSERT INTO students (student_id, first_name, last_name, email, degree, semester) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    student.student_id,
                    student.first_name,
                    student.last_name,
                    student.email,
                    student.degree,
                    student.semester
                ],
            )
            .map_err(|e| insert_err(e, "student", &student.student_id))?;
            info!(student_id = %student.student_id, "added student");
            Ok(())
        })
    }

    pub fn remove_student(&self, student_id: &str) -> Result<()> {
        self.store.with_conn(|conn| {
            let affected = conn
                .execute("DELETE FROM students WHERE student_id = ?1", [student_id])
                .map_err(|e| {
                    constraint_to_conflict(e, "student still holds enrollments")
                })?;
            if affected == 0 {
                return Err(RegistrarError::not_found("student", student_id));
            }
            info!(student_id, "removed student");
            Ok(())
        })
    }

    pub fn add_faculty(&self, member: &FacultyMember) -> Result<()> {
        self.store.with_conn(|conn| {
            conn.execute(
                "INSERT INTO faculty (faculty_id, first_name, last_name, email, \
                                      qualification, designation) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    member.faculty_id,
                    member.first_name,
                    member.last_name,
                    member.email,
                    member.qualification,
                    member.designation
                ],
            )
            .map_err(|e| insert_err(e, "faculty member", &member.faculty_id.to_string()))?;
            info!(faculty_id = member.faculty_id, "added faculty member");
            Ok(())
        })
    }

    pub fn remove_faculty(&self, faculty_id: i64) -> Result<()> {
        self.store.with_conn(|conn| {
            let affected = conn
                .execute("DELETE FROM faculty WHERE faculty_id = ?1", [faculty_id])
                .map_err(|e| {
                    constraint_to_conflict(e, "faculty member still has scheduled sessions")
                })?;
            if affected == 0 {
                return Err(RegistrarError::not_found(
                    "faculty member",
                    faculty_id.to_string(),
                ));
            }
            info!(faculty_id, "removed faculty member");
            Ok(())
        })
    }

    pub fn add_course(&self, course: &Course) -> Result<()> {
        self.store.with_conn(|conn| {
            conn.execute(
                "INSERT INTO courses (course_code, course_name, credits, semester, \
                                      department, max_students, prerequisites) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    course.course_code,
                    course.course_name,
                    course.credits,
                    course.semester,
                    course.department,
                    course.max_students,
                    course.prerequisites
                ],
            )
            .map_err(|e| insert_err(e, "course", &course.course_code))?;
            info!(course_code = %course.course_code, "added course");
            Ok(())
        })
    }

    pub fn remove_course(&self, course_code: &str) -> Result<()> {
        self.store.with_conn(|conn| {
            let affected = conn
                .execute("DELETE FROM courses WHERE course_code = ?1", [course_code])
                .map_err(|e| constraint_to_conflict(e, "course is still scheduled"))?;
            if affected == 0 {
                return Err(RegistrarError::not_found("course", course_code));
            }
            info!(course_code, "removed course");
            Ok(())
        })
    }

    pub fn add_classroom(&self, room: &Classroom) -> Result<()> {
        self.store.with_conn(|conn| {
            conn.execute(
                "INSERT INTO classrooms (room_id, building, room_number, capacity, room_type) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    room.room_id,
                    room.building,
                    room.room_number,
                    room.capacity,
                    room.room_type
                ],
            )
            .map_err(|e| insert_err(e, "classroom", &room.room_id))?;
            info!(room_id = %room.room_id, "added classroom");
            Ok(())
        })
    }

    pub fn remove_classroom(&self, room_id: &str) -> Result<()> {
        self.store.with_conn(|conn| {
            let affected = conn
                .execute("DELETE FROM classrooms WHERE room_id = ?1", [room_id])
                .map_err(|e| constraint_to_conflict(e, "classroom is still scheduled"))?;
            if affected == 0 {
                return Err(RegistrarError::not_found("classroom", room_id));
            }
            info!(room_id, "removed classroom");
            Ok(())
        })
    }

    /// Adds a timeslot and returns its generated id. Timeslots are atomic
    /// units: no wall-clock overlap checking is done between distinct rows.
    pub fn add_timeslot(
        &self,
        day_of_week: &str,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Result<i64> {
        self.store.with_conn(|conn| {
            conn.execute(
                "INSERT INTO timeslots (day_of_week, start_time, end_time) \
                 VALUES (?1, ?2, ?3)",
                params![day_of_week, start_time, end_time],
            )?;
            let timeslot_id = conn.last_insert_rowid();
            info!(timeslot_id, day_of_week, "added timeslot");
            Ok(timeslot_id)
        })
    }

    pub fn remove_timeslot(&self, timeslot_id: i64) -> Result<()> {
        self.store.with_conn(|conn| {
            let affected = conn
                .execute("DELETE FROM timeslots WHERE timeslot_id = ?1", [timeslot_id])
                .map_err(|e| constraint_to_conflict(e, "timeslot is still scheduled"))?;
            if affected == 0 {
                return Err(RegistrarError::not_found(
                    "timeslot",
                    timeslot_id.to_string(),
                ));
            }
            info!(timeslot_id, "removed timeslot");
            Ok(())
        })
    }
}

// ---- row mapping ----

fn course_from_row(row: &Row<'_>) -> rusqlite::Result<Course> {
    Ok(Course {
        course_code: row.get(0)?,
        course_name: row.get(1)?,
        credits: row.get(2)?,
        semester: row.get(3)?,
        department: row.get(4)?,
        max_students: row.get(5)?,
        prerequisites: row.get(6)?,
    })
}

fn timeslot_from_row(row: &Row<'_>) -> rusqlite::Result<Timeslot> {
    Ok(Timeslot {
        timeslot_id: row.get(0)?,
        day_of_week: row.get(1)?,
        start_time: row.get(2)?,
        end_time: row.get(3)?,
    })
}

fn faculty_from_row(row: &Row<'_>) -> rusqlite::Result<FacultyMember> {
    Ok(FacultyMember {
        faculty_id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        qualification: row.get(4)?,
        designation: row.get(5)?,
    })
}

fn classroom_from_row(row: &Row<'_>) -> rusqlite::Result<Classroom> {
    Ok(Classroom {
        room_id: row.get(0)?,
        building: row.get(1)?,
        room_number: row.get(2)?,
        capacity: row.get(3)?,
        room_type: row.get(4)?,
    })
}

fn lookup_err(err: rusqlite::Error, entity: &'static str, key: impl Into<String>) -> RegistrarError {
    match err {
        rusqlite::Error::QueryReturnedNoRows => RegistrarError::not_found(entity, key),
        other => RegistrarError::Storage(other),
    }
}

fn insert_err(err: rusqlite::Error, entity: &'static str, key: &str) -> RegistrarError {
    if is_constraint_violation(&err) {
        RegistrarError::duplicate(entity, key)
    } else {
        RegistrarError::Storage(err)
    }
}
