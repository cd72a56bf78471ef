//! SQLite store for the registrar engine.
//!
//! All authoritative state lives here. Check-then-write sequences run inside
//! a single IMMEDIATE transaction so availability and capacity invariants
//! hold even when the database file is shared with other connections.

use crate::error::Result;
use crate::types::{SessionDetails, Student};
use rusqlite::{Connection, Row, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::Mutex;

const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");

/// Handle to the relational store shared by all components.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Opens (or creates) the database at `path` and initializes the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Opens an in-memory database. Used by tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA_SQL)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Runs a read-only closure against the connection.
    pub(crate) fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn.lock().unwrap();
        f(&conn)
    }

    /// Runs a closure inside one IMMEDIATE transaction. The transaction
    /// commits if the closure succeeds and rolls back on any error, so a
    /// failed operation leaves no partial writes.
    pub(crate) fn with_tx<T>(&self, f: impl FnOnce(&Transaction) -> Result<T>) -> Result<T> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }
}

/// SELECT clause for the fully-joined session view. Callers append their own
/// WHERE/ORDER BY and map rows with [`session_details_from_row`].
pub(crate) const SESSION_DETAILS_SELECT: &str = "\
    SELECT cs.schedule_id, cs.course_code, c.course_name, c.department, c.semester, \
           cs.faculty_id, f.first_name || ' ' || f.last_name, \
           cs.timeslot_id, t.day_of_week, t.start_time, t.end_time, \
           cs.room_id, cl.room_number, cl.building \
    FROM course_schedule cs \
    JOIN courses c ON cs.course_code = c.course_code \
    JOIN faculty f ON cs.faculty_id = f.faculty_id \
    JOIN timeslots t ON cs.timeslot_id = t.timeslot_id \
    JOIN classrooms cl ON cs.room_id = cl.room_id";

pub(crate) fn session_details_from_row(row: &Row<'_>) -> rusqlite::Result<SessionDetails> {
    Ok(SessionDetails {
        schedule_id: row.get(0)?,
        course_code: row.get(1)?,
        course_name: row.get(2)?,
        department: row.get(3)?,
        semester: row.get(4)?,
        faculty_id: row.get(5)?,
        faculty_name: row.get(6)?,
        timeslot_id: row.get(7)?,
        day_of_week: row.get(8)?,
        start_time: row.get(9)?,
        end_time: row.get(10)?,
        room_id: row.get(11)?,
        room_number: row.get(12)?,
        building: row.get(13)?,
    })
}

pub(crate) fn student_from_row(row: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        student_id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        degree: row.get(4)?,
        semester: row.get(5)?,
    })
}
