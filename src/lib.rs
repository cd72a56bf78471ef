//! Scheduling and enrollment consistency engine for academic course
//! registration.
//!
//! The engine decides whether a course offering (course x faculty x timeslot
//! x room) may be created and whether a student may enroll in it, such that
//! no resource is double-booked and no capacity or clash invariant is
//! violated. Four components share one SQLite store, layered one way:
//!
//! - [`Catalog`] — read views and the administrative roster lifecycle
//! - [`Allocator`] — creates/removes scheduled sessions
//! - [`Enrollments`] — adds/drops student enrollments
//! - [`Ledger`] — marks per (course, student, assignment)
//!
//! Each public operation runs to completion or fails with one
//! [`RegistrarError`], leaving no partial writes. Presentation concerns
//! (prompting, formatting, export) live outside this crate and receive only
//! the plain data structures these operations return.

mod allocator;
mod catalog;
mod db;
mod enrollment;
mod error;
mod ledger;
mod types;

#[cfg(test)]
pub(crate) mod testutil;

pub use allocator::Allocator;
pub use catalog::Catalog;
pub use db::Store;
pub use enrollment::Enrollments;
pub use error::{RegistrarError, Result};
pub use ledger::Ledger;
pub use types::{
    AssignmentMark, Classroom, Course, FacultyMember, Mark, ScheduledSession, SessionDetails,
    Student, Timeslot,
};

use std::path::Path;
use std::sync::Arc;

/// The four engine components bundled over one shared store.
pub struct Registrar {
    pub catalog: Catalog,
    pub allocator: Allocator,
    pub enrollments: Enrollments,
    pub ledger: Ledger,
}

impl Registrar {
    /// Opens (or creates) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_store(Arc::new(Store::open(path)?)))
    }

    /// Opens an in-memory database, mainly for tests.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::from_store(Arc::new(Store::open_in_memory()?)))
    }

    pub fn from_store(store: Arc<Store>) -> Self {
        Self {
            catalog: Catalog::new(store.clone()),
            allocator: Allocator::new(store.clone()),
            enrollments: Enrollments::new(store.clone()),
            ledger: Ledger::new(store),
        }
    }
}
