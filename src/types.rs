//! Domain data types shared across the engine.
//!
//! These are the plain structures handed to the presentation layer; they
//! carry no behavior beyond serialization.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub course_code: String,
    pub course_name: String,
    pub credits: u32,
    pub semester: u32,
    pub department: String,
    pub max_students: u32,
    pub prerequisites: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classroom {
    pub room_id: String,
    pub building: String,
    pub room_number: String,
    pub capacity: u32,
    pub room_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeslot {
    pub timeslot_id: i64,
    pub day_of_week: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacultyMember {
    pub faculty_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub qualification: Option<String>,
    pub designation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub student_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub degree: String,
    pub semester: u32,
}

/// One course offering: a course bound to a faculty member, a timeslot, and
/// a room. This is the raw row; `SessionDetails` is the joined view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledSession {
    pub schedule_id: i64,
    pub course_code: String,
    pub faculty_id: i64,
    pub timeslot_id: i64,
    pub room_id: String,
}

/// A scheduled session joined with its course, faculty, timeslot, and room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDetails {
    pub schedule_id: i64,
    pub course_code: String,
    pub course_name: String,
    pub department: String,
    pub semester: u32,
    pub faculty_id: i64,
    pub faculty_name: String,
    pub timeslot_id: i64,
    pub day_of_week: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub room_id: String,
    pub room_number: String,
    pub building: String,
}

/// A recorded mark for one (course, student, assignment) triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    pub course_code: String,
    pub course_name: String,
    pub student_id: String,
    pub assignment_name: String,
    pub total_marks: u32,
    pub obtained_marks: u32,
}

/// One student's mark within a single assignment roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentMark {
    pub student_id: String,
    pub total_marks: u32,
    pub obtained_marks: u32,
}
