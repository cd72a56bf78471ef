//! Shared fixtures for unit tests.

use crate::types::{Classroom, Course, FacultyMember, Student};
use crate::Registrar;
use chrono::NaiveTime;

pub(crate) fn sample_student(student_id: &str) -> Student {
    Student {
        student_id: student_id.to_string(),
        first_name: "Test".to_string(),
        last_name: student_id.to_string(),
        email: format!("{}@example.edu", student_id.to_lowercase()),
        degree: "BSCS".to_string(),
        semester: 3,
    }
}

/// Builds an in-memory registrar with a small roster:
/// students S1..S3 (BSCS, semester 3), faculty 5 and 6, rooms R1 and R2,
/// timeslots 1 and 2, courses CS101 (2 seats) and CS102 (BSCS semester 3)
/// and MATH201 (BSMATH semester 1).
pub(crate) fn seeded_registrar() -> Registrar {
    let reg = Registrar::open_in_memory().unwrap();

    for id in ["S1", "S2", "S3"] {
        reg.catalog.add_student(&sample_student(id)).unwrap();
    }

    for (id, first, last) in [(5, "Grace", "Hopper"), (6, "Alan", "Turing")] {
        reg.catalog
            .add_faculty(&FacultyMember {
                faculty_id: id,
                first_name: first.to_string(),
                last_name: last.to_string(),
                email: format!("{}@example.edu", last.to_lowercase()),
                qualification: Some("PhD".to_string()),
                designation: Some("Professor".to_string()),
            })
            .unwrap();
    }

    for (code, name, semester, department, max_students) in [
        ("CS101", "Intro to Computing", 3, "BSCS", 2),
        ("CS102", "Data Structures", 3, "BSCS", 30),
        ("MATH201", "Calculus", 1, "BSMATH", 30),
    ] {
        reg.catalog
            .add_course(&Course {
                course_code: code.to_string(),
                course_name: name.to_string(),
                credits: 3,
                semester,
                department: department.to_string(),
                max_students,
                prerequisites: String::new(),
            })
            .unwrap();
    }

    for id in ["R1", "R2"] {
        reg.catalog
            .add_classroom(&Classroom {
                room_id: id.to_string(),
                building: "Main".to_string(),
                room_number: id.trim_start_matches('R').to_string(),
                capacity: 40,
                room_type: "Lecture".to_string(),
            })
            .unwrap();
    }

    // Timeslot ids are AUTOINCREMENT, so these come back as 1 and 2.
    let t1 = reg
        .catalog
        .add_timeslot(
            "Monday",
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
        )
        .unwrap();
    let t2 = reg
        .catalog
        .add_timeslot(
            "Tuesday",
            NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(12, 30, 0).unwrap(),
        )
        .unwrap();
    assert_eq!((t1, t2), (1, 2));

    reg
}
