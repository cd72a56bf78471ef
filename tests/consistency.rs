//! End-to-end consistency properties: the full allocate/enroll/deallocate
//! scenario, plus double-booking and last-seat races under concurrent use.

use anyhow::Result;
use chrono::NaiveTime;
use registrar::{Classroom, Course, FacultyMember, Registrar, RegistrarError, Student};
use std::sync::Arc;
use std::thread;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn student(id: &str) -> Student {
    Student {
        student_id: id.to_string(),
        first_name: "Student".to_string(),
        last_name: id.to_string(),
        email: format!("{}@example.edu", id.to_lowercase()),
        degree: "BSCS".to_string(),
        semester: 3,
    }
}

fn course(code: &str, name: &str, max_students: u32) -> Course {
    Course {
        course_code: code.to_string(),
        course_name: name.to_string(),
        credits: 3,
        semester: 3,
        department: "BSCS".to_string(),
        max_students,
        prerequisites: String::new(),
    }
}

/// Registrar with faculty 5 and 6, rooms R1 and R2, timeslots 1 and 2,
/// course CS101 capped at `cs101_seats`, and `students` enrollable students.
fn fixture(cs101_seats: u32, students: u32) -> Result<Registrar> {
    init_tracing();
    let reg = Registrar::open_in_memory()?;

    for i in 1..=students {
        reg.catalog.add_student(&student(&format!("S{i}")))?;
    }
    for (id, last) in [(5, "Hopper"), (6, "Turing")] {
        reg.catalog.add_faculty(&FacultyMember {
            faculty_id: id,
            first_name: "Prof".to_string(),
            last_name: last.to_string(),
            email: format!("{}@example.edu", last.to_lowercase()),
            qualification: None,
            designation: None,
        })?;
    }
    reg.catalog.add_course(&course("CS101", "Intro to Computing", cs101_seats))?;
    reg.catalog.add_course(&course("CS102", "Data Structures", 30))?;
    for id in ["R1", "R2"] {
        reg.catalog.add_classroom(&Classroom {
            room_id: id.to_string(),
            building: "Main".to_string(),
            room_number: id.trim_start_matches('R').to_string(),
            capacity: 40,
            room_type: "Lecture".to_string(),
        })?;
    }
    for (day, h) in [("Monday", 9), ("Tuesday", 11)] {
        reg.catalog.add_timeslot(
            day,
            NaiveTime::from_hms_opt(h, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(h + 1, 30, 0).unwrap(),
        )?;
    }
    Ok(reg)
}

#[test]
fn full_scenario_allocate_enroll_clash_and_cascade() -> Result<()> {
    let reg = fixture(2, 3)?;

    // CS101 starts unscheduled and gets exactly one session.
    assert!(reg
        .catalog
        .unscheduled_courses()?
        .iter()
        .any(|c| c.course_code == "CS101"));
    let session = reg.allocator.allocate("CS101", 5, 1, "R1")?;
    let second = reg.allocator.allocate("CS101", 6, 2, "R2");
    assert!(matches!(second.unwrap_err(), RegistrarError::Conflict { .. }));

    // Two students fill the course; the third is turned away.
    reg.enrollments.enroll("S1", session.schedule_id)?;
    reg.enrollments.enroll("S2", session.schedule_id)?;
    assert!(matches!(
        reg.enrollments.enroll("S3", session.schedule_id).unwrap_err(),
        RegistrarError::Capacity { .. }
    ));

    // S1 cannot take a second session at the same timeslot.
    let other = reg.allocator.allocate("CS102", 6, 1, "R2")?;
    assert!(matches!(
        reg.enrollments.enroll("S1", other.schedule_id).unwrap_err(),
        RegistrarError::Clash { .. }
    ));

    // Deallocation removes the session and both enrollments in one unit.
    reg.allocator.deallocate(session.schedule_id)?;
    assert_eq!(reg.enrollments.enrollment_count(session.schedule_id)?, 0);
    assert!(reg.enrollments.enrolled_courses("S1")?.is_empty());
    assert!(reg
        .catalog
        .unscheduled_courses()?
        .iter()
        .any(|c| c.course_code == "CS101"));

    Ok(())
}

#[test]
fn concurrent_enrollments_never_overshoot_capacity() -> Result<()> {
    let reg = Arc::new(fixture(2, 8)?);
    let session = reg.allocator.allocate("CS101", 5, 1, "R1")?;

    let handles: Vec<_> = (1..=8)
        .map(|i| {
            let reg = reg.clone();
            thread::spawn(move || reg.enrollments.enroll(&format!("S{i}"), session.schedule_id))
        })
        .collect();

    let mut succeeded = 0;
    for handle in handles {
        match handle.join().unwrap() {
            Ok(()) => succeeded += 1,
            Err(RegistrarError::Capacity { max_students: 2, .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(succeeded, 2);
    assert_eq!(reg.enrollments.enrollment_count(session.schedule_id)?, 2);
    Ok(())
}

#[test]
fn concurrent_allocations_never_double_book() -> Result<()> {
    let reg = Arc::new(fixture(2, 1)?);

    // Both offerings want faculty 5 in room R1 at timeslot 1.
    let a = {
        let reg = reg.clone();
        thread::spawn(move || reg.allocator.allocate("CS101", 5, 1, "R1"))
    };
    let b = {
        let reg = reg.clone();
        thread::spawn(move || reg.allocator.allocate("CS102", 5, 1, "R1"))
    };

    let results = [a.join().unwrap(), b.join().unwrap()];
    let wins = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1);
    for result in &results {
        if let Err(err) = result {
            assert!(matches!(err, RegistrarError::Conflict { .. }));
            assert!(err.is_retryable());
        }
    }
    assert_eq!(reg.allocator.all_sessions()?.len(), 1);
    Ok(())
}

#[test]
fn session_details_serialize_for_the_presentation_layer() -> Result<()> {
    let reg = fixture(2, 1)?;
    let session = reg.allocator.allocate("CS101", 5, 1, "R1")?;

    let details = reg.allocator.session(session.schedule_id)?;
    let json = serde_json::to_value(&details)?;
    assert_eq!(json["course_code"], "CS101");
    assert_eq!(json["faculty_name"], "Prof Hopper");
    assert_eq!(json["start_time"], "09:00:00");
    Ok(())
}
