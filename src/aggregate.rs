use std::collections::HashMap;

use chrono::NaiveDate;

use crate::error::AppError;
use crate::model::{Lecture, Stream};
use crate::repo::Repository;

/// Attendance for one stream over an inclusive date window. Columns are
/// ordered by subject title, rows by index number, and each row's
/// `per_lecture` runs parallel to `lectures`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceMatrix {
    pub stream: Stream,
    pub start_date: String,
    pub end_date: String,
    pub lectures: Vec<LectureColumn>,
    pub rows: Vec<StudentRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LectureColumn {
    pub code: String,
    pub subject: String,
    /// Finalized sessions inside the window, the percentage denominator.
    pub held: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentRow {
    pub index_no: String,
    pub name: String,
    pub per_lecture: Vec<i64>,
    pub overall: i64,
}

/// Validates a `YYYY-MM-DD` parameter and hands it back in canonical
/// zero-padded form, so window strings always compare lexically against
/// the stored ISO dates. Names the offending field in the error. Shared
/// by every surface that takes a date window.
pub fn validate_date(label: &str, value: Option<&str>) -> Result<String, AppError> {
    let Some(raw) = value else {
        return Err(AppError::invalid_argument(format!("missing {label}")));
    };
    let Ok(date) = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") else {
        return Err(AppError::invalid_argument(format!(
            "{label} must be a YYYY-MM-DD date (got {raw:?})"
        )));
    };
    Ok(date.format("%Y-%m-%d").to_string())
}

/// Per-lecture percentage: `ceil(attended / held * 100)`. A lecture with no
/// finalized sessions in the window reads 0, never a division error.
pub fn attendance_percent(attended: i64, held: i64) -> i64 {
    if held <= 0 {
        return 0;
    }
    (attended as f64 / held as f64 * 100.0).ceil() as i64
}

/// Overall percentage: ceiling of the plain mean over the per-lecture
/// percentages. Every column counts, including 0% ones.
pub fn overall_percent(per_lecture: &[i64]) -> i64 {
    if per_lecture.is_empty() {
        return 0;
    }
    let sum: i64 = per_lecture.iter().sum();
    (sum as f64 / per_lecture.len() as f64).ceil() as i64
}

/// Builds the attendance matrix for a stream and window. Both boundary
/// dates count. Each record set is fetched once and joined here through
/// hash maps keyed by lecture code and student email; attendance events
/// are counted as-is, dedup belongs to the upstream marking flow.
pub fn aggregate_attendance(
    repo: &dyn Repository,
    stream: Stream,
    start_date: Option<&str>,
    end_date: Option<&str>,
) -> Result<AttendanceMatrix, AppError> {
    let start = validate_date("startDate", start_date)?;
    let end = validate_date("endDate", end_date)?;

    let mut students = repo.students_by_stream(stream)?;
    if students.is_empty() {
        return Err(AppError::not_found(format!(
            "no students found for stream {stream}"
        )));
    }
    students.sort_by(|a, b| a.index_no.cmp(&b.index_no));

    // Lectures without a code have no column identity and are left out.
    let mut lectures: Vec<Lecture> = repo
        .lectures_by_stream(stream)?
        .into_iter()
        .filter(|l| l.code.is_some())
        .collect();
    if lectures.is_empty() {
        return Err(AppError::not_found(format!(
            "no lectures found for stream {stream}"
        )));
    }
    lectures.sort_by(|a, b| a.subject.cmp(&b.subject));

    let mut held_by_code: HashMap<String, i64> = HashMap::new();
    for session in repo.finalized_sessions_between(&start, &end)? {
        *held_by_code.entry(session.lecture_code).or_insert(0) += 1;
    }

    let mut attended: HashMap<String, HashMap<String, i64>> = HashMap::new();
    for event in repo.attendance_events_between(&start, &end)? {
        *attended
            .entry(event.student_email)
            .or_default()
            .entry(event.lecture_code)
            .or_insert(0) += 1;
    }

    let columns: Vec<LectureColumn> = lectures
        .iter()
        .map(|lecture| {
            let code = lecture.code.clone().unwrap_or_default();
            LectureColumn {
                held: held_by_code.get(&code).copied().unwrap_or(0),
                subject: lecture.subject.clone(),
                code,
            }
        })
        .collect();

    let rows: Vec<StudentRow> = students
        .iter()
        .map(|student| {
            let by_code = attended.get(&student.email);
            let per_lecture: Vec<i64> = columns
                .iter()
                .map(|column| {
                    let count = by_code
                        .and_then(|m| m.get(&column.code))
                        .copied()
                        .unwrap_or(0);
                    attendance_percent(count, column.held)
                })
                .collect();
            let overall = overall_percent(&per_lecture);
            StudentRow {
                index_no: student.index_no.clone(),
                name: student.name.clone(),
                per_lecture,
                overall,
            }
        })
        .collect();

    Ok(AttendanceMatrix {
        stream,
        start_date: start,
        end_date: end,
        lectures: columns,
        rows,
    })
}
