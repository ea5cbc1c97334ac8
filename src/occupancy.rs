use chrono::{DateTime, FixedOffset, NaiveTime, Timelike};
use serde::Serialize;

use crate::clock;
use crate::error::AppError;
use crate::model::{Lecture, Stream};
use crate::repo::Repository;

/// How the enrolled headcount for a lecture is scoped, resolved once from
/// the lecture's own fields instead of re-branching on options at every
/// call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrollmentScope {
    ByIntakeAndStreams { intake: String, streams: Vec<Stream> },
    ByIntakeOnly { intake: String },
    None,
}

pub fn enrollment_scope(lecture: &Lecture) -> EnrollmentScope {
    match &lecture.intake {
        Some(intake) if !lecture.streams.is_empty() => EnrollmentScope::ByIntakeAndStreams {
            intake: intake.clone(),
            streams: lecture.streams.clone(),
        },
        Some(intake) => EnrollmentScope::ByIntakeOnly {
            intake: intake.clone(),
        },
        None => EnrollmentScope::None,
    }
}

/// Minutes since midnight for an `HH:MM` clock string; `None` when the
/// string does not parse.
pub fn minutes_of_day(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    let time = NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .ok()?;
    Some(time.hour() * 60 + time.minute())
}

/// A lecture is in session from its first minute through its last one,
/// both ends inclusive. Missing or unparseable bounds read as not ongoing.
pub fn is_ongoing(start: Option<&str>, end: Option<&str>, now_minutes: u32) -> bool {
    match (
        start.and_then(minutes_of_day),
        end.and_then(minutes_of_day),
    ) {
        (Some(from), Some(to)) => from <= now_minutes && now_minutes <= to,
        _ => false,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayLecture {
    pub code: Option<String>,
    pub subject: String,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    /// Resolved display names joined with ", ", or "TBA" when none resolve.
    pub lecturer_name: String,
    /// How many of the lecture's emails resolved to a known lecturer.
    pub lecturer_count: usize,
    pub student_count: i64,
    pub ongoing: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayLectureStats {
    pub date: String,
    pub day: String,
    pub lectures: Vec<TodayLecture>,
    pub ongoing: Vec<TodayLecture>,
    pub lecture_count: usize,
    pub ongoing_count: usize,
}

/// Today's schedule in the campus zone: every lecture recurring on today's
/// weekday, decorated with lecturer names and the enrolled headcount, plus
/// the subset currently in session at `now`.
pub fn today_lecture_stats(
    repo: &dyn Repository,
    now: DateTime<FixedOffset>,
) -> Result<TodayLectureStats, AppError> {
    let today = now.date_naive();
    let day = clock::weekday_name(today);
    let now_minutes = now.hour() * 60 + now.minute();

    let mut lectures = Vec::new();
    for lecture in repo.lectures_on_day(day)? {
        let mut names = Vec::new();
        for email in &lecture.lecturer_emails {
            if let Some(name) = repo.lecturer_name(email)? {
                names.push(name);
            }
        }
        let lecturer_count = names.len();
        let lecturer_name = if names.is_empty() {
            "TBA".to_string()
        } else {
            names.join(", ")
        };

        let student_count = match enrollment_scope(&lecture) {
            EnrollmentScope::ByIntakeAndStreams { intake, streams } => {
                repo.student_count_by_intake_and_streams(&intake, &streams)?
            }
            EnrollmentScope::ByIntakeOnly { intake } => repo.student_count_by_intake(&intake)?,
            EnrollmentScope::None => 0,
        };

        let ongoing = is_ongoing(
            lecture.start_time.as_deref(),
            lecture.end_time.as_deref(),
            now_minutes,
        );
        lectures.push(TodayLecture {
            code: lecture.code,
            subject: lecture.subject,
            start_time: lecture.start_time,
            end_time: lecture.end_time,
            lecturer_name,
            lecturer_count,
            student_count,
            ongoing,
        });
    }

    let ongoing: Vec<TodayLecture> = lectures.iter().filter(|l| l.ongoing).cloned().collect();
    Ok(TodayLectureStats {
        date: clock::iso_date(today),
        day: day.to_string(),
        lecture_count: lectures.len(),
        ongoing_count: ongoing.len(),
        lectures,
        ongoing,
    })
}
