use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Closed set of academic streams. Every surface that accepts a stream
/// parameter goes through [`Stream::parse`], so unrecognized tags are
/// rejected once, at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stream {
    #[serde(rename = "CS")]
    Cs,
    #[serde(rename = "SE")]
    Se,
    #[serde(rename = "CE")]
    Ce,
}

impl Stream {
    pub const ALL: [Stream; 3] = [Stream::Cs, Stream::Se, Stream::Ce];

    pub fn as_str(self) -> &'static str {
        match self {
            Stream::Cs => "CS",
            Stream::Se => "SE",
            Stream::Ce => "CE",
        }
    }

    pub fn parse(raw: &str) -> Result<Stream, AppError> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "CS" => Ok(Stream::Cs),
            "SE" => Ok(Stream::Se),
            "CE" => Ok(Stream::Ce),
            _ => Err(AppError::invalid_argument(format!(
                "stream must be one of CS, SE, CE (got {raw:?})"
            ))),
        }
    }

    /// Lenient form for tags already in the store: unknown tags are dropped
    /// instead of failing the whole read.
    pub fn parse_lenient(raw: &str) -> Option<Stream> {
        Stream::parse(raw).ok()
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a concrete class occurrence. Only `Finalized` sessions count
/// toward attendance denominators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Scheduled,
    Ongoing,
    Finalized,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "scheduled",
            SessionStatus::Ongoing => "ongoing",
            SessionStatus::Finalized => "finalized",
            SessionStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse_lenient(raw: &str) -> Option<SessionStatus> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "scheduled" => Some(SessionStatus::Scheduled),
            "ongoing" => Some(SessionStatus::Ongoing),
            "finalized" => Some(SessionStatus::Finalized),
            "cancelled" => Some(SessionStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportKind {
    #[serde(rename = "attendance_summary")]
    AttendanceSummary,
    #[serde(rename = "monthly_summary")]
    MonthlySummary,
}

impl ReportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportKind::AttendanceSummary => "attendance_summary",
            ReportKind::MonthlySummary => "monthly_summary",
        }
    }

    pub fn parse(raw: &str) -> Result<ReportKind, AppError> {
        match raw.trim() {
            "attendance_summary" => Ok(ReportKind::AttendanceSummary),
            "monthly_summary" => Ok(ReportKind::MonthlySummary),
            _ => Err(AppError::invalid_argument(format!(
                "type must be attendance_summary or monthly_summary (got {raw:?})"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    /// University index number, the unique registration key.
    pub index_no: String,
    pub name: String,
    pub email: String,
    pub stream: Stream,
    pub intake: String,
}

/// A recurring lecture slot. `code` doubles as the report code: a lecture
/// without one never appears as a report column.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lecture {
    pub id: String,
    pub code: Option<String>,
    pub subject: String,
    pub intake: Option<String>,
    pub streams: Vec<Stream>,
    /// Weekday name of the weekly recurrence, e.g. "Monday".
    pub day: Option<String>,
    /// "HH:MM" wall-clock bounds in the campus zone.
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub lecturer_emails: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSession {
    pub id: String,
    pub lecture_code: String,
    /// ISO `YYYY-MM-DD`; window checks compare these lexically.
    pub date: String,
    pub status: SessionStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceEvent {
    pub id: String,
    pub student_email: String,
    pub lecture_code: String,
    pub date: String,
    pub marked_at: String,
}

/// Append-only report log entry; one row per generate or download call,
/// never mutated afterwards. Totals are recomputed from the log at read
/// time instead of being kept as a counter.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub id: String,
    pub kind: ReportKind,
    pub stream: Stream,
    pub start_date: String,
    pub end_date: String,
    pub requested_by: String,
    /// 1 for a download call, 0 for a generate call.
    pub downloads: i64,
    pub created_at: String,
}
