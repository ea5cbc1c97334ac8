use crate::error::AppError;
use crate::model::{AttendanceEvent, ClassSession, Lecture, ReportRequest, Stream, Student};

/// Query capability the engine is written against, plus the one append the
/// report builder performs. Each method is a single bounded scan over one
/// record set; the engine does all cross-set joining in memory, so no
/// implementation ever needs to join across sets itself.
///
/// List methods make no ordering promise. Components that present ordered
/// output sort on their own keys.
pub trait Repository {
    fn students_by_stream(&self, stream: Stream) -> Result<Vec<Student>, AppError>;
    fn student_count(&self) -> Result<i64, AppError>;
    fn student_count_by_intake(&self, intake: &str) -> Result<i64, AppError>;
    fn student_count_by_intake_and_streams(
        &self,
        intake: &str,
        streams: &[Stream],
    ) -> Result<i64, AppError>;

    fn lectures_all(&self) -> Result<Vec<Lecture>, AppError>;
    fn lectures_by_stream(&self, stream: Stream) -> Result<Vec<Lecture>, AppError>;
    /// Lectures whose weekly recurrence falls on the given weekday name.
    /// Matching is case-insensitive.
    fn lectures_on_day(&self, day: &str) -> Result<Vec<Lecture>, AppError>;
    fn lecture_count(&self) -> Result<i64, AppError>;

    fn lecturer_name(&self, email: &str) -> Result<Option<String>, AppError>;

    /// Finalized sessions with `start <= date <= end` (ISO strings, compared
    /// lexically). Other statuses never appear in the result.
    fn finalized_sessions_between(
        &self,
        start: &str,
        end: &str,
    ) -> Result<Vec<ClassSession>, AppError>;

    /// Raw attendance occurrences inside the window, duplicates included.
    fn attendance_events_between(
        &self,
        start: &str,
        end: &str,
    ) -> Result<Vec<AttendanceEvent>, AppError>;

    fn append_report_request(&self, request: &ReportRequest) -> Result<(), AppError>;
    fn report_requests(&self) -> Result<Vec<ReportRequest>, AppError>;
}
