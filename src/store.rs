use std::path::Path;

use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::error::AppError;
use crate::model::{
    AttendanceEvent, ClassSession, Lecture, ReportKind, ReportRequest, SessionStatus, Stream,
    Student,
};
use crate::repo::Repository;

/// SQLite-backed record store. Record sets stay denormalized the way the
/// engine reads them: list fields (streams, lecturer emails) are stored as
/// comma-joined tags and split on read, and no query joins across tables.
pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    pub fn open(path: &Path) -> anyhow::Result<SqliteRepository> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        Ok(SqliteRepository { conn })
    }

    pub fn open_in_memory() -> anyhow::Result<SqliteRepository> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(SqliteRepository { conn })
    }

    pub fn add_student(&self, student: &Student) -> Result<(), AppError> {
        self.conn.execute(
            "INSERT INTO students(index_no, name, email, stream, intake)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                student.index_no,
                student.name,
                student.email,
                student.stream.as_str(),
                student.intake,
            ],
        )?;
        Ok(())
    }

    pub fn add_lecturer(&self, email: &str, name: &str) -> Result<(), AppError> {
        self.conn.execute(
            "INSERT INTO lecturers(email, name) VALUES (?1, ?2)",
            params![email, name],
        )?;
        Ok(())
    }

    pub fn add_lecture(&self, lecture: &Lecture) -> Result<(), AppError> {
        let streams = join_tags(lecture.streams.iter().map(|s| s.as_str()));
        let lecturers = join_tags(lecture.lecturer_emails.iter().map(String::as_str));
        self.conn.execute(
            "INSERT INTO lectures(id, code, subject, intake, streams, day, start_time, end_time, lecturer_emails)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                lecture.id,
                lecture.code,
                lecture.subject,
                lecture.intake,
                streams,
                lecture.day,
                lecture.start_time,
                lecture.end_time,
                lecturers,
            ],
        )?;
        Ok(())
    }

    pub fn add_session(&self, session: &ClassSession) -> Result<(), AppError> {
        self.conn.execute(
            "INSERT INTO class_sessions(id, lecture_code, date, status)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                session.id,
                session.lecture_code,
                session.date,
                session.status.as_str(),
            ],
        )?;
        Ok(())
    }

    pub fn add_attendance_event(&self, event: &AttendanceEvent) -> Result<(), AppError> {
        self.conn.execute(
            "INSERT INTO attendance_events(id, student_email, lecture_code, date, marked_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                event.id,
                event.student_email,
                event.lecture_code,
                event.date,
                event.marked_at,
            ],
        )?;
        Ok(())
    }
}

impl Repository for SqliteRepository {
    fn students_by_stream(&self, stream: Stream) -> Result<Vec<Student>, AppError> {
        let mut stmt = self.conn.prepare(
            "SELECT index_no, name, email, intake FROM students WHERE stream = ?1",
        )?;
        let rows = stmt.query_map([stream.as_str()], move |row| {
            Ok(Student {
                index_no: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                stream,
                intake: row.get(3)?,
            })
        })?;
        let mut students = Vec::new();
        for row in rows {
            students.push(row?);
        }
        Ok(students)
    }

    fn student_count(&self) -> Result<i64, AppError> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM students", [], |row| row.get(0))?;
        Ok(count)
    }

    fn student_count_by_intake(&self, intake: &str) -> Result<i64, AppError> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM students WHERE intake = ?1",
            [intake],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn student_count_by_intake_and_streams(
        &self,
        intake: &str,
        streams: &[Stream],
    ) -> Result<i64, AppError> {
        if streams.is_empty() {
            return Ok(0);
        }
        let placeholders = vec!["?"; streams.len()].join(", ");
        let sql = format!(
            "SELECT COUNT(*) FROM students WHERE intake = ? AND stream IN ({placeholders})"
        );
        let mut values: Vec<Value> = Vec::with_capacity(streams.len() + 1);
        values.push(Value::Text(intake.to_string()));
        for stream in streams {
            values.push(Value::Text(stream.as_str().to_string()));
        }
        let count = self
            .conn
            .query_row(&sql, params_from_iter(values), |row| row.get(0))?;
        Ok(count)
    }

    fn lectures_all(&self) -> Result<Vec<Lecture>, AppError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, code, subject, intake, streams, day, start_time, end_time, lecturer_emails
             FROM lectures",
        )?;
        let rows = stmt.query_map([], lecture_from_row)?;
        let mut lectures = Vec::new();
        for row in rows {
            lectures.push(row?);
        }
        Ok(lectures)
    }

    fn lectures_by_stream(&self, stream: Stream) -> Result<Vec<Lecture>, AppError> {
        // Stream membership lives in a joined tag list, so the filter runs
        // over the decoded rows rather than in SQL.
        let lectures = self
            .lectures_all()?
            .into_iter()
            .filter(|l| l.streams.contains(&stream))
            .collect();
        Ok(lectures)
    }

    fn lectures_on_day(&self, day: &str) -> Result<Vec<Lecture>, AppError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, code, subject, intake, streams, day, start_time, end_time, lecturer_emails
             FROM lectures WHERE day IS NOT NULL AND lower(day) = lower(?1)",
        )?;
        let rows = stmt.query_map([day], lecture_from_row)?;
        let mut lectures = Vec::new();
        for row in rows {
            lectures.push(row?);
        }
        Ok(lectures)
    }

    fn lecture_count(&self) -> Result<i64, AppError> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM lectures", [], |row| row.get(0))?;
        Ok(count)
    }

    fn lecturer_name(&self, email: &str) -> Result<Option<String>, AppError> {
        let name = self
            .conn
            .query_row(
                "SELECT name FROM lecturers WHERE email = ?1",
                [email],
                |row| row.get(0),
            )
            .optional()?;
        Ok(name)
    }

    fn finalized_sessions_between(
        &self,
        start: &str,
        end: &str,
    ) -> Result<Vec<ClassSession>, AppError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, lecture_code, date FROM class_sessions
             WHERE status = 'finalized' AND date >= ?1 AND date <= ?2",
        )?;
        let rows = stmt.query_map([start, end], |row| {
            Ok(ClassSession {
                id: row.get(0)?,
                lecture_code: row.get(1)?,
                date: row.get(2)?,
                status: SessionStatus::Finalized,
            })
        })?;
        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row?);
        }
        Ok(sessions)
    }

    fn attendance_events_between(
        &self,
        start: &str,
        end: &str,
    ) -> Result<Vec<AttendanceEvent>, AppError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, student_email, lecture_code, date, marked_at FROM attendance_events
             WHERE date >= ?1 AND date <= ?2",
        )?;
        let rows = stmt.query_map([start, end], |row| {
            Ok(AttendanceEvent {
                id: row.get(0)?,
                student_email: row.get(1)?,
                lecture_code: row.get(2)?,
                date: row.get(3)?,
                marked_at: row.get(4)?,
            })
        })?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row?);
        }
        Ok(events)
    }

    fn append_report_request(&self, request: &ReportRequest) -> Result<(), AppError> {
        self.conn.execute(
            "INSERT INTO report_requests(id, kind, stream, start_date, end_date, requested_by, downloads, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                request.id,
                request.kind.as_str(),
                request.stream.as_str(),
                request.start_date,
                request.end_date,
                request.requested_by,
                request.downloads,
                request.created_at,
            ],
        )?;
        Ok(())
    }

    fn report_requests(&self) -> Result<Vec<ReportRequest>, AppError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, stream, start_date, end_date, requested_by, downloads, created_at
             FROM report_requests ORDER BY created_at",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, i64>(6)?,
                row.get::<_, String>(7)?,
            ))
        })?;
        let mut requests = Vec::new();
        for row in rows {
            let (id, kind, stream, start_date, end_date, requested_by, downloads, created_at) =
                row?;
            // Rows only ever arrive through the typed append, so an
            // unparseable tag means outside tampering; skip it.
            let (Ok(kind), Some(stream)) = (ReportKind::parse(&kind), Stream::parse_lenient(&stream))
            else {
                continue;
            };
            requests.push(ReportRequest {
                id,
                kind,
                stream,
                start_date,
                end_date,
                requested_by,
                downloads,
                created_at,
            });
        }
        Ok(requests)
    }
}

fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            index_no TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            stream TEXT NOT NULL,
            intake TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_stream ON students(stream)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_intake ON students(intake)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS lecturers(
            email TEXT PRIMARY KEY,
            name TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS lectures(
            id TEXT PRIMARY KEY,
            code TEXT UNIQUE,
            subject TEXT NOT NULL,
            intake TEXT,
            streams TEXT NOT NULL,
            day TEXT,
            start_time TEXT,
            end_time TEXT,
            lecturer_emails TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_lectures_day ON lectures(day)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS class_sessions(
            id TEXT PRIMARY KEY,
            lecture_code TEXT NOT NULL,
            date TEXT NOT NULL,
            status TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_class_sessions_status_date ON class_sessions(status, date)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_class_sessions_lecture ON class_sessions(lecture_code)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS attendance_events(
            id TEXT PRIMARY KEY,
            student_email TEXT NOT NULL,
            lecture_code TEXT NOT NULL,
            date TEXT NOT NULL,
            marked_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_events_date ON attendance_events(date)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_events_student ON attendance_events(student_email, lecture_code)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS report_requests(
            id TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            stream TEXT NOT NULL,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            requested_by TEXT NOT NULL,
            downloads INTEGER NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}

fn lecture_from_row(row: &Row<'_>) -> rusqlite::Result<Lecture> {
    let streams: String = row.get(4)?;
    let lecturers: String = row.get(8)?;
    Ok(Lecture {
        id: row.get(0)?,
        code: row.get(1)?,
        subject: row.get(2)?,
        intake: row.get(3)?,
        streams: streams
            .split(',')
            .filter_map(Stream::parse_lenient)
            .collect(),
        day: row.get(5)?,
        start_time: row.get(6)?,
        end_time: row.get(7)?,
        lecturer_emails: split_tags(&lecturers),
    })
}

fn join_tags<'a>(tags: impl Iterator<Item = &'a str>) -> String {
    tags.collect::<Vec<_>>().join(",")
}

fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(index_no: &str, email: &str, stream: Stream, intake: &str) -> Student {
        Student {
            index_no: index_no.to_string(),
            name: format!("Student {index_no}"),
            email: email.to_string(),
            stream,
            intake: intake.to_string(),
        }
    }

    fn lecture(code: &str, subject: &str, streams: &[Stream]) -> Lecture {
        Lecture {
            id: format!("lec-{code}"),
            code: Some(code.to_string()),
            subject: subject.to_string(),
            intake: Some("2024".to_string()),
            streams: streams.to_vec(),
            day: Some("Monday".to_string()),
            start_time: Some("09:00".to_string()),
            end_time: Some("11:00".to_string()),
            lecturer_emails: vec!["jane@uni.edu".to_string()],
        }
    }

    #[test]
    fn students_filter_by_stream() {
        let store = SqliteRepository::open_in_memory().unwrap();
        store
            .add_student(&student("194001A", "a@uni.edu", Stream::Cs, "2024"))
            .unwrap();
        store
            .add_student(&student("194002B", "b@uni.edu", Stream::Se, "2024"))
            .unwrap();

        let cs = store.students_by_stream(Stream::Cs).unwrap();
        assert_eq!(cs.len(), 1);
        assert_eq!(cs[0].index_no, "194001A");
        assert_eq!(store.student_count().unwrap(), 2);
    }

    #[test]
    fn intake_and_stream_counts() {
        let store = SqliteRepository::open_in_memory().unwrap();
        store
            .add_student(&student("194001A", "a@uni.edu", Stream::Cs, "2024"))
            .unwrap();
        store
            .add_student(&student("194002B", "b@uni.edu", Stream::Se, "2024"))
            .unwrap();
        store
            .add_student(&student("184001C", "c@uni.edu", Stream::Cs, "2023"))
            .unwrap();

        assert_eq!(store.student_count_by_intake("2024").unwrap(), 2);
        assert_eq!(
            store
                .student_count_by_intake_and_streams("2024", &[Stream::Cs])
                .unwrap(),
            1
        );
        assert_eq!(
            store
                .student_count_by_intake_and_streams("2024", &[Stream::Cs, Stream::Se])
                .unwrap(),
            2
        );
        assert_eq!(
            store
                .student_count_by_intake_and_streams("2024", &[])
                .unwrap(),
            0
        );
    }

    #[test]
    fn lecture_tag_lists_round_trip() {
        let store = SqliteRepository::open_in_memory().unwrap();
        store
            .add_lecture(&lecture("CS101", "Mathematics", &[Stream::Cs, Stream::Se]))
            .unwrap();

        let all = store.lectures_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].streams, vec![Stream::Cs, Stream::Se]);
        assert_eq!(all[0].lecturer_emails, vec!["jane@uni.edu".to_string()]);

        assert_eq!(store.lectures_by_stream(Stream::Se).unwrap().len(), 1);
        assert_eq!(store.lectures_by_stream(Stream::Ce).unwrap().len(), 0);
    }

    #[test]
    fn unknown_stream_tags_are_dropped_on_read() {
        let store = SqliteRepository::open_in_memory().unwrap();
        store
            .conn
            .execute(
                "INSERT INTO lectures(id, code, subject, intake, streams, day, start_time, end_time, lecturer_emails)
                 VALUES ('l1', 'CS101', 'Mathematics', '2024', 'CS,IT', 'Monday', '09:00', '11:00', '')",
                [],
            )
            .unwrap();

        let all = store.lectures_all().unwrap();
        assert_eq!(all[0].streams, vec![Stream::Cs]);
        assert!(all[0].lecturer_emails.is_empty());
    }

    #[test]
    fn day_lookup_is_case_insensitive() {
        let store = SqliteRepository::open_in_memory().unwrap();
        store
            .add_lecture(&lecture("CS101", "Mathematics", &[Stream::Cs]))
            .unwrap();

        assert_eq!(store.lectures_on_day("monday").unwrap().len(), 1);
        assert_eq!(store.lectures_on_day("Tuesday").unwrap().len(), 0);
    }

    #[test]
    fn session_window_is_inclusive_and_status_filtered() {
        let store = SqliteRepository::open_in_memory().unwrap();
        let mk = |id: &str, date: &str, status: SessionStatus| ClassSession {
            id: id.to_string(),
            lecture_code: "CS101".to_string(),
            date: date.to_string(),
            status,
        };
        store
            .add_session(&mk("s1", "2024-07-01", SessionStatus::Finalized))
            .unwrap();
        store
            .add_session(&mk("s2", "2024-07-31", SessionStatus::Finalized))
            .unwrap();
        store
            .add_session(&mk("s3", "2024-08-01", SessionStatus::Finalized))
            .unwrap();
        store
            .add_session(&mk("s4", "2024-07-15", SessionStatus::Cancelled))
            .unwrap();

        let sessions = store
            .finalized_sessions_between("2024-07-01", "2024-07-31")
            .unwrap();
        let mut ids: Vec<&str> = sessions.iter().map(|s| s.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["s1", "s2"]);
    }

    #[test]
    fn report_log_appends_and_reads_back() {
        let store = SqliteRepository::open_in_memory().unwrap();
        let request = ReportRequest {
            id: "r1".to_string(),
            kind: ReportKind::AttendanceSummary,
            stream: Stream::Cs,
            start_date: "2024-07-01".to_string(),
            end_date: "2024-07-31".to_string(),
            requested_by: "admin".to_string(),
            downloads: 1,
            created_at: "2024-07-31T10:00:00Z".to_string(),
        };
        store.append_report_request(&request).unwrap();

        let rows = store.report_requests().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].downloads, 1);
        assert_eq!(rows[0].kind, ReportKind::AttendanceSummary);
    }
}
