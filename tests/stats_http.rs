use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Duration;
use serde_json::Value;
use tower::ServiceExt;

use attendance_portal::clock;
use attendance_portal::completion::week_bounds;
use attendance_portal::http::{build_router, AppState};
use attendance_portal::model::{ClassSession, Lecture, SessionStatus, Stream, Student};
use attendance_portal::store::SqliteRepository;

const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

fn app_with(seed: impl FnOnce(&SqliteRepository)) -> axum::Router {
    let store = SqliteRepository::open_in_memory().expect("open store");
    seed(&store);
    build_router(AppState::new(store))
}

/// One lecture per weekday so today always matches exactly one slot, two
/// finalized sessions inside the current week, plus noise that must not
/// count: a cancelled session and a finalized one from last week.
fn seed_week_schedule(store: &SqliteRepository) {
    store
        .add_lecturer("jane@uni.edu", "Dr. Jane Perera")
        .expect("seed lecturer");
    for (index_no, email) in [("194001A", "a@uni.edu"), ("194002B", "b@uni.edu")] {
        store
            .add_student(&Student {
                index_no: index_no.to_string(),
                name: format!("Student {index_no}"),
                email: email.to_string(),
                stream: Stream::Cs,
                intake: "2024".to_string(),
            })
            .expect("seed student");
    }
    for (i, day) in WEEKDAYS.iter().enumerate() {
        store
            .add_lecture(&Lecture {
                id: format!("lec-w{i}"),
                code: Some(format!("CSW{i}")),
                subject: format!("Weekly {day}"),
                intake: Some("2024".to_string()),
                streams: vec![Stream::Cs],
                day: Some(day.to_string()),
                start_time: None,
                end_time: None,
                lecturer_emails: vec!["jane@uni.edu".to_string()],
            })
            .expect("seed lecture");
    }

    let (monday, _) = week_bounds(clock::campus_today());
    let session = |id: &str, date: String, status: SessionStatus| ClassSession {
        id: id.to_string(),
        lecture_code: "CSW0".to_string(),
        date,
        status,
    };
    store
        .add_session(&session(
            "s-mon",
            clock::iso_date(monday),
            SessionStatus::Finalized,
        ))
        .expect("seed session");
    store
        .add_session(&session(
            "s-tue",
            clock::iso_date(monday + Duration::days(1)),
            SessionStatus::Finalized,
        ))
        .expect("seed session");
    store
        .add_session(&session(
            "s-wed-cancelled",
            clock::iso_date(monday + Duration::days(2)),
            SessionStatus::Cancelled,
        ))
        .expect("seed session");
    store
        .add_session(&session(
            "s-last-week",
            clock::iso_date(monday - Duration::days(3)),
            SessionStatus::Finalized,
        ))
        .expect("seed session");
}

async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("send request");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let value = serde_json::from_slice(&bytes).expect("json body");
    (status, value)
}

#[tokio::test]
async fn completion_rate_covers_the_current_week() {
    let app = app_with(seed_week_schedule);
    let (status, value) = get_json(app, "/stats/completion-rate").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["totalScheduled"], 7);
    assert_eq!(value["totalFinalized"], 2);
    // 2/7 as a percentage, one decimal: 28.6.
    assert_eq!(value["completionRate"], 28.6);
    assert_eq!(value["completionRateText"], "28.6%");

    let (monday, sunday) = week_bounds(clock::campus_today());
    assert_eq!(
        value["weekRange"],
        format!("{} - {}", clock::iso_date(monday), clock::iso_date(sunday))
    );
}

#[tokio::test]
async fn completion_rate_on_an_empty_portal_is_zero() {
    let app = app_with(|_| {});
    let (status, value) = get_json(app, "/stats/completion-rate").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["totalScheduled"], 0);
    assert_eq!(value["completionRate"], 0.0);
    assert_eq!(value["completionRateText"], "0.0%");
}

#[tokio::test]
async fn weekly_trend_runs_monday_to_sunday() {
    let app = app_with(seed_week_schedule);
    let (status, value) = get_json(app, "/stats/weekly-trend").await;

    assert_eq!(status, StatusCode::OK);
    let points = value.as_array().expect("trend array");
    assert_eq!(points.len(), 7);

    let (monday, _) = week_bounds(clock::campus_today());
    for (i, point) in points.iter().enumerate() {
        assert_eq!(
            point["date"],
            clock::iso_date(monday + Duration::days(i as i64))
        );
        assert_eq!(point["day"], WEEKDAYS[i]);
        // One recurring lecture per weekday.
        assert_eq!(point["scheduled"], 1);
    }

    // Monday and Tuesday each saw one finalized session; the cancelled
    // Wednesday one does not count.
    assert_eq!(points[0]["finalized"], 1);
    assert_eq!(points[0]["rate"], 100.0);
    assert_eq!(points[1]["finalized"], 1);
    assert_eq!(points[2]["finalized"], 0);
    assert_eq!(points[2]["rate"], 0.0);
}

#[tokio::test]
async fn dashboard_combines_counters_week_and_today() {
    let app = app_with(seed_week_schedule);
    let (status, value) = get_json(app, "/stats/dashboard").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["totalStudents"], 2);
    assert_eq!(value["totalLectures"], 7);
    assert_eq!(value["completionRate"], 28.6);
    assert_eq!(value["completionRateText"], "28.6%");
    // Exactly one of the weekday slots is today's; none carry times.
    assert_eq!(value["todayLectureCount"], 1);
    assert_eq!(value["ongoingLectureCount"], 0);

    let (monday, sunday) = week_bounds(clock::campus_today());
    assert_eq!(
        value["weekRange"],
        format!("{} - {}", clock::iso_date(monday), clock::iso_date(sunday))
    );
}

#[tokio::test]
async fn today_lectures_resolve_names_and_headcounts() {
    let app = app_with(seed_week_schedule);
    let (status, value) = get_json(app, "/stats/today-lectures").await;

    assert_eq!(status, StatusCode::OK);
    let today = clock::campus_today();
    assert_eq!(value["date"], clock::iso_date(today));
    assert_eq!(value["day"], clock::weekday_name(today));
    assert_eq!(value["lectureCount"], 1);
    assert_eq!(value["ongoingCount"], 0);

    let lecture = &value["lectures"][0];
    assert_eq!(
        lecture["subject"],
        format!("Weekly {}", clock::weekday_name(today))
    );
    assert_eq!(lecture["lecturerName"], "Dr. Jane Perera");
    assert_eq!(lecture["lecturerCount"], 1);
    // Both seeded students share the lecture's intake and stream.
    assert_eq!(lecture["studentCount"], 2);
    assert_eq!(lecture["ongoing"], false);
}

#[tokio::test]
async fn all_day_bounds_read_as_ongoing() {
    let app = app_with(|store| {
        let today = clock::campus_today();
        store
            .add_lecture(&Lecture {
                id: "lec-allday".to_string(),
                code: Some("CS999".to_string()),
                subject: "Open Lab".to_string(),
                intake: None,
                streams: vec![Stream::Cs],
                day: Some(clock::weekday_name(today).to_string()),
                start_time: Some("00:00".to_string()),
                end_time: Some("23:59".to_string()),
                lecturer_emails: Vec::new(),
            })
            .expect("seed lecture");
    });

    let (status, value) = get_json(app, "/stats/today-lectures").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["ongoingCount"], 1);
    let lecture = &value["ongoing"][0];
    assert_eq!(lecture["ongoing"], true);
    assert_eq!(lecture["lecturerName"], "TBA");
    assert_eq!(lecture["lecturerCount"], 0);
    // No intake on the slot, so nobody counts as enrolled.
    assert_eq!(lecture["studentCount"], 0);
}
