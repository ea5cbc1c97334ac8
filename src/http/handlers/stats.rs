use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::clock;
use crate::completion::{self, TrendPoint, WeekCompletion};
use crate::error::AppError;
use crate::http::AppState;
use crate::occupancy::{self, TodayLectureStats};
use crate::repo::Repository;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_students: i64,
    pub total_lectures: i64,
    pub completion_rate: f64,
    pub completion_rate_text: String,
    pub week_range: String,
    pub today_lecture_count: usize,
    pub ongoing_lecture_count: usize,
}

/// GET /stats/completion-rate: current-week completion in the campus zone.
pub async fn completion_rate(
    State(state): State<AppState>,
) -> Result<Json<WeekCompletion>, AppError> {
    let store = state.store()?;
    Ok(Json(completion::weekly_completion(
        &*store,
        clock::campus_today(),
    )?))
}

/// GET /stats/dashboard: headline counters plus the week and today
/// summaries, all computed against the same instant.
pub async fn dashboard(State(state): State<AppState>) -> Result<Json<DashboardStats>, AppError> {
    let now = clock::campus_now();
    let store = state.store()?;

    let total_students = store.student_count()?;
    let total_lectures = store.lecture_count()?;
    let week = completion::weekly_completion(&*store, now.date_naive())?;
    let today = occupancy::today_lecture_stats(&*store, now)?;

    Ok(Json(DashboardStats {
        total_students,
        total_lectures,
        completion_rate: week.completion_rate,
        completion_rate_text: week.completion_rate_text,
        week_range: week.week_range,
        today_lecture_count: today.lecture_count,
        ongoing_lecture_count: today.ongoing_count,
    }))
}

/// GET /stats/weekly-trend: seven points, Monday through Sunday.
pub async fn weekly_trend(
    State(state): State<AppState>,
) -> Result<Json<Vec<TrendPoint>>, AppError> {
    let store = state.store()?;
    Ok(Json(completion::weekly_trend(
        &*store,
        clock::campus_today(),
    )?))
}

/// GET /stats/today-lectures: today's schedule with the ongoing subset.
pub async fn today_lectures(
    State(state): State<AppState>,
) -> Result<Json<TodayLectureStats>, AppError> {
    let store = state.store()?;
    Ok(Json(occupancy::today_lecture_stats(
        &*store,
        clock::campus_now(),
    )?))
}
