use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::clock;
use crate::error::AppError;
use crate::repo::Repository;

/// One-decimal rounding, `Int(10x + 0.5) / 10`. Standard rounding, not
/// the ceiling policy the per-student percentages use.
pub fn round1(value: f64) -> f64 {
    (value * 10.0 + 0.5).floor() / 10.0
}

/// Finalized over scheduled as a percentage, rounded to one decimal.
/// Nothing scheduled reads 0.0.
pub fn completion_rate(finalized: i64, scheduled: i64) -> f64 {
    if scheduled <= 0 {
        return 0.0;
    }
    round1(finalized as f64 / scheduled as f64 * 100.0)
}

/// Monday-through-Sunday bounds of the week containing `today`.
pub fn week_bounds(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let monday = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
    (monday, monday + Duration::days(6))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekCompletion {
    pub completion_rate: f64,
    pub completion_rate_text: String,
    pub total_scheduled: i64,
    pub total_finalized: i64,
    pub week_range: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub date: String,
    pub day: String,
    pub scheduled: i64,
    pub finalized: i64,
    pub rate: f64,
}

/// Current-week completion: scheduled counts recurring lecture slots whose
/// weekday falls in the week, finalized counts finalized sessions dated
/// inside it.
pub fn weekly_completion(
    repo: &dyn Repository,
    today: NaiveDate,
) -> Result<WeekCompletion, AppError> {
    let (monday, sunday) = week_bounds(today);
    let start = clock::iso_date(monday);
    let end = clock::iso_date(sunday);

    let total_scheduled = repo
        .lectures_all()?
        .iter()
        .filter(|lecture| {
            lecture
                .day
                .as_deref()
                .is_some_and(|day| is_weekday_name(day))
        })
        .count() as i64;
    let total_finalized = repo.finalized_sessions_between(&start, &end)?.len() as i64;

    let rate = completion_rate(total_finalized, total_scheduled);
    Ok(WeekCompletion {
        completion_rate: rate,
        completion_rate_text: format!("{rate:.1}%"),
        total_scheduled,
        total_finalized,
        week_range: format!("{start} - {end}"),
    })
}

/// Per-day breakdown over the same week: seven points, Monday first, each
/// holding that weekday's scheduled slots against its finalized sessions.
pub fn weekly_trend(repo: &dyn Repository, today: NaiveDate) -> Result<Vec<TrendPoint>, AppError> {
    let (monday, sunday) = week_bounds(today);

    let mut scheduled_by_day: HashMap<String, i64> = HashMap::new();
    for lecture in repo.lectures_all()? {
        if let Some(day) = lecture.day.as_deref() {
            *scheduled_by_day
                .entry(day.to_ascii_lowercase())
                .or_insert(0) += 1;
        }
    }

    let mut finalized_by_date: HashMap<String, i64> = HashMap::new();
    for session in
        repo.finalized_sessions_between(&clock::iso_date(monday), &clock::iso_date(sunday))?
    {
        *finalized_by_date.entry(session.date).or_insert(0) += 1;
    }

    let points = (0..7)
        .map(|offset| {
            let date = monday + Duration::days(offset);
            let day = clock::weekday_name(date);
            let iso = clock::iso_date(date);
            let scheduled = scheduled_by_day
                .get(&day.to_ascii_lowercase())
                .copied()
                .unwrap_or(0);
            let finalized = finalized_by_date.get(&iso).copied().unwrap_or(0);
            TrendPoint {
                date: iso,
                day: day.to_string(),
                scheduled,
                finalized,
                rate: completion_rate(finalized, scheduled),
            }
        })
        .collect();
    Ok(points)
}

/// A week always spans all seven weekday names, so the scheduled test is
/// membership in that fixed set, matched case-insensitively.
fn is_weekday_name(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "monday" | "tuesday" | "wednesday" | "thursday" | "friday" | "saturday" | "sunday"
    )
}
