use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::aggregate;
use crate::clock;
use crate::error::AppError;
use crate::http::AppState;
use crate::model::{ReportKind, Stream};
use crate::report;
use crate::workbook;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportParams {
    pub stream: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Request body shared by generate and download. The window comes either
/// as explicit dates or as a month/year pair, never both required.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportBody {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub stream: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub requested_by: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub report_id: String,
    #[serde(rename = "type")]
    pub kind: ReportKind,
    pub stream: Stream,
    pub start_date: String,
    pub end_date: String,
}

/// GET /attendance/export: aggregate the window and stream the workbook
/// back inline. Exports do not touch the report log.
pub async fn export_summary(
    State(state): State<AppState>,
    Query(params): Query<ExportParams>,
) -> Result<Response, AppError> {
    let stream = required_stream(params.stream.as_deref())?;

    let (bytes, filename) = {
        let store = state.store()?;
        let matrix = aggregate::aggregate_attendance(
            &*store,
            stream,
            params.start_date.as_deref(),
            params.end_date.as_deref(),
        )?;
        let grid = report::build_summary_grid(&matrix);
        let bytes = workbook::write_workbook(&grid)?;
        let filename = report::report_filename(
            ReportKind::AttendanceSummary,
            stream,
            &matrix.start_date,
            &matrix.end_date,
        );
        (bytes, filename)
    };

    Ok(workbook_response(bytes, &filename, false))
}

/// POST /reports/generate: validate, resolve the window and append a log
/// entry. No aggregation runs here, so an empty stream still generates.
pub async fn generate_report(
    State(state): State<AppState>,
    Json(body): Json<ReportBody>,
) -> Result<Json<GenerateResponse>, AppError> {
    let kind = required_kind(body.kind.as_deref())?;
    let stream = required_stream(body.stream.as_deref())?;
    let (start, end) = resolve_window(&body)?;
    let requested_by = body.requested_by.as_deref().unwrap_or("admin");

    let logged = {
        let store = state.store()?;
        report::record_report_request(&*store, kind, stream, &start, &end, requested_by, false)?
    };

    Ok(Json(GenerateResponse {
        report_id: logged.id,
        kind,
        stream,
        start_date: logged.start_date,
        end_date: logged.end_date,
    }))
}

/// POST /reports/download: aggregate, log the entry as a download, and
/// stream the workbook. Aggregation failures surface before anything is
/// logged.
pub async fn download_report(
    State(state): State<AppState>,
    Json(body): Json<ReportBody>,
) -> Result<Response, AppError> {
    let kind = required_kind(body.kind.as_deref())?;
    let stream = required_stream(body.stream.as_deref())?;
    let (start, end) = resolve_window(&body)?;
    let requested_by = body.requested_by.as_deref().unwrap_or("admin");

    let bytes = {
        let store = state.store()?;
        let matrix =
            aggregate::aggregate_attendance(&*store, stream, Some(start.as_str()), Some(end.as_str()))?;
        let grid = report::build_summary_grid(&matrix);
        let bytes = workbook::write_workbook(&grid)?;
        report::record_report_request(&*store, kind, stream, &start, &end, requested_by, true)?;
        bytes
    };

    let filename = report::report_filename(kind, stream, &start, &end);
    Ok(workbook_response(bytes, &filename, true))
}

/// GET /reports/stats: totals recomputed from the append-only log.
pub async fn report_stats(
    State(state): State<AppState>,
) -> Result<Json<report::ReportLogStats>, AppError> {
    let store = state.store()?;
    Ok(Json(report::report_log_stats(&*store)?))
}

fn required_stream(raw: Option<&str>) -> Result<Stream, AppError> {
    let Some(raw) = raw else {
        return Err(AppError::invalid_argument("missing stream"));
    };
    Stream::parse(raw)
}

fn required_kind(raw: Option<&str>) -> Result<ReportKind, AppError> {
    let Some(raw) = raw else {
        return Err(AppError::invalid_argument("missing type"));
    };
    ReportKind::parse(raw)
}

fn resolve_window(body: &ReportBody) -> Result<(String, String), AppError> {
    if body.start_date.is_some() || body.end_date.is_some() {
        let start = aggregate::validate_date("startDate", body.start_date.as_deref())?;
        let end = aggregate::validate_date("endDate", body.end_date.as_deref())?;
        return Ok((start, end));
    }
    match (body.month, body.year) {
        (Some(month), Some(year)) => {
            report::resolve_month_window(month, year, clock::campus_today())
        }
        (None, None) => Err(AppError::invalid_argument(
            "missing startDate/endDate or month/year",
        )),
        _ => Err(AppError::invalid_argument(
            "month and year must be provided together",
        )),
    }
}

// Downloads prompt a save dialog; the export path serves the same bytes
// inline.
fn workbook_response(bytes: Vec<u8>, filename: &str, attachment: bool) -> Response {
    let disposition = if attachment { "attachment" } else { "inline" };
    (
        [
            (
                header::CONTENT_TYPE,
                workbook::XLSX_CONTENT_TYPE.to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("{disposition}; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}
