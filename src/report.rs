use std::collections::BTreeMap;

use chrono::{Datelike, Months, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::aggregate::AttendanceMatrix;
use crate::error::AppError;
use crate::model::{ReportKind, ReportRequest, Stream};
use crate::repo::Repository;

/// Rows at or above this overall/per-lecture percentage render plainly;
/// anything below is highlighted as adverse.
pub const LOW_PERCENT_THRESHOLD: i64 = 80;

/// Merged label over the leading columns of the first grid row. Clients
/// match this string, so the casing stays as-is.
pub const PERIOD_LABEL: &str = "lecturing days for the period";

const SEQ_COL_WIDTH: f64 = 6.0;
const REG_COL_WIDTH: f64 = 16.0;
const NAME_COL_WIDTH: f64 = 30.0;
const PERCENT_COL_WIDTH: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStyle {
    Default,
    Header,
    Adverse,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Int(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    pub style: CellStyle,
}

impl Cell {
    pub fn empty() -> Cell {
        Cell {
            value: CellValue::Empty,
            style: CellStyle::Default,
        }
    }

    pub fn text(text: impl Into<String>) -> Cell {
        Cell {
            value: CellValue::Text(text.into()),
            style: CellStyle::Default,
        }
    }

    pub fn header(text: impl Into<String>) -> Cell {
        Cell {
            value: CellValue::Text(text.into()),
            style: CellStyle::Header,
        }
    }

    pub fn header_count(value: i64) -> Cell {
        Cell {
            value: CellValue::Int(value),
            style: CellStyle::Header,
        }
    }

    pub fn int(value: i64) -> Cell {
        Cell {
            value: CellValue::Int(value),
            style: CellStyle::Default,
        }
    }

    /// Percentage cell carrying the adverse highlight when under the
    /// threshold.
    pub fn percent(value: i64) -> Cell {
        let style = if value < LOW_PERCENT_THRESHOLD {
            CellStyle::Adverse
        } else {
            CellStyle::Default
        };
        Cell {
            value: CellValue::Int(value),
            style,
        }
    }
}

/// Inclusive rectangular merge on one row, zero-based columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSpan {
    pub row: usize,
    pub col_start: usize,
    pub col_end: usize,
}

/// Workbook-agnostic report layout: what to render, not how xlsx encodes
/// it. The writer downstream owns the file format.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportGrid {
    pub sheet_name: String,
    pub column_widths: Vec<f64>,
    pub merges: Vec<MergeSpan>,
    pub rows: Vec<Vec<Cell>>,
}

/// Column heading for a subject title: a single word keeps its first four
/// characters, several words collapse to their initials, uppercased either
/// way. Words are whitespace-separated, so hyphenated compounds count as
/// one word.
pub fn abbreviate_subject(subject: &str) -> String {
    let words: Vec<&str> = subject.split_whitespace().collect();
    match words.as_slice() {
        [] => String::new(),
        [only] => only.chars().take(4).collect::<String>().to_uppercase(),
        many => many
            .iter()
            .filter_map(|word| word.chars().next())
            .collect::<String>()
            .to_uppercase(),
    }
}

/// Expands a month/year pair to an inclusive date window. The current
/// month runs only through `today`; any other month runs to its true last
/// day.
pub fn resolve_month_window(
    month: u32,
    year: i32,
    today: NaiveDate,
) -> Result<(String, String), AppError> {
    // Chrono accepts negative and five-digit years, but those break the
    // fixed-width ISO strings the window comparisons rely on.
    if !(1..=9999).contains(&year) {
        return Err(AppError::invalid_argument(format!(
            "year must be between 1 and 9999 (got {year})"
        )));
    }
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Err(AppError::invalid_argument(format!(
            "month/year do not form a valid month: {month}/{year}"
        )));
    };
    let end = if year == today.year() && month == today.month() {
        today
    } else {
        first
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .ok_or_else(|| {
                AppError::invalid_argument(format!("month/year out of range: {month}/{year}"))
            })?
    };
    Ok((
        first.format("%Y-%m-%d").to_string(),
        end.format("%Y-%m-%d").to_string(),
    ))
}

/// Lays the attendance matrix out as the summary sheet: a merged label row
/// carrying the held-session counts, a heading row, then one row per
/// student with sub-threshold percentages highlighted.
pub fn build_summary_grid(matrix: &AttendanceMatrix) -> ReportGrid {
    let mut column_widths = vec![SEQ_COL_WIDTH, REG_COL_WIDTH, NAME_COL_WIDTH];
    column_widths.extend(std::iter::repeat(PERCENT_COL_WIDTH).take(matrix.lectures.len() + 1));

    let mut label_row = vec![Cell::header(PERIOD_LABEL), Cell::empty(), Cell::empty()];
    for column in &matrix.lectures {
        label_row.push(Cell::header_count(column.held));
    }
    label_row.push(Cell::empty());

    let mut heading_row = vec![
        Cell::header("No"),
        Cell::header("Reg No"),
        Cell::header("Name"),
    ];
    for column in &matrix.lectures {
        heading_row.push(Cell::header(abbreviate_subject(&column.subject)));
    }
    heading_row.push(Cell::header("Overall"));

    let mut rows = vec![label_row, heading_row];
    for (i, student) in matrix.rows.iter().enumerate() {
        let mut cells = vec![
            Cell::text(format!("{:02}", i + 1)),
            Cell::text(student.index_no.clone()),
            Cell::text(student.name.clone()),
        ];
        for pct in &student.per_lecture {
            cells.push(Cell::percent(*pct));
        }
        cells.push(Cell::percent(student.overall));
        rows.push(cells);
    }

    ReportGrid {
        sheet_name: format!("{} Attendance Summary", matrix.stream),
        column_widths,
        merges: vec![MergeSpan {
            row: 0,
            col_start: 0,
            col_end: 2,
        }],
        rows,
    }
}

/// Download filename for a report. The monthly shape names the month; the
/// summary shape names the raw window.
pub fn report_filename(
    kind: ReportKind,
    stream: Stream,
    start_date: &str,
    end_date: &str,
) -> String {
    if kind == ReportKind::MonthlySummary {
        if let Ok(start) = NaiveDate::parse_from_str(start_date, "%Y-%m-%d") {
            return format!(
                "Monthly_Attendance_{stream}_{month}_{year}.xlsx",
                month = start.format("%B"),
                year = start.year(),
            );
        }
    }
    format!("Attendance_Summary_{stream}_{start_date}_to_{end_date}.xlsx")
}

/// Appends one entry to the report log and returns it. `download` marks
/// the entry as an immediate download rather than a bare generate call.
pub fn record_report_request(
    repo: &dyn Repository,
    kind: ReportKind,
    stream: Stream,
    start_date: &str,
    end_date: &str,
    requested_by: &str,
    download: bool,
) -> Result<ReportRequest, AppError> {
    let request = ReportRequest {
        id: Uuid::new_v4().to_string(),
        kind,
        stream,
        start_date: start_date.to_string(),
        end_date: end_date.to_string(),
        requested_by: requested_by.to_string(),
        downloads: i64::from(download),
        created_at: Utc::now().to_rfc3339(),
    };
    repo.append_report_request(&request)?;
    Ok(request)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportLogStats {
    pub total_reports: i64,
    pub total_downloads: i64,
    pub report_types: BTreeMap<String, i64>,
}

/// Folds the whole report log into totals at read time; nothing is kept
/// as a running counter.
pub fn report_log_stats(repo: &dyn Repository) -> Result<ReportLogStats, AppError> {
    let mut report_types: BTreeMap<String, i64> = BTreeMap::new();
    for kind in [ReportKind::AttendanceSummary, ReportKind::MonthlySummary] {
        report_types.insert(kind.as_str().to_string(), 0);
    }

    let mut total_reports = 0;
    let mut total_downloads = 0;
    for entry in repo.report_requests()? {
        total_reports += 1;
        total_downloads += entry.downloads;
        *report_types
            .entry(entry.kind.as_str().to_string())
            .or_insert(0) += 1;
    }

    Ok(ReportLogStats {
        total_reports,
        total_downloads,
        report_types,
    })
}
