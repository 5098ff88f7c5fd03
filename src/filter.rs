use chrono::NaiveDate;

use crate::models::AttendanceRecord;

/// Which date inputs of a [`RecordFilter`] are in effect. Chosen by the
/// caller, never inferred from which date fields happen to be filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateMode {
    #[default]
    Single,
    Range,
}

/// Categorical and date predicates for a record query.
///
/// Categorical values that are `None` or blank match any record. Dates are
/// kept as the raw `YYYY-MM-DD` strings the caller typed, since form inputs
/// can be transiently empty or half-edited.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordFilter {
    pub department: Option<String>,
    pub course: Option<String>,
    pub batch: Option<String>,
    pub semester: Option<String>,
    pub mode: DateMode,
    pub single_date: String,
    pub from_date: String,
    pub to_date: String,
}

/// Resolved date predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateWindow {
    Any,
    Nothing,
    On(NaiveDate),
    Between(NaiveDate, NaiveDate),
}

impl DateWindow {
    pub fn contains(self, date: NaiveDate) -> bool {
        match self {
            DateWindow::Any => true,
            DateWindow::Nothing => false,
            DateWindow::On(day) => date == day,
            DateWindow::Between(from, to) => from <= date && date <= to,
        }
    }
}

impl RecordFilter {
    pub fn single(date: &str) -> Self {
        Self {
            mode: DateMode::Single,
            single_date: date.to_string(),
            ..Self::default()
        }
    }

    pub fn range(from: &str, to: &str) -> Self {
        Self {
            mode: DateMode::Range,
            from_date: from.to_string(),
            to_date: to.to_string(),
            ..Self::default()
        }
    }

    pub fn department(mut self, value: &str) -> Self {
        self.department = Some(value.to_string());
        self
    }

    pub fn course(mut self, value: &str) -> Self {
        self.course = Some(value.to_string());
        self
    }

    pub fn batch(mut self, value: &str) -> Self {
        self.batch = Some(value.to_string());
        self
    }

    pub fn semester(mut self, value: &str) -> Self {
        self.semester = Some(value.to_string());
        self
    }

    pub fn date_window(&self) -> DateWindow {
        match self.mode {
            DateMode::Single => {
                if self.single_date.trim().is_empty() {
                    DateWindow::Any
                } else {
                    parse_iso_date(&self.single_date).map_or(DateWindow::Nothing, DateWindow::On)
                }
            }
            DateMode::Range => self.range_window().unwrap_or(DateWindow::Any),
        }
    }

    /// The `[from, to]` window regardless of mode; `None` when either bound
    /// is blank.
    pub fn range_window(&self) -> Option<DateWindow> {
        if self.from_date.trim().is_empty() || self.to_date.trim().is_empty() {
            return None;
        }

        let window = match (parse_iso_date(&self.from_date), parse_iso_date(&self.to_date)) {
            (Some(from), Some(to)) if from <= to => DateWindow::Between(from, to),
            _ => DateWindow::Nothing,
        };
        Some(window)
    }

    pub fn matches_categories(&self, record: &AttendanceRecord) -> bool {
        matches_value(&self.department, &record.department)
            && matches_value(&self.course, &record.course)
            && matches_value(&self.batch, &record.batch)
            && matches_value(&self.semester, &record.semester)
    }

    /// Short human label for the categorical scope, e.g. for report headers.
    pub fn scope_label(&self) -> String {
        let chosen = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let parts: Vec<String> = [
            chosen(&self.department),
            chosen(&self.course),
            chosen(&self.batch).map(|b| format!("batch {b}")),
            chosen(&self.semester).map(|s| format!("semester {s}")),
        ]
        .into_iter()
        .flatten()
        .collect();

        if parts.is_empty() {
            "all classes".to_string()
        } else {
            parts.join(", ")
        }
    }
}

fn matches_value(wanted: &Option<String>, actual: &str) -> bool {
    match wanted.as_deref().map(str::trim) {
        None | Some("") => true,
        Some(value) => value == actual,
    }
}

/// Strict zero-padded `YYYY-MM-DD`; anything else is `None`.
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    let bytes = value.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    if !bytes
        .iter()
        .enumerate()
        .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit())
    {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}
