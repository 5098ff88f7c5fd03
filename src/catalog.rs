use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::LedgerError;
use crate::filter::RecordFilter;
use crate::models::AttendanceRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub name: String,
    pub code: String,
}

/// The departments, courses, batches and semesters a query may name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub departments: Vec<Department>,
    pub courses: Vec<String>,
    pub batches: Vec<String>,
    pub semesters: Vec<String>,
}

impl Default for Catalog {
    fn default() -> Self {
        let department = |name: &str, code: &str| Department {
            name: name.to_string(),
            code: code.to_string(),
        };

        Self {
            departments: vec![
                department("Computer Science", "CS"),
                department("Information Technology", "IT"),
                department("Electrical Engineering", "EE"),
            ],
            courses: [
                "Data Structures",
                "Algorithms",
                "Database Systems",
                "Operating Systems",
                "Computer Networks",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
            batches: (2021..=2025).map(|year| year.to_string()).collect(),
            semesters: (1..=8).map(|sem| sem.to_string()).collect(),
        }
    }
}

impl Catalog {
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog {}", path.display()))?;
        let catalog: Catalog = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse catalog {}", path.display()))?;
        info!(
            path = %path.display(),
            departments = catalog.departments.len(),
            courses = catalog.courses.len(),
            "loaded catalog"
        );
        Ok(catalog)
    }

    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_json_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn department_code(&self, name: &str) -> Option<&str> {
        self.departments
            .iter()
            .find(|dept| dept.name == name)
            .map(|dept| dept.code.as_str())
    }

    /// Normalizes blank values to `None` and rejects values the catalog does
    /// not know, so a typo cannot pass as a legitimately empty result.
    pub fn resolve_filter(&self, filter: RecordFilter) -> Result<RecordFilter, LedgerError> {
        let department = resolve(
            "department",
            filter.department,
            self.departments.iter().map(|d| d.name.as_str()),
        )?;
        let course = resolve("course", filter.course, self.courses.iter().map(String::as_str))?;
        let batch = resolve("batch", filter.batch, self.batches.iter().map(String::as_str))?;
        let semester = resolve(
            "semester",
            filter.semester,
            self.semesters.iter().map(String::as_str),
        )?;

        Ok(RecordFilter {
            department,
            course,
            batch,
            semester,
            ..filter
        })
    }

    pub fn check_record(&self, record: &AttendanceRecord) -> Result<(), LedgerError> {
        let filter = RecordFilter {
            department: Some(record.department.clone()),
            course: Some(record.course.clone()),
            batch: Some(record.batch.clone()),
            semester: Some(record.semester.clone()),
            ..RecordFilter::default()
        };
        self.resolve_filter(filter).map(|_| ())
    }

    /// `<dept code><batch yy><NNN>`, e.g. `CS22007`.
    pub fn roll_number(
        &self,
        department: &str,
        batch: &str,
        position: u32,
    ) -> Result<String, LedgerError> {
        let code = self
            .department_code(department)
            .ok_or_else(|| LedgerError::UnknownCatalogValue {
                dimension: "department",
                value: department.to_string(),
            })?;
        let year = batch.get(batch.len().saturating_sub(2)..).unwrap_or(batch);
        Ok(format!("{code}{year}{position:03}"))
    }
}

fn resolve<'a>(
    dimension: &'static str,
    value: Option<String>,
    mut known: impl Iterator<Item = &'a str>,
) -> Result<Option<String>, LedgerError> {
    let Some(value) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    if known.any(|candidate| candidate == value) {
        Ok(Some(value))
    } else {
        Err(LedgerError::UnknownCatalogValue { dimension, value })
    }
}
