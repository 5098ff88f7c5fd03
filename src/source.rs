use std::collections::HashSet;
use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::error::LedgerError;
use crate::filter::parse_iso_date;
use crate::models::{AttendanceRecord, Session, StudentMark};

/// Supplies the attendance records already scoped to the caller.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn load_records(&self) -> anyhow::Result<Vec<AttendanceRecord>>;
}

pub struct MemorySource {
    records: Vec<AttendanceRecord>,
}

impl MemorySource {
    pub fn new(records: Vec<AttendanceRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl RecordSource for MemorySource {
    async fn load_records(&self) -> anyhow::Result<Vec<AttendanceRecord>> {
        Ok(self.records.clone())
    }
}

pub struct CsvSource {
    path: PathBuf,
    today: NaiveDate,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>, today: NaiveDate) -> Self {
        Self {
            path: path.into(),
            today,
        }
    }
}

#[async_trait]
impl RecordSource for CsvSource {
    async fn load_records(&self) -> anyhow::Result<Vec<AttendanceRecord>> {
        let file = std::fs::File::open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        let records = read_csv_records(file)
            .with_context(|| format!("failed to read records from {}", self.path.display()))?;
        validate_records(&records, self.today)?;
        info!(path = %self.path.display(), records = records.len(), "loaded csv records");
        Ok(records)
    }
}

/// One student mark per row.
#[derive(Debug, Deserialize)]
struct MarkRow {
    date: String,
    department: String,
    course: String,
    batch: String,
    semester: String,
    session: Session,
    roll_number: String,
    name: String,
    is_present: bool,
}

/// Groups consecutive rows sharing a (department, course, batch, semester,
/// date, session) tuple into one record. A tuple that reappears after a
/// different one starts a new record, which [`validate_records`] rejects.
pub fn read_csv_records<R: Read>(input: R) -> anyhow::Result<Vec<AttendanceRecord>> {
    let mut reader = csv::Reader::from_reader(input);
    let mut records: Vec<AttendanceRecord> = Vec::new();

    for (line, result) in reader.deserialize::<MarkRow>().enumerate() {
        let row = result.with_context(|| format!("invalid attendance row {}", line + 1))?;
        let date = parse_iso_date(&row.date)
            .ok_or_else(|| LedgerError::InvalidDate(row.date.clone()))
            .with_context(|| format!("invalid attendance row {}", line + 1))?;

        let continues_block = records.last().is_some_and(|last| {
            last.date == date
                && last.session == row.session
                && last.department == row.department
                && last.course == row.course
                && last.batch == row.batch
                && last.semester == row.semester
        });

        if !continues_block {
            records.push(AttendanceRecord {
                id: Uuid::new_v4(),
                date,
                department: row.department,
                course: row.course,
                batch: row.batch,
                semester: row.semester,
                session: row.session,
                students: Vec::new(),
            });
        }

        if let Some(record) = records.last_mut() {
            let students = &mut record.students;
            students.push(StudentMark {
                id: students.len() as u32 + 1,
                name: row.name,
                roll_number: row.roll_number,
                is_present: row.is_present,
            });
        }
    }

    debug!(records = records.len(), "grouped csv rows into records");
    Ok(records)
}

/// Rejects duplicate record tuples, duplicate roll numbers within a record
/// and records dated after `today`.
pub fn validate_records(records: &[AttendanceRecord], today: NaiveDate) -> Result<(), LedgerError> {
    let mut seen = HashSet::new();

    for record in records {
        if record.date > today {
            return Err(LedgerError::FutureDate {
                date: record.date,
                today,
            });
        }

        if !seen.insert(record.key()) {
            return Err(LedgerError::DuplicateRecord {
                department: record.department.clone(),
                course: record.course.clone(),
                batch: record.batch.clone(),
                semester: record.semester.clone(),
                date: record.date,
                session: record.session.to_string(),
            });
        }

        let mut rolls = HashSet::new();
        for student in &record.students {
            if !rolls.insert(student.roll_number.as_str()) {
                return Err(LedgerError::DuplicateRollNumber {
                    roll_number: student.roll_number.clone(),
                    date: record.date,
                    session: record.session.to_string(),
                });
            }
        }
    }

    Ok(())
}

const SAMPLE_NAMES: [&str; 15] = [
    "Ava Patel",
    "Liam Smith",
    "Olivia Johnson",
    "Noah Williams",
    "Emma Brown",
    "Elijah Jones",
    "Sophia Garcia",
    "Lucas Miller",
    "Mia Davis",
    "Mason Rodriguez",
    "Charlotte Martinez",
    "Logan Hernandez",
    "Amelia Lopez",
    "James Gonzalez",
    "Harper Wilson",
];

/// Deterministic demo data: both sessions for each of the last `days` days
/// for one class per department.
pub fn sample_records(
    catalog: &Catalog,
    today: NaiveDate,
    days: u32,
) -> Result<Vec<AttendanceRecord>, LedgerError> {
    let mut records = Vec::new();
    let classes = catalog
        .departments
        .iter()
        .zip(catalog.courses.iter())
        .zip(catalog.batches.iter().skip(1))
        .zip(catalog.semesters.iter().step_by(2));

    for (((department, course), batch), semester) in classes {
        for offset in 0..days {
            let date = today - Duration::days(i64::from(offset));
            let sessions = [Session::Forenoon, Session::Afternoon];
            for (session_no, session) in sessions.into_iter().enumerate() {
                let students = SAMPLE_NAMES
                    .iter()
                    .enumerate()
                    .map(|(i, name)| {
                        let position = i as u32 + 1;
                        Ok::<_, LedgerError>(StudentMark {
                            id: position,
                            name: name.to_string(),
                            roll_number: catalog.roll_number(&department.name, batch, position)?,
                            is_present: (offset as usize + i + session_no) % 4 != 0,
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;

                records.push(AttendanceRecord {
                    id: Uuid::new_v4(),
                    date,
                    department: department.name.clone(),
                    course: course.clone(),
                    batch: batch.clone(),
                    semester: semester.clone(),
                    session,
                    students,
                });
            }
        }
    }

    Ok(records)
}
