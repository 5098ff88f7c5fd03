use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LedgerError;

/// One of the two attendance-taking sessions in an academic day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Session {
    #[serde(rename = "FN")]
    Forenoon,
    #[serde(rename = "AN")]
    Afternoon,
}

impl Session {
    pub fn code(self) -> &'static str {
        match self {
            Session::Forenoon => "FN",
            Session::Afternoon => "AN",
        }
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Session {
    type Err = LedgerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "FN" => Ok(Session::Forenoon),
            "AN" => Ok(Session::Afternoon),
            other => Err(LedgerError::UnknownSession(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Present,
    Absent,
}

impl FromStr for StatusFilter {
    type Err = LedgerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "all" => Ok(StatusFilter::All),
            "present" => Ok(StatusFilter::Present),
            "absent" => Ok(StatusFilter::Absent),
            other => Err(LedgerError::UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentMark {
    pub id: u32,
    pub name: String,
    pub roll_number: String,
    pub is_present: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub date: NaiveDate,
    pub department: String,
    pub course: String,
    pub batch: String,
    pub semester: String,
    pub session: Session,
    pub students: Vec<StudentMark>,
}

/// The tuple that identifies at most one authoritative record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey<'a> {
    pub department: &'a str,
    pub course: &'a str,
    pub batch: &'a str,
    pub semester: &'a str,
    pub date: NaiveDate,
    pub session: Session,
}

impl AttendanceRecord {
    pub fn key(&self) -> RecordKey<'_> {
        RecordKey {
            department: &self.department,
            course: &self.course,
            batch: &self.batch,
            semester: &self.semester,
            date: self.date,
            session: self.session,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentRangeSummary {
    pub roll_number: String,
    pub name: String,
    pub fn_total: u32,
    pub fn_present: u32,
    pub an_total: u32,
    pub an_present: u32,
    pub total_days: usize,
    pub attendance_percent: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthBucket {
    /// `YYYY-MM`
    pub month: String,
    pub dates: Vec<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionTally {
    pub conducted: u32,
    pub attended: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceStanding {
    Excellent,
    Good,
    Satisfactory,
    NeedsImprovement,
}

impl AttendanceStanding {
    pub fn from_percent(percent: u8) -> Self {
        match percent {
            90.. => AttendanceStanding::Excellent,
            80..=89 => AttendanceStanding::Good,
            75..=79 => AttendanceStanding::Satisfactory,
            _ => AttendanceStanding::NeedsImprovement,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AttendanceStanding::Excellent => "Excellent",
            AttendanceStanding::Good => "Good",
            AttendanceStanding::Satisfactory => "Satisfactory",
            AttendanceStanding::NeedsImprovement => "Needs Improvement",
        }
    }
}
