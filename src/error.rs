use chrono::NaiveDate;
use thiserror::Error;

/// Input-shape problems rejected at the library boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("unknown session {0:?}, expected FN or AN")]
    UnknownSession(String),

    #[error("unknown status filter {0:?}, expected all, present or absent")]
    UnknownStatus(String),

    #[error("unknown {dimension} {value:?}")]
    UnknownCatalogValue {
        dimension: &'static str,
        value: String,
    },

    #[error("invalid date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("record for {department}/{course}/{batch}/semester {semester} on {date} {session} appears more than once")]
    DuplicateRecord {
        department: String,
        course: String,
        batch: String,
        semester: String,
        date: NaiveDate,
        session: String,
    },

    #[error("roll number {roll_number} appears more than once in the record for {date} {session}")]
    DuplicateRollNumber {
        roll_number: String,
        date: NaiveDate,
        session: String,
    },

    #[error("record dated {date} is in the future (today is {today})")]
    FutureDate { date: NaiveDate, today: NaiveDate },
}
