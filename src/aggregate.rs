use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use tracing::debug;

use crate::filter::{parse_iso_date, DateMode, RecordFilter};
use crate::models::{
    AttendanceRecord, MonthBucket, Session, SessionTally, StatusFilter, StudentMark,
    StudentRangeSummary,
};

pub fn filter_records<'a>(
    records: &'a [AttendanceRecord],
    filter: &RecordFilter,
) -> Vec<&'a AttendanceRecord> {
    let window = filter.date_window();
    records
        .iter()
        .filter(|record| filter.matches_categories(record) && window.contains(record.date))
        .collect()
}

/// Every calendar day from `from` to `to` inclusive. Blank, malformed or
/// inverted bounds give an empty sequence.
pub fn enumerate_date_range(from: &str, to: &str) -> Vec<NaiveDate> {
    let (Some(from), Some(to)) = (parse_iso_date(from), parse_iso_date(to)) else {
        return Vec::new();
    };

    from.iter_days().take_while(|day| *day <= to).collect()
}

pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// `"2025-06"` becomes `"June 2025"`.
pub fn month_label(month: &str) -> Option<String> {
    let first = parse_iso_date(&format!("{month}-01"))?;
    Some(first.format("%B %Y").to_string())
}

pub fn bucket_by_month(dates: &[NaiveDate]) -> Vec<MonthBucket> {
    let mut buckets: BTreeMap<String, Vec<NaiveDate>> = BTreeMap::new();
    for date in dates {
        buckets.entry(month_key(*date)).or_default().push(*date);
    }

    buckets
        .into_iter()
        .map(|(month, dates)| MonthBucket { month, dates })
        .collect()
}

pub fn days_in_month<'a>(buckets: &'a [MonthBucket], month: &str) -> &'a [NaiveDate] {
    buckets
        .iter()
        .find(|bucket| bucket.month == month)
        .map(|bucket| bucket.dates.as_slice())
        .unwrap_or(&[])
}

pub fn summarize_range(
    records: &[AttendanceRecord],
    filter: &RecordFilter,
) -> Vec<StudentRangeSummary> {
    let range_filter = RecordFilter {
        mode: DateMode::Range,
        ..filter.clone()
    };
    if range_filter.range_window().is_none() {
        return Vec::new();
    }

    let in_range = filter_records(records, &range_filter);
    let total_days = in_range
        .iter()
        .map(|record| record.date)
        .collect::<BTreeSet<_>>()
        .len();

    let mut summaries: Vec<StudentRangeSummary> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for record in &in_range {
        for student in &record.students {
            let slot = *index.entry(student.roll_number.as_str()).or_insert_with(|| {
                summaries.push(StudentRangeSummary {
                    roll_number: student.roll_number.clone(),
                    name: student.name.clone(),
                    fn_total: 0,
                    fn_present: 0,
                    an_total: 0,
                    an_present: 0,
                    total_days,
                    attendance_percent: 0,
                });
                summaries.len() - 1
            });

            let entry = &mut summaries[slot];
            let present = u32::from(student.is_present);
            match record.session {
                Session::Forenoon => {
                    entry.fn_total += 1;
                    entry.fn_present += present;
                }
                Session::Afternoon => {
                    entry.an_total += 1;
                    entry.an_present += present;
                }
            }
        }
    }

    for entry in &mut summaries {
        entry.attendance_percent = rounded_percent(
            entry.fn_present + entry.an_present,
            entry.fn_total + entry.an_total,
        );
    }

    debug!(
        records = in_range.len(),
        students = summaries.len(),
        total_days,
        "summarized attendance range"
    );
    summaries
}

pub fn filter_by_status(students: &[StudentMark], status: StatusFilter) -> Vec<&StudentMark> {
    students
        .iter()
        .filter(|student| match status {
            StatusFilter::All => true,
            StatusFilter::Present => student.is_present,
            StatusFilter::Absent => !student.is_present,
        })
        .collect()
}

pub fn absentee_count(students: &[StudentMark]) -> usize {
    students.iter().filter(|student| !student.is_present).count()
}

/// `attended / conducted * 100` to two decimal places, `0.0` when nothing
/// was conducted.
pub fn percentage_for(conducted: u32, attended: u32) -> f64 {
    if conducted == 0 {
        return 0.0;
    }
    let raw = f64::from(attended) / f64::from(conducted) * 100.0;
    (raw * 100.0).round() / 100.0
}

pub fn percentage_label(conducted: u32, attended: u32) -> String {
    format!("{:.2}", percentage_for(conducted, attended))
}

/// Integer percentage over both sessions, rounded half up.
pub fn overall_percentage(forenoon: SessionTally, afternoon: SessionTally) -> u8 {
    rounded_percent(
        forenoon.attended + afternoon.attended,
        forenoon.conducted + afternoon.conducted,
    )
}

/// `round(100 * part / whole)` with halves rounded up, in integer arithmetic.
/// `part` must not exceed `whole`; release builds clamp the result to 100.
pub fn rounded_percent(part: u32, whole: u32) -> u8 {
    debug_assert!(part <= whole, "{part} attended out of {whole} conducted");
    if whole == 0 {
        return 0;
    }
    let (part, whole) = (u64::from(part), u64::from(whole));
    let percent = (200 * part + whole) / (2 * whole);
    percent.min(100) as u8
}

/// The forenoon and afternoon sheets of a single-day query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DaySheets<'a> {
    pub forenoon: Option<&'a AttendanceRecord>,
    pub afternoon: Option<&'a AttendanceRecord>,
}

pub fn session_records_for_date<'a>(
    records: &'a [AttendanceRecord],
    filter: &RecordFilter,
) -> DaySheets<'a> {
    if filter.mode != DateMode::Single || filter.single_date.trim().is_empty() {
        return DaySheets::default();
    }

    let matching = filter_records(records, filter);
    let first = |session: Session| matching.iter().copied().find(|r| r.session == session);
    DaySheets {
        forenoon: first(Session::Forenoon),
        afternoon: first(Session::Afternoon),
    }
}

pub fn records_on_date<'a>(
    records: &[&'a AttendanceRecord],
    date: NaiveDate,
) -> Vec<&'a AttendanceRecord> {
    records
        .iter()
        .copied()
        .filter(|record| record.date == date)
        .collect()
}

/// Present and total marks for each session on one day.
pub fn day_tallies(records: &[&AttendanceRecord], date: NaiveDate) -> (SessionTally, SessionTally) {
    let mut forenoon = SessionTally::default();
    let mut afternoon = SessionTally::default();

    for record in records.iter().filter(|record| record.date == date) {
        let tally = match record.session {
            Session::Forenoon => &mut forenoon,
            Session::Afternoon => &mut afternoon,
        };
        for student in &record.students {
            tally.conducted += 1;
            tally.attended += u32::from(student.is_present);
        }
    }

    (forenoon, afternoon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn day(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
    }

    fn mark(roll_number: &str, name: &str, is_present: bool) -> StudentMark {
        StudentMark {
            id: 1,
            name: name.to_string(),
            roll_number: roll_number.to_string(),
            is_present,
        }
    }

    fn record(date: &str, session: Session, students: Vec<StudentMark>) -> AttendanceRecord {
        AttendanceRecord {
            id: Uuid::new_v4(),
            date: day(date),
            department: "Computer Science".to_string(),
            course: "Data Structures".to_string(),
            batch: "2022".to_string(),
            semester: "5".to_string(),
            session,
            students,
        }
    }

    #[test]
    fn filters_by_category_and_single_date() {
        let mut other = record("2025-06-02", Session::Forenoon, vec![]);
        other.department = "Electrical Engineering".to_string();
        let records = vec![
            record("2025-06-01", Session::Forenoon, vec![]),
            record("2025-06-02", Session::Forenoon, vec![]),
            other,
        ];

        let filter = RecordFilter::single("2025-06-02").department("Computer Science");
        let found = filter_records(&records, &filter);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, records[1].id);
    }

    #[test]
    fn filter_preserves_input_order() {
        let records = vec![
            record("2025-06-03", Session::Afternoon, vec![]),
            record("2025-06-01", Session::Forenoon, vec![]),
            record("2025-06-02", Session::Forenoon, vec![]),
        ];
        let found = filter_records(&records, &RecordFilter::range("2025-06-01", "2025-06-03"));
        let ids: Vec<Uuid> = found.iter().map(|r| r.id).collect();
        let expected: Vec<Uuid> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn enumerates_across_month_and_year_boundaries() {
        let days = enumerate_date_range("2024-12-30", "2025-01-02");
        assert_eq!(
            days,
            vec![
                day("2024-12-30"),
                day("2024-12-31"),
                day("2025-01-01"),
                day("2025-01-02"),
            ]
        );
        assert_eq!(enumerate_date_range("2024-02-28", "2024-03-01").len(), 3);
    }

    #[test]
    fn enumerate_rejects_blank_and_malformed_bounds() {
        assert!(enumerate_date_range("", "2025-06-01").is_empty());
        assert!(enumerate_date_range("2025-06-01", "").is_empty());
        assert!(enumerate_date_range("yesterday", "2025-06-01").is_empty());
    }

    #[test]
    fn month_lookup_returns_empty_for_missing_month() {
        let buckets = bucket_by_month(&enumerate_date_range("2025-05-30", "2025-06-02"));
        assert_eq!(days_in_month(&buckets, "2025-06"), &[day("2025-06-01"), day("2025-06-02")]);
        assert!(days_in_month(&buckets, "2025-07").is_empty());
    }

    #[test]
    fn month_labels_are_human_readable() {
        assert_eq!(month_label("2025-06").as_deref(), Some("June 2025"));
        assert_eq!(month_label("2025-13"), None);
    }

    #[test]
    fn summary_counts_sessions_per_student() {
        let records = vec![
            record(
                "2025-06-01",
                Session::Forenoon,
                vec![mark("CS22001", "Ava Patel", true), mark("CS22002", "Liam Smith", false)],
            ),
            record(
                "2025-06-01",
                Session::Afternoon,
                vec![mark("CS22001", "Ava Patel", true), mark("CS22002", "Liam Smith", true)],
            ),
            record(
                "2025-06-02",
                Session::Forenoon,
                vec![mark("CS22001", "Ava Patel", false)],
            ),
        ];

        let summaries = summarize_range(&records, &RecordFilter::range("2025-06-01", "2025-06-02"));
        assert_eq!(summaries.len(), 2);

        let ava = &summaries[0];
        assert_eq!(ava.roll_number, "CS22001");
        assert_eq!((ava.fn_total, ava.fn_present), (2, 1));
        assert_eq!((ava.an_total, ava.an_present), (1, 1));
        assert_eq!(ava.attendance_percent, 67);
        assert_eq!(ava.total_days, 2);

        let liam = &summaries[1];
        assert_eq!((liam.fn_total, liam.fn_present), (1, 0));
        assert_eq!(liam.attendance_percent, 50);
        assert_eq!(liam.total_days, 2);
    }

    #[test]
    fn summary_without_afternoon_sessions_reports_zero() {
        let records = vec![record(
            "2025-06-01",
            Session::Forenoon,
            vec![mark("CS22001", "Ava Patel", true)],
        )];
        let summaries = summarize_range(&records, &RecordFilter::range("2025-06-01", "2025-06-01"));
        assert_eq!(summaries[0].an_total, 0);
        assert_eq!(summaries[0].an_present, 0);
        assert_eq!(summaries[0].attendance_percent, 100);
    }

    #[test]
    fn summary_needs_both_bounds() {
        let records = vec![record(
            "2025-06-01",
            Session::Forenoon,
            vec![mark("CS22001", "Ava Patel", true)],
        )];
        assert!(summarize_range(&records, &RecordFilter::range("2025-06-01", "")).is_empty());
        assert!(summarize_range(&records, &RecordFilter::range("2025-06-02", "2025-06-01")).is_empty());
    }

    #[test]
    fn summary_uses_range_even_when_filter_is_single_mode() {
        let records = vec![record(
            "2025-06-01",
            Session::Forenoon,
            vec![mark("CS22001", "Ava Patel", true)],
        )];
        let mut filter = RecordFilter::range("2025-06-01", "2025-06-01");
        filter.mode = DateMode::Single;
        filter.single_date = "2025-07-01".to_string();
        assert_eq!(summarize_range(&records, &filter).len(), 1);
    }

    #[test]
    fn rounding_is_half_up() {
        assert_eq!(rounded_percent(1, 8), 13);
        assert_eq!(rounded_percent(1, 3), 33);
        assert_eq!(rounded_percent(2, 3), 67);
        assert_eq!(rounded_percent(0, 0), 0);
        assert_eq!(rounded_percent(5, 5), 100);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "attended out of")]
    fn overcounted_tally_is_flagged() {
        let tally = SessionTally { conducted: 2, attended: 3 };
        overall_percentage(tally, SessionTally::default());
    }

    #[test]
    fn percentage_has_two_decimals_and_guards_zero() {
        assert_eq!(percentage_for(0, 0), 0.0);
        assert_eq!(percentage_for(3, 1), 33.33);
        assert_eq!(percentage_for(40, 32), 80.0);
        assert_eq!(percentage_label(30, 22), "73.33");
        assert_eq!(percentage_label(0, 0), "0.00");
    }

    #[test]
    fn overall_percentage_combines_sessions() {
        let forenoon = SessionTally { conducted: 40, attended: 32 };
        let afternoon = SessionTally { conducted: 30, attended: 22 };
        assert_eq!(overall_percentage(forenoon, afternoon), 77);
        assert_eq!(
            overall_percentage(SessionTally::default(), SessionTally::default()),
            0
        );
    }

    #[test]
    fn status_filter_keeps_order() {
        let roster = vec![
            mark("CS22001", "Ava Patel", true),
            mark("CS22002", "Liam Smith", false),
            mark("CS22003", "Olivia Johnson", true),
        ];
        let present: Vec<&str> = filter_by_status(&roster, StatusFilter::Present)
            .iter()
            .map(|s| s.roll_number.as_str())
            .collect();
        assert_eq!(present, vec!["CS22001", "CS22003"]);
        assert_eq!(filter_by_status(&roster, StatusFilter::All).len(), 3);
        assert_eq!(filter_by_status(&roster, StatusFilter::Absent).len(), 1);
        assert_eq!(absentee_count(&roster), 1);
    }

    #[test]
    fn single_day_sheets_pick_first_of_each_session() {
        let records = vec![
            record("2025-06-01", Session::Afternoon, vec![]),
            record("2025-06-01", Session::Forenoon, vec![]),
            record("2025-06-02", Session::Forenoon, vec![]),
        ];
        let sheets = session_records_for_date(&records, &RecordFilter::single("2025-06-01"));
        assert_eq!(sheets.forenoon.map(|r| r.id), Some(records[1].id));
        assert_eq!(sheets.afternoon.map(|r| r.id), Some(records[0].id));

        let none = session_records_for_date(&records, &RecordFilter::single(""));
        assert_eq!(none, DaySheets::default());
    }

    #[test]
    fn day_tallies_split_by_session() {
        let records = vec![
            record(
                "2025-06-01",
                Session::Forenoon,
                vec![mark("CS22001", "Ava Patel", true), mark("CS22002", "Liam Smith", false)],
            ),
            record(
                "2025-06-01",
                Session::Afternoon,
                vec![mark("CS22001", "Ava Patel", true)],
            ),
        ];
        let refs: Vec<&AttendanceRecord> = records.iter().collect();
        let on_day = records_on_date(&refs, day("2025-06-01"));
        assert_eq!(on_day.len(), 2);

        let (forenoon, afternoon) = day_tallies(&refs, day("2025-06-01"));
        assert_eq!(forenoon, SessionTally { conducted: 2, attended: 1 });
        assert_eq!(afternoon, SessionTally { conducted: 1, attended: 1 });
    }
}
