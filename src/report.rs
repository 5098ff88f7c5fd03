use std::fmt::Write;

use crate::aggregate::{
    bucket_by_month, day_tallies, enumerate_date_range, filter_records, month_label,
    percentage_label, summarize_range,
};
use crate::filter::{DateMode, RecordFilter};
use crate::models::{AttendanceRecord, AttendanceStanding, SessionTally};

pub fn build_report(filter: &RecordFilter, records: &[AttendanceRecord]) -> String {
    let range_filter = RecordFilter {
        mode: DateMode::Range,
        ..filter.clone()
    };
    let summaries = summarize_range(records, &range_filter);
    let in_range = filter_records(records, &range_filter);
    let days = enumerate_date_range(&filter.from_date, &filter.to_date);

    let mut output = String::new();

    let _ = writeln!(output, "# Attendance Range Report");
    let _ = writeln!(
        output,
        "Generated for {} ({} to {})",
        range_filter.scope_label(),
        filter.from_date.trim(),
        filter.to_date.trim()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Student Summary");

    if summaries.is_empty() {
        let _ = writeln!(output, "No attendance recorded for this range.");
    } else {
        let _ = writeln!(
            output,
            "Sessions held on {} day(s).",
            summaries[0].total_days
        );
        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "| Roll No | Name | FN | AN | Attendance | Standing |"
        );
        let _ = writeln!(output, "|---|---|---|---|---|---|");
        for summary in &summaries {
            let _ = writeln!(
                output,
                "| {} | {} | {}/{} | {}/{} | {}% | {} |",
                summary.roll_number,
                summary.name,
                summary.fn_present,
                summary.fn_total,
                summary.an_present,
                summary.an_total,
                summary.attendance_percent,
                AttendanceStanding::from_percent(summary.attendance_percent).label()
            );
        }
    }

    let flagged: Vec<_> = summaries
        .iter()
        .filter(|s| {
            AttendanceStanding::from_percent(s.attendance_percent)
                == AttendanceStanding::NeedsImprovement
        })
        .collect();

    let _ = writeln!(output);
    let _ = writeln!(output, "## Needs Attention");

    if flagged.is_empty() {
        let _ = writeln!(output, "No students below 75% attendance.");
    } else {
        for summary in flagged {
            let _ = writeln!(
                output,
                "- {} ({}) at {}%",
                summary.name, summary.roll_number, summary.attendance_percent
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Daily Breakdown");

    if days.is_empty() {
        let _ = writeln!(output, "The date range is empty or invalid.");
    }

    for bucket in bucket_by_month(&days) {
        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "### {}",
            month_label(&bucket.month).unwrap_or_else(|| bucket.month.clone())
        );
        for date in &bucket.dates {
            let (forenoon, afternoon) = day_tallies(&in_range, *date);
            if forenoon.conducted == 0 && afternoon.conducted == 0 {
                let _ = writeln!(output, "- {date}: no sessions recorded");
            } else {
                let _ = writeln!(
                    output,
                    "- {date}: FN {}, AN {}",
                    tally_text(forenoon),
                    tally_text(afternoon)
                );
            }
        }
    }

    output
}

fn tally_text(tally: SessionTally) -> String {
    if tally.conducted == 0 {
        return "not held".to_string();
    }
    format!(
        "{}/{} present ({}%)",
        tally.attended,
        tally.conducted,
        percentage_label(tally.conducted, tally.attended)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Session, StudentMark};
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn record(date: &str, session: Session, present: &[bool]) -> AttendanceRecord {
        AttendanceRecord {
            id: Uuid::new_v4(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            department: "Computer Science".to_string(),
            course: "Data Structures".to_string(),
            batch: "2022".to_string(),
            semester: "5".to_string(),
            session,
            students: present
                .iter()
                .enumerate()
                .map(|(i, is_present)| StudentMark {
                    id: i as u32 + 1,
                    name: format!("Student {}", i + 1),
                    roll_number: format!("CS22{:03}", i + 1),
                    is_present: *is_present,
                })
                .collect(),
        }
    }

    #[test]
    fn report_lists_students_and_days() {
        let records = vec![
            record("2025-05-31", Session::Forenoon, &[true, false]),
            record("2025-05-31", Session::Afternoon, &[true, false]),
            record("2025-06-01", Session::Forenoon, &[true, true]),
        ];
        let filter = RecordFilter::range("2025-05-31", "2025-06-02").department("Computer Science");

        let report = build_report(&filter, &records);
        assert!(report.contains("Generated for Computer Science (2025-05-31 to 2025-06-02)"));
        assert!(report.contains("| CS22001 | Student 1 | 2/2 | 1/1 | 100% | Excellent |"));
        assert!(report.contains("- Student 2 (CS22002) at 33%"));
        assert!(report.contains("### May 2025"));
        assert!(report.contains("### June 2025"));
        assert!(report.contains("- 2025-05-31: FN 1/2 present (50.00%), AN 1/2 present (50.00%)"));
        assert!(report.contains("- 2025-06-01: FN 2/2 present (100.00%), AN not held"));
        assert!(report.contains("- 2025-06-02: no sessions recorded"));
    }

    #[test]
    fn report_handles_empty_range() {
        let report = build_report(&RecordFilter::range("2025-06-05", "2025-06-01"), &[]);
        assert!(report.contains("No attendance recorded for this range."));
        assert!(report.contains("The date range is empty or invalid."));
    }
}
