use chrono::NaiveDate;
use serde::Serialize;

use crate::registry::{DrawingRow, SampleRow, TestRow};
use crate::serial_date::{self, DEFAULT_INTERVAL_MONTHS};

/// Whether a part has to be sent for reliability testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TestRequirement {
    /// No test log entry matched; assume a test is needed.
    Untested,
    /// The last test has expired, or its date/interval could not be read.
    Due,
    /// The last test is still valid.
    NotDue,
}

impl TestRequirement {
    pub fn requires_test(self) -> bool {
        !matches!(self, TestRequirement::NotDue)
    }

    pub fn label(self) -> &'static str {
        if self.requires_test() {
            "送"
        } else {
            "不"
        }
    }
}

/// One row of the cross-reference result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedRecord {
    pub sample_number: String,
    pub part_name: String,
    pub part_number: String,
    pub supplier: String,
    pub drawing_number: String,
    pub test_requirement: TestRequirement,
    pub last_test_date: Option<NaiveDate>,
    pub test_interval_months: Option<u32>,
}

impl MatchedRecord {
    fn new(sample_number: &str, part_name: &str, part_number: &str, supplier: &str) -> Self {
        Self {
            sample_number: sample_number.to_string(),
            part_name: part_name.to_string(),
            part_number: part_number.to_string(),
            supplier: supplier.to_string(),
            drawing_number: String::new(),
            test_requirement: TestRequirement::Untested,
            last_test_date: None,
            test_interval_months: None,
        }
    }

    /// `YYYY/MM/DD`, or empty.
    pub fn last_test_date_text(&self) -> String {
        self.last_test_date
            .map(serial_date::format_date)
            .unwrap_or_default()
    }

    /// `N个月`, or empty.
    pub fn interval_text(&self) -> String {
        self.test_interval_months
            .map(|m| format!("{m}个月"))
            .unwrap_or_default()
    }

    fn apply_test(&mut self, test: &TestRow, today: NaiveDate) {
        let Some(slot) = test.latest_slot() else {
            self.last_test_date = None;
            self.test_interval_months = None;
            return;
        };

        let date = serial_date::parse_date_cell(&slot.test_date);
        let months = if slot.interval.trim().is_empty() {
            Some(DEFAULT_INTERVAL_MONTHS)
        } else {
            serial_date::parse_months(&slot.interval)
        };

        self.test_requirement = match (date, months) {
            (Some(date), Some(months)) if !serial_date::is_overdue(date, months, today) => {
                TestRequirement::NotDue
            }
            _ => TestRequirement::Due,
        };
        self.last_test_date = date;
        self.test_interval_months = months;
    }
}

/// Case-insensitive equality or substring containment in either direction. A blank part
/// number matches nothing.
pub fn part_numbers_match(a: &str, b: &str) -> bool {
    if a.trim().is_empty() || b.trim().is_empty() {
        return false;
    }
    let a = a.to_uppercase();
    let b = b.to_uppercase();
    a == b || a.contains(&b) || b.contains(&a)
}

/// Correlate sample, drawing and test log hits by part number.
///
/// Samples drive the join when there are any; otherwise drawings do; otherwise there is
/// nothing to report. Rows without a part number are skipped. When several drawing or test
/// rows match, the last one wins.
pub fn cross_reference(
    samples: &[SampleRow],
    drawings: &[DrawingRow],
    tests: &[TestRow],
    today: NaiveDate,
) -> Vec<MatchedRecord> {
    if !samples.is_empty() {
        samples
            .iter()
            .filter(|s| !s.part_number.is_empty())
            .map(|sample| {
                let mut record = MatchedRecord::new(
                    &sample.sample_number,
                    &sample.part_name,
                    &sample.part_number,
                    &sample.supplier,
                );
                if let Some(drawing) = drawings
                    .iter()
                    .rev()
                    .find(|d| part_numbers_match(&sample.part_number, &d.part_number))
                {
                    record.drawing_number = drawing.drawing_number.clone();
                }
                apply_matching_tests(&mut record, tests, today);
                record
            })
            .collect()
    } else {
        drawings
            .iter()
            .filter(|d| !d.part_number.is_empty())
            .map(|drawing| {
                let mut record = MatchedRecord::new(
                    "",
                    &drawing.part_name,
                    &drawing.part_number,
                    &drawing.supplier,
                );
                record.drawing_number = drawing.drawing_number.clone();
                apply_matching_tests(&mut record, tests, today);
                record
            })
            .collect()
    }
}

fn apply_matching_tests(record: &mut MatchedRecord, tests: &[TestRow], today: NaiveDate) {
    for test in tests {
        if part_numbers_match(&record.part_number, &test.part_number) {
            record.apply_test(test, today);
        }
    }
}
