//! Column layouts of the three register kinds and typed views over their search rows.
//!
//! Column indices are 0-based (`A` = 0).

use crate::table::SearchRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryKind {
    Samples,
    Drawings,
    TestLog,
}

/// Which column a register is searched on and which columns a hit returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryLayout {
    pub search_column: u32,
    pub target_columns: &'static [u32],
}

pub const SAMPLES_LAYOUT: RegistryLayout = RegistryLayout {
    search_column: sample_columns::PART_NUMBER,
    target_columns: &[
        sample_columns::SAMPLE_NUMBER,
        sample_columns::PART_NAME,
        sample_columns::PART_NUMBER,
        sample_columns::SUPPLIER,
    ],
};

pub const DRAWINGS_LAYOUT: RegistryLayout = RegistryLayout {
    search_column: drawing_columns::PART_NUMBER,
    target_columns: &[
        drawing_columns::DRAWING_NUMBER,
        drawing_columns::PART_NAME,
        drawing_columns::PART_NUMBER,
        drawing_columns::SUPPLIER,
    ],
};

pub const TEST_LOG_LAYOUT: RegistryLayout = RegistryLayout {
    search_column: test_columns::PART_NUMBER,
    target_columns: &[
        test_columns::SERIAL,
        test_columns::SUPPLIER,
        test_columns::PART_NUMBER,
        test_columns::MATERIAL,
        test_columns::MATERIAL_DETAIL,
        8,
        9,
        21,
        22,
        34,
        35,
        47,
        48,
    ],
};

impl RegistryKind {
    pub fn layout(self) -> RegistryLayout {
        match self {
            RegistryKind::Samples => SAMPLES_LAYOUT,
            RegistryKind::Drawings => DRAWINGS_LAYOUT,
            RegistryKind::TestLog => TEST_LOG_LAYOUT,
        }
    }
}

pub mod sample_columns {
    pub const SAMPLE_NUMBER: u32 = 0;
    pub const PART_NAME: u32 = 1;
    pub const PART_NUMBER: u32 = 2;
    pub const SUPPLIER: u32 = 6;
}

pub mod drawing_columns {
    pub const DRAWING_NUMBER: u32 = 0;
    /// Part name / specification.
    pub const PART_NAME: u32 = 1;
    pub const PART_NUMBER: u32 = 2;
    pub const SUPPLIER: u32 = 3;
}

pub mod test_columns {
    pub const SERIAL: u32 = 0;
    pub const SUPPLIER: u32 = 1;
    pub const PART_NUMBER: u32 = 3;
    pub const MATERIAL: u32 = 4;
    pub const MATERIAL_DETAIL: u32 = 5;
    /// `(test date, interval in months)` per quarter, oldest first.
    pub const SLOTS: [(u32, u32); 4] = [(8, 9), (21, 22), (34, 35), (47, 48)];
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SampleRow {
    pub sample_number: String,
    pub part_name: String,
    pub part_number: String,
    pub supplier: String,
}

impl From<&SearchRow> for SampleRow {
    fn from(row: &SearchRow) -> Self {
        use sample_columns::*;
        Self {
            sample_number: row.get(SAMPLE_NUMBER).to_string(),
            part_name: row.get(PART_NAME).to_string(),
            part_number: row.get(PART_NUMBER).to_string(),
            supplier: row.get(SUPPLIER).to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DrawingRow {
    pub drawing_number: String,
    pub part_name: String,
    pub part_number: String,
    pub supplier: String,
}

impl From<&SearchRow> for DrawingRow {
    fn from(row: &SearchRow) -> Self {
        use drawing_columns::*;
        Self {
            drawing_number: row.get(DRAWING_NUMBER).to_string(),
            part_name: row.get(PART_NAME).to_string(),
            part_number: row.get(PART_NUMBER).to_string(),
            supplier: row.get(SUPPLIER).to_string(),
        }
    }
}

/// One quarterly test entry as written in the log; both fields may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TestSlot {
    pub test_date: String,
    pub interval: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TestRow {
    pub supplier: String,
    pub part_number: String,
    pub material: String,
    /// Oldest quarter first.
    pub slots: [TestSlot; 4],
}

impl TestRow {
    /// The newest slot with a non-empty test date.
    pub fn latest_slot(&self) -> Option<&TestSlot> {
        self.slots.iter().rev().find(|s| !s.test_date.is_empty())
    }
}

impl From<&SearchRow> for TestRow {
    fn from(row: &SearchRow) -> Self {
        use test_columns::*;
        Self {
            supplier: row.get(SUPPLIER).to_string(),
            part_number: row.get(PART_NUMBER).to_string(),
            material: row.get(MATERIAL).to_string(),
            slots: SLOTS.map(|(date, interval)| TestSlot {
                test_date: row.get(date).to_string(),
                interval: row.get(interval).to_string(),
            }),
        }
    }
}
