use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::{EngineError, SearchEngine};
use crate::join::{cross_reference, MatchedRecord};
use crate::registry::{DrawingRow, RegistryKind, SampleRow, TestRow};
use crate::table::SearchRow;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("part number query is empty")]
    EmptyQuery,
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// The sample and drawing registers of one product line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductLine {
    pub label: String,
    pub samples: String,
    pub drawings: String,
}

/// Source ids of every register a part lookup reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegistryCatalog {
    pub automotive: ProductLine,
    pub consumer: ProductLine,
    pub test_log: String,
}

impl Default for RegistryCatalog {
    fn default() -> Self {
        Self {
            automotive: ProductLine {
                label: "车载类".to_string(),
                samples: "excel/汽车类样品.xlsx".to_string(),
                drawings: "excel/汽车类图纸目录表.xlsx".to_string(),
            },
            consumer: ProductLine {
                label: "消费类".to_string(),
                samples: "excel/消费类样品.xlsx".to_string(),
                drawings: "excel/IQC工程图纸登记表.xlsx".to_string(),
            },
            test_log: "excel/环保测试记录表.xlsx".to_string(),
        }
    }
}

impl RegistryCatalog {
    /// Every source id, in the order a bulk refresh visits them.
    pub fn all_sources(&self) -> Vec<&str> {
        vec![
            self.automotive.samples.as_str(),
            self.automotive.drawings.as_str(),
            self.consumer.samples.as_str(),
            self.consumer.drawings.as_str(),
            self.test_log.as_str(),
        ]
    }
}

/// Joined results of one part lookup, per product line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartLookupReport {
    pub query: String,
    pub automotive: Vec<MatchedRecord>,
    pub consumer: Vec<MatchedRecord>,
}

impl PartLookupReport {
    pub fn summary(&self) -> String {
        format!(
            "车载类  {}  个，消费类  {}  个",
            self.automotive.len(),
            self.consumer.len()
        )
    }
}

/// Search every register for `query` and cross-reference the hits per product line.
///
/// Registers are searched one after another: the test log first, then each product line's
/// samples and drawings. The first failure aborts the lookup.
pub async fn lookup_part(
    engine: &SearchEngine,
    catalog: &RegistryCatalog,
    query: &str,
    today: NaiveDate,
) -> Result<PartLookupReport, LookupError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(LookupError::EmptyQuery);
    }

    let tests: Vec<TestRow> = search(engine, &catalog.test_log, RegistryKind::TestLog, query)
        .await?
        .iter()
        .map(TestRow::from)
        .collect();

    let automotive = lookup_product_line(engine, &catalog.automotive, query, &tests, today).await?;
    let consumer = lookup_product_line(engine, &catalog.consumer, query, &tests, today).await?;

    let report = PartLookupReport {
        query: query.to_string(),
        automotive,
        consumer,
    };
    log::debug!("lookup `{query}`: {}", report.summary());
    Ok(report)
}

async fn lookup_product_line(
    engine: &SearchEngine,
    line: &ProductLine,
    query: &str,
    tests: &[TestRow],
    today: NaiveDate,
) -> Result<Vec<MatchedRecord>, LookupError> {
    let samples: Vec<SampleRow> = search(engine, &line.samples, RegistryKind::Samples, query)
        .await?
        .iter()
        .map(SampleRow::from)
        .collect();
    let drawings: Vec<DrawingRow> = search(engine, &line.drawings, RegistryKind::Drawings, query)
        .await?
        .iter()
        .map(DrawingRow::from)
        .collect();
    Ok(cross_reference(&samples, &drawings, tests, today))
}

async fn search(
    engine: &SearchEngine,
    source_id: &str,
    kind: RegistryKind,
    query: &str,
) -> Result<Vec<SearchRow>, EngineError> {
    let layout = kind.layout();
    engine
        .search(source_id, query, layout.search_column, layout.target_columns)
        .await
}
