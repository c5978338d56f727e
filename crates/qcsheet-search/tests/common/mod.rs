#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use qcsheet_search::{FetchError, SourceFetcher};
use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};

/// Builds xlsx bytes in memory.
pub struct WorkbookFixture {
    workbook: Workbook,
}

impl WorkbookFixture {
    pub fn new() -> Self {
        Self {
            workbook: Workbook::new(),
        }
    }

    pub fn sheet(
        mut self,
        name: &str,
        fill: impl FnOnce(&mut Worksheet) -> Result<(), XlsxError>,
    ) -> Self {
        let worksheet = self.workbook.add_worksheet();
        worksheet.set_name(name).expect("sheet name");
        fill(worksheet).expect("write fixture cells");
        self
    }

    pub fn bytes(mut self) -> Vec<u8> {
        self.workbook.save_to_buffer().expect("serialize workbook")
    }
}

/// One sheet with a header row and the given part numbers in column C, numbered from 1 in
/// column A.
pub fn parts_workbook(parts: &[&str]) -> Vec<u8> {
    WorkbookFixture::new()
        .sheet("Sheet1", |ws| {
            ws.write_string(0, 0, "序号")?;
            ws.write_string(0, 2, "物料编号")?;
            for (i, part) in parts.iter().enumerate() {
                let row = i as u32 + 1;
                ws.write_number(row, 0, (i + 1) as f64)?;
                ws.write_string(row, 2, *part)?;
            }
            Ok(())
        })
        .bytes()
}

/// Serves canned bytes per source id and records every call.
#[derive(Default)]
pub struct FakeFetcher {
    responses: Mutex<HashMap<String, Vec<u8>>>,
    calls: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn serve(&self, source_id: &str, bytes: Vec<u8>) {
        self.responses
            .lock()
            .expect("responses")
            .insert(source_id.to_string(), bytes);
    }

    pub fn remove(&self, source_id: &str) {
        self.responses.lock().expect("responses").remove(source_id);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls").clone()
    }

    pub fn call_count(&self, source_id: &str) -> usize {
        self.calls().iter().filter(|c| *c == source_id).count()
    }
}

#[async_trait]
impl SourceFetcher for FakeFetcher {
    async fn fetch(&self, source_id: &str) -> Result<Vec<u8>, FetchError> {
        self.calls
            .lock()
            .expect("calls")
            .push(source_id.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let response = self
            .responses
            .lock()
            .expect("responses")
            .get(source_id)
            .cloned();
        response.ok_or_else(|| FetchError::Status {
            status: 404,
            status_text: "Not Found".to_string(),
            url: source_id.to_string(),
        })
    }
}
