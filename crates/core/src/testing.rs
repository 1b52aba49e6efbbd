use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::StatusCode;

use crate::error::{Result, StoreError};
use crate::store::{RangeSource, RawRow};

/// In-memory sheet: column ranges return every row, `N:N` returns row N.
pub(crate) struct ScriptedSource {
    rows: Vec<RawRow>,
    fail_rows: bool,
    fail_all: bool,
    calls: Mutex<Vec<String>>,
}

impl ScriptedSource {
    pub(crate) fn with_rows(rows: Vec<RawRow>) -> Self {
        Self {
            rows,
            fail_rows: false,
            fail_all: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_index(pairs: &[(&str, &str)]) -> Self {
        Self::with_rows(
            pairs
                .iter()
                .map(|(id, date)| vec![id.to_string(), date.to_string()])
                .collect(),
        )
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::with_rows(Vec::new())
        }
    }

    pub(crate) fn failing_row_fetch(rows: Vec<RawRow>) -> Self {
        Self {
            fail_rows: true,
            ..Self::with_rows(rows)
        }
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl RangeSource for ScriptedSource {
    async fn fetch_range(&self, range: &str) -> Result<Vec<RawRow>> {
        self.calls.lock().push(range.to_string());
        if self.fail_all {
            return Err(StoreError::Transport {
                status: Some(StatusCode::INTERNAL_SERVER_ERROR),
                message: "backend unavailable".to_string(),
            });
        }
        let row_number = range
            .split_once(':')
            .and_then(|(start, _)| start.parse::<usize>().ok());
        match row_number {
            Some(n) => {
                if self.fail_rows {
                    return Err(StoreError::transport("connection reset"));
                }
                match self.rows.get(n.saturating_sub(1)) {
                    Some(row) if n > 0 && !row.is_empty() => Ok(vec![row.clone()]),
                    _ => Err(StoreError::EmptyResult {
                        range: range.to_string(),
                    }),
                }
            }
            None if self.rows.is_empty() => Err(StoreError::EmptyResult {
                range: range.to_string(),
            }),
            None => Ok(self.rows.clone()),
        }
    }
}
