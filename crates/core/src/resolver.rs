use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cache::{IndexCache, IndexRow};
use crate::columns::{row_range, ColumnMap};
use crate::error::{Result, StoreError};
use crate::image::{inspect_payload, reconstruct, PayloadKind};
use crate::record::{normalize_birth_date, normalize_id, parse_grade, StudentRecord};
use crate::store::RangeSource;

/// Two-phase lookup: match against the cached id / birth date index, then
/// pull the single matching row.
pub struct Resolver {
    source: Arc<dyn RangeSource>,
    cache: IndexCache,
    columns: ColumnMap,
}

impl Resolver {
    pub fn new(source: Arc<dyn RangeSource>, columns: ColumnMap, ttl: Duration) -> Self {
        let cache = IndexCache::new(Arc::clone(&source), columns, ttl);
        Self {
            source,
            cache,
            columns,
        }
    }

    pub fn cache(&self) -> &IndexCache {
        &self.cache
    }

    pub async fn search(&self, student_id: &str, birth_date: &str) -> Result<Option<StudentRecord>> {
        let wanted_id = normalize_id(student_id);
        let wanted_date = normalize_birth_date(birth_date);
        // blank sheet rows index as ("", ""); never let blank input reach them
        if wanted_id.is_empty() || wanted_date.is_empty() {
            return Ok(None);
        }
        let index = self.cache.get_index().await?;
        let Some(position) = find_position(index.rows(), &wanted_id, wanted_date) else {
            debug!(rows = index.len(), "no matching student in index");
            return Ok(None);
        };
        let range = row_range(position);
        let row = self
            .source
            .fetch_range(&range)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::EmptyResult {
                range: range.clone(),
            })?;
        let record = decode_row(&row, &self.columns);
        if normalize_id(&record.student_id) != wanted_id {
            warn!(position, "row fetched by position no longer carries the indexed id");
        }
        Ok(Some(record))
    }
}

/// First match after the header row wins; duplicates further down are ignored.
pub fn find_position(rows: &[IndexRow], wanted_id: &str, wanted_date: &str) -> Option<usize> {
    rows.iter()
        .skip(1)
        .find(|row| {
            normalize_id(&row.student_id) == wanted_id
                && normalize_birth_date(&row.birth_date) == wanted_date
        })
        .map(|row| row.position)
}

pub fn decode_row(row: &[String], columns: &ColumnMap) -> StudentRecord {
    let cell = |idx: usize| row.get(idx).cloned().unwrap_or_default();
    let image_url = reconstruct(row, columns.image_start);
    if inspect_payload(&image_url) == PayloadKind::Malformed {
        let head: String = image_url.chars().take(24).collect();
        warn!(head = %head, "answer sheet payload does not look like an image");
    }
    StudentRecord {
        student_id: cell(columns.student_id),
        birth_date: cell(columns.birth_date),
        student_name: cell(columns.student_name),
        subject: cell(columns.subject),
        grade: row.get(columns.grade).map_or(0.0, |raw| parse_grade(raw)),
        image_url,
    }
}
