use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::columns::ColumnMap;
use crate::error::Result;
use crate::store::{RangeSource, RawRow};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRow {
    pub student_id: String,
    pub birth_date: String,
    /// 1-based sheet row; only meaningful within the generation it came from.
    pub position: usize,
}

/// One complete snapshot of the id / birth date columns, header row included.
#[derive(Debug)]
pub struct IndexGeneration {
    rows: Vec<IndexRow>,
    fetched_at: Instant,
    ttl: Duration,
}

impl IndexGeneration {
    fn from_raw(raw: Vec<RawRow>, columns: &ColumnMap, ttl: Duration) -> Self {
        let (first, _) = columns.index_span();
        let id_offset = columns.student_id - first;
        let date_offset = columns.birth_date - first;
        let rows = raw
            .into_iter()
            .enumerate()
            .map(|(idx, row)| IndexRow {
                student_id: row.get(id_offset).cloned().unwrap_or_default(),
                birth_date: row.get(date_offset).cloned().unwrap_or_default(),
                position: idx + 1,
            })
            .collect();
        Self {
            rows,
            fetched_at: Instant::now(),
            ttl,
        }
    }

    pub fn rows(&self) -> &[IndexRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn fetched_at(&self) -> Instant {
        self.fetched_at
    }

    pub fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.fetched_at) < self.ttl
    }
}

#[derive(Default)]
struct Slot {
    /// Bumped by every install and every clear. A refresh only installs its
    /// result if the epoch it started from is still current.
    epoch: u64,
    generation: Option<Arc<IndexGeneration>>,
}

/// Holds at most one index generation. A refresh swaps the whole `Arc`, so a
/// reader sees either the previous snapshot or the new one.
pub struct IndexCache {
    source: Arc<dyn RangeSource>,
    columns: ColumnMap,
    ttl: Duration,
    current: RwLock<Slot>,
}

impl IndexCache {
    pub fn new(source: Arc<dyn RangeSource>, columns: ColumnMap, ttl: Duration) -> Self {
        Self {
            source,
            columns,
            ttl,
            current: RwLock::new(Slot::default()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached generation while fresh, otherwise fetches a new
    /// one. A fetch that lost a race with `clear` or another refresh still
    /// answers its own caller but is not installed.
    pub async fn get_index(&self) -> Result<Arc<IndexGeneration>> {
        let started = match self.fresh() {
            Ok(generation) => {
                debug!(rows = generation.len(), "serving cached search index");
                return Ok(generation);
            }
            Err(epoch) => epoch,
        };
        let range = self.columns.index_range();
        let raw = self.source.fetch_range(&range).await?;
        let generation = Arc::new(IndexGeneration::from_raw(raw, &self.columns, self.ttl));
        let installed = {
            let mut slot = self.current.write();
            if slot.epoch == started {
                slot.epoch += 1;
                slot.generation = Some(Arc::clone(&generation));
                true
            } else {
                false
            }
        };
        if installed {
            info!(rows = generation.len(), range = %range, "refreshed search index");
        } else {
            debug!(rows = generation.len(), "discarding superseded search index");
        }
        Ok(generation)
    }

    pub fn clear(&self) {
        let mut slot = self.current.write();
        slot.epoch += 1;
        slot.generation = None;
        drop(slot);
        info!("search index cache cleared");
    }

    /// The fresh generation, or the epoch a refresh should start from.
    fn fresh(&self) -> std::result::Result<Arc<IndexGeneration>, u64> {
        let slot = self.current.read();
        slot.generation
            .as_ref()
            .filter(|generation| generation.is_fresh(Instant::now()))
            .cloned()
            .ok_or(slot.epoch)
    }
}
