use std::sync::Arc;

use tracing::{error, info};

use crate::config::SheetConfig;
use crate::demo::DemoProvider;
use crate::drive;
use crate::error::{ConfigError, SearchError};
use crate::record::StudentRecord;
use crate::resolver::Resolver;
use crate::store::{RangeSource, SheetsClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    Sheets,
    Demo,
}

impl BackendMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendMode::Sheets => "sheets",
            BackendMode::Demo => "demo",
        }
    }
}

enum Backend {
    Sheets(Resolver),
    Demo(DemoProvider),
}

/// Entry point for the view layer: one search at a time, a record or `None`.
pub struct GradeLookup {
    backend: Backend,
    config: SheetConfig,
}

impl GradeLookup {
    pub fn from_config(config: SheetConfig) -> Result<Self, ConfigError> {
        if config.is_demo() {
            info!("no sheet configured, serving demo records");
            return Ok(Self {
                backend: Backend::Demo(DemoProvider::new(config.demo_latency())),
                config,
            });
        }
        let client = SheetsClient::new(&config)?;
        Ok(Self::with_source(config, Arc::new(client)))
    }

    /// Sheets-backed lookup over any range source.
    pub fn with_source(config: SheetConfig, source: Arc<dyn RangeSource>) -> Self {
        let resolver = Resolver::new(source, config.columns, config.cache_ttl());
        Self {
            backend: Backend::Sheets(resolver),
            config,
        }
    }

    pub fn mode(&self) -> BackendMode {
        match self.backend {
            Backend::Sheets(_) => BackendMode::Sheets,
            Backend::Demo(_) => BackendMode::Demo,
        }
    }

    pub fn config(&self) -> &SheetConfig {
        &self.config
    }

    pub async fn search_student(
        &self,
        student_id: &str,
        birth_date: &str,
    ) -> Result<Option<StudentRecord>, SearchError> {
        match &self.backend {
            Backend::Sheets(resolver) => {
                resolver
                    .search(student_id, birth_date)
                    .await
                    .map_err(|source| {
                        error!(error = %source, "student search failed");
                        SearchError::from(source)
                    })
            }
            Backend::Demo(demo) => Ok(demo.search(student_id, birth_date).await),
        }
    }

    pub fn convert_drive_url(&self, url: &str) -> String {
        drive::convert_drive_url(url)
    }

    pub fn clear_cache(&self) {
        if let Backend::Sheets(resolver) = &self.backend {
            resolver.cache().clear();
        }
    }

    pub fn validate_config(&self) -> bool {
        self.config.validate()
    }
}
