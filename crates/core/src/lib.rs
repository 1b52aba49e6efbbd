mod cache;
mod columns;
mod config;
mod demo;
mod drive;
mod error;
mod image;
mod lookup;
mod record;
mod resolver;
mod store;

#[cfg(test)]
mod testing;

pub use cache::{IndexCache, IndexGeneration, IndexRow};
pub use columns::{column_letter, quote_sheet_name, row_range, ColumnMap};
pub use config::{
    SheetConfig, DEFAULT_BASE_URL, DEFAULT_CACHE_TTL_SECS, DEFAULT_CONFIG,
    DEFAULT_DEMO_LATENCY_MS, PLACEHOLDER_API_KEY, PLACEHOLDER_SPREADSHEET_ID,
};
pub use demo::DemoProvider;
pub use drive::convert_drive_url;
pub use error::{ConfigError, ImageError, Result, SearchError, StoreError};
pub use image::{
    decode_data_uri, inspect_payload, is_http_url, reconstruct, repair, DecodedImage, PayloadKind,
};
pub use lookup::{BackendMode, GradeLookup};
pub use record::{
    clamp_grade, normalize_birth_date, normalize_id, parse_grade, StudentRecord, MAX_GRADE,
};
pub use resolver::{decode_row, find_position, Resolver};
pub use store::{RangeSource, RawRow, SheetsClient};
