use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;

static DRIVE_FILE_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/d/([A-Za-z0-9_-]+)").expect("valid drive path regex"));

const DRIVE_HOSTS: [&str; 2] = ["drive.google.com", "docs.google.com"];

/// Turns a Google Drive share link into a direct view URL. Data uris and
/// anything that is not a Drive link come back unchanged.
pub fn convert_drive_url(url: &str) -> String {
    if url.is_empty() || url.starts_with("data:") {
        return url.to_string();
    }
    match drive_file_id(url) {
        Some(id) => format!("https://drive.google.com/uc?export=view&id={id}"),
        None => url.to_string(),
    }
}

fn drive_file_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    if !DRIVE_HOSTS.contains(&host) {
        return None;
    }
    if let Some(caps) = DRIVE_FILE_PATH.captures(parsed.path()) {
        return Some(caps[1].to_string());
    }
    // drive.google.com/open?id=FILE_ID
    parsed
        .query_pairs()
        .find(|(key, value)| key == "id" && !value.is_empty())
        .map(|(_, value)| value.into_owned())
}
