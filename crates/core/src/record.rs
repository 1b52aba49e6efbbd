use serde::{Deserialize, Serialize};

pub const MAX_GRADE: f64 = 20.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub student_id: String,
    pub birth_date: String,
    pub student_name: String,
    pub subject: String,
    pub grade: f64,
    pub image_url: String,
}

impl StudentRecord {
    /// Grade clamped to the 0-20 scale. Storage keeps the raw value.
    pub fn display_grade(&self) -> f64 {
        clamp_grade(self.grade)
    }

    pub fn formatted_grade(&self) -> String {
        format!("{:.2}", self.display_grade())
    }

    pub fn grade_percent(&self) -> f64 {
        self.display_grade() * 100.0 / MAX_GRADE
    }

    pub fn has_image(&self) -> bool {
        !self.image_url.trim().is_empty()
    }

    pub fn download_file_name(&self) -> String {
        let stem = format!("{}_{}", self.student_name, self.subject);
        let safe: String = stem
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
                c if c.is_control() => '-',
                c => c,
            })
            .collect();
        format!("{}.jpg", safe.trim())
    }
}

pub fn clamp_grade(grade: f64) -> f64 {
    if grade.is_nan() {
        return 0.0;
    }
    grade.clamp(0.0, MAX_GRADE)
}

/// Trimmed float parse; anything unparseable or non-finite reads as 0.
pub fn parse_grade(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

pub fn normalize_id(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Birth dates are compared as text: trimmed, never reformatted.
pub fn normalize_birth_date(raw: &str) -> &str {
    raw.trim()
}
