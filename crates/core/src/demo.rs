use std::time::Duration;

use tracing::info;

use crate::record::{normalize_birth_date, normalize_id, StudentRecord};

const DEMO_ROWS: [(&str, &str, &str, &str, f64, &str); 5] = [
    (
        "2024001",
        "2005-03-15",
        "أحمد محمد علي",
        "الرياضيات - الفصل الأول",
        15.5,
        "https://via.placeholder.com/800x1000/6366f1/ffffff?text=ورقة+إجابة+أحمد",
    ),
    (
        "2024002",
        "2005-07-22",
        "فاطمة حسن محمود",
        "الرياضيات - الفصل الأول",
        18.0,
        "https://via.placeholder.com/800x1000/8b5cf6/ffffff?text=ورقة+إجابة+فاطمة",
    ),
    (
        "2024003",
        "2005-11-10",
        "محمد عبدالله أحمد",
        "الرياضيات - الفصل الأول",
        12.5,
        "https://via.placeholder.com/800x1000/ec4899/ffffff?text=ورقة+إجابة+محمد",
    ),
    (
        "2024004",
        "2005-05-18",
        "سارة علي حسن",
        "الفيزياء - الفصل الأول",
        16.0,
        "https://via.placeholder.com/800x1000/10b981/ffffff?text=ورقة+إجابة+سارة",
    ),
    (
        "2024005",
        "2005-09-25",
        "خالد محمود إبراهيم",
        "الفيزياء - الفصل الأول",
        14.5,
        "https://via.placeholder.com/800x1000/f59e0b/ffffff?text=ورقة+إجابة+خالد",
    ),
];

/// Fixed records served when no sheet is configured, for trying the UI.
#[derive(Debug, Clone)]
pub struct DemoProvider {
    records: Vec<StudentRecord>,
    latency: Duration,
}

impl DemoProvider {
    pub fn new(latency: Duration) -> Self {
        let records = DEMO_ROWS
            .iter()
            .map(|(id, date, name, subject, grade, image)| StudentRecord {
                student_id: id.to_string(),
                birth_date: date.to_string(),
                student_name: name.to_string(),
                subject: subject.to_string(),
                grade: *grade,
                image_url: image.to_string(),
            })
            .collect();
        Self { records, latency }
    }

    pub fn records(&self) -> &[StudentRecord] {
        &self.records
    }

    pub async fn search(&self, student_id: &str, birth_date: &str) -> Option<StudentRecord> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let wanted_id = normalize_id(student_id);
        let wanted_date = normalize_birth_date(birth_date);
        let found = self
            .records
            .iter()
            .find(|record| {
                normalize_id(&record.student_id) == wanted_id && record.birth_date == wanted_date
            })
            .cloned();
        info!(found = found.is_some(), "demo lookup");
        found
    }
}

impl Default for DemoProvider {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}
