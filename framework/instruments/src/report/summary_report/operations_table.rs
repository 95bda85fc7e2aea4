use tabled::Tabled;

use crate::aggregator::AggregatedStat;

#[derive(Tabled)]
pub struct OperationRow {
    pub name: String,
    pub action: String,
    #[tabled(rename = "count")]
    pub query_count: u64,
    #[tabled(rename = "changes")]
    pub change_count: u64,
    #[tabled(rename = "errors")]
    pub error_count: u64,
    #[tabled(display = "float2")]
    pub total_ms: f64,
    #[tabled(display = "float2")]
    pub avg_ms: f64,
    pub last_error: String,
}

impl From<&AggregatedStat> for OperationRow {
    fn from(stat: &AggregatedStat) -> Self {
        Self {
            name: stat.name.clone(),
            action: stat.action.to_string(),
            query_count: stat.query_count,
            change_count: stat.change_count,
            error_count: stat.error_count,
            total_ms: stat.duration_total.as_micros() as f64 / 1000.0,
            avg_ms: stat
                .average_duration()
                .map(|d| d.as_micros() as f64 / 1000.0)
                .unwrap_or_default(),
            last_error: stat
                .last_error
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

fn float2(n: &f64) -> String {
    format!("{:.2}", n)
}
