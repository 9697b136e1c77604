//! Host and fleet aggregation of anomaly scores

use crate::models::{AnomalyDetectionResult, AnomalyScore, AnomalySummary, Severity};

/// Number of anomalies kept in a fleet summary
pub const TOP_ANOMALIES: usize = 10;

/// Combine one host's scores into a result.
///
/// `total_score` is the severity-weighted mean of every score; normal scores
/// carry weight 0, so an all-normal host totals 0.
pub fn aggregate_anomalies(
    host_id: &str,
    host_name: &str,
    scores: Vec<AnomalyScore>,
) -> AnomalyDetectionResult {
    let (weighted_sum, total_weight) = scores.iter().fold((0.0, 0.0), |(sum, weight), s| {
        let w = s.severity.weight();
        (sum + s.anomaly_score * w, weight + w)
    });
    let total_score = if total_weight > 0.0 {
        weighted_sum / total_weight
    } else {
        0.0
    };

    let anomalies = scores
        .into_iter()
        .filter(|s| s.severity != Severity::Normal)
        .collect();

    AnomalyDetectionResult {
        host_id: host_id.to_string(),
        host_name: host_name.to_string(),
        total_score,
        anomalies,
        timestamp: chrono::Utc::now().timestamp_millis(),
    }
}

/// Fleet-wide counts and the highest-scoring anomalies
pub fn create_anomaly_summary(results: &[AnomalyDetectionResult]) -> AnomalySummary {
    let mut all: Vec<&AnomalyScore> = results.iter().flat_map(|r| r.anomalies.iter()).collect();

    let count = |severity: Severity| all.iter().filter(|a| a.severity == severity).count();
    let critical_count = count(Severity::Critical);
    let high_count = count(Severity::High);
    let medium_count = count(Severity::Medium);
    let low_count = count(Severity::Low);

    all.sort_by(|a, b| b.anomaly_score.total_cmp(&a.anomaly_score));
    let top_anomalies = all.into_iter().take(TOP_ANOMALIES).cloned().collect();

    AnomalySummary {
        critical_count,
        high_count,
        medium_count,
        low_count,
        total_hosts: results.len(),
        hosts_with_anomalies: results.iter().filter(|r| !r.anomalies.is_empty()).count(),
        top_anomalies,
        timestamp: chrono::Utc::now().timestamp_millis(),
    }
}
