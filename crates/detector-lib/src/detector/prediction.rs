//! Resource exhaustion prediction for utilization metrics

use crate::anomaly::analyze_trend;
use crate::models::{MetricSeries, RiskLevel, TrendDirection, TrendPrediction};

/// Utilization percentage at or above which a metric is considered at risk
pub const DEFAULT_RISK_THRESHOLD: f64 = 90.0;

/// How far ahead the trend is extrapolated
pub const PREDICTION_HORIZON_HOURS: f64 = 24.0;

const UTILIZATION_MARKERS: &[&str] = &["util", "pused", "pct", "percent"];

/// Whether an item key reports a 0-100 utilization
pub fn is_utilization_key(item_key: &str) -> bool {
    UTILIZATION_MARKERS.iter().any(|m| item_key.contains(m))
}

/// Extrapolate one utilization series 24 hours ahead.
///
/// Returns `None` for non-utilization keys, series without a current value
/// and low-risk outcomes.
pub fn predict_series(host_id: &str, series: &MetricSeries, threshold: f64) -> Option<TrendPrediction> {
    if !is_utilization_key(&series.item_key) {
        return None;
    }
    let current = series.current_value()?;
    let trend = analyze_trend(&series.values());

    let predicted = (current + trend.slope * current * PREDICTION_HORIZON_HOURS).clamp(0.0, 100.0);
    let increasing = trend.direction == TrendDirection::Increasing;

    let (risk, reason) = if predicted >= 100.0 {
        (
            RiskLevel::High,
            format!("Projected to reach 100% within {}h", PREDICTION_HORIZON_HOURS),
        )
    } else if current > threshold && increasing {
        (
            RiskLevel::High,
            format!("At {:.1}%, above {:.0}% and still increasing", current, threshold),
        )
    } else if predicted > threshold {
        (
            RiskLevel::Medium,
            format!(
                "Projected to exceed {:.0}% within {}h ({:.1}%)",
                threshold, PREDICTION_HORIZON_HOURS, predicted
            ),
        )
    } else if current > threshold {
        (
            RiskLevel::Medium,
            format!("At {:.1}%, above {:.0}%", current, threshold),
        )
    } else {
        return None;
    };

    Some(TrendPrediction {
        host_id: host_id.to_string(),
        item_key: series.item_key.clone(),
        item_name: series.item_name.clone(),
        current_value: current,
        trend: trend.direction,
        slope: trend.slope,
        predicted_value_24h: predicted,
        risk,
        reason,
    })
}
