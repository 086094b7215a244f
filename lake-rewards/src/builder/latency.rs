//! Public-internet latency between metros

use std::collections::BTreeMap;

use crate::config::LatencyConfig;
use crate::source::MetroLatencyRow;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometres
pub(crate) fn haversine_km(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lng1) = (from.0.to_radians(), from.1.to_radians());
    let (lat2, lng2) = (to.0.to_radians(), to.1.to_radians());
    let dlat = lat2 - lat1;
    let dlng = lng2 - lng1;

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Estimated latency, rounded to 2 decimal places
pub(crate) fn estimate(config: &LatencyConfig, from: (f64, f64), to: (f64, f64)) -> f64 {
    let ms = haversine_km(from, to) * config.per_km_ms * config.overhead + config.floor_ms;
    round_to(ms, 2)
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Unordered metro pair key
pub(crate) fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Measured latencies by unordered pair, both directions averaged
pub(crate) fn measured(rows: &[MetroLatencyRow]) -> BTreeMap<(String, String), f64> {
    let mut sums: BTreeMap<(String, String), (f64, u32)> = BTreeMap::new();
    for row in rows {
        if !(row.rtt_ms.is_finite() && row.rtt_ms > 0.0) {
            continue;
        }
        let key = pair_key(&row.origin.to_uppercase(), &row.target.to_uppercase());
        if key.0 == key.1 {
            continue;
        }
        let entry = sums.entry(key).or_insert((0.0, 0));
        entry.0 += row.rtt_ms;
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(key, (sum, n))| (key, sum / f64::from(n)))
        .collect()
}
