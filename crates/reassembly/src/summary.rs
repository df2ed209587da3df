//! SessionSummary - derived statistics of a reassembled session
//!
//! Distance and path use one point per second of recording: every
//! `round(sample_rate_hz)`-th sample starting at the first.

use serde::Serialize;

use contracts::{FusedSample, Location};

/// Mean Earth radius (metres)
const EARTH_RADIUS_M: f64 = 6_371_000.0;

const METRES_PER_FOOT: f64 = 0.3048;

const POLYLINE_PRECISION: f64 = 1e5;

/// Statistics shown after a session is rebuilt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub sample_count: usize,
    /// First sample time, 0 when empty
    pub started_at: f64,
    /// Last sample time, 0 when empty
    pub ended_at: f64,
    pub duration_secs: f64,
    /// `h:mm:ss`
    pub duration: String,
    pub distance_m: f64,
    pub distance_ft: f64,
    /// Location of the last sample, (0,0) when empty
    pub final_location: Location,
    /// Google encoded polyline of the once-per-second path
    pub polyline: String,
}

impl SessionSummary {
    /// Summarize `samples` recorded at `sample_rate_hz`
    pub fn from_samples(samples: &[FusedSample], sample_rate_hz: f64) -> Self {
        let step = (sample_rate_hz.round() as usize).max(1);
        let path: Vec<Location> = samples.iter().step_by(step).map(|s| s.location).collect();

        let distance_m = path
            .windows(2)
            .map(|pair| haversine_m(&pair[0], &pair[1]))
            .sum::<f64>();

        let (started_at, ended_at) = match (samples.first(), samples.last()) {
            (Some(first), Some(last)) => (first.captured_at, last.captured_at),
            _ => (0.0, 0.0),
        };
        let duration_secs = (ended_at - started_at).max(0.0);

        Self {
            sample_count: samples.len(),
            started_at,
            ended_at,
            duration_secs,
            duration: format_duration(duration_secs),
            distance_m,
            distance_ft: distance_m / METRES_PER_FOOT,
            final_location: samples
                .last()
                .map(|s| s.location)
                .unwrap_or(Location::UNKNOWN),
            polyline: encode_polyline(&path),
        }
    }
}

/// Great-circle distance between two locations, altitude ignored
pub fn haversine_m(a: &Location, b: &Location) -> f64 {
    let (lat1, lat2) = (a.latitude.to_radians(), b.latitude.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// `h:mm:ss`, truncating fractional seconds
pub fn format_duration(secs: f64) -> String {
    let total = secs.max(0.0) as u64;
    format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

/// Google encoded polyline at 1e-5 precision
pub fn encode_polyline(points: &[Location]) -> String {
    let mut out = String::new();
    let (mut prev_lat, mut prev_lon) = (0i64, 0i64);
    for point in points {
        let lat = (point.latitude * POLYLINE_PRECISION).round() as i64;
        let lon = (point.longitude * POLYLINE_PRECISION).round() as i64;
        encode_value(lat - prev_lat, &mut out);
        encode_value(lon - prev_lon, &mut out);
        prev_lat = lat;
        prev_lon = lon;
    }
    out
}

fn encode_value(delta: i64, out: &mut String) {
    let shifted = if delta < 0 { !(delta << 1) } else { delta << 1 };
    let mut v = shifted as u64;
    while v >= 0x20 {
        out.push(char::from((((v & 0x1f) | 0x20) + 63) as u8));
        v >>= 5;
    }
    out.push(char::from((v + 63) as u8));
}
