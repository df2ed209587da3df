//! FusedSample - SessionRecorder output
//!
//! One rotation reading paired with the most recent polled location, plus the
//! persisted record shape of a chunk.

use serde::{Deserialize, Serialize};

/// Raw rotation reading from the wearable sensor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    /// Rotation vector (rad/s)
    pub orientation: Orientation,

    /// Hardware timestamp (seconds since epoch)
    pub timestamp: f64,
}

/// Rotation vector as reported by the gyroscope
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Orientation {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Geographic position: (latitude, longitude, altitude)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude (degrees)
    pub latitude: f64,

    /// Longitude (degrees)
    pub longitude: f64,

    /// Altitude (metres)
    pub altitude: f64,
}

impl Location {
    /// Location reported when no fix is available
    pub const UNKNOWN: Location = Location {
        latitude: 0.0,
        longitude: 0.0,
        altitude: 0.0,
    };

    pub fn new(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
        }
    }
}

/// Orientation + location + capture time
///
/// Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusedSample {
    /// Rotation vector
    pub orientation: Orientation,

    /// Location polled when the rotation arrived
    pub location: Location,

    /// Capture time (seconds since epoch)
    pub captured_at: f64,
}

impl FusedSample {
    /// Pair a raw rotation reading with a polled location
    pub fn fuse(raw: RawSample, location: Location) -> Self {
        Self {
            orientation: raw.orientation,
            location,
            captured_at: raw.timestamp,
        }
    }
}

/// Persisted shape of a single sample
///
/// Field names are the contract with the persistence boundary. All seven
/// fields are always written; missing fields read back as 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkRecord {
    pub t: f64,
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
    pub ox: f64,
    pub oy: f64,
    pub oz: f64,
}

impl From<&FusedSample> for ChunkRecord {
    fn from(sample: &FusedSample) -> Self {
        Self {
            t: sample.captured_at,
            lat: sample.location.latitude,
            lon: sample.location.longitude,
            alt: sample.location.altitude,
            ox: f64::from(sample.orientation.x),
            oy: f64::from(sample.orientation.y),
            oz: f64::from(sample.orientation.z),
        }
    }
}

impl From<ChunkRecord> for FusedSample {
    fn from(record: ChunkRecord) -> Self {
        Self {
            orientation: Orientation::new(record.ox as f32, record.oy as f32, record.oz as f32),
            location: Location::new(record.lat, record.lon, record.alt),
            captured_at: record.t,
        }
    }
}

/// Persisted chunk document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkDocument {
    #[serde(default)]
    pub samples: Vec<ChunkRecord>,
}

impl ChunkDocument {
    pub fn from_samples(samples: &[FusedSample]) -> Self {
        Self {
            samples: samples.iter().map(ChunkRecord::from).collect(),
        }
    }

    pub fn into_samples(self) -> Vec<FusedSample> {
        self.samples.into_iter().map(FusedSample::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(t: f64) -> FusedSample {
        FusedSample::fuse(
            RawSample {
                orientation: Orientation::new(0.1, -0.25, 3.5),
                timestamp: t,
            },
            Location::new(42.2808, -83.7430, 256.0),
        )
    }

    #[test]
    fn test_record_preserves_every_field() {
        let original = sample(1_685_000_000.02);
        let restored = FusedSample::from(ChunkRecord::from(&original));
        assert_eq!(original, restored);
    }

    #[test]
    fn test_record_serializes_all_seven_fields() {
        let json = serde_json::to_value(ChunkRecord::from(&sample(1.0))).unwrap();
        let obj = json.as_object().unwrap();
        for field in ["t", "lat", "lon", "alt", "ox", "oy", "oz"] {
            assert!(obj.contains_key(field), "missing {field}");
        }
        assert_eq!(obj.len(), 7);
    }

    #[test]
    fn test_missing_fields_default_to_zero() {
        let record: ChunkRecord = serde_json::from_str(r#"{"t": 5.0, "ox": 1.0}"#).unwrap();
        assert_eq!(record.t, 5.0);
        assert_eq!(record.lat, 0.0);
        assert_eq!(record.oz, 0.0);
    }
}
