use serde::{Deserialize, Serialize};
use tracker_core::Mmsi;

/// `[[min_lat, min_lon], [max_lat, max_lon]]`
pub type BoundingBox = [[f64; 2]; 2];

pub const GLOBAL_BOUNDING_BOX: BoundingBox = [[-90.0, -180.0], [90.0, 180.0]];

pub const POSITION_MESSAGE_TYPES: [&str; 2] = ["PositionReport", "StandardClassBPositionReport"];

/// Inbound feed message, either a server fault or a vessel report.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum FeedMessage {
    Fault(FeedFaultMessage),
    Position(AisEnvelope),
}

#[derive(Debug, Deserialize)]
pub struct FeedFaultMessage {
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub struct AisEnvelope {
    #[serde(rename = "Message")]
    pub message: AisMessageBody,
    #[serde(rename = "MetaData")]
    pub metadata: AisMetaData,
}

#[derive(Debug, Default, Deserialize)]
pub struct AisMessageBody {
    #[serde(rename = "PositionReport")]
    pub position_report: Option<PositionReport>,
    #[serde(rename = "StandardClassBPositionReport")]
    pub class_b_position_report: Option<PositionReport>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PositionReport {
    #[serde(rename = "Latitude")]
    pub latitude: Option<f64>,
    #[serde(rename = "Longitude")]
    pub longitude: Option<f64>,
    #[serde(rename = "Sog")]
    pub speed_over_ground: Option<f64>,
    #[serde(rename = "Cog")]
    pub course_over_ground: Option<f64>,
    #[serde(rename = "NavigationalStatus")]
    pub navigational_status: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AisMetaData {
    #[serde(rename = "MMSI")]
    pub mmsi: Mmsi,
    #[serde(default)]
    pub time_utc: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscribeMessage {
    #[serde(rename = "APIKey")]
    pub api_key: String,
    #[serde(rename = "BoundingBoxes")]
    pub bounding_boxes: Vec<BoundingBox>,
    #[serde(rename = "FiltersShipMMSI")]
    pub mmsis: Vec<Mmsi>,
    #[serde(rename = "FilterMessageTypes")]
    pub message_types: Vec<String>,
}

impl SubscribeMessage {
    pub fn new(api_key: &str, bounding_boxes: &[BoundingBox], mmsis: Vec<Mmsi>) -> Self {
        Self {
            api_key: api_key.to_owned(),
            bounding_boxes: bounding_boxes.to_vec(),
            mmsis,
            message_types: POSITION_MESSAGE_TYPES.map(String::from).to_vec(),
        }
    }
}

#[cfg(feature = "test")]
mod test {
    use serde_json::{Value, json};

    use super::*;

    impl PositionReport {
        pub fn test_new(latitude: f64, longitude: f64) -> Self {
            Self {
                latitude: Some(latitude),
                longitude: Some(longitude),
                speed_over_ground: Some(12.5),
                course_over_ground: Some(10.0),
                navigational_status: Some(0),
            }
        }

        /// Wraps the report in a feed envelope.
        pub fn to_feed_json(&self, mmsi: &str, time_utc: &str) -> Value {
            json!({
                "MessageType": "PositionReport",
                "Message": { "PositionReport": self },
                "MetaData": {
                    "MMSI": mmsi.parse::<u64>().unwrap(),
                    "time_utc": time_utc,
                },
            })
        }
    }
}
