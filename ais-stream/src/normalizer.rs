use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use tracing::{debug, warn};
use tracker_core::{
    Mmsi, NavigationStatus, Position, PositionSource, clamp_speed, normalize_course,
    truncate_to_seconds, valid_coordinates,
};

use crate::{
    connection::Frame,
    models::{AisEnvelope, FeedMessage},
};

const FEED_TIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedFault {
    TooManyConnections,
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum DiscardReason {
    InvalidUtf8,
    MalformedMessage,
    MissingPositionReport,
    MissingCoordinates,
    InvalidCoordinates,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Position(Mmsi, Position),
    Fault(FeedFault),
    Discarded(DiscardReason),
}

impl FeedFault {
    pub fn from_message(message: &str) -> Self {
        if message.to_lowercase().contains("concurrent connections") {
            Self::TooManyConnections
        } else {
            Self::Other(message.to_owned())
        }
    }
}

impl std::fmt::Display for FeedFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedFault::TooManyConnections => f.write_str("too many concurrent connections"),
            FeedFault::Other(message) => f.write_str(message),
        }
    }
}

pub fn normalize(frame: &Frame) -> Normalized {
    normalize_at(frame, Utc::now())
}

/// Like [`normalize`], with `received` used when the message carries no
/// usable timestamp.
pub fn normalize_at(frame: &Frame, received: DateTime<Utc>) -> Normalized {
    let text = match frame {
        Frame::Text(text) => text.as_str(),
        Frame::Binary(data) => match std::str::from_utf8(data) {
            Ok(text) => text,
            Err(e) => {
                debug!("discarding binary frame with invalid utf-8: {e}");
                return Normalized::Discarded(DiscardReason::InvalidUtf8);
            }
        },
    };

    match serde_json::from_str::<FeedMessage>(text) {
        Ok(FeedMessage::Fault(fault)) => Normalized::Fault(FeedFault::from_message(&fault.error)),
        Ok(FeedMessage::Position(envelope)) => normalize_envelope(envelope, received),
        Err(e) => {
            debug!("discarding malformed feed message: {e}");
            Normalized::Discarded(DiscardReason::MalformedMessage)
        }
    }
}

fn normalize_envelope(envelope: AisEnvelope, received: DateTime<Utc>) -> Normalized {
    let AisEnvelope { message, metadata } = envelope;

    let Some(report) = message.position_report.or(message.class_b_position_report) else {
        return Normalized::Discarded(DiscardReason::MissingPositionReport);
    };
    let (Some(lat), Some(lon)) = (report.latitude, report.longitude) else {
        return Normalized::Discarded(DiscardReason::MissingCoordinates);
    };
    if !valid_coordinates(lat, lon) {
        debug!(mmsi = %metadata.mmsi, lat, lon, "discarding position with invalid coordinates");
        return Normalized::Discarded(DiscardReason::InvalidCoordinates);
    }

    let timestamp = metadata
        .time_utc
        .as_deref()
        .and_then(parse_feed_time)
        .unwrap_or_else(|| truncate_to_seconds(received));

    let position = Position {
        mmsi: metadata.mmsi.clone(),
        lat,
        lon,
        speed: clamp_speed(report.speed_over_ground.unwrap_or(0.0)),
        course: normalize_course(report.course_over_ground.unwrap_or(0.0)),
        status: report
            .navigational_status
            .and_then(NavigationStatus::from_code),
        timestamp,
        source: PositionSource::Ais,
    };

    Normalized::Position(metadata.mmsi, position)
}

/// Parses feed timestamps such as `2024-01-01 00:00:00.123456 +0000 UTC`
/// or RFC 3339, truncated to whole seconds.
pub fn parse_feed_time(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(truncate_to_seconds(ts.with_timezone(&Utc)));
    }

    let head = value.get(..19)?;
    FEED_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(head, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Builds a position from a catalog `lat,lon[,speed[,course]]` string.
pub fn normalize_catalog_location(
    mmsi: &Mmsi,
    location: &str,
    date: Option<&str>,
) -> Option<Position> {
    normalize_catalog_location_at(mmsi, location, date, Utc::now())
}

pub fn normalize_catalog_location_at(
    mmsi: &Mmsi,
    location: &str,
    date: Option<&str>,
    received: DateTime<Utc>,
) -> Option<Position> {
    let values = location
        .split([',', ';'])
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::parse::<f64>)
        .collect::<Result<Vec<_>, _>>();

    let values = match values {
        Ok(values) if values.len() >= 2 => values,
        Ok(_) => {
            warn!(%mmsi, location, "catalog location needs both latitude and longitude");
            return None;
        }
        Err(e) => {
            warn!(%mmsi, location, "failed to parse catalog location: {e}");
            return None;
        }
    };

    let (lat, lon) = (values[0], values[1]);
    if !valid_coordinates(lat, lon) {
        warn!(%mmsi, lat, lon, "catalog location has invalid coordinates");
        return None;
    }

    Some(Position {
        mmsi: mmsi.clone(),
        lat,
        lon,
        speed: clamp_speed(values.get(2).copied().unwrap_or(0.0)),
        course: normalize_course(values.get(3).copied().unwrap_or(0.0)),
        status: Some(NavigationStatus::Moored),
        timestamp: date
            .and_then(parse_catalog_date)
            .unwrap_or_else(|| truncate_to_seconds(received)),
        source: PositionSource::Manual,
    })
}

/// Accepts RFC 3339, `YYYY-MM-DD` or a bare year.
fn parse_catalog_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(truncate_to_seconds(ts.with_timezone(&Utc)));
    }

    let date = match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        Ok(date) => date,
        Err(_) if value.len() == 4 => NaiveDate::from_ymd_opt(value.parse().ok()?, 1, 1)?,
        Err(_) => return None,
    };
    date.and_hms_opt(0, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
}
