//! # Field Extractor
//!
//! Turns a loosely-structured text payload into typed telemetry fields.
//!
//! Extraction is a textual heuristic, not a structured parse: each known
//! field name is located by its FIRST occurrence in the raw text, and the
//! value is whatever sits between the following `:` and the next `,` (or
//! `}` when no comma follows). This matches the wire behavior the remote
//! devices were built against, including its quirks: no awareness of
//! nesting or escaping, and a comma inside a string value truncates it.
//! The heuristic lives behind [`PayloadExtractor`] so it can later be
//! swapped for a structured parser without touching the listener or store.

use tracing::debug;

/// Latest known telemetry values for a single device.
///
/// Numeric fields start at zero and `device_id` starts at the `"None"`
/// sentinel until the first payload that carries them. Extraction is
/// partial by design: a payload that omits (or garbles) a field leaves the
/// previous value in place rather than resetting it.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryRecord {
    /// Latitude in degrees (not range-checked)
    pub latitude: f64,
    /// Longitude in degrees (not range-checked)
    pub longitude: f64,
    /// Altitude in meters
    pub altitude: f64,
    /// Device-reported epoch timestamp; the unit (seconds vs milliseconds)
    /// is device-defined and carried opaquely
    pub timestamp: i64,
    /// Device IMEI, `"None"` until first seen
    pub device_id: String,
    /// Raw radio-cell metadata, empty until first seen
    pub cell_info: String,
}

impl Default for TelemetryRecord {
    fn default() -> Self {
        Self {
            latitude: 0.0,
            longitude: 0.0,
            altitude: 0.0,
            timestamp: 0,
            device_id: "None".to_string(),
            cell_info: String::new(),
        }
    }
}

/// Extraction seam between the listener and the concrete payload format.
///
/// Implementations update zero or more fields of `record` in place and
/// never fail: a field that cannot be extracted is simply left untouched.
pub trait PayloadExtractor {
    /// Apply whatever fields `payload` carries onto `record`.
    fn apply(&self, payload: &str, record: &mut TelemetryRecord);
}

/// The documented first-textual-match extractor.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextScanExtractor;

impl TextScanExtractor {
    /// Locate the raw value for `name` in `payload`.
    ///
    /// Finds the first occurrence of the quoted field name, then the next
    /// `:`, then the next `,` after the colon (falling back to `}`, and to
    /// end-of-payload when neither follows). Returns the substring strictly
    /// between colon and terminator, untrimmed.
    fn raw_value<'a>(payload: &'a str, name: &str) -> Option<&'a str> {
        let key = format!("\"{name}\"");
        let key_pos = payload.find(&key)?;
        let colon = key_pos + payload[key_pos..].find(':')?;
        let rest = &payload[colon + 1..];

        let end = rest.find(',').or_else(|| rest.find('}'));
        match end {
            Some(end) => Some(&rest[..end]),
            None => Some(rest),
        }
    }

    /// Strip one matching pair of surrounding double quotes, if present.
    ///
    /// Operates on the raw colon-to-terminator substring: a value whose
    /// first byte is whitespace keeps its quotes (and the whitespace),
    /// exactly as the devices in the field have always seen it.
    fn unquote(raw: &str) -> &str {
        if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
            &raw[1..raw.len() - 1]
        } else {
            raw
        }
    }

    /// Parse a numeric field and store it into `slot` on success.
    ///
    /// An absent field is skipped silently; a present-but-unparseable one
    /// is skipped with a debug log. Either way `slot` keeps its value.
    fn parse_into<T>(payload: &str, name: &str, slot: &mut T)
    where
        T: std::str::FromStr + std::fmt::Display,
        T::Err: std::fmt::Display,
    {
        if let Some(raw) = Self::raw_value(payload, name) {
            match raw.trim().parse::<T>() {
                Ok(value) => {
                    *slot = value;
                    debug!("{name}: {slot}");
                }
                Err(e) => debug!("skipping unparseable {name} {raw:?}: {e}"),
            }
        }
    }
}

impl PayloadExtractor for TextScanExtractor {
    fn apply(&self, payload: &str, record: &mut TelemetryRecord) {
        debug!("extracting fields from payload ({} bytes)", payload.len());

        Self::parse_into(payload, "latitude", &mut record.latitude);
        Self::parse_into(payload, "longitude", &mut record.longitude);
        Self::parse_into(payload, "altitude", &mut record.altitude);
        Self::parse_into(payload, "timestamp", &mut record.timestamp);

        if let Some(raw) = Self::raw_value(payload, "imei") {
            let imei = Self::unquote(raw);
            record.device_id = imei.to_string();
            debug!("imei: {imei}");
        }

        if let Some(raw) = Self::raw_value(payload, "cellInfo") {
            let cell_info = Self::unquote(raw);
            debug!("cellInfo received, {} chars", cell_info.len());
            record.cell_info = cell_info.to_string();
        }
    }
}
