//! Wire protocol between control surfaces, the coordinator, and pages
//!
//! Messages are tagged JSON objects. Requests flow toward a page
//! synchronizer and always get a reply; notices flow from pages toward the
//! coordinator and are fire-and-forget. Receivers ignore messages whose tag
//! they do not recognize, so surfaces of different vintages can coexist.

use serde::{Deserialize, Deserializer, Serialize};

use crate::speed::SpeedValue;

/// Requests a page synchronizer serves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PageRequest {
    /// Read the page's desired speed
    #[serde(rename = "GET_SPEED")]
    GetSpeed,

    /// Set the page's desired speed
    #[serde(rename = "SET_SPEED")]
    SetSpeed {
        /// Requested speed. A missing or non-numeric payload deserializes
        /// to `None` and the page applies the default instead of erroring.
        #[serde(default, deserialize_with = "lenient_number")]
        value: Option<f64>,
    },
}

/// Reply to [`PageRequest::GetSpeed`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedReply {
    pub value: SpeedValue,
}

/// Acknowledgment of [`PageRequest::SetSpeed`], carrying the speed that was
/// actually applied after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SetAck {
    pub ok: bool,
    pub value: SpeedValue,
}

/// Notices flowing from pages toward the coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PageNotice {
    /// The page just applied a speed to its media elements
    #[serde(rename = "SPEED_UPDATED")]
    SpeedUpdated { value: SpeedValue },
}

/// Parse a request off the wire. Returns `None` for unknown tags and
/// malformed envelopes, which the receiver treats as not addressed to it.
pub fn parse_request(raw: &str) -> Option<PageRequest> {
    serde_json::from_str(raw).ok()
}

/// Parse a notice off the wire, with the same tolerance as
/// [`parse_request`].
pub fn parse_notice(raw: &str) -> Option<PageNotice> {
    serde_json::from_str(raw).ok()
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(raw.as_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_speed_wire_format() {
        let json = serde_json::to_string(&PageRequest::GetSpeed).unwrap();
        assert_eq!(json, r#"{"type":"GET_SPEED"}"#);

        let parsed = parse_request(r#"{"type":"GET_SPEED"}"#).unwrap();
        assert_eq!(parsed, PageRequest::GetSpeed);
    }

    #[test]
    fn test_set_speed_wire_format() {
        let json = serde_json::to_string(&PageRequest::SetSpeed { value: Some(1.5) }).unwrap();
        assert_eq!(json, r#"{"type":"SET_SPEED","value":1.5}"#);

        let parsed = parse_request(r#"{"type":"SET_SPEED","value":1.5}"#).unwrap();
        assert_eq!(parsed, PageRequest::SetSpeed { value: Some(1.5) });
    }

    #[test]
    fn test_set_speed_tolerates_missing_value() {
        let parsed = parse_request(r#"{"type":"SET_SPEED"}"#).unwrap();
        assert_eq!(parsed, PageRequest::SetSpeed { value: None });
    }

    #[test]
    fn test_set_speed_tolerates_non_numeric_value() {
        let parsed = parse_request(r#"{"type":"SET_SPEED","value":"fast"}"#).unwrap();
        assert_eq!(parsed, PageRequest::SetSpeed { value: None });

        let parsed = parse_request(r#"{"type":"SET_SPEED","value":null}"#).unwrap();
        assert_eq!(parsed, PageRequest::SetSpeed { value: None });
    }

    #[test]
    fn test_unknown_tag_is_ignored() {
        assert_eq!(parse_request(r#"{"type":"PAUSE_ALL"}"#), None);
        assert_eq!(parse_request("not even json"), None);
    }

    #[test]
    fn test_speed_reply_wire_format() {
        let reply = SpeedReply { value: SpeedValue::from_f64(1.75) };
        assert_eq!(serde_json::to_string(&reply).unwrap(), r#"{"value":1.75}"#);
    }

    #[test]
    fn test_set_ack_wire_format() {
        let ack = SetAck { ok: true, value: SpeedValue::from_f64(3.0) };
        assert_eq!(serde_json::to_string(&ack).unwrap(), r#"{"ok":true,"value":3.0}"#);
    }

    #[test]
    fn test_speed_updated_wire_format() {
        let notice = PageNotice::SpeedUpdated { value: SpeedValue::from_f64(2.0) };
        let json = serde_json::to_string(&notice).unwrap();
        assert_eq!(json, r#"{"type":"SPEED_UPDATED","value":2.0}"#);

        let parsed: PageNotice = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, notice);
    }

    #[test]
    fn test_parse_notice_rejects_request_tags() {
        let parsed = parse_notice(r#"{"type":"SPEED_UPDATED","value":1.5}"#).unwrap();
        assert_eq!(parsed, PageNotice::SpeedUpdated { value: SpeedValue::from_f64(1.5) });

        assert_eq!(parse_notice(r#"{"type":"GET_SPEED"}"#), None);
        assert_eq!(parse_notice("not even json"), None);
    }
}
