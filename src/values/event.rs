use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::VidmetaDbError;

use super::point::BoundingBox;
use super::{hex_decode, hex_encode, split_top_level, strip_delimited};

/// Detection event covering an interval of a sequence.
///
/// Text form `(group,class,is_root,(xh,yh,xl,yl),score,\xHEX)`, with `t`/`f`
/// for the root flag and the opaque user payload hex-encoded.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IntervalEvent {
    /// Events of one logical detection share a group id.
    pub group_id: i32,
    /// Classifier-assigned class id.
    pub class_id: i32,
    /// Whether this event anchors its group.
    pub is_root: bool,
    /// Region of the frame the event covers.
    pub region: BoundingBox,
    /// Detection confidence.
    pub score: f64,
    /// Opaque caller payload, carried verbatim.
    pub user_data: Vec<u8>,
}

impl IntervalEvent {
    /// Parse the canonical event literal.
    ///
    /// # Errors
    ///
    /// Returns `VidmetaDbError::ParameterError` on malformed input.
    pub fn parse(literal: &str) -> Result<Self, VidmetaDbError> {
        let body = strip_delimited(literal, '(', ')', "event")?;
        let parts = split_top_level(body);
        if parts.len() != 6 {
            return Err(VidmetaDbError::ParameterError(format!(
                "malformed event literal: {literal:?}"
            )));
        }
        let is_root = match parts[2].trim() {
            "t" => true,
            "f" => false,
            _ => {
                return Err(VidmetaDbError::ParameterError(format!(
                    "bad root flag in event literal: {literal:?}"
                )));
            }
        };
        Ok(Self {
            group_id: parse_i32(parts[0], literal)?,
            class_id: parse_i32(parts[1], literal)?,
            is_root,
            region: BoundingBox::parse(parts[3].trim())?,
            score: parts[4].trim().parse::<f64>().map_err(|_| {
                VidmetaDbError::ParameterError(format!("bad score in event literal: {literal:?}"))
            })?,
            user_data: hex_decode(parts[5])?,
        })
    }
}

impl fmt::Display for IntervalEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{},{},{},{},{})",
            self.group_id,
            self.class_id,
            if self.is_root { 't' } else { 'f' },
            self.region,
            self.score,
            hex_encode(&self.user_data)
        )
    }
}

fn parse_i32(part: &str, literal: &str) -> Result<i32, VidmetaDbError> {
    part.trim().parse::<i32>().map_err(|_| {
        VidmetaDbError::ParameterError(format!("bad integer in event literal: {literal:?}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::Point;

    fn sample() -> IntervalEvent {
        IntervalEvent {
            group_id: 1,
            class_id: 5,
            is_root: true,
            region: BoundingBox::new(Point::new(100.0, 80.0), Point::new(10.0, 20.0)),
            score: 0.85,
            user_data: vec![0xde, 0xad],
        }
    }

    #[test]
    fn event_text_round_trip() {
        let event = sample();
        let text = event.to_string();
        assert_eq!(text, "(1,5,t,(100,80,10,20),0.85,\\xdead)");
        assert_eq!(IntervalEvent::parse(&text).unwrap(), event);
    }

    #[test]
    fn empty_payload_round_trips() {
        let mut event = sample();
        event.user_data.clear();
        let text = event.to_string();
        assert!(text.ends_with(",\\x)"));
        assert_eq!(IntervalEvent::parse(&text).unwrap(), event);
    }

    #[test]
    fn malformed_event_is_rejected() {
        assert!(IntervalEvent::parse("(1,5,t)").is_err());
        assert!(IntervalEvent::parse("(1,5,x,(0,0,0,0),0.5,\\x)").is_err());
    }
}
