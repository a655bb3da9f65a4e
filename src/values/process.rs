use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::VidmetaDbError;

use super::enums::ProcessStatus;
use super::{split_top_level, strip_delimited};

/// Progress snapshot of a running task, text form
/// `(status,progress,current_item,last_error)`.
///
/// `current_item` names the sequence being processed; `last_error` is only
/// meaningful when the status is `error`. Both render empty when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessState {
    pub status: ProcessStatus,
    /// Completion in percent, 0 to 100.
    pub progress: f64,
    pub current_item: String,
    pub last_error: String,
}

impl Default for ProcessState {
    fn default() -> Self {
        Self {
            status: ProcessStatus::Created,
            progress: 0.0,
            current_item: String::new(),
            last_error: String::new(),
        }
    }
}

impl ProcessState {
    /// Parse the canonical state literal.
    ///
    /// # Errors
    ///
    /// Returns `VidmetaDbError::ParameterError` on malformed input.
    pub fn parse(literal: &str) -> Result<Self, VidmetaDbError> {
        let body = strip_delimited(literal, '(', ')', "process state")?;
        let parts = split_top_level(body);
        if parts.len() != 4 {
            return Err(VidmetaDbError::ParameterError(format!(
                "malformed process state literal: {literal:?}"
            )));
        }
        Ok(Self {
            status: ProcessStatus::parse(parts[0])?,
            progress: parts[1].trim().parse::<f64>().map_err(|_| {
                VidmetaDbError::ParameterError(format!(
                    "bad progress in process state literal: {literal:?}"
                ))
            })?,
            current_item: parts[2].trim().to_string(),
            last_error: parts[3].trim().to_string(),
        })
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{},{},{})",
            self.status, self.progress, self.current_item, self.last_error
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_text_round_trip() {
        let state = ProcessState {
            status: ProcessStatus::Running,
            progress: 45.5,
            current_item: "video1.mp4".to_string(),
            last_error: String::new(),
        };
        let text = state.to_string();
        assert_eq!(text, "(running,45.5,video1.mp4,)");
        assert_eq!(ProcessState::parse(&text).unwrap(), state);
    }

    #[test]
    fn default_state_is_created_at_zero() {
        let state = ProcessState::default();
        assert_eq!(state.status, ProcessStatus::Created);
        assert_eq!(state.to_string(), "(created,0,,)");
    }

    #[test]
    fn malformed_state_is_rejected() {
        assert!(ProcessState::parse("(running,45.5)").is_err());
        assert!(ProcessState::parse("(paused,1,,)").is_err());
    }
}
