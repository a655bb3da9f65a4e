use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::VidmetaDbError;

/// Kind of sequence a dataset row describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeqType {
    Video,
    Images,
    Data,
}

/// Direction of a method parameter or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InOutType {
    InParam,
    InProcess,
    OutTable,
}

/// Lifecycle state of a processing task run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessStatus {
    Created,
    Running,
    Suspended,
    Finished,
    Error,
}

macro_rules! enum_tokens {
    ($ty:ident, $( $variant:ident => $token:literal ),+ $(,)?) => {
        impl $ty {
            /// Stored token for this value.
            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $ty::$variant => $token, )+
                }
            }

            /// Parse the stored token, rejecting anything unrecognized.
            ///
            /// # Errors
            ///
            /// Returns `VidmetaDbError::ParameterError` for unknown tokens.
            pub fn parse(token: &str) -> Result<Self, VidmetaDbError> {
                match token.trim() {
                    $( $token => Ok($ty::$variant), )+
                    other => Err(VidmetaDbError::ParameterError(format!(
                        concat!("unknown ", stringify!($ty), " token: {:?}"),
                        other
                    ))),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

enum_tokens!(SeqType, Video => "video", Images => "images", Data => "data");

enum_tokens!(
    InOutType,
    InParam => "in_param",
    InProcess => "in_process",
    OutTable => "out_table",
);

enum_tokens!(
    ProcessStatus,
    Created => "created",
    Running => "running",
    Suspended => "suspended",
    Finished => "finished",
    Error => "error",
);
