use thiserror::Error;

use crate::schema::SchemaError;

/// Errors that terminate a single chain. Other chains are unaffected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChainError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("wait duration {0} is not a valid number of seconds")]
    InvalidWait(f64),

    #[error("example {0} has no value field")]
    MissingExampleValue(String),

    #[error("channel {0} is not defined in the specification")]
    UnknownChannel(String),

    #[error("channel {0} has no subscribe message configuration")]
    NoSubscribeConfiguration(String),

    #[error("example {example_ref} is not valid in any subscribe message of channel {channel}")]
    InvalidExample { example_ref: String, channel: String },
}
