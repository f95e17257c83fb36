//! Schema - payload バリデーション
//!
//! # 二種類の失敗
//! - **ValidationFailure**: payload が仕様に合わない（想定内）。
//!   `oneOf` の走査中は握りつぶされて「マッチしない」に変換される。
//! - **SchemaError**: 仕様そのものが壊れている、または未対応の機能を使っている。
//!   呼び出し元まで伝播する。

pub mod error;
pub mod matcher;
pub mod resolver;
pub mod validator;

pub use self::error::{FailureReason, SchemaError, ValidationFailure};
pub use self::matcher::{MatchedMessages, match_message};
pub use self::resolver::dereference;
pub use self::validator::{Validation, validate_payload};
