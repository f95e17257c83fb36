//! Command chain state machine.

use serde::{Deserialize, Serialize};

/// Chain state.
///
/// State transitions:
/// - Running -> Running (次のコマンドへ)
/// - Running -> Completed (コマンドを使い切った)
/// - Running -> Aborted (起動時刻 <= 無効化クロック を検知)
/// - Running -> Failed (解決できない参照、不正な仕様など)
///
/// 終端状態からのリトライはしない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainState {
    Running,
    Completed,
    Aborted,
    Failed,
}

impl ChainState {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        !matches!(self, ChainState::Running)
    }
}
