//! Broadcaster port - 購読者へのファンアウト
//!
//! トランスポート層が実装します。配送保証・ack・バックプレッシャーはなし（best-effort）。

use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait Broadcaster: Send + Sync {
    /// `payload` をそのまま `channel` の現在の全購読者に送る。
    async fn broadcast(&self, channel: &str, payload: &Value);
}
