//! SpecDocument - 読み取り専用の仕様ドキュメント
//!
//! 起動時に一度だけ読み込まれ、以降は変更されません。
//! `Arc` で共有するので clone は安価で、ロックも不要です。

use serde_json::Value;
use std::sync::Arc;

/// Channel の同一性判定に使う正規化。
///
/// `/chat`, `chat`, `/ch/at` はすべて `chat` として扱う。
pub fn normalize_channel(channel: &str) -> String {
    channel.replace('/', "")
}

/// パース済みの AsyncAPI 仕様（mapping / sequence / scalar の木）。
#[derive(Debug, Clone)]
pub struct SpecDocument {
    root: Arc<Value>,
}

impl SpecDocument {
    pub fn new(root: Value) -> Self {
        Self {
            root: Arc::new(root),
        }
    }

    /// ドキュメント全体（`$ref` の解決起点）
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// `channels` に定義されたキーをドキュメントの定義順で返す（serde_json の `preserve_order`）
    pub fn channel_keys(&self) -> impl Iterator<Item = &str> {
        self.root
            .get("channels")
            .and_then(Value::as_object)
            .into_iter()
            .flat_map(|channels| channels.keys().map(String::as_str))
    }

    /// 接続パスやイベント中の channel 名から仕様上の channel キーを引く。
    pub fn resolve_channel(&self, channel: &str) -> Option<&str> {
        let wanted = normalize_channel(channel);
        self.channel_keys()
            .find(|key| normalize_channel(key) == wanted)
    }

    pub fn channel(&self, key: &str) -> Option<&Value> {
        self.root.get("channels")?.get(key)
    }

    /// クライアントが送ってくる message の仕様 (`publish.message`)
    pub fn publish_message(&self, key: &str) -> Option<&Value> {
        self.channel(key)?.get("publish")?.get("message")
    }

    /// mock が送り出す message の仕様 (`subscribe.message`)
    pub fn subscribe_message(&self, key: &str) -> Option<&Value> {
        self.channel(key)?.get("subscribe")?.get("message")
    }
}

impl From<Value> for SpecDocument {
    fn from(root: Value) -> Self {
        Self::new(root)
    }
}
