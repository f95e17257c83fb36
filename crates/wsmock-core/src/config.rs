//! MockConfig - 実行時設定
//!
//! コアが参照するのは `strict` だけ。host / port はトランスポート層が使う。

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockConfig {
    /// strict: 検証失敗でプロセスを終了する / lenient: ログを出して続行
    #[serde(default)]
    pub strict: bool,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            strict: false,
            host: default_host(),
            port: default_port(),
        }
    }
}

impl MockConfig {
    /// `(host, port)` for `TcpListener::bind`. Host names are resolved at bind time.
    pub fn listen_address(&self) -> (&str, u16) {
        (self.host.as_str(), self.port)
    }
}
