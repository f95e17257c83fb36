//! Command - command chain を構成するアクション
//!
//! 文字列キーによる動的ディスパッチではなく、閉じた enum として表現します。
//! 未知のコマンド名はイベントドキュメントの読み込み時に弾かれるので、
//! 実行時に「未実装のコマンド」に出会うことはありません。

use serde::{Deserialize, Deserializer};
use std::collections::HashMap;

/// One step of a command chain.
///
/// The wire shape is a single-key mapping, e.g.
/// `{"wait": {"seconds": 2}}` or `{"stop_command_chains": {}}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// この chain だけを指定秒数サスペンドする
    Wait { seconds: f64 },

    /// example を subscribe 仕様で検証し、channel の全購読者に送る
    BroadcastExample { example_ref: String, channel: String },

    /// 無効化クロックを「今」に進め、走行中の全 chain を止める
    StopCommandChains(#[serde(deserialize_with = "no_arguments")] ()),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Wait { .. } => "wait",
            Command::BroadcastExample { .. } => "broadcast_example",
            Command::StopCommandChains(()) => "stop_command_chains",
        }
    }
}

/// `stop_command_chains` accepts `{}` as well as an empty value.
fn no_arguments<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: Deserializer<'de>,
{
    Option::<HashMap<String, serde_json::Value>>::deserialize(deserializer).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_all_variants() {
        let commands: Vec<Command> = serde_json::from_value(json!([
            { "wait": { "seconds": 5 } },
            { "broadcast_example": { "example_ref": "#/components/examples/a", "channel": "chat" } },
            { "stop_command_chains": {} },
            { "stop_command_chains": null }
        ]))
        .unwrap();

        assert_eq!(commands[0], Command::Wait { seconds: 5.0 });
        assert_eq!(
            commands[1],
            Command::BroadcastExample {
                example_ref: "#/components/examples/a".to_string(),
                channel: "chat".to_string(),
            }
        );
        assert_eq!(commands[2], Command::StopCommandChains(()));
        assert_eq!(commands[3], Command::StopCommandChains(()));
    }

    #[test]
    fn unknown_command_is_rejected() {
        let result: Result<Command, _> = serde_json::from_value(json!({ "reboot": {} }));
        assert!(result.is_err());
    }

    #[test]
    fn names_match_wire_keys() {
        assert_eq!(Command::Wait { seconds: 1.0 }.name(), "wait");
        assert_eq!(Command::StopCommandChains(()).name(), "stop_command_chains");
    }
}
