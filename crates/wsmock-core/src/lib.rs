//! wsmock-core
//!
//! Core building blocks for the AsyncAPI WebSocket mock.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（SpecDocument, Command, Event, ChainId, ChainState）
//! - **schema**: `$ref` の解決、payload の再帰的バリデーション、message のマッチング
//! - **events**: channel + message 名から command chain を引く EventIndex
//! - **ports**: 抽象化レイヤー（Clock, IdGenerator, Broadcaster）
//! - **engine**: command chain の実行エンジンと無効化クロック
//! - **dispatch**: 受信 payload → マッチング → chain 起動の接着剤
//! - **impls**: 実装（SubscriberRegistry など）
//! - **load**: 仕様/イベントドキュメントの読み込み
//! - **config**: 実行時設定（strict モードなど）

pub mod config;
pub mod dispatch;
pub mod domain;
pub mod engine;
pub mod events;
pub mod fatal;
pub mod impls;
pub mod load;
pub mod ports;
pub mod schema;

pub use config::MockConfig;
pub use dispatch::{DispatchError, Dispatched, Dispatcher};
pub use fatal::{ExitStatus, Fatal, FatalReceiver, FatalSender};
