//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **SubscriberRegistry**: 接続ごとの mpsc に JSON テキストを配る Broadcaster

pub mod subscribers;

pub use self::subscribers::{SubscriberId, SubscriberRegistry, Subscription};
