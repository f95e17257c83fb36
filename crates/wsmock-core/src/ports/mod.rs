//! Ports - 抽象化レイヤー
//!
//! コアが環境から受け取るものだけを trait にしています。
//! - **Clock**: 現在時刻（テストでは FixedClock に差し替え）
//! - **IdGenerator**: chain の ID 生成
//! - **Broadcaster**: 「channel C の全購読者に送る」プリミティブ（トランスポート層が実装）

pub mod broadcaster;
pub mod clock;
pub mod id_generator;

pub use self::broadcaster::Broadcaster;
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
