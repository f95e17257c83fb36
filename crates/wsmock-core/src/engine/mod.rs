//! Engine - command chain の実行
//!
//! # 主要コンポーネント
//! - **InvalidationClock**: 全 chain で共有する無効化クロック（グローバルな epoch）
//! - **run_chain**: 1 本の chain を解釈・実行する状態機械
//! - **ChainSupervisor**: 起動した chain の JoinHandle を保持（spawner は待たない）
//! - **CommandEngine**: 上記をまとめて chain を fire-and-forget で起動する

pub mod chain;
pub mod command_engine;
pub mod error;
pub mod invalidation;
pub mod supervisor;

pub use self::chain::{ChainContext, ChainOutcome, ChainReport, run_chain};
pub use self::command_engine::CommandEngine;
pub use self::error::ChainError;
pub use self::invalidation::InvalidationClock;
pub use self::supervisor::ChainSupervisor;
