//! Chain interpreter - 1 本の command chain を実行する
//!
//! # フロー
//! 1. 各コマンドの実行前に「起動時刻 <= 無効化クロック」をチェック
//! 2. stale なら Aborted（残りはスキップ、エラーではない）
//! 3. そうでなければ次のコマンドを実行
//! 4. 全て実行できたら Completed
//!
//! キャンセルはチェックポイントでのみ効く。`wait` の途中では止まらない。

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::error::ChainError;
use super::invalidation::InvalidationClock;
use crate::domain::{ChainId, ChainState, Command, SpecDocument};
use crate::fatal::{ExitStatus, Fatal, FatalSender};
use crate::ports::{Broadcaster, Clock};
use crate::schema::{dereference, match_message};

/// Everything a running chain may touch. Shared by all chains.
pub struct ChainContext {
    pub document: SpecDocument,
    pub broadcaster: Arc<dyn Broadcaster>,
    pub invalidation: Arc<InvalidationClock>,
    pub clock: Arc<dyn Clock>,
    /// strict: 不正な example でプロセスを終了させる / lenient: 警告して送る
    pub strict: bool,
    pub fatal: FatalSender,
}

/// How a chain ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainOutcome {
    Completed { executed: usize },
    Aborted { executed: usize, total: usize },
    Failed { executed: usize, error: ChainError },
}

impl ChainOutcome {
    pub fn state(&self) -> ChainState {
        match self {
            ChainOutcome::Completed { .. } => ChainState::Completed,
            ChainOutcome::Aborted { .. } => ChainState::Aborted,
            ChainOutcome::Failed { .. } => ChainState::Failed,
        }
    }

    /// Number of commands that ran to completion.
    pub fn executed(&self) -> usize {
        match self {
            ChainOutcome::Completed { executed }
            | ChainOutcome::Aborted { executed, .. }
            | ChainOutcome::Failed { executed, .. } => *executed,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChainReport {
    pub chain_id: ChainId,
    pub outcome: ChainOutcome,
}

/// Run one chain to a terminal state.
pub async fn run_chain(
    ctx: &ChainContext,
    started_at: DateTime<Utc>,
    commands: &[Command],
) -> ChainOutcome {
    let total = commands.len();

    for (executed, command) in commands.iter().enumerate() {
        if ctx.invalidation.is_stale(started_at) {
            info!(executed, total, "command chain stopped prematurely");
            return ChainOutcome::Aborted { executed, total };
        }

        if let Err(error) = execute(ctx, command).await {
            warn!(command = command.name(), %error, "command chain failed");
            return ChainOutcome::Failed { executed, error };
        }
    }

    debug!(total, "command chain completed");
    ChainOutcome::Completed { executed: total }
}

async fn execute(ctx: &ChainContext, command: &Command) -> Result<(), ChainError> {
    match command {
        Command::Wait { seconds } => {
            let duration =
                Duration::try_from_secs_f64(*seconds).map_err(|_| ChainError::InvalidWait(*seconds))?;
            debug!(seconds, "executing wait");
            tokio::time::sleep(duration).await;
        }
        Command::BroadcastExample {
            example_ref,
            channel,
        } => broadcast_example(ctx, example_ref, channel).await?,
        Command::StopCommandChains(()) => {
            debug!("executing command chain stop");
            ctx.invalidation.invalidate(ctx.clock.now());
        }
    }
    Ok(())
}

async fn broadcast_example(
    ctx: &ChainContext,
    example_ref: &str,
    channel: &str,
) -> Result<(), ChainError> {
    debug!(example_ref, channel, "executing broadcast_example");

    let document = &ctx.document;
    let example = dereference(example_ref, document.root())?;
    let value = example
        .get("value")
        .ok_or_else(|| ChainError::MissingExampleValue(example_ref.to_string()))?;

    let key = document
        .resolve_channel(channel)
        .ok_or_else(|| ChainError::UnknownChannel(channel.to_string()))?;
    let subscribe = document
        .subscribe_message(key)
        .ok_or_else(|| ChainError::NoSubscribeConfiguration(key.to_string()))?;

    let matched = match_message(value, subscribe, document.root())?;
    if matched.is_empty() {
        if ctx.strict {
            let error = ChainError::InvalidExample {
                example_ref: example_ref.to_string(),
                channel: key.to_string(),
            };
            ctx.fatal
                .signal(Fatal::new(ExitStatus::InvalidExample, error.to_string()));
            return Err(error);
        }
        warn!(
            example_ref,
            channel = key,
            "example will be sent even though it is not a valid subscribe message (use --strict to enforce)"
        );
    }

    ctx.broadcaster.broadcast(key, value).await;
    debug!(example_ref, channel = key, "example broadcast");
    Ok(())
}
