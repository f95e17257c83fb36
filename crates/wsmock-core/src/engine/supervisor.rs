//! ChainSupervisor - 起動済み chain のハンドル置き場
//!
//! spawner は chain の完了を待たない（fire-and-forget）。
//! ただしハンドルはここに残るので、テストやシャットダウン時に
//! 走行中の chain を決定的に待てる。

use std::future::Future;
use std::mem;
use std::sync::{Mutex, PoisonError};

use tokio::task::{JoinError, JoinSet};
use tracing::{debug, warn};

use super::chain::ChainReport;

#[derive(Default)]
pub struct ChainSupervisor {
    tasks: Mutex<JoinSet<ChainReport>>,
}

impl ChainSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a chain task. Must be called from within a tokio runtime.
    ///
    /// 完了済みのタスクはここで回収してログに出す（結果は保持しない）。
    pub fn spawn<F>(&self, chain: F)
    where
        F: Future<Output = ChainReport> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        while let Some(finished) = tasks.try_join_next() {
            log_finished(finished);
        }
        tasks.spawn(chain);
    }

    /// Number of chains spawned and not yet reaped.
    pub fn in_flight(&self) -> usize {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Wait for every chain currently held, including chains spawned while waiting.
    pub async fn join_all(&self) -> Vec<ChainReport> {
        let mut reports = Vec::new();
        loop {
            // ロックを跨いで await しないように JoinSet ごと取り出す
            let mut tasks = mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
            if tasks.is_empty() {
                return reports;
            }
            while let Some(finished) = tasks.join_next().await {
                match finished {
                    Ok(report) => reports.push(report),
                    Err(err) => warn!(error = %err, "command chain task did not finish"),
                }
            }
        }
    }

    /// Abort every held chain (shutdown).
    pub fn abort_all(&self) {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .abort_all();
    }
}

fn log_finished(finished: Result<ChainReport, JoinError>) {
    match finished {
        Ok(report) => debug!(
            chain_id = %report.chain_id,
            state = ?report.outcome.state(),
            executed = report.outcome.executed(),
            "reaped command chain"
        ),
        Err(err) => warn!(error = %err, "command chain task did not finish"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ChainId;
    use crate::engine::chain::ChainOutcome;
    use ulid::Ulid;

    fn report(executed: usize) -> ChainReport {
        ChainReport {
            chain_id: ChainId::from_ulid(Ulid::new()),
            outcome: ChainOutcome::Completed { executed },
        }
    }

    #[tokio::test]
    async fn join_all_waits_for_spawned_chains() {
        let supervisor = ChainSupervisor::new();
        supervisor.spawn(async { report(1) });
        supervisor.spawn(async { report(2) });
        assert_eq!(supervisor.in_flight(), 2);

        let mut executed: Vec<usize> = supervisor
            .join_all()
            .await
            .iter()
            .map(|r| r.outcome.executed())
            .collect();
        executed.sort();

        assert_eq!(executed, vec![1, 2]);
        assert_eq!(supervisor.in_flight(), 0);
    }

    #[tokio::test]
    async fn join_all_on_empty_supervisor_returns_immediately() {
        let supervisor = ChainSupervisor::new();
        assert!(supervisor.join_all().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn abort_all_cancels_pending_chains() {
        let supervisor = ChainSupervisor::new();
        supervisor.spawn(async {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
            report(1)
        });

        supervisor.abort_all();
        assert!(supervisor.join_all().await.is_empty());
    }

    #[tokio::test]
    async fn finished_chains_are_reaped_on_spawn() {
        let supervisor = ChainSupervisor::new();
        supervisor.spawn(async { report(1) });
        supervisor.join_all().await;

        supervisor.spawn(async { report(2) });
        tokio::task::yield_now().await;
        supervisor.spawn(async { report(3) });

        assert!(supervisor.in_flight() <= 2);
        assert!(!supervisor.join_all().await.is_empty());
    }
}
