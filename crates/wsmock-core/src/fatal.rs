//! Fatal - strict モードでのプロセス終了要求
//!
//! コアは `process::exit` を直接呼ばない。理由をログに出してからチャネルで通知し、
//! バイナリ側が受け取って終了ステータス付きで落ちる。

use std::fmt;

use tokio::sync::mpsc;
use tracing::error;

/// Documented, distinct exit statuses of the mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitStatus {
    /// Documents could not be loaded or the listener could not be bound.
    Startup,
    /// Strict mode: an inbound message matched no message specification.
    UnmatchedMessage,
    /// Strict mode: an example is not a valid subscribe message of its channel.
    InvalidExample,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Startup => 1,
            ExitStatus::UnmatchedMessage => 2,
            ExitStatus::InvalidExample => 3,
        }
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExitStatus::Startup => "startup",
            ExitStatus::UnmatchedMessage => "unmatched_message",
            ExitStatus::InvalidExample => "invalid_example",
        };
        write!(f, "{name} (exit status {})", self.code())
    }
}

/// A request to terminate the whole process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fatal {
    pub status: ExitStatus,
    pub reason: String,
}

impl Fatal {
    pub fn new(status: ExitStatus, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
        }
    }
}

pub type FatalReceiver = mpsc::UnboundedReceiver<Fatal>;

#[derive(Debug, Clone)]
pub struct FatalSender {
    tx: mpsc::UnboundedSender<Fatal>,
}

impl FatalSender {
    pub fn channel() -> (FatalSender, FatalReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (FatalSender { tx }, rx)
    }

    /// Log the reason and ask the process owner to terminate.
    pub fn signal(&self, fatal: Fatal) {
        error!(status = %fatal.status, reason = %fatal.reason, "mock server is going to terminate");
        // receiver が既に落ちていれば終了処理中なので無視
        let _ = self.tx.send(fatal);
    }
}
