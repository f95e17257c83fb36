//! CommandEngine - chain を独立したタスクとして起動する

use std::sync::Arc;

use tracing::{Instrument, debug, info_span};

use super::chain::{ChainContext, ChainReport, run_chain};
use super::supervisor::ChainSupervisor;
use crate::domain::{ChainId, Command};
use crate::ports::IdGenerator;

/// Spawns command chains. Cheap to clone; all clones share the same
/// context, id generator and supervisor.
#[derive(Clone)]
pub struct CommandEngine {
    ctx: Arc<ChainContext>,
    ids: Arc<dyn IdGenerator>,
    supervisor: Arc<ChainSupervisor>,
}

impl CommandEngine {
    pub fn new(ctx: ChainContext, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            ctx: Arc::new(ctx),
            ids,
            supervisor: Arc::new(ChainSupervisor::new()),
        }
    }

    pub fn context(&self) -> &ChainContext {
        &self.ctx
    }

    pub fn supervisor(&self) -> &ChainSupervisor {
        &self.supervisor
    }

    /// Fire-and-forget: capture `started_at` now and run the chain on its own task.
    pub fn spawn(&self, commands: Arc<[Command]>) -> ChainId {
        let chain_id = self.ids.generate_chain_id();
        let started_at = self.ctx.clock.now();
        let ctx = Arc::clone(&self.ctx);

        debug!(%chain_id, commands = commands.len(), "spawning command chain");
        let span = info_span!("chain", %chain_id);
        self.supervisor.spawn(
            async move {
                let outcome = run_chain(&ctx, started_at, &commands).await;
                ChainReport { chain_id, outcome }
            }
            .instrument(span),
        );
        chain_id
    }
}
