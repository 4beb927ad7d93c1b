use crate::domain_port::{StorageTx, TxManager};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Hands out one "transaction" at a time. The memory repos apply writes
/// immediately, so rollback is a no-op; the owned guard is what gives the
/// ledger the same read-then-write isolation the MySQL row lock provides.
pub struct MemTxManager {
    gate: Arc<Mutex<()>>,
}

impl MemTxManager {
    pub fn new() -> Self {
        Self {
            gate: Arc::new(Mutex::new(())),
        }
    }
}

impl Default for MemTxManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TxManager for MemTxManager {
    async fn begin<'t>(&'t self) -> anyhow::Result<Box<dyn StorageTx<'t> + 't>> {
        let guard = self.gate.clone().lock_owned().await;
        Ok(Box::new(MemTx { _guard: guard }))
    }
}

pub struct MemTx {
    _guard: OwnedMutexGuard<()>,
}

#[async_trait::async_trait]
impl<'t> StorageTx<'t> for MemTx {
    async fn commit(self: Box<Self>) -> anyhow::Result<()> {
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> anyhow::Result<()> {
        Ok(())
    }
}
