//! Batched partial updates with bounded retry.

use super::error::PatchAborted;
use crate::config::StoreConfig;
use crate::store::{PatchOperation, RecordStore};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Applies patch operations in fixed-size batches, strictly in order.
///
/// Each attempt is preceded by the store's request delay. A failed batch is
/// retried in place; once it has failed more than `max_retries` times in a
/// row the whole sequence aborts. Nothing already applied is rolled back.
pub struct BatchPatchExecutor<'a> {
    store: &'a RecordStore,
    batch_size: usize,
    max_retries: u32,
    delay: Duration,
}

impl<'a> BatchPatchExecutor<'a> {
    pub fn new(store: &'a RecordStore, config: &StoreConfig) -> Self {
        Self {
            store,
            batch_size: config.batch_size.max(1),
            max_retries: config.max_retries,
            delay: store.request_delay(),
        }
    }

    /// Apply `operations`, returning them once every batch is confirmed.
    pub async fn apply(
        &self,
        operations: Vec<PatchOperation>,
    ) -> Result<Vec<PatchOperation>, PatchAborted> {
        let mut applied: Vec<PatchOperation> = Vec::with_capacity(operations.len());
        let batches: Vec<&[PatchOperation]> = operations.chunks(self.batch_size).collect();

        for (batch_index, batch) in batches.iter().enumerate() {
            let mut failures: u32 = 0;

            loop {
                tokio::time::sleep(self.delay).await;

                match self.store.patch(batch).await {
                    Ok(()) => {
                        debug!(batch_index, records = batch.len(), "Patch batch applied");
                        applied.extend_from_slice(batch);
                        break;
                    }
                    Err(e) => {
                        failures += 1;
                        metrics::counter!("care_shim_patch_failures_total").increment(1);

                        if failures > self.max_retries {
                            error!(
                                batch_index,
                                attempts = failures,
                                applied = applied.len(),
                                error = %e,
                                "Patch batch exhausted retries, aborting with partial update"
                            );
                            let unapplied = batches[batch_index..]
                                .iter()
                                .flat_map(|b| b.iter().cloned())
                                .collect();
                            return Err(PatchAborted {
                                applied,
                                unapplied,
                                batch_index,
                                attempts: failures,
                                last_error: e,
                            });
                        }

                        warn!(
                            batch_index,
                            attempt = failures,
                            max_retries = self.max_retries,
                            error = %e,
                            "Patch batch failed, retrying"
                        );
                    }
                }
            }
        }

        Ok(applied)
    }
}
