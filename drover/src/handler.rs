//! Turns a workload's operation type into database calls.
use crate::client::{ClientError, DatabaseClient};
use crate::data::DataProvider;
use drover_core::{OperationKind, WorkloadConfig};
use std::sync::Arc;

/// Stateless dispatcher pairing one provider call with one client call.
///
/// The variant is fixed from the workload's operation type at construction;
/// an unknown type cannot reach here because [`OperationKind`] is a closed
/// enum rejected at config parse time. The handler never retries.
pub struct JobHandler {
    client: Arc<dyn DatabaseClient>,
    provider: Arc<DataProvider>,
    dispatch: Dispatch,
}

enum Dispatch {
    InsertOne,
    InsertMany { batch_size: usize },
    ReadOne,
    UpdateOne,
}

impl JobHandler {
    pub fn new(
        config: &WorkloadConfig,
        client: Arc<dyn DatabaseClient>,
        provider: Arc<DataProvider>,
    ) -> Self {
        let dispatch = match config.kind {
            OperationKind::InsertOne => Dispatch::InsertOne,
            OperationKind::InsertMany => Dispatch::InsertMany {
                batch_size: config.batch_size(),
            },
            OperationKind::ReadOne => Dispatch::ReadOne,
            OperationKind::UpdateOne => Dispatch::UpdateOne,
        };
        Self {
            client,
            provider,
            dispatch,
        }
    }

    /// Executes one operation. `Ok(false)` is a clean "did not take effect"
    /// (e.g. read matched nothing); `Err` is a client failure. Both count as
    /// an unsuccessful attempt.
    pub async fn handle(&self) -> Result<bool, ClientError> {
        match &self.dispatch {
            Dispatch::InsertOne => self.client.insert_one(self.provider.single_item()).await,
            Dispatch::InsertMany { batch_size } => {
                self.client.insert_many(self.provider.batch(*batch_size)).await
            }
            Dispatch::ReadOne => self.client.read_one(self.provider.filter()).await,
            Dispatch::UpdateOne => {
                self.client
                    .update_one(self.provider.filter(), self.provider.update())
                    .await
            }
        }
    }
}
