//! Storage health check

use opendal::Operator;

use ovault_core::{VaultError, VaultResult};

/// Verify the storage endpoint is reachable by listing the root
pub async fn check_health(op: &Operator) -> VaultResult<()> {
    op.list("/")
        .await
        .map(|_| ())
        .map_err(|e| VaultError::StorageRead(format!("storage health check failed: {e}")))
}
