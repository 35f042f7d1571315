//! OpenDAL Operator factory for ovault blob backends

use opendal::Operator;

use ovault_core::config::{expand_tilde, StorageBackend};
use ovault_core::{VaultError, VaultResult};

/// Minimal config needed to build an S3 operator
/// (full config lives in ovault-core's StorageConfig)
#[derive(Debug, Clone)]
pub struct S3Config {
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

/// S3 credentials, supplied by the caller (never read from the config file)
#[derive(Debug, Clone)]
pub struct S3Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

/// Build an OpenDAL Operator for any S3-compatible endpoint.
///
/// Uses path-style addressing (default in opendal 0.55), which MinIO and
/// most self-hosted S3 servers require.
pub fn build_s3_operator(cfg: &S3Config) -> VaultResult<Operator> {
    let builder = opendal::services::S3::default()
        .endpoint(&cfg.endpoint)
        .region(&cfg.region)
        .bucket(&cfg.bucket)
        .access_key_id(&cfg.access_key_id)
        .secret_access_key(&cfg.secret_access_key);

    let op = Operator::new(builder)
        .map_err(|e| VaultError::Config(format!("creating OpenDAL S3 operator: {e}")))?
        .layer(opendal::layers::LoggingLayer::default())
        .layer(
            opendal::layers::RetryLayer::new()
                .with_max_times(5)
                .with_jitter(),
        )
        .finish();

    Ok(op)
}

/// Build an operator rooted at a local directory.
pub fn build_fs_operator(root: &std::path::Path) -> VaultResult<Operator> {
    let root = expand_tilde(root);
    let builder = opendal::services::Fs::default().root(&root.to_string_lossy());

    let op = Operator::new(builder)
        .map_err(|e| VaultError::Config(format!("creating OpenDAL fs operator: {e}")))?
        .layer(opendal::layers::LoggingLayer::default())
        .finish();

    Ok(op)
}

/// Build a process-local in-memory operator.
pub fn build_memory_operator() -> VaultResult<Operator> {
    let op = Operator::new(opendal::services::Memory::default())
        .map_err(|e| VaultError::Config(format!("creating OpenDAL memory operator: {e}")))?
        .finish();
    Ok(op)
}

/// Build an operator from ovault-core config.
///
/// `credentials` is required for the S3 backend. If `enforce_tls` is true and
/// the S3 endpoint uses HTTP, this returns an error; otherwise a warning is
/// logged for non-HTTPS endpoints.
pub fn build_from_core_config(
    storage: &ovault_core::config::StorageConfig,
    credentials: Option<&S3Credentials>,
) -> VaultResult<Operator> {
    match storage.backend {
        StorageBackend::S3 => {
            if storage.endpoint.starts_with("http://") {
                if storage.enforce_tls {
                    return Err(VaultError::Config(format!(
                        "S3 endpoint uses plaintext HTTP ({}), but enforce_tls is enabled. \
                         Use an HTTPS endpoint or set storage.enforce_tls = false for local development.",
                        storage.endpoint
                    )));
                }
                tracing::warn!(
                    endpoint = %storage.endpoint,
                    "S3 endpoint uses plaintext HTTP; credentials and ciphertext travel unencrypted"
                );
            }

            let creds = credentials.ok_or_else(|| {
                VaultError::Config("S3 backend requires access credentials".into())
            })?;

            build_s3_operator(&S3Config {
                endpoint: storage.endpoint.clone(),
                region: storage.region.clone(),
                bucket: storage.bucket.clone(),
                access_key_id: creds.access_key_id.clone(),
                secret_access_key: creds.secret_access_key.clone(),
            })
        }
        StorageBackend::Fs => build_fs_operator(&storage.root),
        StorageBackend::Memory => build_memory_operator(),
    }
}
