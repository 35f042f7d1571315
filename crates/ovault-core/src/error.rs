use thiserror::Error;

pub type VaultResult<T> = Result<T, VaultError>;

#[derive(Debug, Error)]
pub enum VaultError {
    /// Key material of the wrong length, or a KDF/cipher setup failure.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Tag verification failed: wrong secret, tampered or truncated payload.
    #[error("authentication failed: wrong secret or corrupted data")]
    Authentication,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage write error: {0}")]
    StorageWrite(String),

    #[error("storage read error: {0}")]
    StorageRead(String),

    #[error("invalid file: {0}")]
    InvalidFile(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fieldless discriminant of [`VaultError`] for exhaustive matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Crypto,
    Authentication,
    NotFound,
    StorageWrite,
    StorageRead,
    InvalidFile,
    Config,
    Io,
}

impl VaultError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VaultError::Crypto(_) => ErrorKind::Crypto,
            VaultError::Authentication => ErrorKind::Authentication,
            VaultError::NotFound(_) => ErrorKind::NotFound,
            VaultError::StorageWrite(_) => ErrorKind::StorageWrite,
            VaultError::StorageRead(_) => ErrorKind::StorageRead,
            VaultError::InvalidFile(_) => ErrorKind::InvalidFile,
            VaultError::Config(_) => ErrorKind::Config,
            VaultError::Io(_) => ErrorKind::Io,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}
