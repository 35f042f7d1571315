//! Upload validation: size limits, empty files, and soft warnings

use std::fmt;

use ovault_core::config::LimitsConfig;
use ovault_core::{format_file_size, VaultError, VaultResult};

/// A non-fatal observation about an accepted upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadWarning {
    LargeFile { size: u64, threshold: u64 },
    LargeVideo { size: u64, threshold: u64 },
}

impl fmt::Display for UploadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadWarning::LargeFile { size, .. } => write!(
                f,
                "large file ({}) may take longer to encrypt and upload",
                format_file_size(*size)
            ),
            UploadWarning::LargeVideo { size, .. } => write!(
                f,
                "video files ({}) are best stored compressed",
                format_file_size(*size)
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadPolicy {
    limits: LimitsConfig,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::new(LimitsConfig::default())
    }
}

impl UploadPolicy {
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Reject uploads that break a hard limit; return soft warnings otherwise.
    pub fn check(
        &self,
        file_name: &str,
        content_type: &str,
        size: u64,
    ) -> VaultResult<Vec<UploadWarning>> {
        if file_name.trim().is_empty() {
            return Err(VaultError::InvalidFile("file name is empty".into()));
        }
        if size == 0 && !self.limits.allow_empty {
            return Err(VaultError::InvalidFile("file is empty".into()));
        }
        if size > self.limits.max_file_size {
            return Err(VaultError::InvalidFile(format!(
                "file size exceeds {} limit",
                format_file_size(self.limits.max_file_size)
            )));
        }

        let mut warnings = Vec::new();
        if size > self.limits.large_file_warning {
            warnings.push(UploadWarning::LargeFile {
                size,
                threshold: self.limits.large_file_warning,
            });
        }
        if content_type.starts_with("video/") && size > self.limits.video_warning {
            warnings.push(UploadWarning::LargeVideo {
                size,
                threshold: self.limits.video_warning,
            });
        }
        Ok(warnings)
    }
}
