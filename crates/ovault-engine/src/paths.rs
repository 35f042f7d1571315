//! Blob path generation
//!
//! `{prefix}/{owner}/{unix_millis}_{uuid}_{name}`: the random segment keeps
//! concurrent uploads of the same name from colliding.

const MAX_NAME_CHARS: usize = 128;

/// Make a single path segment safe for object keys and local filesystems.
pub fn sanitize_segment(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .take(MAX_NAME_CHARS)
        .collect();

    let trimmed = cleaned.trim();
    match trimmed {
        "" | "." | ".." => "file".to_string(),
        s => s.to_string(),
    }
}

/// A fresh, collision-resistant blob path for one upload.
pub fn fresh_blob_path(prefix: &str, owner_id: &str, file_name: &str, now_millis: u64) -> String {
    let prefix = prefix.trim_matches('/');
    let unique = uuid::Uuid::new_v4().simple();
    let owner = sanitize_segment(owner_id);
    let name = sanitize_segment(file_name);
    if prefix.is_empty() {
        format!("{owner}/{now_millis}_{unique}_{name}")
    } else {
        format!("{prefix}/{owner}/{now_millis}_{unique}_{name}")
    }
}
