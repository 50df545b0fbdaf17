//! Persistent identity token.
//!
//! The token is what lets the hub hand back the same name and last position
//! after a restart, so it is kept in a small file next to the client.

use std::{io::ErrorKind, path::Path};

use hiroba_shared::limits::sanitize_token;
use uuid::Uuid;

use crate::error::ClientError;

/// Read the token stored at `path`, or generate and store a new one.
///
/// A file holding an unusable token (empty, or longer than the hub accepts)
/// is overwritten with a fresh one.
pub fn load_or_create(path: &Path) -> Result<String, ClientError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            if let Some(token) = sanitize_token(Some(contents.trim())) {
                tracing::debug!("Using identity token from {}", path.display());
                return Ok(token);
            }
            tracing::warn!("Token in {} is unusable, regenerating", path.display());
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(source) => {
            return Err(ClientError::TokenFile {
                path: path.display().to_string(),
                source,
            });
        }
    }

    let token = Uuid::new_v4().simple().to_string();
    std::fs::write(path, format!("{token}\n")).map_err(|source| ClientError::TokenFile {
        path: path.display().to_string(),
        source,
    })?;
    tracing::info!("Stored new identity token in {}", path.display());
    Ok(token)
}
