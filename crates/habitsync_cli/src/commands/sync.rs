//! Sync command implementation.

use habitsync_protocol::{SyncRequest, SyncResponse};
use habitsync_server::{RequestHandler, ServerConfig};
use habitsync_store::{EntityStore, StoreConfig};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Runs the sync command.
///
/// `source` is a file path, or `-` to read the request from stdin.
pub fn run(path: &Path, user: Uuid, source: &str) -> Result<(), Box<dyn std::error::Error>> {
    let body = if source == "-" {
        let mut body = Vec::new();
        std::io::stdin().read_to_end(&mut body)?;
        body
    } else {
        std::fs::read(source)?
    };

    let response = apply(path, user, &body)?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

/// Decodes `body` and runs it through the sync handler as `user`.
///
/// Authentication is skipped; whoever can open the data directory already
/// has every user's data.
pub fn apply(
    path: &Path,
    user: Uuid,
    body: &[u8],
) -> Result<SyncResponse, Box<dyn std::error::Error>> {
    let request = SyncRequest::decode(body)?;
    let store = Arc::new(EntityStore::open(path, StoreConfig::default())?);
    let handler = RequestHandler::new(store, ServerConfig::default());
    Ok(handler.handle_sync(user, request)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn push_then_pull() {
        let dir = tempfile::tempdir().unwrap();
        let user = Uuid::new_v4();
        let push = json!({
            "last_pulled_at": null,
            "changes": { "habits": { "created": [{
                "id": Uuid::new_v4(),
                "category_id": Uuid::new_v4(),
                "title": "Jog",
                "frequency_json": {"days": [1]}
            }]}}
        });

        let response = apply(dir.path(), user, push.to_string().as_bytes()).unwrap();
        assert_eq!(response.changes.habits.updated[0].title, "Jog");

        let pull = json!({ "last_pulled_at": response.timestamp });
        let response = apply(dir.path(), user, pull.to_string().as_bytes()).unwrap();
        assert!(response.changes.is_empty());

        let other = apply(dir.path(), Uuid::new_v4(), b"{}").unwrap();
        assert!(other.changes.is_empty());
    }

    #[test]
    fn bad_request_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(apply(dir.path(), Uuid::new_v4(), b"[]").is_err());
    }
}
