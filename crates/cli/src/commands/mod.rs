pub mod dispose;
pub mod history;
pub mod hold;
pub mod ingest;
pub mod stats;
pub mod verify;

/// Shorten an ID for text output.
pub(crate) fn short_id(id: &str) -> &str {
    &id[..8.min(id.len())]
}
