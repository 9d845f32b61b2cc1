//! Fatal error classification

use thiserror::Error;

/// The browser session is gone; nothing further can be scraped with it.
#[derive(Debug, Error)]
#[error("browser session lost: {0}")]
pub struct SessionLost(pub String);

/// Whether an error must end the run instead of being contained at a
/// product or keyword boundary
pub fn is_fatal(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| cause.is::<SessionLost>())
}
