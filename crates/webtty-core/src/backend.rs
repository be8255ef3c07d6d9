//! The backend seam: how the gateway learns which targets exist.
//!
//! A "target" is whatever a session attaches to — a container, a local
//! process, a remote host. The gateway treats target ids as opaque strings
//! and passes them through to the backend unchanged.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One attachable target, as shown on the listing page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetInfo {
    /// Opaque identifier, used in URLs (`/t/{id}/`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Free-form state string ("running", "paused", ...).
    pub state: String,
}

/// Enumerates the targets a backend can attach sessions to.
#[async_trait]
pub trait TargetLister: Send + Sync + 'static {
    async fn targets(&self) -> Result<Vec<TargetInfo>>;
}
