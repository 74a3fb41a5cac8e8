//! The authenticated owner of a heartbeat.

use serde::{Deserialize, Serialize};

use crate::types::UserId;

/// A user reference resolved by the caller before ingestion.
///
/// Only the identity is needed here; everything else about the account lives
/// with the authentication layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
}

impl User {
    pub const fn new(id: UserId) -> Self {
        Self { id }
    }
}
