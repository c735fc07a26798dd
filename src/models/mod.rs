pub mod friend;
pub mod jwt;
pub mod shop;
pub mod task;
pub mod user;

use serde::Deserialize;

/// The `{"detail": ..}` acknowledgement most action endpoints return.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl Ack {
    pub fn text(&self) -> Option<&str> {
        self.detail
            .as_deref()
            .or(self.status.as_deref())
            .or(self.message.as_deref())
    }
}
