//! One-shot page messages carried across a redirect.

use serde::Serialize;
use tower_sessions::Session;

use crate::session::error::SessionError;
use crate::session::value::{self, SessionValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    Info,
    Success,
    Warning,
    Error,
}

impl FlashKind {
    pub const ALL: [FlashKind; 4] = [
        FlashKind::Info,
        FlashKind::Success,
        FlashKind::Warning,
        FlashKind::Error,
    ];

    /// Session key the message is stored under.
    pub fn key(self) -> &'static str {
        match self {
            FlashKind::Info => "pageInfoMessage",
            FlashKind::Success => "pageSuccessMessage",
            FlashKind::Warning => "pageWarningMessage",
            FlashKind::Error => "pageErrorMessage",
        }
    }
}

/// Store a message to be shown on the next rendered page.
pub async fn set(
    session: &Session,
    kind: FlashKind,
    message: impl Into<String>,
) -> Result<(), SessionError> {
    session.insert(kind.key(), message.into()).await?;
    Ok(())
}

/// Read and delete a message. Missing or non-text values read as empty.
pub async fn take(session: &Session, kind: FlashKind) -> Result<String, SessionError> {
    match value::take::<String>(session, kind.key()).await? {
        SessionValue::Present(message) => Ok(message),
        SessionValue::WrongShape(raw) => {
            tracing::debug!(key = kind.key(), value = %raw, "Discarding non-text flash message");
            Ok(String::new())
        }
        SessionValue::Absent => Ok(String::new()),
    }
}

/// All four flash slots, consumed together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlashMessages {
    pub info: String,
    pub success: String,
    pub warning: String,
    pub error: String,
}

impl FlashMessages {
    pub async fn take(session: &Session) -> Result<Self, SessionError> {
        Ok(Self {
            info: take(session, FlashKind::Info).await?,
            success: take(session, FlashKind::Success).await?,
            warning: take(session, FlashKind::Warning).await?,
            error: take(session, FlashKind::Error).await?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.info.is_empty()
            && self.success.is_empty()
            && self.warning.is_empty()
            && self.error.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tower_sessions::MemoryStore;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[test]
    fn test_keys() {
        let keys: Vec<_> = FlashKind::ALL.iter().map(|k| k.key()).collect();
        assert_eq!(
            keys,
            [
                "pageInfoMessage",
                "pageSuccessMessage",
                "pageWarningMessage",
                "pageErrorMessage"
            ]
        );
    }

    #[tokio::test]
    async fn test_messages_are_read_once() {
        let session = session();
        set(&session, FlashKind::Success, "Saved").await.unwrap();
        set(&session, FlashKind::Error, "But not everything").await.unwrap();

        let first = FlashMessages::take(&session).await.unwrap();
        assert_eq!(first.success, "Saved");
        assert_eq!(first.error, "But not everything");
        assert!(first.info.is_empty());

        let second = FlashMessages::take(&session).await.unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_shape_reads_empty_and_is_removed() {
        let session = session();
        session.insert(FlashKind::Info.key(), 42).await.unwrap();

        assert_eq!(take(&session, FlashKind::Info).await.unwrap(), "");
        let raw: Option<serde_json::Value> = session.get(FlashKind::Info.key()).await.unwrap();
        assert!(raw.is_none());
    }
}
