use serde::de::DeserializeOwned;
use serde_json::Value;
use tower_sessions::Session;

use crate::session::error::SessionError;

/// Result of reading a typed value out of a session.
///
/// Sessions store untyped JSON, so a key can hold a value of the wrong shape.
/// Callers decide whether that is a failure or just an absent value.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionValue<T> {
    Present(T),
    WrongShape(Value),
    Absent,
}

impl<T> SessionValue<T> {
    /// The value when present with the expected shape.
    pub fn present(self) -> Option<T> {
        match self {
            SessionValue::Present(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, SessionValue::Absent)
    }
}

impl<T: DeserializeOwned> SessionValue<T> {
    fn classify(raw: Option<Value>) -> Self {
        match raw {
            None => SessionValue::Absent,
            Some(value) => match serde_json::from_value(value.clone()) {
                Ok(typed) => SessionValue::Present(typed),
                Err(_) => SessionValue::WrongShape(value),
            },
        }
    }
}

/// Read `key` without modifying the session.
pub async fn read<T: DeserializeOwned>(
    session: &Session,
    key: &str,
) -> Result<SessionValue<T>, SessionError> {
    let raw: Option<Value> = session.get(key).await?;
    Ok(SessionValue::classify(raw))
}

/// Read `key` and delete it in the same step.
pub async fn take<T: DeserializeOwned>(
    session: &Session,
    key: &str,
) -> Result<SessionValue<T>, SessionError> {
    let raw: Option<Value> = session.remove(key).await?;
    Ok(SessionValue::classify(raw))
}
