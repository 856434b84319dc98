//! Client identity.
//!
//! The engine never owns the entities it drives. Each client is reduced to a
//! [`ClientId`] that keys the metadata side table.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity used to key per-client metadata.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a random identity.
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ClientId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// An addressable entity whose lifecycle an FSM tracks.
///
/// Returning `None` means the identity cannot be resolved right now (for
/// example because an external lookup failed); the engine rejects such a
/// client with [`FsmError::ClientNotFound`](crate::engine::FsmError).
///
/// # Example
///
/// ```rust
/// use statewise::core::{Client, ClientId};
///
/// struct Connection {
///     host: String,
/// }
///
/// impl Client for Connection {
///     fn client_id(&self) -> Option<ClientId> {
///         (!self.host.is_empty()).then(|| ClientId::new(self.host.clone()))
///     }
/// }
///
/// let conn = Connection { host: "db-1".into() };
/// assert_eq!(conn.client_id(), Some(ClientId::new("db-1")));
/// ```
pub trait Client {
    fn client_id(&self) -> Option<ClientId>;
}

impl Client for ClientId {
    fn client_id(&self) -> Option<ClientId> {
        Some(self.clone())
    }
}

impl Client for String {
    fn client_id(&self) -> Option<ClientId> {
        Some(ClientId::new(self.clone()))
    }
}

impl Client for &str {
    fn client_id(&self) -> Option<ClientId> {
        Some(ClientId::new(*self))
    }
}

impl Client for u64 {
    fn client_id(&self) -> Option<ClientId> {
        Some(ClientId::new(self.to_string()))
    }
}

impl Client for Uuid {
    fn client_id(&self) -> Option<ClientId> {
        Some(ClientId::new(self.to_string()))
    }
}

impl<T: Client + ?Sized> Client for Box<T> {
    fn client_id(&self) -> Option<ClientId> {
        (**self).client_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_clients_resolve() {
        assert_eq!("abc".client_id(), Some(ClientId::new("abc")));
        assert_eq!(String::from("abc").client_id(), Some(ClientId::new("abc")));
        assert_eq!(42u64.client_id(), Some(ClientId::new("42")));

        let id = Uuid::new_v4();
        assert_eq!(id.client_id(), Some(ClientId::new(id.to_string())));
    }

    #[test]
    fn random_ids_are_distinct() {
        assert_ne!(ClientId::random(), ClientId::random());
    }

    #[test]
    fn client_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&ClientId::new("c-1")).unwrap();
        assert_eq!(json, "\"c-1\"");
    }
}
