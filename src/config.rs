//! Provider options: lifecycle stage, snapshot serializer, and redacted
//! connection settings.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::policy::PolicyConfig;

/// Lifecycle stage at which storage handles are initialised.
pub const DEFAULT_INIT_STAGE: u32 = 10_000;

/// Serializer used when persisting snapshot records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapshotCodec {
    #[default]
    Json,
}

/// Snapshot (de)serialization failure.
#[derive(Debug, Error, Clone)]
#[error("{reason}")]
pub struct CodecError {
    pub reason: String,
}

impl SnapshotCodec {
    pub fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        match self {
            SnapshotCodec::Json => serde_json::to_vec(value).map_err(|err| CodecError {
                reason: err.to_string(),
            }),
        }
    }

    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError> {
        match self {
            SnapshotCodec::Json => serde_json::from_slice(bytes).map_err(|err| CodecError {
                reason: err.to_string(),
            }),
        }
    }
}

/// Connection descriptor for the log backend.
///
/// `Debug` keeps the endpoint but never the key: these values end up in
/// logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    pub endpoint: String,
    pub access_key: Option<String>,
}

impl fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSettings")
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Optional write credential. Fully redacted in `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credentials(String);

impl Credentials {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn reveal(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credentials(<redacted>)")
    }
}

/// Enumerated options for one log-consistency provider.
#[derive(Clone, Debug)]
pub struct ProviderOptions {
    pub init_stage: u32,
    pub serializer: SnapshotCodec,
    pub client_settings: Option<ClientSettings>,
    pub credentials: Option<Credentials>,
    /// `None` falls back to the registry's default-provider policy.
    pub snapshot_policy: Option<PolicyConfig>,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            init_stage: DEFAULT_INIT_STAGE,
            serializer: SnapshotCodec::Json,
            client_settings: None,
            credentials: None,
            snapshot_policy: None,
        }
    }
}
