//! Provider registration and keyed policy lookup.
//!
//! Wiring (dependency injection, option validation) belongs to the host;
//! this module only fixes the naming surface: providers register under a
//! name or as the default, and policy resolution prefers the named
//! provider's policy, then the default provider's, then `Never`.

use std::collections::BTreeMap;

use crate::config::ProviderOptions;
use crate::policy::PolicyConfig;

#[derive(Debug, Default)]
pub struct ProviderRegistry {
    named: BTreeMap<String, ProviderOptions>,
    default_options: Option<ProviderOptions>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under a name, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, options: ProviderOptions) {
        self.named.insert(name.into(), options);
    }

    /// Register the default provider.
    pub fn register_default(&mut self, options: ProviderOptions) {
        self.default_options = Some(options);
    }

    pub fn options(&self, name: &str) -> Option<&ProviderOptions> {
        self.named.get(name)
    }

    pub fn default_options(&self) -> Option<&ProviderOptions> {
        self.default_options.as_ref()
    }

    /// Policy for a provider name: explicitly configured wins, else the
    /// default provider's policy, else `Never`.
    pub fn resolve_policy(&self, name: &str) -> PolicyConfig {
        self.named
            .get(name)
            .and_then(|options| options.snapshot_policy)
            .or_else(|| {
                self.default_options
                    .as_ref()
                    .and_then(|options| options.snapshot_policy)
            })
            .unwrap_or(PolicyConfig::Never)
    }
}

/// Name of the checkpoint stream used by queue-streaming hosts.
pub fn checkpoint_stream_name(
    service_id: &str,
    stream_provider: &str,
    queue: &str,
    id: u128,
) -> String {
    format!("{service_id}/checkpoints/{stream_provider}/{queue}/{id:032x}")
}
