use anyhow::Result;
use legacy_kernel_core::{build_record, generate_response, Policy, WillRecord};
use legacy_kernel_store_memory::{MemoryStore, WillStore};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub const API_CONTRACT_VERSION: &str = "api.v1";

/// Lookup failure for an address no caller has minted. Kept as its own
/// type so the boundary layer can translate it to a not-found response.
#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
#[error("digital will not found: {0}")]
pub struct WillNotFound(pub String);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MintRequest {
    pub subject: String,
    pub policy: Policy,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRequest {
    pub address: String,
    pub query: String,
}

/// One conversation turn. Ephemeral by design; the kernel never persists
/// chat history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatResult {
    pub address: String,
    pub query: String,
    pub response: String,
}

#[derive(Debug, Clone)]
pub struct DigitalLegacyApi {
    store: MemoryStore,
}

impl DigitalLegacyApi {
    #[must_use]
    pub fn new(store: MemoryStore) -> Self {
        Self { store }
    }

    /// Mint one digital will: build the record, store it under its
    /// address, and return it.
    ///
    /// # Errors
    /// Returns an error when the subject is empty, the policy cannot be
    /// canonicalized, or the store is unavailable.
    pub fn mint(&self, input: MintRequest) -> Result<WillRecord> {
        let created_at = input.created_at.unwrap_or_else(OffsetDateTime::now_utc);
        let record = build_record(&input.subject, input.policy, created_at)?;
        self.store.put(record.clone())?;
        Ok(record)
    }

    /// Answer one query against a previously minted will.
    ///
    /// # Errors
    /// Returns [`WillNotFound`] when the address is unknown, or an error
    /// when the stored record fails its integrity check.
    pub fn chat(&self, input: ChatRequest) -> Result<ChatResult> {
        let record = self
            .store
            .get(&input.address)?
            .ok_or_else(|| WillNotFound(input.address.clone()))?;
        let response = generate_response(&record, &input.query)?;
        Ok(ChatResult { address: input.address, query: input.query, response })
    }

    /// Fetch one previously minted will.
    ///
    /// # Errors
    /// Returns [`WillNotFound`] when the address is unknown.
    pub fn will_show(&self, address: &str) -> Result<WillRecord> {
        self.store
            .get(address)?
            .ok_or_else(|| WillNotFound(address.to_string()).into())
    }

    /// List every minted will, ordered by address.
    ///
    /// # Errors
    /// Returns an error when the store is unavailable.
    pub fn will_list(&self) -> Result<Vec<WillRecord>> {
        self.store.list()
    }
}
