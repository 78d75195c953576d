use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum LegacyError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InteractionLevel {
    Interactive,
    Passive,
}

impl InteractionLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Interactive => "interactive",
            Self::Passive => "passive",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "interactive" => Some(Self::Interactive),
            "passive" => Some(Self::Passive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CommercialUse {
    Permitted,
    Prohibited,
}

impl CommercialUse {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Permitted => "permitted",
            Self::Prohibited => "prohibited",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "permitted" => Some(Self::Permitted),
            "prohibited" => Some(Self::Prohibited),
            _ => None,
        }
    }
}

/// Rule set governing one avatar. Recognized keys are typed; everything
/// else the author supplied rides along in `metadata` and is preserved
/// verbatim through serialization and hashing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct Policy {
    #[serde(default)]
    pub forbidden_topics: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interaction_level: Option<InteractionLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commercial_use: Option<CommercialUse>,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

/// One minted digital will. Immutable once built; the address is a pure
/// function of `{created_at, policy, subject}` in canonical form.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct WillRecord {
    pub address: String,
    pub subject: String,
    pub policy: Policy,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl WillRecord {
    /// Check structural integrity before the record is consulted.
    ///
    /// # Errors
    /// Returns [`LegacyError::InvalidRecord`] when the subject is empty,
    /// the address is not 64 lowercase hex characters, or the address no
    /// longer matches the record's recomputed canonical digest.
    pub fn validate(&self) -> Result<(), LegacyError> {
        if self.subject.trim().is_empty() {
            return Err(LegacyError::InvalidRecord("subject MUST be non-empty".to_string()));
        }

        if self.address.len() != 64
            || !self.address.chars().all(|ch| ch.is_ascii_hexdigit() && !ch.is_ascii_uppercase())
        {
            return Err(LegacyError::InvalidRecord(
                "address MUST be 64 lowercase hex characters".to_string(),
            ));
        }

        let expected = compute_address(&self.subject, &self.policy, self.created_at)
            .map_err(|err| LegacyError::InvalidRecord(err.to_string()))?;
        if expected != self.address {
            return Err(LegacyError::InvalidRecord(
                "address does not match record content".to_string(),
            ));
        }

        Ok(())
    }
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|lhs, rhs| lhs.0.cmp(rhs.0));
            let mut sorted = Map::new();
            for (key, entry) in entries {
                sorted.insert(key.clone(), canonicalize(entry));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Render the canonical wire form of one will: the `{created_at, policy,
/// subject}` document with object keys sorted lexicographically at every
/// nesting level, serialized compactly as UTF-8 JSON. This exact byte
/// sequence is the digest input, so any change here breaks every
/// previously minted address.
///
/// # Errors
/// Returns [`LegacyError::Serialization`] when the timestamp or policy
/// cannot be rendered in canonical form.
pub fn canonical_will_json(
    subject: &str,
    policy: &Policy,
    created_at: OffsetDateTime,
) -> Result<String, LegacyError> {
    let created_at = created_at
        .format(&Rfc3339)
        .map_err(|err| LegacyError::Serialization(format!("invalid creation time: {err}")))?;
    let policy_value = serde_json::to_value(policy)
        .map_err(|err| LegacyError::Serialization(format!("policy is not serializable: {err}")))?;

    let mut document = Map::new();
    document.insert("created_at".to_string(), Value::String(created_at));
    document.insert("policy".to_string(), policy_value);
    document.insert("subject".to_string(), Value::String(subject.to_string()));

    serde_json::to_string(&canonicalize(&Value::Object(document)))
        .map_err(|err| LegacyError::Serialization(format!("canonical form failed: {err}")))
}

/// Compute the content address: lowercase hex SHA-256 of the canonical
/// will JSON.
///
/// # Errors
/// Returns [`LegacyError::Serialization`] when the canonical form cannot
/// be produced.
pub fn compute_address(
    subject: &str,
    policy: &Policy,
    created_at: OffsetDateTime,
) -> Result<String, LegacyError> {
    let canonical = canonical_will_json(subject, policy, created_at)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let digest = hasher.finalize();
    Ok(format!("{digest:x}"))
}

/// Build one immutable will record with its deterministic address.
///
/// # Errors
/// Returns [`LegacyError::InvalidInput`] when the subject is empty or
/// whitespace, or [`LegacyError::Serialization`] when the policy cannot
/// be rendered in canonical form.
pub fn build_record(
    subject: &str,
    policy: Policy,
    created_at: OffsetDateTime,
) -> Result<WillRecord, LegacyError> {
    if subject.trim().is_empty() {
        return Err(LegacyError::InvalidInput("subject MUST be non-empty".to_string()));
    }

    let address = compute_address(subject, &policy, created_at)?;
    Ok(WillRecord { address, subject: subject.to_string(), policy, created_at })
}

pub const DEFAULT_RESPONSE: &str =
    "Thank you for your question. I will search my available memories for a relevant response.";

/// One generic content rule: fires when any trigger occurs as a substring
/// of the lowercased query.
#[derive(Debug, Clone, Copy)]
pub struct FallbackRule {
    pub name: &'static str,
    pub triggers: &'static [&'static str],
    pub response: &'static str,
}

/// Generic content rules evaluated after the restriction check, in
/// declaration order, first match wins. The project rule outranks the
/// greeting rule.
pub const FALLBACK_RULES: &[FallbackRule] = &[
    FallbackRule {
        name: "project",
        triggers: &["mindsurance"],
        response: "Mindsurance was a conceptual project I was very passionate about. \
                   It aimed to insure human cognitive potential.",
    },
    FallbackRule {
        name: "greeting",
        triggers: &["hello", "how are you"],
        response: "I am a digital avatar operating under the rules defined by my user. \
                   I am ready to assist you based on those parameters.",
    },
];

#[must_use]
pub fn refusal_response(topic: &str) -> String {
    format!(
        "I apologize, but per the Digital Legacy Protocol, I am not permitted to \
         discuss topics related to '{topic}'."
    )
}

/// Answer one query against one minted will.
///
/// Evaluation order is a policy-author-visible contract: forbidden topics
/// in policy order first (a case-insensitive substring hit returns the
/// refusal naming that topic), then [`FALLBACK_RULES`] in declaration
/// order, then [`DEFAULT_RESPONSE`]. Empty topic strings are skipped so
/// they cannot match every query.
///
/// # Errors
/// Returns [`LegacyError::InvalidRecord`] when the record fails its
/// integrity check. An empty forbidden-topics list is not an error; it
/// simply means no restrictions.
pub fn generate_response(record: &WillRecord, query: &str) -> Result<String, LegacyError> {
    record.validate()?;

    let lowered = query.to_lowercase();
    for topic in &record.policy.forbidden_topics {
        if topic.is_empty() {
            continue;
        }
        if lowered.contains(&topic.to_lowercase()) {
            return Ok(refusal_response(topic));
        }
    }

    for rule in FALLBACK_RULES {
        if rule.triggers.iter().any(|trigger| lowered.contains(trigger)) {
            return Ok(rule.response.to_string());
        }
    }

    Ok(DEFAULT_RESPONSE.to_string())
}
