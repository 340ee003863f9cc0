//! Shared identifiers and small value types used across every crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque tenant identifier. Compared only by equality — never parsed as a
/// UUID or a slug; some tenants predate the UUID convention (legacy slugs
/// like `org_soulsyncs` are valid and must keep working).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrganizationId(pub String);

impl OrganizationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrganizationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrganizationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrganizationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique identifier for a user (UUIDv7 — time-sortable for easier log correlation).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A room/conversation identifier, scoped to a tenant. The room concept is
/// transport-defined (a chat thread, a channel, a DM) — the core treats it
/// as an opaque grouping key for state and recent-turn lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Ephemeral, non-time-sortable identifier for things where ordering doesn't
/// matter (proactive trigger IDs, webhook receipts).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// User role hierarchy: admin > user > child.
///
/// Controls which permissions are available without a DB lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    #[default]
    User,
    Child,
}

impl UserRole {
    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    pub fn is_child(&self) -> bool {
        matches!(self, UserRole::Child)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Admin => write!(f, "admin"),
            UserRole::User => write!(f, "user"),
            UserRole::Child => write!(f, "child"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "admin" => Ok(UserRole::Admin),
            "user" => Ok(UserRole::User),
            "child" => Ok(UserRole::Child),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Risk level attached to a capability or a decision — drives the
/// authorization gate's enforcement action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    /// Reserved for safety-pattern overrides (e.g. distress detection) —
    /// always forces `FORCE_LISTENING` regardless of the matched capability.
    Critical,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}

/// Access classification of a knowledge chunk.
///
/// Ordered loosely least-to-most sensitive; the knowledge filter grammar
/// compares by equality/set-membership only, never by order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Public,
    Internal,
    Confidential,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Classification::Public => "public",
            Classification::Internal => "internal",
            Classification::Confidential => "confidential",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Classification {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "public" => Ok(Classification::Public),
            "internal" => Ok(Classification::Internal),
            "confidential" => Ok(Classification::Confidential),
            other => Err(format!("unknown classification: {}", other)),
        }
    }
}

/// A unit of retrievable text with classification and quality metadata.
/// The vector itself lives in the vector store; this is the durable-store
/// side of the join knowledge retrieval performs after a vector query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    pub chunk_id: String,
    pub document_id: String,
    pub version: u32,
    pub content: String,
    pub classification: Classification,
    pub department_id: Option<String>,
    pub category: String,
    pub page: Option<u32>,
    pub quality_score: f32,
}

impl KnowledgeChunk {
    /// Idempotency key: `{tenant}_{document}_v{version}_chunk{index}`.
    pub fn idempotency_key(tenant: &str, document_id: &str, version: u32, index: usize) -> String {
        format!("{tenant}_{document_id}_v{version}_chunk{index}")
    }
}

/// A PII-safe long-term memory record about "what happened". The body of
/// user content is never stored here — only factual meta, and `summary` is
/// capped at 200 chars by the writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub episode_id: String,
    pub organization_id: OrganizationId,
    pub user_id: Option<String>,
    pub episode_type: String,
    pub summary: String,
    pub entities: Vec<String>,
    pub keywords: Vec<String>,
    pub importance: f32,
    pub created_at: String,
}

pub const EPISODE_SUMMARY_MAX_CHARS: usize = 200;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knowledge_chunk_idempotency_key_matches_expected_format() {
        let key = KnowledgeChunk::idempotency_key("org_a", "doc_7", 3, 12);
        assert_eq!(key, "org_a_doc_7_v3_chunk12");
    }

    #[test]
    fn organization_id_equality_is_literal() {
        let a = OrganizationId::new("org_soulsyncs");
        let b = OrganizationId::new("org_soulsyncs");
        let c = OrganizationId::new("org-soulsyncs");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn user_role_round_trips_through_display_and_from_str() {
        for role in [UserRole::Admin, UserRole::User, UserRole::Child] {
            let s = role.to_string();
            assert_eq!(s.parse::<UserRole>().unwrap(), role);
        }
    }

    #[test]
    fn risk_level_orders_low_to_high() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
    }
}
