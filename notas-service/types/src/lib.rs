//! Shared types for the notas service and its RPC clients.

use serde::{Deserialize, Serialize};

// =====================================================
// RPC Request Types
// =====================================================

/// Submit an agent id (RA) or display name to start a login
#[derive(Debug, Serialize, Deserialize)]
pub struct IdentifyRequest {
    pub identifier: String,
}

/// Submit the password for the identified agent
#[derive(Debug, Serialize, Deserialize)]
pub struct PasswordRequest {
    pub password: String,
}

/// Register a new agent
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub ra: String,
    pub nome: String,
    pub password: String,
}

/// Rate a ticket for the logged-in agent
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitTicketRequest {
    pub ticket: String,
    /// Score in 0..=10; wider type so out-of-range values reach validation
    pub score: i64,
}

/// Run a read-only SQL query (admin only)
#[derive(Debug, Serialize, Deserialize)]
pub struct QueryRequest {
    pub sql: String,
}

// =====================================================
// RPC Response Types
// =====================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct RpcResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> RpcResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

/// Newly opened session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionToken {
    pub token: String,
}

// =====================================================
// Session Types
// =====================================================

/// Where a session currently is in the login flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Anonymous,
    PasswordPending,
    Authenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// A user-visible message produced by an interaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMessage {
    pub level: MessageLevel,
    pub text: String,
}

impl UserMessage {
    pub fn new(level: MessageLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }
}

/// Public view of a person (never carries the credential)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonView {
    pub ra: String,
    pub nome: String,
    pub role: String,
}

/// Snapshot of a session returned by every interaction route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    pub stage: Stage,
    #[serde(default)]
    pub user: Option<PersonView>,
    pub show_registration: bool,
    pub messages: Vec<UserMessage>,
    /// Payload specific to the interaction (report, query result)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    Report(AgentReport),
    Query(QueryTable),
}

// =====================================================
// Reporting Types
// =====================================================

/// One row of the per-agent notes table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotesTableRow {
    pub ticket: String,
    pub date: String,
    pub score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotesTable {
    pub columns: Vec<String>,
    pub rows: Vec<NotesTableRow>,
}

/// Bar chart description: one bar per day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAverageChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub days: Vec<String>,
    pub averages: Vec<f64>,
}

/// Everything the dashboard shows for the logged-in agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentReport {
    pub greeting: String,
    pub daily_average: f64,
    pub monthly_average: f64,
    /// Averages rendered with two decimals, ready for display
    pub daily_average_text: String,
    pub monthly_average_text: String,
    pub table: NotesTable,
    #[serde(default)]
    pub chart: Option<DailyAverageChart>,
}

/// Result of an ad-hoc query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
    /// True when rows were cut at the configured limit
    pub truncated: bool,
}

// =====================================================
// Service Status
// =====================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub running: bool,
    pub uptime_secs: u64,
    pub active_sessions: usize,
    pub version: String,
}
