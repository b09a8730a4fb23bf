//! Arcadia tools module
//!
//! MCP tool implementations for the zoo animal-care manager. Every tool
//! checks the caller's permission before it touches the store.

pub mod animals;
pub mod feeding;
pub mod habitats;
pub mod health;
pub mod reports;
pub mod status;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::warn;

use crate::access::{AccessError, Caller, Permission};

/// Failure of a tool call
#[derive(Debug, Error)]
pub enum ToolError {
    #[error(transparent)]
    Denied(#[from] AccessError),

    #[error("{0}")]
    Failed(String),
}

impl From<String> for ToolError {
    fn from(message: String) -> Self {
        ToolError::Failed(message)
    }
}

impl From<&str> for ToolError {
    fn from(message: &str) -> Self {
        ToolError::Failed(message.to_string())
    }
}

pub type ToolResult<T> = Result<T, ToolError>;

/// Check a permission, logging denials
pub(crate) fn authorize(caller: &Caller, permission: Permission) -> ToolResult<()> {
    caller.require(permission).map_err(|e| {
        warn!(role = caller.role.as_str(), permission = permission.as_str(), "Access denied");
        ToolError::Denied(e)
    })
}

/// Check a permission and return the caller's user id
pub(crate) fn authorize_identified(caller: &Caller, permission: Permission) -> ToolResult<i64> {
    caller.require_identified(permission).map_err(|e| {
        warn!(role = caller.role.as_str(), permission = permission.as_str(), "Access denied: {}", e);
        ToolError::Denied(e)
    })
}

/// Validate a YYYY-MM-DD date string
pub(crate) fn parse_date(field: &str, value: &str) -> ToolResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| ToolError::Failed(format!("Invalid {}: '{}' (expected YYYY-MM-DD)", field, value)))
}
