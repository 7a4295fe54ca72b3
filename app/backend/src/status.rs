//! FILENAME: app/backend/src/status.rs
// PURPOSE: Connection status banner text and tone.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionStatus {
    Pending,
    Connected,
    Failed,
    Draft,
    Unknown(String),
}

impl ConnectionStatus {
    /// Reads the status field value. Matching is exact, as stored.
    pub fn parse(value: &str) -> Self {
        match value {
            "Pending" => ConnectionStatus::Pending,
            "Connected" => ConnectionStatus::Connected,
            "Failed" => ConnectionStatus::Failed,
            "Draft" => ConnectionStatus::Draft,
            other => ConnectionStatus::Unknown(other.to_string()),
        }
    }
}

/// Visual weight of the banner; the host maps it to colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatusTone {
    Neutral,
    Success,
    Danger,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBanner {
    pub message: String,
    pub tone: StatusTone,
}

/// Banner for a status value. `None` means the status could not be read.
pub fn status_banner(status: Option<&str>) -> StatusBanner {
    let Some(status) = status else {
        return StatusBanner {
            message: "Unable to load status.".to_string(),
            tone: StatusTone::Neutral,
        };
    };

    let (message, tone) = match ConnectionStatus::parse(status) {
        ConnectionStatus::Pending => ("Awaiting connection...", StatusTone::Neutral),
        ConnectionStatus::Connected => ("Successfully connected.", StatusTone::Success),
        ConnectionStatus::Failed => ("Connection failed. Please try again.", StatusTone::Danger),
        ConnectionStatus::Draft => (
            "The connection is still in draft, please complete the setup!",
            StatusTone::Warning,
        ),
        ConnectionStatus::Unknown(_) => ("Unknown status.", StatusTone::Neutral),
    };
    StatusBanner {
        message: message.to_string(),
        tone,
    }
}
