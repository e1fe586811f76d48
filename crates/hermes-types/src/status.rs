//! Status enums persisted as strings.
//!
//! All of these live in the database as lowercase strings. Values we do
//! not recognize decode to `Unknown` rather than failing the row.

use serde::{Deserialize, Serialize};

/// Subscription lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    /// Subscription is active and usable
    Active,
    /// Subscription passed its expiry date
    Expired,
    /// Subscription was deactivated manually
    Inactive,
    /// Unrecognized value at rest
    #[serde(other)]
    Unknown,
}

impl SubscriptionStatus {
    /// String form stored in the database
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Inactive => "inactive",
            Self::Unknown => "unknown",
        }
    }

    /// Parse from the stored string form; unknown values map to `Unknown`
    pub fn parse(s: &str) -> Self {
        match s {
            "active" => Self::Active,
            "expired" => Self::Expired,
            "inactive" => Self::Inactive,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Campaign template content type. Immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignType {
    /// Plain text body
    Text,
    /// Image with optional caption
    Image,
    #[serde(other)]
    Unknown,
}

impl CampaignType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "text" => Self::Text,
            "image" => Self::Image,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for CampaignType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Campaign template status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Active,
    Inactive,
    Archived,
    #[serde(other)]
    Unknown,
}

impl CampaignStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Archived => "archived",
            Self::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "active" => Self::Active,
            "inactive" => Self::Inactive,
            "archived" => Self::Archived,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bulk campaign execution lifecycle.
///
/// Legal transitions:
/// `pending | scheduled → processing → completed | failed`.
/// A terminal campaign never re-enters `processing`, and `processing`
/// never returns to `scheduled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkCampaignStatus {
    /// Created for immediate dispatch, not yet picked up
    Pending,
    /// Waiting for its scheduled time
    Scheduled,
    /// A dispatcher owns it; must not be deleted
    Processing,
    /// Terminal: at least one item sent, all items terminal
    Completed,
    /// Terminal: nothing sent, or a precondition failed
    Failed,
    #[serde(other)]
    Unknown,
}

impl BulkCampaignStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Scheduled => "scheduled",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "pending" => Self::Pending,
            "scheduled" => Self::Scheduled,
            "processing" => Self::Processing,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Unknown,
        }
    }

    /// Terminal states accept no further transitions
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether a dispatcher may claim the campaign from this state
    pub const fn is_claimable(&self) -> bool {
        matches!(self, Self::Pending | Self::Scheduled)
    }
}

impl std::fmt::Display for BulkCampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-recipient item status within a bulk campaign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkItemStatus {
    Pending,
    Sent,
    Failed,
    #[serde(other)]
    Unknown,
}

impl BulkItemStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "pending" => Self::Pending,
            "sent" => Self::Sent,
            "failed" => Self::Failed,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for BulkItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message delivery progression: `sent < delivered < read`.
///
/// The ordering drives the monotone status update rule for stored
/// messages; a receipt may only ever advance a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Delivered,
    Read,
}

impl DeliveryStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Read => "read",
        }
    }

    /// Parse a receipt/status string. Non-progression values (e.g.
    /// `played`, `received`) return `None` and never regress a message.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sent" => Some(Self::Sent),
            "delivered" => Some(Self::Delivered),
            "read" => Some(Self::Read),
            _ => None,
        }
    }

    /// Numeric priority used for the strict-progression comparison
    pub const fn priority(&self) -> u8 {
        match self {
            Self::Sent => 1,
            Self::Delivered => 2,
            Self::Read => 3,
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_fallback() {
        assert_eq!(SubscriptionStatus::parse("canceled"), SubscriptionStatus::Unknown);
        assert_eq!(BulkCampaignStatus::parse("paused"), BulkCampaignStatus::Unknown);
        assert_eq!(BulkItemStatus::parse(""), BulkItemStatus::Unknown);
    }

    #[test]
    fn test_roundtrip() {
        for status in [
            BulkCampaignStatus::Pending,
            BulkCampaignStatus::Scheduled,
            BulkCampaignStatus::Processing,
            BulkCampaignStatus::Completed,
            BulkCampaignStatus::Failed,
        ] {
            assert_eq!(BulkCampaignStatus::parse(status.as_str()), status);
        }
    }

    #[test]
    fn test_claimable_states() {
        assert!(BulkCampaignStatus::Pending.is_claimable());
        assert!(BulkCampaignStatus::Scheduled.is_claimable());
        assert!(!BulkCampaignStatus::Processing.is_claimable());
        assert!(!BulkCampaignStatus::Completed.is_claimable());
        assert!(!BulkCampaignStatus::Failed.is_claimable());
    }

    #[test]
    fn test_delivery_ordering() {
        assert!(DeliveryStatus::Sent < DeliveryStatus::Delivered);
        assert!(DeliveryStatus::Delivered < DeliveryStatus::Read);
        assert_eq!(DeliveryStatus::parse("played"), None);
    }
}
