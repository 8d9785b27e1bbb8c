// Core data structures for the kurator autoposting backend

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One organization's standing instruction to mine a set of Telegram channels
///
/// Owned by external CRUD; the engine only ever stamps `last_active` after a
/// completed cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutopostingConfig {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub enabled: bool,

    /// Polling cadence in hours
    pub period_hours: i64,

    /// Natural-language filter prompt handed to the classifier
    pub filter_prompt: String,

    /// Target category for generated publications
    pub category_id: Uuid,

    /// Channel handles to watch (without the @ prefix)
    pub channels: Vec<String>,

    /// When the last cycle completed; None means never processed
    pub last_active: Option<DateTime<Utc>>,

    /// Whether generated publications need an image
    pub with_image: bool,
}

impl AutopostingConfig {
    /// Polling cadence as a chrono duration
    pub fn period(&self) -> Duration {
        Duration::hours(self.period_hours)
    }

    /// Recency window for candidate posts: `factor` periods back from now
    pub fn lookback(&self, factor: i64) -> Duration {
        Duration::hours(self.period_hours * factor)
    }
}

/// A recent post scraped from a channel
///
/// Transient: produced by the channel processor, consumed within the same
/// cycle, never persisted as its own entity.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelPost {
    /// Channel handle the post came from
    pub channel: String,

    /// Canonical t.me link, the dedup key
    pub link: String,

    /// Message text (may be blank for media-only posts)
    pub text: String,

    /// When the post was published, normalized to UTC
    pub posted_at: DateTime<Utc>,
}

impl ChannelPost {
    /// Posts with no usable text are skipped, not classified
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Classifier verdict for a single post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    /// Whether the post fits the config's filter prompt
    #[serde(alias = "is_suitable")]
    pub suitable: bool,

    /// Human-readable justification from the model
    #[serde(default)]
    pub reason: String,
}

/// Moderation lifecycle of a publication
///
/// The engine creates publications in `Moderation` and force-approves them
/// when the organization has no moderators. All other transitions are driven
/// externally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationStatus {
    Draft,
    Moderation,
    Approved,
    Rejected,
    Published,
}

impl ModerationStatus {
    /// Get string representation (matches the database text column)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Moderation => "moderation",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Published => "published",
        }
    }

    /// Create from string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "moderation" => Some(Self::Moderation),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "published" => Some(Self::Published),
            _ => None,
        }
    }
}

impl std::fmt::Display for ModerationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a publication's source material came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicationSource {
    Telegram,
    Manual,
}

impl PublicationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Telegram => "telegram",
            Self::Manual => "manual",
        }
    }
}

/// Insert payload for a draft publication
#[derive(Debug, Clone)]
pub struct NewPublication {
    pub organization_id: Uuid,
    pub category_id: Uuid,

    /// Original post text the draft was generated from
    pub source_text: String,

    /// Generated publication text
    pub text: String,

    /// Generated image, when the config requires one
    pub image_url: Option<String>,

    pub status: ModerationStatus,
}

/// Employee of an organization, read-only here
///
/// Only the role matters to the engine: it decides whether a fresh draft
/// waits for human moderation or is auto-approved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub role: EmployeeRole,
}

/// Organization role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeRole {
    Owner,
    Moderator,
    Author,
}

impl EmployeeRole {
    /// Owners and moderators both review drafts
    pub fn can_moderate(&self) -> bool {
        matches!(self, Self::Owner | Self::Moderator)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Moderator => "moderator",
            Self::Author => "author",
        }
    }

    /// Create from string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "owner" => Some(Self::Owner),
            "moderator" => Some(Self::Moderator),
            "author" => Some(Self::Author),
            _ => None,
        }
    }
}
