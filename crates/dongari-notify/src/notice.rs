//! Notice data model — what gets delivered, and to whom.

use dongari_core::error::{DongariError, Result};
use serde::{Deserialize, Serialize};

use crate::trigger::Trigger;

/// Club part a member belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Part {
    Design,
    Art,
    Programming,
}

impl Part {
    pub fn as_str(&self) -> &'static str {
        match self {
            Part::Design => "design",
            Part::Art => "art",
            Part::Programming => "programming",
        }
    }
}

/// What kind of notice this is. Determines the broadcast topic (if any)
/// and how the recipient set is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeCategory {
    Design,
    Art,
    Programming,
    Regular,
    Cleaning,
    MonthlyFee,
    Etc,
}

impl NoticeCategory {
    /// Storage representation. The closed enum lives here; the string
    /// form exists only at the store boundary.
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeCategory::Design => "design",
            NoticeCategory::Art => "art",
            NoticeCategory::Programming => "programming",
            NoticeCategory::Regular => "regular",
            NoticeCategory::Cleaning => "cleaning",
            NoticeCategory::MonthlyFee => "monthly_fee",
            NoticeCategory::Etc => "etc",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "design" => Some(NoticeCategory::Design),
            "art" => Some(NoticeCategory::Art),
            "programming" => Some(NoticeCategory::Programming),
            "regular" => Some(NoticeCategory::Regular),
            "cleaning" => Some(NoticeCategory::Cleaning),
            "monthly_fee" => Some(NoticeCategory::MonthlyFee),
            "etc" => Some(NoticeCategory::Etc),
            _ => None,
        }
    }

    /// Push title rendered for this category.
    pub fn title(&self) -> &'static str {
        match self {
            NoticeCategory::Design
            | NoticeCategory::Art
            | NoticeCategory::Programming
            | NoticeCategory::Regular => "회의 알림",
            NoticeCategory::Cleaning => "청소 알림",
            NoticeCategory::MonthlyFee => "회비 알림",
            NoticeCategory::Etc => "알림",
        }
    }

    /// FCM broadcast topic for meeting notices. Cleaning/fee/etc notices
    /// go to explicit device tokens instead.
    pub fn topic(&self) -> Option<&'static str> {
        match self {
            NoticeCategory::Design => Some("design"),
            NoticeCategory::Art => Some("art"),
            NoticeCategory::Programming => Some("programming"),
            NoticeCategory::Regular => Some("regular"),
            _ => None,
        }
    }

    /// How the member audience for this category is resolved.
    /// Resolution happens at schedule/reload time, not at spec creation,
    /// because membership changes between recurring fires.
    pub fn member_filter(&self, stored_members: &[String]) -> MemberFilter {
        match self {
            NoticeCategory::Regular => MemberFilter::AllActive,
            NoticeCategory::Design => MemberFilter::ActivePart(Part::Design),
            NoticeCategory::Art => MemberFilter::ActivePart(Part::Art),
            NoticeCategory::Programming => MemberFilter::ActivePart(Part::Programming),
            _ => MemberFilter::Explicit(stored_members.to_vec()),
        }
    }
}

/// Which members a notice targets.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberFilter {
    /// Every member currently active (not on leave, not withdrawn).
    AllActive,
    /// Active members of one part.
    ActivePart(Part),
    /// A hand-picked member list stored with the notice.
    Explicit(Vec<String>),
}

/// Resolved delivery target for a notice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RecipientSet {
    /// Broadcast topic. `members` carries the member ids the broadcast
    /// targets, for delivery-receipt bookkeeping only — FCM itself fans
    /// out by topic subscription.
    Topic { name: String, members: Vec<String> },
    /// Explicit device tokens.
    Tokens(Vec<String>),
}

/// Rendered notice content plus its resolved recipients — everything the
/// fire path needs, nothing the CRUD layer owns.
#[derive(Debug, Clone, PartialEq)]
pub struct NoticePayload {
    pub title: String,
    pub body: String,
    pub recipients: RecipientSet,
}

impl NoticePayload {
    pub fn new(title: &str, body: &str, recipients: RecipientSet) -> Self {
        Self {
            title: title.to_string(),
            body: body.to_string(),
            recipients,
        }
    }

    /// Reject malformed payloads before anything is armed.
    pub fn validate(&self) -> Result<()> {
        match &self.recipients {
            RecipientSet::Topic { name, .. } if name.is_empty() => Err(
                DongariError::InvalidSpec("topic name must not be empty".into()),
            ),
            RecipientSet::Tokens(tokens) if tokens.is_empty() => Err(
                DongariError::InvalidSpec("token recipient set must not be empty".into()),
            ),
            _ => Ok(()),
        }
    }
}

/// A notification spec as read from the durable store. Owned by the CRUD
/// layer; this core only reads it at boot and appends delivery receipts.
#[derive(Debug, Clone)]
pub struct Notice {
    pub id: i64,
    pub category: NoticeCategory,
    pub trigger: Trigger,
    pub message: String,
    pub memo: String,
    /// Member ids stored with the notice (the hand-picked list for
    /// non-meeting categories).
    pub members: Vec<String>,
}
