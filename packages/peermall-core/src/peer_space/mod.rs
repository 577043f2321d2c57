//! # Peer Spaces
//!
//! A peer space is a tenant's storefront: the page their content hangs
//! off. It is keyed by its `address`.
//!
//! ## Record Shape
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          PEER SPACE                                     │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  address          primary key, unique, non-empty                       │
//! │  title / description / owner / ownerPeerId (indexed: by_owner)        │
//! │  followers        u64, follow / unfollow (saturates at 0)             │
//! │  recommendations  u64, recommend                                      │
//! │  badges           set of badge ids, no duplicates                     │
//! │  sections         ordered list of SectionType                         │
//! │  settings         hiddenSections, sectionOrder, theme, visibility     │
//! │  createdAt / updatedAt                                                 │
//! │                                                                         │
//! │  Deleting a peer space deletes its contents in the same transaction.  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod service;

pub use service::PeerSpaceService;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::time::Timestamp;

/// Maximum length of a peer space address
pub const MAX_ADDRESS_LENGTH: usize = 128;

/// Maximum length of a peer space title
pub const MAX_TITLE_LENGTH: usize = 200;

/// A section a peer space page can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionType {
    /// Banner and headline
    Hero,
    /// Owner introduction
    About,
    /// Product listings
    Products,
    /// Service offerings
    Services,
    /// Portfolio pieces
    Portfolio,
    /// Upcoming events
    Events,
    /// Posts and articles
    Posts,
    /// Reviews left by visitors
    Reviews,
    /// Open quests
    Quests,
    /// Links to external resources
    Resources,
    /// Community boards
    Community,
    /// Contact details
    Contact,
}

impl SectionType {
    /// Sections a new peer space starts with.
    pub fn defaults() -> Vec<SectionType> {
        vec![
            SectionType::Hero,
            SectionType::About,
            SectionType::Products,
            SectionType::Posts,
            SectionType::Contact,
        ]
    }
}

/// Who can see a peer space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Listed and visible to everyone
    #[default]
    Public,
    /// Reachable by address but not listed
    Unlisted,
    /// Owner only
    Private,
}

/// Page layout and presentation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerSpaceSettings {
    /// Sections that exist but are not shown
    #[serde(default)]
    pub hidden_sections: Vec<SectionType>,
    /// Display order, overriding `sections` when non-empty
    #[serde(default)]
    pub section_order: Vec<SectionType>,
    /// Theme name
    #[serde(default = "default_theme")]
    pub theme: String,
    /// Visibility
    #[serde(default)]
    pub visibility: Visibility,
}

fn default_theme() -> String {
    "default".to_string()
}

impl Default for PeerSpaceSettings {
    fn default() -> Self {
        Self {
            hidden_sections: Vec::new(),
            section_order: Vec::new(),
            theme: default_theme(),
            visibility: Visibility::default(),
        }
    }
}

/// A stored peer space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerSpace {
    /// Primary key
    pub address: String,
    /// Display title
    #[serde(default)]
    pub title: String,
    /// Longer description
    #[serde(default)]
    pub description: String,
    /// Peer id of the owner (indexed)
    #[serde(default)]
    pub owner_peer_id: String,
    /// Owner display name
    #[serde(default)]
    pub owner: String,
    /// Follower count
    #[serde(default)]
    pub followers: u64,
    /// Recommendation count
    #[serde(default)]
    pub recommendations: u64,
    /// Badge ids, no duplicates
    #[serde(default)]
    pub badges: Vec<String>,
    /// Sections in page order
    #[serde(default)]
    pub sections: Vec<SectionType>,
    /// Presentation settings
    #[serde(default)]
    pub settings: PeerSpaceSettings,
    /// Creation time
    #[serde(with = "crate::time::iso")]
    pub created_at: Timestamp,
    /// Last modification time
    #[serde(with = "crate::time::iso")]
    pub updated_at: Timestamp,
}

impl PeerSpace {
    /// Check the record before it is written.
    pub fn validate(&self) -> Result<()> {
        let address = self.address.trim();
        if address.is_empty() {
            return Err(Error::InvalidRecord("peer space address is required".into()));
        }
        if address != self.address || self.address.chars().any(char::is_whitespace) {
            return Err(Error::InvalidRecord(format!(
                "peer space address '{}' must not contain whitespace",
                self.address
            )));
        }
        if self.address.len() > MAX_ADDRESS_LENGTH {
            return Err(Error::InvalidRecord(format!(
                "peer space address too long: max {} characters",
                MAX_ADDRESS_LENGTH
            )));
        }
        if self.title.chars().count() > MAX_TITLE_LENGTH {
            return Err(Error::InvalidRecord(format!(
                "peer space title too long: max {} characters",
                MAX_TITLE_LENGTH
            )));
        }
        if let Some(badge) = first_duplicate(&self.badges) {
            return Err(Error::InvalidRecord(format!("duplicate badge '{badge}'")));
        }
        if self.badges.iter().any(|b| b.trim().is_empty()) {
            return Err(Error::InvalidRecord("badge ids must not be empty".into()));
        }
        Ok(())
    }

    /// Sections in the order they should be displayed, hidden ones removed.
    pub fn visible_sections(&self) -> Vec<SectionType> {
        let order = if self.settings.section_order.is_empty() {
            &self.sections
        } else {
            &self.settings.section_order
        };
        order
            .iter()
            .copied()
            .filter(|s| !self.settings.hidden_sections.contains(s))
            .collect()
    }
}

/// Input for [`PeerSpaceService::create_peer_space`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewPeerSpace {
    /// Address (required)
    pub address: String,
    /// Display title
    pub title: String,
    /// Longer description
    pub description: String,
    /// Peer id of the owner
    pub owner_peer_id: String,
    /// Owner display name
    pub owner: String,
    /// Starting follower count
    pub followers: u64,
    /// Starting recommendation count
    pub recommendations: u64,
    /// Initial badges (duplicates are dropped)
    pub badges: Vec<String>,
    /// Sections; [`SectionType::defaults`] when empty
    pub sections: Vec<SectionType>,
    /// Settings; defaults when absent
    pub settings: Option<PeerSpaceSettings>,
}

impl NewPeerSpace {
    /// A peer space with just an address and title.
    pub fn new(address: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    /// Set the owner.
    pub fn owned_by(mut self, owner_peer_id: impl Into<String>, owner: impl Into<String>) -> Self {
        self.owner_peer_id = owner_peer_id.into();
        self.owner = owner.into();
        self
    }

    pub(crate) fn into_record(self, now: Timestamp) -> PeerSpace {
        PeerSpace {
            address: self.address,
            title: self.title,
            description: self.description,
            owner_peer_id: self.owner_peer_id,
            owner: self.owner,
            followers: self.followers,
            recommendations: self.recommendations,
            badges: dedupe(self.badges),
            sections: if self.sections.is_empty() {
                SectionType::defaults()
            } else {
                self.sections
            },
            settings: self.settings.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for a peer space. `None` leaves a field alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PeerSpaceUpdate {
    /// New title
    pub title: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New owner display name
    pub owner: Option<String>,
    /// New owner peer id
    pub owner_peer_id: Option<String>,
    /// Replacement section list
    pub sections: Option<Vec<SectionType>>,
    /// Replacement badge set
    pub badges: Option<Vec<String>>,
}

impl PeerSpaceUpdate {
    pub(crate) fn apply(self, space: &mut PeerSpace) {
        if let Some(title) = self.title {
            space.title = title;
        }
        if let Some(description) = self.description {
            space.description = description;
        }
        if let Some(owner) = self.owner {
            space.owner = owner;
        }
        if let Some(owner_peer_id) = self.owner_peer_id {
            space.owner_peer_id = owner_peer_id;
        }
        if let Some(sections) = self.sections {
            space.sections = sections;
        }
        if let Some(badges) = self.badges {
            space.badges = dedupe(badges);
        }
    }
}

/// Partial update for [`PeerSpaceSettings`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsUpdate {
    /// Replacement hidden-section list
    pub hidden_sections: Option<Vec<SectionType>>,
    /// Replacement section order
    pub section_order: Option<Vec<SectionType>>,
    /// New theme
    pub theme: Option<String>,
    /// New visibility
    pub visibility: Option<Visibility>,
}

impl SettingsUpdate {
    pub(crate) fn apply(self, settings: &mut PeerSpaceSettings) {
        if let Some(hidden) = self.hidden_sections {
            settings.hidden_sections = hidden;
        }
        if let Some(order) = self.section_order {
            settings.section_order = order;
        }
        if let Some(theme) = self.theme {
            settings.theme = theme;
        }
        if let Some(visibility) = self.visibility {
            settings.visibility = visibility;
        }
    }
}

/// Drop repeated entries, keeping the first occurrence of each.
pub(crate) fn dedupe(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

fn first_duplicate(items: &[String]) -> Option<&str> {
    items
        .iter()
        .enumerate()
        .find(|&(i, item)| items[..i].contains(item))
        .map(|(_, item)| item.as_str())
}
