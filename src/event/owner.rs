//! Event owners and categories

use serde::{Deserialize, Serialize};

/// Kind of event shown on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    /// Main scenario events
    Scenario,
    /// Events of the trained character
    Chara,
    /// Events of a support card
    Support,
}

/// Who an event belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EventOwner {
    Scenario {
        name: String,
    },
    Chara {
        #[serde(default)]
        id: u32,
        name: String,
    },
    Support {
        #[serde(default)]
        id: u32,
        name: String,
    },
}

impl EventOwner {
    pub fn name(&self) -> &str {
        match self {
            EventOwner::Scenario { name }
            | EventOwner::Chara { name, .. }
            | EventOwner::Support { name, .. } => name,
        }
    }

    pub fn category(&self) -> EventCategory {
        match self {
            EventOwner::Scenario { .. } => EventCategory::Scenario,
            EventOwner::Chara { .. } => EventCategory::Chara,
            EventOwner::Support { .. } => EventCategory::Support,
        }
    }

    /// Whether an event of this owner can appear under `category`.
    pub fn is_compatible(&self, category: EventCategory) -> bool {
        self.category() == category
    }

    /// Whether this owner is the one identified on screen.
    ///
    /// Scenario events carry no owner icon, so any two scenario owners match.
    pub fn matches(&self, other: &EventOwner) -> bool {
        match (self, other) {
            (EventOwner::Scenario { .. }, EventOwner::Scenario { .. }) => true,
            (EventOwner::Chara { name: a, .. }, EventOwner::Chara { name: b, .. }) => a == b,
            (EventOwner::Support { name: a, .. }, EventOwner::Support { name: b, .. }) => a == b,
            _ => false,
        }
    }
}
