//! Reference dataset
//!
//! The dataset is a single JSON document holding every event plus the icon
//! file names of every character and support card.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::owner::EventOwner;
use super::record::EventRecord;

/// Errors while loading the dataset
#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read dataset: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse dataset: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Support card specialty, as labeled in game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SupportType {
    #[serde(rename = "スピ")]
    Speed,
    #[serde(rename = "スタ")]
    Stamina,
    #[serde(rename = "パワ")]
    Power,
    #[serde(rename = "根性")]
    Guts,
    #[serde(rename = "賢さ")]
    Wisdom,
    #[serde(rename = "友人")]
    Friend,
    #[serde(rename = "グル")]
    Group,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rarity {
    R,
    SR,
    SSR,
}

/// A trainable character and its outfit icons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharaOwnerData {
    #[serde(default)]
    pub id: u32,
    pub name: String,
    /// Icon file names, one per outfit
    pub icon: Vec<String>,
}

impl CharaOwnerData {
    pub fn to_owner(&self) -> EventOwner {
        EventOwner::Chara {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// A support card and its icon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportOwnerData {
    #[serde(default)]
    pub id: u32,
    pub name: String,
    #[serde(rename = "type")]
    pub support_type: SupportType,
    pub icon: String,
    #[serde(default)]
    pub rarity: Option<Rarity>,
}

impl SupportOwnerData {
    pub fn to_owner(&self) -> EventOwner {
        EventOwner::Support {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventOwners {
    #[serde(default)]
    pub chara: Vec<CharaOwnerData>,
    #[serde(default)]
    pub support: Vec<SupportOwnerData>,
}

/// Ordered events plus owner metadata.
///
/// Dataset order is significant: ties are always resolved towards the
/// earlier record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDataset {
    #[serde(alias = "event")]
    events: Arc<[EventRecord]>,
    #[serde(alias = "owner", default)]
    owners: EventOwners,
}

impl EventDataset {
    pub fn new(events: Vec<EventRecord>, owners: EventOwners) -> Self {
        Self {
            events: events.into(),
            owners,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, DataError> {
        let dataset: EventDataset = serde_json::from_str(json)?;
        log::info!(
            "dataset loaded: {} events, {} chara, {} support",
            dataset.events.len(),
            dataset.owners.chara.len(),
            dataset.owners.support.len()
        );
        Ok(dataset)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    /// Shared handle to the events, for searchers.
    pub fn shared_events(&self) -> Arc<[EventRecord]> {
        Arc::clone(&self.events)
    }

    pub fn owners(&self) -> &EventOwners {
        &self.owners
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "events": [
            {"title": "新年の抱負", "owner": {"type": "scenario", "name": "URA"},
             "title_kana": "しんねんのほうふ",
             "choices": [{"name": "上", "message": "体力+20"}]},
            {"title": "お大事に！", "owner": {"type": "support", "id": 30, "name": "ハッピーミーク"},
             "title_kana": "おだいじに", "choices": []}
        ],
        "owners": {
            "chara": [{"id": 1, "name": "スペシャルウィーク", "icon": ["chara_1_a.png", "chara_1_b.png"]}],
            "support": [{"id": 30, "name": "ハッピーミーク", "type": "友人", "icon": "support_30.png", "rarity": "SSR"}]
        }
    }"#;

    #[test]
    fn test_dataset_from_json() {
        let dataset = EventDataset::from_json(SAMPLE).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.events()[1].normalized_title(), "お大事に");

        let owners = dataset.owners();
        assert_eq!(owners.chara[0].icon.len(), 2);
        assert_eq!(owners.support[0].support_type, SupportType::Friend);
        assert_eq!(owners.support[0].rarity, Some(Rarity::SSR));
        assert_eq!(
            owners.support[0].to_owner(),
            EventOwner::Support {
                id: 30,
                name: "ハッピーミーク".to_string()
            }
        );
    }

    #[test]
    fn test_dataset_accepts_singular_keys() {
        let json = r#"{"event": [], "owner": {"chara": [], "support": []}}"#;
        let dataset = EventDataset::from_json(json).unwrap();
        assert!(dataset.is_empty());
    }

    #[test]
    fn test_dataset_rejects_bad_json() {
        assert!(matches!(
            EventDataset::from_json("{\"events\": 3}"),
            Err(DataError::Parse(_))
        ));
        assert!(matches!(
            EventDataset::load("/nonexistent/uma/data.json"),
            Err(DataError::Io(_))
        ));
    }
}
