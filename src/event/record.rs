//! Reference event records

use std::fmt;

use serde::{Deserialize, Serialize};

use super::normalize::reference_title_key;
use super::owner::EventOwner;

/// One selectable answer of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventChoice {
    pub name: String,
    /// Effect text, lines separated by `[br]` or `<hr>`
    pub message: String,
}

impl EventChoice {
    /// Join the message lines with `separator`.
    pub fn format_message(&self, separator: &str) -> String {
        self.message
            .split("[br]")
            .flat_map(|part| part.split("<hr>"))
            .collect::<Vec<_>>()
            .join(separator)
    }
}

impl fmt::Display for EventChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "- {}\n  {}", self.name, self.format_message("\n  "))
    }
}

/// An event of the reference dataset.
///
/// `normalized_title` is always derived from `title`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawEventRecord", into = "RawEventRecord")]
pub struct EventRecord {
    title: String,
    normalized_title: String,
    owner: EventOwner,
    title_kana: String,
    choices: Vec<EventChoice>,
}

impl EventRecord {
    pub fn new(
        title: impl Into<String>,
        owner: EventOwner,
        title_kana: impl Into<String>,
        choices: Vec<EventChoice>,
    ) -> Self {
        let title = title.into();
        Self {
            normalized_title: reference_title_key(&title),
            title,
            owner,
            title_kana: title_kana.into(),
            choices,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.normalized_title = reference_title_key(&self.title);
    }

    pub fn normalized_title(&self) -> &str {
        &self.normalized_title
    }

    pub fn owner(&self) -> &EventOwner {
        &self.owner
    }

    pub fn title_kana(&self) -> &str {
        &self.title_kana
    }

    pub fn choices(&self) -> &[EventChoice] {
        &self.choices
    }
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)?;
        for choice in &self.choices {
            write!(f, "\n{choice}")?;
        }
        Ok(())
    }
}

/// Serialized form of [`EventRecord`].
#[derive(Clone, Serialize, Deserialize)]
struct RawEventRecord {
    title: String,
    owner: EventOwner,
    #[serde(default)]
    title_kana: String,
    #[serde(default)]
    choices: Vec<EventChoice>,
}

impl From<RawEventRecord> for EventRecord {
    fn from(raw: RawEventRecord) -> Self {
        EventRecord::new(raw.title, raw.owner, raw.title_kana, raw.choices)
    }
}

impl From<EventRecord> for RawEventRecord {
    fn from(record: EventRecord) -> Self {
        RawEventRecord {
            title: record.title,
            owner: record.owner,
            title_kana: record.title_kana,
            choices: record.choices,
        }
    }
}
