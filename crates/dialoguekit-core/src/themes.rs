//! The fixed catalog of dialogue themes
//!
//! A theme is identified by its literal label. Generation runs walk the
//! active subset in the order the user enabled them, not catalog order.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const THEME_CATALOG: [&str; 19] = [
    "Name & Personality Introduction",
    "Favorite Things (anime, aesthetics, philosophy, etc.)",
    "Compliment + Pep Talk",
    "Fashion Talk",
    "Music Mood Match",
    "Sweet Tooth Suggestions",
    "Heartfelt Encouragement",
    "Shopping Advice",
    "Late Night Vibes",
    "IRIS Roasts Hari",
    "Coding Help with Sass",
    "Gamer Girl Mode Chat",
    "Deep Thought Corner",
    "Morning Motivation",
    "Tech Jargon Translator",
    "Aesthetic Life Tips",
    "Relationship Advice (with sass)",
    "Rainy Day Ramble",
    "IRIS Confessions",
];

/// A topical label controlling the subject of a generated batch
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Theme(String);

impl Theme {
    /// Build a theme from any label, catalog or not
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// Look a label up in the catalog (exact match)
    pub fn from_catalog(label: &str) -> Option<Self> {
        THEME_CATALOG
            .iter()
            .find(|t| **t == label)
            .map(|t| Self::new(*t))
    }

    pub fn catalog() -> Vec<Theme> {
        THEME_CATALOG.iter().map(|t| Theme::new(*t)).collect()
    }

    pub fn is_catalog(&self) -> bool {
        THEME_CATALOG.contains(&self.0.as_str())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Theme {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
