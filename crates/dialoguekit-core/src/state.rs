//! UI-agnostic data types
//!
//! These structures are shared between the generation pipeline and whatever
//! front end renders it (TUI, headless CLI) and don't depend on any UI framework.

use serde::{Deserialize, Serialize};
use crate::provider::Provider;
use crate::themes::Theme;

/// One generated dialogue: a theme and its ordered turns ("Name: text")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationItem {
    pub theme: Theme,
    #[serde(rename = "conversation")]
    pub turns: Vec<String>,
}

/// The persona fields a generation run needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaConfig {
    pub participant_name: String,
    pub assistant_name: String,
    pub personality: String,
    pub style_notes: String,
    pub active_themes: Vec<Theme>,
}

/// Immutable view of the settings taken when a run starts
#[derive(Debug, Clone)]
pub struct SettingsSnapshot {
    pub persona: PersonaConfig,
    pub provider: Provider,
    pub credential_present: bool,
}

/// Who spoke a turn, as inferred by the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    Participant,
    Assistant,
}
