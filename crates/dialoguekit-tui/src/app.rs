use std::path::PathBuf;
use std::sync::Arc;
use ratatui::widgets::ListState;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use dialoguekit_core::export::write_dataset;
use dialoguekit_core::{
    AdapterConfig, ConversationItem, LlmAdapter, Orchestrator, RunNotice, RunProgress, RunReport,
    Settings, Theme,
};
use crate::tui::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Intro,
    Generator,
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsPane {
    Fields,
    Themes,
}

/// Rows of the settings form, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    ParticipantName,
    AssistantName,
    Personality,
    StyleNotes,
    Provider,
    Model,
    ApiKey,
}

impl SettingsField {
    pub const ALL: [SettingsField; 7] = [
        SettingsField::ParticipantName,
        SettingsField::AssistantName,
        SettingsField::Personality,
        SettingsField::StyleNotes,
        SettingsField::Provider,
        SettingsField::Model,
        SettingsField::ApiKey,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SettingsField::ParticipantName => "Your name",
            SettingsField::AssistantName => "Assistant name",
            SettingsField::Personality => "Personality",
            SettingsField::StyleNotes => "Style notes",
            SettingsField::Provider => "Provider",
            SettingsField::Model => "Model",
            SettingsField::ApiKey => "API key",
        }
    }

    /// Fields edited as free text (Provider is cycled instead)
    pub fn is_text(&self) -> bool {
        !matches!(self, SettingsField::Provider)
    }
}

type SharedOrchestrator = Arc<Orchestrator<LlmAdapter>>;

pub struct App {
    // Core state
    pub should_quit: bool,
    pub screen: Screen,
    pub input_mode: InputMode,
    pub settings: Settings,
    pub export_dir: PathBuf,

    // Generation state
    pub target_total: usize,
    pub items: Vec<ConversationItem>,
    pub generated_count: usize,
    pub is_loading: bool,
    pub notice: Option<RunNotice>,
    pub status_message: Option<String>,
    pub run_task: Option<JoinHandle<RunReport>>,
    pub preview_scroll: u16,

    // One adapter (and so one LLM client) per connection config
    orchestrator: Option<(AdapterConfig, SharedOrchestrator)>,

    // Settings form state
    pub settings_pane: SettingsPane,
    pub field_state: ListState,
    pub theme_state: ListState,
    pub edit_buffer: String,
    pub edit_cursor: usize,

    // Animation state
    pub animation_frame: u8,
}

impl App {
    pub fn new(settings: Settings, target_total: usize, export_dir: PathBuf) -> Self {
        let mut field_state = ListState::default();
        field_state.select(Some(0));
        let mut theme_state = ListState::default();
        theme_state.select(Some(0));

        Self {
            should_quit: false,
            screen: Screen::Intro,
            input_mode: InputMode::Normal,
            settings,
            export_dir,

            target_total,
            items: Vec::new(),
            generated_count: 0,
            is_loading: false,
            notice: None,
            status_message: None,
            run_task: None,
            preview_scroll: 0,

            orchestrator: None,

            settings_pane: SettingsPane::Fields,
            field_state,
            theme_state,
            edit_buffer: String::new(),
            edit_cursor: 0,

            animation_frame: 0,
        }
    }

    fn orchestrator(&mut self) -> SharedOrchestrator {
        let config = self.settings.adapter_config();
        match &self.orchestrator {
            Some((current, orchestrator)) if *current == config => orchestrator.clone(),
            _ => {
                let orchestrator = Arc::new(Orchestrator::new(
                    LlmAdapter::new(config.clone()),
                    self.target_total,
                ));
                self.orchestrator = Some((config, orchestrator.clone()));
                orchestrator
            }
        }
    }

    /// Start a generation run in the background; ignored while one is active
    pub fn start_generation(&mut self, events: UnboundedSender<AppEvent>) {
        if self.is_loading || self.run_task.is_some() {
            return;
        }

        self.status_message = None;
        let snapshot = self.settings.snapshot();
        if let Err(err) = Orchestrator::<LlmAdapter>::check_preconditions(&snapshot) {
            self.notice = Some(RunNotice::Precondition(err));
            return;
        }

        self.items.clear();
        self.generated_count = 0;
        self.notice = None;
        self.preview_scroll = 0;
        self.is_loading = true;

        let orchestrator = self.orchestrator();
        info!(
            themes = snapshot.persona.active_themes.len(),
            target = orchestrator.target_total(),
            "generation requested from TUI"
        );
        self.run_task = Some(tokio::spawn(async move {
            orchestrator
                .run(snapshot, move |progress| {
                    let _ = events.send(AppEvent::Progress(progress));
                })
                .await
        }));
    }

    /// Absorb an incremental update from the running task
    pub fn apply_progress(&mut self, progress: RunProgress) {
        if !self.is_loading {
            return;
        }
        let room = self.target_total.saturating_sub(self.items.len());
        self.items.extend(progress.added.into_iter().take(room));
        self.generated_count = progress.count;
    }

    /// Collect the finished run, if any
    pub async fn poll_run(&mut self) {
        let finished = self.run_task.as_ref().map_or(false, |task| task.is_finished());
        if !finished {
            return;
        }
        let Some(task) = self.run_task.take() else {
            return;
        };

        self.is_loading = false;
        match task.await {
            Ok(report) => {
                self.generated_count = report.count();
                self.notice = report.notice;
                self.items = report.items;
            }
            Err(err) => {
                warn!(error = %err, "generation task failed");
                self.status_message = Some(format!("Generation task failed: {err}"));
            }
        }
    }

    /// Write the accumulated items next to the working directory
    pub fn download(&mut self) {
        if self.is_loading {
            return;
        }
        if self.items.is_empty() {
            self.status_message = Some("No conversations generated yet to download.".to_string());
            return;
        }
        match write_dataset(&self.export_dir, &self.settings.assistant_name, &self.items) {
            Ok(path) => self.status_message = Some(format!("Saved {}", path.display())),
            Err(err) => {
                warn!(error = %err, "dataset export failed");
                self.status_message = Some(format!("Export failed: {err:#}"));
            }
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_loading {
            self.animation_frame = (self.animation_frame + 1) % 4;
        }
    }

    // Preview scrolling
    pub fn scroll_preview_down(&mut self) {
        self.preview_scroll = self.preview_scroll.saturating_add(1);
    }

    pub fn scroll_preview_up(&mut self) {
        self.preview_scroll = self.preview_scroll.saturating_sub(1);
    }

    // Settings form
    pub fn selected_field(&self) -> SettingsField {
        let i = self.field_state.selected().unwrap_or(0);
        SettingsField::ALL[i.min(SettingsField::ALL.len() - 1)]
    }

    pub fn field_nav_down(&mut self) {
        let i = self.field_state.selected().unwrap_or(0);
        self.field_state.select(Some((i + 1).min(SettingsField::ALL.len() - 1)));
    }

    pub fn field_nav_up(&mut self) {
        let i = self.field_state.selected().unwrap_or(0);
        self.field_state.select(Some(i.saturating_sub(1)));
    }

    pub fn theme_nav_down(&mut self) {
        let len = Theme::catalog().len();
        let i = self.theme_state.selected().unwrap_or(0);
        self.theme_state.select(Some((i + 1).min(len - 1)));
    }

    pub fn theme_nav_up(&mut self) {
        let i = self.theme_state.selected().unwrap_or(0);
        self.theme_state.select(Some(i.saturating_sub(1)));
    }

    pub fn toggle_selected_theme(&mut self) {
        if let Some(theme) = self.theme_state.selected().and_then(|i| Theme::catalog().get(i).cloned()) {
            self.settings.toggle_theme(&theme);
            self.persist_settings();
        }
    }

    pub fn set_all_themes(&mut self, enabled: bool) {
        self.settings.set_all_themes(enabled);
        self.persist_settings();
    }

    pub fn reset_settings(&mut self) {
        self.settings.reset();
        self.persist_settings();
        self.status_message = Some("Settings reset to defaults".to_string());
    }

    pub fn cycle_provider(&mut self) {
        self.settings.provider = self.settings.provider.next();
        self.settings.model = None;
        self.persist_settings();
    }

    /// Current text of a field, as the editor should start with it
    pub fn field_value(&self, field: SettingsField) -> String {
        match field {
            SettingsField::ParticipantName => self.settings.participant_name.clone(),
            SettingsField::AssistantName => self.settings.assistant_name.clone(),
            SettingsField::Personality => self.settings.personality.clone(),
            SettingsField::StyleNotes => self.settings.style_notes.clone(),
            SettingsField::Provider => self.settings.provider.display_name().to_string(),
            SettingsField::Model => self.settings.model(),
            SettingsField::ApiKey => String::new(),
        }
    }

    pub fn begin_edit(&mut self) {
        let field = self.selected_field();
        if !field.is_text() {
            self.cycle_provider();
            return;
        }
        if field == SettingsField::ApiKey && !self.settings.provider.requires_api_key() {
            self.status_message = Some(format!("{} does not need an API key", self.settings.provider));
            return;
        }
        self.edit_buffer = self.field_value(field);
        self.edit_cursor = self.edit_buffer.chars().count();
        self.input_mode = InputMode::Editing;
    }

    pub fn cancel_edit(&mut self) {
        self.edit_buffer.clear();
        self.edit_cursor = 0;
        self.input_mode = InputMode::Normal;
    }

    pub fn commit_edit(&mut self) {
        let value = std::mem::take(&mut self.edit_buffer);
        match self.selected_field() {
            SettingsField::ParticipantName => self.settings.participant_name = non_blank(value, "User"),
            SettingsField::AssistantName => self.settings.assistant_name = non_blank(value, "IRIS"),
            SettingsField::Personality => self.settings.personality = value,
            SettingsField::StyleNotes => self.settings.style_notes = value,
            SettingsField::Model => {
                let value = value.trim().to_string();
                self.settings.model = Some(value).filter(|m| !m.is_empty());
            }
            SettingsField::ApiKey => self.settings.set_api_key(&value),
            SettingsField::Provider => {}
        }
        self.edit_cursor = 0;
        self.input_mode = InputMode::Normal;
        self.persist_settings();
    }

    fn persist_settings(&mut self) {
        if let Err(err) = self.settings.save() {
            warn!(error = %err, "could not save settings");
            self.status_message = Some(format!("Could not save settings: {err}"));
        }
    }
}

fn non_blank(value: String, fallback: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}
