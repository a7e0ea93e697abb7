//! Dataset generation runs
//!
//! A run walks the active themes in order, asks the `DialogueSource` for a
//! quota of conversations per theme, validates each response and
//! accumulates the surviving items until the target total is reached.
//!
//! Calls are strictly sequential. The first hard failure (transport,
//! service, unparseable payload) halts the run and keeps whatever was
//! accumulated before it; there are no retries.

use std::collections::VecDeque;
use tracing::{error, info, warn};
use crate::adapter::{DialogueSource, GenerationRequest};
use crate::error::GenerationError;
use crate::state::{ConversationItem, PersonaConfig, SettingsSnapshot};
use crate::themes::Theme;
use crate::validator::validate_response;

/// Items requested per full run
pub const DEFAULT_TARGET_TOTAL: usize = 200;

/// Per-theme quota: `ceil(target / themes)`, zero when there are no themes
pub fn per_theme_quota(target: usize, theme_count: usize) -> usize {
    if theme_count == 0 {
        0
    } else {
        target.div_ceil(theme_count)
    }
}

/// How many items to ask for next, or `None` to skip the theme
pub fn next_request(quota: usize, target: usize, accumulated: usize) -> Option<usize> {
    let remaining = target.saturating_sub(accumulated);
    Some(quota.min(remaining)).filter(|n| *n > 0)
}

/// The request schedule assuming every theme delivers exactly what it is asked for
pub fn plan_quotas(target: usize, themes: &[Theme]) -> Vec<(Theme, usize)> {
    let quota = per_theme_quota(target, themes.len());
    let mut planned = 0;
    let mut plan = Vec::new();
    for theme in themes {
        if let Some(count) = next_request(quota, target, planned) {
            planned += count;
            plan.push((theme.clone(), count));
        }
    }
    plan
}

/// Why a run ended the way it did; at most one per run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunNotice {
    /// The run never started
    Precondition(GenerationError),
    /// A theme failed hard and the remaining themes were skipped
    Halted { theme: Theme, message: String },
    NoneProduced,
    Partial { achieved: usize, target: usize },
}

impl RunNotice {
    pub fn message(&self) -> String {
        match self {
            RunNotice::Precondition(err) => err.to_string(),
            RunNotice::Halted { theme, message } => {
                format!("Failed for theme {theme}: {message}. Generation stopped.")
            }
            RunNotice::NoneProduced => {
                "No conversations were generated. The model might not have produced any output for the selected themes.".to_string()
            }
            RunNotice::Partial { achieved, target } => format!(
                "Process finished. Generated {achieved}/{target} conversations. Some themes/requests yielded fewer results; check the log for details."
            ),
        }
    }

    /// Hard errors, as opposed to completion summaries
    pub fn is_error(&self) -> bool {
        matches!(self, RunNotice::Precondition(_) | RunNotice::Halted { .. })
    }
}

/// Observable state emitted after each theme batch and once at the end
#[derive(Debug, Clone)]
pub struct RunProgress {
    /// Theme whose batch was just absorbed; `None` for the terminal update
    pub theme: Option<Theme>,
    /// Items added by that batch
    pub added: Vec<ConversationItem>,
    /// Running count, capped at the target
    pub count: usize,
    pub target: usize,
    pub is_active: bool,
}

/// Terminal state of a run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub items: Vec<ConversationItem>,
    pub target: usize,
    pub notice: Option<RunNotice>,
}

impl RunReport {
    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn is_success(&self) -> bool {
        self.notice.is_none()
    }

    /// The single user-facing message for this run, if any
    pub fn message(&self) -> Option<String> {
        self.notice.as_ref().map(RunNotice::message)
    }
}

/// Mutable state owned by one run
#[derive(Debug)]
struct GenerationRun {
    target_total: usize,
    themes_remaining: VecDeque<Theme>,
    accumulated: Vec<ConversationItem>,
    error: Option<RunNotice>,
    is_active: bool,
}

impl GenerationRun {
    fn new(target_total: usize, themes: &[Theme]) -> Self {
        Self {
            target_total,
            themes_remaining: themes.iter().cloned().collect(),
            accumulated: Vec::new(),
            error: None,
            is_active: true,
        }
    }

    fn capped_count(&self) -> usize {
        self.accumulated.len().min(self.target_total)
    }

    /// Truncate to the target and settle the summary notice
    fn finish(mut self) -> RunReport {
        self.accumulated.truncate(self.target_total);
        self.is_active = false;

        let count = self.accumulated.len();
        let notice = match self.error {
            Some(hard) => Some(hard),
            None if count == 0 => Some(RunNotice::NoneProduced),
            None if count < self.target_total => Some(RunNotice::Partial {
                achieved: count,
                target: self.target_total,
            }),
            None => None,
        };

        RunReport {
            items: self.accumulated,
            target: self.target_total,
            notice,
        }
    }
}

pub struct Orchestrator<S> {
    source: S,
    target_total: usize,
}

impl<S: DialogueSource> Orchestrator<S> {
    pub fn new(source: S, target_total: usize) -> Self {
        Self { source, target_total }
    }

    pub fn target_total(&self) -> usize {
        self.target_total
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fail fast before any external call
    pub fn check_preconditions(snapshot: &SettingsSnapshot) -> Result<(), GenerationError> {
        if !snapshot.credential_present {
            return Err(GenerationError::MissingCredential {
                provider: snapshot.provider,
            });
        }
        if snapshot.persona.active_themes.is_empty() {
            return Err(GenerationError::NoActiveThemes);
        }
        Ok(())
    }

    /// Execute one run against `snapshot`, reporting progress after every theme
    pub async fn run<F>(&self, snapshot: SettingsSnapshot, mut on_progress: F) -> RunReport
    where
        F: FnMut(RunProgress),
    {
        if let Err(err) = Self::check_preconditions(&snapshot) {
            warn!(error = %err, "generation not started");
            return RunReport {
                items: Vec::new(),
                target: self.target_total,
                notice: Some(RunNotice::Precondition(err)),
            };
        }

        let persona = snapshot.persona;
        let mut run = GenerationRun::new(self.target_total, &persona.active_themes);
        let quota = per_theme_quota(run.target_total, run.themes_remaining.len());
        info!(
            target = run.target_total,
            themes = run.themes_remaining.len(),
            quota,
            "starting generation run"
        );

        while let Some(theme) = run.themes_remaining.pop_front() {
            if run.accumulated.len() >= run.target_total {
                break;
            }
            let Some(count) = next_request(quota, run.target_total, run.accumulated.len()) else {
                continue;
            };

            match self.generate_theme(&theme, count, &persona).await {
                Ok(items) => {
                    if items.is_empty() {
                        warn!(theme = %theme, "no conversations returned for theme");
                    } else if items.len() < count {
                        warn!(
                            theme = %theme,
                            requested = count,
                            received = items.len(),
                            "theme under-delivered"
                        );
                    }
                    run.accumulated.extend(items.iter().cloned());
                    on_progress(RunProgress {
                        theme: Some(theme),
                        added: items,
                        count: run.capped_count(),
                        target: run.target_total,
                        is_active: run.is_active,
                    });
                }
                Err(err) => {
                    error!(theme = %theme, error = %err, "generation stopped");
                    run.error = Some(RunNotice::Halted {
                        theme,
                        message: err.to_string(),
                    });
                    break;
                }
            }
        }

        let report = run.finish();
        info!(count = report.count(), target = report.target, "generation run finished");
        on_progress(RunProgress {
            theme: None,
            added: Vec::new(),
            count: report.count(),
            target: report.target,
            is_active: false,
        });
        report
    }

    async fn generate_theme(
        &self,
        theme: &Theme,
        count: usize,
        persona: &PersonaConfig,
    ) -> Result<Vec<ConversationItem>, GenerationError> {
        let request = GenerationRequest {
            theme: theme.clone(),
            count,
            persona: persona.clone(),
        };
        let raw = self.source.generate(&request).await?;
        let report = validate_response(&raw, theme, persona)?;
        Ok(report.items)
    }
}
