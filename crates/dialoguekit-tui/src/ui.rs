use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, Paragraph, Wrap},
};
use crate::app::{App, InputMode, Screen, SettingsField, SettingsPane};
use dialoguekit_core::{ConversationItem, Speaker, Theme};

/// Work out who speaks a turn in a rendered card.
///
/// A `Name:` prefix matching either configured name wins; anything else falls back
/// to alternating by position, participant first. Display only: the dataset itself
/// keeps the turn text untouched.
pub fn split_turn<'a>(
    turn: &'a str,
    index: usize,
    participant: &str,
    assistant: &str,
) -> (Speaker, &'a str) {
    if let Some((tag, rest)) = turn.split_once(':') {
        let tag = tag.trim().to_lowercase();
        if tag == assistant.trim().to_lowercase() {
            return (Speaker::Assistant, rest.trim_start());
        }
        if tag == participant.trim().to_lowercase() {
            return (Speaker::Participant, rest.trim_start());
        }
    }

    let speaker = if index % 2 == 0 {
        Speaker::Participant
    } else {
        Speaker::Assistant
    };
    (speaker, turn)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.screen {
        Screen::Intro => render_intro_screen(app, frame, body_area),
        Screen::Generator => render_generator_screen(app, frame, body_area),
        Screen::Settings => render_settings_screen(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);

    if app.input_mode == InputMode::Editing {
        render_field_editor(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let key_status = match app.settings.key_source() {
        Some("env") => "key: env",
        Some("config") => "key: configured",
        Some("local") => "local",
        _ => "needs key",
    };

    let title = Line::from(vec![
        Span::styled(" DialogueKit ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("{} · {} ({}) ", app.settings.provider, app.settings.model(), key_status),
            Style::default().fg(Color::Gray),
        ),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match app.screen {
        Screen::Intro => " INTRO ",
        Screen::Generator => " GENERATE ",
        Screen::Settings => " SETTINGS ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let pairs: Vec<(&str, &str)> = match (app.screen, app.input_mode) {
        (_, InputMode::Editing) => {
            let mut pairs = vec![(" Enter ", " save "), (" Esc ", " cancel ")];
            if matches!(
                app.selected_field(),
                SettingsField::Personality | SettingsField::StyleNotes
            ) {
                pairs.push((" ^N ", " newline "));
            }
            pairs
        }
        (Screen::Intro, _) => vec![(" Enter ", " start "), (" s ", " settings "), (" q ", " quit ")],
        (Screen::Generator, _) => vec![
            (" g ", " generate "),
            (" d ", " download "),
            (" j/k ", " scroll "),
            (" s ", " settings "),
            (" q ", " quit "),
        ],
        (Screen::Settings, _) => {
            let mut pairs = vec![(" Tab ", " pane "), (" j/k ", " nav ")];
            match app.settings_pane {
                SettingsPane::Fields => pairs.push((" Enter ", " edit ")),
                SettingsPane::Themes => pairs.extend([
                    (" Space ", " toggle "),
                    (" a ", " all "),
                    (" n ", " none "),
                ]),
            }
            pairs.extend([(" R ", " reset "), (" Esc ", " back ")]);
            pairs
        }
    };

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    for (key, label) in pairs {
        spans.push(Span::styled(key, key_style));
        spans.push(Span::styled(label, label_style));
    }

    if let Some(message) = &app.status_message {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(message.clone(), Style::default().fg(Color::Yellow)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_intro_screen(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Welcome ");

    let accent = Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD);
    let lines = vec![
        Line::default(),
        Line::from(Span::styled("Persona dialogue dataset generator", accent)),
        Line::default(),
        Line::from(format!(
            "Generates up to {} short conversations between {} and {}, spread across {} active themes.",
            app.target_total,
            app.settings.participant_name,
            app.settings.assistant_name,
            app.settings.active_themes.len(),
        )),
        Line::from("Every batch is checked and cleaned before it joins the dataset."),
        Line::default(),
        Line::from(Span::styled(
            "Press Enter to open the generator, or s to adjust the persona first.",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let paragraph = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn render_generator_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [status_area, preview_area] = Layout::vertical([
        Constraint::Length(5),
        Constraint::Min(0),
    ])
    .areas(area);

    render_run_status(app, frame, status_area);
    render_preview(app, frame, preview_area);
}

fn render_run_status(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if app.is_loading { Color::Yellow } else { Color::DarkGray }))
        .title(" Run ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [gauge_area, notice_area, _] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Min(0),
    ])
    .areas(inner);

    let target = app.target_total.max(1);
    let ratio = (app.generated_count.min(target) as f64) / target as f64;
    let label = if app.is_loading {
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        format!("Generating{} {}/{}", dots, app.generated_count, app.target_total)
    } else {
        format!("{}/{}", app.generated_count, app.target_total)
    };
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(Color::Magenta).bg(Color::Black))
        .ratio(ratio)
        .label(label);
    frame.render_widget(gauge, gauge_area);

    let notice = match &app.notice {
        Some(notice) => {
            let color = if notice.is_error() { Color::Red } else { Color::Yellow };
            Line::from(Span::styled(notice.message(), Style::default().fg(color)))
        }
        None if !app.is_loading && !app.items.is_empty() => Line::from(Span::styled(
            format!("Done: {} conversations ready to download.", app.items.len()),
            Style::default().fg(Color::Green),
        )),
        None => Line::default(),
    };
    frame.render_widget(Paragraph::new(notice), notice_area);
}

fn render_preview(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" Preview ({}) ", app.items.len()));

    if app.items.is_empty() {
        let hint = if app.is_loading {
            "Waiting for the first theme..."
        } else {
            "Press g to generate conversations."
        };
        let paragraph = Paragraph::new(Span::styled(hint, Style::default().fg(Color::DarkGray)))
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let mut lines: Vec<Line> = Vec::new();
    for (n, item) in app.items.iter().enumerate() {
        lines.extend(card_lines(
            n + 1,
            item,
            &app.settings.participant_name,
            &app.settings.assistant_name,
        ));
    }

    // Clamp scroll so the last card stays on screen
    let max_scroll = (lines.len() as u16).saturating_sub(area.height.saturating_sub(2));
    app.preview_scroll = app.preview_scroll.min(max_scroll);

    let paragraph = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.preview_scroll, 0));
    frame.render_widget(paragraph, area);
}

fn card_lines(n: usize, item: &ConversationItem, participant: &str, assistant: &str) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(vec![
        Span::styled(format!("#{n} "), Style::default().fg(Color::DarkGray)),
        Span::styled(item.theme.to_string(), Style::default().fg(Color::Cyan).bold()),
    ])];

    for (i, turn) in item.turns.iter().enumerate() {
        let (speaker, text) = split_turn(turn, i, participant, assistant);
        let (name, color) = match speaker {
            Speaker::Participant => (participant, Color::Blue),
            Speaker::Assistant => (assistant, Color::Magenta),
        };
        lines.push(Line::from(vec![
            Span::styled(format!("  {name}: "), Style::default().fg(color).add_modifier(Modifier::BOLD)),
            Span::raw(text.to_string()),
        ]));
    }

    lines.push(Line::default());
    lines
}

fn render_settings_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [fields_area, themes_area] = Layout::horizontal([
        Constraint::Percentage(55),
        Constraint::Percentage(45),
    ])
    .areas(area);

    let focused = app.settings_pane;
    let focus_color = |pane: SettingsPane| {
        if focused == pane { Color::Cyan } else { Color::DarkGray }
    };

    // Persona and connection fields
    let field_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(focus_color(SettingsPane::Fields)))
        .title(" Persona ");

    let items: Vec<ListItem> = SettingsField::ALL
        .iter()
        .map(|field| {
            let value = match field {
                SettingsField::ApiKey => match app.settings.key_source() {
                    Some("env") => "(from environment)".to_string(),
                    Some("config") => "(configured)".to_string(),
                    Some("local") => "(not needed)".to_string(),
                    _ => "(not set)".to_string(),
                },
                other => app.field_value(*other),
            };
            let preview = value.lines().next().unwrap_or("").to_string();
            let more = if value.lines().count() > 1 { " …" } else { "" };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<15}", field.label()), Style::default().fg(Color::Gray)),
                Span::raw(format!("{preview}{more}")),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(field_block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, fields_area, &mut app.field_state);

    // Theme toggles, catalog order
    let theme_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(focus_color(SettingsPane::Themes)))
        .title(format!(
            " Themes ({}/{}) ",
            app.settings.active_themes.len(),
            Theme::catalog().len()
        ));

    let items: Vec<ListItem> = Theme::catalog()
        .iter()
        .map(|theme| {
            let active = app.settings.is_theme_active(theme);
            let mark = if active { "[x] " } else { "[ ] " };
            let style = if active {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            ListItem::new(format!("{mark}{theme}")).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(theme_block)
        .highlight_style(Style::default().bg(Color::Blue).fg(Color::White))
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, themes_area, &mut app.theme_state);
}

fn render_field_editor(app: &App, frame: &mut Frame, area: Rect) {
    let field = app.selected_field();
    let multiline = matches!(field, SettingsField::Personality | SettingsField::StyleNotes);

    // Calculate popup size and position (centered)
    let popup_width = 70.min(area.width.saturating_sub(4));
    let popup_height = if multiline { 14 } else { 5 }.min(area.height.saturating_sub(2));
    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(format!(" Edit {} ", field.label()));

    let display_text = if field == SettingsField::ApiKey {
        // Mask the key, show last 4 chars
        let len = app.edit_buffer.chars().count();
        let last_four: String = app.edit_buffer.chars().skip(len.saturating_sub(4)).collect();
        format!("{}{}", "*".repeat(len.saturating_sub(4).min(20)), last_four)
    } else {
        app.edit_buffer.clone()
    };

    let inner = block.inner(popup_area);
    let paragraph = Paragraph::new(display_text)
        .block(block)
        .style(Style::default().fg(Color::Cyan))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, popup_area);

    // Cursor only tracked exactly on single-line fields
    if !multiline && field != SettingsField::ApiKey {
        let cursor_x = app.edit_cursor.min(inner.width.saturating_sub(1) as usize) as u16;
        frame.set_cursor_position((inner.x + cursor_x, inner.y));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_turn_prefers_prefix() {
        assert_eq!(
            split_turn("Nova: hello there", 0, "Alex", "Nova"),
            (Speaker::Assistant, "hello there")
        );
        assert_eq!(
            split_turn("alex: hey", 1, "Alex", "Nova"),
            (Speaker::Participant, "hey")
        );
    }

    // Known soft edge: unprefixed turns alternate by position, participant first
    #[test]
    fn test_split_turn_falls_back_to_position() {
        assert_eq!(split_turn("hi", 0, "Alex", "Nova"), (Speaker::Participant, "hi"));
        assert_eq!(split_turn("hello", 1, "Alex", "Nova"), (Speaker::Assistant, "hello"));
        assert_eq!(
            split_turn("Bob: not one of us", 3, "Alex", "Nova"),
            (Speaker::Assistant, "Bob: not one of us")
        );
    }

    #[test]
    fn test_card_lines_has_header_and_blank() {
        let item = ConversationItem {
            theme: Theme::new("Fashion Talk"),
            turns: vec!["Alex: hi".to_string(), "Nova: hey".to_string()],
        };
        let lines = card_lines(1, &item, "Alex", "Nova");
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[3], Line::default());
    }
}
