use std::path::{Path, PathBuf};

use crossterm::event::KeyEvent;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame,
};

use super::form_field::FormField;
use super::progress::ProgressFrame;
use crate::steps::{StepStatus, WizardStep};
use crate::templates::{Genre, QuickAction, Section};
use crate::wizard::{Draft, Field, Wizard};

/// Placeholder entry at the top of the genre list
const NO_GENRE: &str = "Select a genre...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

/// One-line feedback shown in the status bar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub kind: StatusKind,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: StatusKind::Info,
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: StatusKind::Success,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: StatusKind::Error,
        }
    }

    pub fn style(&self) -> Style {
        match self.kind {
            StatusKind::Info => Style::default().fg(Color::Gray),
            StatusKind::Success => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Focus within the basics step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasicsFocus {
    Title,
    Genre,
}

/// Form widgets for every step plus the chrome around them
pub struct WizardView {
    title: FormField,
    genre: FormField,
    background: FormField,
    outline: FormField,
    focus: BasicsFocus,
    last_export: Option<PathBuf>,
}

impl Default for WizardView {
    fn default() -> Self {
        Self::new()
    }
}

impl WizardView {
    pub fn new() -> Self {
        let mut genres = vec![NO_GENRE.to_string()];
        genres.extend(Genre::all().iter().map(|g| g.label().to_string()));

        Self {
            title: FormField::text_input("Enter the novel title", Some(60)),
            genre: FormField::enum_select(genres),
            background: FormField::text_area("The story background appears here"),
            outline: FormField::text_area("The chapter outline appears here"),
            focus: BasicsFocus::Title,
            last_export: None,
        }
    }

    /// Copy draft values into the widgets
    pub fn load_draft(&mut self, draft: &Draft) {
        self.title.set_value(&draft.title);
        match Genre::from_label(&draft.genre) {
            Some(genre) => self.genre.set_value(genre.label()),
            None => {
                if !draft.genre.trim().is_empty() {
                    tracing::warn!(genre = %draft.genre, "Saved genre is not in the catalogue");
                }
                self.genre.set_value(NO_GENRE);
            }
        }
        self.background.set_value(&draft.background);
        self.outline.set_value(&draft.outline);
    }

    pub fn focus(&self) -> BasicsFocus {
        self.focus
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            BasicsFocus::Title => BasicsFocus::Genre,
            BasicsFocus::Genre => BasicsFocus::Title,
        };
    }

    pub fn set_last_export(&mut self, path: PathBuf) {
        self.last_export = Some(path);
    }

    pub fn last_export(&self) -> Option<&Path> {
        self.last_export.as_deref()
    }

    /// Route an editing key to the widget active on `step`.
    ///
    /// Returns the edited field and its new value when the key changed it.
    pub fn handle_key(&mut self, step: WizardStep, key: KeyEvent) -> Option<(Field, String)> {
        let (field, widget) = match step {
            WizardStep::Basics => match self.focus {
                BasicsFocus::Title => (Field::Title, &mut self.title),
                BasicsFocus::Genre => (Field::Genre, &mut self.genre),
            },
            WizardStep::Background => (Field::Background, &mut self.background),
            WizardStep::Outline => (Field::Outline, &mut self.outline),
            WizardStep::Review | WizardStep::Export => return None,
        };

        let before = widget.value();
        if !widget.handle_key(key) {
            return None;
        }
        let mut after = widget.value();
        if field == Field::Genre && after == NO_GENRE {
            after.clear();
        }
        (after != before).then_some((field, after))
    }

    pub fn render(
        &mut self,
        frame: &mut Frame,
        wizard: &Wizard,
        status: Option<&StatusMessage>,
        progress: Option<&ProgressFrame>,
    ) {
        let progress_height = if progress.is_some() { 3 } else { 0 };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),               // Header + steps
                Constraint::Min(8),                  // Step panel
                Constraint::Length(progress_height), // Progress
                Constraint::Length(3),               // Status + hints
            ])
            .split(frame.area());

        frame.render_widget(Paragraph::new(step_indicator(wizard)), chunks[0]);

        let step = wizard.current_step();
        let block = Block::default()
            .title(format!(
                " Step {} of {}: {} ",
                step.number(),
                WizardStep::all().len(),
                step.label()
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        let inner = block.inner(chunks[1]);
        frame.render_widget(block, chunks[1]);

        match step {
            WizardStep::Basics => self.render_basics(frame, inner),
            WizardStep::Background => {
                render_section(frame, inner, &mut self.background, Section::Background)
            }
            WizardStep::Outline => {
                render_section(frame, inner, &mut self.outline, Section::Outline)
            }
            WizardStep::Review => render_review(frame, inner, wizard.draft()),
            WizardStep::Export => {
                render_export(frame, inner, wizard.draft(), self.last_export.as_deref())
            }
        }

        if let Some(progress) = progress {
            let gauge = Gauge::default()
                .block(Block::default().borders(Borders::ALL))
                .gauge_style(Style::default().fg(Color::Cyan))
                .percent(progress.percent)
                .label(format!("{} {}%", progress.message, progress.percent));
            frame.render_widget(gauge, chunks[2]);
        }

        render_status_bar(frame, chunks[3], step, status);
    }

    fn render_basics(&mut self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Title label
                Constraint::Length(1), // Title input
                Constraint::Length(1), // Spacer
                Constraint::Length(1), // Genre label
                Constraint::Min(1),    // Genre list
            ])
            .split(area);

        let label = |text: &'static str, focused: bool| {
            let style = if focused {
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().add_modifier(Modifier::BOLD)
            };
            Paragraph::new(Span::styled(text, style))
        };

        let title_focused = self.focus == BasicsFocus::Title;
        frame.render_widget(label("Novel title", title_focused), chunks[0]);
        self.title.render(frame, chunks[1], title_focused);
        frame.render_widget(label("Genre", !title_focused), chunks[3]);
        self.genre.render(frame, chunks[4], !title_focused);
    }
}

/// Header line: app name and one marker per step
pub fn step_indicator(wizard: &Wizard) -> Line<'static> {
    let mut spans = vec![Span::styled(
        " Novel Wizard ",
        Style::default()
            .fg(Color::LightRed)
            .add_modifier(Modifier::BOLD),
    )];

    for step in WizardStep::all() {
        spans.push(Span::styled("│ ", Style::default().fg(Color::DarkGray)));
        let (glyph, style) = match wizard.status_of(*step) {
            StepStatus::Completed => ("✓", Style::default().fg(Color::Green)),
            StepStatus::Active => (
                "●",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            StepStatus::Pending => ("○", Style::default().fg(Color::DarkGray)),
        };
        spans.push(Span::styled(
            format!("{} {} {} ", glyph, step.number(), step.label()),
            style,
        ));
    }

    Line::from(spans)
}

/// Key hints for the status bar on `step`
pub fn key_hints(step: WizardStep) -> Vec<(&'static str, &'static str)> {
    let mut hints = Vec::new();
    if step != WizardStep::Basics {
        hints.push(("^B", "back"));
    }
    if step != WizardStep::Export {
        hints.push(("^N", "next"));
    }
    match step {
        WizardStep::Basics => hints.push(("Tab", "field")),
        WizardStep::Background | WizardStep::Outline => {
            hints.extend([("^R", "regenerate"), ("F2-F4", "quick edits")]);
        }
        WizardStep::Review => {}
        WizardStep::Export => hints.push(("^R", "regenerate")),
    }
    if step != WizardStep::Basics {
        hints.extend([("^D", "doc"), ("^T", "txt"), ("^Y", "copy")]);
    }
    hints.extend([("^S", "save"), ("^Q", "quit")]);
    hints
}

fn render_section(frame: &mut Frame, area: Rect, field: &mut FormField, section: Section) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);

    field.render(frame, chunks[0], true);

    let mut spans = vec![Span::styled(
        format!("{} quick edits: ", section.label()),
        Style::default().fg(Color::DarkGray),
    )];
    for (key, action) in ["F2", "F3", "F4"].iter().zip(QuickAction::all()) {
        spans.push(Span::styled(
            format!("[{}]", key),
            Style::default().fg(Color::Cyan),
        ));
        spans.push(Span::styled(
            format!(" {}  ", action.label()),
            Style::default().fg(Color::DarkGray),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), chunks[1]);
}

fn render_review(frame: &mut Frame, area: Rect, draft: &Draft) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(3)])
        .split(area);

    let summary = Line::from(vec![
        Span::styled("Title: ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(draft.title.clone()),
        Span::styled("   Genre: ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(draft.genre.clone()),
    ]);
    frame.render_widget(Paragraph::new(summary), chunks[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);

    for (section, column) in [Section::Background, Section::Outline]
        .into_iter()
        .zip(columns.iter())
    {
        let text = draft.section_text(section);
        let body = if text.trim().is_empty() {
            Paragraph::new(Span::styled(
                "(empty)",
                Style::default().fg(Color::DarkGray),
            ))
        } else {
            Paragraph::new(text.to_string())
        };
        frame.render_widget(
            body.wrap(Wrap { trim: false }).block(
                Block::default()
                    .title(format!(" {} ", section.label()))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Gray)),
            ),
            *column,
        );
    }
}

fn render_export(frame: &mut Frame, area: Rect, draft: &Draft, last_export: Option<&Path>) {
    let key = Style::default().fg(Color::Cyan);
    let dim = Style::default().fg(Color::Gray);
    let words = draft.outline.chars().filter(|c| !c.is_whitespace()).count();

    let mut lines = vec![
        Line::from(Span::styled(
            "Your outline is ready to export.",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!("{} characters in the outline", words),
            dim,
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("[^D] ", key),
            Span::styled("Export a Word document (.doc)", dim),
        ]),
        Line::from(vec![
            Span::styled("[^T] ", key),
            Span::styled("Export plain text (.txt)", dim),
        ]),
        Line::from(vec![
            Span::styled("[^Y] ", key),
            Span::styled("Copy the outline to the clipboard", dim),
        ]),
    ];

    if let Some(path) = last_export {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("Last export: ", Style::default().fg(Color::Green)),
            Span::raw(path.display().to_string()),
        ]));
    }

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), area);
}

fn render_status_bar(
    frame: &mut Frame,
    area: Rect,
    step: WizardStep,
    status: Option<&StatusMessage>,
) {
    let status_line = match status {
        Some(status) => Line::from(Span::styled(status.text.clone(), status.style())),
        None => Line::from(""),
    };

    let mut hints = Vec::new();
    for (key, label) in key_hints(step) {
        hints.push(Span::styled(
            format!("[{}]", key),
            Style::default().fg(Color::Cyan),
        ));
        hints.push(Span::styled(
            format!("{} ", label),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let bar = Paragraph::new(vec![status_line, Line::from(hints)])
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(bar, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};
    use ratatui::{backend::TestBackend, Terminal};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn screen(view: &mut WizardView, wizard: &Wizard, progress: Option<&ProgressFrame>) -> String {
        let backend = TestBackend::new(120, 40);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|f| view.render(f, wizard, None, progress))
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_title_typing_reports_changes() {
        let mut view = WizardView::new();
        assert_eq!(
            view.handle_key(WizardStep::Basics, key(KeyCode::Char('D'))),
            Some((Field::Title, "D".to_string()))
        );
        // Cursor movement changes nothing
        assert_eq!(view.handle_key(WizardStep::Basics, key(KeyCode::Left)), None);
    }

    #[test]
    fn test_load_draft_matches_genre_ignoring_case() {
        let mut view = WizardView::new();
        let draft = Draft {
            title: "Jade Peak".to_string(),
            genre: " xianxia cultivation ".to_string(),
            ..Draft::default()
        };
        view.load_draft(&draft);
        assert_eq!(view.genre.value(), "Xianxia Cultivation");

        // Unknown genres fall back to the placeholder
        view.load_draft(&Draft {
            genre: "Cookbook".to_string(),
            ..Draft::default()
        });
        assert_eq!(view.genre.value(), NO_GENRE);
    }

    #[test]
    fn test_genre_placeholder_maps_to_empty() {
        let mut view = WizardView::new();
        view.toggle_focus();
        assert_eq!(view.focus(), BasicsFocus::Genre);

        assert_eq!(
            view.handle_key(WizardStep::Basics, key(KeyCode::Down)),
            Some((Field::Genre, "Urban Life".to_string()))
        );
        assert_eq!(
            view.handle_key(WizardStep::Basics, key(KeyCode::Up)),
            Some((Field::Genre, String::new()))
        );
    }

    #[test]
    fn test_review_and_export_steps_are_read_only() {
        let mut view = WizardView::new();
        assert_eq!(
            view.handle_key(WizardStep::Review, key(KeyCode::Char('x'))),
            None
        );
        assert_eq!(
            view.handle_key(WizardStep::Export, key(KeyCode::Char('x'))),
            None
        );
    }

    #[test]
    fn test_load_draft_fills_widgets() {
        let mut view = WizardView::new();
        let draft = Draft {
            title: "Dust".to_string(),
            genre: "Mystery".to_string(),
            background: "Once".to_string(),
            outline: String::new(),
        };
        view.load_draft(&draft);

        assert_eq!(view.title.value(), "Dust");
        assert_eq!(view.genre.value(), "Mystery");
        assert_eq!(view.background.value(), "Once");
    }

    #[test]
    fn test_key_hints_match_step() {
        let has = |step, key| key_hints(step).iter().any(|(k, _)| *k == key);

        assert!(!has(WizardStep::Basics, "^B"));
        assert!(has(WizardStep::Basics, "^N"));
        assert!(has(WizardStep::Outline, "F2-F4"));
        assert!(!has(WizardStep::Export, "^N"));
        assert!(has(WizardStep::Export, "^D"));
    }

    #[test]
    fn test_render_shows_indicator_and_panel() {
        let mut view = WizardView::new();
        let wizard = Wizard::new();
        let text = screen(&mut view, &wizard, None);

        assert!(text.contains("Novel Wizard"));
        assert!(text.contains("● 1 Basics"));
        assert!(text.contains("○ 5 Export"));
        assert!(text.contains("Step 1 of 5: Basics"));
        assert!(text.contains("Novel title"));
    }

    #[test]
    fn test_render_shows_progress() {
        let mut view = WizardView::new();
        let wizard = Wizard::new();
        let frame = ProgressFrame::at(Section::Background, 5);
        let text = screen(&mut view, &wizard, Some(&frame));

        assert!(text.contains("Analyzing the story background... 25%"));
    }
}
