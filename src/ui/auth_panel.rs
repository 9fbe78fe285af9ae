use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use super::form_field::FormField;
use super::wizard_view::StatusMessage;

/// Result of a key press on the license panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthPanelAction {
    None,
    /// Enter was pressed with this code
    Submit(String),
}

/// License entry shown while the gate is locked
pub struct AuthPanel {
    code: FormField,
}

impl Default for AuthPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthPanel {
    pub fn new() -> Self {
        Self {
            code: FormField::text_input("Enter your license code", Some(32)),
        }
    }

    pub fn code(&self) -> String {
        self.code.value()
    }

    pub fn clear(&mut self) {
        self.code.set_value("");
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> AuthPanelAction {
        match key.code {
            KeyCode::Enter => AuthPanelAction::Submit(self.code.value()),
            _ => {
                self.code.handle_key(key);
                AuthPanelAction::None
            }
        }
    }

    pub fn render(&mut self, frame: &mut Frame, status: Option<&StatusMessage>) {
        let area = centered_rect(60, 40, frame.area());
        frame.render_widget(Clear, area);

        let block = Block::default()
            .title(" Novel Wizard: License ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2), // Intro
                Constraint::Length(1), // Label
                Constraint::Length(1), // Input
                Constraint::Length(1), // Spacer
                Constraint::Min(1),    // Status
                Constraint::Length(1), // Hints
            ])
            .split(inner);

        let intro = Paragraph::new(
            "A license code is required. Codes stay valid for one year from activation.",
        )
        .style(Style::default().fg(Color::Gray))
        .wrap(Wrap { trim: true });
        frame.render_widget(intro, chunks[0]);

        frame.render_widget(
            Paragraph::new(Span::styled(
                "License code",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            chunks[1],
        );
        self.code.render(frame, chunks[2], true);

        if let Some(status) = status {
            let para = Paragraph::new(Span::styled(status.text.as_str(), status.style()))
                .wrap(Wrap { trim: true });
            frame.render_widget(para, chunks[4]);
        }

        let hints = Line::from(vec![
            Span::styled("[Enter]", Style::default().fg(Color::Cyan)),
            Span::styled(" verify  ", Style::default().fg(Color::DarkGray)),
            Span::styled("[Esc]", Style::default().fg(Color::Cyan)),
            Span::styled(" quit", Style::default().fg(Color::DarkGray)),
        ]);
        frame.render_widget(Paragraph::new(hints), chunks[5]);
    }
}

/// Helper function to create a centered rect
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use ratatui::{backend::TestBackend, Terminal};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_typing_then_enter_submits_code() {
        let mut panel = AuthPanel::new();
        for c in "AUTH0011-2025".chars() {
            assert_eq!(panel.handle_key(key(KeyCode::Char(c))), AuthPanelAction::None);
        }
        assert_eq!(
            panel.handle_key(key(KeyCode::Enter)),
            AuthPanelAction::Submit("AUTH0011-2025".to_string())
        );

        panel.clear();
        assert_eq!(panel.code(), "");
    }

    #[test]
    fn test_centered_rect_is_inside_area() {
        let area = Rect::new(0, 0, 100, 50);
        let rect = centered_rect(60, 40, area);
        assert_eq!(rect.width, 60);
        assert_eq!(rect.height, 20);
        assert_eq!(rect.x, 20);
        assert_eq!(rect.y, 15);
    }

    #[test]
    fn test_render_shows_status() {
        let backend = TestBackend::new(100, 40);
        let mut terminal = Terminal::new(backend).unwrap();
        let mut panel = AuthPanel::new();
        let status = StatusMessage::error("invalid license code");

        terminal
            .draw(|f| panel.render(f, Some(&status)))
            .unwrap();

        let screen: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(screen.contains("License code"));
        assert!(screen.contains("invalid license code"));
    }
}
