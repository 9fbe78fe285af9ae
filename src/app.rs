use anyhow::Result;
use chrono::{DateTime, Utc};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::Frame;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::auth::{AuthGate, GateState};
use crate::config::Config;
use crate::export::{Clipboard, ExportFormat, Exporter};
use crate::state::{SaveDebouncer, SessionStore};
use crate::steps::WizardStep;
use crate::storage::KeyValueStore;
use crate::templates::{ContentGenerator, QuickAction, Section};
use crate::ui::{
    AuthPanel, AuthPanelAction, ProgressAnimation, StatusMessage, TerminalGuard, Tui, WizardView,
};
use crate::wizard::{Intent, Wizard};

pub struct App {
    config: Config,
    wizard: Wizard,
    sessions: SessionStore,
    gate: AuthGate,
    debouncer: SaveDebouncer,
    generator: ContentGenerator,
    exporter: Exporter,
    clipboard: Box<dyn Clipboard>,
    view: WizardView,
    auth_panel: AuthPanel,
    /// Running progress bar, if a section was just generated
    progress: Option<ProgressAnimation>,
    /// Feedback for the last action
    status: Option<StatusMessage>,
    should_quit: bool,
}

impl App {
    pub fn new(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        clipboard: Box<dyn Clipboard>,
    ) -> Result<Self> {
        let generator = ContentGenerator::new()?;
        let exporter = Exporter::new(config.exports_path());
        let debouncer = SaveDebouncer::new(config.debounce_delay());

        Ok(Self {
            sessions: SessionStore::new(Arc::clone(&store)),
            gate: AuthGate::new(store),
            wizard: Wizard::new(),
            debouncer,
            generator,
            exporter,
            clipboard,
            view: WizardView::new(),
            auth_panel: AuthPanel::new(),
            progress: None,
            status: None,
            should_quit: false,
            config,
        })
    }

    pub fn wizard(&self) -> &Wizard {
        &self.wizard
    }

    pub fn gate(&self) -> &AuthGate {
        &self.gate
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn is_animating(&self) -> bool {
        self.progress.is_some()
    }

    /// Check the stored license and rehydrate the last session
    pub fn start(&mut self, now: DateTime<Utc>) {
        if let GateState::Unlocked(authorization) = self.gate.check_status(now) {
            self.status = Some(StatusMessage::info(format!(
                "{}: {} days remaining",
                authorization.label,
                authorization.remaining_days(now)
            )));
        }

        if let Some(session) = self.sessions.load() {
            let trail = self.wizard.restore(&session);
            self.view.load_draft(self.wizard.draft());
            self.handle_intents(trail);
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        self.start(Utc::now());

        let mut guard = TerminalGuard::new()?;
        let tick_rate = self.config.tick_rate();
        let result = self.event_loop(guard.terminal_mut(), tick_rate).await;

        // Restore before reporting any loop error
        guard.restore()?;
        result
    }

    async fn event_loop(&mut self, terminal: &mut Tui, tick_rate: Duration) -> Result<()> {
        while !self.should_quit {
            terminal.draw(|f| self.draw(f))?;

            if event::poll(tick_rate)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key);
                    }
                }
            }

            self.tick(Instant::now());
            // Let the progress task publish its next frame
            tokio::task::yield_now().await;
        }
        Ok(())
    }

    fn draw(&mut self, frame: &mut Frame) {
        if self.gate.is_unlocked() {
            let progress = self.progress.as_ref().map(|p| p.frame());
            self.view
                .render(frame, &self.wizard, self.status.as_ref(), progress.as_ref());
        } else {
            self.auth_panel.render(frame, self.status.as_ref());
        }
    }

    /// Periodic work: fire due saves and retire a finished progress bar
    pub fn tick(&mut self, now: Instant) {
        if self.debouncer.poll(now) {
            self.persist_now();
        }
        if self.progress.as_ref().is_some_and(|p| p.is_finished()) {
            self.progress = None;
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if matches!(key.code, KeyCode::Esc) || (ctrl && key.code == KeyCode::Char('q')) {
            self.quit();
            return;
        }

        if !self.gate.is_unlocked() {
            if let AuthPanelAction::Submit(code) = self.auth_panel.handle_key(key) {
                self.verify(&code);
            }
            return;
        }

        match (key.code, ctrl) {
            (KeyCode::Char('n'), true) => {
                let result = self.wizard.next();
                self.apply(result);
            }
            (KeyCode::Char('b'), true) => {
                let result = self.wizard.prev();
                self.apply(result);
            }
            (KeyCode::Char('r'), true) => match self.wizard.active_section() {
                Some(section) => {
                    let intents = self.wizard.regenerate(section);
                    self.handle_intents(intents);
                }
                None => self.status = Some(StatusMessage::info("Nothing to generate on this step")),
            },
            (KeyCode::Char('s'), true) => {
                if self.persist_now() {
                    self.status = Some(StatusMessage::success("Progress saved"));
                }
            }
            (KeyCode::Char('d'), true) => self.export(ExportFormat::Doc),
            (KeyCode::Char('t'), true) => self.export(ExportFormat::Text),
            (KeyCode::Char('y'), true) => self.copy(),
            (_, true) => {}
            (KeyCode::Tab, false) if self.wizard.current_step() == WizardStep::Basics => {
                self.view.toggle_focus();
            }
            (KeyCode::F(n @ 2..=4), false) => {
                let action = QuickAction::all()[usize::from(n - 2)];
                self.quick_action(action);
            }
            _ => {
                let step = self.wizard.current_step();
                if let Some((field, value)) = self.view.handle_key(step, key) {
                    let intents = self.wizard.set_field(field, value);
                    self.handle_intents(intents);
                }
            }
        }
    }

    fn verify(&mut self, code: &str) {
        let now = Utc::now();
        match self.gate.verify(code, now) {
            Ok(verified) => {
                self.auth_panel.clear();
                self.status = Some(StatusMessage::success(verified.message(now)));
            }
            Err(e) => {
                tracing::info!(error = %e, "License rejected");
                self.status = Some(StatusMessage::error(e.to_string()));
            }
        }
    }

    fn apply(&mut self, result: Result<Vec<Intent>, crate::wizard::WizardError>) {
        match result {
            Ok(intents) => {
                self.status = None;
                self.handle_intents(intents);
            }
            Err(e) => self.status = Some(StatusMessage::error(e.to_string())),
        }
    }

    fn handle_intents(&mut self, intents: Vec<Intent>) {
        for intent in intents {
            match intent {
                Intent::StepChanged { from, to } => {
                    tracing::debug!(from, to, "Step changed");
                }
                Intent::Generate(section) => self.generate(section),
                Intent::Persist => {
                    self.persist_now();
                }
                Intent::PersistSoon => self.debouncer.mark_dirty(Instant::now()),
            }
        }
    }

    fn generate(&mut self, section: Section) {
        let rendered = {
            let draft = self.wizard.draft();
            self.generator.render(section, &draft.title, &draft.genre)
        };

        match rendered {
            Ok(rendered) => {
                let intents =
                    self.wizard
                        .apply_generated(section, rendered.text, rendered.template, Utc::now());
                self.view.load_draft(self.wizard.draft());

                // Replacing the handle aborts any running animation
                self.progress = self
                    .config
                    .ui
                    .animate_progress
                    .then(|| ProgressAnimation::start(section, self.config.progress_step()));
                self.status = Some(StatusMessage::success(format!(
                    "{} generated",
                    section.label()
                )));
                self.handle_intents(intents);
            }
            Err(e) => {
                tracing::error!(error = %e, section = section.label(), "Generation failed");
                self.status = Some(StatusMessage::error(format!(
                    "Could not generate the {}",
                    section.label().to_lowercase()
                )));
            }
        }
    }

    fn quick_action(&mut self, action: QuickAction) {
        let Some(section) = self.wizard.active_section() else {
            return;
        };
        let intents = self.wizard.quick_action(section, action);
        self.view.load_draft(self.wizard.draft());
        self.status = Some(StatusMessage::info(action.label()));
        self.handle_intents(intents);
    }

    /// Write the session immediately. Returns false when storage refused it.
    fn persist_now(&mut self) -> bool {
        self.debouncer.cancel();
        match self.sessions.save(&self.wizard.snapshot(Utc::now())) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Session not saved");
                self.status = Some(StatusMessage::error(format!("Could not save progress: {}", e)));
                false
            }
        }
    }

    fn export(&mut self, format: ExportFormat) {
        let Some(section) = self.wizard.active_section() else {
            self.status = Some(StatusMessage::info("Nothing to export on this step"));
            return;
        };

        let draft = self.wizard.draft();
        match self
            .exporter
            .export(&draft.title, section, draft.section_text(section), format)
        {
            Ok(path) => {
                self.status = Some(StatusMessage::success(format!(
                    "Exported to {}",
                    path.display()
                )));
                self.view.set_last_export(path);
            }
            Err(e) => self.status = Some(StatusMessage::error(e.to_string())),
        }
    }

    fn copy(&mut self) {
        let Some(section) = self.wizard.active_section() else {
            self.status = Some(StatusMessage::info("Nothing to copy on this step"));
            return;
        };

        self.status = Some(
            match self.clipboard.copy(self.wizard.draft().section_text(section)) {
                Ok(()) => StatusMessage::success(format!(
                    "{} copied to the clipboard",
                    section.label()
                )),
                Err(e) => StatusMessage::error(e.to_string()),
            },
        );
    }

    fn quit(&mut self) {
        if self.debouncer.is_pending() {
            self.persist_now();
        }
        self.progress = None;
        self.should_quit = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::MockClipboard;
    use crate::state::PersistedSession;
    use crate::steps::StepStatus;
    use crate::storage::MemoryStore;
    use crate::ui::wizard_view::StatusKind;
    use tempfile::TempDir;

    const CODE: &str = "AUTH0011-2025";

    struct Harness {
        app: App,
        store: MemoryStore,
        clipboard: MockClipboard,
        _temp_dir: TempDir,
    }

    fn harness() -> Harness {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.paths.data = temp_dir.path().to_string_lossy().to_string();
        config.paths.exports = temp_dir.path().join("out").to_string_lossy().to_string();
        config.ui.animate_progress = false;

        let store = MemoryStore::new();
        let clipboard = MockClipboard::new();
        let app = App::new(
            config,
            Arc::new(store.clone()),
            Box::new(clipboard.clone()),
        )
        .unwrap();

        Harness {
            app,
            store,
            clipboard,
            _temp_dir: temp_dir,
        }
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn ctrl(app: &mut App, c: char) {
        app.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL));
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn unlock(app: &mut App) {
        type_text(app, CODE);
        press(app, KeyCode::Enter);
    }

    /// Unlock and fill the basics step with a title and the first genre
    fn fill_basics(app: &mut App) {
        unlock(app);
        type_text(app, "Dust");
        press(app, KeyCode::Tab);
        press(app, KeyCode::Down);
    }

    fn saved(store: &MemoryStore) -> Option<PersistedSession> {
        SessionStore::new(Arc::new(store.clone())).load()
    }

    #[test]
    fn test_valid_code_unlocks() {
        let mut h = harness();
        h.app.start(Utc::now());
        assert!(!h.app.gate().is_unlocked());

        unlock(&mut h.app);
        assert!(h.app.gate().is_unlocked());
        let status = h.app.status().unwrap();
        assert_eq!(status.kind, StatusKind::Success);
        assert_eq!(status.text, "License activated. Valid for one year.");
    }

    #[test]
    fn test_invalid_code_stays_locked() {
        let mut h = harness();
        type_text(&mut h.app, "NOPE");
        press(&mut h.app, KeyCode::Enter);

        assert!(!h.app.gate().is_unlocked());
        assert_eq!(h.app.status().unwrap().text, "invalid license code");
        // Wizard keys do nothing while locked
        ctrl(&mut h.app, 'n');
        assert_eq!(h.app.wizard().current_step(), WizardStep::Basics);
    }

    #[test]
    fn test_next_blocked_without_title() {
        let mut h = harness();
        unlock(&mut h.app);
        ctrl(&mut h.app, 'n');

        assert_eq!(h.app.wizard().current_step(), WizardStep::Basics);
        assert_eq!(
            h.app.status().unwrap().text,
            "please fill in the novel title"
        );
    }

    #[test]
    fn test_next_generates_background_and_saves() {
        let mut h = harness();
        fill_basics(&mut h.app);
        ctrl(&mut h.app, 'n');

        assert_eq!(h.app.wizard().current_step(), WizardStep::Background);
        let draft = h.app.wizard().draft();
        assert_eq!(draft.genre, "Urban Life");
        assert!(draft.background.starts_with("《Dust》"));

        let session = saved(&h.store).unwrap();
        assert_eq!(session.current_step, 2);
        assert_eq!(session.background_text, draft.background);
    }

    #[test]
    fn test_edits_are_debounced() {
        let mut h = harness();
        fill_basics(&mut h.app);
        ctrl(&mut h.app, 'n');
        ctrl(&mut h.app, 'n');
        assert_eq!(h.app.wizard().current_step(), WizardStep::Outline);

        type_text(&mut h.app, "!!");
        let before = saved(&h.store).unwrap();
        assert!(!before.outline_text.ends_with("!!"));

        h.app.tick(Instant::now() + Duration::from_secs(5));
        let after = saved(&h.store).unwrap();
        assert!(after.outline_text.ends_with("!!"));
    }

    #[test]
    fn test_quit_flushes_pending_save() {
        let mut h = harness();
        unlock(&mut h.app);
        type_text(&mut h.app, "Dust");
        assert_eq!(saved(&h.store), None);

        ctrl(&mut h.app, 'q');
        assert!(h.app.should_quit());
        assert_eq!(saved(&h.store).unwrap().title, "Dust");
    }

    #[test]
    fn test_start_restores_session_and_license() {
        let mut h = harness();
        fill_basics(&mut h.app);
        ctrl(&mut h.app, 'n');
        ctrl(&mut h.app, 'n');

        let clipboard = MockClipboard::new();
        let mut config = Config::default();
        config.ui.animate_progress = false;
        let mut reopened =
            App::new(config, Arc::new(h.store.clone()), Box::new(clipboard)).unwrap();
        reopened.start(Utc::now());

        assert!(reopened.gate().is_unlocked());
        assert_eq!(reopened.wizard().current_step(), WizardStep::Outline);
        assert_eq!(reopened.wizard().draft(), h.app.wizard().draft());
    }

    #[test]
    fn test_restore_replays_steps_without_saving() {
        let mut h = harness();
        fill_basics(&mut h.app);
        ctrl(&mut h.app, 'n');
        ctrl(&mut h.app, 'n');
        let before = saved(&h.store).unwrap();

        let mut config = Config::default();
        config.ui.animate_progress = false;
        let mut reopened = App::new(
            config,
            Arc::new(h.store.clone()),
            Box::new(MockClipboard::new()),
        )
        .unwrap();
        reopened.start(Utc::now());

        assert_eq!(
            reopened.wizard().status_of(WizardStep::Background),
            StepStatus::Completed
        );
        assert!(!reopened.debouncer.is_pending());
        assert_eq!(saved(&h.store).unwrap(), before);
    }

    #[test]
    fn test_quick_action_and_copy() {
        let mut h = harness();
        fill_basics(&mut h.app);
        ctrl(&mut h.app, 'n');

        press(&mut h.app, KeyCode::F(3));
        assert!(h
            .app
            .wizard()
            .draft()
            .background
            .ends_with("[A new story twist...]"));

        ctrl(&mut h.app, 'y');
        assert_eq!(
            h.clipboard.last().as_deref(),
            Some(h.app.wizard().draft().background.as_str())
        );
    }

    #[test]
    fn test_export_text_writes_file() {
        let mut h = harness();
        fill_basics(&mut h.app);
        ctrl(&mut h.app, 'n');
        ctrl(&mut h.app, 't');

        let path = h._temp_dir.path().join("out").join("Dust_Background.txt");
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            h.app.wizard().draft().background
        );
        assert_eq!(h.app.status().unwrap().kind, StatusKind::Success);
    }

    #[test]
    fn test_export_on_basics_is_refused() {
        let mut h = harness();
        unlock(&mut h.app);
        ctrl(&mut h.app, 'd');
        assert_eq!(
            h.app.status().unwrap().text,
            "Nothing to export on this step"
        );
    }

    #[tokio::test]
    async fn test_generation_starts_progress_animation() {
        let mut h = harness();
        h.app.config.ui.animate_progress = true;
        fill_basics(&mut h.app);
        ctrl(&mut h.app, 'n');
        assert!(h.app.is_animating());

        // Regenerate replaces the running animation
        ctrl(&mut h.app, 'r');
        assert!(h.app.is_animating());
    }
}
