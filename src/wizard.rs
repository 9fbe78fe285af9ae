//! Wizard state machine.
//!
//! `Wizard` owns the step tracker and the form fields. Every operation is a
//! pure state transition that returns the side effects the presentation layer
//! should carry out as a list of [`Intent`]s. Operations validate before they
//! mutate, so a rejected transition leaves the state untouched.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::state::PersistedSession;
use crate::steps::{StepStatus, StepTracker, WizardStep, TOTAL_STEPS};
use crate::templates::{QuickAction, Section};

/// Form fields the user can edit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Genre,
    Background,
    Outline,
}

impl Field {
    pub fn label(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Genre => "genre",
            Field::Background => "background",
            Field::Outline => "outline",
        }
    }

    fn for_section(section: Section) -> Field {
        match section {
            Section::Background => Field::Background,
            Section::Outline => Field::Outline,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WizardError {
    #[error("please fill in the novel {}", .field.label())]
    InvalidInput { field: Field },

    #[error("already on the last step")]
    NoNextStep,

    #[error("already on the first step")]
    NoPreviousStep,
}

/// Side effects requested by a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// The active step moved; update the indicator and panel
    StepChanged { from: u32, to: u32 },
    /// Fill `Section` from its template
    Generate(Section),
    /// Save the session now
    Persist,
    /// Save the session after the debounce delay
    PersistSoon,
}

/// Per-step payload recorded when a section is generated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedDraft {
    pub template: &'static str,
    pub generated_at: DateTime<Utc>,
}

/// Current form values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    pub genre: String,
    pub background: String,
    pub outline: String,
}

impl Draft {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Title => &self.title,
            Field::Genre => &self.genre,
            Field::Background => &self.background,
            Field::Outline => &self.outline,
        }
    }

    fn get_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Title => &mut self.title,
            Field::Genre => &mut self.genre,
            Field::Background => &mut self.background,
            Field::Outline => &mut self.outline,
        }
    }

    pub fn section_text(&self, section: Section) -> &str {
        self.get(Field::for_section(section))
    }
}

#[derive(Debug, Clone)]
pub struct Wizard {
    tracker: StepTracker<GeneratedDraft>,
    draft: Draft,
}

impl Default for Wizard {
    fn default() -> Self {
        Self::new()
    }
}

impl Wizard {
    pub fn new() -> Self {
        Self {
            tracker: StepTracker::new(TOTAL_STEPS),
            draft: Draft::default(),
        }
    }

    pub fn current_step(&self) -> WizardStep {
        WizardStep::from_number(self.tracker.current_step()).unwrap_or(WizardStep::Basics)
    }

    pub fn step_number(&self) -> u32 {
        self.tracker.current_step()
    }

    pub fn status_of(&self, step: WizardStep) -> StepStatus {
        self.tracker.status_of(step.number())
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    /// Section that section-level actions (regenerate, export, copy, quick
    /// actions) apply to. The background step edits the background; every
    /// later step works on the outline.
    pub fn active_section(&self) -> Option<Section> {
        match self.current_step() {
            WizardStep::Basics => None,
            WizardStep::Background => Some(Section::Background),
            _ => Some(Section::Outline),
        }
    }

    /// Generation record for a section, if it has been generated
    pub fn generated(&self, section: Section) -> Option<&GeneratedDraft> {
        self.tracker.read_step_data(section.step().number())
    }

    /// Advance to the next step
    pub fn next(&mut self) -> Result<Vec<Intent>, WizardError> {
        let from = self.current_step();
        if from == WizardStep::Basics {
            for field in [Field::Title, Field::Genre] {
                if self.draft.get(field).trim().is_empty() {
                    return Err(WizardError::InvalidInput { field });
                }
            }
        }

        if !self.tracker.advance() {
            return Err(WizardError::NoNextStep);
        }
        let to = self.current_step();

        let mut intents = vec![Intent::StepChanged {
            from: from.number(),
            to: to.number(),
        }];
        if from == WizardStep::Basics {
            intents.push(Intent::Generate(Section::Background));
        }
        if to == WizardStep::Outline && self.draft.outline.trim().is_empty() {
            intents.push(Intent::Generate(Section::Outline));
        }
        intents.push(Intent::Persist);
        Ok(intents)
    }

    /// Go back one step
    pub fn prev(&mut self) -> Result<Vec<Intent>, WizardError> {
        let from = self.tracker.current_step();
        if !self.tracker.retreat() {
            return Err(WizardError::NoPreviousStep);
        }
        Ok(vec![
            Intent::StepChanged {
                from,
                to: self.tracker.current_step(),
            },
            Intent::Persist,
        ])
    }

    /// Replace one field's value
    pub fn set_field(&mut self, field: Field, value: impl Into<String>) -> Vec<Intent> {
        let value = value.into();
        let slot = self.draft.get_mut(field);
        if *slot == value {
            return Vec::new();
        }
        *slot = value;
        vec![Intent::PersistSoon]
    }

    /// Ask for a section to be generated again
    pub fn regenerate(&self, section: Section) -> Vec<Intent> {
        vec![Intent::Generate(section)]
    }

    /// Store freshly generated text for a section
    pub fn apply_generated(
        &mut self,
        section: Section,
        text: String,
        template: &'static str,
        now: DateTime<Utc>,
    ) -> Vec<Intent> {
        *self.draft.get_mut(Field::for_section(section)) = text;
        self.tracker.record_step_data(
            section.step().number(),
            GeneratedDraft {
                template,
                generated_at: now,
            },
        );
        vec![Intent::Persist]
    }

    /// Append a quick-action marker to a section
    pub fn quick_action(&mut self, section: Section, action: QuickAction) -> Vec<Intent> {
        let slot = self.draft.get_mut(Field::for_section(section));
        *slot = action.apply(slot);
        vec![Intent::PersistSoon]
    }

    /// Session blob for the current state
    pub fn snapshot(&self, now: DateTime<Utc>) -> PersistedSession {
        PersistedSession {
            current_step: self.tracker.current_step(),
            title: self.draft.title.clone(),
            genre: self.draft.genre.clone(),
            background_text: self.draft.background.clone(),
            outline_text: self.draft.outline.clone(),
            last_updated: now,
        }
    }

    /// Rehydrate from a saved session.
    ///
    /// Starts from step 1 and replays each forward transition up to the saved
    /// step, returning one `StepChanged` per hop so the indicator shows the
    /// same trail a real walk through the wizard leaves behind. Out-of-range
    /// steps are clamped.
    pub fn restore(&mut self, session: &PersistedSession) -> Vec<Intent> {
        self.tracker.reset();
        self.draft = Draft {
            title: session.title.clone(),
            genre: session.genre.clone(),
            background: session.background_text.clone(),
            outline: session.outline_text.clone(),
        };

        let target = session.current_step.clamp(1, self.tracker.total_steps());
        let mut trail = Vec::new();
        while self.tracker.current_step() < target {
            let from = self.tracker.current_step();
            self.tracker.advance();
            trail.push(Intent::StepChanged {
                from,
                to: self.tracker.current_step(),
            });
        }

        tracing::info!(step = target, hops = trail.len(), "Session restored");
        trail
    }

    /// Clear all fields and return to step 1
    pub fn reset(&mut self) {
        self.tracker.reset();
        self.draft = Draft::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap()
    }

    fn filled() -> Wizard {
        let mut wizard = Wizard::new();
        wizard.set_field(Field::Title, "Dust");
        wizard.set_field(Field::Genre, "Urban Life");
        wizard
    }

    #[test]
    fn test_next_requires_title_and_genre() {
        let mut wizard = Wizard::new();
        assert_eq!(
            wizard.next(),
            Err(WizardError::InvalidInput {
                field: Field::Title
            })
        );

        wizard.set_field(Field::Title, "Dust");
        wizard.set_field(Field::Genre, "   ");
        assert_eq!(
            wizard.next(),
            Err(WizardError::InvalidInput {
                field: Field::Genre
            })
        );
        assert_eq!(wizard.current_step(), WizardStep::Basics);
    }

    #[test]
    fn test_leaving_basics_generates_background() {
        let mut wizard = filled();
        let intents = wizard.next().unwrap();
        assert_eq!(
            intents,
            vec![
                Intent::StepChanged { from: 1, to: 2 },
                Intent::Generate(Section::Background),
                Intent::Persist,
            ]
        );
        assert_eq!(wizard.status_of(WizardStep::Basics), StepStatus::Completed);
        assert_eq!(wizard.status_of(WizardStep::Background), StepStatus::Active);
    }

    #[test]
    fn test_entering_outline_generates_only_when_empty() {
        let mut wizard = filled();
        wizard.next().unwrap();
        let intents = wizard.next().unwrap();
        assert!(intents.contains(&Intent::Generate(Section::Outline)));

        wizard.prev().unwrap();
        wizard.set_field(Field::Outline, "Chapter 1");
        let intents = wizard.next().unwrap();
        assert!(!intents.contains(&Intent::Generate(Section::Outline)));
    }

    #[test]
    fn test_next_at_last_step_fails_without_change() {
        let mut wizard = filled();
        for _ in 1..TOTAL_STEPS {
            wizard.next().unwrap();
        }
        assert_eq!(wizard.current_step(), WizardStep::Export);
        assert_eq!(wizard.next(), Err(WizardError::NoNextStep));
        assert_eq!(wizard.current_step(), WizardStep::Export);
    }

    #[test]
    fn test_prev_at_first_step_fails() {
        let mut wizard = Wizard::new();
        assert_eq!(wizard.prev(), Err(WizardError::NoPreviousStep));
    }

    #[test]
    fn test_prev_moves_back_and_persists() {
        let mut wizard = filled();
        wizard.next().unwrap();
        assert_eq!(
            wizard.prev().unwrap(),
            vec![Intent::StepChanged { from: 2, to: 1 }, Intent::Persist]
        );
    }

    #[test]
    fn test_set_field_only_persists_on_change() {
        let mut wizard = Wizard::new();
        assert_eq!(
            wizard.set_field(Field::Title, "Dust"),
            vec![Intent::PersistSoon]
        );
        assert!(wizard.set_field(Field::Title, "Dust").is_empty());
    }

    #[test]
    fn test_apply_generated_records_step_data() {
        let mut wizard = filled();
        wizard.apply_generated(
            Section::Background,
            "text".to_string(),
            "background_urban",
            now(),
        );
        assert_eq!(wizard.draft().background, "text");
        assert_eq!(
            wizard.generated(Section::Background),
            Some(&GeneratedDraft {
                template: "background_urban",
                generated_at: now(),
            })
        );
        assert_eq!(wizard.generated(Section::Outline), None);
    }

    #[test]
    fn test_quick_action_appends() {
        let mut wizard = filled();
        wizard.set_field(Field::Outline, "Chapter 1");
        wizard.quick_action(Section::Outline, QuickAction::RefineEnding);
        assert_eq!(
            wizard.draft().outline,
            "Chapter 1\n\n[A refined ending...]"
        );
    }

    #[test]
    fn test_snapshot_restore_round_trip() {
        let mut wizard = filled();
        wizard.next().unwrap();
        wizard.next().unwrap();
        wizard.set_field(Field::Outline, "Chapter 1");
        let saved = wizard.snapshot(now());

        let mut restored = Wizard::new();
        let trail = restored.restore(&saved);
        assert_eq!(
            trail,
            vec![
                Intent::StepChanged { from: 1, to: 2 },
                Intent::StepChanged { from: 2, to: 3 },
            ]
        );
        assert_eq!(restored.current_step(), WizardStep::Outline);
        assert_eq!(restored.draft(), wizard.draft());
        assert_eq!(restored.snapshot(now()), saved);
    }

    #[test]
    fn test_restore_at_first_step_has_no_trail() {
        let mut wizard = Wizard::new();
        let mut session = filled().snapshot(now());
        session.current_step = 1;
        assert!(wizard.restore(&session).is_empty());
        assert_eq!(wizard.draft().title, "Dust");
    }

    #[test]
    fn test_restore_clamps_out_of_range_steps() {
        let mut session = filled().snapshot(now());

        session.current_step = 42;
        let mut wizard = Wizard::new();
        assert_eq!(wizard.restore(&session).len(), (TOTAL_STEPS - 1) as usize);
        assert_eq!(wizard.current_step(), WizardStep::Export);

        session.current_step = 0;
        assert!(wizard.restore(&session).is_empty());
        assert_eq!(wizard.current_step(), WizardStep::Basics);
    }

    #[test]
    fn test_active_section_follows_step() {
        let mut wizard = filled();
        assert_eq!(wizard.active_section(), None);
        wizard.next().unwrap();
        assert_eq!(wizard.active_section(), Some(Section::Background));
        wizard.next().unwrap();
        assert_eq!(wizard.active_section(), Some(Section::Outline));
        wizard.next().unwrap();
        assert_eq!(wizard.active_section(), Some(Section::Outline));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut wizard = filled();
        wizard.next().unwrap();
        wizard.apply_generated(Section::Background, "x".to_string(), "t", now());
        wizard.reset();

        assert_eq!(wizard.current_step(), WizardStep::Basics);
        assert_eq!(wizard.draft(), &Draft::default());
        assert_eq!(wizard.generated(Section::Background), None);
    }
}
