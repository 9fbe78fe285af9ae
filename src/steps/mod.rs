//! Wizard steps and the tracker that walks them

pub mod tracker;

pub use tracker::StepTracker;

/// Number of steps in the novel wizard
pub const TOTAL_STEPS: u32 = 5;

/// The wizard's steps, numbered from 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WizardStep {
    Basics = 1,
    Background = 2,
    Outline = 3,
    Review = 4,
    Export = 5,
}

impl WizardStep {
    pub fn all() -> &'static [WizardStep] {
        &[
            WizardStep::Basics,
            WizardStep::Background,
            WizardStep::Outline,
            WizardStep::Review,
            WizardStep::Export,
        ]
    }

    pub fn number(self) -> u32 {
        self as u32
    }

    pub fn from_number(number: u32) -> Option<WizardStep> {
        Self::all().iter().copied().find(|s| s.number() == number)
    }

    pub fn label(self) -> &'static str {
        match self {
            WizardStep::Basics => "Basics",
            WizardStep::Background => "Background",
            WizardStep::Outline => "Outline",
            WizardStep::Review => "Review",
            WizardStep::Export => "Export",
        }
    }
}

/// How a step appears in the step indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Completed,
    Active,
    Pending,
}
