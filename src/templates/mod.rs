//! Embedded genre templates for background and outline drafts
//!
//! Drafts are not generated by a model: each section has a bespoke template
//! for a couple of genres and a generic skeleton for everything else, rendered
//! with handlebars.

use anyhow::{Context, Result};
use handlebars::Handlebars;
use serde_json::json;

use crate::steps::WizardStep;

/// (template name, template source)
const CONTENT_TEMPLATES: &[(&str, &str)] = &[
    (
        "background_urban",
        include_str!("content/background_urban.hbs"),
    ),
    (
        "background_xianxia",
        include_str!("content/background_xianxia.hbs"),
    ),
    (
        "background_generic",
        include_str!("content/background_generic.hbs"),
    ),
    ("outline_urban", include_str!("content/outline_urban.hbs")),
    ("outline_xianxia", include_str!("content/outline_xianxia.hbs")),
    ("outline_generic", include_str!("content/outline_generic.hbs")),
];

/// Word-compatible HTML wrapper used by document export
pub const EXPORT_DOC_TEMPLATE: &str = include_str!("content/export_doc.hbs");

/// Genres offered in the basics step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Genre {
    Urban,
    Xianxia,
    TimeTravel,
    Romance,
    Mystery,
    SciFi,
}

impl Genre {
    pub fn all() -> &'static [Genre] {
        &[
            Genre::Urban,
            Genre::Xianxia,
            Genre::TimeTravel,
            Genre::Romance,
            Genre::Mystery,
            Genre::SciFi,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Genre::Urban => "Urban Life",
            Genre::Xianxia => "Xianxia Cultivation",
            Genre::TimeTravel => "Historical Time Travel",
            Genre::Romance => "Romance",
            Genre::Mystery => "Mystery",
            Genre::SciFi => "Science Fiction",
        }
    }

    /// Match a stored genre label, ignoring case and surrounding whitespace
    pub fn from_label(label: &str) -> Option<Genre> {
        let label = label.trim();
        Self::all()
            .iter()
            .copied()
            .find(|g| g.label().eq_ignore_ascii_case(label))
    }

    /// Template family with bespoke content, if any
    fn template_family(&self) -> &'static str {
        match self {
            Genre::Urban => "urban",
            Genre::Xianxia => "xianxia",
            _ => "generic",
        }
    }
}

/// The two generated sections of a draft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Background,
    Outline,
}

impl Section {
    pub fn label(&self) -> &'static str {
        match self {
            Section::Background => "Background",
            Section::Outline => "Outline",
        }
    }

    /// The wizard step that edits this section
    pub fn step(&self) -> WizardStep {
        match self {
            Section::Background => WizardStep::Background,
            Section::Outline => WizardStep::Outline,
        }
    }

    pub fn for_step(step: WizardStep) -> Option<Section> {
        match step {
            WizardStep::Background => Some(Section::Background),
            WizardStep::Outline => Some(Section::Outline),
            _ => None,
        }
    }

    fn template_prefix(&self) -> &'static str {
        match self {
            Section::Background => "background",
            Section::Outline => "outline",
        }
    }
}

/// One-key edits that append a placeholder paragraph to a section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickAction {
    AdjustPlot,
    AddTwist,
    RefineEnding,
}

impl QuickAction {
    pub fn all() -> &'static [QuickAction] {
        &[
            QuickAction::AdjustPlot,
            QuickAction::AddTwist,
            QuickAction::RefineEnding,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            QuickAction::AdjustPlot => "Adjust plot development",
            QuickAction::AddTwist => "Add a story twist",
            QuickAction::RefineEnding => "Refine the ending",
        }
    }

    pub fn marker(&self) -> &'static str {
        match self {
            QuickAction::AdjustPlot => "[Adjusted plot development...]",
            QuickAction::AddTwist => "[A new story twist...]",
            QuickAction::RefineEnding => "[A refined ending...]",
        }
    }

    /// `text` with this action's marker appended as a new paragraph
    pub fn apply(&self, text: &str) -> String {
        format!("{}\n\n{}", text, self.marker())
    }
}

/// Rendered section text and the template it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    pub template: &'static str,
}

/// Renders section drafts from the embedded templates
pub struct ContentGenerator {
    handlebars: Handlebars<'static>,
}

impl ContentGenerator {
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();
        // Drafts are plain text
        handlebars.register_escape_fn(handlebars::no_escape);

        for (name, source) in CONTENT_TEMPLATES {
            handlebars
                .register_template_string(name, source)
                .with_context(|| format!("Failed to parse template {}", name))?;
        }

        Ok(Self { handlebars })
    }

    /// Name of the template used for `section` in `genre`
    pub fn template_name(section: Section, genre: &str) -> &'static str {
        let family = Genre::from_label(genre)
            .map(|g| g.template_family())
            .unwrap_or("generic");

        CONTENT_TEMPLATES
            .iter()
            .map(|(name, _)| *name)
            .find(|name| {
                name.strip_prefix(section.template_prefix())
                    .and_then(|rest| rest.strip_prefix('_'))
                    == Some(family)
            })
            .unwrap_or(match section {
                Section::Background => "background_generic",
                Section::Outline => "outline_generic",
            })
    }

    pub fn render(&self, section: Section, title: &str, genre: &str) -> Result<Rendered> {
        let template = Self::template_name(section, genre);
        let text = self
            .handlebars
            .render(
                template,
                &json!({
                    "title": title.trim(),
                    "genre": genre.trim(),
                }),
            )
            .with_context(|| format!("Failed to render template {}", template))?;

        tracing::debug!(template, section = section.label(), "Rendered draft");
        Ok(Rendered { text, template })
    }
}
