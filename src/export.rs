//! Export of drafts to files and to the system clipboard

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};

use handlebars::Handlebars;
use serde_json::json;
use thiserror::Error;

use crate::templates::{Section, EXPORT_DOC_TEMPLATE};

/// Title used when the draft has none
pub const DEFAULT_TITLE: &str = "Novel";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("there is no {0} content to export")]
    NothingToExport(&'static str),

    #[error("failed to render document: {0}")]
    Render(#[from] handlebars::RenderError),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Output file flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Word-compatible HTML document
    Doc,
    /// Plain UTF-8 text
    Text,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Doc => "doc",
            ExportFormat::Text => "txt",
        }
    }
}

/// Writes exported drafts into a directory
pub struct Exporter {
    dir: PathBuf,
    handlebars: Handlebars<'static>,
}

impl Exporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        // Default escaping stays on: the body lands inside HTML
        let handlebars = Handlebars::new();
        Self {
            dir: dir.into(),
            handlebars,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name for an export, e.g. `Dust_Outline.txt`
    pub fn file_name(title: &str, section: Section, format: ExportFormat) -> String {
        let title = title.trim();
        let title = if title.is_empty() { DEFAULT_TITLE } else { title };
        let safe: String = title
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
                c if c.is_control() => '_',
                c => c,
            })
            .collect();
        format!("{}_{}.{}", safe, section.label(), format.extension())
    }

    /// Export `body` and return the written path
    pub fn export(
        &self,
        title: &str,
        section: Section,
        body: &str,
        format: ExportFormat,
    ) -> Result<PathBuf, ExportError> {
        if body.trim().is_empty() {
            return Err(ExportError::NothingToExport(section.label()));
        }

        let contents = match format {
            ExportFormat::Text => body.to_string(),
            ExportFormat::Doc => self.render_doc(title, body)?,
        };

        let path = self.dir.join(Self::file_name(title, section, format));
        let write_err = |source| ExportError::Write {
            path: path.clone(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(write_err)?;
        fs::write(&path, contents).map_err(write_err)?;

        tracing::info!(path = %path.display(), section = section.label(), "Exported draft");
        Ok(path)
    }

    fn render_doc(&self, title: &str, body: &str) -> Result<String, ExportError> {
        let title = title.trim();
        let title = if title.is_empty() { DEFAULT_TITLE } else { title };
        let html = self.handlebars.render_template(
            EXPORT_DOC_TEMPLATE,
            &json!({ "title": title, "body": body }),
        )?;
        Ok(html)
    }
}

#[derive(Error, Debug)]
pub enum ClipboardError {
    #[error("there is nothing to copy")]
    NothingToCopy,

    #[error("no clipboard tool found (install pbcopy, wl-copy, xclip or xsel)")]
    Unavailable,

    #[error("{tool} failed: {message}")]
    CommandFailed { tool: String, message: String },
}

/// Destination for copied text
pub trait Clipboard: Send + Sync {
    fn copy(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Clipboard tools tried in order: (binary, args)
const CLIPBOARD_TOOLS: &[(&str, &[&str])] = &[
    ("pbcopy", &[]),
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
];

/// Clipboard backed by the platform's command-line tool
#[derive(Debug, Clone)]
pub struct SystemClipboard {
    tool: Option<(PathBuf, &'static [&'static str])>,
}

impl SystemClipboard {
    /// Look up the first available clipboard tool on PATH
    pub fn detect() -> Self {
        let tool = CLIPBOARD_TOOLS
            .iter()
            .find_map(|(name, args)| which::which(name).ok().map(|path| (path, *args)));

        match &tool {
            Some((path, _)) => tracing::debug!(tool = %path.display(), "Clipboard tool found"),
            None => tracing::debug!("No clipboard tool found"),
        }
        Self { tool }
    }

    pub fn is_available(&self) -> bool {
        self.tool.is_some()
    }
}

impl Clipboard for SystemClipboard {
    fn copy(&self, text: &str) -> Result<(), ClipboardError> {
        if text.trim().is_empty() {
            return Err(ClipboardError::NothingToCopy);
        }
        let (path, args) = self.tool.as_ref().ok_or(ClipboardError::Unavailable)?;
        let tool = path.display().to_string();
        let failed = |message: String| ClipboardError::CommandFailed {
            tool: tool.clone(),
            message,
        };

        let mut child = Command::new(path)
            .args(*args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| failed(e.to_string()))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .map_err(|e| failed(e.to_string()))?;
        }

        let output = child.wait_with_output().map_err(|e| failed(e.to_string()))?;
        if !output.status.success() {
            return Err(failed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(())
    }
}

/// In-memory clipboard for tests and headless runs
#[derive(Debug, Clone, Default)]
pub struct MockClipboard {
    /// Everything copied so far, oldest first
    pub copied: Arc<Mutex<Vec<String>>>,
}

impl MockClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<String> {
        self.copied.lock().ok()?.last().cloned()
    }
}

impl Clipboard for MockClipboard {
    fn copy(&self, text: &str) -> Result<(), ClipboardError> {
        if text.trim().is_empty() {
            return Err(ClipboardError::NothingToCopy);
        }
        let mut copied = self.copied.lock().map_err(|_| ClipboardError::Unavailable)?;
        copied.push(text.to_string());
        Ok(())
    }
}
