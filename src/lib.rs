//! Novel Wizard - a license-gated, five-step terminal wizard for drafting a
//! novel's background and chapter outline.
//!
//! The business logic (`steps`, `state`, `auth`, `wizard`) has no terminal
//! dependency; `app` and `ui` put a ratatui front end on top of it.

pub mod app;
pub mod auth;
pub mod config;
pub mod export;
pub mod logging;
pub mod state;
pub mod steps;
pub mod storage;
pub mod templates;
pub mod ui;
pub mod wizard;
