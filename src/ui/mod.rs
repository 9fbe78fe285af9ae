pub mod auth_panel;
pub mod form_field;
pub mod progress;
mod terminal_guard;
pub mod wizard_view;

pub use auth_panel::{AuthPanel, AuthPanelAction};
pub use progress::{ProgressAnimation, ProgressFrame};
pub use terminal_guard::{install_panic_hook, TerminalGuard, Tui};
pub use wizard_view::{StatusMessage, WizardView};
