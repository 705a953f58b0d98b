//! Console output for the operator CLI
//!
//! Interactive terminals get `cliclack` prompts and spinners; CI and piped
//! output fall back to plain tagged lines.

mod context;
mod output;
mod progress;
mod prompts;
mod theme;

pub use context::UiContext;
pub use output::{
    intro, key_value, log_block, outro_error, outro_success, section, step_info, step_ok,
    step_ok_detail, step_warn,
};
pub use progress::{TaskSpinner, WaitProgress};
pub use prompts::confirm;
pub use theme::{init_theme, DeployTheme};
