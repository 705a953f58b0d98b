//! Spinners and the readiness wait bar

use super::context::UiContext;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner around one provisioning step
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
    interactive: bool,
}

impl TaskSpinner {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            interactive: ctx.is_interactive(),
        }
    }

    pub fn start(&mut self, message: &str) {
        if self.interactive {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.spinner = Some(spinner);
        } else {
            println!("{} {}", style("...").dim(), message);
        }
    }

    pub fn stop(&mut self, message: &str) {
        match self.spinner.take() {
            Some(spinner) => spinner.stop(message),
            None => println!("{} {}", style("[OK]").green(), message),
        }
    }

    pub fn stop_error(&mut self, message: &str) {
        match self.spinner.take() {
            Some(spinner) => spinner.error(message),
            None => println!("{} {}", style("[FAIL]").red(), message),
        }
    }
}

/// Bar counting readiness checks while a function settles
pub struct WaitProgress {
    bar: Option<ProgressBar>,
}

impl WaitProgress {
    pub fn new(ctx: &UiContext, function: &str, attempts: u32) -> Self {
        let bar = if ctx.is_interactive() {
            let bar = ProgressBar::new(u64::from(attempts));
            if let Ok(bar_style) = ProgressStyle::default_bar().template(
                "  {spinner:.yellow} Waiting for {prefix}  {bar:20.yellow/dim} {pos}/{len} {msg:.dim}",
            ) {
                bar.set_style(
                    bar_style
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                        .progress_chars("━╸─"),
                );
            }
            bar.set_prefix(function.to_string());
            bar.enable_steady_tick(Duration::from_millis(120));
            Some(bar)
        } else {
            println!("Waiting for {} to become ready...", function);
            None
        };
        Self { bar }
    }

    /// Record one check that found the function not ready
    pub fn on_poll(&self, detail: &str) {
        match &self.bar {
            Some(bar) => {
                bar.inc(1);
                bar.set_message(detail.to_string());
            }
            None => println!("  state: {}", detail),
        }
    }

    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}
