//! Step and summary output

use super::context::UiContext;
use console::style;

/// Banner at the start of a command
pub fn intro(ctx: &UiContext, title: &str) {
    if ctx.is_interactive() {
        cliclack::intro(style(title).yellow().bold()).ok();
    } else {
        println!("{}\n", style(title).bold());
    }
}

pub fn outro_success(ctx: &UiContext, message: &str) {
    if ctx.is_interactive() {
        cliclack::outro(style(message).green().bold()).ok();
    } else {
        println!("\n{} {}", style("[OK]").green(), message);
    }
}

pub fn outro_error(ctx: &UiContext, message: &str) {
    if ctx.is_interactive() {
        cliclack::outro(style(message).red().bold()).ok();
    } else {
        println!("\n{} {}", style("[ERROR]").red(), message);
    }
}

pub fn section(ctx: &UiContext, title: &str) {
    println!();
    if ctx.is_interactive() {
        cliclack::log::info(style(title).bold()).ok();
    } else {
        println!("{}", style(title).bold());
    }
}

pub fn step_ok(ctx: &UiContext, message: &str) {
    if ctx.is_interactive() {
        cliclack::log::success(message).ok();
    } else {
        println!("  {} {}", style("[OK]").green(), message);
    }
}

pub fn step_ok_detail(ctx: &UiContext, message: &str, detail: &str) {
    if ctx.is_interactive() {
        cliclack::log::success(format!("{} ({})", message, style(detail).dim())).ok();
    } else {
        println!("  {} {} ({})", style("[OK]").green(), message, detail);
    }
}

pub fn step_warn(ctx: &UiContext, message: &str) {
    if ctx.is_interactive() {
        cliclack::log::warning(message).ok();
    } else {
        println!("  {} {}", style("[WARN]").yellow(), message);
    }
}

pub fn step_info(ctx: &UiContext, message: &str) {
    if ctx.is_interactive() {
        cliclack::log::info(message).ok();
    } else {
        println!("  {} {}", style("[INFO]").cyan(), message);
    }
}

pub fn key_value(ctx: &UiContext, key: &str, value: &str) {
    if ctx.is_interactive() {
        println!("  {}: {}", style(key).dim(), value);
    } else {
        println!("  {}: {}", key, value);
    }
}

/// Multi-line text such as a remote execution log
pub fn log_block(ctx: &UiContext, title: &str, text: &str) {
    let text = text.trim_end();
    if ctx.is_interactive() {
        cliclack::note(title, text).ok();
    } else {
        println!("{}:", style(title).bold());
        for line in text.lines() {
            println!("  | {}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_output_does_not_panic() {
        let ctx = UiContext::non_interactive();
        intro(&ctx, "lambda-lambda setup");
        section(&ctx, "Provisioning");
        step_ok_detail(&ctx, "Uploaded package", "s3://deploys/f/lambda-function.zip");
        step_warn(&ctx, "Role created");
        log_block(&ctx, "Execution log", "START\nSuccessfully installed dulwich\nEND\n");
        outro_success(&ctx, "Done");
    }
}
