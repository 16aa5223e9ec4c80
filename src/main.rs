use std::process::ExitCode;

use pr_bullet::ui::output;

fn main() -> ExitCode {
    match pr_bullet::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(render(&e));
            ExitCode::FAILURE
        }
    }
}

/// Join the error chain, skipping causes the outer message already includes.
fn render(error: &anyhow::Error) -> String {
    let mut message = error.to_string();
    for cause in error.chain().skip(1) {
        let cause = cause.to_string();
        if !message.contains(&cause) {
            message = format!("{}: {}", message, cause);
        }
    }
    message
}
