use std::process::ExitCode;

use tracing::error;

mod bootstrap;
mod runner;
mod scenario;

pub(crate) fn run() -> ExitCode {
    let app = match bootstrap::build_app() {
        Ok(app) => app,
        Err(message) => {
            error!(error = %message, "startup_failed");
            return ExitCode::FAILURE;
        }
    };
    runner::run(app)
}
