use std::process::ExitCode;

mod app;

fn main() -> ExitCode {
    let app = app::build_app();
    app::run(app)
}
