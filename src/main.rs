fn main() {
    if let Err(err) = crashtest::cli::run() {
        if crashtest::ui::running_in_github_actions() {
            crashtest::ui::emit_github_error(&err);
        }
        crashtest::ui::eprintln_error(&err);
        std::process::exit(crashtest::exit::exit_code(&err));
    }
}
