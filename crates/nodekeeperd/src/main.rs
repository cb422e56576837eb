use std::process::ExitCode;

fn main() -> ExitCode {
    match nodekeeperd::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("nodekeeperd: {error}");
            ExitCode::FAILURE
        }
    }
}
