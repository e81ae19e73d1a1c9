use std::process::ExitCode;

fn main() -> ExitCode {
    storeops_cli::run()
}
