use std::process::ExitCode;

fn main() -> ExitCode {
    bootstrapper_lib::run()
}
