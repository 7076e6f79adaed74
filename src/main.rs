use std::process::ExitCode;

use sirvd::runner::run_with_args;

fn main() -> ExitCode {
    match run_with_args() {
        Ok(output) => {
            println!("{}", output.result_path.display());
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("sirvd: {error}");
            ExitCode::FAILURE
        }
    }
}
