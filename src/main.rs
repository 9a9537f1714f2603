use std::process::ExitCode;

use bucketsync::cli;

#[tokio::main]
async fn main() -> ExitCode {
    cli::main().await
}
