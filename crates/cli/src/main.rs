use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    confetti_cli::run().await
}
