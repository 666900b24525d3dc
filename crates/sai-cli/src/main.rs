//! Binary entry point; delegates to [`sai_cli::run`].

#[tokio::main]
async fn main() {
    let exit_code = sai_cli::run().await;
    std::process::exit(exit_code);
}
