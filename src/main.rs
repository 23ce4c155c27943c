/// Main entry point for the event-patterns application
///
/// This serves as a thin wrapper that delegates to the interfaces layer.
/// The actual application logic is implemented in `interfaces::cli`.

use event_patterns::interfaces::cli;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run().await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
