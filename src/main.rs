use clap::Parser;
use taskpanel::cli::commands::Cli;
use taskpanel::cli::handlers;
use taskpanel::logging;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    logging::init(&handlers::log_directive(cli.workspace_dir.as_deref()));

    if let Err(e) = handlers::dispatch(cli).await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
