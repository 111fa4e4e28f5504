use astrolabe::Cli;
use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(error) = astrolabe::run(cli).await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}
