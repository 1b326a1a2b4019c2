use care_shim::cli::{handle_completions, handle_config_init, Cli, Commands, ConfigCommands};
use clap::Parser;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve(args) => care_shim::cli::serve::run_serve(args).await,
        Commands::Sync(args) => care_shim::cli::sync::run(args).await,
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Init(args) => handle_config_init(&args),
        },
        Commands::Completions(args) => {
            handle_completions(&args);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
