use clap::Parser;
use facevault::cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

/// Environment variable controlling log verbosity (e.g. `debug`, `facevault=trace`).
const LOG_ENV: &str = "FACEVAULT_LOG";

fn main() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => facevault::cli::commands::init::execute(&cli),
        Commands::Verify => facevault::cli::commands::verify::execute(&cli),
        Commands::Enroll {
            ref name,
            ref vector_file,
        } => facevault::cli::commands::enroll::execute(&cli, name, vector_file),
        Commands::Show { ref name } => facevault::cli::commands::show::execute(&cli, name),
        Commands::List => facevault::cli::commands::list::execute(&cli),
        Commands::Remove { ref name, force } => {
            facevault::cli::commands::remove::execute(&cli, name, force)
        }
        Commands::RotatePassword => facevault::cli::commands::rotate::execute(&cli),
        Commands::Info => facevault::cli::commands::info::execute(&cli),
    };

    if let Err(e) = result {
        facevault::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
