use clap::Parser;
use habit_app::{
    app::AppConfig,
    cli::{run, Cli},
};
use tracing_subscriber::EnvFilter;

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();
    let config = AppConfig::from_env().unwrap_or_default();
    let mut stdout = std::io::stdout().lock();
    if let Err(err) = run(config, cli.command, &mut stdout) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
