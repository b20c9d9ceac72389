use am_cli::{Cli, Parser};
use am_local_db::Database;
use anyhow::Result;

fn main() {
    let cli = Cli::parse();

    let level = match cli.log_level.as_str() {
        "error" => tracing::Level::ERROR,
        "warn" => tracing::Level::WARN,
        "info" => tracing::Level::INFO,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        _ => tracing::Level::WARN,
    };
    tracing_subscriber::fmt().with_max_level(level).with_writer(std::io::stderr).init();

    if let Err(e) = run(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let db = match &cli.db_path {
        Some(path) => Database::open(path)?,
        None => Database::open_default()?,
    };
    cli.command.run(&db)
}
