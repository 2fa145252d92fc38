use clap::Parser;
use color_eyre::Result;
use lanes::{
    cli::{self, Cli, Commands, TerminalUi},
    logging, Board, Config, Profile, SqliteStore, SystemClock,
};
use std::path::Path;

fn main() -> Result<()> {
    // Set up error reporting with color-eyre
    color_eyre::install()?;

    let cli = Cli::parse();

    // Determine profile: --dev flag enables dev mode, otherwise use prod
    let profile = if cli.dev {
        Profile::Dev
    } else {
        Profile::Prod
    };

    let config = match &cli.config {
        Some(path) => Config::load_from_path(Path::new(path))?,
        None => Config::load_with_profile(profile)?,
    };

    // A board without file logs is still usable
    if let Err(err) = logging::init_logging(&config.log_level, &config.get_log_dir()) {
        eprintln!("Warning: file logging disabled: {}", err);
    }

    let db_path = config.get_database_path();
    let store = SqliteStore::new(
        db_path
            .to_str()
            .ok_or_else(|| color_eyre::eyre::eyre!("Database path contains invalid UTF-8"))?,
    )?;

    let mut board = Board::init(
        store,
        TerminalUi::new(cli.yes),
        Box::new(SystemClock),
        config.board_settings(),
    );

    let result = cli::execute(&mut board, cli.command.unwrap_or(Commands::Shell));
    board.teardown();
    result?;

    Ok(())
}
