// Chordscope - chord and key identification for live and recorded MIDI
// Main library entry point

pub mod analysis;
pub mod cli;
pub mod config;
pub mod theory;
pub mod tracking;

pub use theory::{find_chords, find_key, ChordCatalog, PitchClassSet, ProfilePair, TheoryError};

/// Run the command line front end with the given arguments (program name excluded).
pub fn run(args: Vec<String>) -> anyhow::Result<()> {
    env_logger::init();

    let invocation = cli::parse_args(&args)?;
    let config_path = invocation
        .config_path
        .clone()
        .unwrap_or_else(config::default_config_path);
    let config = config::Config::load_or_default(&config_path);

    cli::execute(invocation.command, &config)
}
