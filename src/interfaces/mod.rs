/// Interfaces Layer - External Entry Points
///
/// ## Modules
/// - `cli`: Command-line interface (main.rs logic)
/// - `demos`: the scenario behind each CLI subcommand

pub mod cli;
pub mod demos;
