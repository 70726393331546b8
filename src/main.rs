use clap::Parser;
use crawler::cli::{Cli, Commands};
use crawler::output::Printer;
use crawler::project::Direction;
use miette::Result;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    let printer = Printer::new(cli.global.verbose > 0);
    let global = &cli.global;

    match cli.command {
        Commands::List(args) => crawler::cli::list::run(args, global, &printer)?,
        Commands::Check(args) => crawler::cli::check::run(args, global, &printer)?,
        Commands::ToFamily(args) => {
            crawler::cli::migrate::run(Direction::ToFamily, args, global, &printer)?
        }
        Commands::ToMembers(args) => {
            crawler::cli::migrate::run(Direction::ToMembers, args, global, &printer)?
        }
        Commands::Completions(args) => crawler::cli::completions::run(args)?,
    }

    Ok(())
}

/// 0 = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ = trace. RUST_LOG wins if set.
fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();
}
