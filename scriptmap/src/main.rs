use clap::ArgMatches;
use colored::Colorize;
use scriptmap::commands::command_argument_builder;
use scriptmap::handlers::{
    CliError, expand_database_path, handle_crawl, handle_empty, handle_list, handle_purge, handle_save,
    init_tracing, open_database, parse_start_url, summary_status,
};
use scriptmap_core::print_banner;
use std::path::PathBuf;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let mut cmd = command_argument_builder();
    let chosen_command = match cmd.try_get_matches_from_mut(std::env::args_os()) {
        Ok(matches) => matches,
        Err(e) => {
            // --help and --version land here too, with a zero exit code
            let _ = e.print();
            return ExitCode::from(e.exit_code() as u8);
        }
    };

    if chosen_command.get_one::<String>("URL").is_none() && chosen_command.subcommand().is_none() {
        let _ = cmd.print_help();
        return ExitCode::SUCCESS;
    }

    // Global flags are read from the innermost matches
    let scoped = chosen_command
        .subcommand()
        .map(|(_, sub)| sub)
        .unwrap_or(&chosen_command);
    let quiet = scoped.get_flag("quiet");
    let level = scoped
        .get_one::<String>("log-level")
        .map(String::as_str)
        .unwrap_or("warn");
    init_tracing(level);

    match run(&chosen_command, scoped, quiet).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(chosen_command: &ArgMatches, scoped: &ArgMatches, quiet: bool) -> Result<(), CliError> {
    let db_path = expand_database_path(
        scoped
            .get_one::<String>("database")
            .map(String::as_str)
            .unwrap_or(scriptmap_core::data::DEFAULT_DATABASE_PATH),
    );
    let url = chosen_command.get_one::<String>("URL");

    match (url, chosen_command.subcommand()) {
        (Some(_), Some((name, _))) => Err(CliError::Usage(format!(
            "a start URL cannot be combined with the '{}' command",
            name
        ))),
        (Some(url), None) => {
            if !quiet {
                print_banner();
            }
            let url = parse_start_url(url)?;
            let mut db = open_database(&db_path)?;
            let summary = handle_crawl(&mut db, &url, chosen_command).await?;
            summary_status(&summary)?;
            println!("{}", "Crawling finished".green().bold());
            Ok(())
        }
        (None, Some(("list", args))) => {
            let db = open_database(&db_path)?;
            let page_url = args.get_one::<String>("URL").map(String::as_str);
            print!("{}", handle_list(&db, page_url)?);
            Ok(())
        }
        (None, Some(("save", args))) => {
            let db = open_database(&db_path)?;
            let path = args
                .get_one::<PathBuf>("PATH")
                .cloned()
                .unwrap_or_else(|| PathBuf::from(scriptmap_core::report::DEFAULT_EXPORT_PATH));
            let format = args
                .get_one::<String>("format")
                .map(String::as_str)
                .unwrap_or("text");
            let groups = handle_save(&db, &path, format)?;
            println!(
                "{} Saved {} script(s) to {}",
                "✓".green().bold(),
                groups,
                path.display()
            );
            Ok(())
        }
        (None, Some(("empty", args))) if args.get_flag("purge") => {
            if handle_purge(&db_path)? {
                println!("{} Removed {}", "✓".green().bold(), db_path.display());
            } else {
                println!("No database at {}", db_path.display());
            }
            Ok(())
        }
        (None, Some(("empty", _))) => {
            let db = open_database(&db_path)?;
            let removed = handle_empty(&db)?;
            println!("{} Removed {} record(s)", "✓".green().bold(), removed);
            Ok(())
        }
        _ => unreachable!("clap should ensure we don't get here"),
    }
}
