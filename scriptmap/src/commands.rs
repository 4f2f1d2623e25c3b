use crate::CLAP_STYLING;
use clap::{arg, command};
use scriptmap_core::data::DEFAULT_DATABASE_PATH;
use scriptmap_core::report::DEFAULT_EXPORT_PATH;

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("scriptmap")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("scriptmap")
        .styles(CLAP_STYLING)
        .about("Crawl a site and record every external script its pages reference")
        .override_usage(
            "scriptmap <URL>          crawl a site\n       \
             scriptmap list [URL]     list recorded scripts\n       \
             scriptmap save [PATH]    export the listing\n       \
             scriptmap empty          delete every record",
        )
        .arg(
            arg!(-q --"quiet" "Suppress banner and progress output")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(--"database" <PATH>)
                .required(false)
                .help("Location of the scripts database")
                .default_value(DEFAULT_DATABASE_PATH)
                .global(true),
        )
        .arg(
            arg!(--"log-level" <LEVEL>)
                .required(false)
                .help("Log verbosity: error, warn, info, debug, trace")
                .value_parser(["error", "warn", "info", "debug", "trace"])
                .default_value("warn")
                .global(true),
        )
        .arg(arg!([URL]).help("The URL to start crawling from"))
        .arg(
            arg!(--"depth" <DEPTH>)
                .required(false)
                .help("Maximum number of link hops from the start URL")
                .value_parser(clap::value_parser!(usize))
                .default_value("2"),
        )
        .arg(
            arg!(--"timeout" <SECONDS>)
                .required(false)
                .help("Per-page render timeout in seconds")
                .value_parser(clap::value_parser!(u64).range(1..))
                .default_value("30"),
        )
        .arg(
            arg!(--"breadth-first")
                .required(false)
                .help("Explore all links at one depth before going deeper (default: depth-first)")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            arg!(--"prefix-origin")
                .required(false)
                .help("Follow any link that merely starts with the start origin string")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            arg!(--"ignore-fragments")
                .required(false)
                .help("Treat URLs that differ only by #fragment as the same page")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            arg!(--"engine" <ENGINE>)
                .required(false)
                .help("Page renderer: plain HTTP, or headless Chrome (needs the `headless` feature)")
                .value_parser(["http", "chrome"])
                .default_value("http"),
        )
        .subcommand(
            command!("list")
                .about("List recorded scripts, grouped by script URL or for one page")
                .arg(arg!([URL]).help("Only list scripts referenced by this page")),
        )
        .subcommand(
            command!("save")
                .about("Write the grouped script listing to a file")
                .arg(
                    arg!([PATH])
                        .help("Output file")
                        .default_value(DEFAULT_EXPORT_PATH)
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Export format: text, json, markdown")
                        .value_parser(["text", "json", "markdown"])
                        .default_value("text"),
                ),
        )
        .subcommand(
            command!("empty")
                .about("Delete every recorded script reference")
                .arg(
                    arg!(--"purge")
                        .required(false)
                        .help("Remove the database file itself instead of only its records")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
}
