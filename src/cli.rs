use clap::{App, AppSettings, Arg, ArgMatches};

use crate::tools;

const TEMPLATE: &str = "
{bin} {version}
{about}


USAGE:
    {usage}

SUBCOMMANDS:
{subcommands}

OPTIONS:
{unified}";

const ABOUT: &str = "
sugartools detects, converts and inspects sequence and feature annotation
files (FASTA, GenBank, GFF3 and sjson). Set RUST_LOG or pass -v for log
output.";

/// Constructs a new `clap::App` for argument parsing.
pub fn build_cli() -> App<'static, 'static> {
    App::new("sugartools")
        .version(crate_version!())
        .author(crate_authors!())
        .about(ABOUT)
        .template(TEMPLATE)
        .max_term_width(80)
        .settings(&[AppSettings::GlobalVersion,
                    AppSettings::SubcommandRequiredElseHelp,
                    AppSettings::DisableHelpSubcommand,
                    AppSettings::VersionlessSubcommands])
        .arg(Arg::with_name("verbose")
                 .short("v")
                 .long("verbose")
                 .multiple(true)
                 .global(true)
                 .help("Raises the log level, may be repeated"))
        .subcommand(tools::detect::build_cli())
        .subcommand(tools::convert::build_cli())
        .subcommand(tools::loc::build_cli())
}

/// Runs the appropriate tool given the subcommand argument matches.
pub fn run(matches: ArgMatches) -> crate::Result<()> {
    match matches.subcommand() {
        (tools::detect::NAME, Some(m)) => tools::detect::run(m),
        (tools::convert::NAME, Some(m)) => tools::convert::run(m),
        (tools::loc::NAME, Some(m)) => tools::loc::run(m),
        // We should not reach this point since we already require
        // that subcommands must be present in the app settings.
        (other, _) => unreachable!("unexpected subcommand '{}'", other),
    }
}
