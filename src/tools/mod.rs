//! Functions invoked by the subcommands.

use clap::{Arg, ArgMatches};
use sugar::{Options, What};

pub mod convert;
pub mod detect;
pub mod loc;

const TEMPLATE_SUBCMD: &str = "
USAGE:
    {usage}

ARGS:
{positionals}

OPTIONS:
{unified}";

/// Flag switching a tool from sequences to features.
fn fts_arg<'a, 'b>() -> Arg<'a, 'b> {
    Arg::with_name("fts")
        .long("fts")
        .help("Handles feature annotations instead of sequences")
}

fn what(args: &ArgMatches) -> What {
    if args.is_present("fts") { What::Fts } else { What::Seqs }
}

/// Collects repeated `-o key=value` arguments.
fn options(args: &ArgMatches) -> crate::Result<Options> {
    let pairs: Vec<&str> = args.values_of("option").map(|v| v.collect()).unwrap_or_default();
    Options::from_pairs(pairs.iter().cloned()).ok_or_else(|| {
        let bad = pairs.iter().find(|p| !p.contains('=')).cloned().unwrap_or_default();
        crate::Error::InvalidOption(bad.to_owned())
    })
}
