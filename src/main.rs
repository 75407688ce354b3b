#[macro_use]
extern crate clap;
#[macro_use]
extern crate log;
#[macro_use]
extern crate quick_error;
extern crate sugar;

use std::env;
use std::io::{self, Write};
use std::process;

use log::LevelFilter;

mod cli;
mod tools;
mod utils;


quick_error! {
    #[derive(Debug)]
    pub enum Error {
        Sugar(err: sugar::Error) {
            display("{}", err)
            from()
            source(err)
        }
        Location(err: sugar::LocationError) {
            display("{}", err)
            from()
            source(err)
        }
        Io(err: io::Error) {
            display("I/O error: {}", err)
            from()
            source(err)
        }
        InvalidOption(pair: String) {
            display("invalid option '{}', expected key=value", pair)
        }
    }
}

pub type Result<T> = ::std::result::Result<T, Error>;

fn init_logging(verbosity: u64) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(level);
    if let Ok(filters) = env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

fn main() {
    let matches = cli::build_cli().get_matches();
    init_logging(matches.occurrences_of("verbose"));
    if let Err(err) = cli::run(matches) {
        let _ = writeln!(io::stderr(), "error: {}", err);
        process::exit(1);
    }
    process::exit(0);
}
