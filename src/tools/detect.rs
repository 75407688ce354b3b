use clap::{App, Arg, ArgMatches, SubCommand};

use super::{fts_arg, what, TEMPLATE_SUBCMD};
use crate::utils::resolve_reader;

pub const NAME: &str = "detect";


pub fn build_cli<'a, 'b>() -> App<'a, 'b> {
    SubCommand::with_name(NAME)
        .about("Prints the format of a sequence or feature file")
        .template(TEMPLATE_SUBCMD)
        .arg(fts_arg())
        .arg(Arg::with_name("input")
                 .value_name("input")
                 .help("Path to input file or '-' for stdin")
                 .takes_value(true)
                 .required(true))
}

pub fn run(args: &ArgMatches) -> crate::Result<()> {
    let mut input = resolve_reader(args.value_of("input").unwrap_or("-"))?;
    let (name, resolution) = sugar::detect(&mut input, what(args))?;
    info!("format of {} resolved by {:?}", input.filename().unwrap_or("stdin"), resolution);
    println!("{}", name);
    Ok(())
}
