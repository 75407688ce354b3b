use clap::{App, Arg, ArgMatches, SubCommand};

use sugar::{parse_location, serialize_location};

use super::TEMPLATE_SUBCMD;

pub const NAME: &str = "loc";


pub fn build_cli<'a, 'b>() -> App<'a, 'b> {
    SubCommand::with_name(NAME)
        .about("Parses location expressions and prints their canonical form")
        .template(TEMPLATE_SUBCMD)
        .arg(Arg::with_name("expr")
                 .value_name("expr")
                 .help("Location expression, e.g. 'complement(join(1..10,20..30))'")
                 .takes_value(true)
                 .multiple(true)
                 .required(true))
}

pub fn run(args: &ArgMatches) -> crate::Result<()> {
    for expr in args.values_of("expr").into_iter().flatten() {
        let locs = parse_location(expr)?;
        let members: Vec<String> = locs.iter().map(|loc| loc.to_string()).collect();
        println!("{}\t{}", serialize_location(&locs), members.join(","));
    }
    Ok(())
}
