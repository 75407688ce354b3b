use clap::{App, Arg, ArgMatches, SubCommand};

use sugar::What;

use super::{fts_arg, options, what, TEMPLATE_SUBCMD};
use crate::utils::{resolve_reader, resolve_writer};

pub const NAME: &str = "convert";


pub fn build_cli<'a, 'b>() -> App<'a, 'b> {
    SubCommand::with_name(NAME)
        .about("Converts between sequence or feature formats")
        .template(TEMPLATE_SUBCMD)
        .arg(fts_arg())
        .arg(Arg::with_name("from")
                 .short("f")
                 .long("from")
                 .value_name("format")
                 .help("Input format, detected from the content when missing")
                 .takes_value(true))
        .arg(Arg::with_name("to")
                 .short("t")
                 .long("to")
                 .value_name("format")
                 .help("Output format, taken from the output extension when missing")
                 .takes_value(true))
        .arg(Arg::with_name("option")
                 .short("o")
                 .long("option")
                 .value_name("key=value")
                 .help("Format option passed to reader and writer, may be repeated")
                 .takes_value(true)
                 .multiple(true)
                 .number_of_values(1))
        .arg(Arg::with_name("input")
                 .value_name("input")
                 .help("Path to input file or '-' for stdin")
                 .takes_value(true)
                 .required(true))
        .arg(Arg::with_name("output")
                 .value_name("output")
                 .help("Path to output file or '-' for stdout")
                 .takes_value(true)
                 .required(true))
}

pub fn run(args: &ArgMatches) -> crate::Result<()> {
    let opts = options(args)?;
    let input = resolve_reader(args.value_of("input").unwrap_or("-"))?;
    let output = resolve_writer(args.value_of("output").unwrap_or("-"))?;
    let (from, to) = (args.value_of("from"), args.value_of("to"));

    match what(args) {
        What::Seqs => {
            let seqs = sugar::read_seqs(input, from, &opts)?;
            info!("converting {} sequences", seqs.len());
            sugar::write_seqs(&seqs, output, to, &opts)?;
        },
        What::Fts => {
            let fts = sugar::read_fts(input, from, &opts)?;
            info!("converting {} features", fts.len());
            sugar::write_fts(&fts, output, to, &opts)?;
        },
    }
    Ok(())
}
