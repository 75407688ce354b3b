use std::fs;
use std::io::{self, BufReader, BufWriter};

use sugar::{Input, Output};


const STREAM_ARG: &str = "-";


/// Opens a file, or stdin for `-`, as a library input carrying the file name.
pub fn resolve_reader(raw_arg: &str) -> crate::Result<Input<'static>> {
    match raw_arg {
        STREAM_ARG => Ok(Input::new(BufReader::new(io::stdin()))),
        path => fs::File::open(path)
            .map_err(crate::Error::from)
            .map(|file| Input::new(BufReader::new(file)).with_filename(Some(path))),
    }
}

/// Creates a file, or uses stdout for `-`, as a library output carrying the file name.
pub fn resolve_writer(raw_arg: &str) -> crate::Result<Output<'static>> {
    match raw_arg {
        STREAM_ARG => Ok(Output::new(io::stdout())),
        path => fs::File::create(path)
            .map_err(crate::Error::from)
            .map(|file| Output::new(BufWriter::new(file)).with_filename(Some(path))),
    }
}
