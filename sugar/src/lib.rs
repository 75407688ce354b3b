//! Sequence features, compound locations and format-dispatched IO.
//!
//! The crate is built around three pieces:
//!
//! * the [`Location`] / [`LocationTuple`] model with its interval algebra,
//! * the location grammar ([`parse_location`], [`serialize_location`]) used by
//!   annotation formats such as GenBank,
//! * the format [`Registry`] and the dispatcher functions ([`read_fts`],
//!   [`iter_seqs`], [`write_fts`], ...) which route byte streams to the right
//!   plugin, sniffing the content when the caller does not name a format.
#![deny(
        trivial_casts, trivial_numeric_casts,
        unsafe_code,
        unstable_features,
        unused_import_braces, unused_qualifications)]
#![warn(unused_results)]

#[macro_use]
extern crate quick_error;
#[macro_use]
extern crate log;

use std::io;
use std::num::ParseIntError;

mod location;
pub use location::{Compound, Defect, Location, LocationError, LocationTuple, Strand};

mod grammar;
pub use grammar::{parse_location, serialize_location};

mod meta;
pub use meta::{Meta, Options, Value};

mod feature;
pub use feature::{Criterion, Feature, FeatureList, SelectError, SelectOp, SortKey};

mod seq;
pub use seq::Seq;

mod registry;
pub use registry::{install, registry, Capabilities, Capability, FormatError, FormatPlugin,
                   IterFn, ReadFn, Records, Registry, SniffFn, WriteAllFn, WriteOneFn};

mod dispatch;
pub use dispatch::{detect, detect_ext, iter_fts, iter_seqs, read_fts, read_seqs, write_fts,
                   write_fts_string, write_seqs, write_seqs_string, Input, Output, Resolution,
                   What, SNIFF_LEN};

pub mod io_fasta;
pub mod io_genbank;
pub mod io_gff;
pub mod io_sjson;


quick_error! {
    /// Errors that occur when decoding a single record of a stream.
    #[derive(Debug)]
    pub enum RecordError {
        /// Occurs when a record of the given format cannot be decoded.
        ///
        /// The index is the 1-based line number for line-oriented formats and the 1-based
        /// record ordinal otherwise.
        Malformed { format: &'static str, index: usize, reason: String } {
            display("malformed {} record at {}: {}", format, index, reason)
        }
    }
}

quick_error! {
    #[derive(Debug)]
    pub enum Error {
        Location(err: LocationError) {
            display("{}", err)
            from()
            source(err)
        }
        Format(err: FormatError) {
            display("{}", err)
            from()
            source(err)
        }
        Record(err: RecordError) {
            display("{}", err)
            from()
            source(err)
        }
        Select(err: SelectError) {
            display("{}", err)
            from()
            source(err)
        }
        Io(err: io::Error) {
            display("I/O error: {}", err)
            from()
            source(err)
        }
        Json(err: serde_json::Error) {
            display("JSON error: {}", err)
            from()
            source(err)
        }
        Csv(err: csv::Error) {
            display("CSV error: {}", err)
            from()
            source(err)
        }
        ParseInt(err: ParseIntError) {
            display("{}", err)
            from()
            source(err)
        }
    }
}

pub type Result<T> = ::std::result::Result<T, Error>;

impl Error {

    /// Creates a malformed-record error for the given format and position.
    pub(crate) fn malformed<T: Into<String>>(format: &'static str, index: usize, reason: T) -> Self {
        Error::Record(RecordError::Malformed { format, index, reason: reason.into() })
    }
}

// Crate-wide constants
mod consts {
    // Value for unknown columns and strands.
    pub(crate) const UNK_STR: &str = ".";

    // Commonly-used meta keys.
    pub(crate) const ID_KEY: &str = "id";
    pub(crate) const NAME_KEY: &str = "name";
    pub(crate) const FMT_KEY: &str = "_fmt";

    // Value for optionally known strings.
    pub(crate) const DEF_ID: &str = "<unknown>";
}

// Generic utilities
mod utils {

    /// Returns the lowercased extension of a file name, without the leading dot.
    #[inline]
    pub(crate) fn file_extension(fname: &str) -> Option<String> {
        ::std::path::Path::new(fname)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
    }

    /// Whether the buffer starts with the given prefix after skipping leading whitespace.
    #[inline]
    pub(crate) fn starts_with_ignoring_ws(buf: &[u8], prefix: &[u8], ignore_case: bool) -> bool {
        let start = buf.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(buf.len());
        let rest = &buf[start..];
        if rest.len() < prefix.len() {
            return false;
        }
        if ignore_case {
            rest[..prefix.len()].eq_ignore_ascii_case(prefix)
        } else {
            &rest[..prefix.len()] == prefix
        }
    }

}
