/*! Reader and writer for the FASTA format.

FASTA files hold sequences only: a `>` header line with the identifier and an optional
description, followed by the sequence lines. Parsing is delegated to the FASTA reader of
[rust-bio](https://github.com/rust-bio/rust-bio).
*/
use std::io::{BufRead, Write};

use bio::io::fasta;

use crate::meta::Options;
use crate::registry::{Capabilities, FormatPlugin, Records};
use crate::seq::Seq;
use crate::utils::starts_with_ignoring_ws;


/// Name of the format in the registry.
pub const FORMAT: &str = "fasta";

/// Metadata key of the header description.
pub const DESC_KEY: &str = "description";

/// Creates the registry entry of the format.
pub fn plugin() -> FormatPlugin {
    FormatPlugin {
        name: FORMAT,
        description: "FASTA sequences",
        binary: false,
        priority: 10,
        sniff: Some(sniff),
        extensions: &["fasta", "fa", "fna", "faa", "fas"],
        seqs: Capabilities {
            iter: Some(iter_seqs),
            write_one: Some(write_seq),
            ..Capabilities::none()
        },
        fts: Capabilities::none(),
    }
}

/// Whether the first non-blank byte starts a header line.
pub fn sniff(buf: &[u8]) -> bool {
    starts_with_ignoring_ws(buf, b">", false)
}

fn iter_seqs<'a>(stream: Box<dyn BufRead + 'a>, _opts: &Options) -> Records<'a, Seq> {
    Box::new(Reader::from_reader(stream).seqs_stream())
}

fn write_seq(seq: &Seq, stream: &mut dyn Write, opts: &Options) -> crate::Result<()> {
    let width = opts.parse::<usize>("width")?;
    let mut writer = Writer::from_writer(stream);
    let _ = writer.width(width);
    writer.write_seq(seq)
}

/// FASTA reader.
pub struct Reader<R: BufRead> {
    inner: fasta::Reader<R>,
}

impl<R: BufRead> Reader<R> {

    /// Creates a FASTA reader from a buffered reader.
    pub fn from_reader(in_reader: R) -> Reader<R> {
        Reader { inner: fasta::Reader::from_bufread(in_reader) }
    }

    /// Turns the reader into an iterator over sequences.
    pub fn seqs_stream(self) -> FastaSeqsStream<R> {
        FastaSeqsStream { inner: self.inner.records(), index: 0 }
    }
}

/// Iterator over FASTA sequences.
pub struct FastaSeqsStream<R: BufRead> {
    inner: fasta::Records<R>,
    index: usize,
}

impl<R: BufRead> Iterator for FastaSeqsStream<R> {

    type Item = crate::Result<Seq>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.inner.next()?;
        self.index += 1;
        let index = self.index;
        Some(record
            .map_err(|e| crate::Error::malformed(FORMAT, index, e.to_string()))
            .map(|rec| {
                let mut seq = Seq::new(Some(rec.id()), &*String::from_utf8_lossy(rec.seq()));
                if let Some(desc) = rec.desc() {
                    let _ = seq.meta.insert(DESC_KEY, desc);
                }
                seq
            }))
    }
}

/// FASTA writer.
pub struct Writer<W: Write> {
    inner: W,
    width: Option<usize>,
}

impl<W: Write> Writer<W> {

    /// Creates a FASTA writer from another writer.
    pub fn from_writer(in_writer: W) -> Writer<W> {
        Writer { inner: in_writer, width: None }
    }

    /// Sets the maximum length of sequence lines; `None` writes each sequence on one line.
    pub fn width(&mut self, width: Option<usize>) -> &mut Self {
        self.width = width.filter(|&w| w > 0);
        self
    }

    /// Writes the given sequence as one record.
    pub fn write_seq(&mut self, seq: &Seq) -> crate::Result<()> {
        write!(self.inner, ">{}", seq.id_or_default())?;
        if let Some(desc) = seq.description() {
            write!(self.inner, " {}", desc)?;
        }
        writeln!(self.inner)?;
        match self.width {
            Some(width) => {
                for line in seq.data.as_bytes().chunks(width) {
                    self.inner.write_all(line)?;
                    writeln!(self.inner)?;
                }
            },
            None => writeln!(self.inner, "{}", seq.data)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_records() {
        let data = b">seq1 first one\nACGT\nAC\n>seq2\nTT\n";
        let seqs = Reader::from_reader(&data[..]).seqs_stream()
            .collect::<crate::Result<Vec<Seq>>>()
            .unwrap();
        assert_eq!(seqs.len(), 2);
        assert_eq!(seqs[0].id.as_deref(), Some("seq1"));
        assert_eq!(seqs[0].data, "ACGTAC");
        assert_eq!(seqs[0].description(), Some("first one"));
        assert_eq!(seqs[1].description(), None);
    }

    #[test]
    fn write_wrapped() {
        let mut seq = Seq::new(Some("s"), "ACGTA");
        let _ = seq.meta.insert(DESC_KEY, "d");
        let mut buf = Vec::new();
        {
            let mut writer = Writer::from_writer(&mut buf);
            let _ = writer.width(Some(2));
            writer.write_seq(&seq).unwrap();
        }
        assert_eq!(String::from_utf8(buf).unwrap(), ">s d\nAC\nGT\nA\n");
    }

    #[test]
    fn sniffing() {
        assert!(sniff(b"\n\n>seq1\nACGT\n"));
        assert!(!sniff(b"LOCUS  x"));
    }
}
