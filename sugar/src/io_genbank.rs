/*! Reader and writer for the GenBank flat file format.

A GenBank file is a series of records, each made of a header (`LOCUS`, `DEFINITION`, ...), a
feature table and the sequence after `ORIGIN`, terminated by `//`. Feature locations are parsed
with [`parse_location`] and written with [`serialize_location`].

The format is described in the [GenBank release notes](https://www.ncbi.nlm.nih.gov/genbank/release/).

Feature qualifiers are kept in the `_genbank` metadata map of each feature, repeated qualifiers
as lists. The header lines other than `LOCUS` and `DEFINITION` are kept verbatim in the
`_genbank` map of the sequence, under `header`.
*/
use std::io::{BufRead, Write};

use itertools::Itertools;

use crate::consts::DEF_ID;
use crate::feature::{Feature, FeatureList, SortKey};
use crate::grammar::{parse_location, serialize_location};
use crate::meta::{Meta, Options, Value};
use crate::registry::{Capabilities, FormatPlugin, Records};
use crate::seq::Seq;
use crate::utils::starts_with_ignoring_ws;


/// Name of the format in the registry.
pub const FORMAT: &str = "genbank";

/// Metadata key of the GenBank-specific attributes.
pub const GENBANK_KEY: &str = "_genbank";

/// Key of the verbatim header lines within the sequence's `_genbank` map.
pub const HEADER_KEY: &str = "header";

/// Metadata key of the record definition.
pub const DESC_KEY: &str = "description";

/// Column at which feature locations and qualifiers start.
const QUALIFIER_INDENT: usize = 21;

/// Maximum line width of the feature table.
const LINE_WIDTH: usize = 79;

/// Qualifier whose wrapped lines are joined without spaces.
const TRANSLATION: &str = "translation";

/// Creates the registry entry of the format.
pub fn plugin() -> FormatPlugin {
    FormatPlugin {
        name: FORMAT,
        description: "GenBank flat file",
        binary: false,
        priority: 20,
        sniff: Some(sniff),
        extensions: &["gb", "gbk", "genbank"],
        seqs: Capabilities {
            iter: Some(iter_seqs),
            write_one: Some(write_seq),
            ..Capabilities::none()
        },
        fts: Capabilities {
            iter: Some(iter_fts),
            write_all: Some(write_fts),
            ..Capabilities::none()
        },
    }
}

/// Whether the content starts with a `LOCUS` line.
pub fn sniff(buf: &[u8]) -> bool {
    starts_with_ignoring_ws(buf, b"LOCUS", true)
}

fn reader<'a>(stream: Box<dyn BufRead + 'a>, opts: &Options) -> Reader<Box<dyn BufRead + 'a>> {
    let exclude = opts.list("exclude");
    let mut reader = Reader::from_reader(stream);
    let _ = reader
        .exclude_translation(exclude.contains(&TRANSLATION))
        .exclude_seq(exclude.contains(&"seq"));
    reader
}

fn iter_seqs<'a>(stream: Box<dyn BufRead + 'a>, opts: &Options) -> Records<'a, Seq> {
    Box::new(reader(stream, opts).seqs_stream())
}

fn iter_fts<'a>(stream: Box<dyn BufRead + 'a>, opts: &Options) -> Records<'a, Feature> {
    let mut reader = reader(stream, opts);
    let _ = reader.exclude_seq(true);
    Box::new(reader.fts_stream())
}

fn write_seq(seq: &Seq, stream: &mut dyn Write, _opts: &Options) -> crate::Result<()> {
    Writer::from_writer(stream).write_seq(seq)
}

fn write_fts(fts: &[Feature], stream: &mut dyn Write, _opts: &Options) -> crate::Result<()> {
    Writer::from_writer(stream).write_fts(fts)
}

/// GenBank reader.
pub struct Reader<R: BufRead> {
    inner: R,
    exclude_translation: bool,
    exclude_seq: bool,
}

impl<R: BufRead> Reader<R> {

    /// Creates a GenBank reader from a buffered reader.
    pub fn from_reader(in_reader: R) -> Reader<R> {
        Reader { inner: in_reader, exclude_translation: false, exclude_seq: false }
    }

    /// Sets whether `/translation` qualifiers are dropped.
    pub fn exclude_translation(&mut self, exclude: bool) -> &mut Self {
        self.exclude_translation = exclude;
        self
    }

    /// Sets whether sequence data is skipped.
    pub fn exclude_seq(&mut self, exclude: bool) -> &mut Self {
        self.exclude_seq = exclude;
        self
    }

    /// Turns the reader into an iterator over sequence records.
    pub fn seqs_stream(self) -> GenBankSeqsStream<R> {
        GenBankSeqsStream {
            inner: self.inner,
            exclude_translation: self.exclude_translation,
            exclude_seq: self.exclude_seq,
            line_no: 0,
            done: false,
        }
    }

    /// Turns the reader into an iterator over the features of all records.
    pub fn fts_stream(self) -> GenBankFeaturesStream<R> {
        GenBankFeaturesStream { inner: self.seqs_stream(), current: Vec::new().into_iter() }
    }
}

/// Section of a record being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Header,
    Definition,
    Features,
    Origin,
}

/// Feature table entry before its location and qualifiers are decoded.
#[derive(Debug)]
struct RawFeature {
    ftype: String,
    location: String,
    line_no: usize,
    // Qualifier name and raw value, with quotes.
    qualifiers: Vec<(String, Option<String>)>,
}

impl RawFeature {

    fn open_qualifier(&mut self) -> Option<&mut String> {
        self.qualifiers.last_mut()
            .and_then(|(_, value)| value.as_mut())
            .filter(|value| value.starts_with('"') && value.matches('"').count() % 2 == 1)
    }

    fn into_feature(self, seqid: Option<&str>, exclude_translation: bool)
        -> crate::Result<Feature>
    {
        let line_no = self.line_no;
        let locs = parse_location(&self.location)
            .map_err(|e| crate::Error::malformed(FORMAT, line_no, e.to_string()))?;
        let mut quals = Meta::new();
        for (key, raw) in self.qualifiers {
            if exclude_translation && key == TRANSLATION {
                continue;
            }
            let value = decode_value(raw);
            match quals.get_mut(&key) {
                Some(Value::List(items)) => items.push(value),
                Some(existing) => {
                    let first = ::std::mem::replace(existing, Value::Bool(false));
                    *existing = Value::List(vec![first, value]);
                },
                None => {
                    let _ = quals.insert(key, value);
                },
            }
        }
        let mut meta = Meta::new();
        if !quals.is_empty() {
            let _ = meta.insert(GENBANK_KEY, quals);
        }
        Ok(Feature::new(self.ftype, locs).with_meta(meta).with_seqid(seqid))
    }
}

/// Decodes a raw qualifier value: flags become `true`, unquoted integers numbers.
fn decode_value(raw: Option<String>) -> Value {
    match raw {
        None => Value::Bool(true),
        Some(raw) => {
            if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
                Value::Str(raw[1..raw.len() - 1].replace("\"\"", "\""))
            } else if let Ok(num) = raw.parse::<i64>() {
                Value::Int(num)
            } else {
                Value::Str(raw)
            }
        },
    }
}

/// Iterator over GenBank records.
pub struct GenBankSeqsStream<R: BufRead> {
    inner: R,
    exclude_translation: bool,
    exclude_seq: bool,
    line_no: usize,
    done: bool,
}

impl<R: BufRead> GenBankSeqsStream<R> {

    fn malformed<T: Into<String>>(&mut self, reason: T) -> crate::Error {
        self.done = true;
        crate::Error::malformed(FORMAT, self.line_no, reason)
    }

    fn read_record(&mut self) -> crate::Result<Option<Seq>> {
        let mut seq: Option<Seq> = None;
        let mut section = Section::Header;
        let mut header: Vec<String> = Vec::new();
        let mut description: Vec<String> = Vec::new();
        let mut raw_fts: Vec<RawFeature> = Vec::new();
        let mut line = String::new();

        loop {
            line.clear();
            if self.inner.read_line(&mut line)? == 0 {
                self.done = true;
                if seq.is_some() {
                    return Err(self.malformed("record is not terminated by '//'"));
                }
                return Ok(None);
            }
            self.line_no += 1;
            let text = line.trim_end_matches(&['\n', '\r'][..]);
            if text.trim().is_empty() {
                continue;
            }
            if text.starts_with("//") {
                if seq.is_none() {
                    return Err(self.malformed("record terminator without LOCUS line"));
                }
                break;
            }

            let indented = text.starts_with(' ');
            if !indented {
                let keyword = text.split_whitespace().next().unwrap_or("");
                if seq.is_none() && !keyword.eq_ignore_ascii_case("LOCUS") {
                    return Err(self.malformed(format!("expected LOCUS line, found '{}'", text)));
                }
                section = match keyword.to_ascii_uppercase().as_str() {
                    "LOCUS" => {
                        if seq.is_some() {
                            return Err(self.malformed("LOCUS line before record terminator '//'"));
                        }
                        let id = text.split_whitespace().nth(1).map(str::to_owned);
                        seq = Some(Seq { id, ..Seq::default() });
                        Section::Header
                    },
                    "DEFINITION" => {
                        description.push(text[keyword.len()..].trim().to_owned());
                        Section::Definition
                    },
                    "FEATURES" => Section::Features,
                    "ORIGIN" => Section::Origin,
                    _ => {
                        header.push(text.to_owned());
                        Section::Header
                    },
                };
                continue;
            }

            match section {
                Section::Header => header.push(text.to_owned()),
                Section::Definition => description.push(text.trim().to_owned()),
                Section::Origin => {
                    if !self.exclude_seq {
                        if let Some(seq) = seq.as_mut() {
                            seq.data.extend(text.chars()
                                .filter(|c| c.is_ascii_alphabetic() || *c == '*' || *c == '-')
                                .map(|c| c.to_ascii_uppercase()));
                        }
                    }
                },
                Section::Features => {
                    let content = text.trim_start();
                    let indent = text.len() - content.len();
                    if indent < QUALIFIER_INDENT {
                        let (ftype, location) = content.split_once(char::is_whitespace)
                            .unwrap_or((content, ""));
                        raw_fts.push(RawFeature {
                            ftype: ftype.to_owned(),
                            location: location.trim().to_owned(),
                            line_no: self.line_no,
                            qualifiers: Vec::new(),
                        });
                        continue;
                    }
                    let ft = match raw_fts.last_mut() {
                        Some(ft) => ft,
                        None => return Err(self.malformed("qualifier outside of a feature")),
                    };
                    let translation = ft.qualifiers.last()
                        .map_or(false, |(key, _)| key == TRANSLATION);
                    if let Some(value) = ft.open_qualifier() {
                        if !translation {
                            value.push(' ');
                        }
                        value.push_str(content);
                    } else if let Some(qualifier) = content.strip_prefix('/') {
                        let (key, value) = match qualifier.split_once('=') {
                            Some((key, value)) => (key, Some(value.to_owned())),
                            None => (qualifier, None),
                        };
                        ft.qualifiers.push((key.to_owned(), value));
                    } else if ft.qualifiers.is_empty() {
                        ft.location.push_str(content);
                    } else {
                        return Err(self.malformed(format!("unexpected line '{}'", content)));
                    }
                },
            }
        }

        let mut seq = match seq {
            Some(seq) => seq,
            None => return Ok(None),
        };
        if !description.is_empty() {
            let _ = seq.meta.insert(DESC_KEY, description.join(" "));
        }
        if !header.is_empty() {
            let _ = seq.meta.entry_map(GENBANK_KEY).insert(HEADER_KEY, header.join("\n"));
        }
        let fts = raw_fts.into_iter()
            .map(|ft| ft.into_feature(seq.id.as_deref(), self.exclude_translation))
            .collect::<crate::Result<Vec<Feature>>>();
        match fts {
            Ok(fts) => seq.fts = FeatureList::from(fts),
            Err(e) => {
                self.done = true;
                return Err(e);
            },
        }
        Ok(Some(seq))
    }
}

impl<R: BufRead> Iterator for GenBankSeqsStream<R> {

    type Item = crate::Result<Seq>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_record() {
            Ok(Some(seq)) => Some(Ok(seq)),
            Ok(None) => None,
            Err(e) => {
                self.done = true;
                Some(Err(e))
            },
        }
    }
}

/// Iterator over the features of GenBank records.
pub struct GenBankFeaturesStream<R: BufRead> {
    inner: GenBankSeqsStream<R>,
    current: ::std::vec::IntoIter<Feature>,
}

impl<R: BufRead> Iterator for GenBankFeaturesStream<R> {

    type Item = crate::Result<Feature>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(ft) = self.current.next() {
                return Some(Ok(ft));
            }
            match self.inner.next()? {
                Ok(seq) => self.current = seq.fts.into_inner().into_iter(),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// GenBank writer.
pub struct Writer<W: Write> {
    inner: W,
}

impl<W: Write> Writer<W> {

    /// Creates a GenBank writer from another writer.
    pub fn from_writer(in_writer: W) -> Writer<W> {
        Writer { inner: in_writer }
    }

    /// Writes the given sequence with its features as one record.
    pub fn write_seq(&mut self, seq: &Seq) -> crate::Result<()> {
        let len = if seq.data.is_empty() {
            seq.fts.loc_range().map_or(0, |(_, stop)| stop)
        } else {
            seq.data.len() as u64
        };
        writeln!(self.inner, "{:<12}{:<16} {:>11} bp    DNA",
                 "LOCUS", seq.id.as_deref().unwrap_or(DEF_ID), len)?;
        let definition = seq.meta.get_str(DESC_KEY).unwrap_or(".");
        for (i, line) in wrap(definition, LINE_WIDTH - 12, true).iter().enumerate() {
            writeln!(self.inner, "{:<12}{}", if i == 0 { "DEFINITION" } else { "" }, line)?;
        }
        if let Some(header) = seq.meta.get(GENBANK_KEY)
            .and_then(Value::as_map)
            .and_then(|m| m.get_str(HEADER_KEY))
        {
            writeln!(self.inner, "{}", header)?;
        }
        if !seq.fts.is_empty() {
            writeln!(self.inner, "{:<21}Location/Qualifiers", "FEATURES")?;
            for ft in seq.fts.iter() {
                self.write_feature(ft)?;
            }
        }
        if !seq.data.is_empty() {
            writeln!(self.inner, "ORIGIN")?;
            for (i, chunk) in seq.data.as_bytes().chunks(60).enumerate() {
                let groups = chunk.chunks(10)
                    .map(|group| String::from_utf8_lossy(group).to_lowercase())
                    .join(" ");
                writeln!(self.inner, "{:>9} {}", i * 60 + 1, groups)?;
            }
        }
        writeln!(self.inner, "//")?;
        Ok(())
    }

    /// Writes features grouped by sequence identifier into sequence-less records.
    pub fn write_fts(&mut self, fts: &[Feature]) -> crate::Result<()> {
        let fts: FeatureList = fts.iter().cloned().collect();
        for (seqid, group) in fts.groupby(&SortKey::Seqid) {
            let seq = Seq { id: seqid, fts: group, ..Seq::default() };
            self.write_seq(&seq)?;
        }
        Ok(())
    }

    /// Writes one feature table entry.
    pub fn write_feature(&mut self, ft: &Feature) -> crate::Result<()> {
        let indent = " ".repeat(QUALIFIER_INDENT);
        let location = wrap_location(&serialize_location(ft.locs()), LINE_WIDTH - QUALIFIER_INDENT);
        for (i, line) in location.iter().enumerate() {
            if i == 0 {
                writeln!(self.inner, "     {:<16}{}", ft.ftype(), line)?;
            } else {
                writeln!(self.inner, "{}{}", indent, line)?;
            }
        }
        let quals = ft.meta().get(GENBANK_KEY).and_then(Value::as_map);
        for (key, value) in quals.into_iter().flat_map(|m| m.iter()) {
            for line in format_qualifier(key, value) {
                writeln!(self.inner, "{}{}", indent, line)?;
            }
        }
        Ok(())
    }
}

/// Formats a qualifier into wrapped lines without indentation.
fn format_qualifier(key: &str, value: &Value) -> Vec<String> {
    let width = LINE_WIDTH - QUALIFIER_INDENT;
    match value {
        Value::Bool(true) => vec![format!("/{}", key)],
        Value::Bool(false) => Vec::new(),
        Value::Int(_) | Value::Float(_) => vec![format!("/{}={}", key, value)],
        Value::List(items) => items.iter().flat_map(|item| format_qualifier(key, item)).collect(),
        other => {
            let text = format!("/{}=\"{}\"", key, other.to_string().replace('"', "\"\""));
            wrap(&text, width, key != TRANSLATION)
        },
    }
}

/// Splits text into lines of at most `width` characters, at spaces if requested.
///
/// A space a line is broken at is dropped, so joining the lines with single spaces restores the
/// text. When breaking at spaces, a word longer than `width` is kept whole on an overlong line.
fn wrap(text: &str, width: usize, at_spaces: bool) -> Vec<String> {
    let mut lines = Vec::new();
    let mut rest = text;
    while rest.chars().count() > width {
        let cut = rest.char_indices().nth(width).map_or(rest.len(), |(i, _)| i);
        if !at_spaces {
            lines.push(rest[..cut].to_owned());
            rest = &rest[cut..];
            continue;
        }
        let brk = if rest[cut..].starts_with(' ') {
            Some(cut)
        } else {
            rest[..cut].rfind(' ').filter(|&i| i > 0).or_else(|| rest[cut..].find(' ').map(|i| cut + i))
        };
        match brk {
            Some(i) => {
                lines.push(rest[..i].to_owned());
                rest = &rest[i + 1..];
            },
            None => break,
        }
    }
    lines.push(rest.to_owned());
    lines
}

/// Splits a location expression after commas into lines of at most `width` characters.
fn wrap_location(location: &str, width: usize) -> Vec<String> {
    let mut lines = vec![String::new()];
    for piece in location.split_inclusive(',') {
        let fits = lines.last().map_or(true, |l| l.is_empty() || l.len() + piece.len() <= width);
        if fits {
            if let Some(last) = lines.last_mut() {
                last.push_str(piece);
            }
        } else {
            lines.push(piece.to_owned());
        }
    }
    lines
}
