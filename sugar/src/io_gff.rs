/*! Reader and writer for the GFF3 format.

GFF3 is a tab-separated, feature-oriented format with nine columns per row: sequence name,
source, type, start, end, score, strand, phase and `key=value` attributes. A feature with several
locations, e.g. a spliced CDS, spans several consecutive rows sharing the same `ID`.

The specification can be found [here](https://github.com/The-Sequence-Ontology/Specifications/blob/master/gff3.md).

Features keep the `ID` and `Name` attributes as `id` and `name` metadata; the remaining
attributes and the source, score and phase columns are stored in the `_gff` metadata map.
Reading stops at a `##FASTA` directive.
*/
use std::io::{self, BufRead, Write};

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::bytes::{Captures, Regex};

use crate::consts::{ID_KEY, NAME_KEY, UNK_STR};
use crate::feature::Feature;
use crate::location::{Location, LocationError, LocationTuple, Strand};
use crate::meta::{Meta, Options, Value};
use crate::registry::{Capabilities, FormatPlugin, Records};
use crate::utils::starts_with_ignoring_ws;


/// Name of the format in the registry.
pub const FORMAT: &str = "gff";

/// Metadata key of the GFF-specific attributes.
pub const GFF_KEY: &str = "_gff";

/// Directive opening every GFF3 file.
const VERSION_DIRECTIVE: &str = "##gff-version";

/// Directive starting the trailing sequence section.
const FASTA_DIRECTIVE: &str = "##FASTA";

/// Columns stored in the `_gff` map, with their index.
const ROW_COLUMNS: [(&str, usize); 3] = [("source", 1), ("score", 5), ("phase", 7)];

static ESCAPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"%([0-9A-Fa-f]{2})").expect("escape regex is valid")
});

/// Characters escaped in column values, besides control characters.
const ESCAPED: &[char] = &['%', '&', ',', ';', '=', '\u{7f}'];

/// Creates the registry entry of the format.
pub fn plugin() -> FormatPlugin {
    FormatPlugin {
        name: FORMAT,
        description: "GFF3 feature annotations",
        binary: false,
        priority: 30,
        sniff: Some(sniff),
        extensions: &["gff", "gff3"],
        seqs: Capabilities::none(),
        fts: Capabilities {
            iter: Some(iter_fts),
            write_all: Some(write_fts),
            ..Capabilities::none()
        },
    }
}

/// Whether the content starts with the version directive.
pub fn sniff(buf: &[u8]) -> bool {
    starts_with_ignoring_ws(buf, VERSION_DIRECTIVE.as_bytes(), false)
}

fn iter_fts<'a>(stream: Box<dyn BufRead + 'a>, opts: &Options) -> Records<'a, Feature> {
    let mut reader = Reader::from_reader(stream);
    let _ = reader
        .types(opts.list("filt"))
        .default_ftype(opts.get("default_ftype"));
    Box::new(reader.fts_stream())
}

fn write_fts(fts: &[Feature], stream: &mut dyn Write, opts: &Options) -> crate::Result<()> {
    let mut writer = Writer::from_writer(stream);
    writer.write_header(opts.flag("header", true))?;
    for ft in fts {
        writer.write_feature(ft)?;
    }
    writer.flush()
}

/// Decodes `%XX` escapes.
pub fn unescape(value: &str) -> String {
    if !value.contains('%') {
        return value.to_owned();
    }
    let decoded = ESCAPE_RE.replace_all(value.as_bytes(), |caps: &Captures| {
        ::std::str::from_utf8(&caps[1]).ok()
            .and_then(|hex| u8::from_str_radix(hex, 16).ok())
            .map_or_else(|| caps[0].to_vec(), |b| vec![b])
    });
    String::from_utf8_lossy(&decoded).into_owned()
}

/// Encodes reserved and control characters as `%XX`.
pub fn escape(value: &str) -> String {
    value.chars()
        .map(|c| if c.is_ascii_control() || ESCAPED.contains(&c) {
            format!("%{:02X}", c as u32)
        } else {
            c.to_string()
        })
        .collect()
}

/// GFF3 reader.
pub struct Reader<R: io::Read> {
    inner: csv::Reader<R>,
    types: Vec<String>,
    default_ftype: Option<String>,
}

impl<R: io::Read> Reader<R> {

    /// Creates a GFF3 reader from another reader.
    pub fn from_reader(in_reader: R) -> Reader<R> {
        Reader {
            inner: csv::ReaderBuilder::new()
                .delimiter(b'\t')
                .has_headers(false)
                .flexible(true)
                .quoting(false)
                .from_reader(in_reader),
            types: Vec::new(),
            default_ftype: None,
        }
    }

    /// Restricts the features read to the given types; an empty list reads all.
    pub fn types<T: Into<String>>(&mut self, types: Vec<T>) -> &mut Self {
        self.types = types.into_iter().map(|t| t.into()).collect();
        self
    }

    /// Sets the feature type used for rows whose type column is undefined.
    pub fn default_ftype<T: Into<String>>(&mut self, ftype: Option<T>) -> &mut Self {
        self.default_ftype = ftype.map(|t| t.into());
        self
    }

    /// Turns the reader into an iterator over features.
    pub fn fts_stream(self) -> GffFeaturesStream<R> {
        GffFeaturesStream {
            inner: self.inner.into_records(),
            types: self.types,
            default_ftype: self.default_ftype,
            pending: None,
            error: None,
            done: false,
        }
    }
}

/// Iterator over GFF3 features, merging consecutive rows of the same feature.
///
/// Rows of one feature may differ in their source, score and phase columns. Such a column is
/// then kept in the `_gff` map as a list holding one value per location. Attributes are taken
/// from the first row.
pub struct GffFeaturesStream<R: io::Read> {
    inner: csv::StringRecordsIntoIter<R>,
    types: Vec<String>,
    default_ftype: Option<String>,
    pending: Option<Feature>,
    // Error held back until the pending feature is emitted.
    error: Option<crate::Error>,
    done: bool,
}

impl<R: io::Read> GffFeaturesStream<R> {

    /// Reads the next data row as a single-location feature.
    ///
    /// Comment and directive rows are skipped; the `##FASTA` directive ends the stream.
    /// The feature comes with the line number of its row.
    fn next_row(&mut self) -> Option<crate::Result<(usize, Feature)>> {
        loop {
            let record = match self.inner.next()? {
                Ok(record) => record,
                Err(e) => return Some(Err(match e.position() {
                    Some(pos) => crate::Error::malformed(FORMAT, pos.line() as usize, e.to_string()),
                    None => e.into(),
                })),
            };
            let first = record.get(0).unwrap_or_default();
            if first.starts_with(FASTA_DIRECTIVE) {
                return None;
            }
            if first.starts_with('#') || (record.len() == 1 && first.trim().is_empty()) {
                continue;
            }
            let line_no = record.position().map_or(0, |pos| pos.line() as usize);
            return Some(self.parse_row(&record, line_no).map(|ft| (line_no, ft)));
        }
    }

    fn parse_row(&self, record: &csv::StringRecord, line_no: usize) -> crate::Result<Feature> {
        let malformed = |reason: String| crate::Error::malformed(FORMAT, line_no, reason);
        if record.len() != 9 {
            return Err(malformed(format!("expected 9 columns, found {}", record.len())));
        }
        let col = |i: usize| record.get(i).unwrap_or(UNK_STR);
        let coord = |raw: &str| raw.trim().parse::<u64>()
            .map_err(|e| malformed(format!("invalid coordinate '{}': {}", raw, e)));
        let start = coord(col(3))?;
        let stop = coord(col(4))?;
        let strand = col(6).chars().next()
            .filter(|_| col(6).len() == 1)
            .and_then(Strand::from_char)
            .ok_or_else(|| malformed(format!("invalid strand '{}'", col(6))))?;
        let loc = start.checked_sub(1)
            .ok_or_else(|| malformed("coordinates are 1-based".to_owned()))
            .and_then(|s| Location::new(s, stop).map_err(|e| malformed(e.to_string())))?
            .with_strand(strand);

        let ftype = match (col(2), self.default_ftype.as_deref()) {
            (UNK_STR, Some(default)) => default.to_owned(),
            (ftype, _) => unescape(ftype),
        };

        let mut meta = Meta::new();
        let mut gff = Meta::new();
        for (key, i) in ROW_COLUMNS {
            if col(i) != UNK_STR {
                let _ = gff.insert(key, unescape(col(i)));
            }
        }
        for attr in col(8).split(';').map(str::trim).filter(|a| !a.is_empty() && *a != UNK_STR) {
            let (key, raw) = attr.split_once('=')
                .ok_or_else(|| malformed(format!("attribute without value: '{}'", attr)))?;
            let mut values: Vec<Value> = raw.split(',').map(|v| Value::Str(unescape(v))).collect();
            let value = if values.len() == 1 { values.remove(0) } else { Value::List(values) };
            match key {
                "ID" => { let _ = meta.insert(ID_KEY, value); },
                "Name" => { let _ = meta.insert(NAME_KEY, value); },
                other => { let _ = gff.insert(unescape(other), value); },
            }
        }
        if !gff.is_empty() {
            let _ = meta.insert(GFF_KEY, gff);
        }

        let seqid = Some(unescape(col(0))).filter(|s| s != UNK_STR);
        Ok(Feature::new(ftype, LocationTuple::from(loc)).with_meta(meta).with_seqid(seqid))
    }

    /// Whether the row continues the pending feature.
    fn continues(pending: &Feature, row: &Feature) -> bool {
        pending.id().is_some()
            && pending.id() == row.id()
            && pending.ftype() == row.ftype()
            && pending.seqid() == row.seqid()
    }

    /// Appends the location of a continuation row to the pending feature.
    fn merge(pending: &mut Feature, row: Feature) -> Result<(), LocationError> {
        let rows = pending.locs().len();
        let mut locs = pending.locs().locs().to_vec();
        locs.extend(row.locs().iter().cloned());
        pending.set_locs(LocationTuple::new(locs)?);

        let row_gff = row.meta().get(GFF_KEY).and_then(Value::as_map);
        for (key, _) in ROW_COLUMNS {
            let value = row_gff.and_then(|m| m.get(key)).cloned()
                .unwrap_or_else(|| Value::from(UNK_STR));
            let gff = pending.meta_mut().entry_map(GFF_KEY);
            let previous = gff.get(key).cloned().unwrap_or_else(|| Value::from(UNK_STR));
            let merged = match previous {
                Value::List(mut per_row) => {
                    per_row.push(value);
                    Value::List(per_row)
                },
                same if same == value => continue,
                other => {
                    let mut per_row = vec![other; rows];
                    per_row.push(value);
                    Value::List(per_row)
                },
            };
            let _ = gff.insert(key, merged);
        }
        if pending.meta().get(GFF_KEY).and_then(Value::as_map).map_or(false, Meta::is_empty) {
            let _ = pending.meta_mut().remove(GFF_KEY);
        }
        Ok(())
    }

    fn wanted(&self, ft: &Feature) -> bool {
        self.types.is_empty() || self.types.iter().any(|t| t == ft.ftype())
    }
}

impl<R: io::Read> Iterator for GffFeaturesStream<R> {

    type Item = crate::Result<Feature>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(e) = self.error.take() {
            return Some(Err(e));
        }
        while !self.done {
            let (line_no, row) = match self.next_row() {
                Some(Ok(row)) => row,
                Some(Err(e)) => match self.pending.take() {
                    Some(pending) => {
                        self.error = Some(e);
                        return Some(Ok(pending));
                    },
                    None => return Some(Err(e)),
                },
                None => {
                    self.done = true;
                    break;
                },
            };
            if !self.wanted(&row) {
                continue;
            }
            match self.pending.take() {
                Some(mut pending) if Self::continues(&pending, &row) => {
                    match Self::merge(&mut pending, row) {
                        Ok(()) => self.pending = Some(pending),
                        Err(e) => {
                            self.error = Some(crate::Error::malformed(
                                FORMAT, line_no, e.to_string()));
                            return Some(Ok(pending));
                        },
                    }
                },
                Some(pending) => {
                    self.pending = Some(row);
                    return Some(Ok(pending));
                },
                None => self.pending = Some(row),
            }
        }
        self.pending.take().map(Ok)
    }
}

/// GFF3 writer.
pub struct Writer<W: Write> {
    inner: csv::Writer<W>,
    // Number of IDs generated for multi-row features without one.
    auto_ids: usize,
}

impl<W: Write> Writer<W> {

    /// Creates a GFF3 writer from another writer.
    pub fn from_writer(in_writer: W) -> Writer<W> {
        Writer {
            inner: csv::WriterBuilder::new()
                .delimiter(b'\t')
                .quote_style(csv::QuoteStyle::Never)
                .has_headers(false)
                .flexible(true)
                .from_writer(in_writer),
            auto_ids: 0,
        }
    }

    /// Writes the version directive, followed by a provenance comment if requested.
    pub fn write_header(&mut self, provenance: bool) -> crate::Result<()> {
        self.inner.write_record(&[format!("{} 3", VERSION_DIRECTIVE)])?;
        if provenance {
            self.inner.write_record(&[format!("#written by sugar {}", env!("CARGO_PKG_VERSION"))])?;
        }
        Ok(())
    }

    /// Writes the given feature as one row per location.
    ///
    /// Rows of a feature with several locations must share an `ID`; one is generated from the
    /// feature type if the feature has none. Columns kept as a list of per-location values are
    /// written row by row.
    pub fn write_feature(&mut self, ft: &Feature) -> crate::Result<()> {
        let gff = ft.meta().get(GFF_KEY).and_then(Value::as_map);
        let column = |key: &str, row: usize| match gff.and_then(|m| m.get(key)) {
            Some(Value::List(per_row)) => per_row.get(row)
                .map(|v| escape(&v.to_string()))
                .unwrap_or_else(|| UNK_STR.to_owned()),
            Some(value) => escape(&value.to_string()),
            None => UNK_STR.to_owned(),
        };

        let mut attrs = Vec::new();
        if ft.meta().get(ID_KEY).is_none() && ft.locs().len() > 1 {
            self.auto_ids += 1;
            attrs.push(format!("ID={}_{}", escape(ft.ftype()), self.auto_ids));
        }
        for (key, meta_key) in [("ID", ID_KEY), ("Name", NAME_KEY)] {
            if let Some(value) = ft.meta().get(meta_key) {
                attrs.push(format!("{}={}", key, encode_value(value)));
            }
        }
        if let Some(gff) = gff {
            attrs.extend(gff.iter()
                .filter(|(key, _)| !matches!(key.as_str(), "source" | "score" | "phase"))
                .map(|(key, value)| format!("{}={}", escape(key), encode_value(value))));
        }
        let attrs = if attrs.is_empty() { UNK_STR.to_owned() } else { attrs.join(";") };

        let seqid = ft.seqid().map(escape).unwrap_or_else(|| UNK_STR.to_owned());
        for (row, loc) in ft.locs().iter().enumerate() {
            self.inner.write_record(&[
                seqid.clone(),
                column("source", row),
                escape(ft.ftype()),
                (loc.start() + 1).to_string(),
                loc.stop().to_string(),
                column("score", row),
                loc.strand().to_string(),
                column("phase", row),
                attrs.clone(),
            ])?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> crate::Result<()> {
        self.inner.flush().map_err(crate::Error::from)
    }
}

fn encode_value(value: &Value) -> String {
    match value {
        Value::List(items) => items.iter().map(|v| escape(&v.to_string())).join(","),
        other => escape(&other.to_string()),
    }
}
