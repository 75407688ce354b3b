/*! Format resolution and routing of streams to format plugins.

Every read resolves its format in this order:

1. the format named by the caller, if any,
2. the content sniffers of the registered formats, run on the first [`SNIFF_LEN`] bytes,
3. the extension of the source file name.

The sniffed bytes are put back in front of the stream, so the chosen reader sees the complete
input. Readers are exposed both lazily ([`iter_seqs`], [`iter_fts`]) and as collections
([`read_seqs`], [`read_fts`]), whichever of the two the plugin implements.

Writes use the named format or the one registered for the extension of the target file name.
*/
use std::fmt;
use std::io::{self, BufRead, Cursor, Read, Write};
use std::mem;

use crate::consts::FMT_KEY;
use crate::feature::{Feature, FeatureList};
use crate::meta::Options;
use crate::registry::{registry, Capabilities, Capability, FormatError, FormatPlugin, ReadFn,
                      Records, Registry};
use crate::seq::Seq;
use crate::{Error, Result};


/// Number of leading bytes handed to content sniffers.
pub const SNIFF_LEN: usize = 1024;

/// Kind of records requested from a format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum What {
    Seqs,
    Fts,
}

impl fmt::Display for What {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            What::Seqs => write!(f, "sequences"),
            What::Fts => write!(f, "features"),
        }
    }
}

/// How a format was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Named by the caller.
    Hinted,
    /// Matched by a content sniffer.
    Sniffed,
    /// Matched by the file name extension.
    Extension,
}

/// An open source stream with what is known about it.
pub struct Input<'a> {
    stream: Box<dyn BufRead + 'a>,
    filename: Option<String>,
    binary: bool,
}

impl<'a> Input<'a> {

    /// Creates a text input without file name.
    pub fn new<R: BufRead + 'a>(stream: R) -> Input<'a> {
        Input { stream: Box::new(stream), filename: None, binary: false }
    }

    /// Creates a text input reading the given bytes.
    pub fn from_bytes(bytes: &'a [u8]) -> Input<'a> {
        Input::new(bytes)
    }

    /// Sets the name of the file behind the stream, used for extension lookups.
    pub fn with_filename<T: Into<String>>(mut self, filename: Option<T>) -> Input<'a> {
        self.filename = filename.map(|v| v.into());
        self
    }

    /// Marks the stream as opened in binary mode.
    pub fn binary(mut self, binary: bool) -> Input<'a> {
        self.binary = binary;
        self
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn is_binary(&self) -> bool {
        self.binary
    }

    /// Reads up to `SNIFF_LEN` bytes and puts them back in front of the stream.
    pub fn peek(&mut self) -> io::Result<Vec<u8>> {
        let mut prefix = Vec::with_capacity(SNIFF_LEN);
        let _ = self.stream.by_ref().take(SNIFF_LEN as u64).read_to_end(&mut prefix)?;
        let rest = mem::replace(&mut self.stream, Box::new(io::empty()));
        self.stream = Box::new(Cursor::new(prefix.clone()).chain(rest));
        Ok(prefix)
    }

    /// The underlying stream.
    pub fn into_stream(self) -> Box<dyn BufRead + 'a> {
        self.stream
    }
}

/// An open target stream with its file name, if any.
pub struct Output<'a> {
    stream: Box<dyn Write + 'a>,
    filename: Option<String>,
}

impl<'a> Output<'a> {

    pub fn new<W: Write + 'a>(stream: W) -> Output<'a> {
        Output { stream: Box::new(stream), filename: None }
    }

    /// Sets the name of the file behind the stream, used to infer the format.
    pub fn with_filename<T: Into<String>>(mut self, filename: Option<T>) -> Output<'a> {
        self.filename = filename.map(|v| v.into());
        self
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }
}

/// Record kinds the dispatcher routes.
trait Record: Sized + 'static {
    const WHAT: What;

    fn caps(plugin: &FormatPlugin) -> &Capabilities<Self>;

    fn tag_fmt(&mut self, fmt: &'static str);
}

impl Record for Seq {
    const WHAT: What = What::Seqs;

    fn caps(plugin: &FormatPlugin) -> &Capabilities<Seq> {
        &plugin.seqs
    }

    fn tag_fmt(&mut self, fmt: &'static str) {
        let _ = self.meta.insert(FMT_KEY, fmt);
    }
}

impl Record for Feature {
    const WHAT: What = What::Fts;

    fn caps(plugin: &FormatPlugin) -> &Capabilities<Feature> {
        &plugin.fts
    }

    fn tag_fmt(&mut self, fmt: &'static str) {
        let _ = self.meta_mut().insert(FMT_KEY, fmt);
    }
}

/// Single-shot iterator over the result of a bulk reader, run on the first call to `next`.
struct BulkRecords<'a, T> {
    stream: Option<Box<dyn BufRead + 'a>>,
    read: ReadFn<T>,
    opts: Options,
    items: ::std::vec::IntoIter<T>,
}

impl<'a, T> Iterator for BulkRecords<'a, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Result<T>> {
        if let Some(mut stream) = self.stream.take() {
            match (self.read)(&mut *stream, &self.opts) {
                Ok(items) => self.items = items.into_iter(),
                Err(e) => return Some(Err(e)),
            }
        }
        self.items.next().map(Ok)
    }
}

impl Registry {

    /// Resolves the format of an input by content, then by file name.
    ///
    /// The input stays complete; sniffed bytes are put back.
    pub fn detect(&self, input: &mut Input, what: What) -> Result<(&FormatPlugin, Resolution)> {
        let prefix = input.peek()?;
        if let Some(plugin) = self.sniff(&prefix, input.binary, what)? {
            return Ok((plugin, Resolution::Sniffed));
        }
        if let Some(plugin) = input.filename.as_deref()
            .and_then(|fname| self.by_extension(fname, what, false))
        {
            return Ok((plugin, Resolution::Extension));
        }
        Err(FormatError::Unknown(None).into())
    }

    /// Resolves a format from the extension of a file name.
    pub fn detect_ext(&self, fname: &str, what: What) -> Result<&FormatPlugin> {
        self.by_extension(fname, what, false)
            .ok_or_else(|| FormatError::Unknown(Some(fname.to_owned())).into())
    }

    fn resolve_input(&self, input: &mut Input, fmt: Option<&str>, what: What)
        -> Result<&FormatPlugin>
    {
        let (plugin, resolution) = match fmt {
            Some(name) => (self.resolve(name)?, Resolution::Hinted),
            None => self.detect(input, what)?,
        };
        debug!("reading {} as '{}' ({:?}) from {}",
               what, plugin.name, resolution, input.filename().unwrap_or("stream"));
        Ok(plugin)
    }

    fn iter_records<'a, T: Record>(&self, mut input: Input<'a>, fmt: Option<&str>, opts: &Options)
        -> Result<Records<'a, T>>
    {
        let plugin = self.resolve_input(&mut input, fmt, T::WHAT)?;
        let caps = T::caps(plugin);
        let name = plugin.name;
        let records: Records<'a, T> = match (caps.iter, caps.read) {
            (Some(iter), _) => iter(input.stream, opts),
            (None, Some(read)) => Box::new(BulkRecords {
                stream: Some(input.stream),
                read,
                opts: opts.clone(),
                items: Vec::new().into_iter(),
            }),
            (None, None) => return Err(unsupported(plugin, T::WHAT, Capability::Iter)),
        };
        Ok(Box::new(records.map(move |rec| rec.map(|mut rec| {
            rec.tag_fmt(name);
            rec
        }))))
    }

    fn read_records<T: Record>(&self, mut input: Input, fmt: Option<&str>, opts: &Options)
        -> Result<Vec<T>>
    {
        let plugin = self.resolve_input(&mut input, fmt, T::WHAT)?;
        let caps = T::caps(plugin);
        let mut records = match (caps.read, caps.iter) {
            (Some(read), _) => read(&mut *input.stream, opts)?,
            (None, Some(iter)) => iter(input.stream, opts).collect::<Result<Vec<T>>>()?,
            (None, None) => return Err(unsupported(plugin, T::WHAT, Capability::Read)),
        };
        for rec in records.iter_mut() {
            rec.tag_fmt(plugin.name);
        }
        Ok(records)
    }

    fn write_records<T: Record>(&self, records: &[T], output: Output, fmt: Option<&str>,
                                opts: &Options) -> Result<()>
    {
        let (plugin, resolution) = match (fmt, output.filename()) {
            (Some(name), _) => (self.resolve(name)?, Resolution::Hinted),
            (None, Some(fname)) => {
                let plugin = self.by_extension(fname, T::WHAT, true)
                    .ok_or_else(|| FormatError::Unknown(Some(fname.to_owned())))?;
                (plugin, Resolution::Extension)
            },
            (None, None) => return Err(FormatError::Missing.into()),
        };
        debug!("writing {} {} as '{}' ({:?}) to {}", records.len(), T::WHAT, plugin.name,
               resolution, output.filename().unwrap_or("stream"));

        let caps = T::caps(plugin);
        let mut stream = output.stream;
        match (caps.write_all, caps.write_one) {
            (Some(write_all), _) => write_all(records, &mut *stream, opts)?,
            (None, Some(write_one)) => {
                for rec in records {
                    write_one(rec, &mut *stream, opts)?;
                }
            },
            (None, None) => return Err(unsupported(plugin, T::WHAT, Capability::WriteAll)),
        }
        stream.flush()?;
        Ok(())
    }

    fn write_records_string<T: Record>(&self, records: &[T], fmt: Option<&str>, opts: &Options)
        -> Result<String>
    {
        let mut buf = Vec::new();
        self.write_records(records, Output::new(&mut buf), fmt, opts)?;
        String::from_utf8(buf)
            .map_err(|e| Error::from(io::Error::new(io::ErrorKind::InvalidData, e)))
    }

    /// Lazily reads sequences.
    pub fn iter_seqs<'a>(&self, input: Input<'a>, fmt: Option<&str>, opts: &Options)
        -> Result<Records<'a, Seq>>
    {
        self.iter_records(input, fmt, opts)
    }

    /// Reads all sequences.
    pub fn read_seqs(&self, input: Input, fmt: Option<&str>, opts: &Options) -> Result<Vec<Seq>> {
        self.read_records(input, fmt, opts)
    }

    /// Lazily reads features.
    pub fn iter_fts<'a>(&self, input: Input<'a>, fmt: Option<&str>, opts: &Options)
        -> Result<Records<'a, Feature>>
    {
        self.iter_records(input, fmt, opts)
    }

    /// Reads all features.
    pub fn read_fts(&self, input: Input, fmt: Option<&str>, opts: &Options)
        -> Result<FeatureList>
    {
        self.read_records(input, fmt, opts).map(FeatureList::from)
    }

    /// Writes sequences in the given format, or the one of the output file name.
    pub fn write_seqs(&self, seqs: &[Seq], output: Output, fmt: Option<&str>, opts: &Options)
        -> Result<()>
    {
        self.write_records(seqs, output, fmt, opts)
    }

    /// Writes features in the given format, or the one of the output file name.
    pub fn write_fts(&self, fts: &[Feature], output: Output, fmt: Option<&str>, opts: &Options)
        -> Result<()>
    {
        self.write_records(fts, output, fmt, opts)
    }

    /// Writes sequences into a string; the format must be given.
    pub fn write_seqs_string(&self, seqs: &[Seq], fmt: Option<&str>, opts: &Options)
        -> Result<String>
    {
        self.write_records_string(seqs, fmt, opts)
    }

    /// Writes features into a string; the format must be given.
    pub fn write_fts_string(&self, fts: &[Feature], fmt: Option<&str>, opts: &Options)
        -> Result<String>
    {
        self.write_records_string(fts, fmt, opts)
    }
}

fn unsupported(plugin: &FormatPlugin, what: What, capability: Capability) -> Error {
    FormatError::Unsupported { format: plugin.name, what, capability }.into()
}

/// Resolves the format of an input with the process-wide registry, see [`Registry::detect`].
pub fn detect(input: &mut Input, what: What) -> Result<(&'static str, Resolution)> {
    registry().detect(input, what).map(|(plugin, resolution)| (plugin.name, resolution))
}

/// Resolves a format name from a file name with the process-wide registry.
pub fn detect_ext(fname: &str, what: What) -> Result<&'static str> {
    registry().detect_ext(fname, what).map(|plugin| plugin.name)
}

/// Lazily reads sequences with the process-wide registry.
pub fn iter_seqs<'a>(input: Input<'a>, fmt: Option<&str>, opts: &Options)
    -> Result<Records<'a, Seq>>
{
    registry().iter_seqs(input, fmt, opts)
}

/// Reads all sequences with the process-wide registry.
pub fn read_seqs(input: Input, fmt: Option<&str>, opts: &Options) -> Result<Vec<Seq>> {
    registry().read_seqs(input, fmt, opts)
}

/// Lazily reads features with the process-wide registry.
pub fn iter_fts<'a>(input: Input<'a>, fmt: Option<&str>, opts: &Options)
    -> Result<Records<'a, Feature>>
{
    registry().iter_fts(input, fmt, opts)
}

/// Reads all features with the process-wide registry.
pub fn read_fts(input: Input, fmt: Option<&str>, opts: &Options) -> Result<FeatureList> {
    registry().read_fts(input, fmt, opts)
}

/// Writes sequences with the process-wide registry.
pub fn write_seqs(seqs: &[Seq], output: Output, fmt: Option<&str>, opts: &Options) -> Result<()> {
    registry().write_seqs(seqs, output, fmt, opts)
}

/// Writes features with the process-wide registry.
pub fn write_fts(fts: &[Feature], output: Output, fmt: Option<&str>, opts: &Options)
    -> Result<()>
{
    registry().write_fts(fts, output, fmt, opts)
}

/// Writes sequences into a string with the process-wide registry.
pub fn write_seqs_string(seqs: &[Seq], fmt: Option<&str>, opts: &Options) -> Result<String> {
    registry().write_seqs_string(seqs, fmt, opts)
}

/// Writes features into a string with the process-wide registry.
pub fn write_fts_string(fts: &[Feature], fmt: Option<&str>, opts: &Options) -> Result<String> {
    registry().write_fts_string(fts, fmt, opts)
}
