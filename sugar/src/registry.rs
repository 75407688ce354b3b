/*! Table of format plugins.

Every format is described by a [`FormatPlugin`]: a name, a content sniffer, a list of file name
extensions and two [`Capabilities`] groups, one for sequence records and one for features. Each
capability is an optional function pointer, so a plugin supplies exactly the entry points its
format supports.

The process-wide table is created on first use from the bundled plugins, unless a custom table
was installed with [`install`] before. It is read-only afterwards.
*/
use std::fmt;
use std::io::{BufRead, Write};

use once_cell::sync::OnceCell;

use crate::dispatch::What;
use crate::feature::Feature;
use crate::meta::Options;
use crate::seq::Seq;
use crate::{io_fasta, io_genbank, io_gff, io_sjson};
use crate::utils::file_extension;


/// Content sniffer, given up to `SNIFF_LEN` bytes from the start of a stream.
pub type SniffFn = fn(&[u8]) -> bool;

/// Lazy sequence of decoded records.
pub type Records<'a, T> = Box<dyn Iterator<Item = crate::Result<T>> + 'a>;

/// Streaming reader.
pub type IterFn<T> = for<'a> fn(Box<dyn BufRead + 'a>, &Options) -> Records<'a, T>;

/// Bulk reader.
pub type ReadFn<T> = fn(&mut dyn BufRead, &Options) -> crate::Result<Vec<T>>;

/// Per-record writer.
pub type WriteOneFn<T> = fn(&T, &mut dyn Write, &Options) -> crate::Result<()>;

/// Bulk writer.
pub type WriteAllFn<T> = fn(&[T], &mut dyn Write, &Options) -> crate::Result<()>;

quick_error! {
    /// Errors that occur when resolving formats.
    #[derive(Debug, Clone, PartialEq)]
    pub enum FormatError {
        /// Occurs when no format matches a name, the content or the file name.
        Unknown(name: Option<String>) {
            display("{}", match name {
                Some(name) => format!("unknown format: '{}'", name),
                None => "format could not be determined".to_owned(),
            })
        }
        /// Occurs when two sniffers of the same priority both match.
        Ambiguous(first: &'static str, second: &'static str) {
            display("content matches both '{}' and '{}' formats", first, second)
        }
        /// Occurs when writing without a file name and without a format.
        Missing {
            display("format must be given when writing without a file name")
        }
        /// Occurs when a format lacks the requested entry point.
        Unsupported { format: &'static str, what: What, capability: Capability } {
            display("format '{}' does not support {} for {}", format, capability, what)
        }
        /// Occurs when registering a format name twice.
        Duplicate(name: &'static str) {
            display("format '{}' is already registered", name)
        }
        /// Occurs when installing a format table after it was set up.
        AlreadyInstalled {
            display("format registry is already initialized")
        }
    }
}

/// Entry points a format may implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Sniff,
    Iter,
    Read,
    WriteOne,
    WriteAll,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Capability::Sniff => "content detection",
            Capability::Iter => "streaming reads",
            Capability::Read => "reads",
            Capability::WriteOne => "per-record writes",
            Capability::WriteAll => "writes",
        };
        write!(f, "{}", name)
    }
}

/// Readers and writers of one record kind.
pub struct Capabilities<T> {
    pub iter: Option<IterFn<T>>,
    pub read: Option<ReadFn<T>>,
    pub write_one: Option<WriteOneFn<T>>,
    pub write_all: Option<WriteAllFn<T>>,
}

impl<T> Capabilities<T> {

    /// Capabilities without any entry point.
    pub const fn none() -> Capabilities<T> {
        Capabilities { iter: None, read: None, write_one: None, write_all: None }
    }

    pub fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::Sniff => false,
            Capability::Iter => self.iter.is_some(),
            Capability::Read => self.read.is_some(),
            Capability::WriteOne => self.write_one.is_some(),
            Capability::WriteAll => self.write_all.is_some(),
        }
    }

    /// Whether records can be read, streaming or in bulk.
    pub fn readable(&self) -> bool {
        self.iter.is_some() || self.read.is_some()
    }

    /// Whether records can be written, one by one or in bulk.
    pub fn writable(&self) -> bool {
        self.write_one.is_some() || self.write_all.is_some()
    }

    fn names(&self) -> Vec<&'static str> {
        [(Capability::Iter, "iter"), (Capability::Read, "read"),
         (Capability::WriteOne, "write_one"), (Capability::WriteAll, "write_all")]
            .iter()
            .filter(|(cap, _)| self.has(*cap))
            .map(|(_, name)| *name)
            .collect()
    }
}

impl<T> Default for Capabilities<T> {
    fn default() -> Capabilities<T> {
        Capabilities::none()
    }
}

impl<T> fmt::Debug for Capabilities<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// A format and the entry points implementing it.
pub struct FormatPlugin {
    /// Unique, lowercase format name.
    pub name: &'static str,
    pub description: &'static str,
    /// Binary formats are only sniffed for sources opened in binary mode.
    pub binary: bool,
    /// Sniffing order within text or binary formats; lower is sniffed first.
    pub priority: u32,
    pub sniff: Option<SniffFn>,
    /// File name extensions without the dot; the first one is canonical.
    pub extensions: &'static [&'static str],
    pub seqs: Capabilities<Seq>,
    pub fts: Capabilities<Feature>,
}

impl fmt::Debug for FormatPlugin {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("FormatPlugin")
            .field("name", &self.name)
            .field("binary", &self.binary)
            .field("priority", &self.priority)
            .field("sniff", &self.sniff.is_some())
            .field("extensions", &self.extensions)
            .field("seqs", &self.seqs)
            .field("fts", &self.fts)
            .finish()
    }
}

impl FormatPlugin {

    /// Whether the format implements the entry point for the record kind.
    pub fn supports(&self, what: What, capability: Capability) -> bool {
        match (capability, what) {
            (Capability::Sniff, _) => self.sniff.is_some(),
            (_, What::Seqs) => self.seqs.has(capability),
            (_, What::Fts) => self.fts.has(capability),
        }
    }

    pub fn readable(&self, what: What) -> bool {
        match what {
            What::Seqs => self.seqs.readable(),
            What::Fts => self.fts.readable(),
        }
    }

    pub fn writable(&self, what: What) -> bool {
        match what {
            What::Seqs => self.seqs.writable(),
            What::Fts => self.fts.writable(),
        }
    }

    /// Whether the extension, given without the leading dot, belongs to the format.
    pub fn has_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }
}

/// Ordered table of formats.
#[derive(Debug, Default)]
pub struct Registry {
    plugins: Vec<FormatPlugin>,
}

impl Registry {

    /// Creates an empty table.
    pub fn new() -> Registry {
        Registry::default()
    }

    /// Creates a table of the bundled formats.
    pub fn builtin() -> Registry {
        let mut registry = Registry::new();
        for plugin in vec![io_fasta::plugin(), io_genbank::plugin(), io_gff::plugin(),
                           io_sjson::plugin()] {
            // bundled names are distinct
            let _ = registry.register(plugin);
        }
        registry
    }

    /// Adds a format, keeping text formats before binary ones, then by priority.
    pub fn register(&mut self, plugin: FormatPlugin) -> Result<(), FormatError> {
        if self.get(plugin.name).is_some() {
            return Err(FormatError::Duplicate(plugin.name));
        }
        let key = (plugin.binary, plugin.priority);
        let pos = self.plugins.iter()
            .position(|p| (p.binary, p.priority) > key)
            .unwrap_or(self.plugins.len());
        self.plugins.insert(pos, plugin);
        Ok(())
    }

    /// Format of the given name, compared case-insensitively.
    pub fn get(&self, name: &str) -> Option<&FormatPlugin> {
        self.plugins.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Format of the given name, or `FormatError::Unknown`.
    pub fn resolve(&self, name: &str) -> Result<&FormatPlugin, FormatError> {
        self.get(name).ok_or_else(|| FormatError::Unknown(Some(name.to_owned())))
    }

    /// Formats in probing order.
    pub fn plugins(&self) -> ::std::slice::Iter<FormatPlugin> {
        self.plugins.iter()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|p| p.name).collect()
    }

    /// Runs the content sniffers of all formats able to read the record kind.
    ///
    /// Binary formats are skipped unless the source is binary. Returns the first match in
    /// probing order, or `FormatError::Ambiguous` if a second format of the same priority also
    /// matches.
    pub fn sniff(&self, buf: &[u8], binary: bool, what: What)
        -> Result<Option<&FormatPlugin>, FormatError>
    {
        let mut candidates = self.plugins.iter()
            .filter(|p| binary || !p.binary)
            .filter(|p| p.readable(what))
            .filter(|p| p.sniff.map_or(false, |sniff| sniff(buf)));
        let first = match candidates.next() {
            Some(p) => p,
            None => return Ok(None),
        };
        match candidates.find(|p| (p.binary, p.priority) == (first.binary, first.priority)) {
            Some(other) => Err(FormatError::Ambiguous(first.name, other.name)),
            None => Ok(Some(first)),
        }
    }

    /// First format in probing order whose extensions include the one of `fname`.
    ///
    /// Only formats that can read (`write == false`) or write the record kind are considered.
    pub fn by_extension(&self, fname: &str, what: What, write: bool) -> Option<&FormatPlugin> {
        let ext = file_extension(fname)?;
        self.plugins.iter()
            .filter(|p| if write { p.writable(what) } else { p.readable(what) })
            .find(|p| p.has_extension(&ext))
    }
}

static REGISTRY: OnceCell<Registry> = OnceCell::new();

/// The process-wide format table, set up with the bundled formats on first use.
pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(|| {
        let registry = Registry::builtin();
        debug!("format registry initialized with {:?}", registry.names());
        registry
    })
}

/// Installs a custom process-wide format table.
///
/// # Errors
///
/// Fails with `FormatError::AlreadyInstalled` if the table was already set up, either by an
/// earlier call or by first use.
pub fn install(registry: Registry) -> Result<(), FormatError> {
    let names = registry.names();
    REGISTRY.set(registry).map_err(|_| FormatError::AlreadyInstalled)?;
    debug!("format registry installed with {:?}", names);
    Ok(())
}
