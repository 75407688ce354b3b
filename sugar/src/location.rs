/*! Feature locations and their interval algebra.

A [`Location`] is a single zero-based, half-open interval `[start, stop)` carrying a strand, one
defect flag per boundary and an optional reference to another sequence. A [`LocationTuple`] is an
ordered, non-empty group of locations that together describe the position of one (possibly
spliced) feature. Members are kept in transcription order, not coordinate order.

Both types are immutable values: every operation that changes coordinates returns a new value.

The overlap rule is the strict half-open one for every operation in this module: two intervals
overlap iff `a.start < b.stop && b.start < a.stop`. Zero-length locations therefore never overlap
anything, themselves included.
*/
use std::cmp::{max, min, Ordering};
use std::fmt;

use serde::{Deserialize, Serialize};


quick_error! {
    /// Errors that occur when constructing, parsing or transforming locations.
    #[derive(Debug, Clone, PartialEq)]
    pub enum LocationError {
        /// Occurs when a location expression can not be parsed.
        ///
        /// `text` is the offending substring and `offset` its byte offset in the full expression.
        Syntax { text: String, offset: usize, reason: &'static str } {
            display("invalid location expression at offset {}: {} in '{}'", offset, reason, text)
        }
        /// Occurs when the start coordinate is larger than the stop coordinate.
        InvalidRange(start: u64, stop: u64) {
            display("location start {} is larger than its stop {}", start, stop)
        }
        /// Occurs when a location tuple is created without any location.
        Empty {
            display("location tuple must include at least one location")
        }
        /// Occurs when undirected or unknown strands are mixed with other strands in one tuple.
        MixedStrand {
            display("undirected or unknown strands can not be mixed with other strands")
        }
        /// Occurs when coordinate arithmetic leaves the valid coordinate range.
        OutOfBounds(detail: String) {
            display("coordinate out of bounds: {}", detail)
        }
    }
}

/// Strand of a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Strand {
    /// Located on the forward strand, `+`.
    #[default]
    Forward,
    /// Located on the reverse strand, `-`.
    Reverse,
    /// Not associated with any strand, `.`.
    Undirected,
    /// Strandedness is unknown, `?`.
    Unknown,
}

impl Strand {

    /// Parses the one-character strand notation used by tabular formats.
    pub fn from_char(c: char) -> Option<Strand> {
        match c {
            '+' => Some(Strand::Forward),
            '-' => Some(Strand::Reverse),
            '.' => Some(Strand::Undirected),
            '?' => Some(Strand::Unknown),
            _ => None,
        }
    }

    /// Returns the one-character strand notation.
    pub fn to_char(self) -> char {
        match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
            Strand::Undirected => '.',
            Strand::Unknown => '?',
        }
    }

    /// Returns the strand seen from the opposite strand; undirected and unknown stay as they are.
    pub fn reversed(self) -> Strand {
        match self {
            Strand::Forward => Strand::Reverse,
            Strand::Reverse => Strand::Forward,
            other => other,
        }
    }

    /// Whether the strand is forward or reverse.
    #[inline]
    pub fn is_directed(self) -> bool {
        matches!(self, Strand::Forward | Strand::Reverse)
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

/// Uncertainty of a single location boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Defect {
    /// The boundary is exact.
    #[default]
    None,
    /// The true boundary lies outside the stated coordinate (`<` on the start, `>` on the stop).
    BeyondRange,
    /// The feature was truncated at this boundary, e.g. by slicing.
    BeforeRange,
    /// A single unknown base between start and stop is meant (`a.b`).
    UnknownSingleBase,
    /// The boundary is one of several candidate positions (`one-of`).
    Uncertain,
}

impl Defect {

    /// Whether the boundary is exact.
    #[inline]
    pub fn is_none(self) -> bool {
        self == Defect::None
    }

    /// Whether the true boundary lies further out than the stated coordinate.
    #[inline]
    pub fn is_open(self) -> bool {
        matches!(self, Defect::BeyondRange | Defect::BeforeRange)
    }
}

/// Which operator grouped the members of a compound location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Compound {
    /// Members are joined into one contiguous product, `join(...)`.
    #[default]
    Join,
    /// Members appear in the given order but nothing is said about their joining, `order(...)`.
    Order,
}

/// A single contiguous location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "LocationRepr")]
pub struct Location {
    start: u64,
    stop: u64,
    strand: Strand,
    defect_start: Defect,
    defect_end: Defect,
    seqid: Option<String>,
}

/// Unchecked serialized form of a `Location`.
#[derive(Deserialize)]
struct LocationRepr {
    start: u64,
    stop: u64,
    strand: Strand,
    #[serde(default)]
    defect_start: Defect,
    #[serde(default)]
    defect_end: Defect,
    #[serde(default)]
    seqid: Option<String>,
}

impl TryFrom<LocationRepr> for Location {
    type Error = LocationError;

    fn try_from(repr: LocationRepr) -> Result<Self, Self::Error> {
        Ok(Location::new(repr.start, repr.stop)?
            .with_strand(repr.strand)
            .with_defects(repr.defect_start, repr.defect_end)
            .with_seqid(repr.seqid))
    }
}

impl Location {

    /// Creates a forward-strand location without defects.
    ///
    /// `start == stop` is allowed and denotes an insertion point.
    pub fn new(start: u64, stop: u64) -> Result<Location, LocationError> {
        if start > stop {
            return Err(LocationError::InvalidRange(start, stop));
        }
        Ok(Location {
            start,
            stop,
            strand: Strand::Forward,
            defect_start: Defect::None,
            defect_end: Defect::None,
            seqid: None,
        })
    }

    /// Returns the location with the given strand.
    pub fn with_strand(mut self, strand: Strand) -> Self {
        self.strand = strand;
        self
    }

    /// Returns the location with the given boundary defects.
    pub fn with_defects(mut self, defect_start: Defect, defect_end: Defect) -> Self {
        self.defect_start = defect_start;
        self.defect_end = defect_end;
        self
    }

    /// Returns the location referring to another sequence, or to the current one for `None`.
    pub fn with_seqid<T>(mut self, seqid: Option<T>) -> Self
        where T: Into<String>
    {
        self.seqid = seqid.map(|v| v.into());
        self
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn stop(&self) -> u64 {
        self.stop
    }

    pub fn strand(&self) -> Strand {
        self.strand
    }

    pub fn defect_start(&self) -> Defect {
        self.defect_start
    }

    pub fn defect_end(&self) -> Defect {
        self.defect_end
    }

    /// Identifier of the sequence this location refers to, if it is not the current one.
    pub fn seqid(&self) -> Option<&str> {
        self.seqid.as_deref()
    }

    /// Whether either boundary carries a defect.
    pub fn has_defect(&self) -> bool {
        !self.defect_start.is_none() || !self.defect_end.is_none()
    }

    /// The number of bases covered by the location.
    #[inline]
    pub fn span(&self) -> u64 {
        self.stop - self.start
    }

    /// Whether the location is a zero-length insertion point.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.stop
    }

    /// Midpoint of the location, rounded down.
    #[inline]
    pub fn mid(&self) -> u64 {
        self.start + (self.stop - self.start) / 2
    }

    /// Whether the location contains the other one; defects are ignored.
    pub fn contains(&self, other: &Location) -> bool {
        self.start <= other.start && other.stop <= self.stop
    }

    /// Whether the locations overlap.
    pub fn overlaps(&self, other: &Location) -> bool {
        self.start < other.stop && other.start < self.stop
    }

    /// Length of the overlap of both locations.
    pub fn overlaplen(&self, other: &Location) -> u64 {
        min(self.stop, other.stop).saturating_sub(max(self.start, other.start))
    }

    /// Gap between the nearer edges of both locations, zero if they overlap or touch.
    pub fn distance(&self, other: &Location) -> u64 {
        if self.overlaps(other) {
            return 0;
        }
        max(other.start.saturating_sub(self.stop), self.start.saturating_sub(other.stop))
    }

    /// Orders locations by start, then stop.
    pub fn cmp_position(&self, other: &Location) -> Ordering {
        (self.start, self.stop).cmp(&(other.start, other.stop))
    }

    /// Returns the location moved by the given offset.
    pub fn shifted(&self, offset: i64) -> Result<Location, LocationError> {
        let shift = |coord: u64| {
            coord.checked_add_signed(offset)
                .ok_or_else(|| LocationError::OutOfBounds(
                    format!("shifting {} by {}", coord, offset)))
        };
        let mut loc = self.clone();
        loc.start = shift(self.start)?;
        loc.stop = shift(self.stop)?;
        Ok(loc)
    }

    /// Returns the location as seen on the reverse complement of a sequence of length `seqlen`.
    ///
    /// The strand is flipped and the boundary defects swap sides.
    pub fn reversed(&self, seqlen: u64) -> Result<Location, LocationError> {
        if seqlen < self.stop {
            return Err(LocationError::OutOfBounds(
                format!("sequence length {} is smaller than stop {}", seqlen, self.stop)));
        }
        Ok(Location {
            start: seqlen - self.stop,
            stop: seqlen - self.start,
            strand: self.strand.reversed(),
            defect_start: self.defect_end,
            defect_end: self.defect_start,
            seqid: self.seqid.clone(),
        })
    }

    /// Clips the location to the window `[lo, hi)`.
    ///
    /// Returns `None` when nothing of the location falls into the window. Boundaries cut at the
    /// window edge are marked with `Defect::BeforeRange`.
    pub fn clipped(&self, lo: u64, hi: u64) -> Option<Location> {
        let inside = if self.is_empty() {
            lo <= self.start && self.start < hi
        } else {
            self.start < hi && self.stop > lo
        };
        if !inside {
            return None;
        }
        let mut loc = self.clone();
        if self.start < lo {
            loc.start = lo;
            loc.defect_start = Defect::BeforeRange;
        }
        if self.stop > hi {
            loc.stop = hi;
            loc.defect_end = Defect::BeforeRange;
        }
        Some(loc)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(seqid) = self.seqid() {
            write!(f, "{}:", seqid)?;
        }
        write!(f, "[{}, {}){}", self.start, self.stop, self.strand)
    }
}

/// An ordered, non-empty group of locations describing one feature position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "TupleRepr")]
pub struct LocationTuple {
    locs: Vec<Location>,
    compound: Compound,
}

/// Unchecked serialized form of a `LocationTuple`.
#[derive(Deserialize)]
struct TupleRepr {
    locs: Vec<Location>,
    #[serde(default)]
    compound: Compound,
}

impl TryFrom<TupleRepr> for LocationTuple {
    type Error = LocationError;

    fn try_from(repr: TupleRepr) -> Result<Self, Self::Error> {
        Ok(LocationTuple::new(repr.locs)?.with_compound(repr.compound))
    }
}

impl LocationTuple {

    /// Creates a tuple from locations given in transcription order.
    ///
    /// Forward and reverse members may be mixed (trans-splicing), but undirected or unknown
    /// strands must be shared by all members.
    pub fn new(locs: Vec<Location>) -> Result<LocationTuple, LocationError> {
        let first = locs.first().ok_or(LocationError::Empty)?;
        let strand = first.strand;
        let consistent = locs.iter()
            .all(|loc| loc.strand == strand || (loc.strand.is_directed() && strand.is_directed()));
        if !consistent {
            return Err(LocationError::MixedStrand);
        }
        Ok(LocationTuple { locs, compound: Compound::Join })
    }

    /// Creates a tuple of a single location.
    pub fn single(start: u64, stop: u64, strand: Strand) -> Result<LocationTuple, LocationError> {
        Ok(LocationTuple::from(Location::new(start, stop)?.with_strand(strand)))
    }

    /// Returns the tuple marked with the given compound operator.
    pub fn with_compound(mut self, compound: Compound) -> Self {
        self.compound = compound;
        self
    }

    pub fn compound(&self) -> Compound {
        self.compound
    }

    pub fn locs(&self) -> &[Location] {
        self.locs.as_slice()
    }

    pub fn iter(&self) -> ::std::slice::Iter<Location> {
        self.locs.iter()
    }

    pub fn len(&self) -> usize {
        self.locs.len()
    }

    /// Always false, tuples contain at least one location.
    pub fn is_empty(&self) -> bool {
        self.locs.is_empty()
    }

    /// First location in transcription order.
    pub fn first(&self) -> &Location {
        &self.locs[0]
    }

    /// Last location in transcription order.
    pub fn last(&self) -> &Location {
        &self.locs[self.locs.len() - 1]
    }

    /// Smallest start coordinate of all members.
    pub fn start(&self) -> u64 {
        self.locs.iter().map(|loc| loc.start).min().unwrap_or(0)
    }

    /// Largest stop coordinate of all members.
    pub fn stop(&self) -> u64 {
        self.locs.iter().map(|loc| loc.stop).max().unwrap_or(0)
    }

    /// Tuple-wide `(start, stop)`.
    pub fn range(&self) -> (u64, u64) {
        (self.start(), self.stop())
    }

    /// Midpoint of the tuple-wide range, rounded down.
    pub fn mid(&self) -> u64 {
        self.start() + self.span() / 2
    }

    /// The number of bases between the tuple-wide start and stop.
    pub fn span(&self) -> u64 {
        self.stop() - self.start()
    }

    /// Strand of the first member.
    pub fn strand(&self) -> Strand {
        self.first().strand
    }

    /// Whether every member of `other` is contained by some member of this tuple.
    pub fn contains(&self, other: &LocationTuple) -> bool {
        other.locs.iter()
            .all(|theirs| self.locs.iter().any(|ours| ours.contains(theirs)))
    }

    /// Whether any pair of members overlaps.
    pub fn overlaps(&self, other: &LocationTuple) -> bool {
        self.locs.iter()
            .any(|ours| other.locs.iter().any(|theirs| ours.overlaps(theirs)))
    }

    /// Sum of the overlap lengths over all member pairs.
    pub fn overlaplen(&self, other: &LocationTuple) -> u64 {
        self.locs.iter()
            .flat_map(|ours| other.locs.iter().map(move |theirs| ours.overlaplen(theirs)))
            .sum()
    }

    /// Minimum distance over all member pairs.
    pub fn distance(&self, other: &LocationTuple) -> u64 {
        self.locs.iter()
            .flat_map(|ours| other.locs.iter().map(move |theirs| ours.distance(theirs)))
            .min()
            .unwrap_or(0)
    }

    /// Orders tuples by their tuple-wide start, then stop.
    pub fn cmp_position(&self, other: &LocationTuple) -> Ordering {
        self.range().cmp(&other.range())
    }

    /// Returns the tuple clipped to the window `[lo, hi)`.
    ///
    /// Members entirely outside the window are dropped and truncated boundaries are marked
    /// with `Defect::BeforeRange`. Returns `None` if no member remains.
    pub fn slice(&self, lo: u64, hi: u64) -> Option<LocationTuple> {
        let locs: Vec<Location> = self.locs.iter()
            .filter_map(|loc| loc.clipped(lo, hi))
            .collect();
        if locs.is_empty() {
            None
        } else {
            Some(LocationTuple { locs, compound: self.compound })
        }
    }

    /// Returns the tuple with every member moved by the given offset.
    pub fn shifted(&self, offset: i64) -> Result<LocationTuple, LocationError> {
        let locs = self.locs.iter()
            .map(|loc| loc.shifted(offset))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(LocationTuple { locs, compound: self.compound })
    }

    /// Returns the tuple as seen on the reverse complement of a sequence of length `seqlen`.
    ///
    /// Members keep their transcription order.
    pub fn reversed(&self, seqlen: u64) -> Result<LocationTuple, LocationError> {
        let locs = self.locs.iter()
            .map(|loc| loc.reversed(seqlen))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(LocationTuple { locs, compound: self.compound })
    }
}

impl From<Location> for LocationTuple {
    fn from(loc: Location) -> LocationTuple {
        LocationTuple { locs: vec![loc], compound: Compound::Join }
    }
}

impl<'a> IntoIterator for &'a LocationTuple {
    type Item = &'a Location;
    type IntoIter = ::std::slice::Iter<'a, Location>;

    fn into_iter(self) -> Self::IntoIter {
        self.locs.iter()
    }
}
