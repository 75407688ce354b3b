/*! Features and feature lists.

A [`Feature`] attaches a type tag, a [`LocationTuple`] and free-form metadata to a sequence.
A [`FeatureList`] is an ordered collection of features; insertion order is kept by every
operation unless the operation is explicitly a sort.

Attribute-based operations ([`FeatureList::select`], [`FeatureList::sort`],
[`FeatureList::groupby`]) address feature attributes with a [`SortKey`]: the built-in keys `len`,
`start`, `stop`, `strand`, `type` and `seqid` are resolved first, anything else is looked up in the
metadata, where dots separate the levels of nested maps (`_genbank.gene`).
*/
use std::cmp::Ordering;
use std::ops::{Add, Deref, DerefMut};
use std::str::FromStr;

use linked_hash_map::LinkedHashMap;
use serde::{Deserialize, Serialize};

use crate::consts::{ID_KEY, NAME_KEY};
use crate::location::{LocationError, LocationTuple};
use crate::meta::{Meta, Value};


quick_error! {
    /// Errors that occur when building selection criteria.
    #[derive(Debug, Clone, PartialEq)]
    pub enum SelectError {
        /// Occurs when an operator name is not known.
        UnknownOperator(op: String) {
            display("unknown selection operator: '{}'", op)
        }
        /// Occurs when the criterion value can not be used with its operator.
        InvalidValue(key: String, reason: &'static str) {
            display("invalid value for selection key '{}': {}", key, reason)
        }
    }
}

/// A sequence feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    ftype: String,
    locs: LocationTuple,
    #[serde(default, skip_serializing_if = "Meta::is_empty")]
    meta: Meta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    seqid: Option<String>,
}

impl Feature {

    /// Creates a feature without metadata.
    pub fn new<T: Into<String>>(ftype: T, locs: LocationTuple) -> Feature {
        Feature { ftype: ftype.into(), locs, meta: Meta::new(), seqid: None }
    }

    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = meta;
        self
    }

    pub fn with_seqid<T: Into<String>>(mut self, seqid: Option<T>) -> Self {
        self.seqid = seqid.map(|v| v.into());
        self
    }

    pub fn ftype(&self) -> &str {
        self.ftype.as_str()
    }

    pub fn locs(&self) -> &LocationTuple {
        &self.locs
    }

    pub fn set_locs(&mut self, locs: LocationTuple) {
        self.locs = locs;
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    /// Identifier of the annotated sequence.
    pub fn seqid(&self) -> Option<&str> {
        self.seqid.as_deref()
    }

    pub fn set_seqid<T: Into<String>>(&mut self, seqid: Option<T>) {
        self.seqid = seqid.map(|v| v.into());
    }

    /// Value of the `id` metadata key.
    pub fn id(&self) -> Option<&str> {
        self.meta.get_str(ID_KEY)
    }

    /// Value of the `name` metadata key.
    pub fn name(&self) -> Option<&str> {
        self.meta.get_str(NAME_KEY)
    }

    /// The number of bases between the first start and the last stop.
    pub fn span(&self) -> u64 {
        self.locs.span()
    }

    pub fn contains(&self, other: &Feature) -> bool {
        self.locs.contains(&other.locs)
    }

    pub fn overlaps(&self, other: &Feature) -> bool {
        self.locs.overlaps(&other.locs)
    }

    pub fn overlaplen(&self, other: &Feature) -> u64 {
        self.locs.overlaplen(&other.locs)
    }

    pub fn distance(&self, other: &Feature) -> u64 {
        self.locs.distance(&other.locs)
    }

    /// Returns the feature as seen on the reverse complement of a sequence of length `seqlen`.
    pub fn reversed(&self, seqlen: u64) -> Result<Feature, LocationError> {
        let mut ft = self.clone();
        ft.locs = self.locs.reversed(seqlen)?;
        Ok(ft)
    }

    /// Resolves an attribute of the feature.
    pub fn attr(&self, key: &SortKey) -> Option<Value> {
        match key {
            SortKey::Position => Some(Value::Str(format!("{}..{}", self.locs.start(), self.locs.stop()))),
            SortKey::Len => Some(Value::from(self.span())),
            SortKey::Start => Some(Value::from(self.locs.start())),
            SortKey::Stop => Some(Value::from(self.locs.stop())),
            SortKey::Strand => Some(Value::Str(self.locs.strand().to_string())),
            SortKey::Type => Some(Value::Str(self.ftype.clone())),
            SortKey::Seqid => self.seqid.clone().map(Value::Str),
            SortKey::Meta(path) => {
                let mut parts = path.split('.');
                let mut value = self.meta.get(parts.next()?)?;
                for part in parts {
                    value = value.as_map()?.get(part)?;
                }
                Some(value.clone())
            },
        }
    }
}

/// Feature attribute addressed by selection, sorting and grouping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SortKey {
    /// Start, then stop coordinate.
    Position,
    Len,
    Start,
    Stop,
    Strand,
    Type,
    Seqid,
    /// Metadata key, dot-separated for nested maps.
    Meta(String),
}

impl From<&str> for SortKey {
    fn from(key: &str) -> SortKey {
        match key {
            "position" => SortKey::Position,
            "len" => SortKey::Len,
            "start" => SortKey::Start,
            "stop" => SortKey::Stop,
            "strand" => SortKey::Strand,
            "type" => SortKey::Type,
            "seqid" => SortKey::Seqid,
            other => SortKey::Meta(other.to_owned()),
        }
    }
}

/// Comparison operator of a selection criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    /// At most the given value, same as `Le`.
    Max,
    /// At least the given value, same as `Ge`.
    Min,
    /// Member of a list, or substring of a string.
    In,
}

impl FromStr for SelectOp {
    type Err = SelectError;

    fn from_str(s: &str) -> Result<SelectOp, SelectError> {
        match s {
            "eq" => Ok(SelectOp::Eq),
            "ne" => Ok(SelectOp::Ne),
            "gt" => Ok(SelectOp::Gt),
            "lt" => Ok(SelectOp::Lt),
            "ge" => Ok(SelectOp::Ge),
            "le" => Ok(SelectOp::Le),
            "max" => Ok(SelectOp::Max),
            "min" => Ok(SelectOp::Min),
            "in" => Ok(SelectOp::In),
            other => Err(SelectError::UnknownOperator(other.to_owned())),
        }
    }
}

/// One `key[_op]=value` condition of a selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Criterion {
    key: SortKey,
    op: SelectOp,
    value: Value,
    // `not` prefix of the operator, e.g. `type_noteq`.
    invert_op: bool,
    // `lower` prefix of the operator, e.g. `type_lowereq`.
    lower: bool,
    // `not_` prefix of the key, e.g. `not_type`.
    negate: bool,
}

impl Criterion {

    /// Parses a keyword such as `len_gt`, `not_type` or `gene_id` together with its value.
    ///
    /// A suffix that is not an operator is taken as part of the key, and the operator defaults
    /// to equality.
    pub fn parse<V: Into<Value>>(keyword: &str, value: V) -> Result<Criterion, SelectError> {
        let (negate, keyword) = match keyword.strip_prefix("not_") {
            Some(rest) if !rest.is_empty() => (true, rest),
            _ => (false, keyword),
        };
        let (key, op, invert_op, lower) = keyword.rsplit_once('_')
            .filter(|(head, _)| !head.is_empty())
            .and_then(|(head, tail)| {
                let (invert, tail) = match tail.strip_prefix("not") {
                    Some(rest) => (true, rest),
                    None => (false, tail),
                };
                let (lower, tail) = match tail.strip_prefix("lower") {
                    Some(rest) => (true, rest),
                    None => (false, tail),
                };
                let op = if tail.is_empty() && (invert || lower) {
                    SelectOp::Eq
                } else {
                    tail.parse::<SelectOp>().ok()?
                };
                Some((head, op, invert, lower))
            })
            .unwrap_or((keyword, SelectOp::Eq, false, false));
        Criterion::new(SortKey::from(key), op, value.into())
            .map(|c| Criterion { invert_op, lower, negate, ..c })
    }

    /// Creates a criterion from its parts.
    pub fn new(key: SortKey, op: SelectOp, value: Value) -> Result<Criterion, SelectError> {
        let name = || format!("{:?}", key);
        match (op, &value) {
            (SelectOp::In, Value::List(_)) | (SelectOp::In, Value::Str(_)) => {},
            (SelectOp::In, _) => return Err(SelectError::InvalidValue(
                name(), "membership needs a list or a string")),
            (SelectOp::Eq, _) | (SelectOp::Ne, _) => {},
            (_, Value::Int(_)) | (_, Value::Float(_)) | (_, Value::Str(_)) => {},
            _ => return Err(SelectError::InvalidValue(
                name(), "ordering needs a number or a string")),
        }
        Ok(Criterion { key, op, value, invert_op: false, lower: false, negate: false })
    }

    /// Returns the criterion with its outcome negated.
    pub fn negated(mut self) -> Criterion {
        self.negate = !self.negate;
        self
    }

    pub fn key(&self) -> &SortKey {
        &self.key
    }

    pub fn op(&self) -> SelectOp {
        self.op
    }

    /// Whether the feature satisfies the criterion.
    ///
    /// A missing attribute never satisfies the comparison itself.
    pub fn matches(&self, ft: &Feature) -> bool {
        let hit = match ft.attr(&self.key) {
            Some(value) => self.compare(&value) != self.invert_op,
            None => false,
        };
        hit != self.negate
    }

    fn compare(&self, value: &Value) -> bool {
        match self.op {
            SelectOp::Eq => self.equals(value, &self.value),
            SelectOp::Ne => !self.equals(value, &self.value),
            SelectOp::In => match &self.value {
                Value::List(items) => items.iter().any(|item| self.equals(value, item)),
                Value::Str(s) => self.text(s).contains(&self.text(&value.to_string())),
                _ => false,
            },
            op => {
                let ord = match (value.as_f64(), self.value.as_f64()) {
                    (Some(a), Some(b)) => a.partial_cmp(&b),
                    _ => match (value, &self.value) {
                        (Value::Str(a), Value::Str(b)) => Some(self.text(a).cmp(&self.text(b))),
                        _ => None,
                    },
                };
                match (op, ord) {
                    (_, None) => false,
                    (SelectOp::Gt, Some(o)) => o == Ordering::Greater,
                    (SelectOp::Lt, Some(o)) => o == Ordering::Less,
                    (SelectOp::Ge, Some(o)) | (SelectOp::Min, Some(o)) => o != Ordering::Less,
                    (_, Some(o)) => o != Ordering::Greater,
                }
            },
        }
    }

    fn equals(&self, a: &Value, b: &Value) -> bool {
        let numeric = |v: &Value| matches!(v, Value::Int(_) | Value::Float(_));
        if !self.lower && (numeric(a) || numeric(b)) {
            if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
                return x == y;
            }
        }
        self.text(&a.to_string()) == self.text(&b.to_string())
    }

    fn text(&self, s: &str) -> String {
        if self.lower { s.to_lowercase() } else { s.to_owned() }
    }
}

/// An ordered collection of features.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureList(Vec<Feature>);

impl FeatureList {

    pub fn new() -> FeatureList {
        FeatureList::default()
    }

    pub fn push(&mut self, ft: Feature) {
        self.0.push(ft);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<Feature> {
        self.0
    }

    /// First feature of the given type, compared case-insensitively.
    pub fn get(&self, ftype: &str) -> Option<&Feature> {
        self.0.iter().find(|ft| ft.ftype.eq_ignore_ascii_case(ftype))
    }

    /// Smallest start and largest stop over all features.
    pub fn loc_range(&self) -> Option<(u64, u64)> {
        let start = self.0.iter().map(|ft| ft.locs.start()).min()?;
        let stop = self.0.iter().map(|ft| ft.locs.stop()).max()?;
        Some((start, stop))
    }

    /// Features satisfying all criteria, in their original order.
    pub fn select(&self, criteria: &[Criterion]) -> FeatureList {
        self.0.iter()
            .filter(|ft| criteria.iter().all(|c| c.matches(ft)))
            .cloned()
            .collect()
    }

    /// Keeps only the features satisfying all criteria.
    pub fn select_inplace(&mut self, criteria: &[Criterion]) {
        self.0.retain(|ft| criteria.iter().all(|c| c.matches(ft)));
    }

    /// Features of any of the given types.
    pub fn select_types(&self, ftypes: &[&str]) -> FeatureList {
        self.0.iter()
            .filter(|ft| ftypes.contains(&ft.ftype.as_str()))
            .cloned()
            .collect()
    }

    /// Stable sort by one or more attributes, by position when no key is given.
    ///
    /// Later keys break ties of earlier ones. Features missing an attribute come first, then
    /// numeric values, then the rest compared as text.
    pub fn sort(&mut self, keys: &[SortKey], reverse: bool) {
        let keys: &[SortKey] = if keys.is_empty() { &[SortKey::Position] } else { keys };
        let cmp = |a: &Feature, b: &Feature| {
            keys.iter()
                .map(|key| match key {
                    SortKey::Position => a.locs.cmp_position(&b.locs),
                    key => cmp_values(a.attr(key).as_ref(), b.attr(key).as_ref()),
                })
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        };
        if reverse {
            self.0.sort_by(|a, b| cmp(a, b).reverse());
        } else {
            self.0.sort_by(cmp);
        }
    }

    /// Partitions the features by the rendered value of an attribute.
    ///
    /// Groups appear in order of their first feature; `None` collects features missing the
    /// attribute.
    pub fn groupby(&self, key: &SortKey) -> LinkedHashMap<Option<String>, FeatureList> {
        let mut groups: LinkedHashMap<Option<String>, FeatureList> = LinkedHashMap::new();
        for ft in self.0.iter() {
            let group = ft.attr(key).map(|v| v.to_string());
            groups.entry(group).or_insert_with(FeatureList::new).push(ft.clone());
        }
        groups
    }

    /// Partitions the features by the rendered values of several attributes, as `groupby`.
    pub fn groupby_keys(&self, keys: &[SortKey]) -> LinkedHashMap<Vec<Option<String>>, FeatureList> {
        let mut groups: LinkedHashMap<Vec<Option<String>>, FeatureList> = LinkedHashMap::new();
        for ft in self.0.iter() {
            let group = keys.iter().map(|key| ft.attr(key).map(|v| v.to_string())).collect();
            groups.entry(group).or_insert_with(FeatureList::new).push(ft.clone());
        }
        groups
    }

    /// Removes exact duplicates, keeping the first occurrence.
    pub fn remove_duplicates(&self) -> FeatureList {
        let mut kept: Vec<Feature> = Vec::with_capacity(self.0.len());
        for ft in self.0.iter() {
            if !kept.contains(ft) {
                kept.push(ft.clone());
            }
        }
        FeatureList(kept)
    }

    /// Removes features contained by a better-ranked feature.
    ///
    /// Only features of the same sequence are compared. Features are ranked by start, then by
    /// descending span, then by their position in the list. Survivors keep their original order.
    pub fn remove_nested(&self) -> FeatureList {
        self.remove_dominated(|better, ft| better.contains(ft))
    }

    /// Removes features overlapping a better-ranked feature, ranked as in `remove_nested`.
    pub fn remove_overlapping(&self) -> FeatureList {
        self.remove_dominated(|better, ft| better.overlaps(ft))
    }

    fn remove_dominated<F>(&self, dominates: F) -> FeatureList
        where F: Fn(&Feature, &Feature) -> bool
    {
        let fts = self.remove_duplicates().into_inner();
        let mut rank: Vec<usize> = (0..fts.len()).collect();
        rank.sort_by_key(|&i| (fts[i].locs.start(), ::std::cmp::Reverse(fts[i].span()), i));

        let mut keep = vec![false; fts.len()];
        let mut survivors: Vec<usize> = Vec::new();
        for i in rank {
            let dominated = survivors.iter()
                .any(|&j| fts[j].seqid == fts[i].seqid && dominates(&fts[j], &fts[i]));
            if !dominated {
                keep[i] = true;
                survivors.push(i);
            }
        }
        fts.into_iter()
            .zip(keep)
            .filter_map(|(ft, k)| if k { Some(ft) } else { None })
            .collect()
    }

    /// Features clipped to the window `[lo, hi)`; features left without location are dropped.
    pub fn slice(&self, lo: u64, hi: u64) -> FeatureList {
        self.0.iter()
            .filter_map(|ft| ft.locs.slice(lo, hi).map(|locs| {
                let mut ft = ft.clone();
                ft.locs = locs;
                ft
            }))
            .collect()
    }

    /// Features as seen on the reverse complement of a sequence of length `seqlen`.
    pub fn reversed(&self, seqlen: u64) -> Result<FeatureList, LocationError> {
        self.0.iter().map(|ft| ft.reversed(seqlen)).collect()
    }
}

fn cmp_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None => 0,
            Some(Value::Int(_)) | Some(Value::Float(_)) => 1,
            Some(_) => 2,
        }
    }
    match (a, b) {
        (Some(x), Some(y)) if rank(a) == 1 && rank(b) == 1 => {
            x.as_f64().partial_cmp(&y.as_f64()).unwrap_or(Ordering::Equal)
        },
        (Some(x), Some(y)) if rank(a) == 2 && rank(b) == 2 => x.to_string().cmp(&y.to_string()),
        _ => rank(a).cmp(&rank(b)),
    }
}

impl Deref for FeatureList {
    type Target = [Feature];

    fn deref(&self) -> &[Feature] {
        self.0.as_slice()
    }
}

impl DerefMut for FeatureList {
    fn deref_mut(&mut self) -> &mut [Feature] {
        self.0.as_mut_slice()
    }
}

impl From<Vec<Feature>> for FeatureList {
    fn from(fts: Vec<Feature>) -> FeatureList {
        FeatureList(fts)
    }
}

impl FromIterator<Feature> for FeatureList {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> FeatureList {
        FeatureList(iter.into_iter().collect())
    }
}

impl Extend<Feature> for FeatureList {
    fn extend<I: IntoIterator<Item = Feature>>(&mut self, iter: I) {
        self.0.extend(iter)
    }
}

impl IntoIterator for FeatureList {
    type Item = Feature;
    type IntoIter = ::std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a FeatureList {
    type Item = &'a Feature;
    type IntoIter = ::std::slice::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Add for FeatureList {
    type Output = FeatureList;

    fn add(mut self, other: FeatureList) -> FeatureList {
        self.0.extend(other.0);
        self
    }
}
