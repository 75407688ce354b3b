//! Minimal sequence record exchanged with format plugins.
use serde::{Deserialize, Serialize};

use crate::consts::{DEF_ID, FMT_KEY};
use crate::feature::{Feature, FeatureList};
use crate::meta::{Meta, Value};


/// A sequence with its metadata and the features annotating it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Seq {
    #[serde(default)]
    pub id: Option<String>,
    pub data: String,
    #[serde(default, skip_serializing_if = "Meta::is_empty")]
    pub meta: Meta,
    #[serde(default, skip_serializing_if = "FeatureList::is_empty")]
    pub fts: FeatureList,
}

impl Seq {

    pub fn new<T: Into<String>>(id: Option<T>, data: T) -> Seq {
        Seq { id: id.map(|v| v.into()), data: data.into(), ..Seq::default() }
    }

    /// Identifier of the sequence, or a placeholder when it is unknown.
    pub fn id_or_default(&self) -> &str {
        self.id.as_deref().unwrap_or(DEF_ID)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Name of the format the sequence was read from.
    pub fn fmt(&self) -> Option<&str> {
        self.meta.get_str(FMT_KEY)
    }

    /// Attaches features, setting their sequence identifier to this sequence.
    pub fn add_fts<I>(&mut self, fts: I)
        where I: IntoIterator<Item = Feature>
    {
        let id = self.id.clone();
        self.fts.extend(fts.into_iter().map(|mut ft| {
            if ft.seqid().is_none() {
                ft.set_seqid(id.clone());
            }
            ft
        }));
    }

    /// Description line kept in the `description` metadata key.
    pub fn description(&self) -> Option<&str> {
        self.meta.get("description").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::{LocationTuple, Strand};

    #[test]
    fn attached_features_inherit_seqid() {
        let mut seq = Seq::new(Some("chr1"), "ACGT");
        let locs = LocationTuple::single(0, 2, Strand::Forward).unwrap();
        seq.add_fts(vec![Feature::new("gene", locs.clone()),
                         Feature::new("gene", locs).with_seqid(Some("chr2"))]);
        let ids: Vec<_> = seq.fts.iter().map(|ft| ft.seqid()).collect();
        assert_eq!(ids, vec![Some("chr1"), Some("chr2")]);
        assert_eq!(seq.len(), 4);
    }

    #[test]
    fn placeholder_id() {
        let seq = Seq::new(None, "AC");
        assert_eq!(seq.id_or_default(), "<unknown>");
        assert_eq!(seq.fmt(), None);
    }
}
