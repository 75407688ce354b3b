/*! Reader and writer for sjson, the lossless JSON format of sugar.

An sjson document is a JSON object starting with a `_fmtcomment` key, followed by either a
`seqs` array of sequences or an `fts` array of features. Locations keep their defects, strands
and sequence identifiers, so anything written can be read back unchanged.

```json
{"_fmtcomment": "sugar JSON format written by sugar v0.1.0",
 "fts": [{"type": "CDS", "locs": {"locs": [{"start": 9, "stop": 20, "strand": "Forward"}]}}]}
```
*/
use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};
use serde_json::ser::{PrettyFormatter, Serializer};

use crate::feature::{Feature, FeatureList, SortKey};
use crate::meta::Options;
use crate::registry::{Capabilities, FormatPlugin};
use crate::seq::Seq;


/// Name of the format in the registry.
pub const FORMAT: &str = "sjson";

/// Lowercased start of the comment identifying the format.
const MAGIC: &str = "sugar json format";

/// Number of leading bytes the comment is looked for in.
const MAGIC_WINDOW: usize = 51;

/// Creates the registry entry of the format.
pub fn plugin() -> FormatPlugin {
    FormatPlugin {
        name: FORMAT,
        description: "lossless sugar JSON",
        binary: false,
        priority: 40,
        sniff: Some(sniff),
        extensions: &["sjson", "json"],
        seqs: Capabilities {
            read: Some(read_seqs),
            write_all: Some(write_seqs),
            ..Capabilities::none()
        },
        fts: Capabilities {
            read: Some(read_fts),
            write_all: Some(write_fts),
            ..Capabilities::none()
        },
    }
}

/// Comment written as the first member of every document.
pub fn comment() -> String {
    format!("sugar JSON format written by sugar v{}", env!("CARGO_PKG_VERSION"))
}

/// Whether the format comment appears in the first bytes.
pub fn sniff(buf: &[u8]) -> bool {
    let head = &buf[..buf.len().min(MAGIC_WINDOW)];
    String::from_utf8_lossy(head).to_lowercase().contains(MAGIC)
}

#[derive(Serialize)]
struct DocumentRef<'a> {
    #[serde(rename = "_fmtcomment")]
    comment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    seqs: Option<&'a [Seq]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fts: Option<&'a [Feature]>,
}

#[derive(Deserialize)]
struct Document {
    #[serde(default)]
    seqs: Option<Vec<Seq>>,
    #[serde(default)]
    fts: Option<Vec<Feature>>,
}

fn read_document(stream: &mut dyn BufRead) -> crate::Result<Document> {
    let doc: Document = serde_json::from_reader(stream)?;
    debug!("sjson document with {} sequences and {} features",
           doc.seqs.as_ref().map_or(0, Vec::len), doc.fts.as_ref().map_or(0, Vec::len));
    Ok(doc)
}

/// Reads sequences; a features document yields one empty sequence per sequence identifier.
fn read_seqs(stream: &mut dyn BufRead, _opts: &Options) -> crate::Result<Vec<Seq>> {
    let doc = read_document(stream)?;
    let mut seqs = doc.seqs.unwrap_or_default();
    if let Some(fts) = doc.fts {
        let fts = FeatureList::from(fts);
        for (seqid, group) in fts.groupby(&SortKey::Seqid) {
            let mut seq = Seq { id: seqid, ..Seq::default() };
            seq.add_fts(group);
            seqs.push(seq);
        }
    }
    Ok(seqs)
}

/// Reads features; a sequences document yields the features of all sequences.
fn read_fts(stream: &mut dyn BufRead, _opts: &Options) -> crate::Result<Vec<Feature>> {
    let doc = read_document(stream)?;
    let mut fts = doc.fts.unwrap_or_default();
    for seq in doc.seqs.unwrap_or_default() {
        fts.extend(seq.fts);
    }
    Ok(fts)
}

fn write_document(doc: &DocumentRef, stream: &mut dyn Write, opts: &Options)
    -> crate::Result<()>
{
    match opts.parse::<usize>("indent")? {
        Some(indent) => {
            let indent = " ".repeat(indent);
            let formatter = PrettyFormatter::with_indent(indent.as_bytes());
            let mut ser = Serializer::with_formatter(&mut *stream, formatter);
            doc.serialize(&mut ser)?;
        },
        None => serde_json::to_writer(&mut *stream, doc)?,
    }
    writeln!(stream)?;
    Ok(())
}

fn write_seqs(seqs: &[Seq], stream: &mut dyn Write, opts: &Options) -> crate::Result<()> {
    let doc = DocumentRef { comment: comment(), seqs: Some(seqs), fts: None };
    write_document(&doc, stream, opts)
}

fn write_fts(fts: &[Feature], stream: &mut dyn Write, opts: &Options) -> crate::Result<()> {
    let doc = DocumentRef { comment: comment(), seqs: None, fts: Some(fts) };
    write_document(&doc, stream, opts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::parse_location;
    use crate::location::{Defect, Location, LocationTuple, Strand};
    use crate::meta::{Meta, Value};

    fn features() -> Vec<Feature> {
        let loc = Location::new(9, 20).unwrap()
            .with_strand(Strand::Reverse)
            .with_defects(Defect::BeforeRange, Defect::Uncertain)
            .with_seqid(Some("chr2"));
        let mut meta = Meta::new();
        let _ = meta.insert("id", "gene1");
        let _ = meta.entry_map("_gff").insert("score", 0.5);
        vec![
            Feature::new("gene", LocationTuple::from(loc)).with_meta(meta).with_seqid(Some("s1")),
            Feature::new("CDS", parse_location("join(1..10,complement(20..30))").unwrap())
                .with_seqid(Some("s2")),
        ]
    }

    #[test]
    fn lossless_features() {
        let fts = features();
        let mut buf = Vec::new();
        write_fts(&fts, &mut buf, &Options::new()).unwrap();
        assert!(sniff(&buf));
        let back = read_fts(&mut &buf[..], &Options::new()).unwrap();
        assert_eq!(back, fts);
        assert_eq!(back[0].meta().get("_gff").and_then(Value::as_map)
                       .and_then(|m| m.get("score")), Some(&Value::Float(0.5)));
    }

    #[test]
    fn lossless_sequences() {
        let mut seq = Seq::new(Some("s1"), "ACGT");
        let _ = seq.meta.insert("description", "test");
        seq.add_fts(features().into_iter().take(1));
        let seqs = vec![seq, Seq::new(Some("s2"), "TT")];
        let mut buf = Vec::new();
        write_seqs(&seqs, &mut buf, &Options::new().with("indent", "2")).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.starts_with("{\n  \"_fmtcomment\": \"sugar JSON format"));
        let back = read_seqs(&mut &buf[..], &Options::new()).unwrap();
        assert_eq!(back, seqs);
    }

    #[test]
    fn sequences_from_features() {
        let mut buf = Vec::new();
        write_fts(&features(), &mut buf, &Options::new()).unwrap();
        let seqs = read_seqs(&mut &buf[..], &Options::new()).unwrap();
        assert_eq!(seqs.len(), 2);
        assert_eq!(seqs[1].id.as_deref(), Some("s2"));
        assert!(seqs[1].data.is_empty());
        assert_eq!(seqs[1].fts.len(), 1);
    }

    #[test]
    fn sniffing() {
        assert!(sniff(b"{\"_fmtcomment\": \"Sugar JSON format written by sugar v0.1\"}"));
        assert!(!sniff(b"{\"seqs\": []}"));
        assert!(!sniff(b">seq\nACGT"));
    }
}
