extern crate sugar;
#[macro_use]
extern crate matches;

use sugar::io_gff::Reader;
use sugar::{Criterion, Feature, FeatureList, SelectError, SortKey, Strand, Value};


static EXAMPLE_GFF: &'static str = include_str!("data/example.gff");


fn example() -> FeatureList {
    Reader::from_reader(EXAMPLE_GFF.as_bytes())
        .fts_stream()
        .collect::<sugar::Result<FeatureList>>()
        .expect("features")
}

fn ids(fts: &FeatureList) -> Vec<&str> {
    fts.iter().map(|ft| ft.id().unwrap_or("")).collect()
}

fn select(fts: &FeatureList, keyword: &str, value: Value) -> FeatureList {
    fts.select(&[Criterion::parse(keyword, value).expect("a criterion")])
}

#[test]
fn select_by_length() {
    let fts = example();
    assert_eq!(ids(&select(&fts, "len_gt", Value::Int(500))),
               vec!["gene1", "mrna1", "exon2", "cds1"]);
    assert_eq!(ids(&select(&fts, "len_le", Value::Int(500))), vec!["exon1", "gene2", "gene3"]);
}

#[test]
fn select_by_type_and_metadata() {
    let fts = example();
    assert_eq!(ids(&select(&fts, "type", Value::from("gene"))), vec!["gene1", "gene2", "gene3"]);
    assert_eq!(ids(&select(&fts, "type_lowereq", Value::from("CDS"))), vec!["cds1"]);
    assert_eq!(select(&fts, "not_type", Value::from("gene")).len(), 4);
    assert_eq!(ids(&select(&fts, "_gff.Parent", Value::from("mrna1"))),
               vec!["exon1", "exon2", "cds1"]);
    assert_eq!(ids(&select(&fts, "seqid_in", Value::List(vec!["chr2".into(), "chr9".into()]))),
               vec!["gene3"]);
    assert_eq!(ids(&select(&fts, "strand", Value::from("-"))), vec!["gene2"]);
}

#[test]
fn select_with_several_criteria() {
    let fts = example();
    let criteria = [Criterion::parse("type", "gene").unwrap(),
                    Criterion::parse("start_ge", Value::Int(1000)).unwrap()];
    assert_eq!(ids(&fts.select(&criteria)), vec!["gene1", "gene2"]);
}

#[test]
fn select_invalid() {
    assert_matches!(Criterion::parse("len_in", Value::Int(3)), Err(SelectError::InvalidValue(..)));
    assert_matches!(Criterion::parse("len_gt", Value::Bool(true)),
                    Err(SelectError::InvalidValue(..)));
}

#[test]
fn remove_nested_keeps_containers() {
    let fts = example();
    let outer = fts.remove_nested();
    assert_eq!(ids(&outer), vec!["gene1", "gene3"]);

    let exons = fts.select_types(&["exon", "gene"]).remove_nested();
    assert_eq!(ids(&exons), vec!["gene1", "gene3"]);
}

#[test]
fn remove_overlapping() {
    let fts = example().select_types(&["exon", "CDS"]);
    assert_eq!(ids(&fts.remove_overlapping()), vec!["exon1", "exon2"]);
}

#[test]
fn sort_and_group() {
    let mut fts = example();
    fts.sort(&[SortKey::Len], true);
    assert_eq!(fts[0].id(), Some("gene1"));
    assert_eq!(fts[fts.len() - 1].id(), Some("gene2"));

    fts.sort(&[], false);
    assert_eq!(ids(&fts), vec!["gene3", "exon1", "gene1", "mrna1", "gene2", "cds1", "exon2"]);

    let groups = example().groupby(&SortKey::Seqid);
    let keys: Vec<Option<&str>> = groups.keys().map(|k| k.as_deref()).collect();
    assert_eq!(keys, vec![Some("chr1"), Some("chr2")]);
    assert_eq!(groups[&Some("chr1".to_owned())].len(), 6);
}

#[test]
fn merged_rows() {
    let fts = example();
    let cds: &Feature = fts.get("cds").expect("a CDS");
    assert_eq!(cds.locs().len(), 2);
    assert_eq!(cds.locs().range(), (1200, 3902));
    assert_eq!(cds.span(), 2702);
    assert_eq!(cds.locs().strand(), Strand::Forward);
}

#[test]
fn slice_and_reverse() {
    let fts = example();
    let window = fts.slice(1400, 3100);
    assert_eq!(window.len(), 5);
    assert_eq!(window.get("gene").map(|ft| ft.locs().range()), Some((1400, 3100)));

    let rev = fts.select_types(&["gene"]).reversed(5000).unwrap();
    assert_eq!(rev[0].locs().range(), (1000, 4000));
    assert_eq!(rev[0].locs().strand(), Strand::Reverse);
    assert_eq!(rev[1].locs().strand(), Strand::Forward);
}
