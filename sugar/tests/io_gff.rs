extern crate sugar;
#[macro_use]
extern crate matches;

use sugar::io_gff::{Reader, Writer, GFF_KEY};
use sugar::{Feature, Strand, Value};


static EXAMPLE_GFF: &'static str = include_str!("data/example.gff");


fn read_fts(data: &str) -> Vec<Feature> {
    Reader::from_reader(data.as_bytes())
        .fts_stream()
        .collect::<sugar::Result<Vec<Feature>>>()
        .expect("features")
}

fn gff_attr<'a>(ft: &'a Feature, key: &str) -> Option<&'a Value> {
    ft.meta().get(GFF_KEY).and_then(Value::as_map).and_then(|gff| gff.get(key))
}

#[test]
fn gff_reader_example() {
    let fts = read_fts(EXAMPLE_GFF);
    assert_eq!(fts.len(), 7);

    let gene1 = &fts[0];
    assert_eq!(gene1.ftype(), "gene");
    assert_eq!(gene1.seqid(), Some("chr1"));
    assert_eq!(gene1.id(), Some("gene1"));
    assert_eq!(gene1.name(), Some("abcA"));
    assert_eq!(gene1.locs().range(), (1000, 4000));
    assert_eq!(gene1.locs().strand(), Strand::Forward);
    assert_eq!(gff_attr(gene1, "source").and_then(Value::as_str), Some("test"));
    assert_eq!(gff_attr(gene1, "score"), None);

    let gene2 = &fts[5];
    assert_eq!(gene2.name(), Some("nested;gene"));
    assert_eq!(gene2.locs().strand(), Strand::Reverse);
    assert_eq!(gff_attr(gene2, "Note"),
               Some(&Value::List(vec!["inside".into(), "gene1".into()])));

    let gene3 = &fts[6];
    assert_eq!(gene3.seqid(), Some("chr2"));
    assert_eq!(gene3.locs().strand(), Strand::Undirected);
    assert_eq!(gff_attr(gene3, "score").and_then(Value::as_f64), Some(0.5));
}

#[test]
fn gff_reader_merges_rows_of_one_feature() {
    let fts = read_fts(EXAMPLE_GFF);
    let cds = &fts[4];
    assert_eq!(cds.id(), Some("cds1"));
    let coords: Vec<(u64, u64)> = cds.locs().iter().map(|l| (l.start(), l.stop())).collect();
    assert_eq!(coords, vec![(1200, 1500), (3000, 3902)]);
    assert_eq!(gff_attr(cds, "phase").and_then(Value::as_str), Some("0"));
}

#[test]
fn gff_reader_type_filter() {
    let mut reader = Reader::from_reader(EXAMPLE_GFF.as_bytes());
    let _ = reader.types(vec!["exon", "CDS"]);
    let fts = reader.fts_stream().collect::<sugar::Result<Vec<Feature>>>().unwrap();
    let ids: Vec<&str> = fts.iter().filter_map(|ft| ft.id()).collect();
    assert_eq!(ids, vec!["exon1", "exon2", "cds1"]);
}

#[test]
fn gff_reader_malformed() {
    let data = EXAMPLE_GFF.replace("1001\t1500", "1001\t1500\tx");
    let results: Vec<sugar::Result<Feature>> = Reader::from_reader(data.as_bytes())
        .fts_stream()
        .collect();
    assert_matches!(results[2], Err(sugar::Error::Record(_)));

    let data = EXAMPLE_GFF.replace("\t+\t.\tID=gene1", "\t*\t.\tID=gene1");
    let first = Reader::from_reader(data.as_bytes()).fts_stream().next();
    assert_matches!(first, Some(Err(_)));
}

#[test]
fn gff_writer_round_trip() {
    let fts = read_fts(EXAMPLE_GFF);
    let mut buf = Vec::new();
    {
        let mut writer = Writer::from_writer(&mut buf);
        writer.write_header(false).unwrap();
        for ft in fts.iter() {
            writer.write_feature(ft).unwrap();
        }
        writer.flush().unwrap();
    }
    let text = String::from_utf8(buf).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("##gff-version 3"));
    assert_eq!(lines.next(),
               Some("chr1\ttest\tgene\t1001\t4000\t.\t+\t.\tID=gene1;Name=abcA"));
    assert!(text.contains("\tID=gene2;Name=nested%3Bgene;Note=inside,gene1\n"));
    assert_eq!(text.lines().filter(|l| l.contains("ID=cds1")).count(), 2);

    assert_eq!(read_fts(&text), fts);
}

#[test]
fn gff_writer_keeps_phase_per_row() {
    let data = "##gff-version 3\n\
        chr1\tsrc\tCDS\t1\t10\t.\t+\t0\tID=c1\n\
        chr1\tsrc\tCDS\t21\t30\t.\t+\t2\tID=c1\n\
        chr1\tsrc\tCDS\t41\t50\t.\t+\t.\tID=c1\n";
    let fts = read_fts(data);
    assert_eq!(fts.len(), 1);
    assert_eq!(gff_attr(&fts[0], "phase"),
               Some(&Value::List(vec!["0".into(), "2".into(), ".".into()])));

    let mut buf = Vec::new();
    {
        let mut writer = Writer::from_writer(&mut buf);
        writer.write_header(false).unwrap();
        writer.write_feature(&fts[0]).unwrap();
        writer.flush().unwrap();
    }
    let text = String::from_utf8(buf).unwrap();
    let phases: Vec<&str> = text.lines().skip(1)
        .map(|l| l.split('\t').nth(7).unwrap())
        .collect();
    assert_eq!(phases, vec!["0", "2", "."]);
    assert_eq!(read_fts(&text), fts);
}

#[test]
fn gff_reader_yields_feature_before_merge_error() {
    let data = EXAMPLE_GFF.replace("3001\t3902\t.\t+", "3001\t3902\t.\t.");
    let results: Vec<sugar::Result<Feature>> = Reader::from_reader(data.as_bytes())
        .fts_stream()
        .collect();
    let cds = results.iter().filter_map(|r| r.as_ref().ok()).find(|ft| ft.id() == Some("cds1"));
    assert_eq!(cds.map(|ft| ft.locs().len()), Some(1));
    assert_matches!(results[5], Err(sugar::Error::Record(_)));
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 7);
}
