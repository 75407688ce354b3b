extern crate sugar;
#[macro_use]
extern crate matches;

use sugar::io_genbank::{Reader, Writer, GENBANK_KEY};
use sugar::{serialize_location, Compound, Defect, Feature, Seq, Strand, Value};


static EXAMPLE_GB: &'static str = include_str!("data/example.gb");


fn read_seqs(data: &str) -> Vec<Seq> {
    Reader::from_reader(data.as_bytes())
        .seqs_stream()
        .collect::<sugar::Result<Vec<Seq>>>()
        .expect("records")
}

fn qualifier<'a>(ft: &'a Feature, key: &str) -> Option<&'a Value> {
    ft.meta().get(GENBANK_KEY).and_then(Value::as_map).and_then(|quals| quals.get(key))
}

#[test]
fn genbank_reader_records() {
    let seqs = read_seqs(EXAMPLE_GB);
    assert_eq!(seqs.len(), 2);

    let first = &seqs[0];
    assert_eq!(first.id.as_deref(), Some("AB000001"));
    assert_eq!(first.len(), 120);
    assert!(first.data.starts_with("ATGAAACTGG"));
    assert_eq!(first.description(),
               Some("Synthetic construct with a spliced gene and a reverse strand tRNA."));
    let ftypes: Vec<&str> = first.fts.iter().map(|ft| ft.ftype()).collect();
    assert_eq!(ftypes, vec!["source", "gene", "mRNA", "CDS", "tRNA", "misc_feature"]);
    assert!(first.fts.iter().all(|ft| ft.seqid() == Some("AB000001")));

    let second = &seqs[1];
    assert_eq!(second.id.as_deref(), Some("AB000002"));
    assert_eq!(second.data, "TTTTTTTTTTGGGGGGGGGGCCCCCCCCCC");
    assert_eq!(second.fts.len(), 1);
    assert_eq!(qualifier(&second.fts[0], "pseudo"), Some(&Value::Bool(true)));
}

#[test]
fn genbank_reader_locations() {
    let seqs = read_seqs(EXAMPLE_GB);
    let fts = &seqs[0].fts;

    let gene = fts.get("gene").expect("a gene");
    assert_eq!(gene.locs().range(), (4, 100));
    assert_eq!(gene.locs().first().defect_start(), Defect::BeyondRange);
    assert_eq!(gene.locs().first().defect_end(), Defect::BeyondRange);

    let mrna = fts.get("mRNA").expect("an mRNA");
    let coords: Vec<(u64, u64)> = mrna.locs().iter().map(|l| (l.start(), l.stop())).collect();
    assert_eq!(coords, vec![(4, 30), (40, 100)]);

    let trna = fts.get("tRNA").expect("a tRNA");
    assert_eq!(trna.locs().range(), (100, 115));
    assert_eq!(trna.locs().strand(), Strand::Reverse);

    let misc = fts.get("misc_feature").expect("a misc_feature");
    assert_eq!(misc.locs().compound(), Compound::Order);
    assert_eq!(serialize_location(misc.locs()), "order(1..2,118..120)");

    let reverse = seqs[1].fts[0].locs();
    assert_eq!(serialize_location(reverse), "complement(join(1..10,21..30))");
}

#[test]
fn genbank_reader_qualifiers() {
    let seqs = read_seqs(EXAMPLE_GB);
    let cds = seqs[0].fts.get("CDS").expect("a CDS");
    assert_eq!(qualifier(cds, "product").and_then(Value::as_str),
               Some("ABC transporter subunit A"));
    assert_eq!(qualifier(cds, "codon_start"), Some(&Value::Int(1)));
    assert_eq!(qualifier(cds, "gene").and_then(Value::as_str), Some("abcA"));
    assert_eq!(qualifier(cds, "translation").and_then(Value::as_str),
               Some("MKLVAAGGTSEQRKLVAAGGTSEQRLV"));
}

#[test]
fn genbank_reader_features_stream() {
    let fts = Reader::from_reader(EXAMPLE_GB.as_bytes())
        .fts_stream()
        .collect::<sugar::Result<Vec<Feature>>>()
        .expect("features");
    assert_eq!(fts.len(), 7);
    assert_eq!(fts[6].seqid(), Some("AB000002"));
}

#[test]
fn genbank_reader_malformed() {
    let data = EXAMPLE_GB.replace("complement(101..115)", "complement(101..115");
    let mut records = Reader::from_reader(data.as_bytes()).seqs_stream();
    assert_matches!(records.next(), Some(Err(sugar::Error::Record(_))));
    assert!(records.next().is_none());

    let data = EXAMPLE_GB.replacen("LOCUS", "LOKUS", 1);
    let mut records = Reader::from_reader(data.as_bytes()).seqs_stream();
    assert_matches!(records.next(), Some(Err(_)));
}

#[test]
fn genbank_writer_round_trip() {
    let seqs = read_seqs(EXAMPLE_GB);
    let mut buf = Vec::new();
    {
        let mut writer = Writer::from_writer(&mut buf);
        for seq in seqs.iter() {
            writer.write_seq(seq).expect("a written record");
        }
    }
    let text = String::from_utf8(buf).expect("UTF-8 output");
    assert!(text.contains("     mRNA            join(<5..30,41..>100)\n"));
    assert!(text.contains("                     /pseudo\n"));
    assert!(text.contains("       61 accagcgaac"));

    let back = read_seqs(&text);
    assert_eq!(back.len(), 2);
    for (ours, theirs) in back.iter().zip(seqs.iter()) {
        assert_eq!(ours.id, theirs.id);
        assert_eq!(ours.data, theirs.data);
        assert_eq!(ours.fts, theirs.fts);
        assert_eq!(ours.description(), theirs.description());
    }
}

#[test]
fn genbank_writer_features_only() {
    let seqs = read_seqs(EXAMPLE_GB);
    let fts: Vec<Feature> = seqs.iter().flat_map(|seq| seq.fts.iter().cloned()).collect();
    let mut buf = Vec::new();
    Writer::from_writer(&mut buf).write_fts(&fts).expect("written features");
    let back = read_seqs(std::str::from_utf8(&buf).expect("UTF-8 output"));
    assert_eq!(back.len(), 2);
    assert!(back.iter().all(|seq| seq.data.is_empty()));
    assert_eq!(back[0].fts.len(), 6);
    assert_eq!(back[1].fts, seqs[1].fts);
}

#[test]
fn genbank_writer_keeps_long_words() {
    let word = "ACGT".repeat(18);
    let data = EXAMPLE_GB.replace("/note=\"terminal repeats\"",
                                  &format!("/note=\"terminal repeats {} end\"", word));
    let seqs = read_seqs(&data);
    let note = format!("terminal repeats {} end", word);
    assert_eq!(qualifier(&seqs[0].fts[5], "note"), Some(&Value::from(note.as_str())));

    let mut buf = Vec::new();
    Writer::from_writer(&mut buf).write_seq(&seqs[0]).expect("a written record");
    let text = String::from_utf8(buf).expect("UTF-8 output");
    assert!(text.lines().any(|line| line.trim() == word));

    let back = read_seqs(&text);
    assert_eq!(qualifier(&back[0].fts[5], "note"), Some(&Value::from(note.as_str())));
    assert_eq!(back[0].fts, seqs[0].fts);
}

#[test]
fn genbank_reader_keywords_ignore_case() {
    let data = EXAMPLE_GB.replace("LOCUS       AB000002", "Locus       AB000002");
    let seqs = read_seqs(&data);
    assert_eq!(seqs[1].id.as_deref(), Some("AB000002"));
    assert_eq!(seqs[1].data, "TTTTTTTTTTGGGGGGGGGGCCCCCCCCCC");
}

#[test]
fn genbank_reader_missing_terminator() {
    let data = EXAMPLE_GB.replacen("//\n", "", 1);
    let mut records = Reader::from_reader(data.as_bytes()).seqs_stream();
    assert_matches!(records.next(),
                    Some(Err(sugar::Error::Record(sugar::RecordError::Malformed { .. }))));
    assert!(records.next().is_none());
}
