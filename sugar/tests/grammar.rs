extern crate sugar;
#[macro_use]
extern crate matches;

use sugar::{parse_location, serialize_location, Compound, Defect, LocationError, Strand};
use Strand::*;


fn ranges(text: &str) -> Vec<(u64, u64, Strand)> {
    parse_location(text).expect("a location")
        .iter()
        .map(|loc| (loc.start(), loc.stop(), loc.strand()))
        .collect()
}

#[test]
fn simple_range_is_zero_based_half_open() {
    assert_eq!(ranges("341..9442"), vec![(340, 9442, Forward)]);
    assert_eq!(ranges("  7  "), vec![(6, 7, Forward)]);
}

#[test]
fn join_keeps_member_order() {
    assert_eq!(ranges("join(12..78,134..202)"), vec![(11, 78, Forward), (133, 202, Forward)]);
    assert_eq!(ranges("join(134..202,12..78)"), vec![(133, 202, Forward), (11, 78, Forward)]);
    assert_eq!(parse_location("order(1..5,8..9)").unwrap().compound(), Compound::Order);
}

#[test]
fn complement_of_join() {
    assert_eq!(ranges("complement(join(2691..4571,4918..5163))"),
               vec![(2690, 4571, Reverse), (4917, 5163, Reverse)]);
    assert_eq!(ranges("join(complement(4918..5163),complement(2691..4571))"),
               vec![(4917, 5163, Reverse), (2690, 4571, Reverse)]);
    assert_eq!(ranges("join(1..10,complement(20..30))"),
               vec![(0, 10, Forward), (19, 30, Reverse)]);
}

#[test]
fn fuzzy_boundaries() {
    let locs = parse_location("<5..10").unwrap();
    let loc = locs.first();
    assert_eq!((loc.start(), loc.stop()), (4, 10));
    assert_eq!(loc.defect_start(), Defect::BeyondRange);
    assert_eq!(loc.defect_end(), Defect::None);

    let loc = parse_location("1..>888").unwrap().first().clone();
    assert_eq!(loc.defect_end(), Defect::BeyondRange);

    let loc = parse_location("102.110").unwrap().first().clone();
    assert_eq!((loc.start(), loc.stop()), (101, 110));
    assert_eq!(loc.defect_start(), Defect::UnknownSingleBase);
}

#[test]
fn between_bases() {
    let loc = parse_location("123^124").unwrap().first().clone();
    assert_eq!((loc.start(), loc.stop()), (123, 123));
    assert!(loc.is_empty());
    assert_matches!(parse_location("123^125"), Err(LocationError::Syntax { .. }));
    assert_matches!(parse_location("18446744073709551615^1"), Err(LocationError::Syntax { .. }));
}

#[test]
fn remote_reference() {
    let locs = parse_location("join(1..10,J00194.1:100..202)").unwrap();
    assert_eq!(locs.locs()[0].seqid(), None);
    assert_eq!(locs.locs()[1].seqid(), Some("J00194.1"));
    assert_eq!(serialize_location(&locs), "join(1..10,J00194.1:100..202)");
}

#[test]
fn malformed_expressions() {
    assert_matches!(parse_location(""), Err(LocationError::Syntax { .. }));
    assert_matches!(parse_location("join(1..10"), Err(LocationError::Syntax { .. }));
    assert_matches!(parse_location("join(1..10,)"), Err(LocationError::Syntax { .. }));
    assert_matches!(parse_location("complement(1..10) x"), Err(LocationError::Syntax { .. }));
    assert_matches!(parse_location("20..10"), Err(_));
}

#[test]
fn canonical_round_trip() {
    for text in &["340..9442",
                  "<1..>20",
                  "5^6",
                  "complement(join(1..10,20..30))",
                  "join(1..10,complement(20..30))",
                  "order(1..2,118..120)",
                  "order(1..10)",
                  "complement(<1..206)"] {
        let locs = parse_location(text).unwrap();
        assert_eq!(&serialize_location(&locs), text);
        assert_eq!(parse_location(&serialize_location(&locs)).unwrap(), locs);
    }
}

#[test]
fn normalizing_round_trip() {
    let locs = parse_location("join(complement(20..30),complement(1..10))").unwrap();
    let text = serialize_location(&locs);
    assert_eq!(parse_location(&text).unwrap(), locs);
}

#[test]
fn sliced_locations_read_back_as_fuzzy() {
    let sliced = parse_location("join(1..40,61..100)").unwrap().slice(10, 80).unwrap();
    assert_eq!(sliced.first().defect_start(), Defect::BeforeRange);
    assert_eq!(sliced.last().defect_end(), Defect::BeforeRange);
    let text = serialize_location(&sliced);
    assert_eq!(text, "join(<11..40,61..>80)");

    let back = parse_location(&text).unwrap();
    assert_eq!(back.first().defect_start(), Defect::BeyondRange);
    assert_eq!(back.last().defect_end(), Defect::BeyondRange);
    let coords = |t: &sugar::LocationTuple| -> Vec<(u64, u64)> {
        t.iter().map(|l| (l.start(), l.stop())).collect()
    };
    assert_eq!(coords(&back), coords(&sliced));
    assert_eq!(serialize_location(&back), text);
}
