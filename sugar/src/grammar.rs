/*! Parser and serializer for INSDC-style location expressions.

Location expressions are the `5..100`, `complement(join(<1..20,30..>45))` strings found in the
feature tables of flat-file annotation formats. Coordinates in the text are 1-based and inclusive;
they are converted to the zero-based, half-open convention of [`Location`] when parsing and back
when serializing.

Supported forms:

* `a..b`, a range; `<` on the start or `>` on the stop marks a fuzzy boundary,
* `a`, a single base, optionally as `<a` or `>a`,
* `a.b`, a single unknown base within the range,
* `a^b`, the insertion point between two adjacent bases,
* `seqid:a..b`, a location on another sequence,
* `join(...)`, `order(...)`, `complement(...)` and `one-of(...)`, nested at will.

Whitespace between tokens is ignored, so wrapped location lines can be passed as they are.
*/
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::location::{Compound, Defect, Location, LocationError, LocationTuple, Strand};


static SIMPLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^(?:(?P<seqid>[^:(),\s]+):)?",
        r"(?P<start_fuzz>[<>])?(?P<start>\d+)",
        r"(?:(?P<sep>\.\.|\.|\^)(?P<stop_fuzz>[<>])?(?P<stop>\d+))?$"))
        .expect("location token regex is valid")
});

/// Parses a location expression into a location tuple.
///
/// # Errors
///
/// Fails with `LocationError::Syntax` on unbalanced parentheses, non-numeric coordinates,
/// unknown operators or trailing text. Nothing of a malformed expression is returned.
pub fn parse_location(text: &str) -> Result<LocationTuple, LocationError> {
    let mut parser = Parser { text, pos: 0, compound: None };
    let mut locs = Vec::new();
    parser.parse_expr(false, &mut locs)?;
    parser.skip_ws();
    if parser.pos < text.len() {
        return Err(parser.error(parser.pos, text.len(), "unexpected trailing text"));
    }
    if locs.iter().any(|loc| loc.seqid().is_some()) {
        warn!("location '{}' refers to another sequence", text.trim());
    }
    let tuple = LocationTuple::new(locs)
        .map_err(|_| parser.error(0, text.len(), "inconsistent strands"))?;
    Ok(tuple.with_compound(parser.compound.unwrap_or_default()))
}

/// Serializes a location tuple into its canonical expression.
///
/// Tuples whose members are all on the reverse strand are written as `complement(join(...))`,
/// while reverse members of mixed-strand tuples are complemented one by one. A single member
/// is written without `join`, but `order` is always kept.
///
/// Some properties have no notation and are normalized, so parsing the result does not give
/// back an equal tuple:
///
/// * undirected and unknown strands are written like forward ones and read back as forward,
/// * boundaries cut by slicing (`Defect::BeforeRange`) are written as `<` or `>` and read back
///   as `Defect::BeyondRange`.
pub fn serialize_location(locs: &LocationTuple) -> String {
    let all_reverse = locs.iter().all(|loc| loc.strand() == Strand::Reverse);
    let members = locs.iter()
        .map(|loc| {
            let text = serialize_single(loc);
            if !all_reverse && loc.strand() == Strand::Reverse {
                format!("complement({})", text)
            } else {
                text
            }
        })
        .collect::<Vec<String>>();

    let body = match locs.compound() {
        Compound::Join if members.len() == 1 => members.concat(),
        Compound::Join => format!("join({})", members.join(",")),
        Compound::Order => format!("order({})", members.join(",")),
    };

    if all_reverse {
        format!("complement({})", body)
    } else {
        body
    }
}

fn serialize_single(loc: &Location) -> String {
    let prefix = match loc.seqid() {
        Some(seqid) => format!("{}:", seqid),
        None => String::new(),
    };
    let (start, stop) = (loc.start(), loc.stop());
    let (dstart, dend) = (loc.defect_start(), loc.defect_end());

    if loc.is_empty() {
        return format!("{}{}^{}", prefix, start, start + 1);
    }
    if dstart == Defect::Uncertain && dend == Defect::Uncertain {
        return format!("one-of({}{}..{})", prefix, start + 1, stop);
    }
    if dstart == Defect::UnknownSingleBase && dend == Defect::UnknownSingleBase {
        return format!("{}{}.{}", prefix, start + 1, stop);
    }
    let open_start = dstart.is_open();
    let open_end = dend.is_open();
    if loc.span() == 1 && !(open_start && open_end) {
        let fuzz = if open_start { "<" } else if open_end { ">" } else { "" };
        return format!("{}{}{}", prefix, fuzz, stop);
    }
    format!("{}{}{}..{}{}",
            prefix,
            if open_start { "<" } else { "" },
            start + 1,
            if open_end { ">" } else { "" },
            stop)
}

/// Recursive descent parser over one expression.
struct Parser<'a> {
    text: &'a str,
    pos: usize,
    // Operator of the outermost join/order seen so far.
    compound: Option<Compound>,
}

impl<'a> Parser<'a> {

    fn error(&self, start: usize, end: usize, reason: &'static str) -> LocationError {
        let end = end.max(start).min(self.text.len());
        let text = if start < end {
            self.text[start..end].to_owned()
        } else {
            self.text.to_owned()
        };
        LocationError::Syntax { text, offset: start, reason }
    }

    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().map_or(false, |b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn parse_expr(&mut self, flip: bool, out: &mut Vec<Location>) -> Result<(), LocationError> {
        self.skip_ws();
        let bytes = self.text.as_bytes();
        let begin = self.pos;
        let word_end = begin + bytes[begin..].iter()
            .take_while(|b| b.is_ascii_alphabetic() || **b == b'-')
            .count();
        let mut paren = word_end;
        while bytes.get(paren).map_or(false, |b| b.is_ascii_whitespace()) {
            paren += 1;
        }

        if word_end == begin || bytes.get(paren) != Some(&b'(') {
            return self.parse_simple(flip, out);
        }

        self.pos = paren + 1;
        match self.text[begin..word_end].to_ascii_lowercase().as_str() {
            "join" => {
                let _ = self.compound.get_or_insert(Compound::Join);
                self.parse_args(flip, out)
            },
            "order" => {
                let _ = self.compound.get_or_insert(Compound::Order);
                self.parse_args(flip, out)
            },
            "complement" => self.parse_args(!flip, out),
            "one-of" => {
                let mut alts = Vec::new();
                self.parse_args(flip, &mut alts)?;
                out.push(merge_alternatives(alts)
                    .map_err(|_| self.error(begin, self.pos, "inconsistent alternatives"))?);
                Ok(())
            },
            _ => Err(self.error(begin, word_end, "unknown operator")),
        }
    }

    fn parse_args(&mut self, flip: bool, out: &mut Vec<Location>) -> Result<(), LocationError> {
        loop {
            self.parse_expr(flip, out)?;
            self.skip_ws();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b')') => {
                    self.pos += 1;
                    return Ok(());
                },
                _ => return Err(self.error(self.pos, self.text.len(), "expected ',' or ')'")),
            }
        }
    }

    fn parse_simple(&mut self, flip: bool, out: &mut Vec<Location>) -> Result<(), LocationError> {
        let begin = self.pos;
        let len = self.text.as_bytes()[begin..].iter()
            .take_while(|b| !matches!(b, b',' | b'(' | b')'))
            .count();
        self.pos = begin + len;

        let token: String = self.text[begin..self.pos].chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        if token.is_empty() {
            return Err(self.error(begin, self.pos + 1, "expected location"));
        }
        let caps = SIMPLE_RE.captures(&token)
            .ok_or_else(|| self.error(begin, self.pos, "invalid coordinates"))?;
        let loc = self.simple_location(&caps)
            .map_err(|reason| self.error(begin, self.pos, reason))?;
        out.push(if flip { loc.with_strand(Strand::Reverse) } else { loc });
        Ok(())
    }

    fn simple_location(&self, caps: &Captures) -> Result<Location, &'static str> {
        let number = |name: &str| -> Result<Option<u64>, &'static str> {
            caps.name(name)
                .map(|m| m.as_str().parse::<u64>().map_err(|_| "coordinate too large"))
                .transpose()
        };
        let fuzz = |name: &str| caps.name(name).map(|m| m.as_str());
        let open = |f: Option<&str>| if f.is_some() { Defect::BeyondRange } else { Defect::None };

        let first = number("start")?.ok_or("missing coordinate")?;
        let seqid = caps.name("seqid").map(|m| m.as_str().to_owned());

        let loc = match (caps.name("sep").map(|m| m.as_str()), number("stop")?) {
            (None, _) | (_, None) => {
                let start = first.checked_sub(1).ok_or("coordinates are 1-based")?;
                let (dstart, dend) = match fuzz("start_fuzz") {
                    Some(">") => (Defect::None, Defect::BeyondRange),
                    Some(_) => (Defect::BeyondRange, Defect::None),
                    None => (Defect::None, Defect::None),
                };
                Location::new(start, first).map(|l| l.with_defects(dstart, dend))
            },
            (Some("^"), Some(second)) => {
                if first.checked_add(1) != Some(second) {
                    return Err("insertion point must lie between adjacent bases");
                }
                Location::new(first, first)
            },
            (Some("."), Some(second)) => {
                let start = first.checked_sub(1).ok_or("coordinates are 1-based")?;
                Location::new(start, second)
                    .map(|l| l.with_defects(Defect::UnknownSingleBase, Defect::UnknownSingleBase))
            },
            (Some(_), Some(second)) => {
                let start = first.checked_sub(1).ok_or("coordinates are 1-based")?;
                Location::new(start, second)
                    .map(|l| l.with_defects(open(fuzz("start_fuzz")), open(fuzz("stop_fuzz"))))
            },
        };

        loc.map(|l| l.with_seqid(seqid)).map_err(|_| "start is larger than stop")
    }
}

/// Collapses the alternatives of a `one-of` into one location covering all of them.
fn merge_alternatives(alts: Vec<Location>) -> Result<Location, LocationError> {
    let tuple = LocationTuple::new(alts)?;
    let first = tuple.first();
    Ok(Location::new(tuple.start(), tuple.stop())?
        .with_strand(first.strand())
        .with_defects(Defect::Uncertain, Defect::Uncertain)
        .with_seqid(first.seqid()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coords(t: &LocationTuple) -> Vec<(u64, u64, Strand)> {
        t.iter().map(|l| (l.start(), l.stop(), l.strand())).collect()
    }

    #[test]
    fn parse_single_base() {
        let t = parse_location("5").unwrap();
        assert_eq!(coords(&t), vec![(4, 5, Strand::Forward)]);
        let t = parse_location(">5").unwrap();
        assert_eq!(t.first().defect_start(), Defect::None);
        assert_eq!(t.first().defect_end(), Defect::BeyondRange);
    }

    #[test]
    fn parse_insertion_point() {
        let t = parse_location("123^124").unwrap();
        assert_eq!(coords(&t), vec![(123, 123, Strand::Forward)]);
        assert!(matches!(parse_location("123^125"), Err(LocationError::Syntax { .. })));
        assert!(matches!(parse_location("18446744073709551615^1"),
                         Err(LocationError::Syntax { .. })));
    }

    #[test]
    fn parse_unknown_single_base() {
        let t = parse_location("102.110").unwrap();
        assert_eq!(coords(&t), vec![(101, 110, Strand::Forward)]);
        assert_eq!(t.first().defect_start(), Defect::UnknownSingleBase);
    }

    #[test]
    fn parse_one_of() {
        let t = parse_location("one-of(10..20, 15..30)").unwrap();
        assert_eq!(coords(&t), vec![(9, 30, Strand::Forward)]);
        assert_eq!(t.first().defect_start(), Defect::Uncertain);
        assert_eq!(serialize_location(&t), "one-of(10..30)");
    }

    #[test]
    fn parse_order_and_seqid() {
        let t = parse_location("order(J00194.1:100..202, 300..400)").unwrap();
        assert_eq!(t.compound(), Compound::Order);
        assert_eq!(t.first().seqid(), Some("J00194.1"));
        assert_eq!(t.locs()[1].seqid(), None);
        assert_eq!(serialize_location(&t), "order(J00194.1:100..202,300..400)");
    }

    #[test]
    fn parse_double_complement() {
        let t = parse_location("complement(complement(1..10))").unwrap();
        assert_eq!(t.strand(), Strand::Forward);
    }

    #[test]
    fn parse_trans_splicing() {
        let t = parse_location("join(complement(20..30),1..10)").unwrap();
        assert_eq!(coords(&t), vec![(19, 30, Strand::Reverse), (0, 10, Strand::Forward)]);
        assert_eq!(serialize_location(&t), "join(complement(20..30),1..10)");
    }

    #[test]
    fn parse_errors_carry_offset() {
        match parse_location("join(1..10,foo(3..4))") {
            Err(LocationError::Syntax { text, offset, .. }) => {
                assert_eq!(text, "foo");
                assert_eq!(offset, 11);
            },
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(parse_location("join(1..10,20..30").is_err());
        assert!(parse_location("1..10)").is_err());
        assert!(parse_location("1..x").is_err());
        assert!(parse_location("").is_err());
        assert!(parse_location("join()").is_err());
        assert!(parse_location("0..10").is_err());
        assert!(parse_location("10..5").is_err());
    }

    #[test]
    fn serialize_canonical_forms() {
        for text in &["340..9442", "<1..>20", "<5", ">5", "5", "102.110", "5^6",
                      "join(1..10,20..30)", "complement(join(1..10,20..30))",
                      "complement(<5..10)", "join(1..10,complement(20..30))"] {
            let t = parse_location(text).unwrap();
            assert_eq!(&serialize_location(&t), text);
        }
    }

    #[test]
    fn truncation_serializes_as_open_boundary() {
        let t = parse_location("1..100").unwrap().slice(10, 50).unwrap();
        assert_eq!(t.first().defect_start(), Defect::BeforeRange);
        assert_eq!(serialize_location(&t), "<11..>50");
        let back = parse_location("<11..>50").unwrap();
        assert_eq!(back.first().defect_start(), Defect::BeyondRange);
        assert_eq!(back.first().defect_end(), Defect::BeyondRange);
        assert_eq!(back.range(), t.range());
    }

    #[test]
    fn single_member_order_is_kept() {
        let t = parse_location("order(1..10)").unwrap();
        assert_eq!(t.compound(), Compound::Order);
        assert_eq!(serialize_location(&t), "order(1..10)");
        assert_eq!(parse_location(&serialize_location(&t)).unwrap(), t);
        let t = parse_location("complement(order(1..10))").unwrap();
        assert_eq!(serialize_location(&t), "complement(order(1..10))");
    }

    #[test]
    fn undirected_strand_is_written_as_forward() {
        let t = LocationTuple::single(0, 10, Strand::Undirected).unwrap();
        assert_eq!(serialize_location(&t), "1..10");
        assert_eq!(parse_location("1..10").unwrap().strand(), Strand::Forward);
    }
}
