use memchr::memchr;

use crate::error::{Error, MalformedReason, ParseError};
use crate::table::AggregateTable;
use crate::MAX_KEY_LEN;

pub const FNV1A_OFFSET: u64 = 14695981039346656037;
pub const FNV1A_PRIME: u64 = 1099511628211;

#[inline]
fn fnv1a_step(hash: u64, byte: u8) -> u64 {
    (hash ^ byte as u64).wrapping_mul(FNV1A_PRIME)
}

#[inline]
pub fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV1A_OFFSET, |hash, &b| fnv1a_step(hash, b))
}

#[derive(Debug, PartialEq, Eq)]
pub struct Record<'a> {
    pub key: &'a [u8],
    pub hash: u64,
    /// Tenths of a degree.
    pub value: i32,
}

/// Parse `-?D{1,2}.D` into tenths without going through floats.
#[inline]
pub fn parse_value(bytes: &[u8]) -> Option<i32> {
    #[inline]
    fn digit(b: u8) -> Option<i32> {
        b.is_ascii_digit().then(|| (b - b'0') as i32)
    }

    let (negative, digits) = match bytes.split_first() {
        Some((b'-', rest)) => (true, rest),
        _ => (false, bytes),
    };
    let tenths = match *digits {
        [a, b'.', f] => digit(a)? * 10 + digit(f)?,
        [a, b, b'.', f] => digit(a)? * 100 + digit(b)? * 10 + digit(f)?,
        _ => return None,
    };
    Some(if negative { -tenths } else { tenths })
}

/// Parse the record starting at `pos`, returning it with the position just
/// past its terminator. A record that runs to the end of `span` without a
/// newline is accepted.
pub fn parse_record(
    span: &[u8],
    pos: usize,
    base_offset: u64,
) -> Result<(Record<'_>, usize), ParseError> {
    let malformed = |reason| ParseError {
        offset: base_offset + pos as u64,
        reason,
    };

    let mut hash = FNV1A_OFFSET;
    let mut cur = pos;
    loop {
        match span.get(cur) {
            Some(b';') => break,
            Some(b'\n') | None => return Err(malformed(MalformedReason::MissingDelimiter)),
            Some(&b) => hash = fnv1a_step(hash, b),
        }
        cur += 1;
    }
    let key = &span[pos..cur];
    if key.is_empty() {
        return Err(malformed(MalformedReason::EmptyKey));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(malformed(MalformedReason::KeyTooLong));
    }

    let value_start = cur + 1;
    let value_end = memchr(b'\n', &span[value_start..]).map_or(span.len(), |i| value_start + i);
    let value = parse_value(&span[value_start..value_end])
        .ok_or_else(|| malformed(MalformedReason::BadValue))?;

    Ok((Record { key, hash, value }, value_end + 1))
}

/// Aggregate every record of `span` into `table`.
///
/// `span` must start at a record boundary and contain only whole records.
/// `base_offset` is the file offset of `span[0]`, used in error reports.
/// Returns the number of records parsed.
pub fn parse_all(span: &[u8], base_offset: u64, table: &mut AggregateTable) -> Result<u64, Error> {
    let mut records = 0;
    let mut pos = 0;
    while pos < span.len() {
        let (record, next) = parse_record(span, pos, base_offset)?;
        table.record(record.key, record.hash, record.value)?;
        records += 1;
        pos = next;
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv1a() {
        assert_eq!(fnv1a(b""), FNV1A_OFFSET);
        assert_eq!(fnv1a(b"a"), 0xaf63dc4c8601ec8c);
        assert_eq!(fnv1a(b"foobar"), 0x85944171f73967e8);
        assert_ne!(fnv1a(b"Cardinal"), fnv1a(b"Greater Manchester"));
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value(b"0.0"), Some(0));
        assert_eq!(parse_value(b"-0.0"), Some(0));
        assert_eq!(parse_value(b"1.2"), Some(12));
        assert_eq!(parse_value(b"-1.2"), Some(-12));
        assert_eq!(parse_value(b"12.3"), Some(123));
        assert_eq!(parse_value(b"-99.9"), Some(-999));
        assert_eq!(parse_value(b"-3.4"), Some(-34));
    }

    #[test]
    fn test_parse_value_rejects_out_of_grammar() {
        let cases: &[&[u8]] = &[
            b"",
            b"-",
            b"1",
            b"12",
            b"1.",
            b".5",
            b"1.23",
            b"123.4",
            b"+1.2",
            b"--1.2",
            b"1,2",
            b"a.b",
            b"1.2\r",
            b" 1.2",
        ];
        for &bad in cases {
            assert_eq!(parse_value(bad), None, "{:?}", String::from_utf8_lossy(bad));
        }
    }

    #[test]
    fn test_parse_record() {
        let span = b"Bosaso;5.0\nPetropavlovsk-Kamchatsky;-9.5";
        let (first, next) = parse_record(span, 0, 0).unwrap();
        assert_eq!(first.key, b"Bosaso");
        assert_eq!(first.hash, fnv1a(b"Bosaso"));
        assert_eq!(first.value, 50);
        assert_eq!(next, 11);

        let (second, next) = parse_record(span, next, 0).unwrap();
        assert_eq!(second.key, b"Petropavlovsk-Kamchatsky");
        assert_eq!(second.value, -95);
        assert_eq!(next, span.len() + 1);
    }

    #[test]
    fn test_parse_record_errors_carry_offsets() {
        fn err(span: &[u8]) -> ParseError {
            parse_record(span, 0, 1000).unwrap_err()
        }
        assert_eq!(
            err(b"no delimiter\n"),
            ParseError {
                offset: 1000,
                reason: MalformedReason::MissingDelimiter
            }
        );
        assert_eq!(err(b";1.0\n").reason, MalformedReason::EmptyKey);
        assert_eq!(err(b"Tokyo;1.05\n").reason, MalformedReason::BadValue);
        assert_eq!(err(b"Tokyo;\n").reason, MalformedReason::BadValue);

        let long = [vec![b'x'; 101], b";1.0\n".to_vec()].concat();
        assert_eq!(err(&long).reason, MalformedReason::KeyTooLong);
        let longest = [vec![b'x'; 100], b";1.0\n".to_vec()].concat();
        assert!(parse_record(&longest, 0, 0).is_ok());
    }

    #[test]
    fn test_parse_all() {
        let mut table = AggregateTable::with_capacity(16);
        let span = b"A;3.0\nB;-1.5\nA;7.0\n";
        assert_eq!(parse_all(span, 0, &mut table).unwrap(), 3);

        let a = table.get(b"A", fnv1a(b"A")).unwrap();
        assert_eq!((a.count, a.sum, a.min, a.max), (2, 100, 30, 70));
        let b = table.get(b"B", fnv1a(b"B")).unwrap();
        assert_eq!((b.count, b.sum, b.min, b.max), (1, -15, -15, -15));
    }

    #[test]
    fn test_parse_all_reports_file_offset() {
        let mut table = AggregateTable::with_capacity(16);
        let span = b"A;3.0\nB;x\n";
        match parse_all(span, 500, &mut table) {
            Err(Error::MalformedRecord(e)) => {
                assert_eq!(e.offset, 506);
                assert_eq!(e.reason, MalformedReason::BadValue);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_utf8_keys_are_raw_bytes() {
        let mut table = AggregateTable::with_capacity(16);
        let span = "Zürich;-2.1\nZurich;4.0\nZürich;0.3\n".as_bytes();
        assert_eq!(parse_all(span, 0, &mut table).unwrap(), 3);
        assert_eq!(table.len(), 2);
        let z = "Zürich".as_bytes();
        assert_eq!(table.get(z, fnv1a(z)).unwrap().count, 2);
    }
}
