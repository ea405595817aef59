use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, Context};

use crate::error::MalformedRecordError;

const SEPARATOR: &str = ". ";

/// A single line of the data file: `<key_number>. <key_text>`.
///
/// Records are ordered by `key_text` (byte-wise), ties broken by `key_number` ascending. The same
/// order is used to sort chunks and to merge runs, so chunk local order composes into global order.
///
/// # Examples
/// ```
/// use record_file_sort::record::Record;
///
/// let record = Record::parse("415. Apple").unwrap();
/// assert_eq!(record.key_number(), 415);
/// assert_eq!(record.key_text(), "Apple");
/// assert_eq!(record.format(), "415. Apple");
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Record {
    key_number: i64,
    key_text: String,
}

impl Record {
    pub fn new(key_number: i64, key_text: String) -> Record {
        Record {
            key_number,
            key_text,
        }
    }

    /// Parse a line without its line break. The line is split on the first `". "`, everything after
    /// it is the text, including further separators.
    pub fn parse(line: &str) -> Result<Record, MalformedRecordError> {
        let (number, text) = line.split_once(SEPARATOR).ok_or_else(||
            MalformedRecordError::MissingSeparator {
                line: line.to_string(),
            }
        )?;
        let key_number = i64::from_str(number).map_err(|e|
            MalformedRecordError::InvalidNumber {
                line: line.to_string(),
                number: number.to_string(),
                source: e,
            }
        )?;

        Ok(
            Record {
                key_number,
                key_text: text.to_string(),
            }
        )
    }

    /// Parse a raw line without its line break.
    pub fn from_bytes(line: &[u8]) -> Result<Record, MalformedRecordError> {
        let line = std::str::from_utf8(line).map_err(|_|
            MalformedRecordError::InvalidUtf8 {
                line: String::from_utf8_lossy(line).into_owned(),
            }
        )?;
        Self::parse(line)
    }

    /// The canonical line form without a line break. `Record::parse(&r.format()) == Ok(r)`.
    pub fn format(&self) -> String {
        self.to_string()
    }

    pub fn key_number(&self) -> i64 {
        self.key_number
    }

    pub fn key_text(&self) -> &str {
        &self.key_text
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}{}", self.key_number, SEPARATOR, self.key_text)
    }
}

impl PartialOrd<Self> for Record {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Record {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key_text.as_bytes().cmp(other.key_text.as_bytes())
            .then_with(|| self.key_number.cmp(&other.key_number))
    }
}

/// Reads records line by line. The last line may lack a line break.
pub(crate) struct RecordReader<R> {
    reader: R,
    endl: u8,
    line: Vec<u8>,
    line_number: usize,
}

impl RecordReader<BufReader<File>> {
    pub(crate) fn open(path: &Path, capacity: usize, endl: u8) -> Result<Self, anyhow::Error> {
        let file = File::open(path)
            .with_context(|| anyhow!("path: {}", path.display()))?;
        Ok(RecordReader::new(BufReader::with_capacity(capacity, file), endl))
    }
}

impl<R: BufRead> RecordReader<R> {
    pub(crate) fn new(reader: R, endl: u8) -> RecordReader<R> {
        RecordReader {
            reader,
            endl,
            line: Vec::new(),
            line_number: 0,
        }
    }

    /// Number of lines read so far, which is the 1-based number of the last line returned.
    pub(crate) fn line_number(&self) -> usize {
        self.line_number
    }

    pub(crate) fn read_record(&mut self) -> Result<Option<Record>, anyhow::Error> {
        self.line.clear();
        if self.reader.read_until(self.endl, &mut self.line)? == 0 {
            return Ok(None);
        }
        self.line_number += 1;
        if self.line.last() == Some(&self.endl) {
            self.line.pop();
        }
        let record = Record::from_bytes(&self.line)
            .with_context(|| format!("line: {}", self.line_number))?;
        Ok(Some(record))
    }
}

/// Writes records in canonical form, each followed by the line break.
pub(crate) struct RecordWriter<W: Write> {
    writer: W,
    endl: u8,
    lines: usize,
}

impl RecordWriter<BufWriter<File>> {
    /// Create or truncate `path`.
    pub(crate) fn create(path: &Path, capacity: usize, endl: u8) -> Result<Self, anyhow::Error> {
        let file = File::create(path)
            .with_context(|| anyhow!("path: {}", path.display()))?;
        Ok(RecordWriter::new(BufWriter::with_capacity(capacity, file), endl))
    }
}

impl<W: Write> RecordWriter<W> {
    pub(crate) fn new(writer: W, endl: u8) -> RecordWriter<W> {
        RecordWriter {
            writer,
            endl,
            lines: 0,
        }
    }

    pub(crate) fn write(&mut self, record: &Record) -> Result<(), anyhow::Error> {
        write!(self.writer, "{}", record)?;
        self.writer.write_all(&[self.endl])?;
        self.lines += 1;
        Ok(())
    }

    /// Flush and return the number of records written.
    pub(crate) fn finish(mut self) -> Result<usize, anyhow::Error> {
        self.writer.flush()?;
        Ok(self.lines)
    }
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rstest::*;

    use crate::error::MalformedRecordError;
    use crate::record::{Record, RecordReader, RecordWriter};

    #[rstest]
    #[case("1. amy", 1, "amy")]
    #[case("-42. Bob Smith", -42, "Bob Smith")]
    #[case("7. ", 7, "")]
    #[case("3. a. b. c", 3, "a. b. c")]
    #[case("9223372036854775807. max", i64::MAX, "max")]
    fn test_parse(#[case] line: &str, #[case] number: i64, #[case] text: &str) {
        let record = Record::parse(line).unwrap();
        assert_eq!(record.key_number(), number);
        assert_eq!(record.key_text(), text);
        assert_eq!(record.format(), line);
    }

    #[rstest]
    #[case("")]
    #[case("amy")]
    #[case("1.amy")]
    #[case("1 amy")]
    fn test_missing_separator(#[case] line: &str) {
        let e = Record::parse(line).unwrap_err();
        assert!(matches!(e, MalformedRecordError::MissingSeparator { .. }));
        assert_eq!(e.line(), line);
    }

    #[rstest]
    #[case("notanumber. x")]
    #[case(". x")]
    #[case(" 1. x")]
    #[case("99999999999999999999. overflow")]
    fn test_invalid_number(#[case] line: &str) {
        let e = Record::parse(line).unwrap_err();
        assert!(matches!(e, MalformedRecordError::InvalidNumber { .. }));
        assert_eq!(e.line(), line);
    }

    #[test]
    fn test_invalid_utf8() {
        let e = Record::from_bytes(&[b'1', b'.', b' ', 0xff, 0xfe]).unwrap_err();
        assert!(matches!(e, MalformedRecordError::InvalidUtf8 { .. }));
    }

    #[test]
    fn test_round_trip_random() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let len = rng.gen_range(0..20);
            let text: String = (0..len).map(|_| rng.gen_range(' '..='~')).collect();
            let record = Record::new(rng.gen(), text);
            assert_eq!(Record::parse(&record.format()).unwrap(), record);
        }
    }

    #[rstest]
    #[case("1. amy", "2. amy", Ordering::Less)]
    #[case("5. amy", "2. amy", Ordering::Greater)]
    #[case("2. amy", "2. amy", Ordering::Equal)]
    #[case("9. amy", "1. bob", Ordering::Less)]
    #[case("1. Zed", "1. amy", Ordering::Less)]
    #[case("-1. a", "1. a", Ordering::Less)]
    #[case("1. ab", "1. a", Ordering::Greater)]
    fn test_order(#[case] left: &str, #[case] right: &str, #[case] expected: Ordering) {
        let left = Record::parse(left).unwrap();
        let right = Record::parse(right).unwrap();
        assert_eq!(left.cmp(&right), expected);
        assert_eq!(right.cmp(&left), expected.reverse());
    }

    #[test]
    fn test_order_is_total() {
        let mut rng = StdRng::seed_from_u64(11);
        let texts = ["amy", "bob", "Amy", "amy b", ""];
        let records: Vec<Record> = (0..60)
            .map(|_| Record::new(rng.gen_range(-3..3), texts[rng.gen_range(0..texts.len())].to_string()))
            .collect();
        for a in &records {
            for b in &records {
                assert_eq!(a.cmp(b), b.cmp(a).reverse());
                assert_eq!(a.cmp(b) == Ordering::Equal, a == b);
                for c in &records {
                    if a <= b && b <= c {
                        assert!(a <= c, "{a} <= {b} <= {c}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_reader_writer() -> Result<(), anyhow::Error> {
        let input = b"3. bob\n1. amy\n2. amy";
        let mut reader = RecordReader::new(&input[..], b'\n');
        let mut writer = RecordWriter::new(Vec::new(), b'\n');
        while let Some(record) = reader.read_record()? {
            writer.write(&record)?;
        }
        assert_eq!(reader.line_number(), 3);
        let lines = writer.finish()?;
        assert_eq!(lines, 3);
        Ok(())
    }

    #[test]
    fn test_reader_reports_line_number() {
        let input = b"3. bob\nnotanumber. x\n";
        let mut reader = RecordReader::new(&input[..], b'\n');
        assert!(reader.read_record().unwrap().is_some());
        let e = reader.read_record().unwrap_err();
        assert!(e.downcast_ref::<MalformedRecordError>().is_some());
        assert!(format!("{e:#}").contains("line: 2"));
    }

    #[test]
    fn test_custom_endl() -> Result<(), anyhow::Error> {
        let input = b"2. b;1. a;";
        let mut reader = RecordReader::new(&input[..], b';');
        let mut writer = RecordWriter::new(Vec::new(), b';');
        let mut records = Vec::new();
        while let Some(record) = reader.read_record()? {
            records.push(record);
        }
        records.sort();
        for record in &records {
            writer.write(record)?;
        }
        assert_eq!(writer.writer, b"1. a;2. b;");
        Ok(())
    }
}
