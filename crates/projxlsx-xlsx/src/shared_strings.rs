//! Shared strings table (`xl/sharedStrings.xml`)
//!
//! Text cells store an index into this table instead of the text itself.
//! The table only grows: `intern` appends unseen values and bumps the
//! reference counter, it never removes or reorders entries.

use std::collections::HashMap;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use tracing::debug;

use crate::{attribute, XlsxError, XlsxResult, SPREADSHEET_NS};

/// Deduplicating string dictionary with `count`/`uniqueCount` counters
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SharedStringTable {
    /// Entries in index order
    entries: Vec<String>,
    /// First index of each value
    lookup: HashMap<String, usize>,
    /// Total references ever added (`count` attribute)
    count: usize,
}

impl SharedStringTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an `sst` document, keeping its existing counters
    pub fn parse(xml: &str) -> XlsxResult<Self> {
        let mut reader = Reader::from_str(xml);

        let mut table = Self::new();
        let mut declared_count = None;
        let mut item: Option<String> = None;
        let mut in_text = false;
        let mut in_phonetic = false;

        loop {
            match reader.read_event()? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"sst" => declared_count = count_attribute(&e)?,
                    b"si" => item = Some(String::new()),
                    b"rPh" => in_phonetic = true,
                    b"t" if !in_phonetic => in_text = item.is_some(),
                    _ => {}
                },
                Event::Empty(e) => match e.local_name().as_ref() {
                    b"sst" => declared_count = count_attribute(&e)?,
                    b"si" => table.push_entry(String::new()),
                    _ => {}
                },
                Event::Text(t) if in_text => {
                    if let Some(item) = item.as_mut() {
                        item.push_str(&t.unescape()?);
                    }
                }
                Event::CData(c) if in_text => {
                    if let Some(item) = item.as_mut() {
                        item.push_str(std::str::from_utf8(&c)?);
                    }
                }
                Event::End(e) => match e.local_name().as_ref() {
                    b"t" => in_text = false,
                    b"rPh" => in_phonetic = false,
                    b"si" => {
                        if let Some(item) = item.take() {
                            table.push_entry(item);
                        }
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
        }

        table.count = declared_count.unwrap_or(table.entries.len());
        debug!(
            count = table.count,
            unique_count = table.unique_count(),
            "parsed shared strings"
        );
        Ok(table)
    }

    fn push_entry(&mut self, value: String) {
        let index = self.entries.len();
        self.lookup.entry(value.clone()).or_insert(index);
        self.entries.push(value);
    }

    /// Add a reference to `value`, returning its index.
    ///
    /// Existing values (exact, case-sensitive match) keep their index and only
    /// bump `count`; new values are appended at position `unique_count`.
    pub fn intern(&mut self, value: &str) -> usize {
        self.count += 1;
        if let Some(&index) = self.lookup.get(value) {
            return index;
        }
        let index = self.entries.len();
        self.push_entry(value.to_string());
        index
    }

    /// Look up the value stored at `index`
    pub fn resolve(&self, index: usize) -> XlsxResult<&str> {
        self.entries
            .get(index)
            .map(String::as_str)
            .ok_or(XlsxError::StringIndexOutOfRange {
                index,
                len: self.entries.len(),
            })
    }

    /// Index of an existing value, without adding a reference
    pub fn position(&self, value: &str) -> Option<usize> {
        self.lookup.get(value).copied()
    }

    /// Total references added (`count`)
    pub fn count(&self) -> usize {
        self.count
    }

    /// Number of entries (`uniqueCount`)
    pub fn unique_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Serialize to an `sst` document
    pub fn to_xml(&self) -> XlsxResult<String> {
        let mut writer = Writer::new(Vec::with_capacity(256 + self.entries.len() * 32));

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;

        let count = self.count.to_string();
        let unique_count = self.unique_count().to_string();
        writer.write_event(Event::Start(BytesStart::new("sst").with_attributes([
            ("xmlns", SPREADSHEET_NS),
            ("count", count.as_str()),
            ("uniqueCount", unique_count.as_str()),
        ])))?;

        for entry in &self.entries {
            writer.write_event(Event::Start(BytesStart::new("si")))?;
            let mut t = BytesStart::new("t");
            if entry.trim() != entry {
                t.push_attribute(("xml:space", "preserve"));
            }
            writer.write_event(Event::Start(t))?;
            writer.write_event(Event::Text(BytesText::new(entry)))?;
            writer.write_event(Event::End(BytesEnd::new("t")))?;
            writer.write_event(Event::End(BytesEnd::new("si")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("sst")))?;

        Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
    }
}

fn count_attribute(element: &BytesStart<'_>) -> XlsxResult<Option<usize>> {
    attribute(element, b"count")?
        .map(|value| {
            value.trim().parse::<usize>().map_err(|_| {
                XlsxError::MalformedPackage(format!("sharedStrings count '{value}'"))
            })
        })
        .transpose()
}
