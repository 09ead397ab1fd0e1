//! Batch query document parser.
//!
//! A batch document has a single root element holding query entries:
//!
//! ```xml
//! <queries>
//!   <aQuery>
//!     <region name="USA"/>
//!     <supplyDemandQuery title="primary energy"> ... </supplyDemandQuery>
//!   </aQuery>
//!   <queryGroup name="emissions">
//!     <emissionsQueryBuilder title="CO2 Emissions"> ... </emissionsQueryBuilder>
//!   </queryGroup>
//! </queries>
//! ```
//!
//! `aQuery` wraps one query definition plus optional `region` filters.
//! `queryGroup` elements are flattened. Any other element at entry level is
//! taken as a bare query definition.

use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use tracing::debug;

use super::Query;
use crate::error::{GcamError, Result};

const A_QUERY: &[u8] = b"aQuery";
const QUERY_GROUP: &[u8] = b"queryGroup";
const REGION: &[u8] = b"region";

/// Reads and parses the batch query document at `path`.
pub fn parse_batch_query(path: &Path) -> Result<Vec<Query>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        GcamError::parse(format!("Failed to read {}: {}", path.display(), e))
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    parse_batch_str(&content, &name)
}

/// Parses a batch query document held in memory.
///
/// `source_name` is only used to label error locations.
pub fn parse_batch_str(xml: &str, source_name: &str) -> Result<Vec<Query>> {
    let queries = BatchParser::new(xml, source_name).parse()?;
    debug!("Parsed {} queries from {}", queries.len(), source_name);
    Ok(queries)
}

struct BatchParser<'a> {
    source: &'a str,
    source_name: &'a str,
    reader: Reader<&'a [u8]>,
    queries: Vec<Query>,
}

impl<'a> BatchParser<'a> {
    fn new(source: &'a str, source_name: &'a str) -> Self {
        let mut reader = Reader::from_str(source);
        reader.trim_text(true);
        Self {
            source,
            source_name,
            reader,
            queries: Vec::new(),
        }
    }

    fn parse(mut self) -> Result<Vec<Query>> {
        loop {
            let pos = self.position();
            match self.next_event()? {
                Event::Start(_) => {
                    self.parse_entries()?;
                    break;
                }
                Event::Empty(_) => break,
                Event::Eof => return Err(self.error_at(pos, "document has no root element")),
                _ => {}
            }
        }

        loop {
            let pos = self.position();
            match self.next_event()? {
                Event::Eof => break,
                Event::Start(_) | Event::Empty(_) => {
                    return Err(self.error_at(pos, "unexpected element after the root element"))
                }
                _ => {}
            }
        }

        Ok(self.queries)
    }

    /// Consumes the children of the root or a `queryGroup` up to its end tag.
    fn parse_entries(&mut self) -> Result<()> {
        loop {
            let pos = self.position();
            match self.next_event()? {
                Event::Start(e) => match e.name().as_ref() {
                    A_QUERY => self.parse_a_query(pos)?,
                    QUERY_GROUP => self.parse_entries()?,
                    _ => {
                        let query = self.definition(pos, &e, true)?;
                        self.queries.push(query);
                    }
                },
                Event::Empty(e) => match e.name().as_ref() {
                    A_QUERY => {
                        return Err(self.error_at(pos, "aQuery contains no query definition"))
                    }
                    QUERY_GROUP => {}
                    _ => {
                        let query = self.definition(pos, &e, false)?;
                        self.queries.push(query);
                    }
                },
                Event::End(_) => return Ok(()),
                Event::Eof => return Err(self.error_at(pos, "unexpected end of document")),
                _ => {}
            }
        }
    }

    /// Consumes an `aQuery` body: region filters plus exactly one definition.
    fn parse_a_query(&mut self, start: usize) -> Result<()> {
        let mut regions = Vec::new();
        let mut found: Option<Query> = None;

        loop {
            let pos = self.position();
            match self.next_event()? {
                Event::Start(e) if e.name().as_ref() == REGION => {
                    regions.push(self.region_name(pos, &e)?);
                    self.skip_to_end(&e)?;
                }
                Event::Empty(e) if e.name().as_ref() == REGION => {
                    regions.push(self.region_name(pos, &e)?);
                }
                Event::Start(e) => {
                    if found.is_some() {
                        return Err(self.error_at(pos, "aQuery contains more than one query definition"));
                    }
                    found = Some(self.definition(pos, &e, true)?);
                }
                Event::Empty(e) => {
                    if found.is_some() {
                        return Err(self.error_at(pos, "aQuery contains more than one query definition"));
                    }
                    found = Some(self.definition(pos, &e, false)?);
                }
                Event::End(_) => break,
                Event::Eof => return Err(self.error_at(pos, "unexpected end of document")),
                _ => {}
            }
        }

        let query = found.ok_or_else(|| self.error_at(start, "aQuery contains no query definition"))?;
        self.queries.push(query.with_regions(regions));
        Ok(())
    }

    /// Builds a query from a definition element starting at byte `start`.
    ///
    /// For a non-empty element the reader is advanced past its end tag so the
    /// whole subtree can be captured verbatim from the source.
    fn definition(&mut self, start: usize, e: &BytesStart<'_>, has_body: bool) -> Result<Query> {
        let title = self.title(start, e)?;
        if has_body {
            self.skip_to_end(e)?;
        }
        let end = self.position();
        let definition = self.source[start..end].trim();
        Ok(Query::new(title, definition))
    }

    fn title(&self, pos: usize, e: &BytesStart<'_>) -> Result<String> {
        let element = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let title = self
            .attribute(pos, e, "title")?
            .ok_or_else(|| self.error_at(pos, format!("<{element}> has no title attribute")))?;
        if title.trim().is_empty() {
            return Err(self.error_at(pos, format!("<{element}> has an empty title")));
        }
        Ok(title)
    }

    fn region_name(&self, pos: usize, e: &BytesStart<'_>) -> Result<String> {
        self.attribute(pos, e, "name")?
            .ok_or_else(|| self.error_at(pos, "<region> has no name attribute"))
    }

    fn attribute(&self, pos: usize, e: &BytesStart<'_>, key: &str) -> Result<Option<String>> {
        let attr = e
            .try_get_attribute(key)
            .map_err(|err| self.error_at(pos, err.to_string()))?;
        match attr {
            Some(attr) => {
                let value = attr
                    .unescape_value()
                    .map_err(|err| self.error_at(pos, err.to_string()))?;
                Ok(Some(value.into_owned()))
            }
            None => Ok(None),
        }
    }

    fn skip_to_end(&mut self, e: &BytesStart<'_>) -> Result<()> {
        let end = e.to_end().into_owned();
        self.reader
            .read_to_end(end.name())
            .map_err(|err| self.error_at(self.position(), err.to_string()))?;
        Ok(())
    }

    fn next_event(&mut self) -> Result<Event<'a>> {
        self.reader
            .read_event()
            .map_err(|err| self.error_at(self.position(), err.to_string()))
    }

    fn position(&self) -> usize {
        self.reader.buffer_position()
    }

    /// Formats an error as `name:line:column: message` for byte offset `pos`.
    fn error_at(&self, pos: usize, msg: impl std::fmt::Display) -> GcamError {
        let rest = self.source.get(pos..).unwrap_or_default();
        let pos = pos + (rest.len() - rest.trim_start().len());
        let (line, column) = line_column(self.source, pos);
        GcamError::parse(format!("{}:{}:{}: {}", self.source_name, line, column, msg))
    }
}

/// Converts a byte offset into a 1-based line and column.
fn line_column(source: &str, pos: usize) -> (usize, usize) {
    let mut end = pos.min(source.len());
    while !source.is_char_boundary(end) {
        end -= 1;
    }
    let before = &source[..end];
    let line = before.matches('\n').count() + 1;
    let column = match before.rfind('\n') {
        Some(i) => before[i + 1..].chars().count() + 1,
        None => before.chars().count() + 1,
    };
    (line, column)
}
