//! Pull-based execute-response events.
//!
//! A lazy, finite, non-restartable iterator over the multidimensional
//! response stream: axis boundaries, tuples, members, and cells. The
//! state machine follows the response shape {idle, axis 0, axis 1,
//! slicer axis, cell data}; all parser context lives in the reader, not
//! in mutable fields shared across callbacks.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::model::{DataType, Member};
use crate::xmla::{XmlaError, XmlaResult};

/// Which response axis events belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisKind {
    Axis0,
    Axis1,
    Slicer,
}

impl AxisKind {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "Axis0" => Some(AxisKind::Axis0),
            "Axis1" => Some(AxisKind::Axis1),
            "SlicerAxis" => Some(AxisKind::Slicer),
            _ => None,
        }
    }
}

/// One parse event from the response stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecEvent {
    AxisStart(AxisKind),
    TupleStart,
    /// One member element inside the current tuple.
    Member(Member),
    TupleEnd,
    AxisEnd(AxisKind),
    /// One cell from the cell data section.
    Cell {
        ordinal: usize,
        value: String,
        /// `xsi:type` declared on the value, when present.
        declared_type: Option<DataType>,
        fmt_value: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Axis(AxisKind),
    CellData,
}

/// Streaming reader over an execute response body.
pub struct ExecEventReader<'a> {
    reader: Reader<&'a [u8]>,
    buf: Vec<u8>,
    state: State,
    done: bool,
}

impl<'a> ExecEventReader<'a> {
    pub fn new(body: &'a str) -> Self {
        let mut reader = Reader::from_reader(body.as_bytes());
        reader.config_mut().trim_text(true);
        Self {
            reader,
            buf: Vec::new(),
            state: State::Idle,
            done: false,
        }
    }

    fn attr(e: &BytesStart, key: &[u8]) -> XmlaResult<Option<String>> {
        for attr in e.attributes() {
            let attr = attr.map_err(|e| XmlaError::Malformed(e.to_string()))?;
            if attr.key.local_name().as_ref() == key {
                let value = attr
                    .unescape_value()
                    .map_err(|e| XmlaError::Malformed(e.to_string()))?;
                return Ok(Some(value.into_owned()));
            }
        }
        Ok(None)
    }

    /// Read a `<Member>` subtree into a resolved member.
    fn read_member(&mut self, start: &BytesStart) -> XmlaResult<Member> {
        let mut member = Member {
            hierarchy: Self::attr(start, b"Hierarchy")?.unwrap_or_default(),
            parent_level_number: -1,
            ..Member::default()
        };

        let mut buf = Vec::new();
        loop {
            match self.reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let name = e.local_name().as_ref().to_vec();
                    let text = self
                        .reader
                        .read_text(e.name())
                        .map_err(|e| XmlaError::Malformed(e.to_string()))?
                        .into_owned();
                    match name.as_slice() {
                        b"UName" => member.unique_name = text,
                        b"Caption" => member.caption = text,
                        b"LName" => member.level_unique_name = text,
                        b"LNum" => member.level_number = text.parse().unwrap_or(0),
                        b"PARENT_UNIQUE_NAME" => member.parent_unique_name = Some(text),
                        b"PARENT_LEVEL" => {
                            member.parent_level_number = text.parse().unwrap_or(-1)
                        }
                        _ => {}
                    }
                }
                Ok(Event::End(e)) if e.local_name().as_ref() == b"Member" => break,
                Ok(Event::Eof) => {
                    return Err(XmlaError::Malformed("unterminated member element".into()))
                }
                Err(e) => return Err(XmlaError::Malformed(e.to_string())),
                _ => {}
            }
            buf.clear();
        }

        if member.parent_level_number < 0 {
            member.parent_level_number = member.level_number - 1;
        }
        member.full_caption = member.caption.clone();
        Ok(member)
    }

    /// Read a `<Cell>` subtree into a cell event.
    fn read_cell(&mut self, start: &BytesStart) -> XmlaResult<ExecEvent> {
        let ordinal = Self::attr(start, b"CellOrdinal")?
            .and_then(|s| s.parse::<usize>().ok())
            .ok_or_else(|| XmlaError::Malformed("cell without ordinal".into()))?;

        let mut value = String::new();
        let mut declared_type = None;
        let mut fmt_value = None;

        let mut buf = Vec::new();
        loop {
            match self.reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let name = e.local_name().as_ref().to_vec();
                    if name == b"Value" {
                        declared_type = Self::attr(&e, b"type")?
                            .map(|t| DataType::from_xsd(&t));
                    }
                    let text = self
                        .reader
                        .read_text(e.name())
                        .map_err(|e| XmlaError::Malformed(e.to_string()))?
                        .into_owned();
                    match name.as_slice() {
                        b"Value" => value = text,
                        b"FmtValue" => fmt_value = Some(text),
                        _ => {}
                    }
                }
                Ok(Event::Empty(e)) if e.local_name().as_ref() == b"Value" => {
                    declared_type = Self::attr(&e, b"type")?.map(|t| DataType::from_xsd(&t));
                }
                Ok(Event::End(e)) if e.local_name().as_ref() == b"Cell" => break,
                Ok(Event::Eof) => {
                    return Err(XmlaError::Malformed("unterminated cell element".into()))
                }
                Err(e) => return Err(XmlaError::Malformed(e.to_string())),
                _ => {}
            }
            buf.clear();
        }

        Ok(ExecEvent::Cell {
            ordinal,
            value,
            declared_type,
            fmt_value,
        })
    }
}

impl Iterator for ExecEventReader<'_> {
    type Item = XmlaResult<ExecEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            self.buf.clear();
            let event = match self.reader.read_event_into(&mut self.buf) {
                Ok(ev) => ev,
                Err(e) => {
                    self.done = true;
                    return Some(Err(XmlaError::Malformed(e.to_string())));
                }
            };
            match event {
                Event::Start(e) => {
                    let name = e.local_name().as_ref().to_vec();
                    match name.as_slice() {
                        b"Axis" => {
                            let axis_name = match Self::attr(&e, b"name") {
                                Ok(n) => n.unwrap_or_default(),
                                Err(err) => {
                                    self.done = true;
                                    return Some(Err(err));
                                }
                            };
                            if let Some(kind) = AxisKind::from_name(&axis_name) {
                                self.state = State::Axis(kind);
                                return Some(Ok(ExecEvent::AxisStart(kind)));
                            }
                        }
                        b"Tuple" if matches!(self.state, State::Axis(_)) => {
                            return Some(Ok(ExecEvent::TupleStart));
                        }
                        b"Member" if matches!(self.state, State::Axis(_)) => {
                            let start = e.into_owned();
                            let result = self.read_member(&start);
                            if result.is_err() {
                                self.done = true;
                            }
                            return Some(result.map(ExecEvent::Member));
                        }
                        b"CellData" => {
                            self.state = State::CellData;
                        }
                        b"Cell" if self.state == State::CellData => {
                            let start = e.into_owned();
                            let result = self.read_cell(&start);
                            if result.is_err() {
                                self.done = true;
                            }
                            return Some(result);
                        }
                        _ => {}
                    }
                }
                Event::End(e) => {
                    let name = e.local_name().as_ref().to_vec();
                    match name.as_slice() {
                        b"Axis" => {
                            if let State::Axis(kind) = self.state {
                                self.state = State::Idle;
                                return Some(Ok(ExecEvent::AxisEnd(kind)));
                            }
                        }
                        b"Tuple" if matches!(self.state, State::Axis(_)) => {
                            return Some(Ok(ExecEvent::TupleEnd));
                        }
                        b"CellData" => {
                            self.state = State::Idle;
                        }
                        _ => {}
                    }
                }
                Event::Eof => {
                    self.done = true;
                    return None;
                }
                _ => {}
            }
        }
    }
}
