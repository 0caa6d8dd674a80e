//! Colloquy XML transcripts.
//!
//! A transcript is a `<log>` root holding two kinds of entries:
//!
//! ```xml
//! <log>
//!   <envelope>
//!     <sender>alice</sender>
//!     <message received="2024-01-15 10:30:45 -0800">Hello <span>everyone</span>!</message>
//!   </envelope>
//!   <event name="memberJoined" occurred="2024-01-15 10:31:00 -0800">
//!     <message>bob joined the chat room.</message>
//!   </event>
//! </log>
//! ```
//!
//! Markup inside a message body is stripped, keeping its text.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event as XmlEvent};
use tracing::warn;

use crate::config::ParseMode;
use crate::error::{LogError, Result};
use crate::line::{render_event, render_message};

/// Offset-bearing formats of `received` and `occurred` attributes.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S %z", "%Y-%m-%d %H:%M:%S%.f %z"];

/// Offset-less fallback.
const NAIVE_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    pub entries: Vec<Entry>,
    /// Entries dropped in lenient mode.
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Envelope(Envelope),
    Event(Event),
}

/// Consecutive messages from one sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub sender: String,
    pub messages: Vec<EnvelopeMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeMessage {
    /// Wall-clock time as written, offset discarded.
    pub received: NaiveDateTime,
    pub text: String,
}

/// A system event such as a join, part or topic change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub name: Option<String>,
    pub occurred: NaiveDateTime,
    pub text: String,
}

impl Transcript {
    /// Renders every entry as normalized log lines, in document order.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for entry in &self.entries {
            match entry {
                Entry::Envelope(envelope) => {
                    for message in &envelope.messages {
                        lines.push(render_message(&message.received, &envelope.sender, &message.text));
                    }
                }
                Entry::Event(event) => lines.push(render_event(&event.occurred, &event.text)),
            }
        }
        lines
    }
}

/// Parses a transcript held in memory.
pub fn parse_transcript(xml: &str, mode: ParseMode) -> Result<Transcript> {
    TranscriptParser::new(xml, mode, None).parse()
}

/// Like [`parse_transcript`], naming `path` in errors and warnings.
pub fn parse_transcript_at(xml: &str, mode: ParseMode, path: &Path) -> Result<Transcript> {
    TranscriptParser::new(xml, mode, Some(path)).parse()
}

/// Parses a `received` or `occurred` attribute.
pub fn parse_transcript_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| DateTime::parse_from_str(value, format).ok())
        .or_else(|| DateTime::parse_from_rfc3339(value).ok())
        .map(|dt| dt.naive_local())
        .or_else(|| NaiveDateTime::parse_from_str(value, NAIVE_DATE_FORMAT).ok())
}

struct TranscriptParser<'a> {
    reader: Reader<&'a [u8]>,
    mode: ParseMode,
    path: Option<&'a Path>,
    transcript: Transcript,
}

impl<'a> TranscriptParser<'a> {
    fn new(xml: &'a str, mode: ParseMode, path: Option<&'a Path>) -> Self {
        Self {
            reader: Reader::from_str(xml),
            mode,
            path,
            transcript: Transcript::default(),
        }
    }

    fn parse(mut self) -> Result<Transcript> {
        loop {
            match self.next_event()? {
                XmlEvent::Start(start) => match element_name(&start).as_str() {
                    "log" => {}
                    "envelope" => self.envelope()?,
                    "event" => self.event(&start)?,
                    other => {
                        let other = other.to_string();
                        self.skip_element()?;
                        self.mismatch(&other, "unrecognized element")?;
                    }
                },
                XmlEvent::Empty(start) => {
                    let name = element_name(&start);
                    if name != "log" {
                        self.mismatch(&name, "unrecognized empty element")?;
                    }
                }
                XmlEvent::Eof => break,
                _ => {}
            }
        }
        Ok(self.transcript)
    }

    fn envelope(&mut self) -> Result<()> {
        let mut sender = None;
        let mut messages = Vec::new();

        loop {
            match self.next_event()? {
                XmlEvent::Start(start) => match element_name(&start).as_str() {
                    "sender" => sender = Some(self.text_content("sender")?),
                    "message" => {
                        let received = attribute(&start, "received")?;
                        let text = self.text_content("message")?;
                        match received.as_deref().and_then(parse_transcript_date) {
                            Some(received) => messages.push(EnvelopeMessage { received, text }),
                            None => self.mismatch("message", "missing or invalid 'received' date")?,
                        }
                    }
                    other => {
                        let other = other.to_string();
                        self.text_content(&other)?;
                    }
                },
                XmlEvent::Empty(start) => match element_name(&start).as_str() {
                    "sender" => sender = Some(String::new()),
                    "message" => self.mismatch("message", "empty <message>")?,
                    _ => {}
                },
                XmlEvent::End(_) => break,
                XmlEvent::Eof => return Err(self.unterminated("envelope")),
                _ => {}
            }
        }

        match sender.filter(|s| !s.is_empty()) {
            Some(sender) => {
                self.transcript
                    .entries
                    .push(Entry::Envelope(Envelope { sender, messages }));
                Ok(())
            }
            None => self.mismatch("envelope", "missing <sender>"),
        }
    }

    fn event(&mut self, start: &BytesStart<'_>) -> Result<()> {
        let name = attribute(start, "name")?;
        let occurred = attribute(start, "occurred")?;
        let mut text = None;

        loop {
            match self.next_event()? {
                XmlEvent::Start(child) => {
                    let child = element_name(&child);
                    let content = self.text_content(&child)?;
                    if child == "message" {
                        text = Some(content);
                    }
                }
                XmlEvent::End(_) => break,
                XmlEvent::Eof => return Err(self.unterminated("event")),
                _ => {}
            }
        }

        let Some(occurred) = occurred.as_deref().and_then(parse_transcript_date) else {
            return self.mismatch("event", "missing or invalid 'occurred' date");
        };
        let Some(text) = text else {
            return self.mismatch("event", "missing <message>");
        };

        self.transcript.entries.push(Entry::Event(Event {
            name,
            occurred,
            text,
        }));
        Ok(())
    }

    /// Text of the element just opened, up to its end tag, without markup.
    fn text_content(&mut self, element: &str) -> Result<String> {
        let mut depth = 0usize;
        let mut text = String::new();

        loop {
            match self.next_event()? {
                XmlEvent::Start(_) => depth += 1,
                XmlEvent::End(_) if depth == 0 => break,
                XmlEvent::End(_) => depth -= 1,
                XmlEvent::Text(t) => {
                    let unescaped = t.unescape().map_err(|e| self.xml_error(e))?;
                    text.push_str(&unescaped);
                }
                XmlEvent::CData(data) => text.push_str(&String::from_utf8_lossy(&data)),
                XmlEvent::Eof => return Err(self.unterminated(element)),
                _ => {}
            }
        }

        Ok(text.trim().to_string())
    }

    fn skip_element(&mut self) -> Result<()> {
        self.text_content("element").map(drop)
    }

    fn next_event(&mut self) -> Result<XmlEvent<'a>> {
        let path = self.path;
        self.reader
            .read_event()
            .map_err(|e| LogError::xml(e, path.map(Path::to_path_buf)))
    }

    /// Skips the offending entry or fails, depending on the parse mode.
    fn mismatch(&mut self, element: &str, message: &str) -> Result<()> {
        match self.mode {
            ParseMode::Strict => Err(LogError::structural(self.owned_path(), element, message)),
            ParseMode::Lenient => {
                warn!(
                    transcript = %self.path.map(|p| p.display().to_string()).unwrap_or_default(),
                    element,
                    message,
                    "skipping transcript entry"
                );
                self.transcript.skipped += 1;
                Ok(())
            }
        }
    }

    fn unterminated(&self, element: &str) -> LogError {
        LogError::structural(self.owned_path(), element, "unterminated element")
    }

    fn xml_error(&self, source: quick_xml::Error) -> LogError {
        LogError::xml(source, self.owned_path())
    }

    fn owned_path(&self) -> Option<PathBuf> {
        self.path.map(Path::to_path_buf)
    }
}

fn element_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.local_name().as_ref()).into_owned()
}

fn attribute(start: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
    for attr in start.attributes() {
        let attr = attr.map_err(|e| LogError::xml(quick_xml::Error::InvalidAttr(e), None))?;
        if attr.key.local_name().as_ref() == name.as_bytes() {
            let value = attr.unescape_value().map_err(|e| LogError::xml(e, None))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}
