//! Streaming XMLTV reader
//!
//! This is deliberately not an XML parser. The body is split into lines as it
//! arrives and each line is classified by its leading tag. Only `<channel>`,
//! `<display-name>`, `<icon>`, `<programme>` and `<title>` are understood;
//! everything else is skipped. Malformed input costs individual programmes,
//! never the whole guide.
//!
//! Memory use is one decoded chunk plus one pending partial line, whatever
//! the document size. Gzip bodies are inflated chunk by chunk.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::LazyLock;

use futures::StreamExt;
use regex::Regex;
use tracing::{debug, warn};

use crate::errors::{AppResult, SourceError, SourceResult};
use crate::models::EpgProgram;
use crate::services::epg_matcher::normalize_channel_name;
use crate::utils::ByteStream;
use crate::utils::decompression::StreamingDecompressor;

/// Bytes needed before the compression format can be sniffed
const SNIFF_LEN: usize = 4;

/// Longest partial line held back between chunks
const MAX_PENDING_LINE: usize = 1024 * 1024;

static CHANNEL_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bid=(?:"([^"]*)"|'([^']*)')"#).expect("valid id regex"));
static PROGRAMME_CHANNEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bchannel=(?:"([^"]*)"|'([^']*)')"#).expect("valid channel regex")
});
static PROGRAMME_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bstart=(?:"([^"]*)"|'([^']*)')"#).expect("valid start regex"));
static PROGRAMME_STOP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bstop=(?:"([^"]*)"|'([^']*)')"#).expect("valid stop regex"));
static DISPLAY_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<display-name[^>]*>(.*?)</display-name>").expect("valid display-name regex")
});
static ICON_SRC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<icon[^>]*\bsrc=(?:"([^"]*)"|'([^']*)')"#).expect("valid icon regex")
});
static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<title[^>]*>(.*?)</title>").expect("valid title regex"));

/// Everything one parse learned about the guide
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpgIndex {
    /// Programmes per EPG channel id, in document order
    pub programs: HashMap<String, Vec<EpgProgram>>,
    /// Normalized display name to EPG channel id; first registration wins
    pub name_to_id: HashMap<String, String>,
    /// Icon per EPG channel id; first registration wins
    pub logos: HashMap<String, String>,
}

impl EpgIndex {
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty() && self.name_to_id.is_empty() && self.logos.is_empty()
    }

    pub fn program_count(&self) -> usize {
        self.programs.values().map(Vec::len).sum()
    }

    fn register_name(&mut self, display_name: &str, channel_id: &str) {
        let normalized = normalize_channel_name(display_name);
        if normalized.is_empty() {
            return;
        }
        self.name_to_id
            .entry(normalized)
            .or_insert_with(|| channel_id.to_string());
    }

    fn register_logo(&mut self, channel_id: &str, src: String) {
        if src.is_empty() {
            return;
        }
        self.logos.entry(channel_id.to_string()).or_insert(src);
    }

    fn push_program(&mut self, channel_id: String, program: EpgProgram) {
        self.programs.entry(channel_id).or_default().push(program);
    }
}

/// Reassembles lines from arbitrarily split byte chunks
///
/// UTF-8 is decoded per complete line so a multi-byte character split across
/// two chunks is never mangled. Trailing `\r` is dropped.
#[derive(Debug, Default)]
pub struct LineAssembler {
    pending: Vec<u8>,
}

impl LineAssembler {
    pub fn push(&mut self, chunk: &[u8], mut on_line: impl FnMut(&str)) {
        let mut rest = chunk;
        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            let (head, tail) = rest.split_at(pos);
            if self.pending.is_empty() {
                emit_line(head, &mut on_line);
            } else {
                self.pending.extend_from_slice(head);
                emit_line(&self.pending, &mut on_line);
                self.pending.clear();
            }
            rest = &tail[1..];
        }

        if self.pending.len() + rest.len() > MAX_PENDING_LINE {
            warn!(
                "Discarding EPG line longer than {} bytes",
                MAX_PENDING_LINE
            );
            self.pending.clear();
            return;
        }
        self.pending.extend_from_slice(rest);
    }

    /// Flush the final line, which may lack a newline
    pub fn finish(self, mut on_line: impl FnMut(&str)) {
        if !self.pending.is_empty() {
            emit_line(&self.pending, &mut on_line);
        }
    }
}

fn emit_line(bytes: &[u8], on_line: &mut impl FnMut(&str)) {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    on_line(&String::from_utf8_lossy(bytes));
}

/// A programme whose `<title>` has not been seen yet
#[derive(Debug, Clone, PartialEq, Eq)]
struct OpenProgramme {
    channel: String,
    start: String,
    end: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ParserState {
    Idle,
    InChannel { id: String },
    InOpenProgramme(OpenProgramme),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    ChannelOpen,
    ChannelClose,
    DisplayName,
    Icon,
    ProgrammeOpen,
    ProgrammeClose,
    Title,
    Other,
}

impl LineKind {
    fn classify(line: &str) -> Self {
        const PREFIXES: [(&str, LineKind); 7] = [
            ("<channel", LineKind::ChannelOpen),
            ("</channel", LineKind::ChannelClose),
            ("<display-name", LineKind::DisplayName),
            ("<icon", LineKind::Icon),
            ("<programme", LineKind::ProgrammeOpen),
            ("</programme", LineKind::ProgrammeClose),
            ("<title", LineKind::Title),
        ];

        PREFIXES
            .iter()
            .find(|(prefix, _)| starts_with_tag(line, prefix))
            .map(|(_, kind)| *kind)
            .unwrap_or(LineKind::Other)
    }
}

/// `<channel` must not match `<channels`
fn starts_with_tag(line: &str, prefix: &str) -> bool {
    line.strip_prefix(prefix).is_some_and(|rest| {
        rest.chars()
            .next()
            .is_none_or(|c| c.is_whitespace() || c == '>' || c == '/')
    })
}

fn attribute(re: &Regex, line: &str) -> Option<String> {
    let caps = re.captures(line)?;
    let value = caps.get(1).or_else(|| caps.get(2))?.as_str();
    Some(unescape_text(value.trim()))
}

fn element_text(re: &Regex, line: &str) -> Option<String> {
    re.captures(line)
        .and_then(|caps| caps.get(1))
        .map(|text| unescape_text(text.as_str().trim()))
}

fn unescape_text(raw: &str) -> String {
    match quick_xml::escape::unescape(raw) {
        Ok(Cow::Borrowed(text)) => text.to_string(),
        Ok(Cow::Owned(text)) => text,
        Err(_) => raw.to_string(),
    }
}

/// Line-fed XMLTV state machine
///
/// | state            | line                | next              |
/// |------------------|---------------------|-------------------|
/// | any              | `<channel id>`      | `InChannel`       |
/// | `InChannel`      | `<display-name>`    | `InChannel`       |
/// | `InChannel`      | `<icon src>`        | `InChannel`       |
/// | `InChannel`      | `</channel>`        | `Idle`            |
/// | any              | `<programme>`+title | `Idle` (emitted)  |
/// | any              | `<programme>`       | `InOpenProgramme` |
/// | `InOpenProgramme`| `<title>`           | `Idle` (emitted)  |
/// | `InOpenProgramme`| `</programme>`      | `Idle` (dropped)  |
///
/// Anything else leaves the state unchanged. Opening a new channel or
/// programme while a programme is still open drops the open one.
#[derive(Debug)]
pub struct EpgStreamParser {
    state: ParserState,
    index: EpgIndex,
    dropped: usize,
}

impl Default for EpgStreamParser {
    fn default() -> Self {
        Self::new()
    }
}

impl EpgStreamParser {
    pub fn new() -> Self {
        Self {
            state: ParserState::Idle,
            index: EpgIndex::default(),
            dropped: 0,
        }
    }

    pub fn feed_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        let state = std::mem::replace(&mut self.state, ParserState::Idle);
        self.state = match (state, LineKind::classify(line)) {
            (state, LineKind::ChannelOpen) => {
                self.drop_open(&state);
                self.open_channel(line)
            }
            (state, LineKind::ProgrammeOpen) => {
                self.drop_open(&state);
                self.open_programme(line)
            }
            (ParserState::InChannel { id }, LineKind::DisplayName) => {
                if let Some(name) = element_text(&DISPLAY_NAME, line) {
                    self.index.register_name(&name, &id);
                }
                ParserState::InChannel { id }
            }
            (ParserState::InChannel { id }, LineKind::Icon) => {
                if let Some(src) = attribute(&ICON_SRC, line) {
                    self.index.register_logo(&id, src);
                }
                ParserState::InChannel { id }
            }
            (ParserState::InChannel { .. }, LineKind::ChannelClose) => ParserState::Idle,
            (ParserState::InOpenProgramme(open), LineKind::Title) => {
                match element_text(&TITLE, line) {
                    Some(title) => {
                        self.emit(open, title);
                        ParserState::Idle
                    }
                    None => ParserState::InOpenProgramme(open),
                }
            }
            (ParserState::InOpenProgramme(_), LineKind::ProgrammeClose) => {
                self.dropped += 1;
                ParserState::Idle
            }
            (state, _) => state,
        };
    }

    /// Programmes dropped because they never carried a title
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn finish(mut self) -> EpgIndex {
        let state = std::mem::replace(&mut self.state, ParserState::Idle);
        self.drop_open(&state);
        if self.dropped > 0 {
            debug!("Dropped {} EPG programmes without a title", self.dropped);
        }
        self.index
    }

    fn drop_open(&mut self, state: &ParserState) {
        if matches!(state, ParserState::InOpenProgramme(_)) {
            self.dropped += 1;
        }
    }

    fn open_channel(&mut self, line: &str) -> ParserState {
        let Some(id) = attribute(&CHANNEL_ID, line).filter(|id| !id.is_empty()) else {
            return ParserState::Idle;
        };

        for caps in DISPLAY_NAME.captures_iter(line) {
            if let Some(name) = caps.get(1) {
                self.index
                    .register_name(&unescape_text(name.as_str().trim()), &id);
            }
        }
        if let Some(src) = attribute(&ICON_SRC, line) {
            self.index.register_logo(&id, src);
        }

        if line.contains("</channel>") {
            ParserState::Idle
        } else {
            ParserState::InChannel { id }
        }
    }

    fn open_programme(&mut self, line: &str) -> ParserState {
        let Some(channel) = attribute(&PROGRAMME_CHANNEL, line).filter(|c| !c.is_empty()) else {
            return ParserState::Idle;
        };
        let open = OpenProgramme {
            channel,
            start: attribute(&PROGRAMME_START, line).unwrap_or_default(),
            end: attribute(&PROGRAMME_STOP, line).unwrap_or_default(),
        };

        match element_text(&TITLE, line) {
            Some(title) => {
                self.emit(open, title);
                ParserState::Idle
            }
            None if line.contains("</programme>") => {
                self.dropped += 1;
                ParserState::Idle
            }
            None => ParserState::InOpenProgramme(open),
        }
    }

    fn emit(&mut self, open: OpenProgramme, title: String) {
        self.index.push_program(
            open.channel,
            EpgProgram {
                start: open.start,
                end: open.end,
                title,
            },
        );
    }
}

fn decode_into(
    decoder: &mut StreamingDecompressor,
    chunk: &[u8],
    lines: &mut LineAssembler,
    parser: &mut EpgStreamParser,
) -> SourceResult<()> {
    let decoded = decoder.decode(chunk).map_err(|e| SourceError::DecodeFailed {
        message: format!("failed to inflate EPG stream: {e}"),
    })?;
    lines.push(&decoded, |line| parser.feed_line(line));
    Ok(())
}

/// Byte counts of one fully read stream
struct StreamStats {
    received: usize,
    compressed: bool,
}

/// Drive the stream into `parser` until it ends or fails
///
/// On error, whatever complete lines arrived before it have already been fed.
async fn feed_stream(mut stream: ByteStream, parser: &mut EpgStreamParser) -> AppResult<StreamStats> {
    let mut lines = LineAssembler::default();
    let mut decoder: Option<StreamingDecompressor> = None;
    let mut sniff = Vec::new();
    let mut received = 0usize;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        received += chunk.len();
        match decoder.as_mut() {
            Some(decoder) => decode_into(decoder, &chunk, &mut lines, parser)?,
            None => {
                sniff.extend_from_slice(&chunk);
                if sniff.len() >= SNIFF_LEN {
                    let mut started = StreamingDecompressor::for_first_chunk(&sniff)?;
                    decode_into(&mut started, &std::mem::take(&mut sniff), &mut lines, parser)?;
                    decoder = Some(started);
                }
            }
        }
    }

    let decoder = match decoder {
        Some(decoder) => decoder,
        None => {
            let mut started = StreamingDecompressor::for_first_chunk(&sniff)?;
            decode_into(&mut started, &sniff, &mut lines, parser)?;
            started
        }
    };
    let compressed = decoder.is_compressed();
    let tail = decoder.finish().map_err(|e| SourceError::DecodeFailed {
        message: format!("truncated gzip EPG stream: {e}"),
    })?;
    lines.push(&tail, |line| parser.feed_line(line));
    lines.finish(|line| parser.feed_line(line));

    Ok(StreamStats {
        received,
        compressed,
    })
}

/// Parse an XMLTV body from a chunk stream
///
/// A stream that fails part way (reset, timeout, truncated gzip) still yields
/// everything parsed up to that point. The error is returned only when
/// nothing usable arrived before it.
pub async fn parse_epg_stream(stream: ByteStream) -> AppResult<EpgIndex> {
    let mut parser = EpgStreamParser::new();
    let outcome = feed_stream(stream, &mut parser).await;
    let index = parser.finish();

    match outcome {
        Ok(stats) => debug!(
            "Parsed EPG stream: {} bytes (gzip: {}), {} channels with programmes, {} programmes, {} names, {} logos",
            stats.received,
            stats.compressed,
            index.programs.len(),
            index.program_count(),
            index.name_to_id.len(),
            index.logos.len()
        ),
        Err(e) if index.is_empty() => return Err(e),
        Err(e) => warn!(
            "EPG stream interrupted, keeping partial guide ({} programmes, {} names): {}",
            index.program_count(),
            index.name_to_id.len(),
            e
        ),
    }
    Ok(index)
}
