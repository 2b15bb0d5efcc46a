//! Pipeline execution
//!
//! [`live::LiveIngestor`] drives one pipeline run per source. The streaming
//! XMLTV reader it uses lives in [`epg`] and can be fed without any network.

pub mod epg;
pub mod live;

pub use epg::{EpgIndex, EpgStreamParser, LineAssembler, parse_epg_stream};
pub use live::LiveIngestor;
