//! Defensive CSV ingestion.
//!
//! This module turns an uploaded byte source into a [`ParsedTable`]:
//! - Decoding with UTF-8, Windows-1252 and lossy UTF-8 fallbacks
//! - Sniffing the delimiter among `,` `;` tab and `|`
//! - Capping the number of kept columns
//! - Dropping and counting rows with too few fields

mod encoding;
mod reader;
mod sniffer;
mod source;

pub use encoding::{TextEncoding, decode_text};
pub use reader::{DefensiveCsvReader, MalformedRow, ParsedTable};
pub use sniffer::{CANDIDATE_DELIMITERS, DEFAULT_DELIMITER, sniff_delimiter};
pub use source::{FileSource, ReportSource, UploadedFile};
