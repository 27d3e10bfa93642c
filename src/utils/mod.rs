//! Utility modules

pub mod error;
pub mod resp;

pub use error::{
    ClientError, ConnectionError, ExporterError, RegistryError, Result, ScrapeError, SinkError,
    VersionParseError,
};
pub use resp::{RespDecoder, RespEncoder, RespValue};
