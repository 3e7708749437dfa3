//! Command Error Types
//!
//! Top of the error tree: each variant names the stage of a run that failed,
//! with the originating crate's error attached beneath it.

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("unable to load configuration")]
    Config,
    #[display("unable to set up storage backend")]
    Storage,
    #[display("unable to build manifest")]
    Manifest,
    #[display("unable to synchronise storage")]
    Sync,
}
