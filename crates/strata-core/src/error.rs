use crate::scene::ObjectId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid size: {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("Object not found: {0}")]
    UnknownObject(ObjectId),

    #[error("Backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, Error>;
