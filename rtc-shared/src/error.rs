#![allow(dead_code)]

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq, Eq, Clone)]
#[non_exhaustive]
pub enum Error {
    #[error("packet too short")]
    ErrShortPacket,

    #[error("buffer: full")]
    ErrBufferFull,

    #[error("queue: closed")]
    ErrQueueClosed,

    #[error("{0}")]
    Other(String),
}
