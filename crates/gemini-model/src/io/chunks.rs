#[cfg(test)]
use std::collections::VecDeque;
use std::fmt::{self, Display, Formatter};

use bytes::Bytes;
use reqwest::Response;

/// The connection failed while reading the body.
#[derive(Debug, PartialEq, Eq)]
pub struct Error(String);

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "failed to read response body: {}", self.0)
    }
}

/// Body chunks in arrival order.
pub enum Chunks {
    Body(Response),
    #[cfg(test)]
    Replay(VecDeque<Bytes>),
}

impl Chunks {
    #[inline]
    pub fn from_response(response: Response) -> Self {
        Chunks::Body(response)
    }

    /// Replays prerecorded chunks.
    #[cfg(test)]
    pub fn replay<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Chunks::Replay(chunks.into_iter().map(Into::into).collect())
    }

    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, Error> {
        match self {
            Chunks::Body(response) => response.chunk().await.map_err(|err| {
                debug!("body read failed: {err}");
                Error(err.to_string())
            }),
            #[cfg(test)]
            Chunks::Replay(queue) => Ok(queue.pop_front()),
        }
    }
}
