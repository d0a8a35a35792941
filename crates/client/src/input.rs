//! Line input that can be interrupted.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// What came of waiting for a line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
    /// A line, with its line ending.
    Line(String),
    /// The input closed or failed.
    Closed,
    /// `interrupt` resolved first.
    Interrupted,
}

/// Reads a line from `reader`, or gives up once `interrupt` resolves.
///
/// Keep one reader for the whole session; a fresh buffer per call would
/// drop input that arrived together with the previous line.
pub async fn next_line<R, F>(reader: &mut R, interrupt: F) -> Input
where
    R: AsyncBufRead + Unpin,
    F: Future<Output = ()>,
{
    let mut line = String::new();
    tokio::select! {
        result = reader.read_line(&mut line) => match result {
            Ok(0) => Input::Closed,
            Ok(_) => Input::Line(line),
            Err(err) => {
                error!("error reading input: {}", err);
                Input::Closed
            }
        },
        _ = interrupt => Input::Interrupted,
    }
}
