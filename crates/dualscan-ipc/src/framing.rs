//! Newline-delimited JSON frames.

use crate::{IpcError, IpcResult};
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Longest accepted line, newline included.
pub const MAX_FRAME_LEN: u64 = 64 * 1024;

/// Read the next non-blank line into `buf` and return it trimmed.
/// `None` at end of stream.
pub(crate) async fn read_frame<'a, R>(
    reader: &mut R,
    buf: &'a mut String,
) -> IpcResult<Option<&'a str>>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        buf.clear();
        let n = (&mut *reader).take(MAX_FRAME_LEN).read_line(buf).await?;
        if n == 0 {
            return Ok(None);
        }
        if !buf.ends_with('\n') && n as u64 == MAX_FRAME_LEN {
            return Err(IpcError::Protocol(format!(
                "frame longer than {MAX_FRAME_LEN} bytes"
            )));
        }
        if buf.trim().is_empty() {
            continue;
        }
        return Ok(Some(buf.trim()));
    }
}

/// Serialize `value` as one line and flush it.
pub(crate) async fn write_frame<W, T>(writer: &mut W, value: &T) -> IpcResult<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut line = serde_json::to_vec(value)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await?;
    Ok(())
}
