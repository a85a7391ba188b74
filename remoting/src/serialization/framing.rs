//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//


//! Length-prefixed framing over a byte stream.
//!
//! Every frame written to a transport is prefixed with its length:
//!
//! ```text
//! +------------------+-------------------+
//! | Length (4 bytes) | Payload (N bytes) |
//! +------------------+-------------------+
//! ```
//!
//! - **Length**: u32 in big-endian format
//! - **Payload**: an encoded call, response or handshake message
//! - **Max size**: [`MAX_FRAME_SIZE`] unless the endpoint configures less
//!
//! # Examples
//!
//! ```rust
//! use remoting::serialization::framing::{read_frame, write_frame, MAX_FRAME_SIZE};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut buffer = Vec::new();
//! write_frame(&mut buffer, b"Hello", MAX_FRAME_SIZE).await?;
//! assert_eq!(&buffer[0..4], &5u32.to_be_bytes());
//!
//! let mut reader = &buffer[..];
//! let frame = read_frame(&mut reader, MAX_FRAME_SIZE).await?;
//! assert_eq!(frame.as_deref(), Some(&b"Hello"[..]));
//! # Ok(())
//! # }
//! ```

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::transport::TransportError;

/// Default maximum frame size (16 MB).
pub const MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;

/// Size of the frame length header in bytes.
pub const FRAME_HEADER_SIZE: usize = 4;

/// Writes one length-prefixed frame and flushes the writer.
///
/// # Errors
///
/// - [`TransportError::FrameTooLarge`] if the payload exceeds `max_size`,
/// - [`TransportError::WriteFailed`] if the writer fails.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8], max_size: u32) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let len = payload.len();
    if len > max_size as usize {
        return Err(TransportError::FrameTooLarge {
            size: len,
            max_size,
        });
    }

    let len_bytes = (len as u32).to_be_bytes();
    writer
        .write_all(&len_bytes)
        .await
        .map_err(|source| TransportError::WriteFailed { source })?;
    writer
        .write_all(payload)
        .await
        .map_err(|source| TransportError::WriteFailed { source })?;
    writer
        .flush()
        .await
        .map_err(|source| TransportError::WriteFailed { source })?;

    Ok(())
}

/// Reads one length-prefixed frame.
///
/// Returns `Ok(None)` when the peer closed the stream cleanly between frames.
///
/// # Errors
///
/// - [`TransportError::FrameTooLarge`] if the announced length exceeds
///   `max_size`,
/// - [`TransportError::ConnectionLost`] if the stream ends inside a frame,
/// - [`TransportError::ReadFailed`] if the reader fails.
pub async fn read_frame<R>(reader: &mut R, max_size: u32) -> Result<Option<Vec<u8>>, TransportError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut len_bytes = [0u8; FRAME_HEADER_SIZE];
    match reader.read_exact(&mut len_bytes).await {
        Ok(_) => {}
        Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(source) => return Err(TransportError::ReadFailed { source }),
    }

    let len = u32::from_be_bytes(len_bytes);
    if len > max_size {
        return Err(TransportError::FrameTooLarge {
            size: len as usize,
            max_size,
        });
    }

    let mut payload = vec![0u8; len as usize];
    match reader.read_exact(&mut payload).await {
        Ok(_) => Ok(Some(payload)),
        Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => {
            Err(TransportError::ConnectionLost {
                reason: format!("stream ended inside a frame of {len} bytes"),
                source: Some(error),
            })
        }
        Err(source) => Err(TransportError::ReadFailed { source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_read_frame() {
        let mut buffer = Vec::new();
        write_frame(&mut buffer, b"payload", MAX_FRAME_SIZE).await.unwrap();
        write_frame(&mut buffer, b"", MAX_FRAME_SIZE).await.unwrap();

        let mut reader = &buffer[..];
        assert_eq!(
            read_frame(&mut reader, MAX_FRAME_SIZE).await.unwrap(),
            Some(b"payload".to_vec())
        );
        assert_eq!(
            read_frame(&mut reader, MAX_FRAME_SIZE).await.unwrap(),
            Some(Vec::new())
        );
        assert_eq!(read_frame(&mut reader, MAX_FRAME_SIZE).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_frame_too_large() {
        let mut buffer = Vec::new();
        let result = write_frame(&mut buffer, &[0u8; 32], 16).await;
        assert!(matches!(
            result,
            Err(TransportError::FrameTooLarge { size: 32, max_size: 16 })
        ));

        let header = 1024u32.to_be_bytes();
        let mut reader = &header[..];
        let result = read_frame(&mut reader, 16).await;
        assert!(matches!(result, Err(TransportError::FrameTooLarge { .. })));
    }

    #[tokio::test]
    async fn test_truncated_frame() {
        let mut data = 10u32.to_be_bytes().to_vec();
        data.extend_from_slice(b"abc");
        let mut reader = &data[..];
        let result = read_frame(&mut reader, MAX_FRAME_SIZE).await;
        assert!(matches!(result, Err(TransportError::ConnectionLost { .. })));
    }
}
