//! Core traits for streaming compression and decompression engines.

use crate::error::Result;

/// Status of a streaming decompression operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecompressStatus {
    /// More input is needed to continue decompression.
    NeedsInput,
    /// More output buffer space is needed.
    NeedsOutput,
    /// Decompression is complete.
    Done,
    /// A member boundary was reached (caller may want to inspect CRC, etc.).
    MemberEnd,
}

/// Status of a streaming compression operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressStatus {
    /// More input data can be accepted.
    NeedsInput,
    /// More output buffer space is needed.
    NeedsOutput,
    /// Compression is complete.
    Done,
}

/// Flush mode for compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushMode {
    /// No flush - buffer data for best compression.
    #[default]
    None,
    /// Sync flush - emit all pending output without resetting encoder state.
    Sync,
    /// Full flush - emit pending output, write a trailer and start a new member.
    Full,
    /// Finish - complete the stream.
    Finish,
}

/// A streaming decompressor (decoder).
pub trait Decompressor {
    /// Decompress data from input to output.
    ///
    /// Returns a tuple of (bytes consumed from input, bytes written to output, status).
    fn decompress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<(usize, usize, DecompressStatus)>;

    /// Reset the decompressor to its initial state.
    fn reset(&mut self);

    /// Check if the decompressor has finished.
    fn is_finished(&self) -> bool;

    /// Decompress all data at once (convenience method).
    fn decompress_all(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut input_pos = 0;
        let mut buffer = vec![0u8; 32768];

        loop {
            let (consumed, produced, status) = self.decompress(&input[input_pos..], &mut buffer)?;

            input_pos += consumed;
            output.extend_from_slice(&buffer[..produced]);

            match status {
                DecompressStatus::Done => break,
                DecompressStatus::NeedsInput if input_pos >= input.len() => break,
                DecompressStatus::NeedsOutput
                | DecompressStatus::NeedsInput
                | DecompressStatus::MemberEnd => continue,
            }
        }

        Ok(output)
    }
}

/// A streaming compressor (encoder).
pub trait Compressor {
    /// Compress data from input to output.
    ///
    /// Returns a tuple of (bytes consumed from input, bytes written to output, status).
    fn compress(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> Result<(usize, usize, CompressStatus)>;

    /// Reset the compressor to its initial state.
    fn reset(&mut self);

    /// Check if the compressor has finished.
    fn is_finished(&self) -> bool;

    /// Compress all data at once (convenience method).
    fn compress_all(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut input_pos = 0;
        let mut buffer = vec![0u8; 32768];

        loop {
            let flush = if input_pos >= input.len() {
                FlushMode::Finish
            } else {
                FlushMode::None
            };

            let (consumed, produced, status) =
                self.compress(&input[input_pos..], &mut buffer, flush)?;

            input_pos += consumed;
            output.extend_from_slice(&buffer[..produced]);

            match status {
                CompressStatus::Done => break,
                CompressStatus::NeedsInput if input_pos >= input.len() => {
                    let (_, produced, status) =
                        self.compress(&[], &mut buffer, FlushMode::Finish)?;
                    output.extend_from_slice(&buffer[..produced]);
                    if status == CompressStatus::Done {
                        break;
                    }
                }
                _ => continue,
            }
        }

        Ok(output)
    }
}
