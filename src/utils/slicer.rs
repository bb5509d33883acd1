// src/utils/slicer.rs
//! Sequential byte slicer.
//!
//! Re-slices a flat buffer into consecutive windows. The buffer carries no
//! length information of its own; callers must request lengths in the exact
//! order the buffer was produced.

use crate::error::BufferExhaustedError;

/// Cursor over a byte buffer. Not meant to be shared across threads.
#[derive(Debug)]
pub struct ByteSlicer<'a> {
    bytes: &'a [u8],
    cursor: usize,
}

impl<'a> ByteSlicer<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        ByteSlicer { bytes, cursor: 0 }
    }

    /// Returns the next `len` bytes and advances the cursor.
    ///
    /// Fails without advancing when the cursor is already at or past the
    /// end, or when the window would run past the end.
    pub fn slice(&mut self, len: usize) -> Result<&'a [u8], BufferExhaustedError> {
        let end = self.cursor.checked_add(len);
        match end {
            Some(end) if self.cursor < self.bytes.len() && end <= self.bytes.len() => {
                let window = &self.bytes[self.cursor..end];
                self.cursor = end;
                Ok(window)
            }
            _ => Err(BufferExhaustedError {
                offset: self.cursor,
                requested: len,
                len: self.bytes.len(),
            }),
        }
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.cursor
    }
}
