//! Owned byte payloads for requests and responses.
//!
//! # Design
//! `ByteBuffer` is a thin newtype over `Vec<u8>`. Conversions from borrowed
//! slices copy; conversions from `Vec<u8>` take ownership. No buffer is ever
//! shared between a request, a response, and the transport, so a payload can
//! be handed to a worker thread without synchronisation.

use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

/// An ordered, immutable sequence of bytes.
///
/// Equality is element-wise. Once built, the contents cannot be mutated in
/// place; build a new buffer instead.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ByteBuffer(Vec<u8>);

impl ByteBuffer {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Copy `bytes` into a new buffer.
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Copy the contents out into a fresh `Vec<u8>`.
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.clone()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl Deref for ByteBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for ByteBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for ByteBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for ByteBuffer {
    fn from(bytes: &[u8]) -> Self {
        Self::from_slice(bytes)
    }
}

impl<const N: usize> From<[u8; N]> for ByteBuffer {
    fn from(bytes: [u8; N]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<&str> for ByteBuffer {
    fn from(text: &str) -> Self {
        Self::from_slice(text.as_bytes())
    }
}

impl From<String> for ByteBuffer {
    fn from(text: String) -> Self {
        Self(text.into_bytes())
    }
}

impl From<ByteBuffer> for Vec<u8> {
    fn from(buffer: ByteBuffer) -> Self {
        buffer.0
    }
}

impl FromIterator<u8> for ByteBuffer {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// Payloads can be large; show the length and a short prefix only.
impl fmt::Debug for ByteBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const PREVIEW: usize = 16;
        write!(f, "ByteBuffer({} bytes: ", self.0.len())?;
        for byte in self.0.iter().take(PREVIEW) {
            write!(f, "{byte:02x}")?;
        }
        if self.0.len() > PREVIEW {
            write!(f, "..")?;
        }
        write!(f, ")")
    }
}
