// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Growable byte buffer used for answer-lock payloads and data-channel
//! transfers, in place of the original's manually-realloc'd managed buffer.

use bytes::BytesMut;

/// A thin, append-oriented wrapper over [`BytesMut`]. Where the original
/// grows its buffer in large steps to avoid frequent reallocation, `BytesMut`
/// already amortizes growth, so this wrapper only adds the handful of
/// operations the engine actually needs.
#[derive(Debug, Clone, Default)]
pub struct ByteBuffer {
    inner: BytesMut,
}

impl ByteBuffer {
    pub fn new() -> Self {
        Self { inner: BytesMut::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { inner: BytesMut::with_capacity(capacity) }
    }

    pub fn append(&mut self, data: &[u8]) {
        self.inner.extend_from_slice(data);
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.inner
    }

    /// Interprets the buffer as UTF-8, replacing anything invalid. Server
    /// replies are nominally ASCII, so this is lossless in the common case.
    pub fn as_str_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.inner)
    }

    /// True if `needle` occurs anywhere in the buffer.
    pub fn contains_str(&self, needle: &str) -> bool {
        self.as_str_lossy().contains(needle)
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.inner.to_vec()
    }
}

impl std::ops::Deref for ByteBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.inner
    }
}

impl From<&[u8]> for ByteBuffer {
    fn from(data: &[u8]) -> Self {
        let mut buf = Self::with_capacity(data.len());
        buf.append(data);
        buf
    }
}

impl From<Vec<u8>> for ByteBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self { inner: BytesMut::from(data) }
    }
}
