//! Snapshot entry and its thumbnail payload.

use base64::Engine;
use serde::{Serialize, Serializer};

use crate::key::SnapshotKey;

/// Opaque rendered image obtained from the host at capture time.
/// Never regenerated afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Thumbnail {
    mime: String,
    bytes: Vec<u8>,
}

impl Thumbnail {
    pub fn new<S: Into<String>>(mime: S, bytes: Vec<u8>) -> Self {
        Self {
            mime: mime.into(),
            bytes,
        }
    }

    pub fn png(bytes: Vec<u8>) -> Self {
        Self::new("image/png", bytes)
    }

    pub fn svg<S: Into<String>>(markup: S) -> Self {
        Self::new("image/svg+xml", markup.into().into_bytes())
    }

    #[inline]
    pub fn mime(&self) -> &str {
        &self.mime
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// `data:<mime>;base64,<payload>`: готово для <img src=...>.
    pub fn to_data_url(&self) -> String {
        let payload = base64::engine::general_purpose::STANDARD.encode(&self.bytes);
        format!("data:{};base64,{}", self.mime, payload)
    }
}

impl Serialize for Thumbnail {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_data_url())
    }
}

/// One entry of the history list. Owned by SnapshotStore; consumers only
/// ever see shared references, so `is_current` cannot be flipped from outside.
#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    key: SnapshotKey,
    thumbnail: Thumbnail,
    is_current: bool,
    display_width_px: u32,
    seq: u64,
}

impl Snapshot {
    pub(crate) fn new(key: SnapshotKey, thumbnail: Thumbnail, display_width_px: u32, seq: u64) -> Self {
        Self {
            key,
            thumbnail,
            is_current: true,
            display_width_px,
            seq,
        }
    }

    #[inline]
    pub fn key(&self) -> &SnapshotKey {
        &self.key
    }

    #[inline]
    pub fn thumbnail(&self) -> &Thumbnail {
        &self.thumbnail
    }

    #[inline]
    pub fn is_current(&self) -> bool {
        self.is_current
    }

    /// Panel width at capture time (thumbnail is laid out at this width).
    #[inline]
    pub fn display_width_px(&self) -> u32 {
        self.display_width_px
    }

    /// Capture ordinal, strictly increasing within one store generation.
    #[inline]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    #[inline]
    pub(crate) fn set_current(&mut self, on: bool) {
        self.is_current = on;
    }
}
