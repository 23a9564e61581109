//! Stream references and render descriptors
//!
//! `StreamRef` is the sum type joining live media streams and audio-only
//! placeholders; `TileDescriptor` is the render descriptor handed to the
//! presentation layer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a transport-layer producer (one outbound media track)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProducerId(String);

impl ProducerId {
    /// Create a new producer id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProducerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProducerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Identifier of a session participant
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Create a new participant id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Kind of stream a tile renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    /// Live camera stream
    Camera,
    /// Audio-only placeholder (avatar tile, no media handle)
    AudioOnly,
    /// Screen-share stream
    Screen,
}

/// Reference to a renderable stream
///
/// A `StreamRef` without a producer id is a placeholder: the participant is
/// present but has no live video track, so the tile renders an avatar.
/// Lifetime of the producer-backed variants is bound to the owning
/// producer's lifecycle on the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StreamRef {
    /// Live camera stream
    Camera {
        /// Transport producer backing this stream
        producer_id: ProducerId,
        /// Owning participant
        participant_id: ParticipantId,
    },
    /// Screen-share stream
    Screen {
        /// Transport producer backing this stream
        producer_id: ProducerId,
        /// Owning participant
        participant_id: ParticipantId,
    },
    /// Audio-only placeholder tile
    AudioOnly {
        /// Owning participant
        participant_id: ParticipantId,
    },
}

impl StreamRef {
    /// The kind of this stream
    pub fn kind(&self) -> StreamKind {
        match self {
            StreamRef::Camera { .. } => StreamKind::Camera,
            StreamRef::Screen { .. } => StreamKind::Screen,
            StreamRef::AudioOnly { .. } => StreamKind::AudioOnly,
        }
    }

    /// The owning participant
    pub fn participant_id(&self) -> &ParticipantId {
        match self {
            StreamRef::Camera { participant_id, .. }
            | StreamRef::Screen { participant_id, .. }
            | StreamRef::AudioOnly { participant_id } => participant_id,
        }
    }

    /// The backing producer, if this ref is producer-backed
    pub fn producer_id(&self) -> Option<&ProducerId> {
        match self {
            StreamRef::Camera { producer_id, .. } | StreamRef::Screen { producer_id, .. } => {
                Some(producer_id)
            }
            StreamRef::AudioOnly { .. } => None,
        }
    }

    /// Whether this ref is an audio-only placeholder
    pub fn is_placeholder(&self) -> bool {
        matches!(self, StreamRef::AudioOnly { .. })
    }
}

/// Pixel bounds of one tile within the container
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct TileRect {
    /// Left edge, pixels
    pub x: f64,
    /// Top edge, pixels
    pub y: f64,
    /// Width, pixels
    pub width: f64,
    /// Height, pixels
    pub height: f64,
}

/// What a tile displays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "content", rename_all = "lowercase")]
pub enum TileContent {
    /// A stream (live or audio-only placeholder)
    Stream(StreamRef),
    /// Padding tile inserted to square off the grid geometry
    Pad,
}

/// Render descriptor handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileDescriptor {
    /// Tile content
    pub content: TileContent,
    /// Pixel bounds, filled in by the sizer; `None` until sized
    pub rect: Option<TileRect>,
    /// Whether this tile belongs to the alt (screen-share-adjacent) grid
    pub alt_grid: bool,
}

impl TileDescriptor {
    /// Descriptor for a stream tile
    pub fn stream(stream: StreamRef, alt_grid: bool) -> Self {
        Self {
            content: TileContent::Stream(stream),
            rect: None,
            alt_grid,
        }
    }

    /// Descriptor for a padding tile
    pub fn pad(alt_grid: bool) -> Self {
        Self {
            content: TileContent::Pad,
            rect: None,
            alt_grid,
        }
    }

    /// Whether this tile renders no live media (padding or avatar)
    pub fn is_placeholder(&self) -> bool {
        match &self.content {
            TileContent::Pad => true,
            TileContent::Stream(s) => s.is_placeholder(),
        }
    }

    /// The backing producer, if any
    pub fn producer_id(&self) -> Option<&ProducerId> {
        match &self.content {
            TileContent::Stream(s) => s.producer_id(),
            TileContent::Pad => None,
        }
    }
}
