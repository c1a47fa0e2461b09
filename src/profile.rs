//! Stamp profiles: the fixed id → placement/image configuration table.
//!
//! The three stamp types are data, not branching logic: each
//! [`StampKind`] maps to an immutable [`StampProfile`] holding its
//! per-profile placement nudges and its decoded raster image. Adding a
//! stamp type means adding a row to the table and a PNG under `assets/`.
//!
//! Assets are loaded through the [`AssetSource`] capability rather than a
//! filesystem path, so the core stays testable without real files and
//! portable across packaging schemes. The default [`BundledAssets`] embeds
//! the PNGs into the binary with `include_bytes!`.
//!
//! [`ProfileSet::load`] eagerly decodes every asset. A missing or corrupt
//! PNG is a deployment defect; failing at startup beats failing on the
//! first user request.

use crate::error::StampError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// The declared stamp-type id set. Anything else is [`StampError::InvalidStampType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StampKind {
    /// Type 1: hero stamp.
    Hero,
    /// Type 2: as-built stamp.
    AsBuilt,
    /// Type 3: certified-construction stamp.
    Construction,
}

impl StampKind {
    /// All declared kinds, in id order.
    pub const ALL: [StampKind; 3] = [StampKind::Hero, StampKind::AsBuilt, StampKind::Construction];

    /// The numeric id exposed at the boundary ("1", "2", "3").
    pub fn id(self) -> u8 {
        match self {
            StampKind::Hero => 1,
            StampKind::AsBuilt => 2,
            StampKind::Construction => 3,
        }
    }

    /// File name of the stamp raster under `assets/`.
    fn asset_name(self) -> &'static str {
        match self {
            StampKind::Hero => "hero.png",
            StampKind::AsBuilt => "asbuilt.png",
            StampKind::Construction => "construction.png",
        }
    }

    /// Per-profile placement nudge added to the computed page origin.
    fn anchor(self) -> (f32, f32) {
        match self {
            StampKind::Hero => (20.0, 20.0),
            StampKind::AsBuilt => (50.0, 50.0),
            StampKind::Construction => (80.0, 80.0),
        }
    }

    /// Offset of the text lines relative to the stamp's top-left corner.
    fn text_offset(self) -> (f32, f32) {
        match self {
            StampKind::Hero => (100.0, 88.0),
            StampKind::AsBuilt => (50.0, 0.0),
            StampKind::Construction => (200.0, 200.0),
        }
    }
}

impl TryFrom<u8> for StampKind {
    type Error = StampError;

    fn try_from(id: u8) -> Result<Self, StampError> {
        match id {
            1 => Ok(StampKind::Hero),
            2 => Ok(StampKind::AsBuilt),
            3 => Ok(StampKind::Construction),
            other => Err(StampError::InvalidStampType {
                value: other.to_string(),
            }),
        }
    }
}

impl FromStr for StampKind {
    type Err = StampError;

    fn from_str(s: &str) -> Result<Self, StampError> {
        s.trim()
            .parse::<u8>()
            .map_err(|_| StampError::InvalidStampType {
                value: s.to_string(),
            })
            .and_then(StampKind::try_from)
    }
}

impl fmt::Display for StampKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StampKind::Hero => "hero",
            StampKind::AsBuilt => "as-built",
            StampKind::Construction => "construction",
        };
        write!(f, "{name}")
    }
}

/// A decoded stamp raster, split into the channel layout PDF wants.
///
/// PDF image XObjects carry raw samples, not PNG containers, so the PNG is
/// decoded once here and the RGB plane and optional alpha plane (for the
/// `SMask`) are kept separately. Read-only after load and shared across all
/// concurrent stampings via `Arc`.
#[derive(Debug)]
pub struct StampImage {
    pub width: u32,
    pub height: u32,
    /// Interleaved 8-bit RGB samples, row-major.
    pub rgb: Vec<u8>,
    /// 8-bit alpha samples when the PNG has any transparency.
    pub alpha: Option<Vec<u8>>,
}

impl StampImage {
    fn decode(kind: StampKind, bytes: &[u8]) -> Result<Self, StampError> {
        let decoded = image::load_from_memory(bytes).map_err(|e| StampError::AssetLoad {
            kind: kind.id(),
            detail: e.to_string(),
        })?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();

        let mut rgb = Vec::with_capacity((width * height * 3) as usize);
        let mut alpha = Vec::with_capacity((width * height) as usize);
        let mut translucent = false;
        for px in rgba.pixels() {
            rgb.extend_from_slice(&px.0[..3]);
            alpha.push(px.0[3]);
            translucent |= px.0[3] != u8::MAX;
        }

        debug!(
            "Decoded stamp asset {} → {}x{} px, alpha={}",
            kind.asset_name(),
            width,
            height,
            translucent
        );

        Ok(Self {
            width,
            height,
            rgb,
            alpha: translucent.then_some(alpha),
        })
    }
}

/// Immutable placement and image parameters for one stamp type.
#[derive(Debug, Clone)]
pub struct StampProfile {
    pub kind: StampKind,
    /// Placement nudge added to the stamp origin, in points.
    pub anchor: (f32, f32),
    /// Text position relative to the stamp's top edge, in points.
    pub text_offset: (f32, f32),
    /// Decoded raster, shared across concurrent use.
    pub image: Arc<StampImage>,
}

/// Capability for obtaining raw stamp asset bytes.
///
/// Implement this to source stamps from somewhere other than the binary
/// itself (object storage, a theming directory, test fixtures).
pub trait AssetSource: Send + Sync {
    fn load(&self, kind: StampKind) -> Result<Vec<u8>, StampError>;
}

/// Default asset source: PNGs compiled into the binary.
#[derive(Debug, Default)]
pub struct BundledAssets;

impl AssetSource for BundledAssets {
    fn load(&self, kind: StampKind) -> Result<Vec<u8>, StampError> {
        let bytes: &[u8] = match kind {
            StampKind::Hero => include_bytes!("../assets/hero.png"),
            StampKind::AsBuilt => include_bytes!("../assets/asbuilt.png"),
            StampKind::Construction => include_bytes!("../assets/construction.png"),
        };
        Ok(bytes.to_vec())
    }
}

/// The resolved, eagerly-validated profile table for a process lifetime.
///
/// Loaded once at startup; lookups never fail after that. The key set is
/// fixed and tiny, so there is no cache eviction to think about.
#[derive(Debug, Clone)]
pub struct ProfileSet {
    profiles: [StampProfile; 3],
}

impl ProfileSet {
    /// Load and decode every profile's asset from `source`.
    ///
    /// Fails with [`StampError::AssetLoad`] on the first missing or corrupt
    /// asset. Call this once during process startup.
    pub fn load(source: &dyn AssetSource) -> Result<Self, StampError> {
        let build = |kind: StampKind| -> Result<StampProfile, StampError> {
            let bytes = source.load(kind)?;
            let image = StampImage::decode(kind, &bytes)?;
            Ok(StampProfile {
                kind,
                anchor: kind.anchor(),
                text_offset: kind.text_offset(),
                image: Arc::new(image),
            })
        };
        Ok(Self {
            profiles: [
                build(StampKind::Hero)?,
                build(StampKind::AsBuilt)?,
                build(StampKind::Construction)?,
            ],
        })
    }

    /// Load the profiles shipped inside the binary.
    pub fn bundled() -> Result<Self, StampError> {
        Self::load(&BundledAssets)
    }

    /// Look up a profile. Total over [`StampKind`] by construction.
    pub fn resolve(&self, kind: StampKind) -> &StampProfile {
        &self.profiles[kind.id() as usize - 1]
    }

    /// Parse a boundary-supplied id string ("1" | "2" | "3") and resolve it.
    pub fn resolve_id(&self, id: &str) -> Result<&StampProfile, StampError> {
        Ok(self.resolve(id.parse()?))
    }
}
