//! Vitro Core
//!
//! Foundational types for the Vitro liquid glass pipeline:
//!
//! - **Geometry**: points, sizes and rects shared by every stage
//! - **Region mapping**: overlay bounds projected into capture-surface space
//! - **Effect parameters**: the per-paint knobs of the glass program, plus presets
//! - **Quality levels**: the adaptive quality ladder driven by frame timing
//! - **State store**: subscribe/notify with one coalesced emission per frame
//!
//! # Example
//!
//! ```rust
//! use vitro_core::{Rect, RegionMapper};
//!
//! let overlay = Rect::new(40.0, 40.0, 300.0, 200.0);
//! let surface = Rect::new(0.0, 0.0, 320.0, 480.0);
//!
//! let region = RegionMapper::map(overlay, surface).unwrap();
//! assert_eq!(region, Rect::new(40.0, 40.0, 280.0, 200.0));
//! ```

pub mod error;
pub mod geometry;
pub mod params;
pub mod quality;
pub mod region;
pub mod store;

pub use error::{Result, VitroError};
pub use geometry::{Color, CornerRadius, Point, Rect, Size, Vec2};
pub use params::{EffectParameters, GlassPreset};
pub use quality::QualityLevel;
pub use region::RegionMapper;
pub use store::{StateStore, SubscriptionId};
