pub mod color;
pub mod field;
pub mod generator;
pub mod params;
pub mod rng;

pub use field::{GalaxyField, GalaxyRegion, HighlightEntry, RotationCache};
pub use generator::{generate_field, BackgroundStar, GalaxyFieldData, GalaxyStar};
pub use params::{GalaxyLayerAlpha, GalaxyPalette, GalaxyParams, GlowConfig};
pub use rng::{deterministic_phase, deterministic_seed, noise2d, SeededRng};
