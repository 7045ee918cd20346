//! Field generation parameters and palettes.

/// Tunable knobs for field synthesis. Treated as opaque input by the
/// generator — callers pick a preset and adjust per device class.
#[derive(Clone, Debug, PartialEq)]
pub struct GalaxyParams {
    pub core_density: f64,
    pub core_radius: f64,
    pub core_size_min: f64,
    pub core_size_max: f64,
    pub arm_count: usize,
    pub arm_density: f64,
    pub arm_base_size_min: f64,
    pub arm_base_size_max: f64,
    pub arm_highlight_size: f64,
    pub arm_highlight_prob: f64,
    pub spiral_a: f64,
    pub spiral_b: f64,
    pub arm_width_inner: f64,
    pub arm_width_outer: f64,
    pub arm_width_growth: f64,
    pub arm_width_scale: f64,
    pub arm_transition_softness: f64,
    pub fade_start_radius: f64,
    pub fade_end_radius: f64,
    pub outer_density_maintain: f64,
    pub inter_arm_density: f64,
    pub inter_arm_size_min: f64,
    pub inter_arm_size_max: f64,
    pub radial_decay: f64,
    pub background_density: f64,
    pub background_size_variation: f64,
    pub jitter_strength: f64,
    pub density_noise_scale: f64,
    pub density_noise_strength: f64,
    pub jitter_chaos: f64,
    pub jitter_chaos_scale: f64,
    pub arm_star_size_multiplier: f64,
    pub inter_arm_star_size_multiplier: f64,
    pub background_star_size_multiplier: f64,
    pub galaxy_scale: f64,
    pub color_jitter_hue: f64,
    pub color_jitter_sat: f64,
    pub color_jitter_light: f64,
    pub color_noise_scale: f64,
}

impl Default for GalaxyParams {
    fn default() -> Self {
        Self::baseline()
    }
}

impl GalaxyParams {
    /// Baseline tuning for a phone-sized point canvas.
    pub fn baseline() -> Self {
        Self {
            core_density: 0.7,
            core_radius: 12.0,
            core_size_min: 1.0,
            core_size_max: 3.5,
            arm_count: 5,
            arm_density: 0.6,
            arm_base_size_min: 0.7,
            arm_base_size_max: 2.0,
            arm_highlight_size: 5.0,
            arm_highlight_prob: 0.01,
            spiral_a: 8.0,
            spiral_b: 0.29,
            arm_width_inner: 29.0,
            arm_width_outer: 65.0,
            arm_width_growth: 2.5,
            arm_width_scale: 1.0,
            arm_transition_softness: 3.8,
            fade_start_radius: 0.5,
            fade_end_radius: 1.3,
            outer_density_maintain: 0.10,
            inter_arm_density: 0.150,
            inter_arm_size_min: 0.6,
            inter_arm_size_max: 1.2,
            radial_decay: 0.0015,
            background_density: 0.00024,
            background_size_variation: 2.0,
            jitter_strength: 10.0,
            density_noise_scale: 0.018,
            density_noise_strength: 0.8,
            jitter_chaos: 0.0,
            jitter_chaos_scale: 0.0,
            arm_star_size_multiplier: 1.0,
            inter_arm_star_size_multiplier: 1.0,
            background_star_size_multiplier: 1.0,
            galaxy_scale: 0.88,
            color_jitter_hue: 0.0,
            color_jitter_sat: 0.0,
            color_jitter_light: 0.0,
            color_noise_scale: 0.0,
        }
    }

    /// Retuned for coarse, low-resolution canvases (terminal cell grids):
    /// the structural radii shrink with the canvas while densities rise so
    /// arms stay legible at a few dozen cells across.
    pub fn compact() -> Self {
        Self {
            core_radius: 3.5,
            core_density: 0.85,
            core_size_min: 0.8,
            core_size_max: 2.2,
            arm_density: 0.75,
            arm_base_size_min: 0.6,
            arm_base_size_max: 1.6,
            arm_highlight_size: 2.6,
            spiral_a: 2.0,
            spiral_b: 0.29,
            arm_width_inner: 4.5,
            arm_width_outer: 11.0,
            arm_transition_softness: 3.0,
            inter_arm_density: 0.10,
            inter_arm_size_min: 0.5,
            inter_arm_size_max: 1.0,
            radial_decay: 0.010,
            background_density: 0.004,
            background_size_variation: 1.6,
            jitter_strength: 2.2,
            density_noise_scale: 0.11,
            density_noise_strength: 0.7,
            color_jitter_hue: 10.0,
            color_jitter_sat: 0.06,
            color_jitter_light: 0.05,
            color_noise_scale: 0.35,
            ..Self::baseline()
        }
    }
}

/// One hex color per structural category.
#[derive(Clone, Debug, PartialEq)]
pub struct GalaxyPalette {
    pub core: String,
    pub ridge: String,
    pub arm_bright: String,
    pub arm_edge: String,
    pub hii: String,
    pub dust: String,
    pub outer: String,
}

impl GalaxyPalette {
    /// Base (unlit) structural colors.
    pub fn baseline() -> Self {
        Self {
            core: "#5A4E41".into(),
            ridge: "#5B5E66".into(),
            arm_bright: "#28457B".into(),
            arm_edge: "#245B88".into(),
            hii: "#3C194E".into(),
            dust: "#0E0A14".into(),
            outer: "#415069".into(),
        }
    }

    /// Colors points take on once highlighted.
    pub fn lit() -> Self {
        Self {
            core: "#E3B787".into(),
            ridge: "#C7C9CE".into(),
            arm_bright: "#92ADE0".into(),
            arm_edge: "#95C2E8".into(),
            hii: "#D88AC9".into(),
            dust: "#3F3264".into(),
            outer: "#ACB9CF".into(),
        }
    }
}

/// Per-category render opacity.
#[derive(Clone, Copy, Debug)]
pub struct GalaxyLayerAlpha {
    pub core: f64,
    pub ridge: f64,
    pub arm_bright: f64,
    pub arm_edge: f64,
    pub hii: f64,
    pub dust: f64,
    pub outer: f64,
}

impl GalaxyLayerAlpha {
    pub fn baseline() -> Self {
        Self {
            core: 1.0,
            ridge: 0.98,
            arm_bright: 0.90,
            arm_edge: 0.85,
            hii: 0.88,
            dust: 0.45,
            outer: 0.78,
        }
    }
}

/// Tap highlight tuning.
#[derive(Clone, Copy, Debug)]
pub struct GlowConfig {
    /// Search radius as a fraction of the short viewport edge.
    pub radius_factor: f64,
    /// Floor for the search radius, in logical units.
    pub min_radius: f64,
    /// Flash window length in milliseconds.
    pub duration_ms: f64,
    /// Fraction of the flash spent at peak intensity.
    pub pulse_width: f64,
}

impl GlowConfig {
    pub fn baseline() -> Self {
        Self {
            radius_factor: 0.0175,
            min_radius: 30.0,
            duration_ms: 950.0,
            pulse_width: 0.25,
        }
    }
}
