//! Interactive field state: tap selection, persistent highlights, rotation.
//!
//! The point set is an immutable snapshot per generation, swapped wholesale
//! on regenerate; highlight state is a separate id-keyed map that survives
//! every tap and dies only with the generation.

use std::collections::{HashMap, HashSet};

use super::color::{blend_hex, normalize_hex, rgb8};
use super::generator::{generate_field, BackgroundStar, GalaxyStar};
use super::params::{GalaxyLayerAlpha, GalaxyPalette, GalaxyParams, GlowConfig};
use super::rng::SeededRng;

const GALAXY_SEED: u64 = 0xA17_C9E3;
const BACKGROUND_SEED: u64 = 0x0BAD_C0DE;
const SELECTION_SEED: u64 = 0xC0FF_EE12_3456_7890;
const HIGHLIGHT_TINT: &str = "#5AE7FF";
const HIGHLIGHT_TINT_RATIO: f64 = 0.45;
const TARGET_HIGHLIGHTS: usize = 30;
const DISTANCE_GAMMA: f64 = 2.2;
/// Fallback: a lone nearest star still counts if within 50 units of the tap.
const NEAREST_FALLBACK_SQ: f64 = 2500.0;
const BASE_DEG_PER_MS: f64 = 0.0005;

/// Rotation angle (radians) of the whole field after `elapsed` seconds.
pub fn rotation_angle(elapsed: f64) -> f64 {
    BASE_DEG_PER_MS * elapsed * 1000.0 * std::f64::consts::PI / 180.0
}

/// Cached sine/cosine of the current rotation angle, recomputed only when
/// elapsed time advances. Every per-frame position derivation shares it
/// instead of paying trigonometry per point.
#[derive(Clone, Copy, Debug)]
pub struct RotationCache {
    elapsed: f64,
    sin: f64,
    cos: f64,
}

impl RotationCache {
    pub fn at(elapsed: f64) -> Self {
        let angle = rotation_angle(elapsed);
        Self {
            elapsed,
            sin: angle.sin(),
            cos: angle.cos(),
        }
    }

    pub fn update(&mut self, elapsed: f64) {
        if elapsed != self.elapsed {
            *self = Self::at(elapsed);
        }
    }

    pub fn sin_cos(&self) -> (f64, f64) {
        (self.sin, self.cos)
    }
}

/// Persistent record that a star has been selected. Never expires on its
/// own; only a full regeneration clears it.
#[derive(Clone, Debug)]
pub struct GalaxyHighlight {
    pub color_hex: String,
    pub color_rgb: (u8, u8, u8),
    /// Elapsed-timeline instant of activation; drives the flash only.
    pub activated_at: f64,
    /// 0.0 = toward the highlight color, 1.0 = toward pure white.
    pub white_bias: f64,
}

/// Returned from a tap for external persistence.
#[derive(Clone, Debug, PartialEq)]
pub struct HighlightEntry {
    pub id: String,
    pub ring: usize,
    /// Screen position at the moment of the tap.
    pub position: (f64, f64),
    pub size: f64,
    pub color_hex: String,
    pub lit_hex: String,
}

/// Disjoint 120° sectors around the viewport center, clockwise from 0°.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GalaxyRegion {
    Emotion,
    Relation,
    Growth,
}

#[derive(Clone, Copy)]
struct Candidate {
    ring: usize,
    index: usize,
    position: (f64, f64),
    dist_sq: f64,
}

pub struct GalaxyField {
    params: GalaxyParams,
    palette: GalaxyPalette,
    lit_palette: GalaxyPalette,
    glow: GlowConfig,
    alpha_map: HashMap<String, f64>,
    galaxy_seed: u64,
    device_scale: f64,
    reduce_motion: bool,

    rings: Vec<Vec<GalaxyStar>>,
    background: Vec<BackgroundStar>,
    band_size: (f64, f64),
    star_index: HashMap<String, (usize, usize)>,

    last_size: (f64, f64),
    elapsed: f64,
    time_origin: Option<f64>,
    rotation: RotationCache,

    selection_rng: SeededRng,
    highlights: HashMap<String, GalaxyHighlight>,
}

impl GalaxyField {
    pub fn new(
        params: GalaxyParams,
        palette: GalaxyPalette,
        lit_palette: GalaxyPalette,
        glow: GlowConfig,
        layer_alpha: GalaxyLayerAlpha,
    ) -> Self {
        let alpha_map = HashMap::from([
            (normalize_hex(&palette.core), layer_alpha.core),
            (normalize_hex(&palette.ridge), layer_alpha.ridge),
            (normalize_hex(&palette.arm_bright), layer_alpha.arm_bright),
            (normalize_hex(&palette.arm_edge), layer_alpha.arm_edge),
            (normalize_hex(&palette.hii), layer_alpha.hii),
            (normalize_hex(&palette.dust), layer_alpha.dust),
            (normalize_hex(&palette.outer), layer_alpha.outer),
        ]);
        Self {
            params,
            palette,
            lit_palette,
            glow,
            alpha_map,
            galaxy_seed: GALAXY_SEED,
            device_scale: 1.0,
            reduce_motion: false,
            rings: Vec::new(),
            background: Vec::new(),
            band_size: (0.0, 0.0),
            star_index: HashMap::new(),
            last_size: (0.0, 0.0),
            elapsed: 0.0,
            time_origin: None,
            rotation: RotationCache::at(0.0),
            selection_rng: SeededRng::new(SELECTION_SEED),
            highlights: HashMap::new(),
        }
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.galaxy_seed = seed;
    }

    pub fn set_device_scale(&mut self, scale: f64) {
        self.device_scale = scale.max(0.01);
    }

    pub fn set_reduce_motion(&mut self, reduce: bool) {
        self.reduce_motion = reduce;
    }

    /// Anchor for converting tap timestamps into the animation timeline, so
    /// hit-testing sees the rotation that was visually true at the tap.
    pub fn set_time_origin(&mut self, origin: Option<f64>) {
        self.time_origin = origin;
    }

    pub fn rings(&self) -> &[Vec<GalaxyStar>] {
        &self.rings
    }

    pub fn background(&self) -> &[BackgroundStar] {
        &self.background
    }

    pub fn band_size(&self) -> (f64, f64) {
        self.band_size
    }

    pub fn glow(&self) -> &GlowConfig {
        &self.glow
    }

    pub fn ring_count(&self) -> usize {
        self.rings.len()
    }

    pub fn star_count(&self) -> usize {
        self.rings.iter().map(Vec::len).sum()
    }

    pub fn highlight_count(&self) -> usize {
        self.highlights.len()
    }

    /// Regenerate only when the viewport moved by a unit or more in either
    /// dimension; minor resize noise keeps the current generation.
    pub fn prepare_if_needed(&mut self, size: (f64, f64)) -> bool {
        if size.0 <= 0.0 || size.1 <= 0.0 {
            return false;
        }
        if (size.0 - self.last_size.0).abs() < 1.0 && (size.1 - self.last_size.1).abs() < 1.0 {
            return false;
        }
        self.regenerate(size);
        self.last_size = size;
        true
    }

    /// Replace the whole generation. Highlight state and timing reset with it.
    pub fn regenerate(&mut self, size: (f64, f64)) {
        let field = generate_field(
            size.0,
            size.1,
            self.galaxy_seed,
            BACKGROUND_SEED,
            &self.params,
            &self.palette,
            &self.lit_palette,
            true,
            self.params.galaxy_scale,
            self.device_scale,
            self.reduce_motion,
        );
        self.rings = field.rings;
        self.background = field.background;
        self.band_size = field.band_size;
        self.highlights.clear();
        self.elapsed = 0.0;
        self.rotation = RotationCache::at(0.0);
        self.star_index = self
            .rings
            .iter()
            .enumerate()
            .flat_map(|(ring, stars)| {
                stars
                    .iter()
                    .enumerate()
                    .map(move |(index, star)| (star.id.clone(), (ring, index)))
            })
            .collect();
    }

    pub fn update(&mut self, elapsed: f64) {
        self.elapsed = elapsed.max(0.0);
        self.rotation.update(self.elapsed);
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Screen position using the per-frame rotation cache.
    pub fn rotated_position(&self, star: &GalaxyStar, viewport: (f64, f64)) -> (f64, f64) {
        self.project(star, viewport, self.rotation)
    }

    /// Screen position at an arbitrary elapsed time. Same formula as the
    /// renderer, so what is drawn and what is tappable agree.
    pub fn screen_position(
        &self,
        star: &GalaxyStar,
        viewport: (f64, f64),
        elapsed: f64,
    ) -> (f64, f64) {
        self.project(star, viewport, RotationCache::at(elapsed))
    }

    fn project(&self, star: &GalaxyStar, viewport: (f64, f64), rotation: RotationCache) -> (f64, f64) {
        let center = (viewport.0 / 2.0, viewport.1 / 2.0);
        let scale = self.params.galaxy_scale;
        let band_center = (star.band_size.0 / 2.0, star.band_size.1 / 2.0);
        let dx = star.position.0 - band_center.0;
        let dy = star.position.1 - band_center.1;
        let (sin, cos) = rotation.sin_cos();
        let rx = dx * cos - dy * sin;
        let ry = dx * sin + dy * cos;
        (center.0 + rx * scale, center.1 + ry * scale)
    }

    /// Select and persistently highlight a cluster of stars around a tap.
    /// Returns the newly applied entries for external persistence; an empty
    /// result means the tap landed in the void and nothing changed.
    pub fn handle_tap(
        &mut self,
        location: (f64, f64),
        viewport: (f64, f64),
        tap_timestamp: Option<f64>,
    ) -> Vec<HighlightEntry> {
        if self.rings.is_empty() {
            return Vec::new();
        }

        // A timestamp pins the selection stream; otherwise the persistent
        // stream advances across taps.
        let mut rng = match tap_timestamp {
            Some(ts) => SeededRng::new((ts * 1_000_000.0).abs() as u64),
            None => self.selection_rng.clone(),
        };

        let radius = self
            .glow
            .min_radius
            .max(viewport.0.min(viewport.1) * self.glow.radius_factor);

        // Hit-test against the rotation that was on screen at the tap, not
        // at handler time.
        let elapsed_at_tap = match (tap_timestamp, self.time_origin) {
            (Some(ts), Some(origin)) => (ts - origin).max(0.0),
            _ => self.elapsed,
        };

        let candidates = self.collect_candidates(location, viewport, radius, elapsed_at_tap);
        if candidates.is_empty() {
            return Vec::new();
        }

        let target = TARGET_HIGHLIGHTS.min(candidates.len());
        let selected = pick_highlights(&candidates, target, &mut rng);
        let entries = self.apply_highlights(&selected, elapsed_at_tap, &mut rng);

        if tap_timestamp.is_none() {
            self.selection_rng = rng;
        }
        entries
    }

    fn collect_candidates(
        &self,
        location: (f64, f64),
        viewport: (f64, f64),
        radius: f64,
        elapsed: f64,
    ) -> Vec<Candidate> {
        let rotation = RotationCache::at(elapsed);
        let radius_sq = radius * radius;
        let mut results = Vec::new();

        for (ring, stars) in self.rings.iter().enumerate() {
            for (index, star) in stars.iter().enumerate() {
                let pos = self.project(star, viewport, rotation);
                let dx = pos.0 - location.0;
                let dy = pos.1 - location.1;
                let dist_sq = dx * dx + dy * dy;
                if dist_sq <= radius_sq {
                    results.push(Candidate {
                        ring,
                        index,
                        position: pos,
                        dist_sq,
                    });
                }
            }
        }

        // Too few to form a cluster: fall back to the single nearest star if
        // it is reasonably close, else give up silently.
        if results.len() < 3 {
            let mut nearest: Option<Candidate> = None;
            for (ring, stars) in self.rings.iter().enumerate() {
                for (index, star) in stars.iter().enumerate() {
                    let pos = self.project(star, viewport, rotation);
                    let dx = pos.0 - location.0;
                    let dy = pos.1 - location.1;
                    let dist_sq = dx * dx + dy * dy;
                    if nearest.map_or(true, |c| dist_sq < c.dist_sq) {
                        nearest = Some(Candidate {
                            ring,
                            index,
                            position: pos,
                            dist_sq,
                        });
                    }
                }
            }
            return match nearest {
                Some(c) if c.dist_sq < NEAREST_FALLBACK_SQ => vec![c],
                _ => Vec::new(),
            };
        }

        results
    }

    fn apply_highlights(
        &mut self,
        selected: &[Candidate],
        now: f64,
        rng: &mut SeededRng,
    ) -> Vec<HighlightEntry> {
        let mut entries = Vec::with_capacity(selected.len());
        let mut seen: HashSet<&str> = HashSet::new();

        for candidate in selected {
            let star = &self.rings[candidate.ring][candidate.index];
            let color_hex = blend_hex(&star.lit_hex, HIGHLIGHT_TINT, HIGHLIGHT_TINT_RATIO);
            let color_rgb = rgb8(&color_hex);
            let bias = rng.next();

            // Upsert: re-highlighting restarts the flash, membership is
            // already true.
            self.highlights.insert(
                star.id.clone(),
                GalaxyHighlight {
                    color_hex,
                    color_rgb,
                    activated_at: now,
                    white_bias: bias,
                },
            );

            if seen.insert(star.id.as_str()) {
                entries.push(HighlightEntry {
                    id: star.id.clone(),
                    ring: star.ring,
                    position: candidate.position,
                    size: star.size,
                    color_hex: star.base_hex.clone(),
                    lit_hex: star.lit_hex.clone(),
                });
            }
        }
        entries
    }

    /// Re-apply persisted highlights by star index, without a flash.
    pub fn merge_restored(&mut self, indices: &[usize]) {
        let activated_at = self.elapsed - 10_000.0;
        for idx in indices {
            let id = format!("s-{idx}");
            let Some(&(ring, index)) = self.star_index.get(&id) else {
                continue;
            };
            let star = &self.rings[ring][index];
            let color_hex = blend_hex(&star.lit_hex, HIGHLIGHT_TINT, HIGHLIGHT_TINT_RATIO);
            let color_rgb = rgb8(&color_hex);
            self.highlights.insert(
                id,
                GalaxyHighlight {
                    color_hex,
                    color_rgb,
                    activated_at,
                    white_bias: 0.0,
                },
            );
        }
    }

    pub fn is_highlighted(&self, id: &str) -> bool {
        self.highlights.contains_key(id)
    }

    pub fn highlight(&self, id: &str) -> Option<&GalaxyHighlight> {
        self.highlights.get(id)
    }

    pub fn highlight_color(&self, id: &str) -> Option<(u8, u8, u8)> {
        self.highlights.get(id).map(|h| h.color_rgb)
    }

    /// Transient flash intensity ramp, 0 at activation to 1 when settled.
    /// Drives visuals only; membership never depends on it.
    pub fn highlight_flash_progress(&self, id: &str) -> f64 {
        let Some(highlight) = self.highlights.get(id) else {
            return 1.0;
        };
        let duration = (self.glow.duration_ms / 1000.0 * 0.6).max(0.01);
        ((self.elapsed - highlight.activated_at) / duration).clamp(0.0, 1.0)
    }

    /// Render opacity for a star's structural category.
    pub fn alpha_for(&self, star: &GalaxyStar) -> f64 {
        self.alpha_map.get(&star.base_hex).copied().unwrap_or(1.0)
    }

    /// Which third of the screen a tap landed in, by angle from center.
    pub fn region_at(location: (f64, f64), viewport: (f64, f64)) -> GalaxyRegion {
        let center = (viewport.0 / 2.0, viewport.1 / 2.0);
        let angle = (location.1 - center.1).atan2(location.0 - center.0);
        let degrees = (angle.to_degrees() + 360.0) % 360.0;
        if degrees < 120.0 {
            GalaxyRegion::Emotion
        } else if degrees < 240.0 {
            GalaxyRegion::Relation
        } else {
            GalaxyRegion::Growth
        }
    }
}

/// Two-stage weighted pick, without replacement: the nearest few are taken
/// outright, the rest by Efraimidis–Spirakis keys biased toward the tap.
/// The two halves are disjoint by construction and concatenate as-is.
fn pick_highlights(candidates: &[Candidate], target: usize, rng: &mut SeededRng) -> Vec<Candidate> {
    let capped = target.min(candidates.len());
    if capped == 0 {
        return Vec::new();
    }

    let mut sorted: Vec<&Candidate> = candidates.iter().collect();
    sorted.sort_by(|a, b| {
        a.dist_sq
            .partial_cmp(&b.dist_sq)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let core_count = 3_usize.max((capped as f64 * 0.4).ceil() as usize).min(capped);
    let dense: Vec<Candidate> = sorted[..core_count.min(sorted.len())]
        .iter()
        .map(|c| **c)
        .collect();

    if dense.len() >= capped {
        return dense;
    }

    let dense_keys: HashSet<(usize, usize)> =
        dense.iter().map(|c| (c.ring, c.index)).collect();
    let remaining: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| !dense_keys.contains(&(c.ring, c.index)))
        .collect();
    let remaining_target = capped - dense.len();

    let max_dist_sq = remaining.iter().map(|c| c.dist_sq).fold(0.0_f64, f64::max);
    let r = max_dist_sq.max(1e-9).sqrt();

    let mut keyed: Vec<(f64, &Candidate)> = remaining
        .iter()
        .map(|c| {
            let d = c.dist_sq.max(0.0).sqrt();
            let ratio = (1.0 - d / r).clamp(0.0, 1.0);
            let w = ratio.powf(DISTANCE_GAMMA);
            let u = rng.next().clamp(1e-9, 0.999_999);
            // Smaller key wins.
            let key = -u.ln() / w.max(1e-9);
            (key, *c)
        })
        .collect();
    keyed.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let mut picked = dense;
    picked.extend(keyed.into_iter().take(remaining_target).map(|(_, c)| *c));
    picked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_field(params: GalaxyParams) -> GalaxyField {
        GalaxyField::new(
            params,
            GalaxyPalette::baseline(),
            GalaxyPalette::lit(),
            GlowConfig::baseline(),
            GalaxyLayerAlpha::baseline(),
        )
    }

    /// Stars only in a small disc around the center: every structural
    /// density except the core is zeroed.
    fn core_only_params() -> GalaxyParams {
        GalaxyParams {
            core_radius: 6.0,
            core_density: 0.9,
            arm_density: 0.0,
            inter_arm_density: 0.0,
            outer_density_maintain: 0.0,
            background_density: 0.0,
            jitter_strength: 0.0,
            arm_highlight_prob: 0.0,
            ..GalaxyParams::compact()
        }
    }

    #[test]
    fn tap_before_generation_is_a_noop() {
        let mut field = new_field(GalaxyParams::compact());
        let entries = field.handle_tap((50.0, 50.0), (100.0, 100.0), Some(1.0));
        assert!(entries.is_empty());
        assert_eq!(field.highlight_count(), 0);
    }

    #[test]
    fn resize_epsilon_debounce() {
        let mut field = new_field(GalaxyParams::compact());
        assert!(field.prepare_if_needed((160.0, 160.0)));
        assert_eq!(field.ring_count(), 10);
        let band = field.band_size();
        assert!(band.0 >= 160.0 * std::f64::consts::SQRT_2);
        assert!(band.1 >= 160.0 * std::f64::consts::SQRT_2);
        assert!(!field.prepare_if_needed((160.5, 160.4)));
        assert!(!field.prepare_if_needed((160.0, 160.0)));
        assert!(field.prepare_if_needed((200.0, 200.0)));
        assert!(!field.prepare_if_needed((0.0, 200.0)));
    }

    #[test]
    fn device_scale_and_reduce_motion_shape_generation() {
        let mut a = new_field(GalaxyParams::compact());
        a.prepare_if_needed((200.0, 200.0));
        assert!(a.star_count() > 0);

        // Arm-distance math runs in device pixels, so a different scale
        // produces a different field.
        let mut b = new_field(GalaxyParams::compact());
        b.set_device_scale(3.0);
        b.prepare_if_needed((200.0, 200.0));
        assert_ne!(a.rings(), b.rings());

        let mut c = new_field(GalaxyParams::compact());
        c.set_reduce_motion(true);
        c.prepare_if_needed((200.0, 200.0));
        assert!(c.background().len() < a.background().len());
    }

    #[test]
    fn tap_selects_and_persists_highlights() {
        let mut field = new_field(GalaxyParams::compact());
        field.prepare_if_needed((400.0, 400.0));
        let entries = field.handle_tap((200.0, 200.0), (400.0, 400.0), Some(2.5));
        assert!(!entries.is_empty());
        assert!(entries.len() <= TARGET_HIGHLIGHTS);
        for entry in &entries {
            assert!(field.is_highlighted(&entry.id));
            assert!(field.highlight_color(&entry.id).is_some());
            assert!(entry.ring < 10);
            assert!(entry.size > 0.0);
            assert_eq!(entry.color_hex, normalize_hex(&entry.color_hex));
        }

        // Later taps elsewhere never evict earlier highlights.
        let first_id = entries[0].id.clone();
        for i in 0..10 {
            field.update(i as f64);
            field.handle_tap((120.0 + i as f64 * 15.0, 300.0), (400.0, 400.0), Some(10.0 + i as f64));
        }
        assert!(field.is_highlighted(&first_id));
    }

    #[test]
    fn tap_selection_is_deterministic_for_a_timestamp() {
        let mut a = new_field(GalaxyParams::compact());
        a.prepare_if_needed((400.0, 400.0));
        let mut b = new_field(GalaxyParams::compact());
        b.prepare_if_needed((400.0, 400.0));

        let ea = a.handle_tap((200.0, 200.0), (400.0, 400.0), Some(3.25));
        let eb = b.handle_tap((200.0, 200.0), (400.0, 400.0), Some(3.25));
        assert_eq!(ea, eb);
    }

    #[test]
    fn selected_entries_stay_within_the_search_radius() {
        let mut field = new_field(GalaxyParams::compact());
        field.prepare_if_needed((400.0, 400.0));
        let tap = (200.0, 200.0);
        let radius = 30.0_f64.max(400.0 * GlowConfig::baseline().radius_factor);
        let entries = field.handle_tap(tap, (400.0, 400.0), Some(1.0));
        assert!(entries.len() >= 3);
        for entry in &entries {
            let d = (entry.position.0 - tap.0).hypot(entry.position.1 - tap.1);
            assert!(d <= radius + 1e-9, "entry at {d} outside radius {radius}");
        }
    }

    #[test]
    fn far_tap_returns_nothing_and_changes_nothing() {
        let mut field = new_field(core_only_params());
        field.prepare_if_needed((160.0, 160.0));
        assert!(field.star_count() > 0);
        let entries = field.handle_tap((155.0, 8.0), (160.0, 160.0), Some(1.0));
        assert!(entries.is_empty());
        assert_eq!(field.highlight_count(), 0);
    }

    #[test]
    fn lonely_tap_falls_back_to_the_single_nearest_star() {
        let mut field = new_field(core_only_params());
        field.prepare_if_needed((160.0, 160.0));
        // 40 units out: outside the 30-unit search radius around every star,
        // but the nearest star is within the 50-unit fallback.
        let entries = field.handle_tap((120.0, 80.0), (160.0, 160.0), Some(1.0));
        assert_eq!(entries.len(), 1);
        assert!(field.is_highlighted(&entries[0].id));
    }

    #[test]
    fn regeneration_clears_highlight_state() {
        let mut field = new_field(GalaxyParams::compact());
        field.prepare_if_needed((400.0, 400.0));
        let entries = field.handle_tap((200.0, 200.0), (400.0, 400.0), Some(1.0));
        assert!(!entries.is_empty());
        assert!(field.highlight_count() > 0);

        assert!(field.prepare_if_needed((300.0, 300.0)));
        assert_eq!(field.highlight_count(), 0);
        assert!(!field.is_highlighted(&entries[0].id));
    }

    #[test]
    fn nearer_candidates_win_more_often() {
        let mut field = new_field(GalaxyParams::compact());
        field.prepare_if_needed((400.0, 400.0));
        let tap = (200.0, 200.0);
        let viewport = (400.0, 400.0);

        // Identify the nearest star and one close to the radius edge.
        let mut nearest: Option<(String, f64)> = None;
        let mut fringe: Option<(String, f64)> = None;
        for ring in field.rings() {
            for star in ring {
                let pos = field.screen_position(star, viewport, 0.0);
                let d = (pos.0 - tap.0).hypot(pos.1 - tap.1);
                if nearest.as_ref().map_or(true, |(_, nd)| d < *nd) {
                    nearest = Some((star.id.clone(), d));
                }
                if d <= 30.0 && d >= 27.0 && fringe.as_ref().map_or(true, |(_, fd)| d > *fd) {
                    fringe = Some((star.id.clone(), d));
                }
            }
        }
        let (near_id, _) = nearest.expect("field has stars");
        let (far_id, _) = fringe.expect("a candidate near the radius edge");

        let trials = 300;
        let mut near_count = 0;
        let mut far_count = 0;
        for t in 0..trials {
            let ts = 1.0 + t as f64 * 0.001;
            let entries = field.handle_tap(tap, viewport, Some(ts));
            assert!(entries.len() <= TARGET_HIGHLIGHTS);
            if entries.iter().any(|e| e.id == near_id) {
                near_count += 1;
            }
            if entries.iter().any(|e| e.id == far_id) {
                far_count += 1;
            }
        }
        // The nearest star sits in the dense core subset every time; the
        // fringe star's weight is nearly zero.
        assert_eq!(near_count, trials);
        assert!(far_count < trials / 2, "fringe selected {far_count}/{trials}");
    }

    #[test]
    fn highlight_color_blends_lit_toward_tint() {
        let mut field = new_field(GalaxyParams::compact());
        field.prepare_if_needed((400.0, 400.0));
        let entries = field.handle_tap((200.0, 200.0), (400.0, 400.0), Some(1.0));
        let entry = &entries[0];
        let expected = blend_hex(&entry.lit_hex, HIGHLIGHT_TINT, HIGHLIGHT_TINT_RATIO);
        assert_eq!(field.highlight(&entry.id).unwrap().color_hex, expected);
    }

    #[test]
    fn rehighlighting_restarts_the_flash_window() {
        let mut field = new_field(GalaxyParams::compact());
        field.prepare_if_needed((400.0, 400.0));
        let entries = field.handle_tap((200.0, 200.0), (400.0, 400.0), Some(0.0));
        let id = entries[0].id.clone();

        field.update(30.0);
        assert_eq!(field.highlight_flash_progress(&id), 1.0);

        field.set_time_origin(Some(0.0));
        field.handle_tap((200.0, 200.0), (400.0, 400.0), Some(30.0));
        assert!(field.highlight_flash_progress(&id) < 1.0);
        assert!(field.is_highlighted(&id));
    }

    #[test]
    fn merge_restored_highlights_without_flash() {
        let mut field = new_field(GalaxyParams::compact());
        field.prepare_if_needed((400.0, 400.0));
        let some_id = field.rings()[3][0].id.clone();
        let idx: usize = some_id.trim_start_matches("s-").parse().unwrap();

        field.merge_restored(&[idx, 9_999_999]);
        assert!(field.is_highlighted(&some_id));
        assert_eq!(field.highlight_flash_progress(&some_id), 1.0);
        assert_eq!(field.highlight_count(), 1);
        assert_eq!(field.highlight(&some_id).unwrap().white_bias, 0.0);
    }

    #[test]
    fn screen_position_matches_the_rotation_formula() {
        let mut field = new_field(GalaxyParams::compact());
        field.prepare_if_needed((200.0, 200.0));
        let star = field.rings().iter().flatten().next().unwrap().clone();
        let star = &star;
        let viewport = (200.0, 200.0);

        let at_rest = field.screen_position(star, viewport, 0.0);
        let band_center = (star.band_size.0 / 2.0, star.band_size.1 / 2.0);
        let scale = GalaxyParams::compact().galaxy_scale;
        let expected = (
            100.0 + (star.position.0 - band_center.0) * scale,
            100.0 + (star.position.1 - band_center.1) * scale,
        );
        assert!((at_rest.0 - expected.0).abs() < 1e-9);
        assert!((at_rest.1 - expected.1).abs() < 1e-9);

        let elapsed = 120.0;
        let angle = rotation_angle(elapsed);
        let (dx, dy) = (
            star.position.0 - band_center.0,
            star.position.1 - band_center.1,
        );
        let rotated = field.screen_position(star, viewport, elapsed);
        let expected_rot = (
            100.0 + (dx * angle.cos() - dy * angle.sin()) * scale,
            100.0 + (dx * angle.sin() + dy * angle.cos()) * scale,
        );
        assert!((rotated.0 - expected_rot.0).abs() < 1e-9);
        assert!((rotated.1 - expected_rot.1).abs() < 1e-9);

        // Per-frame cached path agrees with the explicit-elapsed path.
        field.update(elapsed);
        let cached = field.rotated_position(star, viewport);
        assert_eq!(cached, rotated);
    }

    #[test]
    fn rotation_angle_matches_base_rate() {
        let expected = 0.0005 * 2000.0 * std::f64::consts::PI / 180.0;
        assert!((rotation_angle(2.0) - expected).abs() < 1e-12);
    }

    #[test]
    fn region_sectors_are_disjoint_thirds() {
        let viewport = (100.0, 100.0);
        assert_eq!(
            GalaxyField::region_at((60.0, 50.0), viewport),
            GalaxyRegion::Emotion
        );
        assert_eq!(
            GalaxyField::region_at((50.0, 70.0), viewport),
            GalaxyRegion::Emotion
        );
        assert_eq!(
            GalaxyField::region_at((40.0, 67.0), viewport),
            GalaxyRegion::Relation
        );
        assert_eq!(
            GalaxyField::region_at((30.0, 50.0), viewport),
            GalaxyRegion::Relation
        );
        assert_eq!(
            GalaxyField::region_at((50.0, 30.0), viewport),
            GalaxyRegion::Growth
        );
        assert_eq!(
            GalaxyField::region_at((70.0, 30.0), viewport),
            GalaxyRegion::Growth
        );
    }

    #[test]
    fn layer_alpha_follows_structural_category() {
        let mut field = new_field(GalaxyParams::compact());
        field.prepare_if_needed((200.0, 200.0));
        let palette = GalaxyPalette::baseline();
        let dust_hex = normalize_hex(&palette.dust);
        for star in field.rings().iter().flatten() {
            let alpha = field.alpha_for(star);
            assert!((0.0..=1.0).contains(&alpha));
            if star.base_hex == dust_hex {
                assert_eq!(alpha, GalaxyLayerAlpha::baseline().dust);
            }
        }
    }
}
