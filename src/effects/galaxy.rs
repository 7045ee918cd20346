use super::Effect;
use crate::galaxy::color::desaturate;
use crate::galaxy::{
    deterministic_phase, deterministic_seed, GalaxyField, GalaxyLayerAlpha, GalaxyPalette,
    GalaxyParams, GalaxyRegion, GlowConfig, SeededRng,
};
use crossterm::event::{Event, KeyCode, MouseEvent, MouseEventKind};
use noise::{NoiseFn, Perlin};
use std::io::{BufWriter, Stdout, Write};

pub struct GalaxyEffect {
    width: usize,
    height: usize,
    time: f64,
    seed: u64,
    field: GalaxyField,
    nebula: Perlin,
    last_click_time: f64,
    last_region: Option<(GalaxyRegion, usize)>,
    output_buf: Vec<u8>,
}

impl Effect for GalaxyEffect {
    fn new(width: usize, height: usize) -> Self {
        let seed = crate::get_seed().unwrap_or_else(|| fastrand::u64(..));

        let mut field = GalaxyField::new(
            GalaxyParams::compact(),
            GalaxyPalette::baseline(),
            GalaxyPalette::lit(),
            GlowConfig::baseline(),
            GalaxyLayerAlpha::baseline(),
        );
        field.set_seed(seed);
        field.set_reduce_motion(crate::reduce_motion_enabled());
        // Taps carry the effect clock, so hit-testing matches the frame
        // that was on screen.
        field.set_time_origin(Some(0.0));
        field.prepare_if_needed((width as f64, height as f64));

        Self {
            width,
            height,
            time: 0.0,
            seed,
            field,
            nebula: Perlin::new(seed as u32),
            last_click_time: 0.0,
            last_region: None,
            output_buf: Vec::with_capacity(width * height * 25),
        }
    }

    fn update(&mut self, dt: f32) {
        self.time += dt as f64;
        if self.time > 10000.0 {
            self.time -= 10000.0;
        }
        self.field.update(self.time);
    }

    fn render(&mut self, stdout: &mut BufWriter<Stdout>) -> std::io::Result<()> {
        self.output_buf.clear();
        self.output_buf.extend_from_slice(b"\x1b[H");

        let bg_color = crate::get_bg_color();
        let space_color = if bg_color == (0, 0, 0) {
            (4, 4, 12)
        } else {
            bg_color
        };

        let mut frame_buffer = vec![
            (
                space_color.0 as f32,
                space_color.1 as f32,
                space_color.2 as f32
            );
            self.width * self.height
        ];

        self.paint_nebula(&mut frame_buffer);
        self.paint_background_stars(&mut frame_buffer);
        self.paint_galaxy(&mut frame_buffer);

        // Half-block cells: background color is the top pixel, foreground
        // the bottom.
        let mut prev_top_color: (u8, u8, u8) = (255, 255, 255);
        let mut prev_bot_color: (u8, u8, u8) = (255, 255, 255);

        for y in (0..self.height).step_by(2) {
            for x in 0..self.width {
                let top_idx = y * self.width + x;
                let bot_idx = if y + 1 < self.height {
                    (y + 1) * self.width + x
                } else {
                    top_idx
                };

                let top_color = (
                    frame_buffer[top_idx].0.round().clamp(0.0, 255.0) as u8,
                    frame_buffer[top_idx].1.round().clamp(0.0, 255.0) as u8,
                    frame_buffer[top_idx].2.round().clamp(0.0, 255.0) as u8,
                );
                let bot_color = (
                    frame_buffer[bot_idx].0.round().clamp(0.0, 255.0) as u8,
                    frame_buffer[bot_idx].1.round().clamp(0.0, 255.0) as u8,
                    frame_buffer[bot_idx].2.round().clamp(0.0, 255.0) as u8,
                );

                if top_color != prev_top_color {
                    write!(
                        self.output_buf,
                        "\x1b[48;2;{};{};{}m",
                        top_color.0, top_color.1, top_color.2
                    )?;
                    prev_top_color = top_color;
                }
                if bot_color != prev_bot_color {
                    write!(
                        self.output_buf,
                        "\x1b[38;2;{};{};{}m",
                        bot_color.0, bot_color.1, bot_color.2
                    )?;
                    prev_bot_color = bot_color;
                }

                self.output_buf.extend_from_slice("▄".as_bytes());
            }
            self.output_buf.extend_from_slice(b"\x1b[0m");
            prev_top_color = (255, 255, 255);
            prev_bot_color = (255, 255, 255);
            if y + 2 < self.height {
                self.output_buf.extend_from_slice(b"\r\n");
            }
        }

        // Status line overlay.
        self.output_buf.extend_from_slice(b"\x1b[1;2H");
        self.output_buf
            .extend_from_slice(b"\x1b[0m\x1b[38;2;200;200;200m");
        write!(
            self.output_buf,
            "seed {:#x}  stars {}  lit {}  t {:.0}s",
            self.seed,
            self.field.star_count(),
            self.field.highlight_count(),
            self.field.elapsed()
        )?;
        if let Some((region, count)) = self.last_region {
            self.output_buf.extend_from_slice(b"\x1b[2;2H");
            write!(self.output_buf, "pluck: {region:?} ({count})")?;
        }
        self.output_buf.extend_from_slice(b"\x1b[0m");

        stdout.write_all(&self.output_buf)?;
        stdout.flush()?;
        Ok(())
    }

    fn handle_event(&mut self, event: &Event) {
        match event {
            Event::Mouse(MouseEvent {
                kind, column, row, ..
            }) => {
                if matches!(kind, MouseEventKind::Down(_)) {
                    // Cooldown to prevent double-clicks (200ms)
                    if self.time - self.last_click_time < 0.2 {
                        return;
                    }
                    self.last_click_time = self.time;

                    // Row doubled because of half-block rendering.
                    let location = (*column as f64, *row as f64 * 2.0);
                    let viewport = (self.width as f64, self.height as f64);
                    let entries = self.field.handle_tap(location, viewport, Some(self.time));
                    let region = GalaxyField::region_at(location, viewport);
                    self.last_region = Some((region, entries.len()));
                }
            }
            Event::Key(key_event) => {
                if key_event.code == KeyCode::Char('r') {
                    // Reroll: fresh seed, full regeneration, highlights gone.
                    self.seed = fastrand::u64(..);
                    self.field.set_seed(self.seed);
                    self.field
                        .regenerate((self.width as f64, self.height as f64));
                    self.nebula = Perlin::new(self.seed as u32);
                    self.time = 0.0;
                    self.last_region = None;
                }
            }
            _ => {}
        }
    }
}

impl GalaxyEffect {
    fn paint_nebula(&self, buffer: &mut [(f32, f32, f32)]) {
        for y in 0..self.height {
            for x in 0..self.width {
                let v = self.nebula.get([
                    x as f64 * 0.035,
                    y as f64 * 0.035 + self.time * 0.03,
                ]) as f32;
                let glow = ((v + 1.0) * 0.5).powi(2) * 20.0;
                let idx = y * self.width + x;
                buffer[idx].0 += glow * 0.45;
                buffer[idx].1 += glow * 0.30;
                buffer[idx].2 += glow * 0.75;
            }
        }
    }

    fn paint_background_stars(&self, buffer: &mut [(f32, f32, f32)]) {
        for star in self.field.background() {
            let x = star.position.0 as isize;
            let y = star.position.1 as isize;
            if x < 0 || y < 0 || x >= self.width as isize || y >= self.height as isize {
                continue;
            }

            // Each star twinkles with its own reproducible phase and style.
            let phase = deterministic_phase(&star.id) * std::f64::consts::TAU;
            let mut star_rng = SeededRng::new(deterministic_seed(&star.id) as u64);
            let speed = star_rng.next_in(0.4, 2.0);
            let twinkle = if star_rng.next_bool(0.25) {
                // Sharp on/off pulses.
                if (self.time * speed * 0.3 + phase).sin() > 0.7 {
                    1.0
                } else {
                    0.0
                }
            } else {
                ((self.time * speed + phase).sin() * 0.5 + 0.5).powf(1.5)
            };
            let brightness =
                (30.0 + star.size as f32 * 45.0) * (0.35 + 0.65 * twinkle as f32);

            let idx = y as usize * self.width + x as usize;
            buffer[idx].0 = (buffer[idx].0 + brightness * 0.92).min(255.0);
            buffer[idx].1 = (buffer[idx].1 + brightness * 0.95).min(255.0);
            buffer[idx].2 = (buffer[idx].2 + brightness).min(255.0);
        }
    }

    fn paint_galaxy(&self, buffer: &mut [(f32, f32, f32)]) {
        let viewport = (self.width as f64, self.height as f64);

        for ring in self.field.rings() {
            for star in ring {
                let (sx, sy) = self.field.rotated_position(star, viewport);
                if sx < -3.0
                    || sy < -3.0
                    || sx >= self.width as f64 + 3.0
                    || sy >= self.height as f64 + 3.0
                {
                    continue;
                }

                let any_lit = self.field.highlight_count() > 0;
                let (color, intensity) = match self.field.highlight(&star.id) {
                    Some(highlight) => {
                        let flash = self.field.highlight_flash_progress(&star.id);
                        // Hold the burst at peak for the pulse window, then
                        // settle onto the lit color; the white bias keeps
                        // clusters from looking uniform.
                        let burst = if flash < self.field.glow().pulse_width {
                            2.6
                        } else {
                            1.0 + 1.6 * (1.0 - flash as f32)
                        };
                        // The flash runs on the tint-blended color, then
                        // settles halfway toward the star's own lit color.
                        let settle = flash as f32 * 0.5;
                        let c = highlight.color_rgb;
                        let lit = star.lit_rgb;
                        let mixed = (
                            c.0 as f32 + (lit.0 as f32 - c.0 as f32) * settle,
                            c.1 as f32 + (lit.1 as f32 - c.1 as f32) * settle,
                            c.2 as f32 + (lit.2 as f32 - c.2 as f32) * settle,
                        );
                        let toward_white = (highlight.white_bias * 0.4) as f32;
                        let color = (
                            mixed.0 + (255.0 - mixed.0) * toward_white,
                            mixed.1 + (255.0 - mixed.1) * toward_white,
                            mixed.2 + (255.0 - mixed.2) * toward_white,
                        );
                        (color, burst)
                    }
                    None => {
                        let alpha = self.field.alpha_for(star) as f32;
                        // Once anything is lit, mute the crowd a little so
                        // plucked clusters stand out.
                        let c = if any_lit {
                            desaturate(&star.display_hex, 0.8, -0.02)
                        } else {
                            star.display_rgb
                        };
                        ((c.0 as f32, c.1 as f32, c.2 as f32), alpha)
                    }
                };

                self.splat(buffer, sx, sy, star.size, color, intensity);
            }
        }
    }

    fn splat(
        &self,
        buffer: &mut [(f32, f32, f32)],
        sx: f64,
        sy: f64,
        size: f64,
        color: (f32, f32, f32),
        intensity: f32,
    ) {
        let radius = (size * 0.8).max(0.0);
        let reach = radius.ceil() as isize;

        for dy in -reach..=reach {
            for dx in -reach..=reach {
                let px = sx as isize + dx;
                let py = sy as isize + dy;
                if px < 0 || py < 0 || px >= self.width as isize || py >= self.height as isize {
                    continue;
                }
                let dist = ((dx * dx + dy * dy) as f64).sqrt();
                let falloff = if reach == 0 {
                    1.0
                } else {
                    (1.0 - dist / (radius + 1.0)).max(0.0) as f32
                };
                if falloff <= 0.0 {
                    continue;
                }
                let glow = falloff * falloff * intensity;
                let idx = py as usize * self.width + px as usize;
                buffer[idx].0 = (buffer[idx].0 + color.0 * glow).min(255.0);
                buffer[idx].1 = (buffer[idx].1 + color.1 * glow).min(255.0);
                buffer[idx].2 = (buffer[idx].2 + color.2 * glow).min(255.0);
            }
        }
    }
}
