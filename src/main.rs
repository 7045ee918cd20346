use crossterm::{
    cursor::{Hide, Show},
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::env;
use std::io::{stdout, BufWriter};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

mod effects;
mod galaxy;

use effects::Effect;

static BG_COLOR: OnceLock<(u8, u8, u8)> = OnceLock::new();
static SEED: OnceLock<u64> = OnceLock::new();
static REDUCE_MOTION: OnceLock<bool> = OnceLock::new();

pub fn get_bg_color() -> (u8, u8, u8) {
    *BG_COLOR.get().unwrap_or(&(0, 0, 0))
}

pub fn get_seed() -> Option<u64> {
    SEED.get().copied()
}

pub fn reduce_motion_enabled() -> bool {
    *REDUCE_MOTION.get().unwrap_or(&false)
}

fn print_usage() {
    eprintln!("starsaver - Interactive galaxy star field for the terminal");
    eprintln!();
    eprintln!("Usage: starsaver [OPTIONS]");
    eprintln!();
    eprintln!("A procedural spiral galaxy renders in the terminal; click a");
    eprintln!("spot to pluck and permanently light up a cluster of stars.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --bg-color RRGGBB  Set background color as hex (e.g., --bg-color 1a1b26)");
    eprintln!("  --seed N           Pin the field seed (decimal or 0x hex)");
    eprintln!("  --seed-from TEXT   Derive the seed from a string, reproducibly");
    eprintln!("  --reduce-motion    Thin out the twinkling backdrop");
    eprintln!();
    eprintln!("Controls: click = pluck stars, r = reroll, 'q'/ESC/Ctrl+C = exit");
}

fn run_effect<E: Effect>() -> std::io::Result<()> {
    let stdout = stdout();
    let mut stdout = BufWriter::with_capacity(1024 * 64, stdout);

    terminal::enable_raw_mode()?;
    execute!(
        stdout,
        EnterAlternateScreen,
        Hide,
        Clear(ClearType::All),
        EnableMouseCapture
    )?;

    let (cols, rows) = terminal::size()?;
    let mut effect = E::new(cols as usize, rows as usize * 2);

    let mut last_frame = Instant::now();
    let mut accumulator = 0.0f32;
    const FIXED_DT: f32 = 1.0 / 60.0;

    loop {
        if event::poll(Duration::from_millis(1))? {
            let event = event::read()?;
            match &event {
                Event::Key(key_event) => {
                    if key_event.code == KeyCode::Char('q')
                        || key_event.code == KeyCode::Esc
                        || (key_event.code == KeyCode::Char('c')
                            && key_event.modifiers.contains(event::KeyModifiers::CONTROL))
                    {
                        break;
                    }
                    // Pass non-exit key events to the effect
                    effect.handle_event(&event);
                }
                Event::Resize(cols, rows) => {
                    // A new size means a new generation; highlights reset.
                    effect = E::new(*cols as usize, *rows as usize * 2);
                    execute!(stdout, Clear(ClearType::All))?;
                }
                _ => {
                    effect.handle_event(&event);
                }
            }
        }

        let now = Instant::now();
        let frame_time = now.duration_since(last_frame).as_secs_f32();
        last_frame = now;

        accumulator += frame_time;
        if accumulator > FIXED_DT * 3.0 {
            accumulator = FIXED_DT * 3.0;
        }

        while accumulator >= FIXED_DT {
            effect.update(FIXED_DT);
            accumulator -= FIXED_DT;
        }

        effect.render(&mut stdout)?;
    }

    execute!(stdout, Show, LeaveAlternateScreen, DisableMouseCapture)?;
    terminal::disable_raw_mode()?;

    Ok(())
}

fn parse_hex_color(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 {
        return None;
    }

    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

    Some((r, g, b))
}

fn parse_seed(value: &str) -> Option<u64> {
    if let Some(hex) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()
    } else {
        value.parse().ok()
    }
}

fn main() -> std::io::Result<()> {
    let args: Vec<String> = env::args().collect();

    let mut bg_color: Option<(u8, u8, u8)> = None;
    let mut seed: Option<u64> = None;

    // Parse arguments
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--bg-color" => {
                if i + 1 < args.len() {
                    if let Some(color) = parse_hex_color(&args[i + 1]) {
                        bg_color = Some(color);
                        i += 2;
                    } else {
                        eprintln!("Invalid hex color: {}", args[i + 1]);
                        eprintln!("Expected format: RRGGBB (e.g., 1a1b26)");
                        std::process::exit(1);
                    }
                } else {
                    eprintln!("--bg-color requires a hex color value");
                    std::process::exit(1);
                }
            }
            "--seed" => {
                if i + 1 < args.len() {
                    if let Some(value) = parse_seed(&args[i + 1]) {
                        seed = Some(value);
                        i += 2;
                    } else {
                        eprintln!("Invalid seed: {}", args[i + 1]);
                        std::process::exit(1);
                    }
                } else {
                    eprintln!("--seed requires a value");
                    std::process::exit(1);
                }
            }
            "--seed-from" => {
                if i + 1 < args.len() {
                    seed = Some(galaxy::deterministic_seed(&args[i + 1]) as u64);
                    i += 2;
                } else {
                    eprintln!("--seed-from requires a string");
                    std::process::exit(1);
                }
            }
            "--reduce-motion" => {
                let _ = REDUCE_MOTION.set(true);
                i += 1;
            }
            "help" | "--help" | "-h" => {
                print_usage();
                return Ok(());
            }
            arg => {
                eprintln!("Unknown option: {arg}");
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        }
    }

    if let Some(color) = bg_color {
        let _ = BG_COLOR.set(color);
    }
    if let Some(value) = seed {
        let _ = SEED.set(value);
    }

    run_effect::<effects::galaxy::GalaxyEffect>()
}
