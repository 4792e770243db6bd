use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Write};
use vumeter::{config::MeterConfig, telemetry, VuEngine};

/// Display-side ballistics; the engine publishes raw block peaks and the
/// consumer applies its own decay between redraws.
const DISPLAY_DECAY: f32 = 0.95;
const BAR_WIDTH: usize = 40;

fn main() -> Result<()> {
    let config = MeterConfig::parse();
    config.validate()?;
    telemetry::init(config.verbose);

    let engine_config = config.engine_config();
    let options = config.capture_options();

    let mut engine = VuEngine::new();
    engine
        .start(&options, &engine_config)
        .context("cannot monitor audio source")?;

    let mut peaks = vec![0.0f32; engine_config.channels];
    let mut shown = vec![0.0f32; engine_config.channels];
    let stdout = io::stdout();

    loop {
        engine.wait_for_update();
        if !engine.is_active() {
            break;
        }
        if engine.query_peak(&mut peaks) == 0 {
            continue;
        }
        for (level, &fresh) in shown.iter_mut().zip(&peaks) {
            *level *= DISPLAY_DECAY;
            if fresh > *level {
                *level = fresh;
            }
        }
        render_bars(&mut stdout.lock(), &shown).context("cannot write to terminal")?;
    }

    if let Some(fault) = engine.fault() {
        return Err(fault).context("capture session ended");
    }
    Ok(())
}

fn render_bars(out: &mut impl Write, levels: &[f32]) -> io::Result<()> {
    let mut line = String::with_capacity(levels.len() * (BAR_WIDTH + 8));
    for (channel, &level) in levels.iter().enumerate() {
        if channel > 0 {
            line.push_str("  ");
        }
        line.push('[');
        let filled = (level.clamp(0.0, 1.0) * BAR_WIDTH as f32).round() as usize;
        for position in 0..BAR_WIDTH {
            line.push(if position < filled { '#' } else { ' ' });
        }
        line.push(']');
    }
    write!(out, "\r{line}")?;
    out.flush()
}
