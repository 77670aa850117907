/*
 *  main.rs
 *
 *  velodash - cycle computer panel core
 *  (c) 2020-26 Stuart Hunter
 *
 *  Host binary - composes panel, touch and text on Linux
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use display_interface_spi::SPIInterface;
use env_logger::Env;
use linux_embedded_hal::{CdevPin, Delay, I2cdev, SpidevDevice};
use log::{info, warn};
use tokio::signal::unix::{signal, SignalKind};

use velodash::config::{self, DisplayConfig, TextConfig, TouchConfig};
use velodash::display::color::WHITE;
use velodash::hal::{linux, CdevEdgeLine, I2cRegisters};
use velodash::text::FontdueRasterizer;
use velodash::touch::{Gt911, SharedTouch};
use velodash::{CancelToken, DisplayDriver, St7796, TextRenderer, TouchDriver, Worker};

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

type Panel = St7796<SPIInterface<SpidevDevice, CdevPin>, CdevPin, CdevPin>;
type Touch = Gt911<I2cRegisters<I2cdev>, CdevPin, CdevEdgeLine>;

/// Strip of the panel used for the clock and touch readout
const LABEL_TOP: i32 = 400;
const LABEL_HEIGHT: i32 = 80;
const LABEL_REFRESH: Duration = Duration::from_secs(1);

/// Waits for a SIGINT, SIGTERM, or SIGHUP signal.
async fn signal_handler() -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    Ok(())
}

fn open_panel(cfg: &DisplayConfig) -> Result<Panel> {
    let spi = linux::open_spi(cfg.spi_bus(), cfg.spi_speed_hz())?;
    let dc = linux::open_output(cfg.gpio_chip(), cfg.dc_line(), false)?;
    let rst = linux::open_output(cfg.gpio_chip(), cfg.rst_line(), true)?;
    let bl = linux::open_output(cfg.gpio_chip(), cfg.bl_line(), false)?;

    let panel = St7796::new(SPIInterface::new(spi, dc), rst, bl, &mut Delay)?;
    Ok(panel)
}

fn open_touch(cfg: &TouchConfig, gpio_chip: &str) -> Result<Touch> {
    let gt_cfg = cfg.gt911();
    let bus = I2cRegisters::new(linux::open_i2c(cfg.i2c_bus())?, gt_cfg.address);
    let rst = linux::open_output(gpio_chip, cfg.rst_line(), true)?;
    let int = linux::open_edge_line(gpio_chip, cfg.int_line())?;

    let mut gt = Gt911::new(bus, rst, int, gt_cfg, &mut Delay)?;
    match gt.config_version() {
        Ok(v) => info!("GT911 config version {:#04x}", v),
        Err(e) => warn!("GT911 config version unreadable: {}", e),
    }
    Ok(gt)
}

fn paint_background(panel: &mut Panel, image: Option<&Path>) -> Result<()> {
    if let Some(path) = image {
        if panel.load_background_image(path)? {
            info!("Background {} drawn", path.display());
            return Ok(());
        }
    }
    panel.clear(WHITE)?;
    Ok(())
}

fn build_renderer(panel: Panel, cfg: &TextConfig) -> Result<TextRenderer<Panel, FontdueRasterizer>> {
    let font = cfg.font_path();
    let mut renderer = TextRenderer::from_font_file(panel, &font)
        .with_context(|| format!("loading font {}", font.display()))?;
    if let Some(bytes) = cfg.glyph_cache_bytes {
        renderer = renderer.with_glyph_cache_bytes(bytes);
    }
    if let Some(px) = cfg.font_size_px {
        renderer.set_font_size_px(px);
    }
    if let Some(gap) = cfg.line_gap_px {
        renderer.set_line_gap_px(gap);
    }
    if let Some(wrap) = cfg.wrap_width_px {
        renderer.set_wrap_width_px(wrap);
    }
    Ok(renderer)
}

fn touch_label(touch: Option<&SharedTouch>) -> String {
    match touch.map(SharedTouch::load) {
        None => "touch off".to_string(),
        Some(p) if p.touched => format!("{}, {}", p.x, p.y),
        Some(_) => "--".to_string(),
    }
}

/// Redraws the clock and touch readout whenever either changes.
fn start_render_worker(
    mut renderer: TextRenderer<Panel, FontdueRasterizer>,
    touch: Option<std::sync::Arc<SharedTouch>>,
    token: CancelToken,
) -> Result<Worker> {
    let mut shown: Option<String> = None;
    let worker = Worker::start("render", token, move || {
        let label = format!("{}  {}", Local::now().format("%H:%M"), touch_label(touch.as_deref()));
        if shown.as_deref() != Some(label.as_str()) {
            let (w, h) = renderer.display_mut().dimensions();
            let redraw = renderer
                .display_mut()
                .fill_rect(0, LABEL_TOP, w as i32 - 1, h as i32 - 1, WHITE)
                .map_err(velodash::text::TextError::from)
                .and_then(|_| renderer.draw_label(0, LABEL_TOP, w as i32, LABEL_HEIGHT, &label, true));
            match redraw {
                Ok(_) => shown = Some(label),
                Err(e) => warn!("label redraw failed: {}", e),
            }
        }
        thread::sleep(LABEL_REFRESH);
    })?;
    Ok(worker)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cfg = config::load()?;

    env_logger::Builder::from_env(Env::default().default_filter_or(cfg.log_level()))
        .format_timestamp_secs()
        .init();

    info!("{} cycle computer", env!("CARGO_PKG_NAME"));
    info!("v.{} built {} for {}", env!("CARGO_PKG_VERSION"), BUILD_DATE, BUILD_TARGET);

    let display_cfg = cfg.display();
    let touch_cfg = cfg.touch();
    let token = CancelToken::new();

    let mut panel = open_panel(&display_cfg).context("opening ST7796 panel")?;
    paint_background(&mut panel, display_cfg.background_image.as_deref())?;

    let renderer = build_renderer(panel, &cfg.text())?;

    let mut touch = if touch_cfg.enabled() {
        let gt = open_touch(&touch_cfg, display_cfg.gpio_chip()).context("opening GT911 touch")?;
        Some(TouchDriver::start(gt, token.clone())?)
    } else {
        info!("Touch disabled");
        None
    };

    let mut render = start_render_worker(renderer, touch.as_ref().map(TouchDriver::shared), token.clone())?;

    signal_handler().await?;

    token.cancel();
    render.stop();
    if let Some(t) = touch.as_mut() {
        t.stop();
    }
    info!("Shutdown complete");
    Ok(())
}
