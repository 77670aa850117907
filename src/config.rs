use serde::{Deserialize, Serialize};
use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use std::{fs, path::{Path, PathBuf}, time::Duration};
use thiserror::Error;

use crate::touch::gt911::{Gt911Config, ADDR_PRIMARY, ADDR_SECONDARY};

pub const DEFAULT_SPI_BUS: &str = "/dev/spidev0.0";
pub const DEFAULT_SPI_SPEED_HZ: u32 = 40_000_000;
pub const DEFAULT_GPIO_CHIP: &str = "/dev/gpiochip0";
pub const DEFAULT_DC_LINE: u32 = 22;
pub const DEFAULT_LCD_RST_LINE: u32 = 27;
pub const DEFAULT_BL_LINE: u32 = 18;
pub const DEFAULT_I2C_BUS: &str = "/dev/i2c-1";
pub const DEFAULT_TOUCH_RST_LINE: u32 = 1;
pub const DEFAULT_TOUCH_INT_LINE: u32 = 4;
pub const DEFAULT_FONT_PATH: &str = "config/fonts/DejaVuSans.ttf";

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration. Every field is optional so layers can be
/// merged; the accessors fill in hardware defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub log_level: Option<String>,     // e.g., "info" | "debug"
    pub display: Option<DisplayConfig>,
    pub touch: Option<TouchConfig>,
    pub text: Option<TextConfig>,
}

/// Panel wiring
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DisplayConfig {
    pub spi_bus: Option<String>,       // e.g. "/dev/spidev0.0"
    pub spi_speed_hz: Option<u32>,
    pub gpio_chip: Option<String>,     // e.g. "/dev/gpiochip0"
    pub dc_line: Option<u32>,
    pub rst_line: Option<u32>,
    pub bl_line: Option<u32>,
    pub background_image: Option<PathBuf>,
}

/// Touch controller wiring and sampling cadence
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TouchConfig {
    pub enabled: Option<bool>,
    pub i2c_bus: Option<String>,       // e.g. "/dev/i2c-1"
    pub address: Option<u8>,           // 0x5D or 0x14
    pub rst_line: Option<u32>,
    pub int_line: Option<u32>,
    pub poll_interval_ms: Option<u64>,
    pub event_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TextConfig {
    pub font_path: Option<PathBuf>,
    pub font_size_px: Option<u32>,
    pub line_gap_px: Option<i32>,
    pub wrap_width_px: Option<i32>,
    pub glyph_cache_bytes: Option<u64>,
}

impl Config {
    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    pub fn display(&self) -> DisplayConfig {
        self.display.clone().unwrap_or_default()
    }

    pub fn touch(&self) -> TouchConfig {
        self.touch.clone().unwrap_or_default()
    }

    pub fn text(&self) -> TextConfig {
        self.text.clone().unwrap_or_default()
    }
}

impl DisplayConfig {
    pub fn spi_bus(&self) -> &str {
        self.spi_bus.as_deref().unwrap_or(DEFAULT_SPI_BUS)
    }

    pub fn spi_speed_hz(&self) -> u32 {
        self.spi_speed_hz.unwrap_or(DEFAULT_SPI_SPEED_HZ)
    }

    pub fn gpio_chip(&self) -> &str {
        self.gpio_chip.as_deref().unwrap_or(DEFAULT_GPIO_CHIP)
    }

    pub fn dc_line(&self) -> u32 {
        self.dc_line.unwrap_or(DEFAULT_DC_LINE)
    }

    pub fn rst_line(&self) -> u32 {
        self.rst_line.unwrap_or(DEFAULT_LCD_RST_LINE)
    }

    pub fn bl_line(&self) -> u32 {
        self.bl_line.unwrap_or(DEFAULT_BL_LINE)
    }
}

impl TouchConfig {
    pub fn enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn i2c_bus(&self) -> &str {
        self.i2c_bus.as_deref().unwrap_or(DEFAULT_I2C_BUS)
    }

    pub fn rst_line(&self) -> u32 {
        self.rst_line.unwrap_or(DEFAULT_TOUCH_RST_LINE)
    }

    pub fn int_line(&self) -> u32 {
        self.int_line.unwrap_or(DEFAULT_TOUCH_INT_LINE)
    }

    /// Controller settings with unset fields left at their defaults.
    pub fn gt911(&self) -> Gt911Config {
        let mut gt = Gt911Config::default();
        if let Some(a) = self.address { gt.address = a; }
        if let Some(ms) = self.poll_interval_ms { gt.poll_interval = Duration::from_millis(ms); }
        if let Some(ms) = self.event_timeout_ms { gt.event_timeout = Duration::from_millis(ms); }
        gt
    }
}

impl TextConfig {
    pub fn font_path(&self) -> PathBuf {
        self.font_path.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_FONT_PATH))
    }
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "velodash", about = "velodash cycle computer", disable_help_flag = false)]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub log_level: Option<String>,
    #[arg(long)]
    pub spi_bus: Option<String>,
    #[arg(long)]
    pub spi_speed_hz: Option<u32>,
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub background: Option<PathBuf>,
    #[arg(long)]
    pub i2c_bus: Option<String>,
    /// GT911 address, 0x5D or 0x14
    #[arg(long, value_parser = parse_address)]
    pub touch_address: Option<u8>,
    #[arg(long, action = ArgAction::SetTrue)]
    pub no_touch: bool,
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub font: Option<PathBuf>,
    #[arg(long)]
    pub font_size_px: Option<u32>,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

fn parse_address(s: &str) -> Result<u8, String> {
    let t = s.trim();
    let parsed = match t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => t.parse::<u8>(),
    };
    parsed.map_err(|e| format!("invalid I2C address {s:?}: {e}"))
}

/// Public entry point: parse CLI, read YAML, merge, validate.
pub fn load() -> Result<Config, ConfigError> {
    let cli = Cli::parse();
    let cfg = build(&cli)?;

    if cli.dump_config {
        // Pretty YAML of effective config (nice for debugging)
        let s = serde_yaml::to_string(&cfg)?;
        println!("{s}");
        std::process::exit(0);
    }

    Ok(cfg)
}

/// Defaults, then YAML, then CLI, then validation.
pub fn build(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) defaults (from `Default` impl)
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    // 4) Validate
    validate(&cfg)?;
    Ok(cfg)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/velodash/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/velodash/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/velodash.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["velodash.yaml", "config/velodash.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    if src.log_level.is_some()      { dst.log_level = src.log_level; }
    match (&mut dst.display, src.display) {
        (None, Some(c)) => dst.display = Some(c),
        (Some(d), Some(s)) => merge_display(d, s),
        _ => {}
    }
    match (&mut dst.touch, src.touch) {
        (None, Some(c)) => dst.touch = Some(c),
        (Some(d), Some(s)) => merge_touch(d, s),
        _ => {}
    }
    match (&mut dst.text, src.text) {
        (None, Some(c)) => dst.text = Some(c),
        (Some(d), Some(s)) => merge_text(d, s),
        _ => {}
    }
}

fn merge_display(dst: &mut DisplayConfig, src: DisplayConfig) {
    if src.spi_bus.is_some()          { dst.spi_bus = src.spi_bus; }
    if src.spi_speed_hz.is_some()     { dst.spi_speed_hz = src.spi_speed_hz; }
    if src.gpio_chip.is_some()        { dst.gpio_chip = src.gpio_chip; }
    if src.dc_line.is_some()          { dst.dc_line = src.dc_line; }
    if src.rst_line.is_some()         { dst.rst_line = src.rst_line; }
    if src.bl_line.is_some()          { dst.bl_line = src.bl_line; }
    if src.background_image.is_some() { dst.background_image = src.background_image; }
}

fn merge_touch(dst: &mut TouchConfig, src: TouchConfig) {
    if src.enabled.is_some()          { dst.enabled = src.enabled; }
    if src.i2c_bus.is_some()          { dst.i2c_bus = src.i2c_bus; }
    if src.address.is_some()          { dst.address = src.address; }
    if src.rst_line.is_some()         { dst.rst_line = src.rst_line; }
    if src.int_line.is_some()         { dst.int_line = src.int_line; }
    if src.poll_interval_ms.is_some() { dst.poll_interval_ms = src.poll_interval_ms; }
    if src.event_timeout_ms.is_some() { dst.event_timeout_ms = src.event_timeout_ms; }
}

fn merge_text(dst: &mut TextConfig, src: TextConfig) {
    if src.font_path.is_some()         { dst.font_path = src.font_path; }
    if src.font_size_px.is_some()      { dst.font_size_px = src.font_size_px; }
    if src.line_gap_px.is_some()       { dst.line_gap_px = src.line_gap_px; }
    if src.wrap_width_px.is_some()     { dst.wrap_width_px = src.wrap_width_px; }
    if src.glyph_cache_bytes.is_some() { dst.glyph_cache_bytes = src.glyph_cache_bytes; }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some()       { cfg.log_level = cli.log_level.clone(); }

    if cli.spi_bus.is_some() || cli.spi_speed_hz.is_some() || cli.background.is_some() {
        let display = cfg.display.get_or_insert_with(DisplayConfig::default);
        if cli.spi_bus.is_some()      { display.spi_bus = cli.spi_bus.clone(); }
        if cli.spi_speed_hz.is_some() { display.spi_speed_hz = cli.spi_speed_hz; }
        if cli.background.is_some()   { display.background_image = cli.background.clone(); }
    }

    if cli.i2c_bus.is_some() || cli.touch_address.is_some() || cli.no_touch {
        let touch = cfg.touch.get_or_insert_with(TouchConfig::default);
        if cli.i2c_bus.is_some()       { touch.i2c_bus = cli.i2c_bus.clone(); }
        if cli.touch_address.is_some() { touch.address = cli.touch_address; }
        if cli.no_touch                { touch.enabled = Some(false); }
    }

    if cli.font.is_some() || cli.font_size_px.is_some() {
        let text = cfg.text.get_or_insert_with(TextConfig::default);
        if cli.font.is_some()         { text.font_path = cli.font.clone(); }
        if cli.font_size_px.is_some() { text.font_size_px = cli.font_size_px; }
    }
}

/// Put any invariants here (required fields, ranges, etc.)
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if let Some(display) = cfg.display.as_ref() {
        if display.spi_speed_hz == Some(0) {
            return Err(ConfigError::Validation("display spi_speed_hz must be > 0".into()));
        }
    }
    if let Some(touch) = cfg.touch.as_ref() {
        if let Some(a) = touch.address {
            if a != ADDR_PRIMARY && a != ADDR_SECONDARY {
                return Err(ConfigError::Validation(format!(
                    "touch address must be 0x5D or 0x14, got {a:#04x}"
                )));
            }
        }
        if touch.poll_interval_ms == Some(0) || touch.event_timeout_ms == Some(0) {
            return Err(ConfigError::Validation("touch intervals must be > 0".into()));
        }
    }
    if let Some(text) = cfg.text.as_ref() {
        if let Some(px) = text.font_size_px {
            if px < 6 {
                return Err(ConfigError::Validation("text font_size_px must be >= 6".into()));
            }
        }
        if text.glyph_cache_bytes == Some(0) {
            return Err(ConfigError::Validation("text glyph_cache_bytes must be > 0".into()));
        }
    }
    Ok(())
}
