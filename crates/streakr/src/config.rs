use anyhow::{anyhow, bail};
use clap::Parser;
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::{
    env,
    fs::{self, File},
    io::{Read, Write},
    path::{Path, PathBuf},
};
use streakr_core::PANIC_VOIDS_PER_ROUND;
use time::{format_description::well_known::Iso8601, OffsetDateTime};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to Settings.toml file holding configuration options
    #[arg(short, long)]
    pub config: Option<String>,

    /// Log level to run with the service (default: info)
    #[arg(short, long)]
    pub level: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Settings {
    pub config: Option<String>,
    pub level: Option<String>,
    #[serde(default)]
    pub db_settings: DBSettings,
    #[serde(default)]
    pub api_settings: APISettings,
    #[serde(default)]
    pub game_settings: GameSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.game_settings.panic_voids_per_round != PANIC_VOIDS_PER_ROUND {
            bail!(
                "panic_voids_per_round must be {}, the game only supports one personal void per round",
                PANIC_VOIDS_PER_ROUND
            );
        }
        if self.game_settings.leaderboard_limit == 0 {
            bail!("leaderboard_limit must be greater than zero");
        }
        if self.game_settings.auto_lock_interval_secs == 0 {
            bail!("auto_lock_interval_secs must be greater than zero");
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DBSettings {
    pub data_folder: String,
    pub read_max_connections: u32,
    pub read_min_connections: u32,
    pub write_max_connections: u32,
    pub write_min_connections: u32,
    pub idle_timeout_secs: u64,
    pub acquire_timeout_secs: u64,
    pub busy_timeout_ms: u32,
    /// WAL, DELETE or MEMORY
    pub journal_mode: String,
    /// OFF, NORMAL or FULL
    pub synchronous: String,
    pub foreign_keys: bool,
    /// Keep the database in memory, only useful for local experiments
    #[serde(default)]
    pub in_memory: bool,
}

impl Default for DBSettings {
    fn default() -> Self {
        DBSettings {
            data_folder: String::from("./data"),
            read_max_connections: 12,
            read_min_connections: 2,
            write_max_connections: 4,
            write_min_connections: 1,
            idle_timeout_secs: 600,   // 10 minutes
            acquire_timeout_secs: 15, // 15 seconds
            busy_timeout_ms: 5000,
            journal_mode: String::from("WAL"),
            synchronous: String::from("NORMAL"),
            foreign_keys: true,
            in_memory: false,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct APISettings {
    pub domain: String,
    pub port: String,
    pub origins: Vec<String>,
}

impl Default for APISettings {
    fn default() -> Self {
        APISettings {
            domain: String::from("127.0.0.1"),
            port: String::from("9400"),
            origins: vec![String::from("http://localhost:3000")],
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameSettings {
    /// Season assigned to new rounds that do not name one
    pub season: i32,
    /// How often to sweep games past their start time and lock their open questions
    pub auto_lock_interval_secs: u64,
    /// Default number of leaderboard rows returned when the caller does not ask for a limit
    pub leaderboard_limit: usize,
    /// Personal voids available to each player per round. Only 1 is supported.
    pub panic_voids_per_round: u32,
}

impl Default for GameSettings {
    fn default() -> Self {
        GameSettings {
            season: 2025,
            auto_lock_interval_secs: 30,
            leaderboard_limit: 50,
            panic_voids_per_round: PANIC_VOIDS_PER_ROUND,
        }
    }
}

pub fn get_settings() -> Result<Settings, anyhow::Error> {
    let cli = Cli::parse();
    let mut settings = match cli.config.as_deref() {
        Some(config_path) => {
            let path = PathBuf::from(config_path);
            let absolute_path = if path.is_absolute() {
                path
            } else {
                env::current_dir()?.join(path)
            };
            read_settings(&absolute_path)?
        }
        None => load_or_create_default(Path::new("./config/local.toml"))?,
    };

    if let Some(level) = cli.level {
        settings.level = Some(level);
    }
    settings.validate()?;

    Ok(settings)
}

fn read_settings(path: &Path) -> Result<Settings, anyhow::Error> {
    let mut file =
        File::open(path).map_err(|e| anyhow!("Failed to find file {}: {}", path.display(), e))?;
    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| anyhow!("Failed to read config: {}", e))?;
    toml::from_str(&content).map_err(|e| anyhow!("Failed to map config to settings: {}", e))
}

fn load_or_create_default(path: &Path) -> Result<Settings, anyhow::Error> {
    if path.exists() {
        return read_settings(path);
    }

    let default_settings = Settings::default();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| anyhow!("Failed to create config directory: {}", e))?;
    }

    let toml_content = toml::to_string(&default_settings)
        .map_err(|e| anyhow!("Failed to serialize default settings: {}", e))?;
    let mut file =
        File::create(path).map_err(|e| anyhow!("Failed to create config file: {}", e))?;
    file.write_all(toml_content.as_bytes())
        .map_err(|e| anyhow!("Failed to write default config: {}", e))?;

    Ok(default_settings)
}

pub fn setup_logger(
    level: Option<String>,
    filter_targets: Vec<String>,
) -> Result<(), fern::InitError> {
    let rust_log = get_log_level(level);
    let colors = ColoredLevelConfig::new()
        .trace(Color::White)
        .debug(Color::Cyan)
        .info(Color::Blue)
        .warn(Color::Yellow)
        .error(Color::Magenta);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            let timestamp = OffsetDateTime::now_utc()
                .format(&Iso8601::DEFAULT)
                .unwrap_or_default();
            out.finish(format_args!(
                "[{} {}] {}: {}",
                timestamp,
                colors.color(record.level()),
                record.target(),
                message
            ));
        })
        .level(rust_log)
        .filter(move |metadata| {
            !filter_targets
                .iter()
                .any(|filter| metadata.target().starts_with(filter))
        })
        .chain(std::io::stdout())
        .apply()?;
    Ok(())
}

pub fn get_log_level(level: Option<String>) -> LevelFilter {
    let level = level.unwrap_or_else(|| env::var("RUST_LOG").unwrap_or_default());
    match level.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_valid() {
        Settings::default().validate().unwrap();
    }

    #[test]
    fn test_more_than_one_panic_void_is_rejected() {
        let mut settings = Settings::default();
        settings.game_settings.panic_voids_per_round = 2;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            level = "debug"

            [api_settings]
            domain = "0.0.0.0"
            port = "8080"
            origins = []
            "#,
        )
        .unwrap();

        assert_eq!(settings.api_settings.port, "8080");
        assert_eq!(settings.db_settings.journal_mode, "WAL");
        assert_eq!(settings.game_settings.leaderboard_limit, 50);
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(get_log_level(Some("debug".into())), LevelFilter::Debug);
        assert_eq!(get_log_level(Some("nonsense".into())), LevelFilter::Info);
    }
}
