//! Configuration for voicetask.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (VOICETASK_HOME, VOICETASK_TASK_LOG, VOICETASK_TEMP_DIR)
//! 2. Config file (.voicetask/config.yaml)
//! 3. Defaults (~/.voicetask)
//!
//! Config file discovery:
//! - Searches current directory and parents for .voicetask/config.yaml
//! - Paths in config file are relative to the project root (the parent of .voicetask/)

pub mod paths;

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::Recurrence;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

const CONFIG_DIR: &str = ".voicetask";
const CONFIG_FILE: &str = "config.yaml";

const DEFAULT_RECORD_COMMAND: &str =
    "rec -q -r {rate} -c {channels} -b 16 {output} trim 0 {seconds}";
const DEFAULT_PLAY_COMMAND: &str = "ffplay -nodisp -autoexit -loglevel quiet";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub audio: Option<AudioConfig>,
    #[serde(default)]
    pub voice: Option<VoiceConfig>,
    #[serde(default)]
    pub reminders: Option<RemindersConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to project root)
    pub home: Option<String>,
    /// Task log CSV (relative to project root)
    pub task_log: Option<String>,
    /// Scratch directory for audio (relative to project root)
    pub temp_dir: Option<String>,
}

/// How the microphone and speaker are reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioBackend {
    /// External `record_command` / `play_command` programs
    #[default]
    Command,
    /// System audio devices (needs the `device-audio` feature)
    Device,
}

impl std::fmt::Display for AudioBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Command => write!(f, "command"),
            Self::Device => write!(f, "device"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    pub backend: Option<AudioBackend>,
    pub input_device: Option<String>,
    pub output_device: Option<String>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub record_duration_seconds: Option<u64>,
    pub record_command: Option<String>,
    pub play_command: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoiceConfig {
    pub max_retries: Option<u32>,
    pub stt_model: Option<String>,
    pub tts_model: Option<String>,
    pub tts_voice: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemindersConfig {
    pub poll_interval_ms: Option<u64>,
    pub recurrence: Option<Recurrence>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// State directory
    pub home: PathBuf,
    /// Task log CSV
    pub task_log: PathBuf,
    /// Scratch directory for recordings and speech
    pub temp_dir: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub audio: AudioSettings,
    pub voice: VoiceSettings,
    pub reminders: ReminderSettings,
}

#[derive(Debug, Clone)]
pub struct AudioSettings {
    pub backend: AudioBackend,
    /// Device names for the `device` backend (system default when unset)
    pub input_device: Option<String>,
    pub output_device: Option<String>,
    pub sample_rate: u32,
    pub channels: u16,
    pub record_duration_seconds: u64,
    /// Recorder argv template
    pub record_command: Vec<String>,
    /// Player argv; the file path is appended
    pub play_command: Vec<String>,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            backend: AudioBackend::default(),
            input_device: None,
            output_device: None,
            sample_rate: 16000,
            channels: 1,
            record_duration_seconds: 3,
            record_command: split_command(DEFAULT_RECORD_COMMAND),
            play_command: split_command(DEFAULT_PLAY_COMMAND),
        }
    }
}

impl AudioSettings {
    pub fn record_duration(&self) -> Duration {
        Duration::from_secs(self.record_duration_seconds)
    }
}

#[derive(Debug, Clone)]
pub struct VoiceSettings {
    pub max_retries: u32,
    pub stt_model: String,
    pub tts_model: String,
    pub tts_voice: String,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            stt_model: "whisper-1".to_string(),
            tts_model: "tts-1".to_string(),
            tts_voice: "alloy".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReminderSettings {
    pub poll_interval_ms: u64,
    pub recurrence: Recurrence,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            recurrence: Recurrence::Daily,
        }
    }
}

impl ReminderSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Split a command line on whitespace
fn split_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(str::to_string).collect()
}

/// Find config file by searching `start` and its parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_DIR).join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to `base`
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Environment override, ignoring empty values
fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

/// Load configuration starting the file search at `start`
pub fn load_config_from(start: &Path) -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(CONFIG_DIR);

    let config_file = find_config_file(start);

    let file = match config_file {
        Some(ref path) => load_config_file(path)?,
        None => ConfigFile::default(),
    };

    // Project root is the parent of .voicetask/
    let base_dir = config_file
        .as_deref()
        .and_then(Path::parent)
        .and_then(Path::parent)
        .unwrap_or(Path::new("."));

    let from_file = |value: &Option<String>| value.as_deref().map(|p| resolve_path(base_dir, p));

    let home = env_path("VOICETASK_HOME")
        .or_else(|| from_file(&file.paths.home))
        .unwrap_or(default_home);

    let task_log = env_path("VOICETASK_TASK_LOG")
        .or_else(|| from_file(&file.paths.task_log))
        .unwrap_or_else(|| home.join("tasks.csv"));

    let temp_dir = env_path("VOICETASK_TEMP_DIR")
        .or_else(|| from_file(&file.paths.temp_dir))
        .unwrap_or_else(|| home.join("tmp"));

    let mut audio = AudioSettings::default();
    if let Some(a) = file.audio {
        audio.backend = a.backend.unwrap_or(audio.backend);
        audio.input_device = a.input_device.or(audio.input_device);
        audio.output_device = a.output_device.or(audio.output_device);
        audio.sample_rate = a.sample_rate.unwrap_or(audio.sample_rate);
        audio.channels = a.channels.unwrap_or(audio.channels);
        audio.record_duration_seconds = a
            .record_duration_seconds
            .unwrap_or(audio.record_duration_seconds);
        if let Some(cmd) = a.record_command {
            audio.record_command = split_command(&cmd);
        }
        if let Some(cmd) = a.play_command {
            audio.play_command = split_command(&cmd);
        }
    }

    let mut voice = VoiceSettings::default();
    if let Some(v) = file.voice {
        voice.max_retries = v.max_retries.unwrap_or(voice.max_retries);
        voice.stt_model = v.stt_model.unwrap_or(voice.stt_model);
        voice.tts_model = v.tts_model.unwrap_or(voice.tts_model);
        voice.tts_voice = v.tts_voice.unwrap_or(voice.tts_voice);
    }

    let mut reminders = ReminderSettings::default();
    if let Some(r) = file.reminders {
        reminders.poll_interval_ms = r.poll_interval_ms.unwrap_or(reminders.poll_interval_ms);
        reminders.recurrence = r.recurrence.unwrap_or(reminders.recurrence);
    }

    Ok(ResolvedConfig {
        home,
        task_log,
        temp_dir,
        config_file,
        audio,
        voice,
        reminders,
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    load_config_from(&cwd)
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}
