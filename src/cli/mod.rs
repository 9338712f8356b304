//! Command-line interface for voicetask.
//!
//! Provides commands for running a voice session, listing captured tasks,
//! trying out the date/time parser, and showing the resolved configuration.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::warn;

#[cfg(feature = "device-audio")]
use crate::adapters::{DevicePlayer, DeviceRecorder};
use crate::adapters::{
    AudioPlayer, AudioRecorder, CommandPlayer, CommandRecorder, NotificationDispatcher,
    OpenAiClient, SpeechFormat, SpeechToText, TelegramClient, TelegramConfig, TwilioClient,
    TwilioWhatsApp,
};
use crate::config::{self, AudioBackend, AudioSettings, ResolvedConfig};
use crate::core::{
    Clock, DateTimeNormalizer, Orchestrator, ReminderScheduler, SystemClock, TaskCaptureFlow,
    TaskStore,
};
use crate::ingest::{LocalWhisper, Speaker, TempWorkspace, VoiceInputController};

/// voicetask - Voice-driven task capture with scheduled reminders
#[derive(Parser, Debug)]
#[command(name = "voicetask")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a voice session, then keep sending reminders until Ctrl+C
    Run(RunArgs),

    /// List tasks in the task log
    Tasks {
        /// Show only the most recent N tasks
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Resolve a spoken-style date/time phrase
    Parse {
        /// Phrase to resolve (e.g. "tomorrow at 3pm")
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// Reminder delivery channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NotifyChannel {
    /// WhatsApp via Twilio
    Whatsapp,
    /// Telegram bot
    Telegram,
}

/// Speech-to-text backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SttBackend {
    /// OpenAI Whisper API
    Openai,
    /// Local whisper binary (WHISPER_PATH)
    Local,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// OpenAI API key (used for speech synthesis, and transcription with --stt openai)
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Where reminders are delivered
    #[arg(long, value_enum, default_value = "whatsapp")]
    pub notify: NotifyChannel,

    /// Speech-to-text backend
    #[arg(long, value_enum, default_value = "openai")]
    pub stt: SttBackend,

    /// Whisper model for --stt local
    #[arg(long, default_value = "base")]
    pub whisper_model: String,

    /// Twilio account SID
    #[arg(long, env = "TWILIO_ACCOUNT_SID")]
    pub twilio_account_sid: Option<String>,

    /// Twilio auth token
    #[arg(long, env = "TWILIO_AUTH_TOKEN", hide_env_values = true)]
    pub twilio_auth_token: Option<String>,

    /// Twilio WhatsApp sender number
    #[arg(long, env = "TWILIO_WHATSAPP_NUMBER")]
    pub twilio_whatsapp_number: Option<String>,

    /// Your WhatsApp number
    #[arg(long, env = "USER_WHATSAPP_NUMBER")]
    pub user_whatsapp_number: Option<String>,

    /// Telegram bot token
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub telegram_bot_token: Option<String>,

    /// Telegram chat ID
    #[arg(long, env = "TELEGRAM_CHAT_ID")]
    pub telegram_chat_id: Option<String>,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Run(args) => run_session(args).await,
            Commands::Tasks { limit } => list_tasks(limit),
            Commands::Parse { text } => parse_phrase(&text.join(" ")),
            Commands::Config => show_config(),
        }
    }
}

/// Unwrap a required credential
fn require(value: Option<String>, name: &str) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .with_context(|| format!("{} is not set (use the flag or environment variable)", name))
}

/// Build the reminder channel selected by `--notify`
fn build_dispatcher(args: &RunArgs) -> Result<Arc<dyn NotificationDispatcher>> {
    match args.notify {
        NotifyChannel::Whatsapp => {
            let client = TwilioClient::new(
                require(args.twilio_account_sid.clone(), "TWILIO_ACCOUNT_SID")?,
                require(args.twilio_auth_token.clone(), "TWILIO_AUTH_TOKEN")?,
            );
            Ok(Arc::new(TwilioWhatsApp::new(
                client,
                &require(args.twilio_whatsapp_number.clone(), "TWILIO_WHATSAPP_NUMBER")?,
                &require(args.user_whatsapp_number.clone(), "USER_WHATSAPP_NUMBER")?,
            )))
        }
        NotifyChannel::Telegram => Ok(Arc::new(TelegramClient::from_config(TelegramConfig {
            bot_token: require(args.telegram_bot_token.clone(), "TELEGRAM_BOT_TOKEN")?,
            chat_id: require(args.telegram_chat_id.clone(), "TELEGRAM_CHAT_ID")?,
        }))),
    }
}

/// Microphone, speaker and the speech encoding the speaker can play
fn build_audio(
    audio: &AudioSettings,
) -> Result<(Arc<dyn AudioRecorder>, Arc<dyn AudioPlayer>, SpeechFormat)> {
    match audio.backend {
        AudioBackend::Command => Ok((
            Arc::new(CommandRecorder::new(
                audio.record_command.clone(),
                audio.sample_rate,
                audio.channels,
            )),
            Arc::new(CommandPlayer::new(audio.play_command.clone())),
            SpeechFormat::Mp3,
        )),
        #[cfg(feature = "device-audio")]
        AudioBackend::Device => Ok((
            Arc::new(DeviceRecorder::new(
                audio.input_device.clone(),
                audio.sample_rate,
                audio.channels,
            )),
            Arc::new(DevicePlayer::new(audio.output_device.clone())),
            SpeechFormat::Wav,
        )),
        #[cfg(not(feature = "device-audio"))]
        AudioBackend::Device => anyhow::bail!(
            "audio.backend 'device' requires voicetask built with the device-audio feature"
        ),
    }
}

/// Wire every component from configuration
fn build_orchestrator(args: RunArgs, cfg: &ResolvedConfig) -> Result<Orchestrator> {
    let dispatcher = build_dispatcher(&args)?;
    let (recorder, player, speech_format) = build_audio(&cfg.audio)?;

    let openai = Arc::new(
        OpenAiClient::new(require(args.openai_api_key, "OPENAI_API_KEY")?)
            .with_models(
                cfg.voice.stt_model.clone(),
                cfg.voice.tts_model.clone(),
                cfg.voice.tts_voice.clone(),
            )
            .with_speech_format(speech_format),
    );

    let stt: Arc<dyn SpeechToText> = match args.stt {
        SttBackend::Openai => openai.clone(),
        SttBackend::Local => Arc::new(LocalWhisper::new(args.whisper_model)),
    };

    let workspace = TempWorkspace::new(&cfg.temp_dir).with_context(|| {
        format!("Failed to create temp directory: {}", cfg.temp_dir.display())
    })?;

    let speaker = Speaker::new(openai, player, workspace.clone());

    let voice = VoiceInputController::new(
        recorder,
        stt,
        speaker,
        workspace.clone(),
        cfg.audio.record_duration(),
        cfg.voice.max_retries,
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let flow = TaskCaptureFlow::new(voice, DateTimeNormalizer::new(clock.clone()));
    let scheduler = ReminderScheduler::new(dispatcher.clone(), clock, cfg.reminders.recurrence);

    let orchestrator = Orchestrator::new(
        flow,
        TaskStore::new(&cfg.task_log),
        scheduler,
        dispatcher,
        workspace,
        cfg.reminders.poll_interval(),
    )?;
    Ok(orchestrator)
}

/// Resolves on Ctrl+C; never resolves if the handler cannot be installed
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

/// Interactive session, then reminder polling, then cleanup
async fn run_session(args: RunArgs) -> Result<()> {
    let cfg = config::config()?;
    let mut orchestrator = build_orchestrator(args, cfg)?;

    eprintln!("Task log: {}", cfg.task_log.display());

    let result = orchestrator.run_interactive(interrupted()).await;
    if result.is_ok() {
        eprintln!(
            "Scheduler running with {} reminder(s). Press Ctrl+C to quit.",
            orchestrator.scheduler().len()
        );
        orchestrator.run_polling(interrupted()).await;
    }

    orchestrator.shutdown();
    result
}

/// Print the task log
fn list_tasks(limit: Option<usize>) -> Result<()> {
    let store = TaskStore::open_default()?;
    let tasks = store.read_all()?;

    if tasks.is_empty() {
        println!("No tasks found in {}", store.path().display());
        return Ok(());
    }

    let skip = limit.map(|n| tasks.len().saturating_sub(n)).unwrap_or(0);

    println!("{:<40} {:<12} {:<6}", "TASK", "DUE", "AT");
    println!("{}", "-".repeat(60));

    for task in tasks.iter().skip(skip) {
        let name = if task.name().chars().count() > 37 {
            format!("{}...", task.name().chars().take(37).collect::<String>())
        } else {
            task.name().to_string()
        };
        println!(
            "{:<40} {:<12} {:<6}",
            name,
            task.due_date_string(),
            task.deadline_string()
        );
    }

    println!("\nTotal: {} tasks", tasks.len());

    Ok(())
}

/// Resolve a phrase against the current time
fn parse_phrase(text: &str) -> Result<()> {
    let normalizer = DateTimeNormalizer::new(Arc::new(SystemClock));
    let resolved = normalizer.normalize(text)?;

    println!("Date: {}", resolved.date_string());
    println!("Time: {}", resolved.time_string());

    Ok(())
}

/// Show the resolved configuration (for debugging)
fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("voicetask configuration");
    println!("{}", "=".repeat(60));
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:      {}", cfg.home.display());
    println!("  Task log:  {}", cfg.task_log.display());
    println!("  Temp dir:  {}", cfg.temp_dir.display());
    println!();
    println!("Audio:");
    println!("  Backend:      {}", cfg.audio.backend);
    if cfg.audio.backend == AudioBackend::Device {
        let or_default = |d: &Option<String>| d.clone().unwrap_or_else(|| "(system default)".to_string());
        println!("  Input:        {}", or_default(&cfg.audio.input_device));
        println!("  Output:       {}", or_default(&cfg.audio.output_device));
    }
    println!("  Sample rate:  {} Hz", cfg.audio.sample_rate);
    println!("  Channels:     {}", cfg.audio.channels);
    println!("  Record for:   {}s", cfg.audio.record_duration_seconds);
    println!("  Recorder:     {}", cfg.audio.record_command.join(" "));
    println!("  Player:       {}", cfg.audio.play_command.join(" "));
    println!();
    println!("Voice:");
    println!("  Max retries:  {}", cfg.voice.max_retries);
    println!("  STT model:    {}", cfg.voice.stt_model);
    println!("  TTS model:    {}", cfg.voice.tts_model);
    println!("  TTS voice:    {}", cfg.voice.tts_voice);
    println!();
    println!("Reminders:");
    println!("  Poll every:   {}ms", cfg.reminders.poll_interval_ms);
    println!("  Recurrence:   {}", cfg.reminders.recurrence);

    Ok(())
}
