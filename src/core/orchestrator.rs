//! Top-level session driver.
//!
//! Runs the spoken command loop until the user exits or interrupts, then
//! keeps polling the reminder scheduler until a second interrupt.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use super::capture_flow::TaskCaptureFlow;
use super::scheduler::{ReminderScheduler, TickReport};
use super::task_store::{TaskStore, TaskStoreError};
use crate::adapters::NotificationDispatcher;
use crate::domain::Task;
use crate::ingest::{Speaker, TempWorkspace};

pub const WELCOME: &str =
    "Welcome to your voice-activated task scheduler. Say 'schedule a task' to begin, or 'exit' to quit.";
pub const COMMAND_PROMPT: &str = "What would you like to do?";
pub const GOODBYE: &str = "Exiting the task scheduler. Goodbye!";
pub const NOT_UNDERSTOOD: &str = "I didn't understand that command. Please try again.";
pub const INTERRUPTED: &str = "Interrupted by user. Exiting the task scheduler.";

/// A spoken top-level command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    CreateTask,
    Exit,
    Unknown,
}

impl Command {
    /// Case-insensitive keyword match; task creation wins over exit
    pub fn parse(text: &str) -> Self {
        let text = text.to_lowercase();
        if text.contains("schedule") || text.contains("task") {
            Command::CreateTask
        } else if text.contains("exit") {
            Command::Exit
        } else {
            Command::Unknown
        }
    }
}

/// Whether the interactive loop keeps going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Exit,
}

/// Owns every component of a running session
pub struct Orchestrator {
    flow: TaskCaptureFlow,
    store: TaskStore,
    scheduler: ReminderScheduler,
    dispatcher: Arc<dyn NotificationDispatcher>,
    workspace: TempWorkspace,
    poll_interval: Duration,
}

impl Orchestrator {
    /// Assemble a session; the task log is created if it does not exist yet
    pub fn new(
        flow: TaskCaptureFlow,
        store: TaskStore,
        scheduler: ReminderScheduler,
        dispatcher: Arc<dyn NotificationDispatcher>,
        workspace: TempWorkspace,
        poll_interval: Duration,
    ) -> Result<Self, TaskStoreError> {
        store.ensure_initialized()?;
        Ok(Self {
            flow,
            store,
            scheduler,
            dispatcher,
            workspace,
            poll_interval,
        })
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn scheduler(&self) -> &ReminderScheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut ReminderScheduler {
        &mut self.scheduler
    }

    fn speaker(&self) -> &Speaker {
        self.flow.voice().speaker()
    }

    /// Speak without failing the caller
    async fn say_or_log(&self, text: &str) {
        if let Err(e) = self.speaker().say(text).await {
            warn!(error = %format!("{:#}", e), "Failed to speak");
        }
    }

    /// Persist, register, confirm, announce
    #[instrument(skip(self, task), fields(task = %task.name()))]
    pub async fn schedule_task(&mut self, task: &Task) -> Result<()> {
        self.store.append(task)?;
        self.scheduler.register(task);
        self.dispatcher
            .send(&task.confirmation_message())
            .await
            .context("Failed to send confirmation")?;
        info!(channel = self.dispatcher.name(), "Confirmation sent");

        self.speaker()
            .say(&format!("Task '{}' scheduled successfully!", task.name()))
            .await?;
        Ok(())
    }

    /// Act on one transcribed command
    pub async fn handle_command(&mut self, text: &str) -> Result<LoopControl> {
        let command = Command::parse(text);
        debug!(?command, text, "Handling command");

        match command {
            Command::CreateTask => {
                if let Some(task) = self.flow.create_task().await {
                    self.schedule_task(&task).await?;
                }
                Ok(LoopControl::Continue)
            }
            Command::Exit => {
                self.speaker().say(GOODBYE).await?;
                Ok(LoopControl::Exit)
            }
            Command::Unknown => {
                self.speaker().say(NOT_UNDERSTOOD).await?;
                Ok(LoopControl::Continue)
            }
        }
    }

    /// Ask for a command and act on it
    pub async fn interact_once(&mut self) -> Result<LoopControl> {
        let command = self.flow.voice().capture(Some(COMMAND_PROMPT)).await?;
        self.handle_command(&command).await
    }

    /// Interactive loop. Returns when the user says exit or `stop` resolves.
    pub async fn run_interactive<F>(&mut self, stop: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(stop);

        let welcomed = tokio::select! {
            _ = &mut stop => None,
            result = self.speaker().say(WELCOME) => Some(result),
        };
        match welcomed {
            None => {
                info!("Interrupted during welcome");
                self.say_or_log(INTERRUPTED).await;
                return Ok(());
            }
            Some(result) => result?,
        }
        info!("Interactive session started");

        loop {
            let result = tokio::select! {
                _ = &mut stop => None,
                result = self.interact_once() => Some(result),
            };

            match result {
                None => {
                    info!("Interrupted during interactive session");
                    self.say_or_log(INTERRUPTED).await;
                    break;
                }
                Some(Ok(LoopControl::Exit)) => break,
                Some(Ok(LoopControl::Continue)) => {}
                Some(Err(e)) => {
                    warn!(error = %format!("{:#}", e), "Error in interactive loop");
                    self.say_or_log(&format!("An error occurred: {}. Please try again.", e))
                        .await;
                }
            }
        }

        Ok(())
    }

    /// Poll the scheduler every `poll_interval` until `stop` resolves
    pub async fn run_polling<F>(&mut self, stop: F)
    where
        F: Future<Output = ()>,
    {
        info!(
            reminders = self.scheduler.len(),
            "Scheduler running in background. Press Ctrl+C to quit."
        );

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tokio::pin!(stop);
        loop {
            tokio::select! {
                _ = &mut stop => break,
                _ = interval.tick() => {
                    let report = self.scheduler.run_pending().await;
                    if report != TickReport::default() {
                        debug!(?report, "Scheduler tick");
                    }
                }
            }
        }

        info!("Scheduler stopped.");
    }

    /// Remove the temp workspace
    pub fn shutdown(&self) {
        self.workspace.cleanup();
        info!("Shutdown complete");
    }
}
