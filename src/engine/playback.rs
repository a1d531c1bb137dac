use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::models::config::PlaybackConfig;
use crate::models::trade::Trade;

/// Where a trade sits relative to the playback cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    /// `entry_index > play_index`
    Pending,
    /// `entry_index <= play_index < exit_index`
    Active,
    /// `exit_index <= play_index`
    Completed,
}

/// Trade membership at the current cursor. Derived on demand, never stored.
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackView<'a> {
    pub play_index: usize,
    pub playing: bool,
    pub active: Vec<&'a Trade>,
    pub completed: Vec<&'a Trade>,
    pub pending: Vec<&'a Trade>,
}

/// Control messages for [`PlaybackDriver::run`].
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackCommand {
    Play,
    Pause,
    Toggle,
    Step,
    SetSpeed(f64),
    JumpToStart,
    JumpToEnd,
    /// Replace the ledger with a new backtest run. Playback stops first.
    Load { trades: Vec<Trade>, len: usize },
    Stop,
}

/// `base / speed`, or `None` when the speed is not a positive number or the
/// result overflows.
fn scaled_tick(base: Duration, speed: f64) -> Option<Duration> {
    if !speed.is_finite() || speed <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(base.as_secs_f64() / speed).ok()
}

/// Replays a trade ledger against a cursor over the price series.
pub struct PlaybackDriver {
    trades: Vec<Trade>,
    len: usize,
    play_index: usize,
    playing: bool,
    speed: f64,
    base_tick: Duration,
}

impl PlaybackDriver {
    pub fn new(trades: Vec<Trade>, len: usize, config: &PlaybackConfig) -> Self {
        let base_tick = Duration::from_millis(config.base_tick_ms.max(1));
        let speed = if scaled_tick(base_tick, config.default_speed).is_some() {
            config.default_speed
        } else {
            warn!(
                "Invalid default playback speed {}, using 1.0",
                config.default_speed
            );
            1.0
        };
        Self {
            trades,
            len,
            play_index: 0,
            playing: false,
            speed,
            base_tick,
        }
    }

    /// Swap in a new ledger and series length. Stops playback and rewinds.
    pub fn load(&mut self, trades: Vec<Trade>, len: usize) {
        self.playing = false;
        self.trades = trades;
        self.len = len;
        self.play_index = 0;
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn play_index(&self) -> usize {
        self.play_index
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    fn last_index(&self) -> usize {
        self.len.saturating_sub(1)
    }

    fn at_end(&self) -> bool {
        self.play_index >= self.last_index()
    }

    /// Start auto-advance. No-op on an empty series or at the last index.
    pub fn play(&mut self) {
        if self.is_empty() || self.at_end() {
            return;
        }
        self.playing = true;
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    pub fn toggle(&mut self) {
        if self.playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Advance the cursor by one bar. Reaching the last index pauses.
    /// Returns whether the cursor moved.
    pub fn step(&mut self) -> bool {
        if self.is_empty() || self.at_end() {
            self.playing = false;
            return false;
        }
        self.play_index += 1;
        if self.at_end() {
            debug!("Playback reached last index {}", self.play_index);
            self.playing = false;
        }
        true
    }

    /// One timer tick: advances only while playing.
    pub fn tick(&mut self) -> bool {
        if !self.playing {
            return false;
        }
        self.step()
    }

    /// Rejects speeds that are not positive or whose tick interval would
    /// not fit in a `Duration`.
    pub fn set_speed(&mut self, speed: f64) -> Result<(), AppError> {
        if scaled_tick(self.base_tick, speed).is_none() {
            return Err(AppError::InvalidConfig(format!(
                "playback speed must be a positive number with a representable tick, got {}",
                speed
            )));
        }
        self.speed = speed;
        Ok(())
    }

    /// Base tick divided by speed: 100ms at 1×, 50ms at 2×.
    pub fn tick_interval(&self) -> Duration {
        scaled_tick(self.base_tick, self.speed).unwrap_or(self.base_tick)
    }

    pub fn jump_to_start(&mut self) {
        self.play_index = 0;
    }

    /// Move straight to the last index and pause. Every trade with
    /// `exit_index <= last` becomes completed at once.
    pub fn jump_to_end(&mut self) {
        self.play_index = self.last_index();
        self.playing = false;
    }

    pub fn trade_status(&self, trade: &Trade) -> TradeStatus {
        if trade.exit_index <= self.play_index {
            TradeStatus::Completed
        } else if trade.entry_index <= self.play_index {
            TradeStatus::Active
        } else {
            TradeStatus::Pending
        }
    }

    pub fn view(&self) -> PlaybackView<'_> {
        let mut view = PlaybackView {
            play_index: self.play_index,
            playing: self.playing,
            active: Vec::new(),
            completed: Vec::new(),
            pending: Vec::new(),
        };
        for trade in &self.trades {
            match self.trade_status(trade) {
                TradeStatus::Active => view.active.push(trade),
                TradeStatus::Completed => view.completed.push(trade),
                TradeStatus::Pending => view.pending.push(trade),
            }
        }
        view
    }

    /// Apply a command. Returns `false` when the loop should stop.
    pub fn apply(&mut self, command: PlaybackCommand) -> bool {
        match command {
            PlaybackCommand::Play => self.play(),
            PlaybackCommand::Pause => self.pause(),
            PlaybackCommand::Toggle => self.toggle(),
            PlaybackCommand::Step => {
                self.step();
            }
            PlaybackCommand::SetSpeed(speed) => {
                if let Err(e) = self.set_speed(speed) {
                    warn!("Ignoring playback speed change: {}", e);
                }
            }
            PlaybackCommand::JumpToStart => self.jump_to_start(),
            PlaybackCommand::JumpToEnd => self.jump_to_end(),
            PlaybackCommand::Load { trades, len } => self.load(trades, len),
            PlaybackCommand::Stop => {
                self.pause();
                return false;
            }
        }
        true
    }

    /// Drive playback from a command channel, emitting a frame after every
    /// state change.
    ///
    /// Only one timer is pending at a time; any command drops it and the
    /// next interval is scheduled from the new state. Returns on `Stop`, or
    /// once the channel is closed and playback is paused.
    pub async fn run<F>(&mut self, mut commands: mpsc::Receiver<PlaybackCommand>, mut on_frame: F)
    where
        F: FnMut(&PlaybackView<'_>),
    {
        let mut open = true;
        loop {
            if !self.playing && !open {
                break;
            }

            if self.playing {
                let timer = tokio::time::sleep(self.tick_interval());
                tokio::select! {
                    _ = timer => {
                        if self.tick() {
                            on_frame(&self.view());
                        }
                    }
                    command = commands.recv(), if open => match command {
                        Some(command) => {
                            if !self.apply(command) {
                                break;
                            }
                            on_frame(&self.view());
                        }
                        None => open = false,
                    },
                }
            } else {
                match commands.recv().await {
                    Some(command) => {
                        if !self.apply(command) {
                            break;
                        }
                        on_frame(&self.view());
                    }
                    None => open = false,
                }
            }
        }
        debug!("Playback loop finished at index {}", self.play_index);
    }
}
