#[cfg(feature = "defmt")]
use defmt::debug;
use embedded_hal::digital::OutputPin;
#[cfg(not(feature = "defmt"))]
use log::debug;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Color {
    Off,
    Red,
    Yellow,
    Green,
    Blue,
}

/// What the tracker is doing, as shown on the LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CyclePhase {
    /// Waiting for the network to accept the join.
    Joining,
    /// Short flash on every join poll.
    JoinPoll,
    Joined,
    WaitingForFix,
    Sending,
    Sent,
    Idle,
}

impl CyclePhase {
    pub const fn color(self) -> Color {
        match self {
            CyclePhase::Joining => Color::Red,
            CyclePhase::JoinPoll => Color::Yellow,
            CyclePhase::Joined => Color::Blue,
            CyclePhase::WaitingForFix => Color::Yellow,
            CyclePhase::Sending => Color::Yellow,
            CyclePhase::Sent => Color::Green,
            CyclePhase::Idle => Color::Off,
        }
    }
}

pub trait Indicator {
    fn set_color(&mut self, color: Color) -> crate::Result<()>;
}

/// Best-effort phase reporting. A broken LED never stops the tracker.
pub struct PhaseSignal<I: Indicator> {
    indicator: I,
}

impl<I: Indicator> PhaseSignal<I> {
    pub fn new(indicator: I) -> Self {
        Self { indicator }
    }

    pub fn set_phase(&mut self, phase: CyclePhase) {
        if let Err(err) = self.indicator.set_color(phase.color()) {
            debug!("Could not show {:?}: {}", phase, err);
        }
    }

    pub fn indicator(&self) -> &I {
        &self.indicator
    }
}

/// Common-cathode RGB LED on three GPIOs. Yellow mixes red and green.
pub struct RgbLed<R, G, B> {
    red: R,
    green: G,
    blue: B,
}

impl<R: OutputPin, G: OutputPin, B: OutputPin> RgbLed<R, G, B> {
    pub fn new(red: R, green: G, blue: B) -> Self {
        Self { red, green, blue }
    }
}

impl<R: OutputPin, G: OutputPin, B: OutputPin> Indicator for RgbLed<R, G, B> {
    fn set_color(&mut self, color: Color) -> crate::Result<()> {
        let (r, g, b) = match color {
            Color::Off => (false, false, false),
            Color::Red => (true, false, false),
            Color::Yellow => (true, true, false),
            Color::Green => (false, true, false),
            Color::Blue => (false, false, true),
        };
        self.red.set_state(r.into()).map_err(|_| Error::Indicator)?;
        self.green.set_state(g.into()).map_err(|_| Error::Indicator)?;
        self.blue.set_state(b.into()).map_err(|_| Error::Indicator)?;
        Ok(())
    }
}
