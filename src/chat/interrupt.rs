//! User interrupt signals.
//!
//! [`Interrupts`] fans a process-level ctrl-c out to whoever is currently listening. A
//! listener exists only while a request is in flight: [`Interrupts::subscribe`] registers one
//! and dropping the returned receiver deregisters it. A ctrl-c that arrives while nobody is
//! subscribed ends the process the way it would without a handler.

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Number of undelivered interrupts kept per subscriber.
const CHANNEL_CAPACITY: usize = 4;

/// Exit status for a ctrl-c that no request was listening for (128 + SIGINT).
pub const INTERRUPT_EXIT_CODE: i32 = 130;

/// A source of user interrupt signals.
#[derive(Clone, Debug)]
pub struct Interrupts {
    sender: broadcast::Sender<()>,
}

impl Interrupts {
    /// Create a source with no signal handler attached.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Route ctrl-c into this source.
    ///
    /// Only SIGINT is captured. With no request in flight the process exits with
    /// [`INTERRUPT_EXIT_CODE`]. The handler is process-wide; installing a second one fails.
    pub fn install_ctrlc(&self) -> Result<()> {
        let interrupts = self.clone();
        ctrlc::set_handler(move || {
            interrupts.deliver_or_else(|| {
                std::process::exit(INTERRUPT_EXIT_CODE);
            });
        })
        .map_err(|e| Error::signal(format!("failed to install interrupt handler: {e}")))
    }

    /// Deliver an interrupt, or run `unheard` when nobody is listening.
    pub fn deliver_or_else(&self, unheard: impl FnOnce()) {
        if !self.trigger() {
            warn!("interrupt with no request in flight");
            unheard();
        }
    }

    /// Deliver an interrupt to every current subscriber.
    ///
    /// Returns whether anyone was listening.
    pub fn trigger(&self) -> bool {
        let delivered = self.sender.send(()).is_ok();
        debug!(delivered, "interrupt triggered");
        delivered
    }

    /// Start observing interrupts. Drop the receiver to stop.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.sender.subscribe()
    }

    /// Number of active subscribers.
    pub fn listeners(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for Interrupts {
    fn default() -> Self {
        Self::new()
    }
}
