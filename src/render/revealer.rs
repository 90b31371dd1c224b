use std::sync::Arc;
use std::time::Duration;
use log::debug;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{ Frame, ModeSwitch, Reveal, RevealState };

/// Default delay between reveal ticks.
pub const DEFAULT_CADENCE: Duration = Duration::from_millis(10);

/// Where reveal frames are drawn. Each frame replaces the previous one.
pub trait Surface: Send {
    fn show(&mut self, frame: &Frame);
}

struct ActiveReveal {
    cancel: CancellationToken,
    handle: JoinHandle<RevealState>,
}

/// Drives [`Reveal`]s against one surface on a fixed cadence. Starting a new
/// reveal cancels the previous one, so at most one writes to the surface.
pub struct Revealer<S: Surface + 'static> {
    surface: Arc<Mutex<S>>,
    mode: ModeSwitch,
    cadence: Duration,
    active: Option<ActiveReveal>,
}

impl<S: Surface + 'static> Revealer<S> {
    pub fn new(surface: S, mode: ModeSwitch, cadence: Duration) -> Self {
        Self {
            surface: Arc::new(Mutex::new(surface)),
            mode,
            cadence,
            active: None,
        }
    }

    pub fn surface(&self) -> Arc<Mutex<S>> {
        Arc::clone(&self.surface)
    }

    /// Begins revealing `answer`. Any reveal still running is cancelled and
    /// has stopped writing before the new one draws its first frame.
    pub async fn start(&mut self, answer: &str) {
        self.cancel().await;

        let cancel = CancellationToken::new();
        let reveal = Reveal::new(answer);
        debug!("Revealing {} characters", reveal.len());
        let handle = tokio::spawn(
            run_reveal(reveal, Arc::clone(&self.surface), self.mode.clone(), self.cadence, cancel.clone())
        );
        self.active = Some(ActiveReveal { cancel, handle });
    }

    /// Stops the running reveal, if any, and returns the state it stopped in.
    pub async fn cancel(&mut self) -> Option<RevealState> {
        let active = self.active.take()?;
        active.cancel.cancel();
        active.handle.await.ok()
    }

    /// Waits for the running reveal to settle.
    pub async fn finish(&mut self) -> Option<RevealState> {
        let active = self.active.take()?;
        active.handle.await.ok()
    }
}

impl<S: Surface + 'static> Drop for Revealer<S> {
    fn drop(&mut self) {
        if let Some(active) = &self.active {
            active.cancel.cancel();
        }
    }
}

async fn run_reveal<S: Surface>(
    mut reveal: Reveal,
    surface: Arc<Mutex<S>>,
    mode: ModeSwitch,
    cadence: Duration,
    cancel: CancellationToken
) -> RevealState {
    loop {
        if cancel.is_cancelled() {
            break;
        }
        {
            // frames are drawn under the lock so a cancelled reveal can't
            // interleave with its successor
            let mut surface = surface.lock().await;
            if cancel.is_cancelled() {
                break;
            }
            if let Some(frame) = reveal.tick(mode.get()) {
                surface.show(&frame);
            }
        }
        if reveal.state() == RevealState::Settled {
            break;
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(cadence) => {}
        }
    }
    reveal.state()
}
