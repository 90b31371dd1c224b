//! Progressive answer rendering.
//!
//! A [`Reveal`] walks an answer one character per tick. Each tick renders the
//! revealed prefix either verbatim (plain) or as Markdown followed by the
//! [`enhance`] pass (rich). [`revealer::Revealer`] drives reveals on a timer
//! and guarantees only one runs against a surface at a time.

pub mod clipboard;
pub mod enhance;
pub mod markdown;
pub mod revealer;

use std::sync::atomic::{ AtomicBool, Ordering };
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DisplayMode {
    /// Markdown plus math.
    #[default]
    Rich,
    /// Verbatim text.
    Plain,
}

/// Externally toggled display mode, read once per reveal tick.
#[derive(Debug, Clone, Default)]
pub struct ModeSwitch {
    plain: Arc<AtomicBool>,
}

impl ModeSwitch {
    pub fn new(mode: DisplayMode) -> Self {
        let switch = Self::default();
        switch.set(mode);
        switch
    }

    pub fn set(&self, mode: DisplayMode) {
        self.plain.store(mode == DisplayMode::Plain, Ordering::Relaxed);
    }

    pub fn get(&self) -> DisplayMode {
        if self.plain.load(Ordering::Relaxed) { DisplayMode::Plain } else { DisplayMode::Rich }
    }

    /// Flips the mode and returns the new one.
    pub fn toggle(&self) -> DisplayMode {
        let was_plain = self.plain.fetch_xor(true, Ordering::Relaxed);
        if was_plain { DisplayMode::Rich } else { DisplayMode::Plain }
    }
}

/// What the display surface shows after a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Plain(String),
    /// Enhanced HTML.
    Rich(String),
}

impl Frame {
    pub fn content(&self) -> &str {
        match self {
            Frame::Plain(text) | Frame::Rich(text) => text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealState {
    Idle,
    Revealing { shown: usize },
    Settled,
}

pub fn render_frame(text: &str, mode: DisplayMode) -> Frame {
    match mode {
        DisplayMode::Plain => Frame::Plain(text.to_string()),
        DisplayMode::Rich => Frame::Rich(enhance::enhance(&markdown::to_html(text))),
    }
}

/// Replaces literal `\n` escape sequences some providers leave in their text.
fn normalize(answer: &str) -> String {
    answer.replace("\\n", "\n")
}

#[derive(Debug, Clone)]
pub struct Reveal {
    source: String,
    /// Byte offset just past each character.
    ends: Vec<usize>,
    state: RevealState,
}

impl Reveal {
    pub fn new(answer: &str) -> Self {
        let source = normalize(answer);
        let ends = source.char_indices().map(|(i, c)| i + c.len_utf8()).collect();
        Self {
            source,
            ends,
            state: RevealState::Idle,
        }
    }

    pub fn state(&self) -> RevealState {
        self.state
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of ticks that reveal a character.
    pub fn len(&self) -> usize {
        self.ends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ends.is_empty()
    }

    pub fn revealed(&self) -> &str {
        match self.state {
            RevealState::Idle => "",
            RevealState::Revealing { shown } => &self.source[..self.ends[shown - 1]],
            RevealState::Settled => &self.source,
        }
    }

    /// Advances one tick. Once every character is shown, the next tick
    /// settles the reveal and, in rich mode, yields a final full render.
    /// Returns `None` when there is nothing left to show.
    pub fn tick(&mut self, mode: DisplayMode) -> Option<Frame> {
        let shown = match self.state {
            RevealState::Settled => return None,
            RevealState::Idle => 0,
            RevealState::Revealing { shown } => shown,
        };

        if shown < self.len() {
            self.state = RevealState::Revealing { shown: shown + 1 };
            return Some(render_frame(self.revealed(), mode));
        }

        self.state = RevealState::Settled;
        match mode {
            DisplayMode::Rich => Some(render_frame(&self.source, DisplayMode::Rich)),
            DisplayMode::Plain => None,
        }
    }
}
