use pretty_assertions::assert_eq;
use shniro::render::revealer::{ Revealer, Surface };
use shniro::render::{ DisplayMode, Frame, ModeSwitch, RevealState };
use std::sync::{ Arc, Mutex };
use std::time::Duration;
use tokio::time::Instant;

#[derive(Clone, Default)]
struct Screen {
    frames: Arc<Mutex<Vec<(Instant, Frame)>>>,
}

impl Screen {
    fn frames(&self) -> Vec<Frame> {
        self.frames.lock().unwrap().iter().map(|(_, f)| f.clone()).collect()
    }
}

impl Surface for Screen {
    fn show(&mut self, frame: &Frame) {
        self.frames.lock().unwrap().push((Instant::now(), frame.clone()));
    }
}

const TICK: Duration = Duration::from_millis(10);

#[tokio::test(start_paused = true)]
async fn plain_hello_reveals_one_character_per_tick() {
    let screen = Screen::default();
    let mut revealer = Revealer::new(screen.clone(), ModeSwitch::new(DisplayMode::Plain), TICK);

    let started = Instant::now();
    revealer.start("Hello").await;
    assert_eq!(revealer.finish().await, Some(RevealState::Settled));

    let expected: Vec<Frame> = ["H", "He", "Hel", "Hell", "Hello"]
        .into_iter()
        .map(|s| Frame::Plain(s.into()))
        .collect();
    assert_eq!(screen.frames(), expected);

    let times: Vec<Duration> = screen.frames
        .lock()
        .unwrap()
        .iter()
        .map(|(at, _)| *at - started)
        .collect();
    assert_eq!(times, (0..5).map(|i| TICK * i).collect::<Vec<_>>());
}

#[tokio::test(start_paused = true)]
async fn rich_bold_shows_raw_prefix_then_strong() {
    let screen = Screen::default();
    let mut revealer = Revealer::new(screen.clone(), ModeSwitch::new(DisplayMode::Rich), TICK);

    revealer.start("**bold**").await;
    revealer.finish().await;

    let frames = screen.frames();
    assert_eq!(frames.len(), 9);
    assert!(frames.iter().all(|f| matches!(f, Frame::Rich(_))));
    assert!(frames[3].content().contains("**bo"), "{}", frames[3].content());
    assert!(frames[8].content().contains("<strong>bold</strong>"), "{}", frames[8].content());
}

#[tokio::test(start_paused = true)]
async fn mode_toggle_applies_to_the_next_tick() {
    let screen = Screen::default();
    let mode = ModeSwitch::new(DisplayMode::Rich);
    let mut revealer = Revealer::new(screen.clone(), mode.clone(), TICK);

    revealer.start("abcdef").await;
    tokio::time::sleep(TICK * 2 + TICK / 2).await;
    mode.set(DisplayMode::Plain);
    revealer.finish().await;

    let frames = screen.frames();
    assert!(matches!(frames[0], Frame::Rich(_)));
    assert!(matches!(frames[2], Frame::Rich(_)));
    assert_eq!(frames[3], Frame::Plain("abcd".into()));
    // plain mode has no settling pass
    assert_eq!(frames.last(), Some(&Frame::Plain("abcdef".into())));
    assert_eq!(frames.len(), 6);
}

#[tokio::test(start_paused = true)]
async fn new_answer_replaces_running_reveal() {
    let screen = Screen::default();
    let mut revealer = Revealer::new(screen.clone(), ModeSwitch::new(DisplayMode::Plain), TICK);

    revealer.start("first answer").await;
    tokio::time::sleep(TICK * 3 + TICK / 2).await;
    revealer.start("second").await;
    tokio::time::sleep(Duration::from_secs(1)).await;

    let frames = screen.frames();
    assert_eq!(&frames[..4], &[
        Frame::Plain("f".into()),
        Frame::Plain("fi".into()),
        Frame::Plain("fir".into()),
        Frame::Plain("firs".into()),
    ]);
    assert!(frames[4..].iter().all(|f| "second".starts_with(f.content())));
    assert_eq!(frames.last(), Some(&Frame::Plain("second".into())));
    assert_eq!(frames.len(), 4 + 6);
}
