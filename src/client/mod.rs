//! `shniro ask`: posts a question to a running broker and reveals the answer
//! in the terminal.

use std::error::Error;
use std::io::{ self, BufRead, IsTerminal, Write };
use std::path::Path;
use std::time::Duration;
use log::{ debug, info, warn };
use reqwest::{ multipart::{ Form, Part }, Client as HttpClient, header::{ HeaderMap, HeaderValue } };
use serde_json::Value;
use thiserror::Error;

use crate::cli::AskArgs;
use crate::render::clipboard::{ copy_buttons, SystemClipboard };
use crate::render::revealer::{ Revealer, Surface };
use crate::render::{ render_frame, DisplayMode, Frame, ModeSwitch };
use crate::server::api::SESSION_HEADER;

pub const THINKING_MESSAGE: &str = "⏳ Shniro is thinking...";

/// Response keys searched for the answer, in order.
const ANSWER_KEYS: [&str; 4] = ["answer", "result", "output", "text"];

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Neither a question nor an image was given")]
    NoInput,
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Response was not JSON: {0}")]
    NotJson(#[source] serde_json::Error),
    #[error("Response carried no answer")]
    EmptyAnswer,
    #[error("Could not read image: {0}")]
    Image(#[from] io::Error),
}

impl ClientError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ClientError::NoInput => "⚠️ Please enter a question or upload an image.",
            ClientError::Network(_) => "❌ Could not reach server.",
            ClientError::NotJson(_) => "❌ Server error.",
            ClientError::EmptyAnswer => "⚠️ No answer received.",
            ClientError::Image(_) => "❌ Could not read the image.",
        }
    }
}

/// First non-empty string under one of the known answer keys.
pub fn extract_answer(body: &Value) -> Option<String> {
    ANSWER_KEYS.iter()
        .filter_map(|key| body.get(*key).and_then(Value::as_str))
        .find(|answer| !answer.trim().is_empty())
        .map(str::to_string)
}

pub struct SolveClient {
    http: HttpClient,
    endpoint: String,
}

impl SolveClient {
    pub fn new(server: &str, session_id: Option<String>) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        if let Some(value) = session_id.as_deref().and_then(|id| HeaderValue::from_str(id).ok()) {
            headers.insert(SESSION_HEADER, value);
        }
        let http = HttpClient::builder().default_headers(headers).build()?;

        Ok(Self {
            http,
            endpoint: format!("{}/solve", server.trim_end_matches('/')),
        })
    }

    pub async fn solve(&self, prompt: Option<&str>, image: Option<&Path>) -> Result<String, ClientError> {
        let prompt = prompt.map(str::trim).filter(|p| !p.is_empty());
        if prompt.is_none() && image.is_none() {
            return Err(ClientError::NoInput);
        }

        let mut form = Form::new().text("prompt", prompt.unwrap_or_default().to_string());
        if let Some(path) = image {
            let bytes = tokio::fs::read(path).await?;
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "image".to_string());
            debug!("Attaching {} ({}, {} bytes)", file_name, mime, bytes.len());
            form = form.part("image", Part::bytes(bytes).file_name(file_name).mime_str(mime.as_ref())?);
        }

        let response = self.http.post(&self.endpoint).multipart(form).send().await?;
        if let Some(issued) = response.headers().get(SESSION_HEADER).and_then(|v| v.to_str().ok()) {
            info!("Server assigned session id {}; pass it with --session-id to continue", issued);
        }
        let body = response.bytes().await?;
        let value: Value = serde_json::from_slice(&body).map_err(ClientError::NotJson)?;

        extract_answer(&value).ok_or(ClientError::EmptyAnswer)
    }
}

/// Redraws the whole answer on every frame.
pub struct TerminalSurface<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> TerminalSurface<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write + Send> Surface for TerminalSurface<W> {
    fn show(&mut self, frame: &Frame) {
        let drawn = writeln!(self.out, "\x1B[2J\x1B[H{}", frame.content()).and_then(|_| self.out.flush());
        if let Err(e) = drawn {
            warn!("Failed to draw frame: {}", e);
        }
    }
}

/// Applies one line typed while an answer is revealed: `p`/`plain` and
/// `r`/`rich` select a mode, an empty line toggles. Returns the mode now in
/// effect, or `None` when the line was not a mode command.
pub fn apply_mode_command(switch: &ModeSwitch, line: &str) -> Option<DisplayMode> {
    match line.trim().to_ascii_lowercase().as_str() {
        "" => Some(switch.toggle()),
        "p" | "plain" => {
            switch.set(DisplayMode::Plain);
            Some(DisplayMode::Plain)
        }
        "r" | "rich" => {
            switch.set(DisplayMode::Rich);
            Some(DisplayMode::Rich)
        }
        _ => None,
    }
}

/// Follows mode commands on stdin for the rest of the process. Runs on a
/// plain thread since a blocked stdin read must not hold up runtime shutdown.
fn follow_mode_commands(switch: ModeSwitch) {
    let spawned = std::thread::Builder::new()
        .name("mode-toggle".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                match apply_mode_command(&switch, &line) {
                    Some(mode) => debug!("Display mode switched to {:?}", mode),
                    None => debug!("Ignoring input {:?}", line),
                }
            }
        });
    if let Err(e) = spawned {
        warn!("Live mode toggle unavailable: {}", e);
    }
}

pub async fn run_ask(args: AskArgs) -> Result<(), Box<dyn Error + Send + Sync>> {
    let client = SolveClient::new(&args.server, args.session_id.clone())?;

    println!("{}", THINKING_MESSAGE);
    let answer = match client.solve(args.prompt.as_deref(), args.image.as_deref()).await {
        Ok(answer) => answer,
        Err(e) => {
            warn!("Ask failed: {}", e);
            e.user_message().to_string()
        }
    };

    let mode = ModeSwitch::new(args.mode);
    if io::stdin().is_terminal() {
        info!("Press Enter to toggle rich/plain, or type 'p' / 'r'");
        follow_mode_commands(mode.clone());
    }

    let mut revealer = Revealer::new(
        TerminalSurface::new(io::stdout()),
        mode,
        Duration::from_millis(args.cadence_ms)
    );
    revealer.start(&answer).await;
    revealer.finish().await;

    if args.copy_code {
        let settled = render_frame(&answer, DisplayMode::Rich);
        let buttons = copy_buttons(settled.content());
        if buttons.is_empty() {
            info!("No code blocks to copy");
        }
        for button in &buttons {
            button.click(&SystemClipboard)?;
            println!("[{}] {} bytes", button.label(), button.code().len());
        }
    }

    Ok(())
}
