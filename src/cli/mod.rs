use clap::{ Parser, Subcommand };
use std::path::PathBuf;

use crate::broker::{ DEFAULT_PROVIDER_TIMEOUT, DEFAULT_TEMPERATURE };
use crate::history::{ SessionScope, DEFAULT_CAPACITY, DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_IDLE };
use crate::render::revealer::DEFAULT_CADENCE;
use crate::render::DisplayMode;
use crate::server::throttle::DEFAULT_MIN_INTERVAL;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the /solve broker server.
    Serve(ServeArgs),
    /// Send a question (and optional image) to a running broker and reveal the answer.
    Ask(AskArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    // --- Server Args ---
    /// Interface the HTTP server binds to.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port the HTTP server listens on.
    #[arg(long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Directory holding the single-page client. Served at `/`.
    #[arg(long, env = "STATIC_DIR", default_value = "public")]
    pub static_dir: String,

    /// Directory for transient image uploads. Defaults to the OS temp dir.
    #[arg(long, env = "UPLOAD_DIR")]
    pub upload_dir: Option<PathBuf>,

    /// Maximum accepted request body size in bytes.
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value = "10485760")]
    pub max_upload_bytes: usize,

    // --- Primary Text Provider Args (Groq) ---
    /// API key for the primary text provider.
    #[arg(long, env = "GROQ_API_KEY", default_value = "")]
    pub groq_api_key: String,

    /// Base URL for the primary text provider (OpenAI-compatible routes are appended).
    #[arg(long, env = "GROQ_BASE_URL", default_value = "https://api.groq.com")]
    pub groq_base_url: String,

    /// Model name for the primary text provider.
    #[arg(long, env = "GROQ_MODEL", default_value = "llama-3.1-8b-instant")]
    pub groq_model: String,

    // --- Vision / Fallback Provider Args (Gemini) ---
    /// API key for the image-capable and fallback provider.
    #[arg(long, env = "GEMINI_API_KEY", default_value = "")]
    pub gemini_api_key: String,

    /// Base URL for the image-capable and fallback provider.
    #[arg(long, env = "GEMINI_BASE_URL", default_value = "https://generativelanguage.googleapis.com")]
    pub gemini_base_url: String,

    /// Model name for the image-capable and fallback provider.
    #[arg(long, env = "GEMINI_MODEL", default_value = "gemini-2.5-flash")]
    pub gemini_model: String,

    // --- Broker Args ---
    /// Sampling temperature sent to the primary text provider.
    #[arg(long, env = "TEMPERATURE", default_value_t = DEFAULT_TEMPERATURE)]
    pub temperature: f32,

    /// Number of turns kept in the rolling conversation window.
    #[arg(long, env = "HISTORY_CAPACITY", default_value_t = DEFAULT_CAPACITY)]
    pub history_capacity: usize,

    /// Minimum interval between accepted requests per rate-limit key. 0 disables throttling.
    #[arg(long, env = "MIN_INTERVAL_MS", default_value_t = DEFAULT_MIN_INTERVAL.as_millis() as u64)]
    pub min_interval_ms: u64,

    /// Upper bound for a single outbound provider call.
    #[arg(long, env = "PROVIDER_TIMEOUT_SECS", default_value_t = DEFAULT_PROVIDER_TIMEOUT.as_secs())]
    pub provider_timeout_secs: u64,

    /// Whether conversation and rate-limit state is shared by all clients or keyed by `x-session-id`.
    #[arg(long, env = "SESSION_SCOPE", value_enum, default_value = "shared")]
    pub session_scope: SessionScope,

    /// Seconds a session-scope conversation may sit idle before it is dropped.
    #[arg(long, env = "SESSION_IDLE_SECS", default_value_t = DEFAULT_SESSION_IDLE.as_secs())]
    pub session_idle_secs: u64,

    /// Maximum number of live session-scope conversations.
    #[arg(long, env = "MAX_SESSIONS", default_value_t = DEFAULT_MAX_SESSIONS)]
    pub max_sessions: usize,

    // --- TLS Args ---
    /// Optional path to the TLS certificate file (PEM format). Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format). Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct AskArgs {
    /// Question text.
    #[arg(long, short = 'p')]
    pub prompt: Option<String>,

    /// Image to attach to the question.
    #[arg(long, short = 'i')]
    pub image: Option<PathBuf>,

    /// Display mode for the revealed answer.
    #[arg(long, value_enum, default_value = "rich")]
    pub mode: DisplayMode,

    /// Base URL of a running broker.
    #[arg(long, env = "SHNIRO_SERVER", default_value = "http://127.0.0.1:3000")]
    pub server: String,

    /// Session id sent as `x-session-id`.
    #[arg(long, env = "SHNIRO_SESSION")]
    pub session_id: Option<String>,

    /// Delay between reveal ticks in milliseconds.
    #[arg(long, default_value_t = DEFAULT_CADENCE.as_millis() as u64)]
    pub cadence_ms: u64,

    /// Copy every code block of the answer to the system clipboard once revealed.
    #[arg(long, default_value = "false")]
    pub copy_code: bool,
}
