pub mod api;
pub mod throttle;
pub mod upload;

use crate::broker::Broker;
use crate::cli::ServeArgs;
use crate::history::ConversationStore;
use crate::llm::chat::new_providers;
use api::{ build_router, AppState };
use log::{ error, info, warn };
use std::error::Error;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use throttle::Throttle;
use upload::default_upload_dir;

pub struct Server {
    addr: SocketAddr,
    state: AppState,
    args: ServeArgs,
}

impl Server {
    pub fn new(args: ServeArgs) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let addr = format!("{}:{}", args.host, args.port).parse::<SocketAddr>()?;
        let providers = new_providers(&args)?;
        let broker = Broker::new(
            providers,
            args.temperature,
            Duration::from_secs(args.provider_timeout_secs)
        );

        let state = AppState {
            broker: Arc::new(broker),
            conversations: Arc::new(
                ConversationStore::with_limits(
                    args.session_scope,
                    args.history_capacity,
                    args.max_sessions,
                    Duration::from_secs(args.session_idle_secs)
                )
            ),
            throttle: Arc::new(Throttle::new(Duration::from_millis(args.min_interval_ms))),
            upload_dir: default_upload_dir(args.upload_dir.clone()),
        };

        Ok(Self { addr, state, args })
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        tokio::fs::create_dir_all(&self.state.upload_dir).await?;

        let static_dir = PathBuf::from(&self.args.static_dir);
        let static_dir = if static_dir.is_dir() {
            Some(static_dir)
        } else {
            warn!("Static dir '{}' not found; only /solve is served", self.args.static_dir);
            None
        };
        let app = build_router(self.state.clone(), static_dir, self.args.max_upload_bytes);

        if self.args.enable_tls {
            let (cert_path, key_path) = match (&self.args.tls_cert_path, &self.args.tls_key_path) {
                (Some(cert), Some(key)) => (cert, key),
                (Some(_), None) | (None, Some(_)) => {
                    error!("Both --tls-cert-path and --tls-key-path must be provided to enable TLS.");
                    return Err("Missing TLS certificate or key path".into());
                }
                (None, None) => {
                    error!("--enable-tls was set but no certificate/key paths provided.");
                    return Err("TLS enabled without cert/key".into());
                }
            };
            info!("TLS enabled. Loading certificate from '{}' and key from '{}'", cert_path, key_path);
            let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
                cert_path,
                key_path
            ).await?;

            info!("🚀 Shniro AI running on https://{}", self.addr);
            axum_server::bind_rustls(self.addr, tls_config).serve(app.into_make_service()).await?;
        } else {
            let listener = tokio::net::TcpListener::bind(self.addr).await?;
            info!("🚀 Shniro AI running on http://{}", self.addr);
            axum::serve(listener, app).await?;
        }

        Ok(())
    }
}
