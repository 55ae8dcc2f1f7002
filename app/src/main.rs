mod commands;
mod view;

use anyhow::Context;
use backend::{
    lightningd::{LightningdAuth, LightningdClient, TlsOptions},
    mock::{demo_invoices, MockBackend},
    InvoiceBackend,
};
use commands::{Console, Credentials};
use config::{AppConfig, Keychain};
use invoice_sync::{spawn_refresh_timer, InvoiceStore, InvoiceSync, UpdateBus};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(env_filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn lightningd_auth(cfg: &AppConfig, keychain: &Keychain) -> LightningdAuth {
    // Config file first, then env, then the OS keychain
    let rune = cfg
        .lightningd
        .rune
        .clone()
        .or_else(|| std::env::var("LIGHTNINGD_RUNE").ok())
        .or_else(|| match keychain.get_secret(config::RUNE_SECRET_KEY) {
            Ok(rune) => rune,
            Err(e) => {
                tracing::warn!(error = %e, "Keychain lookup failed");
                None
            }
        });

    match rune {
        Some(rune) => LightningdAuth::Rune { rune },
        None => {
            tracing::warn!("No lightningd rune configured, connecting without authentication");
            LightningdAuth::None
        }
    }
}

async fn lightningd_tls(cfg: &AppConfig) -> anyhow::Result<TlsOptions> {
    let ca_cert_pem = match &cfg.lightningd.ca_cert {
        Some(path) => Some(
            tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read CA certificate {}", path.display()))?,
        ),
        None => None,
    };
    Ok(TlsOptions {
        ca_cert_pem,
        accept_invalid_certs: cfg.lightningd.accept_invalid_certs,
    })
}

async fn create_backend(
    cfg: &AppConfig,
    keychain: &Keychain,
) -> anyhow::Result<Arc<dyn InvoiceBackend>> {
    let backend: Arc<dyn InvoiceBackend> = match cfg.get_value("modules", "backend").as_deref() {
        Some("lightningd") => {
            tracing::info!(base_url = %cfg.lightningd.base_url, "Using lightningd backend");
            LightningdClient::new(
                cfg.lightningd.base_url.clone(),
                lightningd_auth(cfg, keychain),
                lightningd_tls(cfg).await?,
            )?
        }
        other => {
            if other != Some("mock") {
                tracing::warn!(backend = ?other, "Unknown backend module, falling back to mock");
            }
            tracing::info!("Using mock backend");
            MockBackend::with_invoices(demo_invoices(12))
        }
    };
    Ok(backend)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config_path = config::config_path()?;
    let cfg = config::load_from(&config_path).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });
    if cfg.get_value("modules", "frontend").as_deref() != Some("console") {
        tracing::warn!(
            frontend = %cfg.modules.frontend,
            "Only the console frontend is available, using it"
        );
    }

    let keychain = Keychain::default();
    let backend = create_backend(&cfg, &keychain).await?;
    if let Err(e) = backend.check_connectivity().await {
        tracing::warn!(error = %e, "Backend not reachable yet, will keep retrying on refresh");
    }

    let bus = UpdateBus::new();
    let store = Arc::new(InvoiceStore::new());
    let sync = InvoiceSync::new(backend, Arc::clone(&store), Handle::current());
    let sync_subscription = sync.attach(&bus);

    let period = Duration::from_secs(cfg.refresh.interval_secs.max(1));
    let timer = spawn_refresh_timer(bus.clone(), period);

    let input = commands::spawn_stdin_reader()?;
    let mut console = Console {
        bus: bus.clone(),
        store,
        view: view::InvoicesView::default(),
        credentials: Credentials {
            keychain,
            config_path,
        },
    };
    let result = console
        .run(input, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "Failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await;

    drop(sync_subscription);
    bus.shutdown();
    timer.abort();
    result
}
