//! Startup wiring: relay spawn, dashboard generation, listener sharding.

use std::{fs, future::Future, net::SocketAddr, pin::Pin, sync::Arc};

use anyhow::Context;
use bytes::Bytes;
use framewall_core::{
    FrameRegistry, RegistryBuilder,
    bus::BusConnector,
    dashboard::{AddressRewrite, Dashboard, generate_panels, shard_count},
    placeholder::{self, placeholder_jpeg},
    relay::SubscriberWorker,
};
use futures_util::future::try_join_all;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::{
    config::Config,
    provisioning::{self, IniMode},
    routes::create_router,
    state::AppState,
    tls,
};

/// Register every configured topic and spawn one subscriber worker per
/// topic whose initial connect succeeds.
///
/// All topics get a registry slot regardless of connect outcome, so a
/// topic whose publisher is down still has a stream endpoint serving the
/// placeholder. A failed connect is logged and that topic is skipped; it
/// never blocks the others.
pub async fn spawn_relay(
    config: &Config,
    connector: &dyn BusConnector,
) -> anyhow::Result<(Arc<FrameRegistry>, Vec<JoinHandle<()>>)> {
    let mut builder = RegistryBuilder::new(config.relay.buffer_capacity);
    let mut slots = Vec::with_capacity(config.subscriptions.len());
    for subscription in &config.subscriptions {
        let buffer = builder
            .register(&subscription.topic)
            .with_context(|| format!("registering topic {:?}", subscription.topic))?;
        slots.push((subscription.clone(), buffer));
    }
    let registry = Arc::new(builder.build());

    let mut workers = Vec::with_capacity(slots.len());
    for (subscription, buffer) in slots {
        match connector.connect(&subscription).await {
            Ok(subscriber) => {
                info!(
                    topic = %subscription.topic,
                    endpoint = %subscription.endpoint,
                    "subscribed"
                );
                let worker = SubscriberWorker::new(subscription.topic, buffer, subscriber);
                workers.push(tokio::spawn(worker.run()));
            }
            Err(err) => {
                error!(
                    topic = %subscription.topic,
                    endpoint = %subscription.endpoint,
                    error = %err,
                    "initial subscribe failed, topic will serve placeholder"
                );
            }
        }
    }

    Ok((registry, workers))
}

/// Generate the per-topic dashboard from the configured template and write
/// it to the output path. A no-op when no template is configured.
pub fn provision_dashboard(config: &Config) -> anyhow::Result<()> {
    let (Some(template_path), Some(output_path)) = (
        config.dashboard.template_path.as_ref(),
        config.dashboard.output_path.as_ref(),
    ) else {
        info!("no dashboard template configured, skipping dashboard generation");
        return Ok(());
    };

    let raw = fs::read_to_string(template_path)
        .with_context(|| format!("reading dashboard template {}", template_path.display()))?;
    let mut dashboard: Dashboard = serde_json::from_str(&raw)
        .with_context(|| format!("parsing dashboard template {}", template_path.display()))?;

    let rewrite = AddressRewrite {
        host: config.dashboard.public_host.clone(),
        https: !config.server.dev_mode,
    };
    generate_panels(
        &mut dashboard,
        &config.dashboard.template_token,
        &config.topics(),
        &rewrite,
        config.server.streams_per_port,
    )
    .context("generating dashboard panels")?;

    provisioning::write_dashboard(&dashboard, output_path)?;
    Ok(())
}

/// Run the datasource and INI generators when provisioning is configured.
///
/// In production the in-memory server PEM material is installed next to the
/// generated INI so the dashboard stack can reference it by path.
pub fn run_provisioning(config: &Config) -> anyhow::Result<()> {
    let Some(provisioning) = config.provisioning.as_ref() else {
        return Ok(());
    };

    let ini_mode = if config.server.dev_mode {
        IniMode::Dev
    } else {
        let tls = config
            .security
            .tls
            .as_ref()
            .context("provisioning in production mode requires TLS material")?;
        let install_dir = provisioning
            .ini_output
            .parent()
            .map(std::path::Path::to_path_buf)
            .unwrap_or_default();
        fs::create_dir_all(&install_dir)
            .with_context(|| format!("creating {}", install_dir.display()))?;
        let cert_file = install_dir.join("server_cert.pem");
        let key_file = install_dir.join("server_key.pem");
        fs::write(&cert_file, &tls.cert_pem)
            .with_context(|| format!("writing {}", cert_file.display()))?;
        fs::write(&key_file, &tls.key_pem)
            .with_context(|| format!("writing {}", key_file.display()))?;
        IniMode::Prod {
            cert_file,
            key_file,
        }
    };

    provisioning::run(provisioning, &ini_mode, &config.server.host)?;
    Ok(())
}

/// Render the pre-encoded placeholder frame served before the first real
/// frame arrives.
pub fn build_placeholder() -> anyhow::Result<Bytes> {
    placeholder_jpeg(placeholder::DEFAULT_WIDTH, placeholder::DEFAULT_HEIGHT)
        .context("rendering placeholder frame")
}

/// Bind and serve every shard listener until one of them fails.
///
/// Shard `n` listens on `base_port + n`; each serves the full router, so
/// sharding only spreads connection load. Production mode terminates TLS in
/// process and refuses to start without certificate material.
pub async fn serve(
    config: Arc<Config>,
    registry: Arc<FrameRegistry>,
    placeholder: Bytes,
) -> anyhow::Result<()> {
    let serving_tls = !config.server.dev_mode;
    let acceptor = if serving_tls {
        let material = config
            .security
            .tls
            .as_ref()
            .context("production mode requires [security.tls] certificate material")?;
        Some(tls::create_tls_acceptor(material).context("building TLS acceptor")?)
    } else {
        None
    };

    let shards = shard_count(registry.len(), config.server.streams_per_port);
    if registry.is_empty() {
        warn!("no subscriptions configured, serving discovery endpoints only");
    }
    info!(
        topics = registry.len(),
        shards,
        base_port = config.server.base_port,
        tls = serving_tls,
        "starting listeners"
    );

    let state = AppState::new(registry, Arc::clone(&config), placeholder);

    let mut listeners: Vec<Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>> =
        Vec::with_capacity(shards);
    for shard in 0..shards {
        let port = config.server.base_port + shard as u16;
        let addr: SocketAddr = format!("{}:{port}", config.server.host)
            .parse()
            .with_context(|| format!("invalid bind address {}:{port}", config.server.host))?;
        let router = create_router(state.clone(), serving_tls);

        match &acceptor {
            Some(acceptor) => {
                let acceptor = acceptor.clone();
                listeners.push(Box::pin(async move {
                    info!(%addr, shard, "listening (https)");
                    axum_server::bind_rustls(addr, acceptor)
                        .serve(router.into_make_service())
                        .await
                        .with_context(|| format!("serving https on {addr}"))
                }));
            }
            None => {
                listeners.push(Box::pin(async move {
                    let listener = tokio::net::TcpListener::bind(addr)
                        .await
                        .with_context(|| format!("binding {addr}"))?;
                    info!(%addr, shard, "listening (http)");
                    axum::serve(listener, router)
                        .await
                        .with_context(|| format!("serving http on {addr}"))
                }));
            }
        }
    }

    try_join_all(listeners).await?;
    Ok(())
}
