use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use usalpha_core::api::http::HttpTransport;
use usalpha_core::api::DashboardApi;
use usalpha_core::app::Dashboard;
use usalpha_core::chart::surface::SceneSurface;
use usalpha_core::config::Settings;
use usalpha_core::render::JsonDirTarget;
use usalpha_core::storage::PreferenceStore;

mod input;

#[derive(Debug, Parser)]
#[command(name = "usalpha_dashboard")]
struct Args {
    /// Dashboard API base URL. Overrides API_BASE_URL.
    #[arg(long)]
    api_base_url: Option<String>,

    /// Directory the rendered sections are written to. Overrides RENDER_OUT_DIR.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Render the first screen once and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let mut settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();
    if let Some(url) = args.api_base_url {
        settings.api_base_url = url;
    }
    if let Some(dir) = args.out_dir {
        settings.render_out_dir = dir;
    }

    if let Err(err) = run(&settings, args.once).await {
        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %format!("{err:#}"), "dashboard failed");
        return Err(err);
    }
    Ok(())
}

async fn run(settings: &Settings, once: bool) -> anyhow::Result<()> {
    let transport = HttpTransport::from_settings(settings)?;
    let api = DashboardApi::new(Arc::new(transport)).with_budget(settings.api_timeout);
    let target = JsonDirTarget::create(&settings.render_out_dir)?;
    let mut dashboard = Dashboard::new(
        api,
        Box::new(target),
        Box::new(SceneSurface::new()),
        PreferenceStore::new(&settings.preferences_path),
    );

    tracing::info!(
        api_base_url = %settings.api_base_url,
        out_dir = %settings.render_out_dir.display(),
        once,
        "dashboard starting"
    );

    let events = dashboard.initialize().await;
    if once {
        dashboard.finish_fetches().await;
        dashboard.teardown();
        return Ok(());
    }

    let (quit_tx, quit_rx) = oneshot::channel();
    tokio::spawn(input::pump(events, quit_tx));
    eprintln!("{}", input::HELP);

    dashboard
        .run(async {
            tokio::select! {
                _ = shutdown_signal() => {}
                _ = quit_rx => {}
            }
        })
        .await;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
