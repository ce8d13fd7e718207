// crates/edge/src/cli.rs

use crate::{
    content::{ContentStore, WordPressStore},
    error::EdgeError,
    proxy::Upstream,
    router::build_app_router,
    state::AppState,
};
use adapt::ssr::{RenderClient, RenderLimits, RenderRuntime, RuntimeSources};
use clap::{builder::ValueHint, Parser, Subcommand};
use domain::{setting::Settings, SlugRegistry};
use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::{error, info};

pub type Result<T> = std::result::Result<T, EdgeError>;

/// Vitrine: server-side rendering host for the marketing site.
#[tokio::main(flavor = "multi_thread")]
#[tracing::instrument(skip_all)]
pub async fn start() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Start(start) => do_start(start).await,
    };

    result.map_or_else(
        |e| {
            error!("Failed to start Vitrine: {}", e);
            ExitCode::FAILURE
        },
        |_| {
            info!("Vitrine stopped");
            ExitCode::SUCCESS
        },
    )
}

#[tracing::instrument(skip_all)]
async fn do_start(start: StartCmd) -> Result<()> {
    let then = Instant::now();
    let process = StartProcess::<CommandIssued>::parse_settings_file(start)?;
    info!("Settings parsed in {} milliseconds", then.elapsed().as_millis());

    let then = Instant::now();
    let process = process.build_slug_tables()?;
    info!("Slug tables built in {} milliseconds", then.elapsed().as_millis());

    let then = Instant::now();
    let process = process.load_renderer()?;
    info!("Server bundle loaded in {} milliseconds", then.elapsed().as_millis());

    let process = process.start_server().await?;
    process.wait().await
}

#[derive(Parser, Debug)]
#[command(name = "vitrine", version, about = "SSR host for the marketing site")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the site found in the specified directory
    Start(StartCmd),
}

#[derive(Parser, Debug)]
pub struct StartCmd {
    /// Site directory holding `settings.toml` (or set VITRINE_DIR)
    #[arg(
        value_name = "DIR",
        env = "VITRINE_DIR",
        required = true,
        value_hint = ValueHint::DirPath,
        value_parser = dir_must_exist
    )]
    pub dir: PathBuf,

    /// Listening port, overrides `server.port`
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// CMS origin, overrides `upstream.origin`
    #[arg(long, env = "CONTENT_API_ORIGIN", value_hint = ValueHint::Url)]
    pub api_origin: Option<String>,

    /// Public site origin, overrides `site.origin`
    #[arg(long, env = "SITE_ORIGIN", value_hint = ValueHint::Url)]
    pub site_origin: Option<String>,
}

fn dir_must_exist(s: &str) -> std::result::Result<PathBuf, String> {
    let p = PathBuf::from(s);
    if !p.exists() {
        return Err(format!("Not found: {}", p.display()));
    }
    if !p.is_dir() {
        return Err(format!("Not a directory: {}", p.display()));
    }
    Ok(p)
}

/// Read `<dir>/settings.toml` and apply command-line overrides.
pub fn load_settings(command: &StartCmd) -> Result<Settings> {
    let path = command.dir.join("settings.toml");
    if !path.exists() {
        return Err(EdgeError::Config(format!(
            "settings.toml not found at {}",
            path.display()
        )));
    }

    let text = std::fs::read_to_string(&path)
        .map_err(|err| EdgeError::Config(format!("Failed reading {}: {}", path.display(), err)))?;

    let mut settings: Settings = toml::from_str(&text).map_err(|err| {
        EdgeError::Config(format!(
            "Invalid settings.toml at {}: {}",
            path.display(),
            err
        ))
    })?;

    if let Some(port) = command.port {
        settings.server.port = port;
    }
    if let Some(origin) = &command.api_origin {
        settings.upstream.origin = origin.clone();
    }
    if let Some(origin) = &command.site_origin {
        settings.site.origin = origin.clone();
    }

    Ok(settings)
}

fn resolve_in(dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        dir.join(path)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Start process state machine
// ─────────────────────────────────────────────────────────────────────────────

trait ProcessState {}

struct CommandIssued;

struct SettingsLoaded {
    command: StartCmd,
    settings: Settings,
}

struct TablesBuilt {
    command: StartCmd,
    settings: Settings,
    slugs: Arc<SlugRegistry>,
}

struct RendererReady {
    command: StartCmd,
    settings: Settings,
    slugs: Arc<SlugRegistry>,
    renderer: RenderClient,
}

struct ServerStarted {
    renderer: RenderClient,
    server: tokio::task::JoinHandle<std::io::Result<()>>,
}

impl ProcessState for CommandIssued {}
impl ProcessState for SettingsLoaded {}
impl ProcessState for TablesBuilt {}
impl ProcessState for RendererReady {}
impl ProcessState for ServerStarted {}

struct StartProcess<S: ProcessState> {
    state: S,
}

impl StartProcess<CommandIssued> {
    #[tracing::instrument(skip_all)]
    fn parse_settings_file(command: StartCmd) -> Result<StartProcess<SettingsLoaded>> {
        let settings = load_settings(&command)?;
        Ok(StartProcess {
            state: SettingsLoaded { command, settings },
        })
    }
}

impl StartProcess<SettingsLoaded> {
    #[tracing::instrument(skip_all)]
    fn build_slug_tables(self) -> Result<StartProcess<TablesBuilt>> {
        let slugs = self.state.settings.slug_registry()?;
        info!(categories = self.state.settings.categories.len(), "slug tables valid");

        Ok(StartProcess {
            state: TablesBuilt {
                command: self.state.command,
                settings: self.state.settings,
                slugs: Arc::new(slugs),
            },
        })
    }
}

impl StartProcess<TablesBuilt> {
    /// Load the server bundle and detect its entry point; a bundle without
    /// one stops startup here.
    #[tracing::instrument(skip_all)]
    fn load_renderer(self) -> Result<StartProcess<RendererReady>> {
        let dir = &self.state.command.dir;
        let ssr = &self.state.settings.ssr;

        let sources = RuntimeSources {
            bundle: resolve_in(dir, &ssr.bundle),
            template: resolve_in(dir, &ssr.template),
            site_origin: self.state.settings.site.origin.clone(),
        };
        let limits = RenderLimits {
            loop_iteration_limit: ssr.loop_iteration_limit,
            max_ticks: ssr.max_ticks,
        };

        let runtime = RenderRuntime::load(&sources, Arc::clone(&self.state.slugs), limits)?;
        let renderer = RenderClient::spawn(
            runtime,
            ssr.render_workers,
            Duration::from_millis(ssr.render_timeout_ms),
        )?;

        Ok(StartProcess {
            state: RendererReady {
                command: self.state.command,
                settings: self.state.settings,
                slugs: self.state.slugs,
                renderer,
            },
        })
    }
}

impl StartProcess<RendererReady> {
    #[tracing::instrument(skip_all)]
    async fn start_server(self) -> Result<StartProcess<ServerStarted>> {
        let settings = self.state.settings;
        let dir = self.state.command.dir;
        let timeout = Duration::from_millis(settings.upstream.timeout_ms);

        let store: Arc<dyn ContentStore> =
            Arc::new(WordPressStore::new(&settings.upstream.origin, timeout)?);
        let upstream = Upstream::new(&settings.upstream.origin, timeout)?;
        let assets_dir = settings.ssr.assets_dir.as_ref().map(|p| resolve_in(&dir, p));
        let addr = SocketAddr::new(settings.server.ip, settings.server.port);

        let state = AppState::new(
            Arc::new(settings),
            self.state.slugs,
            self.state.renderer.clone(),
            store,
            upstream,
        );
        let app = build_app_router(state, assets_dir);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("Listening on http://{}", listener.local_addr()?);

        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
        });

        Ok(StartProcess {
            state: ServerStarted {
                renderer: self.state.renderer,
                server,
            },
        })
    }
}

impl StartProcess<ServerStarted> {
    #[tracing::instrument(skip_all)]
    async fn wait(self) -> Result<()> {
        let served = self
            .state
            .server
            .await
            .map_err(|e| EdgeError::Config(format!("server task failed: {e}")))?;
        self.state.renderer.stop();
        served?;
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
