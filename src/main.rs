mod app;
mod ui;

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app::App;
use presale_sync::config::{self, Settings};
use presale_sync::core::{Action, Notifier, NotifyLevel, Request};
use presale_sync::infrastructure::ethereum::{create_wallet, ProviderConfig};
use presale_sync::infrastructure::runtime::{
    RuntimeBridge, RuntimeCommand, RuntimeEvent, WorkerConfig,
};
use presale_sync::sync::{SyncClient, SyncView};

const DEFAULT_ENDPOINT: &str = "http://localhost:8545";
const LOG_ENV: &str = "PRESALE_LOG";

#[derive(Debug, Parser)]
#[command(
    name = "presale-sync",
    version,
    about = "Terminal client for the Crypto Devs NFT presale"
)]
struct Args {
    /// HTTP JSON-RPC endpoint (e.g. http://localhost:8545)
    #[arg(long)]
    rpc: Option<String>,

    /// WebSocket endpoint (e.g. ws://localhost:8546)
    #[arg(long)]
    ws: Option<String>,

    /// IPC path (e.g. ~/.ethereum/geth.ipc). Unix only.
    #[arg(long)]
    ipc: Option<PathBuf>,

    /// Config file (defaults to $PRESALE_CONFIG or the XDG config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Read the contract once, print the state and exit
    #[arg(long)]
    status: bool,

    /// Print --status output as JSON
    #[arg(long, requires = "status")]
    json: bool,

    /// Start the TUI without connecting the wallet
    #[arg(long)]
    no_connect: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = match args.config.as_deref() {
        Some(path) => config::load_from(path)?,
        None => config::load(),
    };
    let settings = config.settings()?;
    let endpoint = endpoint_from_args_and_config(&args, &config)?;
    let private_key = std::env::var(config::PRIVATE_KEY_ENV)
        .ok()
        .filter(|key| !key.trim().is_empty());

    init_tracing(args.status);
    info!(endpoint = %endpoint.display(), contract = %settings.contract_address, "starting");

    if args.status {
        return print_status(endpoint, private_key, settings, args.json);
    }

    let endpoint_display = endpoint.display();
    let runtime = RuntimeBridge::new(WorkerConfig {
        endpoint,
        private_key,
        settings: settings.clone(),
        auto_connect: !args.no_connect,
    })?;

    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(settings, endpoint_display);
    app.set_status("Connecting…", NotifyLevel::Info);

    let res = run_app(&mut terminal, app, runtime);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("{err:?}");
    }

    Ok(())
}

/// Log to a file while the TUI owns the terminal; to stderr in one-shot mode
fn init_tracing(to_stderr: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    if to_stderr {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .try_init();
        return;
    }

    let Some(path) = config::log_path() else {
        return;
    };
    match open_log_file(&path) {
        Ok(file) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        Err(err) => eprintln!("logging disabled: {err:#}"),
    }
}

fn open_log_file(path: &Path) -> Result<fs::File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log dir {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
    runtime: RuntimeBridge,
) -> Result<()> {
    let tick_rate = Duration::from_millis(200);
    let mut last_tick = Instant::now();

    loop {
        pump_background(&mut app, &runtime);
        terminal.draw(|f| ui::draw(f, &app))?;
        if app.should_quit {
            let _ = runtime.send(RuntimeCommand::Shutdown);
            return Ok(());
        }

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                handle_key(&mut app, key, &runtime);
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.on_tick();
            last_tick = Instant::now();
        }
    }
}

fn pump_background(app: &mut App, runtime: &RuntimeBridge) {
    for event in runtime.poll_events() {
        match event {
            RuntimeEvent::Ready { endpoint } => {
                app.apply_ready(endpoint);
                app.set_status("Provider ready", NotifyLevel::Info);
            }
            RuntimeEvent::State(view) => app.apply_view(view),
            RuntimeEvent::Notice(notice) => app.apply_notice(notice),
            RuntimeEvent::Error { message } => app.apply_error(message),
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent, runtime: &RuntimeBridge) {
    if key.kind != KeyEventKind::Press {
        return;
    }
    match app.handle_key(key) {
        Action::None | Action::OpenCommand | Action::CloseOverlay => {}
        Action::Quit => app.should_quit = true,
        Action::Notify(text, level) => app.set_status(text, level),
        Action::Dispatch(request) => {
            let command = match request {
                Request::Connect => RuntimeCommand::Connect,
                Request::Disconnect => RuntimeCommand::Disconnect,
                Request::Refresh => RuntimeCommand::Refresh,
                Request::Submit(kind) => RuntimeCommand::Submit(kind),
            };
            if let Err(err) = runtime.send(command) {
                app.apply_error(format!("{err:#}"));
            }
        }
    }
}

/// One-shot `--status`: resolve, read once, print
fn print_status(
    endpoint: ProviderConfig,
    private_key: Option<String>,
    settings: Settings,
    json: bool,
) -> Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let max_supply = settings.max_supply;
    let (view, notices) = rt.block_on(async move {
        let wallet = create_wallet(endpoint, private_key.as_deref()).await?;
        let (notifier, mut notices) = Notifier::channel();
        let client = Arc::new(SyncClient::new(wallet, settings, notifier));
        let view = client.read_once().await;
        drop(client);
        let mut collected = Vec::new();
        while let Ok(notice) = notices.try_recv() {
            collected.push(notice);
        }
        Ok::<_, anyhow::Error>((view, collected))
    })?;

    for notice in notices {
        warn!(text = %notice.text, "notice");
        eprintln!("{}", notice.text);
    }
    let view = view.map_err(|err| anyhow!("status read failed: {err}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status_json(&view, max_supply))?);
    } else {
        print_status_text(&view, max_supply);
    }
    Ok(())
}

fn status_json(view: &SyncView, max_supply: u64) -> serde_json::Value {
    let state = view.ui_state();
    serde_json::json!({
        "state": format!("{state:?}"),
        "headline": state.headline(),
        "account": view.session.address.map(|addr| addr.to_string()),
        "is_owner": view.session.is_owner,
        "presale_started": view.snapshot.presale_started,
        "presale_ended": view.snapshot.presale_ended,
        "presale_ends_at": view.snapshot.presale_ends_at,
        "owner": view.snapshot.owner.map(|addr| addr.to_string()),
        "token_ids_minted": view.snapshot.token_ids_minted,
        "max_supply": max_supply,
    })
}

fn print_status_text(view: &SyncView, max_supply: u64) {
    let state = view.ui_state();
    let account = view
        .session
        .address
        .map(|addr| addr.to_string())
        .unwrap_or_else(|| "--".to_string());
    println!("State     {state:?}");
    println!("          {}", state.headline());
    println!("Account   {account}");
    println!("Owner     {}", view.session.is_owner);
    println!("Started   {}", view.snapshot.presale_started);
    println!("Ended     {}", view.snapshot.presale_ended);
    println!(
        "Minted    {} / {}",
        view.snapshot.token_ids_minted, max_supply
    );
}

/// Pick one endpoint: CLI flags first, then the first usable config entry
fn endpoint_from_args_and_config(args: &Args, config: &config::Config) -> Result<ProviderConfig> {
    if let Some(ipc) = args.ipc.clone() {
        return ipc_endpoint(ipc);
    }
    if let Some(ws) = args.ws.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        return Ok(ProviderConfig::WebSocket(ws.to_string()));
    }
    if let Some(rpc) = args.rpc.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        return Ok(ProviderConfig::Http(normalize_http_endpoint(rpc)));
    }

    for entry in &config.endpoints {
        if let Some(path) = entry.ipc.as_deref().and_then(expand_path) {
            return ipc_endpoint(path);
        }
        if let Some(ws) = entry.ws.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            return Ok(ProviderConfig::WebSocket(ws.to_string()));
        }
        if let Some(rpc) = entry.rpc.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            return Ok(ProviderConfig::Http(normalize_http_endpoint(rpc)));
        }
    }

    Ok(ProviderConfig::Http(DEFAULT_ENDPOINT.to_string()))
}

#[cfg(unix)]
fn ipc_endpoint(path: PathBuf) -> Result<ProviderConfig> {
    Ok(ProviderConfig::Ipc(path))
}

#[cfg(not(unix))]
fn ipc_endpoint(_path: PathBuf) -> Result<ProviderConfig> {
    Err(anyhow!("IPC is not supported on this platform"))
}

fn normalize_http_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

fn expand_path(path: &str) -> Option<PathBuf> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(rest) = trimmed.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
            return Some(home.join(rest));
        }
    }

    let mut buf = PathBuf::from(trimmed);
    if buf.is_relative() {
        if let Ok(cwd) = std::env::current_dir() {
            buf = cwd.join(buf);
        }
    }
    Some(buf)
}
