//! Daemon entrypoint: wires the key matcher, command dispatcher, update
//! loop, and protocol router onto a single event channel.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::sync::Once;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use core_dispatch::{
    standard_stack, CommandObserver, CommandQueue, DispatchContext, EnvironmentStack, Handler,
    Priority,
};
use core_driver::{
    BrailleDriver, DriverInputSource, DriverOwnership, NullDriver, ScreenChangeSource, ScreenSource,
    StaticScreenSource,
};
use core_events::{Event, EventSourceRegistry, KeyGroup, UpdateReason, EVENT_CHANNEL_CAP};
use core_keytable::{Command, KeyMatcher, KeyTable, MatchOutcome};
use core_protocol::requests::frame_type;
use core_protocol::{build_authenticator, ClientRegistry, Frame, ProtocolRouter, ProtocolServer};
use core_session::{Clipboard, ParameterBus, SessionManager, Window};
use core_update::{run_pass, UpdateScheduler};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

mod keytable_defaults;
mod texttable_defaults;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "braille-daemon", version, about = "Braille terminal daemon")]
struct Args {
    /// Optional preference file path (overrides discovery).
    #[arg(long = "config")]
    config: Option<PathBuf>,
    /// Override the Unix socket path the client protocol listens on.
    #[arg(long = "socket")]
    socket: Option<PathBuf>,
}

struct Startup {
    log_guard: Option<WorkerGuard>,
}

impl Startup {
    fn new() -> Self {
        Self { log_guard: None }
    }

    fn configure_logging(&mut self) {
        let log_dir = std::path::Path::new(".");
        let file_appender = tracing_appender::rolling::never(log_dir, "braille-daemon.log");
        let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
        match tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(nb_writer)
            .try_init()
        {
            Ok(_) => self.log_guard = Some(guard),
            Err(_) => {}
        }
    }

    fn install_panic_hook() {
        static HOOK: Once = Once::new();
        HOOK.call_once(|| {
            let default_panic = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                tracing::error!(target: "runtime.panic", ?info, "panic");
                default_panic(info);
            }));
        });
    }
}

/// No observers are registered by default; the protocol server attaches
/// one per subscribed client once frame-level command mirroring is wired.
struct NoopObserver;
impl CommandObserver for NoopObserver {
    fn on_command(&self, _command: Command) {}
}

fn load_key_table() -> Result<KeyTable> {
    core_keytable::compile(keytable_defaults::DEFAULT_KEYTABLE_SOURCE)
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("compiling built-in key table")
}

fn key_group_tag(group: KeyGroup) -> u8 {
    match group {
        KeyGroup::Routing => 0,
        KeyGroup::Braille => 1,
        KeyGroup::Navigation => 2,
        KeyGroup::Modifier => 3,
        KeyGroup::Driver(n) => 0x10 + n,
    }
}

fn encode_key_frame(event: core_events::KeyEvent) -> Frame {
    let mut payload = vec![key_group_tag(event.group)];
    payload.extend_from_slice(&event.number.to_be_bytes());
    payload.push(event.pressed as u8);
    Frame::new(frame_type::KEY, payload)
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut startup = Startup::new();
    startup.configure_logging();
    Startup::install_panic_hook();

    let args = Args::parse();
    info!(target: "runtime", "startup");

    let mut config = core_config::load_from(args.config.clone())?;
    if let Some(socket) = &args.socket {
        config.file.protocol.socket_path = socket.to_string_lossy().to_string();
    }

    let table = load_key_table()?;
    let default_ctx = table
        .context_id("default")
        .context("built-in key table has no 'default' context")?;

    let long_press_timeout = Duration::from_millis(config.file.input.long_press_ms as u64);
    let sticky_reset_timeout = Duration::from_millis(config.file.input.sticky_reset_ms as u64);
    let mut matcher = KeyMatcher::new(&table, default_ctx, long_press_timeout, sticky_reset_timeout);

    let driver_cell_count = 40u16;
    config.apply_display_context(core_config::DisplayContext::new(driver_cell_count));
    let ownership = DriverOwnership::new();
    let driver: Arc<Mutex<Box<dyn BrailleDriver>>> =
        Arc::new(Mutex::new(Box::new(NullDriver::new(driver_cell_count))));
    let screen: Arc<Mutex<Box<dyn ScreenSource>>> =
        Arc::new(Mutex::new(Box::new(StaticScreenSource::default())));

    let default_window = Window::new(0, 0, driver_cell_count);
    let mut sessions = SessionManager::new();
    let idx = sessions.get_or_create(1, default_window);
    sessions.set_active(idx);
    let active_vt = Arc::new(Mutex::new(1u32));

    let mut clipboard = Clipboard::new();
    let mut parameters = ParameterBus::new();
    let mut environments = EnvironmentStack::new();
    let mut toggles: HashMap<u16, bool> = HashMap::new();
    let mut handlers: Vec<Box<dyn Handler>> = standard_stack();
    let observers: Vec<Box<dyn CommandObserver>> = vec![Box::new(NoopObserver)];

    let mut queue = CommandQueue::new();
    let mut scheduler = UpdateScheduler::new(driver_cell_count);
    let glyph_table = texttable_defaults::build();

    let registry = ClientRegistry::new();
    let authenticator = build_authenticator(
        config.file.protocol.auth.clone(),
        config.file.protocol.keyfile_path.as_deref(),
    )?;
    let mut router = ProtocolRouter::new(authenticator, driver_cell_count);

    let (tx, mut rx) = mpsc::channel::<Event>(EVENT_CHANNEL_CAP);
    let mut registry_of_sources = EventSourceRegistry::new();
    registry_of_sources.register(core_events::TickEventSource::new(Duration::from_millis(
        config.file.update.refresh_quantum_ms as u64,
    )));
    registry_of_sources.register(ProtocolServer::new(
        config.file.protocol.socket_path.clone(),
        registry.clone(),
    ));
    registry_of_sources.register(DriverInputSource::new(driver.clone(), Duration::from_millis(20)));
    registry_of_sources.register(ScreenChangeSource::new(
        screen.clone(),
        active_vt.clone(),
        Duration::from_millis(100),
    ));
    let mut source_handles = registry_of_sources.spawn_all(&tx);

    info!(target: "runtime", socket = %config.file.protocol.socket_path, "entering event loop");

    while let Some(event) = rx.recv().await {
        match event {
            Event::Driver(core_events::DriverEvent::Key(key_event)) => {
                let vt = *active_vt.lock().expect("vt mutex poisoned");
                match router.route_key(vt, key_event.route_value()) {
                    Some(routed_client) => {
                        registry.send(routed_client, encode_key_frame(key_event));
                        core_events::KEYS_MATCHED.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                    }
                    None => {
                        let outcome = matcher.feed(key_event, std::time::Instant::now());
                        if let MatchOutcome::Command(command) = outcome {
                            queue.push(command, Priority::Normal);
                        }
                    }
                }
            }
            Event::Driver(core_events::DriverEvent::Online(online)) => {
                info!(target: "driver", online, "driver online state changed");
                scheduler.mark(UpdateReason::Resize);
            }
            Event::Driver(core_events::DriverEvent::Failure(reason)) => {
                warn!(target: "driver", reason = %reason, "driver failure reported");
            }
            Event::Client(client_event) => {
                handle_client_event(
                    client_event,
                    &mut parameters,
                    &mut router,
                    &registry,
                    &ownership,
                    &mut scheduler,
                );
            }
            Event::NeedsUpdate(reason) => {
                scheduler.mark(reason);
            }
            Event::Tick => {
                if let MatchOutcome::Command(command) = matcher.poll_timeout(std::time::Instant::now()) {
                    queue.push(command, Priority::Normal);
                }
                matcher.poll_sticky_reset(std::time::Instant::now());

                let mut dispatch_ctx = DispatchContext {
                    sessions: &mut sessions,
                    clipboard: &mut clipboard,
                    parameters: &mut parameters,
                    environments: &mut environments,
                    toggles: &mut toggles,
                    screen_columns: driver_cell_count,
                    margin: config.effective_window_margin,
                    default_window,
                };
                while let Some(command) = queue.pop() {
                    let outcome = core_dispatch::dispatch(command, &mut handlers, &mut dispatch_ctx, &observers);
                    if outcome.dirty {
                        scheduler.mark(UpdateReason::KeyCommand);
                    }
                    if outcome.quit {
                        let _ = tx.send(Event::Shutdown).await;
                    }
                }
                if let Some(session) = sessions.active() {
                    *active_vt.lock().expect("vt mutex poisoned") = session.vt;
                }

                if let Some(decision) = scheduler.consume() {
                    queue.suspend();
                    let outcome = run_pass(
                        &ownership,
                        &driver,
                        &screen,
                        &mut sessions,
                        &glyph_table,
                        config.effective_window_margin,
                        config.file.window.skip_blank_windows,
                        &decision,
                        router.passthrough_cells(),
                    );
                    queue.resume();
                    tracing::trace!(target: "update", ?outcome, "render pass complete");
                }
            }
            Event::Shutdown => {
                info!(target: "runtime", "shutdown requested");
                break;
            }
        }
    }

    rx.close();
    drop(tx);
    while let Some(handle) = source_handles.pop() {
        let _ = tokio::time::timeout(Duration::from_millis(200), handle).await;
    }
    Ok(())
}

fn handle_client_event(
    event: core_events::ClientEvent,
    parameters: &mut ParameterBus,
    router: &mut ProtocolRouter,
    registry: &ClientRegistry,
    ownership: &DriverOwnership,
    scheduler: &mut UpdateScheduler,
) {
    match event {
        core_events::ClientEvent::Connected { client_id } => {
            info!(target: "protocol", client_id, "client connected");
            let outcome = router.on_connect(client_id);
            for (target, frame) in outcome.replies {
                registry.send(target, frame);
            }
        }
        core_events::ClientEvent::Frame { client_id, frame_type, payload } => {
            let outcome = router.on_frame(client_id, Frame::new(frame_type, payload), parameters);
            for (target, frame) in outcome.replies {
                registry.send(target, frame);
            }
            if let Some(reason) = outcome.update {
                scheduler.mark(reason);
            }
            ownership.set_claimed(router.display_owner().is_some());
        }
        core_events::ClientEvent::Disconnected { client_id } => {
            parameters.unwatch_client(client_id);
            let outcome = router.on_disconnect(client_id);
            for (target, frame) in outcome.replies {
                registry.send(target, frame);
            }
            ownership.set_claimed(router.display_owner().is_some());
            info!(target: "protocol", client_id, "client disconnected");
        }
    }
}
