//! Shared event types and channel plumbing for the daemon core.
//!
//! Every producer in the process (driver input, the protocol server's
//! accept loop, per-client read tasks, the refresh-quantum timer) posts
//! onto a single bounded channel consumed by the main loop. This keeps
//! command dispatch and display writes serialized without a central lock.

use std::fmt;
use std::sync::atomic::AtomicU64;
use std::time::Instant;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;

/// Capacity of the main event channel. Sized generously so a burst of
/// screen-change reports or client frames never blocks the driver input
/// task; backpressure still applies once this is exhausted.
pub const EVENT_CHANNEL_CAP: usize = 4096;

/// Process-wide telemetry. Atomic counters, relaxed ordering; inspected by
/// tests and, eventually, a status request over the protocol.
pub static FRAMES_FULL: AtomicU64 = AtomicU64::new(0);
pub static FRAMES_PAN_ONLY: AtomicU64 = AtomicU64::new(0);
pub static FRAMES_CURSOR_ONLY: AtomicU64 = AtomicU64::new(0);
pub static COMMANDS_REJECTED: AtomicU64 = AtomicU64::new(0);
pub static KEYS_MATCHED: AtomicU64 = AtomicU64::new(0);
pub static KEYS_DROPPED: AtomicU64 = AtomicU64::new(0);
pub static CLIENT_CONNECTS: AtomicU64 = AtomicU64::new(0);
pub static CLIENT_DISCONNECTS: AtomicU64 = AtomicU64::new(0);
pub static CLIENT_AUTH_FAILURES: AtomicU64 = AtomicU64::new(0);
pub static PARAMETER_UPDATES_BROADCAST: AtomicU64 = AtomicU64::new(0);
pub static CHANNEL_SEND_FAILURES: AtomicU64 = AtomicU64::new(0);

/// Top-level event consumed by the main loop.
#[derive(Debug, Clone)]
pub enum Event {
    Driver(DriverEvent),
    Client(ClientEvent),
    /// A mutation occurred that the update loop should fold into its next
    /// render pass; carries the reason for scheduling/merge decisions.
    NeedsUpdate(UpdateReason),
    /// Periodic refresh-quantum tick driving debounced redraws and timer
    /// expiry (long-press, sticky-modifier reset).
    Tick,
    Shutdown,
}

/// Why a render pass was requested. Consumed by `core-update`'s scheduler;
/// kept here so every producer (driver, dispatch, protocol) can post one
/// without depending on the update crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateReason {
    ScreenChanged,
    PreferenceChanged,
    KeyCommand,
    ClientWrite,
    Resize,
}

/// Events produced by the braille driver's input side.
#[derive(Debug, Clone)]
pub enum DriverEvent {
    Key(KeyEvent),
    /// The driver transitioned online/offline (cable pulled, device reset).
    Online(bool),
    /// A write or read failed; the update loop should mark the driver for
    /// reconstruction.
    Failure(String),
}

/// Events forwarded from an accepted client connection. `Frame` carries an
/// already-decoded frame (the read task's own decoder has already split
/// length-prefixed bytes into type/payload); the main loop never re-parses
/// wire bytes.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    Connected { client_id: u64 },
    Frame { client_id: u64, frame_type: u32, payload: Vec<u8> },
    Disconnected { client_id: u64 },
}

/// Optional hooks observing events at the loop boundary. Default
/// implementation is a no-op; must not block.
pub trait EventHooks: Send + Sync + 'static {
    fn pre_handle(&self, _event: &Event) {}
    fn post_handle(&self, _event: &Event) {}
}

pub struct NoopEventHooks;
impl EventHooks for NoopEventHooks {}

/// Implemented by any async event producer. Implementors spawn one
/// background task pushing `Event`s into the shared channel and must
/// terminate promptly once the channel closes.
pub trait AsyncEventSource: Send + 'static {
    fn name(&self) -> &'static str;
    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()>;
}

/// Registry of event sources, spawned together at startup.
#[derive(Default)]
pub struct EventSourceRegistry {
    sources: Vec<Box<dyn AsyncEventSource>>,
}

impl EventSourceRegistry {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    pub fn register<S: AsyncEventSource>(&mut self, src: S) {
        self.sources.push(Box::new(src));
    }

    /// Spawn all registered sources, returning their handles. Call once,
    /// after the channel is constructed and before the loop starts
    /// consuming. On shutdown, drop the sender before joining the handles
    /// so each source observes the closed channel and exits.
    pub fn spawn_all(&mut self, tx: &Sender<Event>) -> Vec<JoinHandle<()>> {
        let mut out = Vec::with_capacity(self.sources.len());
        for src in self.sources.drain(..) {
            let name = src.name();
            tracing::info!(target: "runtime.events", source = name, "spawning event source");
            out.push(src.spawn(tx.clone()));
        }
        out
    }
}

/// Refresh-quantum tick source; the update loop's debounce clock.
pub struct TickEventSource {
    interval: std::time::Duration,
}

impl TickEventSource {
    pub fn new(interval: std::time::Duration) -> Self {
        Self { interval }
    }
}

impl AsyncEventSource for TickEventSource {
    fn name(&self) -> &'static str {
        "tick"
    }
    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
        let dur = self.interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(dur);
            loop {
                interval.tick().await;
                if tx.send(Event::Tick).await.is_err() {
                    break;
                }
            }
        })
    }
}

// -----------------------------------------------------------------------
// Key model
// -----------------------------------------------------------------------

/// Scopes a `KeyName` declaration in a key table; also the namespace a raw
/// driver key number is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyGroup {
    Routing,
    Braille,
    Navigation,
    Modifier,
    Driver(u8),
}

/// A single raw key transition reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub group: KeyGroup,
    pub number: u16,
    pub pressed: bool,
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}:{}{}",
            self.group,
            self.number,
            if self.pressed { "+" } else { "-" }
        )
    }
}

impl KeyEvent {
    /// Pack this event into the 64-bit key value space that client accept/
    /// reject ranges are expressed over: group tag in the high bits, raw
    /// key number in the middle, pressed/released in the low bit.
    pub fn route_value(&self) -> u64 {
        let group_tag: u64 = match self.group {
            KeyGroup::Routing => 0,
            KeyGroup::Braille => 1,
            KeyGroup::Navigation => 2,
            KeyGroup::Modifier => 3,
            KeyGroup::Driver(n) => 0x10 + n as u64,
        };
        (group_tag << 32) | ((self.number as u64) << 1) | (self.pressed as u64)
    }
}

/// A single stamped key transition, as buffered by the matcher. `Instant`
/// is carried so long-press timeouts can be evaluated without re-reading
/// the clock at dispatch time.
#[derive(Debug, Clone, Copy)]
pub struct TimedKeyEvent {
    pub event: KeyEvent,
    pub timestamp: Instant,
}

bitflags::bitflags! {
    /// Sticky and held modifier keys. Distinct from `KeyGroup::Modifier`
    /// raw key identities: this is the *logical* modifier state applied to
    /// a composed command.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ModMask: u8 {
        const SHIFT   = 0b0000_0001;
        const CONTROL = 0b0000_0010;
        const META    = 0b0000_0100;
        const ALTGR   = 0b0000_1000;
        const GUI     = 0b0001_0000;
        const UPPER   = 0b0010_0000;
    }
}

/// Helper result type for fallible construction across the workspace.
pub type EventResult<T> = anyhow::Result<T>;
