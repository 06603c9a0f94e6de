//! Async event sources that bridge the synchronous driver/screen-source
//! traits onto the daemon's event channel. Both poll a shared, mutex-
//! guarded collaborator at a fixed interval rather than blocking a worker
//! thread on real hardware, since no concrete driver lives in this crate.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use core_events::{AsyncEventSource, DriverEvent, Event, UpdateReason};
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;

use crate::{BrailleDriver, ScreenSource};

/// Polls a driver's `poll_key`/`online` state and posts the corresponding
/// events. The interval is short enough that a real driver's buffered
/// input is drained promptly without busy-spinning.
pub struct DriverInputSource {
    driver: Arc<Mutex<Box<dyn BrailleDriver>>>,
    interval: Duration,
}

impl DriverInputSource {
    pub fn new(driver: Arc<Mutex<Box<dyn BrailleDriver>>>, interval: Duration) -> Self {
        Self { driver, interval }
    }
}

impl AsyncEventSource for DriverInputSource {
    fn name(&self) -> &'static str {
        "driver_input"
    }

    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
        let driver = self.driver;
        let interval = self.interval;
        tokio::spawn(async move {
            let mut last_online = None;
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let (key, online) = {
                    let mut guard = driver.lock().expect("driver mutex poisoned");
                    (guard.poll_key(), guard.online())
                };
                if let Some(key) = key {
                    if tx.send(Event::Driver(DriverEvent::Key(key))).await.is_err() {
                        break;
                    }
                }
                if last_online != Some(online) {
                    last_online = Some(online);
                    if tx.send(Event::Driver(DriverEvent::Online(online))).await.is_err() {
                        break;
                    }
                }
            }
        })
    }
}

/// Polls a screen source for the active virtual terminal and posts
/// `NeedsUpdate(ScreenChanged)` whenever captured content differs from
/// the last poll.
pub struct ScreenChangeSource {
    screen: Arc<Mutex<Box<dyn ScreenSource>>>,
    vt: Arc<Mutex<u32>>,
    interval: Duration,
}

impl ScreenChangeSource {
    pub fn new(screen: Arc<Mutex<Box<dyn ScreenSource>>>, vt: Arc<Mutex<u32>>, interval: Duration) -> Self {
        Self { screen, vt, interval }
    }
}

impl AsyncEventSource for ScreenChangeSource {
    fn name(&self) -> &'static str {
        "screen_change"
    }

    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
        let screen = self.screen;
        let vt = self.vt;
        let interval = self.interval;
        tokio::spawn(async move {
            let mut last: Option<(u16, u16, u16, u32, Vec<char>)> = None;
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let current_vt = *vt.lock().expect("vt mutex poisoned");
                let captured = {
                    let mut guard = screen.lock().expect("screen mutex poisoned");
                    guard.capture(current_vt)
                };
                let Some(region) = captured else { continue };
                let fingerprint = (
                    region.cursor_column,
                    region.cursor_row,
                    region.columns,
                    region.virtual_terminal,
                    region.characters.clone(),
                );
                if last.as_ref() != Some(&fingerprint) {
                    last = Some(fingerprint);
                    if tx.send(Event::NeedsUpdate(UpdateReason::ScreenChanged)).await.is_err() {
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NullDriver, StaticScreenSource};
    use core_session::ScreenRegion;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn driver_input_source_reports_online_transition() {
        let mut driver = NullDriver::new(10);
        driver.set_online(false);
        let driver: Arc<Mutex<Box<dyn BrailleDriver>>> = Arc::new(Mutex::new(Box::new(driver)));
        let source = DriverInputSource::new(driver, Duration::from_millis(5));
        let (tx, mut rx) = mpsc::channel(8);
        let handle = Box::new(source).spawn(tx.clone());

        let event = tokio::time::timeout(Duration::from_millis(200), rx.recv())
            .await
            .expect("received an event before timeout")
            .expect("channel open");
        assert!(matches!(event, Event::Driver(DriverEvent::Online(false))));

        drop(tx);
        let _ = tokio::time::timeout(Duration::from_millis(50), handle).await;
    }

    #[tokio::test]
    async fn screen_change_source_fires_once_per_distinct_capture() {
        let mut region = ScreenRegion::blank(4, 1, 1);
        region.characters[0] = 'a';
        let mut source = StaticScreenSource::default();
        source.region = Some(region);
        let screen: Arc<Mutex<Box<dyn ScreenSource>>> = Arc::new(Mutex::new(Box::new(source)));
        let vt = Arc::new(Mutex::new(1));
        let src = ScreenChangeSource::new(screen, vt, Duration::from_millis(5));
        let (tx, mut rx) = mpsc::channel(8);
        let handle = Box::new(src).spawn(tx.clone());

        let event = tokio::time::timeout(Duration::from_millis(200), rx.recv())
            .await
            .expect("received an event before timeout")
            .expect("channel open");
        assert!(matches!(event, Event::NeedsUpdate(UpdateReason::ScreenChanged)));

        drop(tx);
        let _ = tokio::time::timeout(Duration::from_millis(50), handle).await;
    }
}
