//! Daily keyspace recount
//!
//! Pika only refreshes its Keyspace section when asked with `INFO KEYSPACE 1`.
//! A background thread issues that command on every instance once a day at
//! the configured local hour.

use std::io;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone, Timelike};
use tracing::{debug, info, warn};

use crate::client::{Connector, ControlPlaneExt};
use crate::discovery::Discovery;

/// Time from `now` until the next start of `hour` (0-23).
///
/// When `hour` is the current hour or already passed, the next day's
/// occurrence is used.
pub fn duration_until_hour<Tz: TimeZone>(hour: u32, now: DateTime<Tz>) -> Duration {
    let sub_hours = i64::from(hour) - i64::from(now.hour());
    let target = if sub_hours <= 0 {
        now.clone() + chrono::Duration::days(1) + chrono::Duration::hours(sub_hours)
    } else {
        now.clone() + chrono::Duration::hours(sub_hours)
    };
    let target = target
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(target);

    (target - now).to_std().unwrap_or_default()
}

/// Send `INFO KEYSPACE 1` to every discovered instance
pub fn stats_keyspace(discovery: &dyn Discovery, connector: &dyn Connector) {
    for instance in discovery.instances() {
        let mut conn = match connector.connect(&instance) {
            Ok(conn) => conn,
            Err(e) => {
                warn!("Keyspace stats: connecting to {} failed: {}", instance.addr, e);
                continue;
            }
        };
        match conn.info_keyspace(true) {
            Ok(_) => debug!("Keyspace recount started on {}", instance.addr),
            Err(e) => warn!("Keyspace stats: INFO KEYSPACE 1 on {} failed: {}", instance.addr, e),
        }
    }
}

/// Handle to the background recount thread
pub struct KeyspaceStatsTask {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl KeyspaceStatsTask {
    /// Start the task; a negative `hour` disables it
    pub fn spawn(hour: i32, discovery: Arc<dyn Discovery>, connector: Arc<dyn Connector>) -> io::Result<Self> {
        let Ok(hour) = u32::try_from(hour) else {
            info!("Keyspace stats disabled");
            return Ok(Self {
                stop: None,
                handle: None,
            });
        };

        let (stop, stopped) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name("keyspace-stats".to_string())
            .spawn(move || loop {
                let wait = duration_until_hour(hour, Local::now());
                debug!("Next keyspace recount in {:?}", wait);
                match stopped.recv_timeout(wait) {
                    Err(RecvTimeoutError::Timeout) => stats_keyspace(&*discovery, &*connector),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;

        info!("Keyspace stats scheduled daily at {:02}:00", hour);
        Ok(Self {
            stop: Some(stop),
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Signal the thread and wait for it to exit
    pub fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Keyspace stats thread panicked");
            }
        }
    }
}

impl Drop for KeyspaceStatsTask {
    fn drop(&mut self) {
        self.shutdown();
    }
}
