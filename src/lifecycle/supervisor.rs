//! Listener supervision.
//!
//! # Responsibilities
//! - Run a listener, and relaunch it with identical parameters whenever it
//!   returns (bind failure, missing certificate, runtime error)
//! - Wait between launches as the `RetryPolicy` dictates
//! - Stop relaunching once shutdown is triggered
//!
//! # Design Decisions
//! - One supervisor per listener; failure of one never affects another
//! - Default policy retries forever at a fixed interval, so a permanently
//!   broken listener loops, bounded only by that interval
//! - The policy is pluggable; the control flow below does not change with it
//! - A launch that stayed up for `healthy_after` resets the attempt count,
//!   so crashes spread over a long uptime never add up to a give-up

use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;

use crate::lifecycle::shutdown::Shutdown;
use crate::observability::metrics;
use crate::resilience::RetryPolicy;

/// Why a supervisor stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorExit {
    /// Shutdown was triggered.
    Stopped,
    /// The retry policy gave up after this many launches.
    GaveUp { attempts: u32 },
}

/// Uptime after which a launch counts as healthy.
pub const DEFAULT_HEALTHY_AFTER: Duration = Duration::from_secs(60);

/// Keeps one listener alive.
pub struct ListenerSupervisor<P> {
    name: &'static str,
    policy: P,
    shutdown: Shutdown,
    healthy_after: Duration,
}

impl<P: RetryPolicy> ListenerSupervisor<P> {
    pub fn new(name: &'static str, policy: P, shutdown: Shutdown) -> Self {
        Self {
            name,
            policy,
            shutdown,
            healthy_after: DEFAULT_HEALTHY_AFTER,
        }
    }

    pub fn with_healthy_after(mut self, healthy_after: Duration) -> Self {
        self.healthy_after = healthy_after;
        self
    }

    /// Supervise `launch` until shutdown or until the policy gives up.
    ///
    /// Each launch receives its own shutdown receiver so it can drain
    /// gracefully instead of being dropped mid-request.
    pub async fn run<F, Fut, E>(mut self, mut launch: F) -> SupervisorExit
    where
        F: FnMut(broadcast::Receiver<()>) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: Display,
    {
        let mut stop = self.shutdown.subscribe();
        let mut attempt: u32 = 0;

        loop {
            // Subscribe before checking the flag: a trigger that lands in
            // between is then either seen here or delivered to the launch.
            let launch_stop = self.shutdown.subscribe();
            if self.shutdown.is_triggered() {
                return SupervisorExit::Stopped;
            }

            attempt = attempt.saturating_add(1);
            tracing::debug!(listener = self.name, attempt, "Launching listener");
            let started = Instant::now();
            let result = launch(launch_stop).await;

            if self.shutdown.is_triggered() {
                tracing::info!(listener = self.name, "Listener stopped for shutdown");
                return SupervisorExit::Stopped;
            }

            match result {
                Ok(()) => tracing::warn!(listener = self.name, attempt, "Listener exited"),
                Err(e) => tracing::error!(listener = self.name, attempt, error = %e, "Listener failed"),
            }

            if started.elapsed() >= self.healthy_after {
                tracing::debug!(listener = self.name, uptime = ?started.elapsed(), "Listener was healthy, resetting attempts");
                attempt = 1;
            }

            let Some(delay) = self.policy.next_delay(attempt) else {
                tracing::error!(listener = self.name, attempts = attempt, "Giving up on listener");
                return SupervisorExit::GaveUp { attempts: attempt };
            };

            tracing::info!(listener = self.name, delay = ?delay, "Restarting listener after delay");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = stop.recv() => return SupervisorExit::Stopped,
            }
            metrics::record_listener_restart(self.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use crate::resilience::FixedInterval;

    const INTERVAL: Duration = Duration::from_millis(50);

    #[tokio::test]
    async fn always_failing_listener_is_relaunched_forever() {
        let shutdown = Shutdown::new();
        let launches = Arc::new(AtomicU32::new(0));

        let counter = launches.clone();
        let supervisor = ListenerSupervisor::new("test", FixedInterval::new(INTERVAL), shutdown.clone());
        let task = tokio::spawn(supervisor.run(move |_stop| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>("bind failed") }
        }));

        tokio::time::sleep(INTERVAL * 3 + INTERVAL / 2).await;
        let seen = launches.load(Ordering::SeqCst);
        assert!(seen >= 3, "expected at least 3 launches, saw {}", seen);
        assert!(seen <= 5, "relaunched faster than the interval: {}", seen);
        assert!(!task.is_finished(), "supervisor must keep running");

        shutdown.trigger();
        let exit = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("supervisor stops on shutdown")
            .unwrap();
        assert_eq!(exit, SupervisorExit::Stopped);
    }

    #[tokio::test]
    async fn capped_policy_gives_up() {
        let launches = Arc::new(AtomicU32::new(0));
        let counter = launches.clone();
        let policy = FixedInterval::new(Duration::from_millis(5)).with_max_attempts(3);

        let exit = ListenerSupervisor::new("test", policy, Shutdown::new())
            .run(move |_stop| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>("no certificate") }
            })
            .await;

        assert_eq!(exit, SupervisorExit::GaveUp { attempts: 3 });
        assert_eq!(launches.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn clean_exit_is_also_relaunched() {
        let shutdown = Shutdown::new();
        let launches = Arc::new(AtomicU32::new(0));
        let counter = launches.clone();
        let policy = FixedInterval::new(Duration::from_millis(5)).with_max_attempts(2);

        let exit = ListenerSupervisor::new("test", policy, shutdown)
            .run(move |_stop| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok::<(), String>(()) }
            })
            .await;

        assert_eq!(exit, SupervisorExit::GaveUp { attempts: 2 });
    }

    #[tokio::test]
    async fn running_listener_drains_on_shutdown() {
        let shutdown = Shutdown::new();
        let launches = Arc::new(AtomicU32::new(0));
        let counter = launches.clone();

        let supervisor = ListenerSupervisor::new("test", FixedInterval::new(INTERVAL), shutdown.clone());
        let task = tokio::spawn(supervisor.run(move |mut stop| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                let _ = stop.recv().await;
                Ok::<(), String>(())
            }
        }));

        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown.trigger();

        let exit = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("supervisor stops on shutdown")
            .unwrap();
        assert_eq!(exit, SupervisorExit::Stopped);
        assert_eq!(launches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn trigger_after_launch_reaches_listener() {
        let shutdown = Shutdown::new();
        let trigger = shutdown.clone();

        let supervisor = ListenerSupervisor::new("test", FixedInterval::new(INTERVAL), shutdown);
        let exit = tokio::time::timeout(
            Duration::from_secs(1),
            supervisor.run(move |mut stop| {
                // Fires after the supervisor's own check, before the
                // listener starts waiting.
                trigger.trigger();
                async move { stop.recv().await.map_err(|e| e.to_string()) }
            }),
        )
        .await
        .expect("listener must observe the trigger");

        assert_eq!(exit, SupervisorExit::Stopped);
    }

    #[tokio::test]
    async fn already_triggered_never_launches() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        let launches = Arc::new(AtomicU32::new(0));
        let counter = launches.clone();

        let exit = ListenerSupervisor::new("test", FixedInterval::new(INTERVAL), shutdown)
            .run(move |_stop| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok::<(), String>(()) }
            })
            .await;

        assert_eq!(exit, SupervisorExit::Stopped);
        assert_eq!(launches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn healthy_uptime_resets_attempts() {
        let shutdown = Shutdown::new();
        let launches = Arc::new(AtomicU32::new(0));
        let counter = launches.clone();
        let policy = FixedInterval::new(Duration::from_millis(5)).with_max_attempts(2);

        let supervisor = ListenerSupervisor::new("test", policy, shutdown.clone())
            .with_healthy_after(Duration::from_millis(20));
        let task = tokio::spawn(supervisor.run(move |_stop| {
            counter.fetch_add(1, Ordering::SeqCst);
            async {
                tokio::time::sleep(Duration::from_millis(30)).await;
                Err::<(), _>("crashed after a healthy run")
            }
        }));

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(!task.is_finished(), "healthy crashes must not exhaust the cap");
        assert!(launches.load(Ordering::SeqCst) > 2);

        shutdown.trigger();
        let exit = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("supervisor stops on shutdown")
            .unwrap();
        assert_eq!(exit, SupervisorExit::Stopped);
    }
}
