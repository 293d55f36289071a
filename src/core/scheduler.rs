use crate::core::ent::Event;
use chrono::Local;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

struct Running {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Drives the simulator: emits one [`Event::Tick`] per period between
/// [`Scheduler::start`] and [`Scheduler::stop`].
pub struct Scheduler {
    period: Duration,
    running: Option<Running>,
}

impl Scheduler {
    pub fn new(period: Duration) -> Scheduler {
        Scheduler {
            period,
            running: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .map(|r| !r.handle.is_finished())
            .unwrap_or(false)
    }

    /// Spawn the timer task. The first tick arrives one period after the call.
    /// Returns `false` without doing anything if the scheduler already runs.
    pub fn start(&mut self, tx: mpsc::Sender<Event>) -> bool {
        if self.is_running() {
            tracing::warn!("scheduler already running, ignoring start");
            return false;
        }
        let period = self.period;
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::debug!(?period, "scheduler started");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if tx.send(Event::Tick(Local::now())).await.is_err() {
                            tracing::info!("tick receiver closed, scheduler exiting");
                            break;
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        tracing::debug!("scheduler shutdown signal received");
                        break;
                    }
                }
            }
        });
        self.running = Some(Running { shutdown, handle });
        true
    }

    /// Stop the timer task and wait for it to finish. No tick is delivered
    /// after this resolves.
    pub async fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            let _ = running.shutdown.send(true);
            if let Err(e) = running.handle.await {
                tracing::error!("scheduler task failed: {e}");
            }
            tracing::debug!("scheduler stopped");
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: Duration = Duration::from_millis(2000);

    #[tokio::test(start_paused = true)]
    async fn ticks_arrive_once_per_period() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut scheduler = Scheduler::new(PERIOD);
        assert_eq!(scheduler.period(), PERIOD);
        let started = Instant::now();
        assert!(scheduler.start(tx));

        for n in 1..=3u32 {
            let event = rx.recv().await.unwrap();
            assert!(matches!(event, Event::Tick(_)));
            assert_eq!(started.elapsed(), PERIOD * n);
        }
        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_ends_delivery() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut scheduler = Scheduler::new(PERIOD);
        scheduler.start(tx);
        rx.recv().await.unwrap();

        scheduler.stop().await;
        assert!(!scheduler.is_running());
        time::sleep(PERIOD * 5).await;
        // the task owned the only sender, so the channel is closed and empty
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_is_rejected() {
        let (tx, _rx) = mpsc::channel(8);
        let mut scheduler = Scheduler::new(PERIOD);
        assert!(scheduler.start(tx.clone()));
        assert!(!scheduler.start(tx));
        scheduler.stop().await;
        let (tx, _rx) = mpsc::channel(8);
        assert!(scheduler.start(tx));
        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn exits_when_receiver_is_dropped() {
        let (tx, rx) = mpsc::channel(8);
        let mut scheduler = Scheduler::new(PERIOD);
        scheduler.start(tx);
        drop(rx);
        time::sleep(PERIOD * 2).await;
        assert!(!scheduler.is_running());
    }
}
