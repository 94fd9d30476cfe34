//! Periodic removal of expired relay state.
//!
//! [`spawn`] starts a background task that calls [`Sweep::sweep`] on a fixed interval until
//! its [`SweeperHandle`] is stopped or dropped. Tests drive sweeps directly and advance a
//! [`ManualClock`](crate::clock::ManualClock) instead of waiting for the task.

// crates.io
use tokio::{
	sync::oneshot,
	task::JoinHandle,
	time::{self, Instant, MissedTickBehavior},
};
// self
use crate::{_prelude::*, obs};

/// Boxed future returned by [`Sweep::sweep`].
pub type SweepFuture<'a> = Pin<Box<dyn Future<Output = Result<SweepReport>> + 'a + Send>>;

/// Anything that can purge its expired entries in one pass.
pub trait Sweep
where
	Self: Send + Sync,
{
	/// Runs a single sweep pass.
	fn sweep(&self) -> SweepFuture<'_>;
}

/// Per-store removal counts of one sweep pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
	/// Lapsed client registrations.
	pub clients: usize,
	/// Abandoned authorization attempts.
	pub challenges: usize,
	/// Expired sessions.
	pub sessions: usize,
	/// Unredeemed authorization codes.
	pub codes: usize,
}
impl SweepReport {
	/// Total number of removed entries.
	pub fn total(&self) -> usize {
		self.clients + self.challenges + self.sessions + self.codes
	}

	/// Emits the report through the tracing and metrics helpers.
	pub fn record(&self) {
		obs::record_sweep(self.clients, self.challenges, self.sessions, self.codes);
		obs::record_swept("clients", self.clients);
		obs::record_swept("challenges", self.challenges);
		obs::record_swept("sessions", self.sessions);
		obs::record_swept("codes", self.codes);
	}
}

/// Lifecycle handle of a background sweeper.
///
/// Dropping the handle stops the task as well; [`SweeperHandle::stop`] additionally waits for it
/// to finish.
#[derive(Debug)]
pub struct SweeperHandle {
	shutdown: Option<oneshot::Sender<()>>,
	task: Option<JoinHandle<()>>,
}
impl SweeperHandle {
	/// Signals the task to stop and waits until it has exited.
	pub async fn stop(mut self) {
		if let Some(shutdown) = self.shutdown.take() {
			let _ = shutdown.send(());
		}
		if let Some(task) = self.task.take() {
			let _ = task.await;
		}
	}

	/// Returns `true` while the background task is still running.
	pub fn is_running(&self) -> bool {
		self.task.as_ref().is_some_and(|task| !task.is_finished())
	}
}
impl Drop for SweeperHandle {
	fn drop(&mut self) {
		if let Some(shutdown) = self.shutdown.take() {
			let _ = shutdown.send(());
		}
	}
}

/// Spawns a task that sweeps `target` every `period`, starting one period from now.
///
/// Must be called from within a Tokio runtime. A failed pass is logged and the next tick
/// retries.
pub fn spawn<S>(target: Arc<S>, period: std::time::Duration) -> SweeperHandle
where
	S: 'static + ?Sized + Sweep,
{
	let (shutdown, mut shutdown_rx) = oneshot::channel();
	let task = tokio::spawn(async move {
		let mut interval = time::interval_at(Instant::now() + period, period);

		interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

		loop {
			tokio::select! {
				_ = interval.tick() => {
					if let Err(e) = target.sweep().await {
						obs::record_sweep_failure(&e);
					}
				},
				_ = &mut shutdown_rx => break,
			}
		}
	});

	SweeperHandle { shutdown: Some(shutdown), task: Some(task) }
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;

	#[derive(Default)]
	struct CountingSweep(AtomicUsize);
	impl Sweep for CountingSweep {
		fn sweep(&self) -> SweepFuture<'_> {
			Box::pin(async move {
				self.0.fetch_add(1, Ordering::SeqCst);

				Ok(SweepReport { codes: 1, ..Default::default() })
			})
		}
	}

	#[test]
	fn report_total_sums_every_store() {
		let report = SweepReport { clients: 1, challenges: 2, sessions: 3, codes: 4 };

		assert_eq!(report.total(), 10);

		report.record();
	}

	#[tokio::test]
	async fn sweeper_runs_until_stopped() {
		let target = Arc::new(CountingSweep::default());
		let handle = spawn(target.clone(), std::time::Duration::from_millis(10));

		time::sleep(std::time::Duration::from_millis(100)).await;

		assert!(handle.is_running());

		handle.stop().await;

		let passes = target.0.load(Ordering::SeqCst);

		assert!(passes >= 1, "Sweeper should have run at least once, ran {passes} times.");

		time::sleep(std::time::Duration::from_millis(50)).await;

		assert_eq!(target.0.load(Ordering::SeqCst), passes);
	}
}
