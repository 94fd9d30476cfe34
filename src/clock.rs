//! Injectable time source shared by the broker and its stores.

// self
use crate::_prelude::*;

/// Shared handle to a [`Clock`] implementation.
pub type SharedClock = Arc<dyn Clock>;

/// Source of the current instant used for every expiry decision.
pub trait Clock
where
	Self: Debug + Send + Sync,
{
	/// Returns the current UTC instant.
	fn now(&self) -> OffsetDateTime;
}

/// Wall-clock time source.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl SystemClock {
	/// Returns the system clock as a [`SharedClock`].
	pub fn shared() -> SharedClock {
		Arc::new(Self)
	}
}
impl Clock for SystemClock {
	fn now(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}
}

/// Manually advanced clock for deterministic expiry tests.
///
/// Clones share the same instant, so a test can keep one handle while the broker holds another.
#[derive(Clone, Debug)]
pub struct ManualClock(Arc<Mutex<OffsetDateTime>>);
impl ManualClock {
	/// Creates a clock frozen at `start`.
	pub fn new(start: OffsetDateTime) -> Self {
		Self(Arc::new(Mutex::new(start)))
	}

	/// Moves the clock forward by `by`.
	pub fn advance(&self, by: Duration) {
		let mut now = self.0.lock();

		*now += by;
	}

	/// Jumps the clock to `instant`.
	pub fn set(&self, instant: OffsetDateTime) {
		*self.0.lock() = instant;
	}

	/// Returns a [`SharedClock`] view over this clock.
	pub fn shared(&self) -> SharedClock {
		Arc::new(self.clone())
	}
}
impl Clock for ManualClock {
	fn now(&self) -> OffsetDateTime {
		*self.0.lock()
	}
}
