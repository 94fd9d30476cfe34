//! Generic time-bounded map underlying every in-memory relay store.
//!
//! Entries carry an absolute expiry taken from the injected [`Clock`](crate::clock::Clock).
//! Reads evict lazily, so an expired entry is observably absent before any sweep runs.
//! `consume` and `sweep` both remove through the map's per-shard atomic removal, so a sweep can
//! never hand an entry to a consumer, and two consumers can never both receive it.

// crates.io
use dashmap::{DashMap, mapref::entry::Entry};
// self
use crate::{_prelude::*, clock::SharedClock};

/// Result of a freshness-aware lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Freshness<V> {
	/// Entry exists and has not expired.
	Live(V),
	/// Entry existed but had expired; it has now been evicted.
	Expired,
	/// No entry exists.
	Missing,
}
impl<V> Freshness<V> {
	/// Returns the live value, if any.
	pub fn live(self) -> Option<V> {
		match self {
			Self::Live(value) => Some(value),
			_ => None,
		}
	}
}

#[derive(Debug)]
struct Clocked<V> {
	value: V,
	expires_at: OffsetDateTime,
}
impl<V> Clocked<V> {
	fn is_live_at(&self, instant: OffsetDateTime) -> bool {
		instant < self.expires_at
	}
}

/// Sharded map whose entries expire at a fixed instant.
#[derive(Debug)]
pub struct ClockedStore<K, V>
where
	K: Eq + Hash,
{
	entries: DashMap<K, Clocked<V>>,
	clock: SharedClock,
}
impl<K, V> ClockedStore<K, V>
where
	K: Clone + Eq + Hash,
	V: Clone,
{
	/// Creates an empty store reading time from `clock`.
	pub fn new(clock: SharedClock) -> Self {
		Self { entries: DashMap::new(), clock }
	}

	/// Current instant according to the store clock.
	pub fn now(&self) -> OffsetDateTime {
		self.clock.now()
	}

	/// Inserts or replaces `key`, expiring `ttl` from now. Returns the expiry.
	pub fn insert(&self, key: K, value: V, ttl: Duration) -> OffsetDateTime {
		let expires_at = self.now() + ttl;

		self.entries.insert(key, Clocked { value, expires_at });

		expires_at
	}

	/// Inserts only if `key` is vacant or holds an expired entry.
	///
	/// Hands the value back on collision so the caller can retry with a new key.
	pub fn insert_vacant(&self, key: K, value: V, ttl: Duration) -> Result<OffsetDateTime, V> {
		let now = self.now();
		let expires_at = now + ttl;

		match self.entries.entry(key) {
			Entry::Occupied(occupied) if occupied.get().is_live_at(now) => Err(value),
			Entry::Occupied(mut occupied) => {
				occupied.insert(Clocked { value, expires_at });

				Ok(expires_at)
			},
			Entry::Vacant(vacant) => {
				vacant.insert(Clocked { value, expires_at });

				Ok(expires_at)
			},
		}
	}

	/// Returns a clone of the live value for `key`.
	pub fn get<Q>(&self, key: &Q) -> Option<V>
	where
		K: Borrow<Q>,
		Q: ?Sized + Eq + Hash,
	{
		self.lookup(key).live()
	}

	/// Looks up `key`, evicting it when expired.
	pub fn lookup<Q>(&self, key: &Q) -> Freshness<V>
	where
		K: Borrow<Q>,
		Q: ?Sized + Eq + Hash,
	{
		let now = self.now();

		match self.entries.get(key) {
			None => return Freshness::Missing,
			Some(entry) if entry.is_live_at(now) => return Freshness::Live(entry.value.clone()),
			Some(_) => {},
		}

		self.entries.remove_if(key, |_, entry| !entry.is_live_at(now));

		Freshness::Expired
	}

	/// Removes `key` and returns its value if it was still live.
	///
	/// The entry is deleted whether or not it expired, so a value can be consumed at most once.
	pub fn consume<Q>(&self, key: &Q) -> Option<V>
	where
		K: Borrow<Q>,
		Q: ?Sized + Eq + Hash,
	{
		let now = self.now();

		self.entries.remove(key).and_then(|(_, entry)| entry.is_live_at(now).then_some(entry.value))
	}

	/// Applies `f` to the live value under the shard write lock.
	///
	/// Concurrent readers observe either the old or the new value, never a partial update.
	pub fn update<Q, F, R>(&self, key: &Q, f: F) -> Option<R>
	where
		K: Borrow<Q>,
		Q: ?Sized + Eq + Hash,
		F: FnOnce(&mut V) -> R,
	{
		let now = self.now();
		let mut entry = self.entries.get_mut(key)?;

		if entry.is_live_at(now) {
			return Some(f(&mut entry.value));
		}

		drop(entry);
		self.entries.remove_if(key, |_, entry| !entry.is_live_at(now));

		None
	}

	/// Removes `key` regardless of expiry.
	pub fn remove<Q>(&self, key: &Q) -> Option<V>
	where
		K: Borrow<Q>,
		Q: ?Sized + Eq + Hash,
	{
		self.entries.remove(key).map(|(_, entry)| entry.value)
	}

	/// Clones every live value matching `predicate`.
	pub fn values_where<P>(&self, mut predicate: P) -> Vec<V>
	where
		P: FnMut(&V) -> bool,
	{
		let now = self.now();

		self.entries
			.iter()
			.filter(|entry| entry.is_live_at(now) && predicate(&entry.value))
			.map(|entry| entry.value.clone())
			.collect()
	}

	/// Deletes every expired entry and returns how many this call removed.
	pub fn sweep(&self) -> usize {
		let now = self.now();
		let expired = self
			.entries
			.iter()
			.filter(|entry| !entry.is_live_at(now))
			.map(|entry| entry.key().clone())
			.collect::<Vec<_>>();

		expired
			.iter()
			.filter(|key| self.entries.remove_if(*key, |_, entry| !entry.is_live_at(now)).is_some())
			.count()
	}

	/// Number of stored entries, including expired ones not yet evicted.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Returns `true` if nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}
