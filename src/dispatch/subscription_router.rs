use std::collections::BTreeMap;
use std::fmt::Display;

use super::error::RouterError;
use crate::key_expr::KeyExpr;

/// A subscription identifier.
///
/// Unique within one session and increasing in registration order.
#[derive(Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Copy, Clone)]
pub struct SubscriptionId(u64);

impl Display for SubscriptionId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "SubscriptionId({})", self.0)
	}
}

struct Route<T> {
	pattern: KeyExpr,
	data: T,
}

/// Ordered subscription table.
///
/// Lookups scan every pattern with the wildcard matcher; iteration order is
/// registration order.
pub struct SubscriptionRouter<T> {
	routes: BTreeMap<SubscriptionId, Route<T>>,
	next_id: u64,
}

impl<T> Default for SubscriptionRouter<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> SubscriptionRouter<T> {
	/// Creates an empty table.
	pub fn new() -> Self {
		Self {
			routes: BTreeMap::new(),
			next_id: 0,
		}
	}

	/// Hands out the id the next subscription will be stored under.
	pub fn allocate_id(&mut self) -> SubscriptionId {
		let id = SubscriptionId(self.next_id);
		self.next_id = self.next_id.wrapping_add(1);
		id
	}

	/// Stores `data` under an id obtained from [`Self::allocate_id`].
	pub fn insert(&mut self, id: SubscriptionId, pattern: KeyExpr, data: T) {
		self.routes.insert(id, Route { pattern, data });
	}

	/// Removes exactly this subscription and returns its pattern and data.
	pub fn unsubscribe(
		&mut self,
		id: &SubscriptionId,
	) -> Result<(KeyExpr, T), RouterError> {
		self.routes
			.remove(id)
			.map(|route| (route.pattern, route.data))
			.ok_or(RouterError::subscription_not_found(*id))
	}

	/// Subscriptions whose pattern matches `key`, in registration order.
	pub fn get_subscribers<'a>(
		&'a self,
		key: &'a KeyExpr,
	) -> impl Iterator<Item = (&'a SubscriptionId, &'a KeyExpr, &'a T)> + 'a {
		self.routes
			.iter()
			.filter(move |(_, route)| route.pattern.matches(key))
			.map(|(id, route)| (id, &route.pattern, &route.data))
	}

	/// Number of live subscriptions.
	pub fn len(&self) -> usize {
		self.routes.len()
	}

	/// True if no subscription is registered.
	pub fn is_empty(&self) -> bool {
		self.routes.is_empty()
	}

	/// Removes every subscription and returns their data in registration
	/// order. Ids keep increasing afterwards.
	pub fn cleanup(&mut self) -> Vec<(SubscriptionId, T)> {
		std::mem::take(&mut self.routes)
			.into_iter()
			.map(|(id, route)| (id, route.data))
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn key(s: &str) -> KeyExpr {
		KeyExpr::new(s).unwrap()
	}

	fn subscribe<T>(
		router: &mut SubscriptionRouter<T>,
		pattern: &str,
		data: T,
	) -> SubscriptionId {
		let id = router.allocate_id();
		router.insert(id, key(pattern), data);
		id
	}

	fn matching_names(
		router: &SubscriptionRouter<&'static str>,
		subject: &str,
	) -> Vec<&'static str> {
		let subject = key(subject);
		router
			.get_subscribers(&subject)
			.map(|(_, _, name)| *name)
			.collect()
	}

	#[test]
	fn test_subscribers_in_registration_order() {
		let mut router = SubscriptionRouter::new();
		subscribe(&mut router, "home/**", "all_home");
		subscribe(&mut router, "home/*/temperature", "temps");
		subscribe(&mut router, "home/kitchen/temperature", "exact");
		subscribe(&mut router, "office/*", "office");

		assert_eq!(
			matching_names(&router, "home/kitchen/temperature"),
			vec!["all_home", "temps", "exact"]
		);
		assert_eq!(matching_names(&router, "home/kitchen/humidity"), vec![
			"all_home"
		]);
		assert_eq!(matching_names(&router, "office/desk"), vec!["office"]);
		assert!(matching_names(&router, "garage/door").is_empty());
	}

	#[test]
	fn test_same_pattern_twice_gets_distinct_ids() {
		let mut router = SubscriptionRouter::new();
		let first = subscribe(&mut router, "a/b", "first");
		let second = subscribe(&mut router, "a/b", "second");

		assert_ne!(first, second);
		assert_eq!(matching_names(&router, "a/b"), vec!["first", "second"]);

		let (pattern, data) = router.unsubscribe(&first).unwrap();
		assert_eq!(pattern.as_str(), "a/b");
		assert_eq!(data, "first");
		assert_eq!(matching_names(&router, "a/b"), vec!["second"]);
	}

	#[test]
	fn test_unsubscribe_unknown_id() {
		let mut router = SubscriptionRouter::<()>::new();
		let id = subscribe(&mut router, "x", ());
		router.unsubscribe(&id).unwrap();

		assert_eq!(
			router.unsubscribe(&id),
			Err(RouterError::subscription_not_found(id))
		);
		assert!(router.is_empty());
	}

	#[test]
	fn test_cleanup_drains_everything() {
		let mut router = SubscriptionRouter::new();
		let a = subscribe(&mut router, "a", 1);
		let b = subscribe(&mut router, "b", 2);

		let drained = router.cleanup();
		assert_eq!(drained, vec![(a, 1), (b, 2)]);
		assert!(router.is_empty());

		let c = subscribe(&mut router, "c", 3);
		assert!(c > b);
		assert_eq!(router.len(), 1);
	}
}
