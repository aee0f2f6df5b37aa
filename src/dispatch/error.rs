use thiserror::Error;

use super::subscription_router::SubscriptionId;

/// Errors raised by the subscription table
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
	/// Subscription with given ID was not found
	#[error("Subscription {id} not found")]
	SubscriptionNotFound {
		/// The missing subscription
		id: SubscriptionId,
	},
}

impl RouterError {
	/// Creates a new SubscriptionNotFound error
	pub fn subscription_not_found(id: SubscriptionId) -> Self {
		Self::SubscriptionNotFound { id }
	}
}
