/// Newsletter issue publishing
pub mod newsletters;
/// Subscription lifecycle endpoints
pub mod subscriptions;
