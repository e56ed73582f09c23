mod subscriber;

pub use subscriber::{Recipient, Subscriber};
