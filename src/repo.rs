mod subscribers;
mod users;

pub use subscribers::SubscriberRepo;
pub use users::{NewUser, UserCredentials, UsersRepo};
