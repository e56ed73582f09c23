mod signed_link;
mod signing_key;

pub use signed_link::{LinkError, LinkResult, SignedLink};
pub use signing_key::SigningKey;
