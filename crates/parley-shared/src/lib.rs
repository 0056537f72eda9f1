//! # parley-shared
//!
//! Wire protocol and identity types shared between the Parley server and its
//! clients.
//!
//! The event names and payload field names in [`events`] are frozen: deployed
//! clients match on them verbatim, so any rename is a breaking protocol
//! change.

pub mod constants;
pub mod events;
pub mod types;

pub use events::{ClientEvent, ServerEvent, TypingScope};
pub use types::{RoomName, Username};
