//! Records owned by the relay stores.

pub mod challenge;
pub mod client;
pub mod code;
pub mod session;

pub use challenge::*;
pub use client::*;
pub use code::*;
pub use session::*;
