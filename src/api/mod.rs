//! Template registry API
//!
//! Search, publication and account endpoints, plus session token storage.

mod client;
mod token;
mod types;

pub use client::*;
pub use token::*;
pub use types::*;
