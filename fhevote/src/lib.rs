//! Encrypted-ballot voting.
//!
//! Voters submit encrypted ballots; a [`TallyEngine`] accumulates them
//! homomorphically through an injected [`HomomorphicArithmetic`] backend and only
//! reveals totals after the owner closes voting and a [`DecryptionOracle`]
//! delivers the plaintexts.

#[macro_use]
extern crate serde;

#[macro_use]
mod serde_hex;

mod capability;
mod config;
mod counter;
mod engine;
mod error;
mod handle;
mod identity;
mod ledger;
mod plaintext;
mod tally;

pub use capability::*;
pub use config::*;
pub use counter::*;
pub use engine::*;
pub use error::*;
pub use handle::*;
pub use identity::*;
pub use ledger::*;
pub use plaintext::*;
pub use tally::*;

#[cfg(test)]
mod tests;
