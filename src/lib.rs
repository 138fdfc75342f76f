#![warn(missing_docs, missing_debug_implementations)]

//! Look up usernames and their public keys on keybase.io.
//!
//! A whole batch of usernames goes to the Keybase user lookup API in a
//! single request. The response holds one slot per requested username, in
//! request order, with `null` standing in for users that don't exist. Each
//! username is classified as found or not found from its slot. Missing
//! users are reported through a typed error that still carries the partial
//! result, separately from transport and decoding failures.
//!
//! # Example
//!
//! ```no_run
//! use keybasectl::lookup::{Client, LookupError, user_lookup};
//!
//! let client = Client::new();
//! match user_lookup(&client, &["alice", "bob"]) {
//!     Ok(c) => println!("found: {:?}", c.found()),
//!     Err(LookupError::NotFound(e)) => {
//!         println!("found: {:?}, missing: {:?}", e.found(), e.not_found())
//!     }
//!     Err(e) => eprintln!("error: {e}"),
//! }
//! ```

pub mod lookup;
pub mod query;
pub mod response;
