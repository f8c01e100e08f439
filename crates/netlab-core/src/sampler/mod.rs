//! Samplers over a [`RandomSource`](crate::rng::RandomSource).
//!
//! Every sampler consumes draws in a fixed order; topic generators rely on
//! that order to stay reproducible.

pub mod address;
pub mod distinct;
pub mod identifier;
pub mod token;

pub use address::{sample_host, sample_subnet, AddressSpace, IpVersion};
pub use distinct::{sample_distinct, RETRY_WARN_THRESHOLD};
pub use identifier::{sample_identifier, MacAddress};
pub use token::{sample_token, sample_word_domain, LOWER_ALNUM};
