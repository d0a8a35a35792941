//! An abstraction layer for streaming text generation providers.
//!
//! This crate establishes a unified protocol for the chat proxy to talk
//! to a hosted generative-language API, so that the proxy can switch
//! between providers (or a scripted fake in tests) without touching the
//! request handling code.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
