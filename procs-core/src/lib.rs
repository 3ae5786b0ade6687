//! This library implements a WebGPU procedure table: a flat table of function
//! pointers, one per API entry point, together with the handle registry and
//! the host-memory backend that populate it.
//!
//! The table is [`ProcTable`]. Every slot takes the [`Global`] context first,
//! followed by the entry point's arguments. Objects are addressed by typed
//! [`id`]s carrying an explicit reference count, mirroring the
//! `*_add_ref` / `*_release` pairs of the API surface.

#![allow(
    // It is much clearer to assert negative conditions with eq! false
    clippy::bool_assert_comparison,
    // We use loops for getting early-out of scope without closures.
    clippy::never_loop,
    // We don't use syntax sugar where it's not necessary.
    clippy::match_like_matches_macro,
    // Redundant matching is more explicit.
    clippy::redundant_pattern_matching,
    // Explicit lifetimes are often easier to reason about.
    clippy::needless_lifetimes,
    // The entry points mirror the API surface, argument counts included.
    clippy::too_many_arguments,
    // Callback types are spelled out where they are stored.
    clippy::type_complexity,
)]
#![warn(
    trivial_casts,
    trivial_numeric_casts,
    unsafe_op_in_unsafe_fn,
    unused_extern_crates,
    unused_qualifications
)]

pub mod api;
pub mod binding_model;
pub mod command;
pub mod device;
pub mod error;
pub mod event;
pub mod global;
pub mod handle;
pub mod hub;
pub mod id;
mod identity;
pub mod instance;
pub mod pipeline;
pub mod present;
mod proc_table;
pub mod registry;
pub mod resource;
pub mod shared;
mod storage;

pub use global::Global;
pub use proc_table::*;
pub use storage::InvalidId;

pub use pt as types;

use std::borrow::Cow;

/// Index of an object slot in a registry.
pub type Index = u32;
/// Generation of an object slot, bumped every time the slot is reused.
pub type Epoch = u32;

pub type Label<'a> = Option<Cow<'a, str>>;

trait LabelHelpers<'a> {
    fn borrow_option(&'a self) -> Option<&'a str>;
}

impl<'a> LabelHelpers<'a> for Label<'a> {
    fn borrow_option(&'a self) -> Option<&'a str> {
        self.as_ref().map(|cow| cow.as_ref())
    }
}

type FastHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

#[cfg(feature = "api_log_info")]
macro_rules! api_log {
    ($($arg:tt)+) => (log::info!($($arg)+))
}
#[cfg(not(feature = "api_log_info"))]
macro_rules! api_log {
    ($($arg:tt)+) => (log::trace!($($arg)+))
}
pub(crate) use api_log;

#[cfg(feature = "resource_log_info")]
macro_rules! resource_log {
    ($($arg:tt)+) => (log::info!($($arg)+))
}
#[cfg(not(feature = "resource_log_info"))]
macro_rules! resource_log {
    ($($arg:tt)+) => (log::trace!($($arg)+))
}
pub(crate) use resource_log;
