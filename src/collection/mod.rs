//! The affinity-propagating collection and its change payloads.
//!
//! ## Contents
//! - [`DivertingCollection`] ordered sequence with affinity-relayed
//!   mutations and diverted change events
//! - [`StructureChanged`] / [`ElementChanged`] notification payloads
//!
//! See [`DivertingCollection`] for the race this container closes and the
//! rules its mutators follow.

mod change;
mod diverting;

pub use change::{ElementChanged, StructureChanged};
pub use diverting::DivertingCollection;
