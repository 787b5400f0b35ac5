//! Corridor precedence engine of the Torq core.
//!
//! A corridor is a rule with a flag and up to five discriminators (from tag, from node,
//! to tag, to node, channel). The [`engine::CorridorEngine`] answers which flag applies
//! to a directed channel, preferring channel level rules over node level rules over tag
//! level rules. On top of it, [`tagging::TagManager`] attaches tags to nodes and channels
//! and [`groups`] derives the channel group projection.

pub mod engine;
pub mod errors;
pub mod groups;
pub mod tagging;

pub use engine::CorridorEngine;
pub use tagging::TagManager;
