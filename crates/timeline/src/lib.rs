//! Ciné-Incruste Segment Timeline Engine
//!
//! Owns the ordered collection of performer segments and the mirror of the
//! host player's playback position:
//! - **Segments:** time intervals tagged to a performer, edited with a
//!   point-in / point-out workflow
//! - **Active state:** whether the play-head currently sits inside a segment
//! - **Snapshots:** JSON export of the collection in insertion order
//! - **Layout:** timecode and timeline-bar geometry for hosts
//!
//! This crate is pure state and pure functions. The only outward calls go
//! through the [`MediaPlayer`] trait supplied by the host.

pub mod engine;
pub mod layout;
pub mod performer;
pub mod playback;
pub mod segment;
pub mod snapshot;

pub use engine::*;
pub use performer::*;
pub use playback::*;
pub use segment::*;
