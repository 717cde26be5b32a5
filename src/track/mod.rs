//! Media tracks built on the frame ring
//!
//! A track pairs one [`MediaTrack`] producer with async subscribers, a key
//! frame cache for late joiners and live counters.

pub mod config;
pub mod media;

pub use config::TrackConfig;
pub use media::{MediaTrack, TrackHandle, TrackReader};
