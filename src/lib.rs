//! Frame distribution ring for live media
//!
//! One producer writes audio/video frames into a fixed ring of reusable
//! slots; any number of readers follow it at their own pace. The producer
//! never waits for readers: a reader that falls a full lap behind has its
//! frame discarded and reattaches at a fresher position.
//!
//! # Layers
//!
//! - [`ring`]: the lock-per-slot ring, generic over the payload
//! - [`media`]: the [`AvFrame`] payload and its byte-buffer pool
//! - [`track`]: a media track with async subscribers and a key frame cache
//! - [`stats`]: counters and snapshots for tracks
//!
//! # Example
//!
//! ```no_run
//! use avring::{MediaTrack, TrackConfig};
//!
//! #[tokio::main]
//! async fn main() -> avring::Result<()> {
//!     let mut track = MediaTrack::new(TrackConfig::new("video").capacity(128))?;
//!     let mut reader = track.handle().subscribe();
//!
//!     tokio::spawn(async move {
//!         while let Ok(frame) = reader.recv().await {
//!             println!("frame {} ({} bytes)", frame.sequence(), frame.bytes_in);
//!         }
//!     });
//!
//!     track.write(|frame| {
//!         frame.data.iframe = true;
//!         frame.data.push_au(&[0x65, 0x88, 0x84]);
//!         frame.bytes_in = 3;
//!     });
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod media;
pub mod ring;
pub mod stats;
pub mod track;

pub use error::{Error, Result};
pub use media::{AvFrame, BufferList, BufferPool, RtpFrame};
pub use ring::{DataFrame, ReaderState, Reusable, RingConfig, RingReader, RingWriter, WritePolicy};
pub use stats::TrackStats;
pub use track::{MediaTrack, TrackConfig, TrackHandle, TrackReader};
