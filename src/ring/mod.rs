//! Single-producer, many-reader frame ring
//!
//! One writer publishes frames into a fixed number of reusable slots; any
//! number of readers follow at their own pace. The writer never waits for a
//! reader (under the default [`WritePolicy`]): a reader that holds a slot for
//! a whole lap gets that slot flagged as discarded instead.
//!
//! # Architecture
//!
//! ```text
//!                   Arc<RingSlots<T>>
//!        ┌────────┬────────┬────────┬────────┐
//!        │ slot 0 │ slot 1 │ slot 2 │ slot 3 │   slot = RwLock + discard + DataFrame<T>
//!        └────────┴────────┴────────┴────────┘
//!            ▲         ▲                 ▲
//!            │         │                 │ exclusive (filling index 7)
//!       [RingReader] [RingReader]   [RingWriter]
//!        shared @4    shared @5
//! ```
//!
//! # Zero-Copy Design
//!
//! Readers borrow frames in place under a shared lock; payload storage is
//! reset and refilled by the writer on each lap instead of reallocated.

pub mod config;
pub mod frame;
pub mod reader;
pub mod slot;
pub mod slots;
pub mod writer;

pub use config::{RingConfig, WritePolicy};
pub use frame::{DataFrame, Reusable};
pub use reader::{ReaderState, RingReader};
pub use slot::FrameSlot;
pub use slots::{next_index, RingSlots};
pub use writer::RingWriter;
