//! Audio/video frame payload
//!
//! An [`AvFrame`] carries one access unit in whichever representations the
//! pipeline has produced so far: raw RTP packets, an AVCC-style muxed buffer
//! and the list of raw NAL units / audio frames. Every byte lives in a pooled
//! `BytesMut` and goes back to the pool when the ring slot is reused.

use std::time::Duration;

use bytes::BytesMut;

use crate::ring::{DataFrame, Reusable};

use super::pool::{BufferList, BufferPool};

/// One RTP packet, kept as received
#[derive(Debug)]
pub struct RtpFrame {
    raw: BytesMut,
}

impl RtpFrame {
    /// Wrap raw packet bytes
    pub fn new(raw: BytesMut) -> Self {
        Self { raw }
    }

    /// Packet bytes, header included
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Take back the underlying buffer
    pub fn into_inner(self) -> BytesMut {
        self.raw
    }
}

/// Media frame stored in each ring slot
#[derive(Debug)]
pub struct AvFrame {
    /// Whether this is a key frame (IDR for video)
    pub iframe: bool,
    /// Presentation timestamp
    pub pts: Duration,
    /// Decode timestamp
    pub dts: Duration,
    /// Absolute timestamp
    pub timestamp: Duration,
    /// ADTS header for AAC audio
    pub adts: Option<BytesMut>,
    /// Muxed AVCC / length-prefixed representation
    pub avcc: BufferList,
    /// RTP packets carrying this frame
    pub rtp: Vec<RtpFrame>,
    /// Raw access units (NAL units or audio frames)
    pub au_list: Vec<BufferList>,
    pool: BufferPool,
}

impl AvFrame {
    /// Create an empty frame drawing buffers from `pool`
    pub fn new(pool: BufferPool) -> Self {
        Self {
            iframe: false,
            pts: Duration::ZERO,
            dts: Duration::ZERO,
            timestamp: Duration::ZERO,
            adts: None,
            avcc: BufferList::new(),
            rtp: Vec::new(),
            au_list: Vec::new(),
            pool,
        }
    }

    /// The pool this frame recycles into
    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    /// Append a pooled copy of an RTP packet
    pub fn push_rtp(&mut self, packet: &[u8]) {
        let raw = self.pool.acquire_from(packet);
        self.rtp.push(RtpFrame::new(raw));
    }

    /// Append an access unit made of one chunk
    pub fn push_au(&mut self, data: &[u8]) {
        let mut au = BufferList::new();
        au.push_slice(&self.pool, data);
        self.au_list.push(au);
    }

    /// Append an access unit assembled elsewhere
    pub fn push_au_list(&mut self, au: BufferList) {
        self.au_list.push(au);
    }

    /// Set the ADTS header
    pub fn set_adts(&mut self, header: &[u8]) {
        if let Some(old) = self.adts.replace(self.pool.acquire_from(header)) {
            self.pool.recycle(old);
        }
    }

    /// Take the buffers of an AVCC frame
    ///
    /// A zero timestamp is stored as 1ms so it is never mistaken for unset.
    /// Returns the number of bytes moved.
    pub fn write_avcc(&mut self, ts: u32, frame: &mut BufferList) -> usize {
        let ts = if ts == 0 { 1 } else { ts };
        self.timestamp = Duration::from_millis(ts as u64);
        frame.transfer_to(&mut self.avcc)
    }

    /// Total bytes across all access units
    pub fn au_byte_length(&self) -> usize {
        self.au_list.iter().map(BufferList::byte_length).sum()
    }

    /// Whether the frame carries no data in any representation
    pub fn is_empty(&self) -> bool {
        self.rtp.is_empty()
            && self.avcc.is_empty()
            && self.au_list.is_empty()
            && self.adts.is_none()
    }
}

impl Default for AvFrame {
    fn default() -> Self {
        Self::new(BufferPool::shared())
    }
}

impl Reusable for AvFrame {
    /// Return all buffers to the pool and clear the scalars
    fn reset(&mut self) {
        for packet in self.rtp.drain(..) {
            self.pool.recycle(packet.into_inner());
        }
        self.avcc.recycle(&self.pool);
        for mut au in self.au_list.drain(..) {
            au.recycle(&self.pool);
        }
        if let Some(adts) = self.adts.take() {
            self.pool.recycle(adts);
        }
        self.timestamp = Duration::ZERO;
        self.pts = Duration::ZERO;
        self.dts = Duration::ZERO;
        self.iframe = false;
    }
}

impl DataFrame<AvFrame> {
    /// Take the buffers of an AVCC frame and account for their size
    pub fn write_avcc(&mut self, ts: u32, frame: &mut BufferList) {
        self.bytes_in += self.data.write_avcc(ts, frame);
    }

    /// Replace this frame with a deep copy of `source`
    ///
    /// Copies the scalar fields and the access units into this frame's own
    /// pooled storage, so the copy outlives the ring slot `source` lives in.
    pub fn assign(&mut self, source: &DataFrame<AvFrame>) {
        self.reset();

        self.sequence = source.sequence;
        self.write_time = source.write_time;
        self.delta_time = source.delta_time;
        self.bytes_in = source.bytes_in;

        self.data.iframe = source.data.iframe;
        self.data.pts = source.data.pts;
        self.data.dts = source.data.dts;
        self.data.timestamp = source.data.timestamp;

        let pool = self.data.pool.clone();
        for au in &source.data.au_list {
            let mut copy = BufferList::new();
            copy.copy_from(&pool, au);
            self.data.au_list.push(copy);
        }
    }
}
