//! Multi-threaded ring behavior

use std::iter;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use avring::{Error, MediaTrack, ReaderState, RingConfig, RingReader, RingWriter, TrackConfig};
use tracing_subscriber::EnvFilter;

const PAYLOAD_LEN: usize = 64;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn writer(capacity: usize) -> RingWriter<Vec<u64>> {
    RingWriter::new(&RingConfig::new(capacity), Vec::new).unwrap()
}

/// Fill the payload with copies of the frame's own sequence
fn stamp(w: &mut RingWriter<Vec<u64>>) -> bool {
    w.write(|frame| {
        let sequence = frame.sequence();
        frame.data.extend(iter::repeat(sequence).take(PAYLOAD_LEN));
    })
}

#[derive(Debug, Default)]
struct Seen {
    frames: u64,
    discards: u64,
    last: u64,
}

/// Poll until the ring closes, checking every frame is whole and in order
fn follow(mut reader: RingReader<Vec<u64>>) -> Seen {
    let mut seen = Seen::default();
    loop {
        match reader.try_read() {
            Ok(Some(frame)) => {
                let sequence = frame.sequence();
                assert!(sequence > seen.last, "{sequence} after {}", seen.last);
                assert_eq!(frame.data.len(), PAYLOAD_LEN);
                assert!(
                    frame.data.iter().all(|&v| v == sequence),
                    "torn frame {sequence}"
                );
                seen.last = sequence;
                seen.frames += 1;
            }
            Ok(None) => thread::yield_now(),
            Err(Error::Closed) => return seen,
            Err(e) if e.is_discard() => {
                seen.discards += 1;
                let current = reader.ring().current_index();
                reader.attach(current);
            }
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
}

#[test]
fn readers_never_see_torn_frames() {
    init_tracing();
    let mut w = writer(16);
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let mut reader = w.reader();
            reader.attach(0);
            reader
        })
        .collect();

    let results = thread::scope(|s| {
        let handles: Vec<_> = readers
            .into_iter()
            .map(|reader| s.spawn(move || follow(reader)))
            .collect();

        for _ in 0..20_000 {
            stamp(&mut w);
        }
        w.close();

        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect::<Vec<_>>()
    });

    for seen in results {
        assert!(seen.last <= 20_000);
        assert!(seen.frames + seen.discards > 0);
    }
}

#[test]
fn producer_does_not_wait_for_a_stalled_reader() {
    let mut w = writer(8);
    let mut reader = w.reader();
    let (held_tx, held_rx) = mpsc::channel();
    let (done_tx, done_rx) = mpsc::channel::<()>();

    stamp(&mut w);

    let discarded = thread::scope(|s| {
        s.spawn(move || {
            assert_eq!(reader.start_read(0).unwrap().sequence(), 1);
            held_tx.send(()).unwrap();
            done_rx.recv().unwrap();
            assert!(reader.try_read().unwrap_err().is_discard());
        });

        held_rx.recv().unwrap();
        let discarded = (0..100_000).filter(|_| !stamp(&mut w)).count();
        done_tx.send(()).unwrap();
        discarded
    });

    // index 8k is lost on every lap while slot 0 stays held
    assert_eq!(discarded, 100_000 / 8);
}

#[test]
fn blocked_reader_is_lapped_in_three_slot_ring() {
    let mut w = writer(3);
    let mut reader = w.reader();
    let (got_tx, got_rx) = mpsc::channel();
    let (wrote_tx, wrote_rx) = mpsc::channel::<()>();

    thread::scope(|s| {
        s.spawn(move || {
            // blocks until sequence 1 is published
            let sequence = reader.start_read(0).unwrap().sequence();
            got_tx.send(sequence).unwrap();

            wrote_rx.recv().unwrap();
            assert_eq!(
                reader.try_read().unwrap_err(),
                Error::Discarded { index: 0 }
            );
            assert_eq!(reader.state(), ReaderState::Lapped);
        });

        thread::sleep(Duration::from_millis(20));
        assert!(stamp(&mut w));
        assert_eq!(got_rx.recv().unwrap(), 1);

        assert!(stamp(&mut w));
        assert!(stamp(&mut w));
        // slot 0 is still held for sequence 1
        assert!(!stamp(&mut w));
        wrote_tx.send(()).unwrap();
    });
}

#[test]
fn fast_reader_keeps_up_while_slow_reader_is_lapped() {
    let mut w = writer(4);
    let mut fast = w.reader();
    let mut slow = w.reader();
    fast.attach(0);
    slow.attach(0);

    let (ack_tx, ack_rx) = mpsc::channel();

    let fast_seen = thread::scope(|s| {
        let handle = s.spawn(move || {
            let mut sequences = Vec::new();
            for _ in 0..10 {
                let frame = fast.read_next().unwrap();
                sequences.push(frame.sequence());
                ack_tx.send(()).unwrap();
            }
            sequences
        });

        for _ in 0..10 {
            assert!(stamp(&mut w));
            ack_rx.recv().unwrap();
        }
        handle.join().unwrap()
    });
    assert_eq!(fast_seen, (1..=10).collect::<Vec<u64>>());

    let err = slow.try_read().unwrap_err();
    assert_eq!(err, Error::Discarded { index: 0 });

    slow.attach(w.ring().current_index());
    assert!(slow.try_read().unwrap().is_none());
    stamp(&mut w);
    assert_eq!(slow.try_read().unwrap().unwrap().sequence(), 11);
}

#[test]
fn blocking_track_consumers_drain_until_close() {
    init_tracing();
    let mut track = MediaTrack::new(TrackConfig::new("video").capacity(8)).unwrap();
    let handle = track.handle();
    let readers: Vec<_> = (0..3).map(|_| handle.subscribe()).collect();

    let results = thread::scope(|s| {
        let handles: Vec<_> = readers
            .into_iter()
            .map(|mut reader| {
                s.spawn(move || {
                    let mut last = 0;
                    loop {
                        match reader.recv_blocking() {
                            Ok(frame) => {
                                assert!(frame.sequence() > last);
                                assert_eq!(frame.data.au_byte_length(), 4);
                                last = frame.sequence();
                            }
                            Err(Error::Closed) => return last,
                            Err(e) if e.is_discard() => reader.resync(),
                            Err(e) => panic!("unexpected error: {e}"),
                        }
                    }
                })
            })
            .collect();

        for i in 0..2_000u32 {
            track.write(|f| {
                f.data.iframe = i % 50 == 0;
                f.data.push_au(&i.to_be_bytes());
                f.bytes_in = 4;
            });
        }
        drop(track);

        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect::<Vec<_>>()
    });

    for last in results {
        assert!(last <= 2_000);
    }

    let stats = handle.stats();
    assert_eq!(stats.frames_written, 2_000);
    assert_eq!(stats.key_frames, 40);
    assert_eq!(stats.bytes_in, 8_000);
    assert_eq!(stats.subscribers, 0);
    assert!(handle.is_closed());
    assert_eq!(handle.with_key_frame(|f| f.sequence()), Some(1951));
}
