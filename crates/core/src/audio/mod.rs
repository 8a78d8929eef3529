use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

const BYTES_PER_SAMPLE: usize = std::mem::size_of::<i16>();

/// Shape of every PCM block exchanged between capture and the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    sample_rate: u32,
    channels: u16,
    frames: usize,
}

impl FrameLayout {
    pub fn new(sample_rate: u32, channels: u16, frames: usize) -> Self {
        Self {
            sample_rate,
            channels,
            frames,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Interleaved frames per period, i.e. samples per channel.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Total number of `i16` values in one period.
    pub fn samples(&self) -> usize {
        self.frames * self.channels as usize
    }
}

/// Fixed-length block of interleaved signed 16-bit samples.
///
/// The length is set by the [`FrameLayout`] at construction and never
/// changes afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct SampleFrame {
    layout: FrameLayout,
    samples: Box<[i16]>,
}

impl SampleFrame {
    /// Creates a zero-filled frame, which doubles as the silence frame.
    pub fn silent(layout: FrameLayout) -> Self {
        Self {
            layout,
            samples: vec![0; layout.samples()].into_boxed_slice(),
        }
    }

    pub fn layout(&self) -> FrameLayout {
        self.layout
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn is_silent(&self) -> bool {
        self.samples.iter().all(|sample| *sample == 0)
    }

    /// Overwrites the whole frame from `source`, zero-filling whatever
    /// `source` does not cover. Returns the number of frames taken.
    fn fill_from<I>(&mut self, source: I, frames: usize) -> usize
    where
        I: IntoIterator<Item = i16>,
    {
        let taken = frames.min(self.layout.frames);
        let split = taken * self.layout.channels as usize;
        let (head, tail) = self.samples.split_at_mut(split);
        for (dst, src) in head.iter_mut().zip(source) {
            *dst = src;
        }
        tail.fill(0);
        taken
    }
}

impl fmt::Debug for SampleFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleFrame")
            .field("layout", &self.layout)
            .field("silent", &self.is_silent())
            .finish()
    }
}

/// Payload of a captured chunk.
#[derive(Debug, Clone, Copy)]
pub enum ChunkData<'a> {
    /// Raw little-endian `i16` bytes as mapped from a server buffer.
    Bytes(&'a [u8]),
    /// Samples the host has already decoded.
    Samples(&'a [i16]),
}

/// A block of captured audio lent by the audio subsystem.
///
/// Implementors hand the underlying buffer back to the audio subsystem in
/// their `Drop` impl. [`CaptureWriter::on_capture`] takes the chunk by value
/// and drops it before returning, so the buffer is released exactly once on
/// every path.
pub trait CaptureChunk {
    /// The interleaved payload, or `None` when the buffer carries no mapped
    /// data.
    fn data(&self) -> Option<ChunkData<'_>>;
}

impl CaptureChunk for &[u8] {
    fn data(&self) -> Option<ChunkData<'_>> {
        Some(ChunkData::Bytes(*self))
    }
}

impl CaptureChunk for &[i16] {
    fn data(&self) -> Option<ChunkData<'_>> {
        Some(ChunkData::Samples(*self))
    }
}

/// What a capture callback did with the chunk it was handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// The chunk held no complete frame and was dropped.
    Empty,
    /// `frames` frames were stored; `truncated` frames beyond the slot
    /// capacity were discarded.
    Stored { frames: usize, truncated: usize },
}

/// Counters describing what the capture side has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    pub stored: u64,
    pub empty: u64,
    pub truncated_frames: u64,
    /// Buffers replaced before the reader ever saw them.
    pub overwritten: u64,
}

/// The live capture stream as seen by the render thread.
///
/// Capture itself happens on the host's own thread through a
/// [`CaptureWriter`]; the render loop only needs to give the audio
/// subsystem one non-blocking pass per frame to service its event queue.
pub trait AudioSource {
    fn pump(&mut self);
}

struct Slot {
    frame: SampleFrame,
}

#[derive(Default)]
struct Counters {
    stored: AtomicU64,
    empty: AtomicU64,
    truncated_frames: AtomicU64,
    overwritten: AtomicU64,
}

struct Shared {
    layout: FrameLayout,
    slot: Mutex<Slot>,
    fresh: AtomicBool,
    counters: Counters,
}

impl Shared {
    fn lock_slot(&self) -> MutexGuard<'_, Slot> {
        // The slot only holds plain samples, so a panic mid-copy leaves
        // nothing worse than a torn frame that the next capture replaces.
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Creates the single-slot, overwrite-on-full channel between the capture
/// callback and the render loop.
pub fn capture_channel(layout: FrameLayout) -> (CaptureWriter, CaptureReader) {
    let shared = Arc::new(Shared {
        layout,
        slot: Mutex::new(Slot {
            frame: SampleFrame::silent(layout),
        }),
        fresh: AtomicBool::new(false),
        counters: Counters::default(),
    });

    (
        CaptureWriter {
            shared: shared.clone(),
        },
        CaptureReader { shared },
    )
}

/// Producer half, moved into the audio host's callback.
#[derive(Clone)]
pub struct CaptureWriter {
    shared: Arc<Shared>,
}

impl CaptureWriter {
    pub fn layout(&self) -> FrameLayout {
        self.shared.layout
    }

    /// Stores a captured chunk and releases it back to the audio subsystem.
    pub fn on_capture<C: CaptureChunk>(&self, chunk: C) -> CaptureOutcome {
        let channels = self.shared.layout.channels() as usize;
        let outcome = match chunk.data() {
            Some(ChunkData::Bytes(bytes)) => {
                let frames = bytes.len() / (BYTES_PER_SAMPLE * channels);
                let samples = bytes
                    .chunks_exact(BYTES_PER_SAMPLE)
                    .map(|pair| i16::from_le_bytes([pair[0], pair[1]]));
                self.store(samples, frames)
            }
            Some(ChunkData::Samples(samples)) => {
                self.store(samples.iter().copied(), samples.len() / channels)
            }
            None => self.record_empty(),
        };
        drop(chunk);
        outcome
    }

    /// Stores a slice of already-decoded interleaved samples.
    pub fn write_samples(&self, samples: &[i16]) -> CaptureOutcome {
        self.on_capture(samples)
    }

    /// Whether at least one chunk has been stored since the channel opened.
    pub fn has_captured(&self) -> bool {
        self.shared.counters.stored.load(Ordering::Relaxed) > 0
    }

    pub fn stats(&self) -> CaptureStats {
        let counters = &self.shared.counters;
        CaptureStats {
            stored: counters.stored.load(Ordering::Relaxed),
            empty: counters.empty.load(Ordering::Relaxed),
            truncated_frames: counters.truncated_frames.load(Ordering::Relaxed),
            overwritten: counters.overwritten.load(Ordering::Relaxed),
        }
    }

    fn store<I>(&self, samples: I, frames: usize) -> CaptureOutcome
    where
        I: IntoIterator<Item = i16>,
    {
        if frames == 0 {
            return self.record_empty();
        }

        let stored = {
            let mut slot = self.shared.lock_slot();
            let stored = slot.frame.fill_from(samples, frames);
            // Published while the lock is still held so the reader can never
            // observe the flag before the copy is complete.
            if self.shared.fresh.swap(true, Ordering::AcqRel) {
                self.shared.counters.overwritten.fetch_add(1, Ordering::Relaxed);
            }
            stored
        };

        let truncated = frames - stored;
        let counters = &self.shared.counters;
        counters.stored.fetch_add(1, Ordering::Relaxed);
        counters
            .truncated_frames
            .fetch_add(truncated as u64, Ordering::Relaxed);

        CaptureOutcome::Stored {
            frames: stored,
            truncated,
        }
    }

    fn record_empty(&self) -> CaptureOutcome {
        self.shared.counters.empty.fetch_add(1, Ordering::Relaxed);
        tracing::trace!("dropping capture chunk without complete frames");
        CaptureOutcome::Empty
    }
}

impl fmt::Debug for CaptureWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureWriter")
            .field("layout", &self.shared.layout)
            .finish()
    }
}

/// Consumer half, owned by the render loop.
pub struct CaptureReader {
    shared: Arc<Shared>,
}

impl CaptureReader {
    pub fn layout(&self) -> FrameLayout {
        self.shared.layout
    }

    /// Returns a copy of the slot if it has been written since the last
    /// successful read.
    pub fn try_consume(&self) -> Option<SampleFrame> {
        let mut frame = SampleFrame::silent(self.shared.layout);
        self.try_consume_into(&mut frame).then_some(frame)
    }

    /// Allocation-free variant of [`CaptureReader::try_consume`]. Returns
    /// `true` and overwrites `out` when fresh data was available.
    ///
    /// Returns immediately when nothing new was stored. Otherwise it takes
    /// the slot lock, which the capture side only holds for a single copy.
    pub fn try_consume_into(&self, out: &mut SampleFrame) -> bool {
        if !self.shared.fresh.load(Ordering::Acquire) {
            return false;
        }

        let slot = self.shared.lock_slot();

        if out.layout != slot.frame.layout {
            *out = SampleFrame::silent(slot.frame.layout);
        }
        out.samples.copy_from_slice(&slot.frame.samples);
        self.shared.fresh.store(false, Ordering::Release);
        true
    }
}

impl fmt::Debug for CaptureReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureReader")
            .field("layout", &self.shared.layout)
            .field("fresh", &self.shared.fresh.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::atomic::AtomicUsize, thread};

    use super::*;

    fn stereo_512() -> FrameLayout {
        FrameLayout::new(44_100, 2, 512)
    }

    fn le_bytes(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    struct CountedChunk {
        data: Option<Vec<u8>>,
        releases: Arc<AtomicUsize>,
    }

    impl CaptureChunk for CountedChunk {
        fn data(&self) -> Option<ChunkData<'_>> {
            self.data.as_deref().map(ChunkData::Bytes)
        }
    }

    impl Drop for CountedChunk {
        fn drop(&mut self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn full_chunk_keeps_first_capacity_frames() {
        let (writer, reader) = capture_channel(stereo_512());
        let samples: Vec<i16> = (0..1500).map(|i| i as i16).collect();

        let outcome = writer.on_capture(le_bytes(&samples).as_slice());
        assert_eq!(
            outcome,
            CaptureOutcome::Stored {
                frames: 512,
                truncated: 238
            }
        );

        let frame = reader.try_consume().expect("fresh data");
        assert_eq!(frame.samples(), &samples[..1024]);
        assert_eq!(writer.stats().truncated_frames, 238);
    }

    #[test]
    fn short_chunk_zero_fills_the_tail() {
        let (writer, reader) = capture_channel(stereo_512());
        writer.write_samples(&[7; 1024]);
        reader.try_consume().unwrap();

        writer.write_samples(&[100; 512]);
        let frame = reader.try_consume().unwrap();

        assert!(frame.samples()[..512].iter().all(|s| *s == 100));
        assert!(frame.samples()[512..].iter().all(|s| *s == 0));
        assert_eq!(frame.samples().len(), 1024);
    }

    #[test]
    fn second_consume_without_capture_is_empty() {
        let (writer, reader) = capture_channel(stereo_512());
        assert!(reader.try_consume().is_none());

        writer.write_samples(&[1; 1024]);
        assert!(reader.try_consume().is_some());
        assert!(reader.try_consume().is_none());
    }

    #[test]
    fn last_write_wins_and_counts_overwrites() {
        let (writer, reader) = capture_channel(stereo_512());
        writer.write_samples(&[1; 1024]);
        writer.write_samples(&[2; 1024]);

        let frame = reader.try_consume().unwrap();
        assert!(frame.samples().iter().all(|s| *s == 2));
        assert_eq!(writer.stats().overwritten, 1);
        assert_eq!(writer.stats().stored, 2);
    }

    #[test]
    fn decoded_sample_chunk_is_stored_like_bytes() {
        let (writer, reader) = capture_channel(stereo_512());
        let samples = [4i16; 600];

        let outcome = writer.on_capture(&samples[..]);
        assert_eq!(
            outcome,
            CaptureOutcome::Stored {
                frames: 300,
                truncated: 0
            }
        );

        let frame = reader.try_consume().unwrap();
        assert!(frame.samples()[..600].iter().all(|s| *s == 4));
        assert!(frame.samples()[600..].iter().all(|s| *s == 0));
    }

    #[test]
    fn chunk_without_a_whole_frame_is_dropped() {
        let (writer, reader) = capture_channel(stereo_512());

        // Three bytes: one full sample, not one full stereo frame.
        assert_eq!(writer.on_capture(&[1u8, 0, 2][..]), CaptureOutcome::Empty);
        assert_eq!(writer.write_samples(&[5]), CaptureOutcome::Empty);
        assert!(reader.try_consume().is_none());
        assert!(!writer.has_captured());
        assert_eq!(writer.stats().empty, 2);
    }

    #[test]
    fn chunk_is_released_exactly_once_on_every_path() {
        let (writer, _reader) = capture_channel(stereo_512());
        let releases = Arc::new(AtomicUsize::new(0));

        let chunks = [
            None,
            Some(Vec::new()),
            Some(le_bytes(&[3; 64])),
            Some(le_bytes(&[3; 4096])),
        ];
        for (index, data) in chunks.into_iter().enumerate() {
            writer.on_capture(CountedChunk {
                data,
                releases: releases.clone(),
            });
            assert_eq!(releases.load(Ordering::SeqCst), index + 1);
        }
    }

    #[test]
    fn consume_into_reuses_the_callers_buffer() {
        let layout = stereo_512();
        let (writer, reader) = capture_channel(layout);
        let mut scratch = SampleFrame::silent(layout);

        assert!(!reader.try_consume_into(&mut scratch));
        writer.write_samples(&[-3; 2048]);
        assert!(reader.try_consume_into(&mut scratch));
        assert!(scratch.samples().iter().all(|s| *s == -3));
    }

    #[test]
    fn fresh_period_is_consumed_while_the_writer_holds_the_slot() {
        let (writer, reader) = capture_channel(stereo_512());
        writer.write_samples(&[9; 1024]);

        let (locked, wait) = std::sync::mpsc::channel();
        let shared = writer.shared.clone();
        let holder = thread::spawn(move || {
            let _slot = shared.lock_slot();
            locked.send(()).unwrap();
            thread::sleep(std::time::Duration::from_millis(20));
        });
        wait.recv().unwrap();

        let frame = reader.try_consume().expect("fresh period after the lock is released");
        assert!(frame.samples().iter().all(|s| *s == 9));
        assert!(reader.try_consume().is_none());
        holder.join().unwrap();
    }

    #[test]
    fn reader_never_observes_a_torn_frame() {
        let layout = FrameLayout::new(44_100, 2, 256);
        let (writer, reader) = capture_channel(layout);

        let producer = thread::spawn(move || {
            for value in 1..=2_000i16 {
                writer.write_samples(&vec![value; layout.samples()]);
            }
        });

        let mut scratch = SampleFrame::silent(layout);
        while !producer.is_finished() {
            if reader.try_consume_into(&mut scratch) {
                let first = scratch.samples()[0];
                assert!(scratch.samples().iter().all(|s| *s == first));
            }
        }
        producer.join().unwrap();
    }
}
