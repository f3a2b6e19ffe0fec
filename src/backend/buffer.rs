//! Time-series storage for parsed samples
//!
//! [`TimeSeriesBuffer`] stores samples column-wise: one contiguous column per
//! channel axis, all columns always the same length. Appending pushes one
//! value onto every column, so a tick is either present in every column or in
//! none of them.
//!
//! # Indexing
//!
//! Every appended sample gets a global index, starting at 0 after creation or
//! [`clear`](TimeSeriesBuffer::clear). Its timestamp is `index × timebase`.
//! When a retention cap is configured the oldest samples are evicted, but the
//! indices and timestamps of the survivors do not change.
//!
//! # Sharing
//!
//! The acquisition loop is the only writer. Readers take a [`BufferView`]
//! under a read lock (see [`SharedBuffer`]) and copy out what they need with
//! [`BufferView::channel_window`] before releasing it, so a reader never sees
//! a half-appended tick.

use crate::error::{PlotterError, Result};
use crate::types::{ParsedSample, Reading, Sample, SensorChannel, AXIS_COUNT};
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Buffer handle shared between the acquisition loop (writer) and the UI (readers)
pub type SharedBuffer = Arc<RwLock<TimeSeriesBuffer>>;

/// Wrap a buffer for sharing across threads
pub fn shared(buffer: TimeSeriesBuffer) -> SharedBuffer {
    Arc::new(RwLock::new(buffer))
}

/// Append-only, index-addressed sample store
#[derive(Debug, Clone)]
pub struct TimeSeriesBuffer {
    channels: Vec<SensorChannel>,
    /// Channel-major: column `c * AXIS_COUNT + a` is axis `a` of `channels[c]`
    columns: Vec<VecDeque<i32>>,
    timebase: Duration,
    retention_cap: Option<usize>,
    /// Global index of the oldest retained sample
    first_index: u64,
    /// Global index the next appended sample will get
    next_index: u64,
    /// Bumped on every clear so readers can drop derived state
    generation: u64,
}

impl TimeSeriesBuffer {
    /// Create an empty, unbounded buffer for the given channel layout
    pub fn new(channels: &[SensorChannel], timebase: Duration) -> Self {
        Self {
            channels: channels.to_vec(),
            columns: vec![VecDeque::new(); channels.len() * AXIS_COUNT],
            timebase,
            retention_cap: None,
            first_index: 0,
            next_index: 0,
            generation: 0,
        }
    }

    /// Keep at most `cap` samples, evicting the oldest
    pub fn with_retention_cap(mut self, cap: Option<usize>) -> Self {
        self.retention_cap = cap.map(|c| c.max(1));
        if let Some(cap) = self.retention_cap {
            for column in &mut self.columns {
                column.reserve(cap);
            }
        }
        self
    }

    pub fn channels(&self) -> &[SensorChannel] {
        &self.channels
    }

    pub fn timebase(&self) -> Duration {
        self.timebase
    }

    pub fn retention_cap(&self) -> Option<usize> {
        self.retention_cap
    }

    /// Number of retained samples
    pub fn len(&self) -> usize {
        self.columns.first().map_or(0, VecDeque::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Samples appended since the last clear, including evicted ones
    pub fn total_appended(&self) -> u64 {
        self.next_index
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Timestamp assigned to a global index
    pub fn timestamp_of(&self, index: u64) -> Duration {
        self.timebase.saturating_mul(index.min(u32::MAX as u64) as u32)
    }

    /// Append one sample; the buffer assigns its index and timestamp
    ///
    /// The sample's channels must match the buffer's layout exactly and in
    /// order. On mismatch nothing is written.
    pub fn append(&mut self, sample: ParsedSample) -> Result<Sample> {
        if sample.readings.len() != self.channels.len()
            || sample
                .readings
                .iter()
                .zip(&self.channels)
                .any(|(r, c)| r.channel != *c)
        {
            return Err(PlotterError::LayoutMismatch(format!(
                "expected {:?}, got {:?}",
                self.channels,
                sample.channels().collect::<Vec<_>>()
            )));
        }

        if let Some(cap) = self.retention_cap {
            if self.len() >= cap {
                for column in &mut self.columns {
                    column.pop_front();
                }
                self.first_index += 1;
            }
        }

        for (c, reading) in sample.readings.iter().enumerate() {
            for (a, value) in reading.values.iter().enumerate() {
                self.columns[c * AXIS_COUNT + a].push_back(*value);
            }
        }

        let index = self.next_index;
        self.next_index += 1;

        Ok(Sample {
            index,
            timestamp: self.timestamp_of(index),
            readings: sample.readings,
        })
    }

    /// View of the last `n` samples, or fewer if not enough data yet
    pub fn window(&self, n: usize) -> BufferView<'_> {
        let len = self.len();
        let take = n.min(len);
        BufferView {
            buffer: self,
            start: len - take,
            len: take,
        }
    }

    /// View of every retained sample
    pub fn full(&self) -> BufferView<'_> {
        BufferView {
            buffer: self,
            start: 0,
            len: self.len(),
        }
    }

    /// Drop all samples and restart indices at 0
    pub fn clear(&mut self) {
        for column in &mut self.columns {
            column.clear();
        }
        self.first_index = 0;
        self.next_index = 0;
        self.generation += 1;
    }

    /// Start over with a new column layout, as at session start
    pub fn reconfigure(
        &mut self,
        channels: &[SensorChannel],
        timebase: Duration,
        retention_cap: Option<usize>,
    ) {
        self.channels = channels.to_vec();
        self.columns = vec![VecDeque::new(); channels.len() * AXIS_COUNT];
        self.timebase = timebase;
        self.retention_cap = retention_cap.map(|c| c.max(1));
        self.clear();
    }

    fn column_index(&self, channel: SensorChannel, axis: usize) -> Option<usize> {
        if axis >= AXIS_COUNT {
            return None;
        }
        self.channels
            .iter()
            .position(|c| *c == channel)
            .map(|c| c * AXIS_COUNT + axis)
    }
}

/// Borrowed, contiguous range of a buffer
///
/// Holds no copies; [`channel_window`](Self::channel_window) and
/// [`sample`](Self::sample) copy out on demand.
#[derive(Debug, Clone, Copy)]
pub struct BufferView<'a> {
    buffer: &'a TimeSeriesBuffer,
    start: usize,
    len: usize,
}

impl<'a> BufferView<'a> {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn channels(&self) -> &'a [SensorChannel] {
        &self.buffer.channels
    }

    /// Global index of the first sample in the view
    pub fn first_index(&self) -> u64 {
        self.buffer.first_index + self.start as u64
    }

    /// Global indices covered by the view
    pub fn indices(&self) -> std::ops::Range<u64> {
        let first = self.first_index();
        first..first + self.len as u64
    }

    pub fn timestamps(&self) -> impl Iterator<Item = Duration> + 'a {
        let buffer = self.buffer;
        self.indices().map(move |i| buffer.timestamp_of(i))
    }

    /// Values of one axis of one channel across the view
    pub fn axis(
        &self,
        channel: SensorChannel,
        axis: usize,
    ) -> Option<impl Iterator<Item = i32> + 'a> {
        let column = self.buffer.column_index(channel, axis)?;
        Some(
            self.buffer.columns[column]
                .range(self.start..self.start + self.len)
                .copied(),
        )
    }

    /// All column values of the `row`-th sample in the view, channel-major
    pub fn row(&self, row: usize) -> Option<impl Iterator<Item = i32> + 'a> {
        if row >= self.len {
            return None;
        }
        let at = self.start + row;
        Some(self.buffer.columns.iter().map(move |column| column[at]))
    }

    /// Reassemble the `row`-th sample in the view
    pub fn sample(&self, row: usize) -> Option<Sample> {
        if row >= self.len {
            return None;
        }
        let at = self.start + row;
        let index = self.first_index() + row as u64;
        let readings = self
            .buffer
            .channels
            .iter()
            .enumerate()
            .map(|(c, channel)| {
                let mut values = [0i32; AXIS_COUNT];
                for (a, value) in values.iter_mut().enumerate() {
                    *value = self.buffer.columns[c * AXIS_COUNT + a][at];
                }
                Reading::new(*channel, values)
            })
            .collect();
        Some(Sample {
            index,
            timestamp: self.buffer.timestamp_of(index),
            readings,
        })
    }

    /// Copy one channel's axes out of the view
    pub fn channel_window(&self, channel: SensorChannel) -> Option<ChannelWindow> {
        let mut axes: [Vec<i32>; AXIS_COUNT] = Default::default();
        for (a, out) in axes.iter_mut().enumerate() {
            *out = self.axis(channel, a)?.collect();
        }
        Some(ChannelWindow {
            channel,
            first_index: self.first_index(),
            timestamps: self.timestamps().collect(),
            axes,
        })
    }
}

/// Owned copy of one channel over a window, handed to the display surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelWindow {
    pub channel: SensorChannel,
    pub first_index: u64,
    pub timestamps: Vec<Duration>,
    pub axes: [Vec<i32>; AXIS_COUNT],
}

impl ChannelWindow {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// `[t_seconds, value]` pairs of one axis, ready for plotting
    pub fn plot_points(&self, axis: usize) -> Vec<[f64; 2]> {
        self.timestamps
            .iter()
            .zip(&self.axes[axis])
            .map(|(t, v)| [t.as_secs_f64(), *v as f64])
            .collect()
    }
}
