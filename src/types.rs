//! Core data types for servoscope
//!
//! This module contains the fundamental data structures used throughout
//! the crate for representing telemetry channels and their sample history.
//!
//! # Main Types
//!
//! - [`RegisterSpan`] - The one or two consecutive holding registers backing
//!   a channel
//! - [`Sample`] - A single buffer entry: a decoded value or a gap marker
//! - [`SampleBuffer`] - Bounded rolling time-series storage (ring semantics)
//! - [`Channel`] - A configured telemetry stream with its buffer and
//!   display preferences
//!
//! # Decoding
//!
//! Raw register words are decoded per channel configuration:
//!
//! - two words → `(w0 << 16) | w1`, interpreted as a signed 32-bit value
//! - one word, signed → 16-bit two's complement
//! - one word, unsigned → the word as-is
//!
//! # Memory Management
//!
//! Each channel keeps at most [`WINDOW`] samples. When the buffer is full,
//! the oldest sample is evicted automatically, so all channels share a
//! common, bounded time axis.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Number of samples retained per channel (≈10 s at the 10 ms default tick)
pub const WINDOW: usize = 1001;

/// The one or two consecutive register addresses backing a channel
///
/// A `Double` span reads two words starting at the given address; the first
/// word is the high half of a 32-bit value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegisterSpan {
    /// A single 16-bit register
    Single(u16),
    /// Two consecutive registers forming one 32-bit value, high word first
    Double(u16),
}

impl RegisterSpan {
    /// First (lowest) address of the span
    pub fn start(&self) -> u16 {
        match self {
            RegisterSpan::Single(addr) | RegisterSpan::Double(addr) => *addr,
        }
    }

    /// Number of registers in the span (1 or 2)
    pub fn count(&self) -> u16 {
        match self {
            RegisterSpan::Single(_) => 1,
            RegisterSpan::Double(_) => 2,
        }
    }

    /// All addresses of the span, in read order
    pub fn addresses(&self) -> impl Iterator<Item = u16> {
        let start = self.start();
        (0..self.count()).map(move |i| start + i)
    }
}

/// A single buffer entry
///
/// `Gap` marks "no new data this tick" and renders as a plot discontinuity;
/// it is appended for inactive channels (and for channels whose poll range
/// failed) so every channel advances by exactly one entry per tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    /// A decoded register value
    Value(f64),
    /// No data for this tick
    Gap,
}

impl Sample {
    /// Check if this sample is a gap marker
    pub fn is_gap(&self) -> bool {
        matches!(self, Sample::Gap)
    }

    /// The decoded value, if any
    pub fn value(&self) -> Option<f64> {
        match self {
            Sample::Value(v) => Some(*v),
            Sample::Gap => None,
        }
    }

    /// The value for plotting/export, with gaps as NaN (breaks line
    /// continuity in finite-connect renderers)
    pub fn plot_value(&self) -> f64 {
        match self {
            Sample::Value(v) => *v,
            Sample::Gap => f64::NAN,
        }
    }
}

/// Bounded rolling sample storage for one channel
///
/// Insertion order is time order. Once [`WINDOW`] samples are stored, each
/// push evicts the oldest entry.
#[derive(Debug, Clone, Default)]
pub struct SampleBuffer {
    samples: VecDeque<Sample>,
}

impl SampleBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(WINDOW),
        }
    }

    /// Append a sample, evicting the oldest entry if the window is full
    pub fn push(&mut self, sample: Sample) {
        if self.samples.len() >= WINDOW {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Append a gap marker
    pub fn push_gap(&mut self) {
        self.push(Sample::Gap);
    }

    /// Clear all history
    pub fn reset(&mut self) {
        self.samples.clear();
    }

    /// Number of stored samples (≤ [`WINDOW`])
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the buffer holds no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The most recent sample, if any
    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    /// Iterate samples oldest-first
    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// Copy out the current contents oldest-first
    pub fn snapshot(&self) -> Vec<Sample> {
        self.samples.iter().copied().collect()
    }
}

/// A configured telemetry stream backed by one or two holding registers
#[derive(Debug, Clone)]
pub struct Channel {
    /// Human-readable label (opaque to the polling core)
    pub name: String,
    /// Backing register addresses
    registers: RegisterSpan,
    /// Whether a single-register value is 16-bit two's complement
    signed: bool,
    /// Only active channels are polled
    active: bool,
    /// Display color (RGBA); owned by the UI, only stored here
    color: [u8; 4],
    /// Whether the UI plots this channel on the secondary Y axis
    second_axis: bool,
    /// Rolling sample history
    buffer: SampleBuffer,
}

impl Channel {
    /// Create a new inactive channel
    pub fn new(name: impl Into<String>, registers: RegisterSpan, signed: bool) -> Self {
        Self {
            name: name.into(),
            registers,
            signed,
            active: false,
            color: [255, 255, 255, 255],
            second_axis: false,
            buffer: SampleBuffer::new(),
        }
    }

    /// Set the activity flag at construction
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Set the display color at construction
    pub fn with_color(mut self, color: [u8; 4]) -> Self {
        self.color = color;
        self
    }

    /// Set an auto-generated color based on the channel's position in a set
    pub fn with_auto_color(mut self, index: usize) -> Self {
        self.color = generate_color(index);
        self
    }

    /// Backing registers
    pub fn registers(&self) -> RegisterSpan {
        self.registers
    }

    /// Whether a single-register value is interpreted as signed
    pub fn is_signed(&self) -> bool {
        self.signed
    }

    /// Whether this channel is polled
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Toggle polling. History is kept; only new decoded appends stop
    /// (gap markers still advance the timeline).
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Display color
    pub fn color(&self) -> [u8; 4] {
        self.color
    }

    /// Set the display color
    pub fn set_color(&mut self, color: [u8; 4]) {
        self.color = color;
    }

    /// Whether the channel is assigned to the secondary Y axis
    pub fn on_second_axis(&self) -> bool {
        self.second_axis
    }

    /// Assign the channel to the primary or secondary Y axis
    pub fn set_second_axis(&mut self, second: bool) {
        self.second_axis = second;
    }

    /// Sample history
    pub fn buffer(&self) -> &SampleBuffer {
        &self.buffer
    }

    /// Decode this channel's raw words into a value
    ///
    /// Returns `None` if the slice length does not match the register span.
    pub fn decode(&self, words: &[u16]) -> Option<i64> {
        match (self.registers, words) {
            (RegisterSpan::Double(_), [high, low]) => {
                let raw = ((*high as u32) << 16) | *low as u32;
                Some(raw as i32 as i64)
            }
            (RegisterSpan::Single(_), [word]) => {
                if self.signed {
                    Some(*word as i16 as i64)
                } else {
                    Some(*word as i64)
                }
            }
            _ => None,
        }
    }

    /// Append a decoded sample
    pub fn push_value(&mut self, value: i64) {
        self.buffer.push(Sample::Value(value as f64));
    }

    /// Append a gap marker
    pub fn push_gap(&mut self) {
        self.buffer.push_gap();
    }

    /// Clear the sample history
    pub fn reset(&mut self) {
        self.buffer.reset();
    }
}

/// Generate a distinct color for a channel index
///
/// Uses the golden ratio to spread hues evenly across the color wheel, with
/// medium saturation and value so the result is visible on both light and
/// dark backgrounds.
pub fn generate_color(index: usize) -> [u8; 4] {
    const GOLDEN_RATIO: f32 = 0.618033988749895;

    let hue = ((index as f32 * GOLDEN_RATIO) % 1.0) * 360.0;
    let (r, g, b) = hsv_to_rgb(hue, 0.7, 0.85);
    [r, g, b, 255]
}

fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (u8, u8, u8) {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = match h as u32 {
        0..=59 => (c, x, 0.0),
        60..=119 => (x, c, 0.0),
        120..=179 => (0.0, c, x),
        180..=239 => (0.0, x, c),
        240..=299 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    (
        ((r + m) * 255.0) as u8,
        ((g + m) * 255.0) as u8,
        ((b + m) * 255.0) as u8,
    )
}
