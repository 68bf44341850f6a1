// Telemetry buffer - bounded window of live samples plus derived readings
use crate::domain::telemetry::TelemetrySample;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::VecDeque;

pub const LIVE_WINDOW_CAPACITY: usize = 40;

/// FIFO window that never holds more than `capacity` items.
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> RollingWindow<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `item`, returning the entry evicted to make room, if any.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() == self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    pub fn latest(&self) -> Option<&T> {
        self.items.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Oldest first. Later pushes do not affect the returned copy.
    pub fn snapshot(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

/// Aggregates of the most recent sample. Absent phases add nothing to a sum
/// and are left out of a mean's divisor.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DerivedMetrics {
    pub total_active_power: f64,
    pub total_reactive_power: f64,
    pub mean_voltage_ln: Option<f64>,
    pub mean_voltage_ll: Option<f64>,
}

impl DerivedMetrics {
    pub fn from_sample(sample: &TelemetrySample) -> Self {
        Self {
            total_active_power: sum_present(&sample.phase_active_power()),
            total_reactive_power: sum_present(&sample.phase_reactive_power()),
            mean_voltage_ln: mean_present(&sample.phase_voltage_ln()),
            mean_voltage_ll: mean_present(&sample.phase_voltage_ll()),
        }
    }
}

fn sum_present(values: &[Option<f64>]) -> f64 {
    values.iter().flatten().sum()
}

fn mean_present(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    Some(present.iter().sum::<f64>() / present.len() as f64)
}

#[derive(Debug, Clone)]
pub struct TelemetryBuffer {
    window: RollingWindow<TelemetrySample>,
    metrics: Option<DerivedMetrics>,
}

impl Default for TelemetryBuffer {
    fn default() -> Self {
        Self::new(LIVE_WINDOW_CAPACITY)
    }
}

impl TelemetryBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            window: RollingWindow::new(capacity),
            metrics: None,
        }
    }

    /// Samples are kept in receipt order; they are not re-sorted by timestamp.
    pub fn push(&mut self, sample: TelemetrySample) {
        self.metrics = Some(DerivedMetrics::from_sample(&sample));
        if let Some(evicted) = self.window.push(sample) {
            tracing::trace!(
                "Evicted sample {} for {} from live window",
                evicted.timestamp,
                evicted.device_id
            );
        }
    }

    pub fn snapshot(&self) -> Vec<TelemetrySample> {
        self.window.snapshot()
    }

    pub fn latest(&self) -> Option<&TelemetrySample> {
        self.window.latest()
    }

    pub fn metrics(&self) -> Option<DerivedMetrics> {
        self.metrics
    }

    /// One channel across the window, skipping ticks where it was not reported.
    pub fn series<F>(&self, channel: F) -> Vec<(NaiveDateTime, f64)>
    where
        F: Fn(&TelemetrySample) -> Option<f64>,
    {
        self.window
            .iter()
            .filter_map(|s| channel(s).map(|v| (s.timestamp, v)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.window.capacity()
    }
}
