use std::collections::HashMap;

use spdlog::trace;

use crate::metrics::metric_types::{MetricSample, Reading, TIMESTAMP_FIELD};

/// Last known reading of every tracked metric.
///
/// The set of tracked names is fixed at construction. Samples are never removed, only
/// cleared back to the unset state once a report has picked them up.
pub struct MetricStore {
    /// Metric name -> sample
    samples: HashMap<String, MetricSample>,
    dirty: bool,
}

impl MetricStore {
    pub fn new<S: AsRef<str>>(names: &[S]) -> Self {
        let samples = names
            .iter()
            .map(|name| name.as_ref())
            .filter(|name| *name != TIMESTAMP_FIELD)
            .map(|name| (name.to_string(), MetricSample::unset(name)))
            .collect();

        Self {
            samples,
            dirty: false,
        }
    }

    pub fn is_tracked(&self, name: &str) -> bool {
        self.samples.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.samples.keys().cloned().collect();
        names.sort();
        names
    }

    /// Overwrites the reading of `name`. Untracked names are ignored and `false` is returned.
    pub fn update(&mut self, name: &str, timestamp: Option<i64>, value: Option<f64>) -> bool {
        let Some(sample) = self.samples.get_mut(name) else {
            return false;
        };

        sample.reading = Reading::new(timestamp, value);
        sample.pending = true;
        self.dirty = true;
        true
    }

    pub fn read(&self, name: &str) -> Option<Reading> {
        self.samples.get(name).map(|sample| sample.reading)
    }

    /// Same as `read`, but records that a report now holds this reading.
    pub fn read_for_report(&mut self, name: &str) -> Option<Reading> {
        let sample = self.samples.get_mut(name)?;
        sample.pending = false;
        Some(sample.reading)
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn reset(&mut self, name: &str) {
        if let Some(sample) = self.samples.get_mut(name) {
            sample.clear();
        }
    }

    pub fn reset_all(&mut self) {
        for sample in self.samples.values_mut() {
            sample.clear();
        }
        self.dirty = false;
    }

    /// Clears every sample a report has already read. Samples updated after that read are
    /// kept, and keep the store dirty, until the next report picks them up.
    pub fn reset_reported(&mut self) -> usize {
        let mut cleared = 0;
        let mut pending = false;

        for sample in self.samples.values_mut() {
            if sample.pending {
                pending = true;
            } else if !sample.reading.is_unset() {
                sample.clear();
                cleared += 1;
            }
        }

        trace!("Reset {} reported metrics. Pending={}", cleared, pending);
        self.dirty = pending;
        cleared
    }
}
