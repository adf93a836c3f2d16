/// Payload field carrying the timestamp shared by every metric in the message.
pub const TIMESTAMP_FIELD: &str = "t";

/// Current (timestamp, value) of a metric as handed to the reporter.
/// `value == None` means nothing has been observed since the last reset.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Reading {
    pub timestamp: Option<i64>,
    pub value: Option<f64>,
}

impl Reading {
    pub fn new(timestamp: Option<i64>, value: Option<f64>) -> Self {
        Self { timestamp, value }
    }

    pub fn unset() -> Self {
        Self::default()
    }

    pub fn is_unset(&self) -> bool {
        self.timestamp.is_none() && self.value.is_none()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetricSample {
    pub name: String,
    pub reading: Reading,
    /// Updated since the last report read it
    pub pending: bool,
}

impl MetricSample {
    pub fn unset(name: &str) -> Self {
        Self {
            name: name.to_string(),
            reading: Reading::unset(),
            pending: false,
        }
    }

    pub fn clear(&mut self) {
        self.reading = Reading::unset();
        self.pending = false;
    }
}
