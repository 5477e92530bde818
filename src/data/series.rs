use serde::{Deserialize, Serialize};

use crate::channels::Channel;

/// Evenly sampled data for one channel over one span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub name: String,
    pub channel: Channel,
    /// GPS start time.
    pub epoch: f64,
    pub sample_rate: f64,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(skip)]
    pub values: Vec<f64>,
}

impl TimeSeries {
    pub fn new(channel: Channel, epoch: f64, sample_rate: f64, values: Vec<f64>) -> Self {
        Self {
            name: channel.name.clone(),
            unit: channel.unit.clone(),
            channel,
            epoch,
            sample_rate,
            values,
        }
    }

    pub fn duration(&self) -> f64 {
        if self.sample_rate > 0.0 {
            self.values.len() as f64 / self.sample_rate
        } else {
            0.0
        }
    }

    pub fn end(&self) -> f64 {
        self.epoch + self.duration()
    }

    /// Archive record name: `name,ndsname,epoch`.
    pub fn archive_key(&self) -> String {
        format!("{},{},{}", self.name, self.channel.ndsname(), self.epoch)
    }
}

/// Time-frequency data for one channel, stored row-major (time, frequency).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spectrogram {
    pub name: String,
    pub channel: Channel,
    pub epoch: f64,
    /// Time step between rows, in seconds.
    pub dt: f64,
    pub f0: f64,
    pub df: f64,
    #[serde(default)]
    pub unit: Option<String>,
    pub nfreq: usize,
    #[serde(skip)]
    pub values: Vec<f64>,
}

impl Spectrogram {
    pub fn ntimes(&self) -> usize {
        if self.nfreq == 0 {
            0
        } else {
            self.values.len() / self.nfreq
        }
    }

    pub fn row(&self, index: usize) -> Option<&[f64]> {
        let start = index.checked_mul(self.nfreq)?;
        self.values.get(start..start + self.nfreq)
    }

    /// Archive record name: `name,epoch`.
    pub fn archive_key(&self) -> String {
        format!("{},{}", self.name, self.epoch)
    }
}
