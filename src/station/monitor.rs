use crate::config::SECONDS_IN_HOUR;
use crate::discrete_system::Time;
use failure::Error;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::PathBuf;
use std::rc::Rc;
use tracing::{debug, warn};

/// Occupancy of a resource right after an acquire or a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub time: Time,
    pub occupancy: usize,
}

/// Durable storage for monitor snapshots. Each flush hands over every sample
/// recorded so far, so a sink may simply overwrite what it had.
pub trait SampleSink {
    fn flush(&mut self, resource: &str, samples: &[Sample]) -> Result<(), Error>;
}

/// Keeps the latest snapshot per resource. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    snapshots: Rc<RefCell<BTreeMap<String, Vec<Sample>>>>,
}

impl MemorySink {
    pub fn new() -> MemorySink {
        MemorySink::default()
    }

    #[cfg(test)]
    pub fn snapshot(&self, resource: &str) -> Option<Vec<Sample>> {
        self.snapshots.borrow().get(resource).cloned()
    }
}

impl SampleSink for MemorySink {
    fn flush(&mut self, resource: &str, samples: &[Sample]) -> Result<(), Error> {
        self.snapshots
            .borrow_mut()
            .insert(resource.to_string(), samples.to_vec());

        Ok(())
    }
}

/// Writes `<directory>/<resource>.json` on every flush.
pub struct JsonDirectorySink {
    directory: PathBuf,
}

impl JsonDirectorySink {
    pub fn new(directory: PathBuf) -> Result<JsonDirectorySink, Error> {
        fs::create_dir_all(&directory)?;

        Ok(JsonDirectorySink { directory })
    }
}

impl SampleSink for JsonDirectorySink {
    fn flush(&mut self, resource: &str, samples: &[Sample]) -> Result<(), Error> {
        let path = self.directory.join(resource).with_extension("json");
        let file = File::create(&path)?;

        serde_json::to_writer(file, samples)?;

        Ok(())
    }
}

/// Append-only occupancy log of one resource, flushed to a sink once per
/// simulated hour boundary crossed.
#[derive(Debug)]
pub struct UsageMonitor {
    name: String,
    samples: Vec<Sample>,
    flushed_hour: Time,
}

impl UsageMonitor {
    pub fn new(name: &str) -> UsageMonitor {
        UsageMonitor {
            name: name.to_string(),
            samples: Vec::new(),
            flushed_hour: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn record(&mut self, time: Time, occupancy: usize, sink: &mut dyn SampleSink) {
        self.samples.push(Sample { time, occupancy });

        let hour = time / SECONDS_IN_HOUR;

        if hour > self.flushed_hour {
            self.flush(sink);
            self.flushed_hour = hour;
        }
    }

    /// Hands every sample so far to `sink`, regardless of the hour.
    pub fn flush(&mut self, sink: &mut dyn SampleSink) {
        debug!(resource = %self.name, samples = self.samples.len(), "flushing usage samples");

        if let Err(error) = sink.flush(&self.name, &self.samples) {
            warn!(resource = %self.name, %error, "could not flush usage samples");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_are_appended_in_order() {
        let mut sink = MemorySink::new();
        let mut monitor = UsageMonitor::new("cashiers");

        monitor.record(1, 1, &mut sink);
        monitor.record(2, 0, &mut sink);

        assert_eq!(
            monitor.samples(),
            &[Sample { time: 1, occupancy: 1 }, Sample { time: 2, occupancy: 0 }]
        );
        assert_eq!(sink.snapshot("cashiers"), None);
    }

    #[test]
    fn flushes_once_per_hour_boundary() {
        let mut sink = MemorySink::new();
        let mut monitor = UsageMonitor::new("fuel_pumps");

        monitor.record(10, 1, &mut sink);
        monitor.record(SECONDS_IN_HOUR, 2, &mut sink);

        assert_eq!(sink.snapshot("fuel_pumps").map(|s| s.len()), Some(2));

        monitor.record(SECONDS_IN_HOUR + 5, 1, &mut sink);

        assert_eq!(sink.snapshot("fuel_pumps").map(|s| s.len()), Some(2));

        monitor.record(5 * SECONDS_IN_HOUR, 0, &mut sink);

        assert_eq!(sink.snapshot("fuel_pumps").map(|s| s.len()), Some(4));
    }

    struct FailingSink;

    impl SampleSink for FailingSink {
        fn flush(&mut self, _resource: &str, _samples: &[Sample]) -> Result<(), Error> {
            Err(failure::err_msg("disk full"))
        }
    }

    #[test]
    fn explicit_flush_writes_the_unflushed_tail() {
        let mut sink = MemorySink::new();
        let mut monitor = UsageMonitor::new("parking_places");

        monitor.record(SECONDS_IN_HOUR, 1, &mut sink);
        monitor.record(SECONDS_IN_HOUR + 10, 2, &mut sink);

        assert_eq!(sink.snapshot("parking_places").map(|s| s.len()), Some(1));

        monitor.flush(&mut sink);

        assert_eq!(sink.snapshot("parking_places").as_deref(), Some(monitor.samples()));
    }

    #[test]
    fn failing_sink_does_not_lose_samples() {
        let mut monitor = UsageMonitor::new("cashiers");

        monitor.record(2 * SECONDS_IN_HOUR, 1, &mut FailingSink);
        monitor.record(3 * SECONDS_IN_HOUR, 0, &mut FailingSink);

        assert_eq!(monitor.samples().len(), 2);
    }
}
