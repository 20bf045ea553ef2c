use crate::config::SimulationSettings;
use crate::discrete_system::Time;
use crate::discrete_system::address::Address;
use crate::station::monitor::{Sample, SampleSink, UsageMonitor};
use crate::station::resource::{Acquisition, Grant, Policy, Priority, Resource, Token};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    FuelPumpParking,
    FuelPumps,
    Cashiers,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ResourceKind::FuelPumpParking => "fuel_pump_parking",
            ResourceKind::FuelPumps => "fuel_pumps",
            ResourceKind::Cashiers => "cashiers",
        };

        f.write_str(name)
    }
}

/// A resource whose every acquire and release is sampled.
#[derive(Debug)]
pub struct MonitoredResource {
    resource: Resource,
    monitor: UsageMonitor,
}

impl MonitoredResource {
    pub fn new(kind: ResourceKind, capacity: u32, policy: Policy) -> MonitoredResource {
        let name = kind.to_string();

        MonitoredResource {
            resource: Resource::new(&name, capacity as usize, policy),
            monitor: UsageMonitor::new(&name),
        }
    }

    pub fn count(&self) -> usize {
        self.resource.count()
    }

    pub fn capacity(&self) -> usize {
        self.resource.capacity()
    }

    /// Requests still queued.
    pub fn waiting(&self) -> usize {
        self.resource.queue_len()
    }

    fn acquire(&mut self, now: Time, owner: Address, priority: Priority, sink: &mut dyn SampleSink) -> Acquisition {
        let acquisition = self.resource.acquire(owner, priority);

        self.monitor.record(now, self.resource.count(), sink);

        acquisition
    }

    fn release(&mut self, now: Time, token: Token, sink: &mut dyn SampleSink) -> Option<Grant> {
        let grant = self.resource.release(token);

        self.monitor.record(now, self.resource.count(), sink);

        grant
    }
}

/// Cars allowed on the station premises at once, including the ones at a
/// pump.
#[derive(Debug)]
pub struct ParkingCapacity {
    level: u32,
    capacity: u32,
    monitor: UsageMonitor,
}

impl ParkingCapacity {
    pub fn new(capacity: u32) -> ParkingCapacity {
        ParkingCapacity {
            level: capacity,
            capacity,
            monitor: UsageMonitor::new("parking_places"),
        }
    }

    /// Places still free.
    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    fn take(&mut self, now: Time, sink: &mut dyn SampleSink) -> bool {
        if self.level == 0 {
            return false;
        }

        self.level -= 1;
        self.monitor.record(now, (self.capacity - self.level) as usize, sink);

        true
    }

    fn put(&mut self, now: Time, sink: &mut dyn SampleSink) {
        assert!(
            self.level < self.capacity,
            "parking place returned while all {} places are free",
            self.capacity
        );

        self.level += 1;
        self.monitor.record(now, (self.capacity - self.level) as usize, sink);
    }
}

/// Every contended thing at the station plus the sink their monitors flush
/// into.
pub struct ResourcePool {
    pub fuel_pump_parking: MonitoredResource,
    pub fuel_pumps: MonitoredResource,
    pub cashiers: MonitoredResource,
    pub parking_places: ParkingCapacity,
    sink: Box<dyn SampleSink>,
}

impl ResourcePool {
    pub fn new(settings: &SimulationSettings, sink: Box<dyn SampleSink>) -> ResourcePool {
        ResourcePool {
            fuel_pump_parking: MonitoredResource::new(ResourceKind::FuelPumpParking, settings.pumps_quantity, Policy::Fifo),
            fuel_pumps: MonitoredResource::new(ResourceKind::FuelPumps, settings.pumps_quantity, Policy::Preemptive),
            cashiers: MonitoredResource::new(ResourceKind::Cashiers, settings.cashiers_quantity, Policy::Priority),
            parking_places: ParkingCapacity::new(settings.parking_capacity()),
            sink,
        }
    }

    pub fn resource(&self, kind: ResourceKind) -> &MonitoredResource {
        match kind {
            ResourceKind::FuelPumpParking => &self.fuel_pump_parking,
            ResourceKind::FuelPumps => &self.fuel_pumps,
            ResourceKind::Cashiers => &self.cashiers,
        }
    }

    fn split(&mut self, kind: ResourceKind) -> (&mut MonitoredResource, &mut dyn SampleSink) {
        let resource = match kind {
            ResourceKind::FuelPumpParking => &mut self.fuel_pump_parking,
            ResourceKind::FuelPumps => &mut self.fuel_pumps,
            ResourceKind::Cashiers => &mut self.cashiers,
        };

        (resource, &mut *self.sink)
    }

    pub fn acquire(&mut self, kind: ResourceKind, now: Time, owner: Address, priority: Priority) -> Acquisition {
        let (resource, sink) = self.split(kind);

        resource.acquire(now, owner, priority, sink)
    }

    pub fn release(&mut self, kind: ResourceKind, now: Time, token: Token) -> Option<Grant> {
        let (resource, sink) = self.split(kind);

        resource.release(now, token, sink)
    }

    /// Admits one car if there is room.
    pub fn take_parking_place(&mut self, now: Time) -> bool {
        self.parking_places.take(now, &mut *self.sink)
    }

    pub fn return_parking_place(&mut self, now: Time) {
        self.parking_places.put(now, &mut *self.sink)
    }

    fn monitors(&self) -> [&UsageMonitor; 4] {
        [
            &self.fuel_pump_parking.monitor,
            &self.fuel_pumps.monitor,
            &self.cashiers.monitor,
            &self.parking_places.monitor,
        ]
    }

    /// Every sample recorded so far, keyed by resource name.
    pub fn monitored(&self) -> BTreeMap<String, Vec<Sample>> {
        self.monitors()
            .iter()
            .map(|monitor| (monitor.name().to_string(), monitor.samples().to_vec()))
            .collect()
    }

    /// Writes out the samples recorded since the last hour boundary.
    pub fn flush(&mut self) {
        let sink = &mut *self.sink;

        for monitor in [
            &mut self.fuel_pump_parking.monitor,
            &mut self.fuel_pumps.monitor,
            &mut self.cashiers.monitor,
            &mut self.parking_places.monitor,
        ]
        .iter_mut()
        {
            monitor.flush(sink);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::station::monitor::MemorySink;

    fn pool(pumps: u32, cashiers: u32) -> ResourcePool {
        let settings = SimulationSettings {
            pumps_quantity: pumps,
            cashiers_quantity: cashiers,
            ..SimulationSettings::default()
        };

        ResourcePool::new(&settings, Box::new(MemorySink::new()))
    }

    #[test]
    fn every_operation_leaves_a_sample() {
        let mut pool = pool(2, 1);

        let first = pool.acquire(ResourceKind::FuelPumps, 3, 1, Priority::NORMAL).token();
        pool.acquire(ResourceKind::FuelPumps, 4, 2, Priority::NORMAL);
        pool.release(ResourceKind::FuelPumps, 9, first);

        assert_eq!(
            pool.fuel_pumps.monitor.samples(),
            &[
                Sample { time: 3, occupancy: 1 },
                Sample { time: 4, occupancy: 2 },
                Sample { time: 9, occupancy: 1 },
            ]
        );
        assert!(pool.cashiers.monitor.samples().is_empty());
    }

    #[test]
    fn waking_a_waiter_keeps_occupancy() {
        let mut pool = pool(1, 1);

        let first = pool.acquire(ResourceKind::Cashiers, 0, 1, Priority::NORMAL).token();
        let second = pool.acquire(ResourceKind::Cashiers, 1, 2, Priority::NORMAL).token();

        assert_eq!(pool.release(ResourceKind::Cashiers, 2, first), Some(Grant { token: second, owner: 2 }));
        assert_eq!(pool.cashiers.monitor.samples().last(), Some(&Sample { time: 2, occupancy: 1 }));
    }

    #[test]
    fn parking_admits_up_to_capacity() {
        let mut pool = pool(1, 1);

        for _ in 0..4 {
            assert!(pool.take_parking_place(0));
        }

        assert!(!pool.take_parking_place(1));
        assert_eq!(pool.parking_places.level(), 0);

        pool.return_parking_place(2);

        assert_eq!(pool.parking_places.level(), 1);
        assert!(pool.take_parking_place(3));
        assert_eq!(pool.parking_places.monitor.samples().last(), Some(&Sample { time: 3, occupancy: 4 }));
    }

    #[test]
    fn waiters_are_counted_until_granted() {
        let mut pool = pool(1, 1);

        let first = pool.acquire(ResourceKind::FuelPumpParking, 0, 1, Priority::NORMAL).token();
        pool.acquire(ResourceKind::FuelPumpParking, 1, 2, Priority::NORMAL);

        assert_eq!(pool.fuel_pump_parking.waiting(), 1);

        pool.release(ResourceKind::FuelPumpParking, 2, first);

        assert_eq!(pool.fuel_pump_parking.waiting(), 0);
    }

    #[test]
    fn flush_hands_the_whole_log_to_the_sink() {
        let sink = MemorySink::new();
        let settings = SimulationSettings {
            pumps_quantity: 1,
            ..SimulationSettings::default()
        };
        let mut pool = ResourcePool::new(&settings, Box::new(sink.clone()));

        pool.acquire(ResourceKind::Cashiers, 5, 1, Priority::NORMAL);
        assert!(pool.take_parking_place(6));

        assert_eq!(sink.snapshot("cashiers"), None);

        pool.flush();

        let monitored = pool.monitored();

        assert_eq!(sink.snapshot("cashiers").as_ref(), monitored.get("cashiers"));
        assert_eq!(sink.snapshot("parking_places").as_ref(), monitored.get("parking_places"));
        assert_eq!(sink.snapshot("fuel_pumps"), Some(Vec::new()));
    }

    #[test]
    #[should_panic(expected = "all 4 places are free")]
    fn parking_cannot_overflow() {
        let mut pool = pool(1, 1);

        pool.return_parking_place(0);
    }

    #[test]
    fn monitored_lists_every_resource() {
        let pool = pool(1, 1);

        let names: Vec<_> = pool.monitored().keys().cloned().collect();

        assert_eq!(names, vec!["cashiers", "fuel_pump_parking", "fuel_pumps", "parking_places"]);
    }
}
