use crate::config::{validate_settings, Id, SimulationSettings};
use crate::discrete_system::{DiscreteSystem, Event as SystemEvent, Time};
use crate::station::{Component, Event, GasStation};
use crate::station::car_dispatcher::CarDispatcher;
use crate::station::monitor::{MemorySink, Sample, SampleSink};
use crate::station::pump_breaker::PumpBreaker;
use crate::station::record::CustomerRecord;
use failure::Error;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

pub type StationSystem = DiscreteSystem<Event, Component, GasStation>;

/// Everything a finished run leaves behind.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationResult {
    pub horizon: Time,
    /// Cars that arrived, admitted or not. Numbers `0..arrivals` were handed
    /// out; the ones missing from `records` were still at the station.
    pub arrivals: Id,
    pub breakdowns: u32,
    /// Departed and rejected cars, in the order they were settled.
    pub records: Vec<CustomerRecord>,
    pub monitored: BTreeMap<String, Vec<Sample>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub arrivals: Id,
    pub departed: usize,
    pub rejected: usize,
    pub still_at_station: usize,
    pub hot_dogs: usize,
    pub fuel_sold: u64,
    pub interruptions: u32,
    pub breakdowns: u32,
    pub mean_wait_for_pump: Option<f64>,
}

impl SimulationResult {
    fn collect(system: &StationSystem, horizon: Time) -> SimulationResult {
        let mut arrivals = 0;
        let mut breakdowns = 0;

        for component in system.components.values() {
            match component {
                Component::CarDispatcher(dispatcher) => arrivals = dispatcher.arrivals(),
                Component::PumpBreaker(breaker) => breakdowns = breaker.breakdowns(),
                Component::Customer(_) => {}
            }
        }

        SimulationResult {
            horizon,
            arrivals,
            breakdowns,
            records: system.world.results.clone(),
            monitored: system.world.pool.monitored(),
        }
    }

    /// Records ordered by car number, which is the order the cars arrived in.
    pub fn records_by_arrival(&self) -> Vec<CustomerRecord> {
        let mut records = self.records.clone();

        records.sort_by_key(|record| record.number);

        records
    }

    pub fn departed(&self) -> impl Iterator<Item = &CustomerRecord> {
        self.records.iter().filter(|record| record.admitted)
    }

    pub fn rejected(&self) -> impl Iterator<Item = &CustomerRecord> {
        self.records.iter().filter(|record| !record.admitted)
    }

    pub fn summary(&self) -> Summary {
        let visits: Vec<_> = self.departed().filter_map(|record| record.visit.as_ref()).collect();
        let waits: Vec<_> = self.departed().filter_map(|record| record.waiting_for_pump()).collect();

        Summary {
            arrivals: self.arrivals,
            departed: visits.len(),
            rejected: self.rejected().count(),
            still_at_station: self.arrivals as usize - self.records.len(),
            hot_dogs: visits.iter().filter(|visit| visit.eating).count(),
            fuel_sold: visits.iter().map(|visit| visit.fuel_needed).sum(),
            interruptions: visits.iter().map(|visit| visit.interruptions).sum(),
            breakdowns: self.breakdowns,
            mean_wait_for_pump: if waits.is_empty() {
                None
            } else {
                Some(waits.iter().sum::<Time>() as f64 / waits.len() as f64)
            },
        }
    }
}

pub struct GasStationSimulator {
    settings: SimulationSettings,
}

impl GasStationSimulator {
    pub fn new(settings: SimulationSettings) -> Result<GasStationSimulator, Error> {
        validate_settings(&settings)?;

        Ok(GasStationSimulator { settings })
    }

    /// A started system: the pump breaker and the car dispatcher have
    /// scheduled their first events.
    pub fn bootstrap(&self, sink: Box<dyn SampleSink>) -> StationSystem {
        let mut system = DiscreteSystem::new(GasStation::new(self.settings.clone(), sink));

        system.register_component(PumpBreaker::new().into());
        system.register_component(CarDispatcher::new().into());

        info!("[ENVIRONMENT] Environment set.");

        system.start();

        system
    }

    pub fn run(&self, horizon: Time) -> SimulationResult {
        let mut system = self.bootstrap(Box::new(MemorySink::new()));

        system.run_until(horizon);

        Self::finish(system, horizon)
    }

    /// Runs until `horizon`, flushing monitors into `sink` and handing every
    /// processed batch of events to `observer`.
    pub fn run_with<F>(&self, horizon: Time, sink: Box<dyn SampleSink>, observer: F) -> SimulationResult
        where F: FnMut(&StationSystem, &[SystemEvent<Event>])
    {
        let mut system = self.bootstrap(sink);

        system.run_until_with(horizon, observer);

        Self::finish(system, horizon)
    }

    fn finish(mut system: StationSystem, horizon: Time) -> SimulationResult {
        system.world.pool.flush();

        SimulationResult::collect(&system, horizon)
    }
}
