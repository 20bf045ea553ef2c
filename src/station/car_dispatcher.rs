use crate::config::Id;
use crate::discrete_system::address::Address;
use crate::station::{Event as StationEvent, StationComponent, Step};
use crate::station::customer::Customer;
use crate::station::record::{CustomerRecord, Visit};
use tracing::info;

#[derive(Debug, Clone)]
pub enum Event {
    CarArrives,
    /// A customer left the station, handing over its finished record.
    CarLeft(Box<CustomerRecord>),
}

/// Only goal for CarDispatcher is to let cars arrive one after another and
/// admit them while the station has a free parking place. Every arriving car
/// gets the next number, whether it is admitted or not.
#[derive(Debug, Default)]
pub struct CarDispatcher {
    next_number: Id,
}

impl CarDispatcher {
    pub fn new() -> CarDispatcher {
        CarDispatcher { next_number: 0 }
    }

    /// Cars that arrived so far, admitted or not.
    pub fn arrivals(&self) -> Id {
        self.next_number
    }

    fn schedule_next(&mut self, step: &mut Step) {
        let station = &mut *step.station;
        let next_arrival = station.sampler.duration(&station.settings.next_car_arrival_time);

        step.effector
            .schedule_in_to_self(next_arrival, Event::CarArrives.into());
    }

    fn car_arrives(&mut self, step: &mut Step) {
        let number = self.next_number;
        self.next_number += 1;

        if step.station.pool.take_parking_place(step.now) {
            let parking = &step.station.pool.parking_places;

            info!(
                at = %step.at(),
                "A car is arriving to the station. {} of {} parking places are free.",
                parking.level(),
                parking.capacity()
            );

            let station = &mut *step.station;
            let fuel_needed = station.sampler.duration(&station.settings.customer_fuel_needed);
            let expected_fueling_time = station.settings.expected_fueling_time(fuel_needed);
            let eating = station.sampler.chance(station.settings.eating_probability);

            let visit = Visit::new(number, step.now, fuel_needed, expected_fueling_time, eating);

            step.effector
                .instantiate_new_component(Customer::new(number, step.address, visit).into());
        } else {
            step.station.results.push(CustomerRecord::rejected(number));

            info!(
                at = %step.at(),
                "A car missed station since there are no left parking places."
            );
        }

        self.schedule_next(step);
    }
}

impl StationComponent for CarDispatcher {
    fn start(&mut self, step: &mut Step) {
        self.schedule_next(step);
    }

    fn handle(&mut self, step: &mut Step, _sender: Address, message: StationEvent) {
        match message {
            StationEvent::CarDispatcherEvent(Event::CarArrives) => self.car_arrives(step),
            StationEvent::CarDispatcherEvent(Event::CarLeft(record)) => step.station.results.push(*record),
            _ => {}
        }
    }
}
