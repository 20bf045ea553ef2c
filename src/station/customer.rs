use crate::config::{format_time, Id};
use crate::discrete_system::Time;
use crate::discrete_system::address::Address;
use crate::station::{car_dispatcher, Event as StationEvent, StationComponent, Step};
use crate::station::pool::ResourceKind;
use crate::station::record::{CustomerRecord, FoodWait, Visit};
use crate::station::resource::{Priority, Token};
use tracing::{debug, info};

/// 1. `Customer` when
///     * `Arrived`
///         1) request a fuel pump parking place, transition to `WaitingParkingSlot`
///     * `WaitingParkingSlot`
///         * On the parking place granted: request a pump, transition to `WaitingPump`
///     * `WaitingPump`
///         * On the pump granted: transition to `Fueling`, schedule `FuelingFinished`
///           in the fueling time left
///     * `Fueling`
///         * Should accept `FuelingFinished` of the current attempt
///             1) account the fuel, release the pump, go pay
///         * Should accept `Preempted` for the held pump
///             1) account the fuel obtained so far, acknowledge the eviction
///             2) go pay when nothing is left, request a pump again otherwise
///               (the pump parking place is kept)
///     * `WaitingCashier` / `Paying`
///         * pay at priority 1, then wait for food when eating, leave otherwise
///     * `WaitingFood` / `WaitingFoodPickup` / `PickingUpFood`
///         * wait for the hot-dog, pick it up at priority 0, then leave
///     * `Departed`
///         * parking places returned, record sent to the dispatcher, component gone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Arrived,
    WaitingParkingSlot,
    WaitingPump,
    Fueling { since: Time },
    WaitingCashier,
    Paying,
    WaitingFood,
    WaitingFoodPickup,
    PickingUpFood,
    Departed,
}

#[derive(Debug, Clone)]
pub enum Event {
    FuelingFinished(u32),
    InteractionFinished,
    FoodPrepared,
    FoodPickedUp,
}

#[derive(Debug)]
pub struct Customer {
    number: Id,
    dispatcher: Address,
    visit: Visit,
    state: State,
    left_fueling_time: Time,
    attempt: u32,
    parking_slot: Option<Token>,
    pump: Option<Token>,
    /// Pumps taken away before their grant got delivered.
    revoked_grants: Vec<Token>,
    cashier: Option<Token>,
}

impl Customer {
    pub fn new(number: Id, dispatcher: Address, visit: Visit) -> Customer {
        Customer {
            number,
            dispatcher,
            left_fueling_time: visit.expected_fueling_time,
            visit,
            state: State::Arrived,
            attempt: 0,
            parking_slot: None,
            pump: None,
            revoked_grants: Vec::new(),
            cashier: None,
        }
    }

    #[cfg(test)]
    pub fn number(&self) -> Id {
        self.number
    }

    pub fn name(&self) -> &str {
        &self.visit.name
    }

    fn request_parking_slot(&mut self, step: &mut Step) {
        self.state = State::WaitingParkingSlot;

        let acquisition = step.acquire(ResourceKind::FuelPumpParking, Priority::NORMAL);
        self.parking_slot = Some(acquisition.token());

        if acquisition.is_granted() {
            self.enter_pump_parking(step);
        }
    }

    fn enter_pump_parking(&mut self, step: &mut Step) {
        info!(at = %step.at(), "[{}]: Entering a fuel pump parking place.", self.visit.name);

        self.request_pump(step);
    }

    fn request_pump(&mut self, step: &mut Step) {
        self.state = State::WaitingPump;

        info!(
            at = %step.at(),
            "[{}]: Waiting for the pump with the fueling time {}.",
            self.visit.name,
            format_time(self.left_fueling_time, false)
        );

        let acquisition = step.acquire(ResourceKind::FuelPumps, Priority::NORMAL);
        self.pump = Some(acquisition.token());

        if acquisition.is_granted() {
            self.start_fueling(step);
        }
    }

    fn start_fueling(&mut self, step: &mut Step) {
        if self.visit.fueling_start_time.is_none() {
            self.visit.fueling_start_time = Some(step.now);
        }

        self.attempt += 1;
        self.state = State::Fueling { since: step.now };

        info!(at = %step.at(), "[{}]: Fueling.", self.visit.name);
        info!(
            at = %step.at(),
            "[STATION]: Getting a pump. {}",
            step.station.allocation(ResourceKind::FuelPumps, "pumps")
        );

        step.effector.schedule_in_to_self(
            self.left_fueling_time,
            Event::FuelingFinished(self.attempt).into(),
        );
    }

    fn obtain_fuel(&mut self, elapsed: Time) {
        self.visit.fuel_obtained += elapsed;

        assert!(
            self.visit.fuel_obtained <= self.visit.expected_fueling_time,
            "[{}]: fuel obtained {} exceeds the expected fueling time {}",
            self.visit.name,
            self.visit.fuel_obtained,
            self.visit.expected_fueling_time
        );

        self.left_fueling_time -= elapsed;
    }

    fn release_pump(&mut self, step: &mut Step) {
        if let Some(token) = self.pump.take() {
            step.release(ResourceKind::FuelPumps, token);
        }

        info!(
            at = %step.at(),
            "[STATION]: Releasing a pump. {}",
            step.station.allocation(ResourceKind::FuelPumps, "pumps")
        );
    }

    fn finish_fueling(&mut self, step: &mut Step, since: Time) {
        self.obtain_fuel(step.now - since);

        info!(at = %step.at(), "[{}]: Fueling succeeded.", self.visit.name);

        self.visit.fueling_end_time = Some(step.now);
        self.release_pump(step);
        self.wait_for_cashier(step);
    }

    /// The pump was taken away `since` the attempt began. The pump parking
    /// place stays held while queueing for the next pump.
    fn interrupt_fueling(&mut self, step: &mut Step, since: Time) {
        self.obtain_fuel(step.now - since);
        self.visit.interruptions += 1;

        let percentage = if self.visit.expected_fueling_time == 0 {
            100.0
        } else {
            self.visit.fuel_obtained as f64 / self.visit.expected_fueling_time as f64 * 100.0
        };

        info!(
            at = %step.at(),
            "[{}]: Fueling has been interrupted. Have {:.2}% of the fuel needed.",
            self.visit.name,
            percentage
        );

        self.release_pump(step);

        if self.left_fueling_time == 0 {
            if self.visit.fueling_start_time.is_none() {
                self.visit.fueling_start_time = Some(step.now);
            }

            self.visit.fueling_end_time = Some(step.now);
            self.wait_for_cashier(step);
        } else {
            self.request_pump(step);
        }
    }

    fn wait_for_cashier(&mut self, step: &mut Step) {
        self.state = State::WaitingCashier;

        info!(at = %step.at(), "[{}]: Waiting at the counter.", self.visit.name);
        info!(
            at = %step.at(),
            "[STATION]: {}",
            step.station.allocation(ResourceKind::Cashiers, "cashiers")
        );

        let acquisition = step.acquire(ResourceKind::Cashiers, Priority::NORMAL);
        self.cashier = Some(acquisition.token());

        if acquisition.is_granted() {
            self.interact_with_cashier(step);
        }
    }

    fn interact_with_cashier(&mut self, step: &mut Step) {
        self.state = State::Paying;
        self.visit.interacting_with_cashier_start_time = Some(step.now);

        info!(at = %step.at(), "[{}]: Interacting with the cashier.", self.visit.name);

        let station = &mut *step.station;
        let interacting_time = station.sampler.duration(&station.settings.interaction_with_cashier_time);

        step.effector
            .schedule_in_to_self(interacting_time, Event::InteractionFinished.into());
    }

    fn finish_interaction(&mut self, step: &mut Step) {
        self.visit.interacting_with_cashier_end_time = Some(step.now);

        if let Some(token) = self.cashier.take() {
            step.release(ResourceKind::Cashiers, token);
        }

        if self.visit.eating {
            self.wait_for_food(step);
        } else {
            self.depart(step);
        }
    }

    fn wait_for_food(&mut self, step: &mut Step) {
        self.state = State::WaitingFood;
        self.visit.food = Some(FoodWait {
            start_time: step.now,
            end_time: None,
        });

        info!(at = %step.at(), "[{}]: Waiting for a hot-dog.", self.visit.name);

        let station = &mut *step.station;
        let food_preparation_time = station.sampler.duration(&station.settings.food_preparation_time);

        step.effector
            .schedule_in_to_self(food_preparation_time, Event::FoodPrepared.into());
    }

    fn request_food_pickup(&mut self, step: &mut Step) {
        self.state = State::WaitingFoodPickup;

        info!(
            at = %step.at(),
            "[STATION]: {}",
            step.station.allocation(ResourceKind::Cashiers, "cashiers")
        );

        let acquisition = step.acquire(ResourceKind::Cashiers, Priority::FOOD_PICKUP);
        self.cashier = Some(acquisition.token());

        if acquisition.is_granted() {
            self.pick_up_food(step);
        }
    }

    fn pick_up_food(&mut self, step: &mut Step) {
        self.state = State::PickingUpFood;

        let station = &mut *step.station;
        let pickup_time = station
            .sampler
            .duration(&station.settings.interaction_with_cashier_while_getting_food_time);

        step.effector
            .schedule_in_to_self(pickup_time, Event::FoodPickedUp.into());
    }

    fn finish_food_pickup(&mut self, step: &mut Step) {
        info!(at = %step.at(), "[{}]: Got a hot-dog.", self.visit.name);

        if let Some(token) = self.cashier.take() {
            step.release(ResourceKind::Cashiers, token);
        }

        if let Some(food) = self.visit.food.as_mut() {
            food.end_time = Some(step.now);
        }

        self.depart(step);
    }

    fn depart(&mut self, step: &mut Step) {
        assert_eq!(
            self.visit.fuel_obtained, self.visit.expected_fueling_time,
            "[{}]: leaving without the fuel needed",
            self.visit.name
        );

        self.state = State::Departed;

        if let Some(token) = self.parking_slot.take() {
            step.release(ResourceKind::FuelPumpParking, token);
        }

        step.station.pool.return_parking_place(step.now);

        info!(at = %step.at(), "[{}]: Leaving the station.", self.visit.name);

        let record = CustomerRecord::admitted(self.number, self.visit.clone());

        step.effector.schedule_immediately(
            self.dispatcher,
            car_dispatcher::Event::CarLeft(Box::new(record)).into(),
        );
        step.effector.terminate();
    }

    fn granted(&mut self, step: &mut Step, kind: ResourceKind, token: Token) {
        match (self.state, kind) {
            (State::WaitingParkingSlot, ResourceKind::FuelPumpParking) if self.parking_slot == Some(token) => {
                self.enter_pump_parking(step)
            }
            (State::WaitingPump, ResourceKind::FuelPumps) if self.pump == Some(token) => self.start_fueling(step),
            (State::WaitingCashier, ResourceKind::Cashiers) if self.cashier == Some(token) => {
                self.interact_with_cashier(step)
            }
            (State::WaitingFoodPickup, ResourceKind::Cashiers) if self.cashier == Some(token) => {
                self.pick_up_food(step)
            }
            (_, ResourceKind::FuelPumps) if self.revoked_grants.contains(&token) => {
                self.revoked_grants.retain(|revoked| *revoked != token);

                debug!(at = %step.at(), "[{}]: Ignoring revoked pump grant {}.", self.visit.name, token)
            }
            (state, kind) => panic!(
                "[{}]: {} granted {} while {:?}",
                self.visit.name, kind, token, state
            ),
        }
    }

    fn preempted(&mut self, step: &mut Step, token: Token) {
        if self.pump != Some(token) {
            panic!("[{}]: evicted from pump {} it does not hold", self.visit.name, token);
        }

        let now = step.now;

        match self.state {
            State::Fueling { since } => self.interrupt_fueling(step, since),
            // granted and evicted within the same instant, before fueling began
            State::WaitingPump => {
                self.revoked_grants.push(token);
                self.interrupt_fueling(step, now)
            }
            state => panic!("[{}]: evicted from pump {} while {:?}", self.visit.name, token, state),
        }
    }
}

impl StationComponent for Customer {
    fn start(&mut self, step: &mut Step) {
        info!(at = %step.at(), "[{}]: Entering the station.", self.visit.name);

        self.request_parking_slot(step);
    }

    fn handle(&mut self, step: &mut Step, _sender: Address, message: StationEvent) {
        match message {
            StationEvent::ResourceGranted(kind, token) => self.granted(step, kind, token),
            StationEvent::Preempted(token) => self.preempted(step, token),
            StationEvent::CustomerEvent(event) => match (self.state, event) {
                (State::Fueling { since }, Event::FuelingFinished(attempt)) if attempt == self.attempt => {
                    self.finish_fueling(step, since)
                }
                // timer of an interrupted attempt
                (_, Event::FuelingFinished(_)) => {}
                (State::Paying, Event::InteractionFinished) => self.finish_interaction(step),
                (State::WaitingFood, Event::FoodPrepared) => self.request_food_pickup(step),
                (State::PickingUpFood, Event::FoodPickedUp) => self.finish_food_pickup(step),
                (state, event) => panic!("[{}]: unexpected {:?} while {:?}", self.visit.name, event, state),
            },
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationSettings;
    use crate::discrete_system::Lane;
    use crate::station::GasStation;
    use crate::station::monitor::MemorySink;

    fn station() -> GasStation {
        let settings = SimulationSettings {
            pumps_quantity: 1,
            cashiers_quantity: 1,
            interaction_with_cashier_time: crate::sampling::Distribution::Fixed(5),
            eating_probability: 0.0,
            ..SimulationSettings::default()
        };

        GasStation::new(settings, Box::new(MemorySink::new()))
    }

    fn customer(expected: Time) -> Customer {
        Customer::new(0, 99, Visit::new(0, 0, expected, expected, false))
    }

    #[test]
    fn starts_fueling_when_everything_is_free() {
        let mut station = station();
        let mut customer = customer(20);

        let mut step = Step::new(1, 0, &mut station);
        customer.start(&mut step);

        assert_eq!(customer.state, State::Fueling { since: 0 });
        assert_eq!(customer.visit.fueling_start_time, Some(0));
        assert_eq!(step.effector.events.len(), 1);
        assert_eq!(step.effector.events[0].in_time, 20);
    }

    #[test]
    fn preemption_accounts_partial_fuel_and_requeues() {
        let mut station = station();
        let mut customer = customer(20);

        customer.start(&mut Step::new(1, 0, &mut station));

        let breakdown = {
            let mut step = Step::new(2, 7, &mut station);
            let acquisition = step.acquire(ResourceKind::FuelPumps, Priority::BREAKDOWN);

            assert_eq!(step.effector.events.len(), 1);
            assert_eq!(step.effector.events[0].lane, Lane::Interrupt);

            acquisition.token()
        };

        let evicted = customer.pump.expect("customer holds a pump");
        customer.handle(&mut Step::new(1, 7, &mut station), 2, StationEvent::Preempted(evicted));

        assert_eq!(customer.visit.fuel_obtained, 7);
        assert_eq!(customer.left_fueling_time, 13);
        assert_eq!(customer.visit.interruptions, 1);
        assert_eq!(customer.state, State::WaitingPump);
        assert!(customer.parking_slot.is_some());

        let mut step = Step::new(2, 10, &mut station);
        step.release(ResourceKind::FuelPumps, breakdown);
        assert_eq!(step.effector.events.len(), 1);
        drop(step);

        let regranted = customer.pump.expect("customer queued for a pump");
        customer.handle(&mut Step::new(1, 10, &mut station), 2, StationEvent::ResourceGranted(ResourceKind::FuelPumps, regranted));

        assert_eq!(customer.state, State::Fueling { since: 10 });
        assert_eq!(customer.visit.fueling_start_time, Some(0));

        // the timer of the first attempt fires and is ignored
        customer.handle(&mut Step::new(1, 20, &mut station), 1, Event::FuelingFinished(1).into());
        assert_eq!(customer.state, State::Fueling { since: 10 });

        customer.handle(&mut Step::new(1, 23, &mut station), 1, Event::FuelingFinished(2).into());

        assert_eq!(customer.visit.fuel_obtained, 20);
        assert_eq!(customer.visit.fueling_end_time, Some(23));
        assert_eq!(customer.state, State::Paying);
    }

    #[test]
    fn eviction_at_the_last_second_finishes_fueling() {
        let mut station = station();
        let mut customer = customer(10);

        customer.start(&mut Step::new(1, 0, &mut station));
        Step::new(2, 10, &mut station).acquire(ResourceKind::FuelPumps, Priority::BREAKDOWN);

        let evicted = customer.pump.expect("customer holds a pump");
        customer.handle(&mut Step::new(1, 10, &mut station), 2, StationEvent::Preempted(evicted));

        assert_eq!(customer.visit.fuel_obtained, 10);
        assert_eq!(customer.visit.fueling_end_time, Some(10));
        assert_eq!(customer.state, State::Paying);
        assert_eq!(customer.visit.interacting_with_cashier_start_time, Some(10));
    }

    #[test]
    fn grant_revoked_before_delivery_is_ignored_once() {
        let mut station = station();
        let mut customer = customer(20);

        let other = Step::new(3, 0, &mut station)
            .acquire(ResourceKind::FuelPumps, Priority::NORMAL)
            .token();

        customer.start(&mut Step::new(1, 0, &mut station));
        assert_eq!(customer.state, State::WaitingPump);

        let granted = customer.pump.expect("customer queued for a pump");

        // the pump goes to the customer, then to a breakdown before the grant arrives
        Step::new(3, 5, &mut station).release(ResourceKind::FuelPumps, other);
        Step::new(4, 5, &mut station).acquire(ResourceKind::FuelPumps, Priority::BREAKDOWN);

        customer.handle(&mut Step::new(1, 5, &mut station), 4, StationEvent::Preempted(granted));

        assert_eq!(customer.state, State::WaitingPump);
        assert_eq!(customer.visit.interruptions, 1);
        assert_eq!(customer.visit.fuel_obtained, 0);
        assert_eq!(customer.revoked_grants, vec![granted]);
        assert_ne!(customer.pump, Some(granted));

        customer.handle(
            &mut Step::new(1, 5, &mut station),
            3,
            StationEvent::ResourceGranted(ResourceKind::FuelPumps, granted),
        );

        assert_eq!(customer.state, State::WaitingPump);
        assert!(customer.revoked_grants.is_empty());
    }

    #[test]
    #[should_panic(expected = "granted")]
    fn unknown_pump_grant_while_paying_is_fatal() {
        let mut station = station();
        let mut customer = customer(0);

        customer.start(&mut Step::new(1, 0, &mut station));
        customer.handle(&mut Step::new(1, 0, &mut station), 1, Event::FuelingFinished(1).into());
        assert_eq!(customer.state, State::Paying);

        let other = Step::new(2, 1, &mut station)
            .acquire(ResourceKind::FuelPumps, Priority::NORMAL)
            .token();

        customer.handle(
            &mut Step::new(1, 1, &mut station),
            2,
            StationEvent::ResourceGranted(ResourceKind::FuelPumps, other),
        );
    }

    #[test]
    #[should_panic(expected = "exceeds the expected fueling time")]
    fn overfueling_is_fatal() {
        let mut customer = customer(5);

        customer.obtain_fuel(6);
    }

    #[test]
    fn departure_returns_the_parking_place_and_reports() {
        let mut station = station();
        let mut customer = customer(0);

        assert!(station.pool.take_parking_place(0));
        customer.start(&mut Step::new(1, 0, &mut station));
        customer.handle(&mut Step::new(1, 0, &mut station), 1, Event::FuelingFinished(1).into());

        let mut step = Step::new(1, 5, &mut station);
        customer.handle(&mut step, 1, Event::InteractionFinished.into());

        assert_eq!(customer.state, State::Departed);
        assert!(step.effector.terminated);
        assert_eq!(step.effector.events.len(), 1);
        drop(step);

        assert_eq!(station.pool.parking_places.level(), 4);
        assert_eq!(station.pool.fuel_pump_parking.count(), 0);
        assert_eq!(station.pool.cashiers.count(), 0);
    }
}
