use crate::config::format_time;
use crate::discrete_system::address::Address;
use crate::station::{Event as StationEvent, StationComponent, Step};
use crate::station::pool::ResourceKind;
use crate::station::resource::{Priority, Token};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Working,
    Breaking(Token),
    Repairing(Token),
}

#[derive(Debug, Clone)]
pub enum Event {
    Break,
    Repaired,
}

/// Breaks pumps forever: `Working -> Breaking -> Repairing -> Working`.
///
/// A breakdown takes a pump at `Priority::BREAKDOWN`, evicting a fueling
/// customer when every pump is busy, and holds it for the outage.
#[derive(Debug)]
pub struct PumpBreaker {
    state: State,
    breakdowns: u32,
}

impl PumpBreaker {
    pub fn new() -> PumpBreaker {
        PumpBreaker {
            state: State::Working,
            breakdowns: 0,
        }
    }

    pub fn breakdowns(&self) -> u32 {
        self.breakdowns
    }

    fn schedule_break(&mut self, step: &mut Step) {
        self.state = State::Working;

        let station = &mut *step.station;

        match station.sampler.sample(&station.settings.pump_working_time) {
            Some(working_time) => {
                info!(
                    at = %step.at(),
                    "[PUMP BREAK]: A pump will break in {}",
                    format_time(working_time, false)
                );

                step.effector
                    .schedule_in_to_self(working_time, Event::Break.into());
            }
            None => info!(at = %step.at(), "[PUMP BREAK]: Pumps never break."),
        }
    }

    fn break_pump(&mut self, step: &mut Step) {
        info!(
            at = %step.at(),
            "[PUMP BREAK]: {}",
            step.station.allocation(ResourceKind::FuelPumps, "pumps")
        );

        let pumps = step.station.pool.resource(ResourceKind::FuelPumps);

        if pumps.count() == pumps.capacity() {
            info!(
                at = %step.at(),
                "[PUMP BREAK]: Interrupting the fueling process since all of the pumps are allocated."
            );
        }

        let acquisition = step.acquire(ResourceKind::FuelPumps, Priority::BREAKDOWN);

        if acquisition.is_granted() {
            self.repair(step, acquisition.token());
        } else {
            self.state = State::Breaking(acquisition.token());
        }
    }

    fn repair(&mut self, step: &mut Step, token: Token) {
        self.state = State::Repairing(token);
        self.breakdowns += 1;

        let station = &mut *step.station;
        let outage_time = station.sampler.duration(&station.settings.pump_outage_time);

        info!(
            at = %step.at(),
            "[PUMP BREAK]: One of the pumps has broken and will be unavailable for {}.",
            format_time(outage_time, false)
        );

        step.effector
            .schedule_in_to_self(outage_time, Event::Repaired.into());
    }

    fn repaired(&mut self, step: &mut Step, token: Token) {
        step.release(ResourceKind::FuelPumps, token);

        info!(at = %step.at(), "[PUMP BREAK]: The pump is repaired.");

        self.schedule_break(step);
    }
}

impl StationComponent for PumpBreaker {
    fn start(&mut self, step: &mut Step) {
        self.schedule_break(step);
    }

    fn handle(&mut self, step: &mut Step, _sender: Address, message: StationEvent) {
        match (self.state, message) {
            (State::Working, StationEvent::PumpBreakerEvent(Event::Break)) => self.break_pump(step),
            (State::Breaking(waiting), StationEvent::ResourceGranted(ResourceKind::FuelPumps, token)) if waiting == token => {
                self.repair(step, token)
            }
            (State::Repairing(token), StationEvent::PumpBreakerEvent(Event::Repaired)) => self.repaired(step, token),
            (state, message) => panic!("pump breaker got {:?} while {:?}", message, state),
        }
    }
}
