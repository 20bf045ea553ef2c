use crate::config::{format_time, SimulationSettings};
use crate::discrete_system::Time;
use crate::discrete_system::address::Address;
use crate::discrete_system::component::{Component as SystemComponent, HandleInfo, StartInfo};
use crate::discrete_system::effector::Effector;
use crate::sampling::Sampler;
use crate::station::monitor::SampleSink;
use crate::station::pool::{ResourceKind, ResourcePool};
use crate::station::record::CustomerRecord;
use crate::station::resource::{Acquisition, Priority, Token};

pub mod car_dispatcher;
pub mod customer;
pub mod monitor;
pub mod pool;
pub mod pump_breaker;
pub mod record;
pub mod resource;

#[derive(Debug, Clone)]
pub enum Event {
    /// A queued request of the receiver was granted.
    ResourceGranted(ResourceKind, Token),
    /// The receiver lost the pump held under this token.
    Preempted(Token),
    CarDispatcherEvent(car_dispatcher::Event),
    CustomerEvent(customer::Event),
    PumpBreakerEvent(pump_breaker::Event),
}

impl From<car_dispatcher::Event> for Event {
    fn from(event: car_dispatcher::Event) -> Event {
        Event::CarDispatcherEvent(event)
    }
}

impl From<customer::Event> for Event {
    fn from(event: customer::Event) -> Event {
        Event::CustomerEvent(event)
    }
}

impl From<pump_breaker::Event> for Event {
    fn from(event: pump_breaker::Event) -> Event {
        Event::PumpBreakerEvent(event)
    }
}

#[derive(Debug)]
pub enum Component {
    CarDispatcher(car_dispatcher::CarDispatcher),
    Customer(customer::Customer),
    PumpBreaker(pump_breaker::PumpBreaker),
}

impl From<car_dispatcher::CarDispatcher> for Component {
    fn from(dispatcher: car_dispatcher::CarDispatcher) -> Component {
        Component::CarDispatcher(dispatcher)
    }
}

impl From<customer::Customer> for Component {
    fn from(customer: customer::Customer) -> Component {
        Component::Customer(customer)
    }
}

impl From<pump_breaker::PumpBreaker> for Component {
    fn from(breaker: pump_breaker::PumpBreaker) -> Component {
        Component::PumpBreaker(breaker)
    }
}

impl Component {
    pub fn label(&self) -> String {
        match self {
            Component::CarDispatcher(_) => "Car Dispatcher".to_string(),
            Component::Customer(customer) => customer.name().to_string(),
            Component::PumpBreaker(_) => "Pump Breaker".to_string(),
        }
    }
}

/// The world all station components share for the length of one run.
pub struct GasStation {
    pub settings: SimulationSettings,
    pub sampler: Sampler,
    pub pool: ResourcePool,
    /// Finished visits and rejected arrivals, in the order they were settled.
    pub results: Vec<CustomerRecord>,
}

impl GasStation {
    pub fn new(settings: SimulationSettings, sink: Box<dyn SampleSink>) -> GasStation {
        GasStation {
            sampler: Sampler::new(settings.seed),
            pool: ResourcePool::new(&settings, sink),
            settings,
            results: Vec::new(),
        }
    }

    /// `[STATION]: 2 of 4 pumps are allocated, 1 waiting.`
    pub fn allocation(&self, kind: ResourceKind, what: &str) -> String {
        let resource = self.pool.resource(kind);

        format!(
            "{} of {} {} are allocated, {} waiting.",
            resource.count(),
            resource.capacity(),
            what,
            resource.waiting()
        )
    }
}

/// One reaction of a component: who is reacting, when, with access to the
/// station and the effector collecting the consequences.
pub struct Step<'a> {
    pub address: Address,
    pub now: Time,
    pub station: &'a mut GasStation,
    pub effector: Effector<Event, Component>,
}

impl<'a> Step<'a> {
    pub fn new(address: Address, now: Time, station: &'a mut GasStation) -> Step<'a> {
        Step {
            address,
            now,
            station,
            effector: Effector::new(),
        }
    }

    /// Current time the way the station log prints it.
    pub fn at(&self) -> String {
        format_time(self.now, true)
    }

    /// Requests `kind` on behalf of the reacting component. A holder evicted
    /// to make room is interrupted right away.
    pub fn acquire(&mut self, kind: ResourceKind, priority: Priority) -> Acquisition {
        let acquisition = self.station.pool.acquire(kind, self.now, self.address, priority);

        if let Acquisition::Evicted(_, eviction) = acquisition {
            self.effector.interrupt(eviction.owner, Event::Preempted(eviction.token));
        }

        acquisition
    }

    /// Returns `token` and lets the next waiter, if any, know it got the slot.
    pub fn release(&mut self, kind: ResourceKind, token: Token) {
        if let Some(grant) = self.station.pool.release(kind, self.now, token) {
            self.effector
                .schedule_immediately(grant.owner, Event::ResourceGranted(kind, grant.token));
        }
    }
}

trait StationComponent {
    fn start(&mut self, step: &mut Step);
    fn handle(&mut self, step: &mut Step, sender: Address, message: Event);
}

impl SystemComponent<Event, GasStation> for Component {
    fn start(&mut self, info: StartInfo, station: &mut GasStation) -> Effector<Event, Component> {
        let mut step = Step::new(info.self_address, info.current_time, station);

        match self {
            Component::CarDispatcher(dispatcher) => dispatcher.start(&mut step),
            Component::Customer(customer) => customer.start(&mut step),
            Component::PumpBreaker(breaker) => breaker.start(&mut step),
        }

        step.effector
    }

    fn handle(&mut self, info: HandleInfo, station: &mut GasStation, message: Event) -> Effector<Event, Component> {
        let mut step = Step::new(info.self_address, info.current_time, station);

        match self {
            Component::CarDispatcher(dispatcher) => dispatcher.handle(&mut step, info.sender_address, message),
            Component::Customer(customer) => customer.handle(&mut step, info.sender_address, message),
            Component::PumpBreaker(breaker) => breaker.handle(&mut step, info.sender_address, message),
        }

        step.effector
    }
}
