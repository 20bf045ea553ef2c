use crate::discrete_system::component::{Component, StartInfo, HandleInfo};
use std::collections::{BTreeMap, BinaryHeap};
use crate::discrete_system::address::{Address, AddressGenerator};
use std::cmp::Ordering;
use crate::discrete_system::effector::{Effector, ScheduledEventAddress};
use serde::{Deserialize, Serialize};
use tracing::trace;

pub mod address;
pub mod component;
pub mod effector;

/// Simulated seconds.
pub type Time = u64;

pub trait DiscreteSystemMessage: Clone {}
impl<T: Clone> DiscreteSystemMessage for T {}

/// Events sharing an instant are delivered interrupts first, then in the
/// order they were scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Lane {
    Interrupt,
    Normal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event<M: DiscreteSystemMessage> {
    pub time: Time,
    pub lane: Lane,
    sequence: u64,
    pub to_address: Address,
    pub from_address: Address,
    pub message: M,
}

impl<M: DiscreteSystemMessage> Event<M> {
    fn key(&self) -> (Time, Lane, u64) {
        (self.time, self.lane, self.sequence)
    }
}

impl<M: DiscreteSystemMessage> PartialEq for Event<M> {
    fn eq(&self, other: &Event<M>) -> bool {
        self.key() == other.key()
    }
}

impl<M: DiscreteSystemMessage> Eq for Event<M> {}

impl<M: DiscreteSystemMessage> PartialOrd for Event<M> {
    fn partial_cmp(&self, other: &Event<M>) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<M: DiscreteSystemMessage> Ord for Event<M> {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap, earliest key has to compare greatest
        other.key().cmp(&self.key())
    }
}

/// `DiscreteSystem` manages discrete system, which composes of components,
/// the world they share and information which the components are sending
/// between themselves
pub struct DiscreteSystem<M: DiscreteSystemMessage, C: Component<M, W>, W> {
    pub current_time: Time,
    pub components: BTreeMap<Address, C>,
    pub world: W,
    events: BinaryHeap<Event<M>>,
    address_generator: AddressGenerator,
    sequence: u64,
}

impl<M: DiscreteSystemMessage, C: Component<M, W>, W> DiscreteSystem<M, C, W> {
    pub fn new(world: W) -> DiscreteSystem<M, C, W> {
        DiscreteSystem {
            current_time: 0,
            components: BTreeMap::new(),
            world,
            events: BinaryHeap::new(),
            address_generator: AddressGenerator::new(),
            sequence: 0,
        }
    }

    pub fn register_component(&mut self, c: C) -> Address {
        let addr = self.address_generator.next();

        self.components.insert(addr, c);

        addr
    }

    fn start_component(&mut self, address: Address) {
        let effector = match self.components.get_mut(&address) {
            Some(component) => component.start(
                StartInfo {
                    self_address: address,
                    current_time: self.current_time,
                },
                &mut self.world,
            ),
            None => return,
        };

        self.apply_effector(address, effector);
    }

    fn apply_effector(&mut self, from_address: Address, effector: Effector<M, C>) {
        for event in effector.events.into_iter() {
            let to_address = match event.address {
                ScheduledEventAddress::SelfAddress => from_address,
                ScheduledEventAddress::RemoteAddress(remote) => remote,
            };

            self.sequence += 1;

            self.events.push(Event {
                from_address,
                to_address,
                message: event.message,
                lane: event.lane,
                sequence: self.sequence,
                time: self.current_time + event.in_time,
            });
        }

        if effector.terminated {
            self.components.remove(&from_address);
        }

        for component in effector.components.into_iter() {
            let addr = self.register_component(component);

            self.start_component(addr);
        }
    }

    /// Advances the clock to the next pending instant and delivers every event
    /// due at it, including the ones scheduled while delivering.
    pub fn tick(&mut self) -> Vec<Event<M>> {
        let mut events = Vec::new();

        let next_time = match self.events.peek() {
            Some(event) => event.time,
            None => return events,
        };

        self.current_time = next_time;

        while self.events.peek().map_or(false, |event| event.time == self.current_time) {
            let event = match self.events.pop() {
                Some(event) => event,
                None => break,
            };

            let effector = match self.components.get_mut(&event.to_address) {
                Some(component) => component.handle(
                    HandleInfo {
                        self_address: event.to_address,
                        sender_address: event.from_address,
                        current_time: self.current_time,
                    },
                    &mut self.world,
                    event.message.clone(),
                ),
                None => {
                    trace!(address = event.to_address, "dropping event for a terminated component");
                    continue;
                }
            };

            self.apply_effector(event.to_address, effector);

            events.push(event);
        }

        events
    }

    pub fn start(&mut self) {
        let addresses: Vec<_> = self.components.keys().cloned().collect();

        addresses
            .into_iter()
            .for_each(|address| self.start_component(address));
    }

    /// Delivers every event due strictly before `horizon`. Whatever is still
    /// pending afterwards is left unprocessed.
    pub fn run_until(&mut self, horizon: Time) {
        self.run_until_with(horizon, |_, _| {});
    }

    /// Same as `run_until`, handing each processed batch to `observer`.
    pub fn run_until_with<F>(&mut self, horizon: Time, mut observer: F)
        where F: FnMut(&DiscreteSystem<M, C, W>, &[Event<M>])
    {
        while self.next_event_time().map_or(false, |time| time < horizon) {
            let events = self.tick();

            observer(self, &events);
        }
    }

    pub fn next_event_time(&self) -> Option<Time> {
        self.events.peek().map(|event| event.time)
    }
}
