use crate::discrete_system::{Lane, Time};
use crate::discrete_system::address::Address;

pub enum ScheduledEventAddress {
    SelfAddress,
    RemoteAddress(Address),
}

pub struct ScheduledEvent<M> {
    pub message: M,
    pub in_time: Time,
    pub lane: Lane,
    pub address: ScheduledEventAddress,
}

/// Everything a component wants to happen as a consequence of handling one
/// message. The system applies it after the handler returns.
pub struct Effector<M, C> {
    pub events: Vec<ScheduledEvent<M>>,
    pub components: Vec<C>,
    pub terminated: bool,
}

impl<M, C> Effector<M, C> {
    pub fn new() -> Effector<M, C> {
        Effector {
            events: Vec::new(),
            components: Vec::new(),
            terminated: false,
        }
    }

    fn push(&mut self, address: ScheduledEventAddress, in_time: Time, lane: Lane, message: M) {
        self.events.push(ScheduledEvent {
            in_time,
            message,
            lane,
            address,
        })
    }

    pub fn schedule_immediately(&mut self, address: Address, message: M) {
        self.push(ScheduledEventAddress::RemoteAddress(address), 0, Lane::Normal, message)
    }

    pub fn schedule_in_to_self(&mut self, in_time: Time, message: M) {
        self.push(ScheduledEventAddress::SelfAddress, in_time, Lane::Normal, message)
    }

    /// Delivers `message` at the current instant ahead of every normal event
    /// already queued for it.
    pub fn interrupt(&mut self, address: Address, message: M) {
        self.push(ScheduledEventAddress::RemoteAddress(address), 0, Lane::Interrupt, message)
    }

    pub fn instantiate_new_component(&mut self, data: C) {
        self.components.push(data);
    }

    /// Removes the component from the system once this effector is applied.
    /// Events still addressed to it are dropped on delivery.
    pub fn terminate(&mut self) {
        self.terminated = true;
    }
}
