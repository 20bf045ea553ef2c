use crate::discrete_system::{DiscreteSystemMessage, Time};
use crate::discrete_system::effector::Effector;
use crate::discrete_system::address::Address;

pub struct StartInfo {
    pub self_address: Address,
    pub current_time: Time,
}

pub struct HandleInfo {
    pub self_address: Address,
    pub sender_address: Address,
    pub current_time: Time,
}

/// A process living inside the discrete system. `W` is the world every
/// component shares (resources, samplers, output), handed out mutably for
/// the duration of a single `start` or `handle` call.
pub trait Component<M: DiscreteSystemMessage, W>: Sized {
    fn start(&mut self, info: StartInfo, world: &mut W) -> Effector<M, Self>;
    fn handle(&mut self, info: HandleInfo, world: &mut W, message: M) -> Effector<M, Self>;
}
