use crate::discrete_system::address::Address;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Lower value is more urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Priority(pub i8);

impl Priority {
    /// A breaking pump, ahead of any customer.
    pub const BREAKDOWN: Priority = Priority(-1);
    pub const FOOD_PICKUP: Priority = Priority(0);
    pub const NORMAL: Priority = Priority(1);
}

/// Identifies one request on one resource, from queueing until release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Token(u64);

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Policy {
    /// First come, first served. Only `Priority::NORMAL` is accepted.
    Fifo,
    /// Waiters ordered by priority, then by arrival.
    Priority,
    /// Like `Priority`, and a more urgent request evicts the least urgent
    /// holder when no slot is free.
    Preemptive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eviction {
    pub token: Token,
    pub owner: Address,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grant {
    pub token: Token,
    pub owner: Address,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquisition {
    Granted(Token),
    Queued(Token),
    /// Granted by taking the slot of `Eviction`, whose owner has to be told.
    Evicted(Token, Eviction),
}

impl Acquisition {
    pub fn token(&self) -> Token {
        match *self {
            Acquisition::Granted(token) | Acquisition::Queued(token) | Acquisition::Evicted(token, _) => token,
        }
    }

    pub fn is_granted(&self) -> bool {
        match self {
            Acquisition::Queued(_) => false,
            _ => true,
        }
    }
}

#[derive(Debug, Clone)]
struct Holder {
    token: Token,
    owner: Address,
    priority: Priority,
}

/// Counting resource with a fixed capacity.
///
/// Holders are kept in grant order, waiters in `(priority, token)` order,
/// tokens being handed out increasingly.
#[derive(Debug)]
pub struct Resource {
    name: String,
    capacity: usize,
    policy: Policy,
    users: Vec<Holder>,
    queue: BTreeMap<(Priority, Token), Address>,
    evicted: BTreeSet<Token>,
    next_token: u64,
}

impl Resource {
    pub fn new(name: &str, capacity: usize, policy: Policy) -> Resource {
        Resource {
            name: name.to_string(),
            capacity,
            policy,
            users: Vec::with_capacity(capacity),
            queue: BTreeMap::new(),
            evicted: BTreeSet::new(),
            next_token: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of current holders.
    pub fn count(&self) -> usize {
        self.users.len()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    #[cfg(test)]
    pub fn holds(&self, token: Token) -> bool {
        self.users.iter().any(|holder| holder.token == token)
    }

    fn check_priority(&self, priority: Priority) {
        let accepted = match self.policy {
            Policy::Fifo => priority == Priority::NORMAL,
            Policy::Priority => priority >= Priority::FOOD_PICKUP && priority <= Priority::NORMAL,
            Policy::Preemptive => priority >= Priority::BREAKDOWN && priority <= Priority::NORMAL,
        };

        assert!(
            accepted,
            "{:?} is not a valid priority for the {:?} resource \"{}\"",
            priority, self.policy, self.name
        );
    }

    /// The holder a request of `priority` may evict: the least urgent one,
    /// the earliest granted among equals, and only if strictly less urgent.
    fn victim(&self, priority: Priority) -> Option<usize> {
        let mut victim: Option<usize> = None;

        for (index, holder) in self.users.iter().enumerate() {
            match victim {
                Some(current) if self.users[current].priority >= holder.priority => {}
                _ => victim = Some(index),
            }
        }

        victim.filter(|&index| self.users[index].priority > priority)
    }

    pub fn acquire(&mut self, owner: Address, priority: Priority) -> Acquisition {
        self.check_priority(priority);

        let token = Token(self.next_token);
        self.next_token += 1;

        if self.users.len() < self.capacity {
            self.users.push(Holder { token, owner, priority });

            return Acquisition::Granted(token);
        }

        if self.policy == Policy::Preemptive {
            if let Some(index) = self.victim(priority) {
                let victim = self.users.remove(index);

                self.evicted.insert(victim.token);
                self.users.push(Holder { token, owner, priority });

                return Acquisition::Evicted(
                    token,
                    Eviction {
                        token: victim.token,
                        owner: victim.owner,
                    },
                );
            }
        }

        self.queue.insert((priority, token), owner);

        Acquisition::Queued(token)
    }

    /// Returns the slot held by `token`, granting it to the first waiter if
    /// there is one. Releasing an evicted token only acknowledges the
    /// eviction, its slot is already gone.
    pub fn release(&mut self, token: Token) -> Option<Grant> {
        if let Some(index) = self.users.iter().position(|holder| holder.token == token) {
            self.users.remove(index);

            return self.grant_next();
        }

        if self.evicted.remove(&token) {
            return None;
        }

        panic!("{} was released on \"{}\" but is not held", token, self.name);
    }

    fn grant_next(&mut self) -> Option<Grant> {
        if self.users.len() >= self.capacity {
            return None;
        }

        let key = *self.queue.keys().next()?;
        let owner = self.queue.remove(&key)?;
        let (priority, token) = key;

        self.users.push(Holder { token, owner, priority });

        Some(Grant { token, owner })
    }
}
