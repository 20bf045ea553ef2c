use crate::config::Id;
use crate::discrete_system::Time;
use serde::{Deserialize, Serialize};

/// Waiting for a hot-dog, from ordering at the till until it is picked up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodWait {
    pub start_time: Time,
    pub end_time: Option<Time>,
}

/// What happened to an admitted car. Timestamps fill in as the car moves
/// through the station and are all present once it has left.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
    pub name: String,
    pub fuel_needed: u64,
    pub expected_fueling_time: Time,
    pub fuel_obtained: Time,
    pub interruptions: u32,
    pub eating: bool,
    pub arrival_time: Time,
    pub fueling_start_time: Option<Time>,
    pub fueling_end_time: Option<Time>,
    pub interacting_with_cashier_start_time: Option<Time>,
    pub interacting_with_cashier_end_time: Option<Time>,
    /// Only for cars that eat.
    pub food: Option<FoodWait>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub number: Id,
    pub admitted: bool,
    pub visit: Option<Visit>,
}

impl Visit {
    pub fn new(number: Id, arrival_time: Time, fuel_needed: u64, expected_fueling_time: Time, eating: bool) -> Visit {
        Visit {
            name: format!("Car {}", number),
            fuel_needed,
            expected_fueling_time,
            fuel_obtained: 0,
            interruptions: 0,
            eating,
            arrival_time,
            fueling_start_time: None,
            fueling_end_time: None,
            interacting_with_cashier_start_time: None,
            interacting_with_cashier_end_time: None,
            food: None,
        }
    }
}

impl CustomerRecord {
    pub fn admitted(number: Id, visit: Visit) -> CustomerRecord {
        CustomerRecord {
            number,
            admitted: true,
            visit: Some(visit),
        }
    }

    /// A car that found no free parking place and drove on.
    pub fn rejected(number: Id) -> CustomerRecord {
        CustomerRecord {
            number,
            admitted: false,
            visit: None,
        }
    }

    /// Time from arriving until the first pump was obtained.
    pub fn waiting_for_pump(&self) -> Option<Time> {
        let visit = self.visit.as_ref()?;

        visit
            .fueling_start_time
            .map(|start| start - visit.arrival_time)
    }
}
