use crate::discrete_system::Time;
use crate::sampling::Distribution;
use failure::{Error, Fail};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

pub type Id = u32;

pub const SECONDS_IN_MINUTE: Time = 60;
pub const SECONDS_IN_HOUR: Time = 60 * SECONDS_IN_MINUTE;
pub const SECONDS_IN_DAY: Time = 24 * SECONDS_IN_HOUR;

/// Every station holds this many cars per pump, counting the ones at a pump.
pub const PARKING_PLACES_PER_PUMP: u32 = 4;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SimulationSettings {
    pub seed: u64,
    pub pumps_quantity: u32,
    pub cashiers_quantity: u32,
    pub pump_fueling_speed: f64,           // Volume units fueled per second
    pub pump_working_time: Distribution,   // Time until any pump breaks next
    pub pump_outage_time: Distribution,    // How long a broken pump is repaired
    pub customer_fuel_needed: Distribution,
    pub interaction_with_cashier_time: Distribution,
    pub interaction_with_cashier_while_getting_food_time: Distribution,
    pub food_preparation_time: Distribution,
    pub eating_probability: f64,
    pub next_car_arrival_time: Distribution,
}

impl SimulationSettings {
    pub fn parking_capacity(&self) -> u32 {
        self.pumps_quantity * PARKING_PLACES_PER_PUMP
    }

    pub fn expected_fueling_time(&self, fuel_needed: u64) -> Time {
        (fuel_needed as f64 / self.pump_fueling_speed) as Time
    }
}

/// A mid-sized station on a road with ~80k cars a day, one in fifty
/// pulling in.
impl Default for SimulationSettings {
    fn default() -> SimulationSettings {
        let pumps_quantity = 4;

        SimulationSettings {
            seed: 0,
            pumps_quantity,
            cashiers_quantity: 2,
            pump_fueling_speed: 0.2,
            pump_working_time: Distribution::Exponential {
                mean: (2 * SECONDS_IN_DAY) as f64 / pumps_quantity as f64,
            },
            pump_outage_time: Distribution::Gamma {
                shape: 3000.0,
                scale: 250.0 / 3000.0,
            },
            customer_fuel_needed: Distribution::Exponential { mean: 50.0 },
            interaction_with_cashier_time: Distribution::Normal {
                mean: 120.0,
                std_dev: 20.0,
            },
            interaction_with_cashier_while_getting_food_time: Distribution::Uniform { min: 30, max: 60 },
            food_preparation_time: Distribution::Uniform { min: 120, max: 180 },
            eating_probability: 0.4,
            next_car_arrival_time: Distribution::Exponential {
                mean: SECONDS_IN_DAY as f64 / (80_000.0 / 50.0),
            },
        }
    }
}

#[derive(Debug, Fail)]
#[fail(display = "validation failed because of \"{}\"", error)]
pub struct ValidationError {
    error: String,
}

fn check_distribution(name: &str, distribution: &Distribution, may_be_never: bool) -> Result<(), Error> {
    if let Distribution::Never = distribution {
        if !may_be_never {
            return Err(ValidationError {
                error: format!("\"{}\" has to happen eventually", name),
            }
                .into());
        }
    }

    distribution.validate().map_err(|error| {
        ValidationError {
            error: format!("\"{}\" is invalid: {}", name, error),
        }
            .into()
    })
}

pub fn validate_settings(settings: &SimulationSettings) -> Result<(), Error> {
    if settings.pumps_quantity == 0 {
        return Err(ValidationError {
            error: "There has to be at least one pump".to_string(),
        }
            .into());
    }

    if settings.cashiers_quantity == 0 {
        return Err(ValidationError {
            error: "There has to be at least one cashier".to_string(),
        }
            .into());
    }

    if !(settings.pump_fueling_speed.is_finite() && settings.pump_fueling_speed > 0.0) {
        return Err(ValidationError {
            error: format!("Pump fueling speed {} is not positive", settings.pump_fueling_speed),
        }
            .into());
    }

    if !(0.0..=1.0).contains(&settings.eating_probability) {
        return Err(ValidationError {
            error: format!("Eating probability {} is outside of [0, 1]", settings.eating_probability),
        }
            .into());
    }

    check_distribution("pump_working_time", &settings.pump_working_time, true)?;
    check_distribution("pump_outage_time", &settings.pump_outage_time, false)?;
    check_distribution("customer_fuel_needed", &settings.customer_fuel_needed, false)?;
    check_distribution("interaction_with_cashier_time", &settings.interaction_with_cashier_time, false)?;
    check_distribution(
        "interaction_with_cashier_while_getting_food_time",
        &settings.interaction_with_cashier_while_getting_food_time,
        false,
    )?;
    check_distribution("food_preparation_time", &settings.food_preparation_time, false)?;
    check_distribution("next_car_arrival_time", &settings.next_car_arrival_time, false)?;

    if settings.next_car_arrival_time.always_zero() {
        return Err(ValidationError {
            error: "\"next_car_arrival_time\" has to be positive at least sometimes".to_string(),
        }
            .into());
    }

    if settings.pump_working_time.always_zero() && settings.pump_outage_time.always_zero() {
        return Err(ValidationError {
            error: "Pumps cannot break and get repaired without any time passing".to_string(),
        }
            .into());
    }

    Ok(())
}

pub fn load_settings(path: &Path) -> Result<SimulationSettings, Error> {
    let file = File::open(path)?;

    let settings = serde_json::from_reader(file)?;

    Ok(settings)
}

/// `Day 1 - 02:03:04`, or `02:03:04` when `print_days` is off, in which case
/// the hours keep counting past a day.
pub fn format_time(time: Time, print_days: bool) -> String {
    let (days, left_time) = if print_days {
        (time / SECONDS_IN_DAY, time % SECONDS_IN_DAY)
    } else {
        (0, time)
    };

    let hours = left_time / SECONDS_IN_HOUR;
    let minutes = left_time % SECONDS_IN_HOUR / SECONDS_IN_MINUTE;
    let seconds = left_time % SECONDS_IN_MINUTE;

    if print_days {
        format!("Day {} - {:02}:{:02}:{:02}", days, hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        assert!(validate_settings(&SimulationSettings::default()).is_ok());
    }

    #[test]
    fn parking_is_four_places_per_pump() {
        let settings = SimulationSettings {
            pumps_quantity: 3,
            ..SimulationSettings::default()
        };

        assert_eq!(settings.parking_capacity(), 12);
    }

    #[test]
    fn fueling_time_is_truncated() {
        let settings = SimulationSettings {
            pump_fueling_speed: 0.2,
            ..SimulationSettings::default()
        };

        assert_eq!(settings.expected_fueling_time(50), 250);
        assert_eq!(settings.expected_fueling_time(0), 0);
    }

    #[test]
    fn rejects_missing_pumps() {
        let settings = SimulationSettings {
            pumps_quantity: 0,
            ..SimulationSettings::default()
        };

        let error = validate_settings(&settings).unwrap_err();

        assert!(error.to_string().contains("at least one pump"));
    }

    #[test]
    fn only_failures_may_never_happen() {
        let settings = SimulationSettings {
            pump_working_time: Distribution::Never,
            ..SimulationSettings::default()
        };
        assert!(validate_settings(&settings).is_ok());

        let settings = SimulationSettings {
            next_car_arrival_time: Distribution::Never,
            ..SimulationSettings::default()
        };
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn rejects_arrivals_that_never_advance_time() {
        for arrivals in vec![Distribution::Fixed(0), Distribution::Uniform { min: 0, max: 0 }] {
            let settings = SimulationSettings {
                next_car_arrival_time: arrivals,
                ..SimulationSettings::default()
            };

            let error = validate_settings(&settings).unwrap_err();

            assert!(error.to_string().contains("next_car_arrival_time"));
        }
    }

    #[test]
    fn rejects_instant_breakdown_loop() {
        let settings = SimulationSettings {
            pump_working_time: Distribution::Fixed(0),
            pump_outage_time: Distribution::Fixed(0),
            ..SimulationSettings::default()
        };
        assert!(validate_settings(&settings).is_err());

        let settings = SimulationSettings {
            pump_working_time: Distribution::Fixed(0),
            pump_outage_time: Distribution::Fixed(30),
            ..SimulationSettings::default()
        };
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn rejects_impossible_probability() {
        let settings = SimulationSettings {
            eating_probability: 1.5,
            ..SimulationSettings::default()
        };

        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn formats_like_a_station_clock() {
        assert_eq!(format_time(0, true), "Day 0 - 00:00:00");
        assert_eq!(format_time(SECONDS_IN_DAY + 2 * SECONDS_IN_HOUR + 3 * 60 + 4, true), "Day 1 - 02:03:04");
        assert_eq!(format_time(SECONDS_IN_DAY + 61, false), "24:01:01");
    }

    #[test]
    fn settings_round_trip_through_json() {
        let json = serde_json::to_string(&SimulationSettings::default()).unwrap();
        let settings: SimulationSettings = serde_json::from_str(&json).unwrap();

        assert_eq!(settings.pumps_quantity, 4);
        assert_eq!(settings.interaction_with_cashier_while_getting_food_time, Distribution::Uniform { min: 30, max: 60 });
    }
}
