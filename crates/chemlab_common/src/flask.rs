//! Flask State Store
//!
//! Holds the ordered reagents currently mixed, the temperature, and the
//! heating flag. Only explicit user actions (and heating ticks) mutate it.

use crate::error::LabError;
use crate::reagent::Reagent;
use serde::Serialize;

/// Maximum number of reagents a flask holds
pub const FLASK_CAPACITY: usize = 6;

/// Bench temperature; also the reset value for clear and cool-down
pub const AMBIENT_TEMPERATURE: u32 = 25;

/// Upper bound for heating
pub const MAX_TEMPERATURE: u32 = 500;

/// Immutable copy of flask contents, safe to capture for comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlaskSnapshot {
    pub reagents: Vec<Reagent>,
    pub temperature: u32,
    pub heating: bool,
}

impl FlaskSnapshot {
    pub fn is_empty(&self) -> bool {
        self.reagents.is_empty()
    }

    /// Liquid fill level shown in the beaker, percent
    pub fn fill_percent(&self) -> u32 {
        (self.reagents.len() as u32 * 15).min(95)
    }
}

/// Outcome of a heating tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeatOutcome {
    /// Temperature rose and heating continues
    Raised { temperature: u32 },
    /// Maximum reached; heating flag has been forced off
    Capped,
    /// Heating flag was not set; nothing changed
    Idle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flask {
    reagents: Vec<Reagent>,
    temperature: u32,
    heating: bool,
}

impl Default for Flask {
    fn default() -> Self {
        Self::new()
    }
}

impl Flask {
    pub fn new() -> Self {
        Self {
            reagents: Vec::with_capacity(FLASK_CAPACITY),
            temperature: AMBIENT_TEMPERATURE,
            heating: false,
        }
    }

    /// Append a reagent. Fails without changing state once the flask is full.
    pub fn add(&mut self, reagent: Reagent) -> Result<(), LabError> {
        if self.reagents.len() >= FLASK_CAPACITY {
            return Err(LabError::CapacityExceeded {
                capacity: FLASK_CAPACITY,
            });
        }
        self.reagents.push(reagent);
        Ok(())
    }

    /// Empty the flask and reset temperature and heating together
    pub fn clear(&mut self) {
        self.reagents.clear();
        self.temperature = AMBIENT_TEMPERATURE;
        self.heating = false;
    }

    /// Set or unset the heating flag. Returns true if the flag changed.
    ///
    /// Heating cannot be switched on once the flask is at the maximum.
    pub fn set_heating(&mut self, active: bool) -> bool {
        let next = active && self.temperature < MAX_TEMPERATURE;
        let changed = self.heating != next;
        self.heating = next;
        changed
    }

    /// Reset temperature to ambient and force heating off. Reagents untouched.
    pub fn cool_down(&mut self) {
        self.temperature = AMBIENT_TEMPERATURE;
        self.heating = false;
    }

    /// Apply one heating increment, bounded by the maximum
    pub fn heat_tick(&mut self, increment: u32) -> HeatOutcome {
        if !self.heating {
            return HeatOutcome::Idle;
        }

        self.temperature = self
            .temperature
            .saturating_add(increment)
            .min(MAX_TEMPERATURE);

        if self.temperature >= MAX_TEMPERATURE {
            self.heating = false;
            HeatOutcome::Capped
        } else {
            HeatOutcome::Raised {
                temperature: self.temperature,
            }
        }
    }

    pub fn reagents(&self) -> &[Reagent] {
        &self.reagents
    }

    pub fn temperature(&self) -> u32 {
        self.temperature
    }

    pub fn is_heating(&self) -> bool {
        self.heating
    }

    pub fn is_empty(&self) -> bool {
        self.reagents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.reagents.len()
    }

    pub fn snapshot(&self) -> FlaskSnapshot {
        FlaskSnapshot {
            reagents: self.reagents.clone(),
            temperature: self.temperature,
            heating: self.heating,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ReagentCatalog;

    fn reagent(id: &str) -> Reagent {
        ReagentCatalog::standard().get(id).cloned().unwrap()
    }

    #[test]
    fn test_new_flask_defaults() {
        let flask = Flask::new();
        assert!(flask.is_empty());
        assert_eq!(flask.temperature(), AMBIENT_TEMPERATURE);
        assert!(!flask.is_heating());
    }

    #[test]
    fn test_capacity_never_exceeded() {
        let mut flask = Flask::new();
        for _ in 0..FLASK_CAPACITY {
            flask.add(reagent("w1")).unwrap();
        }
        let before = flask.snapshot();

        let err = flask.add(reagent("a2")).unwrap_err();
        assert_eq!(err, LabError::CapacityExceeded { capacity: 6 });
        assert_eq!(flask.snapshot(), before);

        for _ in 0..10 {
            assert!(flask.add(reagent("a1")).is_err());
        }
        assert_eq!(flask.len(), FLASK_CAPACITY);
    }

    #[test]
    fn test_duplicates_keep_insertion_order() {
        let mut flask = Flask::new();
        flask.add(reagent("a1")).unwrap();
        flask.add(reagent("b1")).unwrap();
        flask.add(reagent("a1")).unwrap();
        let ids: Vec<_> = flask.reagents().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "b1", "a1"]);
    }

    #[test]
    fn test_clear_resets_everything_while_heating() {
        let mut flask = Flask::new();
        flask.add(reagent("m1")).unwrap();
        flask.set_heating(true);
        flask.heat_tick(40);
        assert_eq!(flask.temperature(), 65);

        flask.clear();
        assert!(flask.is_empty());
        assert_eq!(flask.temperature(), 25);
        assert!(!flask.is_heating());
    }

    #[test]
    fn test_heat_tick_requires_flag() {
        let mut flask = Flask::new();
        assert_eq!(flask.heat_tick(5), HeatOutcome::Idle);
        assert_eq!(flask.temperature(), 25);

        assert!(flask.set_heating(true));
        assert!(!flask.set_heating(true));
        assert_eq!(flask.heat_tick(5), HeatOutcome::Raised { temperature: 30 });
    }

    #[test]
    fn test_heat_caps_at_max_and_forces_flag_off() {
        let mut flask = Flask::new();
        flask.set_heating(true);
        flask.heat_tick(470);
        assert_eq!(flask.heat_tick(6), HeatOutcome::Capped);
        assert_eq!(flask.temperature(), MAX_TEMPERATURE);
        assert!(!flask.is_heating());

        // Can't restart at the cap
        assert!(!flask.set_heating(true));
        assert!(!flask.is_heating());
    }

    #[test]
    fn test_cool_down_keeps_reagents() {
        let mut flask = Flask::new();
        flask.add(reagent("a3")).unwrap();
        flask.set_heating(true);
        flask.heat_tick(100);

        flask.cool_down();
        assert_eq!(flask.temperature(), 25);
        assert!(!flask.is_heating());
        assert_eq!(flask.len(), 1);
    }

    #[test]
    fn test_fill_percent() {
        let mut flask = Flask::new();
        assert_eq!(flask.snapshot().fill_percent(), 0);
        flask.add(reagent("w1")).unwrap();
        assert_eq!(flask.snapshot().fill_percent(), 15);
        for _ in 0..5 {
            flask.add(reagent("w1")).unwrap();
        }
        assert_eq!(flask.snapshot().fill_percent(), 90);
    }
}
