use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::constants::{MONTHS_PER_YEAR, START_YEAR, TICKS_PER_MONTH};

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Discrete simulation clock. One `Update` is one tick.
#[derive(Resource, Debug, Clone, PartialEq, Eq, Reflect, Serialize, Deserialize)]
#[reflect(Resource)]
#[serde(default)]
pub struct SimClock {
    pub tick: u64,
    /// Zero-based month within the year.
    pub month: u32,
    pub year: u32,
    pub ticks_per_month: u32,
    month_rolled: bool,
    year_rolled: bool,
}

impl Default for SimClock {
    fn default() -> Self {
        Self {
            tick: 0,
            month: 0,
            year: START_YEAR,
            ticks_per_month: TICKS_PER_MONTH,
            month_rolled: false,
            year_rolled: false,
        }
    }
}

impl SimClock {
    pub fn new(ticks_per_month: u32) -> Self {
        Self {
            ticks_per_month: ticks_per_month.max(1),
            ..default()
        }
    }

    /// Advance by one tick, rolling month and year as needed.
    pub fn advance(&mut self) {
        self.tick += 1;
        self.month_rolled = false;
        self.year_rolled = false;

        if self.tick % u64::from(self.ticks_per_month.max(1)) == 0 {
            self.month_rolled = true;
            self.month += 1;
            if self.month >= MONTHS_PER_YEAR {
                self.month = 0;
                self.year += 1;
                self.year_rolled = true;
            }
        }
    }

    /// True during the tick on which a new month began.
    pub fn month_changed(&self) -> bool {
        self.month_rolled
    }

    /// True during the tick on which a new year began.
    pub fn year_changed(&self) -> bool {
        self.year_rolled
    }

    /// Months elapsed since the start of the game.
    pub fn total_months(&self) -> u32 {
        (self.year.saturating_sub(START_YEAR)) * MONTHS_PER_YEAR + self.month
    }

    pub fn display(&self) -> String {
        format!("{} {}", MONTH_NAMES[(self.month % 12) as usize], self.year)
    }
}

/// Ordering of the per-tick work.
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone, Copy)]
pub enum SimSet {
    /// Advances [`SimClock`].
    Clock,
    /// Everything that reacts to the new tick.
    Simulation,
}

pub struct SimClockPlugin;

impl Plugin for SimClockPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SimClock>()
            .configure_sets(Update, (SimSet::Clock, SimSet::Simulation).chain())
            .add_systems(Update, advance_clock.in_set(SimSet::Clock));
    }
}

fn advance_clock(mut clock: ResMut<SimClock>) {
    clock.advance();
    if clock.month_changed() {
        debug!("New month: {}", clock.display());
    }
}

/// Run condition: the current tick started a new month.
pub fn month_changed(clock: Res<SimClock>) -> bool {
    clock.month_changed()
}

/// Run condition: the current tick started a new year.
pub fn year_changed(clock: Res<SimClock>) -> bool {
    clock.year_changed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_rolls_month_and_year() {
        let mut clock = SimClock::new(2);
        clock.advance();
        assert!(!clock.month_changed());
        clock.advance();
        assert!(clock.month_changed());
        assert_eq!(clock.month, 1);

        for _ in 0..(2 * 11) {
            clock.advance();
        }
        assert!(clock.year_changed());
        assert_eq!(clock.year, START_YEAR + 1);
        assert_eq!(clock.month, 0);
        assert_eq!(clock.total_months(), 12);
    }

    #[test]
    fn clock_display() {
        let clock = SimClock::default();
        assert_eq!(clock.display(), format!("Jan {START_YEAR}"));
    }

    #[test]
    fn plugin_advances_one_tick_per_update() {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, SimClockPlugin));
        app.update();
        app.update();
        assert_eq!(app.world().resource::<SimClock>().tick, 2);
    }
}
