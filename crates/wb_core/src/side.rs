//! Per-side combat state.
//!
//! [`SideState`] is the single record every per-side system reads and writes:
//! beam school, switch timers, element, shield, stability, channel lists and
//! HP. Systems own no hidden copies of these values.

use serde::{Deserialize, Serialize};

use crate::balance::BalanceConfig;
use crate::components::{BeamSchool, BeamSwitchState, Element, ShieldState, Side};
use crate::data::gem::GemId;
use crate::data::loadout::Loadout;
use crate::math::{fixed_serde, Fixed};

/// A timed stability drain from a mitigated spell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveDrain {
    /// Stability still to drain.
    #[serde(with = "fixed_serde")]
    pub remaining: Fixed,
    /// Stability drained per second.
    #[serde(with = "fixed_serde")]
    pub rate: Fixed,
    /// Total lifetime in seconds.
    #[serde(with = "fixed_serde")]
    pub duration: Fixed,
    /// Seconds elapsed so far.
    #[serde(with = "fixed_serde")]
    pub elapsed: Fixed,
}

/// Dominant element change waiting out the shift delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementShift {
    /// Element that will become dominant.
    pub target: Element,
    /// Seconds until it does.
    #[serde(with = "fixed_serde")]
    pub timer: Fixed,
}

/// Everything that describes one combatant's condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideState {
    /// Which side this is.
    pub side: Side,

    /// Active beam school.
    pub current_beam_school: BeamSchool,
    /// Switcher state.
    pub beam_switch_state: BeamSwitchState,
    /// Seconds left in the current charge or lock.
    #[serde(with = "fixed_serde")]
    pub beam_switch_timer: Fixed,
    /// School being charged.
    pub beam_switch_target: Option<BeamSchool>,

    /// Element governing push and spell matchups.
    pub dominant_element: Element,
    /// Pending element shift.
    pub pending_element: Option<ElementShift>,

    /// Shield state.
    pub shield_state: ShieldState,
    /// Seconds until a recharging shield rises.
    #[serde(with = "fixed_serde")]
    pub shield_recharge_timer: Fixed,

    /// Stability, always within `[0, max]`.
    #[serde(with = "fixed_serde")]
    pub stability: Fixed,
    /// Timed drains in application order.
    pub active_drains: Vec<ActiveDrain>,

    /// Channeled gems in completion order.
    pub channeled_gems: Vec<GemId>,
    /// Schools the channeled gems lock out.
    pub locked_beam_types: Vec<BeamSchool>,

    /// Hit points.
    pub hp: i32,
    /// Maximum hit points.
    pub max_hp: i32,

    /// Attuned school.
    pub school_attunement: BeamSchool,
    /// Attuned element.
    pub element_attunement: Element,

    /// Effective mana from the last beam struggle update.
    #[serde(with = "fixed_serde")]
    pub effective_mana: Fixed,
    /// Temporary mana from panic mode.
    #[serde(with = "fixed_serde")]
    pub panic_mana_bonus: Fixed,
    /// Mana debuff while the spell book is charging or ready.
    #[serde(with = "fixed_serde")]
    pub spell_book_debuff: Fixed,
}

impl SideState {
    /// Starting state for a side entering combat with a loadout.
    #[must_use]
    pub fn new(side: Side, loadout: &Loadout, balance: &BalanceConfig) -> Self {
        Self {
            side,
            current_beam_school: loadout.school_attunement,
            beam_switch_state: BeamSwitchState::Ready,
            beam_switch_timer: Fixed::ZERO,
            beam_switch_target: None,
            dominant_element: loadout.element_attunement,
            pending_element: None,
            shield_state: ShieldState::Unavailable,
            shield_recharge_timer: Fixed::ZERO,
            stability: balance.stability.max,
            active_drains: Vec::new(),
            channeled_gems: Vec::new(),
            locked_beam_types: Vec::new(),
            hp: loadout.hp,
            max_hp: loadout.max_hp,
            school_attunement: loadout.school_attunement,
            element_attunement: loadout.element_attunement,
            effective_mana: Fixed::ZERO,
            panic_mana_bonus: Fixed::ZERO,
            spell_book_debuff: Fixed::ZERO,
        }
    }

    /// Whether the shield is currently raised.
    #[must_use]
    pub fn shield_up(&self) -> bool {
        self.shield_state == ShieldState::Up
    }

    /// Whether channeled gems lock out a school.
    #[must_use]
    pub fn is_locked_out(&self, school: BeamSchool) -> bool {
        self.locked_beam_types.contains(&school)
    }

    /// Whether a gem is channeled.
    #[must_use]
    pub fn is_channeled(&self, gem: GemId) -> bool {
        self.channeled_gems.contains(&gem)
    }

    /// Whether HP remains.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.hp > 0
    }
}
