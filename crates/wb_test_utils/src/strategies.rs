//! Proptest strategies for combat inputs.
//!
//! These strategies generate random but reproducible inputs for
//! property-based testing of the simulation.

use proptest::prelude::*;

use wb_core::components::{BeamSchool, Element, NodeId};
use wb_core::math::Fixed;

/// Any of the three attack schools.
pub fn arb_attack_school() -> impl Strategy<Value = BeamSchool> {
    prop::sample::select(BeamSchool::ATTACK.to_vec())
}

/// Any school including neutral.
pub fn arb_school() -> impl Strategy<Value = BeamSchool> {
    prop_oneof![arb_attack_school(), Just(BeamSchool::Neutral)]
}

/// Any element.
pub fn arb_element() -> impl Strategy<Value = Element> {
    prop::sample::select(Element::ALL.to_vec())
}

/// Any node.
pub fn arb_node() -> impl Strategy<Value = NodeId> {
    prop::sample::select(NodeId::ALL.to_vec())
}

/// Frame deltas between 1 ms and 100 ms.
pub fn arb_dt() -> impl Strategy<Value = Fixed> {
    (1i32..=100).prop_map(|ms| Fixed::from_num(ms) / Fixed::from_num(1000))
}

/// Signed amounts in `[-200, 200]` with millesimal precision.
pub fn arb_amount() -> impl Strategy<Value = Fixed> {
    (-200_000i32..=200_000).prop_map(|m| Fixed::from_num(m) / Fixed::from_num(1000))
}

/// AI tier 1-3.
pub fn arb_tier() -> impl Strategy<Value = u8> {
    1u8..=3
}
