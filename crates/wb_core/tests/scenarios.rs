//! Cross-system combat scenarios driven through `CombatSimulation`.

use wb_core::prelude::*;
use wb_core::spell_book::SpellBookState;
use wb_test_utils::fixtures::{
    duel, loadout_with_spells, open_loadout, run_for, spell_gem, ScriptedRng,
};

fn channel_all(sim: &mut CombatSimulation, side: Side) {
    let gems: Vec<GemId> = sim
        .network(side)
        .nodes()
        .filter_map(|n| n.gem)
        .collect();
    for gem in gems {
        sim.request_channel(side, gem);
    }
    run_for(sim, 1.5);
}

#[test]
fn water_beam_floods_toward_root_and_forces_neutral() {
    let balance = BalanceConfig::default();
    let player = loadout_with_spells(BeamSchool::Order, Element::Water, &[SpellId::WaterBeam], &balance);
    let mut enemy = open_loadout(BeamSchool::Pure, Element::Water, &balance);
    let bolt = enemy.find_spell_gem(SpellId::GreyBolt).unwrap();
    enemy.slot_gem(bolt, NodeId::Throat).unwrap();

    let mut sim = duel(&player, &enemy, 1);
    channel_all(&mut sim, Side::Player);
    channel_all(&mut sim, Side::Enemy);
    assert!(sim.side_state(Side::Enemy).is_channeled(bolt));

    assert!(sim.cast_spell(Side::Player, SpellId::WaterBeam, SpellTarget::Node(NodeId::Throat)));

    // Throat -> sternum -> belly toward the left root.
    let network = sim.network(Side::Enemy);
    assert_eq!(network.state(NodeId::Throat), NodeState::Dormant);
    assert_eq!(network.state(NodeId::Sternum), NodeState::Dormant);
    assert_eq!(network.state(NodeId::Belly), NodeState::Dormant);
    assert_eq!(network.state(NodeId::LeftRoot), NodeState::Open);

    let enemy_state = sim.side_state(Side::Enemy);
    assert!(!enemy_state.is_channeled(bolt));
    assert_eq!(enemy_state.current_beam_school, BeamSchool::Neutral);

    let events = sim.tick(fx(0.001));
    assert_eq!(events.count("spell_unchanneled"), 1);
    assert_eq!(events.count("forced_neutral"), 1);
    assert_eq!(events.count("spell_cast"), 1);
}

#[test]
fn shielded_water_beam_becomes_a_drain() {
    let balance = BalanceConfig::default();
    let player = loadout_with_spells(BeamSchool::Order, Element::Water, &[SpellId::WaterBeam], &balance);
    let enemy = loadout_with_spells(BeamSchool::Pure, Element::Fire, &[SpellId::Shield], &balance);

    let mut sim = duel(&player, &enemy, 1);
    channel_all(&mut sim, Side::Player);
    channel_all(&mut sim, Side::Enemy);
    assert!(sim.toggle_shield(Side::Enemy));
    assert!(sim.side_state(Side::Enemy).shield_up());

    assert!(sim.cast_spell(Side::Player, SpellId::WaterBeam, SpellTarget::Node(NodeId::Throat)));
    assert_eq!(sim.network(Side::Enemy).state(NodeId::Throat), NodeState::Open);
    assert_eq!(sim.side_state(Side::Enemy).active_drains.len(), 1);
}

#[test]
fn earth_barrage_hits_about_half_the_rocks() {
    let balance = BalanceConfig::default();
    let player = loadout_with_spells(BeamSchool::Order, Element::Earth, &[SpellId::EarthBarrage], &balance);
    let enemy = open_loadout(BeamSchool::Order, Element::Earth, &balance);
    let per_rock = balance.spells.earth_barrage.hp_damage_per_rock;

    let mut hits = 0;
    let mut rocks = 0;
    for seed in 0..60 {
        let mut sim = duel(&player, &enemy, seed);
        channel_all(&mut sim, Side::Player);
        assert!(sim.cast_spell(Side::Player, SpellId::EarthBarrage, SpellTarget::Node(NodeId::Sternum)));
        rocks += sim.caster().pending_rocks().len();
        run_for(&mut sim, 4.0);
        assert!(sim.caster().projectiles().is_empty());

        let lost = sim.side_state(Side::Enemy).max_hp - sim.side_state(Side::Enemy).hp;
        hits += lost / per_rock;
    }

    assert_eq!(rocks, 240);
    assert!((85..=155).contains(&hits), "hits = {hits}");
}

#[test]
fn scripted_rolls_decide_every_rock() {
    let balance = BalanceConfig::default();
    let player = loadout_with_spells(BeamSchool::Order, Element::Earth, &[SpellId::EarthBarrage], &balance);
    let enemy = open_loadout(BeamSchool::Order, Element::Earth, &balance);
    let per_rock = balance.spells.earth_barrage.hp_damage_per_rock;

    for (roll, rocks_hit) in [(0.0, 4), (0.99, 0)] {
        let rng = Box::new(ScriptedRng::constant(roll));
        let mut sim = CombatSimulation::new(balance.clone(), &player, &enemy, rng).unwrap();
        channel_all(&mut sim, Side::Player);
        assert!(sim.cast_spell(Side::Player, SpellId::EarthBarrage, SpellTarget::Node(NodeId::Sternum)));
        run_for(&mut sim, 4.0);

        let enemy_state = sim.side_state(Side::Enemy);
        assert_eq!(enemy_state.max_hp - enemy_state.hp, per_rock * rocks_hit);
    }
}

#[test]
fn awareness_requests_are_ignored_in_place_and_mid_travel() {
    let balance = BalanceConfig::default();
    let loadout = Loadout::new(BeamSchool::Pure, Element::Fire, &balance);
    let mut sim = duel(&loadout, &loadout, 1);

    // Token starts on the attuned beam node.
    assert_eq!(sim.network(Side::Player).awareness().node, NodeId::Belly);
    assert!(!sim.set_awareness_target(Side::Player, NodeId::Belly));

    assert!(sim.set_awareness_target(Side::Player, NodeId::Crown));
    assert!(!sim.set_awareness_target(Side::Player, NodeId::LeftRoot));
    assert_eq!(sim.network(Side::Player).awareness().target, Some(NodeId::Crown));

    run_for(&mut sim, 0.05);
    assert!(!sim.set_awareness_target(Side::Player, NodeId::LeftRoot));
}

#[test]
fn misfire_forces_neutral_before_channeling() {
    let balance = BalanceConfig::default();
    let mut player = open_loadout(BeamSchool::Pure, Element::Fire, &balance);
    // Order gems lock out the pure beam.
    let gem = player.add_gem(spell_gem(SpellId::GreyBolt, BeamSchool::Order, &balance));
    player.slot_gem(gem, NodeId::Crown).unwrap();
    let enemy = open_loadout(BeamSchool::Chaos, Element::Fire, &balance);

    let mut sim = duel(&player, &enemy, 1);
    assert!(sim.request_channel(Side::Player, gem));
    assert_eq!(sim.side_state(Side::Player).current_beam_school, BeamSchool::Neutral);

    let events = sim.tick(fx(0.001));
    let names: Vec<&str> = events.events.iter().map(CombatEvent::name).collect();
    let forced = names.iter().position(|n| *n == "forced_neutral").unwrap();
    let misfire = names.iter().position(|n| *n == "misfire").unwrap();
    assert!(forced < misfire);

    run_for(&mut sim, 1.5);
    let state = sim.side_state(Side::Player);
    assert!(state.is_channeled(gem));
    assert!(state.is_locked_out(BeamSchool::Pure));

    // Still locked out once the neutral lock expires.
    run_for(&mut sim, 2.2);
    assert!(!sim.request_switch(Side::Player, BeamSchool::Pure));
}

#[test]
fn spell_book_auto_fires_air_choke() {
    let balance = BalanceConfig::default();
    let player = loadout_with_spells(BeamSchool::Order, Element::Air, &[SpellId::AirChoke], &balance);
    let enemy = open_loadout(BeamSchool::Pure, Element::Fire, &balance);

    let mut sim = duel(&player, &enemy, 1);
    channel_all(&mut sim, Side::Player);
    assert!(sim.start_hold(Side::Player));
    assert_eq!(sim.combatant(Side::Player).spell_book.state(), SpellBookState::Charging);
    assert!(sim.side_state(Side::Player).spell_book_debuff > Fixed::ZERO);

    let events = run_for(&mut sim, 5.0);
    assert!(events
        .iter()
        .any(|e| matches!(e, CombatEvent::SpellCast { side: Side::Player, spell: SpellId::AirChoke })));
    assert_eq!(sim.combatant(Side::Player).spell_book.state(), SpellBookState::Idle);
    assert_eq!(sim.side_state(Side::Player).spell_book_debuff, Fixed::ZERO);

    let network = sim.network(Side::Enemy);
    for node in [NodeId::Crown, NodeId::ThirdEye, NodeId::Throat] {
        assert_eq!(network.state(node), NodeState::Dormant);
    }
}

#[test]
fn spell_book_resolves_targeted_spell() {
    let balance = BalanceConfig::default();
    let player = loadout_with_spells(BeamSchool::Order, Element::Fire, &[SpellId::GreyBolt], &balance);
    let enemy = open_loadout(BeamSchool::Pure, Element::Fire, &balance);

    let mut sim = duel(&player, &enemy, 1);
    channel_all(&mut sim, Side::Player);
    assert!(sim.start_hold(Side::Player));
    assert!(!sim.resolve_spell(Side::Player, SpellTarget::Node(NodeId::Crown)));

    run_for(&mut sim, 3.0);
    assert_eq!(sim.combatant(Side::Player).spell_book.state(), SpellBookState::Ready);
    assert!(sim.resolve_spell(Side::Player, SpellTarget::Node(NodeId::Crown)));
    assert_eq!(sim.caster().projectiles().len(), 1);
    assert!(!sim.start_hold(Side::Player));
}

#[test]
fn countered_beam_loses_the_struggle() {
    let balance = BalanceConfig::default();
    let player = open_loadout(BeamSchool::Order, Element::Fire, &balance);
    let enemy = open_loadout(BeamSchool::Chaos, Element::Fire, &balance);
    let mut sim = duel(&player, &enemy, 1);

    let mut results = Vec::new();
    for _ in 0..(60 * 40) {
        let events = sim.tick(fx(1.0 / 60.0));
        if let Some(result) = events.result {
            results.push(result);
        }
    }
    assert_eq!(results, vec![CombatResult::PlayerWin]);
    assert!(sim.is_over());
    assert_eq!(sim.combat().collision_point, fx(100.0));
    assert!(sim.tick(fx(1.0 / 60.0)).is_empty());
}
