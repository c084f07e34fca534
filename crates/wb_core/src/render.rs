//! Rendering seam.
//!
//! The core never draws. It issues primitives to a [`Renderer`] supplied by
//! the front-end. Coordinates are arena pixels converted to `f32` at this
//! boundary; nothing drawn here feeds back into the simulation.

use crate::balance::BalanceConfig;
use crate::beam_struggle::{beam_thickness, CombatState};
use crate::components::{BeamSchool, Element, NodeKind, NodeState};
use crate::math::{Fixed, Vec2Fixed};
use crate::network::NodeNetwork;
use crate::pathfinding::neighbors;
use crate::projectile::Projectile;
use crate::side::SideState;

/// RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Color {
    /// Opaque colour from `0xRRGGBB`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: (hex >> 16) as u8,
            g: (hex >> 8) as u8,
            b: hex as u8,
            a: 255,
        }
    }

    /// Same colour with an alpha in `[0, 1]`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn with_alpha(self, alpha: f32) -> Self {
        Self {
            a: (alpha.clamp(0.0, 1.0) * 255.0).round() as u8,
            ..self
        }
    }
}

/// Drawing backend.
pub trait Renderer {
    /// Filled circle.
    fn draw_circle(&mut self, x: f32, y: f32, radius: f32, color: Color);
    /// Filled axis-aligned rectangle.
    fn draw_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color);
    /// Line segment.
    fn draw_line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, color: Color, width: f32);
    /// Filled polygon.
    fn draw_polygon(&mut self, points: &[(f32, f32)], color: Color);
    /// Text anchored at its top-left corner.
    fn draw_text(&mut self, text: &str, x: f32, y: f32, color: Color);
}

/// Node fill by state.
#[must_use]
pub const fn state_color(state: NodeState) -> Color {
    match state {
        NodeState::Dormant => Color::from_hex(0x0033_3333),
        NodeState::Open => Color::from_hex(0x00aa_aaaa),
        NodeState::Channeled => Color::from_hex(0x00ff_ffff),
        NodeState::Damaged => Color::from_hex(0x00cc_0000),
    }
}

/// Beam colour by school.
#[must_use]
pub const fn school_color(school: BeamSchool) -> Color {
    match school {
        BeamSchool::Order => Color::from_hex(0x00ee_eeee),
        BeamSchool::Chaos => Color::from_hex(0x0011_1111),
        BeamSchool::Pure => Color::from_hex(0x00d4_ae00),
        BeamSchool::Neutral => Color::from_hex(0x0055_5555),
    }
}

/// Beam node colour while open.
#[must_use]
pub const fn school_node_color(school: BeamSchool) -> Color {
    match school {
        BeamSchool::Pure => Color::from_hex(0x00ff_4d00),
        BeamSchool::Chaos => Color::from_hex(0x00ff_e600),
        BeamSchool::Order => Color::from_hex(0x0080_00cc),
        BeamSchool::Neutral => Color::from_hex(0x0033_3333),
    }
}

/// Element tint; `None` is grey.
#[must_use]
pub const fn element_color(element: Option<Element>) -> Color {
    match element {
        Some(Element::Fire) => Color::from_hex(0x00ff_4400),
        Some(Element::Water) => Color::from_hex(0x0000_88ff),
        Some(Element::Earth) => Color::from_hex(0x008b_5e3c),
        Some(Element::Air) => Color::from_hex(0x00ee_eeff),
        None => Color::from_hex(0x00aa_aaaa),
    }
}

fn px(value: Fixed) -> f32 {
    value.to_num()
}

fn point(v: Vec2Fixed) -> (f32, f32) {
    (px(v.x), px(v.y))
}

/// Staff tip x positions and the beam line y, in pixels.
#[must_use]
pub fn beam_geometry(balance: &BalanceConfig) -> (f32, f32, f32) {
    let player = balance.staff_tip(crate::components::Side::Player);
    let enemy = balance.staff_tip(crate::components::Side::Enemy);
    #[allow(clippy::cast_precision_loss)]
    let beam_y = (balance.arena.height / 2 + balance.arena.beam_y_offset) as f32;
    (px(player.x), px(enemy.x), beam_y)
}

/// Both beams meeting at the collision orb.
pub fn draw_beams(
    renderer: &mut dyn Renderer,
    combat: &CombatState,
    player: &SideState,
    enemy: &SideState,
    balance: &BalanceConfig,
) {
    let (player_x, enemy_x, beam_y) = beam_geometry(balance);
    let t = px(combat.collision_point) / 100.0;
    let collision_x = player_x + (enemy_x - player_x) * t;

    for (state, from_x) in [(player, player_x), (enemy, enemy_x)] {
        let thickness = px(beam_thickness(state.effective_mana, balance));
        let alpha = if state.current_beam_school == BeamSchool::Neutral { 0.5 } else { 0.8 };
        let color = school_color(state.current_beam_school).with_alpha(alpha);
        renderer.draw_rect(
            from_x.min(collision_x),
            beam_y - thickness / 2.0,
            (collision_x - from_x).abs(),
            thickness,
            color,
        );
    }

    renderer.draw_circle(collision_x, beam_y, 6.0, Color::from_hex(0x00ff_ff88));
    renderer.draw_circle(collision_x, beam_y, 3.6, Color::from_hex(0x00ff_ffff));
}

/// Edges, nodes and the awareness token of one network.
pub fn draw_network(renderer: &mut dyn Renderer, network: &NodeNetwork, balance: &BalanceConfig) {
    let edge = Color::from_hex(0x0022_2222);
    for node in network.nodes() {
        let (x1, y1) = point(node.position);
        for &other in neighbors(node.id) {
            if node.id < other {
                let (x2, y2) = point(network.node(other).position);
                renderer.draw_line(x1, y1, x2, y2, edge, 1.0);
            }
        }
    }

    for node in network.nodes() {
        let (x, y) = point(node.position);
        let radius = if node.id.kind() == NodeKind::Pathway { 6.0 } else { 10.0 };
        let gem = node.gem.and_then(|g| network.gem(g));

        let mut color = state_color(node.state);
        if let Some(school) = node.id.beam_school().filter(|_| node.state.is_active()) {
            color = school_node_color(school);
        }
        if let Some(element) = gem.and_then(|g| g.element).filter(|_| node.state == NodeState::Open) {
            color = element_color(Some(element));
        }
        renderer.draw_circle(x, y, radius, color);

        if node.state == NodeState::Damaged {
            let red = Color::from_hex(0x00ff_0000);
            renderer.draw_line(x - 5.0, y - 5.0, x + 5.0, y + 5.0, red, 2.0);
            renderer.draw_line(x - 5.0, y + 5.0, x + 5.0, y - 5.0, red, 2.0);
        } else if let Some(element) = gem.and_then(|g| g.element) {
            renderer.draw_circle(x + radius, y - radius, 4.0, element_color(Some(element)));
        }
    }

    let (ax, ay) = point(network.awareness_position(balance));
    renderer.draw_circle(ax, ay, 5.0, Color::from_hex(0x00ff_ffff).with_alpha(0.8));
}

/// A projectile and its trail.
pub fn draw_projectile(renderer: &mut dyn Renderer, projectile: &Projectile) {
    if projectile.arrived {
        return;
    }
    let color = element_color(projectile.spell.element());
    let size = match projectile.spell {
        crate::data::spell::SpellId::Fireball => 6.0,
        crate::data::spell::SpellId::EarthBarrage => 4.0,
        _ => 5.0,
    };
    let (x, y) = point(projectile.position);
    let (dx, dy) = point(projectile.direction);
    renderer.draw_circle(x, y, size, color);
    renderer.draw_circle(x - dx * 4.0, y - dy * 4.0, size * 0.6, color.with_alpha(0.4));
}

/// Plain-text readout of one side (HP, stability, mana, beam).
pub fn draw_side_status(renderer: &mut dyn Renderer, state: &SideState, x: f32, y: f32) {
    let text = format!(
        "HP {}/{}  STB {:.0}  MANA {:.1}  {:?}",
        state.hp,
        state.max_hp,
        px(state.stability),
        px(state.effective_mana),
        state.current_beam_school,
    );
    renderer.draw_text(&text, x, y, Color::from_hex(0x00ff_ffff));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Element, Side};
    use crate::data::loadout::Loadout;

    #[derive(Default)]
    struct Recorder {
        circles: Vec<(f32, f32, f32, Color)>,
        rects: Vec<(f32, f32, f32, f32)>,
        lines: usize,
        texts: Vec<String>,
    }

    impl Renderer for Recorder {
        fn draw_circle(&mut self, x: f32, y: f32, radius: f32, color: Color) {
            self.circles.push((x, y, radius, color));
        }
        fn draw_rect(&mut self, x: f32, y: f32, width: f32, height: f32, _color: Color) {
            self.rects.push((x, y, width, height));
        }
        fn draw_line(&mut self, _: f32, _: f32, _: f32, _: f32, _: Color, _: f32) {
            self.lines += 1;
        }
        fn draw_polygon(&mut self, _points: &[(f32, f32)], _color: Color) {}
        fn draw_text(&mut self, text: &str, _x: f32, _y: f32, _color: Color) {
            self.texts.push(text.to_string());
        }
    }

    #[test]
    fn test_color_from_hex() {
        assert_eq!(
            Color::from_hex(0x00d4_ae00),
            Color { r: 0xd4, g: 0xae, b: 0, a: 255 }
        );
        assert_eq!(Color::from_hex(0).with_alpha(0.5).a, 128);
    }

    #[test]
    fn test_beams_meet_at_collision() {
        let balance = BalanceConfig::default();
        let loadout = Loadout::new(BeamSchool::Pure, Element::Fire, &balance);
        let player = SideState::new(Side::Player, &loadout, &balance);
        let enemy = SideState::new(Side::Enemy, &loadout, &balance);
        let combat = CombatState::new(&balance);

        let mut recorder = Recorder::default();
        draw_beams(&mut recorder, &combat, &player, &enemy, &balance);
        assert_eq!(recorder.rects.len(), 2);
        // Staff tips at 130 and 830; the orb sits halfway.
        let (x, y, _, _) = recorder.circles[0];
        assert!((x - 480.0).abs() < 1e-3);
        assert!((y - 205.0).abs() < 1e-3);
    }

    #[test]
    fn test_network_draws_every_node_and_edge_once() {
        let balance = BalanceConfig::default();
        let loadout = Loadout::new(BeamSchool::Pure, Element::Fire, &balance);
        let mut network = NodeNetwork::new(Side::Player, &balance);
        network.init(&loadout);
        let mut events = Vec::new();
        network.damage_node(crate::components::NodeId::Crown, &mut events);

        let mut recorder = Recorder::default();
        draw_network(&mut recorder, &network, &balance);
        // 13 edges plus the damage cross.
        assert_eq!(recorder.lines, 13 + 2);
        // 13 nodes plus the awareness token.
        assert_eq!(recorder.circles.len(), 14);
        assert!(recorder
            .circles
            .iter()
            .any(|c| c.3 == school_node_color(BeamSchool::Pure)));
    }

    #[test]
    fn test_status_text() {
        let balance = BalanceConfig::default();
        let loadout = Loadout::new(BeamSchool::Order, Element::Air, &balance);
        let state = SideState::new(Side::Player, &loadout, &balance);
        let mut recorder = Recorder::default();
        draw_side_status(&mut recorder, &state, 0.0, 0.0);
        assert_eq!(recorder.texts, vec!["HP 30/30  STB 100  MANA 0.0  Order".to_string()]);
    }
}
