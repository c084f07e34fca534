//! Core value types shared by every combat system.
//!
//! These are plain data: sides, beam schools, elements, node identities and
//! the small state enums each per-side state machine moves through.

use serde::{Deserialize, Serialize};

/// One of the two combatants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// The human-controlled wizard (left of the arena).
    Player,
    /// The AI wizard (right of the arena).
    Enemy,
}

impl Side {
    /// Both sides in update order.
    pub const BOTH: [Side; 2] = [Side::Player, Side::Enemy];

    /// The other combatant.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Side::Player => Side::Enemy,
            Side::Enemy => Side::Player,
        }
    }

    /// Lowercase name used in logs and serialized output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Side::Player => "player",
            Side::Enemy => "enemy",
        }
    }
}

/// Beam school: three attack types in a rock-paper-scissors cycle, or neutral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeamSchool {
    /// Order beats chaos.
    Order,
    /// Chaos beats pure.
    Chaos,
    /// Pure beats order.
    Pure,
    /// No attack beam; drains stability.
    #[default]
    Neutral,
}

impl BeamSchool {
    /// The three attack schools in AI preference order.
    pub const ATTACK: [BeamSchool; 3] = [BeamSchool::Pure, BeamSchool::Order, BeamSchool::Chaos];

    /// The school this one beats, if any.
    #[must_use]
    pub const fn beats(self) -> Option<BeamSchool> {
        match self {
            BeamSchool::Order => Some(BeamSchool::Chaos),
            BeamSchool::Chaos => Some(BeamSchool::Pure),
            BeamSchool::Pure => Some(BeamSchool::Order),
            BeamSchool::Neutral => None,
        }
    }

    /// The school that beats this one, if any.
    #[must_use]
    pub const fn countered_by(self) -> Option<BeamSchool> {
        match self {
            BeamSchool::Order => Some(BeamSchool::Pure),
            BeamSchool::Chaos => Some(BeamSchool::Order),
            BeamSchool::Pure => Some(BeamSchool::Chaos),
            BeamSchool::Neutral => None,
        }
    }

    /// Beam locked out while a gem of this school is channeled.
    ///
    /// Channeling a gem locks the beam that counters the gem's own school.
    #[must_use]
    pub const fn lockout(self) -> Option<BeamSchool> {
        self.countered_by()
    }

    /// Beam-type node that enables this school.
    #[must_use]
    pub const fn beam_node(self) -> Option<NodeId> {
        match self {
            BeamSchool::Pure => Some(NodeId::Belly),
            BeamSchool::Chaos => Some(NodeId::LeftHand),
            BeamSchool::Order => Some(NodeId::RightHand),
            BeamSchool::Neutral => None,
        }
    }

    /// Whether this is one of the attack schools.
    #[must_use]
    pub const fn is_attack(self) -> bool {
        !matches!(self, BeamSchool::Neutral)
    }
}

/// Elemental flavor of gems, spells and a side's dominant element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    /// Beats earth.
    Fire,
    /// Beats fire.
    Water,
    /// Beats air.
    Earth,
    /// Beats water.
    Air,
}

impl Element {
    /// All elements in counting order.
    pub const ALL: [Element; 4] = [Element::Fire, Element::Water, Element::Earth, Element::Air];

    /// The element this one beats: fire > earth > air > water > fire.
    #[must_use]
    pub const fn beats(self) -> Element {
        match self {
            Element::Fire => Element::Earth,
            Element::Earth => Element::Air,
            Element::Air => Element::Water,
            Element::Water => Element::Fire,
        }
    }
}

/// Result of comparing two elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Matchup {
    /// The first element beats the second.
    WinnerA,
    /// The second element beats the first.
    WinnerB,
    /// No advantage either way.
    Neutral,
}

/// Structural role of a node in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Holds a gem; contributes mana.
    GemSlot,
    /// Enables one beam school; contributes mana.
    BeamType,
    /// Connective node; never contributes mana.
    Pathway,
}

/// Lifecycle state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    /// Inactive; awareness can open it.
    #[default]
    Dormant,
    /// Active; contributes mana and passives.
    Open,
    /// Holding a channeled spell.
    Channeled,
    /// Broken; must be repaired back to dormant.
    Damaged,
}

impl NodeState {
    /// Open or channeled nodes count as active.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, NodeState::Open | NodeState::Channeled)
    }
}

/// Identity of one of the 13 nodes in a side's network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeId {
    /// Top of the head.
    Crown,
    /// Forehead.
    ThirdEye,
    /// Neck.
    Throat,
    /// Left shoulder gem slot.
    LeftShoulder,
    /// Right shoulder gem slot.
    RightShoulder,
    /// Left root gem slot.
    LeftRoot,
    /// Right root gem slot.
    RightRoot,
    /// Pure beam node.
    Belly,
    /// Chaos beam node.
    LeftHand,
    /// Order beam node.
    RightHand,
    /// Central pathway.
    Sternum,
    /// Left arm pathway.
    LeftElbow,
    /// Right arm pathway.
    RightElbow,
}

impl NodeId {
    /// Every node, gem slots first, then beam nodes, then pathways.
    pub const ALL: [NodeId; 13] = [
        NodeId::Crown,
        NodeId::ThirdEye,
        NodeId::Throat,
        NodeId::LeftShoulder,
        NodeId::RightShoulder,
        NodeId::LeftRoot,
        NodeId::RightRoot,
        NodeId::Belly,
        NodeId::LeftHand,
        NodeId::RightHand,
        NodeId::Sternum,
        NodeId::LeftElbow,
        NodeId::RightElbow,
    ];

    /// Nodes that can hold gems.
    pub const GEM_SLOTS: [NodeId; 7] = [
        NodeId::Crown,
        NodeId::ThirdEye,
        NodeId::Throat,
        NodeId::LeftShoulder,
        NodeId::RightShoulder,
        NodeId::LeftRoot,
        NodeId::RightRoot,
    ];

    /// Nodes that enable beam schools.
    pub const BEAM_TYPES: [NodeId; 3] = [NodeId::Belly, NodeId::LeftHand, NodeId::RightHand];

    /// Connective nodes.
    pub const PATHWAYS: [NodeId; 3] = [NodeId::Sternum, NodeId::LeftElbow, NodeId::RightElbow];

    /// Root nodes, the sink of water-beam floods.
    pub const ROOTS: [NodeId; 2] = [NodeId::LeftRoot, NodeId::RightRoot];

    /// Structural role of this node.
    #[must_use]
    pub const fn kind(self) -> NodeKind {
        match self {
            NodeId::Crown
            | NodeId::ThirdEye
            | NodeId::Throat
            | NodeId::LeftShoulder
            | NodeId::RightShoulder
            | NodeId::LeftRoot
            | NodeId::RightRoot => NodeKind::GemSlot,
            NodeId::Belly | NodeId::LeftHand | NodeId::RightHand => NodeKind::BeamType,
            NodeId::Sternum | NodeId::LeftElbow | NodeId::RightElbow => NodeKind::Pathway,
        }
    }

    /// Beam school enabled by a beam-type node.
    #[must_use]
    pub const fn beam_school(self) -> Option<BeamSchool> {
        match self {
            NodeId::Belly => Some(BeamSchool::Pure),
            NodeId::LeftHand => Some(BeamSchool::Chaos),
            NodeId::RightHand => Some(BeamSchool::Order),
            _ => None,
        }
    }

    /// Whether this node adds to network mana when active.
    #[must_use]
    pub const fn contributes_mana(self) -> bool {
        !matches!(self.kind(), NodeKind::Pathway)
    }

    /// Snake-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            NodeId::Crown => "crown",
            NodeId::ThirdEye => "third_eye",
            NodeId::Throat => "throat",
            NodeId::LeftShoulder => "left_shoulder",
            NodeId::RightShoulder => "right_shoulder",
            NodeId::LeftRoot => "left_root",
            NodeId::RightRoot => "right_root",
            NodeId::Belly => "belly",
            NodeId::LeftHand => "left_hand",
            NodeId::RightHand => "right_hand",
            NodeId::Sternum => "sternum",
            NodeId::LeftElbow => "left_elbow",
            NodeId::RightElbow => "right_elbow",
        }
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Beam switcher state machine: `Ready -> Charging -> Locked -> Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeamSwitchState {
    /// Accepting switch requests.
    #[default]
    Ready,
    /// Charging toward a target school.
    Charging,
    /// Recently switched; requests rejected until the lock expires.
    Locked,
}

/// Shield state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShieldState {
    /// No shield gem channeled.
    #[default]
    Unavailable,
    /// Available but lowered.
    Down,
    /// Raised; blocks projectiles.
    Up,
    /// Broken by a hit; rises again when the timer runs out.
    Recharging,
}

/// Final result of a combat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatResult {
    /// The player overwhelmed or killed the enemy.
    PlayerWin,
    /// The enemy overwhelmed or killed the player.
    EnemyWin,
}

impl CombatResult {
    /// Result in which `side` wins.
    #[must_use]
    pub const fn won_by(side: Side) -> Self {
        match side {
            Side::Player => CombatResult::PlayerWin,
            Side::Enemy => CombatResult::EnemyWin,
        }
    }

    /// Winning side.
    #[must_use]
    pub const fn winner(self) -> Side {
        match self {
            CombatResult::PlayerWin => Side::Player,
            CombatResult::EnemyWin => Side::Enemy,
        }
    }
}
