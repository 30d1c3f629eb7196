use crate::geom::Rect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObstacleKind {
    Wall,
    Water,
    Gate,
    Chest,
    Barrel,
    Crate,
    Tree,
    Rock,
    TorchNode,
    Mud,
    Fire,
    Lava,
    Wood,
    Reed,
    Marble,
    Gold,
    WoodWall,
    Decor,
}

/// Terrain cost class used by the flow field. Ordered so that the
/// worst hazard wins when obstacles overlap a tile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Hazard {
    #[default]
    None = 0,
    Mud = 1,
    Fire = 2,
    Lava = 3,
}

impl Hazard {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::Mud,
            2 => Self::Fire,
            3 => Self::Lava,
            _ => Self::None,
        }
    }

    pub fn cost_multiplier(self) -> u32 {
        match self {
            Self::None => 1,
            Self::Mud => 2,
            Self::Fire => 4,
            Self::Lava => 8,
        }
    }
}

impl ObstacleKind {
    pub fn from_type_name(name: &str) -> Option<Self> {
        let kind = match name.trim().to_ascii_lowercase().as_str() {
            "wall" => Self::Wall,
            "water" => Self::Water,
            "gate" => Self::Gate,
            "chest" => Self::Chest,
            "barrel" => Self::Barrel,
            "crate" => Self::Crate,
            "tree" => Self::Tree,
            "rock" => Self::Rock,
            "torch_node" | "torch" => Self::TorchNode,
            "mud" => Self::Mud,
            "fire" => Self::Fire,
            "lava" => Self::Lava,
            "wood" => Self::Wood,
            "reed" => Self::Reed,
            "marble" => Self::Marble,
            "gold" => Self::Gold,
            "wood_wall" => Self::WoodWall,
            "decor" => Self::Decor,
            _ => return None,
        };
        Some(kind)
    }

    pub fn type_name(self) -> &'static str {
        match self {
            Self::Wall => "wall",
            Self::Water => "water",
            Self::Gate => "gate",
            Self::Chest => "chest",
            Self::Barrel => "barrel",
            Self::Crate => "crate",
            Self::Tree => "tree",
            Self::Rock => "rock",
            Self::TorchNode => "torch_node",
            Self::Mud => "mud",
            Self::Fire => "fire",
            Self::Lava => "lava",
            Self::Wood => "wood",
            Self::Reed => "reed",
            Self::Marble => "marble",
            Self::Gold => "gold",
            Self::WoodWall => "wood_wall",
            Self::Decor => "decor",
        }
    }

    pub fn is_breakable(self) -> bool {
        matches!(self, Self::Barrel | Self::Crate)
    }

    pub fn hazard(self) -> Hazard {
        match self {
            Self::Mud => Hazard::Mud,
            Self::Fire => Hazard::Fire,
            Self::Lava => Hazard::Lava,
            _ => Hazard::None,
        }
    }

    /// Decorative pass-through and hazard terrain never blocks movement.
    fn passable_terrain(self) -> bool {
        matches!(
            self,
            Self::Wood | Self::Reed | Self::Mud | Self::Fire | Self::Lava | Self::Decor
        )
    }

    /// Lower values are drawn first.
    pub fn draw_priority(self) -> u8 {
        match self {
            Self::Water => 0,
            Self::Wood => 1,
            Self::Wall | Self::Marble | Self::Gold | Self::WoodWall => 2,
            Self::Gate => 3,
            Self::Rock => 4,
            _ => 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    pub kind: ObstacleKind,
    pub rect: Rect,
    pub id: Option<String>,
    pub key_id: Option<String>,
    pub locked: bool,
    pub opened: bool,
    pub blocks_attacks: bool,
}

impl Obstacle {
    pub fn new(kind: ObstacleKind, rect: Rect) -> Self {
        let blocks_attacks = !kind.passable_terrain() && kind != ObstacleKind::Water;
        Self {
            kind,
            rect,
            id: None,
            key_id: None,
            locked: kind == ObstacleKind::Gate,
            opened: false,
            blocks_attacks,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn gate(id: impl Into<String>, rect: Rect, locked: bool) -> Self {
        let mut gate = Self::new(ObstacleKind::Gate, rect).with_id(id);
        gate.set_locked(locked);
        gate
    }

    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
        if self.kind == ObstacleKind::Gate {
            self.blocks_attacks = locked;
        }
    }

    pub fn blocks_movement(&self) -> bool {
        match self.kind {
            ObstacleKind::Gate => self.locked,
            ObstacleKind::Chest => !self.opened,
            kind => !kind.passable_terrain(),
        }
    }

    pub fn hazard(&self) -> Hazard {
        self.kind.hazard()
    }

    pub fn id_matches(&self, id: &str) -> bool {
        self.id.as_deref() == Some(id)
    }
}
