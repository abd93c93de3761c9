#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
}

const ACTION_COUNT: usize = 4;

impl InputAction {
    pub const ALL: [InputAction; ACTION_COUNT] = [
        InputAction::MoveUp,
        InputAction::MoveDown,
        InputAction::MoveLeft,
        InputAction::MoveRight,
    ];

    const fn index(self) -> usize {
        match self {
            InputAction::MoveUp => 0,
            InputAction::MoveDown => 1,
            InputAction::MoveLeft => 2,
            InputAction::MoveRight => 3,
        }
    }
}

/// The four directional flags movement is derived from. Opposing flags may both be set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectionFlags {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl DirectionFlags {
    pub const NONE: Self = Self {
        up: false,
        down: false,
        left: false,
        right: false,
    };

    pub fn any(self) -> bool {
        self.up || self.down || self.left || self.right
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            up: self.up || other.up,
            down: self.down || other.down,
            left: self.left || other.left,
            right: self.right || other.right,
        }
    }

    /// Every combination of the four flags, in bit order.
    pub fn all_combinations() -> impl Iterator<Item = Self> {
        (0u8..16).map(|bits| Self {
            up: bits & 0b0001 != 0,
            down: bits & 0b0010 != 0,
            left: bits & 0b0100 != 0,
            right: bits & 0b1000 != 0,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }

    pub fn clear(&mut self) {
        self.down = [false; ACTION_COUNT];
    }

    pub fn directions(&self) -> DirectionFlags {
        DirectionFlags {
            up: self.is_down(InputAction::MoveUp),
            down: self.is_down(InputAction::MoveDown),
            left: self.is_down(InputAction::MoveLeft),
            right: self.is_down(InputAction::MoveRight),
        }
    }
}

impl From<DirectionFlags> for ActionStates {
    fn from(flags: DirectionFlags) -> Self {
        let mut states = Self::default();
        states.set(InputAction::MoveUp, flags.up);
        states.set(InputAction::MoveDown, flags.down);
        states.set(InputAction::MoveLeft, flags.left);
        states.set(InputAction::MoveRight, flags.right);
        states
    }
}
