use glam::Vec2;

/// Behaviour mode. Decides whether the patrol controller runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Sitting still; a tap rerolls the still image.
    Idle,
    /// Bouncing across the screen with the directional animation.
    Patrolling,
}

impl Mode {
    pub fn label(self) -> &'static str {
        match self {
            Mode::Idle => "Stop",
            Mode::Patrolling => "Patrol",
        }
    }
}

/// Context-menu entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Stop,
    Patrol,
    Quit,
}

impl MenuAction {
    pub fn label(self) -> &'static str {
        match self {
            MenuAction::Stop => Mode::Idle.label(),
            MenuAction::Patrol => Mode::Patrolling.label(),
            MenuAction::Quit => "Quit",
        }
    }

    /// Keyboard shortcut (case-insensitive).
    pub fn from_key(key: char) -> Option<Self> {
        match key.to_ascii_lowercase() {
            's' => Some(MenuAction::Stop),
            'p' => Some(MenuAction::Patrol),
            'q' => Some(MenuAction::Quit),
            _ => None,
        }
    }
}

/// Discrete user input, already interpreted by the window layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MascotEvent {
    Tap,
    /// Pointer movement while held, in logical pixels.
    Drag(Vec2),
    Menu(MenuAction),
}

/// Whether the event loop should keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortcuts() {
        assert_eq!(MenuAction::from_key('P'), Some(MenuAction::Patrol));
        assert_eq!(MenuAction::from_key('s'), Some(MenuAction::Stop));
        assert_eq!(MenuAction::from_key('x'), None);
    }

    #[test]
    fn menu_labels_follow_modes() {
        assert_eq!(MenuAction::Stop.label(), Mode::Idle.label());
        assert_eq!(MenuAction::Patrol.label(), Mode::Patrolling.label());
    }
}
