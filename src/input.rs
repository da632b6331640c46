//! Keyboard events → movement commands.

use crate::controller::{DragAxis, MoveAxis, MoveCommand};
use crate::float_types::Real;
use crate::settings::{Settings, SpeedTier, StepTable};
use hashbrown::HashMap;
use nalgebra::Point3;

/// Keys of the default layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    W,
    S,
    A,
    D,
    Q,
    E,
    Z,
    X,
    Digit1,
    Digit3,
    R,
    F,
    Comma,
    Period,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyPhase {
    Down,
    Held,
    Up,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub fast: bool,
    pub slow: bool,
}

impl Modifiers {
    /// Fast wins when both are held.
    pub const fn tier(self) -> SpeedTier {
        if self.fast {
            SpeedTier::Fast
        } else if self.slow {
            SpeedTier::Slow
        } else {
            SpeedTier::Normal
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub phase: KeyPhase,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub const fn new(key: Key, phase: KeyPhase) -> Self {
        Self {
            key,
            phase,
            modifiers: Modifiers {
                fast: false,
                slow: false,
            },
        }
    }

    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Action {
    Move(MoveAxis, Real),
    Rotate(Real, Real),
    Spin(Real),
}

impl Key {
    const fn action(self) -> Action {
        match self {
            Key::W => Action::Move(MoveAxis::Ap, -1.0),
            Key::S => Action::Move(MoveAxis::Ap, 1.0),
            Key::A => Action::Move(MoveAxis::Ml, -1.0),
            Key::D => Action::Move(MoveAxis::Ml, 1.0),
            Key::Q => Action::Move(MoveAxis::Dv, 1.0),
            Key::E => Action::Move(MoveAxis::Dv, -1.0),
            Key::Z => Action::Move(MoveAxis::Depth, 1.0),
            Key::X => Action::Move(MoveAxis::Depth, -1.0),
            Key::Digit1 => Action::Rotate(-1.0, 0.0),
            Key::Digit3 => Action::Rotate(1.0, 0.0),
            Key::R => Action::Rotate(0.0, 1.0),
            Key::F => Action::Rotate(0.0, -1.0),
            Key::Comma => Action::Spin(-1.0),
            Key::Period => Action::Spin(1.0),
        }
    }

    /// Axis this key locks while a drag is in progress. Spin keys lock nothing.
    pub const fn drag_axis(self) -> Option<DragAxis> {
        match self {
            Key::W | Key::S => Some(DragAxis::Ap),
            Key::A | Key::D => Some(DragAxis::Ml),
            Key::Q | Key::E => Some(DragAxis::Dv),
            Key::Z | Key::X => Some(DragAxis::Depth),
            Key::R | Key::F => Some(DragAxis::Theta),
            Key::Digit1 | Key::Digit3 => Some(DragAxis::Phi),
            Key::Comma | Key::Period => None,
        }
    }
}

/// Tracks key press times so taps and holds produce the right increments.
///
/// A `Down` produces one tap increment. A `Held` only produces increments once
/// the key has been down longer than the hold delay, scaled by the frame time.
#[derive(Debug, Clone)]
pub struct KeyboardTranslator {
    step: StepTable,
    hold_delay: Real,
    pressed_at: HashMap<Key, Real>,
}

impl KeyboardTranslator {
    pub fn new(settings: &Settings) -> Self {
        Self {
            step: settings.step,
            hold_delay: settings.key_hold_delay,
            pressed_at: HashMap::new(),
        }
    }

    pub fn is_pressed(&self, key: Key) -> bool {
        self.pressed_at.contains_key(&key)
    }

    /// Translate one event at time `now` (seconds), `dt` seconds after the previous frame.
    pub fn translate(&mut self, event: &KeyEvent, now: Real, dt: Real) -> Option<MoveCommand> {
        let tier = event.modifiers.tier();
        let scale = match event.phase {
            KeyPhase::Down => {
                self.pressed_at.insert(event.key, now);
                None
            }
            KeyPhase::Held => {
                let since = *self.pressed_at.entry(event.key).or_insert(now);
                if now - since > self.hold_delay {
                    Some(dt)
                } else {
                    return None;
                }
            }
            KeyPhase::Up => {
                self.pressed_at.remove(&event.key);
                return None;
            }
        };

        let command = match event.key.action() {
            Action::Move(axis, sign) => {
                let amount = match scale {
                    None => self.step.move_tap.get(tier),
                    Some(dt) => self.step.move_hold.get(tier) * dt,
                };
                MoveCommand::Step {
                    axis,
                    amount: sign * amount,
                }
            }
            Action::Rotate(phi, theta) => {
                let amount = self.rotation_amount(tier, scale);
                MoveCommand::Rotate {
                    phi: phi * amount,
                    theta: theta * amount,
                }
            }
            Action::Spin(sign) => MoveCommand::Spin(sign * self.rotation_amount(tier, scale)),
        };
        Some(command)
    }

    /// Axis locked by the most recently pressed key that locks one.
    pub fn drag_axis(&self) -> Option<DragAxis> {
        self.pressed_at
            .iter()
            .filter_map(|(key, at)| key.drag_axis().map(|axis| (axis, *at)))
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(axis, _)| axis)
    }

    /// Drag update for `cursor`, or `None` while no held key locks an axis.
    pub fn drag_to(&self, cursor: Point3<Real>) -> Option<MoveCommand> {
        self.drag_axis()
            .map(|axis| MoveCommand::DragTo { axis, cursor })
    }

    fn rotation_amount(&self, tier: SpeedTier, scale: Option<Real>) -> Real {
        match scale {
            None => self.step.rotate_tap.get(tier),
            Some(dt) => self.step.rotate_hold.get(tier) * dt,
        }
    }
}
