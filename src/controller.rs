//! Movement commands and the per-probe controller that applies them.
//!
//! Commands are the only way a [`ProbeInsertion`] gets mutated. They come in
//! three modes that are never mixed within one update: discrete steps, a drag
//! gesture locked to one axis, and absolute poses (manual entry or echoed
//! manipulator readings).

use crate::errors::ProbeError;
use crate::float_types::Real;
use crate::insertion::{AngleConvention, ProbeInsertion};
use crate::manipulator::ManipulatorBinding;
use crate::pose::PendingDepth;
use crate::session::ProbeHandle;
use crate::settings::Settings;
use log::debug;
use nalgebra::{Point3, Vector3, Vector4};

/// Axes a discrete step can move along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveAxis {
    Ap,
    Ml,
    Dv,
    /// Along the shaft.
    Depth,
}

/// The single axis a drag gesture drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DragAxis {
    Ap,
    Ml,
    Dv,
    Depth,
    Theta,
    Phi,
}

/// A full or partial absolute pose.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PoseTarget {
    /// Position in the probe's transformed space.
    pub apmldv: Option<Vector3<Real>>,
    /// Native `(phi, theta, spin)`.
    pub angles: Option<Vector3<Real>>,
    /// Depth to drive along the shaft after placing the tip.
    pub depth: Real,
}

impl PoseTarget {
    pub const fn position(apmldv: Vector3<Real>) -> Self {
        Self {
            apmldv: Some(apmldv),
            angles: None,
            depth: 0.0,
        }
    }

    pub const fn with_angles(mut self, angles: Vector3<Real>) -> Self {
        self.angles = Some(angles);
        self
    }

    pub const fn with_depth(mut self, depth: Real) -> Self {
        self.depth = depth;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveCommand {
    /// Move `amount` mm along a canonical atlas axis (or along the shaft for `Depth`).
    Step { axis: MoveAxis, amount: Real },
    /// Add to phi and theta, in degrees.
    Rotate { phi: Real, theta: Real },
    Spin(Real),
    /// Start a drag with the cursor at this world point.
    BeginDrag { cursor: Point3<Real> },
    DragTo { axis: DragAxis, cursor: Point3<Real> },
    EndDrag,
    SetAbsolute(PoseTarget),
    /// Raw `(x, y, z, depth)` reading from the bound manipulator.
    Echo(Vector4<Real>),
}

impl MoveCommand {
    /// Commands a user issues directly, refused while a manipulator drives the probe.
    pub const fn is_local(&self) -> bool {
        !matches!(self, MoveCommand::Echo(_) | MoveCommand::EndDrag)
    }
}

#[derive(Debug, Clone, Copy)]
struct DragState {
    locked: Option<DragAxis>,
    apmldv: Vector3<Real>,
    phi: Real,
    theta: Real,
    origin: Point3<Real>,
    last: Point3<Real>,
}

impl DragState {
    fn baseline(insertion: &ProbeInsertion, cursor: Point3<Real>) -> Self {
        Self {
            locked: None,
            apmldv: insertion.apmldv(),
            phi: insertion.phi,
            theta: insertion.theta(),
            origin: cursor,
            last: cursor,
        }
    }
}

/// Per-probe movement state: pending depth, an in-flight drag and manipulator ownership.
#[derive(Debug, Clone, Default)]
pub struct ProbeController {
    pending: PendingDepth,
    drag: Option<DragState>,
    external_control: bool,
    manipulator: Option<ManipulatorBinding>,
}

impl ProbeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_mut(&mut self) -> &mut PendingDepth {
        &mut self.pending
    }

    pub const fn pending(&self) -> PendingDepth {
        self.pending
    }

    pub const fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub const fn external_control(&self) -> bool {
        self.external_control
    }

    /// While enabled, local commands are refused. Turning it on cancels any drag.
    pub fn set_external_control(&mut self, enabled: bool) {
        self.external_control = enabled;
        if enabled {
            self.drag = None;
        }
    }

    pub fn bind_manipulator(&mut self, binding: ManipulatorBinding) {
        self.manipulator = Some(binding);
    }

    pub fn unbind_manipulator(&mut self) -> Option<ManipulatorBinding> {
        self.manipulator.take()
    }

    pub const fn manipulator(&self) -> Option<&ManipulatorBinding> {
        self.manipulator.as_ref()
    }

    pub fn manipulator_mut(&mut self) -> Option<&mut ManipulatorBinding> {
        self.manipulator.as_mut()
    }

    /// Apply one command to the insertion. Returns whether anything was touched;
    /// the caller still has to resolve the pose to fold pending depth.
    pub fn apply(
        &mut self,
        handle: ProbeHandle,
        insertion: &mut ProbeInsertion,
        command: &MoveCommand,
        settings: &Settings,
    ) -> Result<bool, ProbeError> {
        if self.external_control && command.is_local() {
            return Err(ProbeError::ExternalControl(handle));
        }

        match *command {
            MoveCommand::Step { .. } | MoveCommand::Rotate { .. } | MoveCommand::Spin(_)
                if self.drag.is_some() =>
            {
                debug!("probe {handle}: ignoring step while dragging");
                Ok(false)
            }
            MoveCommand::Step { axis, amount } => {
                let unit = match axis {
                    MoveAxis::Ap => Vector3::x(),
                    MoveAxis::Ml => Vector3::y(),
                    MoveAxis::Dv => Vector3::z(),
                    MoveAxis::Depth => {
                        self.pending.add(amount);
                        return Ok(amount != 0.0);
                    }
                };
                let delta = insertion.transform().axis_change_from_canonical(unit * amount);
                insertion.set_apmldv(insertion.apmldv() + delta);
                Ok(amount != 0.0)
            }
            MoveCommand::Rotate { phi, theta } => {
                insertion.phi += phi;
                insertion.set_theta(insertion.theta() + theta);
                Ok(phi != 0.0 || theta != 0.0)
            }
            MoveCommand::Spin(amount) => {
                insertion.spin += amount;
                Ok(amount != 0.0)
            }
            MoveCommand::BeginDrag { cursor } => {
                self.drag = Some(DragState::baseline(insertion, cursor));
                Ok(false)
            }
            MoveCommand::DragTo { axis, cursor } => Ok(self.drag_to(handle, insertion, axis, cursor, settings)),
            MoveCommand::EndDrag => {
                self.drag = None;
                Ok(false)
            }
            MoveCommand::SetAbsolute(target) => {
                self.set_absolute(insertion, &target);
                Ok(true)
            }
            MoveCommand::Echo(position) => match self.manipulator.as_mut() {
                Some(binding) => {
                    let target = binding.echo_to_target(position, insertion.transform());
                    self.set_absolute(insertion, &target);
                    Ok(true)
                }
                None => {
                    debug!("probe {handle}: echo without a bound manipulator");
                    Ok(false)
                }
            },
        }
    }

    fn set_absolute(&mut self, insertion: &mut ProbeInsertion, target: &PoseTarget) {
        if let Some(apmldv) = target.apmldv {
            insertion.set_apmldv(apmldv);
        }
        if let Some(angles) = target.angles {
            insertion.set_angles(angles);
        }
        self.pending.set(target.depth);
    }

    fn drag_to(
        &mut self,
        handle: ProbeHandle,
        insertion: &mut ProbeInsertion,
        axis: DragAxis,
        cursor: Point3<Real>,
        settings: &Settings,
    ) -> bool {
        let Some(drag) = self.drag.as_mut() else {
            debug!("probe {handle}: drag update without a drag in progress");
            return false;
        };

        // switching axis mid-gesture starts over from where the probe is now
        if drag.locked.is_some_and(|locked| locked != axis) {
            *drag = DragState::baseline(insertion, cursor);
        }
        drag.locked = Some(axis);

        let gains = &settings.drag;
        let offset = cursor - drag.origin;
        match axis {
            DragAxis::Ap | DragAxis::Ml | DragAxis::Dv => {
                let mut world = Vector3::zeros();
                match axis {
                    DragAxis::Ap => world.z = offset.z,
                    DragAxis::Ml => world.x = offset.x,
                    _ => world.y = offset.y,
                }
                let delta = insertion.world_to_transformed_axis_change(&(world * gains.translation));
                insertion.set_apmldv(drag.apmldv + delta);
            }
            DragAxis::Depth => {
                let step = cursor - drag.last;
                drag.last = cursor;
                self.pending.set(gains.depth * step.y);
            }
            DragAxis::Theta => insertion.set_theta(drag.theta + gains.theta * offset.y),
            DragAxis::Phi => insertion.phi = drag.phi + gains.phi * offset.x,
        }
        true
    }
}

fn parse_field(field: &'static str, input: &str) -> Result<Real, ProbeError> {
    let trimmed = input.trim();
    trimmed
        .parse::<Real>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ProbeError::Parse {
            field,
            input: input.to_string(),
        })
}

/// Read typed coordinates. An empty depth field means no depth.
pub fn parse_manual_entry(ap: &str, ml: &str, dv: &str, depth: &str) -> Result<PoseTarget, ProbeError> {
    let apmldv = Vector3::new(parse_field("ap", ap)?, parse_field("ml", ml)?, parse_field("dv", dv)?);
    let depth = if depth.trim().is_empty() {
        0.0
    } else {
        parse_field("depth", depth)?
    };
    Ok(PoseTarget::position(apmldv).with_depth(depth))
}

/// Read typed angles given in `convention`, returned as native angles.
pub fn parse_manual_angles(
    phi: &str,
    theta: &str,
    spin: &str,
    convention: AngleConvention,
) -> Result<PoseTarget, ProbeError> {
    let typed = Vector3::new(
        parse_field("phi", phi)?,
        parse_field("theta", theta)?,
        parse_field("spin", spin)?,
    );
    Ok(PoseTarget {
        apmldv: None,
        angles: Some(convention.to_native(typed)),
        depth: 0.0,
    })
}
