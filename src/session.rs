//! The scene: every probe, the shared space and transforms, and the update cycle.
//!
//! Each [`Session::apply`] runs one `apply → resolve → validate → surface → report`
//! pass for a single probe. A move that would penetrate another collider is
//! rolled back before anything else sees it.

use crate::collision::{CollisionEngine, CollisionWorld, Contact, probe_candidates};
use crate::controller::{MoveCommand, PoseTarget, ProbeController};
use crate::errors::ProbeError;
use crate::float_types::{
    Real,
    rapier3d::prelude::{ColliderHandle, SharedShape},
};
use crate::insertion::ProbeInsertion;
use crate::manipulator::{ManipulatorBinding, PositionEcho};
use crate::pose::{PoseResolver, ResolvedPose};
use crate::probe_kind::{ProbeKind, RecordingRegion, ShankGeometry};
use crate::record::InsertionRecord;
use crate::settings::Settings;
use crate::space::CoordinateSpace;
use crate::surface::{SearchMode, SurfaceFinder, SurfaceResult};
use crate::traits::LabelVolume;
use crate::transform::TransformSet;
use crate::volume::VolumeGate;
use log::{debug, info};
use nalgebra::{Isometry3, Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};

/// Stable identifier of a probe within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProbeHandle(pub u32);

impl fmt::Display for ProbeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One probe entity. Owns its insertion exclusively.
#[derive(Debug, Clone)]
pub struct Probe {
    insertion: ProbeInsertion,
    controller: ProbeController,
    geometry: ShankGeometry,
    pose: ResolvedPose,
    surfaces: Vec<SurfaceResult>,
    recording: RecordingRegion,
}

impl Probe {
    pub const fn insertion(&self) -> &ProbeInsertion {
        &self.insertion
    }

    pub const fn controller(&self) -> &ProbeController {
        &self.controller
    }

    pub const fn geometry(&self) -> &ShankGeometry {
        &self.geometry
    }

    pub const fn pose(&self) -> &ResolvedPose {
        &self.pose
    }

    /// Last computed surface crossing of the tip shank; `None` until the label volume is ready.
    pub fn surface(&self) -> Option<&SurfaceResult> {
        self.surfaces.first()
    }

    /// Crossing of every shank, in [`ShankGeometry::shank_offsets`] order.
    pub fn shank_surfaces(&self) -> &[SurfaceResult] {
        &self.surfaces
    }

    pub const fn recording(&self) -> &RecordingRegion {
        &self.recording
    }
}

/// What collaborators read after a committed update.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateReport {
    pub probe: ProbeHandle,
    pub apmldv: Vector3<Real>,
    /// Angles in the session's display convention.
    pub angles: Vector3<Real>,
    pub pose: ResolvedPose,
    /// Crossing of the tip shank.
    pub surface: Option<SurfaceResult>,
    /// One crossing per shank; empty until the label volume is ready.
    pub shank_surfaces: Vec<SurfaceResult>,
    pub recording_span: (Point3<Real>, Point3<Real>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    Committed(UpdateReport),
    /// The move penetrated another collider and was undone.
    RolledBack { contacts: Vec<Contact> },
    /// Nothing moved.
    Unchanged,
}

impl MoveOutcome {
    pub const fn is_committed(&self) -> bool {
        matches!(self, MoveOutcome::Committed(_))
    }

    pub const fn is_rolled_back(&self) -> bool {
        matches!(self, MoveOutcome::RolledBack { .. })
    }
}

fn surfaces_for(
    space: &CoordinateSpace,
    gate: &VolumeGate<dyn LabelVolume>,
    settings: &Settings,
    pose: &ResolvedPose,
    geometry: &ShankGeometry,
    mode: SearchMode,
) -> Vec<SurfaceResult> {
    match gate.get() {
        Some(volume) => SurfaceFinder::new(space, volume.as_ref(), &settings.surface)
            .find_for_shanks(pose, geometry, mode),
        None => Vec::new(),
    }
}

pub struct Session {
    space: Arc<CoordinateSpace>,
    transforms: TransformSet,
    settings: Settings,
    probes: BTreeMap<ProbeHandle, Probe>,
    active: Option<ProbeHandle>,
    next_handle: u32,
    world: CollisionWorld,
    volume: Arc<VolumeGate<dyn LabelVolume>>,
    echo_tx: Sender<PositionEcho>,
    echo_rx: Receiver<PositionEcho>,
}

impl Session {
    pub fn new(space: Arc<CoordinateSpace>, settings: Settings) -> Self {
        Self::with_transforms(space, TransformSet::standard(), settings)
    }

    pub fn with_transforms(space: Arc<CoordinateSpace>, transforms: TransformSet, settings: Settings) -> Self {
        let (echo_tx, echo_rx) = mpsc::channel();
        info!("session over {} with transform {}", space.name(), transforms.active().name());
        Self {
            space,
            transforms,
            settings,
            probes: BTreeMap::new(),
            active: None,
            next_handle: 0,
            world: CollisionWorld::new(),
            volume: Arc::new(VolumeGate::new()),
            echo_tx,
            echo_rx,
        }
    }

    pub fn space(&self) -> &Arc<CoordinateSpace> {
        &self.space
    }

    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub const fn transforms(&self) -> &TransformSet {
        &self.transforms
    }

    pub const fn collision_world(&self) -> &CollisionWorld {
        &self.world
    }

    /// Gate a loader thread hands the label volume to.
    pub fn volume_gate(&self) -> Arc<VolumeGate<dyn LabelVolume>> {
        Arc::clone(&self.volume)
    }

    /// Provide the volume and compute every probe's surface crossing.
    pub fn provide_volume(&mut self, volume: Arc<dyn LabelVolume>) {
        self.volume.provide(volume);
        self.refresh_surfaces();
    }

    /// Recompute surface crossings, e.g. after the volume arrived from another thread.
    pub fn refresh_surfaces(&mut self) {
        for probe in self.probes.values_mut() {
            probe.surfaces = surfaces_for(
                &self.space,
                &self.volume,
                &self.settings,
                &probe.pose,
                &probe.geometry,
                SearchMode::FromOutside,
            );
        }
    }

    /// Switch the active transform. Probes keep their physical position.
    pub fn set_active_transform(&mut self, name: &str) -> Result<(), ProbeError> {
        let transform = self.transforms.set_active(name)?;
        for (handle, probe) in self.probes.iter_mut() {
            probe.insertion.retarget(Arc::clone(&transform));
            // angles now act in the new transform's frame
            probe.pose = PoseResolver::resolve(&mut probe.insertion, probe.controller.pending_mut());
            self.world
                .set_probe_colliders(*handle, probe_candidates(&probe.geometry, &probe.pose));
            probe.surfaces = surfaces_for(
                &self.space,
                &self.volume,
                &self.settings,
                &probe.pose,
                &probe.geometry,
                SearchMode::FromOutside,
            );
        }
        info!("active transform is now {name}");
        Ok(())
    }

    /// Add a probe at the active transform's reference, pointing straight down.
    /// It becomes active if no probe was.
    pub fn add_probe(&mut self, kind: ProbeKind) -> ProbeHandle {
        let insertion = ProbeInsertion::at_reference(kind, Arc::clone(&self.space), self.transforms.active());
        self.insert_probe(insertion)
    }

    fn insert_probe(&mut self, mut insertion: ProbeInsertion) -> ProbeHandle {
        let handle = ProbeHandle(self.next_handle);
        self.next_handle += 1;

        let mut controller = ProbeController::new();
        let pose = PoseResolver::resolve(&mut insertion, controller.pending_mut());
        let geometry = insertion.kind().geometry();
        self.world
            .set_probe_colliders(handle, probe_candidates(&geometry, &pose));
        let surfaces = surfaces_for(
            &self.space,
            &self.volume,
            &self.settings,
            &pose,
            &geometry,
            SearchMode::FromOutside,
        );

        debug!("added probe {handle} ({})", insertion.kind().name());
        self.probes.insert(
            handle,
            Probe {
                recording: RecordingRegion::for_geometry(&geometry),
                insertion,
                controller,
                geometry,
                pose,
                surfaces,
            },
        );
        if self.active.is_none() {
            self.active = Some(handle);
        }
        handle
    }

    pub fn remove_probe(&mut self, handle: ProbeHandle) -> Result<Probe, ProbeError> {
        let probe = self
            .probes
            .remove(&handle)
            .ok_or(ProbeError::UnknownProbe(handle))?;
        self.world.remove_probe(handle);
        if self.active == Some(handle) {
            self.active = self.probes.keys().next().copied();
        }
        Ok(probe)
    }

    pub const fn active(&self) -> Option<ProbeHandle> {
        self.active
    }

    pub fn set_active(&mut self, handle: ProbeHandle) -> Result<(), ProbeError> {
        if !self.probes.contains_key(&handle) {
            return Err(ProbeError::UnknownProbe(handle));
        }
        self.active = Some(handle);
        Ok(())
    }

    pub fn probe(&self, handle: ProbeHandle) -> Result<&Probe, ProbeError> {
        self.probes.get(&handle).ok_or(ProbeError::UnknownProbe(handle))
    }

    pub fn probes(&self) -> impl Iterator<Item = (ProbeHandle, &Probe)> {
        self.probes.iter().map(|(h, p)| (*h, p))
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    /// Run one update cycle for `handle`.
    pub fn apply(&mut self, handle: ProbeHandle, command: MoveCommand) -> Result<MoveOutcome, ProbeError> {
        let probe = self
            .probes
            .get_mut(&handle)
            .ok_or(ProbeError::UnknownProbe(handle))?;

        let before = probe.insertion.clone();
        let touched = probe
            .controller
            .apply(handle, &mut probe.insertion, &command, &self.settings)?;
        if !touched && probe.controller.pending().is_zero() {
            return Ok(MoveOutcome::Unchanged);
        }

        let pose = PoseResolver::resolve(&mut probe.insertion, probe.controller.pending_mut());
        if probe.insertion.same_pose(&before) && pose == probe.pose {
            return Ok(MoveOutcome::Unchanged);
        }

        let mut candidates = probe_candidates(&probe.geometry, &pose);
        self.world.tag_candidates(handle, &mut candidates);
        if self.settings.detect_collisions {
            let others = self.world.others_for(handle);
            if CollisionEngine::test(&candidates, &others).is_some() {
                let contacts = CollisionEngine::contacts(&candidates, &others);
                debug!("probe {handle}: move rejected, {} contacts", contacts.len());
                probe.insertion = before;
                return Ok(MoveOutcome::RolledBack { contacts });
            }
        }

        self.world.set_probe_colliders(handle, candidates);
        probe.pose = pose;
        probe.surfaces = surfaces_for(
            &self.space,
            &self.volume,
            &self.settings,
            &pose,
            &probe.geometry,
            SearchMode::FromOutside,
        );
        Ok(MoveOutcome::Committed(Self::report_of(handle, probe, &self.settings)))
    }

    /// [`apply`](Self::apply) to the active probe.
    pub fn apply_active(&mut self, command: MoveCommand) -> Result<MoveOutcome, ProbeError> {
        let handle = self.active.ok_or(ProbeError::NoActiveProbe)?;
        self.apply(handle, command)
    }

    fn report_of(handle: ProbeHandle, probe: &Probe, settings: &Settings) -> UpdateReport {
        UpdateReport {
            probe: handle,
            apmldv: probe.insertion.apmldv(),
            angles: probe.insertion.angles_in(settings.angle_convention),
            pose: probe.pose,
            surface: probe.surface().copied(),
            shank_surfaces: probe.surfaces.clone(),
            recording_span: probe.recording.world_span(&probe.pose),
        }
    }

    pub fn report(&self, handle: ProbeHandle) -> Result<UpdateReport, ProbeError> {
        let probe = self.probe(handle)?;
        Ok(Self::report_of(handle, probe, &self.settings))
    }

    /// Surface crossing of the tip shank for the probe's committed pose.
    pub fn surface(&self, handle: ProbeHandle, mode: SearchMode) -> Result<SurfaceResult, ProbeError> {
        let probe = self.probe(handle)?;
        let volume = self.volume.get().ok_or(ProbeError::VolumeNotReady)?;
        let finder = SurfaceFinder::new(&self.space, volume.as_ref(), &self.settings.surface);
        Ok(finder.find(&probe.pose.tip, &probe.pose.up, mode))
    }

    /// Move the tip onto the brain surface along its shaft, from above or below.
    ///
    /// A known crossing is used as is. Otherwise the shaft is searched from
    /// `drop_start_offset` below the tip upwards; a probe driven by a manipulator
    /// that drops along DV searches straight up instead of along the shaft.
    pub fn drop_to_surface(&mut self, handle: ProbeHandle) -> Result<MoveOutcome, ProbeError> {
        let volume = self.volume.get().ok_or(ProbeError::VolumeNotReady)?;
        let probe = self.probe(handle)?;

        let known = probe.surface().filter(|s| s.in_brain).map(|s| s.surface);
        let found = known.or_else(|| {
            let along_dv = probe
                .controller
                .manipulator()
                .is_some_and(|binding| !binding.drop_with_depth);
            let up = if along_dv { Vector3::y() } else { probe.pose.up };
            let search = &self.settings.surface;
            let start = probe.pose.tip - up * search.drop_start_offset;
            SurfaceFinder::new(&self.space, volume.as_ref(), search).find_surface_below(
                &start,
                &up,
                search.drop_search_distance,
            )
        });

        match found {
            Some(surface) => {
                let apmldv = probe.insertion.world_to_transformed(&surface);
                self.apply(handle, MoveCommand::SetAbsolute(PoseTarget::position(apmldv)))
            }
            None => {
                debug!("probe {handle}: no brain surface along the shaft");
                Ok(MoveOutcome::Unchanged)
            }
        }
    }

    /// Colliders the probe currently penetrates, for highlighting.
    pub fn contacts(&self, handle: ProbeHandle) -> Result<Vec<Contact>, ProbeError> {
        let probe = self.probe(handle)?;
        let mut candidates = probe_candidates(&probe.geometry, &probe.pose);
        self.world.tag_candidates(handle, &mut candidates);
        Ok(CollisionEngine::contacts(&candidates, &self.world.others_for(handle)))
    }

    pub fn shift_recording_region(&mut self, handle: ProbeHandle, delta: Real) -> Result<RecordingRegion, ProbeError> {
        let probe = self
            .probes
            .get_mut(&handle)
            .ok_or(ProbeError::UnknownProbe(handle))?;
        probe.recording.shift(delta);
        Ok(probe.recording)
    }

    pub fn add_rig_collider(
        &mut self,
        rig: impl Into<String>,
        shape: SharedShape,
        position: Isometry3<Real>,
    ) -> ColliderHandle {
        self.world.add_rig_collider(rig, shape, position)
    }

    pub fn set_rig_visible(&mut self, rig: &str, visible: bool) -> bool {
        self.world.set_rig_visible(rig, visible)
    }

    pub fn remove_rig(&mut self, rig: &str) -> bool {
        self.world.remove_rig(rig)
    }

    /// While enabled, local commands for this probe fail with [`ProbeError::ExternalControl`].
    pub fn enable_external_control(&mut self, handle: ProbeHandle, enabled: bool) -> Result<(), ProbeError> {
        let probe = self
            .probes
            .get_mut(&handle)
            .ok_or(ProbeError::UnknownProbe(handle))?;
        probe.controller.set_external_control(enabled);
        info!("probe {handle}: external control {}", if enabled { "on" } else { "off" });
        Ok(())
    }

    pub fn bind_manipulator(&mut self, handle: ProbeHandle, binding: ManipulatorBinding) -> Result<(), ProbeError> {
        let probe = self
            .probes
            .get_mut(&handle)
            .ok_or(ProbeError::UnknownProbe(handle))?;
        probe.controller.bind_manipulator(binding);
        Ok(())
    }

    /// Channel end the manipulator link pushes readings into, from any thread.
    pub fn echo_sender(&self) -> Sender<PositionEcho> {
        self.echo_tx.clone()
    }

    /// Apply every queued reading in arrival order.
    pub fn drain_echoes(&mut self) -> Vec<(ProbeHandle, Result<MoveOutcome, ProbeError>)> {
        let mut outcomes = Vec::new();
        while let Ok(echo) = self.echo_rx.try_recv() {
            let target = self.probes.iter().find_map(|(handle, probe)| {
                probe
                    .controller
                    .manipulator()
                    .filter(|binding| binding.manipulator_id == echo.manipulator_id)
                    .map(|_| *handle)
            });
            match target {
                Some(handle) => outcomes.push((handle, self.apply(handle, MoveCommand::Echo(echo.position)))),
                None => debug!("echo from unbound manipulator {}", echo.manipulator_id),
            }
        }
        outcomes
    }

    pub fn record(&self, handle: ProbeHandle) -> Result<InsertionRecord, ProbeError> {
        Ok(InsertionRecord::from(&self.probe(handle)?.insertion))
    }

    /// Rebuild a probe from its persisted record.
    pub fn restore(&mut self, record: &InsertionRecord) -> Result<ProbeHandle, ProbeError> {
        let kind = ProbeKind::from_id(record.probe)?;
        let transform = self.transforms.get(&record.transform)?;
        let insertion = ProbeInsertion::new(
            record.apmldv(),
            record.angles(),
            kind,
            Arc::clone(&self.space),
            transform,
        );
        Ok(self.insert_probe(insertion))
    }
}
