//! Probe and rig colliders, and the pre-commit penetration check.
//!
//! Colliders live in a rapier [`ColliderSet`]; the narrow phase is parry's
//! convex contact query. Nothing here moves a probe, callers decide what to do
//! with a hit.

use crate::float_types::{
    Real,
    parry3d::query,
    rapier3d::prelude::{
        Collider, ColliderBuilder, ColliderHandle, ColliderSet, IslandManager, RigidBodySet,
        SharedShape,
    },
    tolerance,
};
use crate::pose::ResolvedPose;
use crate::probe_kind::ShankGeometry;
use crate::session::ProbeHandle;
use hashbrown::HashMap;
use log::{debug, warn};
use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};

/// Who a collider belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColliderOwner {
    Probe(ProbeHandle),
    /// Fixed equipment, keyed by its rig name.
    Rig(String),
}

/// A collider at a proposed position, not yet committed to the world.
#[derive(Clone)]
pub struct Candidate {
    /// The world collider this candidate would replace, if the probe already has one.
    pub handle: Option<ColliderHandle>,
    pub position: Isometry3<Real>,
    pub shape: SharedShape,
}

impl std::fmt::Debug for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Candidate")
            .field("handle", &self.handle)
            .field("position", &self.position)
            .field("shape", &self.shape.shape_type())
            .finish()
    }
}

/// Box colliders for every shank, plus the base when the probe has one.
pub fn probe_candidates(geometry: &ShankGeometry, pose: &ResolvedPose) -> Vec<Candidate> {
    let base = pose.isometry();
    let half = geometry.shank_half_extents();
    let mut out: Vec<Candidate> = geometry
        .shank_offsets
        .iter()
        .map(|offset| {
            let centre = offset + Vector3::new(0.0, half.y, 0.0);
            Candidate {
                handle: None,
                position: base * Isometry3::from_parts(Translation3::from(centre), UnitQuaternion::identity()),
                shape: SharedShape::cuboid(half.x, half.y, half.z),
            }
        })
        .collect();

    if let (Some(body), Some(centre)) = (geometry.body, geometry.body_center()) {
        out.push(Candidate {
            handle: None,
            position: base * Isometry3::from_parts(Translation3::from(centre), UnitQuaternion::identity()),
            shape: SharedShape::cuboid(body.x, body.y, body.z),
        });
    }
    out
}

/// One penetrating pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    /// Index into the candidate slice that was tested.
    pub candidate: usize,
    pub active: Option<ColliderHandle>,
    pub other: ColliderHandle,
    pub owner: ColliderOwner,
    /// Separation direction, pointing from the active collider toward the other.
    pub normal: Vector3<Real>,
    /// Penetration depth in mm, always positive.
    pub depth: Real,
}

/// A world collider eligible to be hit.
#[derive(Clone, Copy)]
pub struct OtherCollider<'a> {
    pub handle: ColliderHandle,
    pub owner: &'a ColliderOwner,
    pub collider: &'a Collider,
}

/// Stateless pairwise penetration tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollisionEngine;

impl CollisionEngine {
    /// First penetrating pair, if any. Short-circuits on the first hit.
    pub fn test(active: &[Candidate], others: &[OtherCollider<'_>]) -> Option<Contact> {
        active.iter().enumerate().find_map(|(i, candidate)| {
            others
                .iter()
                .find_map(|other| Self::penetration(i, candidate, other))
        })
    }

    /// Every penetrating pair, for highlighting.
    pub fn contacts(active: &[Candidate], others: &[OtherCollider<'_>]) -> Vec<Contact> {
        active
            .iter()
            .enumerate()
            .flat_map(|(i, candidate)| {
                others
                    .iter()
                    .filter_map(move |other| Self::penetration(i, candidate, other))
            })
            .collect()
    }

    fn penetration(index: usize, candidate: &Candidate, other: &OtherCollider<'_>) -> Option<Contact> {
        match query::contact(
            &candidate.position,
            candidate.shape.as_ref(),
            other.collider.position(),
            other.collider.shape(),
            0.0,
        ) {
            // faces resting flush against each other are not a penetration
            Ok(Some(contact)) if contact.dist < -tolerance() => Some(Contact {
                candidate: index,
                active: candidate.handle,
                other: other.handle,
                owner: other.owner.clone(),
                normal: contact.normal1.into_inner(),
                depth: -contact.dist,
            }),
            Ok(_) => None,
            Err(unsupported) => {
                warn!("skipping collider pair without a contact query: {unsupported:?}");
                None
            }
        }
    }
}

/// Every collider in the scene with its owner.
pub struct CollisionWorld {
    colliders: ColliderSet,
    bodies: RigidBodySet,
    islands: IslandManager,
    owners: HashMap<ColliderHandle, ColliderOwner>,
    probes: HashMap<ProbeHandle, Vec<ColliderHandle>>,
    rigs: HashMap<String, Vec<ColliderHandle>>,
}

impl Default for CollisionWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl CollisionWorld {
    pub fn new() -> Self {
        Self {
            colliders: ColliderSet::new(),
            bodies: RigidBodySet::new(),
            islands: IslandManager::new(),
            owners: HashMap::new(),
            probes: HashMap::new(),
            rigs: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    pub fn owner(&self, handle: ColliderHandle) -> Option<&ColliderOwner> {
        self.owners.get(&handle)
    }

    pub fn collider(&self, handle: ColliderHandle) -> Option<&Collider> {
        self.colliders.get(handle)
    }

    pub fn probe_colliders(&self, probe: ProbeHandle) -> &[ColliderHandle] {
        self.probes.get(&probe).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Attach the probe's current world handles to freshly built candidates, in order.
    pub fn tag_candidates(&self, probe: ProbeHandle, candidates: &mut [Candidate]) {
        let existing = self.probe_colliders(probe);
        for (i, candidate) in candidates.iter_mut().enumerate() {
            candidate.handle = existing.get(i).copied();
        }
    }

    /// Commit a probe's colliders. Existing colliders are moved in place when the
    /// layout is unchanged, otherwise the set is rebuilt.
    pub fn set_probe_colliders(&mut self, probe: ProbeHandle, candidates: Vec<Candidate>) {
        let existing = self.probes.get(&probe).cloned().unwrap_or_default();
        if existing.len() == candidates.len() {
            for (handle, candidate) in existing.iter().zip(candidates) {
                if let Some(collider) = self.colliders.get_mut(*handle) {
                    collider.set_position(candidate.position);
                    collider.set_shape(candidate.shape);
                }
            }
            return;
        }

        self.remove_probe(probe);
        let handles: Vec<ColliderHandle> = candidates
            .into_iter()
            .map(|candidate| {
                let collider = ColliderBuilder::new(candidate.shape)
                    .position(candidate.position)
                    .build();
                let handle = self.colliders.insert(collider);
                self.owners.insert(handle, ColliderOwner::Probe(probe));
                handle
            })
            .collect();
        debug!("probe {probe} now has {} colliders", handles.len());
        self.probes.insert(probe, handles);
    }

    pub fn remove_probe(&mut self, probe: ProbeHandle) {
        for handle in self.probes.remove(&probe).unwrap_or_default() {
            self.remove_collider(handle);
        }
    }

    /// Add a static piece of equipment. Rig colliders start visible.
    pub fn add_rig_collider(
        &mut self,
        rig: impl Into<String>,
        shape: SharedShape,
        position: Isometry3<Real>,
    ) -> ColliderHandle {
        let rig = rig.into();
        let handle = self
            .colliders
            .insert(ColliderBuilder::new(shape).position(position).build());
        self.owners.insert(handle, ColliderOwner::Rig(rig.clone()));
        self.rigs.entry(rig).or_default().push(handle);
        handle
    }

    /// Drop every collider of a rig. Returns false if the rig was unknown.
    pub fn remove_rig(&mut self, rig: &str) -> bool {
        match self.rigs.remove(rig) {
            Some(handles) => {
                for handle in handles {
                    self.remove_collider(handle);
                }
                true
            }
            None => false,
        }
    }

    /// Toggle a rig. Hidden rigs are never tested. Returns false if the rig was unknown.
    pub fn set_rig_visible(&mut self, rig: &str, visible: bool) -> bool {
        let Some(handles) = self.rigs.get(rig) else {
            return false;
        };
        for handle in handles {
            if let Some(collider) = self.colliders.get_mut(*handle) {
                collider.set_enabled(visible);
            }
        }
        true
    }

    pub fn rig_visible(&self, rig: &str) -> Option<bool> {
        let handles = self.rigs.get(rig)?;
        Some(
            handles
                .iter()
                .filter_map(|h| self.colliders.get(*h))
                .any(Collider::is_enabled),
        )
    }

    /// Every enabled collider not owned by `probe`.
    pub fn others_for(&self, probe: ProbeHandle) -> Vec<OtherCollider<'_>> {
        let own = ColliderOwner::Probe(probe);
        self.colliders
            .iter()
            .filter(|(_, collider)| collider.is_enabled())
            .filter_map(|(handle, collider)| {
                let owner = self.owners.get(&handle)?;
                (*owner != own).then_some(OtherCollider {
                    handle,
                    owner,
                    collider,
                })
            })
            .collect()
    }

    fn remove_collider(&mut self, handle: ColliderHandle) {
        self.owners.remove(&handle);
        self.colliders
            .remove(handle, &mut self.islands, &mut self.bodies, false);
    }
}
