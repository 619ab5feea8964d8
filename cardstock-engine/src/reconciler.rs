//! The reconciliation engine.
//!
//! [`SceneSync`] diffs the canonical document against the render-object
//! registry once per model change: it schedules additions and atomic
//! rebuilds as async build requests, releases removed handles (deferring any
//! that are mid-gesture), rebuilds the render order in one pass when it
//! drifts from the model order, and arbitrates position authority between
//! the render surface and the model.
//!
//! A reconcile pass is synchronous and runs to completion; it never
//! suspends. Async builder results come back through [`SceneSync::complete_build`],
//! which re-validates the target against a generation stamp before swapping
//! the handle in.

use std::collections::HashSet;

use cardstock_core::{Document, Element, ElementId, History, ModelPatch};
use cardstock_render::builder::{
    apply_geometry_change, build_object, needs_rebuild, BuildContext,
};
use cardstock_render::RenderObject;
use tracing::debug;

use crate::arbiter::InteractionArbiter;
use crate::error::{EngineError, EngineResult};
use crate::registry::{RegistryEntry, RenderRegistry};

/// Which side is currently authoritative for element positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositionAuthority {
    /// Default: the render surface owns positions; the model is patched from
    /// gestures, never the reverse.
    #[default]
    RenderSurface,
    /// The pass immediately after an undo/redo: model positions are
    /// force-written onto the handles.
    Model,
}

/// An async build the host must run and feed back via `complete_build`.
///
/// The element snapshot is captured at request time, including the live
/// handle's placement for recreations, so completions apply placement from
/// call time, never from the handle at completion time.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Target element.
    pub id: ElementId,
    /// Generation stamp to echo back.
    pub generation: u64,
    /// Element snapshot to build from.
    pub element: Element,
}

/// Outcome of feeding a builder completion back into the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The handle was swapped in and z-order repaired.
    Applied,
    /// A newer build superseded this one; the result was discarded.
    StaleGeneration,
    /// The element is no longer in the model; the result was discarded.
    NotWanted,
    /// The element is mid-gesture; the result was discarded and the next
    /// pass will rebuild.
    MidGesture,
}

/// What one reconcile pass did.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// The pass was skipped because the document lock was held.
    pub skipped: bool,
    /// Newly registered (pending) elements.
    pub added: Vec<ElementId>,
    /// Released handles.
    pub removed: Vec<ElementId>,
    /// Handles whose properties were synced in place.
    pub updated: Vec<ElementId>,
    /// Handles scheduled for atomic recreation.
    pub rebuilt: Vec<ElementId>,
    /// Removals deferred because the element is mid-gesture.
    pub deferred: Vec<ElementId>,
    /// The render order was rebuilt.
    pub reordered: bool,
    /// Build requests for the host to run.
    pub builds: Vec<BuildRequest>,
    /// Authority used for this pass.
    pub authority: PositionAuthority,
}

impl ReconcileReport {
    /// Whether the pass observed a fully converged scene: nothing added,
    /// removed, updated, rebuilt, reordered, or pending.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        !self.skipped
            && self.added.is_empty()
            && self.removed.is_empty()
            && self.updated.is_empty()
            && self.rebuilt.is_empty()
            && self.deferred.is_empty()
            && !self.reordered
            && self.builds.is_empty()
    }
}

/// Incremental gesture geometry, applied to the live handle only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureDelta {
    /// Horizontal translation.
    pub dx: f32,
    /// Vertical translation.
    pub dy: f32,
    /// Horizontal scale factor.
    pub scale_x: f32,
    /// Vertical scale factor.
    pub scale_y: f32,
    /// Rotation in degrees.
    pub rotate: f32,
}

impl Default for GestureDelta {
    fn default() -> Self {
        Self {
            dx: 0.0,
            dy: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            rotate: 0.0,
        }
    }
}

/// Result of committing a gesture.
#[derive(Debug)]
pub struct GestureCommit {
    /// The model writes that were applied.
    pub patch: ModelPatch,
    /// A rebuild request when the commit changed the handle identity.
    pub build: Option<BuildRequest>,
}

/// The scene synchronization engine.
#[derive(Debug)]
pub struct SceneSync {
    registry: RenderRegistry,
    arbiter: InteractionArbiter,
    last_marker: u64,
    desired_order: Vec<ElementId>,
    deferred_removals: HashSet<ElementId>,
    build_seq: u64,
}

impl SceneSync {
    /// Create an engine with the given arbiter.
    #[must_use]
    pub fn new(arbiter: InteractionArbiter) -> Self {
        Self {
            registry: RenderRegistry::new(),
            arbiter,
            last_marker: 0,
            desired_order: Vec::new(),
            deferred_removals: HashSet::new(),
            build_seq: 0,
        }
    }

    /// The registry of live handles.
    #[must_use]
    pub fn registry(&self) -> &RenderRegistry {
        &self.registry
    }

    /// The interaction arbiter.
    pub fn arbiter_mut(&mut self) -> &mut InteractionArbiter {
        &mut self.arbiter
    }

    /// Current render order, bottom first.
    #[must_use]
    pub fn render_order(&self) -> &[ElementId] {
        self.registry.order()
    }

    /// Run one reconciliation pass.
    ///
    /// Short-circuits immediately while the document lock is held. Missing
    /// handles are skipped silently and retried on the next pass.
    pub fn reconcile(&mut self, doc: &Document, history: &History) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        if self.arbiter.document_locked() {
            debug!("reconcile skipped: document locked");
            report.skipped = true;
            return report;
        }

        let marker = history.marker();
        report.authority = if marker > self.last_marker {
            PositionAuthority::Model
        } else {
            PositionAuthority::RenderSurface
        };
        self.last_marker = marker;

        let model_ids = doc.ids();
        self.desired_order.clone_from(&model_ids);
        let model_set: HashSet<ElementId> = model_ids.iter().copied().collect();

        // 1. Removals. Never delete mid-gesture; defer instead.
        for id in self.registry.ids() {
            if model_set.contains(&id) {
                continue;
            }
            if self.arbiter.is_interacting(id) {
                self.deferred_removals.insert(id);
                report.deferred.push(id);
            } else {
                self.registry.release(id);
                self.deferred_removals.remove(&id);
                report.removed.push(id);
            }
        }

        // 2. Kept elements and additions.
        for element in doc.elements() {
            let id = element.id;
            if !self.registry.contains(id) {
                // Addition: register a pending placeholder immediately so
                // subsequent passes cannot trigger a duplicate build.
                let generation = self.next_generation();
                self.registry.register(
                    id,
                    RegistryEntry {
                        object: pending_object(element, generation),
                        pending_create: true,
                        generation,
                    },
                );
                report.added.push(id);
                report.builds.push(BuildRequest {
                    id,
                    generation,
                    element: element.clone(),
                });
                continue;
            }

            if self.registry.is_pending(id) || self.arbiter.is_interacting(id) || element.locked {
                continue;
            }

            let rebuild = {
                let Some(entry) = self.registry.get(id) else {
                    continue;
                };
                needs_rebuild(element, &entry.object)
            };

            if rebuild {
                let generation = self.next_generation();
                let Some(entry) = self.registry.get_mut(id) else {
                    continue;
                };
                // Atomic recreate: the old object stays visible until the
                // completion swaps the new one in.
                entry.pending_create = true;
                entry.generation = generation;

                let mut snapshot = element.clone();
                if report.authority == PositionAuthority::RenderSurface {
                    // Placement captured from the live handle at call time.
                    snapshot.x = entry.object.x;
                    snapshot.y = entry.object.y;
                    snapshot.rotation = entry.object.rotation;
                }
                report.rebuilt.push(id);
                report.builds.push(BuildRequest {
                    id,
                    generation,
                    element: snapshot,
                });
                continue;
            }

            let Some(entry) = self.registry.get_mut(id) else {
                continue;
            };
            let object = &mut entry.object;
            let mut touched = false;
            if (object.opacity - element.opacity).abs() > f32::EPSILON {
                object.opacity = element.opacity;
                touched = true;
            }
            if report.authority == PositionAuthority::Model
                && ((object.x - element.x).abs() > f32::EPSILON
                    || (object.y - element.y).abs() > f32::EPSILON
                    || (object.rotation - element.rotation).abs() > f32::EPSILON)
            {
                object.x = element.x;
                object.y = element.y;
                object.rotation = element.rotation;
                touched = true;
            }
            if touched {
                report.updated.push(id);
            }
        }

        // 3. Z-order: rebuild in one atomic pass when it differs.
        let expected = self.expected_order(&model_ids);
        if expected != self.registry.order() {
            self.registry.set_order(&model_ids);
            report.reordered = true;
        }

        report
    }

    /// Feed an async builder completion back into the engine.
    ///
    /// The result is discarded unless the id is still wanted, the generation
    /// is still current, and the element is not mid-gesture. Applying a
    /// completion repairs z-order, because the creation may have become
    /// stale by completion time.
    pub fn complete_build(
        &mut self,
        id: ElementId,
        generation: u64,
        object: RenderObject,
    ) -> CompletionOutcome {
        if !self.desired_order.contains(&id) {
            // Removed from the model while the build was in flight.
            self.registry.release(id);
            debug!(element = %id, "discarding completion for removed element");
            return CompletionOutcome::NotWanted;
        }
        let Some(entry) = self.registry.get_mut(id) else {
            return CompletionOutcome::NotWanted;
        };
        if entry.generation != generation {
            debug!(element = %id, generation, current = entry.generation, "discarding stale completion");
            return CompletionOutcome::StaleGeneration;
        }
        if self.arbiter.is_interacting(id) {
            // Never swap a handle out from under a gesture; the next pass
            // after commit rebuilds from settled state.
            entry.pending_create = false;
            return CompletionOutcome::MidGesture;
        }
        entry.object = object;
        entry.pending_create = false;

        self.registry.set_order(&self.desired_order);
        CompletionOutcome::Applied
    }

    /// Run a batch of build requests sequentially and complete each one.
    ///
    /// Convenience driver for hosts and tests; real surfaces may run
    /// requests concurrently and complete them in any order.
    pub async fn run_builds(
        &mut self,
        requests: Vec<BuildRequest>,
        ctx: &BuildContext<'_>,
    ) -> Vec<(ElementId, CompletionOutcome)> {
        let mut outcomes = Vec::with_capacity(requests.len());
        for request in requests {
            let object = build_object(&request.element, ctx, request.generation).await;
            outcomes.push((
                request.id,
                self.complete_build(request.id, request.generation, object),
            ));
        }
        outcomes
    }

    // -----------------------------------------------------------------------
    // Gestures
    // -----------------------------------------------------------------------

    /// Begin a gesture on an element.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::HandleMissing`] if no handle exists, or
    /// [`EngineError::GestureInProgress`] if another gesture is active.
    pub fn begin_gesture(&mut self, id: ElementId) -> EngineResult<()> {
        if !self.registry.contains(id) {
            return Err(EngineError::HandleMissing(id));
        }
        self.arbiter.begin(id)
    }

    /// Apply an incremental delta to the live handle. Transient only: the
    /// model is untouched until the gesture commits.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoActiveGesture`] if the element is not
    /// interacting, or [`EngineError::HandleMissing`] if the handle vanished.
    pub fn update_gesture(&mut self, id: ElementId, delta: &GestureDelta) -> EngineResult<()> {
        if !self.arbiter.is_interacting(id) {
            return Err(EngineError::NoActiveGesture(id));
        }
        let entry = self
            .registry
            .get_mut(id)
            .ok_or(EngineError::HandleMissing(id))?;
        let object = &mut entry.object;
        object.x += delta.dx;
        object.y += delta.dy;
        object.scale_x *= delta.scale_x;
        object.scale_y *= delta.scale_y;
        object.rotation += delta.rotate;
        Ok(())
    }

    /// Commit a gesture: translate the handle's transient geometry into a
    /// model patch via the type builders, apply it, and reset the transient
    /// scale to 1.
    ///
    /// When the committed patch demands a rebuild (multi-color text, font
    /// size change, QR resize), the returned [`GestureCommit::build`] carries
    /// the recreation request; the transient scale is force-reset either way,
    /// so a racing font-size edit wins deterministically.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NoActiveGesture`] if the element is not
    /// interacting, [`EngineError::HandleMissing`] if the handle vanished,
    /// or a model error if the patch cannot apply.
    pub fn end_gesture(&mut self, id: ElementId, doc: &mut Document) -> EngineResult<GestureCommit> {
        if !self.arbiter.is_interacting(id) {
            return Err(EngineError::NoActiveGesture(id));
        }
        let element = doc
            .element(id)
            .ok_or_else(|| cardstock_core::CoreError::ElementNotFound(id.to_string()))?
            .clone();
        let patch = {
            let entry = self
                .registry
                .get_mut(id)
                .ok_or(EngineError::HandleMissing(id))?;
            apply_geometry_change(&element, &entry.object)
        };

        if let Some(target) = doc.element_mut(id) {
            patch.apply_to(target)?;
        }

        let build = {
            let committed = doc.element(id).cloned();
            let entry = self
                .registry
                .get_mut(id)
                .ok_or(EngineError::HandleMissing(id))?;
            // Scale is always force-reset after commit.
            entry.object.scale_x = 1.0;
            entry.object.scale_y = 1.0;
            if let Some((w, h)) = committed.as_ref().and_then(Element::size) {
                entry.object.width = w;
                entry.object.height = h;
            }

            if patch.rebuild {
                let generation = self.next_generation();
                let entry = self
                    .registry
                    .get_mut(id)
                    .ok_or(EngineError::HandleMissing(id))?;
                entry.pending_create = true;
                entry.generation = generation;
                committed.map(|mut snapshot| {
                    snapshot.x = entry.object.x;
                    snapshot.y = entry.object.y;
                    snapshot.rotation = entry.object.rotation;
                    BuildRequest {
                        id,
                        generation,
                        element: snapshot,
                    }
                })
            } else {
                None
            }
        };

        self.arbiter.end(id)?;
        Ok(GestureCommit { patch, build })
    }

    fn next_generation(&mut self) -> u64 {
        self.build_seq += 1;
        self.build_seq
    }

    /// What `set_order` would produce for the given model order.
    fn expected_order(&self, model_ids: &[ElementId]) -> Vec<ElementId> {
        let mut next: Vec<ElementId> = model_ids
            .iter()
            .copied()
            .filter(|id| self.registry.contains(*id))
            .collect();
        for id in self.registry.order() {
            if !next.contains(id) {
                next.push(*id);
            }
        }
        next
    }
}

/// Placeholder registered for an addition until its async build completes.
fn pending_object(element: &Element, generation: u64) -> RenderObject {
    let (width, height) = element.size().unwrap_or((0.0, 0.0));
    RenderObject {
        id: element.id,
        x: element.x,
        y: element.y,
        rotation: element.rotation,
        opacity: element.opacity,
        scale_x: 1.0,
        scale_y: 1.0,
        width,
        height,
        built_kind: element.kind.clone(),
        intrinsic: None,
        raster: None,
        raster_scale: 1.0,
        placeholder: false,
        revision: generation,
    }
}
