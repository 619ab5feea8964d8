//! Scene synchronization properties over full reconcile/build/gesture flows.

use std::time::Duration;

use cardstock_core::{
    Color, Document, Element, ElementKind, History, QrPayloadKind, ShapeKind, TextStyle,
};
use cardstock_engine::{
    CompletionOutcome, GestureDelta, InteractionArbiter, PositionAuthority, SceneSync,
};
use cardstock_render::{BuildContext, FontStore, LocalAssets};

fn build_ctx<'a>(fonts: &'a FontStore, assets: &'a LocalAssets) -> BuildContext<'a> {
    BuildContext {
        assets,
        fonts,
        raster_scale: 1.0,
        max_texture_side: Some(2048),
    }
}

fn sync_with_zero_grace() -> SceneSync {
    SceneSync::new(InteractionArbiter::with_grace(Duration::ZERO))
}

fn circle(radius: f32) -> Element {
    Element::new(ElementKind::Shape(ShapeKind::Circle {
        radius,
        fill: Some(Color::rgb(40, 90, 200)),
        stroke: None,
        stroke_width: 0.0,
    }))
}

fn text(content: &str) -> Element {
    Element::new(ElementKind::Text {
        content: content.into(),
        font_family: "Inter".into(),
        font_size: 16,
        colors: vec![Color::BLACK],
        style: TextStyle::default(),
        field_id: None,
    })
}

fn image(width: u32, height: u32) -> Element {
    Element::new(ElementKind::Image {
        source: "/assets/photo.png".into(),
        source_width: width,
        source_height: height,
        scale_x: 1.0,
        scale_y: 1.0,
    })
}

fn qr(payload: &str) -> Element {
    Element::new(ElementKind::Qr {
        payload: payload.into(),
        payload_kind: QrPayloadKind::Url,
        dark: Color::BLACK,
        light: Color::WHITE,
        size: 80.0,
    })
}

#[tokio::test]
async fn reconcile_is_idempotent_on_unchanged_model() {
    let fonts = FontStore::new();
    let assets = LocalAssets;
    let ctx = build_ctx(&fonts, &assets);

    let mut doc = Document::new(350.0, 200.0);
    doc.push(circle(20.0));
    doc.push(qr("https://example.com"));
    doc.push(image(100, 50));
    let history = History::new(&doc);

    let mut sync = sync_with_zero_grace();
    let first = sync.reconcile(&doc, &history);
    assert_eq!(first.added.len(), 3);
    sync.run_builds(first.builds, &ctx).await;

    let order_after_build = sync.render_order().to_vec();
    let second = sync.reconcile(&doc, &history);
    assert!(second.is_clean(), "second pass must be a no-op: {second:?}");
    assert_eq!(sync.render_order(), order_after_build.as_slice());

    let third = sync.reconcile(&doc, &history);
    assert!(third.is_clean());
}

#[tokio::test]
async fn render_order_matches_any_model_permutation() {
    let fonts = FontStore::new();
    let assets = LocalAssets;
    let ctx = build_ctx(&fonts, &assets);

    let mut doc = Document::new(350.0, 200.0);
    let a = doc.push(circle(10.0));
    let b = doc.push(circle(20.0));
    let c = doc.push(circle(30.0));
    let d = doc.push(circle(40.0));
    let history = History::new(&doc);

    let mut sync = sync_with_zero_grace();
    let report = sync.reconcile(&doc, &history);
    sync.run_builds(report.builds, &ctx).await;

    for permutation in [[d, a, c, b], [b, d, a, c], [a, b, c, d]] {
        for (index, id) in permutation.iter().enumerate() {
            doc.move_to(*id, index).expect("move");
        }
        let report = sync.reconcile(&doc, &history);
        assert!(report.added.is_empty());
        assert!(report.removed.is_empty());
        assert_eq!(sync.render_order(), &permutation);
    }
}

#[tokio::test]
async fn reorder_scenario_touches_only_z_order() {
    let fonts = FontStore::new();
    let assets = LocalAssets;
    let ctx = build_ctx(&fonts, &assets);

    // Document: [text "A", circle r=50, image 200x100].
    let mut doc = Document::new(350.0, 200.0);
    let text_id = doc.push(text("A"));
    let circle_id = doc.push(circle(50.0));
    let image_id = doc.push(image(200, 100));
    let history = History::new(&doc);

    let mut sync = sync_with_zero_grace();
    let report = sync.reconcile(&doc, &history);
    sync.run_builds(report.builds, &ctx).await;

    // Reorder to [circle, text, image].
    doc.move_to(circle_id, 0).expect("move");
    let report = sync.reconcile(&doc, &history);

    assert!(report.added.is_empty(), "no additions expected");
    assert!(report.removed.is_empty(), "no removals expected");
    assert!(report.builds.is_empty(), "no rebuilds expected");
    assert!(report.reordered, "only a z-order change expected");
    assert_eq!(sync.render_order(), &[circle_id, text_id, image_id]);
}

#[tokio::test]
async fn gesture_holds_document_lock_through_grace_window() {
    let fonts = FontStore::new();
    let assets = LocalAssets;
    let ctx = build_ctx(&fonts, &assets);

    let mut doc = Document::new(350.0, 200.0);
    let target = doc.push(circle(25.0));
    let bystander = doc.push(circle(10.0));
    let history = History::new(&doc);

    // Long grace so the post-commit window is observable.
    let mut sync = SceneSync::new(InteractionArbiter::with_grace(Duration::from_secs(60)));
    let report = sync.reconcile(&doc, &history);
    sync.run_builds(report.builds, &ctx).await;

    sync.begin_gesture(target).expect("begin");
    sync.update_gesture(target, &GestureDelta {
        dx: 15.0,
        ..GestureDelta::default()
    })
    .expect("update");

    // A concurrent model mutation: the bystander is removed mid-gesture.
    doc.remove(bystander).expect("remove");

    // While interacting, reconciliation is suspended entirely.
    let during = sync.reconcile(&doc, &history);
    assert!(during.skipped);
    assert!(sync.registry().contains(bystander), "no removal mid-gesture");

    let commit = sync.end_gesture(target, &mut doc).expect("commit");
    assert_eq!(commit.patch.x, Some(15.0));

    // Still locked for the grace window after commit.
    let after_commit = sync.reconcile(&doc, &history);
    assert!(after_commit.skipped);
    assert!(sync.registry().contains(bystander));

    // Once the grace window elapses the deferred mutation lands.
    sync.arbiter_mut().force_release();
    let settled = sync.reconcile(&doc, &history);
    assert_eq!(settled.removed, vec![bystander]);
    assert!(!sync.registry().contains(bystander));
}

#[tokio::test]
async fn stale_completions_are_discarded_by_generation() {
    let fonts = FontStore::new();
    let assets = LocalAssets;
    let ctx = build_ctx(&fonts, &assets);

    let mut doc = Document::new(350.0, 200.0);
    let id = doc.push(qr("https://example.com/v1"));
    let history = History::new(&doc);

    let mut sync = sync_with_zero_grace();
    let first = sync.reconcile(&doc, &history);
    let stale_request = first.builds.into_iter().next().expect("build request");

    // Before the first build lands, a gesture resizes the code, scheduling a
    // fresh generation.
    sync.begin_gesture(id).expect("begin");
    sync.update_gesture(id, &GestureDelta {
        scale_x: 2.0,
        scale_y: 2.0,
        ..GestureDelta::default()
    })
    .expect("update");
    let commit = sync.end_gesture(id, &mut doc).expect("commit");
    let fresh_request = commit.build.expect("rebuild request");
    assert!(commit.patch.rebuild);

    // The old completion lands late and must be discarded.
    let stale_object = cardstock_render::build_object(
        &stale_request.element,
        &ctx,
        stale_request.generation,
    )
    .await;
    assert_eq!(
        sync.complete_build(stale_request.id, stale_request.generation, stale_object),
        CompletionOutcome::StaleGeneration
    );

    // The fresh completion applies.
    let fresh_object = cardstock_render::build_object(
        &fresh_request.element,
        &ctx,
        fresh_request.generation,
    )
    .await;
    assert_eq!(
        sync.complete_build(fresh_request.id, fresh_request.generation, fresh_object),
        CompletionOutcome::Applied
    );

    // Committed box is 160 after the 2x uniform scale.
    let entry = sync.registry().get(id).expect("entry");
    assert!((entry.object.width - 160.0).abs() < 0.001);
}

#[tokio::test]
async fn completion_for_removed_element_is_not_wanted() {
    let fonts = FontStore::new();
    let assets = LocalAssets;
    let ctx = build_ctx(&fonts, &assets);

    let mut doc = Document::new(350.0, 200.0);
    let id = doc.push(qr("https://example.com"));
    let history = History::new(&doc);

    let mut sync = sync_with_zero_grace();
    let report = sync.reconcile(&doc, &history);
    let request = report.builds.into_iter().next().expect("request");

    // Element removed while the build is in flight.
    doc.remove(id).expect("remove");
    sync.reconcile(&doc, &history);

    let object = cardstock_render::build_object(&request.element, &ctx, request.generation).await;
    assert_eq!(
        sync.complete_build(request.id, request.generation, object),
        CompletionOutcome::NotWanted
    );
    assert!(!sync.registry().contains(id));
}

#[tokio::test]
async fn undo_pass_forces_model_positions_onto_handles() {
    let fonts = FontStore::new();
    let assets = LocalAssets;
    let ctx = build_ctx(&fonts, &assets);

    let mut doc = Document::new(350.0, 200.0);
    let id = doc.push(circle(25.0).at(10.0, 10.0));
    let mut history = History::new(&doc);

    let mut sync = sync_with_zero_grace();
    let report = sync.reconcile(&doc, &history);
    sync.run_builds(report.builds, &ctx).await;

    // Drag to (40, 10) and commit.
    sync.begin_gesture(id).expect("begin");
    sync.update_gesture(id, &GestureDelta {
        dx: 30.0,
        ..GestureDelta::default()
    })
    .expect("update");
    sync.end_gesture(id, &mut doc).expect("commit");
    history.record(&doc);
    assert_eq!(doc.element(id).expect("element").x, 40.0);

    // Normal passes leave handle positions alone (render surface owns them).
    let steady = sync.reconcile(&doc, &history);
    assert_eq!(steady.authority, PositionAuthority::RenderSurface);

    // Undo: the model becomes authoritative for exactly one pass.
    let doc = history.undo().expect("undo");
    let undo_pass = sync.reconcile(&doc, &history);
    assert_eq!(undo_pass.authority, PositionAuthority::Model);
    assert_eq!(undo_pass.updated, vec![id]);
    let entry = sync.registry().get(id).expect("entry");
    assert!((entry.object.x - 10.0).abs() < f32::EPSILON);

    // The following pass reverts to render-surface authority.
    let next = sync.reconcile(&doc, &history);
    assert_eq!(next.authority, PositionAuthority::RenderSurface);
    assert!(next.is_clean());
}

#[tokio::test]
async fn text_scale_commit_rounds_font_size_and_rebuilds() {
    let fonts = FontStore::new();
    let assets = LocalAssets;
    let ctx = build_ctx(&fonts, &assets);

    let mut doc = Document::new(350.0, 200.0);
    let id = doc.push(text("Jane"));
    let history = History::new(&doc);

    let mut sync = sync_with_zero_grace();
    let report = sync.reconcile(&doc, &history);
    sync.run_builds(report.builds, &ctx).await;
    let revision_before = sync.registry().get(id).expect("entry").object.revision;

    sync.begin_gesture(id).expect("begin");
    sync.update_gesture(id, &GestureDelta {
        scale_y: 1.5,
        ..GestureDelta::default()
    })
    .expect("update");
    let commit = sync.end_gesture(id, &mut doc).expect("commit");

    assert_eq!(commit.patch.font_size, Some(24));
    let ElementKind::Text { font_size, .. } = &doc.element(id).expect("element").kind else {
        panic!("not text");
    };
    assert_eq!(*font_size, 24);

    // Transient scale is reset at commit.
    let entry = sync.registry().get(id).expect("entry");
    assert!((entry.object.scale_y - 1.0).abs() < f32::EPSILON);

    // The rebuild changes handle identity.
    let request = commit.build.expect("rebuild");
    let object = cardstock_render::build_object(&request.element, &ctx, request.generation).await;
    sync.complete_build(request.id, request.generation, object);
    let revision_after = sync.registry().get(id).expect("entry").object.revision;
    assert_ne!(revision_before, revision_after);
}

#[tokio::test]
async fn pending_create_prevents_duplicate_builds() {
    let mut doc = Document::new(350.0, 200.0);
    doc.push(qr("https://example.com"));
    let history = History::new(&doc);

    let mut sync = sync_with_zero_grace();
    let first = sync.reconcile(&doc, &history);
    assert_eq!(first.builds.len(), 1);

    // The build has not completed; repeated passes must not request again.
    let second = sync.reconcile(&doc, &history);
    assert!(second.builds.is_empty());
    assert!(second.added.is_empty());
}
