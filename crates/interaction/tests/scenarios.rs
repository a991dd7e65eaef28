use glam::{Mat4, Vec3};
use xrinteract_core::{
    Handedness, InputSourceId, InputSourceInfo, ReferenceSpace, ReferenceSpaceKind, SelectPhase,
    SessionHandle, SpaceId, XrFrame,
};
use xrinteract_geometry::{Ray, RigidTransform, Shape};
use xrinteract_interaction::{Capabilities, InputSource, InteractionEngine};
use xrinteract_scene::{NodeDesc, NodeId, Scene};
use xrinteract_testkit::{recording_bundle, CallLog};

const CONTROLLER: InputSourceId = InputSourceId(7);
const CONTROLLER_SPACE: SpaceId = SpaceId(70);

fn cube(scene: &mut Scene, name: &str, x: f32) -> NodeId {
    scene
        .add(
            scene.root(),
            NodeDesc::new(name)
                .position(Vec3::new(x, 0.0, -3.0))
                .shape(Shape::unit_cube()),
        )
        .expect("root exists")
}

fn ray_at(x: f32) -> Ray {
    Ray::from_transform(&RigidTransform::from_translation(Vec3::new(x, 0.0, 0.0)))
}

fn hover_caps() -> Capabilities {
    Capabilities::HOVER_START | Capabilities::HOVER | Capabilities::HOVER_END
}

#[test]
fn hover_moves_to_node_without_callbacks_then_nothing() {
    let mut scene = Scene::new();
    let a = cube(&mut scene, "A", 0.0);
    let b = cube(&mut scene, "B", 3.0);
    let log = CallLog::new();
    let mut engine = InteractionEngine::new();
    engine
        .interactions_mut()
        .insert(a, Box::new(recording_bundle("A", &log, hover_caps())));

    let source = InputSource::Real(CONTROLLER);
    engine.update_input_source(source, Some(&ray_at(0.0)), &mut scene);
    assert_eq!(log.take_labels(), vec!["A.hover_start", "A.hover"]);

    engine.update_input_source(source, Some(&ray_at(3.0)), &mut scene);
    assert_eq!(log.take_labels(), vec!["A.hover_end"]);
    assert_eq!(engine.hovered(source), Some(b));

    engine.update_input_source(source, Some(&ray_at(20.0)), &mut scene);
    assert!(log.take_labels().is_empty());
    assert_eq!(engine.hovered(source), None);
}

#[test]
fn hover_end_fires_when_pointer_leaves_everything() {
    let mut scene = Scene::new();
    let a = cube(&mut scene, "A", 0.0);
    let log = CallLog::new();
    let mut engine = InteractionEngine::new();
    engine
        .interactions_mut()
        .insert(a, Box::new(recording_bundle("A", &log, hover_caps())));

    let source = InputSource::Pseudo;
    engine.update_input_source(source, Some(&ray_at(0.0)), &mut scene);
    engine.update_input_source(source, Some(&ray_at(0.1)), &mut scene);
    engine.update_input_source(source, Some(&ray_at(9.0)), &mut scene);
    assert_eq!(
        log.labels(),
        vec!["A.hover_start", "A.hover", "A.hover", "A.hover_end"]
    );
}

#[test]
fn pose_miss_leaves_hover_untouched() {
    let mut scene = Scene::new();
    let a = cube(&mut scene, "A", 0.0);
    let log = CallLog::new();
    let mut engine = InteractionEngine::new();
    engine
        .interactions_mut()
        .insert(a, Box::new(recording_bundle("A", &log, hover_caps())));

    let source = InputSource::Real(CONTROLLER);
    engine.update_input_source(source, Some(&ray_at(0.0)), &mut scene);
    log.clear();
    engine.update_input_source(source, None, &mut scene);
    assert!(log.labels().is_empty());
    assert_eq!(engine.hovered(source), Some(a));
}

#[test]
fn drag_only_node_follows_pointer_with_default_anchor() {
    let mut scene = Scene::new();
    let d = cube(&mut scene, "D", 0.0);
    let log = CallLog::new();
    let mut engine = InteractionEngine::new();
    engine
        .interactions_mut()
        .insert(d, Box::new(recording_bundle("D", &log, Capabilities::DRAG)));

    let source = InputSource::Real(CONTROLLER);
    let grab = ray_at(0.0);
    engine.select_start(source, Some(&grab), &mut scene);

    let drag = engine.drag_state(source).copied().expect("drag opened");
    assert_eq!(drag.node, d);
    assert!(drag.saved_auto_update);
    assert!(drag
        .anchor
        .abs_diff_eq(Mat4::from_translation(Vec3::new(0.0, 0.0, -3.0)), 1.0e-5));
    assert_eq!(scene.matrix_auto_update(d), Some(false));

    let moved = ray_at(1.0);
    engine.update_input_source(source, Some(&moved), &mut scene);
    let transforms = log.matrices("D.drag");
    assert_eq!(transforms.len(), 1);
    assert!(transforms[0].abs_diff_eq(moved.matrix * drag.anchor, 1.0e-5));
    let world = scene.world_matrix(d).expect("node alive");
    assert!(world
        .w_axis
        .truncate()
        .abs_diff_eq(Vec3::new(1.0, 0.0, -3.0), 1.0e-5));

    engine.select_end(source, Some(&moved), &mut scene);
    assert_eq!(scene.matrix_auto_update(d), Some(true));
    assert_eq!(engine.drag_count(), 0);
    assert_eq!(log.count("D.drag_end"), 0);
    assert_eq!(log.count("D.select_start"), 0);

    // Auto-update recomposes from the dragged placement, not the original one.
    scene.update_world_matrices();
    let world = scene.world_matrix(d).expect("node alive");
    assert!(world
        .w_axis
        .truncate()
        .abs_diff_eq(Vec3::new(1.0, 0.0, -3.0), 1.0e-5));
}

#[test]
fn drag_without_drag_callback_is_applied_by_engine() {
    let mut scene = Scene::new();
    let d = cube(&mut scene, "D", 0.0);
    let log = CallLog::new();
    let mut engine = InteractionEngine::new();
    engine.interactions_mut().insert(
        d,
        Box::new(recording_bundle(
            "D",
            &log,
            Capabilities::DRAG_START | Capabilities::DRAG_END,
        )),
    );

    let source = InputSource::Pseudo;
    engine.select_start(source, Some(&ray_at(0.0)), &mut scene);
    engine.update_input_source(source, Some(&ray_at(-2.0)), &mut scene);
    let world = scene.world_matrix(d).expect("node alive");
    assert!(world
        .w_axis
        .truncate()
        .abs_diff_eq(Vec3::new(-2.0, 0.0, -3.0), 1.0e-5));

    engine.select_end(source, None, &mut scene);
    assert_eq!(log.labels(), vec!["D.drag_start", "D.drag_end"]);
}

#[test]
fn second_select_start_does_not_open_second_drag() {
    let mut scene = Scene::new();
    let d = cube(&mut scene, "D", 0.0);
    let log = CallLog::new();
    let mut engine = InteractionEngine::new();
    engine.interactions_mut().insert(
        d,
        Box::new(recording_bundle("D", &log, Capabilities::ANY_DRAG)),
    );

    let source = InputSource::Real(CONTROLLER);
    engine.select_start(source, Some(&ray_at(0.0)), &mut scene);
    engine.select_start(source, Some(&ray_at(0.0)), &mut scene);
    assert_eq!(engine.drag_count(), 1);
    assert_eq!(log.count("D.drag_start"), 1);

    engine.select_end(source, Some(&ray_at(0.0)), &mut scene);
    assert_eq!(log.count("D.drag_end"), 1);
}

#[test]
fn drag_restores_suspended_auto_update_flag() {
    let mut scene = Scene::new();
    let d = cube(&mut scene, "D", 0.0);
    scene.set_matrix_auto_update(d, false).expect("node alive");
    let log = CallLog::new();
    let mut engine = InteractionEngine::new();
    engine
        .interactions_mut()
        .insert(d, Box::new(recording_bundle("D", &log, Capabilities::DRAG)));

    let source = InputSource::Pseudo;
    engine.select_start(source, Some(&ray_at(0.0)), &mut scene);
    assert!(!engine.drag_state(source).expect("drag").saved_auto_update);
    engine.select_end(source, None, &mut scene);
    assert_eq!(scene.matrix_auto_update(d), Some(false));
}

#[test]
fn two_sources_dragging_one_node_restore_the_original_flag() {
    let mut scene = Scene::new();
    let d = cube(&mut scene, "D", 0.0);
    let log = CallLog::new();
    let mut engine = InteractionEngine::new();
    engine
        .interactions_mut()
        .insert(d, Box::new(recording_bundle("D", &log, Capabilities::DRAG)));

    let first = InputSource::Real(CONTROLLER);
    let second = InputSource::Pseudo;
    engine.select_start(first, Some(&ray_at(0.0)), &mut scene);
    engine.select_start(second, Some(&ray_at(0.1)), &mut scene);
    assert_eq!(engine.drag_count(), 2);
    assert!(engine.drag_state(second).expect("second drag").saved_auto_update);

    engine.select_end(first, None, &mut scene);
    assert_eq!(scene.matrix_auto_update(d), Some(false));

    engine.select_end(second, None, &mut scene);
    assert_eq!(engine.drag_count(), 0);
    assert_eq!(scene.matrix_auto_update(d), Some(true));
}

#[test]
fn release_restores_pre_drag_flag_after_external_toggle() {
    let mut scene = Scene::new();
    let d = cube(&mut scene, "D", 0.0);
    let log = CallLog::new();
    let mut engine = InteractionEngine::new();
    engine
        .interactions_mut()
        .insert(d, Box::new(recording_bundle("D", &log, Capabilities::DRAG)));

    let source = InputSource::Pseudo;
    engine.select_start(source, Some(&ray_at(0.0)), &mut scene);
    scene.set_matrix_auto_update(d, true).expect("node alive");
    engine.update_input_source(source, Some(&ray_at(0.5)), &mut scene);
    scene.set_matrix_auto_update(d, false).expect("node alive");
    engine.select_end(source, Some(&ray_at(0.5)), &mut scene);

    assert_eq!(scene.matrix_auto_update(d), Some(true));
}

#[test]
fn drag_wins_over_select_callbacks() {
    let mut scene = Scene::new();
    let d = cube(&mut scene, "D", 0.0);
    let log = CallLog::new();
    let mut engine = InteractionEngine::new();
    engine.interactions_mut().insert(
        d,
        Box::new(recording_bundle(
            "D",
            &log,
            Capabilities::SELECT_START | Capabilities::SELECT_END | Capabilities::DRAG,
        )),
    );

    let source = InputSource::Pseudo;
    engine.select_start(source, Some(&ray_at(0.0)), &mut scene);
    assert_eq!(log.count("D.select_start"), 0);
    assert_eq!(engine.drag_count(), 1);

    // Release still reports select_end on whatever is under the pointer.
    engine.select_end(source, Some(&ray_at(0.0)), &mut scene);
    assert_eq!(log.labels(), vec!["D.select_end"]);
}

#[test]
fn click_select_reaches_only_the_nearest_node() {
    let mut scene = Scene::new();
    let near = cube(&mut scene, "near", 0.0);
    let far = scene
        .add(
            scene.root(),
            NodeDesc::new("far")
                .position(Vec3::new(0.0, 0.0, -8.0))
                .shape(Shape::unit_cube()),
        )
        .expect("root exists");
    let log = CallLog::new();
    let mut engine = InteractionEngine::new();
    let caps = Capabilities::SELECT_START | Capabilities::SELECT_END | Capabilities::SELECT;
    engine
        .interactions_mut()
        .insert(near, Box::new(recording_bundle("near", &log, caps)));
    engine
        .interactions_mut()
        .insert(far, Box::new(recording_bundle("far", &log, caps)));

    let source = InputSource::Real(CONTROLLER);
    for phase in [SelectPhase::Start, SelectPhase::End, SelectPhase::Click] {
        engine.handle_select(phase, source, Some(&ray_at(0.0)), &mut scene);
    }
    assert_eq!(
        log.labels(),
        vec!["near.select_start", "near.select_end", "near.select"]
    );
}

#[test]
fn close_ends_every_hover_exactly_once() {
    let mut scene = Scene::new();
    let a = cube(&mut scene, "A", 0.0);
    let b = cube(&mut scene, "B", 3.0);
    let log = CallLog::new();
    let mut engine = InteractionEngine::new();
    engine
        .interactions_mut()
        .insert(a, Box::new(recording_bundle("A", &log, hover_caps())));
    engine
        .interactions_mut()
        .insert(b, Box::new(recording_bundle("B", &log, hover_caps() | Capabilities::DRAG_END)));

    engine.update_input_source(InputSource::Real(CONTROLLER), Some(&ray_at(0.0)), &mut scene);
    engine.update_input_source(InputSource::Pseudo, Some(&ray_at(3.0)), &mut scene);
    engine.select_start(InputSource::Pseudo, Some(&ray_at(3.0)), &mut scene);
    assert_eq!(engine.drag_count(), 1);
    log.clear();

    engine.close(&mut scene);
    assert_eq!(log.count("A.hover_end"), 1);
    assert_eq!(log.count("B.hover_end"), 1);
    assert_eq!(log.count("B.drag_end"), 1);
    assert_eq!(engine.hover_count(), 0);
    assert_eq!(engine.drag_count(), 0);
    assert_eq!(scene.matrix_auto_update(b), Some(true));

    engine.close(&mut scene);
    assert_eq!(log.labels().len(), 3);
}

#[test]
fn frame_uses_pseudo_source_until_devices_appear() {
    let mut scene = Scene::new();
    let a = cube(&mut scene, "A", 0.0);
    let log = CallLog::new();
    let mut engine = InteractionEngine::new();
    engine
        .interactions_mut()
        .insert(a, Box::new(recording_bundle("A", &log, hover_caps())));
    let session = SessionHandle(1);
    engine.attach(session, Vec::new());

    let space = ReferenceSpace::new(SpaceId(1), ReferenceSpaceKind::Local);
    let frame = XrFrame::new();
    engine.handle_frame(&frame, Some(&space), &Mat4::IDENTITY, &mut scene);
    assert_eq!(engine.hovered(InputSource::Pseudo), Some(a));

    let controller = InputSourceInfo {
        id: CONTROLLER,
        handedness: Handedness::Right,
        target_ray_space: Some(CONTROLLER_SPACE),
    };
    engine.set_input_sources(vec![controller], &mut scene);
    assert_eq!(engine.hovered(InputSource::Pseudo), None);
    assert_eq!(log.count("A.hover_end"), 1);

    let frame = XrFrame::new().with_space_pose(
        CONTROLLER_SPACE,
        RigidTransform::from_translation(Vec3::new(0.2, 0.0, 0.0)),
    );
    engine.handle_frame(&frame, Some(&space), &Mat4::IDENTITY, &mut scene);
    assert_eq!(engine.hovered(InputSource::Real(CONTROLLER)), Some(a));
    assert_eq!(engine.hovered(InputSource::Pseudo), None);
}

#[test]
fn removed_source_releases_hover_and_drag() {
    let mut scene = Scene::new();
    let d = cube(&mut scene, "D", 0.0);
    let log = CallLog::new();
    let mut engine = InteractionEngine::new();
    engine.interactions_mut().insert(
        d,
        Box::new(recording_bundle("D", &log, hover_caps() | Capabilities::DRAG_END)),
    );
    let controller = InputSourceInfo {
        id: CONTROLLER,
        handedness: Handedness::Left,
        target_ray_space: Some(CONTROLLER_SPACE),
    };
    engine.attach(SessionHandle(1), vec![controller]);

    let source = InputSource::Real(CONTROLLER);
    engine.update_input_source(source, Some(&ray_at(0.0)), &mut scene);
    engine.select_start(source, Some(&ray_at(0.0)), &mut scene);
    engine.set_input_sources(Vec::new(), &mut scene);

    assert_eq!(engine.hover_count(), 0);
    assert_eq!(engine.drag_count(), 0);
    assert_eq!(log.count("D.hover_end"), 1);
    assert_eq!(log.count("D.drag_end"), 1);
}

#[test]
fn select_events_respect_attached_session_and_origin_offset() {
    let mut scene = Scene::new();
    let a = cube(&mut scene, "A", 0.0);
    let log = CallLog::new();
    let mut engine = InteractionEngine::new();
    engine
        .interactions_mut()
        .insert(a, Box::new(recording_bundle("A", &log, Capabilities::SELECT)));
    let controller = InputSourceInfo {
        id: CONTROLLER,
        handedness: Handedness::Right,
        target_ray_space: Some(CONTROLLER_SPACE),
    };
    let session = SessionHandle(3);
    engine.attach(session, vec![controller]);

    // Native pose points past the cube; the origin offset brings it back on target.
    let mut space = ReferenceSpace::new(SpaceId(1), ReferenceSpaceKind::Local);
    space.set_origin_offset(RigidTransform::from_translation(Vec3::new(4.0, 0.0, 0.0)));
    let frame = XrFrame::new().with_space_pose(
        CONTROLLER_SPACE,
        RigidTransform::from_translation(Vec3::new(4.0, 0.0, 0.0)),
    );

    engine.handle_select_event(
        SessionHandle(99),
        CONTROLLER,
        SelectPhase::Click,
        &frame,
        Some(&space),
        &mut scene,
    );
    assert!(log.labels().is_empty());

    engine.handle_select_event(session, CONTROLLER, SelectPhase::Click, &frame, Some(&space), &mut scene);
    assert_eq!(log.labels(), vec!["A.select"]);
}

#[test]
fn removed_node_ends_drag_quietly() {
    let mut scene = Scene::new();
    let d = cube(&mut scene, "D", 0.0);
    let log = CallLog::new();
    let mut engine = InteractionEngine::new();
    engine
        .interactions_mut()
        .insert(d, Box::new(recording_bundle("D", &log, Capabilities::DRAG)));

    let source = InputSource::Pseudo;
    engine.select_start(source, Some(&ray_at(0.0)), &mut scene);
    scene.remove(d).expect("node alive");
    engine.update_input_source(source, Some(&ray_at(1.0)), &mut scene);
    assert_eq!(engine.drag_count(), 0);
}
