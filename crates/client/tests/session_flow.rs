//! Integration tests for the session state machine against scripted
//! responses:
//! - bootstrap order and first-cycle cache contents
//! - lazy template resolution and its memoization
//! - projectile launch, trigger consumption, tolerated rejections
//! - eviction of objects that stop appearing

use orrery_client::{Directive, Session, SessionConfig, SharedViewpoint, SpawnSignal, Viewpoint};
use orrery_protocol::commands::payloads;
use orrery_protocol::template::unit_cube;
use orrery_protocol::wire::{Request, Response};
use orrery_protocol::{ObjectId, Template, TemplateId, CSHAPE_SPHERE};
use serde_json::json;

fn fixture(config: SessionConfig) -> (Session, SpawnSignal, SharedViewpoint) {
    let signal = SpawnSignal::new();
    let viewpoint = SharedViewpoint::default();
    let session = Session::new(config, signal.clone(), viewpoint.clone());
    (session, signal, viewpoint)
}

/// Feeds `response` and expects the machine to hand out the named request.
fn expect_send(session: &mut Session, response: Option<Response>, cmd: &str) -> Request {
    match session.advance(response).expect("session advanced") {
        Directive::Send(request) => {
            assert_eq!(request.cmd, cmd, "unexpected operation order");
            request
        }
        other => panic!("expected '{cmd}' to go out, got {other:?}"),
    }
}

/// Feeds `response` and expects the cycle to end in a render yield.
fn expect_render(session: &mut Session, response: Option<Response>) {
    match session.advance(response).expect("session advanced") {
        Directive::Render => {}
        other => panic!("expected a render yield, got {other:?}"),
    }
}

/// Walks the fixed bootstrap exchange. Afterwards the first enumeration
/// request is in flight: the server assigned controller id 1.0.0 and avatar
/// id 2.0.0.
fn bootstrap(session: &mut Session) {
    expect_send(session, None, "ping");
    expect_send(session, Some(Response::ack()), "set_id");
    let identity = Response::success(json!({ "objID": [1, 0, 0] }));
    expect_send(session, Some(identity), "add_template");
    expect_send(session, Some(Response::ack()), "spawn");
    let avatar = Response::success(json!({ "objID": [2, 0, 0] }));
    expect_send(session, Some(avatar), "get_all_objids");
}

/// Completes one full cycle in which the server reports the avatar plus a
/// single foreign object 3.0.0 built from template 9, freshly resolved.
fn first_cycle(session: &mut Session) {
    let listing = Response::success(json!({ "objIDs": [[2, 0, 0], [3, 0, 0]] }));
    expect_send(session, Some(listing), "get_statevar");

    let states = Response::success(json!({
        "sv": [
            { "sv": { "position": [9.0, 9.0, 9.0] } },
            { "sv": { "position": [1.0, 2.0, 3.0] } },
        ]
    }));
    expect_send(session, Some(states), "get_template_id");

    let resolved = Response::success(json!({ "templateID": [9] }));
    expect_send(session, Some(resolved), "get_template");

    let template = Template::new(CSHAPE_SPHERE, unit_cube());
    let body = serde_json::to_value(&template).expect("template to json");
    expect_render(session, Some(Response::success(body)));
}

/// Closes the render yield of a finished cycle and feeds the position-hint
/// acknowledgement, leaving the next enumeration request in flight.
fn next_cycle(session: &mut Session) {
    expect_send(session, None, "suggest_pos");
    expect_send(session, Some(Response::ack()), "get_all_objids");
}

#[test]
fn bootstrap_and_first_cycle_fill_the_cache() {
    let (mut session, _signal, _viewpoint) = fixture(SessionConfig::default());
    bootstrap(&mut session);
    assert_eq!(session.self_id(), Some(&ObjectId::from([1, 0, 0])));
    assert_eq!(session.player_id(), Some(&ObjectId::from([2, 0, 0])));

    // The server reports our avatar plus one foreign object; states are
    // requested for the full enumeration, avatar included.
    let listing = Response::success(json!({ "objIDs": [[2, 0, 0], [3, 0, 0]] }));
    let request = expect_send(&mut session, Some(listing), "get_statevar");
    assert_eq!(request.payload, json!({ "objIDs": [[2, 0, 0], [3, 0, 0]] }));

    let states = Response::success(json!({
        "sv": [
            { "sv": { "position": [9.0, 9.0, 9.0] } },
            { "sv": { "position": [1.0, 2.0, 3.0] } },
        ]
    }));
    let request = expect_send(&mut session, Some(states), "get_template_id");
    assert_eq!(request.payload, json!({ "objID": [3, 0, 0] }));

    // The avatar never enters the cache. The foreign object is cached from
    // its very first sighting, before its template has resolved.
    assert_eq!(session.cache().len(), 1);
    assert!(!session.cache().contains(&ObjectId::from([2, 0, 0])));
    let entry = session
        .cache()
        .get(&ObjectId::from([3, 0, 0]))
        .expect("entry for 3.0.0");
    assert_eq!(entry.state.position, [1.0, 2.0, 3.0]);
    assert!(entry.template_id.is_none(), "template still unresolved");

    // Resolution finishes with the template body, then the cycle yields.
    let resolved = Response::success(json!({ "templateID": [9] }));
    let request = expect_send(&mut session, Some(resolved), "get_template");
    assert_eq!(request.payload, json!({ "templateID": [9] }));

    let template = Template::new(CSHAPE_SPHERE, unit_cube());
    let body = serde_json::to_value(&template).expect("template to json");
    expect_render(&mut session, Some(Response::success(body)));

    let entry = session
        .cache()
        .get(&ObjectId::from([3, 0, 0]))
        .expect("entry for 3.0.0");
    assert_eq!(entry.template_id, Some(TemplateId::from([9])));
    let mesh = entry.mesh.as_ref().expect("mesh compiled");
    assert_eq!(mesh.triangle_count(), 12);
    assert_eq!(session.cycles_completed(), 1);
}

#[test]
fn known_objects_cost_no_extra_round_trips() {
    let (mut session, _signal, _viewpoint) = fixture(SessionConfig::default());
    bootstrap(&mut session);
    first_cycle(&mut session);
    next_cycle(&mut session);

    // Same listing again: the cached object is updated in place and the
    // cycle ends with no resolution traffic at all.
    let listing = Response::success(json!({ "objIDs": [[2, 0, 0], [3, 0, 0]] }));
    expect_send(&mut session, Some(listing), "get_statevar");
    let states = Response::success(json!({
        "sv": [
            { "sv": { "position": [9.0, 9.0, 9.0] } },
            { "sv": { "position": [4.0, 5.0, 6.0] } },
        ]
    }));
    expect_render(&mut session, Some(states));

    let entry = session
        .cache()
        .get(&ObjectId::from([3, 0, 0]))
        .expect("entry for 3.0.0");
    assert_eq!(entry.state.position, [4.0, 5.0, 6.0]);
    assert_eq!(session.cycles_completed(), 2);
}

#[test]
fn known_templates_are_not_refetched() {
    let (mut session, _signal, _viewpoint) = fixture(SessionConfig::default());
    bootstrap(&mut session);
    first_cycle(&mut session);
    next_cycle(&mut session);

    // A new object spawned from the already-memoized template 9: one id
    // lookup, no template fetch.
    let listing = Response::success(json!({ "objIDs": [[2, 0, 0], [3, 0, 0], [4, 0, 0]] }));
    expect_send(&mut session, Some(listing), "get_statevar");
    let states = Response::success(json!({
        "sv": [
            { "sv": {} },
            { "sv": {} },
            { "sv": { "position": [7.0, 0.0, 0.0] } },
        ]
    }));
    let request = expect_send(&mut session, Some(states), "get_template_id");
    assert_eq!(request.payload, json!({ "objID": [4, 0, 0] }));

    let resolved = Response::success(json!({ "templateID": [9] }));
    expect_render(&mut session, Some(resolved));

    let entry = session
        .cache()
        .get(&ObjectId::from([4, 0, 0]))
        .expect("entry for 4.0.0");
    assert_eq!(entry.template_id, Some(TemplateId::from([9])));
    assert!(entry.mesh.is_some(), "mesh built from the memoized template");
}

#[test]
fn projectile_launch_consumes_the_trigger() {
    let (mut session, signal, viewpoint) = fixture(SessionConfig::default());
    viewpoint.set(Viewpoint::new([0.0, 0.0, 10.0], [0.0, 0.0, 0.0, 1.0]));
    bootstrap(&mut session);
    first_cycle(&mut session);
    next_cycle(&mut session);

    signal.raise();

    let listing = Response::success(json!({ "objIDs": [[2, 0, 0], [3, 0, 0]] }));
    expect_send(&mut session, Some(listing), "get_statevar");
    let states = Response::success(json!({
        "sv": [{ "sv": {} }, { "sv": {} }]
    }));
    let request = expect_send(&mut session, Some(states), "spawn");
    assert!(!signal.is_raised(), "the trigger is consumed by the launch");

    // Identity orientation faces +z, so the launch goes along -z from the
    // observer at (0, 0, 10).
    let spawn: payloads::Spawn =
        serde_json::from_value(request.payload).expect("spawn payload decodes");
    assert_eq!(spawn.template_id, TemplateId::from([1]));
    assert_eq!(spawn.sv.position, [0.0, 0.0, 8.0]);
    assert_eq!(spawn.sv.velocity_lin, [0.0, 0.0, -0.2]);
    assert_eq!(spawn.sv.scale, 0.25);
    assert_eq!(spawn.sv.radius, 0.25);
    assert_eq!(spawn.sv.imass, 20.0);

    let spawned = Response::success(json!({ "objID": [7, 0, 0] }));
    expect_render(&mut session, Some(spawned));

    // Without a fresh trigger the next cycle launches nothing.
    next_cycle(&mut session);
    let listing = Response::success(json!({ "objIDs": [[2, 0, 0], [3, 0, 0]] }));
    expect_send(&mut session, Some(listing), "get_statevar");
    let states = Response::success(json!({
        "sv": [{ "sv": {} }, { "sv": {} }]
    }));
    expect_render(&mut session, Some(states));
}

#[test]
fn rejected_projectile_does_not_end_the_session() {
    let (mut session, signal, _viewpoint) = fixture(SessionConfig::default());
    bootstrap(&mut session);
    first_cycle(&mut session);
    next_cycle(&mut session);

    signal.raise();
    let listing = Response::success(json!({ "objIDs": [[2, 0, 0], [3, 0, 0]] }));
    expect_send(&mut session, Some(listing), "get_statevar");
    let states = Response::success(json!({
        "sv": [{ "sv": {} }, { "sv": {} }]
    }));
    expect_send(&mut session, Some(states), "spawn");

    // The server refuses the spawn; the loop keeps going regardless.
    expect_render(&mut session, Some(Response::failure()));
    assert!(!session.has_failed());
    next_cycle(&mut session);
}

#[test]
fn rejected_enumeration_ends_the_session() {
    let (mut session, _signal, _viewpoint) = fixture(SessionConfig::default());
    bootstrap(&mut session);

    let err = session
        .advance(Some(Response::failure()))
        .expect_err("rejection of the listing is fatal");
    assert!(err.to_string().contains("get_all_objids"));
    assert!(session.has_failed());

    // A dead machine hands out nothing further.
    session
        .advance(None)
        .expect_err("no requests after a fatal error");
}

#[test]
fn objects_missing_repeatedly_are_evicted_when_configured() {
    let config = SessionConfig {
        evict_after_missing: Some(2),
        ..SessionConfig::default()
    };
    let (mut session, _signal, _viewpoint) = fixture(config);
    bootstrap(&mut session);
    first_cycle(&mut session);

    // Object 3.0.0 stops appearing. Two consecutive absences evict it.
    for _ in 0..2 {
        next_cycle(&mut session);
        let listing = Response::success(json!({ "objIDs": [[2, 0, 0]] }));
        expect_send(&mut session, Some(listing), "get_statevar");
        let states = Response::success(json!({ "sv": [{ "sv": {} }] }));
        expect_render(&mut session, Some(states));
    }
    assert!(!session.cache().contains(&ObjectId::from([3, 0, 0])));
    assert!(session.cache().is_empty());
}

#[test]
fn absent_objects_are_kept_forever_by_default() {
    let (mut session, _signal, _viewpoint) = fixture(SessionConfig::default());
    bootstrap(&mut session);
    first_cycle(&mut session);

    for _ in 0..5 {
        next_cycle(&mut session);
        let listing = Response::success(json!({ "objIDs": [[2, 0, 0]] }));
        expect_send(&mut session, Some(listing), "get_statevar");
        let states = Response::success(json!({ "sv": [{ "sv": {} }] }));
        expect_render(&mut session, Some(states));
    }
    assert!(session.cache().contains(&ObjectId::from([3, 0, 0])));
}
