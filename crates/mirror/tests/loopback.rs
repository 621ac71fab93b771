//! Full loopback runs: a real session mirroring the stub world.
//! - seeded objects end up in the cache with resolved meshes
//! - a raised spawn signal produces a projectile the mirror then picks up

use orrery_client::transport::ChannelPair;
use orrery_client::{
    run_cycles, Session, SessionConfig, SharedViewpoint, SpawnSignal, Viewpoint,
};
use orrery_mirror::stub::{serve, WorldStub};
use orrery_protocol::template::unit_cube;
use orrery_protocol::{ObjectId, Template, TemplateId, CSHAPE_SPHERE};

fn seeded_world(count: usize) -> WorldStub {
    let mut world = WorldStub::new();
    world.seed(
        TemplateId::from([9]),
        Template::new(CSHAPE_SPHERE, unit_cube()),
        count,
    );
    world
}

#[tokio::test]
async fn mirrors_the_seeded_world() {
    let pair = ChannelPair::new();
    let server = tokio::spawn(serve(seeded_world(3), pair.server));

    let mut session = Session::new(
        SessionConfig::default(),
        SpawnSignal::new(),
        SharedViewpoint::default(),
    );
    let mut transport = pair.client;
    run_cycles(&mut session, &mut transport, 2, |_session| {})
        .await
        .expect("loopback run completes");

    // Three seeded cubes, lined up 3 units apart; the avatar is excluded.
    assert_eq!(session.cache().len(), 3);
    for (i, raw) in [[1, 0, 0], [2, 0, 0], [3, 0, 0]].iter().enumerate() {
        let entry = session
            .cache()
            .get(&ObjectId::from(*raw))
            .expect("seeded object cached");
        assert_eq!(entry.state.position, [3.0 * i as f64, 0.0, 0.0]);
        assert_eq!(entry.template_id, Some(TemplateId::from([9])));
        let mesh = entry.mesh.as_ref().expect("mesh resolved");
        assert_eq!(mesh.triangle_count(), 12);
    }

    drop(transport);
    server.await.expect("stub task panicked");
}

#[tokio::test]
async fn a_launched_projectile_is_mirrored_back() {
    let pair = ChannelPair::new();
    let server = tokio::spawn(serve(seeded_world(1), pair.server));

    let signal = SpawnSignal::new();
    let viewpoint = SharedViewpoint::new(Viewpoint::new([0.0, 0.0, 4.0], [0.0, 0.0, 0.0, 1.0]));
    signal.raise();

    let mut session = Session::new(SessionConfig::default(), signal.clone(), viewpoint);
    let mut transport = pair.client;

    // Cycle 1 launches the projectile, cycle 2 sights it in the listing.
    run_cycles(&mut session, &mut transport, 2, |_session| {})
        .await
        .expect("loopback run completes");
    assert!(!signal.is_raised(), "the trigger was consumed");

    // Ids: seed takes 1, identity 2, avatar 3, projectile 4.
    let projectile = session
        .cache()
        .get(&ObjectId::from([4, 0, 0]))
        .expect("projectile mirrored");
    // Launched 2 units ahead along -z from the observer at z = 4.
    assert_eq!(projectile.state.position, [0.0, 0.0, 2.0]);
    assert_eq!(projectile.state.scale, 0.25);
    assert_eq!(projectile.state.imass, 20.0);
    // Spawned from the avatar template the session registered itself.
    assert_eq!(projectile.template_id, Some(TemplateId::from([1])));
    assert!(projectile.mesh.is_some());

    drop(transport);
    server.await.expect("stub task panicked");
}
