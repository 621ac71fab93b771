//! Mirroring demo.
//!
//! Without arguments, spins up the in-process stub world and mirrors it over
//! a loopback channel for a handful of cycles. Given an address, connects
//! over TCP and mirrors a live server until it hangs up:
//!
//! ```text
//! orrery_mirror                 # loopback demonstration
//! orrery_mirror 127.0.0.1:5555  # mirror an external server
//! ```

use anyhow::Context as _;
use orrery_mirror::stub;
use tracing::info;
use tracing_subscriber::{
    filter::filter_fn, filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
    Layer,
};

use orrery_client::transport::{ChannelPair, FramedTransport};
use orrery_client::{
    run_cycles, run_session, Session, SessionConfig, SessionError, SharedViewpoint, SpawnSignal,
    Viewpoint,
};
use orrery_protocol::template::unit_cube;
use orrery_protocol::{Template, TemplateId, CSHAPE_SPHERE};

/// Cycles the loopback demonstration runs before exiting.
const DEMO_CYCLES: u64 = 5;

fn init_logging() {
    #[cfg(debug_assertions)]
    let level = LevelFilter::DEBUG;

    #[cfg(not(debug_assertions))]
    let level = LevelFilter::INFO;

    let console_layer = fmt::Layer::default()
        .with_target(false)
        .with_filter(filter_fn(move |metadata| metadata.level() <= &level));

    tracing_subscriber::registry().with(console_layer).init();
}

/// Observer pose shared by both modes: standing at z = 10 looking down the
/// -z axis, which is where identity orientation points the launch.
fn observer() -> SharedViewpoint {
    SharedViewpoint::new(Viewpoint::new([0.0, 0.0, 10.0], [0.0, 0.0, 0.0, 1.0]))
}

/// Logs one line per mirrored object after each cycle.
fn print_scene(session: &Session) {
    info!(
        cycle = session.cycles_completed(),
        objects = session.cache().len(),
        "scene"
    );
    for (id, entry) in session.cache().iter() {
        let triangles = entry
            .mesh
            .as_ref()
            .map(|mesh| mesh.triangle_count())
            .unwrap_or(0);
        info!(
            object = %id,
            position = ?entry.state.position,
            triangles,
            "mirrored"
        );
    }
}

/// Mirrors the built-in stub world over an in-process channel.
async fn run_loopback() -> anyhow::Result<()> {
    info!("no address given, running the loopback demonstration");

    let mut world = stub::WorldStub::new();
    world.seed(
        TemplateId::from([9]),
        Template::new(CSHAPE_SPHERE, unit_cube()),
        3,
    );
    info!(objects = world.object_count(), "world seeded");

    let pair = ChannelPair::new();
    let server = tokio::spawn(stub::serve(world, pair.server));

    let signal = SpawnSignal::new();
    let launcher = signal.clone();
    let mut session = Session::new(SessionConfig::default(), signal, observer());
    let mut transport = pair.client;

    // Ask for a projectile every other cycle so the mirror has something
    // new to pick up.
    let on_render = move |session: &Session| {
        print_scene(session);
        if session.cycles_completed() % 2 == 1 {
            launcher.raise();
        }
    };

    run_cycles(&mut session, &mut transport, DEMO_CYCLES, on_render)
        .await
        .context("loopback session failed")?;

    info!(
        cycles = session.cycles_completed(),
        objects = session.cache().len(),
        "demonstration complete"
    );

    drop(transport);
    server.await.context("stub task failed")?;
    Ok(())
}

/// Mirrors a live server over TCP until the connection drops.
async fn run_tcp(addr: &str) -> anyhow::Result<()> {
    info!(%addr, "connecting");
    let mut transport = FramedTransport::connect(addr)
        .await
        .with_context(|| format!("connecting to {addr}"))?;

    let signal = SpawnSignal::new();
    let mut session = Session::new(SessionConfig::default(), signal, observer());

    match run_session(&mut session, &mut transport, print_scene).await {
        Ok(()) => Ok(()),
        Err(SessionError::ConnectionClosed) => {
            info!(
                cycles = session.cycles_completed(),
                "server closed the connection"
            );
            Ok(())
        }
        Err(err) => Err(err).context("session failed"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    match std::env::args().nth(1) {
        Some(addr) => run_tcp(&addr).await,
        None => run_loopback().await,
    }
}
