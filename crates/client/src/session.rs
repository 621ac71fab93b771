//! The session state machine.
//!
//! A [`Session`] owns every decision of the mirroring protocol but performs
//! no IO. It is driven by repeated calls to [`Session::advance`]: the caller
//! passes in the response to the previously-issued request (or `None` when
//! nothing is pending) and receives the next [`Directive`] back. Because the
//! machine hands out at most one request per call and refuses to move until
//! that request's response comes back, the one-request-in-flight rule of the
//! wire protocol holds by construction.
//!
//! The shape of one steady-state cycle:
//!
//! 1. enumerate all object ids
//! 2. fetch the state vector for the whole list
//! 3. reconcile the cache, resolving templates for newly-sighted objects
//! 4. launch a projectile if the user asked for one
//! 5. yield [`Directive::Render`]
//! 6. hint the avatar position back to the server
//!
//! Any decode failure or rejection outside the tolerated spots (template
//! registration, projectile spawn, position hint) ends the session with an
//! error, after which further calls to `advance` are refused.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, info, warn};

use orrery_protocol::commands::{
    self, Ack, Command, IdentityReply, ObjectListReply, SpawnReply, StateVariablesReply,
    TemplateIdReply,
};
use orrery_protocol::wire::{Request, Response};
use orrery_protocol::{ObjectId, Template, TemplateId};

use crate::cache::ObjectCache;
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::mesh::Mesh;
use crate::signal::SpawnSignal;
use crate::view::SharedViewpoint;

/// What the caller must do before resuming the machine.
#[derive(Debug)]
pub enum Directive {
    /// Encode and send this request, then resume with its response.
    Send(Request),
    /// One cycle is complete; present the cache, then resume with `None`.
    Render,
}

/// Where the machine currently stands. Every awaiting variant stores the
/// typed decoder of the single request that is in flight.
enum Phase {
    /// Nothing sent yet; the first resumption opens the handshake.
    Start,
    Ping(Command<Ack>),
    Identify(Command<IdentityReply>),
    RegisterTemplate(Command<Ack>),
    SpawnSelf(Command<SpawnReply>),
    Enumerate(Command<ObjectListReply>),
    FetchStates {
        cmd: Command<StateVariablesReply>,
        requested: Vec<ObjectId>,
    },
    ResolveTemplateId {
        cmd: Command<TemplateIdReply>,
        object: ObjectId,
    },
    FetchTemplate {
        cmd: Command<Template>,
        template_id: TemplateId,
    },
    SpawnProjectile(Command<SpawnReply>),
    SuggestPosition(Command<Ack>),
    /// Yielded to the presentation side; the next resumption closes the
    /// cycle.
    Rendering,
    /// Terminal. Entered on any fatal error.
    Failed,
}

/// The client-side mirror of one server connection.
pub struct Session {
    config: SessionConfig,
    phase: Phase,
    cache: ObjectCache,
    /// Template geometry, fetched at most once per template id.
    templates: HashMap<TemplateId, Template>,
    /// Newly-sighted objects still waiting for template resolution. The
    /// front element is the one any in-flight lookup belongs to.
    pending: VecDeque<ObjectId>,
    /// Ids sighted in the current enumeration; feeds eviction bookkeeping.
    seen: HashSet<ObjectId>,
    spawn_signal: SpawnSignal,
    viewpoint: SharedViewpoint,
    /// Controller id handed out by the server during the handshake.
    self_id: Option<ObjectId>,
    /// Object id of our own avatar; excluded from cache reconciliation.
    player_id: Option<ObjectId>,
    cycles_completed: u64,
}

impl Session {
    pub fn new(config: SessionConfig, spawn_signal: SpawnSignal, viewpoint: SharedViewpoint) -> Self {
        Self {
            config,
            phase: Phase::Start,
            cache: ObjectCache::new(),
            templates: HashMap::new(),
            pending: VecDeque::new(),
            seen: HashSet::new(),
            spawn_signal,
            viewpoint,
            self_id: None,
            player_id: None,
            cycles_completed: 0,
        }
    }

    /// The local record of every object the server has shown us.
    pub fn cache(&self) -> &ObjectCache {
        &self.cache
    }

    pub fn self_id(&self) -> Option<&ObjectId> {
        self.self_id.as_ref()
    }

    pub fn player_id(&self) -> Option<&ObjectId> {
        self.player_id.as_ref()
    }

    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed
    }

    pub fn has_failed(&self) -> bool {
        matches!(self.phase, Phase::Failed)
    }

    /// Feeds the machine the response to its outstanding request (or `None`
    /// when none is outstanding) and returns the next directive.
    ///
    /// Passing a response when none is expected, or omitting one when it is,
    /// yields [`SessionError::OutOfStep`]. After any error the session is
    /// dead and every further call fails.
    pub fn advance(&mut self, response: Option<Response>) -> Result<Directive, SessionError> {
        let phase = std::mem::replace(&mut self.phase, Phase::Failed);
        self.step(phase, response)
    }

    fn step(&mut self, phase: Phase, response: Option<Response>) -> Result<Directive, SessionError> {
        match phase {
            Phase::Start => {
                expect_no_response(&response)?;
                info!("starting mirror session");
                self.issue_ping()
            }
            Phase::Ping(cmd) => {
                cmd.decode(expect_response(response)?)?;
                debug!("server answered ping");
                self.issue_identify()
            }
            Phase::Identify(cmd) => {
                let reply = cmd.decode(expect_response(response)?)?;
                info!(controller = %reply.obj_id, "identity assigned");
                self.self_id = Some(reply.obj_id);
                self.issue_register_template()
            }
            Phase::RegisterTemplate(cmd) => {
                match cmd.decode(expect_response(response)?) {
                    Ok(Ack) => {
                        debug!(template = %self.config.bootstrap_template, "avatar template registered");
                    }
                    Err(err) if err.is_rejection() => {
                        // A previous session most likely registered the same
                        // id already; the spawn below will tell us if the
                        // template is genuinely unusable.
                        warn!(
                            template = %self.config.bootstrap_template,
                            "avatar template rejected, continuing"
                        );
                    }
                    Err(err) => return Err(err.into()),
                }
                self.issue_spawn_self()
            }
            Phase::SpawnSelf(cmd) => {
                let reply = cmd.decode(expect_response(response)?)?;
                info!(avatar = %reply.obj_id, "avatar spawned");
                self.player_id = Some(reply.obj_id);
                self.issue_enumerate()
            }
            Phase::Enumerate(cmd) => {
                let reply = cmd.decode(expect_response(response)?)?;
                self.issue_fetch_states(reply.obj_ids)
            }
            Phase::FetchStates { cmd, requested } => {
                let reply = cmd.decode(expect_response(response)?)?;
                self.ingest_states(requested, reply);
                self.continue_reconcile()
            }
            Phase::ResolveTemplateId { cmd, object } => {
                let reply = cmd.decode(expect_response(response)?)?;
                debug!(object = %object, template = %reply.template_id, "template id resolved");
                self.cache.set_template_id(&object, reply.template_id);
                self.continue_reconcile()
            }
            Phase::FetchTemplate { cmd, template_id } => {
                let template = cmd.decode(expect_response(response)?)?;
                debug!(
                    template = %template_id,
                    triangles = template.triangle_count(),
                    "template fetched"
                );
                self.templates.insert(template_id, template);
                self.continue_reconcile()
            }
            Phase::SpawnProjectile(cmd) => {
                match cmd.decode(expect_response(response)?) {
                    Ok(reply) => info!(object = %reply.obj_id, "projectile spawned"),
                    Err(err) if err.is_rejection() => warn!("projectile spawn rejected"),
                    Err(err) => return Err(err.into()),
                }
                self.finish_cycle()
            }
            Phase::SuggestPosition(cmd) => {
                match cmd.decode(expect_response(response)?) {
                    Ok(Ack) => {}
                    Err(err) if err.is_rejection() => warn!("position hint rejected"),
                    Err(err) => return Err(err.into()),
                }
                self.issue_enumerate()
            }
            Phase::Rendering => {
                expect_no_response(&response)?;
                self.issue_suggest_position()
            }
            Phase::Failed => Err(SessionError::OutOfStep("session already ended")),
        }
    }

    /* --- handshake and bootstrap ------------------------------------- */

    fn issue_ping(&mut self) -> Result<Directive, SessionError> {
        let cmd = commands::ping();
        let request = cmd.request().clone();
        self.phase = Phase::Ping(cmd);
        Ok(Directive::Send(request))
    }

    fn issue_identify(&mut self) -> Result<Directive, SessionError> {
        let cmd = commands::set_identity(None);
        let request = cmd.request().clone();
        self.phase = Phase::Identify(cmd);
        Ok(Directive::Send(request))
    }

    fn issue_register_template(&mut self) -> Result<Directive, SessionError> {
        let template = Template::controller_avatar();
        let cmd = commands::add_template(
            self.config.bootstrap_template.clone(),
            template.cshape,
            template.geometry,
        );
        let request = cmd.request().clone();
        self.phase = Phase::RegisterTemplate(cmd);
        Ok(Directive::Send(request))
    }

    fn issue_spawn_self(&mut self) -> Result<Directive, SessionError> {
        let position = self.viewpoint.get().position;
        let cmd = commands::spawn(
            self.config.bootstrap_template.clone(),
            position,
            [0.0; 3],
            [0.0, 0.0, 0.0, 1.0],
            1.0,
            1.0,
        );
        let request = cmd.request().clone();
        self.phase = Phase::SpawnSelf(cmd);
        Ok(Directive::Send(request))
    }

    /* --- the steady-state cycle --------------------------------------- */

    fn issue_enumerate(&mut self) -> Result<Directive, SessionError> {
        let cmd = commands::list_object_ids();
        let request = cmd.request().clone();
        self.phase = Phase::Enumerate(cmd);
        Ok(Directive::Send(request))
    }

    fn issue_fetch_states(&mut self, ids: Vec<ObjectId>) -> Result<Directive, SessionError> {
        let cmd = commands::get_state_variables(ids.clone());
        let request = cmd.request().clone();
        self.phase = Phase::FetchStates {
            cmd,
            requested: ids,
        };
        Ok(Directive::Send(request))
    }

    /// Folds one state-vector reply into the cache. The reply entries are
    /// positionally parallel to the requested ids. Our own avatar is
    /// skipped; everything else is either updated in place or queued for
    /// template resolution.
    fn ingest_states(&mut self, requested: Vec<ObjectId>, reply: StateVariablesReply) {
        if reply.entries.len() != requested.len() {
            warn!(
                requested = requested.len(),
                received = reply.entries.len(),
                "state reply length mismatch"
            );
        }
        self.seen.clear();
        for (id, entry) in requested.into_iter().zip(reply.entries) {
            if self.player_id.as_ref() == Some(&id) {
                continue;
            }
            self.seen.insert(id.clone());
            if self.cache.contains(&id) {
                self.cache.update_state(&id, entry.sv);
            } else {
                self.cache.insert_sighted(id.clone(), entry.sv);
                self.pending.push_back(id);
            }
        }
    }

    /// Works through the resolution queue. Each queued object needs its
    /// template id and, unless memoized, the template body; as soon as one
    /// of those is missing a lookup goes out and the object stays at the
    /// front of the queue. Once the queue drains the cycle moves on.
    fn continue_reconcile(&mut self) -> Result<Directive, SessionError> {
        while let Some(id) = self.pending.pop_front() {
            let Some(entry) = self.cache.get(&id) else {
                // Evicted between sighting and resolution; nothing to do.
                continue;
            };
            let template_id = entry.template_id.clone();
            let scale = entry.state.scale;
            match template_id {
                None => {
                    let cmd = commands::get_template_id_of(id.clone());
                    let request = cmd.request().clone();
                    self.pending.push_front(id.clone());
                    self.phase = Phase::ResolveTemplateId { cmd, object: id };
                    return Ok(Directive::Send(request));
                }
                Some(template_id) => match self.templates.get(&template_id) {
                    Some(template) => {
                        let mesh = Mesh::compile(&template.geometry, scale);
                        self.cache.set_mesh(&id, mesh);
                    }
                    None => {
                        let cmd = commands::get_template(template_id.clone());
                        let request = cmd.request().clone();
                        self.pending.push_front(id);
                        self.phase = Phase::FetchTemplate { cmd, template_id };
                        return Ok(Directive::Send(request));
                    }
                },
            }
        }
        self.close_reconcile()
    }

    /// Reconciliation is done: settle eviction bookkeeping, then either
    /// launch the requested projectile or go straight to rendering.
    fn close_reconcile(&mut self) -> Result<Directive, SessionError> {
        let seen = std::mem::take(&mut self.seen);
        let evicted = self.cache.finish_cycle(&seen, self.config.evict_after_missing);
        if !evicted.is_empty() {
            debug!(count = evicted.len(), "objects evicted");
        }

        // At most one launch per cycle; the trigger is consumed no matter
        // how the spawn turns out.
        if self.spawn_signal.take() {
            let viewpoint = self.viewpoint.get();
            let (position, velocity) = viewpoint
                .launch_pose(self.config.spawn_offset, self.config.spawn_speed);
            let cmd = commands::spawn(
                self.config.bootstrap_template.clone(),
                position,
                velocity,
                [0.0, 0.0, 0.0, 1.0],
                self.config.spawn_scale,
                self.config.spawn_imass,
            );
            let request = cmd.request().clone();
            self.phase = Phase::SpawnProjectile(cmd);
            return Ok(Directive::Send(request));
        }
        self.finish_cycle()
    }

    fn finish_cycle(&mut self) -> Result<Directive, SessionError> {
        self.cycles_completed += 1;
        self.phase = Phase::Rendering;
        Ok(Directive::Render)
    }

    fn issue_suggest_position(&mut self) -> Result<Directive, SessionError> {
        let Some(player) = self.player_id.clone() else {
            return Err(SessionError::OutOfStep("no avatar to hint for"));
        };
        let position = self.viewpoint.get().position;
        let cmd = commands::suggest_position(player, position);
        let request = cmd.request().clone();
        self.phase = Phase::SuggestPosition(cmd);
        Ok(Directive::Send(request))
    }
}

fn expect_response(response: Option<Response>) -> Result<Response, SessionError> {
    response.ok_or(SessionError::OutOfStep("a response is required here"))
}

fn expect_no_response(response: &Option<Response>) -> Result<(), SessionError> {
    if response.is_some() {
        return Err(SessionError::OutOfStep("no request is in flight"));
    }
    Ok(())
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("phase", &phase_name(&self.phase))
            .field("cached_objects", &self.cache.len())
            .field("templates", &self.templates.len())
            .field("cycles_completed", &self.cycles_completed)
            .finish()
    }
}

fn phase_name(phase: &Phase) -> &'static str {
    match phase {
        Phase::Start => "start",
        Phase::Ping(_) => "ping",
        Phase::Identify(_) => "identify",
        Phase::RegisterTemplate(_) => "register_template",
        Phase::SpawnSelf(_) => "spawn_self",
        Phase::Enumerate(_) => "enumerate",
        Phase::FetchStates { .. } => "fetch_states",
        Phase::ResolveTemplateId { .. } => "resolve_template_id",
        Phase::FetchTemplate { .. } => "fetch_template",
        Phase::SpawnProjectile(_) => "spawn_projectile",
        Phase::SuggestPosition(_) => "suggest_position",
        Phase::Rendering => "rendering",
        Phase::Failed => "failed",
    }
}
