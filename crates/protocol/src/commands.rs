//! The command catalog.
//!
//! One pure factory per wire operation. Each factory returns a [`Command`]:
//! the encoded request paired, by type, with the decoder for its reply.
//! Factories never retain state between calls; the caller owns the command
//! until the correlated response arrives and is fed to [`Command::decode`].

use core::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::ids::{ObjectId, TemplateId};
use crate::state::{Quat, StateVariable, Vec3};
use crate::template::Template;
use crate::wire::{Request, Response, WireError};

/// Faults observed while encoding a command or decoding its reply.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The server answered `ok: false` for this operation.
    #[error("server rejected '{cmd}'")]
    Rejected { cmd: String },

    /// The reply was accepted (`ok: true`) but carried no payload although
    /// the operation requires one.
    #[error("reply to '{cmd}' carried no payload")]
    MissingPayload { cmd: String },

    /// The reply payload did not match the operation's schema.
    #[error("reply to '{cmd}' is malformed: {source}")]
    Malformed {
        cmd: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Wire(#[from] WireError),
}

impl CommandError {
    /// True when the server rejected the operation (as opposed to a local
    /// encode/decode fault).
    pub fn is_rejection(&self) -> bool {
        matches!(self, CommandError::Rejected { .. })
    }
}

/// Typed decoder for one operation's successful payload.
pub trait Reply: Sized {
    /// Decodes the payload of a reply whose envelope already passed the
    /// `ok` check. `payload` is `None` when the server omitted it.
    fn from_payload(cmd: &str, payload: Option<Value>) -> Result<Self, CommandError>;
}

fn parse<T: DeserializeOwned>(cmd: &str, payload: Option<Value>) -> Result<T, CommandError> {
    let value = payload.ok_or_else(|| CommandError::MissingPayload {
        cmd: cmd.to_string(),
    })?;
    serde_json::from_value(value).map_err(|source| CommandError::Malformed {
        cmd: cmd.to_string(),
        source,
    })
}

/// One wire operation: the encoded request plus the typed reply decoder.
#[derive(Debug, Clone)]
pub struct Command<R> {
    request: Request,
    _reply: PhantomData<fn() -> R>,
}

impl<R: Reply> Command<R> {
    fn new(cmd: &'static str, payload: impl Serialize) -> Self {
        Self {
            request: Request::new(cmd, json!(payload)),
            _reply: PhantomData,
        }
    }

    /// Wire name of this operation.
    pub fn cmd(&self) -> &str {
        &self.request.cmd
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Encodes the request to its wire text.
    pub fn encode(&self) -> Result<String, CommandError> {
        Ok(self.request.to_json()?)
    }

    /// Decodes the correlated response, consuming the command.
    ///
    /// `ok == false` becomes [`CommandError::Rejected`] tagged with this
    /// operation's wire name; the payload is never inspected in that case.
    pub fn decode(self, response: Response) -> Result<R, CommandError> {
        if !response.ok {
            return Err(CommandError::Rejected {
                cmd: self.request.cmd,
            });
        }
        R::from_payload(&self.request.cmd, response.payload)
    }
}

/* ------------------------------------------------------------------------- */
/* Request payload schemas                                                   */
/* ------------------------------------------------------------------------- */

/// Wire payload schemas for the request side.
///
/// The factories below build these shapes; server-side implementations (the
/// demo stub, test harnesses) parse inbound requests with them.
pub mod payloads {
    use super::*;

    /// Payload of operations that carry no arguments.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Empty {}

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct SetIdentity {
        #[serde(rename = "objID")]
        pub obj_id: Option<ObjectId>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct AddTemplate {
        #[serde(rename = "templateID")]
        pub template_id: TemplateId,
        pub cshape: [f64; 4],
        pub geometry: Vec<f64>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct GetTemplate {
        #[serde(rename = "templateID")]
        pub template_id: TemplateId,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Spawn {
        #[serde(rename = "templateID")]
        pub template_id: TemplateId,
        pub sv: StateVariable,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct GetTemplateId {
        #[serde(rename = "objID")]
        pub obj_id: ObjectId,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct GetStateVariables {
        #[serde(rename = "objIDs")]
        pub obj_ids: Vec<ObjectId>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct SuggestPosition {
        #[serde(rename = "objID")]
        pub obj_id: ObjectId,
        pub position: Vec3,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct SetStateVariable {
        #[serde(rename = "objID")]
        pub obj_id: ObjectId,
        pub sv: StateVariable,
    }
}

/* ------------------------------------------------------------------------- */
/* Reply schemas                                                             */
/* ------------------------------------------------------------------------- */

/// Reply carrying nothing the client consumes beyond the `ok` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack;

impl Reply for Ack {
    fn from_payload(_cmd: &str, _payload: Option<Value>) -> Result<Self, CommandError> {
        Ok(Ack)
    }
}

/// Reply to `set_id`: the identity the server actually assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityReply {
    #[serde(rename = "objID")]
    pub obj_id: ObjectId,
}

impl Reply for IdentityReply {
    fn from_payload(cmd: &str, payload: Option<Value>) -> Result<Self, CommandError> {
        parse(cmd, payload)
    }
}

/// Reply to `spawn`: the server-assigned identity of the new object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnReply {
    #[serde(rename = "objID")]
    pub obj_id: ObjectId,
}

impl Reply for SpawnReply {
    fn from_payload(cmd: &str, payload: Option<Value>) -> Result<Self, CommandError> {
        parse(cmd, payload)
    }
}

/// Reply to `get_all_objids`: every live object, in server order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectListReply {
    #[serde(rename = "objIDs")]
    pub obj_ids: Vec<ObjectId>,
}

impl Reply for ObjectListReply {
    fn from_payload(cmd: &str, payload: Option<Value>) -> Result<Self, CommandError> {
        parse(cmd, payload)
    }
}

/// Reply to `get_template_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateIdReply {
    #[serde(rename = "templateID")]
    pub template_id: TemplateId,
}

impl Reply for TemplateIdReply {
    fn from_payload(cmd: &str, payload: Option<Value>) -> Result<Self, CommandError> {
        parse(cmd, payload)
    }
}

impl Reply for Template {
    fn from_payload(cmd: &str, payload: Option<Value>) -> Result<Self, CommandError> {
        parse(cmd, payload)
    }
}

/// One element of a batched state reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SvEntry {
    pub sv: StateVariable,
}

/// Reply to `get_statevar`: entries parallel to the requested id sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateVariablesReply {
    #[serde(rename = "sv")]
    pub entries: Vec<SvEntry>,
}

impl Reply for StateVariablesReply {
    fn from_payload(cmd: &str, payload: Option<Value>) -> Result<Self, CommandError> {
        parse(cmd, payload)
    }
}

/* ------------------------------------------------------------------------- */
/* Factories                                                                 */
/* ------------------------------------------------------------------------- */

/// Liveness probe; the first exchange of every session.
pub fn ping() -> Command<Ack> {
    Command::new("ping", payloads::Empty {})
}

/// Requests a controller identity. Pass `None` to let the server pick; the
/// reply carries the identity actually assigned either way.
pub fn set_identity(requested: Option<ObjectId>) -> Command<IdentityReply> {
    Command::new("set_id", payloads::SetIdentity { obj_id: requested })
}

/// Registers a template under `template_id`.
///
/// A template id must not be reused for different geometry within a
/// session; the server's behavior on such a collision is unspecified, so
/// this is a caller-side precondition.
pub fn add_template(template_id: TemplateId, cshape: [f64; 4], geometry: Vec<f64>) -> Command<Ack> {
    Command::new(
        "add_template",
        payloads::AddTemplate {
            template_id,
            cshape,
            geometry,
        },
    )
}

/// Fetches a template's geometry and collision shape.
pub fn get_template(template_id: TemplateId) -> Command<Template> {
    Command::new("get_template", payloads::GetTemplate { template_id })
}

/// Spawns a new object from a registered template.
///
/// The spawn state always carries the dynamic composite collision tag,
/// regardless of the template's own descriptor, and keeps `scale == radius`.
pub fn spawn(
    template_id: TemplateId,
    position: Vec3,
    velocity: Vec3,
    orientation: Quat,
    scale: f64,
    imass: f64,
) -> Command<SpawnReply> {
    let sv = StateVariable::dynamic(position, velocity, orientation, scale, imass);
    Command::new("spawn", payloads::Spawn { template_id, sv })
}

/// Enumerates every live object id, in server order.
pub fn list_object_ids() -> Command<ObjectListReply> {
    Command::new("get_all_objids", payloads::Empty {})
}

/// Looks up which template an object was spawned from.
pub fn get_template_id_of(obj_id: ObjectId) -> Command<TemplateIdReply> {
    Command::new("get_template_id", payloads::GetTemplateId { obj_id })
}

/// Fetches the state of a whole batch of objects in one round-trip.
///
/// The reply's entries are parallel to `obj_ids`.
pub fn get_state_variables(obj_ids: Vec<ObjectId>) -> Command<StateVariablesReply> {
    Command::new("get_statevar", payloads::GetStateVariables { obj_ids })
}

/// Advisory hint about where the controller wants its object to be.
pub fn suggest_position(obj_id: ObjectId, position: Vec3) -> Command<Ack> {
    Command::new("suggest_pos", payloads::SuggestPosition { obj_id, position })
}

/// Overwrites the server-side state of one object.
///
/// Not used by the mirroring loop; exposed for controller-style callers.
pub fn set_state_variable(obj_id: ObjectId, sv: StateVariable) -> Command<Ack> {
    Command::new("set_statevar", payloads::SetStateVariable { obj_id, sv })
}
