//! A minimal in-memory world server.
//!
//! Answers the full command set against a flat object map so the client can
//! be exercised without a real simulation behind it: objects never move on
//! their own, spawns allocate fresh ids, and position hints are applied
//! verbatim.

use std::collections::HashMap;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};

use orrery_client::transport::{Transport, TransportEvent};
use orrery_protocol::commands::payloads;
use orrery_protocol::wire::{Request, Response};
use orrery_protocol::{ObjectId, StateVariable, Template, TemplateId};

/// Server-side record of one live object.
struct WorldObject {
    template_id: TemplateId,
    sv: StateVariable,
}

/// A tiny authoritative world keyed by object id.
///
/// Controller identities and object ids are drawn from one shared sequence,
/// so every id handed out is unique across both uses.
pub struct WorldStub {
    templates: HashMap<TemplateId, Template>,
    objects: HashMap<ObjectId, WorldObject>,
    /// Enumeration order; ids are listed as they were created.
    order: Vec<ObjectId>,
    next_id: u8,
}

impl WorldStub {
    pub fn new() -> Self {
        Self {
            templates: HashMap::new(),
            objects: HashMap::new(),
            order: Vec::new(),
            next_id: 1,
        }
    }

    /// Registers `template` and lines up `count` objects built from it
    /// along the x axis.
    pub fn seed(&mut self, template_id: TemplateId, template: Template, count: usize) {
        self.templates.insert(template_id.clone(), template);
        for i in 0..count {
            let id = self.alloc_id();
            let sv = StateVariable {
                position: [3.0 * i as f64, 0.0, 0.0],
                ..StateVariable::default()
            };
            self.add_object(id, template_id.clone(), sv);
        }
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    fn alloc_id(&mut self) -> ObjectId {
        let id = ObjectId::from([self.next_id, 0, 0]);
        self.next_id += 1;
        id
    }

    fn add_object(&mut self, id: ObjectId, template_id: TemplateId, sv: StateVariable) {
        self.order.push(id.clone());
        self.objects.insert(id, WorldObject { template_id, sv });
    }

    /// Answers one decoded request.
    pub fn handle(&mut self, request: &Request) -> Response {
        match request.cmd.as_str() {
            "ping" => Response::ack(),
            "set_id" => {
                let id = self.alloc_id();
                debug!(controller = %id, "identity assigned");
                Response::success(json!({ "objID": id }))
            }
            "add_template" => {
                let Some(p) = decode::<payloads::AddTemplate>(request) else {
                    return Response::failure();
                };
                // Template ids are write-once.
                if self.templates.contains_key(&p.template_id) {
                    return Response::failure();
                }
                self.templates
                    .insert(p.template_id, Template::new(p.cshape, p.geometry));
                Response::ack()
            }
            "get_template" => {
                let Some(p) = decode::<payloads::GetTemplate>(request) else {
                    return Response::failure();
                };
                match self.templates.get(&p.template_id) {
                    Some(template) => Response::success(json!(template)),
                    None => Response::failure(),
                }
            }
            "spawn" => {
                let Some(p) = decode::<payloads::Spawn>(request) else {
                    return Response::failure();
                };
                if !self.templates.contains_key(&p.template_id) {
                    return Response::failure();
                }
                let id = self.alloc_id();
                debug!(object = %id, template = %p.template_id, "object spawned");
                self.add_object(id.clone(), p.template_id, p.sv);
                Response::success(json!({ "objID": id }))
            }
            "get_all_objids" => Response::success(json!({ "objIDs": self.order })),
            "get_template_id" => {
                let Some(p) = decode::<payloads::GetTemplateId>(request) else {
                    return Response::failure();
                };
                match self.objects.get(&p.obj_id) {
                    Some(object) => Response::success(json!({ "templateID": object.template_id })),
                    None => Response::failure(),
                }
            }
            "get_statevar" => {
                let Some(p) = decode::<payloads::GetStateVariables>(request) else {
                    return Response::failure();
                };
                let mut entries = Vec::with_capacity(p.obj_ids.len());
                for id in &p.obj_ids {
                    match self.objects.get(id) {
                        Some(object) => entries.push(json!({ "sv": object.sv })),
                        None => return Response::failure(),
                    }
                }
                Response::success(json!({ "sv": entries }))
            }
            "suggest_pos" => {
                let Some(p) = decode::<payloads::SuggestPosition>(request) else {
                    return Response::failure();
                };
                match self.objects.get_mut(&p.obj_id) {
                    Some(object) => {
                        object.sv.position = p.position;
                        Response::ack()
                    }
                    None => Response::failure(),
                }
            }
            "set_statevar" => {
                let Some(p) = decode::<payloads::SetStateVariable>(request) else {
                    return Response::failure();
                };
                match self.objects.get_mut(&p.obj_id) {
                    Some(object) => {
                        object.sv = p.sv;
                        Response::ack()
                    }
                    None => Response::failure(),
                }
            }
            other => {
                warn!(cmd = other, "unknown command");
                Response::failure()
            }
        }
    }
}

impl Default for WorldStub {
    fn default() -> Self {
        Self::new()
    }
}

fn decode<T: DeserializeOwned>(request: &Request) -> Option<T> {
    match serde_json::from_value(request.payload.clone()) {
        Ok(p) => Some(p),
        Err(err) => {
            warn!(cmd = %request.cmd, error = %err, "malformed payload");
            None
        }
    }
}

/// Serves requests on `transport` until the peer disconnects.
pub async fn serve<T: Transport>(mut world: WorldStub, mut transport: T) {
    loop {
        match transport.next_event().await {
            TransportEvent::Opened => debug!("peer connected"),
            TransportEvent::Message(raw) => {
                let response = match Request::from_json(&raw) {
                    Ok(request) => {
                        debug!(cmd = %request.cmd, "handling request");
                        world.handle(&request)
                    }
                    Err(err) => {
                        warn!(error = %err, "undecodable request");
                        Response::failure()
                    }
                };
                let Ok(text) = response.to_json() else {
                    warn!("response failed to encode");
                    continue;
                };
                if transport.send(Bytes::from(text)).await.is_err() {
                    break;
                }
            }
            TransportEvent::Error(err) => {
                warn!(error = %err, "transport error");
                break;
            }
            TransportEvent::Closed => {
                debug!("peer disconnected");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orrery_protocol::template::unit_cube;
    use orrery_protocol::CSHAPE_SPHERE;

    fn seeded() -> WorldStub {
        let mut world = WorldStub::new();
        world.seed(
            TemplateId::from([9]),
            Template::new(CSHAPE_SPHERE, unit_cube()),
            2,
        );
        world
    }

    #[test]
    fn ids_are_unique_across_identities_and_spawns() {
        let mut world = seeded();

        let identity = world.handle(&Request::new("set_id", json!({ "objID": null })));
        assert!(identity.ok);
        assert_eq!(identity.payload, Some(json!({ "objID": [3, 0, 0] })));

        let spawn = world.handle(&Request::new(
            "spawn",
            json!({ "templateID": [9], "sv": StateVariable::default() }),
        ));
        assert!(spawn.ok);
        assert_eq!(spawn.payload, Some(json!({ "objID": [4, 0, 0] })));
    }

    #[test]
    fn listing_keeps_creation_order() {
        let mut world = seeded();
        let listing = world.handle(&Request::new("get_all_objids", json!({})));
        assert_eq!(
            listing.payload,
            Some(json!({ "objIDs": [[1, 0, 0], [2, 0, 0]] }))
        );
    }

    #[test]
    fn template_ids_are_write_once() {
        let mut world = seeded();
        let again = world.handle(&Request::new(
            "add_template",
            json!({ "templateID": [9], "cshape": CSHAPE_SPHERE, "geometry": [] }),
        ));
        assert!(!again.ok);
    }

    #[test]
    fn spawn_needs_a_registered_template() {
        let mut world = seeded();
        let spawn = world.handle(&Request::new(
            "spawn",
            json!({ "templateID": [42], "sv": StateVariable::default() }),
        ));
        assert!(!spawn.ok);
    }

    #[test]
    fn hints_move_the_object() {
        let mut world = seeded();
        let hint = world.handle(&Request::new(
            "suggest_pos",
            json!({ "objID": [1, 0, 0], "position": [5.0, 6.0, 7.0] }),
        ));
        assert!(hint.ok);

        let states = world.handle(&Request::new("get_statevar", json!({ "objIDs": [[1, 0, 0]] })));
        let payload = states.payload.expect("state payload");
        assert_eq!(payload["sv"][0]["sv"]["position"], json!([5.0, 6.0, 7.0]));
    }

    #[test]
    fn unknown_objects_are_rejected() {
        let mut world = seeded();
        let states = world.handle(&Request::new("get_statevar", json!({ "objIDs": [[9, 9, 9]] })));
        assert!(!states.ok);

        let lookup = world.handle(&Request::new("get_template_id", json!({ "objID": [9, 9, 9] })));
        assert!(!lookup.ok);
    }

    #[test]
    fn state_overwrite_replaces_the_whole_snapshot() {
        let mut world = seeded();
        let sv = StateVariable {
            position: [8.0, 0.0, 0.0],
            scale: 3.0,
            ..StateVariable::default()
        };

        let overwrite = world.handle(&Request::new(
            "set_statevar",
            json!({ "objID": [1, 0, 0], "sv": sv }),
        ));
        assert!(overwrite.ok);

        let states = world.handle(&Request::new("get_statevar", json!({ "objIDs": [[1, 0, 0]] })));
        let payload = states.payload.expect("state payload");
        assert_eq!(payload["sv"][0]["sv"]["position"], json!([8.0, 0.0, 0.0]));
        assert_eq!(payload["sv"][0]["sv"]["scale"], json!(3.0));
    }
}
