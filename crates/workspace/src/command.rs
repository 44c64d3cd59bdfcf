//! JSON command protocol for scripted and agent-driven sessions.
//!
//! Commands are executed against a [`Session`], synchronously. Nothing here
//! waits on warming passes; `warm` only starts one.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use shared::{symbol, PolygonId};

use crate::catalog::Catalog;
use crate::session::Session;
use crate::state::Placement;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum AgentCommand {
    AddPolygon {
        sides: u32,
        #[serde(default)]
        position: [f64; 3],
        #[serde(default)]
        label: Option<String>,
    },
    Attach {
        a: PolygonId,
        edge_a: usize,
        b: PolygonId,
        edge_b: usize,
        #[serde(default)]
        fold_angle: Option<f64>,
    },
    Move {
        id: PolygonId,
        delta: [f64; 3],
    },
    Remove {
        id: PolygonId,
    },
    Candidates {
        point: [f64; 3],
        #[serde(default)]
        exclude: Option<PolygonId>,
    },
    Poll {
        symbol: String,
    },
    Encode {
        sides: Vec<u32>,
    },
    Decode {
        symbol: String,
    },
    Warm,
    Frame,
    Stats,
    Inspect,
    ExportWorkspace,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl CommandResponse {
    fn ok() -> Self {
        Self {
            success: true,
            error: None,
            data: None,
        }
    }

    fn ok_with_data(data: serde_json::Value) -> Self {
        Self {
            success: true,
            error: None,
            data: Some(data),
        }
    }

    fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(msg.into()),
            data: None,
        }
    }
}

fn to_value<T: Serialize>(value: &T) -> CommandResponse {
    match serde_json::to_value(value) {
        Ok(data) => CommandResponse::ok_with_data(data),
        Err(e) => CommandResponse::err(format!("Cannot serialize result: {e}")),
    }
}

pub fn execute_command<C: Catalog>(session: &mut Session<C>, cmd: AgentCommand) -> CommandResponse {
    match cmd {
        AgentCommand::AddPolygon {
            sides,
            position,
            label,
        } => {
            let mut placement = Placement::at(DVec3::from_array(position));
            placement.label = label;
            match session.add_polygon(sides, placement) {
                Ok(id) => CommandResponse::ok_with_data(serde_json::json!({ "id": id })),
                Err(e) => CommandResponse::err(e.to_string()),
            }
        }
        AgentCommand::Attach {
            a,
            edge_a,
            b,
            edge_b,
            fold_angle,
        } => match session.attach(a, edge_a, b, edge_b, fold_angle) {
            Ok(report) => to_value(&report),
            Err(e) => CommandResponse::err(e.to_string()),
        },
        AgentCommand::Move { id, delta } => {
            match session.move_polygon(id, DVec3::from_array(delta)) {
                Ok(moved) => CommandResponse::ok_with_data(serde_json::json!({ "moved": moved })),
                Err(e) => CommandResponse::err(e.to_string()),
            }
        }
        AgentCommand::Remove { id } => match session.remove_polygon(id) {
            Ok(_) => CommandResponse::ok(),
            Err(e) => CommandResponse::err(e.to_string()),
        },
        AgentCommand::Candidates { point, exclude } => {
            to_value(&session.candidates(DVec3::from_array(point), exclude))
        }
        AgentCommand::Poll { symbol } => match session.poll(&symbol) {
            Some(data) => to_value(data.as_ref()),
            None => CommandResponse::ok_with_data(serde_json::Value::Null),
        },
        AgentCommand::Encode { sides } => match symbol::encode(&sides) {
            Ok(symbol) => CommandResponse::ok_with_data(serde_json::json!({ "symbol": symbol })),
            Err(e) => CommandResponse::err(e.to_string()),
        },
        AgentCommand::Decode { symbol } => match symbol::decode(&symbol) {
            Ok(sides) => CommandResponse::ok_with_data(serde_json::json!({ "sides": sides })),
            Err(e) => CommandResponse::err(e.to_string()),
        },
        AgentCommand::Warm => {
            let started = session.warm();
            CommandResponse::ok_with_data(serde_json::json!({ "started": started }))
        }
        AgentCommand::Frame => {
            let frame = session.frame();
            CommandResponse::ok_with_data(serde_json::json!({
                "index": frame.index,
                "polygons": frame.polygons.len(),
                "chains": frame.chains.len(),
                "placeholders": frame.placeholders,
            }))
        }
        AgentCommand::Stats => {
            let stats = session.stats();
            CommandResponse::ok_with_data(serde_json::json!({
                "stats": stats,
                "hit_rate": stats.hit_rate(),
                "in_flight": session.cache().is_in_flight(),
                "pending": session.cache().is_pending(),
            }))
        }
        AgentCommand::Inspect => {
            let ws = session.workspace();
            let polygons: Vec<serde_json::Value> = ws
                .polygons()
                .map(|p| {
                    serde_json::json!({
                        "id": p.id,
                        "sides": p.sides,
                        "state": p.state(),
                        "open_edges": p.open_edges().collect::<Vec<_>>(),
                        "centre": p.centre().to_array(),
                    })
                })
                .collect();
            CommandResponse::ok_with_data(serde_json::json!({
                "session": session.id().to_string(),
                "polygon_count": ws.len(),
                "chain_count": ws.chains().len(),
                "chains": ws.chains(),
                "polygons": polygons,
                "version": ws.version(),
            }))
        }
        AgentCommand::ExportWorkspace => to_value(&session.workspace().to_document()),
    }
}

pub fn execute_json<C: Catalog>(
    session: &mut Session<C>,
    json: &str,
) -> Result<CommandResponse, String> {
    let cmd: AgentCommand =
        serde_json::from_str(json).map_err(|e| format!("Invalid command JSON: {e}"))?;
    Ok(execute_command(session, cmd))
}

pub fn execute_json_batch<C: Catalog>(
    session: &mut Session<C>,
    json: &str,
) -> Result<Vec<CommandResponse>, String> {
    let cmds: Vec<AgentCommand> =
        serde_json::from_str(json).map_err(|e| format!("Invalid commands JSON: {e}"))?;
    Ok(cmds
        .into_iter()
        .map(|cmd| execute_command(session, cmd))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::TestHarness;

    #[test]
    fn test_command_serde_warm() {
        let cmd: AgentCommand = serde_json::from_str(r#"{"command": "warm"}"#).unwrap();
        assert!(matches!(cmd, AgentCommand::Warm));
    }

    #[test]
    fn test_command_serde_add_polygon_defaults() {
        let json = r#"{"command": "add_polygon", "sides": 5}"#;
        match serde_json::from_str(json).unwrap() {
            AgentCommand::AddPolygon {
                sides,
                position,
                label,
            } => {
                assert_eq!(sides, 5);
                assert_eq!(position, [0.0; 3]);
                assert!(label.is_none());
            }
            _ => panic!("Expected AddPolygon"),
        }
    }

    #[test]
    fn test_command_serde_attach() {
        let json = r#"{"command": "attach", "a": 0, "edge_a": 1, "b": 2, "edge_b": 0}"#;
        match serde_json::from_str(json).unwrap() {
            AgentCommand::Attach { a, b, fold_angle, .. } => {
                assert_eq!((a, b), (0, 2));
                assert!(fold_angle.is_none());
            }
            _ => panic!("Expected Attach"),
        }
    }

    #[test]
    fn test_execute_add_and_inspect() {
        let mut h = TestHarness::new();
        let resp = execute_json(&mut h.session, r#"{"command": "add_polygon", "sides": 6}"#).unwrap();
        assert!(resp.success);
        assert_eq!(resp.data.unwrap()["id"], 0);

        let resp = execute_json(&mut h.session, r#"{"command": "inspect"}"#).unwrap();
        let data = resp.data.unwrap();
        assert_eq!(data["polygon_count"], 1);
        assert_eq!(data["polygons"][0]["state"], "unattached");
    }

    #[test]
    fn test_execute_invalid_sides() {
        let mut h = TestHarness::new();
        let resp = execute_json(&mut h.session, r#"{"command": "add_polygon", "sides": 2}"#).unwrap();
        assert!(!resp.success);
        assert!(resp.error.unwrap().contains("3..=20"));
    }

    #[test]
    fn test_execute_decode_rejects_malformed() {
        let mut h = TestHarness::new();
        let ok = execute_json(&mut h.session, r#"{"command": "decode", "symbol": "A3B"}"#).unwrap();
        assert_eq!(ok.data.unwrap()["sides"], serde_json::json!([3, 3, 3, 4]));
        let bad = execute_json(&mut h.session, r#"{"command": "decode", "symbol": "AA"}"#).unwrap();
        assert!(!bad.success);
    }

    #[test]
    fn test_poll_miss_returns_null() {
        let mut h = TestHarness::new();
        let resp = execute_json(&mut h.session, r#"{"command": "poll", "symbol": "Q"}"#).unwrap();
        assert!(resp.success);
        assert_eq!(resp.data, Some(serde_json::Value::Null));
    }

    #[test]
    fn test_invalid_json() {
        let mut h = TestHarness::new();
        assert!(execute_json(&mut h.session, r#"{"command": "fly"}"#).is_err());
    }
}
