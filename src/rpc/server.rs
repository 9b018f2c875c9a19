use std::io::{BufRead, Write};

use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::{Result, SwitchboardError};
use crate::rpc::protocol::{
    INTERNAL_ERROR, INVALID_PARAMS, JsonRpcRequest, JsonRpcResponse, METHOD_NOT_FOUND, PARSE_ERROR,
    PROTOCOL_VERSION,
};
use crate::rpc::tools;
use crate::store::db::SwitchboardDb;
use crate::store::leases::DEFAULT_LEASE_TTL_SECS;
use crate::store::memory::DEFAULT_RECALL_LIMIT;
use crate::store::messages::DEFAULT_INBOX_LIMIT;

/// Run the gateway over stdin/stdout until stdin closes.
pub fn serve(db: &SwitchboardDb) -> Result<()> {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    serve_lines(db, stdin.lock(), stdout.lock())
}

/// The request loop over arbitrary line streams. One request per line, one
/// response per line, flushed immediately; notifications produce nothing.
pub fn serve_lines<R: BufRead, W: Write>(db: &SwitchboardDb, reader: R, mut writer: W) -> Result<()> {
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Some(response) = handle_line(db, trimmed) else {
            continue;
        };
        serde_json::to_writer(&mut writer, &response)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }
    debug!("stdin closed, gateway shutting down");
    Ok(())
}

/// Decode and dispatch one line. Returns `None` when no response is owed
/// (notifications).
fn handle_line(db: &SwitchboardDb, line: &str) -> Option<JsonRpcResponse> {
    let req: JsonRpcRequest = match serde_json::from_str(line) {
        Ok(req) => req,
        Err(e) => {
            warn!(error = %e, "discarding unparseable request line");
            return Some(JsonRpcResponse::failure(
                Value::Null,
                PARSE_ERROR,
                format!("parse error: {e}"),
            ));
        }
    };

    let is_notification = req.id.is_none();
    let id = req.id.unwrap_or(Value::Null);
    debug!(method = %req.method, notification = is_notification, "request");

    match req.method.as_str() {
        "initialize" => Some(JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {"tools": {}},
                "serverInfo": {
                    "name": "switchboard",
                    "version": env!("CARGO_PKG_VERSION"),
                },
            }),
        )),
        "tools/list" => Some(JsonRpcResponse::success(
            id,
            json!({"tools": tools::catalog()}),
        )),
        "tools/call" => Some(match call_tool(db, req.params) {
            Ok(payload) => {
                let text = serde_json::to_string_pretty(&payload)
                    .unwrap_or_else(|_| payload.to_string());
                JsonRpcResponse::success(id, json!({"content": [{"type": "text", "text": text}]}))
            }
            Err(e) => JsonRpcResponse::failure(id, error_code(&e), e.to_string()),
        }),
        other => {
            if is_notification {
                // Notifications never get a response, known method or not.
                return None;
            }
            Some(JsonRpcResponse::failure(
                id,
                METHOD_NOT_FOUND,
                format!("unknown method: {other}"),
            ))
        }
    }
}

fn error_code(err: &SwitchboardError) -> i64 {
    match err {
        SwitchboardError::InvalidArgument(_) | SwitchboardError::UnknownTool(_) => INVALID_PARAMS,
        _ => INTERNAL_ERROR,
    }
}

fn call_tool(db: &SwitchboardDb, params: Option<Value>) -> Result<Value> {
    let params = params.unwrap_or(Value::Null);
    let name = params
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| SwitchboardError::InvalidArgument("tools/call requires a tool name".into()))?;
    let args = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
    dispatch(db, name, &args)
}

/// Route a tool call to the store and shape its result payload.
fn dispatch(db: &SwitchboardDb, name: &str, args: &Value) -> Result<Value> {
    match name {
        "register" => {
            let name = require_str(args, "name")?;
            let program = opt_str(args, "program")?.unwrap_or("unknown");
            let model = opt_str(args, "model")?.unwrap_or("unknown");
            let task = opt_str(args, "task")?.unwrap_or("");
            let agent = db.register_agent(name, program, model, task)?;
            Ok(json!({"status": "registered", "name": agent.name}))
        }
        "agents" => Ok(serde_json::to_value(db.list_agents()?)?),
        "send" => {
            let sender = require_str(args, "sender")?;
            let recipient = require_str(args, "recipient")?;
            let subject = require_str(args, "subject")?;
            let body = opt_str(args, "body")?.unwrap_or("");
            let thread_id = opt_str(args, "thread_id")?;
            let msg = db.send_message(sender, recipient, subject, body, thread_id)?;
            Ok(json!({"status": "sent", "id": msg.id}))
        }
        "inbox" => {
            let agent = require_str(args, "agent")?;
            let unread_only = opt_bool(args, "unread_only")?.unwrap_or(true);
            let limit = opt_u32(args, "limit")?.unwrap_or(DEFAULT_INBOX_LIMIT);
            Ok(serde_json::to_value(db.fetch_inbox(agent, unread_only, limit)?)?)
        }
        "mark_read" => {
            let id = require_i64(args, "message_id")?;
            let agent = require_str(args, "agent")?;
            db.mark_read(id, agent)?;
            Ok(json!({"status": "read", "id": id}))
        }
        "ack" => {
            let id = require_i64(args, "message_id")?;
            let agent = require_str(args, "agent")?;
            db.ack_message(id, agent)?;
            Ok(json!({"status": "acknowledged", "id": id}))
        }
        "lock" => {
            let path = require_str(args, "path")?;
            let agent = require_str(args, "agent")?;
            let reason = opt_str(args, "reason")?;
            let ttl = opt_i64(args, "ttl_seconds")?.unwrap_or(DEFAULT_LEASE_TTL_SECS);
            Ok(serde_json::to_value(db.acquire_lease(path, agent, reason, ttl)?)?)
        }
        "unlock" => {
            let path = require_str(args, "path")?;
            let agent = require_str(args, "agent")?;
            db.release_lease(path, agent)?;
            Ok(json!({"status": "unlocked", "path": path}))
        }
        "locks" => {
            let holder = opt_str(args, "agent")?;
            Ok(serde_json::to_value(db.list_leases(holder)?)?)
        }
        "remember" => {
            let content = require_str(args, "content")?;
            let tags = opt_string_vec(args, "tags")?.unwrap_or_default();
            let mem = db.remember(content, &tags)?;
            Ok(json!({"status": "stored", "id": mem.id}))
        }
        "recall" => {
            let query = require_str(args, "query")?;
            let limit = opt_u32(args, "limit")?.unwrap_or(DEFAULT_RECALL_LIMIT);
            Ok(serde_json::to_value(db.recall(query, limit)?)?)
        }
        "forget" => {
            let id = require_str(args, "id")?;
            db.forget(id)?;
            Ok(json!({"status": "forgotten", "id": id}))
        }
        other => Err(SwitchboardError::UnknownTool(other.to_string())),
    }
}

// -- argument decoding ------------------------------------------------------

fn missing(key: &str) -> SwitchboardError {
    SwitchboardError::InvalidArgument(format!("missing or invalid argument '{key}'"))
}

fn require_str<'a>(args: &'a Value, key: &str) -> Result<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| missing(key))
}

fn require_i64(args: &Value, key: &str) -> Result<i64> {
    args.get(key)
        .and_then(Value::as_i64)
        .ok_or_else(|| missing(key))
}

fn opt_str<'a>(args: &'a Value, key: &str) -> Result<Option<&'a str>> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v.as_str().map(Some).ok_or_else(|| missing(key)),
    }
}

fn opt_bool(args: &Value, key: &str) -> Result<Option<bool>> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v.as_bool().map(Some).ok_or_else(|| missing(key)),
    }
}

fn opt_i64(args: &Value, key: &str) -> Result<Option<i64>> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v.as_i64().map(Some).ok_or_else(|| missing(key)),
    }
}

fn opt_u32(args: &Value, key: &str) -> Result<Option<u32>> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| missing(key)),
    }
}

fn opt_string_vec(args: &Value, key: &str) -> Result<Option<Vec<String>>> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(item.as_str().ok_or_else(|| missing(key))?.to_string());
            }
            Ok(Some(out))
        }
        Some(_) => Err(missing(key)),
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn respond(db: &SwitchboardDb, line: &str) -> Value {
        let resp = handle_line(db, line).expect("response expected");
        serde_json::to_value(&resp).unwrap()
    }

    fn call(db: &SwitchboardDb, name: &str, args: Value) -> Value {
        let line = json!({
            "jsonrpc": "2.0", "id": 1, "method": "tools/call",
            "params": {"name": name, "arguments": args},
        });
        respond(db, &line.to_string())
    }

    /// Unwrap the text-content envelope of a successful tool call.
    fn payload(response: &Value) -> Value {
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn initialize_handshake() {
        let db = SwitchboardDb::open_memory().unwrap();
        let resp = respond(&db, r#"{"jsonrpc":"2.0","id":0,"method":"initialize"}"#);
        assert_eq!(resp["id"], 0);
        assert_eq!(resp["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(resp["result"]["serverInfo"]["name"], "switchboard");
    }

    #[test]
    fn notifications_get_no_response() {
        let db = SwitchboardDb::open_memory().unwrap();
        assert!(handle_line(&db, r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).is_none());
        // Unknown notification methods are also silent.
        assert!(handle_line(&db, r#"{"jsonrpc":"2.0","method":"notifications/other"}"#).is_none());
    }

    #[test]
    fn tools_list_returns_catalog() {
        let db = SwitchboardDb::open_memory().unwrap();
        let resp = respond(&db, r#"{"jsonrpc":"2.0","id":7,"method":"tools/list"}"#);
        let tools = resp["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 12);
    }

    #[test]
    fn unknown_method_is_rejected() {
        let db = SwitchboardDb::open_memory().unwrap();
        let resp = respond(&db, r#"{"jsonrpc":"2.0","id":1,"method":"resources/list"}"#);
        assert_eq!(resp["error"]["code"], METHOD_NOT_FOUND);
    }

    #[test]
    fn parse_error_yields_null_id_failure() {
        let db = SwitchboardDb::open_memory().unwrap();
        let resp = respond(&db, "this is not json");
        assert_eq!(resp["id"], Value::Null);
        assert_eq!(resp["error"]["code"], PARSE_ERROR);
    }

    #[test]
    fn lock_unlock_round_trip() {
        let db = SwitchboardDb::open_memory().unwrap();

        let resp = call(&db, "lock", json!({"path": "src/a.rs", "agent": "alice"}));
        let body = payload(&resp);
        assert_eq!(body["status"], "locked");
        assert_eq!(body["path"], "src/a.rs");

        // Second holder sees a structured conflict, not an error.
        let resp = call(&db, "lock", json!({"path": "src/a.rs", "agent": "bob"}));
        let body = payload(&resp);
        assert_eq!(body["status"], "conflict");
        assert_eq!(body["holder"], "alice");

        let resp = call(&db, "unlock", json!({"path": "src/a.rs", "agent": "alice"}));
        assert_eq!(payload(&resp)["status"], "unlocked");

        let resp = call(&db, "locks", json!({}));
        assert_eq!(payload(&resp).as_array().unwrap().len(), 0);
    }

    #[test]
    fn message_lifecycle_over_rpc() {
        let db = SwitchboardDb::open_memory().unwrap();

        let resp = call(
            &db,
            "send",
            json!({"sender": "alice", "recipient": "bob", "subject": "[TASK] go"}),
        );
        let sent = payload(&resp);
        assert_eq!(sent["status"], "sent");
        let id = sent["id"].as_i64().unwrap();

        let resp = call(&db, "inbox", json!({"agent": "bob"}));
        assert_eq!(payload(&resp).as_array().unwrap().len(), 1);

        let resp = call(&db, "ack", json!({"message_id": id, "agent": "bob"}));
        assert_eq!(payload(&resp)["status"], "acknowledged");

        // Acked implies read: the unread inbox is now empty.
        let resp = call(&db, "inbox", json!({"agent": "bob"}));
        assert_eq!(payload(&resp).as_array().unwrap().len(), 0);
    }

    #[test]
    fn memory_tools_round_trip() {
        let db = SwitchboardDb::open_memory().unwrap();

        let resp = call(
            &db,
            "remember",
            json!({"content": "ci is flaky on arm", "tags": ["ci"]}),
        );
        let stored = payload(&resp);
        assert_eq!(stored["status"], "stored");
        let id = stored["id"].as_str().unwrap().to_string();

        let resp = call(&db, "recall", json!({"query": "flaky"}));
        let found = payload(&resp);
        assert_eq!(found.as_array().unwrap().len(), 1);
        assert_eq!(found[0]["id"], id.as_str());

        let resp = call(&db, "forget", json!({"id": id}));
        assert_eq!(payload(&resp)["status"], "forgotten");
    }

    #[test]
    fn register_defaults_optional_fields() {
        let db = SwitchboardDb::open_memory().unwrap();
        let resp = call(&db, "register", json!({"name": "claude-1"}));
        assert_eq!(payload(&resp)["status"], "registered");

        let resp = call(&db, "agents", json!({}));
        let agents = payload(&resp);
        assert_eq!(agents[0]["program"], "unknown");
        assert_eq!(agents[0]["model"], "unknown");
    }

    #[test]
    fn missing_argument_maps_to_invalid_params() {
        let db = SwitchboardDb::open_memory().unwrap();
        let resp = call(&db, "lock", json!({"agent": "alice"}));
        assert_eq!(resp["error"]["code"], INVALID_PARAMS);
    }

    #[test]
    fn wrong_argument_type_maps_to_invalid_params() {
        let db = SwitchboardDb::open_memory().unwrap();
        let resp = call(&db, "inbox", json!({"agent": "bob", "limit": "twenty"}));
        assert_eq!(resp["error"]["code"], INVALID_PARAMS);

        let resp = call(&db, "mark_read", json!({"message_id": "1", "agent": "bob"}));
        assert_eq!(resp["error"]["code"], INVALID_PARAMS);
    }

    #[test]
    fn unknown_tool_maps_to_invalid_params() {
        let db = SwitchboardDb::open_memory().unwrap();
        let resp = call(&db, "teleport", json!({}));
        assert_eq!(resp["error"]["code"], INVALID_PARAMS);
        assert!(
            resp["error"]["message"]
                .as_str()
                .unwrap()
                .contains("teleport")
        );
    }

    #[test]
    fn serve_lines_end_to_end() {
        let db = SwitchboardDb::open_memory().unwrap();
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            "\n",
        );
        let mut out = Vec::new();
        serve_lines(&db, input.as_bytes(), &mut out).unwrap();

        let lines: Vec<&str> = std::str::from_utf8(&out).unwrap().lines().collect();
        // Two responses: the notification and the blank line produce nothing.
        assert_eq!(lines.len(), 2);
        let first: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["id"], 1);
        let second: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["id"], 2);
    }
}
