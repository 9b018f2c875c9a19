use serde::Serialize;
use serde_json::{Value, json};

/// A tool exposed through `tools/list` / `tools/call`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDef {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// The fixed tool catalog. Order matches the dispatch table in
/// [`crate::rpc::server`].
pub fn catalog() -> Vec<ToolDef> {
    vec![
        ToolDef {
            name: "register",
            description: "Register this agent with the hub (upsert by name)",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string", "description": "Agent name, e.g. 'claude-1'"},
                    "program": {"type": "string", "description": "Agent program, e.g. 'claude-code'"},
                    "model": {"type": "string", "description": "Model in use"},
                    "task": {"type": "string", "description": "What the agent is working on"}
                },
                "required": ["name"]
            }),
        },
        ToolDef {
            name: "agents",
            description: "List all registered agents",
            input_schema: json!({"type": "object", "properties": {}}),
        },
        ToolDef {
            name: "send",
            description: "Send a message to another agent",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "sender": {"type": "string", "description": "Your agent name"},
                    "recipient": {"type": "string", "description": "Target agent name"},
                    "subject": {"type": "string", "description": "Subject line; prefixes like [TASK], [DONE], [BLOCKED] are conventional"},
                    "body": {"type": "string", "description": "Message body"},
                    "thread_id": {"type": "string", "description": "Optional key grouping related messages"}
                },
                "required": ["sender", "recipient", "subject"]
            }),
        },
        ToolDef {
            name: "inbox",
            description: "Fetch messages addressed to an agent, newest first",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "agent": {"type": "string", "description": "Your agent name"},
                    "unread_only": {"type": "boolean", "default": true},
                    "limit": {"type": "integer", "default": 20}
                },
                "required": ["agent"]
            }),
        },
        ToolDef {
            name: "mark_read",
            description: "Mark one of your messages as read",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "message_id": {"type": "integer"},
                    "agent": {"type": "string"}
                },
                "required": ["message_id", "agent"]
            }),
        },
        ToolDef {
            name: "ack",
            description: "Acknowledge one of your messages (marks it read too)",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "message_id": {"type": "integer"},
                    "agent": {"type": "string"}
                },
                "required": ["message_id", "agent"]
            }),
        },
        ToolDef {
            name: "lock",
            description: "Take an exclusive, expiring lease on a file path",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "File path to lock"},
                    "agent": {"type": "string", "description": "Your agent name"},
                    "reason": {"type": "string", "description": "Why the lock is needed"},
                    "ttl_seconds": {"type": "integer", "default": 1800}
                },
                "required": ["path", "agent"]
            }),
        },
        ToolDef {
            name: "unlock",
            description: "Release a file lease you hold",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string"},
                    "agent": {"type": "string"}
                },
                "required": ["path", "agent"]
            }),
        },
        ToolDef {
            name: "locks",
            description: "List live file leases",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "agent": {"type": "string", "description": "Optional holder filter"}
                }
            }),
        },
        ToolDef {
            name: "remember",
            description: "Store a note for later recall",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "content": {"type": "string", "description": "Text to store"},
                    "tags": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["content"]
            }),
        },
        ToolDef {
            name: "recall",
            description: "Search stored notes by substring",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Search term"},
                    "limit": {"type": "integer", "default": 5}
                },
                "required": ["query"]
            }),
        },
        ToolDef {
            name: "forget",
            description: "Delete a stored note",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": {"type": "string", "description": "Note id to delete"}
                },
                "required": ["id"]
            }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_complete_and_unique() {
        let tools = catalog();
        assert_eq!(tools.len(), 12);

        let mut names: Vec<&str> = tools.iter().map(|t| t.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 12);
    }

    #[test]
    fn schemas_use_mcp_field_name() {
        let encoded = serde_json::to_value(catalog()).unwrap();
        assert!(encoded[0].get("inputSchema").is_some());
        assert!(encoded[0].get("input_schema").is_none());
    }

    #[test]
    fn required_fields_match_dispatch_expectations() {
        let tools = catalog();
        let lock = tools.iter().find(|t| t.name == "lock").unwrap();
        let required = lock.input_schema["required"].as_array().unwrap();
        assert!(required.contains(&serde_json::json!("path")));
        assert!(required.contains(&serde_json::json!("agent")));
    }
}
