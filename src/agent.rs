/// Resolve the agent identity from the environment.
///
/// Checks `SWITCHBOARD_AGENT`. Returns `None` if unset or empty,
/// letting callers decide whether to fall back or fail.
pub fn resolve_agent() -> Option<String> {
    std::env::var("SWITCHBOARD_AGENT")
        .ok()
        .filter(|s| !s.is_empty())
}
