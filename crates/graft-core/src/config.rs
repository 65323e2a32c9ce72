use std::sync::OnceLock;

fn env_true(key: &str) -> Option<bool> {
    std::env::var(key).ok().map(|val| {
        let trimmed = val.trim();
        !trimmed.is_empty() && !matches!(trimmed, "0" | "false" | "FALSE" | "False")
    })
}

fn bool_from_env(key: &str) -> bool {
    env_true(key).unwrap_or(false)
}

/// `GRAFT_DISABLE_INTRINSICS`: emit every recognised call as an ordinary call.
pub fn intrinsics_disabled() -> bool {
    static DISABLED: OnceLock<bool> = OnceLock::new();
    *DISABLED.get_or_init(|| bool_from_env("GRAFT_DISABLE_INTRINSICS"))
}

/// `GRAFT_VERBOSE_DIAGNOSTICS`: render info-level lowering events.
pub fn verbose_diagnostics() -> bool {
    static VERBOSE: OnceLock<bool> = OnceLock::new();
    *VERBOSE.get_or_init(|| bool_from_env("GRAFT_VERBOSE_DIAGNOSTICS"))
}
