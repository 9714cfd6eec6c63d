use ulid::Ulid;

/// Generates a new ULID-based ID with the given prefix.
///
/// # Examples
/// ```
/// let id = fanout_common::id::prefixed_ulid("cli");
/// assert!(id.starts_with("cli_"));
/// ```
pub fn prefixed_ulid(prefix: &str) -> String {
    format!("{}_{}", prefix, Ulid::new())
}

/// Well-known ID prefixes.
pub mod prefix {
    /// Connection identity handed out on a successful upgrade.
    pub const CLIENT: &str = "cli";
}
