// Shared fixtures for integration tests
#![allow(dead_code)]

use postgrust_admin::{MemoryConnection, ServerVersion};

pub const ALL_VERSIONS: [ServerVersion; 8] = [
    ServerVersion::new(9, 6),
    ServerVersion::new(10, 0),
    ServerVersion::new(11, 0),
    ServerVersion::new(12, 0),
    ServerVersion::new(13, 0),
    ServerVersion::new(14, 0),
    ServerVersion::new(15, 0),
    ServerVersion::new(16, 0),
];

/// Server with `public.s1` owned by alice (1..500, last value 7, commented),
/// roles alice and bob, and an extra `archive` schema
pub fn server(version: ServerVersion) -> MemoryConnection {
    let mut conn = MemoryConnection::new(version);
    conn.add_role("alice", false)
        .add_role("bob", false)
        .add_schema("archive");

    let seq = conn.add_sequence("public", "s1", "alice");
    seq.max_value = 500;
    seq.last_value = 7;
    seq.is_called = true;
    seq.comment = Some("order ids".to_string());
    conn
}

pub fn began(conn: &MemoryConnection) -> bool {
    conn.statement_log().iter().any(|s| s == "BEGIN")
}
