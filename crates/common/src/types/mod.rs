use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical backend service names used for endpoint resolution and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    Auth,
    Storage,
    Functions,
    Graphql,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 4] = [
        ServiceKind::Auth,
        ServiceKind::Storage,
        ServiceKind::Functions,
        ServiceKind::Graphql,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Auth => "auth",
            ServiceKind::Storage => "storage",
            ServiceKind::Functions => "functions",
            ServiceKind::Graphql => "graphql",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
