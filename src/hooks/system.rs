//! Database engine identity.

use std::fmt;

/// Database system behind a driver. Used for labeling only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum System {
    #[default]
    Unknown,
    Sqlite,
    MySql,
    Postgres,
}

impl System {
    /// Resolve the system from a driver name such as `"sqlite3"` or `"pgx"`.
    pub fn from_driver_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => System::Sqlite,
            "mysql" => System::MySql,
            "postgres" | "postgresql" | "pgx" => System::Postgres,
            _ => System::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            System::Unknown => "unknown",
            System::Sqlite => "sqlite",
            System::MySql => "mysql",
            System::Postgres => "postgres",
        }
    }

    /// Value for the OpenTelemetry `db.system` attribute.
    pub fn semconv_name(&self) -> &'static str {
        match self {
            System::Unknown => "other_sql",
            System::Sqlite => "sqlite",
            System::MySql => "mysql",
            System::Postgres => "postgresql",
        }
    }
}

impl fmt::Display for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
