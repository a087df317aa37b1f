use crate::core::DumpTool;
use crate::utils::error::{OpsError, Result};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

pub const DEFAULT_DUMP_TIMEOUT: Duration = Duration::from_secs(3600);

/// What the backup job is asked to dump, derived from `database.url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DumpTarget {
    Postgres {
        host: String,
        port: u16,
        user: String,
        password: String,
        dbname: String,
    },
    Sqlite {
        path: PathBuf,
    },
    Unsupported {
        scheme: String,
    },
}

impl DumpTarget {
    /// Accepts `postgres://` / `postgresql://` URLs, `sqlite://<path>` and
    /// bare file paths. Any other scheme yields [`DumpTarget::Unsupported`].
    pub fn from_database_url(database_url: &str) -> Result<Self> {
        let database_url = database_url.trim();
        if database_url.is_empty() {
            return Err(OpsError::MissingConfigError {
                field: "database.url".to_string(),
            });
        }

        if let Some(rest) = database_url.strip_prefix("sqlite:") {
            let path = rest.strip_prefix("//").unwrap_or(rest);
            if path.is_empty() {
                return Err(OpsError::InvalidConfigValueError {
                    field: "database.url".to_string(),
                    value: database_url.to_string(),
                    reason: "SQLite URL has no file path".to_string(),
                });
            }
            return Ok(DumpTarget::Sqlite {
                path: PathBuf::from(path),
            });
        }

        if !database_url.contains("://") {
            return Ok(DumpTarget::Sqlite {
                path: PathBuf::from(database_url),
            });
        }

        let url = url::Url::parse(database_url).map_err(|e| OpsError::InvalidConfigValueError {
            field: "database.url".to_string(),
            value: Self::redact(database_url),
            reason: e.to_string(),
        })?;

        match url.scheme() {
            "postgres" | "postgresql" => Ok(DumpTarget::Postgres {
                host: url.host_str().unwrap_or("localhost").to_string(),
                port: url.port().unwrap_or(5432),
                user: url.username().to_string(),
                password: url.password().unwrap_or_default().to_string(),
                dbname: url.path().trim_start_matches('/').to_string(),
            }),
            other => Ok(DumpTarget::Unsupported {
                scheme: other.to_string(),
            }),
        }
    }

    /// File path of a SQLite target.
    pub fn sqlite_path(&self) -> Option<&PathBuf> {
        match self {
            DumpTarget::Sqlite { path } => Some(path),
            _ => None,
        }
    }

    /// Loggable description without credentials.
    pub fn describe(&self) -> String {
        match self {
            DumpTarget::Postgres {
                host, port, dbname, ..
            } => format!("postgres {}:{}/{}", host, port, dbname),
            DumpTarget::Sqlite { path } => format!("sqlite {}", path.display()),
            DumpTarget::Unsupported { scheme } => format!("unsupported scheme '{}'", scheme),
        }
    }

    fn redact(database_url: &str) -> String {
        match url::Url::parse(database_url) {
            Ok(mut url) if url.password().is_some() => {
                let _ = url.set_password(Some("***"));
                url.to_string()
            }
            _ => database_url.to_string(),
        }
    }
}

/// Runs `pg_dump` or `sqlite3 .dump` and captures stdout.
#[derive(Debug, Clone)]
pub struct CommandDumper {
    timeout: Duration,
}

impl Default for CommandDumper {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_DUMP_TIMEOUT,
        }
    }
}

impl CommandDumper {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl DumpTool for CommandDumper {
    async fn dump(&self, target: &DumpTarget) -> Result<Vec<u8>> {
        let (tool, args, password) = match target {
            DumpTarget::Postgres {
                host,
                port,
                user,
                password,
                dbname,
            } => (
                "pg_dump",
                vec![
                    "-h".to_string(),
                    host.clone(),
                    "-p".to_string(),
                    port.to_string(),
                    "-U".to_string(),
                    user.clone(),
                    "-d".to_string(),
                    dbname.clone(),
                    "--no-owner".to_string(),
                    "--no-acl".to_string(),
                ],
                Some(password.as_str()).filter(|p| !p.is_empty()),
            ),
            DumpTarget::Sqlite { path } => (
                "sqlite3",
                vec![path.display().to_string(), ".dump".to_string()],
                None,
            ),
            DumpTarget::Unsupported { scheme } => {
                return Err(OpsError::DumpFailed {
                    message: format!("no dump tool for '{}' databases", scheme),
                })
            }
        };

        let program = which::which(tool).map_err(|_| OpsError::ToolNotFound {
            tool: tool.to_string(),
        })?;
        tracing::debug!("🔧 Running {} for {}", program.display(), target.describe());

        let mut command = tokio::process::Command::new(&program);
        command.args(&args).stdin(Stdio::null()).kill_on_drop(true);
        if let Some(password) = password {
            command.env("PGPASSWORD", password);
        }

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| OpsError::DumpFailed {
                message: format!("{} timed out after {}s", tool, self.timeout.as_secs()),
            })??;

        if !output.status.success() {
            return Err(OpsError::DumpFailed {
                message: format!(
                    "{} exited with {}: {}",
                    tool,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        Ok(output.stdout)
    }
}
