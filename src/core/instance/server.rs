// ─── Dedicated server files ───
// eula.txt and the temporary offline-mode switch in server.properties.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::core::error::{LauncherError, LauncherResult};

pub const EULA_FILE: &str = "eula.txt";
pub const SERVER_PROPERTIES_FILE: &str = "server.properties";

const EULA_CONTENT: &str = "# generated by minepack\n# https://account.mojang.com/documents/minecraft_eula\neula=true\n";

/// Content restored when the server had no properties file yet, so the next
/// regular start is online again.
const DEFAULT_PROPERTIES: &str = "online-mode=true\n";

pub async fn accept_eula(dir: &Path) -> LauncherResult<()> {
    let path = dir.join(EULA_FILE);
    tokio::fs::write(&path, EULA_CONTENT)
        .await
        .map_err(|e| LauncherError::io(&path, e))?;
    debug!("Wrote {:?}", path);
    Ok(())
}

/// `key=value` lines of a server.properties file. Comments, blank lines and
/// ordering survive a round trip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerProperties {
    lines: Vec<String>,
}

impl ServerProperties {
    pub fn parse(raw: &str) -> Self {
        Self {
            lines: raw.lines().map(str::to_string).collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().find_map(|line| {
            let (k, v) = split_property(line)?;
            (k == key).then_some(v)
        })
    }

    pub fn set(&mut self, key: &str, value: &str) {
        let rendered = format!("{key}={value}");
        let existing = self
            .lines
            .iter_mut()
            .find(|line| split_property(line).is_some_and(|(k, _)| k == key));
        match existing {
            Some(line) => *line = rendered,
            None => self.lines.push(rendered),
        }
    }

    pub fn render(&self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }
}

fn split_property(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') || trimmed.starts_with('!') {
        return None;
    }
    let (key, value) = trimmed.split_once('=')?;
    Some((key.trim(), value.trim()))
}

/// Holds the original server.properties while the server runs offline.
/// Call [`OfflineModeGuard::restore`] once the server has stopped.
#[derive(Debug)]
pub struct OfflineModeGuard {
    path: PathBuf,
    original: String,
}

impl OfflineModeGuard {
    pub async fn enable(dir: &Path) -> LauncherResult<Self> {
        let path = dir.join(SERVER_PROPERTIES_FILE);
        let original = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => DEFAULT_PROPERTIES.to_string(),
            Err(e) => return Err(LauncherError::io(&path, e)),
        };

        let mut props = ServerProperties::parse(&original);
        props.set("online-mode", "false");
        tokio::fs::write(&path, props.render())
            .await
            .map_err(|e| LauncherError::io(&path, e))?;
        info!("Starting server in offline mode");
        Ok(Self { path, original })
    }

    pub async fn restore(self) -> LauncherResult<()> {
        tokio::fs::write(&self.path, &self.original)
            .await
            .map_err(|e| LauncherError::io(&self.path, e))?;
        debug!("Restored {:?}", self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn properties_keep_comments_and_order() {
        let mut props = ServerProperties::parse(
            "#Minecraft server properties\nmotd=A Minecraft Server\nonline-mode=true\nmax-players=20\n",
        );
        assert_eq!(props.get("online-mode"), Some("true"));

        props.set("online-mode", "false");
        props.set("level-seed", "42");
        assert_eq!(
            props.render(),
            "#Minecraft server properties\nmotd=A Minecraft Server\nonline-mode=false\nmax-players=20\nlevel-seed=42\n"
        );
    }

    #[tokio::test]
    async fn offline_switch_is_undone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SERVER_PROPERTIES_FILE);
        std::fs::write(&path, "motd=hi\nonline-mode=true\n").unwrap();

        let guard = OfflineModeGuard::enable(dir.path()).await.unwrap();
        let during = std::fs::read_to_string(&path).unwrap();
        assert!(during.contains("online-mode=false"));
        assert!(during.contains("motd=hi"));

        guard.restore().await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "motd=hi\nonline-mode=true\n");
    }

    #[tokio::test]
    async fn first_offline_start_leaves_online_default() {
        let dir = tempfile::tempdir().unwrap();
        let guard = OfflineModeGuard::enable(dir.path()).await.unwrap();
        guard.restore().await.unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join(SERVER_PROPERTIES_FILE)).unwrap(),
            "online-mode=true\n"
        );
    }

    #[tokio::test]
    async fn eula_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        accept_eula(dir.path()).await.unwrap();
        let eula = std::fs::read_to_string(dir.path().join(EULA_FILE)).unwrap();
        assert!(eula.ends_with("eula=true\n"));
    }
}
