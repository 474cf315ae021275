//! Server discovery feed backed by the configuration file.
//!
//! # Behavior
//! - Watches the file's parent directory, so saves that write a temp file and
//!   rename it over the config are still seen
//! - Ignores events for other files in that directory
//! - Publishes a reloaded config only when its filtered server set differs
//!   from the last one published (or loaded at startup)
//! - A config that fails to load or validate is logged and skipped; the last
//!   published server set stays in effect

use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::SelectorConfig;
use crate::selector::metadata::filter_servers;

type ServerSet = HashMap<String, String>;

/// Watches a selector config and publishes configs whose server set changed.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<SelectorConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiving end of the discovery feed.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<SelectorConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. Dropping the returned watcher stops the feed.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let dir = watch_dir(&self.path).to_path_buf();
        let mut feed = Feed {
            file_name: self.path.file_name().map(OsStr::to_os_string),
            last: load_config(&self.path).ok().map(|c| server_set(&c)),
            path: self.path,
            tx: self.update_tx,
        };

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => feed.on_event(&event),
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?dir, "Config watcher started");
        Ok(watcher)
    }
}

/// State owned by the notify callback.
struct Feed {
    path: PathBuf,
    file_name: Option<OsString>,
    last: Option<ServerSet>,
    tx: mpsc::UnboundedSender<SelectorConfig>,
}

impl Feed {
    fn on_event(&mut self, event: &Event) {
        if !(event.kind.is_create() || event.kind.is_modify()) || !self.concerns(event) {
            return;
        }

        let config = match load_config(&self.path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "Config reload failed, keeping last server set");
                return;
            }
        };

        let servers = server_set(&config);
        if self.last.as_ref() == Some(&servers) {
            tracing::debug!("Config changed, server set unchanged");
            return;
        }

        tracing::info!(servers = servers.len(), "Server set changed");
        self.last = Some(servers);
        let _ = self.tx.send(config);
    }

    fn concerns(&self, event: &Event) -> bool {
        event
            .paths
            .iter()
            .any(|p| p.file_name().is_some() && p.file_name() == self.file_name.as_deref())
    }
}

fn server_set(config: &SelectorConfig) -> ServerSet {
    filter_servers(&config.servers, config.group_filter())
}

fn watch_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    async fn next_config(
        rx: &mut mpsc::UnboundedReceiver<SelectorConfig>,
    ) -> SelectorConfig {
        tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("reload within timeout")
            .expect("channel open")
    }

    /// Atomic save: write a sibling temp file, then rename it over `path`.
    fn replace(path: &Path, contents: &str) {
        let tmp = path.with_extension("toml.tmp");
        fs::write(&tmp, contents).unwrap();
        fs::rename(&tmp, path).unwrap();
    }

    #[tokio::test]
    async fn test_reload_delivers_new_servers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selector.toml");
        fs::write(&path, "[servers]\n\"a\" = \"\"\n").unwrap();

        let (watcher, mut rx) = ConfigWatcher::new(&path);
        let _guard = watcher.run().unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        fs::write(&path, "[servers]\n\"a\" = \"\"\n\"b\" = \"weight=2\"\n").unwrap();

        // A plain write may be observed half-written first.
        let mut config = next_config(&mut rx).await;
        while config.servers.len() != 2 {
            config = next_config(&mut rx).await;
        }
        assert_eq!(config.servers.get("b").map(String::as_str), Some("weight=2"));
    }

    #[tokio::test]
    async fn test_rename_over_config_is_seen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selector.toml");
        fs::write(&path, "[servers]\n\"a\" = \"\"\n").unwrap();

        let (watcher, mut rx) = ConfigWatcher::new(&path);
        let _guard = watcher.run().unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        let tmp = dir.path().join(".selector.toml.swp");
        fs::write(&tmp, "[servers]\n\"c\" = \"weight=3\"\n").unwrap();
        fs::rename(&tmp, &path).unwrap();

        let config = next_config(&mut rx).await;
        assert_eq!(config.servers.len(), 1);
        assert!(config.servers.contains_key("c"));

        // The watch survives the original file being replaced.
        replace(&path, "[servers]\n\"c\" = \"\"\n\"d\" = \"\"\n");
        let config = next_config(&mut rx).await;
        assert_eq!(config.servers.len(), 2);
    }

    #[tokio::test]
    async fn test_unchanged_server_set_is_not_published() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selector.toml");
        fs::write(&path, "[servers]\n\"a\" = \"\"\n").unwrap();

        let (watcher, mut rx) = ConfigWatcher::new(&path);
        let _guard = watcher.run().unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        replace(&path, "strategy = \"random\"\n[servers]\n\"a\" = \"\"\n");
        fs::write(dir.path().join("other.toml"), "[servers]\n\"z\" = \"\"\n").unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        replace(&path, "[servers]\n\"a\" = \"\"\n\"b\" = \"\"\n");

        let config = next_config(&mut rx).await;
        assert_eq!(config.servers.len(), 2);
    }

    #[tokio::test]
    async fn test_inactive_only_change_is_not_published() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selector.toml");
        fs::write(&path, "[servers]\n\"a\" = \"\"\n").unwrap();

        let (watcher, mut rx) = ConfigWatcher::new(&path);
        let _guard = watcher.run().unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        replace(&path, "[servers]\n\"a\" = \"\"\n\"x\" = \"state=inactive\"\n");
        tokio::time::sleep(Duration::from_millis(500)).await;
        replace(&path, "[servers]\n\"b\" = \"\"\n");

        let config = next_config(&mut rx).await;
        assert!(config.servers.contains_key("b"));
        assert!(!config.servers.contains_key("a"));
    }

    #[test]
    fn test_watch_dir_of_bare_file_name() {
        assert_eq!(watch_dir(Path::new("selector.toml")), Path::new("."));
        assert_eq!(
            watch_dir(Path::new("/etc/rpc/selector.toml")),
            Path::new("/etc/rpc")
        );
    }
}
