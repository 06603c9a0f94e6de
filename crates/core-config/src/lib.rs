//! Preference loading and parsing.
//!
//! Parses a TOML preferences file, falling back to defaults on a missing
//! file or a parse error rather than aborting startup. A handful of
//! preferences are display-relative (the window margin) and are clamped
//! against the currently attached driver's cell count the same way the
//! rest of this crate clamps viewport-relative values: parsed once,
//! re-applied whenever the display context changes.

use anyhow::Result;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayContext {
    pub cell_count: u16,
}

impl DisplayContext {
    pub fn new(cell_count: u16) -> Self {
        Self { cell_count }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    #[serde(default)]
    pub margin: u16,
    #[serde(default = "WindowConfig::default_track_cursor")]
    pub track_cursor: bool,
    #[serde(default)]
    pub sliding: bool,
    #[serde(default)]
    pub skip_blank_windows: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            margin: 0,
            track_cursor: Self::default_track_cursor(),
            sliding: false,
            skip_blank_windows: false,
        }
    }
}

impl WindowConfig {
    const fn default_track_cursor() -> bool {
        true
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct InputConfig {
    #[serde(default = "InputConfig::default_long_press_ms")]
    pub long_press_ms: u32,
    #[serde(default = "InputConfig::default_sticky_reset_ms")]
    pub sticky_reset_ms: u32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            long_press_ms: Self::default_long_press_ms(),
            sticky_reset_ms: Self::default_sticky_reset_ms(),
        }
    }
}

impl InputConfig {
    const fn default_long_press_ms() -> u32 {
        300
    }
    const fn default_sticky_reset_ms() -> u32 {
        10_000
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct UpdateConfig {
    #[serde(default = "UpdateConfig::default_refresh_quantum_ms")]
    pub refresh_quantum_ms: u32,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            refresh_quantum_ms: Self::default_refresh_quantum_ms(),
        }
    }
}

impl UpdateConfig {
    const fn default_refresh_quantum_ms() -> u32 {
        40
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthKind {
    None,
    Keyfile,
    Credentials,
    Polkit,
}

impl Default for AuthKind {
    fn default() -> Self {
        AuthKind::None
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ProtocolConfig {
    #[serde(default = "ProtocolConfig::default_socket_path")]
    pub socket_path: String,
    #[serde(default)]
    pub auth: AuthKind,
    /// Path to the shared secret file when `auth = "keyfile"`. Ignored for
    /// every other auth kind.
    #[serde(default)]
    pub keyfile_path: Option<String>,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            socket_path: Self::default_socket_path(),
            auth: AuthKind::default(),
            keyfile_path: None,
        }
    }
}

impl ProtocolConfig {
    fn default_socket_path() -> String {
        "/var/run/braille-daemon/socket".to_string()
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub update: UpdateConfig,
    #[serde(default)]
    pub protocol: ProtocolConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: Option<String>,
    pub file: ConfigFile,
    pub effective_window_margin: u16,
}

/// Best-effort preference path: a local override, else the platform config
/// directory.
pub fn discover() -> PathBuf {
    let local = PathBuf::from("braille-daemon.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("braille-daemon").join("braille-daemon.toml");
    }
    PathBuf::from("braille-daemon.toml")
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    if let Ok(content) = fs::read_to_string(&path) {
        match toml::from_str::<ConfigFile>(&content) {
            Ok(file) => Ok(Config {
                raw: Some(content),
                file,
                effective_window_margin: 0,
            }),
            Err(_e) => Ok(Config::default()),
        }
    } else {
        Ok(Config::default())
    }
}

impl Config {
    /// Clamp the configured window margin to half the display's cell count,
    /// mirroring the update loop's requirement that a margin never collapse
    /// the trackable band to nothing. Returns the effective value.
    pub fn apply_display_context(&mut self, ctx: DisplayContext) -> u16 {
        let raw = self.file.window.margin;
        let clamped = if ctx.cell_count == 0 {
            0
        } else {
            raw.min(ctx.cell_count / 2)
        };
        if clamped != raw {
            info!(
                target: "config",
                raw,
                clamped,
                cell_count = ctx.cell_count,
                "window_margin_clamped"
            );
        }
        self.effective_window_margin = clamped;
        clamped
    }

    /// Recompute the effective margin after a display reconfiguration
    /// (reconnect with a different cell count). Returns `Some(new)` only
    /// when it changed.
    pub fn recompute_with_context(&mut self, ctx: DisplayContext) -> Option<u16> {
        let prev = self.effective_window_margin;
        let current = self.apply_display_context(ctx);
        if current != prev { Some(current) } else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex, MutexGuard};
    use tracing::Level;
    use tracing::subscriber::with_default;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone)]
    struct BufferWriter {
        inner: Arc<Mutex<Vec<u8>>>,
    }

    impl BufferWriter {
        fn new() -> (Self, Arc<Mutex<Vec<u8>>>) {
            let buf = Arc::new(Mutex::new(Vec::new()));
            (Self { inner: buf.clone() }, buf)
        }
    }

    struct LockedWriter<'a> {
        guard: MutexGuard<'a, Vec<u8>>,
    }

    impl<'a> Write for LockedWriter<'a> {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.guard.extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for BufferWriter {
        type Writer = LockedWriter<'a>;
        fn make_writer(&'a self) -> Self::Writer {
            LockedWriter {
                guard: self.inner.lock().expect("log buffer poisoned"),
            }
        }
    }

    #[test]
    fn default_config_when_missing_file() {
        let cfg = load_from(Some(PathBuf::from("__nonexistent_hopefully__.toml"))).unwrap();
        assert_eq!(cfg.file.window.margin, 0);
        assert_eq!(cfg.file.input.long_press_ms, 300);
        assert_eq!(cfg.file.update.refresh_quantum_ms, 40);
    }

    #[test]
    fn parse_error_falls_back_to_defaults() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "not = [valid toml").unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.file.window.margin, 0);
    }

    #[test]
    fn parses_window_margin() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "[window]\nmargin = 3\n").unwrap();
        let mut cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.file.window.margin, 3);
        cfg.apply_display_context(DisplayContext::new(40));
        assert_eq!(cfg.effective_window_margin, 3);
    }

    #[test]
    fn clamps_margin_to_half_cell_count() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "[window]\nmargin = 50\n").unwrap();
        let mut cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        let eff = cfg.apply_display_context(DisplayContext::new(20));
        assert_eq!(eff, 10);
    }

    #[test]
    fn recompute_reports_change_only_when_value_moves() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "[window]\nmargin = 10\n").unwrap();
        let mut cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        cfg.apply_display_context(DisplayContext::new(40));
        assert_eq!(cfg.effective_window_margin, 10);
        let changed = cfg.recompute_with_context(DisplayContext::new(10));
        assert_eq!(changed, Some(5));
        let changed2 = cfg.recompute_with_context(DisplayContext::new(11));
        assert_eq!(changed2, None);
    }

    #[test]
    fn clamp_logging_uses_config_target() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "[window]\nmargin = 8\n").unwrap();
        let mut cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        let (writer, buffer) = BufferWriter::new();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::INFO)
            .with_target(true)
            .with_ansi(false)
            .without_time()
            .with_writer(writer)
            .finish();

        with_default(subscriber, || {
            cfg.apply_display_context(DisplayContext::new(6));
        });

        let log_output = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert!(log_output.contains("INFO config:"));
        assert!(log_output.contains("window_margin_clamped"));
        assert_eq!(cfg.effective_window_margin, 3);
    }

    #[test]
    fn parses_input_and_protocol_sections() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            tmp.path(),
            "[input]\nlong_press_ms = 250\n[protocol]\nsocket_path = \"/tmp/s\"\nauth = \"keyfile\"\n",
        )
        .unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.file.input.long_press_ms, 250);
        assert_eq!(cfg.file.protocol.socket_path, "/tmp/s");
        assert_eq!(cfg.file.protocol.auth, AuthKind::Keyfile);
    }
}
