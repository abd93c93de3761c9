use std::env;
use std::path::PathBuf;

use engine::{LoopConfig, Scene};
use presence::{
    spawn_presence, LocalBackend, PresenceConfig, PresenceFeed, RealtimeBackend, RealtimeHub,
    TcpBackend,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::gameplay;

const MAP_ENV_VAR: &str = "HANGOUT_MAP";
const PRESENCE_ENV_VAR: &str = "HANGOUT_PRESENCE";

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PresenceMode {
    Off,
    Local,
    Tcp(String),
}

pub(crate) fn build_app() -> AppWiring {
    init_tracing();
    info!("=== Hangout Startup ===");

    let map_path = map_path_from_env();
    let mode = match parse_presence_mode(env::var(PRESENCE_ENV_VAR).ok().as_deref()) {
        Ok(mode) => mode,
        Err(raw) => {
            warn!(
                value = raw.as_str(),
                var = PRESENCE_ENV_VAR,
                "presence_mode_unrecognized_using_local"
            );
            PresenceMode::Local
        }
    };
    info!(map = %map_path.display(), presence = ?mode, "app_config");

    let feed = start_presence(&mode);
    AppWiring {
        config: LoopConfig::default(),
        scene: gameplay::build_scene(map_path, feed),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn map_path_from_env() -> PathBuf {
    env::var(MAP_ENV_VAR)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(gameplay::DEFAULT_MAP_PATH))
}

/// `off`, `local`, `tcp://HOST:PORT` or bare `HOST:PORT`; unset means `local`.
pub(crate) fn parse_presence_mode(raw: Option<&str>) -> Result<PresenceMode, String> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(PresenceMode::Local);
    };
    match raw.to_ascii_lowercase().as_str() {
        "off" | "none" => return Ok(PresenceMode::Off),
        "local" => return Ok(PresenceMode::Local),
        _ => {}
    }
    let addr = raw.strip_prefix("tcp://").unwrap_or(raw);
    match addr.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
            Ok(PresenceMode::Tcp(addr.to_string()))
        }
        _ => Err(raw.to_string()),
    }
}

/// Operator hint for modes that cannot observe other processes.
pub(crate) fn presence_mode_hint(mode: &PresenceMode) -> Option<&'static str> {
    match mode {
        PresenceMode::Local => Some(
            "in-process hub sees only this client; run presence_server and set tcp://HOST:PORT to meet other players",
        ),
        PresenceMode::Off | PresenceMode::Tcp(_) => None,
    }
}

fn start_presence(mode: &PresenceMode) -> Option<PresenceFeed> {
    let backend: Box<dyn RealtimeBackend> = match mode {
        PresenceMode::Off => {
            info!("presence_disabled");
            return None;
        }
        PresenceMode::Local => {
            if let Some(hint) = presence_mode_hint(mode) {
                info!(hint, var = PRESENCE_ENV_VAR, "presence_local_only");
            }
            Box::new(LocalBackend::new(&RealtimeHub::new()))
        }
        PresenceMode::Tcp(addr) => match TcpBackend::connect(addr.as_str()) {
            Ok(backend) => {
                info!(addr = addr.as_str(), "presence_server_connected");
                Box::new(backend)
            }
            Err(error) => {
                warn!(addr = addr.as_str(), error = %error, "presence_connect_failed");
                return None;
            }
        },
    };
    match spawn_presence(backend, PresenceConfig::default()) {
        Ok(feed) => Some(feed),
        Err(error) => {
            warn!(error = %error, "presence_spawn_failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presence_mode_defaults_to_local() {
        assert_eq!(parse_presence_mode(None), Ok(PresenceMode::Local));
        assert_eq!(parse_presence_mode(Some("  ")), Ok(PresenceMode::Local));
        assert_eq!(parse_presence_mode(Some("OFF")), Ok(PresenceMode::Off));
    }

    #[test]
    fn presence_mode_accepts_tcp_addresses() {
        assert_eq!(
            parse_presence_mode(Some("tcp://127.0.0.1:46101")),
            Ok(PresenceMode::Tcp("127.0.0.1:46101".to_string()))
        );
        assert_eq!(
            parse_presence_mode(Some("hangout.lan:9000")),
            Ok(PresenceMode::Tcp("hangout.lan:9000".to_string()))
        );
    }

    #[test]
    fn only_local_presence_carries_a_server_hint() {
        let hint = presence_mode_hint(&PresenceMode::Local).expect("local hint");
        assert!(hint.contains("presence_server"));
        assert!(hint.contains("tcp://"));
        assert_eq!(presence_mode_hint(&PresenceMode::Off), None);
        assert_eq!(presence_mode_hint(&PresenceMode::Tcp("127.0.0.1:46101".to_string())), None);
    }

    #[test]
    fn presence_mode_rejects_garbage() {
        assert!(parse_presence_mode(Some("carrier-pigeon")).is_err());
        assert!(parse_presence_mode(Some("tcp://host:notaport")).is_err());
        assert!(parse_presence_mode(Some(":80")).is_err());
    }
}
