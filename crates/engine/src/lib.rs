use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
mod asset_keys;
mod assets;

pub use app::{
    character_screen_rect, clamp_displacement, facing_for, flags_from_displacement, map_offset,
    movement_vector, run_app, start_button_rect, tile_screen_rect, ActionStates, AnimationSet,
    AppError, Character, DirectionFlags, Facing, FollowCamera, GridCoord, InputAction,
    InputSnapshot, JoystickLayout, LoopConfig, LoopMetricsSnapshot, RenderStats, Renderer, Scene,
    SceneWorld, ScreenRect, TileLayer, TileLayerError, TileSource, Vec2, VirtualJoystick,
    Viewport, CAMERA_FOLLOW_FRACTION, CANVAS_HEIGHT, CANVAS_WIDTH, CHARACTER_SIZE_PX,
    CHARACTER_SPEED, DEFAULT_TILE_SIZE_PX, FRAME_INTERVAL_MS, JOYSTICK_DEAD_ZONE_PX,
    JOYSTICK_MAX_OFFSET_PX,
};
pub use asset_keys::{validate_asset_key, AssetKeyError};
pub use assets::{ImageLoadError, ImageStore, LoadedImage};

pub const ROOT_ENV_VAR: &str = "HANGOUT_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub asset_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "HANGOUT_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or assets/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or assets/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/hangout\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    let asset_dir = root.join("assets");
    Ok(AppPaths { root, asset_dir })
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let normalized = normalize_path(&PathBuf::from(value));
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            exe_dir
                .ancestors()
                .find(|candidate| is_repo_marker(candidate))
                .map(normalize_path)
                .ok_or_else(|| StartupError::RootNotFound {
                    start_dir: normalize_path(&exe_dir),
                    env_var: ROOT_ENV_VAR,
                })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn is_repo_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_assets = path.join("assets").is_dir();

    cargo_toml && (has_crates || has_assets)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_marker_requires_cargo_toml() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir(dir.path().join("assets")).expect("assets dir");
        assert!(!is_repo_marker(dir.path()));

        fs::write(dir.path().join("Cargo.toml"), "[workspace]\n").expect("cargo toml");
        assert!(is_repo_marker(dir.path()));
    }

    #[test]
    fn repo_marker_rejects_missing_directory() {
        let cwd = env::current_dir().expect("cwd");
        assert!(!is_repo_marker(&cwd.join("definitely_not_a_marker")));
    }
}
