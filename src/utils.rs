use std::ffi::OsString;
use std::path::PathBuf;

const CACHE_DIR_NAME: &str = "buoy_wind_cache";

/// Overrides every other cache location.
pub const CACHE_DIR_ENV: &str = "BUOY_WIND_CACHE_DIR";

/// Set on platforms where only the temp directory is writable.
const SERVERLESS_ENV: [&str; 2] = ["VERCEL", "AWS_LAMBDA_FUNCTION_NAME"];

/// Cache directories to try, in order, for the current process environment.
pub fn cache_dir_candidates() -> Vec<PathBuf> {
    cache_dir_candidates_from(|name| std::env::var_os(name), dirs::cache_dir(), std::env::temp_dir())
}

pub(crate) fn cache_dir_candidates_from(
    env: impl Fn(&str) -> Option<OsString>,
    platform_cache: Option<PathBuf>,
    temp_dir: PathBuf,
) -> Vec<PathBuf> {
    if let Some(dir) = env(CACHE_DIR_ENV).filter(|dir| !dir.is_empty()) {
        return vec![PathBuf::from(dir)];
    }

    let scratch = temp_dir.join(CACHE_DIR_NAME);
    if SERVERLESS_ENV.iter().any(|name| env(name).is_some()) {
        return vec![scratch];
    }

    platform_cache
        .map(|dir| dir.join(CACHE_DIR_NAME))
        .into_iter()
        .chain(std::iter::once(scratch))
        .collect()
}
