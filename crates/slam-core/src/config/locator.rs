use std::path::PathBuf;

use tracing::debug;

use super::paths;

/// Trait for finding the Steam install directory.
///
/// Install discovery is platform specific and external to the native
/// binding, so it sits behind this seam.
pub trait InstallLocator {
    fn install_path(&self) -> Option<PathBuf>;
}

/// A locator that always answers with the same (possibly absent) path.
#[derive(Debug, Clone, Default)]
pub struct FixedInstallPath {
    path: Option<PathBuf>,
}

impl FixedInstallPath {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// A locator that never finds an install.
    pub fn none() -> Self {
        Self { path: None }
    }
}

impl InstallLocator for FixedInstallPath {
    fn install_path(&self) -> Option<PathBuf> {
        self.path.clone()
    }
}

/// Finds the install from, in order: an explicit override, the
/// `SLAM_STEAM_PATH` environment variable, then the platform's usual place.
#[derive(Debug, Clone, Default)]
pub struct SteamInstall {
    override_path: Option<PathBuf>,
}

impl SteamInstall {
    pub fn new(override_path: Option<PathBuf>) -> Self {
        Self { override_path }
    }
}

impl InstallLocator for SteamInstall {
    fn install_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.override_path {
            return Some(path.clone());
        }

        if let Some(path) = std::env::var_os(paths::INSTALL_PATH_ENV)
            && !path.is_empty()
        {
            debug!("Using Steam path from {}", paths::INSTALL_PATH_ENV);
            return Some(PathBuf::from(path));
        }

        let found = platform_install_path();
        match &found {
            Some(path) => debug!("Found Steam install at {}", path.display()),
            None => debug!("Steam install not found"),
        }
        found
    }
}

#[cfg(target_os = "windows")]
fn platform_install_path() -> Option<PathBuf> {
    paths::REGISTRY_KEYS
        .iter()
        .find_map(|key| read_machine_string(key, paths::REGISTRY_VALUE))
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
}

#[cfg(not(target_os = "windows"))]
fn platform_install_path() -> Option<PathBuf> {
    let home = dirs::home_dir()?;
    [
        home.join(".steam").join("steam"),
        home.join(".local").join("share").join("Steam"),
    ]
    .into_iter()
    .find(|candidate| candidate.is_dir())
}

#[cfg(target_os = "windows")]
fn read_machine_string(key: &str, value: &str) -> Option<String> {
    use std::ffi::{OsStr, OsString};
    use std::os::windows::ffi::{OsStrExt, OsStringExt};

    use windows::Win32::Foundation::ERROR_SUCCESS;
    use windows::Win32::System::Registry::{HKEY_LOCAL_MACHINE, RRF_RT_REG_SZ, RegGetValueW};
    use windows::core::PCWSTR;

    let wide = |s: &str| -> Vec<u16> { OsStr::new(s).encode_wide().chain(Some(0)).collect() };
    let key = wide(key);
    let value = wide(value);

    let mut size: u32 = 0;
    // SAFETY: both name buffers are null-terminated and outlive the call;
    // a null data pointer asks only for the required size.
    let status = unsafe {
        RegGetValueW(
            HKEY_LOCAL_MACHINE,
            PCWSTR(key.as_ptr()),
            PCWSTR(value.as_ptr()),
            RRF_RT_REG_SZ,
            None,
            None,
            Some(&mut size as *mut u32),
        )
    };
    if status != ERROR_SUCCESS || size == 0 {
        return None;
    }

    let mut buffer = vec![0u16; (size as usize).div_ceil(2)];
    // SAFETY: `buffer` holds at least `size` bytes.
    let status = unsafe {
        RegGetValueW(
            HKEY_LOCAL_MACHINE,
            PCWSTR(key.as_ptr()),
            PCWSTR(value.as_ptr()),
            RRF_RT_REG_SZ,
            None,
            Some(buffer.as_mut_ptr() as *mut std::ffi::c_void),
            Some(&mut size as *mut u32),
        )
    };
    if status != ERROR_SUCCESS {
        return None;
    }

    let len = buffer.iter().position(|&c| c == 0).unwrap_or(buffer.len());
    Some(OsString::from_wide(&buffer[..len]).to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_install_path() {
        let locator = FixedInstallPath::new("/opt/steam");
        assert_eq!(locator.install_path(), Some(PathBuf::from("/opt/steam")));
        assert_eq!(FixedInstallPath::none().install_path(), None);
    }

    #[test]
    fn test_override_wins() {
        let locator = SteamInstall::new(Some(PathBuf::from("/srv/steam")));
        assert_eq!(locator.install_path(), Some(PathBuf::from("/srv/steam")));
    }
}
