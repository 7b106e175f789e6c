// src/utils/windows.rs

/// Reports whether the current process may perform machine-wide writes.
pub trait ElevationProbe: Send + Sync {
    fn is_elevated(&self) -> bool;
}

/// Probes the elevation of the running process token.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessElevation;

impl ElevationProbe for ProcessElevation {
    fn is_elevated(&self) -> bool {
        is_elevated()
    }
}

/// Checks if the current process is running with elevated (administrator) privileges.
///
/// # Returns
///
/// - `true` if the process token is elevated.
/// - `false` otherwise, including when the token cannot be queried.
#[cfg(windows)]
pub fn is_elevated() -> bool {
    use windows::Win32::{
        Foundation::{CloseHandle, HANDLE},
        Security::{GetTokenInformation, TokenElevation, TOKEN_ELEVATION, TOKEN_QUERY},
        System::Threading::{GetCurrentProcess, OpenProcessToken},
    };

    let mut handle = HANDLE::default();
    if unsafe { OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut handle) }.is_err() {
        tracing::debug!("Failed to open process token; assuming not elevated.");
        return false;
    }

    let mut elevation = TOKEN_ELEVATION::default();
    let size = std::mem::size_of::<TOKEN_ELEVATION>() as u32;
    let mut returned = 0u32;
    let queried = unsafe {
        GetTokenInformation(
            handle,
            TokenElevation,
            Some(&mut elevation as *mut _ as *mut _),
            size,
            &mut returned,
        )
    }
    .is_ok();

    let _ = unsafe { CloseHandle(handle) };

    queried && elevation.TokenIsElevated != 0
}

/// Elevation only exists on Windows; elsewhere every machine-wide write is refused.
#[cfg(not(windows))]
pub fn is_elevated() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_elevated() {
        let elevated = ProcessElevation.is_elevated();
        println!("Is elevated: {}", elevated);
        #[cfg(not(windows))]
        assert!(!elevated);
    }
}
