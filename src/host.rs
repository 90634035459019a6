//! Local machine identity

/// NetBIOS name of the local machine, `localhost` if it cannot be determined
pub fn machine_name() -> String {
    platform_name()
        .or_else(|| std::env::var("COMPUTERNAME").ok())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

#[cfg(windows)]
fn platform_name() -> Option<String> {
    use windows::core::PWSTR;
    use windows::Win32::System::SystemInformation::{ComputerNameNetBIOS, GetComputerNameExW};

    let mut buf = [0u16; 256];
    let mut len = buf.len() as u32;
    unsafe {
        if let Err(e) = GetComputerNameExW(ComputerNameNetBIOS, PWSTR(buf.as_mut_ptr()), &mut len) {
            tracing::debug!("GetComputerNameExW failed: {}", e);
            return None;
        }
    }
    Some(String::from_utf16_lossy(&buf[..len as usize]))
}

#[cfg(not(windows))]
fn platform_name() -> Option<String> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_machine_name_not_empty() {
        assert!(!machine_name().is_empty());
    }
}
