// src/utils/registry.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::errors::RegistryError;

/// A typed registry value. Absence is expressed as `Option::None` at the call sites,
/// never as a sentinel variant, so "never existed" stays distinct from zero or empty.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum RegistryValue {
    Dword(u32),
    String(String),
    Binary(Vec<u8>),
}

/// Semantic type of a registry value.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, Serialize, Deserialize)]
pub enum ValueKind {
    #[strum(serialize = "REG_DWORD")]
    Dword,
    #[strum(serialize = "REG_SZ")]
    String,
    #[strum(serialize = "REG_BINARY")]
    Binary,
}

impl RegistryValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            RegistryValue::Dword(_) => ValueKind::Dword,
            RegistryValue::String(_) => ValueKind::String,
            RegistryValue::Binary(_) => ValueKind::Binary,
        }
    }

    /// Textual form used when comparing a read-back value with the intended one.
    pub fn as_text(&self) -> String {
        match self {
            RegistryValue::Dword(v) => v.to_string(),
            RegistryValue::String(s) => s.clone(),
            RegistryValue::Binary(bytes) => bytes.iter().map(|b| format!("{:02x}", b)).collect(),
        }
    }

    pub fn text_eq(&self, other: &RegistryValue) -> bool {
        self.as_text() == other.as_text()
    }
}

impl fmt::Display for RegistryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryValue::Dword(v) => write!(f, "Dword({})", v),
            RegistryValue::String(v) => write!(f, "String({})", v),
            RegistryValue::Binary(_) => write!(f, "Binary({})", self.as_text()),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Hive {
    LocalMachine,
    CurrentUser,
    Users,
    ClassesRoot,
    CurrentConfig,
}

impl Hive {
    pub fn short_name(&self) -> &'static str {
        match self {
            Hive::LocalMachine => "HKLM",
            Hive::CurrentUser => "HKCU",
            Hive::Users => "HKU",
            Hive::ClassesRoot => "HKCR",
            Hive::CurrentConfig => "HKCC",
        }
    }

    /// Writes outside the current user's hive need an elevated process.
    pub fn is_machine_wide(&self) -> bool {
        !matches!(self, Hive::CurrentUser)
    }
}

impl FromStr for Hive {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "HKLM" | "HKEY_LOCAL_MACHINE" => Ok(Hive::LocalMachine),
            "HKCU" | "HKEY_CURRENT_USER" => Ok(Hive::CurrentUser),
            "HKU" | "HKEY_USERS" => Ok(Hive::Users),
            "HKCR" | "HKEY_CLASSES_ROOT" => Ok(Hive::ClassesRoot),
            "HKCC" | "HKEY_CURRENT_CONFIG" => Ok(Hive::CurrentConfig),
            other => Err(RegistryError::UnsupportedHive(other.to_string())),
        }
    }
}

/// A registry key: hive plus subkey path.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct RegistryLocation {
    pub hive: Hive,
    pub subkey: String,
}

impl RegistryLocation {
    /// Parses `HIVE\Subkey\...`, accepting both the short (`HKLM`) and long
    /// (`HKEY_LOCAL_MACHINE`) hive spellings.
    pub fn parse(path: &str) -> Result<Self, RegistryError> {
        let (hive, subkey) = path.split_once('\\').ok_or_else(|| {
            RegistryError::InvalidPath(format!(
                "'{}'. Expected format 'HKEY_*\\Subkey\\...'",
                path
            ))
        })?;
        let subkey = subkey.trim_matches('\\');
        if subkey.is_empty() {
            return Err(RegistryError::InvalidPath(format!(
                "'{}' has no subkey",
                path
            )));
        }
        Ok(Self {
            hive: hive.parse()?,
            subkey: subkey.to_string(),
        })
    }

    /// Full path of a named value under this key, in canonical form.
    pub fn value_path(&self, name: &str) -> String {
        format!("{}\\{}", self, name)
    }
}

impl fmt::Display for RegistryLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\\{}", self.hive.short_name(), self.subkey)
    }
}

/// Access to named, typed values stored under hierarchical keys.
pub trait RegistryStore: Send + Sync {
    /// Returns `Ok(None)` when either the key or the value does not exist.
    fn read_value(
        &self,
        location: &RegistryLocation,
        name: &str,
    ) -> Result<Option<RegistryValue>, RegistryError>;

    /// Creates intermediate keys as needed.
    fn write_value(
        &self,
        location: &RegistryLocation,
        name: &str,
        value: &RegistryValue,
    ) -> Result<(), RegistryError>;

    /// Deleting a value that does not exist succeeds.
    fn delete_value(&self, location: &RegistryLocation, name: &str) -> Result<(), RegistryError>;
}

#[cfg(windows)]
pub use self::win::WinRegistry;

#[cfg(windows)]
mod win {
    use std::io::ErrorKind;

    use winreg::{
        enums::{
            RegType::{REG_BINARY, REG_DWORD, REG_EXPAND_SZ, REG_SZ},
            HKEY_CLASSES_ROOT, HKEY_CURRENT_CONFIG, HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE,
            HKEY_USERS, KEY_READ, KEY_WRITE,
        },
        RegKey, RegValue,
    };

    use super::{Hive, RegistryLocation, RegistryStore, RegistryValue};
    use crate::errors::RegistryError;

    /// `RegistryStore` backed by the live Windows registry.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct WinRegistry;

    fn root(hive: Hive) -> RegKey {
        RegKey::predef(match hive {
            Hive::LocalMachine => HKEY_LOCAL_MACHINE,
            Hive::CurrentUser => HKEY_CURRENT_USER,
            Hive::Users => HKEY_USERS,
            Hive::ClassesRoot => HKEY_CLASSES_ROOT,
            Hive::CurrentConfig => HKEY_CURRENT_CONFIG,
        })
    }

    fn decode_utf16(bytes: &[u8]) -> String {
        let wide: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
            .collect();
        String::from_utf16_lossy(&wide)
            .trim_end_matches('\0')
            .to_string()
    }

    impl RegistryStore for WinRegistry {
        fn read_value(
            &self,
            location: &RegistryLocation,
            name: &str,
        ) -> Result<Option<RegistryValue>, RegistryError> {
            let key = match root(location.hive).open_subkey_with_flags(&location.subkey, KEY_READ)
            {
                Ok(key) => key,
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
                Err(e) => {
                    return Err(RegistryError::KeyOpenError(format!("{}: {}", location, e)))
                }
            };

            let raw = match key.get_raw_value(name) {
                Ok(raw) => raw,
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
                Err(e) => {
                    return Err(RegistryError::ReadValueError(format!(
                        "{}: {}",
                        location.value_path(name),
                        e
                    )))
                }
            };

            match raw.vtype {
                REG_DWORD if raw.bytes.len() >= 4 => Ok(Some(RegistryValue::Dword(
                    u32::from_le_bytes([raw.bytes[0], raw.bytes[1], raw.bytes[2], raw.bytes[3]]),
                ))),
                REG_DWORD => Err(RegistryError::ReadValueError(format!(
                    "REG_DWORD data too small for '{}'",
                    location.value_path(name)
                ))),
                REG_SZ | REG_EXPAND_SZ => {
                    Ok(Some(RegistryValue::String(decode_utf16(&raw.bytes))))
                }
                REG_BINARY => Ok(Some(RegistryValue::Binary(raw.bytes))),
                other => Err(RegistryError::ReadValueError(format!(
                    "Unsupported registry value type {:?} at '{}'",
                    other,
                    location.value_path(name)
                ))),
            }
        }

        fn write_value(
            &self,
            location: &RegistryLocation,
            name: &str,
            value: &RegistryValue,
        ) -> Result<(), RegistryError> {
            let (key, _) = root(location.hive)
                .create_subkey(&location.subkey)
                .map_err(|e| RegistryError::KeyOpenError(format!("{}: {}", location, e)))?;

            let result = match value {
                RegistryValue::Dword(v) => key.set_value(name, v),
                RegistryValue::String(s) => key.set_raw_value(
                    name,
                    &RegValue {
                        bytes: s
                            .encode_utf16()
                            .chain(std::iter::once(0))
                            .flat_map(|c| c.to_le_bytes())
                            .collect(),
                        vtype: REG_SZ,
                    },
                ),
                RegistryValue::Binary(data) => key.set_raw_value(
                    name,
                    &RegValue {
                        bytes: data.clone(),
                        vtype: REG_BINARY,
                    },
                ),
            };

            result.map_err(|e| {
                RegistryError::SetValueError(format!(
                    "{} = {}: {}",
                    location.value_path(name),
                    value,
                    e
                ))
            })
        }

        fn delete_value(
            &self,
            location: &RegistryLocation,
            name: &str,
        ) -> Result<(), RegistryError> {
            let key = match root(location.hive).open_subkey_with_flags(&location.subkey, KEY_WRITE)
            {
                Ok(key) => key,
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
                Err(e) => {
                    return Err(RegistryError::KeyOpenError(format!("{}: {}", location, e)))
                }
            };

            match key.delete_value(name) {
                Ok(_) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(RegistryError::DeleteValueError(format!(
                    "{}: {}",
                    location.value_path(name),
                    e
                ))),
            }
        }
    }
}
