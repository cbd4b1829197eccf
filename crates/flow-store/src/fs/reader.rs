use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::errors::{StoreErrKind, StoreError};

/// Serialization format of a definition file, by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Some(Format::Json),
            Some("yaml") | Some("yml") => Some(Format::Yaml),
            _ => None,
        }
    }
}

pub fn read_json<T>(path: &Path) -> Result<T, StoreError>
where
    T: for<'de> serde::Deserialize<'de>,
{
    let buf = read_bytes(path)?;
    serde_json::from_slice(&buf).map_err(|err| StoreError::corrupt(path.display().to_string(), err))
}

/// Decode a JSON or YAML definition file
pub fn read_definition<T>(path: &Path) -> Result<T, StoreError>
where
    T: for<'de> serde::Deserialize<'de>,
{
    let format = Format::from_path(path)
        .ok_or_else(|| StoreErrKind::UnsupportedFormat(path.display().to_string()))?;
    let buf = read_bytes(path)?;
    let decoded = match format {
        Format::Json => serde_json::from_slice(&buf).map_err(|err| err.to_string()),
        Format::Yaml => serde_yaml::from_slice(&buf).map_err(|err| err.to_string()),
    };
    decoded.map_err(|reason| StoreError::corrupt(path.display().to_string(), reason))
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, StoreError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    Ok(buf)
}
