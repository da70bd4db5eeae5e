use std::{fs::File, io::BufReader, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::{Error, InternalResult};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RecorderConfig {
    #[serde(default)]
    pub dispatch: DispatchMode,
}

/// Where finished records are handed to the persistence handler.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// On the calling task, awaited before the wrapped call returns.
    #[default]
    Inline,
    /// Fire-and-forget through the background worker task.
    Background,
}

impl RecorderConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> InternalResult<Self> {
        let file = File::open(path).map_err(Error::config)?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).map_err(Error::config)
    }
}
