// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use config::{Config, File};
use serde::Deserialize;

use super::error::ConfigError;
use crate::sample::NUM_PADS;
use crate::samples::BankEntry;

/// One pad of a bank file.
#[derive(Deserialize, Clone, Debug)]
pub struct Pad {
    /// The pad slot.
    index: usize,
    /// Path or file:// URI of the sample. Relative paths are relative to the bank file.
    file: String,
    /// The name shown on the pad. Defaults to the file name without its extension.
    name: Option<String>,
}

impl Pad {
    pub fn new(index: usize, file: &str, name: Option<&str>) -> Pad {
        Pad {
            index,
            file: file.to_string(),
            name: name.map(str::to_string),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    /// The display name of the pad.
    pub fn name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => Path::new(self.file.trim_start_matches("file://"))
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_else(|| self.file.clone()),
        }
    }
}

/// The configuration for a bank of pads.
#[derive(Deserialize, Clone, Debug)]
pub struct Bank {
    /// The bank name. Defaults to the file name.
    name: Option<String>,
    /// The pads.
    samples: Vec<Pad>,
    /// The directory the bank was read from.
    #[serde(skip)]
    base_path: PathBuf,
}

impl Bank {
    /// Creates a new bank configuration.
    pub fn new(name: &str, samples: Vec<Pad>) -> Bank {
        Bank {
            name: Some(name.to_string()),
            samples,
            base_path: PathBuf::from("."),
        }
    }

    /// Parse a bank from a YAML file and validate its pads.
    pub fn deserialize(path: &Path) -> Result<Bank, ConfigError> {
        let mut bank = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Bank>()?;
        bank.base_path = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        if bank.name.is_none() {
            bank.name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string());
        }
        bank.validate()?;
        Ok(bank)
    }

    /// Checks that every pad index is in range and used once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for pad in self.samples.iter() {
            if pad.index >= NUM_PADS {
                return Err(ConfigError::PadOutOfRange {
                    index: pad.index,
                    max: NUM_PADS - 1,
                });
            }
            if !seen.insert(pad.index) {
                return Err(ConfigError::DuplicatePad(pad.index));
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("bank")
    }

    pub fn samples(&self) -> &[Pad] {
        &self.samples
    }

    /// The directory relative sample paths are resolved against.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// The pads as load requests.
    pub fn entries(&self) -> Vec<BankEntry> {
        self.samples
            .iter()
            .map(|pad| BankEntry::new(pad.index, &pad.file, &pad.name()))
            .collect()
    }
}
