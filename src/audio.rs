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
use std::{fmt, sync::Arc};

use crate::config;

pub mod cpal;
pub mod mixer;
pub mod mock;
pub mod thread_priority;

pub use mixer::{ActiveVoice, AudioMixer};

/// Errors raised by output devices.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("no output device found with name {0}")]
    NotFound(String),

    #[error("device {0} has no usable output configuration")]
    NoOutputConfig(String),

    #[error("unsupported output sample format {0}")]
    UnsupportedFormat(String),

    #[error("the output stream has shut down")]
    Disconnected,

    #[error("the output device is suspended")]
    Suspended,

    #[error("unable to enumerate devices: {0}")]
    Devices(#[from] ::cpal::DevicesError),

    #[error("audio host unavailable: {0}")]
    HostUnavailable(#[from] ::cpal::HostUnavailable),

    #[error("unable to read device name: {0}")]
    DeviceName(#[from] ::cpal::DeviceNameError),

    #[error("unable to read device configurations: {0}")]
    SupportedConfigs(#[from] ::cpal::SupportedStreamConfigsError),

    #[error("unable to read default device configuration: {0}")]
    DefaultConfig(#[from] ::cpal::DefaultStreamConfigError),

    #[error("unable to build output stream: {0}")]
    BuildStream(#[from] ::cpal::BuildStreamError),

    #[error("unable to start output stream: {0}")]
    PlayStream(#[from] ::cpal::PlayStreamError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("mock device failure: {0}")]
    Mock(String),
}

/// An output device that voices are mixed into.
pub trait Device: fmt::Display + Send + Sync {
    /// The rate the device mixes at, in Hz.
    fn sample_rate(&self) -> u32;

    /// The number of output channels.
    fn channel_count(&self) -> u16;

    /// Returns true until the output stream has been started.
    fn is_suspended(&self) -> bool;

    /// Starts the output stream if it isn't running yet. Returns without waiting for
    /// the stream to open.
    fn resume(&self) -> Result<(), AudioError>;

    /// Sets the gain applied to everything the device plays. Takes effect on the next
    /// mixed block.
    fn set_master_gain(&self, gain: f32);

    fn master_gain(&self) -> f32;

    /// Hands a voice to the mixer. Fails while the device is suspended.
    fn play(&self, voice: ActiveVoice) -> Result<(), AudioError>;
}

/// Lists devices known to cpal.
pub fn list_devices() -> Result<Vec<Box<dyn Device>>, AudioError> {
    cpal::Device::list()
}

/// Gets the device named in the configuration. Names starting with "mock" produce a
/// device that mixes only when asked to.
pub fn get_device(config: &config::Audio) -> Result<Arc<dyn Device>, AudioError> {
    let device = config.device();
    if device.starts_with("mock") {
        return Ok(Arc::new(mock::Device::get(
            device,
            config.sample_rate(),
            config.channels(),
        )));
    };

    Ok(Arc::new(cpal::Device::get(config)?))
}
