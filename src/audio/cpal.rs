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
use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use tracing::{error, info, span, Level};

use crate::audio::mixer::{ActiveVoice, AudioMixer};
use crate::audio::thread_priority::{
    callback_thread_priority, configure_audio_thread_priority, rt_audio_enabled,
};
use crate::audio::{AudioError, Device as AudioDevice};
use crate::config;

/// Frames mixed per producer iteration.
const BLOCK_FRAMES: usize = 256;

/// Single producer, single consumer ring of f32 samples.
struct CircularBuffer {
    /// Samples stored as their bit patterns.
    buffer: Box<[AtomicU32]>,
    /// Capacity (always a power of 2)
    capacity: usize,
    /// Read position (consumer)
    read_pos: AtomicUsize,
    /// Write position (producer)
    write_pos: AtomicUsize,
}

impl CircularBuffer {
    fn new(capacity: usize) -> Self {
        let capacity = capacity.next_power_of_two();
        Self {
            buffer: (0..capacity).map(|_| AtomicU32::new(0)).collect(),
            capacity,
            read_pos: AtomicUsize::new(0),
            write_pos: AtomicUsize::new(0),
        }
    }

    /// Get number of samples available to read
    #[inline]
    fn available(&self) -> usize {
        let write = self.write_pos.load(Ordering::Acquire);
        let read = self.read_pos.load(Ordering::Acquire);
        write.wrapping_sub(read) & (self.capacity - 1)
    }

    /// Get space available to write
    #[inline]
    fn space(&self) -> usize {
        self.capacity - self.available() - 1
    }

    /// Returns the number of samples actually written.
    fn write(&self, samples: &[f32]) -> usize {
        let to_write = self.space().min(samples.len());
        let write = self.write_pos.load(Ordering::Acquire);
        let mask = self.capacity - 1;
        for (i, sample) in samples.iter().take(to_write).enumerate() {
            self.buffer[(write + i) & mask].store(sample.to_bits(), Ordering::Relaxed);
        }
        self.write_pos
            .store((write + to_write) & mask, Ordering::Release);
        to_write
    }

    /// Returns the number of samples actually read.
    fn read(&self, output: &mut [f32]) -> usize {
        let to_read = self.available().min(output.len());
        let read = self.read_pos.load(Ordering::Acquire);
        let mask = self.capacity - 1;
        for (i, sample) in output.iter_mut().take(to_read).enumerate() {
            *sample = f32::from_bits(self.buffer[(read + i) & mask].load(Ordering::Relaxed));
        }
        self.read_pos.store((read + to_read) & mask, Ordering::Release);
        to_read
    }
}

/// A small wrapper around a cpal::Device. The output stream is not opened until the
/// device is resumed.
pub struct Device {
    /// The name of the device.
    name: String,
    /// The maximum number of channels the device supports.
    max_channels: u16,
    /// The host ID of the device.
    host_id: cpal::HostId,
    /// The underlying cpal device.
    device: cpal::Device,
    /// The mixer shared with the producer thread.
    mixer: AudioMixer,
    /// Channel for handing new voices to the producer thread.
    voice_tx: crossbeam_channel::Sender<ActiveVoice>,
    /// Receiving end, handed to the producer thread on resume.
    voice_rx: crossbeam_channel::Receiver<ActiveVoice>,
    /// The running output, if the device has been resumed.
    output: Mutex<Option<OutputManager>>,
}

/// Owns the threads that keep the output stream fed.
struct OutputManager {
    /// Cleared to stop both threads.
    running: Arc<AtomicBool>,
    /// Handle to the thread that owns the cpal stream.
    output_thread: Option<thread::JoinHandle<()>>,
    /// Handle to the producer thread (fills ring buffer).
    producer_thread: Option<thread::JoinHandle<()>>,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name,
            self.max_channels,
            self.host_id.name()
        )
    }
}

/// Reads from the ring and converts into the output sample type.
fn create_single_thread_callback<T: cpal::Sample + cpal::FromSample<f32>>(
    ring: Arc<CircularBuffer>,
) -> impl FnMut(&mut [T], &cpal::OutputCallbackInfo) + Send + 'static {
    let mut temp = Vec::new();
    move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
        temp.resize(data.len(), 0.0f32);
        let read = ring.read(&mut temp);

        // Zero-fill any shortfall
        temp[read..].fill(0.0);

        for (dst, &src) in data.iter_mut().zip(temp.iter()) {
            *dst = T::from_sample(src);
        }
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    ring: Arc<CircularBuffer>,
) -> Result<cpal::Stream, AudioError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let mut callback = create_single_thread_callback::<T>(ring);
    Ok(device.build_output_stream(
        config,
        move |data: &mut [T], info: &cpal::OutputCallbackInfo| callback(data, info),
        |err| error!(err = %err, "CPAL output stream error"),
        None,
    )?)
}

impl Drop for OutputManager {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(thread) = self.producer_thread.take() {
            let _ = thread.join();
        }
        if let Some(thread) = self.output_thread.take() {
            let _ = thread.join();
        }
    }
}

impl OutputManager {
    /// Starts the producer and output threads without waiting for the stream to open.
    /// If the stream fails to start both threads stop and every voice handed over is
    /// marked finished.
    fn start(
        device: cpal::Device,
        mixer: AudioMixer,
        voice_rx: crossbeam_channel::Receiver<ActiveVoice>,
    ) -> Result<OutputManager, AudioError> {
        let num_channels = mixer.num_channels();
        let sample_rate = mixer.sample_rate();
        let running = Arc::new(AtomicBool::new(true));

        // ~50ms of audio between the mixer and the callback.
        let capacity_samples = (sample_rate as usize * num_channels as usize) / 20;
        let ring = Arc::new(CircularBuffer::new(capacity_samples.max(1024)));

        let producer_thread = {
            let running = running.clone();
            let ring = ring.clone();
            thread::Builder::new()
                .name("padtrim-mixer".to_string())
                .spawn(move || {
                    let mut priority_set = false;
                    if let Some(priority) = callback_thread_priority() {
                        configure_audio_thread_priority(
                            priority,
                            rt_audio_enabled(),
                            &mut priority_set,
                        );
                    }

                    let block_samples = BLOCK_FRAMES * num_channels as usize;
                    let mut scratch = vec![0.0f32; block_samples];
                    while running.load(Ordering::Acquire) {
                        while let Ok(voice) = voice_rx.try_recv() {
                            mixer.add_voice(voice);
                        }

                        if ring.space() >= block_samples {
                            mixer.process_into_output(&mut scratch, BLOCK_FRAMES);
                            ring.write(&scratch);
                        } else {
                            thread::sleep(Duration::from_micros(500));
                        }
                    }
                    mixer.clear();
                    release_pending(&voice_rx);
                })?
        };

        // Dropping the manager stops the producer if the output thread can't start.
        let mut manager = OutputManager {
            running: running.clone(),
            output_thread: None,
            producer_thread: Some(producer_thread),
        };

        manager.output_thread = Some(
            thread::Builder::new()
                .name("padtrim-output".to_string())
                .spawn(move || {
                    let config = cpal::StreamConfig {
                        channels: num_channels,
                        sample_rate: cpal::SampleRate(sample_rate),
                        buffer_size: cpal::BufferSize::Default,
                    };

                    let stream = device
                        .default_output_config()
                        .map_err(AudioError::from)
                        .and_then(|default| match default.sample_format() {
                            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, ring),
                            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, ring),
                            cpal::SampleFormat::I32 => build_stream::<i32>(&device, &config, ring),
                            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, ring),
                            other => Err(AudioError::UnsupportedFormat(format!("{other:?}"))),
                        })
                        .and_then(|stream| {
                            stream.play()?;
                            Ok(stream)
                        });

                    match stream {
                        Ok(_stream) => {
                            info!("CPAL output stream started");
                            // The stream stops when it is dropped at the end of this scope.
                            while running.load(Ordering::Acquire) {
                                thread::sleep(Duration::from_millis(50));
                            }
                        }
                        Err(e) => {
                            error!(err = %e, "Unable to start output stream");
                            running.store(false, Ordering::Release);
                        }
                    }
                })?,
        );

        Ok(manager)
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Marks every voice still waiting for a producer as finished.
fn release_pending(voice_rx: &crossbeam_channel::Receiver<ActiveVoice>) {
    while let Ok(voice) = voice_rx.try_recv() {
        voice.finish();
    }
}

impl Device {
    /// Lists cpal devices and produces the Device trait.
    pub fn list() -> Result<Vec<Box<dyn AudioDevice>>, AudioError> {
        Ok(Device::list_cpal_devices()?
            .into_iter()
            .map(|device| {
                let device: Box<dyn AudioDevice> = Box::new(device);
                device
            })
            .collect())
    }

    fn new(
        name: String,
        host_id: cpal::HostId,
        device: cpal::Device,
        max_channels: u16,
        channels: u16,
        sample_rate: u32,
    ) -> Device {
        let (voice_tx, voice_rx) = crossbeam_channel::unbounded();
        Device {
            name,
            max_channels,
            host_id,
            device,
            mixer: AudioMixer::new(channels.min(max_channels).max(1), sample_rate),
            voice_tx,
            voice_rx,
            output: Mutex::new(None),
        }
    }

    fn max_output_channels(device: &cpal::Device) -> Result<u16, AudioError> {
        Ok(device
            .supported_output_configs()?
            .map(|config| config.channels())
            .max()
            .unwrap_or(0))
    }

    /// Lists cpal devices.
    fn list_cpal_devices() -> Result<Vec<Device>, AudioError> {
        // Suppress noisy output here.
        let _shh_stdout = shh::stdout()?;
        let _shh_stderr = shh::stderr()?;

        let mut devices: Vec<Device> = Vec::new();
        for host_id in cpal::available_hosts() {
            let host_devices = match cpal::host_from_id(host_id)?.devices() {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            for device in host_devices {
                let max_channels = match Device::max_output_channels(&device) {
                    Ok(max_channels) => max_channels,
                    Err(_) => continue,
                };

                if max_channels > 0 {
                    let name = device.name()?;
                    devices.push(Device::new(
                        name,
                        host_id,
                        device,
                        max_channels,
                        max_channels,
                        config::DEFAULT_SAMPLE_RATE,
                    ));
                }
            }
        }

        devices.sort_by_key(|device| device.name.to_string());
        Ok(devices)
    }

    /// Gets the given cpal device. The name "default" picks the default host's default
    /// output device.
    pub fn get(config: &config::Audio) -> Result<Device, AudioError> {
        let span = span!(Level::INFO, "get device (cpal)");
        let _enter = span.enter();

        let name = config.device();
        if name == "default" {
            let host = cpal::default_host();
            let device = host
                .default_output_device()
                .ok_or_else(|| AudioError::NotFound(name.to_string()))?;
            let max_channels = Device::max_output_channels(&device)?;
            if max_channels == 0 {
                return Err(AudioError::NoOutputConfig(name.to_string()));
            }
            let device = Device::new(
                device.name()?,
                host.id(),
                device,
                max_channels,
                config.channels(),
                config.sample_rate(),
            );
            info!(device = %device, "Using default output device");
            return Ok(device);
        }

        match Device::list_cpal_devices()?
            .into_iter()
            .find(|device| device.name.trim() == name)
        {
            Some(device) => {
                let device = Device::new(
                    device.name,
                    device.host_id,
                    device.device,
                    device.max_channels,
                    config.channels(),
                    config.sample_rate(),
                );
                info!(device = %device, "Using output device");
                Ok(device)
            }
            None => Err(AudioError::NotFound(name.to_string())),
        }
    }
}

impl AudioDevice for Device {
    fn sample_rate(&self) -> u32 {
        self.mixer.sample_rate()
    }

    fn channel_count(&self) -> u16 {
        self.mixer.num_channels()
    }

    fn is_suspended(&self) -> bool {
        self.output
            .lock()
            .as_ref()
            .map_or(true, |output| !output.is_running())
    }

    fn resume(&self) -> Result<(), AudioError> {
        let mut output = self.output.lock();
        if output.as_ref().is_some_and(OutputManager::is_running) {
            return Ok(());
        }

        // Tear down an output whose stream failed before starting over.
        output.take();
        info!(device = self.name, "Starting output stream");
        *output = Some(OutputManager::start(
            self.device.clone(),
            self.mixer.clone(),
            self.voice_rx.clone(),
        )?);
        Ok(())
    }

    fn set_master_gain(&self, gain: f32) {
        self.mixer.set_master_gain(gain);
    }

    fn master_gain(&self) -> f32 {
        self.mixer.master_gain()
    }

    fn play(&self, voice: ActiveVoice) -> Result<(), AudioError> {
        if self.is_suspended() {
            return Err(AudioError::Suspended);
        }
        self.voice_tx
            .send(voice)
            .map_err(|_| AudioError::Disconnected)?;

        // The stream may have failed after the check, with its producer already gone.
        if self.is_suspended() {
            release_pending(&self.voice_rx);
        }
        Ok(())
    }
}
