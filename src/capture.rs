//! Audio device handling and fixed-size block delivery

use crate::constants::audio::{BLOCK_QUEUE_DEPTH, BUFFER_SIZE, PREFERRED_SAMPLE_RATE};
use crate::error::{AppError, AppResult};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tokio::sync::mpsc::{self, error::TrySendError};

/// Audio configuration and device information
#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub device_name: String,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Names of every available input device
pub fn list_input_devices() -> AppResult<Vec<String>> {
    let host = cpal::default_host();
    Ok(host.input_devices()?.filter_map(|d| d.name().ok()).collect())
}

/// Find and configure an audio input device
pub fn setup_audio_device(device_name: Option<&str>) -> AppResult<(cpal::Device, AudioConfig)> {
    let host = cpal::default_host();

    let device = if let Some(name) = device_name {
        host.input_devices()?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| AppError::AudioDevice(format!("Device '{}' not found", name)))?
    } else {
        host.default_input_device()
            .ok_or_else(|| AppError::AudioDevice("No default input device available".to_string()))?
    };

    let device_name = device.name()?;

    let mut supported_configs = device.supported_input_configs()?;
    let config_range = supported_configs
        .next()
        .ok_or_else(|| AppError::AudioDevice("No supported input configs found".to_string()))?;

    let sample_rate = if config_range.min_sample_rate().0 <= PREFERRED_SAMPLE_RATE
        && config_range.max_sample_rate().0 >= PREFERRED_SAMPLE_RATE
    {
        PREFERRED_SAMPLE_RATE
    } else {
        config_range.min_sample_rate().0
    };

    let audio_config = AudioConfig {
        device_name,
        sample_rate,
        channels: config_range.channels().max(1),
    };

    Ok((device, audio_config))
}

/// Readings per second produced by blocks of `block_size` samples
pub fn cadence(sample_rate: u32, block_size: usize) -> f64 {
    f64::from(sample_rate) / block_size as f64
}

/// Collects interleaved callback data into fixed-size mono blocks
pub struct BlockAssembler {
    block_size: usize,
    channels: usize,
    pending: Vec<f32>,
}

impl BlockAssembler {
    pub fn new(block_size: usize, channels: u16) -> Self {
        Self {
            block_size,
            channels: usize::from(channels.max(1)),
            pending: Vec::with_capacity(block_size),
        }
    }

    /// Downmix `data` to mono and hand every completed block to `emit`.
    /// A trailing partial frame is ignored.
    pub fn push(&mut self, data: &[f32], mut emit: impl FnMut(Vec<f32>)) {
        for frame in data.chunks_exact(self.channels) {
            let mono = frame.iter().sum::<f32>() / self.channels as f32;
            self.pending.push(mono);
            if self.pending.len() == self.block_size {
                let block = std::mem::replace(&mut self.pending, Vec::with_capacity(self.block_size));
                emit(block);
            }
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

/// Forward a completed block without waiting; returns whether it was queued.
///
/// A full queue means the processor is still busy, so the new block is
/// dropped. A closed queue means capture is shutting down.
pub fn deliver(sender: &mpsc::Sender<Vec<f32>>, block: Vec<f32>) -> bool {
    match sender.try_send(block) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            log::warn!("processor busy, dropped newest audio block");
            false
        }
        Err(TrySendError::Closed(_)) => false,
    }
}

/// Audio callback that assembles blocks and queues them for processing
pub fn create_audio_callback(
    mut assembler: BlockAssembler,
    sender: mpsc::Sender<Vec<f32>>,
) -> impl FnMut(&[f32], &cpal::InputCallbackInfo) + Send + 'static {
    move |data: &[f32], _: &cpal::InputCallbackInfo| {
        assembler.push(data, |block| {
            deliver(&sender, block);
        });
    }
}

/// Build an audio input stream with the given callback
pub fn build_audio_stream<F>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    data_callback: F,
) -> AppResult<cpal::Stream>
where
    F: FnMut(&[f32], &cpal::InputCallbackInfo) + Send + 'static,
{
    let stream = device.build_input_stream(
        config,
        data_callback,
        |err| log::error!("Audio stream error: {}", err),
        None,
    )?;

    Ok(stream)
}

/// Bounded queue between the audio callback and the processor
pub fn block_channel() -> (mpsc::Sender<Vec<f32>>, mpsc::Receiver<Vec<f32>>) {
    mpsc::channel(BLOCK_QUEUE_DEPTH)
}

/// A running capture stream. Dropping it stops block delivery.
pub struct Capture {
    _stream: cpal::Stream,
    config: AudioConfig,
    cadence: f64,
}

impl Capture {
    /// Open the device and start delivering `block_size`-sample blocks to `sender`
    pub fn start(
        device_name: Option<&str>,
        block_size: usize,
        sender: mpsc::Sender<Vec<f32>>,
    ) -> AppResult<Self> {
        let (device, config) = setup_audio_device(device_name)?;
        let stream_config = cpal::StreamConfig {
            channels: config.channels,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: BUFFER_SIZE,
        };

        let assembler = BlockAssembler::new(block_size, config.channels);
        let stream = build_audio_stream(&device, &stream_config, create_audio_callback(assembler, sender))?;
        stream.play()?;

        let cadence = cadence(config.sample_rate, block_size);
        log::info!(
            "capturing from '{}' at {} Hz, {} channel(s), {:.2} readings/s",
            config.device_name,
            config.sample_rate,
            config.channels,
            cadence
        );

        Ok(Self {
            _stream: stream,
            config,
            cadence,
        })
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    pub fn cadence(&self) -> f64 {
        self.cadence
    }
}

impl Drop for Capture {
    fn drop(&mut self) {
        log::info!("capture from '{}' stopped", self.config.device_name);
    }
}
