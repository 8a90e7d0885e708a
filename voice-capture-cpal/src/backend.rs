use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};

use voice_capture_core::{
    CaptureBackend, CaptureError, CaptureSettings, CaptureStream, InputDevice, SampleFormat,
};

/// Upper bound on one `read_block` wait when no data is buffered.
const READ_WAIT: Duration = Duration::from_millis(100);

/// How long `open` waits for the driver thread's handshake.
const OPEN_TIMEOUT: Duration = Duration::from_secs(2);

/// Buffered callback deliveries before backpressure drops one.
const CHANNEL_CAPACITY: usize = 64;

const DRIVER_POLL: Duration = Duration::from_millis(50);

/// Capture backend over the default cpal host.
///
/// One continuous input stream per session; the stream stays open from
/// `open` until the handle's `close`.
#[derive(Debug, Default)]
pub struct CpalBackend;

impl CpalBackend {
    pub fn new() -> Self {
        Self
    }
}

impl CaptureBackend for CpalBackend {
    fn list_input_devices(&self) -> Result<Vec<InputDevice>, CaptureError> {
        crate::enumerator::enumerate_input_devices()
    }

    fn open(&mut self, settings: &CaptureSettings) -> Result<Box<dyn CaptureStream>, CaptureError> {
        CpalStream::open(settings).map(|s| Box::new(s) as Box<dyn CaptureStream>)
    }
}

/// Handle to an open cpal input stream.
///
/// Sample bytes arrive from the driver thread in whatever buffer sizes
/// the device delivers; `read_block` re-chunks them into exact
/// `chunk_size × channels × sample-width` blocks.
pub struct CpalStream {
    data_rx: Receiver<Vec<u8>>,
    pending: Vec<u8>,
    block_bytes: usize,
    shutdown: Arc<AtomicBool>,
    driver: Option<thread::JoinHandle<()>>,
}

impl CpalStream {
    fn open(settings: &CaptureSettings) -> Result<Self, CaptureError> {
        let (data_tx, data_rx) = bounded::<Vec<u8>>(CHANNEL_CAPACITY);
        let (ready_tx, ready_rx) = bounded::<Result<(), CaptureError>>(1);
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = Arc::clone(&shutdown);
        let driver_settings = settings.clone();

        // cpal streams are not Send; the driver thread owns the stream
        // for the whole session.
        let driver = thread::Builder::new()
            .name("cpal-capture-driver".into())
            .spawn(move || drive_stream(driver_settings, data_tx, ready_tx, shutdown_flag))
            .map_err(|e| {
                CaptureError::DeviceOpenError(format!("failed to spawn driver thread: {}", e))
            })?;

        match ready_rx.recv_timeout(OPEN_TIMEOUT) {
            Ok(Ok(())) => Ok(Self {
                data_rx,
                pending: Vec::new(),
                block_bytes: settings.block_bytes(),
                shutdown,
                driver: Some(driver),
            }),
            Ok(Err(e)) => {
                let _ = driver.join();
                Err(e)
            }
            Err(_) => {
                shutdown.store(true, Ordering::SeqCst);
                let _ = driver.join();
                Err(CaptureError::DeviceOpenError(
                    "timed out waiting for the input stream to open".into(),
                ))
            }
        }
    }
}

impl CaptureStream for CpalStream {
    fn read_block(&mut self) -> Result<Vec<u8>, CaptureError> {
        if let Some(block) = drain_block(&mut self.pending, self.block_bytes) {
            return Ok(block);
        }

        let deadline = Instant::now() + READ_WAIT;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(Vec::new());
            }
            match self.data_rx.recv_timeout(remaining) {
                Ok(bytes) => {
                    self.pending.extend_from_slice(&bytes);
                    if let Some(block) = drain_block(&mut self.pending, self.block_bytes) {
                        return Ok(block);
                    }
                }
                Err(RecvTimeoutError::Timeout) => return Ok(Vec::new()),
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(CaptureError::DeviceOpenError(
                        "input stream terminated unexpectedly".into(),
                    ));
                }
            }
        }
    }

    fn close(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.driver.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CpalStream {
    fn drop(&mut self) {
        self.close();
    }
}

/// Driver thread body: build and play the stream, report the outcome
/// through the handshake channel, then hold the stream alive until
/// shutdown.
fn drive_stream(
    settings: CaptureSettings,
    data_tx: Sender<Vec<u8>>,
    ready_tx: Sender<Result<(), CaptureError>>,
    shutdown: Arc<AtomicBool>,
) {
    let stream = match build_stream(&settings, data_tx) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(CaptureError::DeviceOpenError(e.to_string())));
        return;
    }
    let _ = ready_tx.send(Ok(()));

    while !shutdown.load(Ordering::SeqCst) {
        thread::sleep(DRIVER_POLL);
    }
    drop(stream);
    log::debug!("cpal capture driver stopped");
}

fn build_stream(
    settings: &CaptureSettings,
    data_tx: Sender<Vec<u8>>,
) -> Result<cpal::Stream, CaptureError> {
    let host = cpal::default_host();
    let device = match &settings.device {
        Some(name) => host
            .input_devices()
            .map_err(|e| CaptureError::DeviceOpenError(e.to_string()))?
            .find(|d| d.name().map(|n| &n == name).unwrap_or(false))
            .ok_or_else(|| {
                CaptureError::DeviceOpenError(format!("input device not found: {}", name))
            })?,
        None => host
            .default_input_device()
            .ok_or(CaptureError::NoDeviceFound)?,
    };

    let config = StreamConfig {
        channels: settings.channels,
        sample_rate: SampleRate(settings.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    match settings.sample_format {
        SampleFormat::Int16 => build_typed_stream::<i16>(&device, &config, data_tx),
        SampleFormat::Int32 => build_typed_stream::<i32>(&device, &config, data_tx),
        SampleFormat::Float32 => build_typed_stream::<f32>(&device, &config, data_tx),
        SampleFormat::Float64 => build_typed_stream::<f64>(&device, &config, data_tx),
    }
}

fn build_typed_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    data_tx: Sender<Vec<u8>>,
) -> Result<cpal::Stream, CaptureError>
where
    T: cpal::SizedSample + LeBytes,
{
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let mut bytes = Vec::with_capacity(data.len() * std::mem::size_of::<T>());
                for sample in data {
                    sample.extend_le(&mut bytes);
                }
                // The audio callback must never block; under
                // backpressure the buffer is dropped instead.
                if data_tx.try_send(bytes).is_err() {
                    log::warn!("capture channel full; dropping one audio buffer");
                }
            },
            |err| log::error!("audio stream error: {}", err),
            None,
        )
        .map_err(|e| CaptureError::DeviceOpenError(e.to_string()))
}

/// Little-endian serialization for the capture sample types.
trait LeBytes: Copy + Send + 'static {
    fn extend_le(&self, out: &mut Vec<u8>);
}

macro_rules! impl_le_bytes {
    ($($ty:ty),*) => {
        $(impl LeBytes for $ty {
            fn extend_le(&self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }
        })*
    };
}

impl_le_bytes!(i16, i32, f32, f64);

/// Split one exact block off the front of `pending`, if available.
fn drain_block(pending: &mut Vec<u8>, block_bytes: usize) -> Option<Vec<u8>> {
    if block_bytes == 0 || pending.len() < block_bytes {
        return None;
    }
    let rest = pending.split_off(block_bytes);
    Some(std::mem::replace(pending, rest))
}
