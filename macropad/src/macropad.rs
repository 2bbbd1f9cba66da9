use embassy_time::{Duration, Instant, Timer};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_io_async::{Read, ReadReady, Write};

use crate::channel::{BATTERY_LEVEL, WIRELESS_WRITE_CHANNEL};
use crate::config::MacroPadConfig;
use crate::dispatcher::Dispatcher;
use crate::encoder::RotaryEncoder;
use crate::event::{EncoderEvent, KeyEvent};
use crate::host::{HostHandler, LiveSettings};
use crate::matrix::KeyMatrix;
use crate::transport::{GattChannel, SerialBridge, WirelessTransport};

/// The polling loop of the macro pad.
///
/// Each iteration drains the serial input and queued wireless writes, forwards a pending
/// battery level, scans the matrix once and polls the encoder once. Input events go to both
/// links, each link drops them while it is not ready.
pub struct MacroPad<
    'a,
    In: InputPin,
    Out: OutputPin,
    D: DelayNs,
    Btn: InputPin,
    R: Read + ReadReady,
    W: Write,
    G: GattChannel,
    H: HostHandler,
    const ROW: usize,
    const COL: usize,
> {
    matrix: KeyMatrix<In, Out, D, ROW, COL>,
    encoder: RotaryEncoder<'a, Btn>,
    serial: SerialBridge<'a, R, W, H>,
    wireless: Dispatcher<'a, WirelessTransport<G>, H>,
    scan_interval: Duration,
}

impl<
    'a,
    In: InputPin,
    Out: OutputPin,
    D: DelayNs,
    Btn: InputPin,
    R: Read + ReadReady,
    W: Write,
    G: GattChannel,
    H: HostHandler,
    const ROW: usize,
    const COL: usize,
> MacroPad<'a, In, Out, D, Btn, R, W, G, H, ROW, COL>
{
    /// Assemble the runner. Call [`MacroPad::apply_settings`] with the persisted settings
    /// before running.
    pub fn new(
        matrix: KeyMatrix<In, Out, D, ROW, COL>,
        encoder: RotaryEncoder<'a, Btn>,
        serial: SerialBridge<'a, R, W, H>,
        wireless: Dispatcher<'a, WirelessTransport<G>, H>,
        config: &MacroPadConfig,
    ) -> Self {
        Self {
            matrix,
            encoder,
            serial,
            wireless,
            scan_interval: config.scan_interval,
        }
    }

    pub fn matrix(&self) -> &KeyMatrix<In, Out, D, ROW, COL> {
        &self.matrix
    }

    pub fn encoder(&self) -> &RotaryEncoder<'a, Btn> {
        &self.encoder
    }

    pub fn serial(&mut self) -> &mut SerialBridge<'a, R, W, H> {
        &mut self.serial
    }

    pub fn wireless(&mut self) -> &mut Dispatcher<'a, WirelessTransport<G>, H> {
        &mut self.wireless
    }

    /// Push debounce and sensitivity into the running matrix and encoder
    pub fn apply_settings(&mut self, settings: LiveSettings) {
        info!(
            "Applying debounce {}ms, encoder sensitivity {}",
            settings.debounce.as_millis(),
            settings.encoder_sensitivity
        );
        self.matrix.set_debounce(settings.debounce);
        self.encoder.set_debounce(settings.debounce);
        self.encoder.set_sensitivity(settings.encoder_sensitivity);
    }

    /// Run the polling loop forever
    pub async fn run(&mut self) -> ! {
        info!("MacroPad running");
        loop {
            self.poll_once(Instant::now()).await;
            Timer::after(self.scan_interval).await;
        }
    }

    /// One iteration of the polling loop, sampling inputs as of `now`
    pub async fn poll_once(&mut self, now: Instant) {
        if let Some(settings) = self.serial.poll().await {
            self.apply_settings(settings);
        }

        while let Ok(write) = WIRELESS_WRITE_CHANNEL.try_receive() {
            if let Some(settings) = self
                .wireless
                .handle_characteristic_write(write.characteristic, &write.data)
                .await
            {
                self.apply_settings(settings);
            }
        }

        if let Some(level) = BATTERY_LEVEL.try_take() {
            self.serial.dispatcher().send_battery_level(level).await;
            self.wireless.send_battery_level(level).await;
        }

        for event in self.matrix.scan(now) {
            self.send_key_event(event).await;
        }

        let (rotation, button) = self.encoder.update(now);
        for event in [rotation, button].into_iter().flatten() {
            self.send_encoder_event(event).await;
        }
    }

    async fn send_key_event(&mut self, event: KeyEvent) {
        self.serial.dispatcher().send_key_event(event).await;
        self.wireless.send_key_event(event).await;
    }

    async fn send_encoder_event(&mut self, event: EncoderEvent) {
        self.serial.dispatcher().send_encoder_event(event).await;
        self.wireless.send_encoder_event(event).await;
    }
}
