//! USB HID composite device - keyboard + mouse.
//!
//! Initialises the Embassy USB stack on the RP2040's native USB
//! peripheral, exposes the two HID endpoints and implements the
//! bridge's [`ReportSink`] over them.

use core::future::Future;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::bridge::output::ReportSink;
use crate::config;
use crate::error::SinkError;
use crate::hid::keyboard::KEYBOARD_REPORT_DESCRIPTOR;
use crate::hid::mouse::MOUSE_REPORT_DESCRIPTOR;
use crate::hid::HidReport;
use defmt::{info, warn};
use embassy_rp::bind_interrupts;
use embassy_rp::peripherals::USB;
use embassy_rp::usb::{Driver, InterruptHandler};
use embassy_usb::class::hid::{Config as HidConfig, HidWriter, ReportId, RequestHandler, State};
use embassy_usb::control::OutResponse;
use embassy_usb::{Builder, Config, UsbDevice};
use static_cell::StaticCell;

bind_interrupts!(struct Irqs {
    USBCTRL_IRQ => InterruptHandler<USB>;
});

static KB_STATE: StaticCell<State> = StaticCell::new();
static MOUSE_STATE: StaticCell<State> = StaticCell::new();
static USB_CONFIG_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_BOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_MSOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_CTRL_BUF: StaticCell<[u8; 128]> = StaticCell::new();
static USB_STATE_HANDLER: StaticCell<UsbStateHandler> = StaticCell::new();
static KB_REQUEST_HANDLER: StaticCell<KbRequestHandler> = StaticCell::new();

/// Tracked by the device-state handler; together they form the
/// "can I send a report now" predicate.
static USB_CONFIGURED: AtomicBool = AtomicBool::new(false);
static USB_SUSPENDED: AtomicBool = AtomicBool::new(false);

struct UsbStateHandler;

impl embassy_usb::Handler for UsbStateHandler {
    fn configured(&mut self, configured: bool) {
        USB_CONFIGURED.store(configured, Ordering::Relaxed);
    }

    fn suspended(&mut self, suspended: bool) {
        USB_SUSPENDED.store(suspended, Ordering::Relaxed);
    }
}

/// Readiness of the upstream HID interface.
pub fn hid_ready() -> bool {
    USB_CONFIGURED.load(Ordering::Relaxed) && !USB_SUSPENDED.load(Ordering::Relaxed)
}

/// Output-report handler for the keyboard interface: the upstream
/// host pushes LED state (Caps Lock etc.) here. Accepted and ignored -
/// the bridge does not mirror LEDs onto the polled keyboard.
struct KbRequestHandler;

impl RequestHandler for KbRequestHandler {
    fn set_report(&mut self, _id: ReportId, _data: &[u8]) -> OutResponse {
        OutResponse::Accepted
    }
}

/// Build result containing the USB device runner and the HID writers.
pub struct UsbHidDevice {
    pub device: UsbDevice<'static, Driver<'static, USB>>,
    pub keyboard_writer: HidWriter<'static, Driver<'static, USB>, 8>,
    pub mouse_writer: HidWriter<'static, Driver<'static, USB>, 8>,
}

/// Initialise the USB stack and create the composite HID device.
///
/// Must be called exactly once. All static buffers are consumed here.
pub fn init(usb: USB) -> UsbHidDevice {
    let driver = Driver::new(usb, Irqs);

    // USB device-level configuration.
    let mut usb_config = Config::new(config::USB_VID, config::USB_PID);
    usb_config.manufacturer = Some(config::USB_MANUFACTURER);
    usb_config.product = Some(config::USB_PRODUCT);
    usb_config.serial_number = Some(config::USB_SERIAL_NUMBER);
    usb_config.max_power = 100; // mA
    usb_config.max_packet_size_0 = 64;

    // Allocate static descriptor buffers.
    let config_desc = USB_CONFIG_DESC.init([0u8; 256]);
    let bos_desc = USB_BOS_DESC.init([0u8; 256]);
    let msos_desc = USB_MSOS_DESC.init([0u8; 256]);
    let ctrl_buf = USB_CTRL_BUF.init([0u8; 128]);

    let mut builder = Builder::new(
        driver,
        usb_config,
        config_desc,
        bos_desc,
        msos_desc,
        ctrl_buf,
    );

    builder.handler(USB_STATE_HANDLER.init(UsbStateHandler));

    let kb_state = KB_STATE.init(State::new());
    let kb_config = HidConfig {
        report_descriptor: KEYBOARD_REPORT_DESCRIPTOR,
        request_handler: Some(KB_REQUEST_HANDLER.init(KbRequestHandler)),
        poll_ms: config::USB_HID_POLL_MS,
        max_packet_size: 8,
    };
    let keyboard_writer = HidWriter::new(&mut builder, kb_state, kb_config);

    let mouse_state = MOUSE_STATE.init(State::new());
    let mouse_config = HidConfig {
        report_descriptor: MOUSE_REPORT_DESCRIPTOR,
        request_handler: None,
        poll_ms: config::USB_HID_POLL_MS,
        max_packet_size: 8,
    };
    let mouse_writer = HidWriter::new(&mut builder, mouse_state, mouse_config);

    let device = builder.build();

    info!("USB HID composite device initialised (keyboard + mouse)");

    UsbHidDevice {
        device,
        keyboard_writer,
        mouse_writer,
    }
}

/// Run the USB device stack - must be spawned as a dedicated task.
///
/// Handles enumeration, suspend/resume and endpoint servicing.
pub async fn run_usb_device(mut device: UsbDevice<'static, Driver<'static, USB>>) -> ! {
    info!("USB device task started");
    device.run().await
}

/// [`ReportSink`] over the composite device's interrupt-IN endpoints.
///
/// `write` resolves when the transfer completes, so a completed send
/// doubles as the transmission-complete notification.
pub struct UsbReportSink {
    keyboard: HidWriter<'static, Driver<'static, USB>, 8>,
    mouse: HidWriter<'static, Driver<'static, USB>, 8>,
}

impl UsbReportSink {
    pub fn new(
        keyboard: HidWriter<'static, Driver<'static, USB>, 8>,
        mouse: HidWriter<'static, Driver<'static, USB>, 8>,
    ) -> Self {
        Self { keyboard, mouse }
    }
}

impl ReportSink for UsbReportSink {
    fn is_ready(&self) -> bool {
        hid_ready()
    }

    fn send(&mut self, report: &HidReport) -> impl Future<Output = Result<(), SinkError>> {
        let mut buf = [0u8; 8];
        let n = report.serialize(&mut buf);
        let writer = match report {
            HidReport::Keyboard(_) => &mut self.keyboard,
            HidReport::Mouse(_) => &mut self.mouse,
        };
        async move {
            writer.write(&buf[..n]).await.map_err(|_e| {
                warn!("USB HID write failed");
                SinkError::Io
            })
        }
    }
}
