//! usb2usb firmware entry point (RP2040).
//!
//! Core 0 services the USB device stack on the native controller.
//! Core 1 runs the bridge: it drains host events coming from the PIO
//! root port's host engine and re-encodes them onto the device
//! interface. Replay pacing blocks the bridge executor only - the
//! upstream interface keeps being serviced on core 0 throughout.
//!
//! The host engine itself (enumeration and interrupt scheduling on
//! the PIO port) is board bring-up: it feeds
//! `usb2usb::usb::host::on_*` from its polling loop and drains the
//! re-arm queue via `report_request_receiver()`.

#![no_std]
#![no_main]

use defmt_rtt as _;
use panic_probe as _;

use core::future::Future;
use core::ptr::addr_of_mut;

use defmt::info;
use embassy_executor::{Executor, Spawner};
use embassy_rp::multicore::{spawn_core1, Stack};
use embassy_rp::peripherals::USB;
use embassy_rp::usb::Driver;
use embassy_time::Timer;
use embassy_usb::UsbDevice;
use static_cell::StaticCell;

use usb2usb::bridge::replay::KeyPacer;
use usb2usb::bridge::Bridge;
use usb2usb::config;
use usb2usb::usb::hid_device::{self, UsbReportSink};
use usb2usb::usb::host::{self, ChannelHostPort};

static mut CORE1_STACK: Stack<4096> = Stack::new();
static EXECUTOR1: StaticCell<Executor> = StaticCell::new();

/// Inter-keystroke pacing on the embassy timer.
struct TimerPacer;

impl KeyPacer for TimerPacer {
    fn pause_ms(&mut self, millis: u64) -> impl Future<Output = ()> {
        Timer::after_millis(millis)
    }
}

type HostBridge = Bridge<UsbReportSink, TimerPacer, { config::LOG_CAPACITY }>;

#[embassy_executor::task]
async fn usb_device_task(device: UsbDevice<'static, Driver<'static, USB>>) -> ! {
    hid_device::run_usb_device(device).await
}

#[embassy_executor::task]
async fn bridge_task(mut bridge: HostBridge) -> ! {
    let mut port = ChannelHostPort;
    host::run_host_pump(&mut bridge, &mut port).await
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Default::default());
    info!("usb2usb starting");

    let usb = hid_device::init(p.USB);
    let sink = UsbReportSink::new(usb.keyboard_writer, usb.mouse_writer);
    let bridge = HostBridge::new(sink, TimerPacer);

    // Bridge on core 1, next to the host engine it consumes from.
    spawn_core1(
        p.CORE1,
        unsafe { &mut *addr_of_mut!(CORE1_STACK) },
        move || {
            let executor1 = EXECUTOR1.init(Executor::new());
            executor1.run(|spawner| spawner.must_spawn(bridge_task(bridge)));
        },
    );

    spawner.must_spawn(usb_device_task(usb.device));
}
