//! PDC Capture Firmware - Main Entry Point
//!
//! Hardware-only entry point for STM32H743ZI.

#![no_std]
#![no_main]

use capture_firmware::boot::{self, CONSOLE_POLL_MS};
use capture_firmware::capture::{CaptureInterrupts, Controller, ControllerConfig, CAPTURE_IRQS};
use capture_firmware::console::{self, Console, ConsoleSession, Control};
use capture_firmware::hal::{self, clear_exti_pending, MmioCapture, MmioDma, NvicLines};
use embassy_executor::Spawner;
use embassy_futures::select::{select, Either};
use embassy_stm32::usart::{BufferedInterruptHandler, BufferedUart, Config as UartConfig};
use embassy_stm32::wdg::IndependentWatchdog;
use embassy_stm32::{bind_interrupts, peripherals};
use embassy_time::Timer;
use platform::config::banner;
use platform::{CaptureConfig, EmbassyTick, InterruptLine, TickSource};
use static_cell::StaticCell;

// Panic handler
use panic_probe as _;
// Logging transport
use defmt_rtt as _;

type BoardController = Controller<MmioCapture, NvicLines, MmioDma, EmbassyTick>;

static CONTROLLER: StaticCell<BoardController> = StaticCell::new();
static UART_TX: StaticCell<[u8; 256]> = StaticCell::new();
static UART_RX: StaticCell<[u8; 256]> = StaticCell::new();

bind_interrupts!(struct Irqs {
    USART3 => BufferedInterruptHandler<peripherals::USART3>;
});

// Capture vectors. Each acknowledges its EXTI edge, then hands over to the
// attached controller.

#[allow(non_snake_case)]
#[no_mangle]
extern "C" fn EXTI0() {
    clear_exti_pending(InterruptLine::CaptureDataReady);
    CAPTURE_IRQS.dispatch(InterruptLine::CaptureDataReady);
}

#[allow(non_snake_case)]
#[no_mangle]
extern "C" fn EXTI1() {
    clear_exti_pending(InterruptLine::CaptureFrameEnd);
    CAPTURE_IRQS.dispatch(InterruptLine::CaptureFrameEnd);
}

#[allow(non_snake_case)]
#[no_mangle]
extern "C" fn EXTI2() {
    clear_exti_pending(InterruptLine::CaptureError);
    CAPTURE_IRQS.dispatch(InterruptLine::CaptureError);
}

#[allow(non_snake_case)]
#[no_mangle]
extern "C" fn EXTI3() {
    clear_exti_pending(InterruptLine::DmaTransferEnd);
    CAPTURE_IRQS.dispatch(InterruptLine::DmaTransferEnd);
}

async fn halt() -> ! {
    loop {
        Timer::after_secs(1).await;
    }
}

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    // Step 1: MPU before embassy_stm32::init() turns on the D-cache, so the
    // capture regions in AXI SRAM and SRAM1/2 are never cached.
    // See: capture_firmware::boot::BOOT_SEQUENCE_STEPS.
    if let Err(e) = boot::hardware::apply_mpu_config_from_peripherals() {
        defmt::error!("MPU configuration failed: {}", e);
        cortex_m::asm::udf();
    }

    defmt::info!("{=str} v{=str}", platform::config::APP_NAME, platform::config::APP_VERSION);
    let p = embassy_stm32::init(boot::build_embassy_config());

    let mut watchdog = IndependentWatchdog::new(p.IWDG1, boot::watchdog_timeout_us());
    watchdog.unleash();
    defmt::info!("IWDG armed: timeout={=u32}ms", boot::WATCHDOG_TIMEOUT_MS);

    // Capture controller, reachable from the EXTI vectors once attached.
    let controller: &'static BoardController = CONTROLLER.init(Controller::new(
        hal::capture_registers(),
        NvicLines,
        hal::capture_dma(),
        EmbassyTick,
        ControllerConfig::DEFAULT,
    ));
    if let Err(e) = controller.open(&CaptureConfig::vga_yuv422()) {
        defmt::error!("capture open failed: {}", e);
        halt().await;
    }
    CAPTURE_IRQS.attach(controller as &'static dyn CaptureInterrupts);
    defmt::info!("capture controller ready");

    // Console on USART3 (PD9 RX, PD8 TX: ST-LINK virtual COM port).
    let uart = BufferedUart::new(
        p.USART3,
        Irqs,
        p.PD9,
        p.PD8,
        UART_TX.init([0; 256]),
        UART_RX.init([0; 256]),
        UartConfig::default(),
    );
    let mut uart = match uart {
        Ok(uart) => uart,
        Err(_) => {
            defmt::error!("console UART configuration rejected");
            halt().await
        }
    };

    let mut session = ConsoleSession::new(Console::new(controller));
    session.greet(banner());

    loop {
        let now = EmbassyTick.now_ms();
        controller.update();

        let mut control = Control::Continue;
        let step = select(
            console::pump(&mut uart, &mut session, now),
            Timer::after_millis(CONSOLE_POLL_MS),
        )
        .await;
        if let Either::First(result) = step {
            match result {
                Ok(c) => control = c,
                Err(_) => defmt::warn!("console read failed"),
            }
        }

        if session.poll(EmbassyTick.now_ms()) == Control::SystemReset {
            control = Control::SystemReset;
        }
        if console::flush(&mut uart, &mut session).await.is_err() {
            defmt::warn!("console write failed");
        }
        watchdog.pet();

        if control == Control::SystemReset {
            defmt::info!("system reset requested");
            Timer::after_millis(CONSOLE_POLL_MS).await;
            cortex_m::peripheral::SCB::sys_reset();
        }
    }
}
