mod app;
mod error;
mod logging;
mod projection;
mod renderer;
mod settings;
mod shader;
mod timing;

use app::{Signals, StopGuard, UserEvent};
use error::Error;
use settings::{Settings, SETTINGS_FILE};

use gfx_hal::window;
use log::{debug, error, info};
use std::process;
use std::sync::Arc;
use std::thread;
use winit::event::{ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};

/// Exit code when the render thread panics, matching the default panic status.
const PANIC_EXIT_CODE: i32 = 101;

fn main() {
    let settings = Settings::load(SETTINGS_FILE);
    logging::init(
        settings
            .as_ref()
            .ok()
            .and_then(|settings| settings.log_filter.as_deref()),
    );
    let settings = match settings {
        Ok(settings) => settings,
        Err(err) => exit_with_error(&Error::from(err)),
    };
    debug!("{:?}", settings);

    let event_loop = EventLoop::<UserEvent>::with_user_event();
    let wb = winit::window::WindowBuilder::new()
        .with_title(settings.display.title.clone())
        .with_inner_size(winit::dpi::Size::Physical(winit::dpi::PhysicalSize::new(
            settings.display.width,
            settings.display.height,
        )))
        .with_min_inner_size(winit::dpi::Size::Logical(winit::dpi::LogicalSize::new(
            64.0, 64.0,
        )));
    let window = match wb.build(&event_loop) {
        Ok(window) => window,
        Err(err) => exit_with_error(&Error::Display(err.to_string())),
    };

    let signals = Arc::new(Signals::default());
    let proxy = event_loop.create_proxy();
    let render_signals = Arc::clone(&signals);
    let handler = thread::Builder::new()
        .name("render".into())
        .spawn(move || {
            let _stopped = StopGuard::new(move || {
                if proxy.send_event(UserEvent::RenderStopped).is_err() {
                    debug!("event loop closed before the render thread stopped");
                }
            });
            app::run(&settings, window, &render_signals)
        });
    let mut handler = match handler {
        Ok(handler) => Some(handler),
        Err(err) => exit_with_error(&Error::Display(format!(
            "could not spawn render thread: {}",
            err
        ))),
    };

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Wait;
        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested
                | WindowEvent::KeyboardInput {
                    input:
                        KeyboardInput {
                            virtual_keycode: Some(VirtualKeyCode::Escape),
                            state: ElementState::Pressed,
                            ..
                        },
                    ..
                } => {
                    if !signals.close_requested() {
                        info!("close requested");
                    }
                    signals.request_close();
                }
                WindowEvent::Resized(size) => {
                    signals.request_resize(window::Extent2D {
                        width: size.width,
                        height: size.height,
                    });
                }
                _ => {}
            },
            Event::UserEvent(UserEvent::RenderStopped) => {
                let code = match handler.take().map(|handler| handler.join()) {
                    Some(Ok(Ok(()))) | None => 0,
                    Some(Ok(Err(err))) => {
                        report(&err);
                        err.exit_code()
                    }
                    Some(Err(_)) => {
                        error!("render thread panicked");
                        PANIC_EXIT_CODE
                    }
                };
                if code == 0 {
                    *control_flow = ControlFlow::Exit;
                } else {
                    process::exit(code);
                }
            }
            _ => {}
        }
    });
}

fn report(err: &Error) {
    error!("{}", err);
    error!("terminated with error code {}", err.exit_code());
}

fn exit_with_error(err: &Error) -> ! {
    report(err);
    process::exit(err.exit_code())
}
