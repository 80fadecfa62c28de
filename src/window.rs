use crate::config::Config;
use crate::dx12::Dx12State;
use crate::gamepad;
use crate::input::{Action, InputTracker, KeyboardState};
use crate::patterns::{self, Pattern};
use crate::text::TextRenderer;
use anyhow::{Context, Result, bail};
use raw_window_handle::{HasWindowHandle, RawWindowHandle};
use std::time::Instant;
use tracing::{error, info};
use windows::Win32::Foundation::HWND;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Fullscreen, Window, WindowId};

struct App {
    config: Config,
    window: Option<Window>,
    dx12: Option<Dx12State>,
    pattern: Box<dyn Pattern>,
    text: TextRenderer,
    input: InputTracker,
    keyboard: KeyboardState,
    gamepad_connected: bool,
}

impl App {
    fn new(config: Config) -> Self {
        let pattern = patterns::create(&config);
        info!(pattern = pattern.name(), "Starting");
        Self {
            config,
            window: None,
            dx12: None,
            pattern,
            text: TextRenderer::new(),
            input: InputTracker::new(),
            keyboard: KeyboardState::default(),
            gamepad_connected: false,
        }
    }

    /// Returns false when the user asked to quit.
    fn process_input(&mut self) -> bool {
        let pad = gamepad::poll(self.config.gamepad_index);
        if pad.is_some() != self.gamepad_connected {
            self.gamepad_connected = pad.is_some();
            info!(index = self.config.gamepad_index, connected = self.gamepad_connected, "Gamepad");
        }

        let actions = self.input.update(
            Instant::now(),
            &self.keyboard,
            &pad.unwrap_or_default(),
            self.pattern.repeat(),
        );
        for action in actions {
            if action == Action::Quit {
                return false;
            }
            self.pattern.handle(action);
        }
        true
    }

    fn render(&mut self) -> Result<()> {
        let Some(dx12) = self.dx12.as_mut() else {
            return Ok(());
        };

        // Applies any pending resize, so read the size afterwards
        dx12.begin_frame()?;
        let (width, height) = dx12.size();

        // True black background
        dx12.clear_render_target([0.0, 0.0, 0.0, 1.0]);

        // Font atlas must be current before any label is drawn
        let textures_delta = self.text.begin_frame(width, height);
        dx12.update_font_texture(&textures_delta)?;

        let output = self.pattern.render(width, height);
        dx12.render_quads(&output.vertices);

        let text_vertices = self.text.layout(&output.labels, width, height);
        dx12.render_text(&text_vertices);

        dx12.end_frame()
    }

    /// Fullscreen borderless on the current monitor unless `--windowed`.
    fn open_window(&self, event_loop: &ActiveEventLoop) -> Result<(Window, Dx12State)> {
        let attributes = Window::default_attributes().with_title("HDR Calibration");
        let attributes = if self.config.windowed {
            attributes.with_inner_size(PhysicalSize::new(1920, 1080))
        } else {
            attributes.with_fullscreen(Some(Fullscreen::Borderless(None)))
        };

        let window = event_loop.create_window(attributes).context("creating window")?;
        if !self.config.windowed {
            window.set_cursor_visible(false);
        }

        let hwnd = match window.window_handle()?.as_raw() {
            RawWindowHandle::Win32(handle) => HWND(handle.hwnd.get() as *mut _),
            other => bail!("unsupported window handle {:?}", other),
        };

        let size = window.inner_size();
        let dx12 = Dx12State::new(hwnd, size.width, size.height).context("initializing Direct3D 12")?;
        Ok((window, dx12))
    }

    fn on_key(&mut self, key: &Key, pressed: bool) {
        match key {
            Key::Named(NamedKey::ArrowLeft) => self.keyboard.left = pressed,
            Key::Named(NamedKey::ArrowRight) => self.keyboard.right = pressed,
            Key::Named(NamedKey::Tab) => self.keyboard.mode = pressed,
            Key::Named(NamedKey::Space) => self.keyboard.outer = pressed,
            _ => {}
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        match self.open_window(event_loop) {
            Ok((window, dx12)) => {
                self.window = Some(window);
                self.dx12 = Some(dx12);
            }
            Err(e) => {
                error!("Startup failed: {:#}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(dx12) = &mut self.dx12 {
                    dx12.resize(size.width, size.height);
                }
            }
            WindowEvent::Focused(false) => {
                // Releases are not delivered while unfocused
                self.keyboard.clear();
            }
            WindowEvent::KeyboardInput {
                event: KeyEvent { logical_key, state, .. },
                ..
            } => {
                let pressed = state == ElementState::Pressed;
                if pressed && logical_key == Key::Named(NamedKey::Escape) {
                    event_loop.exit();
                    return;
                }
                self.on_key(&logical_key, pressed);
            }
            WindowEvent::RedrawRequested => {
                if !self.process_input() {
                    info!("Quit requested from gamepad");
                    event_loop.exit();
                    return;
                }
                if let Err(e) = self.render() {
                    error!("Render error: {:#}", e);
                    event_loop.exit();
                    return;
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

pub fn run(config: Config) -> Result<()> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    Ok(())
}
