use crate::bridge::{map_key, AppEvent};
use anyhow::Result;
use crossbeam_channel::{Receiver, Sender};
use flashrig_core::FrameState;
use flashrig_experiment::Key;
use flashrig_render::{RenderOptions, SceneRenderer};
use pixels::{Pixels, SurfaceTexture};
use std::path::PathBuf;
use std::sync::Arc;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Fullscreen, Window, WindowId};

/// The stimulation window: receives frames from the sequencer thread and
/// forwards key presses back to it.
pub struct VisualApp {
    window: Option<Arc<Window>>,
    pixels: Option<Pixels<'static>>,
    renderer: Option<SceneRenderer>,
    latest: Option<FrameState>,
    frames: Receiver<FrameState>,
    keys: Sender<Key>,
    font_path: PathBuf,
    options: RenderOptions,
    should_exit: bool,
}

impl VisualApp {
    pub fn new(
        font_path: PathBuf,
        options: RenderOptions,
        frames: Receiver<FrameState>,
        keys: Sender<Key>,
    ) -> Self {
        Self {
            window: None,
            pixels: None,
            renderer: None,
            latest: None,
            frames,
            keys,
            font_path,
            options,
            should_exit: false,
        }
    }

    fn create_window_and_surface(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let primary_monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next());

        let window_attributes = Window::default_attributes()
            .with_title("flashrig")
            .with_fullscreen(Some(Fullscreen::Borderless(primary_monitor)))
            .with_resizable(false);

        let window = Arc::new(event_loop.create_window(window_attributes)?);
        let size = window.inner_size();
        log::info!(
            "display {}×{}, scale factor {:.2}",
            size.width,
            size.height,
            window.scale_factor()
        );

        let surface = SurfaceTexture::new(size.width, size.height, window.clone());
        self.pixels = Some(Pixels::new(size.width, size.height, surface)?);
        self.renderer = Some(SceneRenderer::new(
            size.width,
            size.height,
            &self.font_path,
            self.options.clone(),
        )?);

        window.set_cursor_visible(false);
        window.request_redraw();
        self.window = Some(window);
        Ok(())
    }

    fn drain_frames(&mut self) {
        while let Ok(frame) = self.frames.try_recv() {
            self.latest = Some(frame);
        }
    }

    fn render(&mut self) -> Result<()> {
        self.drain_frames();
        let (Some(pixels), Some(renderer)) = (self.pixels.as_mut(), self.renderer.as_mut())
        else {
            return Ok(());
        };
        if let Some(frame) = &self.latest {
            renderer.render_frame(frame, pixels.frame_mut())?;
            pixels.render()?;
        }
        Ok(())
    }

    fn handle_resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        if let Some(pixels) = &mut self.pixels {
            if let Err(e) = pixels.resize_surface(new_size.width, new_size.height) {
                log::warn!("cannot resize surface: {e}");
            }
            if let Err(e) = pixels.resize_buffer(new_size.width, new_size.height) {
                log::warn!("cannot resize buffer: {e}");
            }
        }
        if let Some(renderer) = &mut self.renderer {
            renderer.resize(new_size.width, new_size.height);
        }
    }
}

impl ApplicationHandler<AppEvent> for VisualApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.create_window_and_surface(event_loop) {
                log::error!("cannot create window and surface: {e}");
                event_loop.exit();
            }
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: AppEvent) {
        match event {
            AppEvent::Frame => {
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            AppEvent::Closed => {
                self.should_exit = true;
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                self.should_exit = true;
                event_loop.exit();
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.render() {
                    log::error!("render failed: {e}");
                    event_loop.exit();
                }
            }
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    if code == KeyCode::Escape {
                        self.should_exit = true;
                        event_loop.exit();
                        return;
                    }
                    let _ = self.keys.send(map_key(code));
                }
            }
            WindowEvent::Resized(size) => self.handle_resize(size),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_exit {
            event_loop.exit();
        }
    }
}
