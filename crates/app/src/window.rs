//! Window and OpenGL context built with winit and glutin.

use std::{ffi::CString, num::NonZeroU32, time::Duration};

use glutin::{
    config::{Config, ConfigTemplateBuilder, GlConfig},
    context::{ContextAttributesBuilder, NotCurrentGlContext, PossiblyCurrentContext},
    display::{GetGlDisplay, GlDisplay},
    surface::{GlSurface, Surface, SwapInterval, WindowSurface},
};
use glutin_winit::{DisplayBuilder, GlWindow};
use live_visualiser_core::{
    InputEvent, KeyCommand, PresentationSurface, Result, SurfaceSize, VizError, WindowConfig,
};
use raw_window_handle::HasWindowHandle;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{Key, NamedKey},
    platform::pump_events::{EventLoopExtPumpEvents, PumpStatus},
    window::{Fullscreen, Window, WindowId},
};

/// Fullscreen window with a current GL context.
pub struct GlWindowSurface {
    // Context and surface go before the window they were created for.
    gl_context: PossiblyCurrentContext,
    gl_surface: Surface<WindowSurface>,
    window: Window,
    collector: EventCollector,
    event_loop: EventLoop<()>,
}

impl GlWindowSurface {
    pub fn open(config: &WindowConfig) -> Result<Self> {
        let event_loop = EventLoop::new()
            .map_err(|err| VizError::surface(format!("failed to create event loop: {err}")))?;

        let mut attributes = Window::default_attributes()
            .with_title(config.title.clone())
            .with_inner_size(PhysicalSize::new(config.width, config.height));
        if config.fullscreen {
            attributes = attributes.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }

        let template = ConfigTemplateBuilder::new().with_depth_size(24);
        let (window, gl_config) = DisplayBuilder::new()
            .with_window_attributes(Some(attributes))
            .build(&event_loop, template, pick_config)
            .map_err(|err| VizError::surface(format!("no usable GL display: {err}")))?;
        let window = window.ok_or_else(|| VizError::surface("window could not be created"))?;

        let raw_handle = window
            .window_handle()
            .map_err(|err| VizError::surface(format!("window handle unavailable: {err}")))?
            .as_raw();
        let display = gl_config.display();
        let context_attributes = ContextAttributesBuilder::new().build(Some(raw_handle));

        // SAFETY: the raw handle belongs to `window`, which outlives the
        // context because of the field order in `GlWindowSurface`.
        let not_current = unsafe { display.create_context(&gl_config, &context_attributes) }
            .map_err(|err| VizError::surface(format!("OpenGL context could not be created: {err}")))?;

        let surface_attributes = window
            .build_surface_attributes(Default::default())
            .map_err(|err| VizError::surface(format!("window surface attributes: {err}")))?;
        // SAFETY: as above, the window outlives the surface.
        let gl_surface = unsafe { display.create_window_surface(&gl_config, &surface_attributes) }
            .map_err(|err| VizError::surface(format!("window surface could not be created: {err}")))?;

        let gl_context = not_current
            .make_current(&gl_surface)
            .map_err(|err| VizError::surface(format!("context could not be made current: {err}")))?;

        if config.vsync {
            let interval = SwapInterval::Wait(NonZeroU32::MIN);
            if let Err(err) = gl_surface.set_swap_interval(&gl_context, interval) {
                tracing::warn!(%err, "unable to enable vsync");
            }
        }

        gl::load_with(|symbol| match CString::new(symbol) {
            Ok(symbol) => display.get_proc_address(symbol.as_c_str()).cast(),
            Err(_) => std::ptr::null(),
        });

        let size = window.inner_size();
        // SAFETY: the context was made current on this thread above.
        unsafe {
            gl::Viewport(0, 0, size.width as i32, size.height as i32);
            gl::ClearColor(0.0, 0.0, 0.0, 1.0);
        }
        tracing::info!(width = size.width, height = size.height, "window created");

        Ok(Self {
            gl_context,
            gl_surface,
            window,
            collector: EventCollector::default(),
            event_loop,
        })
    }
}

/// Prefers the config with the most samples.
///
/// The picker has to return a config, so it cannot report an empty set.
/// glutin's `find_configs` fails on an empty set first, and `open` maps that
/// failure to a surface error.
fn pick_config(configs: Box<dyn Iterator<Item = Config> + '_>) -> Config {
    configs
        .max_by_key(|config| config.num_samples())
        .expect("glutin only invokes the picker with at least one config")
}

impl PresentationSurface for GlWindowSurface {
    fn size(&self) -> SurfaceSize {
        let size = self.window.inner_size();
        SurfaceSize::new(size.width, size.height)
    }

    fn poll_events(&mut self, events: &mut Vec<InputEvent>) {
        let status = self
            .event_loop
            .pump_app_events(Some(Duration::ZERO), &mut self.collector);
        if let PumpStatus::Exit(code) = status {
            tracing::debug!(code, "event loop exited");
            self.collector.pending.push(InputEvent::Quit);
        }
        events.append(&mut self.collector.pending);
    }

    fn resize(&mut self, size: SurfaceSize) {
        let (Some(width), Some(height)) = (NonZeroU32::new(size.width), NonZeroU32::new(size.height))
        else {
            return;
        };
        self.gl_surface.resize(&self.gl_context, width, height);
        // SAFETY: the context is current on the render thread.
        unsafe {
            gl::Viewport(0, 0, size.width as i32, size.height as i32);
        }
    }

    fn clear(&mut self) {
        // SAFETY: the context is current on the render thread.
        unsafe {
            gl::Clear(gl::COLOR_BUFFER_BIT | gl::DEPTH_BUFFER_BIT);
        }
    }

    fn present(&mut self) {
        if let Err(err) = self.gl_surface.swap_buffers(&self.gl_context) {
            tracing::warn!(%err, "swap failed");
        }
    }
}

/// Translates winit events into the render loop's input events.
#[derive(Debug, Default)]
struct EventCollector {
    pending: Vec<InputEvent>,
}

impl ApplicationHandler for EventCollector {
    fn resumed(&mut self, _event_loop: &ActiveEventLoop) {}

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.pending.push(InputEvent::Quit),
            WindowEvent::Resized(size) => self
                .pending
                .push(InputEvent::Resized(SurfaceSize::new(size.width, size.height))),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        logical_key,
                        ..
                    },
                ..
            } => {
                if let Some(event) = map_key(&logical_key) {
                    self.pending.push(event);
                }
            }
            _ => {}
        }
    }
}

fn map_key(key: &Key) -> Option<InputEvent> {
    match key {
        Key::Named(NamedKey::ArrowRight) => Some(InputEvent::Key(KeyCommand::NextPreset)),
        Key::Named(NamedKey::ArrowLeft) => Some(InputEvent::Key(KeyCommand::PreviousPreset)),
        Key::Named(NamedKey::Escape) => Some(InputEvent::Quit),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrows_navigate_and_escape_quits() {
        assert_eq!(
            map_key(&Key::Named(NamedKey::ArrowRight)),
            Some(InputEvent::Key(KeyCommand::NextPreset))
        );
        assert_eq!(
            map_key(&Key::Named(NamedKey::ArrowLeft)),
            Some(InputEvent::Key(KeyCommand::PreviousPreset))
        );
        assert_eq!(map_key(&Key::Named(NamedKey::Escape)), Some(InputEvent::Quit));
        assert_eq!(map_key(&Key::Named(NamedKey::Space)), None);
    }
}
