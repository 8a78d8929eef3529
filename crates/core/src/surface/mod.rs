/// Pixel dimensions of the drawable area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Engine mesh resolution for a given cell size, never below one cell.
    pub fn mesh(&self, cell: u32) -> (u32, u32) {
        let cell = cell.max(1);
        ((self.width / cell).max(1), (self.height / cell).max(1))
    }
}

/// Keyboard commands the render loop understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    NextPreset,
    PreviousPreset,
}

/// Input observed while draining the window's event queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Quit,
    Key(KeyCommand),
    Resized(SurfaceSize),
}

/// The window plus its OpenGL context. Destroyed when dropped.
pub trait PresentationSurface {
    fn size(&self) -> SurfaceSize;

    /// Moves every pending input event into `events` without waiting.
    fn poll_events(&mut self, events: &mut Vec<InputEvent>);

    fn resize(&mut self, size: SurfaceSize);

    fn clear(&mut self);

    /// Swaps the back buffer to the screen.
    fn present(&mut self);
}
