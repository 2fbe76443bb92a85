use std::sync::Arc;

use crate::library::FrameLibrary;

/// Callback invoked with the new frame index after every navigation step.
pub type FrameChangedCallback = Box<dyn FnMut(usize) + Send>;

/// A cursor over the frames of a [`FrameLibrary`].
///
/// The current index always lies in `[0, frame_count)`. Stepping past either
/// end wraps around. On an empty library every operation is a no-op and the
/// index stays at 0.
pub struct FrameNavigator {
    current: usize,
    library: Arc<FrameLibrary>,
    listeners: Vec<FrameChangedCallback>,
}

impl FrameNavigator {
    /// Create a navigator positioned on the first frame of `library`.
    pub fn new(library: Arc<FrameLibrary>) -> Self {
        Self {
            current: 0,
            library,
            listeners: Vec::new(),
        }
    }

    /// Swap in a new library and go back to the first frame.
    pub fn set_library(&mut self, library: Arc<FrameLibrary>) {
        self.library = library;
        self.current = 0;
        if !self.library.is_empty() {
            self.notify();
        }
    }

    /// The library being navigated.
    pub fn library(&self) -> &Arc<FrameLibrary> {
        &self.library
    }

    /// Index of the current frame.
    pub fn current_frame(&self) -> usize {
        self.current
    }

    /// Number of frames that can be navigated.
    pub fn frame_count(&self) -> usize {
        self.library.frame_count()
    }

    /// Register a callback run after every navigation step.
    pub fn on_frame_changed<F>(&mut self, callback: F)
    where
        F: FnMut(usize) + Send + 'static,
    {
        self.listeners.push(Box::new(callback));
    }

    /// Go to frame `frame`.
    ///
    /// An index past the last frame wraps to the first one, a negative index
    /// wraps to the last one.
    pub fn go_to_frame(&mut self, frame: isize) -> usize {
        if let Some(index) = self.wrap(frame) {
            self.set_current(index);
        }
        self.current
    }

    /// Step to the next frame.
    pub fn next_frame(&mut self) -> usize {
        self.go_to_frame(self.current as isize + 1)
    }

    /// Step to the previous frame.
    pub fn previous_frame(&mut self) -> usize {
        self.go_to_frame(self.current as isize - 1)
    }

    /// Go to the next frame with valid tracking data.
    ///
    /// Stays on the current frame if no other frame is valid.
    pub fn next_valid_frame(&mut self) -> usize {
        self.scan(Direction::Forward, true)
    }

    /// Go to the previous frame with valid tracking data.
    pub fn previous_valid_frame(&mut self) -> usize {
        self.scan(Direction::Backward, true)
    }

    /// Go to the next frame with invalid tracking data.
    pub fn next_invalid_frame(&mut self) -> usize {
        self.scan(Direction::Forward, false)
    }

    /// Go to the previous frame with invalid tracking data.
    pub fn previous_invalid_frame(&mut self) -> usize {
        self.scan(Direction::Backward, false)
    }

    // one full loop over the library starting next to the current frame
    fn scan(&mut self, direction: Direction, valid: bool) -> usize {
        let n = self.frame_count();
        if n == 0 {
            return self.current;
        }
        let found = (1..=n)
            .map(|step| match direction {
                Direction::Forward => (self.current + step) % n,
                Direction::Backward => (self.current + n - step % n) % n,
            })
            .find(|&index| self.library.is_valid(index) == valid)
            .unwrap_or(self.current);
        self.set_current(found);
        self.current
    }

    fn wrap(&self, frame: isize) -> Option<usize> {
        let n = self.frame_count();
        if n == 0 {
            return None;
        }
        Some(match frame {
            f if f < 0 => n - 1,
            f if f as usize >= n => 0,
            f => f as usize,
        })
    }

    fn set_current(&mut self, index: usize) {
        self.current = index;
        log::debug!("Current frame {}/{}", self.current, self.frame_count());
        self.notify();
    }

    fn notify(&mut self) {
        let current = self.current;
        for listener in self.listeners.iter_mut() {
            listener(current);
        }
    }
}

impl Default for FrameNavigator {
    fn default() -> Self {
        Self::new(Arc::new(FrameLibrary::default()))
    }
}

impl std::fmt::Debug for FrameNavigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameNavigator")
            .field("current", &self.current)
            .field("frame_count", &self.frame_count())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Forward,
    Backward,
}
