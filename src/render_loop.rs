use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use anyhow::Result;
use log::warn;

use crate::scene::Scene;

type RenderCallback = Box<dyn FnMut(&mut Scene, Duration) -> Result<()>>;

/// Handle returned by [`RenderLoop::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

/// Callbacks invoked once per animation frame, in registration order.
///
/// A callback that fails (or panics) is reported and skipped for that frame
/// only; it stays registered.
#[derive(Default)]
pub struct RenderLoop {
    callbacks: Vec<(CallbackId, RenderCallback)>,
    next_id: u64,
    frames: u64,
}

impl RenderLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, callback: F) -> CallbackId
    where
        F: FnMut(&mut Scene, Duration) -> Result<()> + 'static,
    {
        let id = CallbackId(self.next_id);
        self.next_id += 1;
        self.callbacks.push((id, Box::new(callback)));
        id
    }

    pub fn unregister(&mut self, id: CallbackId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(registered, _)| *registered != id);
        self.callbacks.len() != before
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Frames run so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Runs every callback once and returns how many of them failed.
    pub fn run_frame(&mut self, scene: &mut Scene, elapsed: Duration) -> usize {
        self.frames += 1;
        let mut failures = 0;
        for (id, callback) in &mut self.callbacks {
            match panic::catch_unwind(AssertUnwindSafe(|| callback(scene, elapsed))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    failures += 1;
                    warn!("render callback {} failed: {err:#}", id.0);
                }
                Err(panic) => {
                    failures += 1;
                    warn!("render callback {} panicked: {}", id.0, panic_message(panic));
                }
            }
        }
        failures
    }
}

pub(crate) fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn failing_callbacks_stay_registered() {
        let mut render_loop = RenderLoop::new();
        let mut scene = Scene::new();
        let calls = Rc::new(Cell::new(0));

        render_loop.register(|_, _| Err(anyhow!("shader hiccup")));
        let counted = Rc::clone(&calls);
        render_loop.register(move |_, _| {
            counted.set(counted.get() + 1);
            Ok(())
        });

        assert_eq!(render_loop.run_frame(&mut scene, Duration::from_millis(16)), 1);
        assert_eq!(render_loop.run_frame(&mut scene, Duration::from_millis(16)), 1);
        assert_eq!(calls.get(), 2);
        assert_eq!(render_loop.len(), 2);
        assert_eq!(render_loop.frames(), 2);
    }

    #[test]
    fn panicking_callbacks_do_not_stop_the_loop() {
        let mut render_loop = RenderLoop::new();
        let mut scene = Scene::new();
        let calls = Rc::new(Cell::new(0));

        render_loop.register(|_, _| panic!("boom"));
        let counted = Rc::clone(&calls);
        render_loop.register(move |_, _| {
            counted.set(counted.get() + 1);
            Ok(())
        });

        assert_eq!(render_loop.run_frame(&mut scene, Duration::ZERO), 1);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn unregister_removes_only_that_callback() {
        let mut render_loop = RenderLoop::new();
        let first = render_loop.register(|_, _| Ok(()));
        let second = render_loop.register(|_, _| Ok(()));
        assert!(render_loop.unregister(first));
        assert!(!render_loop.unregister(first));
        assert_eq!(render_loop.len(), 1);
        assert!(render_loop.unregister(second));
        assert!(render_loop.is_empty());
    }

    #[test]
    fn callbacks_see_the_scene() {
        let mut render_loop = RenderLoop::new();
        let mut scene = Scene::new();
        let seen = Rc::new(Cell::new(usize::MAX));
        let recorder = Rc::clone(&seen);
        render_loop.register(move |scene, _| {
            recorder.set(scene.len());
            Ok(())
        });
        render_loop.run_frame(&mut scene, Duration::ZERO);
        assert_eq!(seen.get(), 0);
    }
}
