//! Dedicated worker thread for a platform pointer device.
//!
//! # Why a thread per device?
//!
//! Platform input handles are synchronous and frequently not `Send` (an X11
//! display, a CoreGraphics event source, an `Enigo` instance on some
//! platforms).  Instead of sharing them behind locks, each device is created
//! *on* its own OS thread and never leaves it.  Sessions talk to the thread
//! through a request queue and await a one-shot reply, which turns every
//! blocking OS call into a suspension point on the async side.
//!
//! The queue is single-consumer, so individual operations never overlap.  A
//! relative move is still two requests (read, then write), and other requests
//! may land between them; [`crate::application::SerializedBackend`] closes
//! that gap when enabled.
//!
//! # Initialisation
//!
//! [`DeviceWorker::spawn`] runs the device constructor on the new thread and
//! waits for it.  A constructor error (or panic) becomes
//! [`BackendError::Unavailable`], which is what the resolver expects from a
//! failed probe.  Once running, a panicking device call is reported as
//! [`BackendError::Operation`] and the thread keeps serving requests.

use std::panic::{self, AssertUnwindSafe};

use async_trait::async_trait;
use pointer_core::pointer::{BackendError, MouseButton, PointerBackend, Position};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// A synchronous pointer device owned by a worker thread.
pub trait PointerDevice {
    fn position(&mut self) -> Result<Position, BackendError>;
    fn move_to(&mut self, target: Position) -> Result<(), BackendError>;
    fn click(&mut self, button: MouseButton) -> Result<(), BackendError>;
}

type Reply<T> = oneshot::Sender<Result<T, BackendError>>;

/// Runs one device call, turning a panic into an operation error so the
/// worker thread (and with it the backend) survives.
fn guarded<T>(
    name: &str,
    call: impl FnOnce() -> Result<T, BackendError>,
) -> Result<T, BackendError> {
    panic::catch_unwind(AssertUnwindSafe(call)).unwrap_or_else(|_| {
        warn!("{name} device call panicked");
        Err(BackendError::Operation(format!("{name}: device call panicked")))
    })
}

enum Request {
    Position(Reply<Position>),
    MoveTo(Position, Reply<()>),
    Click(MouseButton, Reply<()>),
}

/// Async handle to a device running on its own thread.
///
/// Dropping the handle closes the queue and lets the thread exit.
pub struct DeviceWorker {
    name: &'static str,
    requests: mpsc::UnboundedSender<Request>,
}

impl DeviceWorker {
    /// Starts a worker thread, builds the device on it with `open`, and
    /// returns once the device is ready.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unavailable`] if the thread cannot be started
    /// or `open` fails or panics.
    pub async fn spawn<D, F>(name: &'static str, open: F) -> Result<Self, BackendError>
    where
        D: PointerDevice + 'static,
        F: FnOnce() -> Result<D, BackendError> + Send + 'static,
    {
        let (ready_tx, ready_rx) = oneshot::channel::<Result<(), BackendError>>();
        let (requests, mut queue) = mpsc::unbounded_channel::<Request>();

        std::thread::Builder::new()
            .name(format!("pointer-{name}"))
            .spawn(move || {
                let mut device = match open() {
                    Ok(device) => {
                        let _ = ready_tx.send(Ok(()));
                        device
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                while let Some(request) = queue.blocking_recv() {
                    // A dropped reply receiver just means the caller gave up.
                    match request {
                        Request::Position(reply) => {
                            let _ = reply.send(guarded(name, || device.position()));
                        }
                        Request::MoveTo(target, reply) => {
                            let _ = reply.send(guarded(name, || device.move_to(target)));
                        }
                        Request::Click(button, reply) => {
                            let _ = reply.send(guarded(name, || device.click(button)));
                        }
                    }
                }
                debug!("{name} worker thread exiting");
            })
            .map_err(|e| {
                BackendError::Unavailable(format!("cannot start {name} worker thread: {e}"))
            })?;

        ready_rx
            .await
            .map_err(|_| {
                BackendError::Unavailable(format!("{name} worker died during initialisation"))
            })??;

        Ok(Self { name, requests })
    }

    async fn call<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> Request,
    ) -> Result<T, BackendError> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(make(reply))
            .map_err(|_| BackendError::WorkerStopped)?;
        response.await.map_err(|_| BackendError::WorkerStopped)?
    }
}

#[async_trait]
impl PointerBackend for DeviceWorker {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn position(&self) -> Result<Position, BackendError> {
        self.call(Request::Position).await
    }

    async fn move_to(&self, target: Position) -> Result<(), BackendError> {
        self.call(|reply| Request::MoveTo(target, reply)).await
    }

    async fn click(&self, button: MouseButton) -> Result<(), BackendError> {
        self.call(|reply| Request::Click(button, reply)).await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;
    use std::sync::{Arc, Mutex};
    use tokio_test::assert_ok;

    /// Device that is deliberately `!Send` (holds an `Rc`) to prove the
    /// worker never moves it across threads.
    struct ThreadBoundDevice {
        _not_send: Rc<()>,
        pos: Position,
        log: Arc<Mutex<Vec<String>>>,
        refuse_clicks: bool,
    }

    impl PointerDevice for ThreadBoundDevice {
        fn position(&mut self) -> Result<Position, BackendError> {
            Ok(self.pos)
        }

        fn move_to(&mut self, target: Position) -> Result<(), BackendError> {
            self.pos = target;
            self.log.lock().unwrap().push(format!("move {target}"));
            Ok(())
        }

        fn click(&mut self, button: MouseButton) -> Result<(), BackendError> {
            if self.refuse_clicks {
                return Err(BackendError::Operation("synthetic input denied".into()));
            }
            self.log.lock().unwrap().push(format!("click {button:?}"));
            Ok(())
        }
    }

    async fn spawn_device(
        log: Arc<Mutex<Vec<String>>>,
        refuse_clicks: bool,
    ) -> Result<DeviceWorker, BackendError> {
        DeviceWorker::spawn("test", move || {
            Ok(ThreadBoundDevice {
                _not_send: Rc::new(()),
                pos: Position::new(10, 10),
                log,
                refuse_clicks,
            })
        })
        .await
    }

    #[tokio::test]
    async fn test_operations_reach_the_device_in_order() {
        // Arrange
        let log = Arc::new(Mutex::new(Vec::new()));
        let worker = spawn_device(Arc::clone(&log), false).await.unwrap();

        // Act
        let landed = worker.move_by(5, -3).await.unwrap();
        assert_ok!(worker.left_click().await);

        // Assert
        assert_eq!(landed, Position::new(15, 7));
        assert_eq!(worker.position().await.unwrap(), Position::new(15, 7));
        assert_eq!(*log.lock().unwrap(), vec!["move (15, 7)", "click Left"]);
    }

    #[tokio::test]
    async fn test_failed_open_is_unavailable() {
        let result = DeviceWorker::spawn("broken", || -> Result<ThreadBoundDevice, BackendError> {
            Err(BackendError::Unavailable("no display".into()))
        })
        .await;

        assert!(matches!(result, Err(BackendError::Unavailable(msg)) if msg == "no display"));
    }

    #[tokio::test]
    async fn test_panicking_open_is_unavailable() {
        let result = DeviceWorker::spawn("panicky", || -> Result<ThreadBoundDevice, BackendError> {
            panic!("library crashed")
        })
        .await;

        assert!(matches!(result, Err(BackendError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_operation_error_keeps_worker_alive() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let worker = spawn_device(Arc::clone(&log), true).await.unwrap();

        assert!(matches!(
            worker.right_click().await,
            Err(BackendError::Operation(_))
        ));
        assert_ok!(worker.move_to(Position::new(1, 2)).await);
        assert_eq!(worker.name(), "test");
    }

    /// Panics on the first click, like a native library hitting a bad state
    /// once, then behaves normally.
    struct GlitchyDevice {
        pos: Position,
        clicks_seen: usize,
    }

    impl PointerDevice for GlitchyDevice {
        fn position(&mut self) -> Result<Position, BackendError> {
            Ok(self.pos)
        }

        fn move_to(&mut self, target: Position) -> Result<(), BackendError> {
            self.pos = target;
            Ok(())
        }

        fn click(&mut self, _button: MouseButton) -> Result<(), BackendError> {
            self.clicks_seen += 1;
            if self.clicks_seen == 1 {
                panic!("driver hiccup");
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_panicking_operation_keeps_worker_alive() {
        // Arrange
        let worker = DeviceWorker::spawn("glitchy", || {
            Ok(GlitchyDevice {
                pos: Position::new(0, 0),
                clicks_seen: 0,
            })
        })
        .await
        .unwrap();

        // Act
        let first = worker.left_click().await;
        let moved = worker.move_by(1, 1).await;
        let second = worker.left_click().await;

        // Assert
        assert!(matches!(first, Err(BackendError::Operation(_))));
        assert_eq!(moved.unwrap(), Position::new(1, 1));
        assert_ok!(second);
    }
}
