//! Async widget driver
//!
//! Runs a widget on a single tokio task. Host interactions arrive over an
//! mpsc channel; deferred steps live in a `DelayQueue`, with the animation
//! frame modelled as a fixed frame interval. The task owns the widget, so no
//! locking is involved.

use crate::error::{Error, Result};
use crate::widget::{
    Deferral, RenderTarget, Scheduler, Task, TaskHandle, Widget, WidgetSnapshot,
};
use futures::StreamExt;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::time::delay_queue::{DelayQueue, Key};

const COMMAND_BUFFER: usize = 64;

/// `Scheduler` backed by tokio's timer wheel
#[derive(Debug)]
pub struct TimerQueue {
    queue: DelayQueue<(TaskHandle, Task)>,
    keys: HashMap<TaskHandle, Key>,
    next_id: u64,
    started: Instant,
    frame_interval: Duration,
}

impl TimerQueue {
    pub fn new(frame_interval: Duration) -> Self {
        Self {
            queue: DelayQueue::new(),
            keys: HashMap::new(),
            next_id: 0,
            started: Instant::now(),
            frame_interval,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Wait for the next task to fire. Returns `None` right away when
    /// nothing is scheduled.
    pub async fn expired(&mut self) -> Option<(TaskHandle, Task)> {
        let (handle, task) = self.queue.next().await?.into_inner();
        self.keys.remove(&handle);
        Some((handle, task))
    }
}

impl Scheduler for TimerQueue {
    fn schedule(&mut self, deferral: Deferral, task: Task) -> TaskHandle {
        let handle = TaskHandle::new(self.next_id);
        self.next_id += 1;
        let delay = match deferral {
            Deferral::NextFrame => self.frame_interval,
            Deferral::After(delay) => delay,
        };
        let key = self.queue.insert((handle, task), delay);
        self.keys.insert(handle, key);
        handle
    }

    fn cancel(&mut self, handle: TaskHandle) {
        if let Some(key) = self.keys.remove(&handle) {
            self.queue.try_remove(&key);
        }
    }

    fn now(&self) -> Duration {
        self.started.elapsed()
    }
}

#[derive(Debug)]
enum Command {
    Toggle,
    Open,
    Close,
    Deliver { origin: String, payload: Value },
    Snapshot(oneshot::Sender<WidgetSnapshot>),
}

enum Step {
    Command(Command),
    Fire(TaskHandle, Task),
    Shutdown,
}

/// Cloneable handle to a running widget
#[derive(Debug, Clone)]
pub struct WidgetHandle {
    commands: mpsc::Sender<Command>,
}

impl WidgetHandle {
    /// Button click
    pub async fn toggle(&self) -> Result<()> {
        self.send(Command::Toggle).await
    }

    pub async fn open(&self) -> Result<()> {
        self.send(Command::Open).await
    }

    pub async fn close(&self) -> Result<()> {
        self.send(Command::Close).await
    }

    /// Deliver a message as if posted by a window at `origin`
    pub async fn deliver(&self, origin: impl Into<String>, payload: Value) -> Result<()> {
        self.send(Command::Deliver {
            origin: origin.into(),
            payload,
        })
        .await
    }

    pub async fn snapshot(&self) -> Result<WidgetSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Snapshot(tx)).await?;
        rx.await
            .map_err(|_| Error::Runtime("Widget runtime dropped the snapshot reply".to_string()))
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| Error::Runtime("Widget runtime has stopped".to_string()))
    }
}

/// Drives one widget until every handle is dropped
pub struct WidgetRuntime<R> {
    widget: Widget<R, TimerQueue>,
    commands: mpsc::Receiver<Command>,
}

impl<R: RenderTarget + Send + 'static> WidgetRuntime<R> {
    pub fn new(widget: Widget<R, TimerQueue>) -> (Self, WidgetHandle) {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        (
            Self {
                widget,
                commands: rx,
            },
            WidgetHandle { commands: tx },
        )
    }

    /// Spawn onto the current runtime. The join handle yields the widget
    /// once the runtime has shut down.
    pub fn spawn(widget: Widget<R, TimerQueue>) -> (WidgetHandle, JoinHandle<Widget<R, TimerQueue>>) {
        let (runtime, handle) = Self::new(widget);
        (handle, tokio::spawn(runtime.run()))
    }

    /// Process commands and timers. When the last handle is dropped, pending
    /// deferred steps still run to completion before the widget is returned.
    pub async fn run(mut self) -> Widget<R, TimerQueue> {
        tracing::debug!(agent_id = %self.widget.config().agent_id(), "Widget runtime started");

        loop {
            let armed = !self.widget.scheduler().is_empty();
            let step = tokio::select! {
                biased;
                command = self.commands.recv() => match command {
                    Some(command) => Step::Command(command),
                    None => Step::Shutdown,
                },
                Some((handle, task)) = self.widget.scheduler_mut().expired(), if armed => {
                    Step::Fire(handle, task)
                }
            };

            match step {
                Step::Command(command) => self.execute(command),
                Step::Fire(handle, task) => self.widget.run_task(handle, task),
                Step::Shutdown => break,
            }
        }

        while let Some((handle, task)) = self.widget.scheduler_mut().expired().await {
            self.widget.run_task(handle, task);
        }

        tracing::debug!(agent_id = %self.widget.config().agent_id(), "Widget runtime stopped");
        self.widget
    }

    fn execute(&mut self, command: Command) {
        match command {
            Command::Toggle => self.widget.toggle(),
            Command::Open => self.widget.open(),
            Command::Close => self.widget.close(),
            Command::Deliver { origin, payload } => self.widget.handle_message(&origin, &payload),
            Command::Snapshot(reply) => {
                let _ = reply.send(self.widget.snapshot());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Origin;
    use crate::widget::{
        HeadlessDom, Visibility, WidgetBuilder, WidgetConfig, WidgetHooks, WidgetSettings,
        DEFAULT_CONTAINER_ID,
    };
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use tokio::time::sleep;

    const REMOTE: &str = "https://agents.example.com";
    const FRAME: Duration = Duration::from_millis(16);

    fn widget(hooks: WidgetHooks) -> Widget<HeadlessDom, TimerQueue> {
        let settings = WidgetSettings {
            remote_origin: Origin::parse(REMOTE).unwrap(),
            ..Default::default()
        };
        WidgetBuilder::new(WidgetConfig::for_agent("abc123").unwrap())
            .settings(settings)
            .hooks(hooks)
            .mount(
                HeadlessDom::with_container(DEFAULT_CONTAINER_ID),
                TimerQueue::new(FRAME),
            )
    }

    fn frame_display(widget: &Widget<HeadlessDom, TimerQueue>) -> Option<String> {
        let frame = widget.nodes().unwrap().frame;
        widget.render().style(frame, "display").map(str::to_string)
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_queue_fires_and_cancels() {
        let mut timers = TimerQueue::new(FRAME);
        let frame = timers.schedule(Deferral::NextFrame, Task::Reveal);
        let settle = timers.schedule(Deferral::After(Duration::from_millis(300)), Task::Settle);
        assert_eq!(timers.len(), 2);

        assert_eq!(timers.expired().await, Some((frame, Task::Reveal)));
        timers.cancel(settle);
        timers.cancel(settle);
        assert!(timers.is_empty());
        assert_eq!(timers.expired().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_reveals_after_one_frame() {
        let (handle, join) = WidgetRuntime::spawn(widget(WidgetHooks::new()));

        handle.toggle().await.unwrap();
        assert_eq!(handle.snapshot().await.unwrap().state, Visibility::Opening);

        sleep(FRAME + Duration::from_millis(4)).await;
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.state, Visibility::Open);
        assert!(snapshot.is_open);

        drop(handle);
        let widget = join.await.unwrap();
        assert_eq!(frame_display(&widget).as_deref(), Some("block"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_settles_after_delay() {
        let (handle, join) = WidgetRuntime::spawn(widget(WidgetHooks::new()));
        handle.toggle().await.unwrap();
        sleep(Duration::from_millis(20)).await;
        handle.toggle().await.unwrap();

        sleep(Duration::from_millis(290)).await;
        assert_eq!(handle.snapshot().await.unwrap().state, Visibility::Closing);
        sleep(Duration::from_millis(20)).await;
        assert_eq!(handle.snapshot().await.unwrap().state, Visibility::Closed);

        drop(handle);
        let widget = join.await.unwrap();
        assert_eq!(frame_display(&widget).as_deref(), Some("none"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reopen_before_settle_stays_visible() {
        let (handle, join) = WidgetRuntime::spawn(widget(WidgetHooks::new()));
        handle.toggle().await.unwrap();
        sleep(Duration::from_millis(20)).await;
        handle.toggle().await.unwrap();
        sleep(Duration::from_millis(100)).await;
        handle.toggle().await.unwrap();
        sleep(Duration::from_secs(1)).await;

        assert_eq!(handle.snapshot().await.unwrap().state, Visibility::Open);
        drop(handle);
        let widget = join.await.unwrap();
        assert_eq!(frame_display(&widget).as_deref(), Some("block"));

        let visibility: Vec<_> = widget
            .render()
            .outbox()
            .iter()
            .filter_map(|m| m.payload["data"]["isVisible"].as_bool())
            .collect();
        assert_eq!(visibility, vec![true, false, true]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_finishes_pending_close() {
        let (handle, join) = WidgetRuntime::spawn(widget(WidgetHooks::new()));
        handle.open().await.unwrap();
        handle.close().await.unwrap();
        drop(handle);

        let widget = join.await.unwrap();
        assert_eq!(widget.state(), Visibility::Closed);
        assert_eq!(frame_display(&widget).as_deref(), Some("none"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deliver_routes_through_origin_guard() {
        let relayed = Arc::new(Mutex::new(Vec::new()));
        let sink = relayed.clone();
        let hooks = WidgetHooks::new().on_relay(move |data| sink.lock().unwrap().push(data.clone()));
        let (handle, join) = WidgetRuntime::spawn(widget(hooks));

        let message = json!({ "type": "widget:message", "data": { "n": 1 } });
        handle.deliver("https://evil.example.com", message.clone()).await.unwrap();
        handle.deliver(REMOTE, message).await.unwrap();
        handle
            .deliver(REMOTE, json!({ "type": "widget:ready" }))
            .await
            .unwrap();
        drop(handle);

        let widget = join.await.unwrap();
        assert_eq!(*relayed.lock().unwrap(), vec![json!({ "n": 1 })]);
        assert_eq!(widget.render().outbox().len(), 1);
        assert_eq!(widget.render().outbox()[0].payload["type"], "widget:config");
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_fails_after_shutdown() {
        let (runtime, handle) = WidgetRuntime::new(widget(WidgetHooks::new()));
        drop(runtime);
        assert!(matches!(handle.toggle().await, Err(Error::Runtime(_))));
    }
}
