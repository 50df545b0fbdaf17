//! Presence orchestrator.
//!
//! Sits between the user, the [`PresenceTransport`] and the [`Renderer`]:
//!
//! - clicks become optimistic local movement plus throttled `move` requests;
//!   the last click swallowed by the throttle is sent once the window reopens
//! - chat submissions go to the hub verbatim (the hub trims, truncates and
//!   rate-limits, then echoes them back as `chatted`)
//! - inbound events update the renderer
//!
//! [`PresenceOrchestrator::start`] runs the render loop and the input
//! listener; [`PresenceOrchestrator::stop`] ends both and the transport.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use hiroba_shared::{
    limits::CLIENT_MOVE_INTERVAL,
    position::Position,
    protocol::{ClientMessage, ServerMessage},
    throttle::Throttle,
    time::Clock,
};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::MissedTickBehavior,
};

use crate::{
    renderer::{Avatar, Renderer, Surface, Viewport},
    transport::{MessageCallback, PresenceTransport},
};

/// About 60 frames per second.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Input from the hosting UI.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Pointer click in CSS pixels
    Click { x: f64, y: f64 },
    OpenChat,
    SendChat(String),
}

/// A rectangle (CSS pixels) whose clicks belong to the UI, not the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UiRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl UiRegion {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

struct PresenceState {
    local_id: Option<String>,
    renderer: Renderer,
    chat_open: bool,
    move_throttle: Throttle,
    pending_move: Option<Position>,
}

impl PresenceState {
    fn new(viewport: Viewport) -> Self {
        Self {
            local_id: None,
            renderer: Renderer::new(viewport),
            chat_open: false,
            move_throttle: Throttle::new(CLIENT_MOVE_INTERVAL),
            pending_move: None,
        }
    }

    fn apply(&mut self, message: ServerMessage, now_millis: i64) {
        match message {
            ServerMessage::Welcome {
                id,
                name,
                x,
                y,
                users,
            } => {
                self.renderer.clear();
                self.renderer
                    .upsert(&id, &name, Position::clamped(x, y), true);
                for user in users {
                    self.renderer.upsert(
                        &user.id,
                        &user.name,
                        Position::clamped(user.x, user.y),
                        false,
                    );
                }
                tracing::debug!("Welcomed as '{}' ({})", name, id);
                self.local_id = Some(id);
            }
            ServerMessage::Join { id, name, x, y } => {
                let is_self = self.local_id.as_deref() == Some(id.as_str());
                self.renderer
                    .upsert(&id, &name, Position::clamped(x, y), is_self);
            }
            ServerMessage::Moved { id, x, y } => {
                self.renderer.set_target(&id, Position::clamped(x, y));
            }
            ServerMessage::Leave { id } => {
                self.renderer.remove(&id);
            }
            ServerMessage::Chatted { id, text } => {
                self.renderer.show_chat(&id, &text, now_millis);
            }
        }
    }
}

fn lock(state: &Mutex<PresenceState>) -> MutexGuard<'_, PresenceState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn wait_stopped(stopped: &mut watch::Receiver<bool>) {
    let _ = stopped.wait_for(|stopped| *stopped).await;
}

pub struct PresenceOrchestrator<T: PresenceTransport + 'static> {
    transport: Arc<T>,
    state: Arc<Mutex<PresenceState>>,
    clock: Arc<dyn Clock>,
    regions: Vec<UiRegion>,
    stopped: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<T: PresenceTransport + 'static> PresenceOrchestrator<T> {
    pub fn new(transport: Arc<T>, viewport: Viewport, clock: Arc<dyn Clock>) -> Self {
        let (stopped, _) = watch::channel(false);
        Self {
            transport,
            state: Arc::new(Mutex::new(PresenceState::new(viewport))),
            clock,
            regions: Vec::new(),
            stopped,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Clicks inside any of these regions are left to the UI.
    pub fn with_regions(mut self, regions: Vec<UiRegion>) -> Self {
        self.regions = regions;
        self
    }

    pub fn local_id(&self) -> Option<String> {
        lock(&self.state).local_id.clone()
    }

    pub fn chat_open(&self) -> bool {
        lock(&self.state).chat_open
    }

    pub fn is_stopped(&self) -> bool {
        *self.stopped.borrow()
    }

    /// Known avatars, back to front.
    pub fn participants(&self) -> Vec<Avatar> {
        lock(&self.state)
            .renderer
            .draw_order()
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn name_of(&self, id: &str) -> Option<String> {
        lock(&self.state)
            .renderer
            .avatar(id)
            .map(|avatar| avatar.name.clone())
    }

    pub fn handle_server_message(&self, message: ServerMessage) {
        let now = self.clock.now_millis();
        lock(&self.state).apply(message, now);
    }

    /// Callback to hand to the transport.
    pub fn message_handler(&self) -> MessageCallback {
        let state = self.state.clone();
        let clock = self.clock.clone();
        Arc::new(move |message| {
            let now = clock.now_millis();
            lock(&state).apply(message, now);
        })
    }

    pub fn handle_input(&self, event: InputEvent) -> bool {
        match event {
            InputEvent::Click { x, y } => self.handle_click(x, y),
            InputEvent::OpenChat => {
                lock(&self.state).chat_open = true;
                true
            }
            InputEvent::SendChat(text) => self.submit_chat(text),
        }
    }

    /// Moves the local avatar toward the click right away and, at most ten
    /// times a second, tells the hub. Returns whether a `move` was sent.
    pub fn handle_click(&self, css_x: f64, css_y: f64) -> bool {
        if self.is_stopped() || self.regions.iter().any(|r| r.contains(css_x, css_y)) {
            return false;
        }

        let now = self.clock.now_millis();
        let (position, send) = {
            let mut state = lock(&self.state);
            let position = state.renderer.viewport().normalize(css_x, css_y);
            if let Some(local_id) = state.local_id.clone() {
                state.renderer.set_target(&local_id, position);
            }
            let send = state.move_throttle.try_acquire(now);
            state.pending_move = if send { None } else { Some(position) };
            (position, send)
        };

        if !send {
            tracing::trace!("Move throttled on the client");
            return false;
        }
        self.send_move(position)
    }

    /// Sends the last throttled click once the throttle allows it. Returns
    /// whether a `move` was sent.
    pub fn flush_pending_move(&self) -> bool {
        if self.is_stopped() {
            return false;
        }
        let now = self.clock.now_millis();
        let position = {
            let mut state = lock(&self.state);
            if state.pending_move.is_none() || !state.move_throttle.try_acquire(now) {
                return false;
            }
            state.pending_move.take()
        };
        match position {
            Some(position) => self.send_move(position),
            None => false,
        }
    }

    fn send_move(&self, position: Position) -> bool {
        self.transport.send(ClientMessage::Move {
            x: position.x,
            y: position.y,
        })
    }

    /// Closes the composer and forwards `text` untouched.
    pub fn submit_chat(&self, text: String) -> bool {
        if self.is_stopped() {
            return false;
        }
        lock(&self.state).chat_open = false;
        self.transport.send(ClientMessage::Chat { text })
    }

    /// Spawns the render loop (drawing to `surface`) and the input listener.
    pub fn start(
        self: &Arc<Self>,
        mut surface: Box<dyn Surface>,
        mut inputs: mpsc::UnboundedReceiver<InputEvent>,
    ) {
        if self.is_stopped() {
            return;
        }

        {
            let mut state = lock(&self.state);
            let viewport = state.renderer.viewport();
            state.renderer.resize(viewport, surface.as_mut());
        }

        let state = self.state.clone();
        let clock = self.clock.clone();
        let mut stopped = self.stopped.subscribe();
        let render = tokio::spawn(async move {
            let mut frames = tokio::time::interval(FRAME_INTERVAL);
            frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = frames.tick() => {
                        let now = clock.now_millis();
                        let mut state = lock(&state);
                        state.renderer.step(now);
                        state.renderer.draw(surface.as_mut());
                    }
                    _ = wait_stopped(&mut stopped) => break,
                }
            }
            tracing::debug!("Render loop stopped");
        });

        let this = self.clone();
        let mut stopped = self.stopped.subscribe();
        let listen = tokio::spawn(async move {
            let mut trailing = tokio::time::interval(FRAME_INTERVAL);
            trailing.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                let event = tokio::select! {
                    event = inputs.recv() => event,
                    _ = trailing.tick() => {
                        this.flush_pending_move();
                        continue;
                    }
                    _ = wait_stopped(&mut stopped) => None,
                };
                let Some(event) = event else {
                    break;
                };
                this.handle_input(event);
            }
            tracing::debug!("Input listener stopped");
        });

        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend([render, listen]);
    }

    /// Ends the render loop, the input listener and the transport. Only the
    /// first call does anything.
    pub async fn stop(&self) {
        if self.stopped.send_replace(true) {
            return;
        }
        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
        for task in tasks {
            let _ = task.await;
        }
        self.transport.stop().await;
        tracing::info!("Presence stopped");
    }
}
