use std::io::{self, Stderr};
use std::sync::atomic::{AtomicBool, Ordering};
use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyEvent, KeyEventKind,
        KeyboardEnhancementFlags, MouseEvent, PopKeyboardEnhancementFlags,
        PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use ratatui::{backend::CrosstermBackend, Terminal};
use futures_util::StreamExt;
use tokio::sync::mpsc;

pub type Tui = Terminal<CrosstermBackend<Stderr>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize(u16, u16),
    /// Decoded text from the reply currently streaming in
    ReplyChunk(String),
    ReplyFinished,
    ReplyFailed(String),
}

/// Single queue for terminal input and reply events.
///
/// Everything that mutates the chat arrives here and is handled on the
/// main loop, in the order it was sent.
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<AppEvent>,
    tx: mpsc::UnboundedSender<AppEvent>,
}

impl EventHandler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        // Spawn event reader task
        let tx_events = tx.clone();
        tokio::spawn(async move {
            let mut reader = event::EventStream::new();
            while let Some(evt) = reader.next().await {
                let app_event = match evt {
                    Ok(Event::Key(key)) => {
                        // Only handle key press events, not release
                        if key.kind == KeyEventKind::Press {
                            Some(AppEvent::Key(key))
                        } else {
                            None
                        }
                    }
                    Ok(Event::Mouse(mouse)) => Some(AppEvent::Mouse(mouse)),
                    Ok(Event::Resize(w, h)) => Some(AppEvent::Resize(w, h)),
                    Ok(_) => None,
                    Err(err) => {
                        tracing::warn!(error = %err, "terminal event stream failed");
                        None
                    }
                };

                if let Some(event) = app_event {
                    if tx_events.send(event).is_err() {
                        break;
                    }
                }
            }
        });

        Self { rx, tx }
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<AppEvent> {
        self.tx.clone()
    }

    pub async fn next(&mut self) -> Option<AppEvent> {
        self.rx.recv().await
    }
}

/// Set while the terminal has our keyboard flags pushed, so restore pops them once.
static KEYBOARD_ENHANCED: AtomicBool = AtomicBool::new(false);

/// Keyboard protocol flags requested at startup.
///
/// Without escape-code disambiguation most terminals report Shift+Enter as a
/// plain Enter, and the handler could not keep it from sending.
pub fn keyboard_flags() -> KeyboardEnhancementFlags {
    KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
}

pub fn init() -> Result<Tui> {
    enable_raw_mode()?;
    execute!(io::stderr(), EnterAlternateScreen, EnableMouseCapture)?;

    if supports_keyboard_enhancement().unwrap_or(false) {
        execute!(io::stderr(), PushKeyboardEnhancementFlags(keyboard_flags()))?;
        KEYBOARD_ENHANCED.store(true, Ordering::SeqCst);
    } else {
        tracing::info!("terminal lacks keyboard enhancement, Shift+Enter reads as Enter");
    }

    let backend = CrosstermBackend::new(io::stderr());
    let terminal = Terminal::new(backend)?;

    Ok(terminal)
}

pub fn restore() -> Result<()> {
    if KEYBOARD_ENHANCED.swap(false, Ordering::SeqCst) {
        execute!(io::stderr(), PopKeyboardEnhancementFlags)?;
    }
    execute!(io::stderr(), DisableMouseCapture, LeaveAlternateScreen)?;
    disable_raw_mode()?;
    Ok(())
}

/// Install panic hook to restore terminal on panic
pub fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = restore();
        original_hook(panic_info);
    }));
}
