use std::collections::VecDeque;
use std::time::{Duration, Instant};

use alloy::primitives::utils::format_ether;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use presale_sync::config::Settings;
use presale_sync::core::{parse_command, Action, Command, Notice, NotifyLevel, Request};
use presale_sync::domain::UiState;
use presale_sync::sync::SyncView;

const MAX_NOTICES: usize = 6;
const STATUS_TTL: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Command,
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub level: NotifyLevel,
    pub since: Instant,
}

#[derive(Debug, Default, Clone)]
pub struct CommandState {
    pub input: String,
}

pub struct App {
    pub settings: Settings,
    pub endpoint: String,
    pub view: SyncView,
    pub notices: VecDeque<Notice>,
    pub status: Option<StatusMessage>,
    pub input_mode: InputMode,
    pub command: CommandState,
    pub help_open: bool,
    pub should_quit: bool,
}

impl App {
    pub fn new(settings: Settings, endpoint: String) -> Self {
        Self {
            settings,
            endpoint,
            view: SyncView::default(),
            notices: VecDeque::new(),
            status: None,
            input_mode: InputMode::Normal,
            command: CommandState::default(),
            help_open: false,
            should_quit: false,
        }
    }

    pub fn ui_state(&self) -> UiState {
        self.view.ui_state()
    }

    pub fn mint_price_display(&self) -> String {
        format!("{} ETH", format_ether(self.settings.mint_price))
    }

    /// Price line for the offered action; starting the presale carries no value
    pub fn offered_price(&self) -> Option<String> {
        self.ui_state()
            .available_action()
            .filter(|kind| kind.is_payable())
            .map(|_| self.mint_price_display())
    }

    pub fn minted_display(&self) -> String {
        let minted = if self.view.has_snapshot {
            self.view.snapshot.token_ids_minted.to_string()
        } else {
            "--".to_string()
        };
        format!("{} / {} have been minted", minted, self.settings.max_supply)
    }

    // === Runtime events ===

    pub fn apply_ready(&mut self, endpoint: String) {
        self.endpoint = endpoint;
    }

    pub fn apply_view(&mut self, view: SyncView) {
        self.view = view;
    }

    pub fn apply_notice(&mut self, notice: Notice) {
        self.set_status(notice.text.clone(), notice.level);
        self.notices.push_back(notice);
        while self.notices.len() > MAX_NOTICES {
            self.notices.pop_front();
        }
    }

    pub fn apply_error(&mut self, message: String) {
        self.set_status(message, NotifyLevel::Error);
    }

    pub fn set_status(&mut self, text: impl Into<String>, level: NotifyLevel) {
        self.status = Some(StatusMessage {
            text: text.into(),
            level,
            since: Instant::now(),
        });
    }

    pub fn status_text(&self) -> Option<(&str, NotifyLevel)> {
        self.status
            .as_ref()
            .map(|status| (status.text.as_str(), status.level))
    }

    pub fn on_tick(&mut self) {
        if let Some(status) = self.status.as_ref() {
            if status.since.elapsed() > STATUS_TTL {
                self.status = None;
            }
        }
    }

    // === Input ===

    pub fn handle_key(&mut self, key: KeyEvent) -> Action {
        if self.help_open {
            if matches!(key.code, KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q')) {
                self.help_open = false;
                return Action::CloseOverlay;
            }
            return Action::None;
        }
        match self.input_mode {
            InputMode::Normal => self.handle_normal_key(key),
            InputMode::Command => self.handle_command_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Char('q') => Action::Quit,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::Quit,
            KeyCode::Char('?') => {
                self.help_open = true;
                Action::None
            }
            KeyCode::Char(':') => {
                self.input_mode = InputMode::Command;
                self.command.input.clear();
                Action::OpenCommand
            }
            KeyCode::Char('c') => self.request_connect(),
            KeyCode::Char('d') => self.request(Request::Disconnect),
            KeyCode::Char('r') => self.request(Request::Refresh),
            KeyCode::Enter | KeyCode::Char(' ') => self.request_available_action(),
            _ => Action::None,
        }
    }

    fn handle_command_key(&mut self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Esc => {
                self.input_mode = InputMode::Normal;
                self.command.input.clear();
                Action::CloseOverlay
            }
            KeyCode::Enter => {
                self.input_mode = InputMode::Normal;
                let input = std::mem::take(&mut self.command.input);
                self.apply_command(parse_command(&input))
            }
            KeyCode::Backspace => {
                self.command.input.pop();
                Action::None
            }
            KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.command.input.push(ch);
                Action::None
            }
            _ => Action::None,
        }
    }

    pub fn apply_command(&mut self, command: Command) -> Action {
        match command {
            Command::Connect => self.request_connect(),
            Command::Disconnect => self.request(Request::Disconnect),
            Command::Refresh => self.request(Request::Refresh),
            Command::Submit(kind) => {
                if self.ui_state().available_action() == Some(kind) {
                    Action::Dispatch(Request::Submit(kind))
                } else {
                    Action::Notify(
                        format!("{kind} is not available right now"),
                        NotifyLevel::Warn,
                    )
                }
            }
            Command::Help => {
                self.help_open = true;
                Action::None
            }
            Command::Quit => Action::Quit,
            Command::Unknown(input) if input.is_empty() => Action::None,
            Command::Unknown(input) => {
                Action::Notify(format!("Unknown command: {input}"), NotifyLevel::Warn)
            }
        }
    }

    fn request_connect(&self) -> Action {
        if self.view.session.wallet_connected {
            return Action::Notify("Wallet already connected".into(), NotifyLevel::Info);
        }
        Action::Dispatch(Request::Connect)
    }

    fn request(&self, request: Request) -> Action {
        if !self.view.session.wallet_connected {
            return Action::Notify("Connect your wallet first".into(), NotifyLevel::Warn);
        }
        Action::Dispatch(request)
    }

    /// The action button: only what the current state offers, never while busy
    fn request_available_action(&self) -> Action {
        match self.ui_state() {
            UiState::Disconnected => Action::Dispatch(Request::Connect),
            state => match state.available_action() {
                Some(kind) => Action::Dispatch(Request::Submit(kind)),
                None => Action::None,
            },
        }
    }
}
