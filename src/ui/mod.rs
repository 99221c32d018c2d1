use chrono::DateTime;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap};
use ratatui::Frame;

pub mod layout;

use crate::app::{App, InputMode};
use presale_sync::config::short_addr;
use presale_sync::core::{command_hint, NotifyLevel};
use presale_sync::domain::{has_ended, unix_now, UiState};

pub fn draw(f: &mut Frame, app: &App) {
    let areas = layout::areas(f.size());

    draw_header(f, areas.header, app);
    draw_presale_panel(f, areas.presale, app);
    draw_detail_panel(f, areas.details, app);
    draw_notices(f, areas.notices, app);
    draw_status_line(f, areas.status_line, app);
    draw_command_line(f, areas.command_line, app);

    if app.help_open {
        draw_help_popup(f, areas.size);
    }
}

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(area);

    let title = Line::from(vec![
        Span::styled(
            "Crypto Devs",
            Style::default()
                .fg(Color::LightCyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled("RPC", Style::default().fg(Color::DarkGray)),
        Span::raw(format!(" {} ", app.endpoint)),
        Span::styled("Contract", Style::default().fg(Color::DarkGray)),
        Span::raw(format!(
            " {}",
            short_addr(&app.settings.contract_address.to_string())
        )),
    ]);
    let left = Paragraph::new(title)
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Left);

    let wallet = if app.view.session.wallet_connected {
        Span::styled("connected", Style::default().fg(Color::LightGreen))
    } else {
        Span::styled("disconnected", Style::default().fg(Color::LightRed))
    };
    let right_line = Line::from(vec![
        Span::styled("Chain ", Style::default().fg(Color::DarkGray)),
        Span::raw(format!("{}  ", app.settings.expected_chain_id)),
        Span::styled("Wallet ", Style::default().fg(Color::DarkGray)),
        wallet,
    ]);
    let right = Paragraph::new(right_line)
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Left);

    f.render_widget(left, chunks[0]);
    f.render_widget(right, chunks[1]);
}

fn state_color(state: UiState) -> Color {
    match state {
        UiState::Disconnected => Color::LightRed,
        UiState::Busy => Color::LightYellow,
        UiState::PresaleNotStarted => Color::Gray,
        UiState::OwnerCanStartPresale | UiState::PresaleOpenForMint | UiState::PublicMintOpen => {
            Color::LightGreen
        }
    }
}

fn action_key_hint(state: UiState) -> Option<&'static str> {
    match state {
        UiState::Disconnected => Some("Enter: connect wallet"),
        UiState::OwnerCanStartPresale => Some("Enter: start the presale"),
        UiState::PresaleOpenForMint => Some("Enter: presale mint"),
        UiState::PublicMintOpen => Some("Enter: public mint"),
        UiState::Busy | UiState::PresaleNotStarted => None,
    }
}

fn draw_presale_panel(f: &mut Frame, area: Rect, app: &App) {
    let state = app.ui_state();
    let mut lines = vec![
        Line::from(Span::styled(
            "Welcome to Crypto Devs!",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from("It's an NFT collection for developers in Crypto."),
        Line::from(app.minted_display()),
        Line::from(""),
        Line::from(Span::styled(
            state.headline(),
            Style::default()
                .fg(state_color(state))
                .add_modifier(Modifier::BOLD),
        )),
    ];
    if let Some(price) = app.offered_price() {
        lines.push(Line::from(vec![
            Span::styled("Price ", Style::default().fg(Color::DarkGray)),
            Span::raw(price),
        ]));
    }
    if let Some(hint) = action_key_hint(state) {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            hint,
            Style::default().fg(Color::DarkGray),
        )));
    }

    let paragraph = Paragraph::new(Text::from(lines))
        .block(Block::default().title("Presale").borders(Borders::ALL))
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
}

fn detail_row(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label:<10}"), Style::default().fg(Color::DarkGray)),
        Span::raw(value),
    ])
}

fn draw_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let view = &app.view;
    let account = view
        .session
        .address
        .map(|addr| short_addr(&addr.to_string()))
        .unwrap_or_else(|| "--".to_string());
    let owner = view
        .snapshot
        .owner
        .map(|addr| short_addr(&addr.to_string()))
        .unwrap_or_else(|| "--".to_string());

    let mut lines = vec![
        detail_row("Account", account),
        detail_row(
            "Role",
            if view.session.is_owner { "owner" } else { "minter" }.to_string(),
        ),
        detail_row("Owner", owner),
    ];

    let presale = if !view.has_snapshot {
        "--".to_string()
    } else if !view.snapshot.presale_started {
        "not started".to_string()
    } else {
        let ends = format_timestamp(view.snapshot.presale_ends_at);
        if has_ended(view.snapshot.presale_ends_at, unix_now()) {
            format!("ended {ends}")
        } else {
            format!("ends {ends}")
        }
    };
    lines.push(detail_row("Presale", presale));

    match view.pending.as_ref() {
        Some(pending) => {
            let tx = pending
                .tx_hash
                .map(|hash| short_addr(&hash.to_string()))
                .unwrap_or_else(|| "awaiting wallet".to_string());
            lines.push(detail_row(
                "Pending",
                format!(
                    "{} {} ({}s)",
                    pending.kind.label(),
                    tx,
                    pending.started_at.elapsed().as_secs()
                ),
            ));
        }
        None => lines.push(detail_row("Pending", "--".to_string())),
    }

    let paragraph = Paragraph::new(Text::from(lines))
        .block(Block::default().title("Details").borders(Borders::ALL));
    f.render_widget(paragraph, area);
}

fn format_timestamp(secs: u64) -> String {
    i64::try_from(secs)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| secs.to_string())
}

fn level_color(level: NotifyLevel) -> Color {
    match level {
        NotifyLevel::Info => Color::LightGreen,
        NotifyLevel::Warn => Color::LightYellow,
        NotifyLevel::Error => Color::LightRed,
    }
}

fn draw_notices(f: &mut Frame, area: Rect, app: &App) {
    let items: Vec<ListItem> = app
        .notices
        .iter()
        .rev()
        .map(|notice| {
            ListItem::new(Line::from(Span::styled(
                notice.text.clone(),
                Style::default().fg(level_color(notice.level)),
            )))
        })
        .collect();
    let list = List::new(items).block(Block::default().title("Notices").borders(Borders::ALL));
    f.render_widget(list, area);
}

fn draw_status_line(f: &mut Frame, area: Rect, app: &App) {
    let state = app.ui_state();
    let line = Line::from(vec![
        Span::styled("State ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("{:?}  ", state),
            Style::default().fg(state_color(state)),
        ),
        Span::styled("Minted ", Style::default().fg(Color::DarkGray)),
        Span::raw(format!(
            "{}/{}  ",
            app.view.snapshot.token_ids_minted, app.settings.max_supply
        )),
        Span::styled("Poll ", Style::default().fg(Color::DarkGray)),
        Span::raw(format!("{}s", app.settings.poll_interval.as_secs())),
    ]);

    let paragraph = Paragraph::new(line)
        .style(Style::default().fg(Color::White))
        .alignment(Alignment::Left);
    f.render_widget(paragraph, area);
}

fn draw_command_line(f: &mut Frame, area: Rect, app: &App) {
    let content = match app.input_mode {
        InputMode::Command => {
            let hint_text = command_hint(&app.command.input)
                .unwrap_or("connect | disconnect | refresh | start | pmint | mint | quit");
            Line::from(vec![
                Span::styled(": ", Style::default().fg(Color::Yellow)),
                Span::raw(app.command.input.as_str()),
                Span::styled(
                    format!("  {}", hint_text),
                    Style::default().fg(Color::DarkGray),
                ),
            ])
        }
        InputMode::Normal => {
            if let Some((text, level)) = app.status_text() {
                Line::from(vec![
                    Span::styled("msg: ", Style::default().fg(Color::DarkGray)),
                    Span::styled(text, Style::default().fg(level_color(level))),
                ])
            } else {
                Line::from(Span::styled(
                    "c connect  d disconnect  r refresh  Enter action  : command  ? help  q quit",
                    Style::default().fg(Color::DarkGray),
                ))
            }
        }
    };

    let paragraph = Paragraph::new(content).style(Style::default().fg(Color::White));
    f.render_widget(paragraph, area);
}

fn draw_help_popup(f: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    f.render_widget(Clear, popup_area);

    let lines = vec![
        Line::from("Session"),
        Line::from("  c          Connect wallet"),
        Line::from("  d          Disconnect"),
        Line::from("  r          Refresh contract state"),
        Line::from(""),
        Line::from("Actions"),
        Line::from("  Enter      Run the offered action"),
        Line::from("  :          Command line"),
        Line::from("  ?          Toggle help"),
        Line::from("  q          Quit"),
        Line::from(""),
        Line::from("Commands"),
        Line::from("  :start     Start the presale (owner)"),
        Line::from("  :pmint     Presale mint (whitelisted)"),
        Line::from("  :mint      Public mint"),
    ];

    let paragraph = Paragraph::new(Text::from(lines))
        .block(Block::default().title("Help").borders(Borders::ALL))
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: true });

    f.render_widget(paragraph, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
