use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::app::state::{AppState, NoteField, Screen};
use crate::content::{ContentField, ContentForm};
use crate::dropzone::{DropPolicy, FileDropController};
use crate::notes::{ModalState, Note, NoteColor};
use crate::notify::ToastKind;

const CARD_WIDTH: u16 = 30;
const CARD_HEIGHT: u16 = 7;
const EMPTY_NOTES: &str =
    "Keep your notes here - save time, stay organized, and get more done.";

pub fn draw_app(frame: &mut Frame, state: &AppState) {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(2),
        ])
        .split(frame.size());

    frame.render_widget(Paragraph::new(build_tab_line(state)), vertical[0]);

    match state.screen {
        Screen::Notes => draw_notes(frame, vertical[1], state),
        Screen::Images => draw_images(frame, vertical[1], state),
    }

    frame.render_widget(
        Paragraph::new(build_status_line(state)).style(Style::default().fg(Color::Gray)),
        vertical[2],
    );

    if state.content_open {
        draw_content_modal(frame, &state.content);
    } else if state.notes.modal().is_open() {
        draw_note_modal(frame, state);
    }

    draw_toasts(frame, state);
}

pub fn note_palette(color: NoteColor) -> Color {
    match color {
        NoteColor::Red => Color::Rgb(252, 165, 165),
        NoteColor::Yellow => Color::Rgb(253, 224, 71),
        NoteColor::Green => Color::Rgb(134, 239, 172),
        NoteColor::Pink => Color::Rgb(249, 168, 212),
        NoteColor::Purple => Color::Rgb(216, 180, 254),
    }
}

fn build_tab_line(state: &AppState) -> Line<'static> {
    let active = Style::default()
        .fg(Color::Black)
        .bg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let idle = Style::default().fg(Color::Gray);
    let (notes_style, images_style) = match state.screen {
        Screen::Notes => (active, idle),
        Screen::Images => (idle, active),
    };
    let mut spans = vec![
        Span::styled(" Notes ", notes_style),
        Span::raw(" "),
        Span::styled(" Images ", images_style),
        Span::raw("  "),
    ];
    if state.signed_in {
        spans.push(Span::styled("● signed in", Style::default().fg(Color::Green)));
    } else {
        spans.push(Span::styled("○ no token", Style::default().fg(Color::Yellow)));
    }
    Line::from(spans)
}

fn draw_notes(frame: &mut Frame, area: Rect, state: &AppState) {
    let store = state.notes.store();
    if store.is_empty() {
        if !state.notes.modal().is_open() {
            let area = Rect {
                width: area.width.min(64),
                height: area.height.min(8),
                ..area
            };
            let empty = Paragraph::new(Text::from(vec![
                Line::from(""),
                Line::from(Span::styled(
                    EMPTY_NOTES,
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(Span::styled(
                    "Press `a` to add a note, `c` to save content.",
                    Style::default().fg(Color::DarkGray),
                )),
            ]))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded),
            );
            frame.render_widget(empty, area);
        }
        return;
    }

    let columns = (area.width / CARD_WIDTH).max(1) as usize;
    let card_width = area.width / columns as u16;
    let card_height = CARD_HEIGHT.min(area.height);
    let visible_rows = (area.height / CARD_HEIGHT).max(1) as usize;
    let cursor_row = state.notes.cursor() / columns;
    let first_row = (cursor_row + 1).saturating_sub(visible_rows);

    for (idx, note) in store.iter().enumerate() {
        let row = idx / columns;
        if row < first_row || row >= first_row + visible_rows {
            continue;
        }
        let col = (idx % columns) as u16;
        let rect = Rect {
            x: area.x + col * card_width,
            y: area.y + (row - first_row) as u16 * CARD_HEIGHT,
            width: card_width,
            height: card_height,
        };
        draw_note_card(frame, rect, note, idx == state.notes.cursor());
    }
}

fn draw_note_card(frame: &mut Frame, area: Rect, note: &Note, selected: bool) {
    let background = note_palette(note.color);
    let inner_width = area.width.saturating_sub(2) as usize;
    let mut border_style = Style::default().fg(Color::DarkGray).bg(background);
    if selected {
        border_style = border_style.fg(Color::Black).add_modifier(Modifier::BOLD);
    }
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(if selected {
            BorderType::Thick
        } else {
            BorderType::Rounded
        })
        .border_style(border_style)
        .style(Style::default().bg(background).fg(Color::Black));

    let pin = if selected { " ⌖" } else { "" };
    let header = format!("{}{}", note.date, pin);
    let mut lines = vec![
        Line::from(Span::styled(header, Style::default().fg(Color::DarkGray))),
        Line::from(Span::styled(
            truncate_to_width(&note.title, inner_width),
            Style::default().add_modifier(Modifier::BOLD),
        )),
    ];
    lines.extend(note.content.lines().map(|line| Line::from(line.to_string())));

    let card = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(card, area);
}

fn draw_note_modal(frame: &mut Frame, state: &AppState) {
    let area = centered_rect(60, 60, frame.size());
    frame.render_widget(Clear, area);

    let draft = state.notes.draft();
    let (heading, color_label, actions) = match state.notes.modal() {
        ModalState::Editing(_) => (
            "Edit Note",
            "Change background color",
            "Ctrl-s Save Changes • Ctrl-d Delete Note • Esc Close",
        ),
        _ => (
            "Add a New Note",
            "Background color",
            "Ctrl-s Save • Esc Close",
        ),
    };

    let block = Block::default()
        .title(heading)
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(inner);

    frame.render_widget(
        text_input(
            "Title",
            &draft.title,
            "Title",
            state.note_field == NoteField::Title,
        ),
        layout[0],
    );
    frame.render_widget(
        text_input(
            "Content",
            &draft.content,
            "Write your note here...",
            state.note_field == NoteField::Content,
        )
        .wrap(Wrap { trim: false }),
        layout[1],
    );

    let color_focused = state.note_field == NoteField::Color;
    let swatch = Span::styled(
        format!("  {}  ", draft.select_color.label()),
        Style::default()
            .bg(note_palette(draft.select_color))
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD),
    );
    let color_line = Line::from(vec![
        Span::raw(format!("{color_label}: ")),
        Span::raw(if color_focused { "◂ " } else { "  " }),
        swatch,
        Span::raw(if color_focused { " ▸" } else { "" }),
    ]);
    frame.render_widget(
        Paragraph::new(color_line).block(field_block("Color", color_focused)),
        layout[2],
    );
    frame.render_widget(
        Paragraph::new(Span::styled(actions, Style::default().fg(Color::Gray))),
        layout[3],
    );
}

fn draw_content_modal(frame: &mut Frame, form: &ContentForm) {
    let area = centered_rect(70, 85, frame.size());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .title("Add New Content")
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(5),
            Constraint::Length(1),
        ])
        .split(inner);

    let pairs = [
        (rows[0], [ContentField::Title, ContentField::Link]),
        (rows[1], [ContentField::Brain, ContentField::Tags]),
    ];
    for (row, fields) in pairs {
        let halves = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(row);
        for (slot, field) in halves.iter().zip(fields) {
            frame.render_widget(
                text_input(
                    field.label(),
                    form.field(field),
                    field.placeholder(),
                    form.focus() == field,
                ),
                *slot,
            );
        }
    }

    let chips: Vec<Span> = form
        .tag_chips()
        .into_iter()
        .flat_map(|chip| {
            [
                Span::styled(format!("[#{chip}]"), Style::default().fg(Color::Green)),
                Span::raw(" "),
            ]
        })
        .collect();
    frame.render_widget(Paragraph::new(Line::from(chips)), rows[2]);

    frame.render_widget(
        text_input(
            ContentField::Description.label(),
            &form.description,
            ContentField::Description.placeholder(),
            form.focus() == ContentField::Description,
        )
        .wrap(Wrap { trim: false }),
        rows[3],
    );

    frame.render_widget(
        dropzone_widget(
            &form.image,
            &form.image_path,
            form.focus() == ContentField::Image,
            "Ctrl-x remove",
        ),
        rows[4],
    );

    let submit = if form.is_loading() {
        Span::styled(
            "Saving your content…",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled(
            "Ctrl-s Save Content • Tab next field • Esc close",
            Style::default().fg(Color::Gray),
        )
    };
    frame.render_widget(Paragraph::new(Line::from(submit)), rows[5]);
}

fn draw_images(frame: &mut Frame, area: Rect, state: &AppState) {
    let images = &state.images;
    let area = centered_rect(70, 70, area);
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(2)])
        .split(area);

    frame.render_widget(
        dropzone_widget(&images.zone, &images.path_input, true, "Ctrl-x remove • Ctrl-u upload"),
        layout[0],
    );

    let footer = if images.is_loading() {
        Line::from(Span::styled(
            "Uploading…",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ))
    } else if let Some(link) = images.uploaded_link() {
        Line::from(vec![
            Span::styled("Uploaded: ", Style::default().fg(Color::Green)),
            Span::styled(link.to_string(), Style::default().add_modifier(Modifier::UNDERLINED)),
        ])
    } else {
        Line::from(Span::styled(
            "Type a path and press Enter, or drop a file onto the terminal.",
            Style::default().fg(Color::DarkGray),
        ))
    };
    frame.render_widget(Paragraph::new(footer).wrap(Wrap { trim: true }), layout[1]);
}

fn dropzone_widget<'a, P: DropPolicy>(
    zone: &FileDropController<P>,
    typed_path: &'a str,
    focused: bool,
    file_hint: &'a str,
) -> Paragraph<'a> {
    let border = if zone.is_dragging() {
        Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD)
    } else if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let prompt = if zone.is_dragging() {
        "⇪ Drop image here"
    } else {
        "⇪ Upload or drag image here"
    };
    let mut lines = vec![Line::from(Span::styled(
        prompt,
        Style::default().add_modifier(Modifier::BOLD),
    ))];
    match zone.current_file() {
        Some(file) => lines.push(Line::from(vec![
            Span::styled(file.name.clone(), Style::default().fg(Color::Green)),
            Span::raw(format!(" ({})  ", file.size_label())),
            Span::styled(file_hint, Style::default().fg(Color::DarkGray)),
        ])),
        None => lines.push(Line::from(Span::styled(
            "No image selected",
            Style::default().fg(Color::DarkGray),
        ))),
    }
    let mut path_line = vec![Span::styled("Path: ", Style::default().fg(Color::Gray))];
    path_line.push(Span::raw(typed_path));
    if focused {
        path_line.push(Span::styled("▌", Style::default().fg(Color::Cyan)));
    }
    lines.push(Line::from(path_line));

    Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .title("Image")
            .borders(Borders::ALL)
            .border_type(BorderType::Double)
            .border_style(border),
    )
}

fn text_input<'a>(label: &'a str, value: &'a str, placeholder: &'a str, focused: bool) -> Paragraph<'a> {
    let mut lines: Vec<Line> = if value.is_empty() {
        vec![Line::from(Span::styled(
            placeholder,
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        value.split('\n').map(Line::from).collect()
    };
    if focused {
        if value.is_empty() {
            lines = vec![Line::from(Span::styled("▌", Style::default().fg(Color::Cyan)))];
        } else if let Some(last) = lines.last_mut() {
            last.spans
                .push(Span::styled("▌", Style::default().fg(Color::Cyan)));
        }
    }
    Paragraph::new(lines).block(field_block(label, focused))
}

fn field_block(label: &str, focused: bool) -> Block<'_> {
    let style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::Gray)
    };
    Block::default()
        .title(label)
        .borders(Borders::ALL)
        .border_style(style)
}

fn draw_toasts(frame: &mut Frame, state: &AppState) {
    let screen = frame.size();
    let width = screen.width.min(48);
    let mut y = screen.y + 1;
    for toast in state.toasts.iter() {
        if y + 3 > screen.bottom() {
            break;
        }
        let color = match toast.kind {
            ToastKind::Success => Color::Green,
            ToastKind::Error => Color::Red,
            ToastKind::Info => Color::Cyan,
        };
        let area = Rect {
            x: screen.right().saturating_sub(width),
            y,
            width,
            height: 3,
        };
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(truncate_to_width(&toast.message, width.saturating_sub(2) as usize))
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_type(BorderType::Rounded)
                        .border_style(Style::default().fg(color)),
                ),
            area,
        );
        y += 3;
    }
}

fn build_status_line(state: &AppState) -> Text<'static> {
    let total = state.notes.store().len();
    let mut spans = vec![Span::raw(format!("Notes: {total}"))];
    if state.content.is_loading() {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            "saving content…",
            Style::default().fg(Color::Yellow),
        ));
    }
    if let Some(message) = &state.status_message {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            message.clone(),
            Style::default().fg(Color::Cyan),
        ));
    }

    let keys = if state.content_open || state.notes.modal().is_open() {
        "Tab next field • Shift-Tab previous • Ctrl-s save • Esc close • Ctrl-c quit"
    } else {
        match state.screen {
            Screen::Notes => {
                "a add note • Enter/e edit • ←/→ move • c add content • Tab images • q quit"
            }
            Screen::Images => "Enter pick path • Ctrl-u upload • Ctrl-x remove • Tab notes • Ctrl-c quit",
        }
    };
    Text::from(vec![
        Line::from(spans),
        Line::from(Span::styled(keys, Style::default().fg(Color::DarkGray))),
    ])
}

fn truncate_to_width(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > max_width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Percentage((100 - percent_y) / 2),
                Constraint::Percentage(percent_y),
                Constraint::Percentage((100 - percent_y) / 2),
            ]
            .as_ref(),
        )
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ]
            .as_ref(),
        )
        .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::NotesPolicy;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use std::time::Duration;

    fn render(state: &AppState) -> String {
        let backend = TestBackend::new(120, 40);
        let mut terminal = Terminal::new(backend).expect("terminal");
        terminal
            .draw(|frame| draw_app(frame, state))
            .expect("draw");
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer.get(x, y).symbol());
            }
            text.push('\n');
        }
        text
    }

    fn state() -> AppState {
        AppState::new(NotesPolicy::default(), Duration::from_secs(3), false)
    }

    #[test]
    fn empty_board_shows_hint() {
        let screen = render(&state());
        assert!(screen.contains("Keep your notes here"));
        assert!(screen.contains("no token"));
    }

    #[test]
    fn cards_show_title_and_date() {
        let mut state = state();
        state.notes.open_create();
        state.notes.set_title("Groceries");
        state.notes.set_content("milk and eggs");
        state.notes.save_new().expect("saved");
        let date = state.notes.store().get_index(0).expect("note").date.clone();

        let screen = render(&state);
        assert!(screen.contains("Groceries"));
        assert!(screen.contains("milk and eggs"));
        assert!(screen.contains(&date));
        assert!(!screen.contains("Keep your notes here"));
    }

    #[test]
    fn edit_modal_offers_delete() {
        let mut state = state();
        state.notes.open_create();
        state.notes.set_title("A");
        state.notes.set_content("x");
        let id = state.notes.save_new().expect("saved");
        state.notes.open_edit(&id);
        let screen = render(&state);
        assert!(screen.contains("Edit Note"));
        assert!(screen.contains("Delete Note"));
    }

    #[test]
    fn content_modal_shows_loading_label() {
        let mut state = state();
        state.content_open = true;
        state.content.title = "Rust".into();
        state.content.begin_submit();
        let screen = render(&state);
        assert!(screen.contains("Add New Content"));
        assert!(screen.contains("Saving your content"));
    }

    #[test]
    fn truncation_respects_display_width() {
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(truncate_to_width("abcdefghij", 5), "abcd…");
    }

    #[test]
    fn images_screen_highlights_its_dropzone() {
        use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

        let mut state = state();
        state.handle_key(KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE));
        let screen = render(&state);
        assert!(screen.contains("Drop image here"));
        assert!(!screen.contains("Upload or drag image here"));
    }
}
