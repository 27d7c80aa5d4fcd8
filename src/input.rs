use crate::model::CareAction;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use std::time::Duration;

#[derive(Clone, Debug)]
pub(crate) struct InputEvent {
    pub(crate) key: KeyCode,
    pub(crate) mods: KeyModifiers,
}

/// Which screen is in front; only what key mapping needs to know.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SceneKind {
    Setup,
    Main,
    Help,
    ConfirmReset,
}

#[derive(Clone, Debug)]
pub(crate) enum UiAction {
    Care(CareAction),
    OpenHelp,
    CloseOverlay,
    OpenResetConfirm,
    ConfirmReset,
    FormChar(char),
    FormBackspace,
    FormNext,
    FormPrev,
    FormSubmit,
    Quit,
}

pub(crate) fn collect_input_nonblocking(
    max_frame_time: Duration,
) -> anyhow::Result<Vec<InputEvent>> {
    let mut out = Vec::new();

    // poll with a tiny timeout so we stay responsive
    let timeout = std::cmp::min(Duration::from_millis(1), max_frame_time);
    while event::poll(timeout)? {
        match event::read()? {
            Event::Key(k) => {
                if k.kind == KeyEventKind::Press || k.kind == KeyEventKind::Repeat {
                    out.push(InputEvent {
                        key: k.code,
                        mods: k.modifiers,
                    });
                    if out.len() >= 32 {
                        break;
                    }
                }
            }
            _ => {}
        }
    }
    Ok(out)
}

pub(crate) fn map_event_to_action(scene: SceneKind, ev: InputEvent) -> Option<UiAction> {
    if scene == SceneKind::Setup {
        return match ev.key {
            KeyCode::Enter => Some(UiAction::FormSubmit),
            KeyCode::Tab | KeyCode::Down => Some(UiAction::FormNext),
            KeyCode::BackTab | KeyCode::Up => Some(UiAction::FormPrev),
            KeyCode::Backspace => Some(UiAction::FormBackspace),
            KeyCode::Esc => Some(UiAction::Quit),
            KeyCode::Char(ch) => {
                if ev.mods.contains(KeyModifiers::CONTROL) && matches!(ch, 'c' | 'C') {
                    Some(UiAction::Quit)
                } else if !ch.is_control() {
                    Some(UiAction::FormChar(ch))
                } else {
                    None
                }
            }
            _ => None,
        };
    }

    match ev.key {
        KeyCode::Char('q') | KeyCode::Char('Q') => return Some(UiAction::Quit),
        KeyCode::Char('h') | KeyCode::Char('H') => return Some(UiAction::OpenHelp),
        KeyCode::Esc => return Some(UiAction::CloseOverlay),
        _ => {}
    }

    match scene {
        SceneKind::Main => match ev.key {
            KeyCode::Char('w') | KeyCode::Char('W') => Some(UiAction::Care(CareAction::Water)),
            KeyCode::Char('s') | KeyCode::Char('S') => Some(UiAction::Care(CareAction::Sun)),
            KeyCode::Char('f') | KeyCode::Char('F') => {
                Some(UiAction::Care(CareAction::Fertilizer))
            }
            KeyCode::Char('t') | KeyCode::Char('T') => Some(UiAction::Care(CareAction::Talk)),
            KeyCode::Char('r') | KeyCode::Char('R') => Some(UiAction::OpenResetConfirm),
            _ => None,
        },
        SceneKind::ConfirmReset => match ev.key {
            KeyCode::Char('y') | KeyCode::Char('Y') => Some(UiAction::ConfirmReset),
            KeyCode::Char('n') | KeyCode::Char('N') => Some(UiAction::CloseOverlay),
            _ => None,
        },
        SceneKind::Help => None,
        SceneKind::Setup => None,
    }
}
