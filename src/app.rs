use crate::config::{load_settings, project_paths, save_settings_atomic};
use crate::engine::{Engine, InteractionOutcome, ProfileSnapshot};
use crate::input::{collect_input_nonblocking, map_event_to_action, SceneKind, UiAction};
use crate::model::{welcome_message_for_age, Badge, NeglectSeverity, RngState, STAGES};
use crate::render::{draw_art, draw_bar, draw_text, plant_art, sad_art, Terminal};
use crate::store::{FileStore, MemStore};
use crossterm::style::Color;
use std::time::{Duration, Instant};

const SAVE_FAILED_MESSAGE: &str = "Could not save progress. Your last action may be lost.";
const BADGE_POPUP_SECS: u64 = 3;

#[derive(Default)]
struct SetupForm {
    field: usize,
    owner_name: String,
    owner_age: String,
    plant_name: String,
    error: Option<&'static str>,
}

impl SetupForm {
    fn active_mut(&mut self) -> &mut String {
        match self.field {
            0 => &mut self.owner_name,
            1 => &mut self.owner_age,
            _ => &mut self.plant_name,
        }
    }

    fn validate(&self) -> Result<(), &'static str> {
        let name = self.owner_name.trim();
        if name.is_empty() || !name.chars().all(|c| c.is_alphabetic() || c == ' ') {
            return Err("Please enter a valid name. Only letters and spaces are allowed.");
        }
        let age = self.owner_age.trim();
        if age.is_empty() || !age.chars().all(|c| c.is_ascii_digit()) {
            return Err("Please enter a valid age. Only numbers are allowed.");
        }
        if self.plant_name.trim().is_empty() {
            return Err("Please give your little plant a name.");
        }
        Ok(())
    }
}

enum Scene {
    Setup(SetupForm),
    Main,
    Help,
    ConfirmReset,
}

impl Scene {
    fn kind(&self) -> SceneKind {
        match self {
            Scene::Setup(_) => SceneKind::Setup,
            Scene::Main => SceneKind::Main,
            Scene::Help => SceneKind::Help,
            Scene::ConfirmReset => SceneKind::ConfirmReset,
        }
    }
}

pub(crate) struct App {
    settings: crate::config::Settings,
    paths: crate::config::Paths,
    term: Terminal,
    engine: Engine<FileStore, MemStore>,
    scene: Scene,
    snapshot: Option<ProfileSnapshot>,
    message: String,
    sad: Option<NeglectSeverity>,
    badge_popup: Option<(&'static Badge, Instant)>,
    should_quit: bool,
}

impl App {
    fn init() -> anyhow::Result<Self> {
        let paths = project_paths()?;
        let settings = load_settings(&paths.settings_path);

        let persistent = FileStore::open(&paths.profile_path);
        let session = MemStore::new();
        let mut engine = Engine::new(persistent, session, RngState::new(settings.seed));

        let snapshot = engine.load_profile(chrono::Utc::now());
        let (scene, message) = match &snapshot {
            Some(snap) => (
                Scene::Main,
                format!("Welcome back, {}! {} missed you.", snap.owner_name, snap.plant_name),
            ),
            None => (Scene::Setup(SetupForm::default()), String::new()),
        };

        let term = Terminal::begin()?;

        Ok(Self {
            settings,
            paths,
            term,
            engine,
            scene,
            snapshot,
            message,
            sad: None,
            badge_popup: None,
            should_quit: false,
        })
    }

    fn run(&mut self) -> anyhow::Result<()> {
        let fps = self.settings.fps_cap.clamp(10, 240);
        let frame_dt = Duration::from_secs_f32(1.0 / fps as f32);

        while !self.should_quit {
            let _resized = self.term.resize_if_needed()?;

            let events = collect_input_nonblocking(frame_dt)?;
            for ev in events {
                if let Some(action) = map_event_to_action(self.scene.kind(), ev) {
                    self.apply_ui_action(action);
                }
            }

            if let Some(neglect) = self.engine.poll_sadness(chrono::Utc::now()) {
                self.sad = Some(neglect.severity);
                self.message = neglect.message.to_string();
            }

            if let Some((_, shown_at)) = self.badge_popup {
                if shown_at.elapsed() >= Duration::from_secs(BADGE_POPUP_SECS) {
                    self.badge_popup = None;
                }
            }

            self.render_frame()?;
            spin_sleep(frame_dt, Instant::now());
        }

        self.term.end()?;
        save_settings_atomic(&self.paths.settings_path, &self.settings)?;
        Ok(())
    }

    fn apply_ui_action(&mut self, action: UiAction) {
        match action {
            UiAction::Quit => self.should_quit = true,
            UiAction::Care(care) => match self.engine.handle(care, chrono::Utc::now()) {
                Ok(InteractionOutcome::Accepted(a)) => {
                    self.message = a.message.to_string();
                    self.sad = None;
                    if let Some(badge) = a.new_badge {
                        self.badge_popup = Some((badge, Instant::now()));
                    }
                    if let Some(snap) = &mut self.snapshot {
                        snap.count = a.count;
                        snap.score = a.score;
                        snap.stage = a.stage;
                        snap.progress = a.progress;
                        snap.badge_progress = a.badge_progress;
                    }
                }
                Ok(InteractionOutcome::Rejected { reason, score }) => {
                    self.message = reason.feedback().to_string();
                    if let Some(snap) = &mut self.snapshot {
                        snap.score = score;
                    }
                }
                Err(_) => self.message = SAVE_FAILED_MESSAGE.to_string(),
            },
            UiAction::OpenHelp => self.scene = Scene::Help,
            UiAction::CloseOverlay => {
                if self.snapshot.is_some() {
                    self.scene = Scene::Main;
                }
            }
            UiAction::OpenResetConfirm => self.scene = Scene::ConfirmReset,
            UiAction::ConfirmReset => {
                if self.engine.reset().is_ok() {
                    self.snapshot = None;
                    self.sad = None;
                    self.badge_popup = None;
                    self.message.clear();
                    self.scene = Scene::Setup(SetupForm::default());
                } else {
                    self.message = SAVE_FAILED_MESSAGE.to_string();
                    self.scene = Scene::Main;
                }
            }
            UiAction::FormChar(ch) => {
                if let Scene::Setup(form) = &mut self.scene {
                    let field = form.active_mut();
                    if field.len() < 32 {
                        field.push(ch);
                    }
                }
            }
            UiAction::FormBackspace => {
                if let Scene::Setup(form) = &mut self.scene {
                    form.active_mut().pop();
                }
            }
            UiAction::FormNext => {
                if let Scene::Setup(form) = &mut self.scene {
                    form.field = (form.field + 1) % 3;
                }
            }
            UiAction::FormPrev => {
                if let Scene::Setup(form) = &mut self.scene {
                    form.field = (form.field + 2) % 3;
                }
            }
            UiAction::FormSubmit => self.submit_setup(),
        }
    }

    fn submit_setup(&mut self) {
        let Scene::Setup(form) = &mut self.scene else {
            return;
        };
        if let Err(e) = form.validate() {
            form.error = Some(e);
            return;
        }

        let welcome = match form.owner_age.trim().parse::<u32>() {
            Ok(age) => welcome_message_for_age(age),
            Err(_) => "Age not recognized, but we know you have a beautiful soul.",
        };

        match self.engine.create_profile(
            form.owner_name.trim(),
            form.owner_age.trim(),
            form.plant_name.trim(),
            chrono::Utc::now(),
        ) {
            Ok(snap) => {
                self.snapshot = Some(snap);
                self.scene = Scene::Main;
                self.message = welcome.to_string();
                self.sad = None;
            }
            Err(_) => form.error = Some(SAVE_FAILED_MESSAGE),
        }
    }

    fn render_frame(&mut self) -> anyhow::Result<()> {
        let bg = Color::Black;
        self.term.cur.clear(bg);

        if matches!(self.scene, Scene::Setup(_)) {
            self.draw_setup_screen();
        } else {
            self.draw_main_screen();
        }

        if matches!(self.scene, Scene::Help) {
            self.draw_center_box(
                "How to play",
                "Goal: grow your plant with balanced, regular care.\n\
                 Every third accepted action advances it one stage.\n\n\
                 W Water: hydrate the little one.\n\
                 S Sun: let the light in.\n\
                 F Fertilizer: only after 4 other care actions.\n\
                 T Talk: kind words, repeat as much as you like.\n\n\
                 Repeating any other action twice in a row costs points.\n\
                 Left alone for 10 seconds, the plant gets lonely.\n\
                 Milestone badges unlock at 5, 10, 15 and 20 actions.\n\n\
                 R reset everything | Esc close help",
            );
        }

        if matches!(self.scene, Scene::ConfirmReset) {
            self.draw_center_box(
                "Start over?",
                "This erases your plant, score and badges.\n\nY yes, reset | N keep caring",
            );
        }

        if let Some((badge, _)) = self.badge_popup {
            self.draw_center_box(
                "New Badge!",
                &format!("{} {}", badge.icon, badge.text),
            );
        }

        if !self.settings.enable_color {
            for cell in &mut self.term.cur.cells {
                cell.fg = Color::White;
                cell.bg = Color::Black;
            }
        }

        self.term.present(true)?;
        Ok(())
    }

    fn draw_setup_screen(&mut self) {
        let buf = &mut self.term.cur;
        let x = 4;
        let mut y = 2;

        draw_text(buf, x, y, "Welcome to Sproutling", Color::Green, Color::Black);
        y += 2;
        draw_text(
            buf,
            x,
            y,
            "Tell us about yourself and your new plant.",
            Color::White,
            Color::Black,
        );
        y += 2;

        let Scene::Setup(form) = &self.scene else {
            return;
        };
        let fields = [
            ("Your name", &form.owner_name),
            ("Your age", &form.owner_age),
            ("Plant name", &form.plant_name),
        ];
        for (i, (label, value)) in fields.iter().enumerate() {
            let marker = if form.field == i { "> " } else { "  " };
            let cursor = if form.field == i { "_" } else { "" };
            let line = format!("{}{}: {}{}", marker, label, value, cursor);
            let fg = if form.field == i {
                Color::Yellow
            } else {
                Color::Grey
            };
            draw_text(buf, x, y, &line, fg, Color::Black);
            y += 2;
        }

        if let Some(err) = form.error {
            draw_text(buf, x, y, err, Color::Red, Color::Black);
            y += 2;
        }
        draw_text(
            buf,
            x,
            y,
            "Tab next field | Enter start | Esc quit",
            Color::DarkGrey,
            Color::Black,
        );
    }

    fn draw_main_screen(&mut self) {
        let session_count = self.engine.session_count();
        let Some(snap) = &self.snapshot else {
            return;
        };
        let buf = &mut self.term.cur;
        let x = 2;
        let mut y = 1;

        draw_text(
            buf,
            x,
            y,
            &format!("{}'s plant: {}", snap.owner_name, snap.plant_name),
            Color::Green,
            Color::Black,
        );
        y += 2;
        draw_text(
            buf,
            x,
            y,
            &format!(
                "Stage: {} ({}/{})",
                snap.stage.name,
                snap.stage.index + 1,
                STAGES.len()
            ),
            Color::White,
            Color::Black,
        );
        y += 1;
        draw_text(
            buf,
            x,
            y,
            &format!(
                "Interactions: {} (this session: {})",
                snap.count, session_count
            ),
            Color::White,
            Color::Black,
        );
        y += 1;
        draw_text(
            buf,
            x,
            y,
            &format!("Score: {}", snap.score),
            Color::White,
            Color::Black,
        );
        y += 2;

        draw_bar(buf, x, y, 24, snap.progress, Color::Green);
        draw_text(
            buf,
            x + 25,
            y,
            &format!("{}% to next stage", snap.progress),
            Color::DarkGrey,
            Color::Black,
        );
        y += 2;

        draw_text(buf, x, y, "Badges:", Color::White, Color::Black);
        y += 1;
        for status in &snap.badge_progress {
            let line = if status.unlocked {
                format!("{} {}", status.badge.icon, status.badge.text)
            } else {
                format!("x {}", status.badge.text)
            };
            let fg = if status.unlocked {
                Color::Yellow
            } else {
                Color::DarkGrey
            };
            draw_text(buf, x, y, &line, fg, Color::Black);
            draw_bar(buf, x + 2, y + 1, 16, status.progress, Color::Cyan);
            y += 2;
        }

        // plant on the right side
        let art = match self.sad {
            Some(severity) => sad_art(severity),
            None => plant_art(snap.stage.art_id),
        };
        let art_x = self.term.cols.saturating_sub(24).max(46);
        draw_art(buf, art_x, 3, art, Color::Green);

        let bottom = self.term.rows.saturating_sub(3);
        draw_text(buf, x, bottom, &self.message, Color::Cyan, Color::Black);
        draw_text(
            buf,
            x,
            bottom + 1,
            "W water | S sun | F fertilizer | T talk | R reset | H help | Q quit",
            Color::DarkGrey,
            Color::Black,
        );
    }

    fn draw_center_box(&mut self, title: &str, body: &str) {
        let buf = &mut self.term.cur;
        let w = buf.w;
        let h = buf.h;

        let bw = 58.min(w.saturating_sub(4));
        let bh = 18.min(h.saturating_sub(4));
        let x0 = (w - bw) / 2;
        let y0 = (h - bh) / 2;

        for y in y0..y0 + bh {
            for x in x0..x0 + bw {
                let ch = match (x, y) {
                    _ if (x, y) == (x0, y0) => '┌',
                    _ if (x, y) == (x0 + bw - 1, y0) => '┐',
                    _ if (x, y) == (x0, y0 + bh - 1) => '└',
                    _ if (x, y) == (x0 + bw - 1, y0 + bh - 1) => '┘',
                    _ if y == y0 || y == y0 + bh - 1 => '─',
                    _ if x == x0 || x == x0 + bw - 1 => '│',
                    _ => ' ',
                };
                buf.set(
                    x,
                    y,
                    crate::render::Cell {
                        ch,
                        fg: Color::White,
                        bg: Color::Black,
                        bold: false,
                    },
                );
            }
        }

        draw_text(buf, x0 + 2, y0 + 1, title, Color::Yellow, Color::Black);
        let mut yy = y0 + 3;
        for line in body.lines() {
            if yy >= y0 + bh - 1 {
                break;
            }
            draw_text(buf, x0 + 2, yy, line.trim_start(), Color::White, Color::Black);
            yy += 1;
        }
    }
}

pub(crate) fn run() -> anyhow::Result<()> {
    let mut app = App::init()?;
    app.run()?;
    Ok(())
}

/* -----------------------------
   Frame pacing helper
------------------------------ */

fn spin_sleep(target: Duration, now: Instant) {
    let end = now + target;
    loop {
        let t = Instant::now();
        if t >= end {
            break;
        }
        let left = end - t;
        if left > Duration::from_millis(2) {
            std::thread::sleep(Duration::from_millis(1));
        } else {
            std::hint::spin_loop();
        }
    }
}
