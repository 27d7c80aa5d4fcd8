use crate::model::NeglectSeverity;
use crossterm::{
    cursor, execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::io::{self, Write};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) ch: char,
    pub(crate) fg: Color,
    pub(crate) bg: Color,
    pub(crate) bold: bool,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::White,
            bg: Color::Black,
            bold: false,
        }
    }
}

pub(crate) struct CellBuffer {
    pub(crate) w: u16,
    pub(crate) h: u16,
    pub(crate) cells: Vec<Cell>,
}

impl CellBuffer {
    pub(crate) fn new(w: u16, h: u16) -> Self {
        Self {
            w,
            h,
            cells: vec![Cell::default(); (w as usize) * (h as usize)],
        }
    }
    pub(crate) fn idx(&self, x: u16, y: u16) -> usize {
        (y as usize) * (self.w as usize) + (x as usize)
    }
    pub(crate) fn set(&mut self, x: u16, y: u16, c: Cell) {
        if x < self.w && y < self.h {
            let i = self.idx(x, y);
            self.cells[i] = c;
        }
    }
    pub(crate) fn clear(&mut self, bg: Color) {
        for c in &mut self.cells {
            c.ch = ' ';
            c.fg = Color::White;
            c.bg = bg;
            c.bold = false;
        }
    }
}

pub(crate) struct Terminal {
    pub(crate) out: io::Stdout,
    pub(crate) cols: u16,
    pub(crate) rows: u16,
    pub(crate) prev: CellBuffer,
    pub(crate) cur: CellBuffer,
}

impl Terminal {
    pub(crate) fn begin() -> anyhow::Result<Self> {
        let mut out = io::stdout();
        execute!(
            out,
            EnterAlternateScreen,
            cursor::Hide,
            DisableLineWrap,
            terminal::Clear(ClearType::All)
        )?;
        terminal::enable_raw_mode()?;

        let (cols, rows) = terminal::size()?;
        let prev = CellBuffer::new(cols, rows);
        let cur = CellBuffer::new(cols, rows);

        Ok(Self {
            out,
            cols,
            rows,
            prev,
            cur,
        })
    }

    pub(crate) fn end(&mut self) -> anyhow::Result<()> {
        queue!(
            self.out,
            BeginSynchronizedUpdate,
            ResetColor,
            Clear(ClearType::All),
            cursor::Show,
            EnableLineWrap,
            EndSynchronizedUpdate,
            LeaveAlternateScreen
        )?;
        self.out.flush()?;
        terminal::disable_raw_mode()?;
        Ok(())
    }

    pub(crate) fn resize_if_needed(&mut self) -> anyhow::Result<bool> {
        let (c, r) = terminal::size()?;
        if c == self.cols && r == self.rows {
            return Ok(false);
        }
        self.cols = c;
        self.rows = r;
        self.prev = CellBuffer::new(c, r);
        self.cur = CellBuffer::new(c, r);
        Ok(true)
    }

    pub(crate) fn present(&mut self, diff_only: bool) -> anyhow::Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;

        let mut last_fg = None;
        let mut last_bg = None;

        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = self.cur.idx(x, y);
                let c = self.cur.cells[i];
                if diff_only && c == self.prev.cells[i] {
                    continue;
                }

                queue!(self.out, cursor::MoveTo(x, y))?;

                if last_fg != Some(c.fg) {
                    queue!(self.out, SetForegroundColor(c.fg))?;
                    last_fg = Some(c.fg);
                }
                if last_bg != Some(c.bg) {
                    queue!(self.out, SetBackgroundColor(c.bg))?;
                    last_bg = Some(c.bg);
                }

                queue!(self.out, Print(c.ch))?;
            }
        }

        queue!(self.out, ResetColor, EndSynchronizedUpdate)?;
        self.out.flush()?;
        self.prev.cells.copy_from_slice(&self.cur.cells);
        Ok(())
    }
}

pub(crate) fn draw_text(buf: &mut CellBuffer, x: u16, y: u16, text: &str, fg: Color, bg: Color) {
    let mut xx = x;
    for ch in text.chars() {
        if xx >= buf.w {
            break;
        }
        buf.set(
            xx,
            y,
            Cell {
                ch,
                fg,
                bg,
                bold: false,
            },
        );
        xx += 1;
    }
}

/// Horizontal progress bar, `percent` in 0..=100.
pub(crate) fn draw_bar(buf: &mut CellBuffer, x: u16, y: u16, width: u16, percent: u8, fg: Color) {
    let filled = (width as u32 * percent as u32 / 100) as u16;
    for i in 0..width {
        let ch = if i < filled { '█' } else { '░' };
        buf.set(
            x + i,
            y,
            Cell {
                ch,
                fg,
                bg: Color::Black,
                bold: false,
            },
        );
    }
}

pub(crate) fn plant_art(art_id: &str) -> &'static [&'static str] {
    match art_id {
        "seed" => &[
            "          ",
            "          ",
            "          ",
            "   (@)    ",
            "__________",
        ],
        "sprout" => &[
            "          ",
            "          ",
            "    ,     ",
            "   _|_    ",
            "__________",
        ],
        "tiny" => &[
            "          ",
            "   \\|/    ",
            "    |     ",
            "   _|_    ",
            "__________",
        ],
        "young" => &[
            "   .o.    ",
            "   \\|/    ",
            "    |     ",
            "   _|_    ",
            "__________",
        ],
        "growing" => &[
            "  \\\\|//   ",
            "  \\\\|//   ",
            "    |     ",
            "   _|_    ",
            "__________",
        ],
        "big" => &[
            " \\\\\\|///  ",
            " \\\\\\|///  ",
            "    |     ",
            "   /|\\    ",
            "__________",
        ],
        "mature" => &[
            " *\\\\|//*  ",
            "\\\\\\\\|////  ",
            "  * | *   ",
            "   /|\\    ",
            "__________",
        ],
        _ => &[
            "          ",
            "    ?     ",
            "          ",
            "          ",
            "__________",
        ],
    }
}

pub(crate) fn sad_art(severity: NeglectSeverity) -> &'static [&'static str] {
    match severity {
        NeglectSeverity::Sprout => &[
            "          ",
            "          ",
            "    ,     ",
            "   _\\_ ;  ",
            "__________",
        ],
        NeglectSeverity::Juvenile => &[
            "          ",
            "   \\|,    ",
            "    \\  ;  ",
            "   _|_    ",
            "__________",
        ],
        NeglectSeverity::Mature => &[
            "  \\\\,//   ",
            "   \\|, ;  ",
            "    \\     ",
            "   _|_    ",
            "__________",
        ],
        NeglectSeverity::FullyGrown => &[
            " ,\\\\|//,  ",
            "\\\\,,|,///  ",
            "  ; | ;   ",
            "   /|\\    ",
            "__________",
        ],
    }
}

pub(crate) fn draw_art(buf: &mut CellBuffer, x: u16, y: u16, art: &[&str], fg: Color) {
    for (dy, line) in art.iter().enumerate() {
        draw_text(buf, x, y + dy as u16, line, fg, Color::Black);
    }
}
