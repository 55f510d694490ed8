/// Terminal viewer for meshprep meshes
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal,
};
use log::warn;
use meshprep_core::{Mesh, MeshData};
use std::io::{self, stdout, Write};
use std::time::{Duration, Instant};

pub mod config;
pub mod device;
pub mod inspect;
pub mod renderer;
pub mod view;

pub use config::{SpinRates, ViewerConfig};
pub use device::AsciiDevice;
pub use inspect::Report;
pub use renderer::AsciiRenderer;
pub use view::{Camera, Spin};

/// Radians per key press
const KEY_STEP: f32 = 0.1;

/// Spinning ASCII render loop around one uploaded mesh
pub struct TerminalApp {
    mesh: Mesh,
    device: AsciiDevice,
    spin: Spin,
    rates: SpinRates,
    frame_time: Duration,
    title: String,
    running: bool,
    last_sample: Instant,
    frame_count: u32,
    fps: f32,
    max_frames: Option<u64>,
}

impl TerminalApp {
    pub fn new(data: MeshData, title: impl Into<String>, config: &ViewerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let (columns, rows) = terminal::size()?;
        let mut device = AsciiDevice::new(columns, rows, Camera::new(columns, rows, config.camera_distance));
        let mesh = Mesh::from_data(&mut device, data)?;

        Ok(Self {
            mesh,
            device,
            spin: Spin {
                x: 0.3,
                y: 0.3,
                z: 0.0,
            },
            rates: config.spin,
            frame_time: Duration::from_secs(1) / config.fps.max(1),
            title: title.into(),
            running: true,
            last_sample: Instant::now(),
            frame_count: 0,
            fps: 0.0,
            max_frames: None,
        })
    }

    /// Stop on its own after `frames` frames
    pub fn with_max_frames(mut self, frames: Option<u64>) -> Self {
        self.max_frames = frames;
        self
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.main_loop();

        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;
        self.mesh.clear(&mut self.device);

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        let mut frames: u64 = 0;
        while self.running {
            let frame_start = Instant::now();

            while event::poll(Duration::ZERO)? {
                self.handle_event(event::read()?);
            }

            self.spin.rotate(self.rates.x, self.rates.y, self.rates.z);
            self.render()?;

            frames += 1;
            if self.max_frames.is_some_and(|max| frames >= max) {
                self.running = false;
            }

            let elapsed = frame_start.elapsed();
            if elapsed < self.frame_time {
                std::thread::sleep(self.frame_time - elapsed);
            }

            self.frame_count += 1;
            let since = self.last_sample.elapsed();
            if since >= Duration::from_secs(1) {
                self.fps = self.frame_count as f32 / since.as_secs_f32();
                self.frame_count = 0;
                self.last_sample = Instant::now();
            }
        }
        Ok(())
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(KeyEvent {
                code,
                kind: KeyEventKind::Press | KeyEventKind::Repeat,
                ..
            }) => match code {
                KeyCode::Char('q') | KeyCode::Esc => self.running = false,
                KeyCode::Char('w') | KeyCode::Up => self.spin.rotate(KEY_STEP, 0.0, 0.0),
                KeyCode::Char('s') | KeyCode::Down => self.spin.rotate(-KEY_STEP, 0.0, 0.0),
                KeyCode::Char('a') | KeyCode::Left => self.spin.rotate(0.0, -KEY_STEP, 0.0),
                KeyCode::Char('d') | KeyCode::Right => self.spin.rotate(0.0, KEY_STEP, 0.0),
                KeyCode::Char('e') => self.spin.rotate(0.0, 0.0, KEY_STEP),
                KeyCode::Char('r') => self.spin.rotate(0.0, 0.0, -KEY_STEP),
                _ => {}
            },
            Event::Resize(columns, rows) => self.device.resize(columns, rows),
            _ => {}
        }
    }

    fn render(&mut self) -> io::Result<()> {
        self.device.begin_frame(self.spin.model_matrix());
        if let Err(e) = self.mesh.render(&mut self.device) {
            warn!("frame skipped: {}", e);
        }

        let mut stdout = stdout();
        self.device.renderer().draw(&mut stdout)?;
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "{} | {} verts {} tris | FPS: {:.1} | WASD/Arrows=Rotate E/R=Roll Q=Quit",
                self.title,
                self.mesh.vertex_count(),
                self.mesh.index_count() / 3,
                self.fps
            )),
            ResetColor
        )?;
        stdout.flush()
    }
}
