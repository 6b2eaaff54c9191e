//! Renders login progress on the auxiliary (stderr) stream.

use std::fmt;
use std::io::Write;
use std::time::Duration;

use lab_login::LoginEvent;
use lab_login::LoginOutcome;

/// How often the waiting spinner advances between polls.
pub const SPINNER_INTERVAL: Duration = Duration::from_millis(300);

const WAITING_PREFIX: &str = "Waiting for the session to be authorized... ";
const SPINNER_FRAMES: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

pub struct ProgressRenderer<W: Write> {
    out: W,
    waiting: bool,
    frame: usize,
}

impl<W: Write> ProgressRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            waiting: false,
            frame: 0,
        }
    }

    pub fn handle(&mut self, event: &LoginEvent) {
        match event {
            LoginEvent::OpeningBrowser { url } => {
                self.write(format_args!("Opening {url} in your browser...\n"));
            }
            LoginEvent::BrowserUnavailable { .. } => {
                self.write(format_args!(
                    "Couldn't open the browser. Copy the above URL into a browser manually and follow the instructions on the page.\n"
                ));
            }
            LoginEvent::AwaitingAuthorization => self.start_waiting(),
            LoginEvent::Waiting { .. } => self.tick(),
            LoginEvent::Authorized => {
                self.start_waiting();
                self.write(format_args!("\r{WAITING_PREFIX}Done.\n"));
                self.waiting = false;
            }
        }
    }

    /// Advance the spinner. Does nothing unless a wait is in progress.
    pub fn tick(&mut self) {
        if self.waiting {
            self.frame = (self.frame + 1) % SPINNER_FRAMES.len();
            self.draw_spinner();
        }
    }

    /// Print the closing line for a finished login.
    pub fn finish(&mut self, outcome: LoginOutcome) {
        if self.waiting {
            self.write(format_args!("\n"));
            self.waiting = false;
        }
        match outcome {
            LoginOutcome::Authenticated => self.write(format_args!("Authenticated.\n")),
            LoginOutcome::Authorized => self.write(format_args!(
                "\nSession authorized. You can now use labctl commands.\n"
            )),
            LoginOutcome::TimedOut => self.write(format_args!(
                "Timed out waiting for the session to be authorized. Run 'labctl auth login' to try again.\n"
            )),
            LoginOutcome::Cancelled => self.write(format_args!("Login cancelled.\n")),
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }

    fn start_waiting(&mut self) {
        if !self.waiting {
            self.write(format_args!("\n"));
            self.waiting = true;
            self.frame = 0;
            self.draw_spinner();
        }
    }

    fn draw_spinner(&mut self) {
        let frame = SPINNER_FRAMES[self.frame];
        self.write(format_args!("\r{WAITING_PREFIX}{frame}"));
    }

    // Progress output is best effort; a closed stderr must not fail the login.
    fn write(&mut self, args: fmt::Arguments<'_>) {
        let _ = self.out.write_fmt(args);
        let _ = self.out.flush();
    }
}
