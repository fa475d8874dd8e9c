use std::fmt;

/// How far the contributor is through the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: u32,
    pub total: u32,
}

impl Progress {
    pub fn new(completed: u32, total: u32) -> Self {
        Self { completed, total }
    }

    pub fn is_done(&self) -> bool {
        self.completed >= self.total
    }

    /// Current contribution number, e.g. "CONTRIBUTION 3 OF 5".
    /// Never counts past the last contribution.
    pub fn status_line(&self) -> String {
        let current = (self.completed + 1).min(self.total.max(1));
        format!("CONTRIBUTION {} OF {}", current, self.total)
    }

    /// One dot per contribution, filled for the completed ones
    pub fn dots(&self) -> String {
        let filled = self.completed.min(self.total) as usize;
        let empty = self.total as usize - filled;
        format!("{}{}", "●".repeat(filled), "○".repeat(empty))
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.dots(), self.completed.min(self.total), self.total)
    }
}
