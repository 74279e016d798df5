use std::collections::VecDeque;

/// Fixed-capacity ring of log lines
#[derive(Debug, Clone)]
pub struct LineBuffer {
    lines: VecDeque<String>,
    capacity: usize,
}

impl LineBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Split `text` on newlines and keep the non-empty lines
    pub fn push_text(&mut self, text: &str) {
        for line in text.lines().map(str::trim_end).filter(|l| !l.is_empty()) {
            if self.capacity == 0 {
                return;
            }
            if self.lines.len() == self.capacity {
                self.lines.pop_front();
            }
            self.lines.push_back(line.to_string());
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_newest_lines() {
        let mut buffer = LineBuffer::new(2);
        buffer.push_text("one\ntwo\n");
        buffer.push_text("three\n\n");

        assert_eq!(buffer.lines(), vec!["two", "three"]);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let mut buffer = LineBuffer::new(0);
        buffer.push_text("dropped");
        assert!(buffer.is_empty());
    }
}
