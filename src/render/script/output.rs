use super::ScriptError;

/// Captured output stream with a hard size cap
#[derive(Debug)]
pub struct Output {
    buf: String,
    limit: usize,
}

impl Output {
    pub fn new(limit: usize) -> Self {
        Self {
            buf: String::new(),
            limit,
        }
    }

    pub fn write(&mut self, text: &str) -> Result<(), ScriptError> {
        if self.buf.len() + text.len() > self.limit {
            return Err(ScriptError::OutputLimit(self.limit));
        }
        self.buf.push_str(text);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_string(self) -> String {
        self.buf
    }
}
