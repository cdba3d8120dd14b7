use anyhow::{anyhow, Result};
use maxchat_core::Clipboard;

/// The platform clipboard, opened on first copy
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    fn handle(&mut self) -> Result<&mut arboard::Clipboard> {
        if self.inner.is_none() {
            let clipboard = arboard::Clipboard::new().map_err(|e| anyhow!("clipboard unavailable: {e}"))?;
            self.inner = Some(clipboard);
        }
        self.inner.as_mut().ok_or_else(|| anyhow!("clipboard unavailable"))
    }
}

impl Clipboard for SystemClipboard {
    fn write_text(&mut self, text: &str) -> Result<()> {
        let result = self.handle()?.set_text(text.to_string());
        if let Err(e) = result {
            // A stale connection is reopened on the next copy
            self.inner = None;
            return Err(anyhow!("clipboard write failed: {e}"));
        }
        tracing::debug!(bytes = text.len(), "wrote clipboard");
        Ok(())
    }
}
