//! Background texture loading. Requests are fetched and decoded on the
//! blocking pool; completions come back to the view loop over a channel.

use crate::assets::source::{load_texture_image, ImageLoadError, ImageSource};
use crate::render::TextureImage;
use crate::scene::TextureRef;
use tokio::sync::mpsc;

/// Completion of one texture request.
#[derive(Debug)]
pub struct TextureEvent {
    pub reference: TextureRef,
    pub result: Result<TextureImage, ImageLoadError>,
}

#[derive(Debug, Clone)]
pub struct TextureLoader {
    events: mpsc::UnboundedSender<TextureEvent>,
}

impl TextureLoader {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TextureEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        (Self { events }, receiver)
    }

    /// Starts loading `source`. Must be called inside a tokio runtime.
    /// In-flight loads are never cancelled; the receiver decides whether the
    /// result is still wanted.
    pub fn request(&self, reference: TextureRef, source: ImageSource) {
        log::debug!("Loading texture {}", reference);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = match tokio::task::spawn_blocking(move || load_texture_image(&source)).await
            {
                Ok(result) => result,
                Err(join) => Err(ImageLoadError::from(join)),
            };
            if events.send(TextureEvent { reference, result }).is_err() {
                log::debug!("Texture completion dropped: view is gone");
            }
        });
    }
}
