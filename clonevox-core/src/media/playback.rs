//! File and buffer playback on the default output device.
//!
//! The decoded source is handed to one rodio sink at a time; the sink's
//! clock provides position, and the decoder's reported length provides
//! duration (0 when the container does not carry one, e.g. some mp3s).

use std::cell::{Cell, RefCell};
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;
use std::time::Duration;

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use tracing::debug;

use crate::media::gateway::MediaError;

pub struct FilePlayer {
    // Dropping the stream kills audio for every sink built on it.
    _stream: OutputStream,
    handle: OutputStreamHandle,
    sink: RefCell<Option<Sink>>,
    duration_ms: Cell<u64>,
}

impl FilePlayer {
    pub fn new() -> Result<Self, MediaError> {
        let (stream, handle) =
            OutputStream::try_default().map_err(|e| MediaError::Device(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            handle,
            sink: RefCell::new(None),
            duration_ms: Cell::new(0),
        })
    }

    pub fn play_file(&self, path: &Path) -> Result<(), MediaError> {
        let file = File::open(path)?;
        debug!(?path, "starting file playback");
        self.play_source(BufReader::new(file))
    }

    pub fn play_bytes(&self, bytes: Vec<u8>) -> Result<(), MediaError> {
        self.play_source(Cursor::new(bytes))
    }

    fn play_source<R>(&self, reader: R) -> Result<(), MediaError>
    where
        R: Read + Seek + Send + Sync + 'static,
    {
        // Release the previous sink before acquiring a new one.
        self.stop();

        let source = Decoder::new(reader).map_err(|e| MediaError::Device(e.to_string()))?;
        let total = source
            .total_duration()
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let sink = Sink::try_new(&self.handle).map_err(|e| MediaError::Device(e.to_string()))?;
        sink.append(source);

        self.duration_ms.set(total);
        *self.sink.borrow_mut() = Some(sink);
        Ok(())
    }

    pub fn pause(&self) {
        if let Some(sink) = self.sink.borrow().as_ref() {
            sink.pause();
        }
    }

    pub fn resume(&self) {
        if let Some(sink) = self.sink.borrow().as_ref() {
            sink.play();
        }
    }

    pub fn stop(&self) {
        if let Some(sink) = self.sink.borrow_mut().take() {
            sink.stop();
        }
        self.duration_ms.set(0);
    }

    pub fn seek(&self, position_ms: u64) -> Result<(), MediaError> {
        let guard = self.sink.borrow();
        let Some(sink) = guard.as_ref() else {
            return Ok(());
        };

        sink.try_seek(Duration::from_millis(position_ms))
            .map_err(|e| MediaError::Device(format!("seek failed: {e}")))
    }

    pub fn position_ms(&self) -> u64 {
        self.sink
            .borrow()
            .as_ref()
            .map(|sink| sink.get_pos().as_millis() as u64)
            .unwrap_or(0)
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms.get()
    }

    pub fn is_playing(&self) -> bool {
        self.sink
            .borrow()
            .as_ref()
            .map(|sink| !sink.is_paused() && !sink.empty())
            .unwrap_or(false)
    }
}
