//! The stream table.
//!
//! A fixed array of [`FOPEN_MAX`] slots. Slots 0..3 are the standard
//! streams and are never handed out by `open`. Operations borrow the
//! allocator and host they need for the duration of the call.

use std::fmt;

use sandlibc_membrane::{Diagnostic, FetchStatus, Host};

use super::buffer::{BufMode, BufferStorage};
use super::stream::{Stream, StreamState};
use super::{BUFSIZ, FOPEN_MAX, StdioError, StreamId, Whence};
use crate::malloc::{Allocation, BlockAllocator};

/// First slot `open` may use.
pub const FIRST_USER_SLOT: usize = 3;

/// Result of one [`StreamTable::poll`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Slots that became ready.
    pub ready: Vec<StreamId>,
    /// Slots whose fetch failed or whose data could not be buffered.
    pub failed: Vec<StreamId>,
}

/// Fixed-capacity table of stream slots.
#[derive(Debug)]
pub struct StreamTable {
    slots: Vec<Stream>,
}

impl Default for StreamTable {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamTable {
    /// Table with the standard streams in place: `stdin` without a source,
    /// line-buffered `stdout`, unbuffered `stderr`.
    #[must_use]
    pub fn new() -> Self {
        let mut slots: Vec<Stream> = (0..FOPEN_MAX).map(|_| Stream::closed()).collect();
        slots[StreamId::STDIN.index()] = Stream::standard_input();
        slots[StreamId::STDOUT.index()] = Stream::standard_output("stdout", BufMode::Line, BUFSIZ);
        slots[StreamId::STDERR.index()] = Stream::standard_output("stderr", BufMode::None, BUFSIZ);
        Self { slots }
    }

    /// Slot state, open or not.
    #[must_use]
    pub fn get(&self, id: StreamId) -> Option<&Stream> {
        self.slots.get(id.index())
    }

    fn open_slot(&self, id: StreamId) -> Result<&Stream, StdioError> {
        match self.slots.get(id.index()) {
            Some(stream) if stream.is_open() => Ok(stream),
            _ => Err(Diagnostic::StreamNotOpen { slot: id.index() }.into()),
        }
    }

    fn open_slot_mut(&mut self, id: StreamId) -> Result<&mut Stream, StdioError> {
        match self.slots.get_mut(id.index()) {
            Some(stream) if stream.is_open() => Ok(stream),
            _ => Err(Diagnostic::StreamNotOpen { slot: id.index() }.into()),
        }
    }

    /// Slots currently open, standard streams included.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_open()).count()
    }

    #[must_use]
    pub fn is_ready(&self, id: StreamId) -> bool {
        self.get(id).is_some_and(Stream::is_ready)
    }

    #[must_use]
    pub fn eof(&self, id: StreamId) -> bool {
        self.get(id).is_some_and(|s| s.is_open() && s.eof)
    }

    #[must_use]
    pub fn error(&self, id: StreamId) -> bool {
        self.get(id).is_some_and(|s| s.is_open() && s.error)
    }

    pub fn clear_error(&mut self, id: StreamId) -> Result<(), StdioError> {
        let stream = self.open_slot_mut(id)?;
        stream.eof = false;
        stream.error = false;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Opening and closing
    // -----------------------------------------------------------------------

    /// Opens `name` for binary reading. The slot becomes ready once
    /// [`Self::poll`] sees the host deliver the data.
    pub fn open<H: Host + ?Sized>(
        &mut self,
        heap: &mut BlockAllocator,
        host: &mut H,
        name: &str,
        mode: &str,
    ) -> Result<StreamId, StdioError> {
        check_mode(mode)?;
        let Some(index) = (FIRST_USER_SLOT..self.slots.len()).find(|&i| !self.slots[i].is_open())
        else {
            return Err(StdioError::TableFull);
        };
        let id = StreamId(index);
        self.open_into(heap, host, id, name)?;
        Ok(id)
    }

    /// Closes `id` if open and opens `name` into the same slot.
    pub fn reopen<H: Host + ?Sized>(
        &mut self,
        heap: &mut BlockAllocator,
        host: &mut H,
        id: StreamId,
        name: &str,
        mode: &str,
    ) -> Result<StreamId, StdioError> {
        check_mode(mode)?;
        if id.index() >= self.slots.len() {
            return Err(Diagnostic::StreamNotOpen { slot: id.index() }.into());
        }
        if self.slots[id.index()].is_open() {
            self.close(heap, host, id)?;
        }
        self.open_into(heap, host, id, name)?;
        Ok(id)
    }

    fn open_into<H: Host + ?Sized>(
        &mut self,
        heap: &mut BlockAllocator,
        host: &mut H,
        id: StreamId,
        name: &str,
    ) -> Result<(), StdioError> {
        let placeholder = heap.allocate(host, BUFSIZ)?;
        let ticket = host.fetch_resource(name);
        self.slots[id.index()] = Stream {
            state: StreamState::Opening(ticket),
            readable: true,
            storage: BufferStorage::Owned(placeholder),
            capacity: BUFSIZ,
            name: Some(name.to_owned()),
            ..Stream::closed()
        };
        Ok(())
    }

    /// Collects host deliveries for every slot still opening. Call once per
    /// frame.
    pub fn poll<H: Host + ?Sized>(&mut self, heap: &mut BlockAllocator, host: &mut H) -> PollReport {
        let mut report = PollReport::default();
        for index in 0..self.slots.len() {
            let StreamState::Opening(ticket) = self.slots[index].state else {
                continue;
            };
            match host.poll_fetch(ticket) {
                FetchStatus::Pending => {}
                FetchStatus::Ready(bytes) => {
                    if self.deliver(heap, host, index, &bytes).is_ok() {
                        report.ready.push(StreamId(index));
                    } else {
                        report.failed.push(StreamId(index));
                    }
                }
                FetchStatus::Failed => {
                    let stream = &mut self.slots[index];
                    stream.state = StreamState::Unavailable;
                    stream.error = true;
                    stream.eof = true;
                    report.failed.push(StreamId(index));
                }
            }
        }
        report
    }

    /// Moves fetched bytes into a NUL-terminated grant of their own size.
    fn deliver<H: Host + ?Sized>(
        &mut self,
        heap: &mut BlockAllocator,
        host: &mut H,
        index: usize,
        bytes: &[u8],
    ) -> Result<(), StdioError> {
        let grant = match heap.allocate(host, bytes.len() + 1) {
            Ok(grant) => grant,
            Err(err) => {
                let stream = &mut self.slots[index];
                stream.state = StreamState::Unavailable;
                stream.error = true;
                stream.eof = true;
                return Err(err.into());
            }
        };
        if let Some(dest) = host.memory_mut().get_mut(grant.range()) {
            dest[..bytes.len()].copy_from_slice(bytes);
            dest[bytes.len()] = 0;
        }
        let stream = &mut self.slots[index];
        let previous = std::mem::replace(&mut stream.storage, BufferStorage::Owned(grant));
        stream.state = StreamState::Ready;
        stream.capacity = bytes.len();
        stream.extent = bytes.len();
        stream.cursor = 0;
        stream.eof = false;
        stream.error = false;
        if let Some(old) = previous.owned() {
            heap.release(old)?;
        }
        Ok(())
    }

    /// Flushes, releases an owned buffer and frees the slot.
    pub fn close<H: Host + ?Sized>(
        &mut self,
        heap: &mut BlockAllocator,
        host: &mut H,
        id: StreamId,
    ) -> Result<(), StdioError> {
        self.flush(host, id)?;
        let stream = std::mem::replace(&mut self.slots[id.index()], Stream::closed());
        if let Some(grant) = stream.storage.owned() {
            heap.release(grant)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Reading
    // -----------------------------------------------------------------------

    /// Next byte of a ready readable stream.
    pub fn read_char<H: Host + ?Sized>(&mut self, host: &H, id: StreamId) -> Result<u8, StdioError> {
        let stream = self.open_slot_mut(id)?;
        if !stream.readable {
            if stream.writable {
                stream.eof = true;
            }
            return Err(StdioError::EndOfData);
        }
        if !stream.is_ready() {
            return Err(StdioError::NotReady);
        }
        if stream.cursor >= stream.extent {
            stream.eof = true;
            return Err(StdioError::EndOfData);
        }
        let byte = stream.buffer(host.memory()).get(stream.cursor).copied();
        match byte {
            Some(byte) => {
                stream.cursor += 1;
                Ok(byte)
            }
            None => {
                stream.error = true;
                Err(StdioError::EndOfData)
            }
        }
    }

    /// Reads up to and including the next newline into `buf`, leaving room
    /// for a terminating NUL. Returns the bytes read, excluding the NUL.
    pub fn read_line<H: Host + ?Sized>(
        &mut self,
        host: &H,
        id: StreamId,
        buf: &mut [u8],
    ) -> Result<usize, StdioError> {
        let max = buf.len().saturating_sub(1);
        let mut n = 0;
        while n < max {
            match self.read_char(host, id) {
                Ok(byte) => {
                    buf[n] = byte;
                    n += 1;
                    if byte == b'\n' {
                        break;
                    }
                }
                Err(err) if n == 0 => return Err(err),
                Err(_) => break,
            }
        }
        if let Some(slot) = buf.get_mut(n) {
            *slot = 0;
        }
        Ok(n)
    }

    /// Reads up to `buf.len()` bytes.
    pub fn read<H: Host + ?Sized>(
        &mut self,
        host: &H,
        id: StreamId,
        buf: &mut [u8],
    ) -> Result<usize, StdioError> {
        let mut n = 0;
        while n < buf.len() {
            match self.read_char(host, id) {
                Ok(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                Err(StdioError::EndOfData) => break,
                Err(err) if n == 0 => return Err(err),
                Err(_) => break,
            }
        }
        Ok(n)
    }

    /// Steps a readable stream back one byte and stores `byte` there.
    pub fn unget<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        id: StreamId,
        byte: u8,
    ) -> Result<u8, StdioError> {
        let stream = self.open_slot_mut(id)?;
        if !stream.readable || !stream.is_ready() || stream.cursor == 0 {
            return Err(Diagnostic::UngetRejected { slot: id.index() }.into());
        }
        stream.cursor -= 1;
        let cursor = stream.cursor;
        if let Some(slot) = stream.buffer_mut(host.memory_mut()).get_mut(cursor) {
            *slot = byte;
        }
        stream.eof = false;
        Ok(byte)
    }

    // -----------------------------------------------------------------------
    // Writing
    // -----------------------------------------------------------------------

    /// Appends one byte, flushing per the stream's buffering mode.
    pub fn write_char<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        id: StreamId,
        byte: u8,
    ) -> Result<u8, StdioError> {
        let stream = self.open_slot_mut(id)?;
        if !stream.writable {
            stream.error = true;
            return Err(Diagnostic::WriteToReadOnly { slot: id.index() }.into());
        }
        if stream.mode == BufMode::None || stream.capacity == 0 {
            host.emit_bytes(&[byte]);
            return Ok(byte);
        }
        if stream.cursor >= stream.capacity {
            flush_stream(stream, host);
        }
        let cursor = stream.cursor;
        let stored = match stream.buffer_mut(host.memory_mut()).get_mut(cursor) {
            Some(slot) => {
                *slot = byte;
                true
            }
            None => false,
        };
        if !stored {
            stream.error = true;
            return Err(StdioError::NoBufferSpace);
        }
        stream.cursor += 1;
        if stream.mode == BufMode::Line && byte == b'\n' {
            flush_stream(stream, host);
        }
        Ok(byte)
    }

    /// Appends `bytes`. An unbuffered stream emits them as one chunk.
    pub fn write<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        id: StreamId,
        bytes: &[u8],
    ) -> Result<usize, StdioError> {
        let stream = self.open_slot_mut(id)?;
        if stream.writable && (stream.mode == BufMode::None || stream.capacity == 0) {
            if !bytes.is_empty() {
                host.emit_bytes(bytes);
            }
            return Ok(bytes.len());
        }
        for &byte in bytes {
            self.write_char(host, id, byte)?;
        }
        Ok(bytes.len())
    }

    /// Formats `args` into the stream. Returns the bytes written.
    pub fn write_args<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        id: StreamId,
        args: fmt::Arguments<'_>,
    ) -> Result<usize, StdioError> {
        let mut writer = StreamWriter {
            table: self,
            host,
            id,
            written: 0,
            failure: None,
        };
        match fmt::write(&mut writer, args) {
            Ok(()) => Ok(writer.written),
            Err(_) => Err(writer.failure.unwrap_or(StdioError::EndOfData)),
        }
    }

    /// Hands pending bytes of a writable stream to the host sink.
    pub fn flush<H: Host + ?Sized>(&mut self, host: &mut H, id: StreamId) -> Result<(), StdioError> {
        let stream = self.open_slot_mut(id)?;
        if stream.writable {
            flush_stream(stream, host);
        }
        Ok(())
    }

    /// Flushes every open writable stream.
    pub fn flush_all<H: Host + ?Sized>(&mut self, host: &mut H) {
        for stream in &mut self.slots {
            if stream.is_open() && stream.writable {
                flush_stream(stream, host);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Positioning
    // -----------------------------------------------------------------------

    fn positionable(&mut self, id: StreamId, op: &'static str) -> Result<&mut Stream, StdioError> {
        let stream = self.open_slot_mut(id)?;
        if !stream.readable {
            if stream.writable {
                return Err(Diagnostic::PositioningUnsupported {
                    op,
                    slot: id.index(),
                }
                .into());
            }
            return Err(StdioError::NotReady);
        }
        if !stream.is_ready() {
            return Err(StdioError::NotReady);
        }
        Ok(stream)
    }

    /// Moves the read cursor within the fetched data.
    pub fn seek(&mut self, id: StreamId, offset: i64, whence: Whence) -> Result<(), StdioError> {
        let stream = self.positionable(id, "fseek")?;
        let target = match whence {
            Whence::Set => Some(offset),
            Whence::Cur => i64::try_from(stream.cursor)
                .ok()
                .and_then(|c| c.checked_add(offset)),
            Whence::End => return Err(Diagnostic::SeekFromEnd { slot: id.index() }.into()),
        };
        let extent = stream.extent;
        match target.and_then(|t| usize::try_from(t).ok()) {
            Some(pos) if pos <= extent => {
                stream.cursor = pos;
                stream.eof = false;
                Ok(())
            }
            _ => Err(StdioError::OutOfRange {
                target: target.unwrap_or(i64::MAX),
                extent,
            }),
        }
    }

    /// Current read offset.
    pub fn tell(&mut self, id: StreamId) -> Result<usize, StdioError> {
        Ok(self.positionable(id, "ftell")?.cursor)
    }

    /// Back to offset 0, clearing the eof and error flags.
    pub fn rewind(&mut self, id: StreamId) -> Result<(), StdioError> {
        let stream = self.positionable(id, "rewind")?;
        stream.cursor = 0;
        stream.eof = false;
        stream.error = false;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Buffer control
    // -----------------------------------------------------------------------

    /// Replaces the buffer of `id`. Pending and fetched bytes are discarded.
    ///
    /// Standard output slots go back to their reserved array when `size`
    /// fits in it; everything else gets a fresh allocator grant.
    pub fn set_buffer_mode<H: Host + ?Sized>(
        &mut self,
        heap: &mut BlockAllocator,
        host: &mut H,
        id: StreamId,
        mode: BufMode,
        size: usize,
    ) -> Result<(), StdioError> {
        let stream = self.open_slot_mut(id)?;
        let previous = std::mem::replace(&mut stream.storage, BufferStorage::Empty);
        stream.cursor = 0;
        stream.extent = 0;
        stream.capacity = 0;
        stream.mode = mode;
        if let Some(old) = previous.owned() {
            heap.release(old)?;
        }

        let reserved_fits = stream
            .reserved
            .as_ref()
            .is_some_and(|r| size <= r.len());
        if mode == BufMode::None {
            return Ok(());
        }
        if reserved_fits {
            stream.storage = BufferStorage::Reserved;
            stream.capacity = size.max(1);
            return Ok(());
        }
        match heap.allocate(host, size.max(1)) {
            Ok(grant) => {
                stream.storage = BufferStorage::Owned(grant);
                stream.capacity = size.max(1);
                Ok(())
            }
            Err(err) => {
                stream.mode = BufMode::None;
                Err(err.into())
            }
        }
    }

    /// Lends a caller grant as the buffer of `id`.
    pub fn set_user_buffer(
        &mut self,
        heap: &mut BlockAllocator,
        id: StreamId,
        grant: Allocation,
        mode: BufMode,
    ) -> Result<(), StdioError> {
        let stream = self.open_slot_mut(id)?;
        let previous = std::mem::replace(&mut stream.storage, BufferStorage::Borrowed(grant));
        stream.mode = mode;
        stream.capacity = grant.len();
        stream.cursor = 0;
        stream.extent = 0;
        if let Some(old) = previous.owned() {
            heap.release(old)?;
        }
        Ok(())
    }

    /// Read access to the buffered bytes of `id`.
    pub fn buffered<'a, H: Host + ?Sized>(
        &'a self,
        host: &'a H,
        id: StreamId,
    ) -> Result<&'a [u8], StdioError> {
        let stream = self.open_slot(id)?;
        let buf = stream.buffer(host.memory());
        let len = if stream.readable { stream.extent } else { stream.cursor };
        Ok(&buf[..len.min(buf.len())])
    }
}

fn check_mode(mode: &str) -> Result<(), StdioError> {
    if mode == "rb" {
        Ok(())
    } else {
        Err(Diagnostic::UnsupportedOpenMode {
            mode: mode.to_owned(),
        }
        .into())
    }
}

fn flush_stream<H: Host + ?Sized>(stream: &mut Stream, host: &mut H) {
    if stream.cursor == 0 {
        return;
    }
    let buf = stream.buffer(host.memory());
    let pending = buf[..stream.cursor.min(buf.len())].to_vec();
    host.emit_bytes(&pending);
    stream.cursor = 0;
}

struct StreamWriter<'a, H: Host + ?Sized> {
    table: &'a mut StreamTable,
    host: &'a mut H,
    id: StreamId,
    written: usize,
    failure: Option<StdioError>,
}

impl<H: Host + ?Sized> fmt::Write for StreamWriter<'_, H> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        match self.table.write(self.host, self.id, s.as_bytes()) {
            Ok(n) => {
                self.written += n;
                Ok(())
            }
            Err(err) => {
                self.failure = Some(err);
                Err(fmt::Error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sandlibc_membrane::SimHost;

    fn setup() -> (StreamTable, BlockAllocator, SimHost) {
        (StreamTable::new(), BlockAllocator::default(), SimHost::new())
    }

    #[test]
    fn standard_streams_are_reserved() {
        let (table, _, _) = setup();
        assert_eq!(table.open_count(), 3);
        let stdin = table.get(StreamId::STDIN).unwrap();
        assert!(!stdin.is_ready() && !stdin.is_readable() && !stdin.is_writable());
        assert!(table.eof(StreamId::STDIN) && table.error(StreamId::STDIN));
        let stdout = table.get(StreamId::STDOUT).unwrap();
        assert_eq!(stdout.mode(), BufMode::Line);
        assert_eq!(stdout.storage(), BufferStorage::Reserved);
        assert_eq!(stdout.capacity(), BUFSIZ);
        assert_eq!(table.get(StreamId::STDERR).unwrap().mode(), BufMode::None);
    }

    #[test]
    fn line_mode_flushes_on_newline() {
        let (mut table, _, mut host) = setup();
        table.write(&mut host, StreamId::STDOUT, b"abc").unwrap();
        assert_eq!(host.console().chunk_count(), 0);
        table.write(&mut host, StreamId::STDOUT, b"d\nef").unwrap();
        assert_eq!(host.console().chunks(), vec![b"abcd\n".to_vec()]);
        table.flush(&mut host, StreamId::STDOUT).unwrap();
        assert_eq!(host.console().text(), "abcd\nef");
    }

    #[test]
    fn full_mode_waits_for_a_full_buffer() {
        let (mut table, mut heap, mut host) = setup();
        table
            .set_buffer_mode(&mut heap, &mut host, StreamId::STDOUT, BufMode::Full, 8)
            .unwrap();
        table.write(&mut host, StreamId::STDOUT, b"1234\n").unwrap();
        table.write(&mut host, StreamId::STDOUT, b"567").unwrap();
        assert_eq!(host.console().chunk_count(), 0);
        table.write(&mut host, StreamId::STDOUT, b"x").unwrap();
        assert_eq!(host.console().chunks(), vec![b"1234\n567".to_vec()]);
        table.flush_all(&mut host);
        assert_eq!(host.console().text(), "1234\n567x");
    }

    #[test]
    fn unbuffered_emits_immediately() {
        let (mut table, _, mut host) = setup();
        table.write(&mut host, StreamId::STDERR, b"oops").unwrap();
        table.write_char(&mut host, StreamId::STDERR, b'!').unwrap();
        assert_eq!(host.console().chunks(), vec![b"oops".to_vec(), b"!".to_vec()]);
    }

    #[test]
    fn large_buffer_request_uses_allocator_and_small_reverts() {
        let (mut table, mut heap, mut host) = setup();
        table
            .set_buffer_mode(&mut heap, &mut host, StreamId::STDOUT, BufMode::Full, 4096)
            .unwrap();
        let storage = table.get(StreamId::STDOUT).unwrap().storage();
        assert!(storage.owned().is_some());
        assert_eq!(heap.live_count(), 1);
        table
            .set_buffer_mode(&mut heap, &mut host, StreamId::STDOUT, BufMode::Line, 64)
            .unwrap();
        assert_eq!(
            table.get(StreamId::STDOUT).unwrap().storage(),
            BufferStorage::Reserved
        );
        assert_eq!(heap.live_count(), 0);
    }

    #[test]
    fn open_waits_for_delivery() {
        let (mut table, mut heap, mut host) = setup();
        host.add_resource("data.bin", b"hi\nthere".to_vec());
        let id = table.open(&mut heap, &mut host, "data.bin", "rb").unwrap();
        assert_eq!(id.index(), FIRST_USER_SLOT);
        assert_eq!(table.read_char(&host, id), Err(StdioError::NotReady));
        assert!(!table.eof(id));

        assert!(table.poll(&mut heap, &mut host).ready.is_empty());
        host.release_fetches();
        assert_eq!(table.poll(&mut heap, &mut host).ready, vec![id]);

        let mut line = [0u8; 16];
        assert_eq!(table.read_line(&host, id, &mut line).unwrap(), 3);
        assert_eq!(&line[..4], b"hi\n\0");
        assert_eq!(table.read_line(&host, id, &mut line).unwrap(), 5);
        assert_eq!(&line[..5], b"there");
        assert_eq!(table.read_line(&host, id, &mut line), Err(StdioError::EndOfData));
        assert!(table.eof(id));
    }

    #[test]
    fn delivery_replaces_placeholder_buffer() {
        let (mut table, mut heap, mut host) = setup();
        host.add_resource("a", vec![7u8; 3000]);
        let id = table.open(&mut heap, &mut host, "a", "rb").unwrap();
        assert_eq!(heap.live_count(), 1);
        host.release_fetches();
        table.poll(&mut heap, &mut host);
        assert_eq!(heap.live_count(), 1);
        let stream = table.get(id).unwrap();
        assert_eq!(stream.extent(), 3000);
        let grant = stream.storage().owned().unwrap();
        assert_eq!(host.memory()[grant.addr() + 3000], 0);
        table.close(&mut heap, &mut host, id).unwrap();
        assert_eq!(heap.live_count(), 0);
    }

    #[test]
    fn failed_fetch_flags_the_slot() {
        let (mut table, mut heap, mut host) = setup();
        let id = table.open(&mut heap, &mut host, "missing", "rb").unwrap();
        host.release_fetches();
        let report = table.poll(&mut heap, &mut host);
        assert_eq!(report.failed, vec![id]);
        assert!(table.error(id) && table.eof(id));
        assert_eq!(table.read_char(&host, id), Err(StdioError::NotReady));
    }

    #[test]
    fn only_binary_read_mode_opens() {
        let (mut table, mut heap, mut host) = setup();
        for mode in ["r", "w", "wb", "rb+", "a"] {
            let err = table.open(&mut heap, &mut host, "x", mode).unwrap_err();
            assert!(matches!(
                err.diagnostic(),
                Some(Diagnostic::UnsupportedOpenMode { .. })
            ));
        }
        assert_eq!(heap.live_count(), 0);
    }

    #[test]
    fn table_capacity_is_bounded() {
        let (mut table, mut heap, mut host) = setup();
        for _ in FIRST_USER_SLOT..FOPEN_MAX {
            table.open(&mut heap, &mut host, "f", "rb").unwrap();
        }
        assert_eq!(
            table.open(&mut heap, &mut host, "f", "rb"),
            Err(StdioError::TableFull)
        );
        table
            .close(&mut heap, &mut host, StreamId(FIRST_USER_SLOT + 2))
            .unwrap();
        assert_eq!(
            table.open(&mut heap, &mut host, "f", "rb").unwrap(),
            StreamId(FIRST_USER_SLOT + 2)
        );
    }

    #[test]
    fn writing_a_read_stream_is_misuse() {
        let (mut table, mut heap, mut host) = setup();
        let id = table.open(&mut heap, &mut host, "f", "rb").unwrap();
        let err = table.write_char(&mut host, id, b'x').unwrap_err();
        assert_eq!(
            err.diagnostic().map(ToString::to_string).as_deref(),
            Some("Cannot put char in read only stream")
        );
    }

    #[test]
    fn reading_stdout_sets_eof() {
        let (mut table, _, host) = setup();
        assert_eq!(
            table.read_char(&host, StreamId::STDOUT),
            Err(StdioError::EndOfData)
        );
        assert!(table.eof(StreamId::STDOUT));
        assert_eq!(
            table.read_char(&host, StreamId::STDIN),
            Err(StdioError::EndOfData)
        );
    }

    #[test]
    fn seek_tell_rewind_on_fetched_data() {
        let (mut table, mut heap, mut host) = setup();
        host.add_resource("s", b"abcdef".to_vec());
        let id = table.open(&mut heap, &mut host, "s", "rb").unwrap();
        host.release_fetches();
        table.poll(&mut heap, &mut host);

        table.seek(id, 4, Whence::Set).unwrap();
        assert_eq!(table.read_char(&host, id), Ok(b'e'));
        table.seek(id, -3, Whence::Cur).unwrap();
        assert_eq!(table.tell(id), Ok(2));
        assert!(matches!(
            table.seek(id, 7, Whence::Set),
            Err(StdioError::OutOfRange { .. })
        ));
        assert!(matches!(
            table.seek(id, -1, Whence::Cur).map(|_| table.tell(id)),
            Ok(Ok(1))
        ));
        assert!(matches!(
            table.seek(id, 0, Whence::End).unwrap_err().diagnostic(),
            Some(Diagnostic::SeekFromEnd { .. })
        ));

        table.seek(id, 6, Whence::Set).unwrap();
        assert_eq!(table.read_char(&host, id), Err(StdioError::EndOfData));
        table.rewind(id).unwrap();
        assert!(!table.eof(id));
        assert_eq!(table.read_char(&host, id), Ok(b'a'));
    }

    #[test]
    fn positioning_writable_streams_is_unsupported() {
        let (mut table, _, _) = setup();
        let err = table.tell(StreamId::STDOUT).unwrap_err();
        assert_eq!(
            err.diagnostic().map(ToString::to_string).as_deref(),
            Some("ftell is not implemented for writable files")
        );
    }

    #[test]
    fn unget_steps_back() {
        let (mut table, mut heap, mut host) = setup();
        host.add_resource("u", b"xy".to_vec());
        let id = table.open(&mut heap, &mut host, "u", "rb").unwrap();
        host.release_fetches();
        table.poll(&mut heap, &mut host);
        assert!(table.unget(&mut host, id, b'q').is_err());
        assert_eq!(table.read_char(&host, id), Ok(b'x'));
        table.unget(&mut host, id, b'q').unwrap();
        assert_eq!(table.read_char(&host, id), Ok(b'q'));
        assert_eq!(table.read_char(&host, id), Ok(b'y'));
    }

    #[test]
    fn closed_slot_operations_are_misuse() {
        let (mut table, mut heap, mut host) = setup();
        table.close(&mut heap, &mut host, StreamId::STDERR).unwrap();
        let err = table.write_char(&mut host, StreamId::STDERR, b'x').unwrap_err();
        assert!(matches!(
            err.diagnostic(),
            Some(Diagnostic::StreamNotOpen { slot: 2 })
        ));
        assert!(table.close(&mut heap, &mut host, StreamId::STDERR).is_err());
    }

    #[test]
    fn close_flushes_pending_output() {
        let (mut table, mut heap, mut host) = setup();
        table.write(&mut host, StreamId::STDOUT, b"bye").unwrap();
        table.close(&mut heap, &mut host, StreamId::STDOUT).unwrap();
        assert_eq!(host.console().text(), "bye");
    }

    #[test]
    fn formatted_output_counts_bytes() {
        let (mut table, _, mut host) = setup();
        let n = table
            .write_args(&mut host, StreamId::STDOUT, format_args!("{}-{:03}\n", "id", 7))
            .unwrap();
        assert_eq!(n, 7);
        assert_eq!(host.console().text(), "id-007\n");
    }

    #[test]
    fn user_buffer_is_not_released() {
        let (mut table, mut heap, mut host) = setup();
        let grant = heap.allocate(&mut host, 32).unwrap();
        table
            .set_user_buffer(&mut heap, StreamId::STDOUT, grant, BufMode::Full)
            .unwrap();
        table.write(&mut host, StreamId::STDOUT, b"in linear memory").unwrap();
        assert_eq!(&host.memory()[grant.addr()..grant.addr() + 6], b"in lin");
        table.close(&mut heap, &mut host, StreamId::STDOUT).unwrap();
        assert_eq!(heap.live_count(), 1);
        assert_eq!(host.console().text(), "in linear memory");
    }
}
