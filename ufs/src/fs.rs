// Copyright 2024 The Crate Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::cell::Cell;
use std::collections::HashMap;

use log::debug;
use log::trace;

use crate::block::BLOCK_SIZE;
use crate::descriptor::Cursor;
use crate::descriptor::Descriptor;
use crate::descriptor::FileId;
use crate::descriptor::OpenFlags;
use crate::error::Error;
use crate::error::Result;
use crate::file::File;
use crate::file::MAX_FILE_SIZE;

/// Floor below which the descriptor table never shrinks.
const MIN_TABLE_CAPACITY: usize = 10;

/// Read-only metadata about a visible file, returned by [`FileSystem::stat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    pub size: u64,
    pub open_refs: usize,
    pub removed: bool,
}

/// The outcome of a [`FileSystem::write`] call: the number of bytes actually
/// written, plus the sticky error if the write was short or failed outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    pub written: usize,
    pub error: Option<Error>,
}

/// An in-memory, POSIX-like filesystem: a file table plus a descriptor
/// table, all owned by one value instead of process-wide globals.
pub struct FileSystem {
    files: Vec<Option<File>>,
    free_files: Vec<FileId>,
    by_name: HashMap<String, FileId>,
    descriptors: Vec<Option<Descriptor>>,
    last_error: Cell<Option<Error>>,
}

impl FileSystem {
    pub fn new() -> Self {
        FileSystem {
            files: Vec::new(),
            free_files: Vec::new(),
            by_name: HashMap::new(),
            descriptors: vec![None; MIN_TABLE_CAPACITY],
            last_error: Cell::new(None),
        }
    }

    /// The sticky error left by the most recent public operation; `None`
    /// means that operation succeeded.
    pub fn errno(&self) -> Option<Error> {
        self.last_error.get()
    }

    fn ok<T>(&self, val: T) -> Result<T> {
        self.last_error.set(None);
        Ok(val)
    }

    fn fail<T>(&self, err: Error) -> Result<T> {
        self.last_error.set(Some(err));
        Err(err)
    }

    /// Names of every currently visible (non-removed) file.
    pub fn list(&self) -> Vec<&str> {
        self.by_name.keys().map(String::as_str).collect()
    }

    /// Metadata for a visible file, without needing an open descriptor.
    pub fn stat(&self, name: &str) -> Result<Metadata> {
        let id = match self.by_name.get(name) {
            Some(&id) => id,
            None => return self.fail(Error::NoFile),
        };
        let file = self.files[id].as_ref().expect("by_name points at a live file");
        self.ok(Metadata {
            size: file.size(),
            open_refs: file.refs,
            removed: file.removed,
        })
    }

    pub fn open(&mut self, name: &str, flags: OpenFlags) -> Result<usize> {
        if name.is_empty() {
            return self.fail(Error::InvalidArgument);
        }

        let file_id = match self.by_name.get(name) {
            Some(&id) => id,
            None => {
                if !flags.create() {
                    return self.fail(Error::NoFile);
                }
                let id = self.insert_file(File::new(name.to_string()));
                self.by_name.insert(name.to_string(), id);
                debug!("ufs: created {name}");
                id
            }
        };

        let fd = self.smallest_free_fd();
        self.descriptors[fd] = Some(Descriptor {
            file: file_id,
            flags,
            cursor: Cursor::start(),
        });
        self.files[file_id].as_mut().unwrap().refs += 1;
        trace!("ufs: open {name} -> fd {fd}");
        self.ok(fd)
    }

    pub fn close(&mut self, fd: usize) -> Result<()> {
        let descriptor = match self.take_descriptor(fd) {
            Some(d) => d,
            None => return self.fail(Error::InvalidArgument),
        };

        self.drop_file_ref(descriptor.file);
        self.shrink_descriptor_table_if_idle();
        self.ok(())
    }

    pub fn write(&mut self, fd: usize, buf: &[u8]) -> WriteOutcome {
        let (file_id, flags) = match self.descriptor_info(fd) {
            Some(v) => v,
            None => {
                self.last_error.set(Some(Error::InvalidArgument));
                return WriteOutcome { written: 0, error: Some(Error::InvalidArgument) };
            }
        };
        if !flags.can_write() {
            self.last_error.set(Some(Error::NoPermission));
            return WriteOutcome { written: 0, error: Some(Error::NoPermission) };
        }

        let file_size_now = self.files[file_id].as_ref().unwrap().size();
        if file_size_now + buf.len() as u64 > MAX_FILE_SIZE {
            self.last_error.set(Some(Error::NoMemory));
            return WriteOutcome { written: 0, error: Some(Error::NoMemory) };
        }

        let mut written = 0usize;
        let mut short = false;
        while written < buf.len() {
            let cursor = self.descriptors[fd].as_ref().unwrap().cursor;
            let (block_idx, byte_pos) = self.normalize_cursor(file_id, cursor, /*for_write=*/ true);

            let file = self.files[file_id].as_mut().unwrap();
            let block = match file.block_mut(block_idx) {
                Some(b) => b,
                None => {
                    short = true;
                    break;
                }
            };
            let n = block.write_at(byte_pos, &buf[written..]);
            written += n;

            let new_byte_pos = byte_pos + n;
            self.descriptors[fd].as_mut().unwrap().cursor = Cursor { block: block_idx, byte_pos: new_byte_pos };

            if n == 0 {
                // Block had no room and we couldn't allocate a new one.
                short = true;
                break;
            }
        }

        let error = if short { Some(Error::NoMemory) } else { None };
        self.last_error.set(error);
        trace!("ufs: write fd {fd} wrote {written}/{} bytes", buf.len());
        WriteOutcome { written, error }
    }

    pub fn read(&mut self, fd: usize, buf: &mut [u8]) -> Result<usize> {
        let (file_id, flags) = match self.descriptor_info(fd) {
            Some(v) => v,
            None => return self.fail(Error::InvalidArgument),
        };
        if !flags.can_read() {
            return self.fail(Error::NoPermission);
        }

        let mut read = 0usize;
        while read < buf.len() {
            let cursor = self.descriptors[fd].as_ref().unwrap().cursor;
            let (block_idx, byte_pos) = self.normalize_cursor(file_id, cursor, /*for_write=*/ false);

            let file = self.files[file_id].as_ref().unwrap();
            let block = match file.block(block_idx) {
                Some(b) => b,
                None => break,
            };
            // `byte_pos == occupied` means this is either a full block we
            // failed to advance past (no next block exists) or the partial
            // terminal block of the chain — either way, end of file.
            if byte_pos >= block.occupied() {
                break;
            }

            let n = block.read_at(byte_pos, &mut buf[read..]);
            read += n;
            self.descriptors[fd].as_mut().unwrap().cursor = Cursor { block: block_idx, byte_pos: byte_pos + n };

            if n == 0 {
                break;
            }
        }
        self.ok(read)
    }

    pub fn delete(&mut self, name: &str) -> Result<()> {
        let file_id = match self.by_name.remove(name) {
            Some(id) => id,
            None => return self.fail(Error::NoFile),
        };

        let file = self.files[file_id].as_mut().expect("live file");
        if file.refs == 0 {
            self.destroy_file(file_id);
            debug!("ufs: destroyed {name} immediately (no open descriptors)");
        } else {
            file.removed = true;
            debug!("ufs: deferred delete of {name} ({} open descriptors)", file.refs);
        }
        self.ok(())
    }

    pub fn resize(&mut self, fd: usize, new_size: u64) -> Result<()> {
        if new_size > MAX_FILE_SIZE {
            return self.fail(Error::NoMemory);
        }
        let (file_id, flags) = match self.descriptor_info(fd) {
            Some(v) => v,
            None => return self.fail(Error::InvalidArgument),
        };
        if !flags.can_write() {
            return self.fail(Error::NoPermission);
        }

        self.files[file_id].as_mut().unwrap().resize_to(new_size);

        // Clamp every descriptor on this file whose cursor now lies past the
        // new end, not just the one that requested the resize.
        let last_block = self.files[file_id].as_ref().unwrap().last_block_index();
        let last_occupied = self.files[file_id].as_ref().unwrap().block(last_block).unwrap().occupied();
        for d in self.descriptors.iter_mut().flatten() {
            if d.file != file_id {
                continue;
            }
            if d.cursor.block > last_block || (d.cursor.block == last_block && d.cursor.byte_pos > last_occupied) {
                d.cursor = Cursor { block: last_block, byte_pos: last_occupied.min(BLOCK_SIZE) };
            }
        }

        self.ok(())
    }

    fn descriptor_info(&self, fd: usize) -> Option<(FileId, OpenFlags)> {
        let d = self.descriptors.get(fd)?.as_ref()?;
        Some((d.file, d.flags))
    }

    fn take_descriptor(&mut self, fd: usize) -> Option<Descriptor> {
        self.descriptors.get_mut(fd)?.take()
    }

    /// Advances a cursor that sits exactly at a full block's end into the
    /// start of the next block. For writes, allocates that next block if it
    /// doesn't exist yet; for reads, leaves the cursor in place if there is
    /// no next block (the caller treats that as EOF).
    fn normalize_cursor(&mut self, file_id: FileId, cursor: Cursor, for_write: bool) -> (usize, usize) {
        let needs_advance = {
            let file = self.files[file_id].as_ref().unwrap();
            cursor.byte_pos >= BLOCK_SIZE
                && file.block(cursor.block).map_or(false, |b| b.is_full())
        };
        if !needs_advance {
            return (cursor.block, cursor.byte_pos);
        }

        let file = self.files[file_id].as_mut().unwrap();
        let next = cursor.block + 1;
        if file.block(next).is_some() {
            return (next, 0);
        }
        if for_write {
            if let Some(idx) = file.grow() {
                return (idx, 0);
            }
        }
        (cursor.block, cursor.byte_pos)
    }

    fn smallest_free_fd(&mut self) -> usize {
        if let Some(idx) = self.descriptors.iter().position(|d| d.is_none()) {
            return idx;
        }
        let old_cap = self.descriptors.len();
        self.descriptors.resize_with(old_cap * 2, || None);
        old_cap
    }

    fn shrink_descriptor_table_if_idle(&mut self) {
        let occupied = self.descriptors.iter().filter(|d| d.is_some()).count();
        let cap = self.descriptors.len();
        if cap > MIN_TABLE_CAPACITY && occupied * 2 < cap {
            let new_cap = (cap / 2).max(MIN_TABLE_CAPACITY).max(occupied);
            // Only shrink if every live descriptor fits below the new
            // capacity; otherwise leave the table as-is this round.
            if self.descriptors[new_cap..].iter().all(Option::is_none) {
                self.descriptors.truncate(new_cap);
            }
        }
    }

    fn drop_file_ref(&mut self, file_id: FileId) {
        let file = self.files[file_id].as_mut().expect("live file");
        file.refs -= 1;
        if file.refs == 0 && file.removed {
            let name = file.name.clone();
            self.destroy_file(file_id);
            debug!("ufs: destroyed {name} after last descriptor closed");
        }
    }

    fn insert_file(&mut self, file: File) -> FileId {
        if let Some(id) = self.free_files.pop() {
            self.files[id] = Some(file);
            id
        } else {
            self.files.push(Some(file));
            self.files.len() - 1
        }
    }

    fn destroy_file(&mut self, file_id: FileId) {
        self.files[file_id] = None;
        self.free_files.push(file_id);
    }
}

impl Default for FileSystem {
    fn default() -> Self {
        Self::new()
    }
}
