// Copyright 2024 The Crate Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Open-mode flags and the per-descriptor cursor.

use bitflags::bitflags;

/// Identity of a [`crate::file::File`] inside the filesystem's file slab.
/// Stable across renames-by-delete-then-recreate; two `FileId`s are never
/// equal unless they name the same underlying file.
pub(crate) type FileId = usize;

bitflags! {
    /// Open-mode bitset, mirroring the C spec's `CREATE | READ_ONLY |
    /// WRITE_ONLY | READ_WRITE` flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct OpenFlags: u8 {
        const CREATE = 1 << 0;
        const READ_ONLY = 1 << 1;
        const WRITE_ONLY = 1 << 2;
        const READ_WRITE = 1 << 3;
    }
}

impl OpenFlags {
    const ACCESS_MASK: OpenFlags =
        OpenFlags::READ_ONLY.union(OpenFlags::WRITE_ONLY).union(OpenFlags::READ_WRITE);

    pub fn create(self) -> bool {
        self.contains(Self::CREATE)
    }

    /// When none of the three access bits are set, access is unrestricted
    /// (read+write), per spec.
    pub fn can_read(self) -> bool {
        !self.intersects(Self::ACCESS_MASK) || self.contains(Self::READ_ONLY) || self.contains(Self::READ_WRITE)
    }

    pub fn can_write(self) -> bool {
        !self.intersects(Self::ACCESS_MASK) || self.contains(Self::WRITE_ONLY) || self.contains(Self::READ_WRITE)
    }
}

/// A cursor into a file's block chain, expressed as `(block_index,
/// byte_offset_in_block)`. A position exactly at the end of a full block
/// (`byte_pos == BLOCK_SIZE`) is valid and is normalized into the next
/// block lazily, on the next I/O step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Cursor {
    pub block: usize,
    pub byte_pos: usize,
}

impl Cursor {
    pub fn start() -> Self {
        Cursor { block: 0, byte_pos: 0 }
    }
}

/// An open handle to a file: its access mode and its own independent
/// cursor. Two descriptors on the same file never share a cursor.
pub(crate) struct Descriptor {
    pub file: FileId,
    pub flags: OpenFlags,
    pub cursor: Cursor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrestricted_when_no_access_bit_set() {
        let f = OpenFlags::CREATE;
        assert!(f.can_read());
        assert!(f.can_write());
    }

    #[test]
    fn read_only_blocks_write() {
        let f = OpenFlags::READ_ONLY;
        assert!(f.can_read());
        assert!(!f.can_write());
    }

    #[test]
    fn write_only_blocks_read() {
        let f = OpenFlags::WRITE_ONLY;
        assert!(!f.can_read());
        assert!(f.can_write());
    }
}
