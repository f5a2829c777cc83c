//! Bulk transfers between a region and ordinary memory.
//!
//! The copies go word-at-a-time through relaxed atomics when both sides are
//! word aligned and fall back to bytes otherwise. A sequentially consistent
//! fence precedes every read and follows every write, so a bulk transfer is
//! ordered against the single-value accesses around it.

use core::{
    mem::size_of,
    sync::atomic::{AtomicU8, AtomicUsize, Ordering, fence},
};

use merrno::{MResult, m_bail};

use crate::IoRegion;

const WORD: usize = size_of::<usize>();

fn word_aligned(a: usize, b: usize) -> bool {
    (a | b) % WORD == 0
}

impl IoRegion<'_> {
    /// Clamps a transfer of `len` bytes at `offset` to the window and
    /// returns the start address and the clamped length.
    fn block_span(&self, offset: usize, len: usize) -> MResult<(*mut u8, usize)> {
        let Some(base) = self.virt(offset).filter(|_| offset < self.size()) else {
            m_bail!(
                OutOfRange,
                "block access at {offset:#x} outside region of {:#x}",
                self.size()
            );
        };
        Ok((base, len.min(self.size() - offset)))
    }

    /// Copies up to `dst.len()` bytes starting at `offset` into `dst`.
    ///
    /// Returns the number of bytes copied, which is smaller than `dst.len()`
    /// when the window ends first.
    pub fn block_read(&self, offset: usize, dst: &mut [u8]) -> MResult<usize> {
        match self.ops() {
            Some(ops) => ops.block_read(self, offset, dst),
            None => self.block_read_direct(offset, dst),
        }
    }

    /// Copies up to `src.len()` bytes from `src` into the window at `offset`.
    pub fn block_write(&self, offset: usize, src: &[u8]) -> MResult<usize> {
        match self.ops() {
            Some(ops) => ops.block_write(self, offset, src),
            None => self.block_write_direct(offset, src),
        }
    }

    /// Fills up to `len` bytes at `offset` with `value`.
    pub fn block_set(&self, offset: usize, value: u8, len: usize) -> MResult<usize> {
        match self.ops() {
            Some(ops) => ops.block_set(self, offset, value, len),
            None => self.block_set_direct(offset, value, len),
        }
    }

    /// [`IoRegion::block_read`] without consulting the region's ops.
    pub fn block_read_direct(&self, offset: usize, dst: &mut [u8]) -> MResult<usize> {
        let (src, len) = self.block_span(offset, dst.len())?;
        fence(Ordering::SeqCst);

        let mut done = 0;
        // SAFETY: `block_span` keeps `src..src + len` inside the mapped window.
        unsafe {
            if word_aligned(src as usize, dst.as_ptr() as usize) {
                while len - done >= WORD {
                    let word = AtomicUsize::from_ptr(src.add(done).cast()).load(Ordering::Relaxed);
                    dst[done..done + WORD].copy_from_slice(&word.to_ne_bytes());
                    done += WORD;
                }
            }
            while done < len {
                dst[done] = AtomicU8::from_ptr(src.add(done)).load(Ordering::Relaxed);
                done += 1;
            }
        }
        Ok(len)
    }

    /// [`IoRegion::block_write`] without consulting the region's ops.
    pub fn block_write_direct(&self, offset: usize, src: &[u8]) -> MResult<usize> {
        let (dst, len) = self.block_span(offset, src.len())?;

        let mut done = 0;
        // SAFETY: `block_span` keeps `dst..dst + len` inside the mapped window.
        unsafe {
            if word_aligned(dst as usize, src.as_ptr() as usize) {
                while len - done >= WORD {
                    let mut word = [0u8; WORD];
                    word.copy_from_slice(&src[done..done + WORD]);
                    AtomicUsize::from_ptr(dst.add(done).cast())
                        .store(usize::from_ne_bytes(word), Ordering::Relaxed);
                    done += WORD;
                }
            }
            while done < len {
                AtomicU8::from_ptr(dst.add(done)).store(src[done], Ordering::Relaxed);
                done += 1;
            }
        }
        fence(Ordering::SeqCst);
        Ok(len)
    }

    /// [`IoRegion::block_set`] without consulting the region's ops.
    pub fn block_set_direct(&self, offset: usize, value: u8, len: usize) -> MResult<usize> {
        let (dst, len) = self.block_span(offset, len)?;
        let pattern = usize::from_ne_bytes([value; WORD]);

        let mut done = 0;
        // SAFETY: `block_span` keeps `dst..dst + len` inside the mapped window.
        unsafe {
            while done < len && (dst as usize + done) % WORD != 0 {
                AtomicU8::from_ptr(dst.add(done)).store(value, Ordering::Relaxed);
                done += 1;
            }
            while len - done >= WORD {
                AtomicUsize::from_ptr(dst.add(done).cast()).store(pattern, Ordering::Relaxed);
                done += WORD;
            }
            while done < len {
                AtomicU8::from_ptr(dst.add(done)).store(value, Ordering::Relaxed);
                done += 1;
            }
        }
        fence(Ordering::SeqCst);
        Ok(len)
    }
}
