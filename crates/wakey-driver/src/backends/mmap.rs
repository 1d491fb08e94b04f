// SPDX-License-Identifier: AGPL-3.0-only

//! Host mapping of the configuration register block
//!
//! When the bring-up tool runs on a host that exposes the chip's bus through
//! a memory device (`/dev/mem`, a UIO node), the register block is mapped
//! into the process with `rustix` and then accessed exactly like on the
//! management core, through [`MmioBus`].

use crate::backend::{BackendType, RegisterBus};
use crate::config::TransportConfig;
use crate::error::{CfgError, Result};
use crate::mmio::MmioBus;
use rustix::mm::{mmap, munmap, MapFlags, ProtFlags};
use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsFd;

/// Register block mapped through a memory device
#[derive(Debug)]
pub struct MmapBus {
    /// Volatile view of the block inside the mapping
    bus: MmioBus,
    /// Start of the page-aligned mapping
    map_base: *mut std::ffi::c_void,
    /// Length of the page-aligned mapping
    map_len: usize,
    _file: File,
}

// SAFETY: Send - MmapBus owns the mapping exclusively; mmap'd memory is
// process-wide, so moving the handle between threads keeps it valid.
unsafe impl Send for MmapBus {}

impl MmapBus {
    /// Map the register block described by `config`.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The configuration is inconsistent
    /// - The memory device is missing or cannot be opened
    /// - mmap fails
    pub fn open(config: &TransportConfig) -> Result<Self> {
        config.validate()?;
        let path = &config.mem_device;
        if !path.exists() {
            return Err(CfgError::device_not_found(path));
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(path)?;

        let page = rustix::param::page_size();
        let page_mask = page as u64 - 1;
        let map_offset = config.base_address & !page_mask;
        // Truncation acceptable: the in-page delta is below page size
        #[allow(clippy::cast_possible_truncation)]
        let delta = (config.base_address & page_mask) as usize;
        let map_len = (delta + config.window_size).div_ceil(page) * page;

        tracing::debug!(
            "Mapping {} at {map_offset:#x}, len={map_len:#x} (block delta {delta:#x})",
            path.display()
        );

        // SAFETY: mmap necessary for MMIO - maps the register block into the process.
        // Invariants: (1) file opened read/write above and kept alive in the struct;
        // (2) offset is page aligned, length a non-zero multiple of the page size;
        // (3) MAP_SHARED so stores reach the device; (4) unmapped once in Drop.
        let map_base = unsafe {
            mmap(
                std::ptr::null_mut(),
                map_len,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                file.as_fd(),
                map_offset,
            )
            .map_err(|e| {
                CfgError::map_failed(format!(
                    "mmap {} at {map_offset:#x}: {e}",
                    path.display()
                ))
            })?
        };

        // SAFETY: map_base is valid for map_len bytes; delta + window_size <= map_len,
        // and the mapping is owned by the returned MmapBus, which outlives the MmioBus.
        let bus = unsafe { MmioBus::from_raw(map_base.cast::<u8>().add(delta), config.window_size) }
            .with_kind(BackendType::Mmap);

        tracing::info!(
            "Mapped configuration block {:#x} at {:p}",
            config.base_address,
            bus.as_ptr()
        );

        Ok(Self {
            bus,
            map_base,
            map_len,
            _file: file,
        })
    }
}

impl RegisterBus for MmapBus {
    fn read32(&mut self, offset: usize) -> u32 {
        self.bus.read32(offset)
    }

    fn write32(&mut self, offset: usize, value: u32) {
        self.bus.write32(offset, value);
    }

    fn size(&self) -> usize {
        self.bus.size()
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Mmap
    }
}

impl Drop for MmapBus {
    fn drop(&mut self) {
        tracing::debug!("Unmapping configuration block ({:#x} bytes)", self.map_len);
        // SAFETY: munmap with the exact pointer and length returned by mmap in open();
        // Drop runs at most once and the inner MmioBus is dropped with us.
        unsafe {
            if let Err(e) = munmap(self.map_base, self.map_len) {
                tracing::error!("munmap failed during drop: {e}");
            }
        }
    }
}
