/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Defines [Region], the descriptor used to move byte buffers across the host/guest boundary, and
//! [MemoryContext], which implements reading and writing regions in WASM linear memory.
//!
//! A region pointer references a 12-byte descriptor in guest memory:
//!
//! ```text
//! ptr + 0: offset   (u32, little endian)  start of the buffer
//! ptr + 4: capacity (u32, little endian)  bytes reserved by the guest allocator
//! ptr + 8: length   (u32, little endian)  bytes in use
//! ```
//!
//! Pointer `0` is reserved: it means "no data" or "success, nothing to return".

use wasmer::{Array, Memory, NativeFunc, WasmPtr};

use crate::contract::FuncError;

const REGION_DESCRIPTOR_SIZE: u32 = 12;

/// Region is a snapshot of a region descriptor living in guest memory. It does not own the memory it
/// describes, and is only meaningful while the instance it was read from is alive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Region {
    /// Location of the descriptor itself.
    pub ptr: u32,
    pub offset: u32,
    pub capacity: u32,
    pub length: u32,
}

impl Region {
    /// The sentinel region (pointer 0).
    pub const fn null() -> Self {
        Self::at(0)
    }

    /// A region known only by its pointer. The descriptor fields stay zeroed until it is resolved
    /// against guest memory.
    pub const fn at(ptr: u32) -> Self {
        Region {
            ptr,
            offset: 0,
            capacity: 0,
            length: 0,
        }
    }

    pub fn is_null(&self) -> bool {
        self.ptr == 0
    }

    fn validate(&self) -> Result<(), FuncError> {
        if self.offset == 0 {
            return Err(FuncError::Memory(format!(
                "region at {} has a zero offset",
                self.ptr
            )));
        }
        if self.length > self.capacity {
            return Err(FuncError::Memory(format!(
                "region at {} has length {} exceeding capacity {}",
                self.ptr, self.length, self.capacity
            )));
        }
        if self.offset.checked_add(self.capacity).is_none() {
            return Err(FuncError::Memory(format!(
                "region at {} overflows the address space",
                self.ptr
            )));
        }
        Ok(())
    }
}

/// Memory context provides read-write access to regions in WASM linear memory. Implementors only
/// supply the exported memory and the guest allocator functions.
pub trait MemoryContext {
    fn get_memory(&self) -> Result<&Memory, FuncError>;
    fn get_allocate(&self) -> Result<NativeFunc<u32, u32>, FuncError>;
    fn get_deallocate(&self) -> Result<NativeFunc<u32, ()>, FuncError>;

    /// read the region descriptor at `ptr`. The sentinel pointer is rejected.
    fn region(&self, ptr: u32) -> Result<Region, FuncError> {
        if ptr == 0 {
            return Err(FuncError::Memory("unexpected null region pointer".to_string()));
        }
        let raw = read_memory(self.get_memory()?, ptr, REGION_DESCRIPTOR_SIZE)?;
        let field = |i: usize| u32::from_le_bytes([raw[i], raw[i + 1], raw[i + 2], raw[i + 3]]);
        let region = Region {
            ptr,
            offset: field(0),
            capacity: field(4),
            length: field(8),
        };
        region.validate()?;
        Ok(region)
    }

    /// read the region descriptor at `ptr`, mapping the sentinel pointer to `None`.
    fn optional_region(&self, ptr: u32) -> Result<Option<Region>, FuncError> {
        match ptr {
            0 => Ok(None),
            ptr => self.region(ptr).map(Some),
        }
    }

    /// copy `length` bytes out of the region
    fn read_region_bytes(&self, region: &Region) -> Result<Vec<u8>, FuncError> {
        if region.is_null() {
            return Ok(Vec::new());
        }
        read_memory(self.get_memory()?, region.offset, region.length)
    }

    /// copy `data` into the region and update its length, both in guest memory and in `region`.
    fn write_region_bytes(&self, region: &mut Region, data: &[u8]) -> Result<(), FuncError> {
        if region.is_null() {
            return Err(FuncError::Memory("cannot write to the null region".to_string()));
        }
        let length: u32 = data
            .len()
            .try_into()
            .map_err(|_| FuncError::Memory(format!("{} bytes do not fit in a region", data.len())))?;
        if length > region.capacity {
            return Err(FuncError::Memory(format!(
                "writing {} bytes exceeds region capacity {}",
                length, region.capacity
            )));
        }

        let memory = self.get_memory()?;
        write_memory(memory, region.offset, data)?;
        write_memory(memory, region.ptr + 8, &length.to_le_bytes())?;
        region.length = length;
        Ok(())
    }

    /// ask the guest allocator for a region of `size` bytes
    fn allocate(&self, size: usize) -> Result<Region, FuncError> {
        let size: u32 = size
            .try_into()
            .map_err(|_| FuncError::Memory(format!("cannot allocate {size} bytes")))?;
        let ptr = self
            .get_allocate()?
            .call(size)
            .map_err(|e| FuncError::Runtime(anyhow::anyhow!("fail to allocate linear memory: {}", e)))?;
        self.region(ptr)
    }

    /// allocate a region exactly large enough for `data` and fill it
    fn allocate_bytes(&self, data: &[u8]) -> Result<Region, FuncError> {
        let mut region = self.allocate(data.len())?;
        self.write_region_bytes(&mut region, data)?;
        Ok(region)
    }

    /// hand the region back to the guest allocator
    fn deallocate(&self, region: Region) -> Result<(), FuncError> {
        if region.is_null() {
            return Ok(());
        }
        self.get_deallocate()?
            .call(region.ptr)
            .map_err(|e| FuncError::Runtime(anyhow::anyhow!("fail to deallocate linear memory: {}", e)))
    }
}

/// read bytes from memory given the offset and len of the memory location
fn read_memory(memory: &Memory, offset: u32, len: u32) -> Result<Vec<u8>, FuncError> {
    if len == 0 {
        return Ok(Vec::new());
    }
    let bytes_ptr: WasmPtr<u8, Array> = WasmPtr::new(offset);
    let cells = bytes_ptr.deref(memory, 0, len).ok_or_else(|| {
        FuncError::Memory(format!("fail to read {len} bytes at offset {offset}"))
    })?;
    Ok(cells.iter().map(|cell| cell.get()).collect())
}

fn write_memory(memory: &Memory, offset: u32, data: &[u8]) -> Result<(), FuncError> {
    if data.is_empty() {
        return Ok(());
    }
    let bytes_ptr: WasmPtr<u8, Array> = WasmPtr::new(offset);
    let cells = bytes_ptr.deref(memory, 0, data.len() as u32).ok_or_else(|| {
        FuncError::Memory(format!(
            "fail to write {} bytes at offset {offset}",
            data.len()
        ))
    })?;
    for (cell, byte) in cells.iter().zip(data) {
        cell.set(*byte);
    }
    Ok(())
}
